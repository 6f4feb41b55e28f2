use std::sync::Arc;

use anyhow::{anyhow, Context, Result};
use reqwest::header::AUTHORIZATION;
use reqwest::{Method, Url};
use serde::de::DeserializeOwned;
use tracing::debug;

use super::auth::Authenticator;
use super::retry::{with_retry, RetryPolicy};
use super::ApiError;

const CORRELATION_HEADER: &str = "X-Correlation-Id";

/// Authenticated JSON transport shared by the API clients.
#[derive(Debug, Clone)]
pub struct ApiTransport {
    http: reqwest::Client,
    auth: Arc<Authenticator>,
    retry: RetryPolicy,
}

impl ApiTransport {
    pub fn new(http: reqwest::Client, auth: Arc<Authenticator>, retry: RetryPolicy) -> Self {
        Self { http, auth, retry }
    }

    /// Join path segments onto a base URL, percent-encoding each one.
    /// CRNs contain `/` and must stay a single segment.
    pub fn url(base: &str, segments: &[&str]) -> Result<Url> {
        let mut url =
            Url::parse(base).with_context(|| format!("Invalid API endpoint: {}", base))?;
        url.path_segments_mut()
            .map_err(|_| anyhow!("API endpoint cannot be a base URL: {}", base))?
            .pop_if_empty()
            .extend(segments);
        Ok(url)
    }

    /// Send a request and decode the JSON response, retrying transient failures.
    pub async fn send<T: DeserializeOwned>(
        &self,
        method: Method,
        url: Url,
        query: &[(&str, String)],
        body: Option<&serde_json::Value>,
        operation: &str,
    ) -> Result<T> {
        with_retry(&self.retry, operation, || {
            let method = method.clone();
            let url = url.clone();
            async move {
                let authorization = self.auth.authorization().await?;
                let correlation_id = uuid::Uuid::new_v4().to_string();
                debug!(
                    operation = operation,
                    method = %method,
                    url = %url,
                    correlation_id = %correlation_id,
                    "Sending API request"
                );

                let mut request = self
                    .http
                    .request(method, url)
                    .header(AUTHORIZATION, authorization)
                    .header(CORRELATION_HEADER, correlation_id);
                if !query.is_empty() {
                    request = request.query(query);
                }
                if let Some(body) = body {
                    request = request.json(body);
                }

                let resp = request
                    .send()
                    .await
                    .with_context(|| format!("Failed to send {} request", operation))?;
                let status = resp.status();
                let text = resp
                    .text()
                    .await
                    .with_context(|| format!("Failed to read {} response", operation))?;

                if !status.is_success() {
                    return Err(ApiError {
                        status: status.as_u16(),
                        message: extract_error_message(&text),
                    })
                    .with_context(|| format!("{} failed", operation));
                }

                serde_json::from_str(&text)
                    .with_context(|| format!("Failed to parse {} response", operation))
            }
        })
        .await
    }
}

/// Pull a readable message out of an IBM Cloud error body.
///
/// Handles `{"errors": "..."}`, `{"errors": [{"message": "..."}]}`,
/// `{"error": "..."}` and `{"errorMessage": "..."}`; falls back to the raw body.
pub fn extract_error_message(body: &str) -> String {
    let fallback = || {
        let trimmed = body.trim();
        if trimmed.is_empty() {
            "empty response body".to_string()
        } else {
            trimmed.to_string()
        }
    };

    let value: serde_json::Value = match serde_json::from_str(body) {
        Ok(v) => v,
        Err(_) => return fallback(),
    };

    for key in ["errors", "error", "errorMessage", "message"] {
        match value.get(key) {
            Some(serde_json::Value::String(s)) => return s.clone(),
            Some(serde_json::Value::Array(items)) => {
                let messages: Vec<&str> = items
                    .iter()
                    .filter_map(|item| item.get("message").and_then(|m| m.as_str()))
                    .collect();
                if !messages.is_empty() {
                    return messages.join("; ");
                }
            }
            _ => {}
        }
    }

    fallback()
}
