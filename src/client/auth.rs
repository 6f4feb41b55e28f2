use std::fmt;

use anyhow::{Context, Result};
use chrono::{DateTime, Duration, Utc};
use serde::Deserialize;
use tokio::sync::Mutex;
use tracing::debug;

use super::ApiError;

const APIKEY_GRANT_TYPE: &str = "urn:ibm:params:oauth:grant-type:apikey";

/// Refresh this long before the token actually expires.
const EXPIRY_MARGIN_SECS: i64 = 60;

#[derive(Clone)]
pub enum Credentials {
    ApiKey(String),
    BearerToken(String),
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Credentials::ApiKey(_) => f.write_str("ApiKey([REDACTED])"),
            Credentials::BearerToken(_) => f.write_str("BearerToken([REDACTED])"),
        }
    }
}

#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
    /// Unix timestamp in seconds.
    expiration: Option<i64>,
    expires_in: Option<i64>,
}

#[derive(Debug, Clone)]
struct CachedToken {
    access_token: String,
    expires_at: DateTime<Utc>,
}

/// Produces `Authorization` header values, exchanging an API key for an IAM
/// access token and caching it until shortly before expiry.
pub struct Authenticator {
    http: reqwest::Client,
    iam_url: String,
    credentials: Credentials,
    cached: Mutex<Option<CachedToken>>,
}

impl fmt::Debug for Authenticator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Authenticator")
            .field("iam_url", &self.iam_url)
            .field("credentials", &self.credentials)
            .finish()
    }
}

impl Authenticator {
    pub fn new(http: reqwest::Client, iam_url: &str, credentials: Credentials) -> Self {
        Self {
            http,
            iam_url: iam_url.trim_end_matches('/').to_string(),
            credentials,
            cached: Mutex::new(None),
        }
    }

    pub async fn authorization(&self) -> Result<String> {
        let api_key = match &self.credentials {
            Credentials::BearerToken(token) => return Ok(format!("Bearer {}", token)),
            Credentials::ApiKey(key) => key,
        };

        let mut cached = self.cached.lock().await;
        if let Some(token) = cached.as_ref() {
            if token.expires_at > Utc::now() {
                return Ok(format!("Bearer {}", token.access_token));
            }
        }

        let token = self.request_token(api_key).await?;
        let header = format!("Bearer {}", token.access_token);
        *cached = Some(token);
        Ok(header)
    }

    async fn request_token(&self, api_key: &str) -> Result<CachedToken> {
        let url = format!("{}/identity/token", self.iam_url);
        debug!(url = %url, "Requesting IAM access token");

        let resp = self
            .http
            .post(&url)
            .header(reqwest::header::ACCEPT, "application/json")
            .form(&[("grant_type", APIKEY_GRANT_TYPE), ("apikey", api_key)])
            .send()
            .await
            .context("Failed to reach IAM token endpoint")?;

        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            return Err(ApiError {
                status: status.as_u16(),
                message: super::http::extract_error_message(&body),
            })
            .context("IAM token request was rejected");
        }

        let body: TokenResponse = resp
            .json()
            .await
            .context("Failed to parse IAM token response")?;

        let expires_at = body
            .expiration
            .and_then(|ts| DateTime::from_timestamp(ts, 0))
            .or_else(|| body.expires_in.map(|secs| Utc::now() + Duration::seconds(secs)))
            .unwrap_or_else(Utc::now)
            - Duration::seconds(EXPIRY_MARGIN_SECS);

        Ok(CachedToken {
            access_token: body.access_token,
            expires_at,
        })
    }
}
