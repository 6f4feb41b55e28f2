use std::future::Future;
use std::time::Duration;

use tracing;

use super::ApiError;
use crate::config::types::RetrySettings;

#[derive(Debug, Clone, Copy)]
pub struct RetryPolicy {
    pub max_retries: u32,
    pub base_delay_ms: u64,
}

impl From<&RetrySettings> for RetryPolicy {
    fn from(settings: &RetrySettings) -> Self {
        Self {
            max_retries: settings.max_retries,
            base_delay_ms: settings.base_delay_ms,
        }
    }
}

/// Connection failures, timeouts, 429 and 5xx responses are worth retrying.
/// Everything else fails immediately.
pub fn is_transient(err: &anyhow::Error) -> bool {
    err.chain().any(|cause| {
        if let Some(api) = cause.downcast_ref::<ApiError>() {
            return api.is_transient();
        }
        if let Some(http) = cause.downcast_ref::<reqwest::Error>() {
            return http.is_connect() || http.is_timeout();
        }
        false
    })
}

/// Doubling stops after this many retries.
const MAX_BACKOFF_EXPONENT: u32 = 10;

/// Delay before retry number `attempt` (1-based).
pub fn backoff_delay(policy: &RetryPolicy, attempt: u32) -> Duration {
    let exponent = attempt.saturating_sub(1).min(MAX_BACKOFF_EXPONENT);
    Duration::from_millis(policy.base_delay_ms.saturating_mul(1u64 << exponent))
}

/// Retry a fallible async operation with exponential backoff.
pub async fn with_retry<F, Fut, T>(
    policy: &RetryPolicy,
    operation_name: &str,
    mut f: F,
) -> anyhow::Result<T>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = anyhow::Result<T>>,
{
    let mut attempt = 0;

    loop {
        match f().await {
            Ok(result) => return Ok(result),
            Err(e) => {
                if !is_transient(&e) {
                    return Err(e);
                }
                attempt += 1;
                if attempt > policy.max_retries {
                    tracing::error!(
                        operation = operation_name,
                        attempts = attempt,
                        "All retry attempts exhausted"
                    );
                    return Err(e);
                }

                let delay = backoff_delay(policy, attempt);
                tracing::warn!(
                    operation = operation_name,
                    attempt = attempt,
                    max_retries = policy.max_retries,
                    delay_ms = delay.as_millis() as u64,
                    error = %e,
                    "Retrying after failure"
                );
                tokio::time::sleep(delay).await;
            }
        }
    }
}
