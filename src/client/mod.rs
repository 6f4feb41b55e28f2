//! HTTP clients for the Cloud Databases and Global Tagging APIs.

pub mod auth;
pub mod databases;
pub mod http;
pub mod retry;
pub mod tagging;

use thiserror::Error;

pub use auth::{Authenticator, Credentials};
pub use databases::{CloudDatabasesClient, Deployment, GroupScaling, Task, TaskStatus};
pub use http::ApiTransport;
pub use retry::RetryPolicy;
pub use tagging::{GlobalTaggingClient, TagType};

/// A non-success response from an IBM Cloud API.
#[derive(Debug, Clone, Error)]
#[error("API request failed with status {status}: {message}")]
pub struct ApiError {
    pub status: u16,
    pub message: String,
}

impl ApiError {
    pub fn is_transient(&self) -> bool {
        self.status == 429 || self.status >= 500
    }

    pub fn is_not_found(&self) -> bool {
        self.status == 404
    }
}

/// True when the error chain contains an `ApiError` with a 404 status.
pub fn is_not_found(err: &anyhow::Error) -> bool {
    err.chain()
        .filter_map(|cause| cause.downcast_ref::<ApiError>())
        .any(ApiError::is_not_found)
}
