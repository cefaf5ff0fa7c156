//! Admissions backend access
//!
//! The backend is an external collaborator reached through
//! [`ApplicationBackend`]. [`HttpBackend`] talks to the REST API; tests swap
//! in fakes.

pub mod errors;
pub mod http;
pub mod payload;

pub use http::HttpBackend;
pub use payload::{MultipartPayload, PayloadValue};

use crate::models::{ApplicationDetail, SubmissionReceipt};
use async_trait::async_trait;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum BackendError {
    /// HTTP 400 with a field-keyed body
    #[error("Request rejected with validation errors")]
    Rejected(serde_json::Value),

    #[error("Unexpected response status {status}")]
    Status { status: u16, body: String },

    #[error("Transport error: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("Malformed response: {0}")]
    Decode(String),

    #[error("Invalid API base URL: {0}")]
    InvalidBaseUrl(String),
}

#[async_trait]
pub trait ApplicationBackend: Send + Sync {
    /// `GET /v1/applications/{tracking_code}/`
    async fn fetch_application(&self, tracking_code: &str) -> Result<ApplicationDetail, BackendError>;

    /// `POST /v1/applications/`
    async fn create_application(&self, payload: MultipartPayload) -> Result<SubmissionReceipt, BackendError>;

    /// `PATCH /v1/applications/{tracking_code}/`
    async fn update_application(
        &self,
        tracking_code: &str,
        payload: MultipartPayload,
    ) -> Result<SubmissionReceipt, BackendError>;
}
