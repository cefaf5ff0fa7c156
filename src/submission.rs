//! Draft submission and rejection classification

use crate::api::errors::{map_rejection, Rejection};
use crate::api::payload::build_payload;
use crate::api::{ApplicationBackend, BackendError};
use crate::models::{ApplicationDraft, SubmissionReceipt};
use crate::steps::WizardMode;
use std::sync::Arc;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum SubmitError {
    /// The backend rejected one or more fields; the user has to correct them
    #[error("Submission rejected: {} field(s) need attention", .0.messages.len())]
    Validation(Rejection),

    /// Network failure, server error or an unreadable response
    #[error("Submission failed: {0}")]
    Unexpected(String),
}

impl From<BackendError> for SubmitError {
    fn from(err: BackendError) -> Self {
        match err {
            BackendError::Rejected(body) => SubmitError::Validation(map_rejection(&body)),
            other => SubmitError::Unexpected(other.to_string()),
        }
    }
}

/// Sends drafts to the backend. Never retries.
#[derive(Clone)]
pub struct SubmissionService {
    backend: Arc<dyn ApplicationBackend>,
}

impl SubmissionService {
    pub fn new(backend: Arc<dyn ApplicationBackend>) -> Self {
        Self { backend }
    }

    pub fn backend(&self) -> &dyn ApplicationBackend {
        self.backend.as_ref()
    }

    /// POST a new application or PATCH an existing one
    pub async fn submit(
        &self,
        draft: &ApplicationDraft,
        mode: &WizardMode,
    ) -> Result<SubmissionReceipt, SubmitError> {
        let payload = build_payload(draft, mode);

        let result = match mode {
            WizardMode::Create => {
                tracing::info!("Creating application ({} fields)", payload.len());
                self.backend.create_application(payload).await
            }
            WizardMode::Edit { tracking_code } => {
                tracing::info!("Resubmitting application {}", tracking_code);
                self.backend.update_application(tracking_code, payload).await
            }
        };

        match result {
            Ok(receipt) => {
                tracing::info!("Application accepted with tracking code {}", receipt.tracking_code);
                Ok(receipt)
            }
            Err(e) => {
                let err = SubmitError::from(e);
                match err {
                    SubmitError::Validation(ref rejection) => tracing::warn!(
                        "Application rejected, fields: {:?}",
                        rejection.errors.keys().collect::<Vec<_>>()
                    ),
                    SubmitError::Unexpected(ref message) => {
                        tracing::error!("Application submission failed: {}", message)
                    }
                }
                Err(err)
            }
        }
    }
}
