//! Admission Application Wizard
//!
//! Client-side core of the student admissions portal: a multi-step
//! application wizard that hydrates drafts, submits them as multipart
//! requests and maps backend validation rejections back onto the steps.
//!
//! ## Features
//!
//! - **Wizard Controller**: step sequence per mode, navigation, submission
//! - **Submission Service**: payload building, create/update dispatch
//! - **Error Mapping**: nested backend errors flattened onto draft fields

pub mod api;
pub mod config;
pub mod fake_backend;
pub mod models;
pub mod steps;
pub mod submission;
pub mod validation;
pub mod wizard;

pub use api::{ApplicationBackend, BackendError, HttpBackend};
pub use config::Config;
pub use models::{ApplicationDraft, FieldKey, FieldUpdate, ValidationErrorMap};
pub use steps::{Step, StepView, WizardMode};
pub use wizard::{Notification, Page, Phase, Shell, SubmitOutcome, WizardController};
