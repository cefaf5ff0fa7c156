//! Admission wizard controller
//!
//! Owns the step sequence, the draft and the error map for one editing
//! session, and mediates between the steps and the submission service.
//!
//! ```text
//! LOADING -> READY(i) -> SUBMITTING -> SUCCEEDED | READY(i')
//! LOADING -> ABORTED   (edit-mode fetch failed)
//! ```
//!
//! Failures never escape: they end up in the error map or as a notification
//! to the [`Shell`].

use crate::api::errors::Rejection;
use crate::api::ApplicationBackend;
use crate::config::Config;
use crate::models::{ApplicationDraft, ExistingDocument, FieldUpdate, ValidationErrorMap};
use crate::steps::{first_errored_step, step_sequence, Step, StepView, WizardMode};
use crate::submission::{SubmissionService, SubmitError};
use crate::validation::field_hints;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

// =============================================================================
// Shell contract
// =============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Page {
    ApplicationStatus,
    Dashboard,
}

impl Page {
    pub fn as_str(&self) -> &'static str {
        match self {
            Page::ApplicationStatus => "application-status",
            Page::Dashboard => "dashboard",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Notification {
    Success { title: String },
    Error { title: String, lines: Vec<String> },
}

/// The surrounding application: navigation and toasts
pub trait Shell: Send + Sync {
    fn navigate(&self, page: Page, id: Option<&str>);

    fn back_to_dashboard(&self);

    fn notify(&self, notification: Notification);
}

// =============================================================================
// State
// =============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    Loading,
    Ready,
    Submitting,
    Succeeded,
    Aborted,
}

impl Phase {
    pub fn is_terminal(&self) -> bool {
        matches!(self, Phase::Succeeded | Phase::Aborted)
    }
}

#[derive(Debug, Clone)]
pub struct WizardState {
    pub current_step_index: usize,
    pub draft: ApplicationDraft,
    pub errors: ValidationErrorMap,
    pub is_submitting: bool,
    pub is_loading_initial_data: bool,
    pub phase: Phase,
    pub existing_documents: Vec<ExistingDocument>,
}

/// Result of a call to [`WizardController::submit`]
#[derive(Debug, Clone, PartialEq)]
pub enum SubmitOutcome {
    /// Guard not met: unconfirmed, not on the review step, already in flight or not ready
    Skipped,
    Succeeded { tracking_code: String },
    Rejected(Rejection),
    Failed,
}

const LOAD_FAILED: &str = "Failed to load application data for editing.";
const REJECTED_TITLE: &str = "Submission Failed: Please Review Your Application";
const REJECTED_INTRO: &str =
    "Errors were found in your application. We've taken you to the first step with an issue.";
const UNEXPECTED_TITLE: &str = "An unexpected error occurred";
const UNEXPECTED_HINT: &str = "Please try again later or contact support.";

// =============================================================================
// Controller
// =============================================================================

pub struct WizardController {
    mode: WizardMode,
    steps: Vec<Step>,
    service: SubmissionService,
    shell: Arc<dyn Shell>,
    navigation_delay: Duration,
    max_upload_size: usize,
    state: Mutex<WizardState>,
}

impl WizardController {
    /// Start a session. A present `application_id` selects edit mode, which
    /// stays in `Loading` until [`initialize`](Self::initialize) runs.
    pub fn new(
        backend: Arc<dyn ApplicationBackend>,
        shell: Arc<dyn Shell>,
        application_id: Option<String>,
        config: &Config,
    ) -> Self {
        let mode = WizardMode::from_application_id(application_id);
        let steps = step_sequence(&mode);
        let loading = mode.is_edit();

        Self {
            steps,
            service: SubmissionService::new(backend),
            shell,
            navigation_delay: config.navigation_delay,
            max_upload_size: config.max_upload_size,
            state: Mutex::new(WizardState {
                current_step_index: 0,
                draft: ApplicationDraft::default(),
                errors: ValidationErrorMap::new(),
                is_submitting: false,
                is_loading_initial_data: loading,
                phase: if loading { Phase::Loading } else { Phase::Ready },
                existing_documents: Vec::new(),
            }),
            mode,
        }
    }

    fn state(&self) -> MutexGuard<'_, WizardState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Hydrate the draft in edit mode. A failed fetch ends the session.
    pub async fn initialize(&self) {
        let Some(tracking_code) = self.mode.tracking_code() else {
            return;
        };
        if self.state().phase != Phase::Loading {
            return;
        }

        tracing::info!("Loading application {} for editing", tracking_code);
        match self.service.backend().fetch_application(tracking_code).await {
            Ok(detail) => {
                if let Some(status) = detail.status.filter(|s| !s.allows_resubmission()) {
                    tracing::warn!(
                        "Application {} is {:?}, not awaiting correction",
                        tracking_code,
                        status
                    );
                }
                let (draft, existing_documents) = detail.into_draft();
                let mut state = self.state();
                state.draft = draft;
                state.existing_documents = existing_documents;
                state.is_loading_initial_data = false;
                state.phase = Phase::Ready;
            }
            Err(e) => {
                tracing::error!("Failed to load application {}: {}", tracking_code, e);
                {
                    let mut state = self.state();
                    state.is_loading_initial_data = false;
                    state.phase = Phase::Aborted;
                }
                self.shell.notify(Notification::Error {
                    title: LOAD_FAILED.to_string(),
                    lines: Vec::new(),
                });
                self.shell.back_to_dashboard();
            }
        }
    }

    pub fn mode(&self) -> &WizardMode {
        &self.mode
    }

    pub fn steps(&self) -> &[Step] {
        &self.steps
    }

    pub fn snapshot(&self) -> WizardState {
        self.state().clone()
    }

    pub fn phase(&self) -> Phase {
        self.state().phase
    }

    pub fn current_step_index(&self) -> usize {
        self.state().current_step_index
    }

    pub fn current_step(&self) -> Step {
        self.steps[self.current_step_index()]
    }

    pub fn is_last_step(&self) -> bool {
        self.current_step_index() + 1 == self.steps.len()
    }

    pub fn errors(&self) -> ValidationErrorMap {
        self.state().errors.clone()
    }

    pub fn draft(&self) -> ApplicationDraft {
        self.state().draft.clone()
    }

    /// View for the current step, `None` while loading or after the session ended
    pub fn step_view(&self) -> Option<StepView> {
        let state = self.state();
        if matches!(state.phase, Phase::Loading) || state.phase.is_terminal() {
            return None;
        }
        let hints = field_hints(
            &state.draft,
            self.max_upload_size,
            chrono::Local::now().date_naive(),
        );
        Some(StepView::new(
            self.steps[state.current_step_index],
            &state.draft,
            &state.errors,
            &hints,
            &state.existing_documents,
        ))
    }

    /// Move forward one step. Errors are kept.
    pub fn go_next(&self) -> bool {
        let mut state = self.state();
        if state.phase != Phase::Ready || state.current_step_index + 1 >= self.steps.len() {
            return false;
        }
        state.current_step_index += 1;
        true
    }

    /// Move back one step; going back is never gated
    pub fn go_back(&self) -> bool {
        let mut state = self.state();
        if state.phase != Phase::Ready || state.current_step_index == 0 {
            return false;
        }
        state.current_step_index -= 1;
        true
    }

    /// "Next" button: advances, or submits from the review step
    pub async fn advance(&self) -> Option<SubmitOutcome> {
        if self.is_last_step() {
            Some(self.submit().await)
        } else {
            self.go_next();
            None
        }
    }

    /// Apply an edit and drop the error for that field without re-validating
    pub fn on_input_change(&self, update: FieldUpdate) {
        let mut state = self.state();
        if matches!(state.phase, Phase::Loading) || state.phase.is_terminal() {
            return;
        }
        let key = update.key();
        state.draft.apply(update);
        state.errors.remove(key.as_str());
    }

    /// Abandon the session and return to the dashboard
    pub fn cancel(&self) {
        {
            let mut state = self.state();
            if state.phase.is_terminal() {
                return;
            }
            state.phase = Phase::Aborted;
            state.draft = ApplicationDraft::default();
        }
        tracing::info!("Admission wizard cancelled");
        self.shell.back_to_dashboard();
    }

    /// Submit the draft from the review step. Only one submission is ever in
    /// flight and nothing is sent until the user confirmed the review step.
    pub async fn submit(&self) -> SubmitOutcome {
        let draft = {
            let mut state = self.state();
            if state.phase != Phase::Ready
                || state.is_submitting
                || !state.draft.confirm_submission
                || state.current_step_index + 1 != self.steps.len()
            {
                return SubmitOutcome::Skipped;
            }
            state.is_submitting = true;
            state.phase = Phase::Submitting;
            state.errors.clear();
            state.draft.clone()
        };

        match self.service.submit(&draft, &self.mode).await {
            Ok(receipt) => {
                {
                    let mut state = self.state();
                    state.is_submitting = false;
                    state.phase = Phase::Succeeded;
                }
                let title = if self.mode.is_edit() {
                    "Application Resubmitted Successfully!"
                } else {
                    "Application Submitted Successfully!"
                };
                self.shell.notify(Notification::Success {
                    title: title.to_string(),
                });
                tokio::time::sleep(self.navigation_delay).await;
                self.shell
                    .navigate(Page::ApplicationStatus, Some(&receipt.tracking_code));
                SubmitOutcome::Succeeded {
                    tracking_code: receipt.tracking_code,
                }
            }
            Err(SubmitError::Validation(rejection)) => {
                {
                    let mut state = self.state();
                    state.errors = rejection.errors.clone();
                    if let Some(index) = first_errored_step(&self.steps, &state.errors) {
                        state.current_step_index = index;
                    }
                    state.is_submitting = false;
                    state.phase = Phase::Ready;
                }
                let mut lines = vec![REJECTED_INTRO.to_string()];
                lines.extend(rejection.messages.iter().map(|m| m.to_string()));
                self.shell.notify(Notification::Error {
                    title: REJECTED_TITLE.to_string(),
                    lines,
                });
                SubmitOutcome::Rejected(rejection)
            }
            Err(SubmitError::Unexpected(_)) => {
                {
                    let mut state = self.state();
                    state.is_submitting = false;
                    state.phase = Phase::Ready;
                }
                self.shell.notify(Notification::Error {
                    title: UNEXPECTED_TITLE.to_string(),
                    lines: vec![UNEXPECTED_HINT.to_string()],
                });
                SubmitOutcome::Failed
            }
        }
    }
}

// =============================================================================
// Shells
// =============================================================================

/// Shell that reports everything through `tracing`
#[derive(Debug, Default)]
pub struct LoggingShell;

impl Shell for LoggingShell {
    fn navigate(&self, page: Page, id: Option<&str>) {
        tracing::info!("Navigate to {} ({})", page.as_str(), id.unwrap_or("-"));
    }

    fn back_to_dashboard(&self) {
        tracing::info!("Navigate to {}", Page::Dashboard.as_str());
    }

    fn notify(&self, notification: Notification) {
        match notification {
            Notification::Success { title } => tracing::info!("{}", title),
            Notification::Error { title, lines } => {
                tracing::error!("{}", title);
                for line in lines {
                    tracing::error!("  {}", line);
                }
            }
        }
    }
}

/// Shell that records every call, for tests and scripted runs
#[derive(Debug, Default)]
pub struct RecordingShell {
    navigations: Mutex<Vec<(Page, Option<String>)>>,
    notifications: Mutex<Vec<Notification>>,
}

impl RecordingShell {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn navigations(&self) -> Vec<(Page, Option<String>)> {
        self.navigations
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    pub fn notifications(&self) -> Vec<Notification> {
        self.notifications
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }
}

impl Shell for RecordingShell {
    fn navigate(&self, page: Page, id: Option<&str>) {
        self.navigations
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push((page, id.map(str::to_string)));
    }

    fn back_to_dashboard(&self) {
        self.navigate(Page::Dashboard, None);
    }

    fn notify(&self, notification: Notification) {
        self.notifications
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(notification);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fake_backend::{FakeBackend, FakeOutcome};
    use crate::models::FieldKey;
    use serde_json::json;

    fn config() -> Config {
        Config {
            navigation_delay: Duration::ZERO,
            ..Default::default()
        }
    }

    fn create_wizard(backend: Arc<FakeBackend>) -> (WizardController, Arc<RecordingShell>) {
        let shell = Arc::new(RecordingShell::new());
        let wizard = WizardController::new(backend, shell.clone(), None, &config());
        (wizard, shell)
    }

    #[test]
    fn test_create_mode_is_ready_immediately() {
        let (wizard, _) = create_wizard(Arc::new(FakeBackend::accepting("T-1")));
        let state = wizard.snapshot();
        assert_eq!(state.phase, Phase::Ready);
        assert!(!state.is_loading_initial_data);
        assert_eq!(wizard.steps().len(), 5);
        assert_eq!(wizard.current_step(), Step::PersonalInfo);
    }

    #[test]
    fn test_navigation_is_clamped() {
        let (wizard, _) = create_wizard(Arc::new(FakeBackend::accepting("T-1")));
        assert!(!wizard.go_back());
        for _ in 0..4 {
            assert!(wizard.go_next());
        }
        assert!(!wizard.go_next());
        assert_eq!(wizard.current_step(), Step::Review);
        assert!(wizard.go_back());
        assert_eq!(wizard.current_step(), Step::DocumentUpload);
    }

    #[test]
    fn test_navigation_keeps_errors() {
        let backend = Arc::new(FakeBackend::new(FakeOutcome::Reject(json!({"email": ["Bad."]}))));
        let (wizard, _) = create_wizard(backend);
        while wizard.go_next() {}
        wizard.on_input_change(FieldUpdate::ConfirmSubmission(true));
        tokio_test::block_on(wizard.submit());
        assert_eq!(wizard.current_step(), Step::PersonalInfo);

        wizard.go_next();
        wizard.go_back();
        assert_eq!(wizard.errors().get("email"), Some("Bad."));
    }

    #[test]
    fn test_input_change_clears_only_that_field() {
        let backend = Arc::new(FakeBackend::new(FakeOutcome::Reject(json!({
            "email": ["Enter a valid email address."],
            "full_name": ["This field may not be blank."]
        }))));
        let (wizard, _) = create_wizard(backend);
        while wizard.go_next() {}
        wizard.on_input_change(FieldUpdate::ConfirmSubmission(true));
        tokio_test::block_on(wizard.submit());
        assert_eq!(wizard.errors().len(), 2);

        wizard.on_input_change(FieldUpdate::Email(String::new()));
        let errors = wizard.errors();
        assert!(!errors.contains(FieldKey::Email.as_str()));
        assert_eq!(errors.get("fullName"), Some("This field may not be blank."));
        assert!(wizard.draft().email.is_empty());
    }

    #[test]
    fn test_step_view_hides_other_steps_errors() {
        let backend = Arc::new(FakeBackend::new(FakeOutcome::Reject(json!({
            "documents": ["At least one document is required."]
        }))));
        let (wizard, _) = create_wizard(backend);
        while wizard.go_next() {}
        wizard.on_input_change(FieldUpdate::ConfirmSubmission(true));
        tokio_test::block_on(wizard.submit());

        let view = wizard.step_view().unwrap();
        assert_eq!(view.step, Step::DocumentUpload);
        assert_eq!(
            view.error(FieldKey::DocumentUploads),
            Some("At least one document is required.")
        );
        wizard.go_back();
        assert!(wizard.step_view().unwrap().errors().is_empty());
    }

    #[test]
    fn test_submit_only_from_review_step() {
        let backend = Arc::new(FakeBackend::accepting("T-1"));
        let (wizard, shell) = create_wizard(backend.clone());
        wizard.on_input_change(FieldUpdate::ConfirmSubmission(true));

        for _ in 0..4 {
            assert_eq!(tokio_test::block_on(wizard.submit()), SubmitOutcome::Skipped);
            wizard.go_next();
        }
        assert_eq!(backend.submit_count(), 0);
        assert!(shell.notifications().is_empty());
        assert_eq!(wizard.phase(), Phase::Ready);

        assert_eq!(
            tokio_test::block_on(wizard.submit()),
            SubmitOutcome::Succeeded {
                tracking_code: "T-1".to_string()
            }
        );
        assert_eq!(backend.create_count(), 1);
    }

    #[test]
    fn test_cancel_returns_to_dashboard() {
        let (wizard, shell) = create_wizard(Arc::new(FakeBackend::accepting("T-1")));
        wizard.on_input_change(FieldUpdate::FullName("Sara".to_string()));
        wizard.cancel();
        assert_eq!(wizard.phase(), Phase::Aborted);
        assert!(wizard.draft().full_name.is_empty());
        assert_eq!(shell.navigations(), vec![(Page::Dashboard, None)]);
        assert!(wizard.step_view().is_none());
    }

    #[test]
    fn test_unexpected_failure_keeps_position_and_draft() {
        let backend = Arc::new(FakeBackend::new(FakeOutcome::Fail(500)));
        let (wizard, shell) = create_wizard(backend.clone());
        for _ in 0..4 {
            wizard.go_next();
        }
        wizard.on_input_change(FieldUpdate::FullName("Sara".to_string()));
        wizard.on_input_change(FieldUpdate::ConfirmSubmission(true));

        let outcome = tokio_test::block_on(wizard.submit());
        assert_eq!(outcome, SubmitOutcome::Failed);
        let state = wizard.snapshot();
        assert_eq!(state.phase, Phase::Ready);
        assert!(!state.is_submitting);
        assert_eq!(state.current_step_index, 4);
        assert!(state.errors.is_empty());
        assert_eq!(state.draft.full_name, "Sara");
        assert!(shell.navigations().is_empty());
        assert_eq!(
            shell.notifications(),
            vec![Notification::Error {
                title: UNEXPECTED_TITLE.to_string(),
                lines: vec![UNEXPECTED_HINT.to_string()],
            }]
        );

        backend.set_outcome(FakeOutcome::Accept("T-2".to_string()));
        let retry = tokio_test::block_on(wizard.submit());
        assert_eq!(
            retry,
            SubmitOutcome::Succeeded {
                tracking_code: "T-2".to_string()
            }
        );
        assert_eq!(backend.create_count(), 2);
    }
}
