//! Wizard steps and the per-step view contract
//!
//! Each step owns a fixed set of draft fields. The view handed to a step is a
//! pure derivation of the draft, the error map and (for document upload) the
//! documents already stored on the server.

use crate::models::{
    AcademicRecord, ApplicationDraft, DocumentUpload, ExistingDocument, FieldKey,
    UniversityProgram, ValidationErrorMap,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Step {
    PersonalInfo,
    AcademicHistory,
    UniversityProgram,
    DocumentUpload,
    Review,
}

impl Step {
    /// Full sequence used when creating a new application
    pub const ALL: [Step; 5] = [
        Step::PersonalInfo,
        Step::AcademicHistory,
        Step::UniversityProgram,
        Step::DocumentUpload,
        Step::Review,
    ];

    pub fn label(&self) -> &'static str {
        match self {
            Step::PersonalInfo => "Personal Information",
            Step::AcademicHistory => "Academic History",
            Step::UniversityProgram => "University & Program",
            Step::DocumentUpload => "Document Upload",
            Step::Review => "Review & Submit",
        }
    }

    /// Draft fields edited on this step
    pub fn fields(&self) -> &'static [FieldKey] {
        match self {
            Step::PersonalInfo => &[
                FieldKey::FullName,
                FieldKey::FatherName,
                FieldKey::GrandfatherName,
                FieldKey::BirthDate,
                FieldKey::Nationality,
                FieldKey::Email,
            ],
            Step::AcademicHistory => &[FieldKey::AcademicRecords],
            Step::UniversityProgram => &[FieldKey::UniversityPrograms],
            Step::DocumentUpload => &[FieldKey::DocumentUploads],
            Step::Review => &[FieldKey::ConfirmSubmission],
        }
    }

    pub fn owns(&self, key: &str) -> bool {
        self.fields().iter().any(|f| f.as_str() == key)
    }
}

/// Whether the wizard creates a new application or resubmits an existing one
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WizardMode {
    Create,
    Edit { tracking_code: String },
}

impl WizardMode {
    /// Edit mode when a non-empty application identifier is supplied
    pub fn from_application_id(application_id: Option<String>) -> Self {
        match application_id {
            Some(code) if !code.is_empty() => WizardMode::Edit {
                tracking_code: code,
            },
            _ => WizardMode::Create,
        }
    }

    pub fn is_edit(&self) -> bool {
        matches!(self, WizardMode::Edit { .. })
    }

    pub fn tracking_code(&self) -> Option<&str> {
        match self {
            WizardMode::Create => None,
            WizardMode::Edit { tracking_code } => Some(tracking_code),
        }
    }
}

/// Steps shown for a mode. University choices are frozen once an application
/// is under review, so edit mode skips that step.
pub fn step_sequence(mode: &WizardMode) -> Vec<Step> {
    Step::ALL
        .into_iter()
        .filter(|step| !(mode.is_edit() && *step == Step::UniversityProgram))
        .collect()
}

/// Index of the earliest step in `steps` that owns at least one errored field
pub fn first_errored_step(steps: &[Step], errors: &ValidationErrorMap) -> Option<usize> {
    steps
        .iter()
        .position(|step| errors.keys().any(|key| step.owns(key)))
}

// =============================================================================
// Review summary
// =============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MissingGroup {
    PersonalInfo,
    AcademicRecords,
    UniversityPrograms,
}

impl MissingGroup {
    pub fn message(&self) -> &'static str {
        match self {
            MissingGroup::PersonalInfo => "Personal information is incomplete",
            MissingGroup::AcademicRecords => "One or more academic records are incomplete",
            MissingGroup::UniversityPrograms => "One or more university choices are incomplete",
        }
    }
}

/// Advisory completeness check shown on the review step
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReviewSummary {
    pub missing: Vec<MissingGroup>,
}

impl ReviewSummary {
    pub fn of(draft: &ApplicationDraft) -> Self {
        let mut missing = Vec::new();

        let personal = [
            &draft.full_name,
            &draft.father_name,
            &draft.birth_date,
            &draft.nationality,
            &draft.email,
        ];
        if personal.iter().any(|v| v.is_empty()) {
            missing.push(MissingGroup::PersonalInfo);
        }

        if draft.academic_records.is_empty()
            || !draft.academic_records.iter().all(AcademicRecord::is_complete)
        {
            missing.push(MissingGroup::AcademicRecords);
        }

        if draft.university_programs.is_empty()
            || !draft.university_programs.iter().all(UniversityProgram::is_complete)
        {
            missing.push(MissingGroup::UniversityPrograms);
        }

        Self { missing }
    }

    pub fn is_complete(&self) -> bool {
        self.missing.is_empty()
    }
}

// =============================================================================
// Step view
// =============================================================================

/// What a step needs to render: its slice of the draft and its errors
#[derive(Debug, Clone)]
pub struct StepView {
    pub step: Step,
    pub draft: ApplicationDraft,
    errors: ValidationErrorMap,
    hints: ValidationErrorMap,
    existing_documents: Vec<ExistingDocument>,
}

impl StepView {
    pub fn new(
        step: Step,
        draft: &ApplicationDraft,
        errors: &ValidationErrorMap,
        hints: &ValidationErrorMap,
        existing_documents: &[ExistingDocument],
    ) -> Self {
        Self {
            step,
            draft: draft.clone(),
            errors: owned_entries(step, errors),
            hints: owned_entries(step, hints),
            existing_documents: if step == Step::DocumentUpload {
                existing_documents.to_vec()
            } else {
                Vec::new()
            },
        }
    }

    /// Server error shown beneath a field of this step
    pub fn error(&self, key: FieldKey) -> Option<&str> {
        self.errors.get(key.as_str())
    }

    /// Client-side hint for a field of this step
    pub fn hint(&self, key: FieldKey) -> Option<&str> {
        self.hints.get(key.as_str())
    }

    pub fn errors(&self) -> &ValidationErrorMap {
        &self.errors
    }

    pub fn hints(&self) -> &ValidationErrorMap {
        &self.hints
    }

    /// Documents already on file; only populated for the upload step
    pub fn existing_documents(&self) -> &[ExistingDocument] {
        &self.existing_documents
    }

    pub fn academic_records(&self) -> &[AcademicRecord] {
        &self.draft.academic_records
    }

    pub fn university_programs(&self) -> Vec<&UniversityProgram> {
        self.draft.sorted_programs()
    }

    pub fn document_uploads(&self) -> &[DocumentUpload] {
        &self.draft.document_uploads
    }

    pub fn shows_grandfather_name(&self) -> bool {
        self.step == Step::PersonalInfo && self.draft.asks_grandfather_name()
    }

    pub fn review_summary(&self) -> Option<ReviewSummary> {
        (self.step == Step::Review).then(|| ReviewSummary::of(&self.draft))
    }
}

fn owned_entries(step: Step, map: &ValidationErrorMap) -> ValidationErrorMap {
    let mut owned = ValidationErrorMap::new();
    for (key, message) in map.iter().filter(|(key, _)| step.owns(key)) {
        owned.insert(key, message);
    }
    owned
}
