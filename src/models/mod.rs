//! Data models for the admission wizard

use serde::{Deserialize, Deserializer, Serialize};
use std::collections::BTreeMap;
use uuid::Uuid;

// =============================================================================
// Enums
// =============================================================================

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ApplicationType {
    #[default]
    NewAdmission,
}

impl ApplicationType {
    /// Tag sent to the backend when an application is created
    pub fn as_wire(&self) -> &'static str {
        match self {
            ApplicationType::NewAdmission => "NEW_ADMISSION",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ApplicationStatus {
    PendingReview,
    PendingCorrection,
    Approved,
    Rejected,
    #[serde(other)]
    Unknown,
}

impl ApplicationStatus {
    /// Only applications sent back for correction may be edited and resubmitted
    pub fn allows_resubmission(&self) -> bool {
        matches!(self, ApplicationStatus::PendingCorrection)
    }
}

// =============================================================================
// Identifiers and attachments
// =============================================================================

/// Identifier of an academic record, university choice or document row.
///
/// Ids handed out by the backend are numeric; ids minted locally for rows the
/// user added are UUIDs and never parse as a number.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RecordId(String);

impl RecordId {
    pub fn new_local() -> Self {
        Self(Uuid::new_v4().to_string())
    }

    pub fn from_server(id: i64) -> Self {
        Self(id.to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// True when the id was assigned by the backend (numeric)
    pub fn is_server_assigned(&self) -> bool {
        !self.0.is_empty() && self.0.parse::<i64>().is_ok()
    }
}

impl From<&str> for RecordId {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

impl From<String> for RecordId {
    fn from(value: String) -> Self {
        Self(value)
    }
}

impl std::fmt::Display for RecordId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// A file picked by the user, held in memory until submission
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AttachedFile {
    pub file_name: String,
    pub content_type: Option<String>,
    pub bytes: Vec<u8>,
}

impl AttachedFile {
    pub fn new(file_name: impl Into<String>, bytes: Vec<u8>) -> Self {
        Self {
            file_name: file_name.into(),
            content_type: None,
            bytes,
        }
    }

    pub fn with_content_type(mut self, content_type: impl Into<String>) -> Self {
        self.content_type = Some(content_type.into());
        self
    }

    /// Declared content type, or the one detected from the file's magic bytes
    pub fn mime_type(&self) -> String {
        if let Some(ref declared) = self.content_type {
            return declared.clone();
        }
        infer::get(&self.bytes)
            .map(|kind| kind.mime_type().to_string())
            .unwrap_or_else(|| "application/octet-stream".to_string())
    }

    pub fn size(&self) -> usize {
        self.bytes.len()
    }
}

// =============================================================================
// Draft
// =============================================================================

#[derive(Debug, Clone, PartialEq)]
pub struct AcademicRecord {
    pub id: RecordId,
    pub degree: String,
    pub country: String,
    pub university: String,
    pub field: String,
    pub gpa: String,
    pub document_file: Option<AttachedFile>,
}

impl AcademicRecord {
    /// An empty record with a freshly minted local id
    pub fn new_local() -> Self {
        Self {
            id: RecordId::new_local(),
            degree: String::new(),
            country: String::new(),
            university: String::new(),
            field: String::new(),
            gpa: String::new(),
            document_file: None,
        }
    }

    pub fn is_complete(&self) -> bool {
        !self.degree.is_empty()
            && !self.university.is_empty()
            && !self.field.is_empty()
            && !self.gpa.is_empty()
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct UniversityProgram {
    pub id: RecordId,
    /// Rank of the choice, 1 is the first choice
    pub priority: u32,
    pub university: String,
    pub university_id: Option<i64>,
    pub field: String,
    pub field_id: Option<i64>,
}

impl UniversityProgram {
    pub fn new_local(priority: u32) -> Self {
        Self {
            id: RecordId::new_local(),
            priority,
            university: String::new(),
            university_id: None,
            field: String::new(),
            field_id: None,
        }
    }

    pub fn is_complete(&self) -> bool {
        !self.university.is_empty() && !self.field.is_empty()
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct DocumentUpload {
    pub id: RecordId,
    pub document_type: String,
    pub file: Option<AttachedFile>,
}

impl DocumentUpload {
    pub fn new_local() -> Self {
        Self {
            id: RecordId::new_local(),
            document_type: String::new(),
            file: None,
        }
    }

    /// A row is only sent when both a type and a file were chosen
    pub fn is_ready(&self) -> bool {
        self.file.is_some() && !self.document_type.is_empty()
    }
}

/// The in-progress admission application held by the wizard
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ApplicationDraft {
    pub application_type: ApplicationType,
    pub full_name: String,
    pub father_name: String,
    pub grandfather_name: String,
    pub birth_date: String,
    pub nationality: String,
    pub email: String,
    pub academic_records: Vec<AcademicRecord>,
    pub university_programs: Vec<UniversityProgram>,
    pub document_uploads: Vec<DocumentUpload>,
    pub confirm_submission: bool,
}

impl ApplicationDraft {
    /// Replace one field of the draft
    pub fn apply(&mut self, update: FieldUpdate) {
        match update {
            FieldUpdate::FullName(v) => self.full_name = v,
            FieldUpdate::FatherName(v) => self.father_name = v,
            FieldUpdate::GrandfatherName(v) => self.grandfather_name = v,
            FieldUpdate::BirthDate(v) => self.birth_date = v,
            FieldUpdate::Nationality(v) => self.nationality = v,
            FieldUpdate::Email(v) => self.email = v,
            FieldUpdate::AcademicRecords(v) => self.academic_records = v,
            FieldUpdate::UniversityPrograms(v) => self.university_programs = v,
            FieldUpdate::DocumentUploads(v) => self.document_uploads = v,
            FieldUpdate::ConfirmSubmission(v) => self.confirm_submission = v,
        }
    }

    /// The grandfather's name is only asked for Afghan residents
    pub fn asks_grandfather_name(&self) -> bool {
        self.nationality == "afghan"
    }

    /// University choices ordered by priority (first choice first)
    pub fn sorted_programs(&self) -> Vec<&UniversityProgram> {
        let mut programs: Vec<&UniversityProgram> = self.university_programs.iter().collect();
        programs.sort_by_key(|p| p.priority);
        programs
    }

    pub fn academic_records_with_new(&self) -> Vec<AcademicRecord> {
        let mut records = self.academic_records.clone();
        records.push(AcademicRecord::new_local());
        records
    }

    pub fn academic_records_without(&self, id: &RecordId) -> Vec<AcademicRecord> {
        self.academic_records
            .iter()
            .filter(|r| &r.id != id)
            .cloned()
            .collect()
    }

    /// Adds a choice ranked after every existing one
    pub fn university_programs_with_new(&self) -> Vec<UniversityProgram> {
        let next = self
            .university_programs
            .iter()
            .map(|p| p.priority)
            .max()
            .unwrap_or(0)
            + 1;
        let mut programs = self.university_programs.clone();
        programs.push(UniversityProgram::new_local(next));
        programs
    }

    pub fn university_programs_without(&self, id: &RecordId) -> Vec<UniversityProgram> {
        self.university_programs
            .iter()
            .filter(|p| &p.id != id)
            .cloned()
            .collect()
    }

    pub fn document_uploads_with_new_row(&self) -> Vec<DocumentUpload> {
        let mut rows = self.document_uploads.clone();
        rows.push(DocumentUpload::new_local());
        rows
    }

    /// Removes a row unless it is the last one
    pub fn document_uploads_without(&self, id: &RecordId) -> Vec<DocumentUpload> {
        if self.document_uploads.len() <= 1 {
            return self.document_uploads.clone();
        }
        self.document_uploads
            .iter()
            .filter(|d| &d.id != id)
            .cloned()
            .collect()
    }
}

// =============================================================================
// Field keys and updates
// =============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FieldKey {
    FullName,
    FatherName,
    GrandfatherName,
    BirthDate,
    Nationality,
    Email,
    AcademicRecords,
    UniversityPrograms,
    DocumentUploads,
    ConfirmSubmission,
}

impl FieldKey {
    pub const ALL: [FieldKey; 10] = [
        FieldKey::FullName,
        FieldKey::FatherName,
        FieldKey::GrandfatherName,
        FieldKey::BirthDate,
        FieldKey::Nationality,
        FieldKey::Email,
        FieldKey::AcademicRecords,
        FieldKey::UniversityPrograms,
        FieldKey::DocumentUploads,
        FieldKey::ConfirmSubmission,
    ];

    /// Key used in the validation error map
    pub fn as_str(&self) -> &'static str {
        match self {
            FieldKey::FullName => "fullName",
            FieldKey::FatherName => "fatherName",
            FieldKey::GrandfatherName => "grandfatherName",
            FieldKey::BirthDate => "birthDate",
            FieldKey::Nationality => "nationality",
            FieldKey::Email => "email",
            FieldKey::AcademicRecords => "academicRecords",
            FieldKey::UniversityPrograms => "universityPrograms",
            FieldKey::DocumentUploads => "documentUploads",
            FieldKey::ConfirmSubmission => "confirmSubmission",
        }
    }

    pub fn parse(key: &str) -> Option<FieldKey> {
        FieldKey::ALL.into_iter().find(|k| k.as_str() == key)
    }
}

/// A single edit raised by a step
#[derive(Debug, Clone, PartialEq)]
pub enum FieldUpdate {
    FullName(String),
    FatherName(String),
    GrandfatherName(String),
    BirthDate(String),
    Nationality(String),
    Email(String),
    AcademicRecords(Vec<AcademicRecord>),
    UniversityPrograms(Vec<UniversityProgram>),
    DocumentUploads(Vec<DocumentUpload>),
    ConfirmSubmission(bool),
}

impl FieldUpdate {
    pub fn key(&self) -> FieldKey {
        match self {
            FieldUpdate::FullName(_) => FieldKey::FullName,
            FieldUpdate::FatherName(_) => FieldKey::FatherName,
            FieldUpdate::GrandfatherName(_) => FieldKey::GrandfatherName,
            FieldUpdate::BirthDate(_) => FieldKey::BirthDate,
            FieldUpdate::Nationality(_) => FieldKey::Nationality,
            FieldUpdate::Email(_) => FieldKey::Email,
            FieldUpdate::AcademicRecords(_) => FieldKey::AcademicRecords,
            FieldUpdate::UniversityPrograms(_) => FieldKey::UniversityPrograms,
            FieldUpdate::DocumentUploads(_) => FieldKey::DocumentUploads,
            FieldUpdate::ConfirmSubmission(_) => FieldKey::ConfirmSubmission,
        }
    }
}

// =============================================================================
// Validation errors
// =============================================================================

/// Field key to message. Keys are draft field keys, or raw backend keys the
/// wizard has no mapping for.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ValidationErrorMap(BTreeMap<String, String>);

impl ValidationErrorMap {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, key: impl Into<String>, message: impl Into<String>) {
        self.0.insert(key.into(), message.into());
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.0.get(key).map(String::as_str)
    }

    pub fn remove(&mut self, key: &str) -> Option<String> {
        self.0.remove(key)
    }

    pub fn contains(&self, key: &str) -> bool {
        self.0.contains_key(key)
    }

    pub fn clear(&mut self) {
        self.0.clear();
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.0.keys().map(String::as_str)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.0.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }
}

// =============================================================================
// Wire DTOs
// =============================================================================

/// A document already stored for an application being edited
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExistingDocument {
    pub document_type: String,
    #[serde(rename = "file")]
    pub file_url: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct NamedRef {
    pub id: i64,
    #[serde(default)]
    pub name: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct AcademicHistoryDetail {
    pub id: i64,
    #[serde(default, deserialize_with = "string_or_number")]
    pub degree_level: String,
    #[serde(default, deserialize_with = "string_or_number")]
    pub country: String,
    #[serde(default, deserialize_with = "string_or_number")]
    pub university_name: String,
    #[serde(default, deserialize_with = "string_or_number")]
    pub field_of_study: String,
    #[serde(default, deserialize_with = "string_or_number")]
    pub gpa: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct UniversityChoiceDetail {
    pub id: i64,
    pub priority: u32,
    pub university: NamedRef,
    pub program: NamedRef,
}

/// Application detail as returned by `GET /v1/applications/{code}/`
#[derive(Debug, Clone, Deserialize)]
pub struct ApplicationDetail {
    #[serde(default)]
    pub tracking_code: Option<String>,
    #[serde(default)]
    pub status: Option<ApplicationStatus>,
    #[serde(default, deserialize_with = "string_or_number")]
    pub full_name: String,
    #[serde(default, deserialize_with = "string_or_number")]
    pub father_name: String,
    #[serde(default, deserialize_with = "string_or_number")]
    pub grandfather_name: String,
    #[serde(default, deserialize_with = "string_or_number")]
    pub date_of_birth: String,
    #[serde(default, deserialize_with = "string_or_number")]
    pub country_of_residence: String,
    #[serde(default, deserialize_with = "string_or_number")]
    pub email: String,
    #[serde(default)]
    pub academic_histories: Vec<AcademicHistoryDetail>,
    #[serde(default)]
    pub university_choices: Vec<UniversityChoiceDetail>,
    #[serde(default)]
    pub documents: Vec<ExistingDocument>,
}

impl ApplicationDetail {
    /// Split the detail into an editable draft and the read-only documents
    pub fn into_draft(self) -> (ApplicationDraft, Vec<ExistingDocument>) {
        let draft = ApplicationDraft {
            application_type: ApplicationType::NewAdmission,
            full_name: self.full_name,
            father_name: self.father_name,
            grandfather_name: self.grandfather_name,
            birth_date: self.date_of_birth,
            nationality: self.country_of_residence,
            email: self.email,
            academic_records: self
                .academic_histories
                .into_iter()
                .map(|h| AcademicRecord {
                    id: RecordId::from_server(h.id),
                    degree: h.degree_level,
                    country: h.country,
                    university: h.university_name,
                    field: h.field_of_study,
                    gpa: h.gpa,
                    document_file: None,
                })
                .collect(),
            university_programs: self
                .university_choices
                .into_iter()
                .map(|c| UniversityProgram {
                    id: RecordId::from_server(c.id),
                    priority: c.priority,
                    university: c.university.name,
                    university_id: Some(c.university.id),
                    field: c.program.name,
                    field_id: Some(c.program.id),
                })
                .collect(),
            document_uploads: Vec::new(),
            confirm_submission: false,
        };
        (draft, self.documents)
    }
}

/// Body of a successful create or update
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SubmissionReceipt {
    pub tracking_code: String,
}

/// Accepts a string, a number or null and yields a string
fn string_or_number<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<serde_json::Value>::deserialize(deserializer)?;
    Ok(match value {
        None | Some(serde_json::Value::Null) => String::new(),
        Some(serde_json::Value::String(s)) => s,
        Some(other) => other.to_string(),
    })
}
