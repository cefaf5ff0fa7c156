//! Draft to multipart payload
//!
//! Nested lists are flattened into `name[i]field` keys, the convention the
//! admissions backend parses. A record's `id` is only sent for rows the
//! backend already knows; leaving it out tells the backend to create the row.

use crate::models::{ApplicationDraft, AttachedFile, RecordId};
use crate::steps::WizardMode;

#[derive(Debug, Clone, PartialEq)]
pub enum PayloadValue {
    Text(String),
    File(AttachedFile),
}

/// Ordered multipart fields, independent of the HTTP client
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MultipartPayload {
    fields: Vec<(String, PayloadValue)>,
}

impl MultipartPayload {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn text(&mut self, name: impl Into<String>, value: impl Into<String>) {
        self.fields.push((name.into(), PayloadValue::Text(value.into())));
    }

    pub fn file(&mut self, name: impl Into<String>, file: AttachedFile) {
        self.fields.push((name.into(), PayloadValue::File(file)));
    }

    pub fn fields(&self) -> &[(String, PayloadValue)] {
        &self.fields
    }

    pub fn into_fields(self) -> Vec<(String, PayloadValue)> {
        self.fields
    }

    /// First text value sent under `name`
    pub fn get_text(&self, name: &str) -> Option<&str> {
        self.fields.iter().find_map(|(n, v)| match v {
            PayloadValue::Text(text) if n == name => Some(text.as_str()),
            _ => None,
        })
    }

    pub fn contains(&self, name: &str) -> bool {
        self.fields.iter().any(|(n, _)| n == name)
    }

    /// Names of every field starting with `prefix`
    pub fn names_with_prefix<'a>(&'a self, prefix: &'a str) -> impl Iterator<Item = &'a str> + 'a {
        self.fields
            .iter()
            .map(|(n, _)| n.as_str())
            .filter(move |n| n.starts_with(prefix))
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    pub fn file_count(&self) -> usize {
        self.fields
            .iter()
            .filter(|(_, v)| matches!(v, PayloadValue::File(_)))
            .count()
    }
}

fn sends_id(mode: &WizardMode, id: &RecordId) -> bool {
    mode.is_edit() && id.is_server_assigned()
}

/// Build the create or update payload for a draft
pub fn build_payload(draft: &ApplicationDraft, mode: &WizardMode) -> MultipartPayload {
    let mut payload = MultipartPayload::new();

    payload.text("full_name", &draft.full_name);
    payload.text("father_name", &draft.father_name);
    payload.text("date_of_birth", &draft.birth_date);
    payload.text("country_of_residence", &draft.nationality);
    payload.text("email", &draft.email);
    if !draft.grandfather_name.is_empty() {
        payload.text("grandfather_name", &draft.grandfather_name);
    }

    for (index, record) in draft.academic_records.iter().enumerate() {
        let prefix = format!("academic_histories[{}]", index);
        if sends_id(mode, &record.id) {
            payload.text(format!("{}id", prefix), record.id.as_str());
        }
        payload.text(format!("{}degree_level", prefix), &record.degree);
        payload.text(format!("{}country", prefix), &record.country);
        payload.text(format!("{}university_name", prefix), &record.university);
        payload.text(format!("{}field_of_study", prefix), &record.field);
        payload.text(format!("{}gpa", prefix), &record.gpa);
    }

    for (index, choice) in draft.sorted_programs().into_iter().enumerate() {
        let prefix = format!("university_choices[{}]", index);
        if sends_id(mode, &choice.id) {
            payload.text(format!("{}id", prefix), choice.id.as_str());
        }
        if let Some(university_id) = choice.university_id {
            payload.text(format!("{}university_id", prefix), university_id.to_string());
        }
        if let Some(program_id) = choice.field_id {
            payload.text(format!("{}program_id", prefix), program_id.to_string());
        }
        payload.text(format!("{}priority", prefix), choice.priority.to_string());
    }

    for (index, row) in draft.document_uploads.iter().enumerate() {
        // Half-filled rows are dropped silently
        let Some(file) = row.file.as_ref().filter(|_| row.is_ready()) else {
            continue;
        };
        payload.text(format!("documents[{}]document_type", index), &row.document_type);
        payload.file(format!("documents[{}]file", index), file.clone());
    }

    if !mode.is_edit() {
        payload.text("application_type", draft.application_type.as_wire());
    }

    payload
}
