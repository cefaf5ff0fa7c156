//! Client-side input checks
//!
//! These never block navigation or submission. They produce hints shown next
//! to a field while the user types; the backend remains the authority and its
//! rejections are mapped separately in [`crate::api::errors`].

use crate::models::{ApplicationDraft, AttachedFile, FieldKey, UniversityProgram, ValidationErrorMap};
use chrono::NaiveDate;
use std::collections::HashSet;
use thiserror::Error;

#[derive(Debug, Error, PartialEq)]
pub enum ValidationError {
    #[error("Please enter a valid email address.")]
    InvalidEmail,

    #[error("Enter the date as YYYY-MM-DD.")]
    InvalidDate,

    #[error("Date of birth cannot be in the future.")]
    FutureDate,

    #[error("GPA must be a number.")]
    InvalidGpa,

    #[error("Priority {priority} is used by more than one choice.")]
    DuplicatePriority { priority: u32 },

    #[error("Invalid file type: {mime_type} (allowed: PDF, JPEG, PNG)")]
    InvalidFileType { mime_type: String },

    #[error("File too large (max {max_mb} MB)")]
    FileTooLarge { max_mb: usize },
}

/// MIME types the upload rows accept
const ALLOWED_UPLOAD_TYPES: &[&str] = &["application/pdf", "image/jpeg", "image/png"];

pub fn validate_email(email: &str) -> Result<(), ValidationError> {
    if validator::validate_email(email) {
        Ok(())
    } else {
        Err(ValidationError::InvalidEmail)
    }
}

pub fn validate_birth_date(value: &str, today: NaiveDate) -> Result<(), ValidationError> {
    let date =
        NaiveDate::parse_from_str(value, "%Y-%m-%d").map_err(|_| ValidationError::InvalidDate)?;
    if date > today {
        return Err(ValidationError::FutureDate);
    }
    Ok(())
}

pub fn validate_gpa(value: &str) -> Result<(), ValidationError> {
    value
        .trim()
        .parse::<f64>()
        .ok()
        .filter(|gpa| gpa.is_finite() && *gpa >= 0.0)
        .map(|_| ())
        .ok_or(ValidationError::InvalidGpa)
}

pub fn validate_program_priorities(programs: &[UniversityProgram]) -> Result<(), ValidationError> {
    let mut seen = HashSet::new();
    for program in programs {
        if !seen.insert(program.priority) {
            return Err(ValidationError::DuplicatePriority {
                priority: program.priority,
            });
        }
    }
    Ok(())
}

/// Validate an attached file against the accepted types and size limit
pub fn validate_attachment(file: &AttachedFile, max_size_bytes: usize) -> Result<(), ValidationError> {
    if file.size() > max_size_bytes {
        return Err(ValidationError::FileTooLarge {
            max_mb: max_size_bytes / (1024 * 1024),
        });
    }

    let mime_type = file.mime_type();
    if !ALLOWED_UPLOAD_TYPES.contains(&mime_type.as_str()) {
        return Err(ValidationError::InvalidFileType { mime_type });
    }

    Ok(())
}

/// Collect one hint per field for everything the user has filled in so far.
///
/// Empty fields are skipped; completeness is reported by the review step.
pub fn field_hints(draft: &ApplicationDraft, max_upload_size: usize, today: NaiveDate) -> ValidationErrorMap {
    let mut hints = ValidationErrorMap::new();

    if !draft.email.is_empty() {
        if let Err(e) = validate_email(&draft.email) {
            hints.insert(FieldKey::Email.as_str(), e.to_string());
        }
    }

    if !draft.birth_date.is_empty() {
        if let Err(e) = validate_birth_date(&draft.birth_date, today) {
            hints.insert(FieldKey::BirthDate.as_str(), e.to_string());
        }
    }

    let record_problem = draft.academic_records.iter().find_map(|record| {
        if !record.gpa.is_empty() {
            if let Err(e) = validate_gpa(&record.gpa) {
                return Some(e);
            }
        }
        record
            .document_file
            .as_ref()
            .and_then(|file| validate_attachment(file, max_upload_size).err())
    });
    if let Some(e) = record_problem {
        hints.insert(FieldKey::AcademicRecords.as_str(), e.to_string());
    }

    if let Err(e) = validate_program_priorities(&draft.university_programs) {
        hints.insert(FieldKey::UniversityPrograms.as_str(), e.to_string());
    }

    let upload_problem = draft
        .document_uploads
        .iter()
        .filter_map(|row| row.file.as_ref())
        .find_map(|file| validate_attachment(file, max_upload_size).err());
    if let Some(e) = upload_problem {
        hints.insert(FieldKey::DocumentUploads.as_str(), e.to_string());
    }

    hints
}
