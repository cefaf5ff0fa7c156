//! Command-line driver for the admission wizard
//!
//! ```text
//! admission-wizard <draft.json> [tracking-code]
//! ```
//!
//! Without a tracking code a new application is created. With one, the
//! application is fetched, the fields present in the draft file are applied
//! on top of it and it is resubmitted.

use admission_wizard::models::{
    AcademicRecord, ApplicationDraft, AttachedFile, DocumentUpload, RecordId, UniversityProgram,
};
use admission_wizard::wizard::LoggingShell;
use admission_wizard::{Config, FieldUpdate, HttpBackend, Phase, SubmitOutcome, WizardController};
use serde::Deserialize;
use std::path::PathBuf;
use std::sync::Arc;
use tokio::fs;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
struct DraftInput {
    full_name: Option<String>,
    father_name: Option<String>,
    grandfather_name: Option<String>,
    birth_date: Option<String>,
    nationality: Option<String>,
    email: Option<String>,
    academic_records: Option<Vec<RecordInput>>,
    university_programs: Option<Vec<ProgramInput>>,
    document_uploads: Vec<DocumentInput>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct RecordInput {
    degree: String,
    country: String,
    university: String,
    field: String,
    gpa: String,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
struct ProgramInput {
    priority: u32,
    university: String,
    university_id: Option<i64>,
    field: String,
    field_id: Option<i64>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
struct DocumentInput {
    document_type: String,
    path: Option<PathBuf>,
}

impl DraftInput {
    /// Turn the file into field updates. Rows at an index that already exists
    /// in `current` keep that row's id so the backend updates them in place.
    async fn into_updates(
        self,
        current: &ApplicationDraft,
    ) -> Result<Vec<FieldUpdate>, Box<dyn std::error::Error>> {
        let mut updates = Vec::new();

        let scalars: [(Option<String>, fn(String) -> FieldUpdate); 6] = [
            (self.full_name, FieldUpdate::FullName),
            (self.father_name, FieldUpdate::FatherName),
            (self.grandfather_name, FieldUpdate::GrandfatherName),
            (self.birth_date, FieldUpdate::BirthDate),
            (self.nationality, FieldUpdate::Nationality),
            (self.email, FieldUpdate::Email),
        ];
        for (value, update) in scalars {
            if let Some(value) = value {
                updates.push(update(value));
            }
        }

        if let Some(records) = self.academic_records {
            let records = records
                .into_iter()
                .enumerate()
                .map(|(i, r)| AcademicRecord {
                    id: current
                        .academic_records
                        .get(i)
                        .map(|existing| existing.id.clone())
                        .unwrap_or_else(RecordId::new_local),
                    degree: r.degree,
                    country: r.country,
                    university: r.university,
                    field: r.field,
                    gpa: r.gpa,
                    document_file: None,
                })
                .collect();
            updates.push(FieldUpdate::AcademicRecords(records));
        }

        if let Some(programs) = self.university_programs {
            let programs = programs
                .into_iter()
                .enumerate()
                .map(|(i, p)| UniversityProgram {
                    id: current
                        .university_programs
                        .get(i)
                        .map(|existing| existing.id.clone())
                        .unwrap_or_else(RecordId::new_local),
                    priority: if p.priority == 0 { i as u32 + 1 } else { p.priority },
                    university: p.university,
                    university_id: p.university_id,
                    field: p.field,
                    field_id: p.field_id,
                })
                .collect();
            updates.push(FieldUpdate::UniversityPrograms(programs));
        }

        if !self.document_uploads.is_empty() {
            let mut rows = Vec::with_capacity(self.document_uploads.len());
            for doc in self.document_uploads {
                let file = match doc.path {
                    Some(path) => {
                        let bytes = fs::read(&path).await?;
                        let name = path
                            .file_name()
                            .map(|n| n.to_string_lossy().into_owned())
                            .unwrap_or_else(|| "upload".to_string());
                        Some(AttachedFile::new(name, bytes))
                    }
                    None => None,
                };
                rows.push(DocumentUpload {
                    id: RecordId::new_local(),
                    document_type: doc.document_type,
                    file,
                });
            }
            updates.push(FieldUpdate::DocumentUploads(rows));
        }

        Ok(updates)
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "admission_wizard=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let mut args = std::env::args().skip(1);
    let draft_path = args
        .next()
        .ok_or("usage: admission-wizard <draft.json> [tracking-code]")?;
    let tracking_code = args.next();

    // Load configuration
    let config = Config::from_env()?;
    tracing::info!("Environment: {:?}", config.environment);
    tracing::info!("API: {}", config.api_base_url);

    let input: DraftInput = serde_json::from_slice(&fs::read(&draft_path).await?)?;

    let backend = Arc::new(HttpBackend::new(&config)?);
    let wizard = WizardController::new(backend, Arc::new(LoggingShell), tracking_code, &config);

    wizard.initialize().await;
    if wizard.phase() == Phase::Aborted {
        return Err("could not load the application for editing".into());
    }

    for update in input.into_updates(&wizard.draft()).await? {
        wizard.on_input_change(update);
    }

    loop {
        if let Some(view) = wizard.step_view() {
            for (field, hint) in view.hints().iter() {
                tracing::warn!("{} ({}): {}", field, view.step.label(), hint);
            }
        }
        if !wizard.go_next() {
            break;
        }
    }

    if let Some(summary) = wizard.step_view().and_then(|view| view.review_summary()) {
        for group in summary.missing {
            tracing::warn!("{}", group.message());
        }
    }

    wizard.on_input_change(FieldUpdate::ConfirmSubmission(true));
    match wizard.advance().await {
        Some(SubmitOutcome::Succeeded { tracking_code }) => {
            println!("{}", tracking_code);
            Ok(())
        }
        Some(SubmitOutcome::Rejected(rejection)) => {
            for message in rejection.messages {
                eprintln!("{}", message);
            }
            Err("application rejected".into())
        }
        _ => Err("application was not submitted".into()),
    }
}
