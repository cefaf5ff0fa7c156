//! HttpBackend against a local mock of the admissions API

use admission_wizard::api::payload::build_payload;
use admission_wizard::models::{ApplicationDraft, AttachedFile, DocumentUpload, RecordId};
use admission_wizard::wizard::RecordingShell;
use admission_wizard::{
    ApplicationBackend, BackendError, Config, FieldUpdate, HttpBackend, Page, Step, SubmitOutcome,
    WizardController, WizardMode,
};
use axum::{
    extract::{Multipart, Path, State},
    http::{header::AUTHORIZATION, HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde_json::json;
use std::sync::{Arc, Mutex};
use std::time::Duration;

#[derive(Debug, Clone)]
struct ReceivedField {
    name: String,
    file_name: Option<String>,
    content_type: Option<String>,
    data: Vec<u8>,
}

#[derive(Clone, Default)]
struct MockApi {
    fields: Arc<Mutex<Vec<ReceivedField>>>,
    auth: Arc<Mutex<Vec<Option<String>>>>,
    methods: Arc<Mutex<Vec<String>>>,
}

impl MockApi {
    fn fields(&self) -> Vec<ReceivedField> {
        self.fields.lock().unwrap().clone()
    }

    fn text(&self, name: &str) -> Option<String> {
        self.fields()
            .into_iter()
            .rev()
            .find(|f| f.name == name)
            .map(|f| String::from_utf8_lossy(&f.data).into_owned())
    }
}

async fn read_multipart(api: &MockApi, headers: &HeaderMap, mut multipart: Multipart) -> Vec<ReceivedField> {
    api.auth.lock().unwrap().push(
        headers
            .get(AUTHORIZATION)
            .and_then(|v| v.to_str().ok())
            .map(str::to_string),
    );
    let mut received = Vec::new();
    while let Some(field) = multipart.next_field().await.unwrap() {
        let name = field.name().unwrap_or_default().to_string();
        let file_name = field.file_name().map(str::to_string);
        let content_type = field.content_type().map(str::to_string);
        let data = field.bytes().await.unwrap().to_vec();
        received.push(ReceivedField {
            name,
            file_name,
            content_type,
            data,
        });
    }
    api.fields.lock().unwrap().extend(received.clone());
    received
}

fn field_value(fields: &[ReceivedField], name: &str) -> String {
    fields
        .iter()
        .find(|f| f.name == name)
        .map(|f| String::from_utf8_lossy(&f.data).into_owned())
        .unwrap_or_default()
}

async fn create_application(
    State(api): State<MockApi>,
    headers: HeaderMap,
    multipart: Multipart,
) -> Response {
    api.methods.lock().unwrap().push("POST".to_string());
    let fields = read_multipart(&api, &headers, multipart).await;
    let email = field_value(&fields, "email");

    if email == "explode@example.com" {
        return (StatusCode::INTERNAL_SERVER_ERROR, "boom").into_response();
    }
    if !email.contains('@') {
        return (
            StatusCode::BAD_REQUEST,
            Json(json!({
                "email": ["Enter a valid email address."],
                "academic_histories": [{"gpa": ["This field is required."]}]
            })),
        )
            .into_response();
    }
    (StatusCode::CREATED, Json(json!({"tracking_code": "T-100"}))).into_response()
}

async fn update_application(
    State(api): State<MockApi>,
    Path(code): Path<String>,
    headers: HeaderMap,
    multipart: Multipart,
) -> Response {
    api.methods.lock().unwrap().push("PATCH".to_string());
    read_multipart(&api, &headers, multipart).await;
    Json(json!({"tracking_code": code})).into_response()
}

async fn get_application(Path(code): Path<String>) -> Response {
    if code != "T-55" {
        return (StatusCode::NOT_FOUND, Json(json!({"detail": "Not found."}))).into_response();
    }
    Json(json!({
        "tracking_code": "T-55",
        "status": "PENDING_CORRECTION",
        "full_name": "Sara Ahmadi",
        "father_name": "Karim",
        "date_of_birth": "2001-04-12",
        "country_of_residence": "iran",
        "email": "sara@example.com",
        "academic_histories": [{
            "id": 42,
            "degree_level": "bachelor",
            "country": "IR",
            "university_name": "Shiraz University",
            "field_of_study": "Physics",
            "gpa": 15.5
        }],
        "university_choices": [{
            "id": 7,
            "priority": 1,
            "university": {"id": 5, "name": "University of Tehran"},
            "program": {"id": 11, "name": "Civil Engineering"}
        }],
        "documents": [{"document_type": "passport", "file": "/media/passport.pdf"}]
    }))
    .into_response()
}

async fn spawn_api() -> (MockApi, Config) {
    let api = MockApi::default();
    let app = Router::new()
        .route("/api/v1/applications/", post(create_application))
        .route(
            "/api/v1/applications/:code/",
            get(get_application).patch(update_application),
        )
        .with_state(api.clone());

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });

    let config = Config {
        api_base_url: format!("http://{}/api", addr),
        api_token: Some("secret".to_string()),
        request_timeout: Some(Duration::from_secs(5)),
        navigation_delay: Duration::ZERO,
        ..Default::default()
    };
    (api, config)
}

fn draft_with_email(email: &str) -> ApplicationDraft {
    ApplicationDraft {
        full_name: "Sara Ahmadi".to_string(),
        email: email.to_string(),
        document_uploads: vec![DocumentUpload {
            id: RecordId::new_local(),
            document_type: "passport".to_string(),
            file: Some(AttachedFile::new("passport.pdf", b"%PDF-1.7\n%mock".to_vec())),
        }],
        ..Default::default()
    }
}

#[tokio::test]
async fn create_sends_multipart_with_bearer_token() {
    let (api, config) = spawn_api().await;
    let backend = HttpBackend::new(&config).unwrap();

    let payload = build_payload(&draft_with_email("sara@example.com"), &WizardMode::Create);
    let receipt = backend.create_application(payload).await.unwrap();

    assert_eq!(receipt.tracking_code, "T-100");
    assert_eq!(api.text("application_type").as_deref(), Some("NEW_ADMISSION"));
    assert_eq!(api.text("full_name").as_deref(), Some("Sara Ahmadi"));

    let file = api
        .fields()
        .into_iter()
        .find(|f| f.name == "documents[0]file")
        .unwrap();
    assert_eq!(file.file_name.as_deref(), Some("passport.pdf"));
    assert_eq!(file.content_type.as_deref(), Some("application/pdf"));
    assert!(file.data.starts_with(b"%PDF"));

    assert_eq!(
        api.auth.lock().unwrap().as_slice(),
        &[Some("Bearer secret".to_string())]
    );
}

#[tokio::test]
async fn bad_request_is_a_validation_rejection() {
    let (_, config) = spawn_api().await;
    let backend = HttpBackend::new(&config).unwrap();

    let payload = build_payload(&draft_with_email("sara-at-example"), &WizardMode::Create);
    match backend.create_application(payload).await {
        Err(BackendError::Rejected(body)) => {
            assert_eq!(body["email"][0], "Enter a valid email address.");
        }
        other => panic!("expected rejection, got {:?}", other),
    }
}

#[tokio::test]
async fn server_error_is_not_a_rejection() {
    let (_, config) = spawn_api().await;
    let backend = HttpBackend::new(&config).unwrap();

    let payload = build_payload(&draft_with_email("explode@example.com"), &WizardMode::Create);
    match backend.create_application(payload).await {
        Err(BackendError::Status { status, body }) => {
            assert_eq!(status, 500);
            assert_eq!(body, "boom");
        }
        other => panic!("expected status error, got {:?}", other),
    }
}

#[tokio::test]
async fn fetch_decodes_application_detail() {
    let (_, config) = spawn_api().await;
    let backend = HttpBackend::new(&config).unwrap();

    let detail = backend.fetch_application("T-55").await.unwrap();
    assert_eq!(detail.academic_histories[0].id, 42);
    assert_eq!(detail.academic_histories[0].gpa, "15.5");
    assert_eq!(detail.documents[0].file_url, "/media/passport.pdf");

    let missing = backend.fetch_application("T-404").await;
    assert!(matches!(missing, Err(BackendError::Status { status: 404, .. })));
}

#[tokio::test]
async fn unreachable_backend_is_a_transport_error() {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);

    let config = Config {
        api_base_url: format!("http://{}/api", addr),
        ..Default::default()
    };
    let backend = HttpBackend::new(&config).unwrap();
    let result = backend.fetch_application("T-55").await;
    assert!(matches!(result, Err(BackendError::Transport(_))));
}

#[tokio::test]
async fn wizard_recovers_from_rejection_over_http() {
    let (api, config) = spawn_api().await;
    let backend = Arc::new(HttpBackend::new(&config).unwrap());
    let shell = Arc::new(RecordingShell::new());
    let wizard = WizardController::new(backend, shell.clone(), None, &config);

    wizard.on_input_change(FieldUpdate::FullName("Sara Ahmadi".to_string()));
    wizard.on_input_change(FieldUpdate::Email("sara-at-example".to_string()));
    while wizard.go_next() {}
    wizard.on_input_change(FieldUpdate::ConfirmSubmission(true));

    let outcome = wizard.submit().await;
    assert!(matches!(outcome, SubmitOutcome::Rejected(_)));
    assert_eq!(wizard.current_step(), Step::PersonalInfo);
    assert_eq!(wizard.errors().get("academicRecords"), Some("Gpa: This field is required."));

    wizard.on_input_change(FieldUpdate::Email("sara@example.com".to_string()));
    assert!(wizard.errors().get("email").is_none());
    assert_eq!(wizard.submit().await, SubmitOutcome::Skipped);

    while wizard.go_next() {}
    let outcome = wizard.submit().await;
    assert_eq!(
        outcome,
        SubmitOutcome::Succeeded {
            tracking_code: "T-100".to_string()
        }
    );
    assert_eq!(
        shell.navigations(),
        vec![(Page::ApplicationStatus, Some("T-100".to_string()))]
    );
    assert_eq!(api.methods.lock().unwrap().as_slice(), &["POST", "POST"]);
}

#[tokio::test]
async fn resubmission_patches_existing_application() {
    let (api, config) = spawn_api().await;
    let backend = Arc::new(HttpBackend::new(&config).unwrap());
    let shell = Arc::new(RecordingShell::new());
    let wizard = WizardController::new(backend, shell.clone(), Some("T-55".to_string()), &config);

    wizard.initialize().await;
    assert_eq!(wizard.draft().academic_records[0].gpa, "15.5");

    while wizard.go_next() {}
    wizard.on_input_change(FieldUpdate::ConfirmSubmission(true));
    let outcome = wizard.submit().await;

    assert_eq!(
        outcome,
        SubmitOutcome::Succeeded {
            tracking_code: "T-55".to_string()
        }
    );
    assert_eq!(api.methods.lock().unwrap().as_slice(), &["PATCH"]);
    assert_eq!(api.text("academic_histories[0]id").as_deref(), Some("42"));
    assert_eq!(api.text("university_choices[0]id").as_deref(), Some("7"));
    assert!(api.text("application_type").is_none());
}
