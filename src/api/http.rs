//! REST implementation of [`ApplicationBackend`]

use super::{ApplicationBackend, BackendError, MultipartPayload, PayloadValue};
use crate::config::Config;
use crate::models::{ApplicationDetail, SubmissionReceipt};
use async_trait::async_trait;
use reqwest::multipart::{Form, Part};
use reqwest::{RequestBuilder, Response, StatusCode, Url};
use serde::de::DeserializeOwned;

#[derive(Debug, Clone)]
pub struct HttpBackend {
    client: reqwest::Client,
    base_url: Url,
    token: Option<String>,
}

impl HttpBackend {
    pub fn new(config: &Config) -> Result<Self, BackendError> {
        let mut builder = reqwest::Client::builder();
        if let Some(timeout) = config.request_timeout {
            builder = builder.timeout(timeout);
        }
        let base_url = Url::parse(&config.api_base_url)
            .map_err(|e| BackendError::InvalidBaseUrl(format!("{}: {}", config.api_base_url, e)))?;
        if base_url.cannot_be_a_base() {
            return Err(BackendError::InvalidBaseUrl(config.api_base_url.clone()));
        }
        Ok(Self {
            client: builder.build()?,
            base_url,
            token: config.api_token.clone(),
        })
    }

    /// Append path segments to the base URL, percent-encoding each one
    fn endpoint(&self, segments: &[&str]) -> Url {
        let mut url = self.base_url.clone();
        // Checked in `new`: the base URL always has path segments
        if let Ok(mut path) = url.path_segments_mut() {
            path.pop_if_empty().extend(segments).push("");
        }
        url
    }

    fn collection_url(&self) -> Url {
        self.endpoint(&["v1", "applications"])
    }

    fn application_url(&self, tracking_code: &str) -> Url {
        self.endpoint(&["v1", "applications", tracking_code])
    }

    fn authorize(&self, request: RequestBuilder) -> RequestBuilder {
        match self.token {
            Some(ref token) => request.bearer_auth(token),
            None => request,
        }
    }

    async fn send_multipart(
        &self,
        request: RequestBuilder,
        payload: MultipartPayload,
    ) -> Result<SubmissionReceipt, BackendError> {
        tracing::debug!(
            "Sending {} multipart fields ({} files)",
            payload.len(),
            payload.file_count()
        );
        let form = into_form(payload)?;
        let response = self.authorize(request).multipart(form).send().await?;
        read_body(response).await
    }
}

fn into_form(payload: MultipartPayload) -> Result<Form, BackendError> {
    let mut form = Form::new();
    for (name, value) in payload.into_fields() {
        form = match value {
            PayloadValue::Text(text) => form.text(name, text),
            PayloadValue::File(file) => {
                let mime_type = file.mime_type();
                let part = Part::bytes(file.bytes)
                    .file_name(file.file_name)
                    .mime_str(&mime_type)?;
                form.part(name, part)
            }
        };
    }
    Ok(form)
}

/// Decode a success body or classify the failure
async fn read_body<T: DeserializeOwned>(response: Response) -> Result<T, BackendError> {
    let status = response.status();
    let bytes = response.bytes().await?;

    if status.is_success() {
        return serde_json::from_slice(&bytes).map_err(|e| BackendError::Decode(e.to_string()));
    }

    if status == StatusCode::BAD_REQUEST {
        if let Ok(body) = serde_json::from_slice::<serde_json::Value>(&bytes) {
            return Err(BackendError::Rejected(body));
        }
    }

    Err(BackendError::Status {
        status: status.as_u16(),
        body: String::from_utf8_lossy(&bytes).into_owned(),
    })
}

#[async_trait]
impl ApplicationBackend for HttpBackend {
    async fn fetch_application(&self, tracking_code: &str) -> Result<ApplicationDetail, BackendError> {
        let request = self.client.get(self.application_url(tracking_code));
        let response = self.authorize(request).send().await?;
        read_body(response).await
    }

    async fn create_application(&self, payload: MultipartPayload) -> Result<SubmissionReceipt, BackendError> {
        let request = self.client.post(self.collection_url());
        self.send_multipart(request, payload).await
    }

    async fn update_application(
        &self,
        tracking_code: &str,
        payload: MultipartPayload,
    ) -> Result<SubmissionReceipt, BackendError> {
        let request = self.client.patch(self.application_url(tracking_code));
        self.send_multipart(request, payload).await
    }
}
