//! In-memory backend for tests and offline runs

use crate::api::{ApplicationBackend, BackendError, MultipartPayload};
use crate::models::{ApplicationDetail, SubmissionReceipt};
use async_trait::async_trait;
use serde_json::Value;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Mutex, MutexGuard, PoisonError};
use std::time::Duration;

/// What the fake answers to create and update calls
#[derive(Debug, Clone)]
pub enum FakeOutcome {
    Accept(String),
    Reject(Value),
    Fail(u16),
}

pub struct FakeBackend {
    outcome: Mutex<FakeOutcome>,
    detail: Mutex<Option<Value>>,
    delay: Duration,
    fetch_calls: AtomicU64,
    create_calls: AtomicU64,
    update_calls: AtomicU64,
    payloads: Mutex<Vec<MultipartPayload>>,
    update_codes: Mutex<Vec<String>>,
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

impl FakeBackend {
    pub fn new(outcome: FakeOutcome) -> Self {
        Self {
            outcome: Mutex::new(outcome),
            detail: Mutex::new(None),
            delay: Duration::ZERO,
            fetch_calls: AtomicU64::new(0),
            create_calls: AtomicU64::new(0),
            update_calls: AtomicU64::new(0),
            payloads: Mutex::new(Vec::new()),
            update_codes: Mutex::new(Vec::new()),
        }
    }

    pub fn accepting(tracking_code: &str) -> Self {
        Self::new(FakeOutcome::Accept(tracking_code.to_string()))
    }

    /// Application detail served by `fetch_application`; without one the
    /// fetch answers 404
    pub fn with_detail(self, detail: Value) -> Self {
        *lock(&self.detail) = Some(detail);
        self
    }

    /// Delay applied to every call before it answers
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    pub fn set_outcome(&self, outcome: FakeOutcome) {
        *lock(&self.outcome) = outcome;
    }

    pub fn fetch_count(&self) -> u64 {
        self.fetch_calls.load(Ordering::Relaxed)
    }

    pub fn create_count(&self) -> u64 {
        self.create_calls.load(Ordering::Relaxed)
    }

    pub fn update_count(&self) -> u64 {
        self.update_calls.load(Ordering::Relaxed)
    }

    /// Total create and update calls
    pub fn submit_count(&self) -> u64 {
        self.create_count() + self.update_count()
    }

    pub fn last_payload(&self) -> Option<MultipartPayload> {
        lock(&self.payloads).last().cloned()
    }

    pub fn last_update_code(&self) -> Option<String> {
        lock(&self.update_codes).last().cloned()
    }

    async fn pause(&self) {
        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }
    }

    async fn answer(&self, payload: MultipartPayload) -> Result<SubmissionReceipt, BackendError> {
        lock(&self.payloads).push(payload);
        self.pause().await;
        let outcome = lock(&self.outcome).clone();
        match outcome {
            FakeOutcome::Accept(tracking_code) => Ok(SubmissionReceipt { tracking_code }),
            FakeOutcome::Reject(body) => Err(BackendError::Rejected(body)),
            FakeOutcome::Fail(status) => Err(BackendError::Status {
                status,
                body: "fake backend failure".to_string(),
            }),
        }
    }
}

#[async_trait]
impl ApplicationBackend for FakeBackend {
    async fn fetch_application(&self, tracking_code: &str) -> Result<ApplicationDetail, BackendError> {
        self.fetch_calls.fetch_add(1, Ordering::Relaxed);
        self.pause().await;
        let detail = lock(&self.detail).clone();
        match detail {
            Some(value) => {
                serde_json::from_value(value).map_err(|e| BackendError::Decode(e.to_string()))
            }
            None => Err(BackendError::Status {
                status: 404,
                body: format!("application {} not found", tracking_code),
            }),
        }
    }

    async fn create_application(&self, payload: MultipartPayload) -> Result<SubmissionReceipt, BackendError> {
        self.create_calls.fetch_add(1, Ordering::Relaxed);
        self.answer(payload).await
    }

    async fn update_application(
        &self,
        tracking_code: &str,
        payload: MultipartPayload,
    ) -> Result<SubmissionReceipt, BackendError> {
        self.update_calls.fetch_add(1, Ordering::Relaxed);
        lock(&self.update_codes).push(tracking_code.to_string());
        self.answer(payload).await
    }
}
