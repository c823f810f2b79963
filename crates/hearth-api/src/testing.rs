//! Test utilities
//!
//! Stub collaborators and a router wired to the in-memory store. Only
//! compiled for tests or with the `test-utils` feature.

use crate::state::AppState;
use crate::store::MemoryStore;
use async_trait::async_trait;
use axum::Router;
use hearth_core::config::AppConfig;
use hearth_core::{
    DeliveryError, FileError, FileStore, IdentityError, IdentityVerifier, MailSender,
    VerifiedIdentity,
};
use std::sync::{Arc, Mutex};

use crate::files::ALLOWED_PHOTO_TYPES;

/// A captured outbound mail
#[derive(Debug, Clone)]
pub struct SentMail {
    pub to: String,
    pub subject: String,
    pub html: String,
}

/// Mailer that records instead of delivering
#[derive(Default)]
pub struct RecordingMailer {
    pub sent: Mutex<Vec<SentMail>>,
}

#[async_trait]
impl MailSender for RecordingMailer {
    async fn send(
        &self,
        recipient: &str,
        subject: &str,
        html_body: &str,
    ) -> Result<(), DeliveryError> {
        self.sent.lock().unwrap().push(SentMail {
            to: recipient.to_string(),
            subject: subject.to_string(),
            html: html_body.to_string(),
        });
        Ok(())
    }
}

/// Mailer whose relay is always down
pub struct FailingMailer;

#[async_trait]
impl MailSender for FailingMailer {
    async fn send(&self, _: &str, _: &str, _: &str) -> Result<(), DeliveryError> {
        Err(DeliveryError("relay unavailable".to_string()))
    }
}

/// Verifier that accepts every token as a fixed identity, or rejects all
pub struct StaticVerifier {
    email: Option<String>,
}

impl StaticVerifier {
    pub fn accepting(email: impl Into<String>) -> Self {
        Self {
            email: Some(email.into()),
        }
    }

    pub fn rejecting() -> Self {
        Self { email: None }
    }
}

#[async_trait]
impl IdentityVerifier for StaticVerifier {
    async fn verify(&self, _provider_token: &str) -> Result<VerifiedIdentity, IdentityError> {
        match &self.email {
            Some(email) => Ok(VerifiedIdentity {
                email: email.clone(),
            }),
            None => Err(IdentityError::Invalid("rejected".to_string())),
        }
    }
}

/// File store that keeps uploads in memory
#[derive(Default)]
pub struct MemoryFileStore {
    pub saved: Mutex<Vec<(String, Vec<u8>)>>,
}

#[async_trait]
impl FileStore for MemoryFileStore {
    async fn save(
        &self,
        bytes: &[u8],
        content_type: &str,
        name_hint: &str,
    ) -> Result<String, FileError> {
        if !ALLOWED_PHOTO_TYPES.contains(&content_type) {
            return Err(FileError::UnsupportedMediaType(format!(
                "Invalid file type {content_type}. Only JPEG, PNG, and GIF are allowed."
            )));
        }

        let mut saved = self.saved.lock().unwrap();
        let reference = format!("mem://{}/{}", name_hint, saved.len());
        saved.push((reference.clone(), bytes.to_vec()));
        Ok(reference)
    }
}

/// Default test configuration
pub fn test_config() -> AppConfig {
    AppConfig::default()
}

/// Application state over the in-memory store and stub collaborators
pub fn test_state_with(store: Arc<MemoryStore>, verifier: StaticVerifier) -> Arc<AppState> {
    Arc::new(AppState::new(
        test_config(),
        store.clone(),
        store,
        Arc::new(RecordingMailer::default()),
        Arc::new(verifier),
        Arc::new(MemoryFileStore::default()),
    ))
}

pub fn test_state() -> Arc<AppState> {
    test_state_with(Arc::new(MemoryStore::new()), StaticVerifier::rejecting())
}

/// Router wired for tests
pub fn create_router_for_testing() -> Router {
    crate::create_router(test_state())
}
