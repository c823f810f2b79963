//! Contracts for external collaborators
//!
//! Outbound mail, federated identity verification, and file storage are
//! black boxes to the core flows; these traits are their entire surface.

use async_trait::async_trait;
use thiserror::Error;

/// Outbound mail failed; callers decide whether this is fatal
/// (password-reset delivery is logged, never surfaced).
#[derive(Debug, Error)]
#[error("mail delivery failed: {0}")]
pub struct DeliveryError(pub String);

/// Delivers HTML mail to a single recipient.
#[async_trait]
pub trait MailSender: Send + Sync {
    async fn send(
        &self,
        recipient: &str,
        subject: &str,
        html_body: &str,
    ) -> Result<(), DeliveryError>;
}

/// Federated identity token rejected
#[derive(Debug, Error)]
pub enum IdentityError {
    #[error("invalid identity token: {0}")]
    Invalid(String),
}

/// The identity a provider token resolved to
#[derive(Debug, Clone)]
pub struct VerifiedIdentity {
    pub email: String,
}

/// Verifies an external provider's identity token against the expected
/// audience and returns the asserted email.
#[async_trait]
pub trait IdentityVerifier: Send + Sync {
    async fn verify(&self, provider_token: &str) -> Result<VerifiedIdentity, IdentityError>;
}

/// File storage errors
#[derive(Debug, Error)]
pub enum FileError {
    #[error("unsupported media type: {0}")]
    UnsupportedMediaType(String),

    #[error("file storage error: {0}")]
    Io(String),
}

/// Persists uploaded bytes and returns an opaque reference.
#[async_trait]
pub trait FileStore: Send + Sync {
    /// `name_hint` seeds the stored file name (e.g. the uploader's email).
    async fn save(
        &self,
        bytes: &[u8],
        content_type: &str,
        name_hint: &str,
    ) -> Result<String, FileError>;
}
