//! Google identity token verification
//!
//! Verifies an ID token against Google's tokeninfo endpoint and checks
//! the audience against the configured OAuth client id. The outbound
//! call carries a client-level timeout.

use async_trait::async_trait;
use hearth_core::{IdentityError, IdentityVerifier, VerifiedIdentity};
use reqwest::Client;
use serde::Deserialize;
use std::time::Duration;

const TOKENINFO_BASE_URL: &str = "https://oauth2.googleapis.com";
const VERIFY_TIMEOUT: Duration = Duration::from_secs(10);

/// Verifier backed by Google's tokeninfo endpoint
pub struct GoogleTokenVerifier {
    client: Client,
    base_url: String,
    client_id: String,
}

#[derive(Debug, Deserialize)]
struct TokenInfo {
    aud: String,
    email: Option<String>,
}

impl GoogleTokenVerifier {
    /// Create a verifier expecting tokens issued for `client_id`
    pub fn new(client_id: impl Into<String>) -> Self {
        Self {
            client: Client::builder()
                .timeout(VERIFY_TIMEOUT)
                .build()
                .unwrap_or_default(),
            base_url: TOKENINFO_BASE_URL.to_string(),
            client_id: client_id.into(),
        }
    }

    /// Point at a different endpoint (tests, proxies)
    pub fn with_base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = url.into();
        self
    }
}

#[async_trait]
impl IdentityVerifier for GoogleTokenVerifier {
    async fn verify(&self, provider_token: &str) -> Result<VerifiedIdentity, IdentityError> {
        let response = self
            .client
            .get(format!("{}/tokeninfo", self.base_url))
            .query(&[("id_token", provider_token)])
            .send()
            .await
            .map_err(|e| IdentityError::Invalid(format!("tokeninfo request failed: {e}")))?;

        if !response.status().is_success() {
            return Err(IdentityError::Invalid(format!(
                "rejected by provider: {}",
                response.status()
            )));
        }

        let info: TokenInfo = response
            .json()
            .await
            .map_err(|e| IdentityError::Invalid(format!("malformed tokeninfo response: {e}")))?;

        if info.aud != self.client_id {
            return Err(IdentityError::Invalid("audience mismatch".to_string()));
        }

        let email = info
            .email
            .ok_or_else(|| IdentityError::Invalid("no email claim".to_string()))?;

        Ok(VerifiedIdentity { email })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tokeninfo_deserialization() {
        let json = r#"{"aud": "my-client-id", "email": "user@example.com", "exp": "1700000000"}"#;
        let info: TokenInfo = serde_json::from_str(json).unwrap();

        assert_eq!(info.aud, "my-client-id");
        assert_eq!(info.email.as_deref(), Some("user@example.com"));
    }

    #[test]
    fn test_tokeninfo_without_email() {
        let json = r#"{"aud": "my-client-id"}"#;
        let info: TokenInfo = serde_json::from_str(json).unwrap();

        assert!(info.email.is_none());
    }
}
