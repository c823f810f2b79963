//! Token issuance and verification
//!
//! HMAC-SHA256 signed tokens with a purpose claim. Access and reset
//! tokens share the access secret (reset tokens are capability-bounded
//! by their purpose and short TTL); refresh tokens are signed with a
//! distinct secret so a leaked access token cannot mint refresh tokens.
//!
//! Verification is a pure function of token, secret, and current time;
//! it never touches the store.

use hearth_core::config::AuthConfig;
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use std::time::{SystemTime, UNIX_EPOCH};
use thiserror::Error;

/// What a token is allowed to be used for
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TokenPurpose {
    Access,
    Refresh,
    Reset,
}

impl TokenPurpose {
    pub fn as_str(&self) -> &'static str {
        match self {
            TokenPurpose::Access => "access",
            TokenPurpose::Refresh => "refresh",
            TokenPurpose::Reset => "reset",
        }
    }
}

/// Signed claim set
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    /// Subject - the user's email
    pub sub: String,
    /// Issued at (Unix epoch seconds)
    pub iat: u64,
    /// Expiration (Unix epoch seconds)
    pub exp: u64,
    /// Purpose, checked on every verification
    pub purpose: TokenPurpose,
}

/// Token generation and validation errors
#[derive(Debug, Error)]
pub enum TokenError {
    #[error("Failed to encode token: {0}")]
    Encoding(jsonwebtoken::errors::Error),

    #[error("Invalid token format")]
    InvalidToken,

    #[error("Token has expired")]
    ExpiredToken,

    #[error("Invalid token signature")]
    InvalidSignature,

    #[error("Token purpose mismatch")]
    WrongPurpose,

    #[error("System time error: {0}")]
    SystemTime(#[from] std::time::SystemTimeError),
}

fn signing_secret(config: &AuthConfig, purpose: TokenPurpose) -> &str {
    match purpose {
        // Reset tokens ride the access secret; the purpose claim keeps
        // them out of the access namespace.
        TokenPurpose::Access | TokenPurpose::Reset => &config.access_secret,
        TokenPurpose::Refresh => &config.refresh_secret,
    }
}

fn issue(
    config: &AuthConfig,
    email: &str,
    ttl_secs: i64,
    purpose: TokenPurpose,
) -> Result<String, TokenError> {
    let now = SystemTime::now().duration_since(UNIX_EPOCH)?.as_secs();

    let claims = Claims {
        sub: email.to_string(),
        iat: now,
        exp: now + ttl_secs.max(0) as u64,
        purpose,
    };

    encode(
        &Header::new(Algorithm::HS256),
        &claims,
        &EncodingKey::from_secret(signing_secret(config, purpose).as_bytes()),
    )
    .map_err(TokenError::Encoding)
}

/// Issue an access token for the given user
pub fn issue_access(config: &AuthConfig, email: &str) -> Result<String, TokenError> {
    issue(config, email, config.access_ttl_mins * 60, TokenPurpose::Access)
}

/// Issue a refresh token, signed with the refresh secret
pub fn issue_refresh(config: &AuthConfig, email: &str) -> Result<String, TokenError> {
    issue(
        config,
        email,
        config.refresh_ttl_days * 24 * 60 * 60,
        TokenPurpose::Refresh,
    )
}

/// Issue a short-lived, single-purpose password-reset token
pub fn issue_reset(config: &AuthConfig, email: &str) -> Result<String, TokenError> {
    issue(config, email, config.reset_ttl_mins * 60, TokenPurpose::Reset)
}

/// Verify a token against the secret and purpose it was issued for.
///
/// Expired and malformed/bad-signature tokens come back as distinct
/// error kinds so callers can give differentiated 401 messages.
pub fn verify(
    config: &AuthConfig,
    token: &str,
    expected: TokenPurpose,
) -> Result<Claims, TokenError> {
    let validation = Validation::new(Algorithm::HS256);

    let token_data = decode::<Claims>(
        token,
        &DecodingKey::from_secret(signing_secret(config, expected).as_bytes()),
        &validation,
    )
    .map_err(|e| match e.kind() {
        jsonwebtoken::errors::ErrorKind::ExpiredSignature => TokenError::ExpiredToken,
        jsonwebtoken::errors::ErrorKind::InvalidSignature => TokenError::InvalidSignature,
        _ => TokenError::InvalidToken,
    })?;

    let claims = token_data.claims;

    // The expiry check is authoritative here even if the library's own
    // check is ever bypassed.
    let now = SystemTime::now().duration_since(UNIX_EPOCH)?.as_secs();
    if claims.exp < now {
        return Err(TokenError::ExpiredToken);
    }

    if claims.purpose != expected {
        return Err(TokenError::WrongPurpose);
    }

    Ok(claims)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config() -> AuthConfig {
        AuthConfig {
            access_secret: "test-access-secret".to_string(),
            refresh_secret: "test-refresh-secret".to_string(),
            ..Default::default()
        }
    }

    #[test]
    fn test_issue_and_verify_access() {
        let config = config();
        let token = issue_access(&config, "test@example.com").unwrap();

        let claims = verify(&config, &token, TokenPurpose::Access).unwrap();
        assert_eq!(claims.sub, "test@example.com");
        assert_eq!(claims.purpose, TokenPurpose::Access);
        assert!(claims.exp > claims.iat);
    }

    #[test]
    fn test_key_separation() {
        let config = config();

        // A refresh token must be rejected by the access verifier
        let refresh = issue_refresh(&config, "test@example.com").unwrap();
        assert!(matches!(
            verify(&config, &refresh, TokenPurpose::Access),
            Err(TokenError::InvalidSignature)
        ));

        // And an access token by the refresh verifier
        let access = issue_access(&config, "test@example.com").unwrap();
        assert!(matches!(
            verify(&config, &access, TokenPurpose::Refresh),
            Err(TokenError::InvalidSignature)
        ));
    }

    #[test]
    fn test_reset_purpose_is_checked() {
        let config = config();

        // Reset and access tokens share a secret; the purpose claim is
        // what keeps them apart.
        let reset = issue_reset(&config, "test@example.com").unwrap();
        assert!(verify(&config, &reset, TokenPurpose::Reset).is_ok());
        assert!(matches!(
            verify(&config, &reset, TokenPurpose::Access),
            Err(TokenError::WrongPurpose)
        ));

        let access = issue_access(&config, "test@example.com").unwrap();
        assert!(matches!(
            verify(&config, &access, TokenPurpose::Reset),
            Err(TokenError::WrongPurpose)
        ));
    }

    #[test]
    fn test_expired_token() {
        let config = config();
        let now = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .unwrap()
            .as_secs();

        let claims = Claims {
            sub: "test@example.com".to_string(),
            iat: now - 7200,
            exp: now - 3600,
            purpose: TokenPurpose::Access,
        };

        let token = encode(
            &Header::new(Algorithm::HS256),
            &claims,
            &EncodingKey::from_secret(config.access_secret.as_bytes()),
        )
        .unwrap();

        assert!(matches!(
            verify(&config, &token, TokenPurpose::Access),
            Err(TokenError::ExpiredToken)
        ));
    }

    #[test]
    fn test_garbage_token() {
        let config = config();
        assert!(matches!(
            verify(&config, "not.a.token", TokenPurpose::Access),
            Err(TokenError::InvalidToken)
        ));
    }

    #[test]
    fn test_wrong_secret() {
        let config1 = config();
        let config2 = AuthConfig {
            access_secret: "another-secret".to_string(),
            ..config()
        };

        let token = issue_access(&config1, "test@example.com").unwrap();
        assert!(matches!(
            verify(&config2, &token, TokenPurpose::Access),
            Err(TokenError::InvalidSignature)
        ));
    }
}
