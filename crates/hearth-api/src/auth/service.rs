//! Authentication service layer
//!
//! Login, federated login, registration, password-reset flows, token
//! refresh, and global admin promotion/demotion. Flows are stateless per
//! request; the only shared state is the user store.

use super::password::{generate_password, hash_password, verify_password};
use super::token::{self, TokenPurpose};
use crate::error::AppError;
use base64::Engine;
use hearth_core::config::AuthConfig;
use hearth_core::{
    FileStore, IdentityVerifier, MailSender, NewUser, StoreError, User, UserRole, UserStore,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use utoipa::ToSchema;
use uuid::Uuid;
use validator::Validate;

/// Length of the internal-only password generated for federated accounts
const PROVISIONED_PASSWORD_LEN: usize = 24;

/// Response for forgot-password is identical whether or not the account
/// exists, so the endpoint cannot be used to enumerate accounts.
const GENERIC_RESET_MESSAGE: &str = "If this email exists, a reset link will be sent.";

/// User login request
#[derive(Debug, Clone, Serialize, Deserialize, Validate, ToSchema)]
pub struct LoginRequest {
    #[validate(email)]
    pub email: String,
    pub password: String,
}

/// Federated login request carrying the provider's ID token
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct GoogleLoginRequest {
    pub token: String,
}

/// Inline profile photo upload (base64 payload)
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct ProfilePhotoUpload {
    pub content_type: String,
    /// Base64-encoded image bytes
    pub data: String,
}

/// User registration request
#[derive(Debug, Clone, Serialize, Deserialize, Validate, ToSchema)]
pub struct RegisterRequest {
    #[validate(email)]
    pub email: String,
    pub password: String,
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub profile_photo: Option<ProfilePhotoUpload>,
}

/// Forgot-password request
#[derive(Debug, Clone, Serialize, Deserialize, Validate, ToSchema)]
pub struct ForgotPasswordRequest {
    #[validate(email)]
    pub email: String,
}

/// Change-password request carrying a reset token
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct ChangePasswordRequest {
    pub token: String,
    pub password: String,
}

/// Token refresh request
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct RefreshRequest {
    pub refresh_token: String,
}

/// Access/refresh token pair with basic identity
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct TokenResponse {
    pub access_token: String,
    pub refresh_token: String,
    pub token_type: String,
    pub id: Uuid,
    pub email: String,
    pub role: String,
}

/// Registration response
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct RegisterResponse {
    pub user_id: Uuid,
    pub email: String,
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub profile_photo: Option<String>,
    pub message: String,
}

/// Authentication service
pub struct AuthService {
    users: Arc<dyn UserStore>,
    mail: Arc<dyn MailSender>,
    verifier: Arc<dyn IdentityVerifier>,
    files: Arc<dyn FileStore>,
    auth_config: AuthConfig,
    frontend_url: String,
}

impl AuthService {
    pub fn new(
        users: Arc<dyn UserStore>,
        mail: Arc<dyn MailSender>,
        verifier: Arc<dyn IdentityVerifier>,
        files: Arc<dyn FileStore>,
        auth_config: AuthConfig,
        frontend_url: String,
    ) -> Self {
        Self {
            users,
            mail,
            verifier,
            files,
            auth_config,
            frontend_url,
        }
    }

    fn issue_pair(&self, user: &User) -> Result<TokenResponse, AppError> {
        let access_token = token::issue_access(&self.auth_config, &user.email)?;
        let refresh_token = token::issue_refresh(&self.auth_config, &user.email)?;

        Ok(TokenResponse {
            access_token,
            refresh_token,
            token_type: "bearer".to_string(),
            id: user.id,
            email: user.email.clone(),
            role: user.role.as_str().to_string(),
        })
    }

    /// Login with email and password
    pub async fn login(&self, request: LoginRequest) -> Result<TokenResponse, AppError> {
        let user = self
            .users
            .find_by_email(&request.email)
            .await?
            .ok_or_else(|| AppError::Unauthorized("User not Found".to_string()))?;

        let password_valid = verify_password(&request.password, &user.password_hash)?;
        if !password_valid {
            return Err(AppError::Unauthorized("Invalid Credentials".to_string()));
        }

        self.issue_pair(&user)
    }

    /// Login with a Google ID token, auto-provisioning on first contact
    pub async fn google_login(&self, request: GoogleLoginRequest) -> Result<TokenResponse, AppError> {
        let identity = self.verifier.verify(&request.token).await.map_err(|e| {
            tracing::debug!(error = %e, "Google token verification failed");
            AppError::from(e)
        })?;

        let user = match self.users.find_by_email(&identity.email).await? {
            Some(user) => user,
            None => self.provision_federated_user(&identity.email).await?,
        };

        self.issue_pair(&user)
    }

    /// Create a local account for a first-time federated login.
    ///
    /// The generated password only satisfies the non-null hash invariant
    /// and is never surfaced. A concurrent first-login racing on the same
    /// email loses on the unique constraint and resolves to a lookup.
    async fn provision_federated_user(&self, email: &str) -> Result<User, AppError> {
        let password_hash = hash_password(&generate_password(PROVISIONED_PASSWORD_LEN))?;

        let created = self
            .users
            .create(NewUser {
                email: email.to_string(),
                password_hash,
                name: None,
                role: UserRole::VerifiedEmail,
                profile_photo: None,
            })
            .await;

        match created {
            Ok(user) => {
                tracing::info!(%email, "auto-provisioned federated user");
                Ok(user)
            }
            Err(StoreError::Duplicate(_)) => self
                .users
                .find_by_email(email)
                .await?
                .ok_or_else(|| AppError::Internal("provisioning race lost twice".to_string())),
            Err(e) => Err(e.into()),
        }
    }

    /// Register a new user
    pub async fn register(&self, request: RegisterRequest) -> Result<RegisterResponse, AppError> {
        request
            .validate()
            .map_err(|e| AppError::BadRequest(e.to_string()))?;

        if self.users.find_by_email(&request.email).await?.is_some() {
            return Err(AppError::Conflict(
                "User with this email already exists".to_string(),
            ));
        }

        let profile_photo = match &request.profile_photo {
            Some(upload) => {
                let bytes = base64::engine::general_purpose::STANDARD
                    .decode(&upload.data)
                    .map_err(|_| {
                        AppError::BadRequest("Profile photo is not valid base64".to_string())
                    })?;
                Some(
                    self.files
                        .save(&bytes, &upload.content_type, &request.email)
                        .await?,
                )
            }
            None => None,
        };

        let password_hash = hash_password(&request.password)?;

        let user = self
            .users
            .create(NewUser {
                email: request.email,
                password_hash,
                name: Some(request.name),
                role: UserRole::VerifiedEmail,
                profile_photo,
            })
            .await
            .map_err(|e| match e {
                StoreError::Duplicate(_) => {
                    AppError::Conflict("User with this email already exists".to_string())
                }
                other => other.into(),
            })?;

        Ok(RegisterResponse {
            user_id: user.id,
            email: user.email,
            name: user.name.unwrap_or_default(),
            profile_photo: user.profile_photo,
            message: "User registered successfully".to_string(),
        })
    }

    /// Request a password-reset mail.
    ///
    /// Always returns the same message; delivery failures are logged and
    /// never surfaced.
    pub async fn forgot_password(&self, request: ForgotPasswordRequest) -> Result<String, AppError> {
        request
            .validate()
            .map_err(|e| AppError::BadRequest(e.to_string()))?;

        let Some(user) = self.users.find_by_email(&request.email).await? else {
            return Ok(GENERIC_RESET_MESSAGE.to_string());
        };

        let reset_token = token::issue_reset(&self.auth_config, &user.email)?;
        let reset_link = format!("{}/reset_password?token={}", self.frontend_url, reset_token);

        let body = format!(
            "<h3>Password Reset</h3>\
             <p>Click the link below to reset your password:</p>\
             <a href=\"{reset_link}\">{reset_link}</a>\
             <p>If you didn't request this, you can ignore this email.</p>"
        );

        if let Err(e) = self
            .mail
            .send(&user.email, "Reset your Hearth password", &body)
            .await
        {
            tracing::warn!(error = %e, "password reset mail delivery failed");
        }

        Ok(GENERIC_RESET_MESSAGE.to_string())
    }

    /// Set a new password using a reset token
    pub async fn change_password(&self, request: ChangePasswordRequest) -> Result<String, AppError> {
        let claims = token::verify(&self.auth_config, &request.token, TokenPurpose::Reset)?;

        let user = self
            .users
            .find_by_email(&claims.sub)
            .await?
            .ok_or_else(|| AppError::NotFound("User".to_string()))?;

        let password_hash = hash_password(&request.password)?;
        self.users.update_password(user.id, &password_hash).await?;

        Ok("Password changed successfully".to_string())
    }

    /// Exchange a refresh token for a fresh access/refresh pair
    pub async fn refresh(&self, request: RefreshRequest) -> Result<TokenResponse, AppError> {
        let claims = token::verify(
            &self.auth_config,
            &request.refresh_token,
            TokenPurpose::Refresh,
        )?;

        let user = self
            .users
            .find_by_email(&claims.sub)
            .await?
            .ok_or_else(|| AppError::NotFound("User".to_string()))?;

        // Rotation: both tokens are re-minted.
        self.issue_pair(&user)
    }

    /// Fetch a user by id
    pub async fn get_user(&self, user_id: Uuid) -> Result<User, AppError> {
        self.users
            .find_by_id(user_id)
            .await?
            .ok_or_else(|| AppError::NotFound("User".to_string()))
    }

    /// "admin" or "user", from the global role
    pub async fn user_type(&self, user_id: Uuid) -> Result<&'static str, AppError> {
        let user = self.get_user(user_id).await?;
        Ok(if user.is_admin() { "admin" } else { "user" })
    }

    /// Grant the global admin role
    pub async fn promote_to_admin(&self, user_id: Uuid) -> Result<(), AppError> {
        let user = self.get_user(user_id).await?;

        if user.is_admin() {
            return Err(AppError::Conflict("User is already an admin".to_string()));
        }

        self.users.set_role(user.id, UserRole::Admin).await?;
        tracing::info!(%user_id, "promoted user to admin");
        Ok(())
    }

    /// Revoke the global admin role
    pub async fn demote_to_user(&self, user_id: Uuid) -> Result<(), AppError> {
        let user = self.get_user(user_id).await?;

        if !user.is_admin() {
            return Err(AppError::BadRequest("User is not an admin".to_string()));
        }

        self.users.set_role(user.id, UserRole::VerifiedEmail).await?;
        tracing::info!(%user_id, "demoted admin to user");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::MemoryStore;
    use crate::testing::{FailingMailer, MemoryFileStore, RecordingMailer, StaticVerifier};

    struct Harness {
        store: Arc<MemoryStore>,
        mailer: Arc<RecordingMailer>,
        config: AuthConfig,
    }

    impl Harness {
        fn new() -> Self {
            Self {
                store: Arc::new(MemoryStore::new()),
                mailer: Arc::new(RecordingMailer::default()),
                config: AuthConfig::default(),
            }
        }

        fn service(&self) -> AuthService {
            self.service_with_verifier(StaticVerifier::rejecting())
        }

        fn service_with_verifier(&self, verifier: StaticVerifier) -> AuthService {
            AuthService::new(
                self.store.clone(),
                self.mailer.clone(),
                Arc::new(verifier),
                Arc::new(MemoryFileStore::default()),
                self.config.clone(),
                "http://localhost:3000".to_string(),
            )
        }
    }

    fn register_request(email: &str) -> RegisterRequest {
        RegisterRequest {
            email: email.to_string(),
            password: "hunter2!".to_string(),
            name: "Some User".to_string(),
            profile_photo: None,
        }
    }

    fn login_request(email: &str, password: &str) -> LoginRequest {
        LoginRequest {
            email: email.to_string(),
            password: password.to_string(),
        }
    }

    #[tokio::test]
    async fn test_register_then_login() {
        let harness = Harness::new();
        let service = harness.service();

        let registered = service.register(register_request("a@example.com")).await.unwrap();
        assert_eq!(registered.email, "a@example.com");

        let tokens = service
            .login(login_request("a@example.com", "hunter2!"))
            .await
            .unwrap();
        assert_eq!(tokens.token_type, "bearer");
        assert_eq!(tokens.role, "Verified Email");

        // Both tokens decode to the login email
        let access =
            token::verify(&harness.config, &tokens.access_token, TokenPurpose::Access).unwrap();
        assert_eq!(access.sub, "a@example.com");
        let refresh =
            token::verify(&harness.config, &tokens.refresh_token, TokenPurpose::Refresh).unwrap();
        assert_eq!(refresh.sub, "a@example.com");
    }

    #[tokio::test]
    async fn test_login_failures_are_unauthorized() {
        let harness = Harness::new();
        let service = harness.service();
        service.register(register_request("a@example.com")).await.unwrap();

        let unknown = service
            .login(login_request("nobody@example.com", "hunter2!"))
            .await
            .unwrap_err();
        assert!(matches!(unknown, AppError::Unauthorized(_)));

        let wrong = service
            .login(login_request("a@example.com", "wrong-password"))
            .await
            .unwrap_err();
        assert!(matches!(wrong, AppError::Unauthorized(_)));
    }

    #[tokio::test]
    async fn test_register_duplicate_email_conflicts() {
        let harness = Harness::new();
        let service = harness.service();

        service.register(register_request("a@example.com")).await.unwrap();
        let err = service.register(register_request("a@example.com")).await.unwrap_err();
        assert!(matches!(err, AppError::Conflict(_)));
    }

    #[tokio::test]
    async fn test_register_rejects_invalid_email() {
        let harness = Harness::new();
        let service = harness.service();

        let err = service.register(register_request("not-an-email")).await.unwrap_err();
        assert!(matches!(err, AppError::BadRequest(_)));
    }

    #[tokio::test]
    async fn test_register_with_photo() {
        let harness = Harness::new();
        let service = harness.service();

        let mut request = register_request("a@example.com");
        request.profile_photo = Some(ProfilePhotoUpload {
            content_type: "image/png".to_string(),
            data: base64::engine::general_purpose::STANDARD.encode(b"png-bytes"),
        });

        let registered = service.register(request).await.unwrap();
        assert!(registered.profile_photo.is_some());
    }

    #[tokio::test]
    async fn test_register_rejects_unsupported_photo_type() {
        let harness = Harness::new();
        let service = harness.service();

        let mut request = register_request("a@example.com");
        request.profile_photo = Some(ProfilePhotoUpload {
            content_type: "application/pdf".to_string(),
            data: base64::engine::general_purpose::STANDARD.encode(b"%PDF-"),
        });

        let err = service.register(request).await.unwrap_err();
        assert!(matches!(err, AppError::UnsupportedMediaType(_)));

        // And the user was not created
        assert!(harness
            .store
            .find_by_email("a@example.com")
            .await
            .unwrap()
            .is_none());
    }

    #[tokio::test]
    async fn test_google_login_provisions_once() {
        let harness = Harness::new();
        let service = harness.service_with_verifier(StaticVerifier::accepting("fed@example.com"));

        let first = service
            .google_login(GoogleLoginRequest {
                token: "provider-token".to_string(),
            })
            .await
            .unwrap();
        assert_eq!(first.email, "fed@example.com");
        assert_eq!(first.role, "Verified Email");

        let second = service
            .google_login(GoogleLoginRequest {
                token: "provider-token".to_string(),
            })
            .await
            .unwrap();
        assert_eq!(second.id, first.id);

        let user = harness
            .store
            .find_by_email("fed@example.com")
            .await
            .unwrap()
            .unwrap();
        assert!(user.name.is_none());
        assert!(!user.password_hash.is_empty());
    }

    #[tokio::test]
    async fn test_google_login_invalid_token() {
        let harness = Harness::new();
        let service = harness.service_with_verifier(StaticVerifier::rejecting());

        let err = service
            .google_login(GoogleLoginRequest {
                token: "bad".to_string(),
            })
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::Unauthorized(_)));
    }

    #[tokio::test]
    async fn test_forgot_password_does_not_leak_existence() {
        let harness = Harness::new();
        let service = harness.service();
        service.register(register_request("a@example.com")).await.unwrap();

        let known = service
            .forgot_password(ForgotPasswordRequest {
                email: "a@example.com".to_string(),
            })
            .await
            .unwrap();
        let unknown = service
            .forgot_password(ForgotPasswordRequest {
                email: "nobody@example.com".to_string(),
            })
            .await
            .unwrap();

        assert_eq!(known, unknown);

        // Only the real account got mail, with a reset link inside
        let sent = harness.mailer.sent.lock().unwrap();
        assert_eq!(sent.len(), 1);
        assert_eq!(sent[0].to, "a@example.com");
        assert!(sent[0].html.contains("/reset_password?token="));
    }

    #[tokio::test]
    async fn test_forgot_password_survives_delivery_failure() {
        let harness = Harness::new();
        let service = AuthService::new(
            harness.store.clone(),
            Arc::new(FailingMailer),
            Arc::new(StaticVerifier::rejecting()),
            Arc::new(MemoryFileStore::default()),
            harness.config.clone(),
            "http://localhost:3000".to_string(),
        );
        service.register(register_request("a@example.com")).await.unwrap();

        let message = service
            .forgot_password(ForgotPasswordRequest {
                email: "a@example.com".to_string(),
            })
            .await
            .unwrap();
        assert_eq!(message, GENERIC_RESET_MESSAGE);
    }

    #[tokio::test]
    async fn test_change_password_flow() {
        let harness = Harness::new();
        let service = harness.service();
        service.register(register_request("a@example.com")).await.unwrap();

        let reset = token::issue_reset(&harness.config, "a@example.com").unwrap();
        service
            .change_password(ChangePasswordRequest {
                token: reset,
                password: "new-password!".to_string(),
            })
            .await
            .unwrap();

        assert!(service
            .login(login_request("a@example.com", "new-password!"))
            .await
            .is_ok());
        assert!(service
            .login(login_request("a@example.com", "hunter2!"))
            .await
            .is_err());
    }

    #[tokio::test]
    async fn test_change_password_rejects_access_token() {
        let harness = Harness::new();
        let service = harness.service();
        service.register(register_request("a@example.com")).await.unwrap();

        // An ordinary access token must not work as a reset capability
        let access = token::issue_access(&harness.config, "a@example.com").unwrap();
        let err = service
            .change_password(ChangePasswordRequest {
                token: access,
                password: "new-password!".to_string(),
            })
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::InvalidToken));
    }

    #[tokio::test]
    async fn test_change_password_for_vanished_user() {
        let harness = Harness::new();
        let service = harness.service();

        let reset = token::issue_reset(&harness.config, "ghost@example.com").unwrap();
        let err = service
            .change_password(ChangePasswordRequest {
                token: reset,
                password: "new-password!".to_string(),
            })
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::NotFound(_)));
    }

    #[tokio::test]
    async fn test_refresh_rotates_pair() {
        let harness = Harness::new();
        let service = harness.service();
        service.register(register_request("a@example.com")).await.unwrap();

        let tokens = service
            .login(login_request("a@example.com", "hunter2!"))
            .await
            .unwrap();

        let rotated = service
            .refresh(RefreshRequest {
                refresh_token: tokens.refresh_token.clone(),
            })
            .await
            .unwrap();
        assert!(
            token::verify(&harness.config, &rotated.access_token, TokenPurpose::Access).is_ok()
        );
        assert!(
            token::verify(&harness.config, &rotated.refresh_token, TokenPurpose::Refresh).is_ok()
        );

        // An access token is not a refresh token
        let err = service
            .refresh(RefreshRequest {
                refresh_token: tokens.access_token,
            })
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::InvalidToken));
    }

    #[tokio::test]
    async fn test_promote_and_demote() {
        let harness = Harness::new();
        let service = harness.service();
        let registered = service.register(register_request("a@example.com")).await.unwrap();
        let id = registered.user_id;

        assert_eq!(service.user_type(id).await.unwrap(), "user");

        service.promote_to_admin(id).await.unwrap();
        assert_eq!(service.user_type(id).await.unwrap(), "admin");

        let err = service.promote_to_admin(id).await.unwrap_err();
        assert!(matches!(err, AppError::Conflict(_)));

        service.demote_to_user(id).await.unwrap();
        assert_eq!(service.user_type(id).await.unwrap(), "user");

        let err = service.demote_to_user(id).await.unwrap_err();
        assert!(matches!(err, AppError::BadRequest(_)));
    }

    #[tokio::test]
    async fn test_promote_unknown_user() {
        let harness = Harness::new();
        let service = harness.service();

        let err = service.promote_to_admin(Uuid::new_v4()).await.unwrap_err();
        assert!(matches!(err, AppError::NotFound(_)));
    }
}
