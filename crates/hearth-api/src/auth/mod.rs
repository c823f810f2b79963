//! Authentication and authorization
//!
//! - Token issuance and verification (access/refresh/reset, purpose-checked)
//! - Password hashing with Argon2
//! - Google federated login verification
//! - Authentication flows (login, register, reset, refresh)
//! - Authorization guard middleware for protected routes

pub mod google;
pub mod middleware;
pub mod password;
pub mod service;
pub mod token;

pub use google::GoogleTokenVerifier;
pub use middleware::{auth_guard, AuthGuardError, CurrentUser};
pub use password::{generate_password, hash_password, verify_password};
pub use service::{
    AuthService, ChangePasswordRequest, ForgotPasswordRequest, GoogleLoginRequest, LoginRequest,
    ProfilePhotoUpload, RefreshRequest, RegisterRequest, RegisterResponse, TokenResponse,
};
pub use token::{issue_access, issue_refresh, issue_reset, verify, Claims, TokenPurpose};
