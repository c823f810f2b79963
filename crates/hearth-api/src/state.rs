//! Application state shared across handlers

use crate::auth::AuthService;
use crate::rooms::RoomService;
use hearth_core::config::AppConfig;
use hearth_core::{FileStore, IdentityVerifier, MailSender, RoomStore, UserStore};
use std::sync::Arc;
use std::time::Instant;

/// Application state shared across handlers
pub struct AppState {
    /// Application configuration
    pub config: AppConfig,
    /// Server start time
    pub start_time: Instant,
    /// User persistence
    pub users: Arc<dyn UserStore>,
    /// Room and membership persistence
    pub rooms: Arc<dyn RoomStore>,
    /// Outbound mail
    pub mail: Arc<dyn MailSender>,
    /// Federated identity verification
    pub verifier: Arc<dyn IdentityVerifier>,
    /// Uploaded file storage
    pub files: Arc<dyn FileStore>,
}

impl AppState {
    pub fn new(
        config: AppConfig,
        users: Arc<dyn UserStore>,
        rooms: Arc<dyn RoomStore>,
        mail: Arc<dyn MailSender>,
        verifier: Arc<dyn IdentityVerifier>,
        files: Arc<dyn FileStore>,
    ) -> Self {
        Self {
            config,
            start_time: Instant::now(),
            users,
            rooms,
            mail,
            verifier,
            files,
        }
    }

    /// Get uptime in seconds
    pub fn uptime_secs(&self) -> u64 {
        self.start_time.elapsed().as_secs()
    }

    pub fn auth_service(&self) -> AuthService {
        AuthService::new(
            self.users.clone(),
            self.mail.clone(),
            self.verifier.clone(),
            self.files.clone(),
            self.config.auth.clone(),
            self.config.server.frontend_url.clone(),
        )
    }

    pub fn room_service(&self) -> RoomService {
        RoomService::new(self.rooms.clone(), self.users.clone())
    }
}
