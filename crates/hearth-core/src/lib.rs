//! Hearth Core - Domain models, traits, and shared types
//!
//! This crate defines the core abstractions used throughout Hearth:
//! - User, room, and membership models
//! - Storage traits (user store, room store)
//! - External collaborator traits (mail, federated identity, files)
//! - Configuration management

pub mod config;
pub mod external;
pub mod models;
pub mod store;

pub use config::{AppConfig, AuthConfig, ConfigError, DatabaseConfig, MailConfig, ServerConfig};
pub use external::{
    DeliveryError, FileError, FileStore, IdentityError, IdentityVerifier, MailSender,
    VerifiedIdentity,
};
pub use models::{
    choose_successor, LeaveOutcome, NewRoom, NewUser, Room, RoomChanges, RoomMember, RoomRole,
    User, UserRole,
};
pub use store::{RoomStore, StoreError, UserStore};
