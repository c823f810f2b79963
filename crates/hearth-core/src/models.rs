//! Domain models for users, rooms, and memberships
//!
//! These are the records the stores persist and the services operate on.
//! The password hash is never serialized into API responses.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

/// Global user role
///
/// `Admin` is an orthogonal, global elevation; it is unrelated to the
/// per-room roles on [`RoomMember`].
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, ToSchema)]
pub enum UserRole {
    #[serde(rename = "Verified Email")]
    VerifiedEmail,
    Admin,
}

impl UserRole {
    pub fn as_str(&self) -> &'static str {
        match self {
            UserRole::VerifiedEmail => "Verified Email",
            UserRole::Admin => "Admin",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "Verified Email" => Some(UserRole::VerifiedEmail),
            "Admin" => Some(UserRole::Admin),
            _ => None,
        }
    }
}

impl std::fmt::Display for UserRole {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// User account
///
/// Created on registration or on first federated login. Never hard-deleted.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct User {
    pub id: Uuid,

    /// Email address (unique, used for login and as the token subject)
    pub email: String,

    /// Argon2id hash; never serialized in API responses
    #[serde(skip_serializing)]
    pub password_hash: String,

    /// Display name; absent for auto-provisioned federated accounts
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,

    pub role: UserRole,

    /// Reference into the file store for the profile photo
    #[serde(skip_serializing_if = "Option::is_none")]
    pub profile_photo: Option<String>,

    pub created_at: DateTime<Utc>,
}

impl User {
    pub fn is_admin(&self) -> bool {
        self.role == UserRole::Admin
    }
}

/// Fields needed to insert a new user
#[derive(Debug, Clone)]
pub struct NewUser {
    pub email: String,
    pub password_hash: String,
    pub name: Option<String>,
    pub role: UserRole,
    pub profile_photo: Option<String>,
}

/// Per-room membership role
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum RoomRole {
    Owner,
    Admin,
    Member,
}

impl RoomRole {
    pub fn as_str(&self) -> &'static str {
        match self {
            RoomRole::Owner => "owner",
            RoomRole::Admin => "admin",
            RoomRole::Member => "member",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "owner" => Some(RoomRole::Owner),
            "admin" => Some(RoomRole::Admin),
            "member" => Some(RoomRole::Member),
            _ => None,
        }
    }
}

impl std::fmt::Display for RoomRole {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// A joinable room
///
/// The code is the public join handle and is unique; names are not.
/// `is_active = false` blocks new joins but does not evict members.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct Room {
    pub id: Uuid,
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    pub code: String,
    pub created_by: Uuid,
    pub created_at: DateTime<Utc>,
    pub is_active: bool,
    pub max_members: i32,
}

/// Fields needed to insert a new room
#[derive(Debug, Clone)]
pub struct NewRoom {
    pub name: String,
    pub description: Option<String>,
    pub code: String,
    pub max_members: i32,
}

/// Partial room update; `None` fields are left untouched
#[derive(Debug, Clone, Default)]
pub struct RoomChanges {
    pub name: Option<String>,
    pub description: Option<String>,
    pub max_members: Option<i32>,
    pub is_active: Option<bool>,
}

/// Membership of one user in one room
///
/// The id is a monotonically assigned sequence number; ownership
/// succession uses it as the deterministic tie-break.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct RoomMember {
    pub id: i64,
    pub room_id: Uuid,
    pub user_id: Uuid,
    pub role: RoomRole,
    pub joined_at: DateTime<Utc>,
}

/// Result of removing a member from a room
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LeaveOutcome {
    /// A non-owner left, or an owner left and a successor took over
    Removed,
    /// The owner left; ownership moved to `new_owner_id` before removal
    OwnershipTransferred { new_owner_id: Uuid },
    /// The sole remaining member left; the room was deleted
    RoomDeleted,
}

/// Pick the member that inherits ownership when the owner leaves.
///
/// `remaining` must not contain the leaver. Admin-role members win over
/// plain members; within a role class the lowest membership id wins.
/// Both store implementations call this so the rule lives in one place.
pub fn choose_successor(remaining: &[RoomMember]) -> Option<&RoomMember> {
    remaining
        .iter()
        .filter(|m| m.role == RoomRole::Admin)
        .min_by_key(|m| m.id)
        .or_else(|| remaining.iter().min_by_key(|m| m.id))
}
