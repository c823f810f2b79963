//! Storage traits for users, rooms, and memberships
//!
//! Trait-based so services can run against Postgres in production and an
//! in-memory store in tests. Operations that span multiple rows
//! (`create_with_owner`, `add_member`, `remove_member`, `delete`) are
//! atomic in every implementation: the capacity check and the
//! ownership-succession swap must not race with concurrent callers.

use async_trait::async_trait;
use thiserror::Error;
use uuid::Uuid;

use crate::models::{
    LeaveOutcome, NewRoom, NewUser, Room, RoomChanges, RoomMember, RoomRole, User, UserRole,
};

/// Storage-layer errors
#[derive(Debug, Error)]
pub enum StoreError {
    /// A unique constraint was violated (email, room code, membership pair)
    #[error("duplicate {0}")]
    Duplicate(&'static str),

    /// The room is at `max_members`
    #[error("room has reached maximum member limit")]
    RoomFull,

    /// The (room, user) membership already exists
    #[error("already a member of this room")]
    AlreadyMember,

    #[error("{0} not found")]
    NotFound(&'static str),

    #[error("storage backend error: {0}")]
    Backend(String),
}

/// Persistence contract for user accounts
#[async_trait]
pub trait UserStore: Send + Sync {
    /// Insert a new user; fails with `Duplicate("email")` if the email
    /// is taken.
    async fn create(&self, user: NewUser) -> Result<User, StoreError>;

    async fn find_by_email(&self, email: &str) -> Result<Option<User>, StoreError>;

    async fn find_by_id(&self, id: Uuid) -> Result<Option<User>, StoreError>;

    async fn update_password(&self, id: Uuid, password_hash: &str) -> Result<(), StoreError>;

    async fn set_role(&self, id: Uuid, role: UserRole) -> Result<(), StoreError>;
}

/// Persistence contract for rooms and memberships
#[async_trait]
pub trait RoomStore: Send + Sync {
    /// Insert the room and its owner membership in one transaction.
    /// Fails with `Duplicate("room code")` on a code collision.
    async fn create_with_owner(&self, room: NewRoom, owner: Uuid) -> Result<Room, StoreError>;

    async fn find_by_id(&self, id: Uuid) -> Result<Option<Room>, StoreError>;

    async fn find_by_code(&self, code: &str) -> Result<Option<Room>, StoreError>;

    async fn code_exists(&self, code: &str) -> Result<bool, StoreError>;

    /// Rooms in which the user currently holds a membership
    async fn rooms_for_user(&self, user_id: Uuid) -> Result<Vec<Room>, StoreError>;

    async fn members(&self, room_id: Uuid) -> Result<Vec<RoomMember>, StoreError>;

    async fn membership(
        &self,
        room_id: Uuid,
        user_id: Uuid,
    ) -> Result<Option<RoomMember>, StoreError>;

    /// Apply a partial update; `None` fields are untouched.
    async fn update(&self, id: Uuid, changes: RoomChanges) -> Result<Room, StoreError>;

    /// Insert a membership, re-validating capacity and uniqueness inside
    /// the same transaction. Exactly one of two concurrent callers racing
    /// for the last slot succeeds; the other observes `RoomFull`.
    async fn add_member(
        &self,
        room_id: Uuid,
        user_id: Uuid,
        role: RoomRole,
    ) -> Result<RoomMember, StoreError>;

    /// Remove a membership, transferring ownership or deleting the room
    /// as needed, all in one transaction. The successor is chosen with
    /// [`crate::models::choose_successor`].
    async fn remove_member(&self, room_id: Uuid, user_id: Uuid)
        -> Result<LeaveOutcome, StoreError>;

    /// Delete the room and all its memberships in one transaction.
    async fn delete(&self, room_id: Uuid) -> Result<(), StoreError>;
}
