//! Room membership engine
//!
//! Room lifecycle and the per-(room, user) membership state machine:
//! create, join by code, leave with ownership succession, owner-only
//! delete, owner/admin partial update. Join preconditions are checked in
//! a fixed order; the store re-validates capacity and uniqueness inside
//! its transaction so concurrent joiners cannot overshoot `max_members`.

use super::code::{self, CodeError};
use crate::error::AppError;
use chrono::{DateTime, Utc};
use hearth_core::{
    LeaveOutcome, NewRoom, Room, RoomChanges, RoomRole, RoomStore, StoreError, UserStore,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use utoipa::ToSchema;
use uuid::Uuid;

/// Attempts to re-generate a code when an insert loses the uniqueness race
const CREATE_RETRIES: usize = 3;

const DEFAULT_MAX_MEMBERS: i32 = 10;

/// Room creation request
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct CreateRoomRequest {
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_members: Option<i32>,
}

/// Partial room update; absent fields are left unchanged
#[derive(Debug, Clone, Default, Serialize, Deserialize, ToSchema)]
pub struct UpdateRoomRequest {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_members: Option<i32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub is_active: Option<bool>,
}

/// Join-by-code request
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct JoinRoomRequest {
    pub code: String,
}

/// Room details
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct RoomResponse {
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

impl From<Room> for RoomResponse {
    fn from(room: Room) -> Self {
        Self {
            id: room.id,
            name: room.name,
            description: room.description,
            code: room.code,
            created_by: room.created_by,
            created_at: room.created_at,
            is_active: room.is_active,
            max_members: room.max_members,
        }
    }
}

/// One member, enriched with the user's name and email
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct MemberInfo {
    pub id: i64,
    pub user_id: Uuid,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub user_name: Option<String>,
    pub user_email: String,
    pub role: RoomRole,
    pub joined_at: DateTime<Utc>,
}

/// Room details plus its member list
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct RoomWithMembers {
    #[serde(flatten)]
    pub room: RoomResponse,
    pub members: Vec<MemberInfo>,
    pub creator_name: String,
}

/// Join confirmation
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct JoinRoomResponse {
    pub message: String,
    pub room_id: Uuid,
    pub room_name: String,
}

/// Room membership service
pub struct RoomService {
    rooms: Arc<dyn RoomStore>,
    users: Arc<dyn UserStore>,
}

impl RoomService {
    pub fn new(rooms: Arc<dyn RoomStore>, users: Arc<dyn UserStore>) -> Self {
        Self { rooms, users }
    }

    /// Create a room; the creator becomes its owner
    pub async fn create(
        &self,
        creator: Uuid,
        request: CreateRoomRequest,
    ) -> Result<RoomResponse, AppError> {
        if request.name.trim().is_empty() {
            return Err(AppError::BadRequest("Room name cannot be empty".to_string()));
        }

        let max_members = request.max_members.unwrap_or(DEFAULT_MAX_MEMBERS);
        if max_members < 1 {
            return Err(AppError::BadRequest(
                "max_members must be at least 1".to_string(),
            ));
        }

        // A concurrent creator can win the code between sampling and
        // insert; the unique constraint catches it and we re-sample.
        let mut last_err = None;
        for _ in 0..CREATE_RETRIES {
            let code = code::generate_unique_code(self.rooms.as_ref())
                .await
                .map_err(|e| match e {
                    CodeError::Store(s) => AppError::from(s),
                    CodeError::Exhausted => {
                        AppError::Internal("room code space exhausted".to_string())
                    }
                })?;

            match self
                .rooms
                .create_with_owner(
                    NewRoom {
                        name: request.name.clone(),
                        description: request.description.clone(),
                        code,
                        max_members,
                    },
                    creator,
                )
                .await
            {
                Ok(room) => {
                    tracing::info!(room_id = %room.id, code = %room.code, "room created");
                    return Ok(room.into());
                }
                Err(StoreError::Duplicate(_)) => {
                    last_err = Some(StoreError::Duplicate("room code"));
                    continue;
                }
                Err(e) => return Err(e.into()),
            }
        }

        Err(last_err
            .map(AppError::from)
            .unwrap_or_else(|| AppError::Internal("room creation failed".to_string())))
    }

    /// Rooms the user belongs to, with members and creator name
    pub async fn my_rooms(&self, user_id: Uuid) -> Result<Vec<RoomWithMembers>, AppError> {
        let rooms = self.rooms.rooms_for_user(user_id).await?;

        let mut out = Vec::with_capacity(rooms.len());
        for room in rooms {
            out.push(self.with_members(room).await?);
        }
        Ok(out)
    }

    /// Room details; members only
    pub async fn details(&self, user_id: Uuid, room_id: Uuid) -> Result<RoomWithMembers, AppError> {
        if self.rooms.membership(room_id, user_id).await?.is_none() {
            return Err(AppError::Forbidden(
                "You are not a member of this room".to_string(),
            ));
        }

        let room = self
            .rooms
            .find_by_id(room_id)
            .await?
            .ok_or_else(|| AppError::NotFound("Room".to_string()))?;

        self.with_members(room).await
    }

    /// Partial update; owner or room-admin only
    pub async fn update(
        &self,
        user_id: Uuid,
        room_id: Uuid,
        request: UpdateRoomRequest,
    ) -> Result<RoomResponse, AppError> {
        let membership = self.rooms.membership(room_id, user_id).await?;
        let allowed = matches!(
            membership.map(|m| m.role),
            Some(RoomRole::Owner) | Some(RoomRole::Admin)
        );
        if !allowed {
            return Err(AppError::Forbidden(
                "You don't have permission to update this room".to_string(),
            ));
        }

        if let Some(max) = request.max_members {
            if max < 1 {
                return Err(AppError::BadRequest(
                    "max_members must be at least 1".to_string(),
                ));
            }
        }

        let room = self
            .rooms
            .update(
                room_id,
                RoomChanges {
                    name: request.name,
                    description: request.description,
                    max_members: request.max_members,
                    is_active: request.is_active,
                },
            )
            .await?;

        Ok(room.into())
    }

    /// Join a room by its code.
    ///
    /// Precondition order is fixed, first failure wins: unknown code,
    /// inactive room, already a member, room full. The store re-checks
    /// capacity atomically, so a race on the last slot admits exactly one.
    pub async fn join_by_code(
        &self,
        user_id: Uuid,
        code: &str,
    ) -> Result<JoinRoomResponse, AppError> {
        let room = self
            .rooms
            .find_by_code(code)
            .await?
            .ok_or_else(|| AppError::NotFound("Room".to_string()))?;

        if !room.is_active {
            return Err(AppError::BadRequest("Room is not active".to_string()));
        }

        if self.rooms.membership(room.id, user_id).await?.is_some() {
            return Err(AppError::BadRequest(
                "You are already a member of this room".to_string(),
            ));
        }

        let member_count = self.rooms.members(room.id).await?.len() as i32;
        if member_count >= room.max_members {
            return Err(AppError::BadRequest(
                "Room has reached maximum member limit".to_string(),
            ));
        }

        self.rooms
            .add_member(room.id, user_id, RoomRole::Member)
            .await?;

        tracing::info!(room_id = %room.id, %user_id, "user joined room");

        Ok(JoinRoomResponse {
            message: "Successfully joined the room".to_string(),
            room_id: room.id,
            room_name: room.name,
        })
    }

    /// Leave a room.
    ///
    /// An owner leaving hands the room to the admin-first, lowest-id
    /// successor; a sole owner leaving deletes the room.
    pub async fn leave(&self, user_id: Uuid, room_id: Uuid) -> Result<String, AppError> {
        if self.rooms.membership(room_id, user_id).await?.is_none() {
            return Err(AppError::BadRequest(
                "You are not a member of this room".to_string(),
            ));
        }

        let outcome = self.rooms.remove_member(room_id, user_id).await?;

        match &outcome {
            LeaveOutcome::OwnershipTransferred { new_owner_id } => {
                tracing::info!(%room_id, %user_id, %new_owner_id, "ownership transferred on leave");
            }
            LeaveOutcome::RoomDeleted => {
                tracing::info!(%room_id, %user_id, "last member left, room deleted");
            }
            LeaveOutcome::Removed => {}
        }

        Ok("Successfully left the room".to_string())
    }

    /// Delete a room; owner only, cascades memberships
    pub async fn delete(&self, user_id: Uuid, room_id: Uuid) -> Result<String, AppError> {
        if self.rooms.find_by_id(room_id).await?.is_none() {
            return Err(AppError::NotFound("Room".to_string()));
        }

        let is_owner = self
            .rooms
            .membership(room_id, user_id)
            .await?
            .map(|m| m.role == RoomRole::Owner)
            .unwrap_or(false);
        if !is_owner {
            return Err(AppError::Forbidden(
                "Only the room owner can delete this room".to_string(),
            ));
        }

        self.rooms.delete(room_id).await?;
        tracing::info!(%room_id, %user_id, "room deleted by owner");

        Ok("Room deleted successfully".to_string())
    }

    async fn with_members(&self, room: Room) -> Result<RoomWithMembers, AppError> {
        let members = self.rooms.members(room.id).await?;

        let mut infos = Vec::with_capacity(members.len());
        for member in members {
            let user = self.users.find_by_id(member.user_id).await?;
            infos.push(MemberInfo {
                id: member.id,
                user_id: member.user_id,
                user_name: user.as_ref().and_then(|u| u.name.clone()),
                user_email: user.map(|u| u.email).unwrap_or_default(),
                role: member.role,
                joined_at: member.joined_at,
            });
        }

        let creator_name = self
            .users
            .find_by_id(room.created_by)
            .await?
            .and_then(|u| u.name)
            .unwrap_or_else(|| "Unknown".to_string());

        Ok(RoomWithMembers {
            room: room.into(),
            members: infos,
            creator_name,
        })
    }
}
