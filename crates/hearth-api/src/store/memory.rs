//! In-memory store for tests
//!
//! A mutex guards the whole dataset, so every trait operation is atomic
//! by construction. The concurrency tests lean on that: `add_member`
//! either admits a joiner or reports the room full, never both.

use async_trait::async_trait;
use chrono::Utc;
use hearth_core::{
    choose_successor, LeaveOutcome, NewRoom, NewUser, Room, RoomChanges, RoomMember, RoomRole,
    RoomStore, StoreError, User, UserRole, UserStore,
};
use std::sync::Mutex;
use uuid::Uuid;

#[derive(Default)]
struct Inner {
    users: Vec<User>,
    rooms: Vec<Room>,
    members: Vec<RoomMember>,
    next_member_id: i64,
}

/// Mutex-guarded in-memory implementation of both stores
#[derive(Default)]
pub struct MemoryStore {
    inner: Mutex<Inner>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Test helper: force a member's room role (there is no public API
    /// operation for room-role changes).
    pub fn set_member_role(&self, room_id: Uuid, user_id: Uuid, role: RoomRole) {
        let mut inner = self.inner.lock().unwrap();
        if let Some(m) = inner
            .members
            .iter_mut()
            .find(|m| m.room_id == room_id && m.user_id == user_id)
        {
            m.role = role;
        }
    }
}

impl Inner {
    fn push_member(&mut self, room_id: Uuid, user_id: Uuid, role: RoomRole) -> RoomMember {
        self.next_member_id += 1;
        let member = RoomMember {
            id: self.next_member_id,
            room_id,
            user_id,
            role,
            joined_at: Utc::now(),
        };
        self.members.push(member.clone());
        member
    }
}

#[async_trait]
impl UserStore for MemoryStore {
    async fn create(&self, user: NewUser) -> Result<User, StoreError> {
        let mut inner = self.inner.lock().unwrap();

        if inner.users.iter().any(|u| u.email == user.email) {
            return Err(StoreError::Duplicate("email"));
        }

        let created = User {
            id: Uuid::new_v4(),
            email: user.email,
            password_hash: user.password_hash,
            name: user.name,
            role: user.role,
            profile_photo: user.profile_photo,
            created_at: Utc::now(),
        };
        inner.users.push(created.clone());
        Ok(created)
    }

    async fn find_by_email(&self, email: &str) -> Result<Option<User>, StoreError> {
        let inner = self.inner.lock().unwrap();
        Ok(inner.users.iter().find(|u| u.email == email).cloned())
    }

    async fn find_by_id(&self, id: Uuid) -> Result<Option<User>, StoreError> {
        let inner = self.inner.lock().unwrap();
        Ok(inner.users.iter().find(|u| u.id == id).cloned())
    }

    async fn update_password(&self, id: Uuid, password_hash: &str) -> Result<(), StoreError> {
        let mut inner = self.inner.lock().unwrap();
        let user = inner
            .users
            .iter_mut()
            .find(|u| u.id == id)
            .ok_or(StoreError::NotFound("User"))?;
        user.password_hash = password_hash.to_string();
        Ok(())
    }

    async fn set_role(&self, id: Uuid, role: UserRole) -> Result<(), StoreError> {
        let mut inner = self.inner.lock().unwrap();
        let user = inner
            .users
            .iter_mut()
            .find(|u| u.id == id)
            .ok_or(StoreError::NotFound("User"))?;
        user.role = role;
        Ok(())
    }
}

#[async_trait]
impl RoomStore for MemoryStore {
    async fn create_with_owner(&self, room: NewRoom, owner: Uuid) -> Result<Room, StoreError> {
        let mut inner = self.inner.lock().unwrap();

        if inner.rooms.iter().any(|r| r.code == room.code) {
            return Err(StoreError::Duplicate("room code"));
        }

        let created = Room {
            id: Uuid::new_v4(),
            name: room.name,
            description: room.description,
            code: room.code,
            created_by: owner,
            created_at: Utc::now(),
            is_active: true,
            max_members: room.max_members,
        };
        inner.rooms.push(created.clone());
        inner.push_member(created.id, owner, RoomRole::Owner);

        Ok(created)
    }

    async fn find_by_id(&self, id: Uuid) -> Result<Option<Room>, StoreError> {
        let inner = self.inner.lock().unwrap();
        Ok(inner.rooms.iter().find(|r| r.id == id).cloned())
    }

    async fn find_by_code(&self, code: &str) -> Result<Option<Room>, StoreError> {
        let inner = self.inner.lock().unwrap();
        Ok(inner.rooms.iter().find(|r| r.code == code).cloned())
    }

    async fn code_exists(&self, code: &str) -> Result<bool, StoreError> {
        let inner = self.inner.lock().unwrap();
        Ok(inner.rooms.iter().any(|r| r.code == code))
    }

    async fn rooms_for_user(&self, user_id: Uuid) -> Result<Vec<Room>, StoreError> {
        let inner = self.inner.lock().unwrap();
        let room_ids: Vec<Uuid> = inner
            .members
            .iter()
            .filter(|m| m.user_id == user_id)
            .map(|m| m.room_id)
            .collect();
        Ok(inner
            .rooms
            .iter()
            .filter(|r| room_ids.contains(&r.id))
            .cloned()
            .collect())
    }

    async fn members(&self, room_id: Uuid) -> Result<Vec<RoomMember>, StoreError> {
        let inner = self.inner.lock().unwrap();
        let mut members: Vec<RoomMember> = inner
            .members
            .iter()
            .filter(|m| m.room_id == room_id)
            .cloned()
            .collect();
        members.sort_by_key(|m| m.id);
        Ok(members)
    }

    async fn membership(
        &self,
        room_id: Uuid,
        user_id: Uuid,
    ) -> Result<Option<RoomMember>, StoreError> {
        let inner = self.inner.lock().unwrap();
        Ok(inner
            .members
            .iter()
            .find(|m| m.room_id == room_id && m.user_id == user_id)
            .cloned())
    }

    async fn update(&self, id: Uuid, changes: RoomChanges) -> Result<Room, StoreError> {
        let mut inner = self.inner.lock().unwrap();
        let room = inner
            .rooms
            .iter_mut()
            .find(|r| r.id == id)
            .ok_or(StoreError::NotFound("Room"))?;

        if let Some(name) = changes.name {
            room.name = name;
        }
        if let Some(description) = changes.description {
            room.description = Some(description);
        }
        if let Some(max_members) = changes.max_members {
            room.max_members = max_members;
        }
        if let Some(is_active) = changes.is_active {
            room.is_active = is_active;
        }

        Ok(room.clone())
    }

    async fn add_member(
        &self,
        room_id: Uuid,
        user_id: Uuid,
        role: RoomRole,
    ) -> Result<RoomMember, StoreError> {
        let mut inner = self.inner.lock().unwrap();

        let max_members = inner
            .rooms
            .iter()
            .find(|r| r.id == room_id)
            .map(|r| r.max_members)
            .ok_or(StoreError::NotFound("Room"))?;

        if inner
            .members
            .iter()
            .any(|m| m.room_id == room_id && m.user_id == user_id)
        {
            return Err(StoreError::AlreadyMember);
        }

        let count = inner.members.iter().filter(|m| m.room_id == room_id).count();
        if count as i32 >= max_members {
            return Err(StoreError::RoomFull);
        }

        Ok(inner.push_member(room_id, user_id, role))
    }

    async fn remove_member(
        &self,
        room_id: Uuid,
        user_id: Uuid,
    ) -> Result<LeaveOutcome, StoreError> {
        let mut inner = self.inner.lock().unwrap();

        let leaver = inner
            .members
            .iter()
            .find(|m| m.room_id == room_id && m.user_id == user_id)
            .cloned()
            .ok_or(StoreError::NotFound("Membership"))?;

        if leaver.role == RoomRole::Owner {
            let remaining: Vec<RoomMember> = inner
                .members
                .iter()
                .filter(|m| m.room_id == room_id && m.user_id != user_id)
                .cloned()
                .collect();

            if remaining.is_empty() {
                inner.members.retain(|m| m.room_id != room_id);
                inner.rooms.retain(|r| r.id != room_id);
                return Ok(LeaveOutcome::RoomDeleted);
            }

            let successor_id = choose_successor(&remaining)
                .map(|s| (s.id, s.user_id))
                .ok_or_else(|| StoreError::Backend("no successor candidate".to_string()))?;

            if let Some(m) = inner.members.iter_mut().find(|m| m.id == successor_id.0) {
                m.role = RoomRole::Owner;
            }
            inner.members.retain(|m| m.id != leaver.id);

            return Ok(LeaveOutcome::OwnershipTransferred {
                new_owner_id: successor_id.1,
            });
        }

        inner.members.retain(|m| m.id != leaver.id);
        Ok(LeaveOutcome::Removed)
    }

    async fn delete(&self, room_id: Uuid) -> Result<(), StoreError> {
        let mut inner = self.inner.lock().unwrap();

        if !inner.rooms.iter().any(|r| r.id == room_id) {
            return Err(StoreError::NotFound("Room"));
        }

        inner.members.retain(|m| m.room_id != room_id);
        inner.rooms.retain(|r| r.id != room_id);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn new_user(email: &str) -> NewUser {
        NewUser {
            email: email.to_string(),
            password_hash: "hash".to_string(),
            name: Some("Someone".to_string()),
            role: UserRole::VerifiedEmail,
            profile_photo: None,
        }
    }

    fn new_room(code: &str, max_members: i32) -> NewRoom {
        NewRoom {
            name: "Test Room".to_string(),
            description: None,
            code: code.to_string(),
            max_members,
        }
    }

    #[tokio::test]
    async fn test_duplicate_email_rejected() {
        let store = MemoryStore::new();
        store.create(new_user("a@example.com")).await.unwrap();

        let err = store.create(new_user("a@example.com")).await.unwrap_err();
        assert!(matches!(err, StoreError::Duplicate("email")));
    }

    #[tokio::test]
    async fn test_add_member_enforces_capacity() {
        let store = MemoryStore::new();
        let owner = Uuid::new_v4();
        let room = store
            .create_with_owner(new_room("ABC123", 2), owner)
            .await
            .unwrap();

        store
            .add_member(room.id, Uuid::new_v4(), RoomRole::Member)
            .await
            .unwrap();

        let err = store
            .add_member(room.id, Uuid::new_v4(), RoomRole::Member)
            .await
            .unwrap_err();
        assert!(matches!(err, StoreError::RoomFull));

        assert_eq!(store.members(room.id).await.unwrap().len(), 2);
    }

    #[tokio::test]
    async fn test_add_member_rejects_duplicate_pair() {
        let store = MemoryStore::new();
        let owner = Uuid::new_v4();
        let room = store
            .create_with_owner(new_room("ABC123", 5), owner)
            .await
            .unwrap();

        let err = store
            .add_member(room.id, owner, RoomRole::Member)
            .await
            .unwrap_err();
        assert!(matches!(err, StoreError::AlreadyMember));
    }

    #[tokio::test]
    async fn test_owner_leave_transfers_then_deletes() {
        let store = MemoryStore::new();
        let owner = Uuid::new_v4();
        let other = Uuid::new_v4();
        let room = store
            .create_with_owner(new_room("ABC123", 5), owner)
            .await
            .unwrap();
        store
            .add_member(room.id, other, RoomRole::Member)
            .await
            .unwrap();

        let outcome = store.remove_member(room.id, owner).await.unwrap();
        assert_eq!(
            outcome,
            LeaveOutcome::OwnershipTransferred { new_owner_id: other }
        );

        let members = store.members(room.id).await.unwrap();
        assert_eq!(members.len(), 1);
        assert_eq!(members[0].role, RoomRole::Owner);

        let outcome = store.remove_member(room.id, other).await.unwrap();
        assert_eq!(outcome, LeaveOutcome::RoomDeleted);
        assert!(hearth_core::RoomStore::find_by_id(&store, room.id).await.unwrap().is_none());
    }
}
