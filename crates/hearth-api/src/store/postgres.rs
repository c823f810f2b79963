//! Postgres implementation of the user and room stores
//!
//! Every multi-row invariant runs inside a transaction: room creation
//! inserts the room and the owner membership together; `add_member`
//! locks the room row before re-checking capacity; `remove_member` locks
//! the room row before deciding succession. Unique constraints on
//! `users.email`, `rooms.code`, and `(room_id, user_id)` back the
//! check-then-insert paths (Postgres error 23505).

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use hearth_core::config::DatabaseConfig;
use hearth_core::{
    choose_successor, LeaveOutcome, NewRoom, NewUser, Room, RoomChanges, RoomMember, RoomRole,
    RoomStore, StoreError, User, UserRole, UserStore,
};
use sqlx::postgres::PgPoolOptions;
use sqlx::PgPool;
use uuid::Uuid;

const UNIQUE_VIOLATION: &str = "23505";

/// Postgres-backed store
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Open a connection pool from configuration
    pub async fn connect(config: &DatabaseConfig) -> Result<Self, sqlx::Error> {
        let pool = PgPoolOptions::new()
            .max_connections(config.max_connections)
            .connect(&config.url)
            .await?;
        Ok(Self::new(pool))
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }
}

fn is_unique_violation(err: &sqlx::Error) -> bool {
    matches!(
        err,
        sqlx::Error::Database(db) if db.code().as_deref() == Some(UNIQUE_VIOLATION)
    )
}

fn backend(err: sqlx::Error) -> StoreError {
    StoreError::Backend(err.to_string())
}

#[derive(sqlx::FromRow)]
struct UserRow {
    id: Uuid,
    email: String,
    password_hash: String,
    name: Option<String>,
    role: String,
    profile_photo: Option<String>,
    created_at: DateTime<Utc>,
}

impl TryFrom<UserRow> for User {
    type Error = StoreError;

    fn try_from(row: UserRow) -> Result<Self, StoreError> {
        let role = UserRole::parse(&row.role)
            .ok_or_else(|| StoreError::Backend(format!("unknown user role: {}", row.role)))?;
        Ok(User {
            id: row.id,
            email: row.email,
            password_hash: row.password_hash,
            name: row.name,
            role,
            profile_photo: row.profile_photo,
            created_at: row.created_at,
        })
    }
}

#[derive(sqlx::FromRow)]
struct RoomRow {
    id: Uuid,
    name: String,
    description: Option<String>,
    code: String,
    created_by: Uuid,
    created_at: DateTime<Utc>,
    is_active: bool,
    max_members: i32,
}

impl From<RoomRow> for Room {
    fn from(row: RoomRow) -> Self {
        Room {
            id: row.id,
            name: row.name,
            description: row.description,
            code: row.code,
            created_by: row.created_by,
            created_at: row.created_at,
            is_active: row.is_active,
            max_members: row.max_members,
        }
    }
}

#[derive(sqlx::FromRow)]
struct MemberRow {
    id: i64,
    room_id: Uuid,
    user_id: Uuid,
    role: String,
    joined_at: DateTime<Utc>,
}

impl TryFrom<MemberRow> for RoomMember {
    type Error = StoreError;

    fn try_from(row: MemberRow) -> Result<Self, StoreError> {
        let role = RoomRole::parse(&row.role)
            .ok_or_else(|| StoreError::Backend(format!("unknown member role: {}", row.role)))?;
        Ok(RoomMember {
            id: row.id,
            room_id: row.room_id,
            user_id: row.user_id,
            role,
            joined_at: row.joined_at,
        })
    }
}

const USER_COLUMNS: &str = "id, email, password_hash, name, role, profile_photo, created_at";
const ROOM_COLUMNS: &str = "id, name, description, code, created_by, created_at, is_active, max_members";
const MEMBER_COLUMNS: &str = "id, room_id, user_id, role, joined_at";

#[async_trait]
impl UserStore for PgStore {
    async fn create(&self, user: NewUser) -> Result<User, StoreError> {
        let row = sqlx::query_as::<_, UserRow>(&format!(
            "INSERT INTO users (id, email, password_hash, name, role, profile_photo, created_at) \
             VALUES ($1, $2, $3, $4, $5, $6, NOW()) RETURNING {USER_COLUMNS}"
        ))
        .bind(Uuid::new_v4())
        .bind(&user.email)
        .bind(&user.password_hash)
        .bind(&user.name)
        .bind(user.role.as_str())
        .bind(&user.profile_photo)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| {
            if is_unique_violation(&e) {
                StoreError::Duplicate("email")
            } else {
                backend(e)
            }
        })?;

        row.try_into()
    }

    async fn find_by_email(&self, email: &str) -> Result<Option<User>, StoreError> {
        sqlx::query_as::<_, UserRow>(&format!(
            "SELECT {USER_COLUMNS} FROM users WHERE email = $1"
        ))
        .bind(email)
        .fetch_optional(&self.pool)
        .await
        .map_err(backend)?
        .map(User::try_from)
        .transpose()
    }

    async fn find_by_id(&self, id: Uuid) -> Result<Option<User>, StoreError> {
        sqlx::query_as::<_, UserRow>(&format!("SELECT {USER_COLUMNS} FROM users WHERE id = $1"))
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .map_err(backend)?
            .map(User::try_from)
            .transpose()
    }

    async fn update_password(&self, id: Uuid, password_hash: &str) -> Result<(), StoreError> {
        let result = sqlx::query("UPDATE users SET password_hash = $2 WHERE id = $1")
            .bind(id)
            .bind(password_hash)
            .execute(&self.pool)
            .await
            .map_err(backend)?;

        if result.rows_affected() == 0 {
            return Err(StoreError::NotFound("User"));
        }
        Ok(())
    }

    async fn set_role(&self, id: Uuid, role: UserRole) -> Result<(), StoreError> {
        let result = sqlx::query("UPDATE users SET role = $2 WHERE id = $1")
            .bind(id)
            .bind(role.as_str())
            .execute(&self.pool)
            .await
            .map_err(backend)?;

        if result.rows_affected() == 0 {
            return Err(StoreError::NotFound("User"));
        }
        Ok(())
    }
}

#[async_trait]
impl RoomStore for PgStore {
    async fn create_with_owner(&self, room: NewRoom, owner: Uuid) -> Result<Room, StoreError> {
        let mut tx = self.pool.begin().await.map_err(backend)?;

        let row = sqlx::query_as::<_, RoomRow>(&format!(
            "INSERT INTO rooms (id, name, description, code, created_by, created_at, is_active, max_members) \
             VALUES ($1, $2, $3, $4, $5, NOW(), TRUE, $6) RETURNING {ROOM_COLUMNS}"
        ))
        .bind(Uuid::new_v4())
        .bind(&room.name)
        .bind(&room.description)
        .bind(&room.code)
        .bind(owner)
        .bind(room.max_members)
        .fetch_one(&mut *tx)
        .await
        .map_err(|e| {
            if is_unique_violation(&e) {
                StoreError::Duplicate("room code")
            } else {
                backend(e)
            }
        })?;

        sqlx::query(
            "INSERT INTO room_members (room_id, user_id, role, joined_at) VALUES ($1, $2, 'owner', NOW())",
        )
        .bind(row.id)
        .bind(owner)
        .execute(&mut *tx)
        .await
        .map_err(backend)?;

        tx.commit().await.map_err(backend)?;

        Ok(row.into())
    }

    async fn find_by_id(&self, id: Uuid) -> Result<Option<Room>, StoreError> {
        let row = sqlx::query_as::<_, RoomRow>(&format!(
            "SELECT {ROOM_COLUMNS} FROM rooms WHERE id = $1"
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await
        .map_err(backend)?;

        Ok(row.map(Room::from))
    }

    async fn find_by_code(&self, code: &str) -> Result<Option<Room>, StoreError> {
        let row = sqlx::query_as::<_, RoomRow>(&format!(
            "SELECT {ROOM_COLUMNS} FROM rooms WHERE code = $1"
        ))
        .bind(code)
        .fetch_optional(&self.pool)
        .await
        .map_err(backend)?;

        Ok(row.map(Room::from))
    }

    async fn code_exists(&self, code: &str) -> Result<bool, StoreError> {
        sqlx::query_scalar::<_, bool>("SELECT EXISTS(SELECT 1 FROM rooms WHERE code = $1)")
            .bind(code)
            .fetch_one(&self.pool)
            .await
            .map_err(backend)
    }

    async fn rooms_for_user(&self, user_id: Uuid) -> Result<Vec<Room>, StoreError> {
        let rows = sqlx::query_as::<_, RoomRow>(
            "SELECT r.id, r.name, r.description, r.code, r.created_by, r.created_at, r.is_active, r.max_members \
             FROM rooms r JOIN room_members m ON m.room_id = r.id \
             WHERE m.user_id = $1 ORDER BY r.created_at",
        )
        .bind(user_id)
        .fetch_all(&self.pool)
        .await
        .map_err(backend)?;

        Ok(rows.into_iter().map(Room::from).collect())
    }

    async fn members(&self, room_id: Uuid) -> Result<Vec<RoomMember>, StoreError> {
        let rows = sqlx::query_as::<_, MemberRow>(&format!(
            "SELECT {MEMBER_COLUMNS} FROM room_members WHERE room_id = $1 ORDER BY id"
        ))
        .bind(room_id)
        .fetch_all(&self.pool)
        .await
        .map_err(backend)?;

        rows.into_iter().map(RoomMember::try_from).collect()
    }

    async fn membership(
        &self,
        room_id: Uuid,
        user_id: Uuid,
    ) -> Result<Option<RoomMember>, StoreError> {
        sqlx::query_as::<_, MemberRow>(&format!(
            "SELECT {MEMBER_COLUMNS} FROM room_members WHERE room_id = $1 AND user_id = $2"
        ))
        .bind(room_id)
        .bind(user_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(backend)?
        .map(RoomMember::try_from)
        .transpose()
    }

    async fn update(&self, id: Uuid, changes: RoomChanges) -> Result<Room, StoreError> {
        let row = sqlx::query_as::<_, RoomRow>(&format!(
            "UPDATE rooms SET \
                 name = COALESCE($2, name), \
                 description = COALESCE($3, description), \
                 max_members = COALESCE($4, max_members), \
                 is_active = COALESCE($5, is_active) \
             WHERE id = $1 RETURNING {ROOM_COLUMNS}"
        ))
        .bind(id)
        .bind(changes.name)
        .bind(changes.description)
        .bind(changes.max_members)
        .bind(changes.is_active)
        .fetch_optional(&self.pool)
        .await
        .map_err(backend)?
        .ok_or(StoreError::NotFound("Room"))?;

        Ok(row.into())
    }

    async fn add_member(
        &self,
        room_id: Uuid,
        user_id: Uuid,
        role: RoomRole,
    ) -> Result<RoomMember, StoreError> {
        let mut tx = self.pool.begin().await.map_err(backend)?;

        // Locking the room row serializes concurrent joins on this room.
        let room = sqlx::query_as::<_, RoomRow>(&format!(
            "SELECT {ROOM_COLUMNS} FROM rooms WHERE id = $1 FOR UPDATE"
        ))
        .bind(room_id)
        .fetch_optional(&mut *tx)
        .await
        .map_err(backend)?
        .ok_or(StoreError::NotFound("Room"))?;

        let existing = sqlx::query_scalar::<_, bool>(
            "SELECT EXISTS(SELECT 1 FROM room_members WHERE room_id = $1 AND user_id = $2)",
        )
        .bind(room_id)
        .bind(user_id)
        .fetch_one(&mut *tx)
        .await
        .map_err(backend)?;

        if existing {
            return Err(StoreError::AlreadyMember);
        }

        let count = sqlx::query_scalar::<_, i64>(
            "SELECT COUNT(*) FROM room_members WHERE room_id = $1",
        )
        .bind(room_id)
        .fetch_one(&mut *tx)
        .await
        .map_err(backend)?;

        if count >= room.max_members as i64 {
            return Err(StoreError::RoomFull);
        }

        let row = sqlx::query_as::<_, MemberRow>(&format!(
            "INSERT INTO room_members (room_id, user_id, role, joined_at) \
             VALUES ($1, $2, $3, NOW()) RETURNING {MEMBER_COLUMNS}"
        ))
        .bind(room_id)
        .bind(user_id)
        .bind(role.as_str())
        .fetch_one(&mut *tx)
        .await
        .map_err(|e| {
            if is_unique_violation(&e) {
                StoreError::AlreadyMember
            } else {
                backend(e)
            }
        })?;

        tx.commit().await.map_err(backend)?;

        row.try_into()
    }

    async fn remove_member(
        &self,
        room_id: Uuid,
        user_id: Uuid,
    ) -> Result<LeaveOutcome, StoreError> {
        let mut tx = self.pool.begin().await.map_err(backend)?;

        // Same lock as add_member so joins cannot interleave with a
        // succession decision.
        let room_exists =
            sqlx::query_scalar::<_, Uuid>("SELECT id FROM rooms WHERE id = $1 FOR UPDATE")
                .bind(room_id)
                .fetch_optional(&mut *tx)
                .await
                .map_err(backend)?;

        if room_exists.is_none() {
            return Err(StoreError::NotFound("Membership"));
        }

        let rows = sqlx::query_as::<_, MemberRow>(&format!(
            "SELECT {MEMBER_COLUMNS} FROM room_members WHERE room_id = $1 ORDER BY id FOR UPDATE"
        ))
        .bind(room_id)
        .fetch_all(&mut *tx)
        .await
        .map_err(backend)?;

        let members = rows
            .into_iter()
            .map(RoomMember::try_from)
            .collect::<Result<Vec<_>, _>>()?;

        let leaver = members
            .iter()
            .find(|m| m.user_id == user_id)
            .cloned()
            .ok_or(StoreError::NotFound("Membership"))?;

        let outcome = if leaver.role == RoomRole::Owner {
            let remaining: Vec<RoomMember> = members
                .into_iter()
                .filter(|m| m.user_id != user_id)
                .collect();

            if remaining.is_empty() {
                sqlx::query("DELETE FROM room_members WHERE room_id = $1")
                    .bind(room_id)
                    .execute(&mut *tx)
                    .await
                    .map_err(backend)?;
                sqlx::query("DELETE FROM rooms WHERE id = $1")
                    .bind(room_id)
                    .execute(&mut *tx)
                    .await
                    .map_err(backend)?;

                LeaveOutcome::RoomDeleted
            } else {
                // choose_successor never returns None for a non-empty set
                let successor = choose_successor(&remaining)
                    .ok_or_else(|| StoreError::Backend("no successor candidate".to_string()))?;

                sqlx::query("UPDATE room_members SET role = 'owner' WHERE id = $1")
                    .bind(successor.id)
                    .execute(&mut *tx)
                    .await
                    .map_err(backend)?;
                sqlx::query("DELETE FROM room_members WHERE id = $1")
                    .bind(leaver.id)
                    .execute(&mut *tx)
                    .await
                    .map_err(backend)?;

                LeaveOutcome::OwnershipTransferred {
                    new_owner_id: successor.user_id,
                }
            }
        } else {
            sqlx::query("DELETE FROM room_members WHERE id = $1")
                .bind(leaver.id)
                .execute(&mut *tx)
                .await
                .map_err(backend)?;

            LeaveOutcome::Removed
        };

        tx.commit().await.map_err(backend)?;

        Ok(outcome)
    }

    async fn delete(&self, room_id: Uuid) -> Result<(), StoreError> {
        let mut tx = self.pool.begin().await.map_err(backend)?;

        sqlx::query("DELETE FROM room_members WHERE room_id = $1")
            .bind(room_id)
            .execute(&mut *tx)
            .await
            .map_err(backend)?;

        let result = sqlx::query("DELETE FROM rooms WHERE id = $1")
            .bind(room_id)
            .execute(&mut *tx)
            .await
            .map_err(backend)?;

        if result.rows_affected() == 0 {
            return Err(StoreError::NotFound("Room"));
        }

        tx.commit().await.map_err(backend)?;
        Ok(())
    }
}
