//! Room join-code generation
//!
//! Codes are short uppercase-alphanumeric handles, generated by rejection
//! sampling against the store. Sampling is bounded: after a fixed number
//! of collisions at one length the length grows, so generation terminates
//! even if the 6-character space ever approaches exhaustion. The unique
//! constraint on the code column remains the final authority; callers
//! retry on a duplicate insert.

use hearth_core::{RoomStore, StoreError};
use rand::Rng;
use thiserror::Error;

pub const CODE_ALPHABET: &[u8] = b"ABCDEFGHIJKLMNOPQRSTUVWXYZ0123456789";
pub const CODE_LEN: usize = 6;

const ATTEMPTS_PER_LENGTH: usize = 32;
const MAX_CODE_LEN: usize = 10;

/// Code generation failure
#[derive(Debug, Error)]
pub enum CodeError {
    #[error(transparent)]
    Store(#[from] StoreError),

    #[error("room code space exhausted")]
    Exhausted,
}

/// Produce a random code of the given length
pub fn random_code(len: usize) -> String {
    let mut rng = rand::thread_rng();
    (0..len)
        .map(|_| CODE_ALPHABET[rng.gen_range(0..CODE_ALPHABET.len())] as char)
        .collect()
}

/// Sample until a code unused by any existing room is found
pub async fn generate_unique_code(store: &dyn RoomStore) -> Result<String, CodeError> {
    for len in CODE_LEN..=MAX_CODE_LEN {
        for _ in 0..ATTEMPTS_PER_LENGTH {
            let code = random_code(len);
            if !store.code_exists(&code).await? {
                return Ok(code);
            }
        }
        tracing::warn!(
            length = len,
            "room code sampling exhausted attempts, widening"
        );
    }

    Err(CodeError::Exhausted)
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use hearth_core::{LeaveOutcome, NewRoom, Room, RoomChanges, RoomMember, RoomRole};
    use uuid::Uuid;

    #[test]
    fn test_random_code_shape() {
        for _ in 0..50 {
            let code = random_code(CODE_LEN);
            assert_eq!(code.len(), CODE_LEN);
            assert!(code.bytes().all(|b| CODE_ALPHABET.contains(&b)));
        }
    }

    #[test]
    fn test_random_codes_differ() {
        let a = random_code(CODE_LEN);
        let b = random_code(CODE_LEN);
        // 36^6 values; a collision here means the sampler is broken
        assert_ne!(a, b);
    }

    /// Store stub whose code space is "full" at 6 characters
    struct SaturatedCodes;

    #[async_trait]
    impl RoomStore for SaturatedCodes {
        async fn code_exists(&self, code: &str) -> Result<bool, StoreError> {
            Ok(code.len() == CODE_LEN)
        }

        async fn create_with_owner(&self, _: NewRoom, _: Uuid) -> Result<Room, StoreError> {
            unreachable!()
        }
        async fn find_by_id(&self, _: Uuid) -> Result<Option<Room>, StoreError> {
            unreachable!()
        }
        async fn find_by_code(&self, _: &str) -> Result<Option<Room>, StoreError> {
            unreachable!()
        }
        async fn rooms_for_user(&self, _: Uuid) -> Result<Vec<Room>, StoreError> {
            unreachable!()
        }
        async fn members(&self, _: Uuid) -> Result<Vec<RoomMember>, StoreError> {
            unreachable!()
        }
        async fn membership(&self, _: Uuid, _: Uuid) -> Result<Option<RoomMember>, StoreError> {
            unreachable!()
        }
        async fn update(&self, _: Uuid, _: RoomChanges) -> Result<Room, StoreError> {
            unreachable!()
        }
        async fn add_member(
            &self,
            _: Uuid,
            _: Uuid,
            _: RoomRole,
        ) -> Result<RoomMember, StoreError> {
            unreachable!()
        }
        async fn remove_member(&self, _: Uuid, _: Uuid) -> Result<LeaveOutcome, StoreError> {
            unreachable!()
        }
        async fn delete(&self, _: Uuid) -> Result<(), StoreError> {
            unreachable!()
        }
    }

    #[tokio::test]
    async fn test_generation_widens_on_collision_pressure() {
        let code = generate_unique_code(&SaturatedCodes).await.unwrap();
        assert_eq!(code.len(), CODE_LEN + 1);
    }
}
