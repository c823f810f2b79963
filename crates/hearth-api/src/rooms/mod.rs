//! Room lifecycle and membership

pub mod code;
pub mod service;

pub use code::{generate_unique_code, random_code, CodeError, CODE_ALPHABET, CODE_LEN};
pub use service::{
    CreateRoomRequest, JoinRoomRequest, JoinRoomResponse, MemberInfo, RoomResponse, RoomService,
    RoomWithMembers, UpdateRoomRequest,
};
