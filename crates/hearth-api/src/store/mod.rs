//! Store implementations
//!
//! Postgres in production; an in-memory store behind the `test-utils`
//! feature for unit and integration tests.

pub mod postgres;

#[cfg(any(test, feature = "test-utils"))]
pub mod memory;

pub use postgres::PgStore;

#[cfg(any(test, feature = "test-utils"))]
pub use memory::MemoryStore;
