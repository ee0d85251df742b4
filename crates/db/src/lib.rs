//! Database interfaces for the coordinator's aggregates.
//!
//! The traits in [`traits`] are the repository contract the rest of the
//! system programs against; [`rocksdb`] holds the rockbound-backed
//! implementations.  Predicate-scoped updates (the system's optimistic
//! locking primitive) live entirely in this crate: callers never see a row
//! lock, only typed outcomes.

pub mod database;
pub mod errors;
pub mod macros;
pub mod rocksdb;
pub mod traits;
pub mod types;

pub use errors::DbError;

pub type DbResult<T> = Result<T, DbError>;
