//! # smartcode-adapter-storage-sqlite-sqlx
//!
//! `SQLite` persistence adapter using [sqlx](https://docs.rs/sqlx).
//!
//! ## Responsibilities
//! - Implement the repository port traits defined in `smartcode-app::ports::storage`
//! - Manage `SQLite` connection pool lifecycle
//! - Run database migrations (using sqlx embedded migrations)
//! - Map between domain types and database rows
//!
//! ## Dependency rule
//! Depends on `smartcode-app` (for port traits) and `smartcode-domain` (for domain types).
//! The `app` and `domain` crates must never reference this adapter.

mod codec;
mod device_repo;
mod error;
mod pool;
mod schedule_repo;
mod share_repo;
mod user_repo;

pub use device_repo::SqliteDeviceRepository;
pub use error::StorageError;
pub use pool::{Config, Database};
pub use schedule_repo::SqliteScheduleRepository;
pub use share_repo::SqliteShareRepository;
pub use user_repo::SqliteUserRepository;
