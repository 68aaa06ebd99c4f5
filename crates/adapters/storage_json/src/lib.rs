//! # smartcode-adapter-storage-json
//!
//! JSON-file persistence adapter.
//!
//! ## Responsibilities
//! - Implement the repository port traits defined in `smartcode-app::ports::storage`
//! - Keep one file per collection in a data directory: `devices.json`,
//!   `users.json`, `shares.json` and `schedules.json`
//! - Read household files in the older flat layout and normalise them
//!
//! ## Dependency rule
//! Depends on `smartcode-app` (for port traits) and `smartcode-domain` (for domain types).
//! The `app` and `domain` crates must never reference this adapter.

mod device_repo;
mod error;
mod file;
mod record;
mod schedule_repo;
mod share_repo;
mod user_repo;

use std::path::Path;

use smartcode_domain::error::SmartHomeError;

pub use device_repo::JsonDeviceRepository;
pub use error::StorageError;
pub use schedule_repo::JsonScheduleRepository;
pub use share_repo::JsonShareRepository;
pub use user_repo::JsonUserRepository;

/// The four repositories of one data directory.
pub struct JsonStore {
    pub devices: JsonDeviceRepository,
    pub users: JsonUserRepository,
    pub shares: JsonShareRepository,
    pub schedules: JsonScheduleRepository,
}

impl JsonStore {
    /// Open (and create if needed) a data directory.
    ///
    /// # Errors
    ///
    /// Returns [`StorageError::Io`] if the directory cannot be created.
    pub async fn open(data_dir: impl AsRef<Path>) -> Result<Self, StorageError> {
        let dir = data_dir.as_ref();
        tokio::fs::create_dir_all(dir)
            .await
            .map_err(|source| StorageError::Io {
                path: dir.to_path_buf(),
                source,
            })?;
        tracing::info!(data_dir = %dir.display(), "opened JSON store");
        Ok(Self {
            devices: JsonDeviceRepository::new(dir.join("devices.json")),
            users: JsonUserRepository::new(dir.join("users.json")),
            shares: JsonShareRepository::new(dir.join("shares.json")),
            schedules: JsonScheduleRepository::new(dir.join("schedules.json")),
        })
    }
}

/// Attach the file position to a record that failed domain validation.
fn invalid_record(path: &Path, index: usize, err: SmartHomeError) -> SmartHomeError {
    match err {
        SmartHomeError::Validation(source) => StorageError::InvalidRecord {
            path: path.to_path_buf(),
            index,
            source,
        }
        .into(),
        other => other,
    }
}
