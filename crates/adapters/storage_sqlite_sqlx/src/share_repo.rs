//! `SQLite` implementation of [`ShareRepository`].

use std::future::Future;

use sqlx::sqlite::SqliteRow;
use sqlx::{FromRow, Row, SqlitePool};

use smartcode_app::ports::ShareRepository;
use smartcode_domain::error::SmartHomeError;
use smartcode_domain::id::{DeviceId, UserId};
use smartcode_domain::share::DeviceShare;

use crate::codec::{encode_timestamp, parse_id, parse_timestamp};
use crate::error::{StorageError, conflict_or_storage};

struct Wrapper(DeviceShare);

impl<'r> FromRow<'r, SqliteRow> for Wrapper {
    fn from_row(row: &'r SqliteRow) -> Result<Self, sqlx::Error> {
        let device_id: String = row.try_get("device_id")?;
        let user_id: String = row.try_get("user_id")?;
        let shared_at: String = row.try_get("shared_at")?;

        Ok(Self(DeviceShare {
            device_id: parse_id(&device_id)?,
            user_id: parse_id(&user_id)?,
            shared_at: parse_timestamp(&shared_at)?,
        }))
    }
}

const INSERT: &str = "INSERT INTO device_shares (device_id, user_id, shared_at) VALUES (?, ?, ?)";
const EXISTS: &str = "SELECT COUNT(*) FROM device_shares WHERE device_id = ? AND user_id = ?";
const SELECT_BY_DEVICE: &str = "SELECT * FROM device_shares WHERE device_id = ? ORDER BY rowid";
const SELECT_BY_USER: &str = "SELECT * FROM device_shares WHERE user_id = ? ORDER BY rowid";
const DELETE_ONE: &str = "DELETE FROM device_shares WHERE device_id = ? AND user_id = ?";
const DELETE_BY_DEVICE: &str = "DELETE FROM device_shares WHERE device_id = ?";
const DELETE_BY_USER: &str = "DELETE FROM device_shares WHERE user_id = ?";

/// `SQLite`-backed share repository.
pub struct SqliteShareRepository {
    pool: SqlitePool,
}

impl SqliteShareRepository {
    #[must_use]
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    fn fetch_many(
        &self,
        query: &'static str,
        param: String,
    ) -> impl Future<Output = Result<Vec<DeviceShare>, SmartHomeError>> + Send + use<> {
        let pool = self.pool.clone();
        async move {
            let rows: Vec<Wrapper> = sqlx::query_as(query)
                .bind(param)
                .fetch_all(&pool)
                .await
                .map_err(StorageError::from)?;

            Ok(rows.into_iter().map(|w| w.0).collect())
        }
    }

    fn delete_where(
        &self,
        query: &'static str,
        param: String,
    ) -> impl Future<Output = Result<usize, SmartHomeError>> + Send + use<> {
        let pool = self.pool.clone();
        async move {
            let result = sqlx::query(query)
                .bind(param)
                .execute(&pool)
                .await
                .map_err(StorageError::from)?;

            Ok(usize::try_from(result.rows_affected()).unwrap_or(usize::MAX))
        }
    }
}

impl ShareRepository for SqliteShareRepository {
    fn create(
        &self,
        share: DeviceShare,
    ) -> impl Future<Output = Result<DeviceShare, SmartHomeError>> + Send {
        let pool = self.pool.clone();
        async move {
            sqlx::query(INSERT)
                .bind(share.device_id.to_string())
                .bind(share.user_id.to_string())
                .bind(encode_timestamp(share.shared_at))
                .execute(&pool)
                .await
                .map_err(|err| {
                    conflict_or_storage(
                        err,
                        "Share",
                        format!("{}/{}", share.device_id, share.user_id),
                    )
                })?;

            Ok(share)
        }
    }

    fn exists(
        &self,
        device_id: DeviceId,
        user_id: UserId,
    ) -> impl Future<Output = Result<bool, SmartHomeError>> + Send {
        let pool = self.pool.clone();
        async move {
            let (count,): (i64,) = sqlx::query_as(EXISTS)
                .bind(device_id.to_string())
                .bind(user_id.to_string())
                .fetch_one(&pool)
                .await
                .map_err(StorageError::from)?;

            Ok(count > 0)
        }
    }

    fn find_by_device(
        &self,
        device_id: DeviceId,
    ) -> impl Future<Output = Result<Vec<DeviceShare>, SmartHomeError>> + Send {
        self.fetch_many(SELECT_BY_DEVICE, device_id.to_string())
    }

    fn find_by_user(
        &self,
        user_id: UserId,
    ) -> impl Future<Output = Result<Vec<DeviceShare>, SmartHomeError>> + Send {
        self.fetch_many(SELECT_BY_USER, user_id.to_string())
    }

    fn delete(
        &self,
        device_id: DeviceId,
        user_id: UserId,
    ) -> impl Future<Output = Result<bool, SmartHomeError>> + Send {
        let pool = self.pool.clone();
        async move {
            let result = sqlx::query(DELETE_ONE)
                .bind(device_id.to_string())
                .bind(user_id.to_string())
                .execute(&pool)
                .await
                .map_err(StorageError::from)?;

            Ok(result.rows_affected() > 0)
        }
    }

    fn delete_by_device(
        &self,
        device_id: DeviceId,
    ) -> impl Future<Output = Result<usize, SmartHomeError>> + Send {
        self.delete_where(DELETE_BY_DEVICE, device_id.to_string())
    }

    fn delete_by_user(
        &self,
        user_id: UserId,
    ) -> impl Future<Output = Result<usize, SmartHomeError>> + Send {
        self.delete_where(DELETE_BY_USER, user_id.to_string())
    }
}
