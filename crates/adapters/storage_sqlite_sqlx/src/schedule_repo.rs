//! `SQLite` implementation of [`ScheduleRepository`].
//!
//! The schedule timing is stored as a JSON document in the `timing` column.

use std::future::Future;

use sqlx::sqlite::SqliteRow;
use sqlx::{FromRow, Row, SqlitePool};

use smartcode_app::ports::ScheduleRepository;
use smartcode_domain::error::{NotFoundError, SmartHomeError};
use smartcode_domain::id::{DeviceId, ScheduleId};
use smartcode_domain::schedule::{Schedule, ScheduleKind};

use crate::codec::{decode_error, encode_timestamp, parse_id, parse_timestamp};
use crate::error::{StorageError, conflict_or_storage};

struct Wrapper(Schedule);

impl<'r> FromRow<'r, SqliteRow> for Wrapper {
    fn from_row(row: &'r SqliteRow) -> Result<Self, sqlx::Error> {
        let id: String = row.try_get("id")?;
        let device_id: String = row.try_get("device_id")?;
        let timing: String = row.try_get("timing")?;
        let created_at: String = row.try_get("created_at")?;

        let kind: ScheduleKind = serde_json::from_str(&timing).map_err(decode_error)?;

        Ok(Self(Schedule {
            id: parse_id(&id)?,
            device_id: parse_id(&device_id)?,
            kind,
            created_at: parse_timestamp(&created_at)?,
        }))
    }
}

const INSERT: &str = "INSERT INTO schedules (id, device_id, timing, created_at) VALUES (?, ?, ?, ?)";
const SELECT_BY_ID: &str = "SELECT * FROM schedules WHERE id = ?";
const SELECT_ALL: &str = "SELECT * FROM schedules ORDER BY rowid";
const SELECT_BY_DEVICE: &str = "SELECT * FROM schedules WHERE device_id = ? ORDER BY rowid";
const DELETE_BY_ID: &str = "DELETE FROM schedules WHERE id = ?";
const DELETE_BY_DEVICE: &str = "DELETE FROM schedules WHERE device_id = ?";

/// `SQLite`-backed schedule repository.
pub struct SqliteScheduleRepository {
    pool: SqlitePool,
}

impl SqliteScheduleRepository {
    #[must_use]
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }
}

impl ScheduleRepository for SqliteScheduleRepository {
    fn create(
        &self,
        schedule: Schedule,
    ) -> impl Future<Output = Result<Schedule, SmartHomeError>> + Send {
        let pool = self.pool.clone();
        async move {
            let timing = serde_json::to_string(&schedule.kind).map_err(StorageError::from)?;
            sqlx::query(INSERT)
                .bind(schedule.id.to_string())
                .bind(schedule.device_id.to_string())
                .bind(timing)
                .bind(encode_timestamp(schedule.created_at))
                .execute(&pool)
                .await
                .map_err(|err| conflict_or_storage(err, "Schedule", schedule.id.to_string()))?;

            Ok(schedule)
        }
    }

    fn get_by_id(
        &self,
        id: ScheduleId,
    ) -> impl Future<Output = Result<Option<Schedule>, SmartHomeError>> + Send {
        let pool = self.pool.clone();
        async move {
            let row: Option<Wrapper> = sqlx::query_as(SELECT_BY_ID)
                .bind(id.to_string())
                .fetch_optional(&pool)
                .await
                .map_err(StorageError::from)?;

            Ok(row.map(|w| w.0))
        }
    }

    fn get_all(&self) -> impl Future<Output = Result<Vec<Schedule>, SmartHomeError>> + Send {
        let pool = self.pool.clone();
        async move {
            let rows: Vec<Wrapper> = sqlx::query_as(SELECT_ALL)
                .fetch_all(&pool)
                .await
                .map_err(StorageError::from)?;

            Ok(rows.into_iter().map(|w| w.0).collect())
        }
    }

    fn find_by_device(
        &self,
        device_id: DeviceId,
    ) -> impl Future<Output = Result<Vec<Schedule>, SmartHomeError>> + Send {
        let pool = self.pool.clone();
        async move {
            let rows: Vec<Wrapper> = sqlx::query_as(SELECT_BY_DEVICE)
                .bind(device_id.to_string())
                .fetch_all(&pool)
                .await
                .map_err(StorageError::from)?;

            Ok(rows.into_iter().map(|w| w.0).collect())
        }
    }

    fn delete(&self, id: ScheduleId) -> impl Future<Output = Result<(), SmartHomeError>> + Send {
        let pool = self.pool.clone();
        async move {
            let result = sqlx::query(DELETE_BY_ID)
                .bind(id.to_string())
                .execute(&pool)
                .await
                .map_err(StorageError::from)?;

            if result.rows_affected() == 0 {
                return Err(NotFoundError {
                    entity: "Schedule",
                    id: id.to_string(),
                }
                .into());
            }
            Ok(())
        }
    }

    fn delete_by_device(
        &self,
        device_id: DeviceId,
    ) -> impl Future<Output = Result<usize, SmartHomeError>> + Send {
        let pool = self.pool.clone();
        async move {
            let result = sqlx::query(DELETE_BY_DEVICE)
                .bind(device_id.to_string())
                .execute(&pool)
                .await
                .map_err(StorageError::from)?;

            Ok(usize::try_from(result.rows_affected()).unwrap_or(usize::MAX))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::device_repo::SqliteDeviceRepository;
    use crate::pool::memory_pool;
    use chrono::NaiveTime;
    use smartcode_app::ports::DeviceRepository;
    use smartcode_domain::device::Device;
    use smartcode_domain::time::now;

    async fn setup() -> (SqliteScheduleRepository, DeviceId) {
        let pool = memory_pool().await;
        let devices = SqliteDeviceRepository::new(pool.clone());
        let device = devices
            .create(Device::builder().name("Heater").build().unwrap())
            .await
            .unwrap();
        (SqliteScheduleRepository::new(pool), device.id)
    }

    #[tokio::test]
    async fn should_store_both_schedule_kinds() {
        let (repo, device) = setup().await;
        let once = Schedule::for_duration(device, now(), 15).unwrap();
        let daily = Schedule::daily(
            device,
            NaiveTime::from_hms_opt(7, 30, 0).unwrap(),
            45,
            now(),
        )
        .unwrap();

        repo.create(once.clone()).await.unwrap();
        repo.create(daily.clone()).await.unwrap();

        assert_eq!(repo.get_by_id(once.id).await.unwrap(), Some(once));
        assert_eq!(repo.get_by_id(daily.id).await.unwrap(), Some(daily));
        assert_eq!(repo.find_by_device(device).await.unwrap().len(), 2);
    }

    #[tokio::test]
    async fn should_reject_schedule_for_unknown_device() {
        let (repo, _) = setup().await;
        let orphan = Schedule::for_duration(DeviceId::new(), now(), 15).unwrap();

        assert!(matches!(
            repo.create(orphan).await,
            Err(SmartHomeError::Storage(_))
        ));
    }

    #[tokio::test]
    async fn should_delete_schedules() {
        let (repo, device) = setup().await;
        let first = repo
            .create(Schedule::for_duration(device, now(), 15).unwrap())
            .await
            .unwrap();
        repo.create(Schedule::for_duration(device, now(), 30).unwrap())
            .await
            .unwrap();

        repo.delete(first.id).await.unwrap();
        assert!(matches!(
            repo.delete(first.id).await,
            Err(SmartHomeError::NotFound(_))
        ));
        assert_eq!(repo.delete_by_device(device).await.unwrap(), 1);
        assert!(repo.get_all().await.unwrap().is_empty());
    }
}
