//! `SQLite` implementation of [`DeviceRepository`].

use std::future::Future;

use sqlx::sqlite::SqliteRow;
use sqlx::{FromRow, Row, SqlitePool};

use smartcode_app::ports::DeviceRepository;
use smartcode_domain::device::{Device, DeviceKind, DeviceStatus, Power};
use smartcode_domain::error::{NotFoundError, SmartHomeError};
use smartcode_domain::id::{DeviceId, UserId};

use crate::codec::{decode_error, encode_timestamp, parse_id, parse_timestamp};
use crate::error::{StorageError, conflict_or_storage};

/// Wrapper for converting database rows into domain [`Device`].
struct Wrapper(Device);

impl Wrapper {
    fn maybe(value: Option<Self>) -> Option<Device> {
        value.map(|w| w.0)
    }
}

impl<'r> FromRow<'r, SqliteRow> for Wrapper {
    fn from_row(row: &'r SqliteRow) -> Result<Self, sqlx::Error> {
        let id: String = row.try_get("id")?;
        let power: String = row.try_get("power")?;
        let owner_id: Option<String> = row.try_get("owner_id")?;
        let status: String = row.try_get("status")?;
        let last_updated: String = row.try_get("last_updated")?;

        let status: DeviceStatus = serde_json::from_str(&status).map_err(decode_error)?;

        Ok(Self(Device {
            id: parse_id(&id)?,
            name: row.try_get("name")?,
            brand: row.try_get("brand")?,
            model: row.try_get("model")?,
            location: row.try_get("location")?,
            secret_key: row.try_get("secret_key")?,
            power: parse_id::<Power>(&power)?,
            connected: row.try_get("connected")?,
            owner_id: owner_id.as_deref().map(parse_id::<UserId>).transpose()?,
            status,
            last_updated: parse_timestamp(&last_updated)?,
        }))
    }
}

const INSERT: &str = "INSERT INTO devices (id, kind, name, brand, model, location, secret_key, power, connected, owner_id, status, last_updated) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)";
const SELECT_BY_ID: &str = "SELECT * FROM devices WHERE id = ?";
const SELECT_ALL: &str = "SELECT * FROM devices ORDER BY rowid";
const SELECT_BY_OWNER: &str = "SELECT * FROM devices WHERE owner_id = ? ORDER BY rowid";
const SELECT_BY_KIND: &str = "SELECT * FROM devices WHERE kind = ? ORDER BY rowid";
const UPDATE: &str = "UPDATE devices SET kind = ?, name = ?, brand = ?, model = ?, location = ?, secret_key = ?, power = ?, connected = ?, owner_id = ?, status = ?, last_updated = ? WHERE id = ?";
const DELETE_BY_ID: &str = "DELETE FROM devices WHERE id = ?";

fn not_found(id: DeviceId) -> SmartHomeError {
    NotFoundError {
        entity: "Device",
        id: id.to_string(),
    }
    .into()
}

/// `SQLite`-backed device repository.
pub struct SqliteDeviceRepository {
    pool: SqlitePool,
}

impl SqliteDeviceRepository {
    /// Create a new repository using the given connection pool.
    #[must_use]
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    fn fetch_many(
        &self,
        query: &'static str,
        param: String,
    ) -> impl Future<Output = Result<Vec<Device>, SmartHomeError>> + Send + use<> {
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
}

impl DeviceRepository for SqliteDeviceRepository {
    fn create(&self, device: Device) -> impl Future<Output = Result<Device, SmartHomeError>> + Send {
        let pool = self.pool.clone();
        async move {
            let status = serde_json::to_string(&device.status).map_err(StorageError::from)?;
            sqlx::query(INSERT)
                .bind(device.id.to_string())
                .bind(device.kind().as_str())
                .bind(&device.name)
                .bind(&device.brand)
                .bind(&device.model)
                .bind(&device.location)
                .bind(&device.secret_key)
                .bind(device.power.as_str())
                .bind(device.connected)
                .bind(device.owner_id.map(|id| id.to_string()))
                .bind(status)
                .bind(encode_timestamp(device.last_updated))
                .execute(&pool)
                .await
                .map_err(|err| conflict_or_storage(err, "Device", device.id.to_string()))?;

            Ok(device)
        }
    }

    fn get_by_id(
        &self,
        id: DeviceId,
    ) -> impl Future<Output = Result<Option<Device>, SmartHomeError>> + Send {
        let pool = self.pool.clone();
        async move {
            let row: Option<Wrapper> = sqlx::query_as(SELECT_BY_ID)
                .bind(id.to_string())
                .fetch_optional(&pool)
                .await
                .map_err(StorageError::from)?;

            Ok(Wrapper::maybe(row))
        }
    }

    fn get_all(&self) -> impl Future<Output = Result<Vec<Device>, SmartHomeError>> + Send {
        let pool = self.pool.clone();
        async move {
            let rows: Vec<Wrapper> = sqlx::query_as(SELECT_ALL)
                .fetch_all(&pool)
                .await
                .map_err(StorageError::from)?;

            Ok(rows.into_iter().map(|w| w.0).collect())
        }
    }

    fn find_by_owner(
        &self,
        owner_id: UserId,
    ) -> impl Future<Output = Result<Vec<Device>, SmartHomeError>> + Send {
        self.fetch_many(SELECT_BY_OWNER, owner_id.to_string())
    }

    fn find_by_kind(
        &self,
        kind: DeviceKind,
    ) -> impl Future<Output = Result<Vec<Device>, SmartHomeError>> + Send {
        self.fetch_many(SELECT_BY_KIND, kind.as_str().to_string())
    }

    fn update(&self, device: Device) -> impl Future<Output = Result<Device, SmartHomeError>> + Send {
        let pool = self.pool.clone();
        async move {
            let status = serde_json::to_string(&device.status).map_err(StorageError::from)?;
            let result = sqlx::query(UPDATE)
                .bind(device.kind().as_str())
                .bind(&device.name)
                .bind(&device.brand)
                .bind(&device.model)
                .bind(&device.location)
                .bind(&device.secret_key)
                .bind(device.power.as_str())
                .bind(device.connected)
                .bind(device.owner_id.map(|id| id.to_string()))
                .bind(status)
                .bind(encode_timestamp(device.last_updated))
                .bind(device.id.to_string())
                .execute(&pool)
                .await
                .map_err(StorageError::from)?;

            if result.rows_affected() == 0 {
                return Err(not_found(device.id));
            }
            Ok(device)
        }
    }

    fn delete(&self, id: DeviceId) -> impl Future<Output = Result<(), SmartHomeError>> + Send {
        let pool = self.pool.clone();
        async move {
            let result = sqlx::query(DELETE_BY_ID)
                .bind(id.to_string())
                .execute(&pool)
                .await
                .map_err(StorageError::from)?;

            if result.rows_affected() == 0 {
                return Err(not_found(id));
            }
            Ok(())
        }
    }
}
