//! `SQLite` implementation of [`UserRepository`].

use std::future::Future;

use sqlx::sqlite::SqliteRow;
use sqlx::{FromRow, Row, SqlitePool};

use smartcode_app::ports::UserRepository;
use smartcode_domain::error::{NotFoundError, SmartHomeError};
use smartcode_domain::id::UserId;
use smartcode_domain::user::User;

use crate::codec::{encode_timestamp, parse_id, parse_timestamp};
use crate::error::{StorageError, conflict_or_storage};

struct Wrapper(User);

impl<'r> FromRow<'r, SqliteRow> for Wrapper {
    fn from_row(row: &'r SqliteRow) -> Result<Self, sqlx::Error> {
        let id: String = row.try_get("id")?;
        let date_joined: String = row.try_get("date_joined")?;

        Ok(Self(User {
            id: parse_id(&id)?,
            username: row.try_get("username")?,
            name: row.try_get("name")?,
            email: row.try_get("email")?,
            is_active: row.try_get("is_active")?,
            date_joined: parse_timestamp(&date_joined)?,
        }))
    }
}

const INSERT: &str = "INSERT INTO users (id, username, name, email, is_active, date_joined) VALUES (?, ?, ?, ?, ?, ?)";
const SELECT_BY_ID: &str = "SELECT * FROM users WHERE id = ?";
const SELECT_ALL: &str = "SELECT * FROM users ORDER BY rowid";
const SELECT_BY_USERNAME: &str = "SELECT * FROM users WHERE username = ?";
const SELECT_BY_EMAIL: &str = "SELECT * FROM users WHERE lower(email) = lower(?)";
const UPDATE: &str =
    "UPDATE users SET username = ?, name = ?, email = ?, is_active = ?, date_joined = ? WHERE id = ?";
const DELETE_BY_ID: &str = "DELETE FROM users WHERE id = ?";

fn not_found(id: UserId) -> SmartHomeError {
    NotFoundError {
        entity: "User",
        id: id.to_string(),
    }
    .into()
}

/// `SQLite`-backed user repository.
///
/// Deleting a user cascades to the devices they own and to their shares.
pub struct SqliteUserRepository {
    pool: SqlitePool,
}

impl SqliteUserRepository {
    #[must_use]
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    fn fetch_one(
        &self,
        query: &'static str,
        param: String,
    ) -> impl Future<Output = Result<Option<User>, SmartHomeError>> + Send + use<> {
        let pool = self.pool.clone();
        async move {
            let row: Option<Wrapper> = sqlx::query_as(query)
                .bind(param)
                .fetch_optional(&pool)
                .await
                .map_err(StorageError::from)?;

            Ok(row.map(|w| w.0))
        }
    }
}

impl UserRepository for SqliteUserRepository {
    fn create(&self, user: User) -> impl Future<Output = Result<User, SmartHomeError>> + Send {
        let pool = self.pool.clone();
        async move {
            sqlx::query(INSERT)
                .bind(user.id.to_string())
                .bind(&user.username)
                .bind(&user.name)
                .bind(&user.email)
                .bind(user.is_active)
                .bind(encode_timestamp(user.date_joined))
                .execute(&pool)
                .await
                .map_err(|err| conflict_or_storage(err, "User", user.username.clone()))?;

            Ok(user)
        }
    }

    fn get_by_id(
        &self,
        id: UserId,
    ) -> impl Future<Output = Result<Option<User>, SmartHomeError>> + Send {
        self.fetch_one(SELECT_BY_ID, id.to_string())
    }

    fn get_all(&self) -> impl Future<Output = Result<Vec<User>, SmartHomeError>> + Send {
        let pool = self.pool.clone();
        async move {
            let rows: Vec<Wrapper> = sqlx::query_as(SELECT_ALL)
                .fetch_all(&pool)
                .await
                .map_err(StorageError::from)?;

            Ok(rows.into_iter().map(|w| w.0).collect())
        }
    }

    fn find_by_username(
        &self,
        username: &str,
    ) -> impl Future<Output = Result<Option<User>, SmartHomeError>> + Send {
        self.fetch_one(SELECT_BY_USERNAME, username.to_string())
    }

    fn find_by_email(
        &self,
        email: &str,
    ) -> impl Future<Output = Result<Option<User>, SmartHomeError>> + Send {
        self.fetch_one(SELECT_BY_EMAIL, email.to_string())
    }

    fn update(&self, user: User) -> impl Future<Output = Result<User, SmartHomeError>> + Send {
        let pool = self.pool.clone();
        async move {
            let result = sqlx::query(UPDATE)
                .bind(&user.username)
                .bind(&user.name)
                .bind(&user.email)
                .bind(user.is_active)
                .bind(encode_timestamp(user.date_joined))
                .bind(user.id.to_string())
                .execute(&pool)
                .await
                .map_err(|err| conflict_or_storage(err, "User", user.username.clone()))?;

            if result.rows_affected() == 0 {
                return Err(not_found(user.id));
            }
            Ok(user)
        }
    }

    fn delete(&self, id: UserId) -> impl Future<Output = Result<(), SmartHomeError>> + Send {
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

#[cfg(test)]
mod tests {
    use super::*;
    use crate::device_repo::SqliteDeviceRepository;
    use crate::pool::memory_pool;
    use smartcode_app::ports::DeviceRepository;
    use smartcode_domain::device::Device;

    fn user(username: &str, email: Option<&str>) -> User {
        let mut builder = User::builder().username(username);
        if let Some(email) = email {
            builder = builder.email(email);
        }
        builder.build().unwrap()
    }

    #[tokio::test]
    async fn should_create_and_find_user_by_username() {
        let repo = SqliteUserRepository::new(memory_pool().await);
        let ada = user("ada", Some("ada@example.com"));
        repo.create(ada.clone()).await.unwrap();

        assert_eq!(repo.get_by_id(ada.id).await.unwrap(), Some(ada.clone()));
        assert_eq!(repo.find_by_username("ada").await.unwrap(), Some(ada));
        assert!(repo.find_by_username("bob").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn should_find_user_by_email_ignoring_case() {
        let repo = SqliteUserRepository::new(memory_pool().await);
        let ada = user("ada", Some("Ada@Example.com"));
        repo.create(ada.clone()).await.unwrap();

        let found = repo.find_by_email("ada@example.COM").await.unwrap();
        assert_eq!(found.map(|u| u.id), Some(ada.id));
    }

    #[tokio::test]
    async fn should_reject_duplicate_username_and_email() {
        let repo = SqliteUserRepository::new(memory_pool().await);
        repo.create(user("ada", Some("ada@example.com")))
            .await
            .unwrap();

        assert!(matches!(
            repo.create(user("ada", None)).await,
            Err(SmartHomeError::Conflict(_))
        ));
        assert!(matches!(
            repo.create(user("lovelace", Some("ADA@example.com"))).await,
            Err(SmartHomeError::Conflict(_))
        ));
    }

    #[tokio::test]
    async fn should_update_user_when_exists() {
        let repo = SqliteUserRepository::new(memory_pool().await);
        let mut ada = repo.create(user("ada", None)).await.unwrap();

        ada.name = "Ada".to_string();
        ada.is_active = false;
        repo.update(ada.clone()).await.unwrap();

        assert_eq!(repo.get_by_id(ada.id).await.unwrap(), Some(ada));
        assert!(matches!(
            repo.update(user("ghost", None)).await,
            Err(SmartHomeError::NotFound(_))
        ));
    }

    #[tokio::test]
    async fn should_cascade_owned_devices_when_deleting_user() {
        let pool = memory_pool().await;
        let users = SqliteUserRepository::new(pool.clone());
        let devices = SqliteDeviceRepository::new(pool);
        let ada = users.create(user("ada", None)).await.unwrap();
        let lamp = devices
            .create(Device::builder().name("Lamp").owner_id(ada.id).build().unwrap())
            .await
            .unwrap();

        users.delete(ada.id).await.unwrap();

        assert!(devices.get_by_id(lamp.id).await.unwrap().is_none());
        assert!(matches!(
            users.delete(ada.id).await,
            Err(SmartHomeError::NotFound(_))
        ));
    }
}
