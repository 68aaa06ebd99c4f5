//! JSON-file implementation of [`UserRepository`] over `users.json`.

use std::future::Future;
use std::path::PathBuf;

use smartcode_app::ports::UserRepository;
use smartcode_domain::error::{ConflictError, NotFoundError, SmartHomeError};
use smartcode_domain::id::UserId;
use smartcode_domain::time::now;
use smartcode_domain::user::User;

use crate::file::JsonFile;
use crate::invalid_record;
use crate::record::UserRecord;

/// User repository backed by a legacy-compatible `users.json`.
pub struct JsonUserRepository {
    file: JsonFile<UserRecord>,
}

impl JsonUserRepository {
    #[must_use]
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            file: JsonFile::new(path, "users"),
        }
    }

    async fn with_users<T, F>(&self, f: F) -> Result<T, SmartHomeError>
    where
        T: Send,
        F: FnOnce(&mut Vec<User>) -> Result<(T, bool), SmartHomeError> + Send,
    {
        let path = self.file.path().to_path_buf();
        self.file
            .modify(move |records| {
                let loaded_at = now();
                let mut normalized = false;
                let mut users = Vec::with_capacity(records.len());
                for (index, record) in records.iter().enumerate() {
                    let decoded = record
                        .decode(loaded_at)
                        .map_err(|err| invalid_record(&path, index, err))?;
                    normalized |= decoded.normalized;
                    users.push(decoded.value);
                }

                let (value, dirty) = f(&mut users)?;
                let changed = dirty || normalized;
                if changed {
                    *records = users.iter().map(UserRecord::encode).collect();
                }
                Ok((value, changed))
            })
            .await
    }
}

fn not_found(id: UserId) -> SmartHomeError {
    NotFoundError {
        entity: "User",
        id: id.to_string(),
    }
    .into()
}

impl UserRepository for JsonUserRepository {
    fn create(&self, user: User) -> impl Future<Output = Result<User, SmartHomeError>> + Send {
        self.with_users(move |users| {
            if users
                .iter()
                .any(|u| u.id == user.id || u.username == user.username)
            {
                return Err(ConflictError {
                    entity: "User",
                    key: user.username.clone(),
                }
                .into());
            }
            users.push(user.clone());
            Ok((user, true))
        })
    }

    fn get_by_id(
        &self,
        id: UserId,
    ) -> impl Future<Output = Result<Option<User>, SmartHomeError>> + Send {
        self.with_users(move |users| Ok((users.iter().find(|u| u.id == id).cloned(), false)))
    }

    fn get_all(&self) -> impl Future<Output = Result<Vec<User>, SmartHomeError>> + Send {
        self.with_users(|users| Ok((users.clone(), false)))
    }

    fn find_by_username(
        &self,
        username: &str,
    ) -> impl Future<Output = Result<Option<User>, SmartHomeError>> + Send {
        let username = username.to_string();
        self.with_users(move |users| {
            Ok((users.iter().find(|u| u.username == username).cloned(), false))
        })
    }

    fn find_by_email(
        &self,
        email: &str,
    ) -> impl Future<Output = Result<Option<User>, SmartHomeError>> + Send {
        let email = email.to_string();
        self.with_users(move |users| {
            let found = users
                .iter()
                .find(|u| {
                    u.email
                        .as_deref()
                        .is_some_and(|e| e.eq_ignore_ascii_case(&email))
                })
                .cloned();
            Ok((found, false))
        })
    }

    fn update(&self, user: User) -> impl Future<Output = Result<User, SmartHomeError>> + Send {
        self.with_users(move |users| {
            let slot = users
                .iter_mut()
                .find(|u| u.id == user.id)
                .ok_or_else(|| not_found(user.id))?;
            *slot = user.clone();
            Ok((user, true))
        })
    }

    fn delete(&self, id: UserId) -> impl Future<Output = Result<(), SmartHomeError>> + Send {
        self.with_users(move |users| {
            let before = users.len();
            users.retain(|u| u.id != id);
            if users.len() == before {
                return Err(not_found(id));
            }
            Ok(((), true))
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn user(username: &str) -> User {
        User::builder()
            .username(username)
            .email(format!("{username}@example.org"))
            .build()
            .unwrap()
    }

    #[tokio::test]
    async fn should_create_and_find_user() {
        let dir = tempfile::tempdir().unwrap();
        let repo = JsonUserRepository::new(dir.path().join("users.json"));
        let created = repo.create(user("ada")).await.unwrap();

        let by_name = repo.find_by_username("ada").await.unwrap().unwrap();
        assert_eq!(by_name.id, created.id);
        let by_email = repo
            .find_by_email("Ada@Example.org")
            .await
            .unwrap()
            .unwrap();
        assert_eq!(by_email.id, created.id);
    }

    #[tokio::test]
    async fn should_reject_duplicate_username() {
        let dir = tempfile::tempdir().unwrap();
        let repo = JsonUserRepository::new(dir.path().join("users.json"));
        repo.create(user("ada")).await.unwrap();

        assert!(matches!(
            repo.create(user("ada")).await,
            Err(SmartHomeError::Conflict(_))
        ));
    }

    #[tokio::test]
    async fn should_read_legacy_users_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("users.json");
        std::fs::write(
            &path,
            r#"{"users": [{"user_id": 1, "name": "Marta"}, {"user_id": 2, "name": "Piotr"}]}"#,
        )
        .unwrap();
        let repo = JsonUserRepository::new(&path);

        let users = repo.get_all().await.unwrap();
        let names: Vec<&str> = users.iter().map(|u| u.username.as_str()).collect();
        assert_eq!(names, ["Marta", "Piotr"]);

        let again = repo.get_all().await.unwrap();
        assert_eq!(again[0].id, users[0].id);
    }

    #[tokio::test]
    async fn should_update_and_delete_user() {
        let dir = tempfile::tempdir().unwrap();
        let repo = JsonUserRepository::new(dir.path().join("users.json"));
        let mut created = repo.create(user("ada")).await.unwrap();

        created.is_active = false;
        repo.update(created.clone()).await.unwrap();
        assert!(!repo.get_by_id(created.id).await.unwrap().unwrap().is_active);

        repo.delete(created.id).await.unwrap();
        assert!(repo.get_all().await.unwrap().is_empty());
    }
}
