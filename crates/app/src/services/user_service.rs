//! User service — account management.

use smartcode_domain::error::{ConflictError, NotFoundError, SmartHomeError};
use smartcode_domain::id::UserId;
use smartcode_domain::user::User;

use crate::ports::UserRepository;

/// Application service for user accounts.
pub struct UserService<R> {
    repo: R,
}

impl<R: UserRepository> UserService<R> {
    /// Create a new service backed by the given repository.
    pub fn new(repo: R) -> Self {
        Self { repo }
    }

    /// Register a new account.
    ///
    /// # Errors
    ///
    /// Returns [`SmartHomeError::Validation`] if invariants fail,
    /// [`SmartHomeError::Conflict`] when the username or email is taken, or a
    /// storage error.
    #[tracing::instrument(skip(self, user), fields(username = %user.username))]
    pub async fn register(&self, user: User) -> Result<User, SmartHomeError> {
        user.validate()?;
        if self.repo.find_by_username(&user.username).await?.is_some() {
            return Err(ConflictError {
                entity: "User",
                key: user.username,
            }
            .into());
        }
        if let Some(email) = &user.email {
            self.ensure_email_free(email, user.id).await?;
        }
        let user = self.repo.create(user).await?;
        tracing::info!(user_id = %user.id, "user registered");
        Ok(user)
    }

    /// # Errors
    ///
    /// Returns [`SmartHomeError::NotFound`] when no user with `id` exists,
    /// or a storage error.
    pub async fn get(&self, id: UserId) -> Result<User, SmartHomeError> {
        self.repo.get_by_id(id).await?.ok_or_else(|| {
            NotFoundError {
                entity: "User",
                id: id.to_string(),
            }
            .into()
        })
    }

    /// # Errors
    ///
    /// Returns [`SmartHomeError::NotFound`] when no user has `username`, or a
    /// storage error.
    pub async fn find_by_username(&self, username: &str) -> Result<User, SmartHomeError> {
        self.repo.find_by_username(username).await?.ok_or_else(|| {
            NotFoundError {
                entity: "User",
                id: username.to_string(),
            }
            .into()
        })
    }

    /// # Errors
    ///
    /// Returns a storage error propagated from the repository.
    pub async fn list(&self) -> Result<Vec<User>, SmartHomeError> {
        self.repo.get_all().await
    }

    /// Change the display name.
    ///
    /// # Errors
    ///
    /// Returns [`SmartHomeError::Validation`] for an overlong name,
    /// [`SmartHomeError::NotFound`] for an unknown user, or a storage error.
    #[tracing::instrument(skip(self, name))]
    pub async fn rename(&self, id: UserId, name: String) -> Result<User, SmartHomeError> {
        let mut user = self.get(id).await?;
        user.name = name;
        user.validate()?;
        self.repo.update(user).await
    }

    /// Change or clear the email address.
    ///
    /// # Errors
    ///
    /// Returns [`SmartHomeError::Validation`] for a malformed address,
    /// [`SmartHomeError::Conflict`] when another user has it,
    /// [`SmartHomeError::NotFound`] for an unknown user, or a storage error.
    #[tracing::instrument(skip(self, email))]
    pub async fn set_email(
        &self,
        id: UserId,
        email: Option<String>,
    ) -> Result<User, SmartHomeError> {
        let mut user = self.get(id).await?;
        user.email = email
            .map(|e| e.trim().to_string())
            .filter(|e| !e.is_empty());
        user.validate()?;
        if let Some(email) = &user.email {
            self.ensure_email_free(email, id).await?;
        }
        self.repo.update(user).await
    }

    /// Activate or deactivate an account.
    ///
    /// # Errors
    ///
    /// Returns [`SmartHomeError::NotFound`] for an unknown user, or a storage
    /// error.
    #[tracing::instrument(skip(self))]
    pub async fn set_active(&self, id: UserId, is_active: bool) -> Result<User, SmartHomeError> {
        let mut user = self.get(id).await?;
        user.is_active = is_active;
        self.repo.update(user).await
    }

    /// Delete an account.
    ///
    /// # Errors
    ///
    /// Returns [`SmartHomeError::NotFound`] for an unknown user, or a storage
    /// error.
    #[tracing::instrument(skip(self))]
    pub async fn delete(&self, id: UserId) -> Result<(), SmartHomeError> {
        self.repo.delete(id).await
    }

    async fn ensure_email_free(&self, email: &str, owner: UserId) -> Result<(), SmartHomeError> {
        match self.repo.find_by_email(email).await? {
            Some(existing) if existing.id != owner => Err(ConflictError {
                entity: "User",
                key: email.to_string(),
            }
            .into()),
            _ => Ok(()),
        }
    }
}
