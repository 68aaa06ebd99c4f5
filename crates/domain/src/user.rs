//! User — a person who owns devices or has devices shared with them.

use serde::{Deserialize, Serialize};

use crate::error::{SmartHomeError, ValidationError};
use crate::id::UserId;
use crate::time::{Timestamp, now};

/// A registered account.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    pub id: UserId,
    pub username: String,
    pub name: String,
    pub email: Option<String>,
    pub is_active: bool,
    pub date_joined: Timestamp,
}

impl User {
    pub const USERNAME_MAX: usize = 150;
    pub const NAME_MAX: usize = 20;
    pub const EMAIL_MAX: usize = 50;

    /// Create a builder for constructing a [`User`].
    #[must_use]
    pub fn builder() -> UserBuilder {
        UserBuilder::default()
    }

    /// Check domain invariants.
    ///
    /// # Errors
    ///
    /// Returns [`SmartHomeError::Validation`] for a blank or overlong
    /// username, an overlong display name or a malformed email.
    pub fn validate(&self) -> Result<(), SmartHomeError> {
        if self.username.trim().is_empty() {
            return Err(ValidationError::EmptyUsername.into());
        }
        if self.username.chars().count() > Self::USERNAME_MAX {
            return Err(ValidationError::UsernameTooLong {
                max: Self::USERNAME_MAX,
            }
            .into());
        }
        if self.name.chars().count() > Self::NAME_MAX {
            return Err(ValidationError::NameTooLong { max: Self::NAME_MAX }.into());
        }
        if let Some(email) = &self.email {
            validate_email(email)?;
        }
        Ok(())
    }

    /// Name to greet the user with.
    #[must_use]
    pub fn display_name(&self) -> &str {
        if self.name.trim().is_empty() {
            &self.username
        } else {
            &self.name
        }
    }
}

/// Check that `email` looks like `local@domain` and fits the column.
///
/// # Errors
///
/// Returns [`ValidationError::InvalidEmail`] otherwise.
pub fn validate_email(email: &str) -> Result<(), ValidationError> {
    if email.chars().count() > User::EMAIL_MAX || email.chars().any(char::is_whitespace) {
        return Err(ValidationError::InvalidEmail);
    }
    match email.split_once('@') {
        Some((local, domain)) if !local.is_empty() && !domain.is_empty() && !domain.contains('@') => {
            Ok(())
        }
        _ => Err(ValidationError::InvalidEmail),
    }
}

/// Step-by-step builder for [`User`].
#[derive(Debug)]
pub struct UserBuilder {
    id: Option<UserId>,
    username: Option<String>,
    name: Option<String>,
    email: Option<String>,
    is_active: bool,
    date_joined: Option<Timestamp>,
}

impl Default for UserBuilder {
    fn default() -> Self {
        Self {
            id: None,
            username: None,
            name: None,
            email: None,
            is_active: true,
            date_joined: None,
        }
    }
}

impl UserBuilder {
    #[must_use]
    pub fn id(mut self, id: UserId) -> Self {
        self.id = Some(id);
        self
    }

    #[must_use]
    pub fn username(mut self, username: impl Into<String>) -> Self {
        self.username = Some(username.into());
        self
    }

    #[must_use]
    pub fn name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    /// Blank emails are treated as absent.
    #[must_use]
    pub fn email(mut self, email: impl Into<String>) -> Self {
        let email = email.into();
        self.email = if email.trim().is_empty() {
            None
        } else {
            Some(email.trim().to_string())
        };
        self
    }

    #[must_use]
    pub fn is_active(mut self, is_active: bool) -> Self {
        self.is_active = is_active;
        self
    }

    #[must_use]
    pub fn date_joined(mut self, date_joined: Timestamp) -> Self {
        self.date_joined = Some(date_joined);
        self
    }

    /// Consume the builder, validate, and return a [`User`].
    ///
    /// # Errors
    ///
    /// Returns [`SmartHomeError::Validation`] when an invariant fails.
    pub fn build(self) -> Result<User, SmartHomeError> {
        let user = User {
            id: self.id.unwrap_or_default(),
            username: self.username.unwrap_or_default(),
            name: self.name.unwrap_or_default(),
            email: self.email,
            is_active: self.is_active,
            date_joined: self.date_joined.unwrap_or_else(now),
        };
        user.validate()?;
        Ok(user)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn should_build_active_user_by_default() {
        let user = User::builder()
            .username("ada")
            .name("Ada")
            .email("ada@example.org")
            .build()
            .unwrap();
        assert!(user.is_active);
        assert_eq!(user.email.as_deref(), Some("ada@example.org"));
    }

    #[test]
    fn should_require_username() {
        let result = User::builder().name("Nobody").build();
        assert!(matches!(
            result,
            Err(SmartHomeError::Validation(ValidationError::EmptyUsername))
        ));
    }

    #[test]
    fn should_reject_long_display_name() {
        let result = User::builder()
            .username("grace")
            .name("Grace Brewster Murray Hopper")
            .build();
        assert!(matches!(
            result,
            Err(SmartHomeError::Validation(ValidationError::NameTooLong {
                max: 20
            }))
        ));
    }

    #[test]
    fn should_treat_blank_email_as_missing() {
        let user = User::builder().username("x").email("  ").build().unwrap();
        assert!(user.email.is_none());
    }

    #[test]
    fn should_validate_email_shape() {
        assert!(validate_email("a@b").is_ok());
        assert_eq!(validate_email("ab"), Err(ValidationError::InvalidEmail));
        assert_eq!(validate_email("@b"), Err(ValidationError::InvalidEmail));
        assert_eq!(validate_email("a@"), Err(ValidationError::InvalidEmail));
        assert_eq!(validate_email("a@b@c"), Err(ValidationError::InvalidEmail));
        assert_eq!(validate_email("a b@c"), Err(ValidationError::InvalidEmail));
        let long = format!("{}@example.org", "x".repeat(45));
        assert_eq!(validate_email(&long), Err(ValidationError::InvalidEmail));
    }

    #[test]
    fn should_fall_back_to_username_for_display() {
        let user = User::builder().username("linus").build().unwrap();
        assert_eq!(user.display_name(), "linus");
    }
}
