//! Common error types used across the workspace.
//!
//! Each layer defines its own typed errors and converts into
//! [`SmartHomeError`] via `#[from]`. There are no `String` catch-all variants.

use crate::device::DeviceKind;

/// Top-level error returned by domain and application operations.
#[derive(Debug, thiserror::Error)]
pub enum SmartHomeError {
    #[error("validation error: {0}")]
    Validation(#[from] ValidationError),

    #[error(transparent)]
    NotFound(#[from] NotFoundError),

    #[error(transparent)]
    Conflict(#[from] ConflictError),

    #[error(transparent)]
    Device(#[from] DeviceError),

    #[error(transparent)]
    Access(#[from] AccessError),

    #[error("storage error")]
    Storage(#[source] Box<dyn std::error::Error + Send + Sync>),
}

/// A domain invariant was violated.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ValidationError {
    #[error("name must not be empty")]
    EmptyName,

    #[error("name must be at most {max} characters")]
    NameTooLong { max: usize },

    #[error("username must not be empty")]
    EmptyUsername,

    #[error("username must be at most {max} characters")]
    UsernameTooLong { max: usize },

    #[error("email address is not valid")]
    InvalidEmail,

    #[error("device secret key must not be empty")]
    EmptySecretKey,

    #[error("{field} must be between {min} and {max}")]
    OutOfRange {
        field: &'static str,
        min: f64,
        max: f64,
    },

    #[error("{field} must not be negative")]
    Negative { field: &'static str },

    #[error("{field} must be a number")]
    InvalidNumber { field: &'static str },

    #[error("color must be a #rrggbb hex value")]
    InvalidColor,

    #[error("power must be 'on' or 'off'")]
    InvalidPower,

    #[error("unknown device type")]
    UnknownDeviceKind,

    #[error("unknown cutting mode")]
    UnknownCuttingMode,

    #[error("identifier is not valid")]
    InvalidId,

    #[error("status block is for a {actual}, expected a {expected}")]
    StatusKindMismatch {
        expected: DeviceKind,
        actual: DeviceKind,
    },

    #[error("turn-off time must be after turn-on time")]
    EmptyWindow,

    #[error("working duration must be between 1 and {max} minutes")]
    InvalidDuration { max: u32 },

    #[error("time is not valid")]
    InvalidTime,

    #[error("a device cannot be shared with its owner")]
    SelfShare,
}

/// A looked-up record does not exist.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{entity} {id} not found")]
pub struct NotFoundError {
    pub entity: &'static str,
    pub id: String,
}

/// A record collides with an existing one.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{entity} {key} already exists")]
pub struct ConflictError {
    pub entity: &'static str,
    pub key: String,
}

/// The device is not in a state that allows the requested operation.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum DeviceError {
    #[error("device {device_id} is a {actual}, not compatible with {expected}")]
    NotCompatible {
        device_id: String,
        expected: DeviceKind,
        actual: DeviceKind,
    },

    #[error("device {device_id} is not connected")]
    NotConnected { device_id: String },
}

/// The acting user is not allowed to touch the device.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("user {user_id} may not access device {device_id}")]
pub struct AccessError {
    pub user_id: String,
    pub device_id: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn should_convert_validation_error_into_smart_home_error() {
        let err: SmartHomeError = ValidationError::EmptyName.into();
        assert!(matches!(
            err,
            SmartHomeError::Validation(ValidationError::EmptyName)
        ));
    }

    #[test]
    fn should_describe_not_found_error() {
        let err = NotFoundError {
            entity: "Device",
            id: "abc".to_string(),
        };
        assert_eq!(err.to_string(), "Device abc not found");
    }

    #[test]
    fn should_describe_out_of_range_error() {
        let err = ValidationError::OutOfRange {
            field: "brightness",
            min: 0.0,
            max: 100.0,
        };
        assert_eq!(err.to_string(), "brightness must be between 0 and 100");
    }

    #[test]
    fn should_describe_incompatible_device() {
        let err = DeviceError::NotCompatible {
            device_id: "d1".to_string(),
            expected: DeviceKind::Bulb,
            actual: DeviceKind::Plug,
        };
        assert_eq!(
            err.to_string(),
            "device d1 is a Plug, not compatible with Bulb"
        );
    }
}
