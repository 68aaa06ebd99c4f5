//! Storage port — repository traits for persistence.
//!
//! Every repository has a blanket implementation for `Arc<T>` so a single
//! store can back several services.

use std::future::Future;
use std::sync::Arc;

use smartcode_domain::device::{Device, DeviceKind};
use smartcode_domain::error::SmartHomeError;
use smartcode_domain::id::{DeviceId, ScheduleId, UserId};
use smartcode_domain::schedule::Schedule;
use smartcode_domain::share::DeviceShare;
use smartcode_domain::user::User;

/// Repository for persisting and querying [`Device`]s.
pub trait DeviceRepository {
    /// Insert a new device.
    fn create(&self, device: Device) -> impl Future<Output = Result<Device, SmartHomeError>> + Send;

    fn get_by_id(
        &self,
        id: DeviceId,
    ) -> impl Future<Output = Result<Option<Device>, SmartHomeError>> + Send;

    /// All devices, in insertion order.
    fn get_all(&self) -> impl Future<Output = Result<Vec<Device>, SmartHomeError>> + Send;

    fn find_by_owner(
        &self,
        owner_id: UserId,
    ) -> impl Future<Output = Result<Vec<Device>, SmartHomeError>> + Send;

    fn find_by_kind(
        &self,
        kind: DeviceKind,
    ) -> impl Future<Output = Result<Vec<Device>, SmartHomeError>> + Send;

    /// Replace an existing device.
    ///
    /// Fails with `NotFound` when no device has the same id.
    fn update(&self, device: Device) -> impl Future<Output = Result<Device, SmartHomeError>> + Send;

    /// Remove a device. Fails with `NotFound` when it does not exist.
    fn delete(&self, id: DeviceId) -> impl Future<Output = Result<(), SmartHomeError>> + Send;
}

/// Repository for persisting and querying [`User`]s.
pub trait UserRepository {
    /// Insert a new user.
    fn create(&self, user: User) -> impl Future<Output = Result<User, SmartHomeError>> + Send;

    fn get_by_id(
        &self,
        id: UserId,
    ) -> impl Future<Output = Result<Option<User>, SmartHomeError>> + Send;

    fn get_all(&self) -> impl Future<Output = Result<Vec<User>, SmartHomeError>> + Send;

    fn find_by_username(
        &self,
        username: &str,
    ) -> impl Future<Output = Result<Option<User>, SmartHomeError>> + Send;

    /// Case-insensitive lookup by email address.
    fn find_by_email(
        &self,
        email: &str,
    ) -> impl Future<Output = Result<Option<User>, SmartHomeError>> + Send;

    fn update(&self, user: User) -> impl Future<Output = Result<User, SmartHomeError>> + Send;

    fn delete(&self, id: UserId) -> impl Future<Output = Result<(), SmartHomeError>> + Send;
}

/// Repository for the device/user share relation.
pub trait ShareRepository {
    fn create(
        &self,
        share: DeviceShare,
    ) -> impl Future<Output = Result<DeviceShare, SmartHomeError>> + Send;

    fn exists(
        &self,
        device_id: DeviceId,
        user_id: UserId,
    ) -> impl Future<Output = Result<bool, SmartHomeError>> + Send;

    fn find_by_device(
        &self,
        device_id: DeviceId,
    ) -> impl Future<Output = Result<Vec<DeviceShare>, SmartHomeError>> + Send;

    fn find_by_user(
        &self,
        user_id: UserId,
    ) -> impl Future<Output = Result<Vec<DeviceShare>, SmartHomeError>> + Send;

    /// Remove one share. Returns whether it existed.
    fn delete(
        &self,
        device_id: DeviceId,
        user_id: UserId,
    ) -> impl Future<Output = Result<bool, SmartHomeError>> + Send;

    /// Remove every share of a device. Returns how many were removed.
    fn delete_by_device(
        &self,
        device_id: DeviceId,
    ) -> impl Future<Output = Result<usize, SmartHomeError>> + Send;

    /// Remove every share granted to a user. Returns how many were removed.
    fn delete_by_user(
        &self,
        user_id: UserId,
    ) -> impl Future<Output = Result<usize, SmartHomeError>> + Send;
}

/// Repository for persisting and querying [`Schedule`]s.
pub trait ScheduleRepository {
    fn create(
        &self,
        schedule: Schedule,
    ) -> impl Future<Output = Result<Schedule, SmartHomeError>> + Send;

    fn get_by_id(
        &self,
        id: ScheduleId,
    ) -> impl Future<Output = Result<Option<Schedule>, SmartHomeError>> + Send;

    fn get_all(&self) -> impl Future<Output = Result<Vec<Schedule>, SmartHomeError>> + Send;

    fn find_by_device(
        &self,
        device_id: DeviceId,
    ) -> impl Future<Output = Result<Vec<Schedule>, SmartHomeError>> + Send;

    /// Remove a schedule. Fails with `NotFound` when it does not exist.
    fn delete(&self, id: ScheduleId) -> impl Future<Output = Result<(), SmartHomeError>> + Send;

    /// Remove every schedule of a device. Returns how many were removed.
    fn delete_by_device(
        &self,
        device_id: DeviceId,
    ) -> impl Future<Output = Result<usize, SmartHomeError>> + Send;
}

impl<T: DeviceRepository + Send + Sync> DeviceRepository for Arc<T> {
    fn create(&self, device: Device) -> impl Future<Output = Result<Device, SmartHomeError>> + Send {
        (**self).create(device)
    }

    fn get_by_id(
        &self,
        id: DeviceId,
    ) -> impl Future<Output = Result<Option<Device>, SmartHomeError>> + Send {
        (**self).get_by_id(id)
    }

    fn get_all(&self) -> impl Future<Output = Result<Vec<Device>, SmartHomeError>> + Send {
        (**self).get_all()
    }

    fn find_by_owner(
        &self,
        owner_id: UserId,
    ) -> impl Future<Output = Result<Vec<Device>, SmartHomeError>> + Send {
        (**self).find_by_owner(owner_id)
    }

    fn find_by_kind(
        &self,
        kind: DeviceKind,
    ) -> impl Future<Output = Result<Vec<Device>, SmartHomeError>> + Send {
        (**self).find_by_kind(kind)
    }

    fn update(&self, device: Device) -> impl Future<Output = Result<Device, SmartHomeError>> + Send {
        (**self).update(device)
    }

    fn delete(&self, id: DeviceId) -> impl Future<Output = Result<(), SmartHomeError>> + Send {
        (**self).delete(id)
    }
}

impl<T: UserRepository + Send + Sync> UserRepository for Arc<T> {
    fn create(&self, user: User) -> impl Future<Output = Result<User, SmartHomeError>> + Send {
        (**self).create(user)
    }

    fn get_by_id(
        &self,
        id: UserId,
    ) -> impl Future<Output = Result<Option<User>, SmartHomeError>> + Send {
        (**self).get_by_id(id)
    }

    fn get_all(&self) -> impl Future<Output = Result<Vec<User>, SmartHomeError>> + Send {
        (**self).get_all()
    }

    fn find_by_username(
        &self,
        username: &str,
    ) -> impl Future<Output = Result<Option<User>, SmartHomeError>> + Send {
        (**self).find_by_username(username)
    }

    fn find_by_email(
        &self,
        email: &str,
    ) -> impl Future<Output = Result<Option<User>, SmartHomeError>> + Send {
        (**self).find_by_email(email)
    }

    fn update(&self, user: User) -> impl Future<Output = Result<User, SmartHomeError>> + Send {
        (**self).update(user)
    }

    fn delete(&self, id: UserId) -> impl Future<Output = Result<(), SmartHomeError>> + Send {
        (**self).delete(id)
    }
}

impl<T: ShareRepository + Send + Sync> ShareRepository for Arc<T> {
    fn create(
        &self,
        share: DeviceShare,
    ) -> impl Future<Output = Result<DeviceShare, SmartHomeError>> + Send {
        (**self).create(share)
    }

    fn exists(
        &self,
        device_id: DeviceId,
        user_id: UserId,
    ) -> impl Future<Output = Result<bool, SmartHomeError>> + Send {
        (**self).exists(device_id, user_id)
    }

    fn find_by_device(
        &self,
        device_id: DeviceId,
    ) -> impl Future<Output = Result<Vec<DeviceShare>, SmartHomeError>> + Send {
        (**self).find_by_device(device_id)
    }

    fn find_by_user(
        &self,
        user_id: UserId,
    ) -> impl Future<Output = Result<Vec<DeviceShare>, SmartHomeError>> + Send {
        (**self).find_by_user(user_id)
    }

    fn delete(
        &self,
        device_id: DeviceId,
        user_id: UserId,
    ) -> impl Future<Output = Result<bool, SmartHomeError>> + Send {
        (**self).delete(device_id, user_id)
    }

    fn delete_by_device(
        &self,
        device_id: DeviceId,
    ) -> impl Future<Output = Result<usize, SmartHomeError>> + Send {
        (**self).delete_by_device(device_id)
    }

    fn delete_by_user(
        &self,
        user_id: UserId,
    ) -> impl Future<Output = Result<usize, SmartHomeError>> + Send {
        (**self).delete_by_user(user_id)
    }
}

impl<T: ScheduleRepository + Send + Sync> ScheduleRepository for Arc<T> {
    fn create(
        &self,
        schedule: Schedule,
    ) -> impl Future<Output = Result<Schedule, SmartHomeError>> + Send {
        (**self).create(schedule)
    }

    fn get_by_id(
        &self,
        id: ScheduleId,
    ) -> impl Future<Output = Result<Option<Schedule>, SmartHomeError>> + Send {
        (**self).get_by_id(id)
    }

    fn get_all(&self) -> impl Future<Output = Result<Vec<Schedule>, SmartHomeError>> + Send {
        (**self).get_all()
    }

    fn find_by_device(
        &self,
        device_id: DeviceId,
    ) -> impl Future<Output = Result<Vec<Schedule>, SmartHomeError>> + Send {
        (**self).find_by_device(device_id)
    }

    fn delete(&self, id: ScheduleId) -> impl Future<Output = Result<(), SmartHomeError>> + Send {
        (**self).delete(id)
    }

    fn delete_by_device(
        &self,
        device_id: DeviceId,
    ) -> impl Future<Output = Result<usize, SmartHomeError>> + Send {
        (**self).delete_by_device(device_id)
    }
}
