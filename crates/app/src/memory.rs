//! In-memory repositories.
//!
//! Backed by `Mutex<Vec<_>>` so insertion order is kept. Used by unit tests
//! across the workspace and available behind the `memory` feature.

use std::future::Future;
use std::sync::{Mutex, MutexGuard, PoisonError};

use smartcode_domain::device::{Device, DeviceKind};
use smartcode_domain::error::{ConflictError, NotFoundError, SmartHomeError};
use smartcode_domain::id::{DeviceId, ScheduleId, UserId};
use smartcode_domain::schedule::Schedule;
use smartcode_domain::share::DeviceShare;
use smartcode_domain::user::User;

use crate::ports::{DeviceRepository, ScheduleRepository, ShareRepository, UserRepository};

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

fn not_found(entity: &'static str, id: impl ToString) -> SmartHomeError {
    NotFoundError {
        entity,
        id: id.to_string(),
    }
    .into()
}

fn conflict(entity: &'static str, key: impl ToString) -> SmartHomeError {
    ConflictError {
        entity,
        key: key.to_string(),
    }
    .into()
}

#[derive(Debug, Default)]
pub struct InMemoryDeviceRepo {
    store: Mutex<Vec<Device>>,
}

impl DeviceRepository for InMemoryDeviceRepo {
    fn create(&self, device: Device) -> impl Future<Output = Result<Device, SmartHomeError>> + Send {
        let mut store = lock(&self.store);
        let result = if store.iter().any(|d| d.id == device.id) {
            Err(conflict("Device", device.id))
        } else {
            store.push(device.clone());
            Ok(device)
        };
        async move { result }
    }

    fn get_by_id(
        &self,
        id: DeviceId,
    ) -> impl Future<Output = Result<Option<Device>, SmartHomeError>> + Send {
        let result = lock(&self.store).iter().find(|d| d.id == id).cloned();
        async move { Ok(result) }
    }

    fn get_all(&self) -> impl Future<Output = Result<Vec<Device>, SmartHomeError>> + Send {
        let result = lock(&self.store).clone();
        async move { Ok(result) }
    }

    fn find_by_owner(
        &self,
        owner_id: UserId,
    ) -> impl Future<Output = Result<Vec<Device>, SmartHomeError>> + Send {
        let result: Vec<Device> = lock(&self.store)
            .iter()
            .filter(|d| d.owner_id == Some(owner_id))
            .cloned()
            .collect();
        async move { Ok(result) }
    }

    fn find_by_kind(
        &self,
        kind: DeviceKind,
    ) -> impl Future<Output = Result<Vec<Device>, SmartHomeError>> + Send {
        let result: Vec<Device> = lock(&self.store)
            .iter()
            .filter(|d| d.kind() == kind)
            .cloned()
            .collect();
        async move { Ok(result) }
    }

    fn update(&self, device: Device) -> impl Future<Output = Result<Device, SmartHomeError>> + Send {
        let mut store = lock(&self.store);
        let result = match store.iter_mut().find(|d| d.id == device.id) {
            Some(slot) => {
                *slot = device.clone();
                Ok(device)
            }
            None => Err(not_found("Device", device.id)),
        };
        async move { result }
    }

    fn delete(&self, id: DeviceId) -> impl Future<Output = Result<(), SmartHomeError>> + Send {
        let mut store = lock(&self.store);
        let before = store.len();
        store.retain(|d| d.id != id);
        let result = if store.len() == before {
            Err(not_found("Device", id))
        } else {
            Ok(())
        };
        async move { result }
    }
}

#[derive(Debug, Default)]
pub struct InMemoryUserRepo {
    store: Mutex<Vec<User>>,
}

impl UserRepository for InMemoryUserRepo {
    fn create(&self, user: User) -> impl Future<Output = Result<User, SmartHomeError>> + Send {
        let mut store = lock(&self.store);
        let result = if store.iter().any(|u| u.username == user.username) {
            Err(conflict("User", &user.username))
        } else {
            store.push(user.clone());
            Ok(user)
        };
        async move { result }
    }

    fn get_by_id(
        &self,
        id: UserId,
    ) -> impl Future<Output = Result<Option<User>, SmartHomeError>> + Send {
        let result = lock(&self.store).iter().find(|u| u.id == id).cloned();
        async move { Ok(result) }
    }

    fn get_all(&self) -> impl Future<Output = Result<Vec<User>, SmartHomeError>> + Send {
        let result = lock(&self.store).clone();
        async move { Ok(result) }
    }

    fn find_by_username(
        &self,
        username: &str,
    ) -> impl Future<Output = Result<Option<User>, SmartHomeError>> + Send {
        let result = lock(&self.store)
            .iter()
            .find(|u| u.username == username)
            .cloned();
        async move { Ok(result) }
    }

    fn find_by_email(
        &self,
        email: &str,
    ) -> impl Future<Output = Result<Option<User>, SmartHomeError>> + Send {
        let result = lock(&self.store)
            .iter()
            .find(|u| {
                u.email
                    .as_deref()
                    .is_some_and(|e| e.eq_ignore_ascii_case(email))
            })
            .cloned();
        async move { Ok(result) }
    }

    fn update(&self, user: User) -> impl Future<Output = Result<User, SmartHomeError>> + Send {
        let mut store = lock(&self.store);
        let result = match store.iter_mut().find(|u| u.id == user.id) {
            Some(slot) => {
                *slot = user.clone();
                Ok(user)
            }
            None => Err(not_found("User", user.id)),
        };
        async move { result }
    }

    fn delete(&self, id: UserId) -> impl Future<Output = Result<(), SmartHomeError>> + Send {
        let mut store = lock(&self.store);
        let before = store.len();
        store.retain(|u| u.id != id);
        let result = if store.len() == before {
            Err(not_found("User", id))
        } else {
            Ok(())
        };
        async move { result }
    }
}

#[derive(Debug, Default)]
pub struct InMemoryShareRepo {
    store: Mutex<Vec<DeviceShare>>,
}

impl ShareRepository for InMemoryShareRepo {
    fn create(
        &self,
        share: DeviceShare,
    ) -> impl Future<Output = Result<DeviceShare, SmartHomeError>> + Send {
        let mut store = lock(&self.store);
        let result = if store
            .iter()
            .any(|s| s.device_id == share.device_id && s.user_id == share.user_id)
        {
            Err(conflict("Share", format!("{}/{}", share.device_id, share.user_id)))
        } else {
            store.push(share.clone());
            Ok(share)
        };
        async move { result }
    }

    fn exists(
        &self,
        device_id: DeviceId,
        user_id: UserId,
    ) -> impl Future<Output = Result<bool, SmartHomeError>> + Send {
        let result = lock(&self.store)
            .iter()
            .any(|s| s.device_id == device_id && s.user_id == user_id);
        async move { Ok(result) }
    }

    fn find_by_device(
        &self,
        device_id: DeviceId,
    ) -> impl Future<Output = Result<Vec<DeviceShare>, SmartHomeError>> + Send {
        let result: Vec<DeviceShare> = lock(&self.store)
            .iter()
            .filter(|s| s.device_id == device_id)
            .cloned()
            .collect();
        async move { Ok(result) }
    }

    fn find_by_user(
        &self,
        user_id: UserId,
    ) -> impl Future<Output = Result<Vec<DeviceShare>, SmartHomeError>> + Send {
        let result: Vec<DeviceShare> = lock(&self.store)
            .iter()
            .filter(|s| s.user_id == user_id)
            .cloned()
            .collect();
        async move { Ok(result) }
    }

    fn delete(
        &self,
        device_id: DeviceId,
        user_id: UserId,
    ) -> impl Future<Output = Result<bool, SmartHomeError>> + Send {
        let mut store = lock(&self.store);
        let before = store.len();
        store.retain(|s| !(s.device_id == device_id && s.user_id == user_id));
        let removed = store.len() != before;
        async move { Ok(removed) }
    }

    fn delete_by_device(
        &self,
        device_id: DeviceId,
    ) -> impl Future<Output = Result<usize, SmartHomeError>> + Send {
        let mut store = lock(&self.store);
        let before = store.len();
        store.retain(|s| s.device_id != device_id);
        let removed = before - store.len();
        async move { Ok(removed) }
    }

    fn delete_by_user(
        &self,
        user_id: UserId,
    ) -> impl Future<Output = Result<usize, SmartHomeError>> + Send {
        let mut store = lock(&self.store);
        let before = store.len();
        store.retain(|s| s.user_id != user_id);
        let removed = before - store.len();
        async move { Ok(removed) }
    }
}

#[derive(Debug, Default)]
pub struct InMemoryScheduleRepo {
    store: Mutex<Vec<Schedule>>,
}

impl ScheduleRepository for InMemoryScheduleRepo {
    fn create(
        &self,
        schedule: Schedule,
    ) -> impl Future<Output = Result<Schedule, SmartHomeError>> + Send {
        let mut store = lock(&self.store);
        let result = if store.iter().any(|s| s.id == schedule.id) {
            Err(conflict("Schedule", schedule.id))
        } else {
            store.push(schedule.clone());
            Ok(schedule)
        };
        async move { result }
    }

    fn get_by_id(
        &self,
        id: ScheduleId,
    ) -> impl Future<Output = Result<Option<Schedule>, SmartHomeError>> + Send {
        let result = lock(&self.store).iter().find(|s| s.id == id).cloned();
        async move { Ok(result) }
    }

    fn get_all(&self) -> impl Future<Output = Result<Vec<Schedule>, SmartHomeError>> + Send {
        let result = lock(&self.store).clone();
        async move { Ok(result) }
    }

    fn find_by_device(
        &self,
        device_id: DeviceId,
    ) -> impl Future<Output = Result<Vec<Schedule>, SmartHomeError>> + Send {
        let result: Vec<Schedule> = lock(&self.store)
            .iter()
            .filter(|s| s.device_id == device_id)
            .cloned()
            .collect();
        async move { Ok(result) }
    }

    fn delete(&self, id: ScheduleId) -> impl Future<Output = Result<(), SmartHomeError>> + Send {
        let mut store = lock(&self.store);
        let before = store.len();
        store.retain(|s| s.id != id);
        let result = if store.len() == before {
            Err(not_found("Schedule", id))
        } else {
            Ok(())
        };
        async move { result }
    }

    fn delete_by_device(
        &self,
        device_id: DeviceId,
    ) -> impl Future<Output = Result<usize, SmartHomeError>> + Send {
        let mut store = lock(&self.store);
        let before = store.len();
        store.retain(|s| s.device_id != device_id);
        let removed = before - store.len();
        async move { Ok(removed) }
    }
}
