//! Shared application state for axum handlers.

use std::sync::Arc;

use smartcode_app::ports::{DeviceRepository, ScheduleRepository, ShareRepository, UserRepository};
use smartcode_app::services::{AccessService, DeviceService, ScheduleService, UserService};
use smartcode_domain::error::SmartHomeError;
use smartcode_domain::id::{DeviceId, UserId};

/// Application state shared across all axum handlers.
///
/// Generic over the device, user, share and schedule repositories to avoid
/// dynamic dispatch. `Clone` is implemented manually so the repositories
/// themselves do not need to be `Clone`; only the `Arc` wrappers are cloned.
pub struct AppState<D, U, S, C> {
    /// Device CRUD and control.
    pub device_service: Arc<DeviceService<D>>,
    /// Accounts.
    pub user_service: Arc<UserService<U>>,
    /// Ownership checks and sharing.
    pub access_service: Arc<AccessService<D, U, S>>,
    /// Power schedules.
    pub schedule_service: Arc<ScheduleService<C, D>>,
}

impl<D, U, S, C> Clone for AppState<D, U, S, C> {
    fn clone(&self) -> Self {
        Self {
            device_service: Arc::clone(&self.device_service),
            user_service: Arc::clone(&self.user_service),
            access_service: Arc::clone(&self.access_service),
            schedule_service: Arc::clone(&self.schedule_service),
        }
    }
}

impl<D, U, S, C> AppState<D, U, S, C>
where
    D: DeviceRepository + Clone + Send + Sync + 'static,
    U: UserRepository + Clone + Send + Sync + 'static,
    S: ShareRepository + Send + Sync + 'static,
    C: ScheduleRepository + Send + Sync + 'static,
{
    /// Wire every service over the given repositories.
    ///
    /// The device and user repositories are shared between services, so
    /// they are usually `Arc`s.
    pub fn new(devices: D, users: U, shares: S, schedules: C) -> Self {
        Self {
            device_service: Arc::new(DeviceService::new(devices.clone())),
            user_service: Arc::new(UserService::new(users.clone())),
            access_service: Arc::new(AccessService::new(devices.clone(), users, shares)),
            schedule_service: Arc::new(ScheduleService::new(schedules, devices)),
        }
    }
}

impl<D, U, S, C> AppState<D, U, S, C>
where
    D: DeviceRepository + Send + Sync + 'static,
    U: UserRepository + Send + Sync + 'static,
    S: ShareRepository + Send + Sync + 'static,
    C: ScheduleRepository + Send + Sync + 'static,
{
    /// Create the state from pre-wrapped `Arc` services.
    ///
    /// Use this when services need to be shared with background tasks
    /// before constructing the HTTP state.
    pub fn from_arcs(
        device_service: Arc<DeviceService<D>>,
        user_service: Arc<UserService<U>>,
        access_service: Arc<AccessService<D, U, S>>,
        schedule_service: Arc<ScheduleService<C, D>>,
    ) -> Self {
        Self {
            device_service,
            user_service,
            access_service,
            schedule_service,
        }
    }

    /// Delete a device together with its schedules and shares.
    ///
    /// # Errors
    ///
    /// Returns [`SmartHomeError::NotFound`] for an unknown device, or a
    /// storage error.
    #[tracing::instrument(skip(self))]
    pub async fn remove_device(&self, device_id: DeviceId) -> Result<(), SmartHomeError> {
        let device = self.device_service.get(device_id).await?;
        let schedules = self.schedule_service.purge_device(device_id).await?;
        let shares = self.access_service.purge_device(device_id).await?;
        self.device_service.delete(device_id).await?;
        tracing::info!(device_name = %device.name, schedules, shares, "device removed");
        Ok(())
    }

    /// Delete an account, the devices it owns and every share involving it.
    ///
    /// # Errors
    ///
    /// Returns [`SmartHomeError::NotFound`] for an unknown user, or a
    /// storage error.
    #[tracing::instrument(skip(self))]
    pub async fn remove_user(&self, user_id: UserId) -> Result<(), SmartHomeError> {
        let user = self.user_service.get(user_id).await?;
        for device in self.device_service.list_owned(user_id).await? {
            self.remove_device(device.id).await?;
        }
        self.access_service.purge_user(user_id).await?;
        self.user_service.delete(user_id).await?;
        tracing::info!(username = %user.username, "user removed");
        Ok(())
    }
}

#[cfg(test)]
pub(crate) mod test_support {
    use std::sync::Arc;

    use smartcode_app::memory::{
        InMemoryDeviceRepo, InMemoryScheduleRepo, InMemoryShareRepo, InMemoryUserRepo,
    };
    use smartcode_domain::device::{Device, DeviceKind};
    use smartcode_domain::user::User;

    use super::AppState;

    pub(crate) type TestState = AppState<
        Arc<InMemoryDeviceRepo>,
        Arc<InMemoryUserRepo>,
        InMemoryShareRepo,
        InMemoryScheduleRepo,
    >;

    pub(crate) fn test_state() -> TestState {
        AppState::new(
            Arc::new(InMemoryDeviceRepo::default()),
            Arc::new(InMemoryUserRepo::default()),
            InMemoryShareRepo::default(),
            InMemoryScheduleRepo::default(),
        )
    }

    pub(crate) async fn add_user(state: &TestState, username: &str) -> User {
        let user = User::builder()
            .username(username)
            .email(format!("{username}@example.com"))
            .build()
            .unwrap();
        state.user_service.register(user).await.unwrap()
    }

    pub(crate) async fn add_device(
        state: &TestState,
        owner: &User,
        name: &str,
        kind: DeviceKind,
    ) -> Device {
        let device = Device::builder()
            .name(name)
            .kind(kind)
            .owner_id(owner.id)
            .secret_key("s3cret")
            .build()
            .unwrap();
        state.device_service.create(device).await.unwrap()
    }
}
