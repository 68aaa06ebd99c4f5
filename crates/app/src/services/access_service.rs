//! Access service — who may see and control which device.
//!
//! A user may access a device they own, a device shared with them, or a
//! device without an owner (devices imported from the legacy household
//! files belong to everyone). Only the owner manages a device: editing,
//! deleting and sharing it. Unowned devices may be managed by any user.

use std::collections::HashSet;

use smartcode_domain::device::Device;
use smartcode_domain::error::{
    AccessError, ConflictError, NotFoundError, SmartHomeError, ValidationError,
};
use smartcode_domain::id::{DeviceId, UserId};
use smartcode_domain::share::DeviceShare;
use smartcode_domain::time::now;
use smartcode_domain::user::User;

use crate::ports::{DeviceRepository, ShareRepository, UserRepository};

/// Application service for ownership checks and device sharing.
pub struct AccessService<D, U, S> {
    devices: D,
    users: U,
    shares: S,
}

fn forbidden(user_id: UserId, device_id: DeviceId) -> SmartHomeError {
    AccessError {
        user_id: user_id.to_string(),
        device_id: device_id.to_string(),
    }
    .into()
}

fn manages(user_id: UserId, device: &Device) -> bool {
    device.owner_id.is_none_or(|owner| owner == user_id)
}

impl<D, U, S> AccessService<D, U, S>
where
    D: DeviceRepository,
    U: UserRepository,
    S: ShareRepository,
{
    pub fn new(devices: D, users: U, shares: S) -> Self {
        Self {
            devices,
            users,
            shares,
        }
    }

    async fn load_device(&self, device_id: DeviceId) -> Result<Device, SmartHomeError> {
        self.devices.get_by_id(device_id).await?.ok_or_else(|| {
            NotFoundError {
                entity: "Device",
                id: device_id.to_string(),
            }
            .into()
        })
    }

    /// Whether `user_id` may see and control `device`.
    ///
    /// # Errors
    ///
    /// Returns a storage error propagated from the share repository.
    pub async fn can_access(&self, user_id: UserId, device: &Device) -> Result<bool, SmartHomeError> {
        if manages(user_id, device) {
            return Ok(true);
        }
        self.shares.exists(device.id, user_id).await
    }

    /// Load a device the user may access.
    ///
    /// # Errors
    ///
    /// Returns [`SmartHomeError::NotFound`] for an unknown device,
    /// [`SmartHomeError::Access`] when the user has no access, or a storage
    /// error.
    #[tracing::instrument(skip(self))]
    pub async fn accessible_device(
        &self,
        user_id: UserId,
        device_id: DeviceId,
    ) -> Result<Device, SmartHomeError> {
        let device = self.load_device(device_id).await?;
        if self.can_access(user_id, &device).await? {
            Ok(device)
        } else {
            Err(forbidden(user_id, device_id))
        }
    }

    /// Load a device the user manages.
    ///
    /// # Errors
    ///
    /// Returns [`SmartHomeError::NotFound`] for an unknown device,
    /// [`SmartHomeError::Access`] when the user is not the owner, or a storage
    /// error.
    #[tracing::instrument(skip(self))]
    pub async fn owned_device(
        &self,
        user_id: UserId,
        device_id: DeviceId,
    ) -> Result<Device, SmartHomeError> {
        let device = self.load_device(device_id).await?;
        if manages(user_id, &device) {
            Ok(device)
        } else {
            Err(forbidden(user_id, device_id))
        }
    }

    /// Every device the user may access, ordered by name.
    ///
    /// # Errors
    ///
    /// Returns a storage error propagated from the repositories.
    #[tracing::instrument(skip(self))]
    pub async fn accessible_devices(&self, user_id: UserId) -> Result<Vec<Device>, SmartHomeError> {
        let shared: HashSet<DeviceId> = self
            .shares
            .find_by_user(user_id)
            .await?
            .into_iter()
            .map(|share| share.device_id)
            .collect();
        let mut devices: Vec<Device> = self
            .devices
            .get_all()
            .await?
            .into_iter()
            .filter(|device| manages(user_id, device) || shared.contains(&device.id))
            .collect();
        devices.sort_by(|a, b| a.name.to_lowercase().cmp(&b.name.to_lowercase()));
        Ok(devices)
    }

    /// Share a device with the user registered under `email`.
    ///
    /// # Errors
    ///
    /// Returns [`SmartHomeError::Access`] unless `owner_id` manages the
    /// device, [`SmartHomeError::NotFound`] when no user has that email,
    /// [`SmartHomeError::Validation`] when sharing with oneself,
    /// [`SmartHomeError::Conflict`] when already shared, or a storage error.
    #[tracing::instrument(skip(self, email))]
    pub async fn share_device(
        &self,
        owner_id: UserId,
        device_id: DeviceId,
        email: &str,
    ) -> Result<DeviceShare, SmartHomeError> {
        let device = self.owned_device(owner_id, device_id).await?;
        let target = self
            .users
            .find_by_email(email.trim())
            .await?
            .ok_or_else(|| NotFoundError {
                entity: "User",
                id: email.trim().to_string(),
            })?;
        if target.id == owner_id || device.is_owned_by(target.id) {
            return Err(ValidationError::SelfShare.into());
        }
        if self.shares.exists(device_id, target.id).await? {
            return Err(ConflictError {
                entity: "Share",
                key: format!("{device_id}/{}", target.id),
            }
            .into());
        }
        let share = self
            .shares
            .create(DeviceShare::new(device_id, target.id, now()))
            .await?;
        tracing::info!(target_user = %target.username, "device shared");
        Ok(share)
    }

    /// Users a device is shared with, for the device's owner.
    ///
    /// # Errors
    ///
    /// Returns [`SmartHomeError::Access`] unless `owner_id` manages the
    /// device, [`SmartHomeError::NotFound`] for an unknown device, or a
    /// storage error.
    pub async fn shares_for_device(
        &self,
        owner_id: UserId,
        device_id: DeviceId,
    ) -> Result<Vec<(DeviceShare, User)>, SmartHomeError> {
        self.owned_device(owner_id, device_id).await?;
        let mut entries = Vec::new();
        for share in self.shares.find_by_device(device_id).await? {
            if let Some(user) = self.users.get_by_id(share.user_id).await? {
                entries.push((share, user));
            }
        }
        Ok(entries)
    }

    /// Revoke a share. The owner may revoke any share; a user may drop a
    /// share granted to them. Returns whether a share was removed.
    ///
    /// # Errors
    ///
    /// Returns [`SmartHomeError::Access`] for anyone else,
    /// [`SmartHomeError::NotFound`] for an unknown device, or a storage error.
    #[tracing::instrument(skip(self))]
    pub async fn unshare(
        &self,
        acting_user: UserId,
        device_id: DeviceId,
        user_id: UserId,
    ) -> Result<bool, SmartHomeError> {
        let device = self.load_device(device_id).await?;
        if !manages(acting_user, &device) && acting_user != user_id {
            return Err(forbidden(acting_user, device_id));
        }
        self.shares.delete(device_id, user_id).await
    }

    /// Drop every share of a deleted device.
    ///
    /// # Errors
    ///
    /// Returns a storage error propagated from the share repository.
    pub async fn purge_device(&self, device_id: DeviceId) -> Result<usize, SmartHomeError> {
        self.shares.delete_by_device(device_id).await
    }

    /// Drop every share granted to a deleted user.
    ///
    /// # Errors
    ///
    /// Returns a storage error propagated from the share repository.
    pub async fn purge_user(&self, user_id: UserId) -> Result<usize, SmartHomeError> {
        self.shares.delete_by_user(user_id).await
    }
}
