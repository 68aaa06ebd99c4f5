//! Device service — use-cases for registering and controlling devices.

use smartcode_domain::device::{Device, DeviceKind, DeviceStatus, Power};
use smartcode_domain::error::{NotFoundError, SmartHomeError};
use smartcode_domain::id::{DeviceId, UserId};
use smartcode_domain::time::now;

use crate::ports::DeviceRepository;

/// Application service for device CRUD and control operations.
pub struct DeviceService<R> {
    repo: R,
}

impl<R: DeviceRepository> DeviceService<R> {
    /// Create a new service backed by the given repository.
    pub fn new(repo: R) -> Self {
        Self { repo }
    }

    /// Register a new device after validating domain invariants.
    ///
    /// # Errors
    ///
    /// Returns [`SmartHomeError::Validation`] if invariants fail, or a
    /// storage error propagated from the repository.
    #[tracing::instrument(skip(self, device), fields(device_name = %device.name, kind = %device.kind()))]
    pub async fn create(&self, device: Device) -> Result<Device, SmartHomeError> {
        device.validate()?;
        self.repo.create(device).await
    }

    /// Look up a device by id, returning an error if not found.
    ///
    /// # Errors
    ///
    /// Returns [`SmartHomeError::NotFound`] when no device with `id` exists,
    /// or a storage error from the repository.
    #[tracing::instrument(skip(self))]
    pub async fn get(&self, id: DeviceId) -> Result<Device, SmartHomeError> {
        self.repo.get_by_id(id).await?.ok_or_else(|| {
            NotFoundError {
                entity: "Device",
                id: id.to_string(),
            }
            .into()
        })
    }

    /// List all devices.
    ///
    /// # Errors
    ///
    /// Returns a storage error propagated from the repository.
    pub async fn list(&self) -> Result<Vec<Device>, SmartHomeError> {
        self.repo.get_all().await
    }

    /// List the devices owned by `owner_id`.
    ///
    /// # Errors
    ///
    /// Returns a storage error propagated from the repository.
    pub async fn list_owned(&self, owner_id: UserId) -> Result<Vec<Device>, SmartHomeError> {
        self.repo.find_by_owner(owner_id).await
    }

    /// # Errors
    ///
    /// Returns a storage error propagated from the repository.
    pub async fn list_by_kind(&self, kind: DeviceKind) -> Result<Vec<Device>, SmartHomeError> {
        self.repo.find_by_kind(kind).await
    }

    /// Replace a device, stamping `last_updated`.
    ///
    /// # Errors
    ///
    /// Returns [`SmartHomeError::Validation`] if invariants fail,
    /// [`SmartHomeError::NotFound`] for an unknown device, or a storage error.
    #[tracing::instrument(skip(self, device), fields(device_id = %device.id))]
    pub async fn update(&self, mut device: Device) -> Result<Device, SmartHomeError> {
        device.validate()?;
        device.last_updated = now();
        self.repo.update(device).await
    }

    /// Delete a device by id.
    ///
    /// # Errors
    ///
    /// Returns [`SmartHomeError::NotFound`] for an unknown device, or a
    /// storage error propagated from the repository.
    #[tracing::instrument(skip(self))]
    pub async fn delete(&self, id: DeviceId) -> Result<(), SmartHomeError> {
        self.repo.delete(id).await
    }

    /// Switch a device on or off.
    ///
    /// # Errors
    ///
    /// Returns [`SmartHomeError::NotFound`] for an unknown device, or a
    /// storage error.
    #[tracing::instrument(skip(self))]
    pub async fn set_power(&self, id: DeviceId, power: Power) -> Result<Device, SmartHomeError> {
        let mut device = self.get(id).await?;
        device.set_power(power, now());
        let device = self.repo.update(device).await?;
        tracing::info!(device_name = %device.name, %power, "device power changed");
        Ok(device)
    }

    /// Flip the power state of a device.
    ///
    /// # Errors
    ///
    /// Returns [`SmartHomeError::NotFound`] for an unknown device, or a
    /// storage error.
    #[tracing::instrument(skip(self))]
    pub async fn toggle(&self, id: DeviceId) -> Result<Device, SmartHomeError> {
        let mut device = self.get(id).await?;
        let power = device.toggle(now());
        let device = self.repo.update(device).await?;
        tracing::info!(device_name = %device.name, %power, "device toggled");
        Ok(device)
    }

    /// Pair a device, checking it is of the `expected` kind.
    ///
    /// # Errors
    ///
    /// Returns [`SmartHomeError::Device`] when the kinds differ,
    /// [`SmartHomeError::NotFound`] for an unknown device, or a storage error.
    #[tracing::instrument(skip(self))]
    pub async fn connect(
        &self,
        id: DeviceId,
        expected: DeviceKind,
    ) -> Result<Device, SmartHomeError> {
        let mut device = self.get(id).await?;
        device.connect(expected)?;
        self.repo.update(device).await
    }

    /// Unpair a device. Returns whether it was connected.
    ///
    /// # Errors
    ///
    /// Returns [`SmartHomeError::NotFound`] for an unknown device, or a
    /// storage error.
    #[tracing::instrument(skip(self))]
    pub async fn disconnect(&self, id: DeviceId) -> Result<bool, SmartHomeError> {
        let mut device = self.get(id).await?;
        let was_connected = device.disconnect();
        if was_connected {
            self.repo.update(device).await?;
        }
        Ok(was_connected)
    }

    /// Power-cycle a paired device.
    ///
    /// # Errors
    ///
    /// Returns [`SmartHomeError::Device`] when the device is not connected,
    /// [`SmartHomeError::NotFound`] for an unknown device, or a storage error.
    #[tracing::instrument(skip(self))]
    pub async fn reboot(&self, id: DeviceId) -> Result<Device, SmartHomeError> {
        let mut device = self.get(id).await?;
        device.reboot(now())?;
        self.repo.update(device).await
    }

    /// Rename a paired device.
    ///
    /// # Errors
    ///
    /// Returns [`SmartHomeError::Device`] when the device is not connected,
    /// [`SmartHomeError::Validation`] for a blank name,
    /// [`SmartHomeError::NotFound`] for an unknown device, or a storage error.
    #[tracing::instrument(skip(self, name))]
    pub async fn rename(&self, id: DeviceId, name: String) -> Result<Device, SmartHomeError> {
        let mut device = self.get(id).await?;
        device.rename(name, now())?;
        self.repo.update(device).await
    }

    /// Read the status block of a paired device.
    ///
    /// # Errors
    ///
    /// Returns [`SmartHomeError::Device`] when the device is not connected,
    /// [`SmartHomeError::NotFound`] for an unknown device, or a storage error.
    pub async fn status(&self, id: DeviceId) -> Result<DeviceStatus, SmartHomeError> {
        let device = self.get(id).await?;
        Ok(device.status_checked()?.clone())
    }

    /// Switch a group of devices at once. Devices already in the requested
    /// state are left untouched. Returns the devices that changed.
    ///
    /// # Errors
    ///
    /// Returns [`SmartHomeError::NotFound`] for an unknown device (devices
    /// before it are already switched), or a storage error.
    #[tracing::instrument(skip(self, ids), fields(count = ids.len()))]
    pub async fn set_power_all(
        &self,
        ids: &[DeviceId],
        power: Power,
    ) -> Result<Vec<Device>, SmartHomeError> {
        let mut changed = Vec::new();
        for id in ids {
            let device = self.get(*id).await?;
            if device.power != power {
                changed.push(self.set_power(device.id, power).await?);
            }
        }
        Ok(changed)
    }

    /// Switch every device of `kind`, e.g. all bulbs in the house.
    ///
    /// # Errors
    ///
    /// Returns a storage error propagated from the repository.
    #[tracing::instrument(skip(self))]
    pub async fn set_power_for_kind(
        &self,
        kind: DeviceKind,
        power: Power,
    ) -> Result<Vec<Device>, SmartHomeError> {
        let ids: Vec<DeviceId> = self
            .repo
            .find_by_kind(kind)
            .await?
            .into_iter()
            .map(|device| device.id)
            .collect();
        self.set_power_all(&ids, power).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory::InMemoryDeviceRepo;
    use smartcode_domain::error::{DeviceError, ValidationError};

    fn make_service() -> DeviceService<InMemoryDeviceRepo> {
        DeviceService::new(InMemoryDeviceRepo::default())
    }

    fn device(name: &str, kind: DeviceKind) -> Device {
        Device::builder()
            .name(name)
            .location("Living room")
            .kind(kind)
            .build()
            .unwrap()
    }

    #[tokio::test]
    async fn should_create_device_when_valid() {
        let svc = make_service();
        let created = svc.create(device("Lamp", DeviceKind::Bulb)).await.unwrap();

        let fetched = svc.get(created.id).await.unwrap();
        assert_eq!(fetched.name, "Lamp");
        assert_eq!(fetched.kind(), DeviceKind::Bulb);
    }

    #[tokio::test]
    async fn should_reject_create_when_name_is_empty() {
        let svc = make_service();
        let mut invalid = device("Lamp", DeviceKind::Bulb);
        invalid.name = String::new();

        let result = svc.create(invalid).await;
        assert!(matches!(
            result,
            Err(SmartHomeError::Validation(ValidationError::EmptyName))
        ));
    }

    #[tokio::test]
    async fn should_return_not_found_when_device_missing() {
        let svc = make_service();
        let result = svc.get(DeviceId::new()).await;
        assert!(matches!(result, Err(SmartHomeError::NotFound(_))));
    }

    #[tokio::test]
    async fn should_list_owned_devices_only() {
        let svc = make_service();
        let owner = UserId::new();
        let mut mine = device("Mine", DeviceKind::Plug);
        mine.owner_id = Some(owner);
        svc.create(mine).await.unwrap();
        svc.create(device("Other", DeviceKind::Plug)).await.unwrap();

        let owned = svc.list_owned(owner).await.unwrap();
        assert_eq!(owned.len(), 1);
        assert_eq!(owned[0].name, "Mine");
        assert_eq!(svc.list().await.unwrap().len(), 2);
    }

    #[tokio::test]
    async fn should_toggle_power_and_persist() {
        let svc = make_service();
        let created = svc.create(device("Lamp", DeviceKind::Bulb)).await.unwrap();

        let toggled = svc.toggle(created.id).await.unwrap();
        assert_eq!(toggled.power, Power::On);
        assert_eq!(svc.get(created.id).await.unwrap().power, Power::On);

        let toggled = svc.toggle(created.id).await.unwrap();
        assert_eq!(toggled.power, Power::Off);
    }

    #[tokio::test]
    async fn should_set_power_explicitly() {
        let svc = make_service();
        let created = svc.create(device("Heater", DeviceKind::Plug)).await.unwrap();

        svc.set_power(created.id, Power::On).await.unwrap();
        svc.set_power(created.id, Power::On).await.unwrap();
        assert_eq!(svc.get(created.id).await.unwrap().power, Power::On);
    }

    #[tokio::test]
    async fn should_reject_connect_with_wrong_kind() {
        let svc = make_service();
        let created = svc.create(device("Lamp", DeviceKind::Bulb)).await.unwrap();

        let result = svc.connect(created.id, DeviceKind::Thermostat).await;
        assert!(matches!(
            result,
            Err(SmartHomeError::Device(DeviceError::NotCompatible { .. }))
        ));
        assert!(!svc.get(created.id).await.unwrap().connected);
    }

    #[tokio::test]
    async fn should_connect_then_disconnect() {
        let svc = make_service();
        let created = svc.create(device("Lamp", DeviceKind::Bulb)).await.unwrap();

        let connected = svc.connect(created.id, DeviceKind::Bulb).await.unwrap();
        assert!(connected.connected);
        assert!(svc.disconnect(created.id).await.unwrap());
        assert!(!svc.disconnect(created.id).await.unwrap());
    }

    #[tokio::test]
    async fn should_require_connection_for_status_rename_and_reboot() {
        let svc = make_service();
        let created = svc.create(device("Lamp", DeviceKind::Bulb)).await.unwrap();

        assert!(matches!(
            svc.status(created.id).await,
            Err(SmartHomeError::Device(DeviceError::NotConnected { .. }))
        ));
        assert!(svc.reboot(created.id).await.is_err());
        assert!(svc.rename(created.id, "Lamp 2".into()).await.is_err());

        svc.connect(created.id, DeviceKind::Bulb).await.unwrap();
        assert_eq!(
            svc.status(created.id).await.unwrap().kind(),
            DeviceKind::Bulb
        );
        assert_eq!(svc.reboot(created.id).await.unwrap().power, Power::On);
        assert_eq!(
            svc.rename(created.id, "Lamp 2".into()).await.unwrap().name,
            "Lamp 2"
        );
    }

    #[tokio::test]
    async fn should_switch_every_device_of_a_kind() {
        let svc = make_service();
        let a = svc.create(device("Hall", DeviceKind::Bulb)).await.unwrap();
        let b = svc.create(device("Porch", DeviceKind::Bulb)).await.unwrap();
        let plug = svc.create(device("Kettle", DeviceKind::Plug)).await.unwrap();
        svc.set_power(b.id, Power::On).await.unwrap();

        let changed = svc
            .set_power_for_kind(DeviceKind::Bulb, Power::On)
            .await
            .unwrap();
        assert_eq!(changed.len(), 1);
        assert_eq!(changed[0].id, a.id);
        assert_eq!(svc.get(plug.id).await.unwrap().power, Power::Off);
    }

    #[tokio::test]
    async fn should_delete_device() {
        let svc = make_service();
        let created = svc.create(device("Lamp", DeviceKind::Bulb)).await.unwrap();

        svc.delete(created.id).await.unwrap();

        assert!(matches!(
            svc.get(created.id).await,
            Err(SmartHomeError::NotFound(_))
        ));
        assert!(matches!(
            svc.delete(created.id).await,
            Err(SmartHomeError::NotFound(_))
        ));
    }
}
