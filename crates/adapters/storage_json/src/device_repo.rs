//! JSON-file implementation of [`DeviceRepository`] over `devices.json`.

use std::future::Future;
use std::path::PathBuf;

use smartcode_app::ports::DeviceRepository;
use smartcode_domain::device::{Device, DeviceKind};
use smartcode_domain::error::{ConflictError, NotFoundError, SmartHomeError};
use smartcode_domain::id::{DeviceId, UserId};
use smartcode_domain::time::now;

use crate::file::JsonFile;
use crate::invalid_record;
use crate::record::DeviceRecord;

/// Device repository backed by a legacy-compatible `devices.json`.
pub struct JsonDeviceRepository {
    file: JsonFile<DeviceRecord>,
}

impl JsonDeviceRepository {
    #[must_use]
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            file: JsonFile::new(path, "devices"),
        }
    }

    /// Decode every record, run `f` on the devices and write them back when
    /// `f` changed something or a legacy record had to be normalised.
    async fn with_devices<T, F>(&self, f: F) -> Result<T, SmartHomeError>
    where
        T: Send,
        F: FnOnce(&mut Vec<Device>) -> Result<(T, bool), SmartHomeError> + Send,
    {
        let path = self.file.path().to_path_buf();
        self.file
            .modify(move |records| {
                let loaded_at = now();
                let mut normalized = false;
                let mut devices = Vec::with_capacity(records.len());
                for (index, record) in records.iter().enumerate() {
                    let decoded = record
                        .decode(loaded_at)
                        .map_err(|err| invalid_record(&path, index, err))?;
                    normalized |= decoded.normalized;
                    devices.push(decoded.value);
                }
                if normalized {
                    tracing::info!(path = %path.display(), "normalising legacy device records");
                }

                let (value, dirty) = f(&mut devices)?;
                let changed = dirty || normalized;
                if changed {
                    *records = devices.iter().map(DeviceRecord::encode).collect();
                }
                Ok((value, changed))
            })
            .await
    }
}

fn not_found(id: DeviceId) -> SmartHomeError {
    NotFoundError {
        entity: "Device",
        id: id.to_string(),
    }
    .into()
}

impl DeviceRepository for JsonDeviceRepository {
    fn create(&self, device: Device) -> impl Future<Output = Result<Device, SmartHomeError>> + Send {
        self.with_devices(move |devices| {
            if devices.iter().any(|d| d.id == device.id) {
                return Err(ConflictError {
                    entity: "Device",
                    key: device.id.to_string(),
                }
                .into());
            }
            devices.push(device.clone());
            Ok((device, true))
        })
    }

    fn get_by_id(
        &self,
        id: DeviceId,
    ) -> impl Future<Output = Result<Option<Device>, SmartHomeError>> + Send {
        self.with_devices(move |devices| Ok((devices.iter().find(|d| d.id == id).cloned(), false)))
    }

    fn get_all(&self) -> impl Future<Output = Result<Vec<Device>, SmartHomeError>> + Send {
        self.with_devices(|devices| Ok((devices.clone(), false)))
    }

    fn find_by_owner(
        &self,
        owner_id: UserId,
    ) -> impl Future<Output = Result<Vec<Device>, SmartHomeError>> + Send {
        self.with_devices(move |devices| {
            let owned = devices
                .iter()
                .filter(|d| d.owner_id == Some(owner_id))
                .cloned()
                .collect();
            Ok((owned, false))
        })
    }

    fn find_by_kind(
        &self,
        kind: DeviceKind,
    ) -> impl Future<Output = Result<Vec<Device>, SmartHomeError>> + Send {
        self.with_devices(move |devices| {
            let matching = devices
                .iter()
                .filter(|d| d.kind() == kind)
                .cloned()
                .collect();
            Ok((matching, false))
        })
    }

    fn update(&self, device: Device) -> impl Future<Output = Result<Device, SmartHomeError>> + Send {
        self.with_devices(move |devices| {
            let slot = devices
                .iter_mut()
                .find(|d| d.id == device.id)
                .ok_or_else(|| not_found(device.id))?;
            *slot = device.clone();
            Ok((device, true))
        })
    }

    fn delete(&self, id: DeviceId) -> impl Future<Output = Result<(), SmartHomeError>> + Send {
        self.with_devices(move |devices| {
            let before = devices.len();
            devices.retain(|d| d.id != id);
            if devices.len() == before {
                return Err(not_found(id));
            }
            Ok(((), true))
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::record::legacy_uuid;
    use smartcode_domain::device::Power;

    fn lamp() -> Device {
        Device::builder()
            .name("Lamp")
            .location("Office")
            .kind(DeviceKind::Bulb)
            .build()
            .unwrap()
    }

    #[tokio::test]
    async fn should_create_and_retrieve_device() {
        let dir = tempfile::tempdir().unwrap();
        let repo = JsonDeviceRepository::new(dir.path().join("devices.json"));
        let device = repo.create(lamp()).await.unwrap();

        let fetched = repo.get_by_id(device.id).await.unwrap().unwrap();
        assert_eq!(fetched.name, "Lamp");
        assert_eq!(fetched.kind(), DeviceKind::Bulb);
    }

    #[tokio::test]
    async fn should_persist_across_repository_instances() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("devices.json");
        let device = JsonDeviceRepository::new(&path)
            .create(lamp())
            .await
            .unwrap();

        let reopened = JsonDeviceRepository::new(&path);
        let all = reopened.get_all().await.unwrap();
        assert_eq!(all.len(), 1);
        assert_eq!(all[0].id, device.id);
    }

    #[tokio::test]
    async fn should_normalise_legacy_file_on_first_read() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("devices.json");
        std::fs::write(
            &path,
            r#"{"devices": [
                {"device_id": "plug-7", "type": "plug", "name": "Kettle", "location": "Kitchen",
                 "status": {"power": "on"}, "last_updated": "2024-05-01 10:00:00"},
                {"name": "Socket", "status": {}}
            ]}"#,
        )
        .unwrap();
        let repo = JsonDeviceRepository::new(&path);

        let first = repo.get_all().await.unwrap();
        assert_eq!(first.len(), 2);
        assert_eq!(first[0].id.as_uuid(), legacy_uuid("plug-7"));
        assert_eq!(first[0].power, Power::On);
        assert_eq!(first[1].kind(), DeviceKind::Plug);

        let second = repo.get_all().await.unwrap();
        assert_eq!(second[1].id, first[1].id);

        let text = std::fs::read_to_string(&path).unwrap();
        assert!(text.contains("\"energy_consumption\""));
        assert!(text.contains(&first[1].id.to_string()));
    }

    #[tokio::test]
    async fn should_report_invalid_legacy_record() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("devices.json");
        std::fs::write(&path, r#"{"devices": [{"name": "", "type": "bulb"}]}"#).unwrap();
        let repo = JsonDeviceRepository::new(&path);

        assert!(matches!(
            repo.get_all().await,
            Err(SmartHomeError::Storage(_))
        ));
    }

    #[tokio::test]
    async fn should_report_unknown_power_as_invalid_record() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("devices.json");
        std::fs::write(
            &path,
            r#"{"devices": [{"name": "Lamp", "type": "bulb", "status": {"power": "standby"}}]}"#,
        )
        .unwrap();
        let repo = JsonDeviceRepository::new(&path);

        assert!(matches!(
            repo.get_all().await,
            Err(SmartHomeError::Storage(_))
        ));
    }

    #[tokio::test]
    async fn should_update_and_delete_device() {
        let dir = tempfile::tempdir().unwrap();
        let repo = JsonDeviceRepository::new(dir.path().join("devices.json"));
        let mut device = repo.create(lamp()).await.unwrap();

        device.power = Power::On;
        repo.update(device.clone()).await.unwrap();
        assert_eq!(
            repo.get_by_id(device.id).await.unwrap().unwrap().power,
            Power::On
        );

        repo.delete(device.id).await.unwrap();
        assert!(repo.get_by_id(device.id).await.unwrap().is_none());
        assert!(matches!(
            repo.delete(device.id).await,
            Err(SmartHomeError::NotFound(_))
        ));
        assert!(matches!(
            repo.update(device).await,
            Err(SmartHomeError::NotFound(_))
        ));
    }

    #[tokio::test]
    async fn should_filter_by_owner_and_kind() {
        let dir = tempfile::tempdir().unwrap();
        let repo = JsonDeviceRepository::new(dir.path().join("devices.json"));
        let owner = UserId::new();
        let mut owned = lamp();
        owned.owner_id = Some(owner);
        repo.create(owned).await.unwrap();
        repo.create(
            Device::builder()
                .name("Blind")
                .kind(DeviceKind::Curtain)
                .build()
                .unwrap(),
        )
        .await
        .unwrap();

        assert_eq!(repo.find_by_owner(owner).await.unwrap().len(), 1);
        assert_eq!(
            repo.find_by_kind(DeviceKind::Curtain).await.unwrap()[0].name,
            "Blind"
        );
    }
}
