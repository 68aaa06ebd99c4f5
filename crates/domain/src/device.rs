//! Device — a physical appliance registered in the hub.
//!
//! A device carries a kind-specific [`DeviceStatus`] block next to the
//! shared fields (name, location, power, connection state). The kind is
//! always derived from the status block.

mod color;
mod kind;
mod power;
mod status;

pub use color::Rgb;
pub use kind::DeviceKind;
pub use power::Power;
pub use status::{
    BulbStatus, CuttingMode, CurtainStatus, DeviceStatus, LawnMowerStatus, PlugStatus,
    ThermostatStatus, WeatherStationStatus,
};

use serde::{Deserialize, Serialize};

use crate::error::{DeviceError, SmartHomeError, ValidationError};
use crate::id::{DeviceId, UserId};
use crate::time::{Timestamp, now};

/// A registered appliance.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Device {
    pub id: DeviceId,
    pub name: String,
    pub brand: Option<String>,
    pub model: Option<String>,
    pub location: String,
    /// Pairing secret. Never serialized to API clients.
    #[serde(skip_serializing, default)]
    pub secret_key: Option<String>,
    pub power: Power,
    pub connected: bool,
    pub owner_id: Option<UserId>,
    pub status: DeviceStatus,
    pub last_updated: Timestamp,
}

impl Device {
    /// Create a builder for constructing a [`Device`].
    #[must_use]
    pub fn builder() -> DeviceBuilder {
        DeviceBuilder::default()
    }

    #[must_use]
    pub fn kind(&self) -> DeviceKind {
        self.status.kind()
    }

    #[must_use]
    pub fn is_owned_by(&self, user_id: UserId) -> bool {
        self.owner_id == Some(user_id)
    }

    /// Check domain invariants.
    ///
    /// # Errors
    ///
    /// Returns [`SmartHomeError::Validation`] when the name is blank or a
    /// status reading is out of range.
    pub fn validate(&self) -> Result<(), SmartHomeError> {
        if self.name.trim().is_empty() {
            return Err(ValidationError::EmptyName.into());
        }
        self.status.validate()?;
        Ok(())
    }

    /// Switch the device on or off.
    pub fn set_power(&mut self, power: Power, at: Timestamp) {
        self.power = power;
        self.last_updated = at;
    }

    /// Flip the power state and return the new one.
    pub fn toggle(&mut self, at: Timestamp) -> Power {
        let next = self.power.toggled();
        self.set_power(next, at);
        next
    }

    /// Pair the device, checking it is of the `expected` kind.
    ///
    /// # Errors
    ///
    /// Returns [`DeviceError::NotCompatible`] when the kinds differ.
    pub fn connect(&mut self, expected: DeviceKind) -> Result<(), DeviceError> {
        let actual = self.kind();
        if actual != expected {
            return Err(DeviceError::NotCompatible {
                device_id: self.id.to_string(),
                expected,
                actual,
            });
        }
        self.connected = true;
        Ok(())
    }

    /// Unpair the device. Returns whether it was connected.
    pub fn disconnect(&mut self) -> bool {
        std::mem::replace(&mut self.connected, false)
    }

    /// # Errors
    ///
    /// Returns [`DeviceError::NotConnected`] when the device is not paired.
    pub fn ensure_connected(&self) -> Result<(), DeviceError> {
        if self.connected {
            Ok(())
        } else {
            Err(DeviceError::NotConnected {
                device_id: self.id.to_string(),
            })
        }
    }

    /// Power-cycle the device. It ends switched on.
    ///
    /// # Errors
    ///
    /// Returns [`DeviceError::NotConnected`] when the device is not paired.
    pub fn reboot(&mut self, at: Timestamp) -> Result<(), DeviceError> {
        self.ensure_connected()?;
        self.set_power(Power::Off, at);
        self.set_power(Power::On, at);
        Ok(())
    }

    /// Rename a paired device.
    ///
    /// # Errors
    ///
    /// Returns [`DeviceError::NotConnected`] when the device is not paired,
    /// or [`ValidationError::EmptyName`] for a blank name.
    pub fn rename(&mut self, name: impl Into<String>, at: Timestamp) -> Result<(), SmartHomeError> {
        self.ensure_connected()?;
        let name = name.into();
        if name.trim().is_empty() {
            return Err(ValidationError::EmptyName.into());
        }
        self.name = name;
        self.last_updated = at;
        Ok(())
    }

    /// Read the status block of a paired device.
    ///
    /// # Errors
    ///
    /// Returns [`DeviceError::NotConnected`] when the device is not paired.
    pub fn status_checked(&self) -> Result<&DeviceStatus, DeviceError> {
        self.ensure_connected()?;
        Ok(&self.status)
    }
}

/// Step-by-step builder for [`Device`].
#[derive(Debug, Default)]
pub struct DeviceBuilder {
    id: Option<DeviceId>,
    name: Option<String>,
    brand: Option<String>,
    model: Option<String>,
    location: Option<String>,
    secret_key: Option<String>,
    power: Power,
    connected: bool,
    owner_id: Option<UserId>,
    kind: Option<DeviceKind>,
    status: Option<DeviceStatus>,
    last_updated: Option<Timestamp>,
}

impl DeviceBuilder {
    #[must_use]
    pub fn id(mut self, id: DeviceId) -> Self {
        self.id = Some(id);
        self
    }

    #[must_use]
    pub fn name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    #[must_use]
    pub fn brand(mut self, brand: impl Into<String>) -> Self {
        self.brand = Some(brand.into());
        self
    }

    #[must_use]
    pub fn model(mut self, model: impl Into<String>) -> Self {
        self.model = Some(model.into());
        self
    }

    #[must_use]
    pub fn location(mut self, location: impl Into<String>) -> Self {
        self.location = Some(location.into());
        self
    }

    #[must_use]
    pub fn secret_key(mut self, secret_key: impl Into<String>) -> Self {
        self.secret_key = Some(secret_key.into());
        self
    }

    #[must_use]
    pub fn power(mut self, power: Power) -> Self {
        self.power = power;
        self
    }

    #[must_use]
    pub fn connected(mut self, connected: bool) -> Self {
        self.connected = connected;
        self
    }

    #[must_use]
    pub fn owner_id(mut self, owner_id: UserId) -> Self {
        self.owner_id = Some(owner_id);
        self
    }

    /// Use the default status block of `kind`, unless an explicit
    /// [`status`](Self::status) is given.
    #[must_use]
    pub fn kind(mut self, kind: DeviceKind) -> Self {
        self.kind = Some(kind);
        self
    }

    #[must_use]
    pub fn status(mut self, status: DeviceStatus) -> Self {
        self.status = Some(status);
        self
    }

    #[must_use]
    pub fn last_updated(mut self, last_updated: Timestamp) -> Self {
        self.last_updated = Some(last_updated);
        self
    }

    /// Consume the builder, validate, and return a [`Device`].
    ///
    /// Without a kind or status the device is a plug.
    ///
    /// # Errors
    ///
    /// Returns [`SmartHomeError::Validation`] if the name is missing, a
    /// reading is out of range, or the explicit status disagrees with the
    /// requested kind.
    pub fn build(self) -> Result<Device, SmartHomeError> {
        let status = match (self.kind, self.status) {
            (Some(expected), Some(status)) if status.kind() != expected => {
                return Err(ValidationError::StatusKindMismatch {
                    expected,
                    actual: status.kind(),
                }
                .into());
            }
            (_, Some(status)) => status,
            (Some(kind), None) => DeviceStatus::default_for(kind),
            (None, None) => DeviceStatus::default_for(DeviceKind::Plug),
        };
        let device = Device {
            id: self.id.unwrap_or_default(),
            name: self.name.unwrap_or_default(),
            brand: self.brand,
            model: self.model,
            location: self.location.unwrap_or_default(),
            secret_key: self.secret_key,
            power: self.power,
            connected: self.connected,
            owner_id: self.owner_id,
            status,
            last_updated: self.last_updated.unwrap_or_else(now),
        };
        device.validate()?;
        Ok(device)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};

    fn at(hour: u32) -> Timestamp {
        Utc.with_ymd_and_hms(2025, 3, 1, hour, 0, 0).unwrap()
    }

    fn bulb() -> Device {
        Device::builder()
            .name("Desk lamp")
            .location("Office")
            .kind(DeviceKind::Bulb)
            .last_updated(at(8))
            .build()
            .unwrap()
    }

    #[test]
    fn should_build_device_with_default_status_for_kind() {
        let device = bulb();
        assert_eq!(device.kind(), DeviceKind::Bulb);
        assert_eq!(device.status.as_bulb().unwrap().brightness, 100);
        assert_eq!(device.power, Power::Off);
        assert!(!device.connected);
    }

    #[test]
    fn should_default_to_plug_without_kind() {
        let device = Device::builder().name("Socket").build().unwrap();
        assert_eq!(device.kind(), DeviceKind::Plug);
    }

    #[test]
    fn should_reject_blank_name() {
        let result = Device::builder().name("   ").kind(DeviceKind::Curtain).build();
        assert!(matches!(
            result,
            Err(SmartHomeError::Validation(ValidationError::EmptyName))
        ));
    }

    #[test]
    fn should_reject_status_for_another_kind() {
        let result = Device::builder()
            .name("Fan")
            .kind(DeviceKind::Thermostat)
            .status(DeviceStatus::default_for(DeviceKind::Plug))
            .build();
        assert!(matches!(
            result,
            Err(SmartHomeError::Validation(
                ValidationError::StatusKindMismatch {
                    expected: DeviceKind::Thermostat,
                    actual: DeviceKind::Plug,
                }
            ))
        ));
    }

    #[test]
    fn should_stamp_last_updated_on_power_change() {
        let mut device = bulb();
        device.set_power(Power::On, at(9));
        assert_eq!(device.power, Power::On);
        assert_eq!(device.last_updated, at(9));
    }

    #[test]
    fn should_toggle_power() {
        let mut device = bulb();
        assert_eq!(device.toggle(at(9)), Power::On);
        assert_eq!(device.toggle(at(10)), Power::Off);
        assert_eq!(device.last_updated, at(10));
    }

    #[test]
    fn should_refuse_to_connect_incompatible_kind() {
        let mut device = bulb();
        let err = device.connect(DeviceKind::Plug).unwrap_err();
        assert!(matches!(err, DeviceError::NotCompatible { .. }));
        assert!(!device.connected);
    }

    #[test]
    fn should_report_previous_state_on_disconnect() {
        let mut device = bulb();
        device.connect(DeviceKind::Bulb).unwrap();
        assert!(device.disconnect());
        assert!(!device.disconnect());
    }

    #[test]
    fn should_require_connection_to_reboot() {
        let mut device = bulb();
        assert!(matches!(
            device.reboot(at(9)),
            Err(DeviceError::NotConnected { .. })
        ));

        device.connect(DeviceKind::Bulb).unwrap();
        device.reboot(at(9)).unwrap();
        assert_eq!(device.power, Power::On);
    }

    #[test]
    fn should_rename_only_when_connected() {
        let mut device = bulb();
        assert!(matches!(
            device.rename("Reading lamp", at(9)),
            Err(SmartHomeError::Device(DeviceError::NotConnected { .. }))
        ));

        device.connect(DeviceKind::Bulb).unwrap();
        device.rename("Reading lamp", at(9)).unwrap();
        assert_eq!(device.name, "Reading lamp");

        assert!(matches!(
            device.rename("", at(10)),
            Err(SmartHomeError::Validation(ValidationError::EmptyName))
        ));
    }

    #[test]
    fn should_expose_status_only_when_connected() {
        let mut device = bulb();
        assert!(device.status_checked().is_err());
        device.connect(DeviceKind::Bulb).unwrap();
        assert_eq!(device.status_checked().unwrap().kind(), DeviceKind::Bulb);
    }

    #[test]
    fn should_not_serialize_secret_key() {
        let device = Device::builder()
            .name("Lock")
            .secret_key("hunter2")
            .build()
            .unwrap();
        let json = serde_json::to_value(&device).unwrap();
        assert!(json.get("secret_key").is_none());
        assert_eq!(json["status"]["kind"], "plug");
    }
}
