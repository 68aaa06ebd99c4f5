//! On-disk record shapes compatible with the legacy household files.
//!
//! Legacy devices look like
//!
//! ```json
//! {
//!     "device_id": "bulb-01",
//!     "type": "bulb",
//!     "name": "Hall light",
//!     "location": "Hall",
//!     "status": {"power": "on", "brightness": 80, "color_temp": 2700},
//!     "last_updated": "2024-11-02 18:30:05"
//! }
//! ```
//!
//! and are normalised on load: ids become UUIDs, missing status keys take the
//! defaults of the kind, and the record is rewritten in full.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use smartcode_domain::device::{
    BulbStatus, CurtainStatus, CuttingMode, Device, DeviceKind, DeviceStatus, LawnMowerStatus,
    PlugStatus, Power, Rgb, ThermostatStatus, WeatherStationStatus,
};
use smartcode_domain::error::{SmartHomeError, ValidationError};
use smartcode_domain::id::{DeviceId, UserId};
use smartcode_domain::time::{self, Timestamp};
use smartcode_domain::user::User;

/// Map a legacy identifier to a UUID. Real UUIDs are kept; anything else is
/// hashed into a stable v5 UUID so references stay consistent across loads.
pub(crate) fn legacy_uuid(value: &str) -> uuid::Uuid {
    let value = value.trim();
    uuid::Uuid::parse_str(value)
        .unwrap_or_else(|_| uuid::Uuid::new_v5(&uuid::Uuid::NAMESPACE_OID, value.as_bytes()))
}

/// A legacy id may be a string or a bare number.
fn id_text(value: &Value) -> Option<String> {
    match value {
        Value::String(text) if !text.trim().is_empty() => Some(text.trim().to_string()),
        Value::Number(number) => Some(number.to_string()),
        _ => None,
    }
}

/// Decoded record plus whether it differed from its canonical form.
pub(crate) struct Decoded<T> {
    pub(crate) value: T,
    pub(crate) normalized: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
enum RgbRecord {
    Channels { red: u8, green: u8, blue: u8 },
    Triple([u8; 3]),
    Hex(String),
}

impl RgbRecord {
    fn to_rgb(&self) -> Result<Rgb, ValidationError> {
        match self {
            Self::Channels { red, green, blue } => Ok(Rgb::new(*red, *green, *blue)),
            Self::Triple([red, green, blue]) => Ok(Rgb::new(*red, *green, *blue)),
            Self::Hex(hex) => Rgb::from_hex(hex),
        }
    }
}

impl From<Rgb> for RgbRecord {
    fn from(rgb: Rgb) -> Self {
        Self::Channels {
            red: rgb.red,
            green: rgb.green,
            blue: rgb.blue,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
struct EnergyRecord {
    #[serde(default)]
    current_power_w: f64,
    #[serde(default)]
    total_energy_kwh: f64,
}

/// Flat legacy status block. Only the keys of the device's kind are written.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub(crate) struct StatusRecord {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    power: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    brightness: Option<u8>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    color_temp: Option<u16>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    rgb: Option<RgbRecord>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    energy_consumption: Option<EnergyRecord>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    current_temperature_c: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    target_temperature_c: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    humidity: Option<f64>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    position: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    open_percent: Option<u8>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    temperature_c: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    humidity_percent: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pressure_hpa: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    wind_speed_kmh: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    rainfall_mm: Option<f64>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    battery_percent: Option<u8>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    cutting_mode: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    cutting_height_mm: Option<u16>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    current_area_m2: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    total_cutting_time_minutes: Option<u32>,
}

impl StatusRecord {
    /// Missing power reads as off; anything but `on`/`off` is rejected.
    fn power(&self) -> Result<Power, ValidationError> {
        self.power
            .as_deref()
            .map_or(Ok(Power::default()), str::parse)
    }

    fn to_status(&self, kind: DeviceKind) -> Result<DeviceStatus, ValidationError> {
        let status = match DeviceStatus::default_for(kind) {
            DeviceStatus::Bulb(default) => DeviceStatus::Bulb(BulbStatus {
                brightness: self.brightness.unwrap_or(default.brightness),
                color_temp: self.color_temp.unwrap_or(default.color_temp),
                rgb: self
                    .rgb
                    .as_ref()
                    .map(RgbRecord::to_rgb)
                    .transpose()?
                    .unwrap_or(default.rgb),
            }),
            DeviceStatus::Plug(default) => {
                DeviceStatus::Plug(self.energy_consumption.as_ref().map_or(default, |energy| {
                    PlugStatus {
                        current_power_w: energy.current_power_w,
                        total_energy_kwh: energy.total_energy_kwh,
                    }
                }))
            }
            DeviceStatus::Thermostat(default) => DeviceStatus::Thermostat(ThermostatStatus {
                target_temperature_c: self
                    .target_temperature_c
                    .unwrap_or(default.target_temperature_c),
                current_temperature_c: self
                    .current_temperature_c
                    .unwrap_or(default.current_temperature_c),
                humidity: self.humidity.unwrap_or(default.humidity),
            }),
            DeviceStatus::Curtain(default) => DeviceStatus::Curtain(CurtainStatus {
                position: self.position.unwrap_or(default.position),
                open_percent: self.open_percent.unwrap_or(default.open_percent),
            }),
            DeviceStatus::WeatherStation(default) => {
                DeviceStatus::WeatherStation(WeatherStationStatus {
                    temperature_c: self.temperature_c.unwrap_or(default.temperature_c),
                    humidity_percent: self.humidity_percent.unwrap_or(default.humidity_percent),
                    pressure_hpa: self.pressure_hpa.unwrap_or(default.pressure_hpa),
                    wind_speed_kmh: self.wind_speed_kmh.unwrap_or(default.wind_speed_kmh),
                    rainfall_mm: self.rainfall_mm.unwrap_or(default.rainfall_mm),
                })
            }
            DeviceStatus::LawnMower(default) => DeviceStatus::LawnMower(LawnMowerStatus {
                battery_percent: self.battery_percent.unwrap_or(default.battery_percent),
                cutting_mode: self
                    .cutting_mode
                    .as_deref()
                    .map(str::parse::<CuttingMode>)
                    .transpose()?
                    .unwrap_or(default.cutting_mode),
                cutting_height_mm: self.cutting_height_mm.unwrap_or(default.cutting_height_mm),
                current_area_m2: self.current_area_m2.unwrap_or(default.current_area_m2),
                total_cutting_time_minutes: self
                    .total_cutting_time_minutes
                    .unwrap_or(default.total_cutting_time_minutes),
            }),
        };
        status.validate()?;
        Ok(status)
    }

    fn from_status(power: Power, status: &DeviceStatus) -> Self {
        let mut record = Self {
            power: Some(power.as_str().to_string()),
            ..Self::default()
        };
        match status {
            DeviceStatus::Bulb(bulb) => {
                record.brightness = Some(bulb.brightness);
                record.color_temp = Some(bulb.color_temp);
                record.rgb = Some(bulb.rgb.into());
            }
            DeviceStatus::Plug(plug) => {
                record.energy_consumption = Some(EnergyRecord {
                    current_power_w: plug.current_power_w,
                    total_energy_kwh: plug.total_energy_kwh,
                });
            }
            DeviceStatus::Thermostat(thermostat) => {
                record.current_temperature_c = Some(thermostat.current_temperature_c);
                record.target_temperature_c = Some(thermostat.target_temperature_c);
                record.humidity = Some(thermostat.humidity);
            }
            DeviceStatus::Curtain(curtain) => {
                record.position = Some(curtain.position);
                record.open_percent = Some(curtain.open_percent);
            }
            DeviceStatus::WeatherStation(station) => {
                record.temperature_c = Some(station.temperature_c);
                record.humidity_percent = Some(station.humidity_percent);
                record.pressure_hpa = Some(station.pressure_hpa);
                record.wind_speed_kmh = Some(station.wind_speed_kmh);
                record.rainfall_mm = Some(station.rainfall_mm);
            }
            DeviceStatus::LawnMower(mower) => {
                record.battery_percent = Some(mower.battery_percent);
                record.cutting_mode = Some(mower.cutting_mode.as_str().to_string());
                record.cutting_height_mm = Some(mower.cutting_height_mm);
                record.current_area_m2 = Some(mower.current_area_m2);
                record.total_cutting_time_minutes = Some(mower.total_cutting_time_minutes);
            }
        }
        record
    }
}

/// One entry of `devices.json`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub(crate) struct DeviceRecord {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    device_id: Option<Value>,
    #[serde(default, rename = "type", skip_serializing_if = "Option::is_none")]
    kind: Option<String>,
    #[serde(default)]
    name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    brand: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    model: Option<String>,
    #[serde(default)]
    location: String,
    #[serde(default)]
    connected: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    owner_id: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    secret_key: Option<String>,
    #[serde(default)]
    status: StatusRecord,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    last_updated: Option<String>,
}

impl DeviceRecord {
    /// Convert into a domain device, filling in what legacy files omit.
    pub(crate) fn decode(&self, loaded_at: Timestamp) -> Result<Decoded<Device>, SmartHomeError> {
        let id = self
            .device_id
            .as_ref()
            .and_then(id_text)
            .map_or_else(DeviceId::new, |text| DeviceId::from_uuid(legacy_uuid(&text)));
        let kind = match self.kind.as_deref() {
            Some(kind) => kind.parse()?,
            None => DeviceKind::Plug,
        };
        let owner_id = self
            .owner_id
            .as_ref()
            .and_then(id_text)
            .map(|text| UserId::from_uuid(legacy_uuid(&text)));
        let last_updated = self
            .last_updated
            .as_deref()
            .and_then(time::parse_flexible)
            .unwrap_or(loaded_at);

        let device = Device {
            id,
            name: self.name.clone(),
            brand: self.brand.clone(),
            model: self.model.clone(),
            location: self.location.clone(),
            secret_key: self.secret_key.clone(),
            power: self.status.power()?,
            connected: self.connected,
            owner_id,
            status: self.status.to_status(kind)?,
            last_updated,
        };
        device.validate()?;
        let normalized = *self != Self::encode(&device);
        Ok(Decoded {
            value: device,
            normalized,
        })
    }

    /// Canonical on-disk form of a device.
    pub(crate) fn encode(device: &Device) -> Self {
        Self {
            device_id: Some(Value::String(device.id.to_string())),
            kind: Some(device.kind().as_str().to_string()),
            name: device.name.clone(),
            brand: device.brand.clone(),
            model: device.model.clone(),
            location: device.location.clone(),
            connected: device.connected,
            owner_id: device.owner_id.map(|id| Value::String(id.to_string())),
            secret_key: device.secret_key.clone(),
            status: StatusRecord::from_status(device.power, &device.status),
            last_updated: Some(time::to_legacy(device.last_updated)),
        }
    }
}

/// One entry of `users.json`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub(crate) struct UserRecord {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    user_id: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    username: Option<String>,
    #[serde(default)]
    name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    email: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    is_active: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    date_joined: Option<String>,
}

impl UserRecord {
    /// Convert into a domain user. Legacy records only carry `user_id` and
    /// `name`; the name doubles as the username.
    pub(crate) fn decode(&self, loaded_at: Timestamp) -> Result<Decoded<User>, SmartHomeError> {
        let id = self
            .user_id
            .as_ref()
            .and_then(id_text)
            .map_or_else(UserId::new, |text| UserId::from_uuid(legacy_uuid(&text)));
        let username = self
            .username
            .clone()
            .filter(|username| !username.trim().is_empty())
            .unwrap_or_else(|| self.name.clone());
        let user = User {
            id,
            username,
            name: self.name.clone(),
            email: self
                .email
                .clone()
                .filter(|email| !email.trim().is_empty()),
            is_active: self.is_active.unwrap_or(true),
            date_joined: self
                .date_joined
                .as_deref()
                .and_then(time::parse_flexible)
                .unwrap_or(loaded_at),
        };
        user.validate()?;
        let normalized = *self != Self::encode(&user);
        Ok(Decoded {
            value: user,
            normalized,
        })
    }

    pub(crate) fn encode(user: &User) -> Self {
        Self {
            user_id: Some(Value::String(user.id.to_string())),
            username: Some(user.username.clone()),
            name: user.name.clone(),
            email: user.email.clone(),
            is_active: Some(user.is_active),
            date_joined: Some(time::to_legacy(user.date_joined)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};

    fn loaded_at() -> Timestamp {
        Utc.with_ymd_and_hms(2025, 1, 1, 0, 0, 0).unwrap()
    }

    fn record(json: serde_json::Value) -> DeviceRecord {
        serde_json::from_value(json).unwrap()
    }

    #[test]
    fn should_map_legacy_id_to_stable_uuid() {
        let a = legacy_uuid("bulb-01");
        let b = legacy_uuid("bulb-01");
        assert_eq!(a, b);
        assert_eq!(a.get_version_num(), 5);

        let real = uuid::Uuid::new_v4();
        assert_eq!(legacy_uuid(&real.to_string()), real);
    }

    #[test]
    fn should_decode_legacy_bulb_with_partial_status() {
        let decoded = record(serde_json::json!({
            "device_id": "bulb-01",
            "type": "bulb",
            "name": "Hall light",
            "location": "Hall",
            "status": {"power": "ON", "brightness": 80},
            "last_updated": "2024-11-02 18:30:05"
        }))
        .decode(loaded_at())
        .unwrap();

        let device = decoded.value;
        assert!(decoded.normalized);
        assert_eq!(device.id.as_uuid(), legacy_uuid("bulb-01"));
        assert_eq!(device.power, Power::On);
        let bulb = device.status.as_bulb().unwrap();
        assert_eq!(bulb.brightness, 80);
        assert_eq!(bulb.color_temp, 2700);
        assert_eq!(
            device.last_updated,
            Utc.with_ymd_and_hms(2024, 11, 2, 18, 30, 5).unwrap()
        );
    }

    #[test]
    fn should_default_missing_type_to_plug_and_read_energy_block() {
        let decoded = record(serde_json::json!({
            "device_id": 4,
            "name": "Kettle",
            "status": {
                "power": "off",
                "energy_consumption": {"current_power_w": 0.0, "total_energy_kwh": 12.5}
            }
        }))
        .decode(loaded_at())
        .unwrap();

        let device = decoded.value;
        assert_eq!(device.kind(), DeviceKind::Plug);
        assert_eq!(device.status.as_plug().unwrap().total_energy_kwh, 12.5);
        assert_eq!(device.last_updated, loaded_at());
    }

    #[test]
    fn should_accept_legacy_type_spellings() {
        for (spelling, kind) in [
            ("light", DeviceKind::Bulb),
            ("weatherstation", DeviceKind::WeatherStation),
            ("LawnMower", DeviceKind::LawnMower),
        ] {
            let device = record(serde_json::json!({"name": "x", "type": spelling}))
                .decode(loaded_at())
                .unwrap()
                .value;
            assert_eq!(device.kind(), kind);
        }
    }

    #[test]
    fn should_accept_rgb_in_several_shapes() {
        for rgb in [
            serde_json::json!({"red": 1, "green": 2, "blue": 3}),
            serde_json::json!([1, 2, 3]),
            serde_json::json!("#010203"),
        ] {
            let device = record(serde_json::json!({
                "name": "Lamp",
                "type": "bulb",
                "status": {"rgb": rgb}
            }))
            .decode(loaded_at())
            .unwrap()
            .value;
            assert_eq!(device.status.as_bulb().unwrap().rgb, Rgb::new(1, 2, 3));
        }
    }

    #[test]
    fn should_reject_out_of_range_readings() {
        let result = record(serde_json::json!({
            "name": "Thermostat",
            "type": "thermostat",
            "status": {"target_temperature_c": 45.0}
        }))
        .decode(loaded_at());
        assert!(matches!(result, Err(SmartHomeError::Validation(_))));
    }

    #[test]
    fn should_reject_unknown_power_value() {
        let result = record(serde_json::json!({
            "name": "Lamp",
            "type": "bulb",
            "status": {"power": "standby"}
        }))
        .decode(loaded_at());
        assert!(matches!(
            result,
            Err(SmartHomeError::Validation(ValidationError::InvalidPower))
        ));

        let device = record(serde_json::json!({"name": "Lamp", "type": "bulb", "status": {}}))
            .decode(loaded_at())
            .unwrap()
            .value;
        assert_eq!(device.power, Power::Off);
    }

    #[test]
    fn should_report_canonical_record_as_not_normalized() {
        let device = Device::builder()
            .name("Mower")
            .kind(DeviceKind::LawnMower)
            .last_updated(Utc.with_ymd_and_hms(2025, 5, 5, 5, 5, 5).unwrap())
            .build()
            .unwrap();
        let encoded = DeviceRecord::encode(&device);

        let decoded = encoded.decode(loaded_at()).unwrap();
        assert!(!decoded.normalized);
        assert_eq!(decoded.value, device);

        let json = serde_json::to_value(&encoded).unwrap();
        assert_eq!(json["type"], "lawn_mower");
        assert_eq!(json["status"]["cutting_mode"], "auto");
        assert!(json["status"].get("brightness").is_none());
    }

    #[test]
    fn should_decode_legacy_user() {
        let record: UserRecord =
            serde_json::from_value(serde_json::json!({"user_id": 1, "name": "Marta"})).unwrap();

        let decoded = record.decode(loaded_at()).unwrap();
        assert!(decoded.normalized);
        assert_eq!(decoded.value.username, "Marta");
        assert_eq!(decoded.value.id.as_uuid(), legacy_uuid("1"));
        assert!(decoded.value.is_active);
    }
}
