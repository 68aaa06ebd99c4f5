//! Status blocks — the kind-specific readings and settings of a device.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use super::color::Rgb;
use super::kind::DeviceKind;
use crate::error::ValidationError;

fn check_range(field: &'static str, value: f64, min: f64, max: f64) -> Result<(), ValidationError> {
    if value.is_finite() && (min..=max).contains(&value) {
        Ok(())
    } else {
        Err(ValidationError::OutOfRange { field, min, max })
    }
}

fn check_non_negative(field: &'static str, value: f64) -> Result<(), ValidationError> {
    if value.is_finite() && value >= 0.0 {
        Ok(())
    } else {
        Err(ValidationError::Negative { field })
    }
}

/// Light bulb settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BulbStatus {
    /// Brightness in percent.
    pub brightness: u8,
    /// Colour temperature in Kelvin.
    pub color_temp: u16,
    pub rgb: Rgb,
}

impl Default for BulbStatus {
    fn default() -> Self {
        Self {
            brightness: 100,
            color_temp: 2700,
            rgb: Rgb::WHITE,
        }
    }
}

impl BulbStatus {
    pub const BRIGHTNESS_MAX: u8 = 100;
    pub const COLOR_TEMP_MIN: u16 = 2000;
    pub const COLOR_TEMP_MAX: u16 = 6500;

    fn validate(&self) -> Result<(), ValidationError> {
        check_range(
            "brightness",
            f64::from(self.brightness),
            0.0,
            f64::from(Self::BRIGHTNESS_MAX),
        )?;
        check_range(
            "color_temp",
            f64::from(self.color_temp),
            f64::from(Self::COLOR_TEMP_MIN),
            f64::from(Self::COLOR_TEMP_MAX),
        )
    }
}

/// Smart plug energy readings.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PlugStatus {
    pub current_power_w: f64,
    pub total_energy_kwh: f64,
}

impl PlugStatus {
    fn validate(&self) -> Result<(), ValidationError> {
        check_non_negative("current_power_w", self.current_power_w)?;
        check_non_negative("total_energy_kwh", self.total_energy_kwh)
    }
}

/// Thermostat readings and setpoint, in Celsius / percent.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ThermostatStatus {
    pub target_temperature_c: f64,
    pub current_temperature_c: f64,
    pub humidity: f64,
}

impl Default for ThermostatStatus {
    fn default() -> Self {
        Self {
            target_temperature_c: 21.0,
            current_temperature_c: 20.0,
            humidity: 45.0,
        }
    }
}

impl ThermostatStatus {
    fn validate(&self) -> Result<(), ValidationError> {
        check_range("target_temperature_c", self.target_temperature_c, 10.0, 30.0)?;
        check_range(
            "current_temperature_c",
            self.current_temperature_c,
            -50.0,
            50.0,
        )?;
        check_range("humidity", self.humidity, 0.0, 100.0)
    }
}

/// Curtain motor position.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CurtainStatus {
    /// Motor position in steps.
    pub position: u32,
    pub open_percent: u8,
}

impl CurtainStatus {
    fn validate(&self) -> Result<(), ValidationError> {
        check_range("open_percent", f64::from(self.open_percent), 0.0, 100.0)
    }
}

/// Weather station readings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WeatherStationStatus {
    pub temperature_c: f64,
    pub humidity_percent: f64,
    pub pressure_hpa: f64,
    pub wind_speed_kmh: f64,
    pub rainfall_mm: f64,
}

impl Default for WeatherStationStatus {
    fn default() -> Self {
        Self {
            temperature_c: 15.0,
            humidity_percent: 50.0,
            pressure_hpa: 1013.25,
            wind_speed_kmh: 0.0,
            rainfall_mm: 0.0,
        }
    }
}

impl WeatherStationStatus {
    fn validate(&self) -> Result<(), ValidationError> {
        check_range("temperature_c", self.temperature_c, -50.0, 50.0)?;
        check_range("humidity_percent", self.humidity_percent, 0.0, 100.0)?;
        check_range("pressure_hpa", self.pressure_hpa, 900.0, 1100.0)?;
        check_range("wind_speed_kmh", self.wind_speed_kmh, 0.0, 200.0)?;
        check_non_negative("rainfall_mm", self.rainfall_mm)
    }
}

/// Lawn mower cutting mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CuttingMode {
    #[default]
    Auto,
    Manual,
}

impl CuttingMode {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Auto => "auto",
            Self::Manual => "manual",
        }
    }
}

impl fmt::Display for CuttingMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for CuttingMode {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "auto" => Ok(Self::Auto),
            "manual" => Ok(Self::Manual),
            _ => Err(ValidationError::UnknownCuttingMode),
        }
    }
}

/// Robotic lawn mower state.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LawnMowerStatus {
    pub battery_percent: u8,
    pub cutting_mode: CuttingMode,
    pub cutting_height_mm: u16,
    pub current_area_m2: u32,
    pub total_cutting_time_minutes: u32,
}

impl Default for LawnMowerStatus {
    fn default() -> Self {
        Self {
            battery_percent: 100,
            cutting_mode: CuttingMode::Auto,
            cutting_height_mm: 40,
            current_area_m2: 0,
            total_cutting_time_minutes: 0,
        }
    }
}

impl LawnMowerStatus {
    fn validate(&self) -> Result<(), ValidationError> {
        check_range(
            "battery_percent",
            f64::from(self.battery_percent),
            0.0,
            100.0,
        )?;
        check_range(
            "cutting_height_mm",
            f64::from(self.cutting_height_mm),
            10.0,
            100.0,
        )
    }
}

/// Kind-specific status block. The variant determines the device kind.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum DeviceStatus {
    Bulb(BulbStatus),
    Plug(PlugStatus),
    Thermostat(ThermostatStatus),
    Curtain(CurtainStatus),
    WeatherStation(WeatherStationStatus),
    LawnMower(LawnMowerStatus),
}

impl DeviceStatus {
    /// Factory defaults for a freshly added device of `kind`.
    #[must_use]
    pub fn default_for(kind: DeviceKind) -> Self {
        match kind {
            DeviceKind::Bulb => Self::Bulb(BulbStatus::default()),
            DeviceKind::Plug => Self::Plug(PlugStatus::default()),
            DeviceKind::Thermostat => Self::Thermostat(ThermostatStatus::default()),
            DeviceKind::Curtain => Self::Curtain(CurtainStatus::default()),
            DeviceKind::WeatherStation => Self::WeatherStation(WeatherStationStatus::default()),
            DeviceKind::LawnMower => Self::LawnMower(LawnMowerStatus::default()),
        }
    }

    #[must_use]
    pub fn kind(&self) -> DeviceKind {
        match self {
            Self::Bulb(_) => DeviceKind::Bulb,
            Self::Plug(_) => DeviceKind::Plug,
            Self::Thermostat(_) => DeviceKind::Thermostat,
            Self::Curtain(_) => DeviceKind::Curtain,
            Self::WeatherStation(_) => DeviceKind::WeatherStation,
            Self::LawnMower(_) => DeviceKind::LawnMower,
        }
    }

    /// Check every reading against its allowed range.
    ///
    /// # Errors
    ///
    /// Returns the first [`ValidationError`] found.
    pub fn validate(&self) -> Result<(), ValidationError> {
        match self {
            Self::Bulb(status) => status.validate(),
            Self::Plug(status) => status.validate(),
            Self::Thermostat(status) => status.validate(),
            Self::Curtain(status) => status.validate(),
            Self::WeatherStation(status) => status.validate(),
            Self::LawnMower(status) => status.validate(),
        }
    }

    #[must_use]
    pub fn as_bulb(&self) -> Option<&BulbStatus> {
        match self {
            Self::Bulb(status) => Some(status),
            _ => None,
        }
    }

    #[must_use]
    pub fn as_plug(&self) -> Option<&PlugStatus> {
        match self {
            Self::Plug(status) => Some(status),
            _ => None,
        }
    }

    #[must_use]
    pub fn as_thermostat(&self) -> Option<&ThermostatStatus> {
        match self {
            Self::Thermostat(status) => Some(status),
            _ => None,
        }
    }

    #[must_use]
    pub fn as_curtain(&self) -> Option<&CurtainStatus> {
        match self {
            Self::Curtain(status) => Some(status),
            _ => None,
        }
    }

    #[must_use]
    pub fn as_weather_station(&self) -> Option<&WeatherStationStatus> {
        match self {
            Self::WeatherStation(status) => Some(status),
            _ => None,
        }
    }

    #[must_use]
    pub fn as_lawn_mower(&self) -> Option<&LawnMowerStatus> {
        match self {
            Self::LawnMower(status) => Some(status),
            _ => None,
        }
    }
}
