//! Device kind — the closed set of appliance types the hub understands.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::ValidationError;

/// Kind of appliance. The numeric code is stable and used by the device-type
/// listing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DeviceKind {
    Bulb,
    Plug,
    Thermostat,
    Curtain,
    WeatherStation,
    LawnMower,
}

impl DeviceKind {
    /// All kinds in code order.
    pub const ALL: [Self; 6] = [
        Self::Bulb,
        Self::Plug,
        Self::Thermostat,
        Self::Curtain,
        Self::WeatherStation,
        Self::LawnMower,
    ];

    /// Stable numeric code (1-based).
    #[must_use]
    pub fn code(self) -> u8 {
        match self {
            Self::Bulb => 1,
            Self::Plug => 2,
            Self::Thermostat => 3,
            Self::Curtain => 4,
            Self::WeatherStation => 5,
            Self::LawnMower => 6,
        }
    }

    /// Inverse of [`code`](Self::code).
    #[must_use]
    pub fn from_code(code: u8) -> Option<Self> {
        Self::ALL.into_iter().find(|kind| kind.code() == code)
    }

    /// Wire name, e.g. `weather_station`.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Bulb => "bulb",
            Self::Plug => "plug",
            Self::Thermostat => "thermostat",
            Self::Curtain => "curtain",
            Self::WeatherStation => "weather_station",
            Self::LawnMower => "lawn_mower",
        }
    }

    /// Human-readable name, e.g. `Weather Station`.
    #[must_use]
    pub fn display_name(self) -> &'static str {
        match self {
            Self::Bulb => "Bulb",
            Self::Plug => "Plug",
            Self::Thermostat => "Thermostat",
            Self::Curtain => "Curtain",
            Self::WeatherStation => "Weather Station",
            Self::LawnMower => "Lawn Mower",
        }
    }
}

impl fmt::Display for DeviceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.display_name())
    }
}

impl FromStr for DeviceKind {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized: String = s
            .chars()
            .filter(|c| !matches!(c, '_' | '-' | ' '))
            .flat_map(char::to_lowercase)
            .collect();
        match normalized.as_str() {
            "bulb" | "light" => Ok(Self::Bulb),
            "plug" => Ok(Self::Plug),
            "thermostat" => Ok(Self::Thermostat),
            "curtain" => Ok(Self::Curtain),
            "weatherstation" => Ok(Self::WeatherStation),
            "lawnmower" => Ok(Self::LawnMower),
            _ => Err(ValidationError::UnknownDeviceKind),
        }
    }
}
