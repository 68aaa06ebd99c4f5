//! Per-kind device form fields and their parsing.
//!
//! Each device kind edits a different status block, so the dashboard
//! renders a list of [`FormField`]s generated from the status and reads the
//! submitted form back as a plain string map.

use std::collections::HashMap;

use smartcode_domain::device::{CuttingMode, DeviceStatus, Rgb};
use smartcode_domain::error::ValidationError;

/// One `<select>` choice.
pub struct SelectOption {
    pub value: &'static str,
    pub label: &'static str,
    pub selected: bool,
}

/// One input of a device form.
pub struct FormField {
    pub name: &'static str,
    pub label: &'static str,
    /// HTML input type: `number`, `color` or `select`.
    pub input_type: &'static str,
    pub value: String,
    pub min: String,
    pub max: String,
    pub step: String,
    pub options: Vec<SelectOption>,
}

impl FormField {
    fn number(name: &'static str, label: &'static str, value: impl ToString) -> Self {
        Self {
            name,
            label,
            input_type: "number",
            value: value.to_string(),
            min: String::new(),
            max: String::new(),
            step: "1".to_string(),
            options: Vec::new(),
        }
    }

    fn decimal(name: &'static str, label: &'static str, value: f64) -> Self {
        Self {
            step: "any".to_string(),
            ..Self::number(name, label, value)
        }
    }

    fn range(mut self, min: impl ToString, max: impl ToString) -> Self {
        self.min = min.to_string();
        self.max = max.to_string();
        self
    }

    fn color(name: &'static str, label: &'static str, value: Rgb) -> Self {
        Self {
            input_type: "color",
            step: String::new(),
            ..Self::number(name, label, value.to_hex())
        }
    }

    pub fn is_select(&self) -> bool {
        self.input_type == "select"
    }
}

fn cutting_mode_field(current: CuttingMode) -> FormField {
    let options = [CuttingMode::Auto, CuttingMode::Manual]
        .into_iter()
        .map(|mode| SelectOption {
            value: mode.as_str(),
            label: match mode {
                CuttingMode::Auto => "Automatic",
                CuttingMode::Manual => "Manual",
            },
            selected: mode == current,
        })
        .collect();
    FormField {
        input_type: "select",
        step: String::new(),
        options,
        ..FormField::number("cutting_mode", "Cutting mode", current)
    }
}

/// Inputs for the kind-specific part of the device form, pre-filled from
/// `status`.
#[must_use]
pub fn status_fields(status: &DeviceStatus) -> Vec<FormField> {
    match status {
        DeviceStatus::Bulb(bulb) => vec![
            FormField::number("brightness", "Brightness (%)", bulb.brightness).range(0, 100),
            FormField::number("color_temp", "Colour temperature (K)", bulb.color_temp)
                .range(2000, 6500),
            FormField::color("rgb", "Colour", bulb.rgb),
        ],
        DeviceStatus::Plug(plug) => vec![
            FormField::decimal("current_power_w", "Current power (W)", plug.current_power_w)
                .range(0, ""),
            FormField::decimal(
                "total_energy_kwh",
                "Total energy (kWh)",
                plug.total_energy_kwh,
            )
            .range(0, ""),
        ],
        DeviceStatus::Thermostat(thermostat) => vec![
            FormField::decimal(
                "target_temperature_c",
                "Target temperature (°C)",
                thermostat.target_temperature_c,
            )
            .range(10, 30),
            FormField::decimal(
                "current_temperature_c",
                "Current temperature (°C)",
                thermostat.current_temperature_c,
            )
            .range(-50, 50),
            FormField::decimal("humidity", "Humidity (%)", thermostat.humidity).range(0, 100),
        ],
        DeviceStatus::Curtain(curtain) => vec![
            FormField::number("position", "Position", curtain.position).range(0, ""),
            FormField::number("open_percent", "Open (%)", curtain.open_percent).range(0, 100),
        ],
        DeviceStatus::WeatherStation(station) => vec![
            FormField::decimal("temperature_c", "Temperature (°C)", station.temperature_c)
                .range(-50, 50),
            FormField::decimal("humidity_percent", "Humidity (%)", station.humidity_percent)
                .range(0, 100),
            FormField::decimal("pressure_hpa", "Pressure (hPa)", station.pressure_hpa)
                .range(900, 1100),
            FormField::decimal("wind_speed_kmh", "Wind speed (km/h)", station.wind_speed_kmh)
                .range(0, 200),
            FormField::decimal("rainfall_mm", "Rainfall (mm)", station.rainfall_mm).range(0, ""),
        ],
        DeviceStatus::LawnMower(mower) => vec![
            FormField::number("battery_percent", "Battery (%)", mower.battery_percent)
                .range(0, 100),
            cutting_mode_field(mower.cutting_mode),
            FormField::number(
                "cutting_height_mm",
                "Cutting height (mm)",
                mower.cutting_height_mm,
            )
            .range(10, 100),
            FormField::number("current_area_m2", "Current area (m²)", mower.current_area_m2)
                .range(0, ""),
            FormField::number(
                "total_cutting_time_minutes",
                "Total cutting time (min)",
                mower.total_cutting_time_minutes,
            )
            .range(0, ""),
        ],
    }
}

/// Put the values of a rejected submission back into `fields`.
#[must_use]
pub fn refill(mut fields: Vec<FormField>, form: &HashMap<String, String>) -> Vec<FormField> {
    for field in &mut fields {
        let Some(submitted) = form.get(field.name) else {
            continue;
        };
        for option in &mut field.options {
            option.selected = option.value == submitted.as_str();
        }
        field.value.clone_from(submitted);
    }
    fields
}

/// Non-blank, trimmed form value.
pub fn text<'a>(form: &'a HashMap<String, String>, name: &str) -> Option<&'a str> {
    form.get(name)
        .map(|value| value.trim())
        .filter(|value| !value.is_empty())
}

fn decimal(
    form: &HashMap<String, String>,
    field: &'static str,
) -> Result<Option<f64>, ValidationError> {
    text(form, field)
        .map(|raw| {
            raw.parse::<f64>()
                .ok()
                .filter(|value| value.is_finite())
                .ok_or(ValidationError::InvalidNumber { field })
        })
        .transpose()
}

fn integer<T: TryFrom<i64>>(
    form: &HashMap<String, String>,
    field: &'static str,
    min: f64,
    max: f64,
) -> Result<Option<T>, ValidationError> {
    text(form, field)
        .map(|raw| {
            let value: i64 = raw
                .parse()
                .map_err(|_| ValidationError::InvalidNumber { field })?;
            T::try_from(value).map_err(|_| ValidationError::OutOfRange { field, min, max })
        })
        .transpose()
}

fn set<T>(target: &mut T, value: Option<T>) {
    if let Some(value) = value {
        *target = value;
    }
}

/// Apply the submitted kind-specific fields over `status`. Missing or blank
/// fields keep their current value; ranges are checked by the domain when
/// the device is validated.
///
/// # Errors
///
/// Returns [`ValidationError::InvalidNumber`],
/// [`ValidationError::OutOfRange`], [`ValidationError::InvalidColor`] or
/// [`ValidationError::UnknownCuttingMode`] for unparsable input.
pub fn apply_status_form(
    status: &DeviceStatus,
    form: &HashMap<String, String>,
) -> Result<DeviceStatus, ValidationError> {
    let mut status = status.clone();
    match &mut status {
        DeviceStatus::Bulb(bulb) => {
            set(
                &mut bulb.brightness,
                integer(form, "brightness", 0.0, 100.0)?,
            );
            set(
                &mut bulb.color_temp,
                integer(form, "color_temp", 2000.0, 6500.0)?,
            );
            set(
                &mut bulb.rgb,
                text(form, "rgb").map(Rgb::from_hex).transpose()?,
            );
        }
        DeviceStatus::Plug(plug) => {
            set(&mut plug.current_power_w, decimal(form, "current_power_w")?);
            set(&mut plug.total_energy_kwh, decimal(form, "total_energy_kwh")?);
        }
        DeviceStatus::Thermostat(thermostat) => {
            set(
                &mut thermostat.target_temperature_c,
                decimal(form, "target_temperature_c")?,
            );
            set(
                &mut thermostat.current_temperature_c,
                decimal(form, "current_temperature_c")?,
            );
            set(&mut thermostat.humidity, decimal(form, "humidity")?);
        }
        DeviceStatus::Curtain(curtain) => {
            set(
                &mut curtain.position,
                integer(form, "position", 0.0, f64::from(u32::MAX))?,
            );
            set(
                &mut curtain.open_percent,
                integer(form, "open_percent", 0.0, 100.0)?,
            );
        }
        DeviceStatus::WeatherStation(station) => {
            set(&mut station.temperature_c, decimal(form, "temperature_c")?);
            set(
                &mut station.humidity_percent,
                decimal(form, "humidity_percent")?,
            );
            set(&mut station.pressure_hpa, decimal(form, "pressure_hpa")?);
            set(&mut station.wind_speed_kmh, decimal(form, "wind_speed_kmh")?);
            set(&mut station.rainfall_mm, decimal(form, "rainfall_mm")?);
        }
        DeviceStatus::LawnMower(mower) => {
            set(
                &mut mower.battery_percent,
                integer(form, "battery_percent", 0.0, 100.0)?,
            );
            set(
                &mut mower.cutting_mode,
                text(form, "cutting_mode")
                    .map(str::parse::<CuttingMode>)
                    .transpose()?,
            );
            set(
                &mut mower.cutting_height_mm,
                integer(form, "cutting_height_mm", 10.0, 100.0)?,
            );
            set(
                &mut mower.current_area_m2,
                integer(form, "current_area_m2", 0.0, f64::from(u32::MAX))?,
            );
            set(
                &mut mower.total_cutting_time_minutes,
                integer(form, "total_cutting_time_minutes", 0.0, f64::from(u32::MAX))?,
            );
        }
    }
    Ok(status)
}
