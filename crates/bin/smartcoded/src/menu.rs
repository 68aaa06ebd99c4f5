//! Interactive terminal menu.
//!
//! Devices are numbered from 1 in storage order. Schedules are evaluated at
//! the top of every iteration, so a duration started from the menu switches
//! the device on before the next prompt. End of input leaves the menu.

use std::io::{BufRead, Write};

use chrono::NaiveDateTime;

use smartcode_adapter_http_axum::AppState;
use smartcode_app::ports::{DeviceRepository, ScheduleRepository, ShareRepository, UserRepository};
use smartcode_domain::device::{Device, DeviceKind};
use smartcode_domain::error::{SmartHomeError, ValidationError};
use smartcode_domain::schedule::Schedule;
use smartcode_domain::time::{Timestamp, now, parse_flexible, to_legacy};

/// Minute-precision format accepted for schedule times, e.g. `2024-05-01-18-30`.
const MENU_TIME_FORMAT: &str = "%Y-%m-%d-%H-%M";

const MAIN_MENU: &str = "\nChoose an option:
1. Show devices
2. Toggle device
3. Add device
4. Remove device
5. Set working schedule
6. Save and exit
";

/// Run the menu until the user picks "Save and exit" or input ends.
///
/// # Errors
///
/// Returns an error when reading or writing the terminal fails, or on a
/// storage failure. Invalid user input is reported on `output` instead.
pub async fn run<D, U, S, C, R, W>(
    state: &AppState<D, U, S, C>,
    input: R,
    output: W,
) -> anyhow::Result<()>
where
    D: DeviceRepository + Send + Sync + 'static,
    U: UserRepository + Send + Sync + 'static,
    S: ShareRepository + Send + Sync + 'static,
    C: ScheduleRepository + Send + Sync + 'static,
    R: BufRead,
    W: Write,
{
    Menu {
        state,
        input,
        output,
    }
    .run()
    .await
}

struct Menu<'a, D, U, S, C, R, W> {
    state: &'a AppState<D, U, S, C>,
    input: R,
    output: W,
}

/// A device number typed by the user.
enum Choice {
    Device(Device),
    Invalid,
    NotANumber,
    EndOfInput,
}

impl<D, U, S, C, R, W> Menu<'_, D, U, S, C, R, W>
where
    D: DeviceRepository + Send + Sync + 'static,
    U: UserRepository + Send + Sync + 'static,
    S: ShareRepository + Send + Sync + 'static,
    C: ScheduleRepository + Send + Sync + 'static,
    R: BufRead,
    W: Write,
{
    async fn run(mut self) -> anyhow::Result<()> {
        loop {
            self.apply_schedules().await?;
            write!(self.output, "{MAIN_MENU}")?;
            let Some(option) = self.prompt("Choose an option number: ")? else {
                return Ok(());
            };
            match option.as_str() {
                "1" => {
                    self.show_devices().await?;
                }
                "2" => self.toggle_device().await?,
                "3" => self.add_device().await?,
                "4" => self.remove_device().await?,
                "5" => self.set_schedule().await?,
                "6" => {
                    writeln!(self.output, "Data has been saved.")?;
                    return Ok(());
                }
                _ => writeln!(self.output, "Invalid option, please try again.")?,
            }
        }
    }

    /// Print `text`, then read one trimmed line. `None` at end of input.
    fn prompt(&mut self, text: &str) -> std::io::Result<Option<String>> {
        write!(self.output, "{text}")?;
        self.output.flush()?;
        let mut line = String::new();
        if self.input.read_line(&mut line)? == 0 {
            return Ok(None);
        }
        Ok(Some(line.trim().to_string()))
    }

    async fn apply_schedules(&mut self) -> anyhow::Result<()> {
        let report = self.state.schedule_service.check_schedules(now()).await?;
        for device in &report.turned_on {
            writeln!(self.output, "Schedule turned on '{}'.", device.name)?;
        }
        for device in &report.turned_off {
            writeln!(self.output, "Schedule turned off '{}'.", device.name)?;
        }
        Ok(())
    }

    async fn show_devices(&mut self) -> anyhow::Result<Vec<Device>> {
        let devices = self.state.device_service.list().await?;
        if devices.is_empty() {
            writeln!(self.output, "No devices in the system.")?;
        }
        for (index, device) in devices.iter().enumerate() {
            writeln!(
                self.output,
                "{}. {} ({}) - Power: {}",
                index + 1,
                device.name,
                device.location,
                device.power
            )?;
        }
        Ok(devices)
    }

    async fn choose_device(&mut self, text: &str) -> anyhow::Result<Choice> {
        let mut devices = self.show_devices().await?;
        let Some(answer) = self.prompt(text)? else {
            return Ok(Choice::EndOfInput);
        };
        let choice = match answer.parse::<usize>() {
            Ok(number) if (1..=devices.len()).contains(&number) => {
                Choice::Device(devices.swap_remove(number - 1))
            }
            Ok(_) => Choice::Invalid,
            Err(_) => Choice::NotANumber,
        };
        match choice {
            Choice::Invalid => writeln!(self.output, "Invalid device number.")?,
            Choice::NotANumber => writeln!(self.output, "Enter a valid number.")?,
            Choice::Device(_) | Choice::EndOfInput => {}
        }
        Ok(choice)
    }

    async fn toggle_device(&mut self) -> anyhow::Result<()> {
        if let Choice::Device(device) = self
            .choose_device("Enter the device number to toggle: ")
            .await?
        {
            self.state.device_service.toggle(device.id).await?;
            writeln!(self.output, "Device state has been changed.")?;
        }
        Ok(())
    }

    async fn add_device(&mut self) -> anyhow::Result<()> {
        let Some(name) = self.prompt("Enter device name: ")? else {
            return Ok(());
        };
        let Some(location) = self.prompt("Enter device location: ")? else {
            return Ok(());
        };
        let Some(kind) = self.prompt("Enter device type [plug]: ")? else {
            return Ok(());
        };

        let kind = if kind.is_empty() {
            Ok(DeviceKind::Plug)
        } else {
            kind.parse::<DeviceKind>()
        };
        let created = match kind {
            Ok(kind) => {
                let device = Device::builder()
                    .name(name.as_str())
                    .location(location)
                    .kind(kind)
                    .build();
                match device {
                    Ok(device) => self.state.device_service.create(device).await,
                    Err(err) => Err(err),
                }
            }
            Err(err) => Err(err.into()),
        };
        match created {
            Ok(_) => writeln!(self.output, "Device '{name}' added successfully.")?,
            Err(err @ SmartHomeError::Storage(_)) => return Err(err.into()),
            Err(err) => writeln!(self.output, "{err}")?,
        }
        Ok(())
    }

    async fn remove_device(&mut self) -> anyhow::Result<()> {
        if let Choice::Device(device) = self
            .choose_device("Enter the device number to remove: ")
            .await?
        {
            self.state.remove_device(device.id).await?;
            writeln!(self.output, "Device '{}' removed successfully.", device.name)?;
        }
        Ok(())
    }

    async fn set_schedule(&mut self) -> anyhow::Result<()> {
        let Choice::Device(device) = self
            .choose_device("Enter the device number to set working time schedule: ")
            .await?
        else {
            return Ok(());
        };
        writeln!(self.output, "a. Turn-on and turn-off time")?;
        writeln!(self.output, "b. Working duration")?;
        let Some(mode) = self.prompt("Choose a or b: ")? else {
            return Ok(());
        };
        match mode.to_ascii_lowercase().as_str() {
            "a" => self.set_on_off_times(&device).await,
            "b" => self.set_working_duration(&device).await,
            _ => {
                writeln!(self.output, "Invalid option, please try again.")?;
                Ok(())
            }
        }
    }

    async fn set_on_off_times(&mut self, device: &Device) -> anyhow::Result<()> {
        let Some(on) = self.prompt("Enter time for turning on the device: ")? else {
            return Ok(());
        };
        let Some(start) = parse_menu_time(&on) else {
            writeln!(self.output, "Incorrect device turn-on time entered.")?;
            return Ok(());
        };
        let Some(off) = self.prompt("Enter time for turning off the device: ")? else {
            return Ok(());
        };
        let Some(end) = parse_menu_time(&off) else {
            writeln!(self.output, "Incorrect device turn-off time entered.")?;
            return Ok(());
        };

        match Schedule::window(device.id, start, end, now()) {
            Ok(schedule) => {
                self.state.schedule_service.add(schedule).await?;
                writeln!(
                    self.output,
                    "Device's working schedule time has been set: {} - {}.",
                    to_legacy(start),
                    to_legacy(end)
                )?;
            }
            Err(_) => writeln!(self.output, "Incorrect device turn-off time entered.")?,
        }
        Ok(())
    }

    async fn set_working_duration(&mut self, device: &Device) -> anyhow::Result<()> {
        let Some(answer) =
            self.prompt("Enter for how long the device is to be turned on in minutes: ")?
        else {
            return Ok(());
        };
        let Ok(minutes) = answer.parse::<u32>() else {
            writeln!(self.output, "Enter a valid number.")?;
            return Ok(());
        };
        match Schedule::for_duration(device.id, now(), minutes) {
            Ok(schedule) => {
                self.state.schedule_service.add(schedule).await?;
                writeln!(
                    self.output,
                    "Device '{}' will work for {minutes} minutes.",
                    device.name
                )?;
            }
            Err(SmartHomeError::Validation(ValidationError::InvalidDuration { .. })) => {
                writeln!(self.output, "Wrong operating time for the device.")?;
            }
            Err(err) => return Err(err.into()),
        }
        Ok(())
    }
}

fn parse_menu_time(value: &str) -> Option<Timestamp> {
    NaiveDateTime::parse_from_str(value, MENU_TIME_FORMAT)
        .map(|naive| naive.and_utc())
        .ok()
        .or_else(|| parse_flexible(value))
}
