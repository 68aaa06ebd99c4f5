//! One-shot maintenance commands.
//!
//! Each command runs against the same services as the server and writes a
//! plain-text report to the given writer.

use std::io::Write;

use clap::Subcommand;

use smartcode_adapter_http_axum::AppState;
use smartcode_app::ports::{DeviceRepository, ScheduleRepository, ShareRepository, UserRepository};
use smartcode_domain::device::{Device, DeviceKind, Power};
use smartcode_domain::id::DeviceId;
use smartcode_domain::time::{now, to_legacy};
use smartcode_domain::user::User;

#[derive(Debug, Subcommand)]
pub enum UsersCommand {
    /// List every account.
    List,
    /// Register a new account.
    Add {
        username: String,
        #[arg(long)]
        name: Option<String>,
        #[arg(long)]
        email: Option<String>,
    },
    /// Delete an account together with its devices and shares.
    Delete { username: String },
    /// Change the display name of an account.
    Rename { username: String, name: String },
}

#[derive(Debug, Subcommand)]
pub enum DevicesCommand {
    /// List devices, optionally of one kind.
    List {
        #[arg(long)]
        kind: Option<DeviceKind>,
    },
    /// Print one device with its status block.
    Show { id: DeviceId },
    /// Switch a device, or every device of a kind, on or off.
    Power {
        /// Device id or device kind, e.g. `bulb`.
        target: String,
        power: Power,
    },
}

/// Apply due schedules once.
///
/// # Errors
///
/// Returns an error on a storage failure or when `out` cannot be written.
pub async fn check_schedules<D, U, S, C>(
    state: &AppState<D, U, S, C>,
    out: &mut impl Write,
) -> anyhow::Result<()>
where
    D: DeviceRepository + Send + Sync + 'static,
    U: UserRepository + Send + Sync + 'static,
    S: ShareRepository + Send + Sync + 'static,
    C: ScheduleRepository + Send + Sync + 'static,
{
    let report = state.schedule_service.check_schedules(now()).await?;
    for device in &report.turned_on {
        writeln!(out, "turned on  {} ({})", device.name, device.id)?;
    }
    for device in &report.turned_off {
        writeln!(out, "turned off {} ({})", device.name, device.id)?;
    }
    writeln!(
        out,
        "{} turned on, {} turned off, {} unchanged",
        report.turned_on.len(),
        report.turned_off.len(),
        report.unchanged
    )?;
    Ok(())
}

/// Delete expired schedules, switching their devices off.
///
/// # Errors
///
/// Returns an error on a storage failure or when `out` cannot be written.
pub async fn cleanup_schedules<D, U, S, C>(
    state: &AppState<D, U, S, C>,
    out: &mut impl Write,
) -> anyhow::Result<()>
where
    D: DeviceRepository + Send + Sync + 'static,
    U: UserRepository + Send + Sync + 'static,
    S: ShareRepository + Send + Sync + 'static,
    C: ScheduleRepository + Send + Sync + 'static,
{
    let report = state.schedule_service.cleanup_expired(now()).await?;
    for device in &report.devices_turned_off {
        writeln!(out, "turned off {} ({})", device.name, device.id)?;
    }
    writeln!(
        out,
        "{} expired schedules removed, {} devices turned off",
        report.removed,
        report.devices_turned_off.len()
    )?;
    Ok(())
}

/// Run a `users` subcommand.
///
/// # Errors
///
/// Returns an error on a validation or storage failure, or when `out`
/// cannot be written.
pub async fn users<D, U, S, C>(
    state: &AppState<D, U, S, C>,
    command: UsersCommand,
    out: &mut impl Write,
) -> anyhow::Result<()>
where
    D: DeviceRepository + Send + Sync + 'static,
    U: UserRepository + Send + Sync + 'static,
    S: ShareRepository + Send + Sync + 'static,
    C: ScheduleRepository + Send + Sync + 'static,
{
    match command {
        UsersCommand::List => {
            for user in state.user_service.list().await? {
                write_user(out, &user)?;
            }
        }
        UsersCommand::Add {
            username,
            name,
            email,
        } => {
            let mut builder = User::builder().username(username);
            if let Some(name) = name {
                builder = builder.name(name);
            }
            if let Some(email) = email {
                builder = builder.email(email);
            }
            let user = state.user_service.register(builder.build()?).await?;
            writeln!(out, "registered {} ({})", user.username, user.id)?;
        }
        UsersCommand::Delete { username } => {
            let user = state.user_service.find_by_username(&username).await?;
            state.remove_user(user.id).await?;
            writeln!(out, "deleted {}", user.username)?;
        }
        UsersCommand::Rename { username, name } => {
            let user = state.user_service.find_by_username(&username).await?;
            let user = state.user_service.rename(user.id, name).await?;
            writeln!(out, "renamed {} to {}", user.username, user.display_name())?;
        }
    }
    Ok(())
}

/// Run a `devices` subcommand.
///
/// # Errors
///
/// Returns an error for an unknown device or kind, on a storage failure,
/// or when `out` cannot be written.
pub async fn devices<D, U, S, C>(
    state: &AppState<D, U, S, C>,
    command: DevicesCommand,
    out: &mut impl Write,
) -> anyhow::Result<()>
where
    D: DeviceRepository + Send + Sync + 'static,
    U: UserRepository + Send + Sync + 'static,
    S: ShareRepository + Send + Sync + 'static,
    C: ScheduleRepository + Send + Sync + 'static,
{
    match command {
        DevicesCommand::List { kind } => {
            let devices = match kind {
                Some(kind) => state.device_service.list_by_kind(kind).await?,
                None => state.device_service.list().await?,
            };
            for device in &devices {
                write_device(out, device)?;
            }
        }
        DevicesCommand::Show { id } => {
            let device = state.device_service.get(id).await?;
            write_device(out, &device)?;
            writeln!(out, "location:     {}", device.location)?;
            writeln!(out, "connected:    {}", device.connected)?;
            writeln!(out, "last updated: {}", to_legacy(device.last_updated))?;
            writeln!(out, "{}", serde_json::to_string_pretty(&device.status)?)?;
        }
        DevicesCommand::Power { target, power } => {
            let changed = match target.parse::<DeviceId>() {
                Ok(id) => state.device_service.set_power_all(&[id], power).await?,
                Err(_) => {
                    let kind: DeviceKind = target.parse()?;
                    state.device_service.set_power_for_kind(kind, power).await?
                }
            };
            for device in &changed {
                write_device(out, device)?;
            }
            writeln!(out, "{} devices switched {power}", changed.len())?;
        }
    }
    Ok(())
}

fn write_user(out: &mut impl Write, user: &User) -> std::io::Result<()> {
    writeln!(
        out,
        "{}  {:<20} {:<20} {}{}",
        user.id,
        user.username,
        user.display_name(),
        user.email.as_deref().unwrap_or("-"),
        if user.is_active { "" } else { "  (inactive)" }
    )
}

fn write_device(out: &mut impl Write, device: &Device) -> std::io::Result<()> {
    writeln!(
        out,
        "{}  {:<16} {:<20} {}",
        device.id,
        device.kind().display_name(),
        device.name,
        device.power
    )
}
