//! # smartcoded — smartcode home daemon
//!
//! Composition root that wires all adapters together.
//!
//! ## Responsibilities
//! - Parse the command line and load configuration (file, then env vars)
//! - Install the tracing subscriber
//! - Open the configured storage backend (`SQLite` or JSON files)
//! - Build the application state, injecting repositories via port traits
//! - Run the selected command: the HTTP server (default), the terminal
//!   menu, or one of the maintenance commands
//! - Handle graceful shutdown (SIGINT) of the server and schedule runner
//!
//! ## Dependency rule
//! This is the **only** crate that depends on all other crates.
//! It is the wiring layer — no domain logic belongs here.

mod commands;
mod config;
mod logging;
mod menu;

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use clap::{Parser, Subcommand};
use tokio::sync::watch;

use smartcode_adapter_http_axum::AppState;
use smartcode_adapter_storage_json::JsonStore;
use smartcode_adapter_storage_sqlite_sqlx::{
    SqliteDeviceRepository, SqliteScheduleRepository, SqliteShareRepository,
    SqliteUserRepository,
};
use smartcode_app::ports::{DeviceRepository, ScheduleRepository, ShareRepository, UserRepository};
use smartcode_app::scheduler::ScheduleRunner;

use crate::commands::{DevicesCommand, UsersCommand};
use crate::config::{Backend, Config};

#[derive(Debug, Parser)]
#[command(name = "smartcoded", version, about = "Smart home device manager")]
struct Cli {
    /// Configuration file. Defaults to `smartcode.toml` when present.
    #[arg(short, long, env = "SMARTCODE_CONFIG")]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Serve the JSON API and the dashboard (default).
    Serve,
    /// Interactive terminal menu.
    Menu,
    /// Apply due schedules once and exit.
    CheckSchedules,
    /// Delete expired schedules and exit.
    CleanupSchedules,
    /// Manage accounts.
    #[command(subcommand)]
    Users(UsersCommand),
    /// Inspect and switch devices.
    #[command(subcommand)]
    Devices(DevicesCommand),
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let config = Config::load(cli.config.as_deref()).context("loading configuration")?;
    let _log_guard = logging::init(&config.logging).context("initialising logging")?;
    let command = cli.command.unwrap_or(Command::Serve);

    match config.storage.backend {
        Backend::Sqlite => {
            let db = smartcode_adapter_storage_sqlite_sqlx::Config {
                database_url: config.storage.database_url.clone(),
            }
            .build()
            .await
            .context("opening SQLite database")?;
            let pool = db.pool().clone();
            tracing::info!(url = %config.storage.database_url, "using SQLite storage");

            let state = AppState::new(
                Arc::new(SqliteDeviceRepository::new(pool.clone())),
                Arc::new(SqliteUserRepository::new(pool.clone())),
                SqliteShareRepository::new(pool.clone()),
                SqliteScheduleRepository::new(pool),
            );
            run(command, &config, state).await
        }
        Backend::Json => {
            let store = JsonStore::open(&config.storage.data_dir)
                .await
                .context("opening JSON data directory")?;
            tracing::info!(dir = %config.storage.data_dir.display(), "using JSON storage");

            let state = AppState::new(
                Arc::new(store.devices),
                Arc::new(store.users),
                store.shares,
                store.schedules,
            );
            run(command, &config, state).await
        }
    }
}

async fn run<D, U, S, C>(
    command: Command,
    config: &Config,
    state: AppState<D, U, S, C>,
) -> anyhow::Result<()>
where
    D: DeviceRepository + Send + Sync + 'static,
    U: UserRepository + Send + Sync + 'static,
    S: ShareRepository + Send + Sync + 'static,
    C: ScheduleRepository + Send + Sync + 'static,
{
    let mut stdout = std::io::stdout();
    match command {
        Command::Serve => serve(config, state).await,
        Command::Menu => menu::run(&state, std::io::stdin().lock(), stdout).await,
        Command::CheckSchedules => commands::check_schedules(&state, &mut stdout).await,
        Command::CleanupSchedules => commands::cleanup_schedules(&state, &mut stdout).await,
        Command::Users(command) => commands::users(&state, command, &mut stdout).await,
        Command::Devices(command) => commands::devices(&state, command, &mut stdout).await,
    }
}

async fn serve<D, U, S, C>(config: &Config, state: AppState<D, U, S, C>) -> anyhow::Result<()>
where
    D: DeviceRepository + Send + Sync + 'static,
    U: UserRepository + Send + Sync + 'static,
    S: ShareRepository + Send + Sync + 'static,
    C: ScheduleRepository + Send + Sync + 'static,
{
    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    let runner = config.scheduler.enabled.then(|| {
        let runner = ScheduleRunner::new(
            Arc::clone(&state.schedule_service),
            Duration::from_secs(config.scheduler.interval_secs),
            config.scheduler.cleanup_expired,
        );
        tokio::spawn(runner.run(shutdown_rx))
    });

    let app = smartcode_adapter_http_axum::build(state);
    let bind_addr = config.bind_addr();
    let listener = tokio::net::TcpListener::bind(&bind_addr)
        .await
        .with_context(|| format!("binding {bind_addr}"))?;
    tracing::info!(addr = %bind_addr, "smartcoded listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    // No receiver left when the runner is disabled.
    let _ = shutdown_tx.send(true);
    if let Some(runner) = runner {
        runner.await?;
    }
    tracing::info!("smartcoded stopped");
    Ok(())
}

async fn shutdown_signal() {
    match tokio::signal::ctrl_c().await {
        Ok(()) => tracing::info!("shutdown requested"),
        Err(err) => tracing::error!(error = %err, "failed to listen for shutdown signal"),
    }
}
