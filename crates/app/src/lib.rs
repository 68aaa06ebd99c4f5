//! # smartcode-app
//!
//! Application layer — use-cases and **port definitions** (traits).
//!
//! ## Responsibilities
//! - Define **port traits** that adapters must implement (driven/outbound ports):
//!   - `DeviceRepository` — CRUD for devices
//!   - `UserRepository` — CRUD for users
//!   - `ShareRepository` — the device/user share relation
//!   - `ScheduleRepository` — CRUD for power schedules
//! - Define **driving/inbound ports** as use-case structs:
//!   - `DeviceService` — register, control and query devices
//!   - `UserService` — account management
//!   - `AccessService` — ownership checks and sharing
//!   - `ScheduleService` — schedule CRUD and evaluation
//!   - `ScheduleRunner` — periodic schedule evaluation
//! - Orchestrate domain objects without knowing *how* persistence or IO works
//!
//! ## Dependency rule
//! Depends on `smartcode-domain` only (plus `tokio` for timers and channels).
//! Never imports adapter crates. Adapters depend on *this* crate, not the reverse.

#[cfg(any(test, feature = "memory"))]
pub mod memory;
pub mod ports;
pub mod scheduler;
pub mod services;
