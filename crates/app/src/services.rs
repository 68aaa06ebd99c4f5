//! Application services — use-case implementations.
//!
//! Each service struct accepts port trait implementations via generic parameters
//! (constructor injection), keeping this layer decoupled from concrete adapters.

pub mod access_service;
pub mod device_service;
pub mod schedule_service;
pub mod user_service;

pub use access_service::AccessService;
pub use device_service::DeviceService;
pub use schedule_service::{CleanupReport, ScheduleReport, ScheduleService};
pub use user_service::UserService;
