//! JSON API handler modules.
//!
//! Every route except `POST /users` requires an identified, active caller.

#[allow(clippy::missing_errors_doc)]
pub mod devices;
#[allow(clippy::missing_errors_doc)]
pub mod schedules;
#[allow(clippy::missing_errors_doc)]
pub mod shares;
#[allow(clippy::missing_errors_doc)]
pub mod users;

use axum::Router;
use axum::routing::{delete, get, post, put};

use smartcode_app::ports::{DeviceRepository, ScheduleRepository, ShareRepository, UserRepository};

use crate::state::AppState;

/// Build the `/api` sub-router.
pub fn routes<D, U, S, C>() -> Router<AppState<D, U, S, C>>
where
    D: DeviceRepository + Send + Sync + 'static,
    U: UserRepository + Send + Sync + 'static,
    S: ShareRepository + Send + Sync + 'static,
    C: ScheduleRepository + Send + Sync + 'static,
{
    Router::new()
        // Users
        .route(
            "/users",
            get(users::list::<D, U, S, C>).post(users::register::<D, U, S, C>),
        )
        .route(
            "/users/me",
            get(users::me::<D, U, S, C>)
                .put(users::update_me::<D, U, S, C>)
                .delete(users::delete_me::<D, U, S, C>),
        )
        // Devices
        .route("/device-types", get(devices::types))
        .route(
            "/devices",
            get(devices::list::<D, U, S, C>).post(devices::create::<D, U, S, C>),
        )
        .route("/devices/power", post(devices::power_group::<D, U, S, C>))
        .route(
            "/devices/{id}",
            get(devices::get::<D, U, S, C>)
                .put(devices::update::<D, U, S, C>)
                .delete(devices::delete::<D, U, S, C>),
        )
        .route("/devices/{id}/name", put(devices::rename::<D, U, S, C>))
        .route("/devices/{id}/power", post(devices::power::<D, U, S, C>))
        .route("/devices/{id}/toggle", post(devices::toggle::<D, U, S, C>))
        .route("/devices/{id}/connect", post(devices::connect::<D, U, S, C>))
        .route(
            "/devices/{id}/disconnect",
            post(devices::disconnect::<D, U, S, C>),
        )
        .route("/devices/{id}/reboot", post(devices::reboot::<D, U, S, C>))
        .route("/devices/{id}/status", get(devices::status::<D, U, S, C>))
        // Shares
        .route(
            "/devices/{id}/shares",
            get(shares::list::<D, U, S, C>).post(shares::create::<D, U, S, C>),
        )
        .route(
            "/devices/{id}/shares/{user_id}",
            delete(shares::delete::<D, U, S, C>),
        )
        // Schedules
        .route(
            "/devices/{id}/schedules",
            get(schedules::list_for_device::<D, U, S, C>).post(schedules::create::<D, U, S, C>),
        )
        .route("/schedules", get(schedules::list::<D, U, S, C>))
        .route("/schedules/check", post(schedules::check::<D, U, S, C>))
        .route("/schedules/cleanup", post(schedules::cleanup::<D, U, S, C>))
        .route("/schedules/{id}", delete(schedules::delete::<D, U, S, C>))
}
