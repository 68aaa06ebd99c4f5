//! Dashboard home page: overview of the caller's devices.

use std::collections::HashSet;

use askama::Template;
use axum::extract::State;
use axum::http::HeaderMap;

use smartcode_app::ports::{DeviceRepository, ScheduleRepository, ShareRepository, UserRepository};
use smartcode_domain::id::DeviceId;
use smartcode_domain::schedule::SchedulePhase;
use smartcode_domain::time::now;

use super::{DashboardError, viewer};
use crate::state::AppState;

/// Home page template.
#[derive(Template)]
#[template(path = "home.html")]
pub struct HomeTemplate {
    nav_user: String,
    device_count: usize,
    on_count: usize,
    connected_count: usize,
    shared_with_me: usize,
    schedule_count: usize,
    active_schedules: usize,
}

html_page!(HomeTemplate);

/// `GET /`
pub async fn index<D, U, S, C>(
    State(state): State<AppState<D, U, S, C>>,
    headers: HeaderMap,
) -> Result<HomeTemplate, DashboardError>
where
    D: DeviceRepository + Send + Sync + 'static,
    U: UserRepository + Send + Sync + 'static,
    S: ShareRepository + Send + Sync + 'static,
    C: ScheduleRepository + Send + Sync + 'static,
{
    let user = viewer(&state, &headers).await?;
    let devices = state.access_service.accessible_devices(user.id).await?;
    let visible: HashSet<DeviceId> = devices.iter().map(|device| device.id).collect();

    let at = now();
    let phases: Vec<SchedulePhase> = state
        .schedule_service
        .list()
        .await?
        .iter()
        .filter(|schedule| visible.contains(&schedule.device_id))
        .map(|schedule| schedule.phase_at(at))
        .collect();

    Ok(HomeTemplate {
        device_count: devices.len(),
        on_count: devices.iter().filter(|d| d.power.is_on()).count(),
        connected_count: devices.iter().filter(|d| d.connected).count(),
        shared_with_me: devices
            .iter()
            .filter(|d| d.owner_id.is_some() && !d.is_owned_by(user.id))
            .count(),
        schedule_count: phases.len(),
        active_schedules: phases
            .iter()
            .filter(|phase| **phase == SchedulePhase::Active)
            .count(),
        nav_user: user.username,
    })
}
