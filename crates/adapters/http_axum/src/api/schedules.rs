//! JSON handlers for power schedules.

use std::collections::HashSet;

use axum::Json;
use axum::extract::{Path, State};
use axum::http::{HeaderMap, StatusCode};
use chrono::NaiveTime;
use serde::{Deserialize, Serialize};

use smartcode_app::ports::{DeviceRepository, ScheduleRepository, ShareRepository, UserRepository};
use smartcode_app::services::{CleanupReport, ScheduleReport};
use smartcode_domain::device::Device;
use smartcode_domain::error::SmartHomeError;
use smartcode_domain::id::{DeviceId, ScheduleId, UserId};
use smartcode_domain::schedule::{Schedule, SchedulePhase};
use smartcode_domain::time::{Timestamp, now};

use crate::auth::current_user;
use crate::error::{ApiError, JsonBody, parse_id};
use crate::state::AppState;

/// Request body for adding a schedule to a device.
#[derive(Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum CreateScheduleRequest {
    /// On now, off after `minutes`.
    Duration { minutes: u32 },
    /// On at `start`, off at `end`.
    Window { start: Timestamp, end: Timestamp },
    /// On every day at `start` (UTC) for `duration_minutes`.
    Daily {
        start: NaiveTime,
        duration_minutes: u32,
    },
}

impl CreateScheduleRequest {
    fn into_schedule(self, device_id: DeviceId, at: Timestamp) -> Result<Schedule, SmartHomeError> {
        match self {
            Self::Duration { minutes } => Schedule::for_duration(device_id, at, minutes),
            Self::Window { start, end } => Schedule::window(device_id, start, end, at),
            Self::Daily {
                start,
                duration_minutes,
            } => Schedule::daily(device_id, start, duration_minutes, at),
        }
    }
}

/// A schedule with its phase at response time.
#[derive(Serialize)]
pub struct ScheduleResponse {
    #[serde(flatten)]
    pub schedule: Schedule,
    pub phase: SchedulePhase,
}

impl ScheduleResponse {
    fn at(schedule: Schedule, now: Timestamp) -> Self {
        let phase = schedule.phase_at(now);
        Self { schedule, phase }
    }
}

/// Result of `POST /api/schedules/check`.
#[derive(Serialize)]
pub struct CheckResponse {
    pub turned_on: Vec<DeviceId>,
    pub turned_off: Vec<DeviceId>,
    pub unchanged: usize,
}

impl CheckResponse {
    fn visible(report: &ScheduleReport, visible: &HashSet<DeviceId>) -> Self {
        Self {
            turned_on: visible_ids(&report.turned_on, visible),
            turned_off: visible_ids(&report.turned_off, visible),
            unchanged: report.unchanged,
        }
    }
}

/// Result of `POST /api/schedules/cleanup`.
#[derive(Serialize)]
pub struct CleanupResponse {
    pub removed: usize,
    pub turned_off: Vec<DeviceId>,
}

impl CleanupResponse {
    fn visible(report: &CleanupReport, visible: &HashSet<DeviceId>) -> Self {
        Self {
            removed: report.removed,
            turned_off: visible_ids(&report.devices_turned_off, visible),
        }
    }
}

fn visible_ids(devices: &[Device], visible: &HashSet<DeviceId>) -> Vec<DeviceId> {
    devices
        .iter()
        .map(|device| device.id)
        .filter(|id| visible.contains(id))
        .collect()
}

/// Ids of the devices `user_id` owns or has been shared.
async fn visible_devices<D, U, S, C>(
    state: &AppState<D, U, S, C>,
    user_id: UserId,
) -> Result<HashSet<DeviceId>, ApiError>
where
    D: DeviceRepository + Send + Sync + 'static,
    U: UserRepository + Send + Sync + 'static,
    S: ShareRepository + Send + Sync + 'static,
    C: ScheduleRepository + Send + Sync + 'static,
{
    Ok(state
        .access_service
        .accessible_devices(user_id)
        .await?
        .into_iter()
        .map(|device| device.id)
        .collect())
}

/// `GET /api/devices/{id}/schedules`
pub async fn list_for_device<D, U, S, C>(
    State(state): State<AppState<D, U, S, C>>,
    headers: HeaderMap,
    Path(id): Path<String>,
) -> Result<Json<Vec<ScheduleResponse>>, ApiError>
where
    D: DeviceRepository + Send + Sync + 'static,
    U: UserRepository + Send + Sync + 'static,
    S: ShareRepository + Send + Sync + 'static,
    C: ScheduleRepository + Send + Sync + 'static,
{
    let user = current_user(&state, &headers).await?;
    let device_id: DeviceId = parse_id(&id)?;
    state
        .access_service
        .accessible_device(user.id, device_id)
        .await?;
    let at = now();
    let schedules = state
        .schedule_service
        .list_for_device(device_id)
        .await?
        .into_iter()
        .map(|schedule| ScheduleResponse::at(schedule, at))
        .collect();
    Ok(Json(schedules))
}

/// `POST /api/devices/{id}/schedules`
pub async fn create<D, U, S, C>(
    State(state): State<AppState<D, U, S, C>>,
    headers: HeaderMap,
    Path(id): Path<String>,
    JsonBody(req): JsonBody<CreateScheduleRequest>,
) -> Result<(StatusCode, Json<ScheduleResponse>), ApiError>
where
    D: DeviceRepository + Send + Sync + 'static,
    U: UserRepository + Send + Sync + 'static,
    S: ShareRepository + Send + Sync + 'static,
    C: ScheduleRepository + Send + Sync + 'static,
{
    let user = current_user(&state, &headers).await?;
    let device_id: DeviceId = parse_id(&id)?;
    state
        .access_service
        .accessible_device(user.id, device_id)
        .await?;
    let at = now();
    let schedule = state
        .schedule_service
        .add(req.into_schedule(device_id, at)?)
        .await?;
    Ok((
        StatusCode::CREATED,
        Json(ScheduleResponse::at(schedule, at)),
    ))
}

/// `GET /api/schedules`: schedules of every device the caller may access.
pub async fn list<D, U, S, C>(
    State(state): State<AppState<D, U, S, C>>,
    headers: HeaderMap,
) -> Result<Json<Vec<ScheduleResponse>>, ApiError>
where
    D: DeviceRepository + Send + Sync + 'static,
    U: UserRepository + Send + Sync + 'static,
    S: ShareRepository + Send + Sync + 'static,
    C: ScheduleRepository + Send + Sync + 'static,
{
    let user = current_user(&state, &headers).await?;
    let visible = visible_devices(&state, user.id).await?;
    let at = now();
    let schedules = state
        .schedule_service
        .list()
        .await?
        .into_iter()
        .filter(|schedule| visible.contains(&schedule.device_id))
        .map(|schedule| ScheduleResponse::at(schedule, at))
        .collect();
    Ok(Json(schedules))
}

/// `DELETE /api/schedules/{id}`
pub async fn delete<D, U, S, C>(
    State(state): State<AppState<D, U, S, C>>,
    headers: HeaderMap,
    Path(id): Path<String>,
) -> Result<StatusCode, ApiError>
where
    D: DeviceRepository + Send + Sync + 'static,
    U: UserRepository + Send + Sync + 'static,
    S: ShareRepository + Send + Sync + 'static,
    C: ScheduleRepository + Send + Sync + 'static,
{
    let user = current_user(&state, &headers).await?;
    let schedule_id: ScheduleId = parse_id(&id)?;
    let schedule = state.schedule_service.get(schedule_id).await?;
    state
        .access_service
        .accessible_device(user.id, schedule.device_id)
        .await?;
    state.schedule_service.delete(schedule_id).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// `POST /api/schedules/check`: apply every schedule now.
pub async fn check<D, U, S, C>(
    State(state): State<AppState<D, U, S, C>>,
    headers: HeaderMap,
) -> Result<Json<CheckResponse>, ApiError>
where
    D: DeviceRepository + Send + Sync + 'static,
    U: UserRepository + Send + Sync + 'static,
    S: ShareRepository + Send + Sync + 'static,
    C: ScheduleRepository + Send + Sync + 'static,
{
    let user = current_user(&state, &headers).await?;
    let report = state.schedule_service.check_schedules(now()).await?;
    let visible = visible_devices(&state, user.id).await?;
    Ok(Json(CheckResponse::visible(&report, &visible)))
}

/// `POST /api/schedules/cleanup`: drop expired schedules now.
pub async fn cleanup<D, U, S, C>(
    State(state): State<AppState<D, U, S, C>>,
    headers: HeaderMap,
) -> Result<Json<CleanupResponse>, ApiError>
where
    D: DeviceRepository + Send + Sync + 'static,
    U: UserRepository + Send + Sync + 'static,
    S: ShareRepository + Send + Sync + 'static,
    C: ScheduleRepository + Send + Sync + 'static,
{
    let user = current_user(&state, &headers).await?;
    let report = state.schedule_service.cleanup_expired(now()).await?;
    let visible = visible_devices(&state, user.id).await?;
    Ok(Json(CleanupResponse::visible(&report, &visible)))
}
