//! JSON handlers for device sharing.

use axum::Json;
use axum::extract::{Path, State};
use axum::http::{HeaderMap, StatusCode};
use serde::{Deserialize, Serialize};

use smartcode_app::ports::{DeviceRepository, ScheduleRepository, ShareRepository, UserRepository};
use smartcode_domain::error::{NotFoundError, SmartHomeError};
use smartcode_domain::id::{DeviceId, UserId};
use smartcode_domain::share::DeviceShare;
use smartcode_domain::time::Timestamp;

use crate::auth::current_user;
use crate::error::{ApiError, JsonBody, parse_id};
use crate::state::AppState;

/// Request body for sharing a device with another registered user.
#[derive(Deserialize)]
pub struct ShareRequest {
    pub email: String,
}

/// One user a device is shared with.
#[derive(Serialize)]
pub struct ShareResponse {
    pub user_id: UserId,
    pub username: String,
    pub email: Option<String>,
    pub shared_at: Timestamp,
}

/// `GET /api/devices/{id}/shares`: owner only.
pub async fn list<D, U, S, C>(
    State(state): State<AppState<D, U, S, C>>,
    headers: HeaderMap,
    Path(id): Path<String>,
) -> Result<Json<Vec<ShareResponse>>, ApiError>
where
    D: DeviceRepository + Send + Sync + 'static,
    U: UserRepository + Send + Sync + 'static,
    S: ShareRepository + Send + Sync + 'static,
    C: ScheduleRepository + Send + Sync + 'static,
{
    let user = current_user(&state, &headers).await?;
    let device_id: DeviceId = parse_id(&id)?;
    let shares = state
        .access_service
        .shares_for_device(user.id, device_id)
        .await?
        .into_iter()
        .map(|(share, user)| ShareResponse {
            user_id: user.id,
            username: user.username,
            email: user.email,
            shared_at: share.shared_at,
        })
        .collect();
    Ok(Json(shares))
}

/// `POST /api/devices/{id}/shares`
pub async fn create<D, U, S, C>(
    State(state): State<AppState<D, U, S, C>>,
    headers: HeaderMap,
    Path(id): Path<String>,
    JsonBody(req): JsonBody<ShareRequest>,
) -> Result<(StatusCode, Json<DeviceShare>), ApiError>
where
    D: DeviceRepository + Send + Sync + 'static,
    U: UserRepository + Send + Sync + 'static,
    S: ShareRepository + Send + Sync + 'static,
    C: ScheduleRepository + Send + Sync + 'static,
{
    let user = current_user(&state, &headers).await?;
    let device_id: DeviceId = parse_id(&id)?;
    let share = state
        .access_service
        .share_device(user.id, device_id, &req.email)
        .await?;
    Ok((StatusCode::CREATED, Json(share)))
}

/// `DELETE /api/devices/{id}/shares/{user_id}`: by the owner, or by the
/// user the device is shared with.
pub async fn delete<D, U, S, C>(
    State(state): State<AppState<D, U, S, C>>,
    headers: HeaderMap,
    Path((id, user_id)): Path<(String, String)>,
) -> Result<StatusCode, ApiError>
where
    D: DeviceRepository + Send + Sync + 'static,
    U: UserRepository + Send + Sync + 'static,
    S: ShareRepository + Send + Sync + 'static,
    C: ScheduleRepository + Send + Sync + 'static,
{
    let user = current_user(&state, &headers).await?;
    let device_id: DeviceId = parse_id(&id)?;
    let target: UserId = parse_id(&user_id)?;
    let removed = state
        .access_service
        .unshare(user.id, device_id, target)
        .await?;
    if !removed {
        return Err(SmartHomeError::from(NotFoundError {
            entity: "Share",
            id: format!("{device_id}/{target}"),
        })
        .into());
    }
    Ok(StatusCode::NO_CONTENT)
}
