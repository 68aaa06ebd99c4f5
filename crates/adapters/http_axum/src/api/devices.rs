//! JSON handlers for devices.
//!
//! Listing and control (power, toggle, connect, reboot, status) are open to
//! anyone with access to the device; editing, renaming and deleting are
//! reserved to its owner.

use axum::Json;
use axum::extract::{Path, State};
use axum::http::{HeaderMap, StatusCode};
use axum::response::{IntoResponse, Response};
use serde::{Deserialize, Serialize};

use smartcode_app::ports::{DeviceRepository, ScheduleRepository, ShareRepository, UserRepository};
use smartcode_domain::device::{Device, DeviceKind, DeviceStatus, Power};
use smartcode_domain::error::ValidationError;
use smartcode_domain::id::DeviceId;

use crate::auth::current_user;
use crate::error::{ApiError, JsonBody, parse_id};
use crate::state::AppState;

/// Request body for registering a device.
#[derive(Deserialize)]
pub struct CreateDeviceRequest {
    pub name: String,
    pub kind: Option<DeviceKind>,
    #[serde(default)]
    pub location: String,
    pub brand: Option<String>,
    pub model: Option<String>,
    pub secret_key: String,
    pub status: Option<DeviceStatus>,
}

/// Request body for editing a device. Absent fields are kept.
#[derive(Deserialize)]
pub struct UpdateDeviceRequest {
    pub name: Option<String>,
    pub location: Option<String>,
    pub brand: Option<String>,
    pub model: Option<String>,
    pub status: Option<DeviceStatus>,
}

#[derive(Deserialize)]
pub struct RenameRequest {
    pub name: String,
}

#[derive(Deserialize)]
pub struct PowerRequest {
    pub power: Power,
}

/// Request body for switching many devices at once. Without a kind every
/// accessible device is switched.
#[derive(Deserialize)]
pub struct GroupPowerRequest {
    pub kind: Option<DeviceKind>,
    pub power: Power,
}

#[derive(Deserialize)]
pub struct ConnectRequest {
    pub kind: DeviceKind,
}

/// One entry of `GET /api/device-types`.
#[derive(Serialize)]
pub struct DeviceTypeResponse {
    pub code: u8,
    pub kind: DeviceKind,
    pub name: &'static str,
}

#[derive(Serialize)]
pub struct DisconnectResponse {
    pub was_connected: bool,
}

/// Possible responses from the create endpoint.
pub enum CreateResponse {
    Created(Json<Device>),
}

impl IntoResponse for CreateResponse {
    fn into_response(self) -> Response {
        match self {
            Self::Created(json) => (StatusCode::CREATED, json).into_response(),
        }
    }
}

/// Possible responses from the delete endpoint.
pub enum DeleteResponse {
    NoContent,
}

impl IntoResponse for DeleteResponse {
    fn into_response(self) -> Response {
        match self {
            Self::NoContent => StatusCode::NO_CONTENT.into_response(),
        }
    }
}

/// `GET /api/device-types`
pub async fn types() -> Json<Vec<DeviceTypeResponse>> {
    Json(
        DeviceKind::ALL
            .into_iter()
            .map(|kind| DeviceTypeResponse {
                code: kind.code(),
                kind,
                name: kind.display_name(),
            })
            .collect(),
    )
}

/// `GET /api/devices`: devices the caller owns or has been shared.
pub async fn list<D, U, S, C>(
    State(state): State<AppState<D, U, S, C>>,
    headers: HeaderMap,
) -> Result<Json<Vec<Device>>, ApiError>
where
    D: DeviceRepository + Send + Sync + 'static,
    U: UserRepository + Send + Sync + 'static,
    S: ShareRepository + Send + Sync + 'static,
    C: ScheduleRepository + Send + Sync + 'static,
{
    let user = current_user(&state, &headers).await?;
    let devices = state.access_service.accessible_devices(user.id).await?;
    Ok(Json(devices))
}

/// `POST /api/devices`
pub async fn create<D, U, S, C>(
    State(state): State<AppState<D, U, S, C>>,
    headers: HeaderMap,
    JsonBody(req): JsonBody<CreateDeviceRequest>,
) -> Result<CreateResponse, ApiError>
where
    D: DeviceRepository + Send + Sync + 'static,
    U: UserRepository + Send + Sync + 'static,
    S: ShareRepository + Send + Sync + 'static,
    C: ScheduleRepository + Send + Sync + 'static,
{
    let user = current_user(&state, &headers).await?;
    if req.secret_key.trim().is_empty() {
        return Err(ValidationError::EmptySecretKey.into());
    }

    let mut builder = Device::builder()
        .name(req.name)
        .location(req.location)
        .secret_key(req.secret_key)
        .owner_id(user.id);
    if let Some(kind) = req.kind {
        builder = builder.kind(kind);
    }
    if let Some(status) = req.status {
        builder = builder.status(status);
    }
    if let Some(brand) = req.brand {
        builder = builder.brand(brand);
    }
    if let Some(model) = req.model {
        builder = builder.model(model);
    }

    let created = state.device_service.create(builder.build()?).await?;
    Ok(CreateResponse::Created(Json(created)))
}

/// `GET /api/devices/{id}`
pub async fn get<D, U, S, C>(
    State(state): State<AppState<D, U, S, C>>,
    headers: HeaderMap,
    Path(id): Path<String>,
) -> Result<Json<Device>, ApiError>
where
    D: DeviceRepository + Send + Sync + 'static,
    U: UserRepository + Send + Sync + 'static,
    S: ShareRepository + Send + Sync + 'static,
    C: ScheduleRepository + Send + Sync + 'static,
{
    let user = current_user(&state, &headers).await?;
    let device_id: DeviceId = parse_id(&id)?;
    let device = state
        .access_service
        .accessible_device(user.id, device_id)
        .await?;
    Ok(Json(device))
}

/// `PUT /api/devices/{id}`
pub async fn update<D, U, S, C>(
    State(state): State<AppState<D, U, S, C>>,
    headers: HeaderMap,
    Path(id): Path<String>,
    JsonBody(req): JsonBody<UpdateDeviceRequest>,
) -> Result<Json<Device>, ApiError>
where
    D: DeviceRepository + Send + Sync + 'static,
    U: UserRepository + Send + Sync + 'static,
    S: ShareRepository + Send + Sync + 'static,
    C: ScheduleRepository + Send + Sync + 'static,
{
    let user = current_user(&state, &headers).await?;
    let device_id: DeviceId = parse_id(&id)?;
    let mut device = state.access_service.owned_device(user.id, device_id).await?;

    if let Some(name) = req.name {
        device.name = name;
    }
    if let Some(location) = req.location {
        device.location = location;
    }
    if let Some(brand) = req.brand {
        device.brand = Some(brand).filter(|brand| !brand.trim().is_empty());
    }
    if let Some(model) = req.model {
        device.model = Some(model).filter(|model| !model.trim().is_empty());
    }
    if let Some(status) = req.status {
        if status.kind() != device.kind() {
            return Err(ValidationError::StatusKindMismatch {
                expected: device.kind(),
                actual: status.kind(),
            }
            .into());
        }
        device.status = status;
    }

    Ok(Json(state.device_service.update(device).await?))
}

/// `DELETE /api/devices/{id}`: owner only; drops schedules and shares too.
pub async fn delete<D, U, S, C>(
    State(state): State<AppState<D, U, S, C>>,
    headers: HeaderMap,
    Path(id): Path<String>,
) -> Result<DeleteResponse, ApiError>
where
    D: DeviceRepository + Send + Sync + 'static,
    U: UserRepository + Send + Sync + 'static,
    S: ShareRepository + Send + Sync + 'static,
    C: ScheduleRepository + Send + Sync + 'static,
{
    let user = current_user(&state, &headers).await?;
    let device_id: DeviceId = parse_id(&id)?;
    state.access_service.owned_device(user.id, device_id).await?;
    state.remove_device(device_id).await?;
    Ok(DeleteResponse::NoContent)
}

/// `PUT /api/devices/{id}/name`
pub async fn rename<D, U, S, C>(
    State(state): State<AppState<D, U, S, C>>,
    headers: HeaderMap,
    Path(id): Path<String>,
    JsonBody(req): JsonBody<RenameRequest>,
) -> Result<Json<Device>, ApiError>
where
    D: DeviceRepository + Send + Sync + 'static,
    U: UserRepository + Send + Sync + 'static,
    S: ShareRepository + Send + Sync + 'static,
    C: ScheduleRepository + Send + Sync + 'static,
{
    let user = current_user(&state, &headers).await?;
    let device_id: DeviceId = parse_id(&id)?;
    state.access_service.owned_device(user.id, device_id).await?;
    Ok(Json(state.device_service.rename(device_id, req.name).await?))
}

/// `POST /api/devices/{id}/power`
pub async fn power<D, U, S, C>(
    State(state): State<AppState<D, U, S, C>>,
    headers: HeaderMap,
    Path(id): Path<String>,
    JsonBody(req): JsonBody<PowerRequest>,
) -> Result<Json<Device>, ApiError>
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
    Ok(Json(
        state.device_service.set_power(device_id, req.power).await?,
    ))
}

/// `POST /api/devices/{id}/toggle`
pub async fn toggle<D, U, S, C>(
    State(state): State<AppState<D, U, S, C>>,
    headers: HeaderMap,
    Path(id): Path<String>,
) -> Result<Json<Device>, ApiError>
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
    Ok(Json(state.device_service.toggle(device_id).await?))
}

/// `POST /api/devices/{id}/connect`: pair, checking the expected kind.
pub async fn connect<D, U, S, C>(
    State(state): State<AppState<D, U, S, C>>,
    headers: HeaderMap,
    Path(id): Path<String>,
    JsonBody(req): JsonBody<ConnectRequest>,
) -> Result<Json<Device>, ApiError>
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
    Ok(Json(
        state.device_service.connect(device_id, req.kind).await?,
    ))
}

/// `POST /api/devices/{id}/disconnect`
pub async fn disconnect<D, U, S, C>(
    State(state): State<AppState<D, U, S, C>>,
    headers: HeaderMap,
    Path(id): Path<String>,
) -> Result<Json<DisconnectResponse>, ApiError>
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
    let was_connected = state.device_service.disconnect(device_id).await?;
    Ok(Json(DisconnectResponse { was_connected }))
}

/// `POST /api/devices/{id}/reboot`
pub async fn reboot<D, U, S, C>(
    State(state): State<AppState<D, U, S, C>>,
    headers: HeaderMap,
    Path(id): Path<String>,
) -> Result<Json<Device>, ApiError>
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
    Ok(Json(state.device_service.reboot(device_id).await?))
}

/// `GET /api/devices/{id}/status`: only for a connected device.
pub async fn status<D, U, S, C>(
    State(state): State<AppState<D, U, S, C>>,
    headers: HeaderMap,
    Path(id): Path<String>,
) -> Result<Json<DeviceStatus>, ApiError>
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
    Ok(Json(state.device_service.status(device_id).await?))
}

/// `POST /api/devices/power`: group switch over the caller's devices.
/// Returns the devices whose power changed.
pub async fn power_group<D, U, S, C>(
    State(state): State<AppState<D, U, S, C>>,
    headers: HeaderMap,
    JsonBody(req): JsonBody<GroupPowerRequest>,
) -> Result<Json<Vec<Device>>, ApiError>
where
    D: DeviceRepository + Send + Sync + 'static,
    U: UserRepository + Send + Sync + 'static,
    S: ShareRepository + Send + Sync + 'static,
    C: ScheduleRepository + Send + Sync + 'static,
{
    let user = current_user(&state, &headers).await?;
    let ids: Vec<DeviceId> = state
        .access_service
        .accessible_devices(user.id)
        .await?
        .into_iter()
        .filter(|device| req.kind.is_none_or(|kind| device.kind() == kind))
        .map(|device| device.id)
        .collect();
    let changed = state.device_service.set_power_all(&ids, req.power).await?;
    Ok(Json(changed))
}
