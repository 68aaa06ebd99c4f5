//! JSON handlers for user accounts.

use axum::Json;
use axum::extract::State;
use axum::http::{HeaderMap, StatusCode};
use axum::response::{IntoResponse, Response};
use serde::Deserialize;

use smartcode_app::ports::{DeviceRepository, ScheduleRepository, ShareRepository, UserRepository};
use smartcode_domain::user::User;

use crate::auth::current_user;
use crate::error::{ApiError, JsonBody};
use crate::state::AppState;

/// Request body for registering an account.
#[derive(Deserialize)]
pub struct RegisterRequest {
    pub username: String,
    #[serde(default)]
    pub name: String,
    pub email: Option<String>,
}

/// Request body for editing one's own account. Absent fields are kept; an
/// empty `email` clears it.
#[derive(Deserialize)]
pub struct UpdateMeRequest {
    pub name: Option<String>,
    pub email: Option<String>,
}

/// Possible responses from the register endpoint.
pub enum RegisterResponse {
    Created(Json<User>),
}

impl IntoResponse for RegisterResponse {
    fn into_response(self) -> Response {
        match self {
            Self::Created(json) => (StatusCode::CREATED, json).into_response(),
        }
    }
}

/// `POST /api/users`
pub async fn register<D, U, S, C>(
    State(state): State<AppState<D, U, S, C>>,
    JsonBody(req): JsonBody<RegisterRequest>,
) -> Result<RegisterResponse, ApiError>
where
    D: DeviceRepository + Send + Sync + 'static,
    U: UserRepository + Send + Sync + 'static,
    S: ShareRepository + Send + Sync + 'static,
    C: ScheduleRepository + Send + Sync + 'static,
{
    let mut builder = User::builder().username(req.username).name(req.name);
    if let Some(email) = req.email {
        builder = builder.email(email);
    }
    let user = state.user_service.register(builder.build()?).await?;
    Ok(RegisterResponse::Created(Json(user)))
}

/// `GET /api/users`
pub async fn list<D, U, S, C>(
    State(state): State<AppState<D, U, S, C>>,
    headers: HeaderMap,
) -> Result<Json<Vec<User>>, ApiError>
where
    D: DeviceRepository + Send + Sync + 'static,
    U: UserRepository + Send + Sync + 'static,
    S: ShareRepository + Send + Sync + 'static,
    C: ScheduleRepository + Send + Sync + 'static,
{
    current_user(&state, &headers).await?;
    Ok(Json(state.user_service.list().await?))
}

/// `GET /api/users/me`
pub async fn me<D, U, S, C>(
    State(state): State<AppState<D, U, S, C>>,
    headers: HeaderMap,
) -> Result<Json<User>, ApiError>
where
    D: DeviceRepository + Send + Sync + 'static,
    U: UserRepository + Send + Sync + 'static,
    S: ShareRepository + Send + Sync + 'static,
    C: ScheduleRepository + Send + Sync + 'static,
{
    Ok(Json(current_user(&state, &headers).await?))
}

/// `PUT /api/users/me`
pub async fn update_me<D, U, S, C>(
    State(state): State<AppState<D, U, S, C>>,
    headers: HeaderMap,
    JsonBody(req): JsonBody<UpdateMeRequest>,
) -> Result<Json<User>, ApiError>
where
    D: DeviceRepository + Send + Sync + 'static,
    U: UserRepository + Send + Sync + 'static,
    S: ShareRepository + Send + Sync + 'static,
    C: ScheduleRepository + Send + Sync + 'static,
{
    let mut user = current_user(&state, &headers).await?;
    if let Some(name) = req.name {
        user = state.user_service.rename(user.id, name).await?;
    }
    if let Some(email) = req.email {
        let email = Some(email).filter(|email| !email.trim().is_empty());
        user = state.user_service.set_email(user.id, email).await?;
    }
    Ok(Json(user))
}

/// `DELETE /api/users/me`: removes the account and every device it owns.
pub async fn delete_me<D, U, S, C>(
    State(state): State<AppState<D, U, S, C>>,
    headers: HeaderMap,
) -> Result<StatusCode, ApiError>
where
    D: DeviceRepository + Send + Sync + 'static,
    U: UserRepository + Send + Sync + 'static,
    S: ShareRepository + Send + Sync + 'static,
    C: ScheduleRepository + Send + Sync + 'static,
{
    let user = current_user(&state, &headers).await?;
    state.remove_user(user.id).await?;
    Ok(StatusCode::NO_CONTENT)
}
