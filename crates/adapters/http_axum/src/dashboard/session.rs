//! Login, logout and self-registration pages.
//!
//! There are no passwords: signing in picks an existing active account by
//! username and stores its id in the session cookie.

use askama::Template;
use axum::extract::{Form, State};
use axum::http::{StatusCode, header};
use axum::response::{IntoResponse, Redirect, Response};
use serde::Deserialize;

use smartcode_app::ports::{DeviceRepository, ScheduleRepository, ShareRepository, UserRepository};
use smartcode_domain::error::SmartHomeError;
use smartcode_domain::id::UserId;
use smartcode_domain::user::User;

use super::{DashboardError, form_message};
use crate::auth::{login_cookie, logout_cookie};
use crate::state::AppState;

/// Login page template.
#[derive(Template)]
#[template(path = "login.html")]
pub struct LoginTemplate {
    nav_user: String,
    username: String,
    error: String,
}

/// Registration page template.
#[derive(Template)]
#[template(path = "register.html")]
pub struct RegisterTemplate {
    nav_user: String,
    username: String,
    name: String,
    email: String,
    error: String,
}

html_page!(LoginTemplate, RegisterTemplate);

#[derive(Deserialize)]
pub struct LoginForm {
    pub username: String,
}

#[derive(Deserialize)]
pub struct RegisterForm {
    pub username: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub email: String,
}

fn signed_in(user_id: UserId) -> Response {
    (
        [(header::SET_COOKIE, login_cookie(user_id))],
        Redirect::to("/"),
    )
        .into_response()
}

/// `GET /login`
pub async fn login_page() -> LoginTemplate {
    LoginTemplate {
        nav_user: String::new(),
        username: String::new(),
        error: String::new(),
    }
}

/// `POST /login`
pub async fn login<D, U, S, C>(
    State(state): State<AppState<D, U, S, C>>,
    Form(form): Form<LoginForm>,
) -> Result<Response, DashboardError>
where
    D: DeviceRepository + Send + Sync + 'static,
    U: UserRepository + Send + Sync + 'static,
    S: ShareRepository + Send + Sync + 'static,
    C: ScheduleRepository + Send + Sync + 'static,
{
    let username = form.username.trim().to_string();
    let error = match state.user_service.find_by_username(&username).await {
        Ok(user) if user.is_active => {
            tracing::info!(username = %user.username, "dashboard login");
            return Ok(signed_in(user.id));
        }
        Ok(_) => "This account is inactive.",
        Err(SmartHomeError::NotFound(_)) => "Unknown username.",
        Err(err) => return Err(err.into()),
    };
    let page = LoginTemplate {
        nav_user: String::new(),
        username,
        error: error.to_string(),
    };
    Ok((StatusCode::UNAUTHORIZED, page).into_response())
}

/// `POST /logout`
pub async fn logout() -> Response {
    (
        [(header::SET_COOKIE, logout_cookie())],
        Redirect::to("/login"),
    )
        .into_response()
}

/// `GET /register`
pub async fn register_page() -> RegisterTemplate {
    RegisterTemplate {
        nav_user: String::new(),
        username: String::new(),
        name: String::new(),
        email: String::new(),
        error: String::new(),
    }
}

/// `POST /register`: create the account and sign it in.
pub async fn register<D, U, S, C>(
    State(state): State<AppState<D, U, S, C>>,
    Form(form): Form<RegisterForm>,
) -> Result<Response, DashboardError>
where
    D: DeviceRepository + Send + Sync + 'static,
    U: UserRepository + Send + Sync + 'static,
    S: ShareRepository + Send + Sync + 'static,
    C: ScheduleRepository + Send + Sync + 'static,
{
    let mut builder = User::builder()
        .username(form.username.trim())
        .name(form.name.trim());
    if !form.email.trim().is_empty() {
        builder = builder.email(form.email.trim());
    }

    let registered = match builder.build() {
        Ok(user) => state.user_service.register(user).await,
        Err(err) => Err(err),
    };
    match registered {
        Ok(user) => Ok(signed_in(user.id)),
        Err(err) => {
            let page = RegisterTemplate {
                nav_user: String::new(),
                error: form_message(err)?,
                username: form.username,
                name: form.name,
                email: form.email,
            };
            Ok((StatusCode::BAD_REQUEST, page).into_response())
        }
    }
}
