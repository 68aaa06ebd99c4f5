//! Server-side rendered HTML dashboard (no JavaScript).
//!
//! Every form posts back and redirects (PRG). Pages that need a signed-in
//! user redirect to `/login` when the session cookie is missing or stale.

use askama::Template;
use axum::Router;
use axum::http::{HeaderMap, StatusCode};
use axum::response::{Html, IntoResponse, Redirect, Response};
use axum::routing::{get, post};

use smartcode_app::ports::{DeviceRepository, ScheduleRepository, ShareRepository, UserRepository};
use smartcode_domain::error::{SmartHomeError, ValidationError};
use smartcode_domain::user::User;

use crate::auth::current_user;
use crate::error::ApiError;
use crate::state::AppState;

macro_rules! html_page {
    ($($template:ty),+ $(,)?) => {$(
        impl axum::response::IntoResponse for $template {
            fn into_response(self) -> axum::response::Response {
                $crate::dashboard::render(&self)
            }
        }
    )+};
}

#[allow(clippy::missing_errors_doc)]
pub mod devices;
pub mod forms;
#[allow(clippy::missing_errors_doc)]
pub mod home;
#[allow(clippy::missing_errors_doc)]
pub mod session;

/// Render a template, answering 500 when rendering fails.
pub(crate) fn render(template: &impl Template) -> Response {
    match template.render() {
        Ok(html) => Html(html).into_response(),
        Err(err) => {
            tracing::error!(error = %err, "template rendering failed");
            StatusCode::INTERNAL_SERVER_ERROR.into_response()
        }
    }
}

/// Error page template.
#[derive(Template)]
#[template(path = "error.html")]
pub struct ErrorTemplate {
    nav_user: String,
    status: u16,
    message: String,
}

html_page!(ErrorTemplate);

/// Failure of a dashboard handler.
#[derive(Debug)]
pub enum DashboardError {
    /// No usable session: send the browser to the login page.
    Login,
    /// Anything else, shown on the error page.
    Page(ApiError),
}

impl From<ApiError> for DashboardError {
    fn from(err: ApiError) -> Self {
        match err {
            ApiError::Unauthenticated => Self::Login,
            other => Self::Page(other),
        }
    }
}

impl From<SmartHomeError> for DashboardError {
    fn from(err: SmartHomeError) -> Self {
        Self::Page(ApiError::Domain(err))
    }
}

impl From<ValidationError> for DashboardError {
    fn from(err: ValidationError) -> Self {
        Self::from(SmartHomeError::from(err))
    }
}

impl IntoResponse for DashboardError {
    fn into_response(self) -> Response {
        match self {
            Self::Login => Redirect::to("/login").into_response(),
            Self::Page(err) => {
                let (status, message) = err.status_and_message();
                let page = ErrorTemplate {
                    nav_user: String::new(),
                    status: status.as_u16(),
                    message,
                };
                (status, page).into_response()
            }
        }
    }
}

/// The signed-in user, or [`DashboardError::Login`].
pub(crate) async fn viewer<D, U, S, C>(
    state: &AppState<D, U, S, C>,
    headers: &HeaderMap,
) -> Result<User, DashboardError>
where
    U: UserRepository + Send + Sync + 'static,
{
    Ok(current_user(state, headers).await?)
}

/// Split an error into a message to show next to a form, or a failure that
/// deserves the error page.
pub(crate) fn form_message(err: SmartHomeError) -> Result<String, DashboardError> {
    match err {
        SmartHomeError::Storage(_) => Err(err.into()),
        other => Ok(other.to_string()),
    }
}

/// Local redirect target from a hidden `next` field, falling back to
/// `fallback` for anything that is not a same-site path.
pub(crate) fn local_redirect(next: Option<&str>, fallback: &str) -> Redirect {
    match next {
        Some(path) if path.starts_with('/') && !path.starts_with("//") => Redirect::to(path),
        _ => Redirect::to(fallback),
    }
}

/// Build the dashboard sub-router for SSR HTML pages.
pub fn routes<D, U, S, C>() -> Router<AppState<D, U, S, C>>
where
    D: DeviceRepository + Send + Sync + 'static,
    U: UserRepository + Send + Sync + 'static,
    S: ShareRepository + Send + Sync + 'static,
    C: ScheduleRepository + Send + Sync + 'static,
{
    Router::new()
        .route("/", get(home::index::<D, U, S, C>))
        .route(
            "/login",
            get(session::login_page).post(session::login::<D, U, S, C>),
        )
        .route("/logout", post(session::logout))
        .route(
            "/register",
            get(session::register_page).post(session::register::<D, U, S, C>),
        )
        .route("/devices", get(devices::list::<D, U, S, C>))
        .route(
            "/devices/new",
            get(devices::new_page::<D, U, S, C>).post(devices::create::<D, U, S, C>),
        )
        .route("/devices/power", post(devices::group_power::<D, U, S, C>))
        .route("/devices/{id}", get(devices::detail::<D, U, S, C>))
        .route(
            "/devices/{id}/edit",
            get(devices::edit_page::<D, U, S, C>).post(devices::update::<D, U, S, C>),
        )
        .route("/devices/{id}/delete", post(devices::delete::<D, U, S, C>))
        .route("/devices/{id}/toggle", post(devices::toggle::<D, U, S, C>))
        .route("/devices/{id}/shares", post(devices::share::<D, U, S, C>))
        .route(
            "/devices/{id}/shares/{user_id}/delete",
            post(devices::unshare::<D, U, S, C>),
        )
        .route(
            "/devices/{id}/schedules",
            post(devices::add_schedule::<D, U, S, C>),
        )
        .route(
            "/schedules/{id}/delete",
            post(devices::delete_schedule::<D, U, S, C>),
        )
}

#[cfg(test)]
mod tests {
    use super::*;
    use smartcode_domain::error::NotFoundError;

    #[test]
    fn should_redirect_unauthenticated_to_login() {
        let response = DashboardError::from(ApiError::Unauthenticated).into_response();
        assert_eq!(response.status(), StatusCode::SEE_OTHER);
        assert_eq!(response.headers()["location"], "/login");
    }

    #[test]
    fn should_render_error_page_with_domain_status() {
        let err = DashboardError::from(SmartHomeError::from(NotFoundError {
            entity: "Device",
            id: "x".to_string(),
        }));
        assert_eq!(err.into_response().status(), StatusCode::NOT_FOUND);
    }

    #[test]
    fn should_keep_form_messages_for_user_errors() {
        let message = form_message(ValidationError::EmptyName.into()).unwrap();
        assert!(!message.is_empty());

        let storage = SmartHomeError::Storage("disk full".into());
        assert!(form_message(storage).is_err());
    }

    #[test]
    fn should_only_redirect_to_local_paths() {
        let response = local_redirect(Some("/devices/1"), "/devices").into_response();
        assert_eq!(response.headers()["location"], "/devices/1");

        let response = local_redirect(Some("//evil.example"), "/devices").into_response();
        assert_eq!(response.headers()["location"], "/devices");
    }
}
