//! Axum router assembly.

use axum::Router;
use axum::routing::get;
use tower_http::trace::TraceLayer;

use smartcode_app::ports::{DeviceRepository, ScheduleRepository, ShareRepository, UserRepository};

use crate::state::AppState;

/// Build the top-level axum [`Router`].
///
/// Merges API routes under `/api` and dashboard routes at `/`.
/// Includes a [`TraceLayer`] that logs each HTTP request/response at the
/// `DEBUG` level using the `tracing` ecosystem.
pub fn build<D, U, S, C>(state: AppState<D, U, S, C>) -> Router
where
    D: DeviceRepository + Send + Sync + 'static,
    U: UserRepository + Send + Sync + 'static,
    S: ShareRepository + Send + Sync + 'static,
    C: ScheduleRepository + Send + Sync + 'static,
{
    Router::new()
        .route("/health", get(health_check))
        .nest("/api", crate::api::routes())
        .merge(crate::dashboard::routes())
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

async fn health_check() -> &'static str {
    "OK"
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::{SESSION_COOKIE, USER_HEADER};
    use crate::state::test_support::{add_device, add_user, test_state};
    use axum::body::Body;
    use axum::http::{Request, StatusCode, header};
    use serde_json::{Value, json};
    use smartcode_domain::device::{DeviceKind, Power};
    use smartcode_domain::user::User;
    use tower::ServiceExt;

    async fn send(app: &Router, request: Request<Body>) -> (StatusCode, Value) {
        let response = app.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        let body = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
        (status, body)
    }

    fn api(method: &str, uri: &str, user: Option<&User>, body: Option<Value>) -> Request<Body> {
        let mut builder = Request::builder().method(method).uri(uri);
        if let Some(user) = user {
            builder = builder.header(USER_HEADER, user.id.to_string());
        }
        match body {
            Some(body) => builder
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(body.to_string()))
                .unwrap(),
            None => builder.body(Body::empty()).unwrap(),
        }
    }

    fn page(method: &str, uri: &str, user: &User, form: &str) -> Request<Body> {
        Request::builder()
            .method(method)
            .uri(uri)
            .header(header::COOKIE, format!("{SESSION_COOKIE}={}", user.id))
            .header(header::CONTENT_TYPE, "application/x-www-form-urlencoded")
            .body(Body::from(form.to_string()))
            .unwrap()
    }

    #[tokio::test]
    async fn health_returns_ok() {
        let app = build(test_state());
        let response = app
            .oneshot(Request::get("/health").body(Body::empty()).unwrap())
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        assert_eq!(&bytes[..], b"OK");
    }

    #[tokio::test]
    async fn should_register_without_authentication() {
        let app = build(test_state());

        let (status, body) = send(
            &app,
            api(
                "POST",
                "/api/users",
                None,
                Some(json!({"username": "ada", "email": "ada@example.com"})),
            ),
        )
        .await;

        assert_eq!(status, StatusCode::CREATED);
        assert_eq!(body["username"], "ada");
        assert_eq!(body["is_active"], true);
    }

    #[tokio::test]
    async fn should_reject_anonymous_api_calls() {
        let app = build(test_state());
        let (status, body) = send(&app, api("GET", "/api/devices", None, None)).await;

        assert_eq!(status, StatusCode::UNAUTHORIZED);
        assert!(body["error"].is_string());
    }

    #[tokio::test]
    async fn should_refuse_inactive_users() {
        let state = test_state();
        let ada = add_user(&state, "ada").await;
        state.user_service.set_active(ada.id, false).await.unwrap();
        let app = build(state);

        let (status, _) = send(&app, api("GET", "/api/users/me", Some(&ada), None)).await;
        assert_eq!(status, StatusCode::FORBIDDEN);
    }

    #[tokio::test]
    async fn should_create_list_and_toggle_devices() {
        let state = test_state();
        let ada = add_user(&state, "ada").await;
        let app = build(state);

        let (status, created) = send(
            &app,
            api(
                "POST",
                "/api/devices",
                Some(&ada),
                Some(json!({
                    "name": "Desk lamp",
                    "kind": "bulb",
                    "location": "Office",
                    "secret_key": "k3y",
                })),
            ),
        )
        .await;
        assert_eq!(status, StatusCode::CREATED);
        assert_eq!(created["status"]["kind"], "bulb");
        assert!(created.get("secret_key").is_none());
        let id = created["id"].as_str().unwrap().to_string();

        let (status, listed) = send(&app, api("GET", "/api/devices", Some(&ada), None)).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(listed.as_array().unwrap().len(), 1);

        let (status, toggled) = send(
            &app,
            api("POST", &format!("/api/devices/{id}/toggle"), Some(&ada), None),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(toggled["power"], "on");
    }

    #[tokio::test]
    async fn should_reject_device_without_secret_key() {
        let state = test_state();
        let ada = add_user(&state, "ada").await;
        let app = build(state);

        let (status, _) = send(
            &app,
            api(
                "POST",
                "/api/devices",
                Some(&ada),
                Some(json!({"name": "Plug", "secret_key": " "})),
            ),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn should_forbid_deleting_someone_elses_device() {
        let state = test_state();
        let ada = add_user(&state, "ada").await;
        let bob = add_user(&state, "bob").await;
        let lamp = add_device(&state, &ada, "Lamp", DeviceKind::Bulb).await;
        let app = build(state);

        let (status, _) = send(
            &app,
            api("DELETE", &format!("/api/devices/{}", lamp.id), Some(&bob), None),
        )
        .await;
        assert_eq!(status, StatusCode::FORBIDDEN);

        let (status, _) = send(
            &app,
            api("DELETE", &format!("/api/devices/{}", lamp.id), Some(&ada), None),
        )
        .await;
        assert_eq!(status, StatusCode::NO_CONTENT);
    }

    #[tokio::test]
    async fn should_share_device_with_registered_user() {
        let state = test_state();
        let ada = add_user(&state, "ada").await;
        let bob = add_user(&state, "bob").await;
        let plug = add_device(&state, &ada, "Heater", DeviceKind::Plug).await;
        let app = build(state);

        let (status, _) = send(
            &app,
            api(
                "POST",
                &format!("/api/devices/{}/shares", plug.id),
                Some(&ada),
                Some(json!({"email": "BOB@example.com"})),
            ),
        )
        .await;
        assert_eq!(status, StatusCode::CREATED);

        let (_, visible) = send(&app, api("GET", "/api/devices", Some(&bob), None)).await;
        assert_eq!(visible.as_array().unwrap().len(), 1);

        let (status, _) = send(
            &app,
            api(
                "POST",
                &format!("/api/devices/{}/power", plug.id),
                Some(&bob),
                Some(json!({"power": "on"})),
            ),
        )
        .await;
        assert_eq!(status, StatusCode::OK);

        let (status, _) = send(
            &app,
            api("DELETE", &format!("/api/devices/{}", plug.id), Some(&bob), None),
        )
        .await;
        assert_eq!(status, StatusCode::FORBIDDEN);

        let (status, _) = send(
            &app,
            api(
                "POST",
                &format!("/api/devices/{}/shares", plug.id),
                Some(&ada),
                Some(json!({"email": "nobody@example.com"})),
            ),
        )
        .await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn should_run_duration_schedule_on_check() {
        let state = test_state();
        let ada = add_user(&state, "ada").await;
        let plug = add_device(&state, &ada, "Fan", DeviceKind::Plug).await;
        let app = build(state.clone());

        let (status, created) = send(
            &app,
            api(
                "POST",
                &format!("/api/devices/{}/schedules", plug.id),
                Some(&ada),
                Some(json!({"type": "duration", "minutes": 30})),
            ),
        )
        .await;
        assert_eq!(status, StatusCode::CREATED);
        assert_eq!(created["phase"], "active");

        let (status, report) = send(&app, api("POST", "/api/schedules/check", Some(&ada), None)).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(report["turned_on"][0], plug.id.to_string());

        let device = state.device_service.get(plug.id).await.unwrap();
        assert_eq!(device.power, Power::On);
    }

    #[tokio::test]
    async fn should_reject_empty_schedule_window() {
        let state = test_state();
        let ada = add_user(&state, "ada").await;
        let plug = add_device(&state, &ada, "Fan", DeviceKind::Plug).await;
        let app = build(state);

        let (status, _) = send(
            &app,
            api(
                "POST",
                &format!("/api/devices/{}/schedules", plug.id),
                Some(&ada),
                Some(json!({
                    "type": "window",
                    "start": "2024-05-01T10:00:00Z",
                    "end": "2024-05-01T09:00:00Z",
                })),
            ),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn should_answer_bad_request_for_unknown_enum_values() {
        let state = test_state();
        let ada = add_user(&state, "ada").await;
        let lamp = add_device(&state, &ada, "Lamp", DeviceKind::Bulb).await;
        let app = build(state);

        let (status, body) = send(
            &app,
            api(
                "POST",
                &format!("/api/devices/{}/power", lamp.id),
                Some(&ada),
                Some(json!({"power": "maybe"})),
            ),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert!(body["error"].is_string());

        let (status, body) = send(
            &app,
            api(
                "POST",
                "/api/devices",
                Some(&ada),
                Some(json!({"name": "Toast", "kind": "toaster", "secret_key": "k3y"})),
            ),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert!(body["error"].is_string());
    }

    #[tokio::test]
    async fn should_only_report_visible_devices_on_schedule_check() {
        let state = test_state();
        let ada = add_user(&state, "ada").await;
        let bob = add_user(&state, "bob").await;
        let fan = add_device(&state, &ada, "Fan", DeviceKind::Plug).await;
        let app = build(state);

        let (status, _) = send(
            &app,
            api(
                "POST",
                &format!("/api/devices/{}/schedules", fan.id),
                Some(&ada),
                Some(json!({"type": "duration", "minutes": 30})),
            ),
        )
        .await;
        assert_eq!(status, StatusCode::CREATED);

        let (status, report) = send(&app, api("POST", "/api/schedules/check", Some(&bob), None)).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(report["turned_on"], json!([]));
        assert!(!report.to_string().contains(&fan.id.to_string()));

        let (status, report) = send(&app, api("POST", "/api/schedules/cleanup", Some(&bob), None)).await;
        assert_eq!(status, StatusCode::OK);
        assert!(!report.to_string().contains(&fan.id.to_string()));
    }

    #[tokio::test]
    async fn dashboard_redirects_anonymous_visitors_to_login() {
        let app = build(test_state());
        let response = app
            .oneshot(Request::get("/devices").body(Body::empty()).unwrap())
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::SEE_OTHER);
        assert_eq!(response.headers()[header::LOCATION], "/login");
    }

    #[tokio::test]
    async fn dashboard_login_sets_session_cookie() {
        let state = test_state();
        let ada = add_user(&state, "ada").await;
        let app = build(state);

        let response = app
            .clone()
            .oneshot(
                Request::post("/login")
                    .header(header::CONTENT_TYPE, "application/x-www-form-urlencoded")
                    .body(Body::from("username=ada"))
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::SEE_OTHER);
        let cookie = response.headers()[header::SET_COOKIE].to_str().unwrap();
        assert!(cookie.starts_with(&format!("{SESSION_COOKIE}={}", ada.id)));

        let response = app
            .oneshot(
                Request::post("/login")
                    .header(header::CONTENT_TYPE, "application/x-www-form-urlencoded")
                    .body(Body::from("username=nobody"))
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn dashboard_lists_and_creates_devices() {
        let state = test_state();
        let ada = add_user(&state, "ada").await;
        add_device(&state, &ada, "Porch light", DeviceKind::Bulb).await;
        let app = build(state.clone());

        let response = app
            .clone()
            .oneshot(page("GET", "/devices", &ada, ""))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        let html = String::from_utf8(bytes.to_vec()).unwrap();
        assert!(html.contains("Porch light"));

        let response = app
            .clone()
            .oneshot(page(
                "POST",
                "/devices/new",
                &ada,
                "kind=thermostat&name=Hall&location=Hallway&secret_key=abc&target_temperature_c=19.5",
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::SEE_OTHER);

        let thermostats = state
            .device_service
            .list_by_kind(DeviceKind::Thermostat)
            .await
            .unwrap();
        assert_eq!(thermostats.len(), 1);
        let target = thermostats[0]
            .status
            .as_thermostat()
            .unwrap()
            .target_temperature_c;
        assert!((target - 19.5).abs() < f64::EPSILON);

        let response = app
            .oneshot(page(
                "POST",
                "/devices/new",
                &ada,
                "kind=thermostat&name=Broken&secret_key=abc&target_temperature_c=99",
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn dashboard_toggle_redirects_back() {
        let state = test_state();
        let ada = add_user(&state, "ada").await;
        let lamp = add_device(&state, &ada, "Lamp", DeviceKind::Bulb).await;
        let app = build(state.clone());

        let response = app
            .oneshot(page(
                "POST",
                &format!("/devices/{}/toggle", lamp.id),
                &ada,
                &format!("next=%2Fdevices%2F{}", lamp.id),
            ))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::SEE_OTHER);
        assert_eq!(
            response.headers()[header::LOCATION],
            format!("/devices/{}", lamp.id).as_str()
        );
        let lamp = state.device_service.get(lamp.id).await.unwrap();
        assert!(lamp.power.is_on());
    }
}
