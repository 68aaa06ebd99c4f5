//! End-to-end smoke tests for the full smartcoded stack.
//!
//! Each test spins up the complete application (real storage, real repos,
//! real services, real axum router) and exercises the HTTP layer via
//! `tower::ServiceExt::oneshot` — no TCP port is bound.

use std::path::Path;
use std::sync::Arc;

use axum::body::Body;
use axum::http::{Request, StatusCode, header};
use http_body_util::BodyExt;
use serde_json::{Value, json};
use smartcode_adapter_http_axum::AppState;
use smartcode_adapter_storage_json::JsonStore;
use smartcode_adapter_storage_sqlite_sqlx::{
    Config, SqliteDeviceRepository, SqliteScheduleRepository, SqliteShareRepository,
    SqliteUserRepository,
};
use tower::ServiceExt;

/// Build a fully-wired router backed by an in-memory `SQLite` database.
async fn sqlite_app() -> axum::Router {
    let db = Config {
        database_url: "sqlite::memory:".to_string(),
    }
    .build()
    .await
    .expect("in-memory database should initialise");
    let pool = db.pool().clone();

    let state = AppState::new(
        Arc::new(SqliteDeviceRepository::new(pool.clone())),
        Arc::new(SqliteUserRepository::new(pool.clone())),
        SqliteShareRepository::new(pool.clone()),
        SqliteScheduleRepository::new(pool),
    );
    smartcode_adapter_http_axum::build(state)
}

/// Build a router over a JSON store in `dir`.
async fn json_app(dir: &Path) -> axum::Router {
    let store = JsonStore::open(dir).await.expect("json store should open");
    let state = AppState::new(
        Arc::new(store.devices),
        Arc::new(store.users),
        store.shares,
        store.schedules,
    );
    smartcode_adapter_http_axum::build(state)
}

async fn send(app: &axum::Router, request: Request<Body>) -> (StatusCode, Value) {
    let resp = app.clone().oneshot(request).await.unwrap();
    let status = resp.status();
    let bytes = resp.into_body().collect().await.unwrap().to_bytes();
    (status, serde_json::from_slice(&bytes).unwrap_or(Value::Null))
}

fn json_request(method: &str, uri: &str, user: Option<&str>, body: &Value) -> Request<Body> {
    let mut builder = Request::builder()
        .method(method)
        .uri(uri)
        .header(header::CONTENT_TYPE, "application/json");
    if let Some(user) = user {
        builder = builder.header("x-user-id", user);
    }
    builder.body(Body::from(body.to_string())).unwrap()
}

fn get(uri: &str, user: &str) -> Request<Body> {
    Request::builder()
        .uri(uri)
        .header("x-user-id", user)
        .body(Body::empty())
        .unwrap()
}

async fn register(app: &axum::Router, username: &str) -> String {
    let (status, body) = send(
        app,
        json_request(
            "POST",
            "/api/users",
            None,
            &json!({"username": username, "email": format!("{username}@example.com")}),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    body["id"].as_str().unwrap().to_string()
}

async fn create_device(app: &axum::Router, user: &str, name: &str, kind: &str) -> String {
    let (status, body) = send(
        app,
        json_request(
            "POST",
            "/api/devices",
            Some(user),
            &json!({"name": name, "kind": kind, "location": "Hall", "secret_key": "s3cret"}),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    body["id"].as_str().unwrap().to_string()
}

// ---------------------------------------------------------------------------
// Health check
// ---------------------------------------------------------------------------

#[tokio::test]
async fn should_return_ok_when_health_check_called() {
    let resp = sqlite_app()
        .await
        .oneshot(Request::builder().uri("/health").body(Body::empty()).unwrap())
        .await
        .unwrap();

    assert_eq!(resp.status(), StatusCode::OK);
}

// ---------------------------------------------------------------------------
// JSON API over SQLite
// ---------------------------------------------------------------------------

#[tokio::test]
async fn should_register_and_fetch_current_user() {
    let app = sqlite_app().await;
    let ada = register(&app, "ada").await;

    let (status, me) = send(&app, get("/api/users/me", &ada)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(me["username"], "ada");

    let (status, _) = send(
        &app,
        json_request("POST", "/api/users", None, &json!({"username": "ada"})),
    )
    .await;
    assert_eq!(status, StatusCode::CONFLICT);
}

#[tokio::test]
async fn should_control_device_end_to_end() {
    let app = sqlite_app().await;
    let ada = register(&app, "ada").await;
    let lamp = create_device(&app, &ada, "Desk lamp", "bulb").await;

    let (status, device) = send(
        &app,
        json_request(
            "POST",
            &format!("/api/devices/{lamp}/power"),
            Some(&ada),
            &json!({"power": "on"}),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(device["power"], "on");

    let status_uri = format!("/api/devices/{lamp}/status");
    let (status, _) = send(&app, get(&status_uri, &ada)).await;
    assert_eq!(status, StatusCode::CONFLICT);

    let (status, device) = send(
        &app,
        json_request(
            "POST",
            &format!("/api/devices/{lamp}/connect"),
            Some(&ada),
            &json!({"kind": "bulb"}),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(device["connected"], true);

    let (status, status_block) = send(&app, get(&status_uri, &ada)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(status_block["kind"], "bulb");
    assert_eq!(status_block["brightness"], 100);

    let (status, _) = send(
        &app,
        Request::builder()
            .method("DELETE")
            .uri(format!("/api/devices/{lamp}"))
            .header("x-user-id", &ada)
            .body(Body::empty())
            .unwrap(),
    )
    .await;
    assert_eq!(status, StatusCode::NO_CONTENT);

    let (_, devices) = send(&app, get("/api/devices", &ada)).await;
    assert_eq!(devices.as_array().unwrap().len(), 0);
}

#[tokio::test]
async fn should_share_device_between_users() {
    let app = sqlite_app().await;
    let ada = register(&app, "ada").await;
    let bob = register(&app, "bob").await;
    let plug = create_device(&app, &ada, "Kettle", "plug").await;

    let (_, before) = send(&app, get("/api/devices", &bob)).await;
    assert_eq!(before.as_array().unwrap().len(), 0);

    let (status, _) = send(
        &app,
        json_request(
            "POST",
            &format!("/api/devices/{plug}/shares"),
            Some(&ada),
            &json!({"email": "bob@example.com"}),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);

    let (_, after) = send(&app, get("/api/devices", &bob)).await;
    assert_eq!(after.as_array().unwrap().len(), 1);
}

#[tokio::test]
async fn should_apply_duration_schedule() {
    let app = sqlite_app().await;
    let ada = register(&app, "ada").await;
    let fan = create_device(&app, &ada, "Fan", "plug").await;

    let (status, _) = send(
        &app,
        json_request(
            "POST",
            &format!("/api/devices/{fan}/schedules"),
            Some(&ada),
            &json!({"type": "duration", "minutes": 15}),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);

    let (status, report) = send(
        &app,
        json_request("POST", "/api/schedules/check", Some(&ada), &json!({})),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(report["turned_on"][0], fan.as_str());
}

// ---------------------------------------------------------------------------
// Dashboard (SSR) pages
// ---------------------------------------------------------------------------

#[tokio::test]
async fn should_redirect_anonymous_dashboard_visitor_to_login() {
    let resp = sqlite_app()
        .await
        .oneshot(Request::builder().uri("/devices").body(Body::empty()).unwrap())
        .await
        .unwrap();

    assert_eq!(resp.status(), StatusCode::SEE_OTHER);
    assert_eq!(resp.headers()[header::LOCATION], "/login");
}

#[tokio::test]
async fn should_render_device_list_after_login() {
    let app = sqlite_app().await;
    let ada = register(&app, "ada").await;
    create_device(&app, &ada, "Porch light", "bulb").await;

    let resp = app
        .clone()
        .oneshot(
            Request::builder()
                .method("POST")
                .uri("/login")
                .header(header::CONTENT_TYPE, "application/x-www-form-urlencoded")
                .body(Body::from("username=ada"))
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::SEE_OTHER);
    let cookie = resp.headers()[header::SET_COOKIE]
        .to_str()
        .unwrap()
        .split(';')
        .next()
        .unwrap()
        .to_string();

    let resp = app
        .oneshot(
            Request::builder()
                .uri("/devices")
                .header(header::COOKIE, cookie)
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
    let body = String::from_utf8(resp.into_body().collect().await.unwrap().to_bytes().to_vec())
        .unwrap();
    assert!(body.contains("Porch light"));
}

// ---------------------------------------------------------------------------
// JSON file storage
// ---------------------------------------------------------------------------

#[tokio::test]
async fn should_persist_devices_across_json_store_reopen() {
    let dir = tempfile::tempdir().unwrap();

    let app = json_app(dir.path()).await;
    let ada = register(&app, "ada").await;
    let lamp = create_device(&app, &ada, "Lamp", "bulb").await;
    drop(app);

    let app = json_app(dir.path()).await;
    let (status, device) = send(&app, get(&format!("/api/devices/{lamp}"), &ada)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(device["name"], "Lamp");
}
