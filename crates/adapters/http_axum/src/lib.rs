//! # smartcode-adapter-http-axum
//!
//! HTTP adapter built on [axum](https://docs.rs/axum).
//!
//! ## Responsibilities
//! - Serve a **JSON API** under `/api` for programmatic access
//!   (`/api/devices`, `/api/users`, `/api/schedules`, …)
//! - Serve a **server-side-rendered HTML dashboard** that works with
//!   **zero JavaScript**: pure HTML forms posting back to the server
//! - Identify the caller from the `X-User-Id` header or the session cookie
//! - Map application results into HTTP responses (JSON or HTML)
//!
//! ## No-JS dashboard approach
//! - Every page is rendered server-side as complete HTML.
//! - Interactive controls (toggle, share, schedule) are `<form>` elements
//!   that POST back to the server and redirect (PRG pattern).
//! - Pages behind login redirect to `/login` when there is no session.
//!
//! ## Dependency rule
//! Depends on `smartcode-app` (for port traits and services) and
//! `smartcode-domain` (for domain types used in request/response mapping).
//! Never leaks axum types into the domain.

pub mod api;
pub mod auth;
pub mod dashboard;
pub mod error;
pub mod router;
pub mod state;

pub use router::build;
pub use state::AppState;
