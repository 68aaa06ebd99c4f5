//! Dashboard pages for devices, their shares and their schedules.

use std::collections::HashMap;

use askama::Template;
use axum::extract::{Form, Path, Query, State};
use axum::http::{HeaderMap, StatusCode};
use axum::response::{IntoResponse, Redirect, Response};
use chrono::{NaiveDateTime, NaiveTime};
use serde::Deserialize;

use smartcode_app::ports::{DeviceRepository, ScheduleRepository, ShareRepository, UserRepository};
use smartcode_domain::device::{Device, DeviceKind, DeviceStatus, Power};
use smartcode_domain::error::{NotFoundError, SmartHomeError, ValidationError};
use smartcode_domain::id::{DeviceId, ScheduleId, UserId};
use smartcode_domain::schedule::{Schedule, ScheduleKind, SchedulePhase};
use smartcode_domain::share::DeviceShare;
use smartcode_domain::time::{Timestamp, now, parse_flexible, to_legacy};
use smartcode_domain::user::User;

use super::forms::{FormField, apply_status_form, refill, status_fields, text};
use super::{DashboardError, form_message, local_redirect, viewer};
use crate::error::parse_id;
use crate::state::AppState;

/// Format of `<input type="datetime-local">` values.
const DATETIME_INPUT: &str = "%Y-%m-%dT%H:%M";
/// Format of `<input type="time">` values.
const TIME_INPUT: &str = "%H:%M";

fn manages(device: &Device, user_id: UserId) -> bool {
    device.owner_id.is_none_or(|owner| owner == user_id)
}

fn device_url(id: DeviceId) -> String {
    format!("/devices/{id}")
}

/// One line of the device table.
pub struct DeviceRow {
    pub id: String,
    pub name: String,
    pub kind_name: &'static str,
    pub location: String,
    pub power_on: bool,
    pub connected: bool,
    /// Whether the viewer may edit, share and delete the device.
    pub managed: bool,
    pub summary: String,
}

impl DeviceRow {
    fn new(device: &Device, viewer: UserId) -> Self {
        Self {
            id: device.id.to_string(),
            name: device.name.clone(),
            kind_name: device.kind().display_name(),
            location: device.location.clone(),
            power_on: device.power.is_on(),
            connected: device.connected,
            managed: manages(device, viewer),
            summary: summary(&device.status),
        }
    }
}

fn summary(status: &DeviceStatus) -> String {
    match status {
        DeviceStatus::Bulb(bulb) => format!("{}% at {} K", bulb.brightness, bulb.color_temp),
        DeviceStatus::Plug(plug) => format!(
            "{:.1} W, {:.2} kWh",
            plug.current_power_w, plug.total_energy_kwh
        ),
        DeviceStatus::Thermostat(thermostat) => format!(
            "{:.1} °C, target {:.1} °C",
            thermostat.current_temperature_c, thermostat.target_temperature_c
        ),
        DeviceStatus::Curtain(curtain) => format!("{}% open", curtain.open_percent),
        DeviceStatus::WeatherStation(station) => format!(
            "{:.1} °C, {:.0}% humidity",
            station.temperature_c, station.humidity_percent
        ),
        DeviceStatus::LawnMower(mower) => {
            format!("battery {}%, {}", mower.battery_percent, mower.cutting_mode)
        }
    }
}

/// A device kind offered in the "add device" chooser.
pub struct KindChoice {
    pub value: &'static str,
    pub name: &'static str,
}

fn kind_choices() -> Vec<KindChoice> {
    DeviceKind::ALL
        .into_iter()
        .map(|kind| KindChoice {
            value: kind.as_str(),
            name: kind.display_name(),
        })
        .collect()
}

pub struct ShareRow {
    pub user_id: String,
    pub username: String,
    pub email: String,
    pub shared_at: String,
}

impl From<(DeviceShare, User)> for ShareRow {
    fn from((share, user): (DeviceShare, User)) -> Self {
        Self {
            user_id: user.id.to_string(),
            username: user.username,
            email: user.email.unwrap_or_default(),
            shared_at: to_legacy(share.shared_at),
        }
    }
}

pub struct ScheduleRow {
    pub id: String,
    pub description: String,
    pub phase: &'static str,
}

impl ScheduleRow {
    fn at(schedule: &Schedule, now: Timestamp) -> Self {
        let description = match schedule.kind {
            ScheduleKind::Window { start, end } => {
                format!("On {} until {}", to_legacy(start), to_legacy(end))
            }
            ScheduleKind::Daily {
                start,
                duration_minutes,
            } => format!(
                "Every day at {} UTC for {duration_minutes} min",
                start.format(TIME_INPUT)
            ),
        };
        let phase = match schedule.phase_at(now) {
            SchedulePhase::Pending => "pending",
            SchedulePhase::Active => "active",
            SchedulePhase::Inactive => "inactive",
            SchedulePhase::Expired => "expired",
        };
        Self {
            id: schedule.id.to_string(),
            description,
            phase,
        }
    }
}

/// Device list page template.
#[derive(Template)]
#[template(path = "device_list.html")]
pub struct DeviceListTemplate {
    nav_user: String,
    devices: Vec<DeviceRow>,
    kinds: Vec<KindChoice>,
}

/// Kind chooser shown before the creation form.
#[derive(Template)]
#[template(path = "device_kinds.html")]
pub struct DeviceKindsTemplate {
    nav_user: String,
    kinds: Vec<KindChoice>,
}

/// Device detail page template.
#[derive(Template)]
#[template(path = "device_detail.html")]
pub struct DeviceDetailTemplate {
    nav_user: String,
    viewer_id: String,
    device: DeviceRow,
    brand: String,
    model: String,
    last_updated: String,
    readings: Vec<FormField>,
    shares: Vec<ShareRow>,
    schedules: Vec<ScheduleRow>,
    error: String,
}

/// Create and edit form template.
#[derive(Template)]
#[template(path = "device_form.html")]
pub struct DeviceFormTemplate {
    nav_user: String,
    title: String,
    action: String,
    is_new: bool,
    kind_value: &'static str,
    kind_name: &'static str,
    name: String,
    location: String,
    brand: String,
    model: String,
    fields: Vec<FormField>,
    error: String,
}

html_page!(
    DeviceListTemplate,
    DeviceKindsTemplate,
    DeviceDetailTemplate,
    DeviceFormTemplate,
);

impl DeviceFormTemplate {
    fn blank(nav_user: String, kind: DeviceKind) -> Self {
        Self {
            nav_user,
            title: format!("New {}", kind.display_name()),
            action: "/devices/new".to_string(),
            is_new: true,
            kind_value: kind.as_str(),
            kind_name: kind.display_name(),
            name: String::new(),
            location: String::new(),
            brand: String::new(),
            model: String::new(),
            fields: status_fields(&DeviceStatus::default_for(kind)),
            error: String::new(),
        }
    }

    fn for_device(nav_user: String, device: &Device) -> Self {
        let kind = device.kind();
        Self {
            nav_user,
            title: format!("Edit {}", device.name),
            action: format!("{}/edit", device_url(device.id)),
            is_new: false,
            kind_value: kind.as_str(),
            kind_name: kind.display_name(),
            name: device.name.clone(),
            location: device.location.clone(),
            brand: device.brand.clone().unwrap_or_default(),
            model: device.model.clone().unwrap_or_default(),
            fields: status_fields(&device.status),
            error: String::new(),
        }
    }

    fn resubmitted(self, form: &HashMap<String, String>, error: String) -> Self {
        let submitted = |name: &str, current: String| form.get(name).cloned().unwrap_or(current);
        Self {
            name: submitted("name", self.name),
            location: submitted("location", self.location),
            brand: submitted("brand", self.brand),
            model: submitted("model", self.model),
            fields: refill(self.fields, form),
            error,
            ..self
        }
    }
}

fn new_device(
    owner: UserId,
    kind: DeviceKind,
    form: &HashMap<String, String>,
) -> Result<Device, SmartHomeError> {
    let secret_key = text(form, "secret_key").ok_or(ValidationError::EmptySecretKey)?;
    let status = apply_status_form(&DeviceStatus::default_for(kind), form)?;
    let mut builder = Device::builder()
        .name(text(form, "name").unwrap_or_default())
        .location(text(form, "location").unwrap_or_default())
        .secret_key(secret_key)
        .owner_id(owner)
        .status(status);
    if let Some(brand) = text(form, "brand") {
        builder = builder.brand(brand);
    }
    if let Some(model) = text(form, "model") {
        builder = builder.model(model);
    }
    builder.build()
}

fn apply_edit(device: &mut Device, form: &HashMap<String, String>) -> Result<(), SmartHomeError> {
    device.status = apply_status_form(&device.status, form)?;
    if let Some(name) = form.get("name") {
        device.name = name.trim().to_string();
    }
    if let Some(location) = form.get("location") {
        device.location = location.trim().to_string();
    }
    if form.contains_key("brand") {
        device.brand = text(form, "brand").map(String::from);
    }
    if form.contains_key("model") {
        device.model = text(form, "model").map(String::from);
    }
    Ok(())
}

fn schedule_minutes(form: &HashMap<String, String>) -> Result<u32, ValidationError> {
    text(form, "minutes")
        .and_then(|raw| raw.parse().ok())
        .ok_or(ValidationError::InvalidNumber { field: "minutes" })
}

fn schedule_instant(
    form: &HashMap<String, String>,
    field: &str,
) -> Result<Timestamp, ValidationError> {
    text(form, field)
        .and_then(|raw| {
            NaiveDateTime::parse_from_str(raw, DATETIME_INPUT)
                .map(|naive| naive.and_utc())
                .ok()
                .or_else(|| parse_flexible(raw))
        })
        .ok_or(ValidationError::InvalidTime)
}

fn schedule_from_form(
    device_id: DeviceId,
    form: &HashMap<String, String>,
    at: Timestamp,
) -> Result<Schedule, SmartHomeError> {
    match text(form, "mode").unwrap_or("duration") {
        "duration" => Schedule::for_duration(device_id, at, schedule_minutes(form)?),
        "window" => Schedule::window(
            device_id,
            schedule_instant(form, "start")?,
            schedule_instant(form, "end")?,
            at,
        ),
        "daily" => {
            let start = text(form, "time")
                .and_then(|raw| NaiveTime::parse_from_str(raw, TIME_INPUT).ok())
                .ok_or(ValidationError::InvalidTime)?;
            Schedule::daily(device_id, start, schedule_minutes(form)?, at)
        }
        _ => Err(ValidationError::InvalidTime.into()),
    }
}

async fn detail_page<D, U, S, C>(
    state: &AppState<D, U, S, C>,
    user: User,
    device_id: DeviceId,
    error: String,
) -> Result<DeviceDetailTemplate, DashboardError>
where
    D: DeviceRepository + Send + Sync + 'static,
    U: UserRepository + Send + Sync + 'static,
    S: ShareRepository + Send + Sync + 'static,
    C: ScheduleRepository + Send + Sync + 'static,
{
    let device = state
        .access_service
        .accessible_device(user.id, device_id)
        .await?;
    let shares = if manages(&device, user.id) {
        state
            .access_service
            .shares_for_device(user.id, device_id)
            .await?
            .into_iter()
            .map(ShareRow::from)
            .collect()
    } else {
        Vec::new()
    };
    let at = now();
    let schedules = state
        .schedule_service
        .list_for_device(device_id)
        .await?
        .iter()
        .map(|schedule| ScheduleRow::at(schedule, at))
        .collect();

    Ok(DeviceDetailTemplate {
        viewer_id: user.id.to_string(),
        device: DeviceRow::new(&device, user.id),
        brand: device.brand.clone().unwrap_or_default(),
        model: device.model.clone().unwrap_or_default(),
        last_updated: to_legacy(device.last_updated),
        readings: status_fields(&device.status),
        shares,
        schedules,
        error,
        nav_user: user.username,
    })
}

/// `GET /devices`: devices the viewer owns or has been shared.
pub async fn list<D, U, S, C>(
    State(state): State<AppState<D, U, S, C>>,
    headers: HeaderMap,
) -> Result<DeviceListTemplate, DashboardError>
where
    D: DeviceRepository + Send + Sync + 'static,
    U: UserRepository + Send + Sync + 'static,
    S: ShareRepository + Send + Sync + 'static,
    C: ScheduleRepository + Send + Sync + 'static,
{
    let user = viewer(&state, &headers).await?;
    let devices = state
        .access_service
        .accessible_devices(user.id)
        .await?
        .iter()
        .map(|device| DeviceRow::new(device, user.id))
        .collect();
    Ok(DeviceListTemplate {
        nav_user: user.username,
        devices,
        kinds: kind_choices(),
    })
}

#[derive(Deserialize)]
pub struct NewDeviceQuery {
    pub kind: Option<String>,
}

/// `GET /devices/new`: kind chooser, or the form for `?kind=`.
pub async fn new_page<D, U, S, C>(
    State(state): State<AppState<D, U, S, C>>,
    headers: HeaderMap,
    Query(query): Query<NewDeviceQuery>,
) -> Result<Response, DashboardError>
where
    D: DeviceRepository + Send + Sync + 'static,
    U: UserRepository + Send + Sync + 'static,
    S: ShareRepository + Send + Sync + 'static,
    C: ScheduleRepository + Send + Sync + 'static,
{
    let user = viewer(&state, &headers).await?;
    match query.kind.filter(|kind| !kind.is_empty()) {
        Some(kind) => {
            let kind: DeviceKind = kind.parse()?;
            Ok(DeviceFormTemplate::blank(user.username, kind).into_response())
        }
        None => Ok(DeviceKindsTemplate {
            nav_user: user.username,
            kinds: kind_choices(),
        }
        .into_response()),
    }
}

/// `POST /devices/new`
pub async fn create<D, U, S, C>(
    State(state): State<AppState<D, U, S, C>>,
    headers: HeaderMap,
    Form(form): Form<HashMap<String, String>>,
) -> Result<Response, DashboardError>
where
    D: DeviceRepository + Send + Sync + 'static,
    U: UserRepository + Send + Sync + 'static,
    S: ShareRepository + Send + Sync + 'static,
    C: ScheduleRepository + Send + Sync + 'static,
{
    let user = viewer(&state, &headers).await?;
    let kind: DeviceKind = text(&form, "kind").unwrap_or_default().parse()?;

    let created = match new_device(user.id, kind, &form) {
        Ok(device) => state.device_service.create(device).await,
        Err(err) => Err(err),
    };
    match created {
        Ok(device) => Ok(Redirect::to(&device_url(device.id)).into_response()),
        Err(err) => {
            let page = DeviceFormTemplate::blank(user.username, kind)
                .resubmitted(&form, form_message(err)?);
            Ok((StatusCode::BAD_REQUEST, page).into_response())
        }
    }
}

/// `GET /devices/{id}`
pub async fn detail<D, U, S, C>(
    State(state): State<AppState<D, U, S, C>>,
    headers: HeaderMap,
    Path(id): Path<String>,
) -> Result<DeviceDetailTemplate, DashboardError>
where
    D: DeviceRepository + Send + Sync + 'static,
    U: UserRepository + Send + Sync + 'static,
    S: ShareRepository + Send + Sync + 'static,
    C: ScheduleRepository + Send + Sync + 'static,
{
    let user = viewer(&state, &headers).await?;
    let device_id: DeviceId = parse_id(&id)?;
    detail_page(&state, user, device_id, String::new()).await
}

/// `GET /devices/{id}/edit`: owner only.
pub async fn edit_page<D, U, S, C>(
    State(state): State<AppState<D, U, S, C>>,
    headers: HeaderMap,
    Path(id): Path<String>,
) -> Result<DeviceFormTemplate, DashboardError>
where
    D: DeviceRepository + Send + Sync + 'static,
    U: UserRepository + Send + Sync + 'static,
    S: ShareRepository + Send + Sync + 'static,
    C: ScheduleRepository + Send + Sync + 'static,
{
    let user = viewer(&state, &headers).await?;
    let device_id: DeviceId = parse_id(&id)?;
    let device = state
        .access_service
        .owned_device(user.id, device_id)
        .await?;
    Ok(DeviceFormTemplate::for_device(user.username, &device))
}

/// `POST /devices/{id}/edit`
pub async fn update<D, U, S, C>(
    State(state): State<AppState<D, U, S, C>>,
    headers: HeaderMap,
    Path(id): Path<String>,
    Form(form): Form<HashMap<String, String>>,
) -> Result<Response, DashboardError>
where
    D: DeviceRepository + Send + Sync + 'static,
    U: UserRepository + Send + Sync + 'static,
    S: ShareRepository + Send + Sync + 'static,
    C: ScheduleRepository + Send + Sync + 'static,
{
    let user = viewer(&state, &headers).await?;
    let device_id: DeviceId = parse_id(&id)?;
    let mut device = state
        .access_service
        .owned_device(user.id, device_id)
        .await?;
    let page = DeviceFormTemplate::for_device(user.username, &device);

    let updated = match apply_edit(&mut device, &form) {
        Ok(()) => state.device_service.update(device).await,
        Err(err) => Err(err),
    };
    match updated {
        Ok(device) => Ok(Redirect::to(&device_url(device.id)).into_response()),
        Err(err) => {
            let page = page.resubmitted(&form, form_message(err)?);
            Ok((StatusCode::BAD_REQUEST, page).into_response())
        }
    }
}

/// `POST /devices/{id}/delete`: owner only; drops shares and schedules too.
pub async fn delete<D, U, S, C>(
    State(state): State<AppState<D, U, S, C>>,
    headers: HeaderMap,
    Path(id): Path<String>,
) -> Result<Redirect, DashboardError>
where
    D: DeviceRepository + Send + Sync + 'static,
    U: UserRepository + Send + Sync + 'static,
    S: ShareRepository + Send + Sync + 'static,
    C: ScheduleRepository + Send + Sync + 'static,
{
    let user = viewer(&state, &headers).await?;
    let device_id: DeviceId = parse_id(&id)?;
    state
        .access_service
        .owned_device(user.id, device_id)
        .await?;
    state.remove_device(device_id).await?;
    Ok(Redirect::to("/devices"))
}

/// Hidden field telling a button where to go afterwards.
#[derive(Deserialize)]
pub struct NextForm {
    pub next: Option<String>,
}

/// `POST /devices/{id}/toggle`
pub async fn toggle<D, U, S, C>(
    State(state): State<AppState<D, U, S, C>>,
    headers: HeaderMap,
    Path(id): Path<String>,
    Form(form): Form<NextForm>,
) -> Result<Redirect, DashboardError>
where
    D: DeviceRepository + Send + Sync + 'static,
    U: UserRepository + Send + Sync + 'static,
    S: ShareRepository + Send + Sync + 'static,
    C: ScheduleRepository + Send + Sync + 'static,
{
    let user = viewer(&state, &headers).await?;
    let device_id: DeviceId = parse_id(&id)?;
    state
        .access_service
        .accessible_device(user.id, device_id)
        .await?;
    state.device_service.toggle(device_id).await?;
    Ok(local_redirect(form.next.as_deref(), "/devices"))
}

#[derive(Deserialize)]
pub struct GroupPowerForm {
    /// Empty for every kind.
    #[serde(default)]
    pub kind: String,
    pub power: String,
}

/// `POST /devices/power`: switch all visible devices of a kind.
pub async fn group_power<D, U, S, C>(
    State(state): State<AppState<D, U, S, C>>,
    headers: HeaderMap,
    Form(form): Form<GroupPowerForm>,
) -> Result<Redirect, DashboardError>
where
    D: DeviceRepository + Send + Sync + 'static,
    U: UserRepository + Send + Sync + 'static,
    S: ShareRepository + Send + Sync + 'static,
    C: ScheduleRepository + Send + Sync + 'static,
{
    let user = viewer(&state, &headers).await?;
    let power: Power = form.power.parse()?;
    let kind = if form.kind.is_empty() {
        None
    } else {
        Some(form.kind.parse::<DeviceKind>()?)
    };
    let ids: Vec<DeviceId> = state
        .access_service
        .accessible_devices(user.id)
        .await?
        .into_iter()
        .filter(|device| kind.is_none_or(|kind| device.kind() == kind))
        .map(|device| device.id)
        .collect();
    let changed = state.device_service.set_power_all(&ids, power).await?;
    tracing::debug!(count = changed.len(), %power, "group switch from dashboard");
    Ok(Redirect::to("/devices"))
}

#[derive(Deserialize)]
pub struct ShareForm {
    pub email: String,
}

/// `POST /devices/{id}/shares`: owner only.
pub async fn share<D, U, S, C>(
    State(state): State<AppState<D, U, S, C>>,
    headers: HeaderMap,
    Path(id): Path<String>,
    Form(form): Form<ShareForm>,
) -> Result<Response, DashboardError>
where
    D: DeviceRepository + Send + Sync + 'static,
    U: UserRepository + Send + Sync + 'static,
    S: ShareRepository + Send + Sync + 'static,
    C: ScheduleRepository + Send + Sync + 'static,
{
    let user = viewer(&state, &headers).await?;
    let device_id: DeviceId = parse_id(&id)?;
    match state
        .access_service
        .share_device(user.id, device_id, &form.email)
        .await
    {
        Ok(_) => Ok(Redirect::to(&device_url(device_id)).into_response()),
        Err(err) => {
            let error = form_message(err)?;
            let page = detail_page(&state, user, device_id, error).await?;
            Ok((StatusCode::BAD_REQUEST, page).into_response())
        }
    }
}

/// `POST /devices/{id}/shares/{user_id}/delete`
pub async fn unshare<D, U, S, C>(
    State(state): State<AppState<D, U, S, C>>,
    headers: HeaderMap,
    Path((id, user_id)): Path<(String, String)>,
) -> Result<Redirect, DashboardError>
where
    D: DeviceRepository + Send + Sync + 'static,
    U: UserRepository + Send + Sync + 'static,
    S: ShareRepository + Send + Sync + 'static,
    C: ScheduleRepository + Send + Sync + 'static,
{
    let user = viewer(&state, &headers).await?;
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
    if target == user.id {
        Ok(Redirect::to("/devices"))
    } else {
        Ok(Redirect::to(&device_url(device_id)))
    }
}

/// `POST /devices/{id}/schedules`: one form per schedule mode
/// (`duration`, `window` or `daily`).
pub async fn add_schedule<D, U, S, C>(
    State(state): State<AppState<D, U, S, C>>,
    headers: HeaderMap,
    Path(id): Path<String>,
    Form(form): Form<HashMap<String, String>>,
) -> Result<Response, DashboardError>
where
    D: DeviceRepository + Send + Sync + 'static,
    U: UserRepository + Send + Sync + 'static,
    S: ShareRepository + Send + Sync + 'static,
    C: ScheduleRepository + Send + Sync + 'static,
{
    let user = viewer(&state, &headers).await?;
    let device_id: DeviceId = parse_id(&id)?;
    state
        .access_service
        .accessible_device(user.id, device_id)
        .await?;

    let added = match schedule_from_form(device_id, &form, now()) {
        Ok(schedule) => state.schedule_service.add(schedule).await,
        Err(err) => Err(err),
    };
    match added {
        Ok(_) => Ok(Redirect::to(&device_url(device_id)).into_response()),
        Err(err) => {
            let error = form_message(err)?;
            let page = detail_page(&state, user, device_id, error).await?;
            Ok((StatusCode::BAD_REQUEST, page).into_response())
        }
    }
}

/// `POST /schedules/{id}/delete`
pub async fn delete_schedule<D, U, S, C>(
    State(state): State<AppState<D, U, S, C>>,
    headers: HeaderMap,
    Path(id): Path<String>,
) -> Result<Redirect, DashboardError>
where
    D: DeviceRepository + Send + Sync + 'static,
    U: UserRepository + Send + Sync + 'static,
    S: ShareRepository + Send + Sync + 'static,
    C: ScheduleRepository + Send + Sync + 'static,
{
    let user = viewer(&state, &headers).await?;
    let schedule_id: ScheduleId = parse_id(&id)?;
    let schedule = state.schedule_service.get(schedule_id).await?;
    state
        .access_service
        .accessible_device(user.id, schedule.device_id)
        .await?;
    state.schedule_service.delete(schedule_id).await?;
    Ok(Redirect::to(&device_url(schedule.device_id)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};

    fn form(pairs: &[(&str, &str)]) -> HashMap<String, String> {
        pairs
            .iter()
            .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
            .collect()
    }

    #[test]
    fn should_require_secret_key_for_new_device() {
        let err = new_device(
            UserId::new(),
            DeviceKind::Bulb,
            &form(&[("name", "Lamp"), ("secret_key", "  ")]),
        )
        .unwrap_err();
        assert!(matches!(
            err,
            SmartHomeError::Validation(ValidationError::EmptySecretKey)
        ));
    }

    #[test]
    fn should_build_new_device_from_form() {
        let owner = UserId::new();
        let device = new_device(
            owner,
            DeviceKind::Curtain,
            &form(&[
                ("name", "Blinds"),
                ("location", "Office"),
                ("secret_key", "abc"),
                ("brand", ""),
                ("open_percent", "30"),
            ]),
        )
        .unwrap();

        assert_eq!(device.kind(), DeviceKind::Curtain);
        assert_eq!(device.owner_id, Some(owner));
        assert_eq!(device.brand, None);
        assert_eq!(device.status.as_curtain().unwrap().open_percent, 30);
    }

    #[test]
    fn should_parse_each_schedule_mode() {
        let device_id = DeviceId::new();
        let at = Utc.with_ymd_and_hms(2024, 5, 1, 8, 0, 0).unwrap();

        let duration =
            schedule_from_form(device_id, &form(&[("mode", "duration"), ("minutes", "30")]), at)
                .unwrap();
        assert_eq!(duration.phase_at(at), SchedulePhase::Active);

        let window = schedule_from_form(
            device_id,
            &form(&[
                ("mode", "window"),
                ("start", "2024-05-01T09:00"),
                ("end", "2024-05-01T10:30"),
            ]),
            at,
        )
        .unwrap();
        assert_eq!(window.phase_at(at), SchedulePhase::Pending);

        let daily = schedule_from_form(
            device_id,
            &form(&[("mode", "daily"), ("time", "07:30"), ("minutes", "60")]),
            at,
        )
        .unwrap();
        assert!(matches!(daily.kind, ScheduleKind::Daily { .. }));
    }

    #[test]
    fn should_reject_bad_schedule_input() {
        let device_id = DeviceId::new();
        let at = Utc.with_ymd_and_hms(2024, 5, 1, 8, 0, 0).unwrap();

        let err = schedule_from_form(device_id, &form(&[("minutes", "soon")]), at).unwrap_err();
        assert!(matches!(
            err,
            SmartHomeError::Validation(ValidationError::InvalidNumber { field: "minutes" })
        ));

        let err = schedule_from_form(
            device_id,
            &form(&[("mode", "window"), ("start", "tomorrow"), ("end", "")]),
            at,
        )
        .unwrap_err();
        assert!(matches!(
            err,
            SmartHomeError::Validation(ValidationError::InvalidTime)
        ));
    }

    #[test]
    fn should_summarise_status() {
        assert_eq!(
            summary(&DeviceStatus::default_for(DeviceKind::Bulb)),
            "100% at 2700 K"
        );
        assert_eq!(
            summary(&DeviceStatus::default_for(DeviceKind::LawnMower)),
            "battery 100%, auto"
        );
    }
}
