//! Web server module for pingboard.
//!
//! Serves the HTMX-powered dashboard, a JSON API over the monitor, and CSV
//! export downloads.

use std::str::FromStr;
use std::sync::Arc;

use askama::Template;
use axum::{
    Form, Json, Router,
    body::Bytes,
    extract::{Query, State},
    http::{StatusCode, header},
    response::{Html, IntoResponse, Response},
    routing::{get, post, put},
};
use chrono::{DateTime, Local, Utc};
use serde::{Deserialize, Serialize};
use tower_http::{
    cors::CorsLayer,
    trace::{DefaultMakeSpan, TraceLayer},
};

use crate::config::{coerce_interval_secs, parse_targets};
use crate::export::CSV_CONTENT_TYPE;
use crate::monitor::{
    LogEntry, MonitorError, MonitorHandle, ProbeStatus, SettingsPatch, Snapshot, TimeMode,
};

/// Shared application state.
#[derive(Clone)]
pub struct AppState {
    pub monitor: MonitorHandle,
}

/// Health check response.
#[derive(Serialize)]
struct HealthResponse {
    status: String,
}

/// JSON error body.
#[derive(Serialize)]
struct ErrorBody {
    error: String,
}

/// API error mapped to a status code.
#[derive(Debug)]
enum ApiError {
    Monitor(MonitorError),
    BadRequest(String),
}

impl From<MonitorError> for ApiError {
    fn from(err: MonitorError) -> Self {
        Self::Monitor(err)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, error) = match self {
            Self::Monitor(err) => {
                let status = if err.is_validation() {
                    StatusCode::BAD_REQUEST
                } else if err.is_conflict() {
                    StatusCode::CONFLICT
                } else {
                    tracing::error!(error = %err, "Monitor unavailable");
                    StatusCode::SERVICE_UNAVAILABLE
                };
                (status, err.to_string())
            }
            Self::BadRequest(msg) => (StatusCode::BAD_REQUEST, msg),
        };
        (status, Json(ErrorBody { error })).into_response()
    }
}

/// Query parameters for the export API.
#[derive(Debug, Deserialize)]
pub struct ExportParams {
    pub mode: Option<String>,
}

/// Start form submitted by the dashboard.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct StartForm {
    pub targets: String,
    pub interval: String,
    pub time_mode: Option<String>,
}

/// Time mode form submitted by the dashboard.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct TimeModeForm {
    pub time_mode: String,
    /// Unsaved targets from the enclosing start form.
    pub targets: Option<String>,
    /// Unsaved interval from the enclosing start form.
    pub interval: Option<String>,
}

fn parse_time_mode(s: &str) -> Result<TimeMode, ApiError> {
    TimeMode::from_str(s.trim())
        .map_err(|_| ApiError::BadRequest(format!("invalid time mode '{}'", s)))
}

/// Parse an optional JSON settings patch; an empty body is an empty patch.
fn parse_patch(body: &Bytes) -> Result<SettingsPatch, ApiError> {
    if body.iter().all(u8::is_ascii_whitespace) {
        return Ok(SettingsPatch::default());
    }
    serde_json::from_slice(body).map_err(|e| ApiError::BadRequest(format!("invalid body: {}", e)))
}

// =============================================================================
// Templates
// =============================================================================

/// Dashboard template.
#[derive(Template)]
#[template(path = "dashboard.html")]
struct DashboardTemplate;

/// Controls partial template.
#[derive(Template)]
#[template(path = "partials/controls.html")]
struct ControlsTemplate {
    running: bool,
    targets_text: String,
    interval_text: String,
    local_selected: bool,
    can_configure: bool,
    can_clear: bool,
    can_export: bool,
    cycles: u64,
    pending: usize,
    entry_count: usize,
    flash: Option<String>,
}

impl ControlsTemplate {
    fn new(snapshot: &Snapshot, flash: Option<String>) -> Self {
        Self {
            running: snapshot.is_running(),
            targets_text: snapshot.settings.targets.join("\n"),
            interval_text: snapshot.settings.interval.as_secs().to_string(),
            local_selected: snapshot.settings.time_mode == TimeMode::Local,
            can_configure: snapshot.can_configure(),
            can_clear: snapshot.can_clear(),
            can_export: snapshot.can_export(),
            cycles: snapshot.cycles,
            pending: snapshot.pending,
            entry_count: snapshot.entries.len(),
            flash,
        }
    }

    /// Keep the user's unsaved form edits while the fields are editable.
    fn with_draft(mut self, targets: Option<String>, interval: Option<String>) -> Self {
        if self.can_configure {
            if let Some(targets) = targets {
                self.targets_text = targets;
            }
            if let Some(interval) = interval {
                self.interval_text = interval;
            }
        }
        self
    }
}

/// One rendered table row.
struct LogRow {
    time: String,
    target: String,
    latency: String,
    status: &'static str,
    status_class: &'static str,
}

impl LogRow {
    fn new(entry: &LogEntry, mode: TimeMode) -> Self {
        let (status, status_class) = match entry.status {
            ProbeStatus::Pending => ("Pinging...", "pending"),
            ProbeStatus::Success => ("Success", "success"),
            ProbeStatus::Failure => ("Failure", "failure"),
        };
        Self {
            time: format_time_of_day(&entry.timestamp, mode),
            target: entry.target.clone(),
            latency: entry
                .latency_ms
                .map(|ms| format!("{} ms", ms))
                .unwrap_or_else(|| "-".to_string()),
            status,
            status_class,
        }
    }
}

/// Log table partial template.
#[derive(Template)]
#[template(path = "partials/logs.html")]
struct LogsTemplate {
    mode_label: &'static str,
    rows: Vec<LogRow>,
}

impl LogsTemplate {
    fn new(snapshot: &Snapshot) -> Self {
        let mode = snapshot.settings.time_mode;
        Self {
            mode_label: mode.label(),
            rows: snapshot.entries.iter().map(|e| LogRow::new(e, mode)).collect(),
        }
    }
}

/// Time of day shown in the log table.
fn format_time_of_day(ts: &DateTime<Utc>, mode: TimeMode) -> String {
    match mode {
        TimeMode::Local => ts.with_timezone(&Local).format("%-I:%M:%S %p").to_string(),
        TimeMode::Utc => ts.format("%H:%M:%S UTC").to_string(),
    }
}

/// Wrapper to render Askama templates as Axum responses.
struct HtmlTemplate<T>(T);

impl<T> IntoResponse for HtmlTemplate<T>
where
    T: Template,
{
    fn into_response(self) -> Response {
        match self.0.render() {
            Ok(rendered) => Html(rendered).into_response(),
            Err(err) => {
                tracing::error!(error = %err, "Template render failed");
                StatusCode::INTERNAL_SERVER_ERROR.into_response()
            }
        }
    }
}

// =============================================================================
// Router
// =============================================================================

/// Create the Axum router with all routes.
pub fn create_router(state: AppState) -> Router {
    let app_state = Arc::new(state);

    Router::new()
        .route("/", get(dashboard_handler))
        .route("/healthz", get(healthz_handler))
        .route("/ui/controls", get(controls_handler))
        .route("/ui/logs", get(logs_handler))
        .route("/ui/start", post(ui_start_handler))
        .route("/ui/stop", post(ui_stop_handler))
        .route("/ui/clear", post(ui_clear_handler))
        .route("/ui/time-mode", post(ui_time_mode_handler))
        .route("/api/state", get(state_handler))
        .route("/api/start", post(start_handler))
        .route("/api/stop", post(stop_handler))
        .route("/api/clear", post(clear_handler))
        .route("/api/settings", put(settings_handler))
        .route("/api/export", get(export_handler))
        .layer(
            TraceLayer::new_for_http()
                .make_span_with(DefaultMakeSpan::default().include_headers(true)),
        )
        .layer(CorsLayer::permissive())
        .with_state(app_state)
}

/// Dashboard homepage handler.
async fn dashboard_handler() -> impl IntoResponse {
    HtmlTemplate(DashboardTemplate)
}

/// Liveness probe.
async fn healthz_handler() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok".to_string(),
    })
}

// =============================================================================
// HTMX partials
// =============================================================================

/// Render the controls partial, optionally with a flash message.
async fn render_controls(state: &AppState, flash: Option<String>) -> Response {
    match state.monitor.snapshot().await {
        Ok(snapshot) => HtmlTemplate(ControlsTemplate::new(&snapshot, flash)).into_response(),
        Err(e) => ApiError::from(e).into_response(),
    }
}

/// Render the controls after an action, turning a rejection into a flash.
async fn controls_after(state: &AppState, result: Result<(), MonitorError>) -> Response {
    match result {
        Ok(()) => render_controls(state, None).await,
        Err(e @ MonitorError::ChannelClosed) => ApiError::from(e).into_response(),
        Err(e) => render_controls(state, Some(e.to_string())).await,
    }
}

async fn controls_handler(State(state): State<Arc<AppState>>) -> Response {
    render_controls(&state, None).await
}

async fn logs_handler(State(state): State<Arc<AppState>>) -> Response {
    match state.monitor.snapshot().await {
        Ok(snapshot) => HtmlTemplate(LogsTemplate::new(&snapshot)).into_response(),
        Err(e) => ApiError::from(e).into_response(),
    }
}

async fn ui_start_handler(
    State(state): State<Arc<AppState>>,
    Form(form): Form<StartForm>,
) -> Response {
    let mut patch = SettingsPatch::default()
        .with_targets(parse_targets(&form.targets))
        .with_interval(coerce_interval_secs(&form.interval));
    if let Some(mode) = form.time_mode.as_deref().and_then(|m| TimeMode::from_str(m).ok()) {
        patch = patch.with_time_mode(mode);
    }

    let result = state.monitor.start(patch).await;
    controls_after(&state, result).await
}

async fn ui_stop_handler(State(state): State<Arc<AppState>>) -> Response {
    let result = state.monitor.stop().await;
    controls_after(&state, result).await
}

async fn ui_clear_handler(State(state): State<Arc<AppState>>) -> Response {
    let result = state.monitor.clear().await;
    controls_after(&state, result).await
}

async fn ui_time_mode_handler(
    State(state): State<Arc<AppState>>,
    Form(form): Form<TimeModeForm>,
) -> Response {
    let TimeModeForm { time_mode, targets, interval } = form;
    let flash = match TimeMode::from_str(time_mode.trim()) {
        Ok(mode) => match state
            .monitor
            .configure(SettingsPatch::default().with_time_mode(mode))
            .await
        {
            Ok(()) => None,
            Err(e @ MonitorError::ChannelClosed) => return ApiError::from(e).into_response(),
            Err(e) => Some(e.to_string()),
        },
        Err(_) => Some(format!("Unknown time mode '{}'", time_mode)),
    };
    match state.monitor.snapshot().await {
        Ok(snapshot) => {
            let controls = ControlsTemplate::new(&snapshot, flash).with_draft(targets, interval);
            HtmlTemplate(controls).into_response()
        }
        Err(e) => ApiError::from(e).into_response(),
    }
}

// =============================================================================
// JSON API
// =============================================================================

async fn state_handler(State(state): State<Arc<AppState>>) -> Result<Json<Snapshot>, ApiError> {
    Ok(Json(state.monitor.snapshot().await?))
}

async fn start_handler(
    State(state): State<Arc<AppState>>,
    body: Bytes,
) -> Result<Json<Snapshot>, ApiError> {
    let patch = parse_patch(&body)?;
    state.monitor.start(patch).await?;
    Ok(Json(state.monitor.snapshot().await?))
}

async fn stop_handler(State(state): State<Arc<AppState>>) -> Result<Json<Snapshot>, ApiError> {
    state.monitor.stop().await?;
    Ok(Json(state.monitor.snapshot().await?))
}

async fn clear_handler(State(state): State<Arc<AppState>>) -> Result<Json<Snapshot>, ApiError> {
    state.monitor.clear().await?;
    Ok(Json(state.monitor.snapshot().await?))
}

async fn settings_handler(
    State(state): State<Arc<AppState>>,
    body: Bytes,
) -> Result<Json<Snapshot>, ApiError> {
    let patch = parse_patch(&body)?;
    state.monitor.configure(patch).await?;
    Ok(Json(state.monitor.snapshot().await?))
}

/// CSV download.
async fn export_handler(
    State(state): State<Arc<AppState>>,
    Query(params): Query<ExportParams>,
) -> Result<Response, ApiError> {
    let mode = params
        .mode
        .as_deref()
        .filter(|m| !m.trim().is_empty())
        .map(parse_time_mode)
        .transpose()?;

    let export = state.monitor.export(mode).await?;
    tracing::info!(filename = %export.filename, bytes = export.content.len(), "CSV exported");

    Ok((
        [
            (header::CONTENT_TYPE, CSV_CONTENT_TYPE.to_string()),
            (header::CONTENT_DISPOSITION, export.content_disposition()),
        ],
        export.content,
    )
        .into_response())
}
