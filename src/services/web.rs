//! Axum-based HTTP server for editing settings and reading the event log.
//!
//! Routes:
//! - GET `/` - Redirects to `/settings`
//! - GET `/settings` - HTML form with one row per field (`f1`..`fN`)
//! - POST `/settings` - Urlencoded form submission, saved to storage
//! - GET `/api/settings` - Current values as JSON, passwords blanked
//! - POST `/api/settings` - Partial update, JSON object of form ids to values
//! - GET `/log` - Event log, newest first, plain text
//!
//! Permissive CORS, when enabled, only covers the `/api` routes.

use std::collections::HashMap;
use std::fmt::{self, Write};
use std::net::SocketAddr;
use std::sync::Arc;

use axum::{
    extract::State,
    http::{header, StatusCode},
    response::{Html, IntoResponse, Redirect, Response},
    routing::get,
    Form, Json, Router,
};
use embedded_storage::Storage;
use log::{error, info};
use tower_http::cors::{Any, CorsLayer};

use crate::config::WebConfig;
use crate::settings::{FormError, SettingsError, SettingsStore};

use super::api::{
    form_values, ApiResponse, FieldResponse, RejectedField, SubmitRequest, SubmitResponse,
};
use super::shared::SharedSettings;

// ============================================================================
// Pages
// ============================================================================

fn page_start(out: &mut String, title: &str) -> fmt::Result {
    out.write_str("<!DOCTYPE html>\n<html><head><meta charset=\"utf-8\"><title>")?;
    crate::settings::html::escape(out, title)?;
    out.write_str("</title></head>\n<body>\n<h1>")?;
    crate::settings::html::escape(out, title)?;
    out.write_str("</h1>\n")
}

fn settings_form<S: Storage>(out: &mut String, store: &SettingsStore<S>) -> fmt::Result {
    out.write_str("<form method=\"post\" action=\"/settings\">\n")?;
    store.render_form(out)?;
    out.write_str("<input type=\"submit\" value=\"Save\">\n</form>\n")
}

fn render_page<S: Storage>(
    title: &str,
    notice: Option<&str>,
    rejected: &[FormError],
    store: &SettingsStore<S>,
) -> Result<String, fmt::Error> {
    let mut out = String::new();
    page_start(&mut out, title)?;
    if let Some(notice) = notice {
        out.write_str("<p class=\"notice\">")?;
        crate::settings::html::escape(&mut out, notice)?;
        out.write_str("</p>\n")?;
    }
    if !rejected.is_empty() {
        out.write_str("<ul class=\"errors\">\n")?;
        for e in rejected {
            out.write_str("<li>")?;
            write!(crate::settings::html::Escaper(&mut out), "{e}")?;
            out.write_str("</li>\n")?;
        }
        out.write_str("</ul>\n")?;
    }
    settings_form(&mut out, store)?;
    out.write_str("</body></html>\n")?;
    Ok(out)
}

fn page_response(status: StatusCode, page: Result<String, fmt::Error>) -> Response {
    match page {
        Ok(page) => (status, Html(page)).into_response(),
        Err(_) => (StatusCode::INTERNAL_SERVER_ERROR, "Failed to render page").into_response(),
    }
}

// ============================================================================
// Route Handlers
// ============================================================================

/// GET /settings - Render the form
async fn settings_page<S>(State(app): State<Arc<AppState<S>>>) -> Response
where
    S: Storage + Send + 'static,
    S::Error: fmt::Debug,
{
    let page = app
        .settings
        .with_store(|store| render_page(&app.title, None, &[], store));
    page_response(StatusCode::OK, page)
}

/// POST /settings - Apply and save a form submission
///
/// Responds 200 when every field was accepted, 422 when some were rejected
/// (accepted fields are still saved), 500 when storage fails.
async fn submit_settings<S>(
    State(app): State<Arc<AppState<S>>>,
    Form(form): Form<HashMap<String, String>>,
) -> Response
where
    S: Storage + Send + 'static,
    S::Error: fmt::Debug,
{
    let (result, page) = app.settings.with_store(|store| {
        let result = store.submit_form(|id| form.get(id).map(String::as_str));
        let (notice, rejected) = match &result {
            Ok(rejected) if rejected.is_empty() => (Some("Settings saved"), &rejected[..]),
            Ok(rejected) => (Some("Some values were rejected"), &rejected[..]),
            Err(_) => (Some("Settings could not be saved"), &[][..]),
        };
        let page = render_page(&app.title, notice, rejected, store);
        (result, page)
    });

    let status = record_submission(&app.settings, &result);
    page_response(status, page)
}

/// GET /api/settings - Current values as JSON
async fn get_settings<S>(
    State(app): State<Arc<AppState<S>>>,
) -> Json<ApiResponse<Vec<FieldResponse>>>
where
    S: Storage + Send + 'static,
    S::Error: fmt::Debug,
{
    let fields: Vec<FieldResponse> = app
        .settings
        .with_store(|store| store.snapshot().iter().map(FieldResponse::from).collect());
    Json(ApiResponse::ok(fields))
}

/// POST /api/settings - Apply and save the values present, keyed by form id
///
/// Responds 400 for array or object values without touching the store.
async fn post_settings<S>(
    State(app): State<Arc<AppState<S>>>,
    Json(request): Json<SubmitRequest>,
) -> (StatusCode, Json<ApiResponse<SubmitResponse>>)
where
    S: Storage + Send + 'static,
    S::Error: fmt::Debug,
{
    let values = match form_values(&request) {
        Ok(values) => values,
        Err(id) => {
            return (
                StatusCode::BAD_REQUEST,
                Json(ApiResponse::err(format!(
                    "{id}: expected a string, number or boolean"
                ))),
            );
        }
    };
    let result = app
        .settings
        .with_store(|store| store.submit_update(|id| values.get(id).map(String::as_str)));
    let status = record_submission(&app.settings, &result);

    let body = match result {
        Ok(rejected) => ApiResponse::ok(SubmitResponse {
            saved: true,
            rejected: rejected.iter().map(RejectedField::from).collect(),
        }),
        Err(e) => ApiResponse::err(e.to_string()),
    };
    (status, Json(body))
}

/// GET /log - Event log, newest first
async fn get_log<S>(State(app): State<Arc<AppState<S>>>) -> impl IntoResponse
where
    S: Storage + Send + 'static,
    S::Error: fmt::Debug,
{
    let mut body = app.settings.events_newest_first().join("\n");
    if !body.is_empty() {
        body.push('\n');
    }
    ([(header::CONTENT_TYPE, "text/plain; charset=utf-8")], body)
}

/// GET / - Send browsers to the form
async fn index() -> Redirect {
    Redirect::to("/settings")
}

/// Fallback handler for 404
async fn not_found() -> impl IntoResponse {
    (
        StatusCode::NOT_FOUND,
        Json(ApiResponse::<()>::err("Not found")),
    )
}

/// Logs a submission to the event log and picks the response status.
fn record_submission<S>(
    settings: &SharedSettings<S>,
    result: &Result<Vec<FormError>, SettingsError<S::Error>>,
) -> StatusCode
where
    S: Storage + Send + 'static,
    S::Error: fmt::Debug,
{
    match result {
        Ok(rejected) if rejected.is_empty() => {
            settings.log_event("settings saved");
            StatusCode::OK
        }
        Ok(rejected) => {
            let ids: Vec<String> = rejected.iter().map(|e| e.id.to_string()).collect();
            settings.log_event(format_args!("settings saved, rejected {}", ids.join(",")));
            StatusCode::UNPROCESSABLE_ENTITY
        }
        Err(e) => {
            error!("settings: save failed: {e}");
            settings.log_event(format_args!("settings save failed: {e}"));
            StatusCode::INTERNAL_SERVER_ERROR
        }
    }
}

// ============================================================================
// Server Builder
// ============================================================================

/// Router state: the shared settings plus page chrome.
pub struct AppState<S: Storage> {
    /// Store and event log.
    pub settings: Arc<SharedSettings<S>>,
    /// Page title.
    pub title: String,
}

/// Configuration for the web server
#[derive(Debug, Clone)]
pub struct WebServerConfig {
    /// Address to bind to
    pub addr: SocketAddr,
    /// Whether the `/api` routes allow every origin
    pub cors_permissive: bool,
    /// Title of the settings page
    pub title: String,
}

impl Default for WebServerConfig {
    fn default() -> Self {
        Self::from_config(&WebConfig::default())
    }
}

impl WebServerConfig {
    /// Create a new config with the given address
    pub fn new(addr: impl Into<SocketAddr>) -> Self {
        Self {
            addr: addr.into(),
            ..Default::default()
        }
    }

    /// Set whether CORS should be permissive
    pub fn cors(mut self, permissive: bool) -> Self {
        self.cors_permissive = permissive;
        self
    }

    /// Set the page title
    pub fn title(mut self, title: impl Into<String>) -> Self {
        self.title = title.into();
        self
    }

    /// Create from shared WebConfig
    pub fn from_config(config: &WebConfig) -> Self {
        Self {
            addr: ([0, 0, 0, 0], config.port).into(),
            cors_permissive: config.cors_permissive,
            title: config.title.as_str().to_owned(),
        }
    }
}

/// Build the Axum router with all routes
pub fn build_router<S>(
    settings: Arc<SharedSettings<S>>,
    config: &WebServerConfig,
) -> Router
where
    S: Storage + Send + 'static,
    S::Error: fmt::Debug,
{
    let state = Arc::new(AppState {
        settings,
        title: config.title.clone(),
    });

    let mut api = Router::new().route(
        "/api/settings",
        get(get_settings::<S>).post(post_settings::<S>),
    );
    if config.cors_permissive {
        api = api.layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        );
    }

    Router::new()
        .route("/", get(index))
        .route(
            "/settings",
            get(settings_page::<S>).post(submit_settings::<S>),
        )
        .route("/log", get(get_log::<S>))
        .merge(api)
        .fallback(not_found)
        .with_state(state)
}

/// Start the web server with shared settings
///
/// This function blocks until the server is shut down.
pub async fn run_server<S>(
    settings: Arc<SharedSettings<S>>,
    config: WebServerConfig,
) -> Result<(), std::io::Error>
where
    S: Storage + Send + 'static,
    S::Error: fmt::Debug,
{
    let router = build_router(settings, &config);

    let listener = tokio::net::TcpListener::bind(config.addr).await?;
    info!("web: listening on http://{}", config.addr);

    axum::serve(listener, router).await
}
