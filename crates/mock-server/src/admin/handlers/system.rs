//! System handlers: health, request log, settings.

use super::store_error;
use crate::admin::types::*;
use crate::server::AppState;
use crate::settings::{is_valid_url, Settings};
use bytes::Bytes;
use chrono::{Local, NaiveDate};
use http_body_util::Full;
use hyper::body::Incoming;
use hyper::{Request, Response, StatusCode};
use tracing::info;

/// GET /__manage/health - Health check
pub fn handle_health() -> Response<Full<Bytes>> {
    json_response(
        StatusCode::OK,
        &serde_json::json!({"status": "ok", "version": env!("CARGO_PKG_VERSION")}),
    )
}

/// GET /__manage/logs?date=YYYY-MM-DD - Request log of a day, today by default
pub fn handle_logs(state: &AppState, query: Option<&str>) -> Response<Full<Bytes>> {
    let date = match query_param(query, "date") {
        Some(date) => match NaiveDate::parse_from_str(&date, "%Y-%m-%d") {
            Ok(date) => date,
            Err(_) => {
                return error_response(StatusCode::BAD_REQUEST, &format!("Invalid date: {date}"))
            }
        },
        None => Local::now().date_naive(),
    };

    let entries = state.request_log().read_entries(date);
    json_response(
        StatusCode::OK,
        &serde_json::json!({
            "date": date.format("%Y-%m-%d").to_string(),
            "logs": entries,
        }),
    )
}

/// GET /__manage/settings
pub fn handle_get_settings(state: &AppState) -> Response<Full<Bytes>> {
    json_response(StatusCode::OK, &settings_view(&state.settings().load()))
}

/// POST /__manage/settings - Upstream URL and basic-auth credentials
pub async fn handle_update_settings(
    req: Request<Incoming>,
    state: &AppState,
) -> Response<Full<Bytes>> {
    let request: SettingsRequest = match json_body(req).await {
        Ok(request) => request,
        Err(response) => return response,
    };

    let upstream_server = request.upstream_server.trim();
    if !upstream_server.is_empty() && !is_valid_url(upstream_server) {
        return error_response(StatusCode::BAD_REQUEST, "Url is not valid.");
    }

    match state.settings().update(|settings| {
        settings.set_upstream_server(upstream_server);
        settings.set_http_credentials(&request.http_username, &request.http_password);
    }) {
        Ok(settings) => {
            info!(
                "Settings saved (upstream: {})",
                settings.upstream_server().unwrap_or("none")
            );
            json_response(StatusCode::OK, &settings_view(&settings))
        }
        Err(e) => store_error(e),
    }
}

fn settings_view(settings: &Settings) -> SettingsView {
    SettingsView {
        upstream_server: settings.upstream_server().map(str::to_string),
        http_username: (!settings.http_username.is_empty()).then(|| settings.http_username.clone()),
        http_auth: settings.auth_required(),
    }
}
