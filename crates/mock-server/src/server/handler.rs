//! Request routing for the mock front end.

use super::AppState;
use crate::access_log::{RequestLog, RequestLogEntry};
use crate::admin;
use crate::engine::{RestRequest, RpcRequest, ACCESS_CONTROL_ALLOW_ORIGIN};
use crate::format::{negotiate, split_extension};
use crate::provider::{Response as MockResponse, RpcProtocol};
use crate::store::{HeaderList, RPC_PATH, SUPPORTED_METHODS};
use bytes::Bytes;
use http_body_util::{BodyExt, Full};
use hyper::body::Incoming;
use hyper::header::{HeaderValue, ACCEPT, AUTHORIZATION, CONTENT_TYPE, WWW_AUTHENTICATE};
use hyper::{HeaderMap, Method, Request, Response, StatusCode};
use std::borrow::Cow;
use std::convert::Infallible;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, warn};

/// Query parameter overriding the stored status code to look up.
const STATUS_CODE_PARAM: &str = "__statusCode";
const DEFAULT_STATUS_CODE: u16 = 200;
/// Preflight cache lifetime in seconds.
const PREFLIGHT_MAX_AGE: &str = "21600";
const AUTH_REALM: &str = "Basic realm=\"mock-server\"";

/// Entry point of every request.
pub async fn handle_request(
    req: Request<Incoming>,
    state: Arc<AppState>,
    remote_addr: SocketAddr,
) -> Result<Response<Full<Bytes>>, Infallible> {
    let start_time = Instant::now();
    debug!("Received request: {} {}", req.method(), req.uri());

    if req.method() == Method::OPTIONS {
        return Ok(preflight(req.headers()));
    }

    if admin::is_admin_path(req.uri().path()) {
        return Ok(admin::route_request(req, &state).await);
    }

    let (parts, body) = req.into_parts();
    let body = match body.collect().await {
        Ok(collected) => collected.to_bytes(),
        Err(e) => {
            warn!("Failed to read request body from {}: {}", remote_addr, e);
            return Ok(plain_response(
                StatusCode::BAD_REQUEST,
                "Failed to read request body",
            ));
        }
    };

    let inbound = Inbound {
        method: parts.method.as_str(),
        path: parts.uri.path(),
        uri: parts
            .uri
            .path_and_query()
            .map(|pq| pq.as_str())
            .unwrap_or_else(|| parts.uri.path()),
        query: parts.uri.query(),
        headers: header_pairs(&parts.headers),
        body,
        remote_addr,
        start_time,
    };

    if inbound.path.trim_start_matches('/') == RPC_PATH {
        if parts.method != Method::POST {
            return Ok(plain_response(
                StatusCode::METHOD_NOT_ALLOWED,
                "Method Not Allowed",
            ));
        }
        let content_type = parts
            .headers
            .get(CONTENT_TYPE)
            .and_then(|value| value.to_str().ok());
        return Ok(handle_rpc(&state, &inbound, content_type).await);
    }

    if !SUPPORTED_METHODS.contains(&inbound.method) {
        return Ok(plain_response(
            StatusCode::METHOD_NOT_ALLOWED,
            "Method Not Allowed",
        ));
    }

    let authorization = parts
        .headers
        .get(AUTHORIZATION)
        .and_then(|value| value.to_str().ok());
    let accept = parts
        .headers
        .get(ACCEPT)
        .and_then(|value| value.to_str().ok());
    Ok(handle_rest(&state, &inbound, authorization, accept).await)
}

/// Request data shared by the REST and RPC paths.
struct Inbound<'a> {
    method: &'a str,
    path: &'a str,
    uri: &'a str,
    query: Option<&'a str>,
    headers: HeaderList,
    body: Bytes,
    remote_addr: SocketAddr,
    start_time: Instant,
}

impl Inbound<'_> {
    fn log(&self, state: &AppState, response: &MockResponse, include_response: bool) {
        let entry = RequestLogEntry::new(
            self.method,
            self.uri,
            self.path,
            &self.remote_addr.ip().to_string(),
            self.start_time.elapsed(),
            &self.headers,
            &self.body,
            response,
            include_response,
        );
        state.request_log().append(&entry);
    }
}

async fn handle_rest(
    state: &AppState,
    inbound: &Inbound<'_>,
    authorization: Option<&str>,
    accept: Option<&str>,
) -> Response<Full<Bytes>> {
    let settings = state.settings().load();

    if !settings.check_basic_auth(authorization) {
        debug!("Rejected {} {}: missing or bad credentials", inbound.method, inbound.path);
        let mut response = plain_response(StatusCode::UNAUTHORIZED, "Unauthorized");
        response
            .headers_mut()
            .insert(WWW_AUTHENTICATE, HeaderValue::from_static(AUTH_REALM));
        return response;
    }

    let status_code = match status_override(inbound.query) {
        Ok(status_code) => status_code,
        Err(message) => return plain_response(StatusCode::BAD_REQUEST, &message),
    };

    let decoded = decode_path(inbound.path);
    let (url_path, extension) = split_extension(&decoded);
    let format = negotiate(extension, accept, state.default_format());

    let request = RestRequest {
        method: inbound.method,
        url_path,
        uri: inbound.uri,
        status_code,
        format,
        headers: &inbound.headers,
        body: &inbound.body,
    };
    let response = state.engine().resolve_rest(&settings, &request).await;
    debug!(
        "{} {} ({}, {}) -> {}",
        inbound.method, url_path, status_code, format, response.status_code
    );

    inbound.log(state, &response, true);
    response.into_http()
}

async fn handle_rpc(
    state: &AppState,
    inbound: &Inbound<'_>,
    content_type: Option<&str>,
) -> Response<Full<Bytes>> {
    let settings = state.settings().load();
    let protocol = RpcProtocol::select(content_type, state.rpc().jsonrpc, state.rpc().fastrpc);

    let request = RpcRequest {
        protocol,
        uri: inbound.uri,
        headers: &inbound.headers,
        body: &inbound.body,
    };
    let response = state.engine().resolve_rpc(&settings, &request).await;
    debug!("RPC call ({}) -> {}", protocol, response.status_code);

    inbound.log(state, &response, false);
    response.into_http()
}

/// Generic CORS preflight answer.
fn preflight(headers: &HeaderMap) -> Response<Full<Bytes>> {
    let allow_headers = match headers.get("Access-Control-Request-Headers") {
        Some(requested) => requested.to_str().unwrap_or_default().to_string(),
        None => headers
            .keys()
            .map(|name| name.as_str().to_uppercase())
            .collect::<Vec<_>>()
            .join(", "),
    };

    let mut response_headers = vec![
        (ACCESS_CONTROL_ALLOW_ORIGIN.to_string(), "*".to_string()),
        (
            "Access-Control-Max-Age".to_string(),
            PREFLIGHT_MAX_AGE.to_string(),
        ),
        ("Access-Control-Allow-Headers".to_string(), allow_headers),
    ];
    if let Some(method) = headers
        .get("Access-Control-Request-Method")
        .and_then(|value| value.to_str().ok())
    {
        response_headers.push((
            "Access-Control-Allow-Methods".to_string(),
            format!("OPTIONS, {method}"),
        ));
    }

    MockResponse::new(Bytes::new(), response_headers, 200).into_http()
}

/// Status code requested with `__statusCode`, 200 when absent.
fn status_override(query: Option<&str>) -> Result<u16, String> {
    let Some(query) = query else {
        return Ok(DEFAULT_STATUS_CODE);
    };

    let value = query.split('&').find_map(|param| {
        let (key, value) = param.split_once('=').unwrap_or((param, ""));
        (key == STATUS_CODE_PARAM).then_some(value)
    });
    let Some(value) = value else {
        return Ok(DEFAULT_STATUS_CODE);
    };

    let value = urlencoding::decode(value).unwrap_or(Cow::Borrowed(value));
    match value.trim().parse::<u16>() {
        Ok(status_code) if (100..=599).contains(&status_code) => Ok(status_code),
        _ => Err(format!("Invalid {STATUS_CODE_PARAM}: {value}")),
    }
}

fn decode_path(path: &str) -> Cow<'_, str> {
    urlencoding::decode(path).unwrap_or(Cow::Borrowed(path))
}

fn header_pairs(headers: &HeaderMap) -> HeaderList {
    headers
        .iter()
        .filter_map(|(name, value)| {
            value
                .to_str()
                .ok()
                .map(|value| (name.as_str().to_string(), value.to_string()))
        })
        .collect()
}

fn plain_response(status: StatusCode, message: &str) -> Response<Full<Bytes>> {
    let mut response = Response::new(Full::new(Bytes::from(message.to_string())));
    *response.status_mut() = status;
    response.headers_mut().insert(
        CONTENT_TYPE,
        HeaderValue::from_static("text/plain; charset=utf-8"),
    );
    response
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_override() {
        assert_eq!(status_override(None), Ok(200));
        assert_eq!(status_override(Some("a=1")), Ok(200));
        assert_eq!(status_override(Some("a=1&__statusCode=404")), Ok(404));
        assert_eq!(status_override(Some("__statusCode=%35%30%30")), Ok(500));
        assert!(status_override(Some("__statusCode=abc")).is_err());
        assert!(status_override(Some("__statusCode=42")).is_err());
        assert!(status_override(Some("__statusCode")).is_err());
    }

    #[test]
    fn test_preflight_echoes_requested_headers() {
        let mut headers = HeaderMap::new();
        headers.insert(
            "Access-Control-Request-Headers",
            HeaderValue::from_static("x-token, content-type"),
        );
        headers.insert(
            "Access-Control-Request-Method",
            HeaderValue::from_static("PUT"),
        );

        let response = preflight(&headers);
        assert_eq!(response.status(), StatusCode::OK);
        let get = |name: &str| response.headers().get(name).unwrap().to_str().unwrap();
        assert_eq!(get("Access-Control-Allow-Origin"), "*");
        assert_eq!(get("Access-Control-Max-Age"), "21600");
        assert_eq!(get("Access-Control-Allow-Headers"), "x-token, content-type");
        assert_eq!(get("Access-Control-Allow-Methods"), "OPTIONS, PUT");
    }

    #[test]
    fn test_preflight_lists_request_header_names() {
        let mut headers = HeaderMap::new();
        headers.insert("x-token", HeaderValue::from_static("1"));

        let response = preflight(&headers);
        assert_eq!(
            response.headers()["Access-Control-Allow-Headers"],
            "X-TOKEN"
        );
        assert!(response
            .headers()
            .get("Access-Control-Allow-Methods")
            .is_none());
    }

    #[test]
    fn test_decode_path() {
        assert_eq!(decode_path("/user/j%C3%BCrgen"), "/user/jürgen");
        assert_eq!(decode_path("/user"), "/user");
    }
}
