//! Request/response bodies of the admin API and response helpers.

use crate::format::Format;
use crate::store::{RpcMethodInfo, UrlPath};
use bytes::Bytes;
use http_body_util::Full;
use hyper::body::Incoming;
use hyper::{Request, Response, StatusCode};
use serde::{Deserialize, Serialize};

/// Error response structure
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub errors: Vec<ErrorDetail>,
}

/// Individual error detail
#[derive(Debug, Serialize)]
pub struct ErrorDetail {
    pub code: String,
    pub message: String,
}

/// `GET /__manage`
#[derive(Debug, Serialize)]
pub struct ListResponse {
    pub upstream_server: Option<String>,
    pub paths: Vec<UrlPath>,
    pub rpc_methods: Vec<RpcMethodInfo>,
}

/// One response variant in a create request.
#[derive(Debug, Deserialize)]
pub struct ResponseVariant {
    pub status_code: u16,
    pub format: Format,
    #[serde(default)]
    pub body: String,
    /// Raw header block, one `Name: value` per line.
    #[serde(default)]
    pub headers: String,
}

/// `POST /__manage/create`
#[derive(Debug, Deserialize)]
pub struct CreateResourceRequest {
    pub url_path: String,
    pub method: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub category: String,
    pub responses: Vec<ResponseVariant>,
}

/// `POST /__manage/create/rpc`
#[derive(Debug, Deserialize)]
pub struct CreateRpcRequest {
    pub method_name: String,
    pub method_response: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub category: String,
}

/// A stored variant as returned by `GET /__manage/create`.
#[derive(Debug, Serialize)]
pub struct ResponseView {
    pub status_code: u16,
    pub format: Format,
    pub body: String,
    pub headers: Vec<(String, String)>,
}

/// `GET /__manage/create?url_path=..&method=..`
#[derive(Debug, Serialize)]
pub struct ResourceView {
    pub id: String,
    pub url_path: String,
    pub method: String,
    pub description: Option<String>,
    pub category: Option<String>,
    pub responses: Vec<ResponseView>,
}

/// `POST /__manage/resource/..` and `POST /__manage/rpc/..`
#[derive(Debug, Deserialize)]
pub struct UpstreamToggle {
    pub upstream_server: bool,
}

/// `POST /__manage/settings`
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct SettingsRequest {
    pub upstream_server: String,
    pub http_username: String,
    pub http_password: String,
}

/// `GET /__manage/settings`. Password hashes are never returned.
#[derive(Debug, Serialize)]
pub struct SettingsView {
    pub upstream_server: Option<String>,
    pub http_username: Option<String>,
    pub http_auth: bool,
}

/// Create a JSON response
pub fn json_response<T: Serialize>(status: StatusCode, body: &T) -> Response<Full<Bytes>> {
    let json = serde_json::to_string_pretty(body).unwrap_or_else(|_| "{}".to_string());
    build_response_with_headers(status, [("Content-Type", "application/json")], json)
}

/// Build an HTTP response with headers, falling back to a bare response if
/// the builder rejects them.
pub fn build_response_with_headers(
    status: StatusCode,
    headers: impl IntoIterator<Item = (impl AsRef<str>, impl AsRef<str>)>,
    body: impl Into<Bytes>,
) -> Response<Full<Bytes>> {
    let mut builder = Response::builder().status(status);
    for (key, value) in headers {
        builder = builder.header(key.as_ref(), value.as_ref());
    }
    builder
        .body(Full::new(body.into()))
        .unwrap_or_else(|_| Response::new(Full::new(Bytes::from("Internal Server Error"))))
}

/// Create an error response
pub fn error_response(status: StatusCode, message: &str) -> Response<Full<Bytes>> {
    let error = ErrorResponse {
        errors: vec![ErrorDetail {
            code: status.as_str().to_string(),
            message: message.to_string(),
        }],
    };
    json_response(status, &error)
}

pub fn not_found() -> Response<Full<Bytes>> {
    error_response(StatusCode::NOT_FOUND, "Not Found")
}

pub fn method_not_allowed() -> Response<Full<Bytes>> {
    error_response(StatusCode::METHOD_NOT_ALLOWED, "Method Not Allowed")
}

/// Collect request body into bytes
pub async fn collect_body(req: Request<Incoming>) -> Result<Bytes, String> {
    use http_body_util::BodyExt;
    req.collect()
        .await
        .map(|c| c.to_bytes())
        .map_err(|e| format!("Failed to read request body: {e}"))
}

/// Read and decode a JSON request body, answering 400 on failure.
pub async fn json_body<T: serde::de::DeserializeOwned>(
    req: Request<Incoming>,
) -> Result<T, Response<Full<Bytes>>> {
    let body = collect_body(req)
        .await
        .map_err(|e| error_response(StatusCode::BAD_REQUEST, &e))?;
    serde_json::from_slice(&body)
        .map_err(|e| error_response(StatusCode::BAD_REQUEST, &format!("Invalid JSON: {e}")))
}

/// Value of a query parameter, percent-decoded.
pub fn query_param(query: Option<&str>, name: &str) -> Option<String> {
    query?.split('&').find_map(|param| {
        let (key, value) = param.split_once('=').unwrap_or((param, ""));
        if key != name {
            return None;
        }
        let value = value.replace('+', " ");
        Some(
            urlencoding::decode(&value)
                .map(|v| v.into_owned())
                .unwrap_or(value),
        )
    })
}
