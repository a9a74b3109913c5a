//! Request resolution policy.
//!
//! ```text
//! CHECK_UPSTREAM_FLAG --on--> UPSTREAM
//!        |
//!       off
//!        v
//!      MOCK --hit--> FINAL
//!        |
//!       miss --upstream configured--> UPSTREAM
//!        |
//!        +--no upstream--> FINAL (404 hint / RPC fault)
//! ```
//!
//! Exactly one response comes out of every resolution. A failed upstream
//! call ends in the 404 hint for REST and a parse-error fault for RPC.

use crate::error::ResolveError;
use crate::format::Format;
use crate::provider::rpc::fault_response;
use crate::provider::{not_found_hint, Response, RestMockProvider, RpcMockProvider, RpcProtocol};
use crate::settings::Settings;
use crate::store::to_file_path;
use crate::upstream::{Upstream, UpstreamRequest};
use bytes::Bytes;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::debug;

pub const ACCESS_CONTROL_ALLOW_ORIGIN: &str = "Access-Control-Allow-Origin";

/// A REST request after routing.
#[derive(Debug, Clone)]
pub struct RestRequest<'a> {
    /// Upper-case HTTP method.
    pub method: &'a str,
    /// Request path with any `.{format}` suffix removed.
    pub url_path: &'a str,
    /// Original path and query, used when forwarding.
    pub uri: &'a str,
    pub status_code: u16,
    pub format: Format,
    pub headers: &'a [(String, String)],
    pub body: &'a Bytes,
}

/// An RPC call as received on `/RPC2`.
#[derive(Debug, Clone)]
pub struct RpcRequest<'a> {
    pub protocol: RpcProtocol,
    pub uri: &'a str,
    pub headers: &'a [(String, String)],
    pub body: &'a Bytes,
}

/// Combines the mock providers with the upstream gateway.
pub struct ResolutionEngine {
    rest: RestMockProvider,
    rpc: RpcMockProvider,
    upstream: Arc<dyn Upstream>,
}

impl ResolutionEngine {
    pub fn new(api_dir: impl Into<PathBuf>, upstream: Arc<dyn Upstream>) -> Self {
        let api_dir = api_dir.into();
        Self {
            rpc: RpcMockProvider::new(&api_dir),
            rest: RestMockProvider::new(api_dir),
            upstream,
        }
    }

    pub async fn resolve_rest(&self, settings: &Settings, request: &RestRequest<'_>) -> Response {
        let base_url = settings.upstream_server();
        let file_path = to_file_path(request.url_path);

        if let Some(base_url) = base_url {
            if settings.resource_upstream_enabled(request.method, &file_path) {
                debug!("Upstream flag on for {} {}", request.method, request.url_path);
                let response = match self.forward_rest(base_url, request).await {
                    Ok(response) => response,
                    Err(_) => self.hint(request),
                };
                return finalize(response, request.format);
            }
        }

        let served = self.rest.serve(
            request.method,
            request.url_path,
            request.status_code,
            request.format,
        );
        if served.is_ok() {
            return finalize(served.response, request.format);
        }

        let response = match base_url {
            Some(base_url) => {
                debug!("Mock miss, falling back to upstream {}", base_url);
                self.forward_rest(base_url, request)
                    .await
                    .unwrap_or(served.response)
            }
            None => served.response,
        };
        finalize(response, request.format)
    }

    pub async fn resolve_rpc(&self, settings: &Settings, request: &RpcRequest<'_>) -> Response {
        let codec = request.protocol.codec();
        let base_url = settings.upstream_server();

        if let Some(base_url) = base_url {
            let flagged = codec
                .method_name(request.body)
                .is_some_and(|name| settings.rpc_upstream_enabled(&name));
            if flagged {
                debug!("Upstream flag on for RPC call ({})", request.protocol);
                return with_cors(self.forward_rpc(base_url, request).await);
            }
        }

        let served = self.rpc.serve(request.protocol, request.body);
        if served.is_ok() {
            return with_cors(served.response);
        }

        match base_url {
            Some(base_url) => {
                debug!("RPC miss, falling back to upstream {}", base_url);
                with_cors(self.forward_rpc(base_url, request).await)
            }
            None => with_cors(served.response),
        }
    }

    async fn forward_rest(
        &self,
        base_url: &str,
        request: &RestRequest<'_>,
    ) -> Result<Response, ResolveError> {
        let upstream_request = UpstreamRequest {
            method: request.method,
            uri: request.uri,
            headers: request.headers,
            body: request.body,
        };
        self.upstream.forward(base_url, &upstream_request).await
    }

    async fn forward_rpc(&self, base_url: &str, request: &RpcRequest<'_>) -> Response {
        let codec = request.protocol.codec();
        let mut headers: Vec<(String, String)> = request
            .headers
            .iter()
            .filter(|(name, _)| !name.eq_ignore_ascii_case("accept"))
            .cloned()
            .collect();
        headers.push(("Accept".to_string(), codec.content_type().to_string()));

        let upstream_request = UpstreamRequest {
            method: "POST",
            uri: request.uri,
            headers: &headers,
            body: request.body,
        };
        match self.upstream.forward(base_url, &upstream_request).await {
            Ok(response) => response,
            Err(_) => fault_response(
                request.protocol,
                &ResolveError::MalformedRpcPayload,
                &codec.request_id(request.body),
            ),
        }
    }

    fn hint(&self, request: &RestRequest<'_>) -> Response {
        not_found_hint(
            request.method,
            request.url_path,
            request.status_code,
            request.format,
        )
    }
}

/// Inject the negotiated `Content-Type` when missing and the CORS header.
fn finalize(mut response: Response, format: Format) -> Response {
    if !response.has_header("Content-Type") {
        response.push_header("Content-Type", format.content_type());
    }
    with_cors(response)
}

fn with_cors(mut response: Response) -> Response {
    if !response.has_header(ACCESS_CONTROL_ALLOW_ORIGIN) {
        response.push_header(ACCESS_CONTROL_ALLOW_ORIGIN, "*");
    }
    response
}
