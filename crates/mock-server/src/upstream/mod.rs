//! Forwarding to the upstream origin.

use crate::error::ResolveError;
use crate::provider::Response;
use crate::store::HeaderList;
use async_trait::async_trait;
use bytes::Bytes;
use std::time::Duration;
use tracing::{debug, warn};

/// Request headers that are never forwarded.
const SKIPPED_REQUEST_HEADERS: &[&str] = &[
    "host",
    "content-length",
    "if-none-match",
    "connection",
    "transfer-encoding",
];

/// Upstream response headers that are not passed back to the client.
const SKIPPED_RESPONSE_HEADERS: &[&str] =
    &["transfer-encoding", "connection", "keep-alive", "content-length"];

/// Methods whose body is forwarded.
const BODY_METHODS: &[&str] = &["POST", "PATCH", "PUT"];

/// An inbound request as seen by the forwarding layer.
#[derive(Debug, Clone)]
pub struct UpstreamRequest<'a> {
    pub method: &'a str,
    /// Path and query, starting with `/`.
    pub uri: &'a str,
    pub headers: &'a [(String, String)],
    pub body: &'a Bytes,
}

/// Something that can answer a request on behalf of the mock.
#[async_trait]
pub trait Upstream: Send + Sync {
    /// Forward `request` to `base_url`. Transport failures and non-2xx
    /// answers are [`ResolveError::UpstreamUnreachable`].
    async fn forward(
        &self,
        base_url: &str,
        request: &UpstreamRequest<'_>,
    ) -> Result<Response, ResolveError>;
}

/// reqwest-backed [`Upstream`].
#[derive(Debug, Clone)]
pub struct UpstreamGateway {
    client: reqwest::Client,
}

impl UpstreamGateway {
    /// Build the gateway. Without a timeout requests wait indefinitely.
    pub fn new(timeout: Option<Duration>) -> Result<Self, reqwest::Error> {
        let mut builder = reqwest::Client::builder();
        if let Some(timeout) = timeout {
            builder = builder.timeout(timeout);
        }
        Ok(Self {
            client: builder.build()?,
        })
    }
}

#[async_trait]
impl Upstream for UpstreamGateway {
    async fn forward(
        &self,
        base_url: &str,
        request: &UpstreamRequest<'_>,
    ) -> Result<Response, ResolveError> {
        let target_url = format!("{}{}", base_url, request.uri);
        debug!("Forwarding {} to {}", request.method, target_url);

        let method = reqwest::Method::from_bytes(request.method.as_bytes())
            .map_err(|e| ResolveError::UpstreamUnreachable(e.to_string()))?;

        let mut builder = self.client.request(method, &target_url);
        for (name, value) in forwarded_headers(request.headers) {
            builder = builder.header(name.as_str(), value.as_str());
        }
        if BODY_METHODS.contains(&request.method) {
            builder = builder.body(request.body.clone());
        }

        let response = builder.send().await.map_err(|e| {
            warn!("Upstream request to {} failed: {}", target_url, e);
            ResolveError::UpstreamUnreachable(e.to_string())
        })?;

        let status = response.status();
        if !status.is_success() {
            warn!("Upstream {} answered {}", target_url, status);
            return Err(ResolveError::UpstreamUnreachable(format!(
                "{target_url} answered {status}"
            )));
        }

        let headers: HeaderList = response
            .headers()
            .iter()
            .filter(|(name, _)| !SKIPPED_RESPONSE_HEADERS.contains(&name.as_str()))
            .filter_map(|(name, value)| {
                value
                    .to_str()
                    .ok()
                    .map(|value| (name.to_string(), value.to_string()))
            })
            .collect();

        let content = response.bytes().await.map_err(|e| {
            warn!("Failed to read upstream body from {}: {}", target_url, e);
            ResolveError::UpstreamUnreachable(e.to_string())
        })?;

        Ok(Response::new(content, headers, status.as_u16()))
    }
}

/// Inbound headers minus the ones that must not reach the upstream.
pub fn forwarded_headers(headers: &[(String, String)]) -> impl Iterator<Item = &(String, String)> {
    headers.iter().filter(|(name, _)| {
        !SKIPPED_REQUEST_HEADERS
            .iter()
            .any(|skipped| name.eq_ignore_ascii_case(skipped))
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pairs(headers: &[(&str, &str)]) -> HeaderList {
        headers
            .iter()
            .map(|(n, v)| (n.to_string(), v.to_string()))
            .collect()
    }

    #[test]
    fn test_forwarded_headers_strip_conditional_and_host() {
        let headers = pairs(&[
            ("Host", "localhost:8888"),
            ("If-None-Match", "\"abc\""),
            ("Content-Length", "12"),
            ("Accept", "application/json"),
            ("X-Trace", "1"),
        ]);
        let forwarded: Vec<_> = forwarded_headers(&headers).map(|(n, _)| n.as_str()).collect();
        assert_eq!(forwarded, vec!["Accept", "X-Trace"]);
    }

    #[tokio::test]
    async fn test_unreachable_upstream() {
        let gateway = UpstreamGateway::new(Some(Duration::from_secs(2))).unwrap();
        let body = Bytes::new();
        let request = UpstreamRequest {
            method: "GET",
            uri: "/hello",
            headers: &[],
            body: &body,
        };
        let port = {
            let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
            listener.local_addr().unwrap().port()
        };
        let result = gateway
            .forward(&format!("http://127.0.0.1:{port}"), &request)
            .await;
        assert!(matches!(result, Err(ResolveError::UpstreamUnreachable(_))));
    }
}
