//! Mock providers and the response value they produce.
//!
//! Providers never fail: a miss or a malformed request becomes a well-formed
//! [`Response`] and the cause travels next to it in [`Served::error`], which
//! the engine inspects to decide on upstream fallback.

pub mod rest;
pub mod rpc;

pub use rest::{not_found_hint, RestMockProvider};
pub use rpc::{RpcCodec, RpcMockProvider, RpcProtocol};

use crate::error::ResolveError;
use crate::store::HeaderList;
use bytes::Bytes;
use http_body_util::Full;
use hyper::header::{HeaderName, HeaderValue};
use hyper::StatusCode;
use tracing::warn;

/// Status, ordered headers and body of a resolved request.
#[derive(Debug, Clone, PartialEq)]
pub struct Response {
    pub content: Bytes,
    pub headers: HeaderList,
    pub status_code: u16,
}

impl Response {
    pub fn new(content: impl Into<Bytes>, headers: HeaderList, status_code: u16) -> Self {
        Self {
            content: content.into(),
            headers,
            status_code,
        }
    }

    /// First value of a header, compared case-insensitively.
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(n, _)| n.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }

    pub fn has_header(&self, name: &str) -> bool {
        self.header(name).is_some()
    }

    pub fn push_header(&mut self, name: impl Into<String>, value: impl Into<String>) {
        self.headers.push((name.into(), value.into()));
    }

    /// Convert into a hyper response. Headers that are not valid HTTP are
    /// dropped with a warning; an out-of-range status becomes 500.
    pub fn into_http(self) -> hyper::Response<Full<Bytes>> {
        let mut response = hyper::Response::new(Full::new(self.content));
        *response.status_mut() =
            StatusCode::from_u16(self.status_code).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);

        let headers = response.headers_mut();
        for (name, value) in &self.headers {
            match (
                HeaderName::from_bytes(name.as_bytes()),
                HeaderValue::from_str(value),
            ) {
                (Ok(name), Ok(value)) => {
                    headers.append(name, value);
                }
                _ => warn!("Dropping invalid response header {:?}: {:?}", name, value),
            }
        }
        response
    }
}

/// A response together with the error signal that produced it.
#[derive(Debug, Clone, PartialEq)]
pub struct Served {
    pub response: Response,
    pub error: Option<ResolveError>,
}

impl Served {
    pub fn ok(response: Response) -> Self {
        Self {
            response,
            error: None,
        }
    }

    pub fn failed(response: Response, error: ResolveError) -> Self {
        Self {
            response,
            error: Some(error),
        }
    }

    pub fn is_ok(&self) -> bool {
        self.error.is_none()
    }
}
