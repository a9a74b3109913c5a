//! Admin API handlers.

pub mod resources;
pub mod rpc;
pub mod system;

use crate::admin::types::error_response;
use crate::error::StoreError;
use bytes::Bytes;
use http_body_util::Full;
use hyper::{Response, StatusCode};
use tracing::error;

/// Map a store failure to a JSON error: bad input is 400, the rest 500.
fn store_error(e: StoreError) -> Response<Full<Bytes>> {
    match e {
        StoreError::InvalidPath(_) | StoreError::InvalidMethod(_) => {
            error_response(StatusCode::BAD_REQUEST, &e.to_string())
        }
        StoreError::Io { .. } | StoreError::Settings(_) => {
            error!("Admin write failed: {}", e);
            error_response(StatusCode::INTERNAL_SERVER_ERROR, &e.to_string())
        }
    }
}
