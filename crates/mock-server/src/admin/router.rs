//! Route dispatch for the admin API.

use crate::admin::handlers::{resources, rpc, system};
use crate::admin::types::{method_not_allowed, not_found};
use crate::server::AppState;
use bytes::Bytes;
use http_body_util::Full;
use hyper::body::Incoming;
use hyper::{Method, Request, Response};
use tracing::debug;

pub const ADMIN_PREFIX: &str = "/__manage";

pub fn is_admin_path(path: &str) -> bool {
    path.strip_prefix(ADMIN_PREFIX)
        .is_some_and(|rest| rest.is_empty() || rest.starts_with('/'))
}

/// Main request router
pub async fn route_request(req: Request<Incoming>, state: &AppState) -> Response<Full<Bytes>> {
    let method = req.method().clone();
    let path = req.uri().path().to_string();
    let query = req.uri().query().map(|s| s.to_string());

    debug!("Admin API: {} {}", method, path);

    let route = path
        .strip_prefix(ADMIN_PREFIX)
        .unwrap_or(&path)
        .trim_end_matches('/');
    let query = query.as_deref();

    match (&method, route) {
        (&Method::GET, "") => return resources::handle_list(state),
        (&Method::GET, "/health") => return system::handle_health(),
        (&Method::GET, "/logs") => return system::handle_logs(state, query),
        (&Method::GET, "/settings") => return system::handle_get_settings(state),
        (&Method::POST, "/settings") => return system::handle_update_settings(req, state).await,
        (&Method::GET, "/create") => return resources::handle_get(state, query),
        (&Method::POST, "/create") => return resources::handle_create(req, state).await,
        (&Method::GET, "/create/rpc") => return rpc::handle_get(state, query),
        (&Method::POST, "/create/rpc") => return rpc::handle_create(req, state).await,
        (_, "" | "/health" | "/logs" | "/settings" | "/create" | "/create/rpc") => {
            return method_not_allowed()
        }
        _ => {}
    }

    if let Some(id) = route.strip_prefix("/resource/") {
        let id = decode(id);
        return match method {
            Method::DELETE => resources::handle_delete(state, &id),
            Method::POST => resources::handle_toggle_upstream(req, state, &id).await,
            _ => method_not_allowed(),
        };
    }

    if let Some(name) = route.strip_prefix("/rpc/") {
        let name = decode(name);
        return match method {
            Method::DELETE => rpc::handle_delete(state, &name),
            Method::POST => rpc::handle_toggle_upstream(req, state, &name).await,
            _ => method_not_allowed(),
        };
    }

    not_found()
}

fn decode(segment: &str) -> String {
    urlencoding::decode(segment)
        .map(|s| s.into_owned())
        .unwrap_or_else(|_| segment.to_string())
}
