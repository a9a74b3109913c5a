//! RPC method handlers.

use super::store_error;
use crate::admin::types::*;
use crate::server::AppState;
use crate::store::{rpc_resource_id, RpcStore};
use bytes::Bytes;
use http_body_util::Full;
use hyper::body::Incoming;
use hyper::{Request, Response, StatusCode};
use tracing::info;

/// GET /__manage/create/rpc?method_name=.. - A stored RPC method
pub fn handle_get(state: &AppState, query: Option<&str>) -> Response<Full<Bytes>> {
    let Some(name) = query_param(query, "method_name") else {
        return error_response(StatusCode::BAD_REQUEST, "Missing 'method_name' parameter");
    };

    let store = RpcStore::new(state.api_dir());
    let Some(response) = store.read(&name) else {
        return not_found();
    };

    let settings = state.settings().load();
    let id = rpc_resource_id(&name);
    let body = serde_json::json!({
        "name": name,
        "method_response": response,
        "description": store.load_description(&name),
        "category": settings.category(&id),
        "upstream_server": settings.rpc_upstream_enabled(&name),
    });
    json_response(StatusCode::OK, &body)
}

/// POST /__manage/create/rpc - Create or overwrite an RPC method
pub async fn handle_create(req: Request<Incoming>, state: &AppState) -> Response<Full<Bytes>> {
    let request: CreateRpcRequest = match json_body(req).await {
        Ok(request) => request,
        Err(response) => return response,
    };

    let store = RpcStore::new(state.api_dir());
    let locks = state.write_locks();
    if let Err(e) = store.save(locks, &request.method_name, &request.method_response) {
        return store_error(e);
    }
    if !request.description.is_empty() {
        if let Err(e) = store.save_description(locks, &request.method_name, &request.description) {
            return store_error(e);
        }
    }

    let id = rpc_resource_id(&request.method_name);
    if !request.category.is_empty() {
        if let Err(e) = state
            .settings()
            .update(|settings| settings.set_category(&id, &request.category))
        {
            return store_error(e);
        }
    }

    info!("Created RPC method {}", request.method_name);
    json_response(
        StatusCode::CREATED,
        &serde_json::json!({"id": id, "method_name": request.method_name}),
    )
}

/// DELETE /__manage/rpc/{name} - Remove an RPC method
pub fn handle_delete(state: &AppState, name: &str) -> Response<Full<Bytes>> {
    let store = RpcStore::new(state.api_dir());
    let existed = match store.delete(state.write_locks(), name) {
        Ok(existed) => existed,
        Err(e) => return store_error(e),
    };

    let id = rpc_resource_id(name);
    let mut had_entry = false;
    if let Err(e) = state
        .settings()
        .update(|settings| had_entry = settings.delete_resource(&id))
    {
        return store_error(e);
    }

    if !existed && !had_entry {
        return not_found();
    }
    json_response(StatusCode::OK, &serde_json::json!({"id": id}))
}

/// POST /__manage/rpc/{name} - Set the upstream flag
pub async fn handle_toggle_upstream(
    req: Request<Incoming>,
    state: &AppState,
    name: &str,
) -> Response<Full<Bytes>> {
    let toggle: UpstreamToggle = match json_body(req).await {
        Ok(toggle) => toggle,
        Err(response) => return response,
    };

    let id = rpc_resource_id(name);
    match state
        .settings()
        .update(|settings| settings.set_upstream_flag(&id, toggle.upstream_server))
    {
        Ok(_) => json_response(
            StatusCode::OK,
            &serde_json::json!({"id": id, "upstream_server": toggle.upstream_server}),
        ),
        Err(e) => store_error(e),
    }
}
