//! REST resource handlers.

use super::store_error;
use crate::admin::types::*;
use crate::server::AppState;
use crate::store::{list_resources, list_rpc_methods, parse_resource_id, ResourceMethod, RpcStore};
use bytes::Bytes;
use http_body_util::Full;
use hyper::body::Incoming;
use hyper::{Request, Response, StatusCode};
use tracing::info;

/// GET /__manage - List stored resources and RPC methods
pub fn handle_list(state: &AppState) -> Response<Full<Bytes>> {
    let settings = state.settings().load();
    let rpc_store = RpcStore::new(state.api_dir());

    let body = ListResponse {
        upstream_server: settings.upstream_server().map(str::to_string),
        paths: list_resources(state.api_dir(), &settings),
        rpc_methods: list_rpc_methods(&rpc_store, &settings),
    };
    json_response(StatusCode::OK, &body)
}

/// GET /__manage/create?url_path=..&method=.. - Stored variants of a method
pub fn handle_get(state: &AppState, query: Option<&str>) -> Response<Full<Bytes>> {
    let url_path = query_param(query, "url_path").unwrap_or_default();
    let Some(method) = query_param(query, "method") else {
        return error_response(StatusCode::BAD_REQUEST, "Missing 'method' parameter");
    };

    let resource = match ResourceMethod::new(state.api_dir(), &url_path, &method) {
        Ok(resource) => resource,
        Err(e) => return store_error(e),
    };
    let id = resource.id();

    let responses: Vec<ResponseView> = resource
        .load_responses()
        .into_iter()
        .map(|stored| ResponseView {
            status_code: stored.status_code,
            format: stored.format,
            body: String::from_utf8_lossy(&stored.body).into_owned(),
            headers: stored.headers,
        })
        .collect();
    let description = resource.load_description();
    if responses.is_empty() && description.is_none() {
        return not_found();
    }

    let settings = state.settings().load();
    let body = ResourceView {
        category: settings.category(&id).map(str::to_string),
        id,
        url_path: resource.url_path().to_string(),
        method: resource.method().to_string(),
        description,
        responses,
    };
    json_response(StatusCode::OK, &body)
}

/// POST /__manage/create - Create or overwrite a resource method
pub async fn handle_create(req: Request<Incoming>, state: &AppState) -> Response<Full<Bytes>> {
    let request: CreateResourceRequest = match json_body(req).await {
        Ok(request) => request,
        Err(response) => return response,
    };

    if request.responses.is_empty() {
        return error_response(StatusCode::BAD_REQUEST, "At least one response is required");
    }
    if let Some(invalid) = request
        .responses
        .iter()
        .find(|r| !(100..=599).contains(&r.status_code))
    {
        return error_response(
            StatusCode::BAD_REQUEST,
            &format!("Invalid status code: {}", invalid.status_code),
        );
    }

    let resource = match ResourceMethod::new(state.api_dir(), &request.url_path, &request.method) {
        Ok(resource) => resource,
        Err(e) => return store_error(e),
    };
    let locks = state.write_locks();

    for response in &request.responses {
        if let Err(e) = resource.save_response(
            locks,
            response.status_code,
            response.format,
            response.body.as_bytes(),
            &response.headers,
        ) {
            return store_error(e);
        }
    }
    if !request.description.is_empty() {
        if let Err(e) = resource.save_description(locks, &request.description) {
            return store_error(e);
        }
    }

    let id = resource.id();
    if !request.category.is_empty() {
        if let Err(e) = state
            .settings()
            .update(|settings| settings.set_category(&id, &request.category))
        {
            return store_error(e);
        }
    }

    info!(
        "Created resource {} with {} responses",
        id,
        request.responses.len()
    );
    json_response(
        StatusCode::CREATED,
        &serde_json::json!({"id": id, "url_path": request.url_path}),
    )
}

/// DELETE /__manage/resource/{METHOD}-{path} - Remove a resource method
pub fn handle_delete(state: &AppState, id: &str) -> Response<Full<Bytes>> {
    let Some((method, file_path)) = parse_resource_id(id) else {
        return error_response(StatusCode::BAD_REQUEST, &format!("Invalid resource id: {id}"));
    };
    let resource = match ResourceMethod::new(state.api_dir(), file_path, method) {
        Ok(resource) => resource,
        Err(e) => return store_error(e),
    };

    let removed = match resource.delete(state.write_locks()) {
        Ok(removed) => removed,
        Err(e) => return store_error(e),
    };
    let mut had_entry = false;
    if let Err(e) = state
        .settings()
        .update(|settings| had_entry = settings.delete_resource(id))
    {
        return store_error(e);
    }

    if removed == 0 && !had_entry {
        return not_found();
    }
    json_response(
        StatusCode::OK,
        &serde_json::json!({"id": id, "removed_files": removed}),
    )
}

/// POST /__manage/resource/{METHOD}-{path} - Set the upstream flag
pub async fn handle_toggle_upstream(
    req: Request<Incoming>,
    state: &AppState,
    id: &str,
) -> Response<Full<Bytes>> {
    if parse_resource_id(id).is_none() {
        return error_response(StatusCode::BAD_REQUEST, &format!("Invalid resource id: {id}"));
    }
    let toggle: UpstreamToggle = match json_body(req).await {
        Ok(toggle) => toggle,
        Err(response) => return response,
    };

    match state
        .settings()
        .update(|settings| settings.set_upstream_flag(id, toggle.upstream_server))
    {
        Ok(_) => {
            info!(
                "Upstream server for {} {}",
                id,
                if toggle.upstream_server { "activated" } else { "deactivated" }
            );
            json_response(
                StatusCode::OK,
                &serde_json::json!({"id": id, "upstream_server": toggle.upstream_server}),
            )
        }
        Err(e) => store_error(e),
    }
}
