//! Resource listing for the admin API.

use super::paths::{resource_id, slugify, to_url_path};
use super::rest::parse_body_filename;
use super::rpc::{RpcStore, RPC_PATH};
use super::{description_filename, read_text, SUPPORTED_METHODS};
use crate::format::Format;
use crate::settings::Settings;
use serde::Serialize;
use serde_json::Value;
use std::collections::BTreeMap;
use std::path::Path;
use walkdir::{DirEntry, WalkDir};

/// One body file of a resource method.
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct ResourceFormatFile {
    pub status_code: u16,
    pub format: Format,
    pub data: String,
}

/// All stored variants of one method under one URL path.
#[derive(Debug, Clone, Serialize)]
pub struct Resource {
    pub method: String,
    pub url_path: String,
    pub id: String,
    pub files: Vec<ResourceFormatFile>,
    pub upstream_server: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub category: Option<String>,
}

/// A URL path and the methods stored for it.
#[derive(Debug, Clone, Serialize)]
pub struct UrlPath {
    pub path: String,
    pub id: String,
    pub resources: BTreeMap<String, Resource>,
}

/// An RPC method as listed by the admin API.
#[derive(Debug, Clone, Serialize)]
pub struct RpcMethodInfo {
    pub name: String,
    pub upstream_server: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub response: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub category: Option<String>,
}

fn is_listed(entry: &DirEntry) -> bool {
    let name = entry.file_name().to_string_lossy();
    if entry.depth() == 0 {
        return true;
    }
    if name.starts_with('.') {
        return false;
    }
    !(entry.depth() == 1 && entry.file_type().is_dir() && name == RPC_PATH)
}

/// Walk the api directory and group stored bodies by path and method.
pub fn list_resources(api_dir: &Path, settings: &Settings) -> Vec<UrlPath> {
    WalkDir::new(api_dir)
        .sort_by_file_name()
        .into_iter()
        .filter_entry(is_listed)
        .filter_map(Result::ok)
        .filter(|entry| entry.file_type().is_dir())
        .filter_map(|entry| load_url_path(api_dir, entry.path(), settings))
        .collect()
}

fn load_url_path(api_dir: &Path, dir: &Path, settings: &Settings) -> Option<UrlPath> {
    let file_path = dir
        .strip_prefix(api_dir)
        .ok()?
        .to_string_lossy()
        .replace('\\', "/");
    let url_path = format!("/{}", to_url_path(&file_path));

    let mut names: Vec<String> = std::fs::read_dir(dir)
        .ok()?
        .filter_map(Result::ok)
        .filter(|entry| entry.path().is_file())
        .filter_map(|entry| entry.file_name().into_string().ok())
        .collect();
    names.sort();

    let mut resources: BTreeMap<String, Resource> = BTreeMap::new();
    for name in &names {
        let Some((method, status_code, format)) = SUPPORTED_METHODS.iter().find_map(|method| {
            parse_body_filename(method, name).map(|(status, format)| (*method, status, format))
        }) else {
            continue;
        };

        let resource = resources.entry(method.to_string()).or_insert_with(|| {
            let id = resource_id(method, &file_path);
            Resource {
                method: method.to_string(),
                url_path: url_path.clone(),
                upstream_server: settings.resource_upstream_enabled(method, &file_path),
                description: read_text(&dir.join(description_filename(method))),
                category: settings.category(&id).map(str::to_string),
                files: Vec::new(),
                id,
            }
        });
        resource.files.push(ResourceFormatFile {
            status_code,
            format,
            data: read_text(&dir.join(name)).unwrap_or_default(),
        });
    }

    if resources.is_empty() {
        return None;
    }

    Some(UrlPath {
        id: slugify(&url_path),
        path: url_path,
        resources,
    })
}

/// Stored RPC methods with payloads, descriptions and flags.
pub fn list_rpc_methods(store: &RpcStore, settings: &Settings) -> Vec<RpcMethodInfo> {
    store
        .list_methods()
        .into_iter()
        .map(|name| RpcMethodInfo {
            upstream_server: settings.rpc_upstream_enabled(&name),
            response: store.read(&name),
            description: store.load_description(&name),
            category: settings
                .category(&super::paths::rpc_resource_id(&name))
                .map(str::to_string),
            name,
        })
        .collect()
}
