//! File-backed response store.
//!
//! Layout under an api directory:
//!
//! - `<segments>/{METHOD}_{STATUS}.{FORMAT}` - response body
//! - `<segments>/{METHOD}_H_{STATUS}.{FORMAT}` - raw header block
//! - `<segments>/{METHOD}_doc.md` - optional description
//! - `RPC2/{method}` and `RPC2/{method}_doc.md` - RPC methods
//!
//! # Module Structure
//!
//! - `paths` - URL template, file path and resource id conversions
//! - `headers` - header-block parsing and rendering
//! - `rest` - REST resource methods (read, save, delete)
//! - `rpc` - RPC method store
//! - `listing` - directory walk producing the admin resource listing

mod headers;
mod listing;
mod paths;
mod rest;
mod rpc;

pub use headers::{format_header_block, parse_header_block, HeaderList};
pub use listing::{
    list_resources, list_rpc_methods, Resource, ResourceFormatFile, RpcMethodInfo, UrlPath,
};
pub use paths::{
    parse_resource_id, resource_id, rpc_resource_id, slugify, to_file_path, to_url_path,
    validate_method, validate_relative, VARIABLE_MARKER,
};
pub use rest::{ResourceMethod, StoredResponse};
pub use rpc::{RpcStore, LIST_METHODS, RPC_PATH};

use bytes::Bytes;
use parking_lot::Mutex;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::warn;

use crate::format::Format;

/// HTTP methods a resource can be stored for.
pub const SUPPORTED_METHODS: [&str; 7] = ["GET", "HEAD", "POST", "DELETE", "PATCH", "PUT", "OPTIONS"];

/// Suffix of description files.
pub const DOC_SUFFIX: &str = "_doc.md";

/// Body file name for a method, status and format.
pub fn body_filename(method: &str, status_code: u16, format: Format) -> String {
    format!("{method}_{status_code}.{format}")
}

/// Header file name for a method, status and format.
pub fn header_filename(method: &str, status_code: u16, format: Format) -> String {
    format!("{method}_H_{status_code}.{format}")
}

/// Description file name for a method.
pub fn description_filename(method: &str) -> String {
    format!("{method}{DOC_SUFFIX}")
}

/// Read a stored body. Missing, unreadable or empty files are a miss.
pub fn read_body(path: &Path) -> Option<Bytes> {
    if !path.is_file() {
        return None;
    }
    match std::fs::read(path) {
        Ok(content) if !content.is_empty() => Some(Bytes::from(content)),
        Ok(_) => None,
        Err(e) => {
            warn!("Error reading file {}: {}", path.display(), e);
            None
        }
    }
}

/// Read and parse a header file. Missing or unreadable files give no headers.
pub fn read_headers(path: &Path) -> HeaderList {
    if !path.is_file() {
        return Vec::new();
    }
    match std::fs::read(path) {
        Ok(content) => parse_header_block(&String::from_utf8_lossy(&content)),
        Err(e) => {
            warn!("Error reading header file {}: {}", path.display(), e);
            Vec::new()
        }
    }
}

/// Read an optional text file such as a description.
pub(crate) fn read_text(path: &Path) -> Option<String> {
    if !path.is_file() {
        return None;
    }
    std::fs::read(path)
        .map(|content| String::from_utf8_lossy(&content).into_owned())
        .map_err(|e| warn!("Error reading file {}: {}", path.display(), e))
        .ok()
}

/// Per-resource write serialization.
///
/// Writers to the same resource directory take the same mutex, so an admin
/// save and a delete never interleave their file operations. Readers never
/// lock. An entry lives only while some writer holds or waits on it.
#[derive(Default)]
pub struct WriteLocks {
    locks: Mutex<HashMap<PathBuf, Arc<Mutex<()>>>>,
}

impl WriteLocks {
    pub fn new() -> Self {
        Self::default()
    }

    /// Run `f` while holding the lock for `key`.
    pub fn with_lock<T>(&self, key: &Path, f: impl FnOnce() -> T) -> T {
        let lock = {
            let mut locks = self.locks.lock();
            Arc::clone(locks.entry(key.to_path_buf()).or_default())
        };
        let result = {
            let _guard = lock.lock();
            f()
        };

        let mut locks = self.locks.lock();
        // Only the map and this writer still refer to the mutex.
        if Arc::strong_count(&lock) == 2 {
            locks.remove(key);
        }
        result
    }
}
