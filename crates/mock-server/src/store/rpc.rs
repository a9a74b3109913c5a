//! RPC methods stored under `RPC2/`.

use super::{description_filename, read_body, read_text, WriteLocks, DOC_SUFFIX};
use crate::error::StoreError;
use serde_json::Value;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::info;

/// Directory (and endpoint path) holding RPC methods.
pub const RPC_PATH: &str = "RPC2";

/// Synthetic method listing every stored method.
pub const LIST_METHODS: &str = "system.listMethods";

/// One file per method name, payload as JSON or raw text.
#[derive(Debug, Clone)]
pub struct RpcStore {
    methods_dir: PathBuf,
}

impl RpcStore {
    pub fn new(api_dir: &Path) -> Self {
        Self {
            methods_dir: api_dir.join(RPC_PATH),
        }
    }

    pub fn methods_dir(&self) -> &Path {
        &self.methods_dir
    }

    /// Stored method names, sorted. Dot-files and descriptions are skipped.
    pub fn list_methods(&self) -> Vec<String> {
        let Ok(entries) = fs::read_dir(&self.methods_dir) else {
            return Vec::new();
        };

        let mut methods: Vec<String> = entries
            .filter_map(Result::ok)
            .filter(|entry| entry.path().is_file())
            .filter_map(|entry| entry.file_name().into_string().ok())
            .filter(|name| !name.starts_with('.') && !name.ends_with(DOC_SUFFIX))
            .collect();
        methods.sort();
        methods
    }

    /// Stored methods plus `system.listMethods`.
    pub fn available_methods(&self) -> Vec<String> {
        let mut methods = self.list_methods();
        methods.push(LIST_METHODS.to_string());
        methods
    }

    /// Payload of a stored method: decoded JSON when the file parses, the raw
    /// text otherwise. Missing or empty files are a miss.
    pub fn read(&self, method_name: &str) -> Option<Value> {
        if validate_name(method_name).is_err() {
            return None;
        }
        let content = read_body(&self.methods_dir.join(method_name))?;
        Some(
            serde_json::from_slice(&content)
                .unwrap_or_else(|_| Value::String(String::from_utf8_lossy(&content).into_owned())),
        )
    }

    /// Overwrite the payload of a method.
    pub fn save(&self, locks: &WriteLocks, method_name: &str, payload: &str) -> Result<(), StoreError> {
        validate_name(method_name)?;
        let path = self.methods_dir.join(method_name);
        locks.with_lock(&path, || {
            fs::create_dir_all(&self.methods_dir)
                .map_err(|e| StoreError::io(&self.methods_dir, e))?;
            fs::write(&path, payload).map_err(|e| StoreError::io(&path, e))?;
            info!("Saved RPC method {}", method_name);
            Ok(())
        })
    }

    pub fn save_description(
        &self,
        locks: &WriteLocks,
        method_name: &str,
        description: &str,
    ) -> Result<(), StoreError> {
        validate_name(method_name)?;
        let path = self.methods_dir.join(method_name);
        locks.with_lock(&path, || {
            fs::create_dir_all(&self.methods_dir)
                .map_err(|e| StoreError::io(&self.methods_dir, e))?;
            let doc = self.methods_dir.join(description_filename(method_name));
            fs::write(&doc, description).map_err(|e| StoreError::io(&doc, e))
        })
    }

    pub fn load_description(&self, method_name: &str) -> Option<String> {
        validate_name(method_name).ok()?;
        read_text(&self.methods_dir.join(description_filename(method_name)))
    }

    /// Remove a method and its description. Returns whether the method existed.
    pub fn delete(&self, locks: &WriteLocks, method_name: &str) -> Result<bool, StoreError> {
        validate_name(method_name)?;
        let path = self.methods_dir.join(method_name);
        locks.with_lock(&path, || {
            let existed = path.is_file();
            for file in [
                path.clone(),
                self.methods_dir.join(description_filename(method_name)),
            ] {
                if file.is_file() {
                    fs::remove_file(&file).map_err(|e| StoreError::io(&file, e))?;
                }
            }
            if existed {
                info!("Deleted RPC method {}", method_name);
            }
            Ok(existed)
        })
    }
}

/// A method name is a single file name inside `RPC2/`.
fn validate_name(method_name: &str) -> Result<(), StoreError> {
    if method_name.is_empty()
        || method_name.starts_with('.')
        || method_name.contains(['/', '\\', '\0'])
        || method_name == LIST_METHODS
    {
        return Err(StoreError::InvalidMethod(method_name.to_string()));
    }
    Ok(())
}
