//! Settings document (`application.json` in the api directory).
//!
//! The document is re-read on every access so that admin changes are visible
//! to the next request. Writes go through [`SettingsFile::update`], which
//! serializes read-modify-write cycles behind a process-wide mutex.
//!
//! ```json
//! {
//!   "resources": {
//!     "GET-user/__name": {"category": "users", "upstream-server": true},
//!     "RPC-user.list": {"upstream-server": false}
//!   },
//!   "upstream-server": "http://localhost:9000",
//!   "http_username": "tester",
//!   "http_password": "<sha-256 hex>"
//! }
//! ```

use crate::error::StoreError;
use crate::store::{resource_id, rpc_resource_id, VARIABLE_MARKER};
use base64::Engine;
use once_cell::sync::Lazy;
use parking_lot::Mutex;
use regex::Regex;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use sha2::{Digest, Sha256};
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

/// Per-resource entry. Unknown keys are carried through untouched.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ResourceSettings {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub category: Option<String>,
    #[serde(
        rename = "upstream-server",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub upstream_server: Option<bool>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// Snapshot of the settings document.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Settings {
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub resources: BTreeMap<String, ResourceSettings>,
    #[serde(
        rename = "upstream-server",
        default,
        skip_serializing_if = "String::is_empty"
    )]
    upstream_server: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub password: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub http_username: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub http_password: String,
}

impl Settings {
    /// Global upstream base URL, if one is configured.
    pub fn upstream_server(&self) -> Option<&str> {
        (!self.upstream_server.is_empty()).then_some(self.upstream_server.as_str())
    }

    /// Set the global upstream base URL. A trailing `/` is dropped; an empty
    /// value clears it.
    pub fn set_upstream_server(&mut self, url: &str) {
        let url = url.trim();
        self.upstream_server = url.strip_suffix('/').unwrap_or(url).to_string();
    }

    /// Upstream flag of a REST resource method.
    ///
    /// An exact entry wins. Otherwise entries are tried in key order against
    /// a pattern where every segment of `file_path` may also be matched by a
    /// variable segment, so `GET-user/lisa` picks up `GET-user/__name`.
    pub fn resource_upstream_enabled(&self, method: &str, file_path: &str) -> bool {
        let id = resource_id(method, file_path);
        if let Some(flag) = self.resources.get(&id).and_then(|r| r.upstream_server) {
            return flag;
        }
        if file_path.is_empty() {
            return false;
        }

        let pattern = file_path
            .split('/')
            .map(|segment| format!("({}|{}[^/]*)", regex::escape(segment), VARIABLE_MARKER))
            .collect::<Vec<_>>()
            .join("/");
        let Ok(re) = Regex::new(&format!("^{}-{}$", regex::escape(method), pattern)) else {
            return false;
        };

        self.resources
            .iter()
            .filter(|(key, _)| re.is_match(key))
            .find_map(|(_, entry)| entry.upstream_server)
            .unwrap_or(false)
    }

    /// Upstream flag of an RPC method.
    pub fn rpc_upstream_enabled(&self, method_name: &str) -> bool {
        self.resources
            .get(&rpc_resource_id(method_name))
            .and_then(|r| r.upstream_server)
            .unwrap_or(false)
    }

    /// Set the upstream flag of a resource id (`GET-user`, `RPC-user.list`).
    pub fn set_upstream_flag(&mut self, id: &str, enabled: bool) {
        self.resources.entry(id.to_string()).or_default().upstream_server = Some(enabled);
    }

    pub fn set_category(&mut self, id: &str, category: &str) {
        self.resources.entry(id.to_string()).or_default().category = Some(category.to_string());
    }

    pub fn category(&self, id: &str) -> Option<&str> {
        self.resources.get(id).and_then(|r| r.category.as_deref())
    }

    /// Drop the entry of a resource id. Returns whether one existed.
    pub fn delete_resource(&mut self, id: &str) -> bool {
        self.resources.remove(id).is_some()
    }

    /// Configure the basic-auth gate. An empty username disables it, an
    /// empty password keeps the stored one. Passwords are stored hashed.
    pub fn set_http_credentials(&mut self, username: &str, password: &str) {
        self.http_username = username.to_string();
        if username.is_empty() {
            self.http_password.clear();
        } else if !password.is_empty() {
            self.http_password = hash_password(password);
        }
    }

    /// Whether mock requests must carry basic-auth credentials.
    pub fn auth_required(&self) -> bool {
        !self.http_username.is_empty()
    }

    /// Check an `Authorization` header value against the gate.
    pub fn check_basic_auth(&self, authorization: Option<&str>) -> bool {
        if !self.auth_required() {
            return true;
        }

        let Some(encoded) = authorization.and_then(|value| value.strip_prefix("Basic ")) else {
            return false;
        };
        let Ok(decoded) = base64::engine::general_purpose::STANDARD.decode(encoded.trim()) else {
            return false;
        };
        let Ok(credentials) = String::from_utf8(decoded) else {
            return false;
        };

        match credentials.split_once(':') {
            Some((username, password)) => {
                username == self.http_username && hash_password(password) == self.http_password
            }
            None => false,
        }
    }
}

static URL_PATTERN: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^https?://[A-Za-z0-9.\-]+(:[0-9]{1,5})?(/[^\s]*)?$").expect("valid URL pattern")
});

/// Accepts `http(s)://host[:port][/path]` upstream URLs.
pub fn is_valid_url(url: &str) -> bool {
    URL_PATTERN.is_match(url)
}

/// SHA-256 hex digest used for the stored basic-auth password.
pub fn hash_password(password: &str) -> String {
    hex::encode(Sha256::digest(password.as_bytes()))
}

/// The settings file on disk.
pub struct SettingsFile {
    path: PathBuf,
    write_lock: Mutex<()>,
}

impl SettingsFile {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            write_lock: Mutex::new(()),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Read a fresh snapshot. A missing or invalid document reads as empty
    /// settings.
    pub fn load(&self) -> Settings {
        let content = match fs::read_to_string(&self.path) {
            Ok(content) => content,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                debug!("Settings file {:?} does not exist, using defaults", self.path);
                return Settings::default();
            }
            Err(e) => {
                warn!("Error reading settings file {:?}: {}", self.path, e);
                return Settings::default();
            }
        };

        if content.trim().is_empty() {
            return Settings::default();
        }

        match serde_json::from_str::<Settings>(&content) {
            Ok(mut settings) => {
                let url = settings.upstream_server.clone();
                settings.set_upstream_server(&url);
                settings
            }
            Err(e) => {
                warn!("Invalid settings file {:?}: {}", self.path, e);
                Settings::default()
            }
        }
    }

    /// Write a snapshot, replacing the document.
    pub fn save(&self, settings: &Settings) -> Result<(), StoreError> {
        let _guard = self.write_lock.lock();
        self.write(settings)
    }

    /// Read-modify-write under the settings lock. Returns the saved snapshot.
    pub fn update(&self, f: impl FnOnce(&mut Settings)) -> Result<Settings, StoreError> {
        let _guard = self.write_lock.lock();
        let mut settings = self.load();
        f(&mut settings);
        self.write(&settings)?;
        Ok(settings)
    }

    fn write(&self, settings: &Settings) -> Result<(), StoreError> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent).map_err(|e| StoreError::io(parent, e))?;
        }
        let json = serde_json::to_string_pretty(settings)?;
        fs::write(&self.path, json).map_err(|e| StoreError::io(&self.path, e))?;
        info!("Saved settings to {:?}", self.path);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn settings_with(entries: &[(&str, bool)]) -> Settings {
        let mut settings = Settings::default();
        for (id, flag) in entries {
            settings.set_upstream_flag(id, *flag);
        }
        settings
    }

    #[test]
    fn test_upstream_server_trailing_slash() {
        let mut settings = Settings::default();
        assert_eq!(settings.upstream_server(), None);
        settings.set_upstream_server("http://localhost:9000/");
        assert_eq!(settings.upstream_server(), Some("http://localhost:9000"));
        settings.set_upstream_server("");
        assert_eq!(settings.upstream_server(), None);
    }

    #[test]
    fn test_exact_flag_wins() {
        let settings = settings_with(&[("GET-user/__name", true), ("GET-user/lisa", false)]);
        assert!(!settings.resource_upstream_enabled("GET", "user/lisa"));
        assert!(settings.resource_upstream_enabled("GET", "user/bart"));
    }

    #[test]
    fn test_template_flag_lookup_is_anchored() {
        let settings = settings_with(&[("GET-user/__name", true)]);
        assert!(settings.resource_upstream_enabled("GET", "user/lisa"));
        assert!(!settings.resource_upstream_enabled("GET", "user"));
        assert!(!settings.resource_upstream_enabled("GET", "user/lisa/family"));
        assert!(!settings.resource_upstream_enabled("POST", "user/lisa"));
        assert!(!settings.resource_upstream_enabled("GET", "users/lisa"));
    }

    #[test]
    fn test_rpc_flag() {
        let settings = settings_with(&[("RPC-user.list", true)]);
        assert!(settings.rpc_upstream_enabled("user.list"));
        assert!(!settings.rpc_upstream_enabled("user.get"));
    }

    #[test]
    fn test_basic_auth_gate() {
        let mut settings = Settings::default();
        assert!(settings.check_basic_auth(None));

        settings.set_http_credentials("tester", "secret");
        assert!(settings.auth_required());
        assert_eq!(settings.http_password, hash_password("secret"));

        let good = base64::engine::general_purpose::STANDARD.encode("tester:secret");
        let bad = base64::engine::general_purpose::STANDARD.encode("tester:wrong");
        assert!(settings.check_basic_auth(Some(&format!("Basic {good}"))));
        assert!(!settings.check_basic_auth(Some(&format!("Basic {bad}"))));
        assert!(!settings.check_basic_auth(Some("Bearer token")));
        assert!(!settings.check_basic_auth(None));

        settings.set_http_credentials("tester", "");
        assert_eq!(settings.http_password, hash_password("secret"));
        settings.set_http_credentials("", "");
        assert!(!settings.auth_required());
        assert!(settings.http_password.is_empty());
    }

    #[test]
    fn test_document_round_trip_keeps_unknown_keys() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("application.json");
        fs::write(
            &path,
            r#"{"resources": {"GET-user": {"category": "users", "upstream-server": true, "color": "red"}},
                "upstream-server": "http://up/", "password": "x"}"#,
        )
        .unwrap();

        let file = SettingsFile::new(&path);
        let settings = file.load();
        assert_eq!(settings.upstream_server(), Some("http://up"));
        assert_eq!(settings.category("GET-user"), Some("users"));
        assert_eq!(settings.resources["GET-user"].extra["color"], "red");

        file.update(|s| s.set_upstream_flag("RPC-user.list", true)).unwrap();
        let reloaded = file.load();
        assert_eq!(reloaded.resources["GET-user"].extra["color"], "red");
        assert!(reloaded.rpc_upstream_enabled("user.list"));
        assert_eq!(reloaded.password, "x");
    }

    #[test]
    fn test_missing_or_invalid_document_is_empty() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("application.json");
        let file = SettingsFile::new(&path);
        assert_eq!(file.load(), Settings::default());

        fs::write(&path, "{not json").unwrap();
        assert_eq!(file.load(), Settings::default());
    }

    #[test]
    fn test_empty_fields_are_not_written() {
        let mut settings = Settings::default();
        settings.set_category("GET-user", "users");
        let json = serde_json::to_value(&settings).unwrap();
        assert_eq!(
            json,
            serde_json::json!({"resources": {"GET-user": {"category": "users"}}})
        );
    }

    #[test]
    fn test_url_validation() {
        assert!(is_valid_url("http://localhost:9000"));
        assert!(is_valid_url("https://api.example.com/v1/"));
        assert!(!is_valid_url("ftp://example.com"));
        assert!(!is_valid_url("localhost:9000"));
        assert!(!is_valid_url("http://exa mple.com"));
    }
}
