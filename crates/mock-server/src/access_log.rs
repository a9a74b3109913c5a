//! Request log: one JSON line per served request in
//! `{api_dir}/access-YYYY-MM-DD.log`.

use crate::provider::Response;
use chrono::{Local, NaiveDate};
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::fs::{self, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::warn;

/// Response part of a log entry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LoggedResponse {
    pub content: String,
    pub headers: Vec<(String, String)>,
    pub status_code: u16,
}

impl From<&Response> for LoggedResponse {
    fn from(response: &Response) -> Self {
        Self {
            content: String::from_utf8_lossy(&response.content).into_owned(),
            headers: response.headers.clone(),
            status_code: response.status_code,
        }
    }
}

/// One logged request.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RequestLogEntry {
    pub method: String,
    pub uri: String,
    pub url_path: String,
    pub status: u16,
    pub remote_ip: String,
    /// Milliseconds spent serving the request.
    pub request_time: f64,
    pub headers: Map<String, Value>,
    pub body: String,
    pub time: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub response: Option<LoggedResponse>,
}

impl RequestLogEntry {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        method: &str,
        uri: &str,
        url_path: &str,
        remote_ip: &str,
        elapsed: Duration,
        headers: &[(String, String)],
        body: &[u8],
        response: &Response,
        include_response: bool,
    ) -> Self {
        let mut header_map = Map::new();
        for (name, value) in headers {
            let merged = match header_map.get(name).and_then(Value::as_str) {
                Some(previous) => format!("{previous}, {value}"),
                None => value.clone(),
            };
            header_map.insert(name.clone(), Value::String(merged));
        }

        Self {
            method: method.to_string(),
            uri: uri.to_string(),
            url_path: url_path.to_string(),
            status: response.status_code,
            remote_ip: remote_ip.to_string(),
            request_time: elapsed.as_secs_f64() * 1000.0,
            headers: header_map,
            body: String::from_utf8_lossy(body).into_owned(),
            time: Local::now().format("%Y-%m-%dT%H:%M:%S%.6f").to_string(),
            response: include_response.then(|| LoggedResponse::from(response)),
        }
    }
}

/// Write-only sink for request log entries. Failures never reach the
/// request path.
pub trait RequestLog: Send + Sync {
    fn append(&self, entry: &RequestLogEntry);
}

/// Daily JSON-lines files in a directory.
pub struct FileRequestLog {
    dir: PathBuf,
    write_lock: Mutex<()>,
}

impl FileRequestLog {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self {
            dir: dir.into(),
            write_lock: Mutex::new(()),
        }
    }

    pub fn path_for(&self, date: NaiveDate) -> PathBuf {
        self.dir
            .join(format!("access-{}.log", date.format("%Y-%m-%d")))
    }

    pub fn today_path(&self) -> PathBuf {
        self.path_for(Local::now().date_naive())
    }

    /// Entries logged on `date`. Lines that do not parse are skipped.
    pub fn read_entries(&self, date: NaiveDate) -> Vec<RequestLogEntry> {
        read_entries(&self.path_for(date))
    }
}

impl RequestLog for FileRequestLog {
    fn append(&self, entry: &RequestLogEntry) {
        let line = match serde_json::to_string(entry) {
            Ok(line) => line,
            Err(e) => {
                warn!("Failed to serialize request log entry: {}", e);
                return;
            }
        };

        let path = self.today_path();
        let _guard = self.write_lock.lock();
        let result = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&path)
            .and_then(|mut file| writeln!(file, "{line}"));
        if let Err(e) = result {
            warn!("Failed to write request log {:?}: {}", path, e);
        }
    }
}

fn read_entries(path: &Path) -> Vec<RequestLogEntry> {
    let Ok(content) = fs::read_to_string(path) else {
        return Vec::new();
    };
    content
        .lines()
        .filter(|line| !line.trim().is_empty())
        .filter_map(|line| match serde_json::from_str(line) {
            Ok(entry) => Some(entry),
            Err(e) => {
                warn!("Skipping malformed request log line in {:?}: {}", path, e);
                None
            }
        })
        .collect()
}
