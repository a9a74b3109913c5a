//! REST resource methods on disk.

use super::headers::{format_header_block, parse_header_block, HeaderList};
use super::paths::{resource_id, to_file_path, validate_method, validate_relative};
use super::{body_filename, description_filename, header_filename, read_text, WriteLocks};
use crate::error::StoreError;
use crate::format::Format;
use bytes::Bytes;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

/// One stored response variant of a resource method.
#[derive(Debug, Clone, PartialEq)]
pub struct StoredResponse {
    pub status_code: u16,
    pub format: Format,
    pub body: Bytes,
    pub headers: HeaderList,
}

/// A method (GET, POST, ...) of the resource at one URL path.
#[derive(Debug, Clone)]
pub struct ResourceMethod {
    url_path: String,
    method: &'static str,
    file_path: String,
    resource_dir: PathBuf,
}

impl ResourceMethod {
    /// Address the method `method` of the resource at `url_path` (template
    /// syntax allowed, e.g. `/user/{name}`).
    pub fn new(api_dir: &Path, url_path: &str, method: &str) -> Result<Self, StoreError> {
        let method = validate_method(method)?;
        let file_path = to_file_path(url_path);
        validate_relative(&file_path)?;

        Ok(Self {
            url_path: url_path.to_string(),
            method,
            resource_dir: api_dir.join(&file_path),
            file_path,
        })
    }

    /// Settings key of this resource method.
    pub fn id(&self) -> String {
        resource_id(self.method, &self.file_path)
    }

    pub fn method(&self) -> &'static str {
        self.method
    }

    pub fn url_path(&self) -> &str {
        &self.url_path
    }

    pub fn resource_dir(&self) -> &Path {
        &self.resource_dir
    }

    /// All stored variants of this method, ordered by file name.
    pub fn load_responses(&self) -> Vec<StoredResponse> {
        let Ok(entries) = fs::read_dir(&self.resource_dir) else {
            return Vec::new();
        };

        let mut names: Vec<String> = entries
            .filter_map(Result::ok)
            .filter(|entry| entry.path().is_file())
            .filter_map(|entry| entry.file_name().into_string().ok())
            .collect();
        names.sort();

        names
            .iter()
            .filter_map(|name| parse_body_filename(self.method, name))
            .map(|(status_code, format)| {
                let body = fs::read(self.resource_dir.join(body_filename(
                    self.method,
                    status_code,
                    format,
                )))
                .map(Bytes::from)
                .unwrap_or_default();
                let headers = read_text(
                    &self
                        .resource_dir
                        .join(header_filename(self.method, status_code, format)),
                )
                .map(|text| parse_header_block(&text))
                .unwrap_or_default();

                StoredResponse {
                    status_code,
                    format,
                    body,
                    headers,
                }
            })
            .collect()
    }

    pub fn load_description(&self) -> Option<String> {
        read_text(&self.resource_dir.join(description_filename(self.method)))
    }

    /// Write one variant, overwriting body and header files. `headers` is the
    /// raw header block as entered by the user.
    pub fn save_response(
        &self,
        locks: &WriteLocks,
        status_code: u16,
        format: Format,
        body: &[u8],
        headers: &str,
    ) -> Result<(), StoreError> {
        locks.with_lock(&self.resource_dir, || {
            fs::create_dir_all(&self.resource_dir)
                .map_err(|e| StoreError::io(&self.resource_dir, e))?;

            let content_path = self
                .resource_dir
                .join(body_filename(self.method, status_code, format));
            fs::write(&content_path, body).map_err(|e| StoreError::io(&content_path, e))?;

            let headers_path = self
                .resource_dir
                .join(header_filename(self.method, status_code, format));
            fs::write(&headers_path, headers).map_err(|e| StoreError::io(&headers_path, e))?;

            info!(
                "Saved {} {} ({} {})",
                self.method, self.url_path, status_code, format
            );
            Ok(())
        })
    }

    /// Write a typed response variant.
    pub fn save(&self, locks: &WriteLocks, response: &StoredResponse) -> Result<(), StoreError> {
        self.save_response(
            locks,
            response.status_code,
            response.format,
            &response.body,
            &format_header_block(&response.headers),
        )
    }

    pub fn save_description(&self, locks: &WriteLocks, description: &str) -> Result<(), StoreError> {
        locks.with_lock(&self.resource_dir, || {
            fs::create_dir_all(&self.resource_dir)
                .map_err(|e| StoreError::io(&self.resource_dir, e))?;
            let path = self.resource_dir.join(description_filename(self.method));
            fs::write(&path, description).map_err(|e| StoreError::io(&path, e))
        })
    }

    /// Remove every body, header and description file of this method.
    /// Returns the number of files removed.
    pub fn delete(&self, locks: &WriteLocks) -> Result<usize, StoreError> {
        locks.with_lock(&self.resource_dir, || {
            let pattern = format!(
                "{}/{}_*",
                glob::Pattern::escape(&self.resource_dir.to_string_lossy()),
                self.method
            );
            let paths = glob::glob(&pattern)
                .map_err(|e| StoreError::InvalidPath(e.to_string()))?
                .filter_map(Result::ok)
                .filter(|path| path.is_file());

            let mut removed = 0;
            for path in paths {
                fs::remove_file(&path).map_err(|e| StoreError::io(&path, e))?;
                debug!("Removed {}", path.display());
                removed += 1;
            }

            info!("Deleted {} {} ({} files)", self.method, self.url_path, removed);
            Ok(removed)
        })
    }
}

/// Parse `{METHOD}_{STATUS}.{FORMAT}` into status and format.
pub(crate) fn parse_body_filename(method: &str, name: &str) -> Option<(u16, Format)> {
    let rest = name.strip_prefix(method)?.strip_prefix('_')?;
    let (status, format) = rest.split_once('.')?;
    if status.len() != 3 || !status.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    Some((status.parse().ok()?, format.parse().ok()?))
}
