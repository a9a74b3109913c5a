//! URL path to stored-file resolution.
//!
//! A request path is first looked up literally. Failing that, every segment
//! may also be served by a variable directory (`__name`), so
//! `/user/lisa/family/bart` finds `user/__name/family/__name2/`.
//!
//! The tree is walked depth-first with siblings sorted literal names first,
//! then by name, and the first directory that matches and holds the wanted
//! file wins. Literal segments therefore beat variable ones at the same
//! position.
//!
//! Paths with `.` or `..` segments, backslashes or NUL bytes never resolve,
//! so nothing outside the root is reachable. A variable directory only stands
//! for a non-empty segment.

use crate::store::{validate_relative, VARIABLE_MARKER};
use once_cell::sync::Lazy;
use regex::Regex;
use std::cmp::Ordering;
use std::ffi::OsStr;
use std::path::{Path, PathBuf};
use tracing::debug;
use walkdir::WalkDir;

static REPEATED_SLASHES: Lazy<Regex> = Lazy::new(|| Regex::new(r"/{2,}").expect("valid regex"));

/// A stored file found for a request path.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedPath {
    pub content_file: PathBuf,
    pub dir: PathBuf,
}

/// Find `filename` for `url_path` under `root`.
pub fn resolve(root: &Path, url_path: &str, filename: &str) -> Option<ResolvedPath> {
    let collapsed = REPEATED_SLASHES.replacen(url_path, 1, "/");
    let url_path = collapsed.strip_prefix('/').unwrap_or(&collapsed);
    if validate_relative(url_path).is_err() {
        debug!("Refusing to resolve {}", url_path);
        return None;
    }

    let dir = root.join(url_path);
    let content_file = dir.join(filename);
    if content_file.is_file() {
        return Some(ResolvedPath { content_file, dir });
    }

    let url_path = url_path.strip_suffix('/').unwrap_or(url_path);
    if !url_path.contains('/') {
        return None;
    }

    let segments: Vec<&str> = url_path.split('/').collect();
    if segments.iter().any(|segment| segment.is_empty()) {
        return None;
    }
    let pattern = segments
        .iter()
        .map(|segment| format!("({}|{}[^/]*)", regex::escape(segment), VARIABLE_MARKER))
        .collect::<Vec<_>>()
        .join("/");
    let template = Regex::new(&format!("^{pattern}$")).ok()?;

    let found = WalkDir::new(root)
        .min_depth(1)
        .max_depth(segments.len())
        .sort_by(|a, b| literal_first(a.file_name(), b.file_name()))
        .into_iter()
        .filter_map(Result::ok)
        .filter(|entry| entry.file_type().is_dir() && entry.depth() == segments.len())
        .find(|entry| {
            let Ok(relative) = entry.path().strip_prefix(root) else {
                return false;
            };
            let relative = relative.to_string_lossy().replace('\\', "/");
            template.is_match(&relative) && entry.path().join(filename).is_file()
        })?;

    debug!("Resolved {} to {}", url_path, found.path().display());
    let dir = found.into_path();
    Some(ResolvedPath {
        content_file: dir.join(filename),
        dir,
    })
}

fn literal_first(a: &OsStr, b: &OsStr) -> Ordering {
    let a = a.to_string_lossy();
    let b = b.to_string_lossy();
    let a_var = a.starts_with(VARIABLE_MARKER);
    let b_var = b.starts_with(VARIABLE_MARKER);
    a_var.cmp(&b_var).then_with(|| a.cmp(&b))
}
