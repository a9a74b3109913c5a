//! Conversions between URL templates, on-disk paths and resource ids.
//!
//! A variable segment is written `{name}` in URL templates and stored as a
//! directory named `__name`. Resource ids, used as keys in the settings
//! document, are `{METHOD}-{file_path}`.

use super::SUPPORTED_METHODS;
use crate::error::StoreError;

/// Marker prefix of a variable segment directory.
pub const VARIABLE_MARKER: &str = "__";

/// Convert an on-disk relative path into its URL template form.
pub fn to_url_path(file_path: &str) -> String {
    file_path
        .split('/')
        .map(|segment| match segment.strip_prefix(VARIABLE_MARKER) {
            Some(name) => format!("{{{name}}}"),
            None => segment.to_string(),
        })
        .collect::<Vec<_>>()
        .join("/")
}

/// Convert a URL template into the on-disk relative path (no leading `/`).
pub fn to_file_path(url_path: &str) -> String {
    let url_path = url_path.strip_prefix('/').unwrap_or(url_path);
    url_path
        .split('/')
        .map(|segment| {
            match segment
                .strip_prefix('{')
                .and_then(|rest| rest.strip_suffix('}'))
            {
                Some(name) => format!("{VARIABLE_MARKER}{name}"),
                None => segment.to_string(),
            }
        })
        .collect::<Vec<_>>()
        .join("/")
}

/// Settings key of a REST resource method.
pub fn resource_id(method: &str, file_path: &str) -> String {
    format!("{method}-{file_path}")
}

/// Settings key of an RPC method.
pub fn rpc_resource_id(method_name: &str) -> String {
    format!("RPC-{method_name}")
}

/// Split a resource id into its HTTP method and path.
pub fn parse_resource_id(id: &str) -> Option<(&'static str, &str)> {
    SUPPORTED_METHODS.iter().find_map(|method| {
        id.strip_prefix(method)
            .and_then(|rest| rest.strip_prefix('-'))
            .map(|path| (*method, path))
    })
}

/// Reject paths that would escape the api directory.
pub fn validate_relative(file_path: &str) -> Result<(), StoreError> {
    if file_path
        .split('/')
        .any(|segment| segment == ".." || segment == ".")
        || file_path.contains('\\')
        || file_path.contains('\0')
    {
        return Err(StoreError::InvalidPath(file_path.to_string()));
    }
    Ok(())
}

/// Normalise an HTTP method name and check it is supported.
pub fn validate_method(method: &str) -> Result<&'static str, StoreError> {
    let upper = method.to_ascii_uppercase();
    SUPPORTED_METHODS
        .iter()
        .find(|m| **m == upper)
        .copied()
        .ok_or_else(|| StoreError::InvalidMethod(method.to_string()))
}

/// Lower-case, dash-separated identifier for a URL path.
pub fn slugify(value: &str) -> String {
    let mut slug = String::with_capacity(value.len());
    let mut dash = false;
    for c in value.chars() {
        if c.is_ascii_alphanumeric() {
            slug.push(c.to_ascii_lowercase());
            dash = false;
        } else if !dash && !slug.is_empty() {
            slug.push('-');
            dash = true;
        }
    }
    while slug.ends_with('-') {
        slug.pop();
    }
    slug
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_template_conversions() {
        assert_eq!(to_file_path("/user/{name}/family"), "user/__name/family");
        assert_eq!(to_file_path("user"), "user");
        assert_eq!(to_url_path("user/__name/family/__name2"), "user/{name}/family/{name2}");
    }

    #[test]
    fn test_parse_resource_id() {
        assert_eq!(parse_resource_id("GET-user/__name"), Some(("GET", "user/__name")));
        assert_eq!(parse_resource_id("PATCH-a"), Some(("PATCH", "a")));
        assert_eq!(parse_resource_id("RPC-user.list"), None);
        assert_eq!(parse_resource_id("GETuser"), None);
    }

    #[test]
    fn test_validate_relative() {
        assert!(validate_relative("user/__name").is_ok());
        assert!(validate_relative("../etc").is_err());
        assert!(validate_relative("a/./b").is_err());
    }

    #[test]
    fn test_validate_method() {
        assert_eq!(validate_method("get").unwrap(), "GET");
        assert!(validate_method("TRACE").is_err());
    }

    #[test]
    fn test_slugify() {
        assert_eq!(slugify("/user/{name}"), "user-name");
        assert_eq!(slugify(""), "");
    }
}
