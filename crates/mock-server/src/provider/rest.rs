//! REST mock provider.

use super::{Response, Served};
use crate::error::ResolveError;
use crate::format::Format;
use crate::matcher;
use crate::store::{body_filename, header_filename, read_body, read_headers};
use std::path::{Path, PathBuf};
use tracing::debug;

/// Serves stored REST responses from an api directory.
#[derive(Debug, Clone)]
pub struct RestMockProvider {
    api_dir: PathBuf,
}

impl RestMockProvider {
    pub fn new(api_dir: impl Into<PathBuf>) -> Self {
        Self {
            api_dir: api_dir.into(),
        }
    }

    pub fn api_dir(&self) -> &Path {
        &self.api_dir
    }

    /// Look up the stored response for a request. A miss yields the 404 hint
    /// with [`ResolveError::NotFound`].
    pub fn serve(&self, method: &str, url_path: &str, status_code: u16, format: Format) -> Served {
        let filename = body_filename(method, status_code, format);

        let hit = matcher::resolve(&self.api_dir, url_path, &filename).and_then(|resolved| {
            let body = read_body(&resolved.content_file)?;
            let headers =
                read_headers(&resolved.dir.join(header_filename(method, status_code, format)));
            Some(Response::new(body, headers, status_code))
        });

        match hit {
            Some(response) => {
                debug!("Mock hit for {} {} ({})", method, url_path, filename);
                Served::ok(response)
            }
            None => {
                debug!("Mock miss for {} {} ({})", method, url_path, filename);
                Served::failed(
                    not_found_hint(method, url_path, status_code, format),
                    ResolveError::NotFound,
                )
            }
        }
    }
}

/// 404 page linking to the admin create action for the missing resource.
pub fn not_found_hint(method: &str, url_path: &str, status_code: u16, format: Format) -> Response {
    let url_path = if url_path.starts_with('/') {
        url_path.to_string()
    } else {
        format!("/{url_path}")
    };
    let body = format!(
        "Api does't exists, <a href=\"/__manage/create?url_path={}&method={}&status_code={}&format={}\">create resource method</a>",
        html_escape(&url_path),
        html_escape(method),
        status_code,
        html_escape(format.as_str()),
    );
    Response::new(
        body,
        vec![("Content-Type".to_string(), "text/html".to_string())],
        404,
    )
}

pub(crate) fn html_escape(value: &str) -> String {
    let mut escaped = String::with_capacity(value.len());
    for c in value.chars() {
        match c {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&quot;"),
            '\'' => escaped.push_str("&#39;"),
            _ => escaped.push(c),
        }
    }
    escaped
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    fn fixture() -> tempfile::TempDir {
        let dir = tempfile::tempdir().unwrap();
        let user = dir.path().join("user");
        fs::create_dir_all(user.join("__name")).unwrap();
        fs::write(user.join("GET_200.json"), "[\"john\", \"tom\"]\n").unwrap();
        fs::write(user.join("__name/GET_404.json"), "{\"error\": \"missing\"}").unwrap();
        fs::write(user.join("__name/GET_H_404.json"), "MyCustomHeader: test\n").unwrap();
        fs::write(user.join("POST_200.json"), "").unwrap();
        dir
    }

    #[test]
    fn test_hit_returns_stored_bytes() {
        let dir = fixture();
        let provider = RestMockProvider::new(dir.path());
        let served = provider.serve("GET", "/user", 200, Format::Json);
        assert!(served.is_ok());
        assert_eq!(served.response.status_code, 200);
        assert_eq!(&served.response.content[..], b"[\"john\", \"tom\"]\n");
        assert!(served.response.headers.is_empty());
    }

    #[test]
    fn test_hit_with_headers_and_status() {
        let dir = fixture();
        let provider = RestMockProvider::new(dir.path());
        let served = provider.serve("GET", "/user/lisa", 404, Format::Json);
        assert!(served.is_ok());
        assert_eq!(served.response.status_code, 404);
        assert_eq!(served.response.header("MyCustomHeader"), Some("test"));
    }

    #[test]
    fn test_empty_file_is_a_miss() {
        let dir = fixture();
        let provider = RestMockProvider::new(dir.path());
        let served = provider.serve("POST", "/user", 200, Format::Json);
        assert_eq!(served.error, Some(ResolveError::NotFound));
        assert_eq!(served.response.status_code, 404);
    }

    #[test]
    fn test_miss_renders_escaped_hint() {
        let dir = fixture();
        let provider = RestMockProvider::new(dir.path());
        let served = provider.serve("GET", "/a<b>", 201, Format::Xml);
        assert_eq!(served.error, Some(ResolveError::NotFound));
        assert_eq!(served.response.header("Content-Type"), Some("text/html"));
        let body = String::from_utf8(served.response.content.to_vec()).unwrap();
        assert!(body.contains("url_path=/a&lt;b&gt;"));
        assert!(body.contains("method=GET"));
        assert!(body.contains("status_code=201"));
        assert!(body.contains("format=xml"));
    }

    #[test]
    fn test_hint_adds_leading_slash() {
        let hint = not_found_hint("PUT", "items", 200, Format::Json);
        let body = String::from_utf8(hint.content.to_vec()).unwrap();
        assert!(body.starts_with(
            "Api does't exists, <a href=\"/__manage/create?url_path=/items&method=PUT"
        ));
    }
}
