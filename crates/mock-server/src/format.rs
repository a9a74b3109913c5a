//! Response format table and negotiation.
//!
//! A format is chosen, in increasing priority, from the process default, the
//! request path extension (`/user.xml`) and an `Accept` header whose value is
//! exactly one of the known MIME strings.

use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;

/// Formats a stored response can be kept in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Deserialize, Serialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum Format {
    #[default]
    Json,
    Xml,
    Txt,
    Html,
    Csv,
    Rss,
    Atom,
    Md,
}

impl Format {
    pub const ALL: [Format; 8] = [
        Format::Json,
        Format::Xml,
        Format::Txt,
        Format::Html,
        Format::Csv,
        Format::Rss,
        Format::Atom,
        Format::Md,
    ];

    /// File extension and wire name of the format.
    pub fn as_str(&self) -> &'static str {
        match self {
            Format::Json => "json",
            Format::Xml => "xml",
            Format::Txt => "txt",
            Format::Html => "html",
            Format::Csv => "csv",
            Format::Rss => "rss",
            Format::Atom => "atom",
            Format::Md => "md",
        }
    }

    /// MIME strings recognised for the format. The first one is used when a
    /// `Content-Type` has to be injected.
    pub fn mimes(&self) -> &'static [&'static str] {
        match self {
            Format::Json => &["application/json"],
            Format::Xml => &["application/xml", "text/xml", "application/x-xml"],
            Format::Txt => &["text/plain"],
            Format::Html => &["text/html"],
            Format::Csv => &["text/csv"],
            Format::Rss => &["application/rss+xml"],
            Format::Atom => &["application/atom+xml"],
            Format::Md => &["text/x-markdown"],
        }
    }

    /// `Content-Type` value injected when a response carries none.
    pub fn content_type(&self) -> String {
        format!("{}; charset=utf-8", self.mimes()[0])
    }

    /// Look up a format by exact MIME string.
    pub fn from_mime(mime: &str) -> Option<Format> {
        SUPPORTED_MIMES.get(mime).copied()
    }
}

impl fmt::Display for Format {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Format {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.strip_prefix('.').unwrap_or(s);
        Format::ALL
            .iter()
            .find(|f| f.as_str() == s)
            .copied()
            .ok_or_else(|| format!("unsupported format: {s}"))
    }
}

/// Reverse MIME lookup. A MIME string maps to exactly one format; if the
/// table ever listed one twice the later format would win.
static SUPPORTED_MIMES: Lazy<HashMap<&'static str, Format>> = Lazy::new(|| {
    let mut mimes = HashMap::new();
    for format in Format::ALL {
        for mime in format.mimes() {
            mimes.insert(*mime, format);
        }
    }
    mimes
});

/// Pick the response format for a request.
pub fn negotiate(extension: Option<&str>, accept: Option<&str>, default: Format) -> Format {
    let mut format = extension
        .and_then(|ext| ext.parse::<Format>().ok())
        .unwrap_or(default);

    if let Some(accepted) = accept.and_then(Format::from_mime) {
        format = accepted;
    }

    format
}

/// Split a request path ending in a known `.{format}` suffix into the path
/// and the extension.
pub fn split_extension(path: &str) -> (&str, Option<&str>) {
    if let Some(dot) = path.rfind('.') {
        let ext = &path[dot + 1..];
        if !ext.contains('/') && ext.parse::<Format>().is_ok() {
            return (&path[..dot], Some(&path[dot..]));
        }
    }
    (path, None)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_extension_wins_over_default() {
        assert_eq!(negotiate(Some(".xml"), None, Format::Json), Format::Xml);
        assert_eq!(negotiate(Some("csv"), None, Format::Json), Format::Csv);
    }

    #[test]
    fn test_default_without_extension() {
        assert_eq!(negotiate(None, None, Format::Json), Format::Json);
        assert_eq!(negotiate(None, None, Format::Txt), Format::Txt);
    }

    #[test]
    fn test_accept_overrides_extension_and_default() {
        assert_eq!(
            negotiate(None, Some("application/json"), Format::Txt),
            Format::Json
        );
        assert_eq!(
            negotiate(Some(".json"), Some("text/xml"), Format::Json),
            Format::Xml
        );
    }

    #[test]
    fn test_unrecognised_accept_is_ignored() {
        assert_eq!(negotiate(Some(".xml"), Some("*/*"), Format::Json), Format::Xml);
        assert_eq!(
            negotiate(None, Some("application/json, text/plain"), Format::Csv),
            Format::Csv
        );
    }

    #[test]
    fn test_every_mime_maps_back_to_its_format() {
        for format in Format::ALL {
            for mime in format.mimes() {
                assert_eq!(Format::from_mime(mime), Some(format), "{mime}");
            }
        }
        assert_eq!(Format::from_mime("application/x-xml"), Some(Format::Xml));
    }

    #[test]
    fn test_content_type() {
        assert_eq!(Format::Json.content_type(), "application/json; charset=utf-8");
        assert_eq!(Format::Xml.content_type(), "application/xml; charset=utf-8");
    }

    #[test]
    fn test_split_extension() {
        assert_eq!(split_extension("user.xml"), ("user", Some(".xml")));
        assert_eq!(split_extension("a/b.json"), ("a/b", Some(".json")));
        assert_eq!(split_extension("user"), ("user", None));
        assert_eq!(split_extension("v1.2/user"), ("v1.2/user", None));
        assert_eq!(split_extension("file.exe"), ("file.exe", None));
    }

    #[test]
    fn test_format_serde() {
        let format: Format = serde_json::from_str(r#""atom""#).unwrap();
        assert_eq!(format, Format::Atom);
        assert_eq!(serde_json::to_string(&Format::Md).unwrap(), r#""md""#);
    }
}
