//! Error types shared by the resolution path and the admin surface.

use std::path::PathBuf;

/// Shared RPC fault: parse error.
pub const PARSE_ERROR: (i32, &str) = (-32700, "parse_error");
/// Shared RPC fault: unknown method.
pub const METHOD_NOT_FOUND: (i32, &str) = (-32601, "method_not_found");

/// Failure states detected while resolving a request.
///
/// None of these escape the provider or gateway that detects them: each is
/// turned into a well-formed response at that point and returned alongside it
/// as the error signal the engine inspects for fallback.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ResolveError {
    #[error("no stored response matches the request")]
    NotFound,
    #[error("upstream server unreachable: {0}")]
    UpstreamUnreachable(String),
    #[error("malformed RPC payload")]
    MalformedRpcPayload,
    #[error("RPC method not found")]
    MethodNotFound,
}

impl ResolveError {
    /// Numeric code of the error signal (0 is reserved for success).
    pub fn code(&self) -> i32 {
        match self {
            ResolveError::NotFound | ResolveError::UpstreamUnreachable(_) => 1,
            ResolveError::MalformedRpcPayload => PARSE_ERROR.0,
            ResolveError::MethodNotFound => METHOD_NOT_FOUND.0,
        }
    }

    /// Fault code and message for RPC encodings.
    pub fn fault(&self) -> (i32, &'static str) {
        match self {
            ResolveError::MethodNotFound => METHOD_NOT_FOUND,
            _ => PARSE_ERROR,
        }
    }
}

/// Errors raised by the file-backed stores on write paths.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("I/O error on {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("invalid resource path: {0}")]
    InvalidPath(String),
    #[error("invalid method name: {0}")]
    InvalidMethod(String),
    #[error("invalid settings document: {0}")]
    Settings(#[from] serde_json::Error),
}

impl StoreError {
    pub(crate) fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        StoreError::Io {
            path: path.into(),
            source,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rpc_fault_codes() {
        assert_eq!(ResolveError::MalformedRpcPayload.fault(), (-32700, "parse_error"));
        assert_eq!(ResolveError::MethodNotFound.fault(), (-32601, "method_not_found"));
        assert_eq!(ResolveError::MethodNotFound.code(), -32601);
    }

    #[test]
    fn test_rest_errors_are_nonzero() {
        assert_ne!(ResolveError::NotFound.code(), 0);
        assert_ne!(ResolveError::UpstreamUnreachable("x".into()).code(), 0);
    }
}
