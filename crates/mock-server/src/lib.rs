//! File-backed HTTP and RPC mock server.
//!
//! Stored responses live in an api directory keyed by method, URL path,
//! status code and format. Requests that miss can fall through to a real
//! upstream server; RPC calls (XML-RPC, JSON-RPC, FastRPC) are answered from
//! `RPC2/`.

pub mod access_log;
pub mod admin;
pub mod config;
pub mod engine;
pub mod error;
pub mod format;
pub mod matcher;
pub mod provider;
pub mod server;
pub mod settings;
pub mod store;
pub mod upstream;

pub use config::Config;
pub use engine::ResolutionEngine;
pub use error::{ResolveError, StoreError};
pub use format::Format;
pub use provider::Response;
pub use server::MockServer;
