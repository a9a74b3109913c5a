//! HTTP front end.
//!
//! One hyper http1 connection task per accepted socket. Requests are routed
//! by [`handler::handle_request`]: CORS preflight, the `/__manage` admin API,
//! the `/RPC2` endpoint and everything else as a REST mock lookup.

mod handler;

pub use handler::handle_request;

use crate::access_log::FileRequestLog;
use crate::config::{Config, RpcConfig};
use crate::engine::ResolutionEngine;
use crate::format::Format;
use crate::settings::SettingsFile;
use crate::store::WriteLocks;
use crate::upstream::{Upstream, UpstreamGateway};
use anyhow::Context;
use hyper::server::conn::http1;
use hyper::service::service_fn;
use hyper_util::rt::TokioIo;
use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::net::TcpListener;
use tracing::{debug, info};

/// State shared by every connection.
pub struct AppState {
    api_dir: PathBuf,
    default_format: Format,
    rpc: RpcConfig,
    engine: ResolutionEngine,
    settings: SettingsFile,
    request_log: FileRequestLog,
    write_locks: WriteLocks,
}

impl AppState {
    pub fn new(config: &Config, upstream: Arc<dyn Upstream>) -> Self {
        Self {
            api_dir: config.api_dir.clone(),
            default_format: config.default_format,
            rpc: config.rpc.clone(),
            engine: ResolutionEngine::new(&config.api_dir, upstream),
            settings: SettingsFile::new(config.settings_path()),
            request_log: FileRequestLog::new(&config.api_dir),
            write_locks: WriteLocks::new(),
        }
    }

    pub fn api_dir(&self) -> &Path {
        &self.api_dir
    }

    pub fn default_format(&self) -> Format {
        self.default_format
    }

    pub fn rpc(&self) -> &RpcConfig {
        &self.rpc
    }

    pub fn engine(&self) -> &ResolutionEngine {
        &self.engine
    }

    pub fn settings(&self) -> &SettingsFile {
        &self.settings
    }

    pub fn request_log(&self) -> &FileRequestLog {
        &self.request_log
    }

    pub fn write_locks(&self) -> &WriteLocks {
        &self.write_locks
    }
}

/// The mock server.
pub struct MockServer {
    addr: SocketAddr,
    state: Arc<AppState>,
}

impl MockServer {
    /// Build a server forwarding to upstreams with reqwest.
    pub fn new(config: &Config) -> Result<Self, anyhow::Error> {
        let gateway = UpstreamGateway::new(config.upstream.timeout())
            .context("Failed to build upstream HTTP client")?;
        Self::with_upstream(config, Arc::new(gateway))
    }

    pub fn with_upstream(config: &Config, upstream: Arc<dyn Upstream>) -> Result<Self, anyhow::Error> {
        config.validate()?;
        std::fs::create_dir_all(&config.api_dir).with_context(|| {
            format!("Failed to create api directory {}", config.api_dir.display())
        })?;

        Ok(Self {
            addr: config.listen_addr()?,
            state: Arc::new(AppState::new(config, upstream)),
        })
    }

    pub fn state(&self) -> &Arc<AppState> {
        &self.state
    }

    /// Bind the configured address and serve forever.
    pub async fn run(self) -> Result<(), anyhow::Error> {
        let listener = TcpListener::bind(self.addr)
            .await
            .with_context(|| format!("Failed to bind {}", self.addr))?;
        self.serve(listener).await
    }

    /// Serve connections from an already bound listener.
    pub async fn serve(self, listener: TcpListener) -> Result<(), anyhow::Error> {
        info!(
            "Mock server listening on http://{}, serving {}",
            listener.local_addr()?,
            self.state.api_dir.display()
        );

        loop {
            let (stream, remote_addr) = listener.accept().await?;
            let io = TokioIo::new(stream);
            let state = Arc::clone(&self.state);

            tokio::spawn(async move {
                let service = service_fn(move |req| {
                    let state = Arc::clone(&state);
                    async move { handle_request(req, state, remote_addr).await }
                });

                if let Err(e) = http1::Builder::new().serve_connection(io, service).await {
                    debug!("Connection error from {}: {}", remote_addr, e);
                }
            });
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_creates_api_dir() {
        let dir = tempfile::tempdir().unwrap();
        let config = Config {
            api_dir: dir.path().join("nested/api"),
            ..Config::default()
        };

        let server = MockServer::new(&config).unwrap();
        assert!(config.api_dir.is_dir());
        assert_eq!(
            server.state().settings().path(),
            config.api_dir.join("application.json")
        );
        assert_eq!(server.addr.port(), 8888);
    }

    #[test]
    fn test_invalid_config_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let mut config = Config {
            api_dir: dir.path().to_path_buf(),
            ..Config::default()
        };
        config.listen.address = "nowhere".to_string();
        assert!(MockServer::new(&config).is_err());
    }
}
