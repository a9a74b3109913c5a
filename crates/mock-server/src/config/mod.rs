//! Server configuration.
//!
//! Loaded from an optional YAML file; every field has a default so an empty
//! document (or no file at all) yields a working server on `127.0.0.1:8888`
//! serving `./api`.

use crate::format::Format;
use anyhow::Context;
use serde::{Deserialize, Serialize};
use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::time::Duration;

#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
#[serde(default)]
pub struct Config {
    pub listen: ListenConfig,
    /// Root of the stored responses.
    pub api_dir: PathBuf,
    /// Settings document. Relative paths are resolved against `api_dir`.
    pub settings_file: PathBuf,
    /// Format used when neither the path extension nor `Accept` decides.
    pub default_format: Format,
    pub rpc: RpcConfig,
    pub upstream: UpstreamConfig,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            listen: ListenConfig::default(),
            api_dir: PathBuf::from("api"),
            settings_file: PathBuf::from("application.json"),
            default_format: Format::Json,
            rpc: RpcConfig::default(),
            upstream: UpstreamConfig::default(),
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
#[serde(default)]
pub struct ListenConfig {
    pub address: String,
    pub port: u16,
}

impl Default for ListenConfig {
    fn default() -> Self {
        Self {
            address: "127.0.0.1".to_string(),
            port: 8888,
        }
    }
}

/// Which RPC protocols `/RPC2` answers besides XML-RPC.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
#[serde(default)]
pub struct RpcConfig {
    pub jsonrpc: bool,
    pub fastrpc: bool,
}

impl Default for RpcConfig {
    fn default() -> Self {
        Self {
            jsonrpc: true,
            fastrpc: true,
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize, Serialize, PartialEq)]
#[serde(default)]
pub struct UpstreamConfig {
    /// Request timeout for upstream calls. Unset means wait indefinitely.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub timeout_secs: Option<u64>,
}

impl UpstreamConfig {
    pub fn timeout(&self) -> Option<Duration> {
        self.timeout_secs.map(Duration::from_secs)
    }
}

impl Config {
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, anyhow::Error> {
        let path = path.as_ref();
        let contents = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file {}", path.display()))?;
        let config = Self::from_yaml(&contents)
            .with_context(|| format!("Invalid config file {}", path.display()))?;
        Ok(config)
    }

    pub fn from_yaml(contents: &str) -> Result<Self, anyhow::Error> {
        // An empty document deserializes to `null`.
        let config: Config = if contents.trim().is_empty() {
            Config::default()
        } else {
            serde_yaml::from_str(contents)?
        };
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), anyhow::Error> {
        if self.api_dir.as_os_str().is_empty() {
            anyhow::bail!("'api_dir' must not be empty");
        }
        if self.settings_file.as_os_str().is_empty() {
            anyhow::bail!("'settings_file' must not be empty");
        }
        self.listen_addr()?;
        if self.upstream.timeout_secs == Some(0) {
            anyhow::bail!("'upstream.timeout_secs' must be greater than zero when set");
        }
        Ok(())
    }

    pub fn listen_addr(&self) -> Result<SocketAddr, anyhow::Error> {
        format!("{}:{}", self.listen.address, self.listen.port)
            .parse()
            .with_context(|| {
                format!(
                    "Invalid listen address '{}:{}'",
                    self.listen.address, self.listen.port
                )
            })
    }

    /// Settings document path with relative paths anchored at `api_dir`.
    pub fn settings_path(&self) -> PathBuf {
        if self.settings_file.is_absolute() {
            self.settings_file.clone()
        } else {
            self.api_dir.join(&self.settings_file)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = Config::from_yaml("").unwrap();
        assert_eq!(config, Config::default());
        assert_eq!(config.listen_addr().unwrap().port(), 8888);
        assert_eq!(config.settings_path(), PathBuf::from("api/application.json"));
        assert!(config.rpc.jsonrpc && config.rpc.fastrpc);
        assert_eq!(config.upstream.timeout(), None);
    }

    #[test]
    fn test_partial_document() {
        let yaml = r#"
listen:
  port: 9000
api_dir: /srv/mocks
default_format: xml
rpc:
  fastrpc: false
upstream:
  timeout_secs: 5
"#;
        let config = Config::from_yaml(yaml).unwrap();
        assert_eq!(config.listen.address, "127.0.0.1");
        assert_eq!(config.listen.port, 9000);
        assert_eq!(config.default_format, Format::Xml);
        assert!(config.rpc.jsonrpc);
        assert!(!config.rpc.fastrpc);
        assert_eq!(config.upstream.timeout(), Some(Duration::from_secs(5)));
        assert_eq!(
            config.settings_path(),
            PathBuf::from("/srv/mocks/application.json")
        );
    }

    #[test]
    fn test_absolute_settings_file() {
        let config = Config::from_yaml("settings_file: /etc/mock/settings.json").unwrap();
        assert_eq!(
            config.settings_path(),
            PathBuf::from("/etc/mock/settings.json")
        );
    }

    #[test]
    fn test_validation_errors() {
        assert!(Config::from_yaml("listen:\n  address: not-an-ip\n").is_err());
        assert!(Config::from_yaml("upstream:\n  timeout_secs: 0\n").is_err());
        assert!(Config::from_yaml("default_format: yaml\n").is_err());
    }

    #[test]
    fn test_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("mock.yaml");
        std::fs::write(&path, "listen:\n  port: 7000\n").unwrap();
        assert_eq!(Config::from_file(&path).unwrap().listen.port, 7000);

        let err = Config::from_file(dir.path().join("missing.yaml")).unwrap_err();
        assert!(err.to_string().contains("Failed to read config file"));
    }
}
