use anyhow::Context;
use clap::Parser;
use mock_server::{Config, Format, MockServer};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(name = "mock-server", version, about)]
struct Args {
    /// YAML configuration file
    #[arg(short, long, env = "MOCK_SERVER_CONFIG")]
    config: Option<PathBuf>,
    /// Listen port, overrides the config file
    #[arg(short, long, env = "MOCK_SERVER_PORT")]
    port: Option<u16>,
    /// Listen address, overrides the config file
    #[arg(short, long, env = "MOCK_SERVER_ADDRESS")]
    address: Option<String>,
    /// Directory with stored responses, overrides the config file
    #[arg(long, env = "MOCK_SERVER_API_DIR")]
    api_dir: Option<PathBuf>,
    /// Default response format (json, xml, txt, ...)
    #[arg(long, env = "MOCK_SERVER_DEFAULT_FORMAT")]
    default_format: Option<Format>,
    /// Log level used when RUST_LOG is not set
    #[arg(long, env = "MOCK_SERVER_LOG_LEVEL", default_value = "info")]
    log_level: String,
    /// Emit logs as JSON lines
    #[arg(long, env = "MOCK_SERVER_LOG_JSON")]
    log_json: bool,
}

impl Args {
    fn load_config(&self) -> Result<Config, anyhow::Error> {
        let mut config = match &self.config {
            Some(path) => Config::from_file(path)?,
            None => Config::default(),
        };

        if let Some(port) = self.port {
            config.listen.port = port;
        }
        if let Some(address) = &self.address {
            config.listen.address = address.clone();
        }
        if let Some(api_dir) = &self.api_dir {
            config.api_dir = api_dir.clone();
        }
        if let Some(format) = self.default_format {
            config.default_format = format;
        }

        config.validate()?;
        Ok(config)
    }
}

fn init_tracing(args: &Args) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(format!("mock_server={}", args.log_level)));

    if args.log_json {
        tracing_subscriber::fmt()
            .json()
            .with_env_filter(filter)
            .init();
    } else {
        tracing_subscriber::fmt().with_env_filter(filter).init();
    }
}

#[tokio::main]
async fn main() -> Result<(), anyhow::Error> {
    let args = Args::parse();
    init_tracing(&args);

    let config = args.load_config().context("Failed to load configuration")?;
    tracing::info!(
        "Starting {} V{}",
        env!("CARGO_PKG_NAME"),
        env!("CARGO_PKG_VERSION")
    );
    tracing::debug!("{config:?}");

    let server = MockServer::new(&config)?;

    tokio::select! {
        result = server.run() => result,
        _ = tokio::signal::ctrl_c() => {
            tracing::info!("Received Ctrl+C, shutting down");
            Ok(())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_args_override_config() {
        let args = Args::try_parse_from([
            "mock-server",
            "--port",
            "9001",
            "--api-dir",
            "/tmp/mocks",
            "--default-format",
            "xml",
        ])
        .unwrap();

        let config = args.load_config().unwrap();
        assert_eq!(config.listen.port, 9001);
        assert_eq!(config.api_dir, PathBuf::from("/tmp/mocks"));
        assert_eq!(config.default_format, Format::Xml);
        assert_eq!(args.log_level, "info");
        assert!(!args.log_json);
    }

    #[test]
    fn test_invalid_format_is_rejected() {
        assert!(Args::try_parse_from(["mock-server", "--default-format", "yaml"]).is_err());
    }
}
