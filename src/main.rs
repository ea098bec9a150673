mod bot;
mod command;
mod config;
mod directory;
mod members;
mod platform;
mod server;
mod update;

#[cfg(test)]
mod testing;

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use crate::bot::AppState;
use crate::config::{redact, Config};
use crate::directory::DirectoryStore;
use crate::platform::telegram::TelegramPlatform;

/// Moderation bot for Telegram supergroups, served as a webhook
#[derive(Parser, Debug)]
#[command(name = "modbot", version, about)]
struct Args {
    /// Path to the TOML config file; environment variables are used when it does not exist
    #[arg(long, default_value = "modbot.toml")]
    config: PathBuf,

    /// Address to listen on, overriding the config
    #[arg(long)]
    ip: Option<String>,

    /// Port to listen on, overriding the config
    #[arg(long)]
    port: Option<u16>,
}

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize logging
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info,modbot=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!("modbot {} starting", env!("CARGO_PKG_VERSION"));

    let args = Args::parse();

    // Load configuration: file if present, environment otherwise
    let mut config = if args.config.exists() {
        info!("Loading configuration from: {}", args.config.display());
        Config::load(&args.config)
            .with_context(|| format!("Failed to load config from {}", args.config.display()))?
    } else {
        info!("Loading configuration from environment variables");
        Config::from_env().context("Failed to load config from environment")?
    };
    if let Some(ip) = args.ip {
        config.server.ip = ip;
    }
    if let Some(port) = args.port {
        config.server.port = port;
    }

    info!("Configuration loaded successfully");
    info!("  Environment: {}", config.environment);
    info!("  Bot token: {}", redact(&config.telegram.bot_token));
    info!("  Directory: {}", config.database_path().display());
    info!("  Request timeout: {}s", config.server.request_timeout_secs);
    info!("  Warning limit: {}", config.moderation.warning_limit);

    // One-time initialization; the resulting state is shared read-only
    let directory = DirectoryStore::open(&config.database_path())?;
    let platform = TelegramPlatform::new(&config.telegram)?;
    let state = Arc::new(AppState::new(Arc::new(platform), Arc::new(directory)));

    server::serve(state, &config.server_addr(), config.server_timeout()).await?;

    info!("Shut down cleanly");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn args(list: &[&str]) -> Result<Args, clap::Error> {
        Args::try_parse_from(std::iter::once("modbot").chain(list.iter().copied()))
    }

    #[test]
    fn test_defaults() {
        let parsed = args(&[]).unwrap();
        assert_eq!(parsed.config, PathBuf::from("modbot.toml"));
        assert!(parsed.ip.is_none());
        assert!(parsed.port.is_none());
    }

    #[test]
    fn test_all_flags() {
        let parsed = args(&["--config", "prod.toml", "--ip", "0.0.0.0", "--port", "8443"]).unwrap();
        assert_eq!(parsed.config, PathBuf::from("prod.toml"));
        assert_eq!(parsed.ip.as_deref(), Some("0.0.0.0"));
        assert_eq!(parsed.port, Some(8443));
    }

    #[test]
    fn test_bad_flags() {
        assert!(args(&["--port", "http"]).is_err());
        assert!(args(&["--port"]).is_err());
        assert!(args(&["--verbose"]).is_err());
        assert!(args(&["--port", "70000"]).is_err());
    }

    #[test]
    fn test_args_definition() {
        use clap::CommandFactory;
        Args::command().debug_assert();
    }
}
