use anyhow::{Context, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::time::Duration;

#[derive(Debug, Deserialize, Clone)]
pub struct Config {
    #[serde(default = "default_environment")]
    pub environment: String,
    pub telegram: TelegramConfig,
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub directory: DirectoryConfig,
    #[serde(default)]
    pub moderation: ModerationConfig,
}

#[derive(Debug, Deserialize, Clone)]
pub struct TelegramConfig {
    pub bot_token: String,
    /// Override for the Bot API base URL (local Bot API server, test doubles)
    #[serde(default)]
    pub api_url: Option<String>,
    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,
}

#[derive(Debug, Deserialize, Clone)]
pub struct ServerConfig {
    #[serde(default = "default_ip")]
    pub ip: String,
    #[serde(default = "default_port")]
    pub port: u16,
    /// Upper bound on reading, handling and answering one webhook request
    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            ip: default_ip(),
            port: default_port(),
            request_timeout_secs: default_request_timeout_secs(),
        }
    }
}

#[derive(Debug, Deserialize, Clone, Default)]
pub struct DirectoryConfig {
    /// Defaults to `modbot-<environment>.db`
    #[serde(default)]
    pub database_path: Option<PathBuf>,
}

#[derive(Debug, Deserialize, Clone)]
pub struct ModerationConfig {
    /// Warnings after which a user should be banned. Enforced outside the bot.
    #[serde(default = "default_warning_limit")]
    pub warning_limit: u32,
}

impl Default for ModerationConfig {
    fn default() -> Self {
        Self {
            warning_limit: default_warning_limit(),
        }
    }
}

fn default_environment() -> String {
    "dev".to_string()
}

fn default_request_timeout_secs() -> u64 {
    30
}

fn default_ip() -> String {
    "127.0.0.1".to_string()
}

fn default_port() -> u16 {
    3000
}

fn default_warning_limit() -> u32 {
    3
}

impl Config {
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;
        let config: Config = toml::from_str(&content)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))?;
        config.validate()?;
        Ok(config)
    }

    /// Build the configuration from environment variables.
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let var = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        let port = match var("WEBSERVER_PORT") {
            Some(p) => p
                .parse()
                .with_context(|| format!("Invalid WEBSERVER_PORT: {}", p))?,
            None => default_port(),
        };
        let request_timeout_secs = match var("TELEGRAM_TIMEOUT") {
            Some(t) => t
                .parse()
                .with_context(|| format!("Invalid TELEGRAM_TIMEOUT: {}", t))?,
            None => default_request_timeout_secs(),
        };
        let server_timeout_secs = match var("WEBSERVER_TIMEOUT") {
            Some(t) => t
                .parse()
                .with_context(|| format!("Invalid WEBSERVER_TIMEOUT: {}", t))?,
            None => default_request_timeout_secs(),
        };
        let warning_limit = match var("WARNING_LIMIT") {
            Some(w) => w
                .parse()
                .with_context(|| format!("Invalid WARNING_LIMIT: {}", w))?,
            None => default_warning_limit(),
        };

        let config = Config {
            environment: var("ENVIRONMENT").unwrap_or_else(default_environment),
            telegram: TelegramConfig {
                bot_token: var("TELEGRAM_TOKEN").unwrap_or_default(),
                api_url: var("TELEGRAM_API_URL"),
                request_timeout_secs,
            },
            server: ServerConfig {
                ip: var("WEBSERVER_IP").unwrap_or_else(default_ip),
                port,
                request_timeout_secs: server_timeout_secs,
            },
            directory: DirectoryConfig {
                database_path: var("DATABASE_PATH").map(PathBuf::from),
            },
            moderation: ModerationConfig { warning_limit },
        };
        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<()> {
        if self.telegram.bot_token.trim().is_empty() {
            anyhow::bail!("Telegram bot token is required");
        }
        if self.server.request_timeout_secs == 0 {
            anyhow::bail!("server.request_timeout_secs must be at least 1");
        }
        Ok(())
    }

    /// Effective directory database path
    pub fn database_path(&self) -> PathBuf {
        self.directory
            .database_path
            .clone()
            .unwrap_or_else(|| PathBuf::from(format!("modbot-{}.db", self.environment)))
    }

    pub fn server_addr(&self) -> String {
        format!("{}:{}", self.server.ip, self.server.port)
    }

    pub fn server_timeout(&self) -> Duration {
        Duration::from_secs(self.server.request_timeout_secs)
    }
}

/// Hide a secret when logging it
pub fn redact(secret: &str) -> &'static str {
    if secret.len() < 2 {
        "RD"
    } else {
        "REDACTED"
    }
}
