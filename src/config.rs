//! Configuration management for routewatch
//!
//! This module defines the main `Config` struct and its sub-structs. It uses
//! the `figment` crate to layer defaults, a JSON or TOML configuration file,
//! `ROUTEWATCH_` environment variables and command-line flags.

use crate::cli::Cli;
use crate::dispatcher::FailurePolicy;
use crate::error::ConfigError;
use crate::formatting::AmountUnit;
use figment::{
    providers::{Env, Format, Json, Serialized, Toml},
    Figment,
};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// The configuration file read when `--config` is not given.
pub const DEFAULT_CONFIG_PATH: &str = "config.json";

/// The main configuration struct for the application.
#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
pub struct Config {
    /// The logging level for the application.
    pub log_level: String,
    /// Connection to the node's event stream.
    pub lnd: LndConfig,
    /// Chat delivery settings.
    pub telegram: TelegramConfig,
    /// Rendering and dispatch settings.
    pub notify: NotifyConfig,
    /// In-process counters.
    pub metrics: MetricsConfig,
}

/// Configuration for the LND REST event source.
#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
pub struct LndConfig {
    /// `host:port` of the node's REST listener.
    pub rpc_host: String,
    /// Path to the macaroon used to authenticate against the node.
    pub macaroon_path: PathBuf,
    /// Path to the node's TLS certificate (PEM).
    pub cert_path: PathBuf,
    /// Whether to accept invalid TLS certificates (for testing).
    #[serde(default)]
    pub allow_invalid_certs: bool,
}

/// Configuration for the Telegram bot.
#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
pub struct TelegramConfig {
    /// Bot API token.
    pub token: String,
    /// The chat notifications are sent to.
    pub chat_id: i64,
    /// Base URL of the Bot API.
    pub api_url: String,
    /// Per-request timeout.
    pub timeout_seconds: u64,
}

/// Configuration for rendering and dispatch.
#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
pub struct NotifyConfig {
    /// The unit all amounts are displayed in.
    pub amount_unit: AmountUnit,
    /// What to do when a delivery fails.
    pub failure_policy: FailurePolicy,
    /// Event kinds sent to the chat. `"*"` sends everything.
    pub events: Vec<String>,
    /// Also log every event through the logging observer.
    pub log_events: bool,
}

/// Configuration for the logging metrics recorder.
#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
pub struct MetricsConfig {
    /// Install the recorder and log counters periodically.
    pub log_metrics: bool,
    /// Seconds between two counter snapshots in the log.
    pub log_interval_seconds: u64,
}

impl Config {
    /// Loads the configuration from all sources, with CLI flags taking
    /// precedence over the environment, the file and the defaults.
    pub fn load_from_cli(cli: Cli) -> Result<Self, ConfigError> {
        let path = match &cli.config {
            Some(path) if !path.exists() => return Err(ConfigError::MissingFile(path.clone())),
            Some(path) => path.clone(),
            None => PathBuf::from(DEFAULT_CONFIG_PATH),
        };

        let config: Config = Self::figment(&path).merge(cli).extract()?;
        config.validate()?;
        Ok(config)
    }

    /// Loads the configuration from a single file plus the environment.
    pub fn load(config_path: &Path) -> Result<Self, ConfigError> {
        if !config_path.exists() {
            return Err(ConfigError::MissingFile(config_path.to_path_buf()));
        }
        let config: Config = Self::figment(config_path).extract()?;
        config.validate()?;
        Ok(config)
    }

    fn figment(path: &Path) -> Figment {
        let figment = Figment::new().merge(Serialized::defaults(Config::default()));
        let figment = match path.extension().and_then(|e| e.to_str()) {
            Some("toml") => figment.merge(Toml::file(path)),
            _ => figment.merge(Json::file(path)),
        };
        // e.g. ROUTEWATCH_TELEGRAM__CHAT_ID=-100123
        figment.merge(Env::prefixed("ROUTEWATCH_").split("__"))
    }

    /// Rejects configurations that cannot work.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.telegram.token.trim().is_empty() {
            return Err(ConfigError::Invalid("telegram.token must be set".into()));
        }
        if self.telegram.chat_id == 0 {
            return Err(ConfigError::Invalid("telegram.chat_id must be set".into()));
        }
        if self.lnd.rpc_host.trim().is_empty() {
            return Err(ConfigError::Invalid("lnd.rpc_host must be set".into()));
        }
        if self.lnd.macaroon_path.as_os_str().is_empty() {
            return Err(ConfigError::Invalid("lnd.macaroon_path must be set".into()));
        }
        if self.lnd.cert_path.as_os_str().is_empty() {
            return Err(ConfigError::Invalid("lnd.cert_path must be set".into()));
        }
        if self.metrics.log_metrics && self.metrics.log_interval_seconds == 0 {
            return Err(ConfigError::Invalid(
                "metrics.log_interval_seconds must be greater than zero".into(),
            ));
        }
        if self.notify.events.is_empty() {
            return Err(ConfigError::Invalid(
                "notify.events must name at least one event kind".into(),
            ));
        }
        Ok(())
    }

    /// A copy safe to log: secrets are masked.
    pub fn redacted(&self) -> Self {
        let mut config = self.clone();
        if !config.telegram.token.is_empty() {
            config.telegram.token = "***".to_string();
        }
        config
    }
}

// Provide a default implementation for tests and easy setup.
impl Default for Config {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            lnd: LndConfig {
                rpc_host: "localhost:8080".to_string(),
                macaroon_path: PathBuf::new(),
                cert_path: PathBuf::new(),
                allow_invalid_certs: false,
            },
            telegram: TelegramConfig {
                token: String::new(),
                chat_id: 0,
                api_url: "https://api.telegram.org".to_string(),
                timeout_seconds: 10,
            },
            notify: NotifyConfig {
                amount_unit: AmountUnit::Msat,
                failure_policy: FailurePolicy::Continue,
                events: vec!["forward".to_string(), "settle".to_string()],
                log_events: false,
            },
            metrics: MetricsConfig {
                log_metrics: true,
                log_interval_seconds: 300,
            },
        }
    }
}
