//! Command-Line Interface (CLI) argument parsing.
//!
//! This module defines the command-line arguments for the application using the
//! `clap` crate. These arguments are parsed at startup and then merged over
//! the configuration file and environment variables.

use clap::Parser;
use figment::{
    value::{Dict, Map, Value},
    Error, Metadata, Profile, Provider,
};
use std::path::PathBuf;

/// Sends a Telegram message for every payment your Lightning node routes.
#[derive(Parser, Debug, Default)]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Path to the JSON (or .toml) configuration file.
    #[arg(short, long, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Telegram chat to notify.
    #[arg(long, value_name = "ID", allow_hyphen_values = true)]
    pub chat_id: Option<i64>,

    /// Unit for displayed amounts (msat or sat).
    #[arg(long, value_name = "UNIT")]
    pub amount_unit: Option<String>,

    /// Behaviour on delivery failure (continue or abort).
    #[arg(long, value_name = "POLICY")]
    pub failure_policy: Option<String>,

    /// Log level filter (e.g. info, debug).
    #[arg(long, value_name = "LEVEL")]
    pub log_level: Option<String>,
}

impl Provider for Cli {
    fn metadata(&self) -> Metadata {
        Metadata::named("Command-Line Arguments")
    }

    fn data(&self) -> Result<Map<Profile, Dict>, Error> {
        let mut dict = Dict::new();

        if let Some(level) = &self.log_level {
            dict.insert("log_level".into(), Value::from(level.clone()));
        }

        let mut telegram = Dict::new();
        if let Some(chat_id) = self.chat_id {
            telegram.insert("chat_id".into(), Value::from(chat_id));
        }
        if !telegram.is_empty() {
            dict.insert("telegram".into(), Value::from(telegram));
        }

        let mut notify = Dict::new();
        if let Some(unit) = &self.amount_unit {
            notify.insert("amount_unit".into(), Value::from(unit.to_lowercase()));
        }
        if let Some(policy) = &self.failure_policy {
            notify.insert("failure_policy".into(), Value::from(policy.to_lowercase()));
        }
        if !notify.is_empty() {
            dict.insert("notify".into(), Value::from(notify));
        }

        let mut map = Map::new();
        map.insert(Profile::Default, dict);
        Ok(map)
    }
}
