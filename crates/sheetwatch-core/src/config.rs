//! Configuration management for Sheetwatch
//!
//! Settings are layered: built-in defaults, then an optional TOML file, then
//! `SHEETWATCH__SECTION__KEY` environment variables. The binary applies CLI
//! flags on top of the result.

use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::models::SourceConfig;

/// Environment prefix for configuration overrides
pub const ENV_PREFIX: &str = "SHEETWATCH";

/// Main configuration struct
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Spreadsheet provider configuration
    pub provider: ProviderConfig,

    /// Alert channel configuration
    pub channel: ChannelConfig,

    /// Notification ledger configuration
    pub ledger: LedgerConfig,

    /// Check cycle configuration
    pub monitor: MonitorConfig,

    /// Monitored sources, checked in declaration order
    pub sources: Vec<SourceConfig>,

    /// Logging configuration
    pub logging: LoggingConfig,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            provider: ProviderConfig::default(),
            channel: ChannelConfig::default(),
            ledger: LedgerConfig::default(),
            monitor: MonitorConfig::default(),
            sources: default_sources(),
            logging: LoggingConfig::default(),
        }
    }
}

impl Config {
    /// Load configuration from defaults, an optional file and the environment
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let defaults = config::Config::try_from(&Config::default())
            .map_err(|e| Error::config(e.to_string()))?;

        let mut builder = config::Config::builder().add_source(defaults);

        if let Some(path) = path {
            builder = builder.add_source(config::File::from(path).required(true));
        }

        let settings = builder
            .add_source(
                config::Environment::with_prefix(ENV_PREFIX)
                    .separator("__")
                    .try_parsing(true),
            )
            .build()
            .map_err(|e| Error::config(e.to_string()))?;

        let config: Config = settings
            .try_deserialize()
            .map_err(|e| Error::config(e.to_string()))?;

        config.validate()?;
        Ok(config)
    }

    /// Check the parts of the configuration every command relies on
    pub fn validate(&self) -> Result<()> {
        if self.sources.is_empty() {
            return Err(Error::config("no sources configured"));
        }

        let mut seen = HashSet::new();
        for source in &self.sources {
            source.validate()?;
            if !seen.insert(source.name.as_str()) {
                return Err(Error::config(format!(
                    "source '{}' is configured more than once",
                    source.name
                )));
            }
        }

        if self.monitor.max_rows == 0 {
            return Err(Error::config("monitor.max_rows must be at least 1"));
        }

        if self.ledger.backend == LedgerBackend::Sheet
            && self.sources.iter().any(|s| s.name == self.ledger.worksheet)
        {
            return Err(Error::config(format!(
                "ledger worksheet '{}' cannot also be a monitored source",
                self.ledger.worksheet
            )));
        }

        Ok(())
    }

    /// Spreadsheet id, required by every command that talks to the provider
    pub fn spreadsheet_id(&self) -> Result<&str> {
        required(self.provider.spreadsheet_id.as_deref(), "provider.spreadsheet_id")
    }

    /// Provider bearer token
    pub fn access_token(&self) -> Result<&str> {
        required(self.provider.access_token.as_deref(), "provider.access_token")
    }

    /// Webhook endpoint of the alert channel
    pub fn webhook_url(&self) -> Result<&str> {
        required(self.channel.webhook_url.as_deref(), "channel.webhook_url")
    }
}

fn required<'a>(value: Option<&'a str>, key: &str) -> Result<&'a str> {
    match value.map(str::trim) {
        Some(v) if !v.is_empty() => Ok(v),
        _ => Err(Error::config(format!("missing required setting '{key}'"))),
    }
}

/// Spreadsheet provider configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProviderConfig {
    /// Spreadsheet (document) identifier
    pub spreadsheet_id: Option<String>,
    /// OAuth bearer token used for every request
    pub access_token: Option<String>,
    /// Base URL of the Sheets REST API
    pub base_url: String,
    /// Per-request timeout
    #[serde(with = "humantime_serde")]
    pub timeout: Duration,
}

impl Default for ProviderConfig {
    fn default() -> Self {
        Self {
            spreadsheet_id: None,
            access_token: None,
            base_url: "https://sheets.googleapis.com/v4".to_string(),
            timeout: Duration::from_secs(30),
        }
    }
}

/// Alert channel configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChannelConfig {
    /// Incoming webhook URL
    pub webhook_url: Option<String>,
    /// Display name of the posting bot
    pub username: String,
    /// Icon of the posting bot
    pub icon_emoji: String,
    /// Per-request timeout
    #[serde(with = "humantime_serde")]
    pub timeout: Duration,
}

impl Default for ChannelConfig {
    fn default() -> Self {
        Self {
            webhook_url: None,
            username: "Spyke Alert".to_string(),
            icon_emoji: ":warning:".to_string(),
            timeout: Duration::from_secs(30),
        }
    }
}

/// Where the notification history is kept
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum LedgerBackend {
    /// A worksheet in the monitored spreadsheet
    #[default]
    Sheet,
    /// A local JSON Lines file
    File,
}

/// Notification ledger configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LedgerConfig {
    /// Storage backend
    pub backend: LedgerBackend,
    /// Worksheet title for the sheet backend
    pub worksheet: String,
    /// Header of the entity id column
    pub id_column: String,
    /// Header of the source name column
    pub source_column: String,
    /// Header of the timestamp column
    pub timestamp_column: String,
    /// File path for the file backend
    pub path: PathBuf,
}

impl Default for LedgerConfig {
    fn default() -> Self {
        Self {
            backend: LedgerBackend::Sheet,
            worksheet: "通知履歴".to_string(),
            id_column: "ID".to_string(),
            source_column: "シート名".to_string(),
            timestamp_column: "通知日時".to_string(),
            path: PathBuf::from("sheetwatch-ledger.jsonl"),
        }
    }
}

/// Check cycle configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MonitorConfig {
    /// Minimum time between two alerts for the same entity
    #[serde(with = "humantime_serde")]
    pub cool_down: Duration,
    /// Upper bound on rows evaluated per source
    pub max_rows: usize,
    /// Log the spreadsheet's worksheet titles after each run
    pub list_sources: bool,
}

impl Default for MonitorConfig {
    fn default() -> Self {
        Self {
            cool_down: Duration::from_secs(6 * 3600),
            max_rows: 9,
            list_sources: true,
        }
    }
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Log level
    pub level: String,
    /// Log format (json or pretty)
    pub format: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            format: "pretty".to_string(),
        }
    }
}

fn default_sources() -> Vec<SourceConfig> {
    vec![
        SourceConfig::new(
            "LINE",
            400.0,
            "`{label}`\nこちらの記事がLINEで読まれています！確認して必要なら関連リンクを変更してください。",
        ),
        SourceConfig::new(
            "Smartnews",
            300.0,
            "`{label}`\nこちらの記事がSmartnewsで読まれています！確認して必要なら関連リンクを変更してください。",
        ),
    ]
}
