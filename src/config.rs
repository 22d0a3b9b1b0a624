//! Configuration loading from TOML with environment variable overrides.
//!
//! Reads `config.toml` and deserializes into strongly-typed structs. Every
//! section and field has a default, so a partial (or empty) file is valid.
//! `COURTSIDE_DATABASE_URL` overrides `[database] url`.

use anyhow::{Context, Result};
use serde::Deserialize;
use std::fs;
use std::time::Duration;

use crate::scrape::coerce::CoercionMode;
use crate::scrape::source::DEFAULT_BASE_URL;
use crate::types::{SeasonType, StatTable, TableKind};

/// Env var that overrides the configured database URL.
pub const DATABASE_URL_ENV: &str = "COURTSIDE_DATABASE_URL";

/// Top-level application configuration.
#[derive(Debug, Deserialize, Clone, Default)]
#[serde(default)]
pub struct AppConfig {
    pub database: DatabaseConfig,
    pub source: SourceConfig,
    pub pacing: PacingConfig,
    pub import: ImportConfig,
    pub parsing: ParsingConfig,
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct DatabaseConfig {
    pub url: String,
    pub max_connections: u32,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self { url: "sqlite://courtside.db".into(), max_connections: 4 }
    }
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct SourceConfig {
    pub base_url: String,
    pub user_agent: String,
    pub timeout_secs: u64,
}

impl Default for SourceConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.into(),
            user_agent: "Mozilla/5.0 (X11; Linux x86_64) AppleWebKit/537.36 (KHTML, like Gecko) \
                         Chrome/120.0 Safari/537.36"
                .into(),
            timeout_secs: 30,
        }
    }
}

/// Politeness delays, in milliseconds. Each fetch waits
/// `min_delay_ms + base ± base/4` where `base` depends on the page kind.
#[derive(Debug, Deserialize, Clone, PartialEq)]
#[serde(default)]
pub struct PacingConfig {
    pub min_delay_ms: u64,
    pub advanced_ms: u64,
    pub advanced_playoffs_ms: u64,
    pub totals_ms: u64,
    pub totals_playoffs_ms: u64,
    pub shot_chart_ms: u64,
}

impl Default for PacingConfig {
    fn default() -> Self {
        Self {
            min_delay_ms: 1100,
            advanced_ms: 1000,
            advanced_playoffs_ms: 1250,
            totals_ms: 1500,
            totals_playoffs_ms: 1750,
            shot_chart_ms: 1000,
        }
    }
}

impl PacingConfig {
    /// No waiting at all. For tests and local fixtures.
    pub fn none() -> Self {
        Self {
            min_delay_ms: 0,
            advanced_ms: 0,
            advanced_playoffs_ms: 0,
            totals_ms: 0,
            totals_playoffs_ms: 0,
            shot_chart_ms: 0,
        }
    }

    pub fn min_delay(&self) -> Duration {
        Duration::from_millis(self.min_delay_ms)
    }

    /// Jitter base for a season-wide table page.
    pub fn table_base(&self, table: StatTable) -> Duration {
        let ms = match (table.kind, table.season_type) {
            (TableKind::Advanced, SeasonType::Regular) => self.advanced_ms,
            (TableKind::Advanced, SeasonType::Playoffs) => self.advanced_playoffs_ms,
            (TableKind::Totals, SeasonType::Regular) => self.totals_ms,
            (TableKind::Totals, SeasonType::Playoffs) => self.totals_playoffs_ms,
        };
        Duration::from_millis(ms)
    }

    pub fn shot_chart_base(&self) -> Duration {
        Duration::from_millis(self.shot_chart_ms)
    }
}

/// Season range for `import-data`.
#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct ImportConfig {
    pub first_season: i32,
    pub last_season: i32,
}

impl Default for ImportConfig {
    fn default() -> Self {
        Self { first_season: 2017, last_season: 2022 }
    }
}

#[derive(Debug, Deserialize, Clone, Default)]
#[serde(default)]
pub struct ParsingConfig {
    /// Reject rows whose numeric cells fail to parse instead of zeroing them.
    pub strict_coercion: bool,
}

impl ParsingConfig {
    pub fn coercion_mode(&self) -> CoercionMode {
        CoercionMode::from_strict_flag(self.strict_coercion)
    }
}

impl AppConfig {
    /// Load configuration from a TOML file.
    pub fn load(path: &str) -> Result<Self> {
        let contents = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {path}"))?;
        Self::from_toml(&contents).with_context(|| format!("Failed to parse config file: {path}"))
    }

    /// Load `path` if it exists, otherwise fall back to defaults.
    pub fn load_or_default(path: &str) -> Result<Self> {
        if std::path::Path::new(path).exists() {
            Self::load(path)
        } else {
            Ok(Self::default())
        }
    }

    pub fn from_toml(contents: &str) -> Result<Self> {
        let config: AppConfig = toml::from_str(contents).context("Invalid TOML configuration")?;
        Ok(config)
    }

    /// Apply environment overrides (after `.env` has been loaded).
    pub fn apply_env(mut self) -> Self {
        if let Ok(url) = Self::resolve_env(DATABASE_URL_ENV) {
            self.database.url = url;
        }
        self
    }

    /// Resolve an environment variable name to its value.
    pub fn resolve_env(env_name: &str) -> Result<String> {
        std::env::var(env_name)
            .with_context(|| format!("Environment variable not set: {env_name}"))
    }
}
