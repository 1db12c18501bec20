//! Service settings: optional TOML file layered under `DROWSY_SERVER__*`
//! environment variables

use config::{Config, ConfigError, Environment, File};
use dms::{DmsConfig, ExtractorConfig};
use serde::{Deserialize, Serialize};

use telemetry::LogConfig;

/// Default settings file, looked up in the working directory
pub const DEFAULT_SETTINGS_FILE: &str = "drowsy-server";

/// Largest accepted request body
pub const DEFAULT_BODY_LIMIT: usize = 2 * 1024 * 1024;

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerSettings {
    /// Listen address
    pub bind: String,
    pub body_limit_bytes: usize,
    /// How often idle sessions are swept (seconds)
    pub eviction_interval_secs: u64,
    pub log: LogConfig,
    pub dms: DmsConfig,
    pub extractor: ExtractorConfig,
}

impl Default for ServerSettings {
    fn default() -> Self {
        Self {
            bind: "0.0.0.0:5000".to_string(),
            body_limit_bytes: DEFAULT_BODY_LIMIT,
            eviction_interval_secs: 60,
            log: LogConfig::default(),
            dms: DmsConfig::default(),
            extractor: ExtractorConfig::default(),
        }
    }
}

impl ServerSettings {
    /// Load settings from `path` (or the default file, if present) and the
    /// environment
    pub fn load(path: Option<&str>) -> Result<Self, ConfigError> {
        let file = match path {
            Some(path) => File::with_name(path).required(true),
            None => File::with_name(DEFAULT_SETTINGS_FILE).required(false),
        };

        Config::builder()
            .add_source(file)
            .add_source(
                Environment::with_prefix("DROWSY_SERVER")
                    .prefix_separator("__")
                    .separator("__")
                    .try_parsing(true)
                    .list_separator(",")
                    .with_list_parse_key("extractor.script"),
            )
            .build()?
            .try_deserialize()
    }
}
