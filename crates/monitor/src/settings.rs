//! Monitor settings: optional TOML file layered under `DROWSY_MONITOR__*`
//! environment variables

use std::path::PathBuf;
use std::sync::Arc;

use alerting::AlarmConfig;
use camera_capture::{CameraConfig, CameraError, CameraSource, StillImageCamera, SyntheticCamera};
use config::{Config, ConfigError, Environment, File};
use serde::{Deserialize, Serialize};
use telemetry::LogConfig;

use crate::client::ClientConfig;

/// Default settings file, looked up in the working directory
pub const DEFAULT_SETTINGS_FILE: &str = "drowsy-monitor";

/// Where frames come from
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum SourceConfig {
    /// Generated test pattern
    Synthetic { width: u32, height: u32 },
    /// The same image every tick
    StillImage { path: PathBuf },
}

impl Default for SourceConfig {
    fn default() -> Self {
        SourceConfig::Synthetic {
            width: 640,
            height: 480,
        }
    }
}

impl SourceConfig {
    pub fn build(&self) -> Result<Arc<dyn CameraSource>, CameraError> {
        let source: Arc<dyn CameraSource> = match self {
            SourceConfig::Synthetic { width, height } => Arc::new(SyntheticCamera::new(*width, *height)),
            SourceConfig::StillImage { path } => Arc::new(StillImageCamera::open(path)?),
        };
        Ok(source)
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct MonitorSettings {
    pub log: LogConfig,
    pub camera: CameraConfig,
    pub source: SourceConfig,
    pub client: ClientConfig,
    pub alarm: AlarmConfig,
}

impl MonitorSettings {
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
                Environment::with_prefix("DROWSY_MONITOR")
                    .prefix_separator("__")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?
            .try_deserialize()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_without_file() {
        let settings = MonitorSettings::load(None).unwrap();
        assert_eq!(settings.camera.interval_ms, 300);
        assert_eq!(settings.client.timeout_ms, 5000);
        assert!(matches!(settings.source, SourceConfig::Synthetic { .. }));
    }

    #[test]
    fn test_source_from_toml() {
        let toml = r#"
            [source]
            kind = "still_image"
            path = "/tmp/driver.jpg"

            [alarm]
            sink = "silent"
        "#;
        let settings: MonitorSettings = Config::builder()
            .add_source(File::from_str(toml, config::FileFormat::Toml))
            .build()
            .unwrap()
            .try_deserialize()
            .unwrap();

        match settings.source {
            SourceConfig::StillImage { path } => assert_eq!(path, PathBuf::from("/tmp/driver.jpg")),
            other => panic!("unexpected source {:?}", other),
        }
        assert_eq!(settings.alarm.sink, alerting::SinkKind::Silent);
    }

    #[test]
    fn test_missing_still_image_fails_to_build() {
        let source = SourceConfig::StillImage {
            path: PathBuf::from("/nonexistent/driver.jpg"),
        };
        assert!(source.build().is_err());
    }
}
