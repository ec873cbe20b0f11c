use serde::{Deserialize, Deserializer};
use std::time::Duration;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("YAML parse error: {0}")]
    Yaml(#[from] serde_yaml::Error),
    #[error("invalid config: {0}")]
    Invalid(String),
}

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub source: SourceConfig,
    #[serde(default)]
    pub staleness: StalenessConfig,
    #[serde(default)]
    pub track: TrackConfig,
    #[serde(default)]
    pub style: StyleConfig,
    #[serde(default)]
    pub geometry: GeometryConfig,
    pub web: Option<WebConfig>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SourceConfig {
    pub base_url: String,
    #[serde(default = "default_request_timeout", deserialize_with = "duration")]
    pub request_timeout: Duration,
}

fn default_request_timeout() -> Duration {
    Duration::from_secs(10)
}

#[derive(Debug, Clone, Deserialize)]
pub struct StalenessConfig {
    #[serde(default = "default_sweep_interval", deserialize_with = "duration")]
    pub sweep_interval: Duration,
    #[serde(default = "default_threshold", deserialize_with = "duration")]
    pub threshold: Duration,
}

impl Default for StalenessConfig {
    fn default() -> Self {
        Self {
            sweep_interval: default_sweep_interval(),
            threshold: default_threshold(),
        }
    }
}

fn default_sweep_interval() -> Duration {
    Duration::from_secs(5)
}

fn default_threshold() -> Duration {
    Duration::from_secs(10)
}

#[derive(Debug, Clone, Deserialize)]
pub struct TrackConfig {
    #[serde(default = "default_window", deserialize_with = "duration")]
    pub default_window: Duration,
}

impl Default for TrackConfig {
    fn default() -> Self {
        Self {
            default_window: default_window(),
        }
    }
}

fn default_window() -> Duration {
    Duration::from_secs(12 * 3600)
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct StyleConfig {
    pub pointer_url: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct GeometryConfig {
    #[serde(default)]
    pub height_m: f64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct WebConfig {
    #[serde(default = "default_bind")]
    pub bind: String,
}

fn default_bind() -> String {
    "0.0.0.0:8080".to_string()
}

fn duration<'de, D>(deserializer: D) -> Result<Duration, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = String::deserialize(deserializer)?;
    humantime::parse_duration(raw.trim()).map_err(serde::de::Error::custom)
}

impl Config {
    pub fn from_file(path: &str) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)?;
        Self::from_yaml(&content)
    }

    pub fn from_yaml(yaml: &str) -> Result<Self, ConfigError> {
        let config: Config = serde_yaml::from_str(yaml)?;
        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if self.source.base_url.trim().is_empty() {
            return Err(ConfigError::Invalid("source.base_url is empty".into()));
        }
        let staleness = &self.staleness;
        if staleness.sweep_interval.is_zero() {
            return Err(ConfigError::Invalid(
                "staleness.sweep_interval must be positive".into(),
            ));
        }
        if staleness.sweep_interval >= staleness.threshold {
            return Err(ConfigError::Invalid(format!(
                "staleness.sweep_interval ({:?}) must be shorter than staleness.threshold ({:?})",
                staleness.sweep_interval, staleness.threshold
            )));
        }
        if !self.geometry.height_m.is_finite() {
            return Err(ConfigError::Invalid("geometry.height_m must be finite".into()));
        }
        Ok(())
    }

    pub fn pointer_url(&self) -> String {
        self.style.pointer_url.clone().unwrap_or_else(|| {
            format!(
                "{}/icons/pointer.png",
                self.source.base_url.trim_end_matches('/')
            )
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn minimal_config_uses_defaults() {
        let config = Config::from_yaml("source:\n  base_url: https://xgds.example/\n").unwrap();
        assert_eq!(config.staleness.sweep_interval, Duration::from_secs(5));
        assert_eq!(config.staleness.threshold, Duration::from_secs(10));
        assert_eq!(config.track.default_window, Duration::from_secs(12 * 3600));
        assert_eq!(config.source.request_timeout, Duration::from_secs(10));
        assert!(config.web.is_none());
        assert_eq!(
            config.pointer_url(),
            "https://xgds.example/icons/pointer.png"
        );
    }

    #[test]
    fn parses_humantime_durations() {
        let yaml = "
source:
  base_url: http://localhost
  request_timeout: 2s
staleness:
  sweep_interval: 1s 500ms
  threshold: 3s
track:
  default_window: 30m
web:
  bind: 127.0.0.1:9000
";
        let config = Config::from_yaml(yaml).unwrap();
        assert_eq!(config.staleness.sweep_interval, Duration::from_millis(1500));
        assert_eq!(config.track.default_window, Duration::from_secs(1800));
        assert_eq!(config.web.unwrap().bind, "127.0.0.1:9000");
    }

    #[test]
    fn rejects_sweep_not_shorter_than_threshold() {
        let yaml = "
source:
  base_url: http://localhost
staleness:
  sweep_interval: 10s
  threshold: 10s
";
        assert!(matches!(
            Config::from_yaml(yaml),
            Err(ConfigError::Invalid(_))
        ));
    }
}
