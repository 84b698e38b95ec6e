//! Player configuration
//!
//! Loaded from TOML; every field has a built-in default so an absent file
//! or section is valid.
//!
//! ```toml
//! [logging]
//! level = "debug"
//!
//! [playback]
//! frame_size = 1024
//! seek_seconds = 5
//! pacing_ms = 1
//!
//! [output]
//! sinks = ["device:USB DAC", "default", "null"]
//! queue_packets = 4
//! write_timeout_ms = 2000
//! drain_timeout_ms = 5000
//! ```

use crate::audio::output::SinkKind;
use crate::error::{Error, Result};
use oasis_common::config::{load_toml, ConfigSource};
use serde::Deserialize;
use std::time::Duration;

/// Default packet size in samples per channel
pub const DEFAULT_FRAME_SIZE: usize = 1024;

/// Default seek step in seconds
pub const DEFAULT_SEEK_SECONDS: u64 = 5;

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct PlayerConfig {
    pub logging: LoggingConfig,
    pub playback: PlaybackConfig,
    pub output: OutputConfig,
}

/// Logging configuration
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error)
    ///
    /// Overridden by `OASIS_LOG_LEVEL` and `RUST_LOG`
    pub level: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct PlaybackConfig {
    /// Samples per channel per packet when the sink does not prescribe one
    pub frame_size: usize,
    pub seek_seconds: u64,
    /// Sleep between packets
    pub pacing_ms: u64,
}

impl Default for PlaybackConfig {
    fn default() -> Self {
        Self {
            frame_size: DEFAULT_FRAME_SIZE,
            seek_seconds: DEFAULT_SEEK_SECONDS,
            pacing_ms: 1,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct OutputConfig {
    /// Output preference list, tried in order
    pub sinks: Vec<SinkKind>,
    /// Device queue depth in packets
    pub queue_packets: usize,
    /// Longest a write may wait on a full queue
    pub write_timeout_ms: u64,
    /// Longest an end-of-stream drain may take
    pub drain_timeout_ms: u64,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            sinks: vec![SinkKind::Default],
            queue_packets: 4,
            write_timeout_ms: 2000,
            drain_timeout_ms: 5000,
        }
    }
}

impl<'de> Deserialize<'de> for SinkKind {
    fn deserialize<D: serde::Deserializer<'de>>(
        deserializer: D,
    ) -> std::result::Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        raw.parse().map_err(serde::de::Error::custom)
    }
}

impl PlayerConfig {
    /// Load from the resolved source and validate.
    pub fn load(source: &ConfigSource) -> Result<Self> {
        let config: PlayerConfig = load_toml(source)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if self.playback.frame_size == 0 {
            return Err(Error::Config("playback.frame_size must be at least 1".into()));
        }
        if self.output.queue_packets == 0 {
            return Err(Error::Config("output.queue_packets must be at least 1".into()));
        }
        Ok(())
    }
}

/// Transport settings for one playback session
#[derive(Debug, Clone, PartialEq)]
pub struct PlaybackSettings {
    pub frame_size: usize,
    pub seek_seconds: u64,
    pub pacing: Duration,
}

impl Default for PlaybackSettings {
    fn default() -> Self {
        PlaybackConfig::default().into()
    }
}

impl From<PlaybackConfig> for PlaybackSettings {
    fn from(config: PlaybackConfig) -> Self {
        Self {
            frame_size: config.frame_size,
            seek_seconds: config.seek_seconds,
            pacing: Duration::from_millis(config.pacing_ms),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config: PlayerConfig = toml::from_str("").unwrap();
        assert_eq!(config.playback.frame_size, 1024);
        assert_eq!(config.playback.seek_seconds, 5);
        assert_eq!(config.output.sinks, vec![SinkKind::Default]);
        assert!(config.logging.level.is_none());

        let settings = PlaybackSettings::default();
        assert_eq!(settings.pacing, Duration::from_millis(1));
    }

    #[test]
    fn test_partial_sections() {
        let config: PlayerConfig = toml::from_str(
            r#"
            [playback]
            seek_seconds = 10

            [output]
            sinks = ["host:alsa", "null"]
            "#,
        )
        .unwrap();
        assert_eq!(config.playback.seek_seconds, 10);
        assert_eq!(config.playback.frame_size, DEFAULT_FRAME_SIZE);
        assert_eq!(
            config.output.sinks,
            vec![SinkKind::Host("alsa".into()), SinkKind::Null]
        );
        assert_eq!(config.output.queue_packets, 4);
    }

    #[test]
    fn test_bad_sink_rejected() {
        let result: std::result::Result<PlayerConfig, _> = toml::from_str(
            r#"
            [output]
            sinks = ["speaker"]
            "#,
        );
        assert!(result.is_err());
    }

    #[test]
    fn test_validate() {
        let mut config = PlayerConfig::default();
        assert!(config.validate().is_ok());
        config.playback.frame_size = 0;
        assert!(matches!(config.validate(), Err(Error::Config(_))));
    }
}
