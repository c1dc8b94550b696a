//! Configuration loading and resolution.
//!
//! An optional TOML file supplies values; CLI flags override them; anything still unset
//! falls back to the built-in defaults.

use std::path::Path;
use std::time::Duration;

use anyhow::{Context, Result, bail};
use serde::Deserialize;
use wave_engine::config::EngineConfig;
use wave_engine::waveform::DEFAULT_SCALE;

use crate::player::PlayerOptions;

/// Player settings as read from TOML. Every field is optional.
#[derive(Clone, Debug, Default, Deserialize, PartialEq)]
pub struct PlayerConfigFile {
    /// Poll interval in milliseconds (default: 250).
    pub poll_ms: Option<u64>,
    /// Playback rate while speedup is on (default: 2.0).
    pub speedup_rate: Option<f32>,
    /// Frames per waveform peak; at least 512 (default: 512).
    pub scale: Option<usize>,
    /// Output device substring match.
    pub device: Option<String>,
    /// Resampler chunk size in frames (default: 1024).
    pub chunk_frames: Option<usize>,
    /// Fetch timeout in seconds (default: 30).
    pub fetch_timeout_secs: Option<u64>,
}

impl PlayerConfigFile {
    /// Load configuration from disk.
    pub fn load(path: &Path) -> Result<Self> {
        let raw =
            std::fs::read_to_string(path).with_context(|| format!("read config {:?}", path))?;
        toml::from_str::<PlayerConfigFile>(&raw).with_context(|| format!("parse config {:?}", path))
    }

    /// Values set in `overrides` win.
    pub fn with_overrides(self, overrides: PlayerConfigFile) -> Self {
        Self {
            poll_ms: overrides.poll_ms.or(self.poll_ms),
            speedup_rate: overrides.speedup_rate.or(self.speedup_rate),
            scale: overrides.scale.or(self.scale),
            device: overrides.device.or(self.device),
            chunk_frames: overrides.chunk_frames.or(self.chunk_frames),
            fetch_timeout_secs: overrides.fetch_timeout_secs.or(self.fetch_timeout_secs),
        }
    }
}

/// Fully resolved settings.
#[derive(Clone, Debug)]
pub struct PlayerConfig {
    pub poll_interval: Duration,
    pub speedup_rate: f32,
    pub scale: usize,
    pub engine: EngineConfig,
}

impl PlayerConfig {
    /// Fill defaults and validate.
    pub fn resolve(file: PlayerConfigFile) -> Result<Self> {
        let defaults = PlayerOptions::default();
        let mut engine = EngineConfig::default();

        let poll_interval = match file.poll_ms {
            Some(0) => bail!("poll_ms must be positive"),
            Some(ms) => Duration::from_millis(ms),
            None => defaults.poll_interval,
        };
        let speedup_rate = file.speedup_rate.unwrap_or(defaults.speedup_rate);
        if !speedup_rate.is_finite() || speedup_rate <= 0.0 {
            bail!("speedup_rate must be a positive number, got {speedup_rate}");
        }
        let scale = file.scale.unwrap_or(DEFAULT_SCALE);
        if scale < DEFAULT_SCALE {
            bail!("scale must be at least {DEFAULT_SCALE}, got {scale}");
        }
        if let Some(frames) = file.chunk_frames {
            if frames == 0 {
                bail!("chunk_frames must be positive");
            }
            engine.chunk_frames = frames;
        }
        if let Some(secs) = file.fetch_timeout_secs {
            if secs == 0 {
                bail!("fetch_timeout_secs must be positive");
            }
            engine.fetch.timeout = Duration::from_secs(secs);
        }
        engine.device = file
            .device
            .map(|d| d.trim().to_string())
            .filter(|d| !d.is_empty());

        Ok(Self {
            poll_interval,
            speedup_rate,
            scale,
            engine,
        })
    }

    pub fn player_options(&self) -> PlayerOptions {
        PlayerOptions {
            poll_interval: self.poll_interval,
            speedup_rate: self.speedup_rate,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_file_resolves_to_defaults() {
        let file: PlayerConfigFile = toml::from_str("").unwrap();
        let cfg = PlayerConfig::resolve(file).unwrap();
        assert_eq!(cfg.poll_interval, Duration::from_millis(250));
        assert_eq!(cfg.speedup_rate, 2.0);
        assert_eq!(cfg.scale, 512);
        assert_eq!(cfg.engine.chunk_frames, 1024);
        assert_eq!(cfg.engine.fetch.timeout, Duration::from_secs(30));
        assert_eq!(cfg.engine.device, None);
    }

    #[test]
    fn parses_toml_fields() {
        let file: PlayerConfigFile = toml::from_str(
            r#"
            poll_ms = 100
            speedup_rate = 1.5
            scale = 1024
            device = "USB DAC"
            chunk_frames = 2048
            fetch_timeout_secs = 5
            "#,
        )
        .unwrap();
        let cfg = PlayerConfig::resolve(file).unwrap();
        assert_eq!(cfg.player_options().poll_interval, Duration::from_millis(100));
        assert_eq!(cfg.player_options().speedup_rate, 1.5);
        assert_eq!(cfg.scale, 1024);
        assert_eq!(cfg.engine.device.as_deref(), Some("USB DAC"));
        assert_eq!(cfg.engine.chunk_frames, 2048);
        assert_eq!(cfg.engine.fetch.timeout, Duration::from_secs(5));
    }

    #[test]
    fn overrides_win_over_file() {
        let file = PlayerConfigFile {
            poll_ms: Some(100),
            device: Some("speakers".into()),
            ..Default::default()
        };
        let cli = PlayerConfigFile {
            device: Some("headphones".into()),
            ..Default::default()
        };
        let merged = file.with_overrides(cli);
        assert_eq!(merged.poll_ms, Some(100));
        assert_eq!(merged.device.as_deref(), Some("headphones"));
    }

    #[test]
    fn rejects_invalid_values() {
        for file in [
            PlayerConfigFile { poll_ms: Some(0), ..Default::default() },
            PlayerConfigFile { speedup_rate: Some(0.0), ..Default::default() },
            PlayerConfigFile { scale: Some(256), ..Default::default() },
            PlayerConfigFile { chunk_frames: Some(0), ..Default::default() },
            PlayerConfigFile { fetch_timeout_secs: Some(0), ..Default::default() },
        ] {
            assert!(PlayerConfig::resolve(file.clone()).is_err(), "{file:?}");
        }
    }

    #[test]
    fn blank_device_means_default() {
        let file = PlayerConfigFile {
            device: Some("  ".into()),
            ..Default::default()
        };
        assert_eq!(PlayerConfig::resolve(file).unwrap().engine.device, None);
    }

    #[test]
    fn load_reports_missing_file() {
        let err = PlayerConfigFile::load(Path::new("/definitely/not/here.toml")).unwrap_err();
        assert!(format!("{err:#}").contains("read config"));
    }
}
