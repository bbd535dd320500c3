use serde::Deserialize;
use std::path::Path;

/// Session file for the studio driver: ring shapes, worker biases, clock
/// pacing, and the output base path.
#[derive(Deserialize, Debug, Clone)]
pub struct SessionConfig {
    #[serde(default = "defaults::log_level")]
    pub log_level: String,

    /// Video share name; generated when empty.
    #[serde(default)]
    pub video_share: String,
    /// Audio share name; generated when empty.
    #[serde(default)]
    pub audio_share: String,

    #[serde(default = "defaults::width")]
    pub width: i64,
    #[serde(default = "defaults::height")]
    pub height: i64,
    #[serde(default = "defaults::vfps")]
    pub vfps: i64,

    #[serde(default = "defaults::channels")]
    pub channels: i64,
    #[serde(default = "defaults::bps")]
    pub bps: i64,
    #[serde(default = "defaults::bitrate")]
    pub bitrate: i64,
    #[serde(default = "defaults::afps")]
    pub afps: i64,

    /// Ring depth in seconds of media.
    #[serde(default = "defaults::ring_seconds")]
    pub ring_seconds: i64,

    /// Target number of pattern sources; one is added per second until hit.
    #[serde(default = "defaults::sources")]
    pub sources: usize,

    /// Session length in seconds (scaled by `div`).
    #[serde(default = "defaults::duration_secs")]
    pub duration_secs: u64,

    /// Wall-clock divider; 1 is real time.
    #[serde(default = "defaults::div")]
    pub div: f64,

    /// Base path for recorder output (`<base>.rgb24`, `<base>.wav`).
    #[serde(default = "defaults::output")]
    pub output: String,

    #[serde(default = "defaults::source_bias")]
    pub source_bias: f64,
    #[serde(default = "defaults::recorder_bias")]
    pub recorder_bias: f64,
    #[serde(default = "defaults::eraser_bias")]
    pub eraser_bias: f64,
    #[serde(default = "defaults::window")]
    pub window: f64,
}

impl Default for SessionConfig {
    fn default() -> Self {
        toml::from_str("").expect("empty session config must deserialize")
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to read '{path}'")]
    Read {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse config")]
    Parse(#[from] toml::de::Error),
}

mod defaults {
    pub fn log_level() -> String {
        "info".into()
    }

    pub fn width() -> i64 {
        800
    }

    pub fn height() -> i64 {
        600
    }

    pub fn vfps() -> i64 {
        15
    }

    pub fn channels() -> i64 {
        2
    }

    pub fn bps() -> i64 {
        16
    }

    pub fn bitrate() -> i64 {
        48000
    }

    pub fn afps() -> i64 {
        50
    }

    pub fn ring_seconds() -> i64 {
        2
    }

    pub fn sources() -> usize {
        16
    }

    pub fn duration_secs() -> u64 {
        60
    }

    pub fn div() -> f64 {
        1.0
    }

    pub fn output() -> String {
        "./out/session".into()
    }

    pub fn source_bias() -> f64 {
        -0.25
    }

    pub fn recorder_bias() -> f64 {
        -0.5
    }

    pub fn eraser_bias() -> f64 {
        -0.75
    }

    pub fn window() -> f64 {
        0.25
    }
}

impl SessionConfig {
    pub fn load(path: impl AsRef<Path> + ToString) -> Result<Self, ConfigError> {
        let text = std::fs::read_to_string(&path).map_err(|source| ConfigError::Read {
            path: path.to_string(),
            source,
        })?;
        let config: SessionConfig = toml::from_str(&text)?;
        Ok(config)
    }

    /// Video ring depth in slots.
    pub fn video_buffers(&self) -> i64 {
        self.ring_seconds * self.vfps
    }

    /// Audio ring depth in slots.
    pub fn audio_buffers(&self) -> i64 {
        self.ring_seconds * self.afps
    }
}
