//! Static configuration.
//!
//! Every tunable is a named field with its unit in the name or doc comment.
//! A JSON file may override any subset; missing fields keep their defaults.

use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::monitor::{DEFAULT_PROBE_TARGETS, MonitorConfig};
use crate::params::{ParameterError, SimulationParameters};
use crate::render_loop::RenderLoopConfig;

/// Panel geometry in pixels.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct DisplayConfig {
    pub width: usize,
    pub height: usize,
}

impl Default for DisplayConfig {
    fn default() -> Self {
        Self {
            width: 240,
            height: 240,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Config {
    pub display: DisplayConfig,
    /// Cells per side of the 2D simulation grid. Odd sizes put a cell on the
    /// exact centre of the plate.
    pub grid_size: usize,
    /// Render cadence in milliseconds (50 ms ≈ 20 fps).
    pub tick_interval_ms: u64,
    /// Simulated seconds per wall-clock second.
    pub time_scale: f64,
    /// Seconds between connectivity probes while connected.
    pub probe_interval_secs: u64,
    /// Deadline for a single probe, milliseconds.
    pub probe_timeout_ms: u64,
    /// Seconds to wait between reconnection attempts; the last value repeats.
    pub backoff_secs: Vec<u64>,
    /// Re-show the IP banner every Nth successful probe (0 = never).
    pub ip_refresh_every: u32,
    /// Seconds the IP banner stays up at boot and on refresh.
    pub ip_banner_secs: u64,
    /// `host:port` targets for the TCP reachability probe.
    pub probe_targets: Vec<String>,
    /// Control API bind address.
    pub host: String,
    /// Control API port.
    pub port: u16,
    /// Parameters in effect at startup.
    pub defaults: SimulationParameters,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            display: DisplayConfig::default(),
            grid_size: 49,
            tick_interval_ms: 50,
            time_scale: 1.0,
            probe_interval_secs: 30,
            probe_timeout_ms: 3000,
            backoff_secs: vec![1, 2, 5, 10, 30, 60],
            ip_refresh_every: 10,
            ip_banner_secs: 10,
            probe_targets: DEFAULT_PROBE_TARGETS.iter().map(|s| s.to_string()).collect(),
            host: "0.0.0.0".to_string(),
            port: 5000,
            defaults: SimulationParameters::default(),
        }
    }
}

impl Config {
    /// Load from a JSON file and validate.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path).map_err(|e| ConfigError::Io {
            path: path.display().to_string(),
            source: e,
        })?;
        let config: Config = serde_json::from_str(&text).map_err(ConfigError::Parse)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.display.width == 0 || self.display.height == 0 {
            return Err(ConfigError::Invalid("display width and height must be > 0".into()));
        }
        if self.grid_size == 0 {
            return Err(ConfigError::Invalid("grid_size must be > 0".into()));
        }
        if self.tick_interval_ms == 0 {
            return Err(ConfigError::Invalid("tick_interval_ms must be > 0".into()));
        }
        if !self.time_scale.is_finite() || self.time_scale < 0.0 {
            return Err(ConfigError::Invalid("time_scale must be a finite number >= 0".into()));
        }
        if self.probe_interval_secs == 0 {
            return Err(ConfigError::Invalid("probe_interval_secs must be > 0".into()));
        }
        if self.probe_timeout_ms == 0 {
            return Err(ConfigError::Invalid("probe_timeout_ms must be > 0".into()));
        }
        // Targets are tried in parallel, so each one gets the whole timeout;
        // it only has to fit inside the probe interval.
        if self.probe_timeout_ms >= self.probe_interval_secs.saturating_mul(1000) {
            return Err(ConfigError::Invalid(
                "probe_timeout_ms must be shorter than probe_interval_secs".into(),
            ));
        }
        if self.backoff_secs.is_empty() {
            return Err(ConfigError::Invalid("backoff_secs must not be empty".into()));
        }
        if self.backoff_secs.windows(2).any(|w| w[0] > w[1]) {
            return Err(ConfigError::Invalid("backoff_secs must be ascending".into()));
        }
        if self.probe_targets.is_empty() {
            return Err(ConfigError::Invalid("probe_targets must not be empty".into()));
        }
        self.defaults.validate().map_err(ConfigError::Defaults)?;
        Ok(())
    }

    pub fn tick_interval(&self) -> Duration {
        Duration::from_millis(self.tick_interval_ms)
    }

    pub fn monitor(&self) -> MonitorConfig {
        MonitorConfig {
            probe_interval: Duration::from_secs(self.probe_interval_secs),
            probe_timeout: Duration::from_millis(self.probe_timeout_ms),
            backoff: self.backoff_secs.iter().copied().map(Duration::from_secs).collect(),
            ip_refresh_every: self.ip_refresh_every,
        }
    }

    pub fn render_loop(&self) -> RenderLoopConfig {
        RenderLoopConfig {
            width: self.display.width,
            height: self.display.height,
            grid_size: self.grid_size,
            tick_interval: self.tick_interval(),
            time_scale: self.time_scale,
            ip_banner: Duration::from_secs(self.ip_banner_secs),
        }
    }
}

#[derive(Debug)]
pub enum ConfigError {
    Io { path: String, source: std::io::Error },
    Parse(serde_json::Error),
    Invalid(String),
    Defaults(ParameterError),
}

impl std::fmt::Display for ConfigError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Io { path, source } => write!(f, "cannot read config {path}: {source}"),
            Self::Parse(e) => write!(f, "invalid config JSON: {e}"),
            Self::Invalid(why) => write!(f, "invalid config: {why}"),
            Self::Defaults(e) => write!(f, "invalid default parameters: {e}"),
        }
    }
}

impl std::error::Error for ConfigError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Io { source, .. } => Some(source),
            Self::Parse(e) => Some(e),
            Self::Defaults(e) => Some(e),
            Self::Invalid(_) => None,
        }
    }
}
