//! Engine configuration.
//!
//! Every knob has a default tuned for phone-rate GPS sampling (roughly one fix
//! per second while moving). Configs deserialize from JSON so host apps can
//! ship overrides alongside their own settings.

use serde::{Deserialize, Serialize};

use crate::error::{PathifyError, Result};
use crate::time::Timepoint;

/// Track segmentation settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TrackConfig {
    /// Largest allowed gap between consecutive location events within one track.
    /// Default: 60_000 ms
    pub max_time_gap_ms: Timepoint,
}

impl Default for TrackConfig {
    fn default() -> Self {
        Self {
            max_time_gap_ms: 60_000,
        }
    }
}

/// Path interpolation and selector settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct InterpolationConfig {
    /// Precision that query and sample times are rounded to before comparison.
    /// Default: 1000 ms (nearest second)
    pub rounding_ms: i64,

    /// Entries kept by the memoized path-info selector.
    /// Default: 64
    pub cache_capacity: usize,
}

impl Default for InterpolationConfig {
    fn default() -> Self {
        Self {
            rounding_ms: 1000,
            cache_capacity: 64,
        }
    }
}

/// Activity metrics settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MetricsConfig {
    /// Location events older than this (relative to the reference time) are too
    /// stale to report a current speed.
    /// Default: 10_000 ms
    pub speed_currency_ms: Timepoint,
}

impl Default for MetricsConfig {
    fn default() -> Self {
        Self {
            speed_currency_ms: 10_000,
        }
    }
}

/// Top-level configuration for a [`crate::store::TimelineStore`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TimelineConfig {
    pub tracks: TrackConfig,
    pub interpolation: InterpolationConfig,
    pub metrics: MetricsConfig,
    /// Events older than this are dropped by `prune_events`.
    /// Default: 7 days
    pub event_retention_ms: Timepoint,
}

/// One week in milliseconds.
pub const DEFAULT_EVENT_RETENTION_MS: Timepoint = 7 * 24 * 60 * 60 * 1000;

impl Default for TimelineConfig {
    fn default() -> Self {
        Self {
            tracks: TrackConfig::default(),
            interpolation: InterpolationConfig::default(),
            metrics: MetricsConfig::default(),
            event_retention_ms: DEFAULT_EVENT_RETENTION_MS,
        }
    }
}

impl TimelineConfig {
    /// Parse a (possibly partial) JSON config; missing fields take defaults.
    pub fn from_json(json: &str) -> Result<Self> {
        let config: TimelineConfig = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    /// Reject values that would make the engine misbehave.
    pub fn validate(&self) -> Result<()> {
        if self.tracks.max_time_gap_ms <= 0 {
            return Err(config_error("tracks.max_time_gap_ms must be positive"));
        }
        if self.interpolation.rounding_ms < 0 {
            return Err(config_error("interpolation.rounding_ms must not be negative"));
        }
        if self.interpolation.cache_capacity == 0 {
            return Err(config_error("interpolation.cache_capacity must be at least 1"));
        }
        if self.metrics.speed_currency_ms < 0 {
            return Err(config_error("metrics.speed_currency_ms must not be negative"));
        }
        if self.event_retention_ms <= 0 {
            return Err(config_error("event_retention_ms must be positive"));
        }
        Ok(())
    }
}

fn config_error(message: &str) -> PathifyError {
    PathifyError::Config {
        message: message.to_string(),
    }
}
