//! Activity metrics over a time window.
//!
//! Metrics come in pairs: a *partial* value up to a reference time (where the
//! user has scrubbed to) and a *total* over the whole window. Computation is
//! best-effort: a failure part-way through is logged and whatever was already
//! assembled is returned.
//!
//! ## Example
//! ```rust
//! use pathify_core::config::MetricsConfig;
//! use pathify_core::events::{Event, LocationData};
//! use pathify_core::metrics::activity_metrics;
//! use pathify_core::time::TimeRange;
//!
//! let events = vec![
//!     Event::location(2000, LocationData::new(37.0, -122.0).with_odo(50.0)),
//!     Event::location(4000, LocationData::new(37.0, -122.0).with_odo(150.0)),
//! ];
//! let tr = TimeRange::new(1000, 5000).unwrap();
//! let metrics = activity_metrics(&events, &tr, Some(3000), &MetricsConfig::default());
//! assert_eq!(metrics.partial_distance.unwrap().value, 0.0);
//! ```

use log::{debug, warn};
use serde::{Deserialize, Serialize};

use crate::config::MetricsConfig;
use crate::error::{PathifyError, Result};
use crate::events::Event;
use crate::time::{format_duration, time_in_range, TimeRange, Timepoint};

/// Meters in a statute mile.
pub const METERS_PER_MILE: f64 = 1609.344;

/// m/s to mph factor.
pub const MPS_TO_MPH: f64 = 2.236_936_292_054_402;

pub fn meters_to_miles(meters: f64) -> f64 {
    meters / METERS_PER_MILE
}

pub fn mps_to_mph(mps: f64) -> f64 {
    mps * MPS_TO_MPH
}

/// One named derived quantity.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ActivityMetric {
    pub value: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub display_text: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub units: Option<String>,
}

impl ActivityMetric {
    fn new(value: f64, text: &str, display_text: String, units: Option<&str>) -> Self {
        Self {
            value,
            display_text: Some(display_text),
            text: Some(text.to_string()),
            units: units.map(str::to_string),
        }
    }
}

/// Metrics for a window. `None` fields were not computed (no data, or the
/// computation stopped early).
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ActivityMetrics {
    /// Elapsed ms from window start to the reference time
    pub partial_time: Option<ActivityMetric>,
    /// Elapsed ms across the whole window
    pub total_time: Option<ActivityMetric>,
    /// Combined partial/total time for display
    pub time: Option<ActivityMetric>,
    /// Miles covered up to the reference time
    pub partial_distance: Option<ActivityMetric>,
    /// Miles covered across the window
    pub total_distance: Option<ActivityMetric>,
    /// Combined partial/total distance for display
    pub distance: Option<ActivityMetric>,
    /// Current speed in mph
    pub speed: Option<ActivityMetric>,
    /// Events within the (expanded) window
    pub event_count: Option<ActivityMetric>,
}

impl ActivityMetrics {
    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string(self)?)
    }
}

/// Compute metrics over `time_range`, using `t` as the as-of time.
///
/// `t` defaults to the range end. For an open range without `t`, the latest
/// event in the window is used (or the range start if there is none). The
/// window is expanded to cover `t`, so scrubbing past the nominal end still
/// produces metrics. Never fails; see the module docs.
pub fn activity_metrics(
    events: &[Event],
    time_range: &TimeRange,
    t: Option<Timepoint>,
    config: &MetricsConfig,
) -> ActivityMetrics {
    let mut metrics = ActivityMetrics::default();
    match collect_metrics(events, time_range, t, config, &mut metrics) {
        Ok(()) => debug!("[Metrics] Computed metrics for {}", time_range),
        Err(err) => warn!("[Metrics] Partial metrics for {}: {}", time_range, err),
    }
    metrics
}

fn reference_time(events: &[Event], time_range: &TimeRange, t: Option<Timepoint>) -> Timepoint {
    if let Some(t) = t {
        return t;
    }
    if !time_range.is_open() {
        return time_range.end();
    }
    events
        .iter()
        .filter(|e| e.t >= time_range.start())
        .map(|e| e.t)
        .max()
        .unwrap_or(time_range.start())
}

fn collect_metrics(
    events: &[Event],
    time_range: &TimeRange,
    t: Option<Timepoint>,
    config: &MetricsConfig,
    metrics: &mut ActivityMetrics,
) -> Result<()> {
    let reference = reference_time(events, time_range, t);
    let window = time_range.expanded_to(reference).closed_at(reference);

    // Time: a closed range keeps its nominal length; an open one runs to the reference
    let partial_time = elapsed(time_range.start(), reference)?;
    let total_time = if time_range.is_open() {
        elapsed(time_range.start(), window.end())?
    } else {
        elapsed(time_range.start(), time_range.end())?
    };
    metrics.partial_time = Some(ActivityMetric::new(
        partial_time as f64,
        "Elapsed time",
        format_duration(partial_time),
        Some("ms"),
    ));
    metrics.total_time = Some(ActivityMetric::new(
        total_time as f64,
        "Total time",
        format_duration(total_time),
        Some("ms"),
    ));
    metrics.time = Some(ActivityMetric::new(
        partial_time as f64,
        "Time",
        partial_over_total(format_duration(partial_time), format_duration(total_time)),
        None,
    ));

    // Event count
    let in_window: Vec<&Event> = events.iter().filter(|e| time_in_range(e.t, &window)).collect();
    metrics.event_count = Some(ActivityMetric::new(
        in_window.len() as f64,
        "Events",
        in_window.len().to_string(),
        None,
    ));

    // Distance and speed
    let mut odo_first: Option<f64> = None;
    let mut odo_last: Option<f64> = None;
    let mut odo_partial: Option<f64> = None;
    let mut speed = 0.0;
    let mut speed_t: Option<Timepoint> = None;

    for event in &in_window {
        let Some(data) = event.location_data() else {
            continue;
        };
        if let Some(odo) = data.odo {
            if !odo.is_finite() {
                return Err(PathifyError::Internal {
                    message: format!("non-finite odometer at t={}", event.t),
                });
            }
            if odo != 0.0 {
                odo_first.get_or_insert(odo);
                odo_last = Some(odo);
                if event.t <= reference {
                    odo_partial = Some(odo);
                }
            }
        }
        let current = event.t <= reference && reference - event.t <= config.speed_currency_ms;
        let newer = speed_t.map_or(true, |prev| event.t >= prev);
        if current && newer {
            if let Some(s) = data.speed {
                if !s.is_finite() {
                    return Err(PathifyError::Internal {
                        message: format!("non-finite speed at t={}", event.t),
                    });
                }
                speed = s;
                speed_t = Some(event.t);
            }
        }
    }

    if let (Some(first), Some(last)) = (odo_first, odo_last) {
        let partial_miles = meters_to_miles(odo_partial.map_or(0.0, |p| (p - first).max(0.0)));
        let total_miles = meters_to_miles((last - first).max(0.0));
        metrics.partial_distance = Some(ActivityMetric::new(
            partial_miles,
            "Distance",
            format!("{:.2}", partial_miles),
            Some("mi"),
        ));
        metrics.total_distance = Some(ActivityMetric::new(
            total_miles,
            "Total distance",
            format!("{:.2}", total_miles),
            Some("mi"),
        ));
        metrics.distance = Some(ActivityMetric::new(
            partial_miles,
            "Distance",
            partial_over_total(format!("{:.2}", partial_miles), format!("{:.2}", total_miles)),
            Some("mi"),
        ));
    }

    let mph = mps_to_mph(speed);
    metrics.speed = Some(ActivityMetric::new(mph, "Speed", format!("{:.1}", mph), Some("mph")));

    Ok(())
}

fn elapsed(from: Timepoint, to: Timepoint) -> Result<Timepoint> {
    to.checked_sub(from)
        .map(|d| d.max(0))
        .ok_or_else(|| PathifyError::Internal {
            message: format!("elapsed time overflow ({} - {})", to, from),
        })
}

fn partial_over_total(partial: String, total: String) -> String {
    if partial == total {
        partial
    } else {
        format!("{} / {}", partial, total)
    }
}
