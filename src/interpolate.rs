//! Point-in-time path interpolation.
//!
//! Given an activity's path and a query time, estimate where the user was,
//! how high, how far along, and how fast, by linear interpolation between the
//! two samples bracketing the query. Nothing is extrapolated: queries past the
//! last sample return the last sample, and queries before the first return
//! the first.
//!
//! All times are rounded (see [`round_time`]) before comparison so sub-second
//! jitter between the UI clock and recorded samples never misses a bracket.
//! The interpolation proportion uses the rounded times too, so answers are
//! quantized to the rounding precision.
//!
//! Past a finished activity's end, position and odometer hold at the last
//! sample while speed keeps the final bracket's value.

use serde::{Deserialize, Serialize};

use crate::activity::{activity_at_rounded, Activity};
use crate::path::{mode_is_moving, ActivityMode, Path, PathSample};
use crate::time::{round_time, Timepoint};

/// Interpolated state at a query time.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "ffi", derive(uniffi::Record))]
pub struct PathInfo {
    /// Query time after rounding
    pub t: Timepoint,
    pub activity_id: String,
    pub lat: f64,
    pub lon: f64,
    /// Elevation in meters
    pub ele: f64,
    /// Odometer in meters
    pub odo: f64,
    /// Speed in m/s
    pub speed: f64,
    /// Mode the user is heading into at `t`
    pub mode: ActivityMode,
    /// How long the current moving/stationary classification has held at `t` (ms)
    pub mode_duration: Timepoint,
}

/// UI state that changes how a query is answered.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PathQueryFlags {
    /// Timeline is pinned to the live clock
    pub now: bool,
    /// An activity is currently recording
    pub tracking: bool,
}

impl PathQueryFlags {
    pub fn live() -> Self {
        Self {
            now: true,
            tracking: true,
        }
    }
}

/// Interpolate `path` (belonging to `activity`) at time `t`.
///
/// Returns `None` for an empty path.
pub fn interpolate_path(
    activity: &Activity,
    path: &Path,
    t: Timepoint,
    flags: PathQueryFlags,
    rounding_ms: i64,
) -> Option<PathInfo> {
    let last = path.last_index()?;
    let rt = |x: Timepoint| round_time(x, rounding_ms);
    let tq = rt(t);
    let times = path.t();
    let modes = path.mode();

    let speeds = path.speed();
    let mut mode_change = rt(times[0]);

    let live = flags.tracking && flags.now;
    let past_end = activity.t_end.map_or(false, |end| tq > rt(end));

    if live || past_end || tq >= rt(times[last]) {
        for i in 0..last {
            if mode_is_moving(modes[i]) != mode_is_moving(modes[i + 1]) {
                mode_change = rt(times[i]);
            }
        }
        let sample = path.sample(last)?;
        // After the activity ends, report the final bracket's speed, not the stopped one
        let speed = if past_end && !live {
            speeds[last.saturating_sub(1)]
        } else {
            sample.speed
        };
        return Some(from_sample(activity, tq, &sample, speed, tq - mode_change));
    }

    let mut speed = speeds[0];

    for i in 0..last {
        let t1 = rt(times[i]);
        let t2 = if i + 1 == last {
            activity
                .t_last_loc
                .map(rt)
                .filter(|&t_last| t_last >= t1)
                .unwrap_or_else(|| rt(times[i + 1]))
        } else {
            rt(times[i + 1])
        };

        // Attribute a flip to the start of the bracket that reports the new mode
        if mode_is_moving(modes[i]) != mode_is_moving(modes[i + 1]) {
            mode_change = t1;
        }
        speed = speeds[i];

        if t1 <= tq && tq <= t2 {
            let proportion = if t2 > t1 {
                (tq - t1) as f64 / (t2 - t1) as f64
            } else {
                0.0
            };
            let at = |column: &[f64]| lerp(column[i], column[i + 1], proportion);
            return Some(PathInfo {
                t: tq,
                activity_id: activity.id.clone(),
                lat: at(path.lats()),
                lon: at(path.lons()),
                ele: at(path.ele()),
                odo: at(path.odo()),
                speed: at(speeds),
                mode: ActivityMode::from_number(modes[i + 1]),
                mode_duration: (tq - mode_change).max(0),
            });
        }
    }

    if tq < rt(times[0]) {
        let first = path.sample(0)?;
        return Some(from_sample(activity, tq, &first, 0.0, 0));
    }

    // Past the final bracket: hold position, keep the last scanned speed
    let sample = path.sample(last)?;
    Some(from_sample(activity, tq, &sample, speed, tq - mode_change))
}

/// Find the activity spanning `t` and interpolate its path.
///
/// `path_for` resolves an activity id to its path. Missing activities or
/// paths yield `None`.
pub fn path_info_at<'a, F>(
    activities: &'a [Activity],
    path_for: F,
    t: Timepoint,
    flags: PathQueryFlags,
    rounding_ms: i64,
) -> Option<PathInfo>
where
    F: Fn(&str) -> Option<&'a Path>,
{
    let activity = activity_at_rounded(activities, t, rounding_ms)?;
    let path = path_for(&activity.id)?;
    interpolate_path(activity, path, t, flags, rounding_ms)
}

/// Linear interpolation that lands exactly on the endpoints.
fn lerp(a: f64, b: f64, proportion: f64) -> f64 {
    if proportion <= 0.0 {
        a
    } else if proportion >= 1.0 {
        b
    } else {
        a + (b - a) * proportion
    }
}

fn from_sample(
    activity: &Activity,
    t: Timepoint,
    sample: &PathSample,
    speed: f64,
    mode_duration: Timepoint,
) -> PathInfo {
    PathInfo {
        t,
        activity_id: activity.id.clone(),
        lat: sample.lat,
        lon: sample.lon,
        ele: sample.ele,
        odo: sample.odo,
        speed,
        mode: ActivityMode::from_number(sample.mode),
        mode_duration: mode_duration.max(0),
    }
}
