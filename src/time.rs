//! Timepoint and TimeRange primitives.
//!
//! Timepoints are integer milliseconds since the Unix epoch. A [`TimeRange`] is
//! inclusive at both ends; an end of [`TIME_INFINITY`] marks a range that is
//! still running (an ongoing activity, an unbounded query).

use std::fmt;

use chrono::{DateTime, SecondsFormat, Utc};
use serde::{Deserialize, Serialize};

use crate::error::{PathifyError, Result};

/// Milliseconds since the Unix epoch.
pub type Timepoint = i64;

/// Stand-in for an unbounded range end.
pub const TIME_INFINITY: Timepoint = i64::MAX;

/// Current wall-clock time in milliseconds.
pub fn now() -> Timepoint {
    Utc::now().timestamp_millis()
}

/// Closed interval `[start, end]` of timepoints.
///
/// Construction through [`TimeRange::new`] guarantees `start <= end`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "RawTimeRange")]
pub struct TimeRange {
    start: Timepoint,
    end: Timepoint,
}

#[derive(Deserialize)]
struct RawTimeRange {
    start: Timepoint,
    end: Timepoint,
}

impl TryFrom<RawTimeRange> for TimeRange {
    type Error = PathifyError;

    fn try_from(raw: RawTimeRange) -> Result<Self> {
        TimeRange::new(raw.start, raw.end)
    }
}

impl TimeRange {
    /// Create a range, rejecting `start > end`.
    pub fn new(start: Timepoint, end: Timepoint) -> Result<Self> {
        if start > end {
            return Err(PathifyError::InvalidTimeRange { start, end });
        }
        Ok(Self { start, end })
    }

    /// Range that starts at `start` and has no end yet.
    pub fn open(start: Timepoint) -> Self {
        Self {
            start,
            end: TIME_INFINITY,
        }
    }

    /// `[0, ∞]`, the default range for whole-stream queries.
    pub fn all() -> Self {
        Self::open(0)
    }

    /// Range between two timepoints given in either order.
    pub fn spanning(a: Timepoint, b: Timepoint) -> Self {
        Self {
            start: a.min(b),
            end: a.max(b),
        }
    }

    pub fn start(&self) -> Timepoint {
        self.start
    }

    pub fn end(&self) -> Timepoint {
        self.end
    }

    pub fn is_open(&self) -> bool {
        self.end == TIME_INFINITY
    }

    pub fn contains(&self, t: Timepoint) -> bool {
        time_in_range(t, self)
    }

    /// Length of the range in milliseconds; `TIME_INFINITY` for open ranges.
    pub fn duration(&self) -> Timepoint {
        if self.is_open() {
            TIME_INFINITY
        } else {
            self.end.saturating_sub(self.start)
        }
    }

    /// Smallest range covering both `self` and `t`.
    pub fn expanded_to(&self, t: Timepoint) -> Self {
        Self {
            start: self.start.min(t),
            end: self.end.max(t),
        }
    }

    /// Replace an open end with `end`, keeping the range valid.
    pub fn closed_at(&self, end: Timepoint) -> Self {
        if self.is_open() {
            Self {
                start: self.start,
                end: end.max(self.start),
            }
        } else {
            *self
        }
    }
}

impl Default for TimeRange {
    fn default() -> Self {
        Self::all()
    }
}

impl fmt::Display for TimeRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_open() {
            write!(f, "[{}, ∞]", format_timepoint(self.start))
        } else {
            write!(
                f,
                "[{}, {}]",
                format_timepoint(self.start),
                format_timepoint(self.end)
            )
        }
    }
}

/// Inclusive range test: `tr.start <= t && t <= tr.end`.
#[inline]
pub fn time_in_range(t: Timepoint, tr: &TimeRange) -> bool {
    tr.start <= t && t <= tr.end
}

/// Round `t` to the nearest multiple of `precision_ms` (halves round up).
///
/// A precision of zero (or less) leaves `t` untouched, as does `TIME_INFINITY`.
pub fn round_time(t: Timepoint, precision_ms: i64) -> Timepoint {
    if precision_ms <= 0 || t == TIME_INFINITY {
        return t;
    }
    t.saturating_add(precision_ms / 2).div_euclid(precision_ms) * precision_ms
}

/// RFC3339 UTC rendering of a timepoint, used in logs and reports.
pub fn format_timepoint(t: Timepoint) -> String {
    if t == TIME_INFINITY {
        return "∞".to_string();
    }
    match DateTime::<Utc>::from_timestamp_millis(t) {
        Some(date) => date.to_rfc3339_opts(SecondsFormat::Millis, true),
        None => format!("{}ms", t),
    }
}

/// Format a millisecond duration as `h:mm:ss`, or `m:ss` under an hour.
pub fn format_duration(ms: i64) -> String {
    let total_secs = ms.max(0) / 1000;
    let hours = total_secs / 3600;
    let minutes = (total_secs % 3600) / 60;
    let seconds = total_secs % 60;
    if hours > 0 {
        format!("{}:{:02}:{:02}", hours, minutes, seconds)
    } else {
        format!("{}:{:02}", minutes, seconds)
    }
}
