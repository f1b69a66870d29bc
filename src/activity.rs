//! Activity model: a labelled span of tracked time with a 1:1 path.

use serde::{Deserialize, Serialize};

use crate::time::{round_time, TimeRange, Timepoint};

/// A user-started tracking session.
///
/// Values handed out by the repository are snapshots; changes go through
/// [`crate::store::ActivityRepository`] methods.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Activity {
    pub id: String,
    pub t_start: Timepoint,
    /// `None` while the activity is still tracking
    pub t_end: Option<Timepoint>,
    /// Time of the most recent location appended to the path
    pub t_last_loc: Option<Timepoint>,
    /// Time of the most recent update of any kind
    pub t_last_update: Timepoint,
    /// Odometer reading (meters) at the first location
    pub odo_start: f64,
    /// Latest odometer reading (meters)
    pub odo: f64,
    /// Number of path samples
    pub count: u32,
    /// Longest interval between consecutive locations (ms)
    pub max_gap_time: Timepoint,
    /// When the longest interval ended
    pub t_max_gap: Option<Timepoint>,
}

impl Activity {
    pub fn new(id: impl Into<String>, t_start: Timepoint) -> Self {
        Self {
            id: id.into(),
            t_start,
            t_end: None,
            t_last_loc: None,
            t_last_update: t_start,
            odo_start: 0.0,
            odo: 0.0,
            count: 0,
            max_gap_time: 0,
            t_max_gap: None,
        }
    }

    /// `[t_start, t_end]`, or open-ended while tracking.
    pub fn time_range(&self) -> TimeRange {
        match self.t_end {
            Some(end) => TimeRange::spanning(self.t_start, end),
            None => TimeRange::open(self.t_start),
        }
    }

    pub fn contains(&self, t: Timepoint) -> bool {
        self.time_range().contains(t)
    }

    /// Containment with `t` and both bounds rounded to `precision_ms`.
    pub fn contains_rounded(&self, t: Timepoint, precision_ms: i64) -> bool {
        let t = round_time(t, precision_ms);
        round_time(self.t_start, precision_ms) <= t
            && self.t_end.map_or(true, |end| t <= round_time(end, precision_ms))
    }

    pub fn is_ongoing(&self) -> bool {
        self.t_end.is_none()
    }

    /// Distance covered so far in meters.
    pub fn distance(&self) -> f64 {
        (self.odo - self.odo_start).max(0.0)
    }
}

/// First activity whose span contains `t`.
pub fn activity_for_timepoint(activities: &[Activity], t: Timepoint) -> Option<&Activity> {
    activity_at_rounded(activities, t, 0)
}

/// First activity containing `t` once times are rounded to `precision_ms`.
///
/// A precision of zero compares exact times.
pub fn activity_at_rounded(
    activities: &[Activity],
    t: Timepoint,
    precision_ms: i64,
) -> Option<&Activity> {
    activities.iter().find(|a| a.contains_rounded(t, precision_ms))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_time_range_open_while_tracking() {
        let mut activity = Activity::new("a1", 1000);
        assert!(activity.is_ongoing());
        assert!(activity.contains(10_000_000));

        activity.t_end = Some(5000);
        assert!(!activity.is_ongoing());
        assert!(activity.contains(5000));
        assert!(!activity.contains(5001));
    }

    #[test]
    fn test_activity_for_timepoint() {
        let mut first = Activity::new("first", 1000);
        first.t_end = Some(2000);
        let second = Activity::new("second", 3000);
        let activities = vec![first, second];

        assert_eq!(activity_for_timepoint(&activities, 1500).map(|a| a.id.as_str()), Some("first"));
        assert_eq!(activity_for_timepoint(&activities, 9999).map(|a| a.id.as_str()), Some("second"));
        assert!(activity_for_timepoint(&activities, 2500).is_none());
        assert!(activity_for_timepoint(&[], 2500).is_none());
    }

    #[test]
    fn test_rounded_lookup_absorbs_jitter() {
        let mut activity = Activity::new("a", 1000);
        activity.t_end = Some(5000);
        let activities = vec![activity];

        // 5300 rounds down onto the end second; 700 rounds up onto the start
        assert!(activity_for_timepoint(&activities, 5300).is_none());
        assert!(activity_at_rounded(&activities, 5300, 1000).is_some());
        assert!(activity_at_rounded(&activities, 700, 1000).is_some());
        assert!(activity_at_rounded(&activities, 5600, 1000).is_none());
        assert!(activities[0].contains_rounded(5000, 0));
        assert!(!activities[0].contains_rounded(5001, 0));
    }

    #[test]
    fn test_distance_never_negative() {
        let mut activity = Activity::new("a", 0);
        activity.odo_start = 100.0;
        activity.odo = 50.0;
        assert_eq!(activity.distance(), 0.0);
        activity.odo = 350.0;
        assert_eq!(activity.distance(), 250.0);
    }
}
