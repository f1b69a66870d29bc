//! # Timeline Store
//!
//! In-memory owner of the event log, activities, and their paths.
//!
//! ## Read/write boundary
//!
//! Reads hand out shared references or snapshots. Every mutation goes through
//! an [`ActivityRepository`] method, and each one bumps a generation counter
//! that memoized selectors use as their notion of "activity list identity".
//!
//! The store is created explicitly and passed to whoever needs it; there is
//! no process-wide instance.

use std::collections::HashMap;

use log::{debug, info, warn};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::activity::Activity;
use crate::config::TimelineConfig;
use crate::error::{OptionExt, PathifyError, Result};
use crate::events::{Event, EventKind, LocationData};
use crate::geo_utils::haversine_distance;
use crate::interpolate::{PathInfo, PathQueryFlags};
use crate::metrics::{activity_metrics, ActivityMetrics};
use crate::path::{ActivityMode, Path, PathSample};
use crate::selector::PathInfoSelector;
use crate::time::{format_timepoint, time_in_range, TimeRange, Timepoint};
use crate::tracks::{continuous_tracks, Track};

// ============================================================================
// Repository Interface
// ============================================================================

/// Storage seam between the timeline engine and its callers.
pub trait ActivityRepository {
    /// All activities, ordered by start time.
    fn activities(&self) -> &[Activity];

    fn activity(&self, id: &str) -> Option<&Activity>;

    fn path(&self, activity_id: &str) -> Option<&Path>;

    /// Event log, sorted by time.
    fn events(&self) -> &[Event];

    /// The activity currently recording, if any.
    fn tracking_activity(&self) -> Option<&Activity>;

    /// Counter bumped on every mutation.
    fn generation(&self) -> u64;

    /// Log an event; location events also extend the tracking activity's path.
    ///
    /// Returns true when a path sample was appended.
    fn record_event(&mut self, event: Event) -> bool;

    /// Begin a new activity at `t`, returning its id.
    fn start_activity(&mut self, t: Timepoint) -> Result<String>;

    /// Finish the tracking activity at `t`, returning its final state.
    fn stop_activity(&mut self, t: Timepoint) -> Result<Activity>;

    /// Remove an activity and its path, optionally with the events it spans.
    fn delete_activity(&mut self, id: &str, delete_events: bool) -> Result<()>;
}

/// Counts for diagnostics.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct StoreStats {
    pub event_count: usize,
    pub activity_count: usize,
    pub path_sample_count: usize,
    pub tracking: bool,
    pub generation: u64,
}

// ============================================================================
// Timeline Store
// ============================================================================

/// In-memory [`ActivityRepository`].
#[derive(Debug)]
pub struct TimelineStore {
    config: TimelineConfig,
    events: Vec<Event>,
    activities: Vec<Activity>,
    paths: HashMap<String, Path>,
    tracking_id: Option<String>,
    /// Latest mode number seen in a mode-change event, stamped onto new samples
    current_mode: u8,
    generation: u64,
}

impl Default for TimelineStore {
    fn default() -> Self {
        Self::new(TimelineConfig::default())
    }
}

impl TimelineStore {
    pub fn new(config: TimelineConfig) -> Self {
        Self {
            config,
            events: Vec::new(),
            activities: Vec::new(),
            paths: HashMap::new(),
            tracking_id: None,
            current_mode: ActivityMode::Unknown.as_number(),
            generation: 0,
        }
    }

    pub fn config(&self) -> &TimelineConfig {
        &self.config
    }

    pub fn stats(&self) -> StoreStats {
        StoreStats {
            event_count: self.events.len(),
            activity_count: self.activities.len(),
            path_sample_count: self.paths.values().map(Path::len).sum(),
            tracking: self.tracking_id.is_some(),
            generation: self.generation,
        }
    }

    /// Drop events older than `retention_ms` before `now`.
    ///
    /// Returns the number of events removed.
    pub fn prune_events(&mut self, retention_ms: Timepoint, now: Timepoint) -> usize {
        let cutoff = now.saturating_sub(retention_ms);
        let keep_from = self.events.partition_point(|e| e.t < cutoff);
        if keep_from > 0 {
            self.events.drain(..keep_from);
            self.bump();
            info!(
                "[TimelineStore] Pruned {} events before {}",
                keep_from,
                format_timepoint(cutoff)
            );
        }
        keep_from
    }

    /// Remove everything.
    pub fn clear(&mut self) {
        self.events.clear();
        self.activities.clear();
        self.paths.clear();
        self.tracking_id = None;
        self.current_mode = ActivityMode::Unknown.as_number();
        self.bump();
    }

    // ========================================================================
    // Queries
    // ========================================================================

    /// Interpolated state at `t`, memoized through `selector`.
    pub fn path_info(
        &self,
        selector: &mut PathInfoSelector,
        t: Timepoint,
        now: bool,
    ) -> Option<PathInfo> {
        let flags = PathQueryFlags {
            now,
            tracking: self.tracking_id.is_some(),
        };
        selector.select(self, t, flags)
    }

    /// Metrics for one activity as of `t` (defaults to the activity end).
    pub fn metrics_for(&self, activity_id: &str, t: Option<Timepoint>) -> Result<ActivityMetrics> {
        let activity = self.activity(activity_id).ok_or_unknown_activity(activity_id)?;
        Ok(activity_metrics(
            &self.events,
            &activity.time_range(),
            t,
            &self.config.metrics,
        ))
    }

    /// Tracks in `tr` using the configured gap threshold.
    pub fn tracks(&self, tr: &TimeRange) -> Vec<Track> {
        continuous_tracks(&self.events, self.config.tracks.max_time_gap_ms, tr)
    }

    // ========================================================================
    // Internal
    // ========================================================================

    fn bump(&mut self) {
        self.generation += 1;
    }

    fn insert_event_sorted(&mut self, event: Event) {
        let index = self.events.partition_point(|e| e.t <= event.t);
        self.events.insert(index, event);
    }

    /// Append a location to the tracking activity's path, updating the
    /// activity's running totals.
    fn append_location(&mut self, t: Timepoint, data: &LocationData) -> bool {
        let Some(id) = self.tracking_id.clone() else {
            return false;
        };
        let Some(activity) = self.activities.iter_mut().find(|a| a.id == id) else {
            warn!("[TimelineStore] Tracking id {} has no activity", id);
            return false;
        };
        if !activity.contains(t) {
            return false;
        }
        let path = self.paths.entry(id.clone()).or_insert_with(|| Path::new(id.clone()));

        let previous = path.last_sample();
        if let Some(prev) = previous {
            if t < prev.t {
                debug!(
                    "[TimelineStore] Location at {} predates path end {}, not appended",
                    t, prev.t
                );
                return false;
            }
        }

        let odo = match (data.odo, previous) {
            (Some(odo), _) => odo,
            (None, Some(prev)) => prev.odo + haversine_distance(prev.lat, prev.lon, data.lat, data.lon),
            (None, None) => 0.0,
        };
        let ele = data
            .ele
            .or_else(|| previous.map(|p| p.ele))
            .unwrap_or(0.0);

        path.push(PathSample {
            t,
            lat: data.lat,
            lon: data.lon,
            ele,
            odo,
            speed: data.speed.unwrap_or(0.0),
            mode: self.current_mode,
        });

        if activity.count == 0 {
            activity.odo_start = odo;
        }
        if let Some(t_last) = activity.t_last_loc {
            let gap = t - t_last;
            if gap > activity.max_gap_time {
                activity.max_gap_time = gap;
                activity.t_max_gap = Some(t);
            }
        }
        activity.odo = odo;
        activity.count += 1;
        activity.t_last_loc = Some(t);
        activity.t_last_update = activity.t_last_update.max(t);
        true
    }

    /// Restore state wholesale (snapshot import). Paths must already be validated.
    pub(crate) fn replace_all(
        &mut self,
        mut activities: Vec<Activity>,
        paths: Vec<Path>,
        events: Vec<Event>,
    ) {
        activities.sort_by_key(|a| a.t_start);
        self.tracking_id = activities
            .iter()
            .rev()
            .find(|a| a.is_ongoing())
            .map(|a| a.id.clone());
        self.paths = paths
            .into_iter()
            .map(|p| (p.id().to_string(), p))
            .collect();
        self.current_mode = events
            .iter()
            .rev()
            .find_map(|e| match &e.kind {
                EventKind::ModeChange(change) => Some(change.mode),
                _ => None,
            })
            .unwrap_or(ActivityMode::Unknown.as_number());
        self.activities = activities;
        self.events = events;
        self.bump();
    }

    pub(crate) fn all_paths(&self) -> impl Iterator<Item = &Path> {
        self.paths.values()
    }
}

impl ActivityRepository for TimelineStore {
    fn activities(&self) -> &[Activity] {
        &self.activities
    }

    fn activity(&self, id: &str) -> Option<&Activity> {
        self.activities.iter().find(|a| a.id == id)
    }

    fn path(&self, activity_id: &str) -> Option<&Path> {
        self.paths.get(activity_id)
    }

    fn events(&self) -> &[Event] {
        &self.events
    }

    fn tracking_activity(&self) -> Option<&Activity> {
        self.tracking_id.as_deref().and_then(|id| self.activity(id))
    }

    fn generation(&self) -> u64 {
        self.generation
    }

    fn record_event(&mut self, event: Event) -> bool {
        let t = event.t;
        let appended = match &event.kind {
            EventKind::ModeChange(change) => {
                self.current_mode = change.mode;
                false
            }
            EventKind::Location(data) => self.append_location(t, data),
            _ => false,
        };
        self.insert_event_sorted(event);
        self.bump();
        appended
    }

    fn start_activity(&mut self, t: Timepoint) -> Result<String> {
        if let Some(activity_id) = &self.tracking_id {
            return Err(PathifyError::AlreadyTracking {
                activity_id: activity_id.clone(),
            });
        }
        let id = Uuid::new_v4().to_string();
        let index = self.activities.partition_point(|a| a.t_start <= t);
        self.activities.insert(index, Activity::new(id.clone(), t));
        self.paths.insert(id.clone(), Path::new(id.clone()));
        self.tracking_id = Some(id.clone());
        self.bump();
        info!("[TimelineStore] Started activity {} at {}", id, format_timepoint(t));
        Ok(id)
    }

    fn stop_activity(&mut self, t: Timepoint) -> Result<Activity> {
        let id = self.tracking_id.take().ok_or(PathifyError::NotTracking)?;
        let activity = self
            .activities
            .iter_mut()
            .find(|a| a.id == id)
            .ok_or_unknown_activity(&id)?;
        let t_end = t.max(activity.t_start);
        activity.t_end = Some(t_end);
        activity.t_last_update = activity.t_last_update.max(t_end);
        let finished = activity.clone();
        self.bump();
        info!(
            "[TimelineStore] Stopped activity {} ({} samples, {:.0}m)",
            finished.id,
            finished.count,
            finished.distance()
        );
        Ok(finished)
    }

    fn delete_activity(&mut self, id: &str, delete_events: bool) -> Result<()> {
        let index = self
            .activities
            .iter()
            .position(|a| a.id == id)
            .ok_or_unknown_activity(id)?;
        let removed = self.activities.remove(index);
        self.paths.remove(id);
        if self.tracking_id.as_deref() == Some(id) {
            self.tracking_id = None;
        }
        if delete_events {
            let span = removed.time_range();
            let before = self.events.len();
            self.events.retain(|e| !time_in_range(e.t, &span));
            debug!(
                "[TimelineStore] Deleted {} events with activity {}",
                before - self.events.len(),
                id
            );
        }
        self.bump();
        info!("[TimelineStore] Deleted activity {}", id);
        Ok(())
    }
}
