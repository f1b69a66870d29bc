//! # Snapshot Export
//!
//! JSON snapshots of a [`TimelineStore`] plus an integrity check that can be
//! run against a snapshot before (or instead of) importing it.

use std::collections::HashSet;

use log::{info, warn};
use serde::{Deserialize, Serialize};

use crate::activity::Activity;
use crate::error::{PathifyError, Result};
use crate::events::{first_unsorted_index, Event};
use crate::path::Path;
use crate::store::{ActivityRepository, TimelineStore};
use crate::time::{now, TimeRange, Timepoint};
use crate::tracks::{continuous_tracks, Track, TrackSummary};

/// Current snapshot format version.
pub const SNAPSHOT_VERSION: u32 = 1;

/// Complete serialized state of a timeline.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TimelineSnapshot {
    pub version: u32,
    pub exported_at: Timepoint,
    pub activities: Vec<Activity>,
    pub paths: Vec<Path>,
    pub events: Vec<Event>,
}

impl TimelineStore {
    /// Capture the current state.
    ///
    /// Paths are ordered by their activity's start time so output is stable.
    pub fn export_snapshot(&self) -> TimelineSnapshot {
        let activities = self.activities().to_vec();
        let mut paths: Vec<Path> = self.all_paths().cloned().collect();
        paths.sort_by_key(|p| {
            activities
                .iter()
                .position(|a| a.id == p.id())
                .unwrap_or(usize::MAX)
        });

        TimelineSnapshot {
            version: SNAPSHOT_VERSION,
            exported_at: now(),
            activities,
            paths,
            events: self.events().to_vec(),
        }
    }

    pub fn export_json(&self) -> Result<String> {
        Ok(serde_json::to_string(&self.export_snapshot())?)
    }

    /// Replace the contents with a JSON snapshot.
    ///
    /// Nothing changes if the snapshot fails to parse or validate.
    pub fn import_snapshot(&mut self, json: &str) -> Result<()> {
        let snapshot = parse_snapshot(json)?;
        let report = integrity_report(&snapshot, self.config().tracks.max_time_gap_ms);
        if !report.is_clean() {
            warn!(
                "[Export] Importing snapshot with issues: {} orphan paths, {} activities without path, {} count mismatches",
                report.orphan_paths.len(),
                report.activities_without_path.len(),
                report.count_mismatches.len()
            );
        }
        info!(
            "[Export] Imported {} activities, {} events",
            snapshot.activities.len(),
            snapshot.events.len()
        );
        self.replace_all(snapshot.activities, snapshot.paths, snapshot.events);
        Ok(())
    }
}

/// Parse and validate a snapshot.
///
/// Path columns are validated during deserialization; events must be sorted.
pub fn parse_snapshot(json: &str) -> Result<TimelineSnapshot> {
    let snapshot: TimelineSnapshot = serde_json::from_str(json)?;
    if snapshot.version > SNAPSHOT_VERSION {
        return Err(PathifyError::Serialization {
            message: format!(
                "snapshot version {} is newer than supported version {}",
                snapshot.version, SNAPSHOT_VERSION
            ),
        });
    }
    if let Some(index) = first_unsorted_index(&snapshot.events) {
        return Err(PathifyError::UnsortedEvents { index });
    }
    Ok(snapshot)
}

/// Activity whose recorded sample count disagrees with its path.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CountMismatch {
    pub activity_id: String,
    pub recorded: u32,
    pub actual: usize,
}

/// Consistency findings for a snapshot.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct IntegrityReport {
    pub events_sorted: bool,
    pub tracks: Vec<Track>,
    pub track_summary: TrackSummary,
    pub activities_without_path: Vec<String>,
    /// Paths whose id matches no activity
    pub orphan_paths: Vec<String>,
    pub count_mismatches: Vec<CountMismatch>,
}

impl IntegrityReport {
    pub fn is_clean(&self) -> bool {
        self.events_sorted
            && self.activities_without_path.is_empty()
            && self.orphan_paths.is_empty()
            && self.count_mismatches.is_empty()
    }
}

pub fn integrity_report(snapshot: &TimelineSnapshot, max_time_gap: Timepoint) -> IntegrityReport {
    let path_ids: HashSet<&str> = snapshot.paths.iter().map(Path::id).collect();
    let activity_ids: HashSet<&str> = snapshot.activities.iter().map(|a| a.id.as_str()).collect();

    let activities_without_path = snapshot
        .activities
        .iter()
        .filter(|a| !path_ids.contains(a.id.as_str()))
        .map(|a| a.id.clone())
        .collect();

    let orphan_paths = snapshot
        .paths
        .iter()
        .filter(|p| !activity_ids.contains(p.id()))
        .map(|p| p.id().to_string())
        .collect();

    let count_mismatches = snapshot
        .activities
        .iter()
        .filter_map(|a| {
            let path = snapshot.paths.iter().find(|p| p.id() == a.id)?;
            (path.len() != a.count as usize).then(|| CountMismatch {
                activity_id: a.id.clone(),
                recorded: a.count,
                actual: path.len(),
            })
        })
        .collect();

    let tracks = continuous_tracks(&snapshot.events, max_time_gap, &TimeRange::all());
    let track_summary = TrackSummary::from_tracks(&tracks);

    IntegrityReport {
        events_sorted: first_unsorted_index(&snapshot.events).is_none(),
        tracks,
        track_summary,
        activities_without_path,
        orphan_paths,
        count_mismatches,
    }
}
