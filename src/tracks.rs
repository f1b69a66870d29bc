//! Track segmentation.
//!
//! A track is a maximal run of location events in which consecutive fixes are
//! never more than `max_time_gap` ms apart. Tracks are derived on demand from
//! the event log and never stored.
//!
//! ## Range boundary
//!
//! The end of the query range is exclusive: consumption stops at the first
//! event with `t >= tr.end()`, and any open track is closed at the last
//! location event before it. An open-ended range (`TIME_INFINITY`) excludes
//! nothing.
//!
//! ## Example
//! ```rust
//! use pathify_core::events::{Event, LocationData};
//! use pathify_core::time::TimeRange;
//! use pathify_core::tracks::continuous_tracks;
//!
//! let fix = |t| Event::location(t, LocationData::new(51.5, -0.12));
//! let events = vec![fix(0), fix(5_000), fix(20_000)];
//! let tracks = continuous_tracks(&events, 10_000, &TimeRange::all());
//! assert_eq!(tracks.len(), 2);
//! assert_eq!(tracks[0].count, 2);
//! ```

use serde::{Deserialize, Serialize};

use crate::activity::Activity;
use crate::events::Event;
use crate::time::{TimeRange, Timepoint};

/// A contiguous run of location events.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Track {
    /// First and last location event times (inclusive)
    pub tr: TimeRange,
    /// Number of location events in the run (always >= 1)
    pub count: u32,
}

/// Accumulator for the track currently being built.
struct OpenTrack {
    first: Timepoint,
    last: Timepoint,
    count: u32,
}

impl OpenTrack {
    fn begin(t: Timepoint) -> Self {
        Self {
            first: t,
            last: t,
            count: 1,
        }
    }

    fn extend(&mut self, t: Timepoint) {
        self.last = t;
        self.count += 1;
    }

    fn close(self) -> Track {
        Track {
            tr: TimeRange::spanning(self.first, self.last),
            count: self.count,
        }
    }
}

/// Partition `events` into maximal tracks within `tr`.
///
/// Only location events count toward a track or affect continuity; other
/// event types inside a gap neither extend nor close a track. A gap strictly
/// greater than `max_time_gap` between consecutive location events starts a
/// new track. Expects `events` sorted by time.
pub fn continuous_tracks(events: &[Event], max_time_gap: Timepoint, tr: &TimeRange) -> Vec<Track> {
    let mut tracks = Vec::new();
    let mut current: Option<OpenTrack> = None;

    for event in events {
        if event.t < tr.start() {
            continue;
        }
        if !tr.is_open() && event.t >= tr.end() {
            break;
        }
        if !event.is_location() {
            continue;
        }

        let gap_exceeded = current
            .as_ref()
            .map_or(false, |open| event.t.saturating_sub(open.last) > max_time_gap);
        if gap_exceeded {
            if let Some(open) = current.take() {
                tracks.push(open.close());
            }
        }

        match current.as_mut() {
            Some(open) => open.extend(event.t),
            None => current = Some(OpenTrack::begin(event.t)),
        }
    }

    if let Some(open) = current {
        tracks.push(open.close());
    }

    tracks
}

/// Tracks within a single activity's time span.
///
/// Activity end times are inclusive, so a closed activity is queried with an
/// exclusive bound one millisecond past `t_end`.
pub fn tracks_for_activity(
    events: &[Event],
    activity: &Activity,
    max_time_gap: Timepoint,
) -> Vec<Track> {
    let span = activity.time_range();
    let tr = if span.is_open() {
        span
    } else {
        TimeRange::spanning(span.start(), span.end().saturating_add(1))
    };
    continuous_tracks(events, max_time_gap, &tr)
}

/// Aggregate view of a track list.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TrackSummary {
    pub track_count: usize,
    /// Total location events across all tracks
    pub location_count: u64,
    /// Sum of track durations in ms
    pub covered_ms: Timepoint,
    /// Longest gap between the end of one track and the start of the next
    pub largest_gap_ms: Timepoint,
    /// Span from the first track start to the last track end
    pub span: Option<TimeRange>,
}

impl TrackSummary {
    pub fn from_tracks(tracks: &[Track]) -> Self {
        let mut summary = TrackSummary {
            track_count: tracks.len(),
            ..Default::default()
        };

        for (i, track) in tracks.iter().enumerate() {
            summary.location_count += track.count as u64;
            summary.covered_ms = summary.covered_ms.saturating_add(track.tr.duration());
            if i > 0 {
                let gap = track.tr.start().saturating_sub(tracks[i - 1].tr.end());
                summary.largest_gap_ms = summary.largest_gap_ms.max(gap);
            }
        }

        if let (Some(first), Some(last)) = (tracks.first(), tracks.last()) {
            summary.span = Some(TimeRange::spanning(first.tr.start(), last.tr.end()));
        }

        summary
    }
}
