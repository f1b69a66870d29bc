//! Event stream utilities.
//!
//! Events are discrete occurrences on the timeline: location fixes, marks,
//! mode changes, app lifecycle changes. Streams are expected to be sorted by
//! `t` (non-decreasing) but nothing here sorts on the caller's behalf;
//! [`sorted_by_time`] exists so callers can check.
//!
//! ## Example
//! ```rust
//! use pathify_core::events::{find_events_nearest_timepoint, Event, LocationData, NearestQuery};
//!
//! let events = vec![
//!     Event::location(1000, LocationData::new(37.77, -122.41)),
//!     Event::location(3000, LocationData::new(37.78, -122.42)),
//! ];
//! let nearest = find_events_nearest_timepoint(&events, 2900, NearestQuery::any());
//! assert_eq!(nearest.len(), 1);
//! assert_eq!(nearest[0].t, 3000);
//! ```

use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::time::{self, time_in_range, TimeRange, Timepoint};

// ============================================================================
// Event Types
// ============================================================================

/// A single timestamped occurrence.
///
/// Serialized as `{"t": .., "type": "LOC", "data": {..}, "source": .., "changed": ..}`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Event {
    pub t: Timepoint,
    #[serde(flatten)]
    pub kind: EventKind,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source: Option<String>,
    /// Opaque sync cursor, see [`uniqify`].
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub changed: Option<f64>,
}

/// Event payload, discriminated by the `type` tag.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "data")]
pub enum EventKind {
    #[serde(rename = "LOC")]
    Location(LocationData),
    #[serde(rename = "MARK")]
    Mark(MarkData),
    #[serde(rename = "MODE")]
    ModeChange(ModeChangeData),
    #[serde(rename = "APP")]
    AppStateChange(AppStateData),
    #[serde(rename = "MOTION")]
    Motion(MotionData),
    #[serde(rename = "TICK")]
    Tick,
    #[serde(rename = "USER_ACTION")]
    UserAction(UserActionData),
}

/// Payload-free tag for filtering events by kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum EventType {
    Location,
    Mark,
    ModeChange,
    AppStateChange,
    Motion,
    Tick,
    UserAction,
}

/// A geolocation fix.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LocationData {
    pub lat: f64,
    pub lon: f64,
    /// Elevation in meters
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ele: Option<f64>,
    /// Speed in m/s
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub speed: Option<f64>,
    /// Odometer reading in meters
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub odo: Option<f64>,
    /// Heading in degrees
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub heading: Option<f64>,
    /// Horizontal accuracy in meters
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub accuracy: Option<f64>,
}

impl LocationData {
    pub fn new(lat: f64, lon: f64) -> Self {
        Self {
            lat,
            lon,
            ele: None,
            speed: None,
            odo: None,
            heading: None,
            accuracy: None,
        }
    }

    pub fn with_odo(mut self, odo: f64) -> Self {
        self.odo = Some(odo);
        self
    }

    pub fn with_speed(mut self, speed: f64) -> Self {
        self.speed = Some(speed);
        self
    }

    pub fn with_ele(mut self, ele: f64) -> Self {
        self.ele = Some(ele);
        self
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum MarkType {
    Start,
    End,
    Other,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MarkData {
    pub subtype: MarkType,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub activity_id: Option<String>,
}

/// Detected activity mode (see [`crate::path::ActivityMode`] for numbering).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModeChangeData {
    pub mode: u8,
    #[serde(default)]
    pub confidence: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AppState {
    Active,
    Background,
    Inactive,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AppStateData {
    pub state: AppState,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MotionData {
    pub is_moving: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UserActionData {
    pub action: String,
}

impl EventKind {
    pub fn event_type(&self) -> EventType {
        match self {
            EventKind::Location(_) => EventType::Location,
            EventKind::Mark(_) => EventType::Mark,
            EventKind::ModeChange(_) => EventType::ModeChange,
            EventKind::AppStateChange(_) => EventType::AppStateChange,
            EventKind::Motion(_) => EventType::Motion,
            EventKind::Tick => EventType::Tick,
            EventKind::UserAction(_) => EventType::UserAction,
        }
    }
}

impl Event {
    pub fn new(t: Timepoint, kind: EventKind) -> Self {
        Self {
            t,
            kind,
            source: None,
            changed: None,
        }
    }

    /// Shorthand for a location event.
    pub fn location(t: Timepoint, data: LocationData) -> Self {
        Self::new(t, EventKind::Location(data))
    }

    pub fn event_type(&self) -> EventType {
        self.kind.event_type()
    }

    pub fn is_location(&self) -> bool {
        matches!(self.kind, EventKind::Location(_))
    }

    /// Location payload, if this is a location event.
    pub fn location_data(&self) -> Option<&LocationData> {
        match &self.kind {
            EventKind::Location(data) => Some(data),
            _ => None,
        }
    }
}

// ============================================================================
// Factories
// ============================================================================

/// Create an event stamped at `t`, or at the current time when `t` is `None`.
pub fn new_event(t: Option<Timepoint>, kind: EventKind) -> Event {
    Event::new(t.unwrap_or_else(time::now), kind)
}

/// Like [`new_event`], but also assigns a `changed` sync cursor.
pub fn new_synced_event(t: Option<Timepoint>, kind: EventKind) -> Event {
    let mut event = new_event(t, kind);
    event.changed = Some(uniqify(event.t));
    event
}

/// Add a random fraction in `[0, 1)` to an integer timestamp.
///
/// Keeps sync cursors distinct for events changed within the same millisecond.
/// The result is only ever compared, never displayed.
pub fn uniqify(t: Timepoint) -> f64 {
    uniqify_with(t, &mut rand::thread_rng())
}

/// [`uniqify`] with a caller-supplied RNG.
pub fn uniqify_with<R: Rng + ?Sized>(t: Timepoint, rng: &mut R) -> f64 {
    t as f64 + rng.gen::<f64>()
}

// ============================================================================
// Stream Queries
// ============================================================================

/// True when `events` is sorted non-decreasing by `t`.
pub fn sorted_by_time(events: &[Event]) -> bool {
    first_unsorted_index(events).is_none()
}

/// Index of the first event whose `t` is below the running maximum.
pub fn first_unsorted_index(events: &[Event]) -> Option<usize> {
    let mut running_max = Timepoint::MIN;
    for (i, event) in events.iter().enumerate() {
        if event.t < running_max {
            return Some(i);
        }
        running_max = event.t;
    }
    None
}

/// Count events inside `tr` (inclusive), optionally restricted to one type.
///
/// Does not assume sorted input.
pub fn count_events(events: &[Event], tr: &TimeRange, filter: Option<EventType>) -> usize {
    events
        .iter()
        .filter(|e| matches_type(e, filter) && time_in_range(e.t, tr))
        .count()
}

/// Events inside `tr` (inclusive), optionally restricted to one type.
pub fn filter_events<'a>(
    events: &'a [Event],
    tr: &TimeRange,
    filter: Option<EventType>,
) -> Vec<&'a Event> {
    events
        .iter()
        .filter(|e| matches_type(e, filter) && time_in_range(e.t, tr))
        .collect()
}

fn matches_type(event: &Event, filter: Option<EventType>) -> bool {
    filter.map_or(true, |ty| event.event_type() == ty)
}

/// Search parameters for [`find_events_nearest_timepoint`].
#[derive(Clone, Copy)]
pub struct NearestQuery<F> {
    /// Accept events earlier than the query time
    pub before: bool,
    /// Accept events later than the query time
    pub after: bool,
    /// Largest accepted gap in ms
    pub near: Timepoint,
    pub filter: F,
}

impl NearestQuery<fn(&Event) -> bool> {
    /// Either direction, any distance, any event.
    pub fn any() -> Self {
        Self {
            before: true,
            after: true,
            near: time::TIME_INFINITY,
            filter: |_| true,
        }
    }
}

impl<F> NearestQuery<F> {
    pub fn within(self, near: Timepoint) -> Self {
        Self { near, ..self }
    }

    pub fn before_only(self) -> Self {
        Self {
            after: false,
            ..self
        }
    }

    pub fn after_only(self) -> Self {
        Self {
            before: false,
            ..self
        }
    }

    pub fn with_filter<G>(self, filter: G) -> NearestQuery<G>
    where
        G: Fn(&Event) -> bool,
    {
        NearestQuery {
            before: self.before,
            after: self.after,
            near: self.near,
            filter,
        }
    }
}

/// Find the events nearest to `t`.
///
/// - An event exactly at `t` always qualifies (gap 0).
/// - Earlier events qualify only if `query.before`, later ones only if `query.after`.
/// - A candidate must be within `query.near` ms of `t`.
/// - Ties at the minimum gap accumulate; a strictly smaller gap resets the result.
///
/// `query.filter` is applied before any gap comparison. This is a linear scan
/// and tolerates unsorted input.
pub fn find_events_nearest_timepoint<'a, F>(
    events: &'a [Event],
    t: Timepoint,
    query: NearestQuery<F>,
) -> Vec<&'a Event>
where
    F: Fn(&Event) -> bool,
{
    let NearestQuery {
        before,
        after,
        near,
        filter,
    } = query;
    let mut result: Vec<&Event> = Vec::new();
    let mut best_gap: Option<Timepoint> = None;

    for event in events {
        if !filter(event) {
            continue;
        }
        let gap = if event.t == t {
            0
        } else if event.t < t {
            if !before {
                continue;
            }
            t.saturating_sub(event.t)
        } else {
            if !after {
                continue;
            }
            event.t.saturating_sub(t)
        };
        if gap > near {
            continue;
        }
        match best_gap {
            Some(best) if gap > best => {}
            Some(best) if gap == best => result.push(event),
            _ => {
                result.clear();
                result.push(event);
                best_gap = Some(gap);
            }
        }
    }

    result
}

/// Nearest location events to `t` in either direction, within `near` ms.
pub fn find_nearest_location_events(
    events: &[Event],
    t: Timepoint,
    near: Timepoint,
) -> Vec<&Event> {
    let query = NearestQuery::any().within(near).with_filter(Event::is_location);
    find_events_nearest_timepoint(events, t, query)
}

/// Most recent location event at or before `t`.
pub fn latest_location_before(events: &[Event], t: Timepoint) -> Option<&Event> {
    events
        .iter()
        .filter(|e| e.is_location() && e.t <= t)
        .fold(None, |latest: Option<&Event>, e| match latest {
            Some(prev) if prev.t > e.t => Some(prev),
            _ => Some(e),
        })
}

/// Events whose `changed` cursor is strictly after `cursor`.
///
/// Events never synced (no `changed`) are excluded.
pub fn events_changed_since(events: &[Event], cursor: f64) -> Vec<&Event> {
    events
        .iter()
        .filter(|e| e.changed.map_or(false, |changed| changed > cursor))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::time::TIME_INFINITY;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    fn loc(t: Timepoint) -> Event {
        Event::location(t, LocationData::new(37.0, -122.0))
    }

    fn tick(t: Timepoint) -> Event {
        Event::new(t, EventKind::Tick)
    }

    #[test]
    fn test_sorted_by_time() {
        assert!(sorted_by_time(&[]));
        assert!(sorted_by_time(&[loc(5)]));
        assert!(sorted_by_time(&[loc(1), loc(1), loc(2)]));
        assert!(!sorted_by_time(&[loc(1), loc(3), loc(2)]));
        assert_eq!(first_unsorted_index(&[loc(1), loc(3), loc(2)]), Some(2));
    }

    #[test]
    fn test_count_and_filter_inclusive() {
        let events = vec![loc(100), tick(150), loc(200), loc(300)];
        let tr = TimeRange::new(100, 200).unwrap();
        assert_eq!(count_events(&events, &tr, None), 3);
        assert_eq!(count_events(&events, &tr, Some(EventType::Location)), 2);
        assert_eq!(count_events(&events, &TimeRange::all(), Some(EventType::Tick)), 1);

        let filtered = filter_events(&events, &tr, Some(EventType::Location));
        let times: Vec<Timepoint> = filtered.iter().map(|e| e.t).collect();
        assert_eq!(times, vec![100, 200]);
    }

    #[test]
    fn test_count_unsorted_input() {
        let events = vec![loc(300), loc(100), loc(200)];
        let tr = TimeRange::new(150, 400).unwrap();
        assert_eq!(count_events(&events, &tr, None), 2);
    }

    #[test]
    fn test_nearest_exact_match() {
        let events = vec![loc(900), loc(1000), loc(1100)];
        let mut exact = NearestQuery::any().within(0);
        exact.before = false;
        exact.after = false;
        let found = find_events_nearest_timepoint(&events, 1000, exact);
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].t, 1000);
    }

    #[test]
    fn test_nearest_ties_accumulate() {
        let events = vec![loc(900), loc(1100)];
        let found = find_events_nearest_timepoint(&events, 1000, NearestQuery::any());
        assert_eq!(found.len(), 2);
    }

    #[test]
    fn test_nearest_smaller_gap_resets() {
        let events = vec![loc(800), loc(1200), loc(950)];
        let found = find_events_nearest_timepoint(&events, 1000, NearestQuery::any());
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].t, 950);
    }

    #[test]
    fn test_nearest_direction_and_near_gating() {
        let events = vec![loc(900), loc(1300)];
        let after_only =
            find_events_nearest_timepoint(&events, 1000, NearestQuery::any().after_only());
        assert_eq!(after_only.len(), 1);
        assert_eq!(after_only[0].t, 1300);

        let too_far = find_events_nearest_timepoint(
            &events,
            1000,
            NearestQuery::any().after_only().within(200),
        );
        assert!(too_far.is_empty());

        let within = find_events_nearest_timepoint(
            &events,
            1000,
            NearestQuery::any().before_only().within(100),
        );
        assert_eq!(within.len(), 1);
        assert_eq!(within[0].t, 900);
    }

    #[test]
    fn test_nearest_filter_applied_first() {
        let events = vec![tick(1000), loc(1500)];
        let found = find_nearest_location_events(&events, 1000, TIME_INFINITY);
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].t, 1500);
    }

    #[test]
    fn test_latest_location_before() {
        let events = vec![loc(100), tick(250), loc(200), loc(400)];
        assert_eq!(latest_location_before(&events, 300).map(|e| e.t), Some(200));
        assert_eq!(latest_location_before(&events, 50).map(|e| e.t), None);
    }

    #[test]
    fn test_uniqify_stays_within_millisecond() {
        let mut rng = StdRng::seed_from_u64(7);
        for _ in 0..100 {
            let u = uniqify_with(5000, &mut rng);
            assert!(u >= 5000.0 && u < 5001.0);
        }
    }

    #[test]
    fn test_new_synced_event_has_cursor() {
        let event = new_synced_event(Some(1234), EventKind::Tick);
        assert_eq!(event.t, 1234);
        let changed = event.changed.unwrap();
        assert!(changed >= 1234.0 && changed < 1235.0);

        assert!(new_event(Some(1), EventKind::Tick).changed.is_none());
    }

    #[test]
    fn test_events_changed_since() {
        let mut a = tick(10);
        a.changed = Some(10.25);
        let mut b = tick(10);
        b.changed = Some(10.75);
        let c = tick(20);
        let events = vec![a, b, c];
        let changed = events_changed_since(&events, 10.5);
        assert_eq!(changed.len(), 1);
        assert_eq!(changed[0].changed, Some(10.75));
    }

    #[test]
    fn test_event_json_shape() {
        let json = r#"{"t":1000,"type":"LOC","data":{"lat":1.5,"lon":2.5,"odo":12.0}}"#;
        let event: Event = serde_json::from_str(json).unwrap();
        assert!(event.is_location());
        assert_eq!(event.location_data().unwrap().odo, Some(12.0));

        let tick: Event = serde_json::from_str(r#"{"t":5,"type":"TICK"}"#).unwrap();
        assert_eq!(tick.event_type(), EventType::Tick);

        let out = serde_json::to_value(&event).unwrap();
        assert_eq!(out["type"], "LOC");
        assert_eq!(out["data"]["lat"], 1.5);
    }
}
