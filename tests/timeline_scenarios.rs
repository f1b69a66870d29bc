//! Timeline integration tests.
//!
//! Drives the public API end to end: record events into a store, then query
//! tracks, interpolated path state, metrics and snapshots.
//!
//! Run with: `cargo test --test timeline_scenarios -- --nocapture`

use pathify_core::config::InterpolationConfig;
use pathify_core::events::{EventKind, MarkData, MarkType, ModeChangeData};
use pathify_core::metrics::meters_to_miles;
use pathify_core::{
    activity_metrics, ActivityMode, ActivityRepository, Event,
    LocationData, PathInfoSelector, PathQueryFlags, TimeRange, TimelineConfig, TimelineStore,
};

fn init() {
    let _ = env_logger::builder().is_test(true).try_init();
}

/// Store with sub-second rounding so millisecond-level queries stay distinct.
fn fine_grained_store() -> (TimelineStore, PathInfoSelector) {
    let mut config = TimelineConfig::default();
    config.interpolation.rounding_ms = 1;
    config.tracks.max_time_gap_ms = 10_000;
    let selector = PathInfoSelector::new(&config.interpolation);
    (TimelineStore::new(config), selector)
}

fn fix(t: i64, odo: f64) -> Event {
    Event::location(t, LocationData::new(37.0 + odo / 111_000.0, -122.0).with_odo(odo))
}

// ============================================================================
// Tracks
// ============================================================================

#[test]
fn test_gap_produces_two_tracks() {
    init();
    let (mut store, _) = fine_grained_store();
    for t in [0, 5000, 20000] {
        store.record_event(Event::location(t, LocationData::new(51.5, -0.12)));
    }

    let tracks = store.tracks(&TimeRange::all());
    assert_eq!(tracks.len(), 2);
    assert_eq!((tracks[0].tr.start(), tracks[0].tr.end(), tracks[0].count), (0, 5000, 2));
    assert_eq!((tracks[1].tr.start(), tracks[1].tr.end(), tracks[1].count), (20000, 20000, 1));
}

#[test]
fn test_non_location_events_do_not_bridge_gaps() {
    init();
    let (mut store, _) = fine_grained_store();
    store.record_event(Event::location(0, LocationData::new(51.5, -0.12)));
    for t in [4000, 8000, 12000, 16000] {
        store.record_event(Event::new(t, EventKind::Tick));
    }
    store.record_event(Event::location(20000, LocationData::new(51.5, -0.12)));

    assert_eq!(store.tracks(&TimeRange::all()).len(), 2);
}

// ============================================================================
// Recording and Interpolation
// ============================================================================

#[test]
fn test_midpoint_interpolation() {
    init();
    let (mut store, mut selector) = fine_grained_store();
    let id = store.start_activity(0).unwrap();
    store.record_event(fix(1000, 0.0));
    store.record_event(fix(2000, 100.0));
    store.stop_activity(3000).unwrap();

    let info = store.path_info(&mut selector, 1500, false).unwrap();
    assert_eq!(info.activity_id, id);
    assert_eq!(info.odo, 50.0);
    assert_eq!(info.t, 1500);
}

#[test]
fn test_exact_sample_times_return_sample_values() {
    init();
    let (mut store, mut selector) = fine_grained_store();
    store.start_activity(0).unwrap();
    store.record_event(fix(1000, 0.0));
    store.record_event(fix(2000, 100.0));
    store.record_event(fix(3000, 250.0));
    store.stop_activity(4000).unwrap();

    assert_eq!(store.path_info(&mut selector, 1000, false).unwrap().odo, 0.0);
    assert_eq!(store.path_info(&mut selector, 2000, false).unwrap().odo, 100.0);
    assert_eq!(store.path_info(&mut selector, 3000, false).unwrap().odo, 250.0);
}

#[test]
fn test_no_activity_means_no_path_info() {
    init();
    let (mut store, mut selector) = fine_grained_store();
    store.start_activity(1000).unwrap();
    store.record_event(fix(1500, 0.0));
    store.stop_activity(2000).unwrap();

    assert!(store.path_info(&mut selector, 500, false).is_none());
    assert!(store.path_info(&mut selector, 2500, false).is_none());
}

#[test]
fn test_live_query_returns_latest_sample() {
    init();
    let (mut store, mut selector) = fine_grained_store();
    store.start_activity(0).unwrap();
    store.record_event(fix(1000, 0.0));
    store.record_event(fix(2000, 100.0));

    // Still tracking: "now" pins to the newest fix regardless of t
    let info = store.path_info(&mut selector, 1200, true).unwrap();
    assert_eq!(info.odo, 100.0);
}

#[test]
fn test_mode_follows_mode_change_events() {
    init();
    let (mut store, mut selector) = fine_grained_store();
    store.start_activity(0).unwrap();
    store.record_event(fix(1000, 0.0));
    store.record_event(Event::new(
        1500,
        EventKind::ModeChange(ModeChangeData {
            mode: ActivityMode::Bicycle.as_number(),
            confidence: 90.0,
        }),
    ));
    store.record_event(fix(2000, 100.0));
    store.stop_activity(3000).unwrap();

    let info = store.path_info(&mut selector, 1500, false).unwrap();
    assert_eq!(info.mode, ActivityMode::Bicycle);
}

#[test]
fn test_selector_reuses_answers_until_store_changes() {
    init();
    let mut store = TimelineStore::default();
    let mut selector = PathInfoSelector::new(&InterpolationConfig::default());
    store.start_activity(0).unwrap();
    store.record_event(fix(1000, 0.0));
    store.record_event(fix(5000, 400.0));
    store.stop_activity(6000).unwrap();

    let flags = PathQueryFlags::default();
    let first = selector.select(&store, 3000, flags);
    let again = selector.select(&store, 3200, flags);
    assert_eq!(first, again);
    assert_eq!(selector.stats().hits, 1);

    store.record_event(Event::new(7000, EventKind::Tick));
    selector.select(&store, 3000, flags);
    assert_eq!(selector.stats().hits, 1);
}

// ============================================================================
// Metrics
// ============================================================================

#[test]
fn test_partial_distance_only_uses_samples_before_reference() {
    init();
    let events = vec![fix(2000, 50.0), fix(4000, 150.0)];
    let tr = TimeRange::new(1000, 5000).unwrap();
    let metrics = activity_metrics(&events, &tr, Some(3000), &Default::default());

    let partial = metrics.partial_distance.unwrap();
    let total = metrics.total_distance.unwrap();
    assert_eq!(partial.value, 0.0);
    assert!((total.value - meters_to_miles(100.0)).abs() < 1e-12);
    assert_eq!(total.display_text.as_deref(), Some("0.06"));
}

#[test]
fn test_metrics_for_recorded_activity() {
    init();
    let (mut store, _) = fine_grained_store();
    let id = store.start_activity(0).unwrap();
    store.record_event(fix(1000, 100.0));
    store.record_event(Event::new(
        1500,
        EventKind::Mark(MarkData {
            subtype: MarkType::Start,
            activity_id: None,
        }),
    ));
    store.record_event(fix(2000, 1709.344));
    store.stop_activity(60_000).unwrap();

    let metrics = store.metrics_for(&id, None).unwrap();
    assert_eq!(metrics.total_time.unwrap().display_text.as_deref(), Some("1:00"));
    assert_eq!(metrics.event_count.unwrap().value, 3.0);
    assert_eq!(metrics.total_distance.unwrap().display_text.as_deref(), Some("1.00"));
}

// ============================================================================
// Snapshots
// ============================================================================

#[test]
fn test_snapshot_round_trip_preserves_queries() {
    init();
    let (mut store, mut selector) = fine_grained_store();
    store.start_activity(0).unwrap();
    store.record_event(fix(1000, 0.0));
    store.record_event(fix(2000, 100.0));
    store.stop_activity(3000).unwrap();

    let json = store.export_json().unwrap();
    let (mut restored, mut restored_selector) = fine_grained_store();
    restored.import_snapshot(&json).unwrap();

    let before = store.path_info(&mut selector, 1500, false).unwrap();
    let after = restored.path_info(&mut restored_selector, 1500, false).unwrap();
    assert_eq!(before.activity_id, after.activity_id);
    assert!((before.odo - after.odo).abs() < 1e-9);
    assert_eq!(restored.tracks(&TimeRange::all()), store.tracks(&TimeRange::all()));
}
