//! # Pathify Core
//!
//! Timeseries engine behind the Pathify tracking app.
//!
//! This library provides:
//! - A typed event log (locations, marks, mode changes, app state)
//! - Track segmentation of location events by time gap
//! - Per-activity columnar paths with time-based interpolation
//! - Activity metrics (time, distance, speed) with display text
//!
//! ## Features
//!
//! - **`ffi`** - Enable FFI bindings for mobile platforms (iOS/Android)
//!
//! ## Quick Start
//!
//! ```rust
//! use pathify_core::{ActivityRepository, Event, LocationData, PathInfoSelector, TimelineStore};
//!
//! let mut store = TimelineStore::default();
//! let mut selector = PathInfoSelector::default();
//!
//! store.start_activity(0).unwrap();
//! store.record_event(Event::location(1_000, LocationData::new(51.5074, -0.1278).with_odo(0.0)));
//! store.record_event(Event::location(3_000, LocationData::new(51.5092, -0.1278).with_odo(200.0)));
//! store.stop_activity(4_000).unwrap();
//!
//! let info = store.path_info(&mut selector, 2_000, false).unwrap();
//! assert_eq!(info.odo, 100.0);
//! ```

// Unified error handling
pub mod error;
pub use error::{OptionExt, PathifyError, Result};

// Timepoints and ranges
pub mod time;
pub use time::{TimeRange, Timepoint, TIME_INFINITY};

// Event log
pub mod events;
pub use events::{Event, EventKind, EventType, LocationData, NearestQuery};

// Track segmentation
pub mod tracks;
pub use tracks::{continuous_tracks, tracks_for_activity, Track, TrackSummary};

// Activities and their paths
pub mod activity;
pub use activity::{activity_for_timepoint, Activity};
pub mod path;
pub use path::{ActivityMode, Path, PathSample};

// Configuration
pub mod config;
pub use config::TimelineConfig;

// Geographic utilities
pub mod geo_utils;

// Path interpolation
pub mod interpolate;
pub use interpolate::{interpolate_path, path_info_at, PathInfo, PathQueryFlags};

// LRU cache backing the selectors
pub mod lru_cache;

// Memoized path-info lookups
pub mod selector;
pub use selector::PathInfoSelector;

// Activity metrics
pub mod metrics;
pub use metrics::{activity_metrics, ActivityMetric, ActivityMetrics};

// In-memory repository
pub mod store;
pub use store::{ActivityRepository, StoreStats, TimelineStore};

// JSON snapshots
pub mod export;
pub use export::{integrity_report, parse_snapshot, IntegrityReport, TimelineSnapshot};

// FFI bindings for mobile platforms (iOS/Android)
#[cfg(feature = "ffi")]
pub mod ffi;

#[cfg(feature = "ffi")]
uniffi::setup_scaffolding!();

/// Initialize logging for Android (only used in FFI)
#[cfg(all(feature = "ffi", target_os = "android"))]
pub(crate) fn init_logging() {
    use android_logger::Config;
    use log::LevelFilter;

    android_logger::init_once(
        Config::default()
            .with_max_level(LevelFilter::Debug)
            .with_tag("PathifyRust"),
    );
}

#[cfg(all(feature = "ffi", not(target_os = "android")))]
pub(crate) fn init_logging() {
    // No-op on non-Android platforms
}
