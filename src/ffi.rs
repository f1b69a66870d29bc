//! FFI bindings for mobile platforms (iOS/Android).
//!
//! The app owns a [`TimelineHandle`] object instead of talking to a global
//! engine. Events and configuration cross the boundary as JSON so the
//! tagged event union does not need a mirrored FFI type.

use std::sync::{Arc, Mutex, MutexGuard};

use log::{debug, info, warn};

use crate::config::TimelineConfig;
use crate::error::Result;
use crate::events::Event;
use crate::init_logging;
use crate::interpolate::PathInfo;
use crate::selector::PathInfoSelector;
use crate::store::{ActivityRepository, TimelineStore};
use crate::time::{TimeRange, Timepoint};

/// A track as seen by the app.
#[derive(Debug, Clone, uniffi::Record)]
pub struct FfiTrack {
    pub start: i64,
    pub end: i64,
    pub count: u32,
}

/// Activity summary as seen by the app.
#[derive(Debug, Clone, uniffi::Record)]
pub struct FfiActivity {
    pub id: String,
    pub t_start: i64,
    /// `None` while tracking
    pub t_end: Option<i64>,
    pub distance: f64,
    pub count: u32,
}

/// Owned timeline state handed to the app.
#[derive(uniffi::Object)]
pub struct TimelineHandle {
    store: Mutex<TimelineStore>,
    selector: Mutex<PathInfoSelector>,
}

impl TimelineHandle {
    fn with_config(config: TimelineConfig) -> Self {
        let selector = PathInfoSelector::new(&config.interpolation);
        Self {
            store: Mutex::new(TimelineStore::new(config)),
            selector: Mutex::new(selector),
        }
    }

    // A panic while holding the lock leaves the store usable.
    fn store(&self) -> MutexGuard<'_, TimelineStore> {
        self.store.lock().unwrap_or_else(|poisoned| {
            warn!("[TimelineFFI] Store lock was poisoned, recovering");
            poisoned.into_inner()
        })
    }

    fn selector(&self) -> MutexGuard<'_, PathInfoSelector> {
        self.selector
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

#[uniffi::export]
impl TimelineHandle {
    #[uniffi::constructor]
    pub fn new() -> Arc<Self> {
        init_logging();
        info!("[TimelineFFI] Created timeline with default config");
        Arc::new(Self::with_config(TimelineConfig::default()))
    }

    /// Create a timeline from a JSON config; missing fields take defaults.
    #[uniffi::constructor]
    pub fn with_config_json(config_json: String) -> Result<Arc<Self>> {
        init_logging();
        let config = TimelineConfig::from_json(&config_json)?;
        info!("[TimelineFFI] Created timeline with {:?}", config);
        Ok(Arc::new(Self::with_config(config)))
    }

    /// Record one event given as JSON. Returns true if a path sample was added.
    pub fn record_event_json(&self, event_json: String) -> Result<bool> {
        let event: Event = serde_json::from_str(&event_json)?;
        debug!("[TimelineFFI] Recording {:?} at {}", event.event_type(), event.t);
        Ok(self.store().record_event(event))
    }

    pub fn start_activity(&self, t: i64) -> Result<String> {
        self.store().start_activity(t)
    }

    pub fn stop_activity(&self, t: i64) -> Result<FfiActivity> {
        let activity = self.store().stop_activity(t)?;
        Ok(FfiActivity {
            distance: activity.distance(),
            id: activity.id,
            t_start: activity.t_start,
            t_end: activity.t_end,
            count: activity.count,
        })
    }

    pub fn delete_activity(&self, activity_id: String, delete_events: bool) -> Result<()> {
        self.store().delete_activity(&activity_id, delete_events)
    }

    pub fn activities(&self) -> Vec<FfiActivity> {
        self.store()
            .activities()
            .iter()
            .map(|a| FfiActivity {
                id: a.id.clone(),
                t_start: a.t_start,
                t_end: a.t_end,
                distance: a.distance(),
                count: a.count,
            })
            .collect()
    }

    /// Interpolated state at `t`; `now` pins the query to the live clock.
    pub fn path_info(&self, t: i64, now: bool) -> Option<PathInfo> {
        let store = self.store();
        let mut selector = self.selector();
        store.path_info(&mut selector, t, now)
    }

    /// Metrics for an activity as JSON, evaluated at `t` (or the activity end).
    pub fn metrics_json(&self, activity_id: String, t: Option<i64>) -> Result<String> {
        self.store().metrics_for(&activity_id, t)?.to_json()
    }

    /// Tracks between `start` and `end` (exclusive); `end = None` is open-ended.
    pub fn tracks(&self, start: i64, end: Option<Timepoint>) -> Result<Vec<FfiTrack>> {
        let tr = match end {
            Some(end) => TimeRange::new(start, end)?,
            None => TimeRange::open(start),
        };
        Ok(self
            .store()
            .tracks(&tr)
            .into_iter()
            .map(|track| FfiTrack {
                start: track.tr.start(),
                end: track.tr.end(),
                count: track.count,
            })
            .collect())
    }

    /// Drop events older than the configured retention window.
    pub fn prune_events(&self, now: i64) -> u64 {
        let mut store = self.store();
        let retention_ms = store.config().event_retention_ms;
        store.prune_events(retention_ms, now) as u64
    }

    pub fn export_json(&self) -> Result<String> {
        self.store().export_json()
    }

    pub fn import_json(&self, json: String) -> Result<()> {
        self.store().import_snapshot(&json)
    }

    pub fn clear(&self) {
        self.store().clear();
        self.selector().clear();
        info!("[TimelineFFI] Cleared");
    }
}
