//! Unified error handling for the pathify-core library.
//!
//! Only genuine failures are errors. Absence of data (no activity at a
//! timestamp, an empty path, no qualifying events) is expressed with `Option`
//! or empty collections instead.

use thiserror::Error;

use crate::time::Timepoint;

/// Unified error type for pathify-core operations.
///
/// Crosses the FFI boundary as a flat error carrying its display message.
#[derive(Error, Debug, Clone, PartialEq)]
#[cfg_attr(feature = "ffi", derive(uniffi::Error), uniffi(flat_error))]
pub enum PathifyError {
    /// A time range with `start > end` was requested
    #[error("invalid time range [{start}, {end}]: start is after end")]
    InvalidTimeRange { start: Timepoint, end: Timepoint },

    /// Path columns have differing lengths
    #[error("path '{path_id}' is misaligned: column '{column}' has {actual} entries, expected {expected}")]
    MisalignedPath {
        path_id: String,
        column: &'static str,
        expected: usize,
        actual: usize,
    },

    /// Path timestamps go backwards
    #[error("path '{path_id}' is not sorted: t[{index}] = {t} precedes the previous sample")]
    UnsortedPath {
        path_id: String,
        index: usize,
        t: Timepoint,
    },

    /// Event stream is not sorted by time
    #[error("event stream is not sorted by time (first violation at index {index})")]
    UnsortedEvents { index: usize },

    /// No activity with the given id
    #[error("unknown activity '{activity_id}'")]
    UnknownActivity { activity_id: String },

    /// An activity is already being tracked
    #[error("activity '{activity_id}' is already tracking")]
    AlreadyTracking { activity_id: String },

    /// Stop was requested without a tracking activity
    #[error("no activity is currently tracking")]
    NotTracking,

    /// JSON (de)serialization failed
    #[error("serialization error: {message}")]
    Serialization { message: String },

    /// Configuration error
    #[error("configuration error: {message}")]
    Config { message: String },

    /// Generic internal error
    #[error("internal error: {message}")]
    Internal { message: String },
}

impl From<serde_json::Error> for PathifyError {
    fn from(err: serde_json::Error) -> Self {
        PathifyError::Serialization {
            message: err.to_string(),
        }
    }
}

/// Result type alias for pathify-core operations.
pub type Result<T> = std::result::Result<T, PathifyError>;

/// Extension trait for converting Option to PathifyError.
pub trait OptionExt<T> {
    /// Convert Option to Result with an unknown activity error.
    fn ok_or_unknown_activity(self, activity_id: &str) -> Result<T>;

    /// Convert Option to Result with generic internal error.
    fn ok_or_internal(self, message: &str) -> Result<T>;
}

impl<T> OptionExt<T> for Option<T> {
    fn ok_or_unknown_activity(self, activity_id: &str) -> Result<T> {
        self.ok_or_else(|| PathifyError::UnknownActivity {
            activity_id: activity_id.to_string(),
        })
    }

    fn ok_or_internal(self, message: &str) -> Result<T> {
        self.ok_or_else(|| PathifyError::Internal {
            message: message.to_string(),
        })
    }
}
