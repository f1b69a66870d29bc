//! Columnar path store.
//!
//! A [`Path`] holds one activity's location samples as parallel arrays,
//! aligned by index and non-decreasing in `t`. The read side is public;
//! appending is crate-internal and only reachable through the repository.

use geo::{BoundingRect, Coord, LineString};
use serde::{Deserialize, Serialize};

use crate::error::{PathifyError, Result};
use crate::time::{TimeRange, Timepoint};

// ============================================================================
// Activity Mode
// ============================================================================

/// Motion mode recorded with each sample (stored as its number).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[cfg_attr(feature = "ffi", derive(uniffi::Enum))]
pub enum ActivityMode {
    Unknown,
    Stationary,
    Walking,
    OnFoot,
    Running,
    Bicycle,
    Vehicle,
}

impl ActivityMode {
    /// Decode a stored mode number; unrecognized numbers are `Unknown`.
    pub fn from_number(n: u8) -> Self {
        match n {
            1 => ActivityMode::Stationary,
            2 => ActivityMode::Walking,
            3 => ActivityMode::OnFoot,
            4 => ActivityMode::Running,
            5 => ActivityMode::Bicycle,
            6 => ActivityMode::Vehicle,
            _ => ActivityMode::Unknown,
        }
    }

    pub fn as_number(self) -> u8 {
        match self {
            ActivityMode::Unknown => 0,
            ActivityMode::Stationary => 1,
            ActivityMode::Walking => 2,
            ActivityMode::OnFoot => 3,
            ActivityMode::Running => 4,
            ActivityMode::Bicycle => 5,
            ActivityMode::Vehicle => 6,
        }
    }

    pub fn is_moving(self) -> bool {
        !matches!(self, ActivityMode::Unknown | ActivityMode::Stationary)
    }
}

/// Moving/stationary classification of a stored mode number.
pub fn mode_is_moving(n: u8) -> bool {
    ActivityMode::from_number(n).is_moving()
}

// ============================================================================
// Path
// ============================================================================

/// One row of a path.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PathSample {
    pub t: Timepoint,
    pub lat: f64,
    pub lon: f64,
    pub ele: f64,
    pub odo: f64,
    pub speed: f64,
    pub mode: u8,
}

/// Unvalidated column set, the serialized form of a [`Path`].
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PathColumns {
    pub id: String,
    pub t: Vec<Timepoint>,
    pub lats: Vec<f64>,
    pub lons: Vec<f64>,
    pub ele: Vec<f64>,
    pub odo: Vec<f64>,
    pub speed: Vec<f64>,
    pub mode: Vec<u8>,
}

/// Per-activity location time series.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "PathColumns", into = "PathColumns")]
pub struct Path {
    id: String,
    t: Vec<Timepoint>,
    lats: Vec<f64>,
    lons: Vec<f64>,
    ele: Vec<f64>,
    odo: Vec<f64>,
    speed: Vec<f64>,
    mode: Vec<u8>,
}

/// Lat/lon bounding box of a path.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PathBounds {
    pub min_lat: f64,
    pub max_lat: f64,
    pub min_lon: f64,
    pub max_lon: f64,
}

impl TryFrom<PathColumns> for Path {
    type Error = PathifyError;

    fn try_from(columns: PathColumns) -> Result<Self> {
        Path::from_columns(columns)
    }
}

impl From<Path> for PathColumns {
    fn from(path: Path) -> Self {
        PathColumns {
            id: path.id,
            t: path.t,
            lats: path.lats,
            lons: path.lons,
            ele: path.ele,
            odo: path.odo,
            speed: path.speed,
            mode: path.mode,
        }
    }
}

impl Path {
    /// Empty path for a new activity.
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            t: Vec::new(),
            lats: Vec::new(),
            lons: Vec::new(),
            ele: Vec::new(),
            odo: Vec::new(),
            speed: Vec::new(),
            mode: Vec::new(),
        }
    }

    /// Build a path from raw columns, checking alignment and ordering.
    pub fn from_columns(columns: PathColumns) -> Result<Self> {
        let expected = columns.t.len();
        let lengths = [
            ("lats", columns.lats.len()),
            ("lons", columns.lons.len()),
            ("ele", columns.ele.len()),
            ("odo", columns.odo.len()),
            ("speed", columns.speed.len()),
            ("mode", columns.mode.len()),
        ];
        for (column, actual) in lengths {
            if actual != expected {
                return Err(PathifyError::MisalignedPath {
                    path_id: columns.id,
                    column,
                    expected,
                    actual,
                });
            }
        }

        if let Some(index) = (1..expected).find(|&i| columns.t[i] < columns.t[i - 1]) {
            return Err(PathifyError::UnsortedPath {
                path_id: columns.id,
                index,
                t: columns.t[index],
            });
        }

        Ok(Self {
            id: columns.id,
            t: columns.t,
            lats: columns.lats,
            lons: columns.lons,
            ele: columns.ele,
            odo: columns.odo,
            speed: columns.speed,
            mode: columns.mode,
        })
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn len(&self) -> usize {
        self.t.len()
    }

    pub fn is_empty(&self) -> bool {
        self.t.is_empty()
    }

    /// Index of the final sample, `None` when empty.
    pub fn last_index(&self) -> Option<usize> {
        self.t.len().checked_sub(1)
    }

    pub fn t(&self) -> &[Timepoint] {
        &self.t
    }

    pub fn lats(&self) -> &[f64] {
        &self.lats
    }

    pub fn lons(&self) -> &[f64] {
        &self.lons
    }

    pub fn ele(&self) -> &[f64] {
        &self.ele
    }

    pub fn odo(&self) -> &[f64] {
        &self.odo
    }

    pub fn speed(&self) -> &[f64] {
        &self.speed
    }

    pub fn mode(&self) -> &[u8] {
        &self.mode
    }

    pub fn sample(&self, i: usize) -> Option<PathSample> {
        if i >= self.t.len() {
            return None;
        }
        Some(PathSample {
            t: self.t[i],
            lat: self.lats[i],
            lon: self.lons[i],
            ele: self.ele[i],
            odo: self.odo[i],
            speed: self.speed[i],
            mode: self.mode[i],
        })
    }

    pub fn last_sample(&self) -> Option<PathSample> {
        self.last_index().and_then(|i| self.sample(i))
    }

    pub fn samples(&self) -> impl Iterator<Item = PathSample> + '_ {
        (0..self.t.len()).filter_map(move |i| self.sample(i))
    }

    /// Span from the first to the last sample.
    pub fn time_range(&self) -> Option<TimeRange> {
        match (self.t.first(), self.t.last()) {
            (Some(&first), Some(&last)) => Some(TimeRange::spanning(first, last)),
            _ => None,
        }
    }

    /// Lat/lon bounding box, `None` for an empty path.
    pub fn bounds(&self) -> Option<PathBounds> {
        let line: LineString<f64> = self
            .lats
            .iter()
            .zip(&self.lons)
            .map(|(&lat, &lon)| Coord { x: lon, y: lat })
            .collect();
        line.bounding_rect().map(|rect| PathBounds {
            min_lat: rect.min().y,
            max_lat: rect.max().y,
            min_lon: rect.min().x,
            max_lon: rect.max().x,
        })
    }

    /// Append a sample. Callers guarantee `sample.t >= last t`.
    pub(crate) fn push(&mut self, sample: PathSample) {
        self.t.push(sample.t);
        self.lats.push(sample.lat);
        self.lons.push(sample.lon);
        self.ele.push(sample.ele);
        self.odo.push(sample.odo);
        self.speed.push(sample.speed);
        self.mode.push(sample.mode);
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;

    /// Columns with evenly spaced samples, used across the crate's tests.
    pub(crate) fn sample_columns(id: &str, times: &[Timepoint]) -> PathColumns {
        let n = times.len();
        PathColumns {
            id: id.to_string(),
            t: times.to_vec(),
            lats: (0..n).map(|i| 37.0 + i as f64 * 0.001).collect(),
            lons: (0..n).map(|i| -122.0 - i as f64 * 0.001).collect(),
            ele: (0..n).map(|i| 10.0 + i as f64).collect(),
            odo: (0..n).map(|i| i as f64 * 100.0).collect(),
            speed: (0..n).map(|i| 1.0 + i as f64).collect(),
            mode: vec![ActivityMode::Walking.as_number(); n],
        }
    }

    #[test]
    fn test_from_columns_valid() {
        let path = Path::from_columns(sample_columns("p", &[1000, 2000, 3000])).unwrap();
        assert_eq!(path.len(), 3);
        assert_eq!(path.last_index(), Some(2));
        let s = path.sample(1).unwrap();
        assert_eq!(s.t, 2000);
        assert_eq!(s.odo, 100.0);
        assert!(path.sample(3).is_none());
        assert_eq!(path.samples().count(), 3);
    }

    #[test]
    fn test_from_columns_misaligned() {
        let mut columns = sample_columns("p", &[1000, 2000]);
        columns.speed.pop();
        let err = Path::from_columns(columns).unwrap_err();
        assert!(matches!(
            err,
            PathifyError::MisalignedPath {
                column: "speed",
                expected: 2,
                actual: 1,
                ..
            }
        ));
    }

    #[test]
    fn test_from_columns_unsorted() {
        let columns = sample_columns("p", &[1000, 3000, 2000]);
        let err = Path::from_columns(columns).unwrap_err();
        assert!(matches!(err, PathifyError::UnsortedPath { index: 2, t: 2000, .. }));
    }

    #[test]
    fn test_empty_path() {
        let path = Path::new("empty");
        assert!(path.is_empty());
        assert_eq!(path.last_index(), None);
        assert!(path.last_sample().is_none());
        assert!(path.time_range().is_none());
        assert!(path.bounds().is_none());
    }

    #[test]
    fn test_bounds_and_time_range() {
        let path = Path::from_columns(sample_columns("p", &[0, 10, 20])).unwrap();
        let bounds = path.bounds().unwrap();
        assert!((bounds.min_lat - 37.0).abs() < 1e-9);
        assert!((bounds.max_lat - 37.002).abs() < 1e-9);
        assert!((bounds.min_lon - -122.002).abs() < 1e-9);
        assert!((bounds.max_lon - -122.0).abs() < 1e-9);
        assert_eq!(path.time_range(), Some(TimeRange::new(0, 20).unwrap()));
    }

    #[test]
    fn test_push_keeps_columns_aligned() {
        let mut path = Path::new("p");
        path.push(PathSample {
            t: 5,
            lat: 1.0,
            lon: 2.0,
            ele: 3.0,
            odo: 4.0,
            speed: 5.0,
            mode: 2,
        });
        assert_eq!(path.len(), 1);
        assert_eq!(path.lats(), &[1.0]);
        assert_eq!(path.mode(), &[2]);
    }

    #[test]
    fn test_mode_classification() {
        assert!(!mode_is_moving(0));
        assert!(!mode_is_moving(1));
        assert!(mode_is_moving(4));
        assert_eq!(ActivityMode::from_number(200), ActivityMode::Unknown);
        for n in 0..=6 {
            assert_eq!(ActivityMode::from_number(n).as_number(), n);
        }
    }

    #[test]
    fn test_serde_validates() {
        let json = serde_json::to_string(&sample_columns("p", &[1, 2])).unwrap();
        let path: Path = serde_json::from_str(&json).unwrap();
        assert_eq!(path.len(), 2);

        let mut bad = sample_columns("p", &[1, 2]);
        bad.lats.push(0.0);
        let json = serde_json::to_string(&bad).unwrap();
        assert!(serde_json::from_str::<Path>(&json).is_err());
    }
}
