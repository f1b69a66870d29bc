//! Memoized path-info lookups.
//!
//! Scrubbing the timeline issues many queries that round to the same second.
//! Results are cached per rounded time and query flags; any mutation of the
//! repository (observed through its generation counter) invalidates the cache.

use log::debug;

use crate::config::InterpolationConfig;
use crate::interpolate::{path_info_at, PathInfo, PathQueryFlags};
use crate::lru_cache::{CacheStats, LruCache};
use crate::store::ActivityRepository;
use crate::time::{round_time, Timepoint};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
struct PathInfoKey {
    rounded_t: Timepoint,
    flags: PathQueryFlags,
}

/// Cached front end to [`path_info_at`].
#[derive(Debug)]
pub struct PathInfoSelector {
    rounding_ms: i64,
    cache: LruCache<PathInfoKey, Option<PathInfo>>,
    generation: Option<u64>,
}

impl Default for PathInfoSelector {
    fn default() -> Self {
        Self::new(&InterpolationConfig::default())
    }
}

impl PathInfoSelector {
    pub fn new(config: &InterpolationConfig) -> Self {
        Self {
            rounding_ms: config.rounding_ms,
            cache: LruCache::new(config.cache_capacity),
            generation: None,
        }
    }

    pub fn rounding_ms(&self) -> i64 {
        self.rounding_ms
    }

    /// Interpolated state at `t`, reusing a cached answer when neither the
    /// rounded time, the flags, nor the repository have changed.
    pub fn select<R>(&mut self, repo: &R, t: Timepoint, flags: PathQueryFlags) -> Option<PathInfo>
    where
        R: ActivityRepository + ?Sized,
    {
        let generation = repo.generation();
        if self.generation != Some(generation) {
            if !self.cache.is_empty() {
                debug!(
                    "[PathInfoSelector] Repository changed (generation {}), dropping {} entries",
                    generation,
                    self.cache.len()
                );
            }
            self.cache.clear();
            self.generation = Some(generation);
        }

        let rounding_ms = self.rounding_ms;
        let key = PathInfoKey {
            rounded_t: round_time(t, rounding_ms),
            flags,
        };
        self.cache.get_or_insert_with(key, || {
            path_info_at(repo.activities(), |id| repo.path(id), t, flags, rounding_ms)
        })
    }

    pub fn clear(&mut self) {
        self.cache.clear();
        self.generation = None;
    }

    pub fn stats(&self) -> CacheStats {
        self.cache.stats()
    }
}
