use crate::aggregate::{Aggregation, GroupAggregateResult};
use crate::error::PivotResult;
use crate::subset::Subset;
use booking_columnar::RowMask;
use dashmap::DashMap;
use log::debug;
use serde::Serialize;
use std::fmt;
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

/// Identity of a subset as seen by the cache.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct SubsetKey {
    pub dataset: u64,
    pub rows: Arc<RowMask>,
}

/// Default identity: dataset fingerprint plus row mask, so content-equal subsets share
/// cache entries no matter how they were derived.
pub fn content_identity(subset: &Subset) -> SubsetKey {
    SubsetKey {
        dataset: subset.dataset().fingerprint(),
        rows: subset.shared_mask(),
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct AggregationKey {
    pub subset: SubsetKey,
    pub group_by: Vec<String>,
    pub aggregations: Vec<Aggregation>,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize)]
pub struct CacheStats {
    pub hits: u64,
    pub misses: u64,
    /// Aggregations actually executed, including ones that failed.
    pub computations: u64,
    pub entries: usize,
}

type IdentityFn = dyn Fn(&Subset) -> SubsetKey + Send + Sync;

/// One cache entry. Empty until the first successful computation for its key.
type Slot = Arc<Mutex<Option<Arc<GroupAggregateResult>>>>;

fn lock(slot: &Slot) -> MutexGuard<'_, Option<Arc<GroupAggregateResult>>> {
    // A panicking computation leaves the slot empty, which is a valid state.
    slot.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Memo table for group-by results.
///
/// Entries are never invalidated: datasets are immutable, so a key always maps to the same
/// result. Each key owns a slot with its own lock. The map's shard lock is held only to
/// find or create a slot, and computation runs under the slot lock alone: concurrent
/// callers asking for the same key wait for the first computation instead of repeating it,
/// while callers asking for other keys proceed. The compute closure must not call back
/// into the cache with the same key.
pub struct AggregationCache {
    entries: DashMap<AggregationKey, Slot>,
    identity: Box<IdentityFn>,
    hits: AtomicU64,
    misses: AtomicU64,
    computations: AtomicU64,
    stored: AtomicUsize,
}

impl Default for AggregationCache {
    fn default() -> Self {
        Self::with_identity(content_identity)
    }
}

impl fmt::Debug for AggregationCache {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AggregationCache")
            .field("stats", &self.stats())
            .finish_non_exhaustive()
    }
}

impl AggregationCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_identity(identity: impl Fn(&Subset) -> SubsetKey + Send + Sync + 'static) -> Self {
        Self {
            entries: DashMap::new(),
            identity: Box::new(identity),
            hits: AtomicU64::new(0),
            misses: AtomicU64::new(0),
            computations: AtomicU64::new(0),
            stored: AtomicUsize::new(0),
        }
    }

    pub fn key(
        &self,
        subset: &Subset,
        group_by: &[&str],
        aggregations: &[Aggregation],
    ) -> AggregationKey {
        AggregationKey {
            subset: (self.identity)(subset),
            group_by: group_by.iter().map(|c| (*c).to_owned()).collect(),
            aggregations: aggregations.to_vec(),
        }
    }

    /// Return the cached result for `key`, or run `compute` once and store its result.
    ///
    /// Errors are returned to the caller and not cached.
    pub fn get_or_try_compute<F>(
        &self,
        key: AggregationKey,
        compute: F,
    ) -> PivotResult<Arc<GroupAggregateResult>>
    where
        F: FnOnce() -> PivotResult<GroupAggregateResult>,
    {
        // The read guard must be gone before `entry` takes the shard's write lock.
        let existing = self.entries.get(&key).map(|slot| Arc::clone(slot.value()));
        let slot = match existing {
            Some(slot) => slot,
            None => Arc::clone(self.entries.entry(key.clone()).or_default().value()),
        };

        let mut cached = lock(&slot);
        if let Some(hit) = cached.as_ref() {
            self.hits.fetch_add(1, Ordering::Relaxed);
            debug!("aggregation cache hit: group_by={:?}", key.group_by);
            return Ok(Arc::clone(hit));
        }

        self.misses.fetch_add(1, Ordering::Relaxed);
        self.computations.fetch_add(1, Ordering::Relaxed);
        debug!("aggregation cache miss: group_by={:?}", key.group_by);
        let result = Arc::new(compute()?);
        *cached = Some(Arc::clone(&result));
        self.stored.fetch_add(1, Ordering::Relaxed);
        Ok(result)
    }

    pub fn stats(&self) -> CacheStats {
        CacheStats {
            hits: self.hits.load(Ordering::Relaxed),
            misses: self.misses.load(Ordering::Relaxed),
            computations: self.computations.load(Ordering::Relaxed),
            entries: self.len(),
        }
    }

    /// Number of keys with a stored result.
    pub fn len(&self) -> usize {
        self.stored.load(Ordering::Relaxed)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
