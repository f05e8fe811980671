use std::collections::HashMap;
use std::sync::Arc;

use super::model::{DatasetId, Histogram1D, Histogram2DStack, HistogramSpec, Transform};

// ---------------------------------------------------------------------------
// Cache key
// ---------------------------------------------------------------------------

/// One unit of histogram work: which data, which representation, which bins.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct CacheKey {
    pub dataset: DatasetId,
    pub transform: Transform,
    pub spec: HistogramSpec,
}

impl CacheKey {
    pub fn new(dataset: DatasetId, transform: Transform, spec: HistogramSpec) -> Self {
        CacheKey {
            dataset,
            transform,
            spec,
        }
    }
}

// ---------------------------------------------------------------------------
// MemoCache – write-once memo table
// ---------------------------------------------------------------------------

struct Entry<V> {
    value: Arc<V>,
    last_used: u64,
}

/// Memoized results keyed by [`CacheKey`].
///
/// Entries are immutable once written.  Without a capacity limit the table
/// grows for the whole session; with one, the least recently used entry is
/// evicted to make room.
pub struct MemoCache<V> {
    entries: HashMap<CacheKey, Entry<V>>,
    capacity: Option<usize>,
    tick: u64,
    computations: usize,
}

impl<V> Default for MemoCache<V> {
    fn default() -> Self {
        Self {
            entries: HashMap::new(),
            capacity: None,
            tick: 0,
            computations: 0,
        }
    }
}

impl<V> MemoCache<V> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Bound the table to `capacity` entries (at least one).
    pub fn with_capacity_limit(capacity: usize) -> Self {
        Self {
            capacity: Some(capacity.max(1)),
            ..Self::default()
        }
    }

    /// Return the cached value for `key`, computing and storing it on a miss.
    pub fn get_or_compute<F>(&mut self, key: CacheKey, compute: F) -> Arc<V>
    where
        F: FnOnce() -> V,
    {
        self.tick += 1;
        if let Some(entry) = self.entries.get_mut(&key) {
            entry.last_used = self.tick;
            log::debug!("cache hit: {} {:?} {}", key.dataset, key.transform, key.spec);
            return Arc::clone(&entry.value);
        }

        log::debug!("cache miss: {} {:?} {}", key.dataset, key.transform, key.spec);
        let value = Arc::new(compute());
        self.computations += 1;
        self.make_room();
        self.entries.insert(
            key,
            Entry {
                value: Arc::clone(&value),
                last_used: self.tick,
            },
        );
        value
    }

    /// Cached value without computing; refreshes recency.
    #[cfg(test)]
    pub fn get(&mut self, key: &CacheKey) -> Option<Arc<V>> {
        self.tick += 1;
        let tick = self.tick;
        self.entries.get_mut(key).map(|entry| {
            entry.last_used = tick;
            Arc::clone(&entry.value)
        })
    }

    /// Drop every entry computed from `dataset`.  Returns how many were removed.
    pub fn invalidate_dataset(&mut self, dataset: DatasetId) -> usize {
        let before = self.entries.len();
        self.entries.retain(|key, _| key.dataset != dataset);
        before - self.entries.len()
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Number of times a compute closure has run.
    pub fn computations(&self) -> usize {
        self.computations
    }

    fn make_room(&mut self) {
        let Some(capacity) = self.capacity else {
            return;
        };
        while self.entries.len() >= capacity {
            let Some(oldest) = self
                .entries
                .iter()
                .min_by_key(|(_, entry)| entry.last_used)
                .map(|(key, _)| *key)
            else {
                break;
            };
            log::debug!("cache evict: {} {}", oldest.dataset, oldest.spec);
            self.entries.remove(&oldest);
        }
    }
}

// ---------------------------------------------------------------------------
// HistogramCache – 1D and 2D tables side by side
// ---------------------------------------------------------------------------

/// Session cache of histogram results.
#[derive(Default)]
pub struct HistogramCache {
    pub one_d: MemoCache<Histogram1D>,
    pub two_d: MemoCache<Histogram2DStack>,
}

impl HistogramCache {
    pub fn new() -> Self {
        HistogramCache {
            one_d: MemoCache::new(),
            two_d: MemoCache::new(),
        }
    }

    pub fn with_capacity_limit(capacity: usize) -> Self {
        HistogramCache {
            one_d: MemoCache::with_capacity_limit(capacity),
            two_d: MemoCache::with_capacity_limit(capacity),
        }
    }

    /// Forget everything derived from a superseded or removed dataset.
    pub fn invalidate_dataset(&mut self, dataset: DatasetId) {
        let removed = self.one_d.invalidate_dataset(dataset) + self.two_d.invalidate_dataset(dataset);
        if removed > 0 {
            log::debug!("cache invalidated {removed} entries for dataset {dataset}");
        }
    }

    pub fn clear(&mut self) {
        self.one_d.clear();
        self.two_d.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::histogram::histogram_1d;

    fn key(name: &str, bins: usize) -> CacheKey {
        CacheKey::new(
            DatasetId::from_content(name, name.as_bytes()),
            Transform::Log10,
            HistogramSpec::new(-10.0, 0.0, bins).unwrap(),
        )
    }

    #[test]
    fn second_call_is_a_hit() {
        let mut cache: MemoCache<Histogram1D> = MemoCache::new();
        let k = key("a.csv", 8);
        let values = vec![-1.0, -2.5, -7.25];

        let first = cache.get_or_compute(k, || histogram_1d(values.iter().copied(), &k.spec));
        let second = cache.get_or_compute(k, || panic!("recomputed a cached histogram"));

        assert_eq!(cache.computations(), 1);
        assert!(Arc::ptr_eq(&first, &second));
        assert_eq!(*first, *second);
    }

    #[test]
    fn different_specs_are_different_entries() {
        let mut cache: MemoCache<usize> = MemoCache::new();
        cache.get_or_compute(key("a.csv", 8), || 8);
        cache.get_or_compute(key("a.csv", 16), || 16);
        assert_eq!(cache.len(), 2);
        assert_eq!(cache.computations(), 2);
        assert_eq!(*cache.get_or_compute(key("a.csv", 16), || 0), 16);
    }

    #[test]
    fn transform_is_part_of_the_key() {
        let mut cache: MemoCache<&str> = MemoCache::new();
        let log = key("a.csv", 8);
        let linear = CacheKey {
            transform: Transform::Identity,
            ..log
        };
        cache.get_or_compute(log, || "log");
        assert_eq!(*cache.get_or_compute(linear, || "linear"), "linear");
        assert_eq!(cache.computations(), 2);
    }

    #[test]
    fn invalidation_drops_only_that_dataset() {
        let mut cache: MemoCache<u32> = MemoCache::new();
        let a = key("a.csv", 8);
        let b = key("b.csv", 8);
        cache.get_or_compute(a, || 1);
        cache.get_or_compute(key("a.csv", 4), || 2);
        cache.get_or_compute(b, || 3);

        assert_eq!(cache.invalidate_dataset(a.dataset), 2);
        assert!(cache.get(&a).is_none());
        assert_eq!(cache.get(&b).as_deref(), Some(&3));

        // Recomputed after invalidation
        assert_eq!(*cache.get_or_compute(a, || 10), 10);
        assert_eq!(cache.computations(), 4);
    }

    #[test]
    fn capacity_limit_evicts_least_recently_used() {
        let mut cache: MemoCache<u32> = MemoCache::with_capacity_limit(2);
        let (k1, k2, k3) = (key("1", 4), key("2", 4), key("3", 4));
        cache.get_or_compute(k1, || 1);
        cache.get_or_compute(k2, || 2);
        // Touch k1 so k2 becomes the oldest
        cache.get(&k1);
        cache.get_or_compute(k3, || 3);

        assert_eq!(cache.len(), 2);
        assert!(cache.get(&k2).is_none());
        assert!(cache.get(&k1).is_some());
        assert!(cache.get(&k3).is_some());
    }

    #[test]
    fn histogram_cache_invalidates_both_tables() {
        let mut cache = HistogramCache::new();
        let k = key("a.csv", 4);
        cache.one_d.get_or_compute(k, || histogram_1d(std::iter::empty(), &k.spec));
        cache.two_d.get_or_compute(k, || Histogram2DStack {
            value_domain: crate::data::model::TRACE_VALUE_DOMAIN,
            bins: 4,
            grids: Vec::new(),
        });
        cache.invalidate_dataset(k.dataset);
        assert_eq!(cache.one_d.len(), 0);
        assert_eq!(cache.two_d.len(), 0);
    }
}
