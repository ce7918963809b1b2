//! Bounded, thread-safe cache of compiled programs
//!
//! Compiled programs are immutable, so they are shared behind `Arc` and the
//! cache only has to guard its map. Lookups take a read lock; inserts take a
//! write lock and evict the oldest entry once the capacity is reached. When
//! two threads compile the same key concurrently the first insert wins and
//! both get the same program back.

use crate::Result;
use hashbrown::HashMap;
use std::collections::VecDeque;
use std::hash::Hash;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{PoisonError, RwLock};

#[cfg(feature = "logging")]
use tracing::{debug, trace};

/// Snapshot of cache counters
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CacheStats {
    /// Lookups served from the cache
    pub hits: u64,
    /// Lookups that had to compile
    pub misses: u64,
    /// Entries dropped to stay within capacity
    pub evictions: u64,
    /// Entries currently held
    pub entries: usize,
}

impl CacheStats {
    /// Hit rate as a percentage of all lookups
    pub fn hit_rate(&self) -> f64 {
        let total = self.hits + self.misses;
        if total == 0 {
            0.0
        } else {
            (self.hits as f64 / total as f64) * 100.0
        }
    }
}

struct Slots<K, V> {
    map: HashMap<K, V>,
    order: VecDeque<K>,
}

/// FIFO-bounded map from template keys to compiled programs
pub struct ProgramCache<K, V> {
    capacity: usize,
    slots: RwLock<Slots<K, V>>,
    hits: AtomicU64,
    misses: AtomicU64,
    evictions: AtomicU64,
}

impl<K, V> ProgramCache<K, V>
where
    K: Eq + Hash + Clone,
    V: Clone,
{
    /// Create a cache holding at most `capacity` programs
    pub fn new(capacity: usize) -> Self {
        Self {
            capacity,
            slots: RwLock::new(Slots {
                map: HashMap::new(),
                order: VecDeque::new(),
            }),
            hits: AtomicU64::new(0),
            misses: AtomicU64::new(0),
            evictions: AtomicU64::new(0),
        }
    }

    /// Look up a program without compiling
    pub fn get(&self, key: &K) -> Option<V> {
        let slots = self.slots.read().unwrap_or_else(PoisonError::into_inner);
        slots.map.get(key).cloned()
    }

    /// Return the cached program for `key`, compiling it with `build` on a miss
    ///
    /// Compilation errors are returned and nothing is cached.
    pub fn get_or_try_insert_with<F>(&self, key: K, build: F) -> Result<V>
    where
        F: FnOnce() -> Result<V>,
    {
        if let Some(found) = self.get(&key) {
            self.hits.fetch_add(1, Ordering::Relaxed);
            #[cfg(feature = "logging")]
            trace!("program cache hit");
            return Ok(found);
        }

        self.misses.fetch_add(1, Ordering::Relaxed);
        let built = build()?;

        if self.capacity == 0 {
            return Ok(built);
        }

        let mut slots = self.slots.write().unwrap_or_else(PoisonError::into_inner);
        if let Some(existing) = slots.map.get(&key) {
            return Ok(existing.clone());
        }

        while slots.map.len() >= self.capacity {
            let Some(oldest) = slots.order.pop_front() else {
                break;
            };
            slots.map.remove(&oldest);
            self.evictions.fetch_add(1, Ordering::Relaxed);
            #[cfg(feature = "logging")]
            debug!("program cache full, evicted oldest entry");
        }

        slots.order.push_back(key.clone());
        slots.map.insert(key, built.clone());
        Ok(built)
    }

    /// Number of cached programs
    pub fn len(&self) -> usize {
        self.slots
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .map
            .len()
    }

    /// Whether the cache holds nothing
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Drop every entry; counters are kept
    pub fn clear(&self) {
        let mut slots = self.slots.write().unwrap_or_else(PoisonError::into_inner);
        slots.map.clear();
        slots.order.clear();
    }

    /// Current counters
    pub fn stats(&self) -> CacheStats {
        CacheStats {
            hits: self.hits.load(Ordering::Relaxed),
            misses: self.misses.load(Ordering::Relaxed),
            evictions: self.evictions.load(Ordering::Relaxed),
            entries: self.len(),
        }
    }
}
