//! Reclaimable bitmap store with LRU eviction
//!
//! Holds the strong (`Arc`) side of every decoded tile bitmap under a byte
//! budget. When the budget is exceeded, the least recently used entries are
//! evicted; any weak handle a tile node holds to an evicted bitmap then fails
//! to upgrade, which the tile tree treats identically to "no bitmap" and
//! re-decodes on demand.

use crate::bitmap::TileBitmap;
use std::collections::{HashMap, VecDeque};
use std::sync::{Arc, Mutex};

/// Key identifying a store entry
///
/// The tile tree uses the owning node's id as the key, so node identity and
/// bitmap identity coincide.
pub type BitmapKey = u64;

/// Default byte budget for the store (256 MB)
pub const DEFAULT_BITMAP_BUDGET: usize = 256 * 1024 * 1024;

/// Statistics about store usage
#[derive(Debug, Clone, Copy, Default)]
pub struct StoreStats {
    /// Number of bitmaps currently held
    pub entry_count: usize,

    /// Total bytes held
    pub bytes_used: usize,

    /// Byte budget
    pub byte_limit: usize,

    /// Number of lookups that found an entry
    pub hits: u64,

    /// Number of lookups that found nothing
    pub misses: u64,

    /// Number of entries evicted under budget pressure
    pub evictions: u64,
}

impl StoreStats {
    /// Lookup hit rate (0.0 to 1.0)
    pub fn hit_rate(&self) -> f64 {
        let total = self.hits + self.misses;
        if total == 0 {
            0.0
        } else {
            self.hits as f64 / total as f64
        }
    }

    /// Budget utilization (0.0 to 1.0)
    pub fn utilization(&self) -> f64 {
        if self.byte_limit == 0 {
            0.0
        } else {
            self.bytes_used as f64 / self.byte_limit as f64
        }
    }
}

struct StoreState {
    /// Map from key to the strong bitmap reference
    entries: HashMap<BitmapKey, Arc<TileBitmap>>,

    /// LRU queue (most recently used at back)
    lru_queue: VecDeque<BitmapKey>,

    /// Current bytes held
    bytes_used: usize,

    /// Byte budget
    byte_limit: usize,

    stats: StoreStats,
}

impl StoreState {
    fn new(byte_limit: usize) -> Self {
        Self {
            entries: HashMap::new(),
            lru_queue: VecDeque::new(),
            bytes_used: 0,
            byte_limit,
            stats: StoreStats {
                byte_limit,
                ..Default::default()
            },
        }
    }

    /// Move a key to the back of the LRU queue (mark as most recently used)
    fn touch(&mut self, key: BitmapKey) {
        self.lru_queue.retain(|&k| k != key);
        self.lru_queue.push_back(key);
    }

    /// Evict the least recently used entry, dropping its strong reference
    fn evict_lru(&mut self) -> bool {
        if let Some(key) = self.lru_queue.pop_front() {
            if let Some(bitmap) = self.entries.remove(&key) {
                self.bytes_used = self.bytes_used.saturating_sub(bitmap.byte_size());
                self.stats.entry_count = self.entries.len();
                self.stats.bytes_used = self.bytes_used;
                self.stats.evictions += 1;
                return true;
            }
        }
        false
    }

    /// Evict entries until the required size fits within the budget
    fn evict_to_fit(&mut self, required_size: usize) {
        while self.bytes_used + required_size > self.byte_limit && !self.entries.is_empty() {
            if !self.evict_lru() {
                break;
            }
        }
    }
}

/// Byte-budgeted bitmap store
///
/// Thread-safe, cheaply cloneable handle. The store owns every decoded
/// bitmap's `Arc`; tile nodes downgrade the `Arc` returned by [`insert`] and
/// must tolerate the upgrade failing after eviction.
///
/// [`insert`]: BitmapStore::insert
///
/// # Example
///
/// ```
/// use quadview_cache::{BitmapStore, TileBitmap};
/// use std::sync::Arc;
///
/// let store = BitmapStore::new(1024 * 1024);
/// let strong = Arc::new(TileBitmap::from_fill(16, 16, [255, 255, 255, 255]));
/// store.insert(7, strong.clone());
/// let weak = Arc::downgrade(&strong);
/// drop(strong);
///
/// // Still materialized while the store holds it.
/// assert!(weak.upgrade().is_some());
///
/// store.remove(7);
/// assert!(weak.upgrade().is_none());
/// ```
#[derive(Clone)]
pub struct BitmapStore {
    state: Arc<Mutex<StoreState>>,
}

impl BitmapStore {
    /// Create a store with the given byte budget
    pub fn new(byte_limit: usize) -> Self {
        Self {
            state: Arc::new(Mutex::new(StoreState::new(byte_limit))),
        }
    }

    /// Create a store with a budget in megabytes
    pub fn with_mb_limit(megabytes: usize) -> Self {
        Self::new(megabytes * 1024 * 1024)
    }

    /// Store a bitmap, evicting LRU entries to make room
    ///
    /// Replaces any existing entry under the same key; the replaced entry's
    /// strong reference is dropped immediately (explicit free). The caller
    /// keeps its own `Arc` and typically downgrades it.
    pub fn insert(&self, key: BitmapKey, bitmap: Arc<TileBitmap>) {
        let mut state = self.state.lock().unwrap();

        let size = bitmap.byte_size();

        if let Some(old) = state.entries.remove(&key) {
            state.bytes_used = state.bytes_used.saturating_sub(old.byte_size());
            state.lru_queue.retain(|&k| k != key);
        }

        state.evict_to_fit(size);

        state.bytes_used += size;
        state.entries.insert(key, bitmap);
        state.touch(key);

        state.stats.entry_count = state.entries.len();
        state.stats.bytes_used = state.bytes_used;
    }

    /// Retrieve a bitmap, updating LRU tracking and statistics
    pub fn get(&self, key: BitmapKey) -> Option<Arc<TileBitmap>> {
        let mut state = self.state.lock().unwrap();

        if let Some(bitmap) = state.entries.get(&key).cloned() {
            state.touch(key);
            state.stats.hits += 1;
            Some(bitmap)
        } else {
            state.stats.misses += 1;
            None
        }
    }

    /// Mark an entry as most recently used without retrieving it
    ///
    /// This is the cheap re-affirm path for a tile whose bitmap is already
    /// cached. Returns `true` if the entry exists.
    pub fn touch(&self, key: BitmapKey) -> bool {
        let mut state = self.state.lock().unwrap();
        if state.entries.contains_key(&key) {
            state.touch(key);
            true
        } else {
            false
        }
    }

    /// Check for an entry without updating LRU tracking
    pub fn contains(&self, key: BitmapKey) -> bool {
        let state = self.state.lock().unwrap();
        state.entries.contains_key(&key)
    }

    /// Drop an entry's strong reference (explicit free)
    ///
    /// Returns `true` if an entry was removed.
    pub fn remove(&self, key: BitmapKey) -> bool {
        let mut state = self.state.lock().unwrap();

        if let Some(bitmap) = state.entries.remove(&key) {
            state.bytes_used = state.bytes_used.saturating_sub(bitmap.byte_size());
            state.lru_queue.retain(|&k| k != key);
            state.stats.entry_count = state.entries.len();
            state.stats.bytes_used = state.bytes_used;
            true
        } else {
            false
        }
    }

    /// Drop all entries
    pub fn clear(&self) {
        let mut state = self.state.lock().unwrap();
        state.entries.clear();
        state.lru_queue.clear();
        state.bytes_used = 0;
        state.stats.entry_count = 0;
        state.stats.bytes_used = 0;
    }

    /// Current store statistics
    pub fn stats(&self) -> StoreStats {
        let state = self.state.lock().unwrap();
        state.stats
    }

    /// Update the byte budget, evicting if now over it
    pub fn set_byte_limit(&self, new_limit: usize) {
        let mut state = self.state.lock().unwrap();
        state.byte_limit = new_limit;
        state.stats.byte_limit = new_limit;

        if state.bytes_used > new_limit {
            state.evict_to_fit(0);
        }
    }

    /// Current byte budget
    pub fn byte_limit(&self) -> usize {
        let state = self.state.lock().unwrap();
        state.byte_limit
    }

    /// Current bytes held
    pub fn bytes_used(&self) -> usize {
        let state = self.state.lock().unwrap();
        state.bytes_used
    }

    /// Number of bitmaps currently held
    pub fn entry_count(&self) -> usize {
        let state = self.state.lock().unwrap();
        state.entries.len()
    }
}

impl Default for BitmapStore {
    /// Create a store with the default budget
    fn default() -> Self {
        Self::new(DEFAULT_BITMAP_BUDGET)
    }
}
