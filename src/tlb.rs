use std::collections::{HashMap, VecDeque};

use crate::constants::TLB_SIZE;
use crate::page_table::PageKey;

/// Fixed-capacity, fully associative translation cache with LRU eviction.
///
/// Maps a [`PageKey`] to a frame index. The cache is a lookup hint only;
/// the page table stays authoritative for validity. The recency deque keeps
/// the most recently used key at the front.
pub struct TlbCache {
    map: HashMap<PageKey, usize>,
    recency: VecDeque<PageKey>,
    capacity: usize,
}

impl TlbCache {
    pub fn new() -> Self {
        Self::with_capacity(TLB_SIZE)
    }

    pub fn with_capacity(capacity: usize) -> Self {
        TlbCache {
            map: HashMap::with_capacity(capacity),
            recency: VecDeque::with_capacity(capacity),
            capacity,
        }
    }

    /// Look up a key; a hit promotes it to most recently used.
    pub fn lookup(&mut self, key: PageKey) -> Option<usize> {
        let frame = *self.map.get(&key)?;
        self.promote(key);
        Some(frame)
    }

    /// Insert a mapping, evicting the least recently used key at capacity.
    pub fn insert(&mut self, key: PageKey, frame: usize) {
        if self.map.contains_key(&key) {
            self.map.insert(key, frame);
            self.promote(key);
            return;
        }
        if self.map.len() == self.capacity {
            if let Some(victim) = self.recency.pop_back() {
                self.map.remove(&victim);
            }
        }
        self.map.insert(key, frame);
        self.recency.push_front(key);
    }

    /// Drop every entry naming `frame`. Called when the allocator reassigns
    /// that frame to another page, so the cache never serves a stale hint.
    pub fn invalidate_frame(&mut self, frame: usize) {
        let stale: Vec<PageKey> = self
            .map
            .iter()
            .filter(|&(_, &f)| f == frame)
            .map(|(&k, _)| k)
            .collect();
        for key in stale {
            self.map.remove(&key);
            self.recency.retain(|&k| k != key);
        }
    }

    pub fn len(&self) -> usize {
        self.map.len()
    }

    pub fn is_empty(&self) -> bool {
        self.map.is_empty()
    }

    fn promote(&mut self, key: PageKey) {
        self.recency.retain(|&k| k != key);
        self.recency.push_front(key);
    }
}

impl Default for TlbCache {
    fn default() -> Self {
        Self::new()
    }
}
