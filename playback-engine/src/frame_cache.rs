/*
 * Copyright 2025 Security Union LLC
 *
 * Licensed under either of
 *
 * * Apache License, Version 2.0
 *   (http://www.apache.org/licenses/LICENSE-2.0)
 * * MIT license
 *   (http://opensource.org/licenses/MIT)
 *
 * at your option.
 *
 * Unless you explicitly state otherwise, any contribution intentionally
 * submitted for inclusion in the work by you, as defined in the Apache-2.0
 * license, shall be dual licensed as above, without any additional terms or
 * conditions.
 */

//! Snapshots of rendered frames, used while playing in reverse.
//!
//! Reverse playback cannot decode backwards, so the reverse pre-render pass
//! rasterizes every frame up to the cursor into this cache and the reverse
//! timer only reads from it. Without a budget nothing is ever evicted. With
//! a budget, the least recently used snapshots go first; because pre-render
//! walks forward, those are the low indices the reverse timer reaches last.

use crate::frame::FrameSnapshot;
use lru::LruCache;

/// Counters describing cache behaviour.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CacheStats {
    pub hits: u64,
    pub misses: u64,
    pub insertions: u64,
    pub evictions: u64,
}

pub struct FrameCache {
    cache: LruCache<usize, FrameSnapshot>,
    budget_bytes: Option<usize>,
    current_bytes: usize,
    stats: CacheStats,
}

impl FrameCache {
    pub fn new(budget_bytes: Option<usize>) -> Self {
        Self {
            cache: LruCache::unbounded(),
            budget_bytes,
            current_bytes: 0,
            stats: CacheStats::default(),
        }
    }

    /// Presence check that does not touch recency.
    pub fn contains(&self, frame_index: usize) -> bool {
        self.cache.contains(&frame_index)
    }

    pub fn insert(&mut self, frame_index: usize, snapshot: FrameSnapshot) {
        let size = snapshot.size_bytes();

        if let Some(previous) = self.cache.pop(&frame_index) {
            self.current_bytes = self.current_bytes.saturating_sub(previous.size_bytes());
        }

        if let Some(budget) = self.budget_bytes {
            while self.current_bytes + size > budget {
                let Some((evicted_index, evicted)) = self.cache.pop_lru() else {
                    break;
                };
                self.current_bytes = self.current_bytes.saturating_sub(evicted.size_bytes());
                self.stats.evictions += 1;
                log::trace!("[FRAME_CACHE] Evicted frame {evicted_index}");
            }
        }

        self.current_bytes += size;
        self.cache.put(frame_index, snapshot);
        self.stats.insertions += 1;
    }

    pub fn get(&mut self, frame_index: usize) -> Option<FrameSnapshot> {
        match self.cache.get(&frame_index) {
            Some(snapshot) => {
                self.stats.hits += 1;
                Some(snapshot.clone())
            }
            None => {
                self.stats.misses += 1;
                None
            }
        }
    }

    pub fn len(&self) -> usize {
        self.cache.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cache.is_empty()
    }

    pub fn total_bytes(&self) -> usize {
        self.current_bytes
    }

    pub fn stats(&self) -> CacheStats {
        self.stats
    }

    pub fn clear(&mut self) {
        self.cache.clear();
        self.current_bytes = 0;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    fn snapshot(index: usize, bytes: usize) -> FrameSnapshot {
        FrameSnapshot {
            timestamp: index as i64,
            width: 1,
            height: 1,
            rgba: Arc::new(vec![index as u8; bytes]),
        }
    }

    #[test]
    fn unbounded_cache_keeps_everything() {
        let mut cache = FrameCache::new(None);
        for i in 0..100 {
            cache.insert(i, snapshot(i, 64));
        }
        assert_eq!(cache.len(), 100);
        assert_eq!(cache.total_bytes(), 6_400);
        assert_eq!(cache.stats().evictions, 0);
    }

    #[test]
    fn budget_evicts_oldest_insertions_first() {
        let mut cache = FrameCache::new(Some(256));
        for i in 0..6 {
            cache.insert(i, snapshot(i, 64));
        }
        assert_eq!(cache.len(), 4);
        assert!(!cache.contains(0));
        assert!(!cache.contains(1));
        assert!(cache.contains(5));
        assert_eq!(cache.stats().evictions, 2);
        assert!(cache.total_bytes() <= 256);
    }

    #[test]
    fn get_counts_hits_and_misses() {
        let mut cache = FrameCache::new(None);
        cache.insert(3, snapshot(3, 4));
        assert_eq!(cache.get(3).map(|s| s.timestamp), Some(3));
        assert!(cache.get(4).is_none());
        let stats = cache.stats();
        assert_eq!((stats.hits, stats.misses), (1, 1));
    }

    #[test]
    fn reinserting_replaces_size_accounting() {
        let mut cache = FrameCache::new(None);
        cache.insert(0, snapshot(0, 10));
        cache.insert(0, snapshot(0, 30));
        assert_eq!(cache.len(), 1);
        assert_eq!(cache.total_bytes(), 30);
    }
}
