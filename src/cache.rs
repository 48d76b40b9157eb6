//! Result memoization.
//!
//! A computed view is cached under a fingerprint of everything that can
//! change it: the full definition (including the caller-maintained
//! `dataset_version`) plus the record count. Identical repeat requests are
//! served from the cache; any definition or data change produces a new
//! fingerprint and a fresh computation. Eviction is least-recently-used
//! with a small fixed capacity.

use std::collections::hash_map::DefaultHasher;
use std::collections::VecDeque;
use std::hash::{Hash, Hasher};

use log::debug;

use crate::definition::CrosstabDefinition;
use crate::view::CrosstabView;

/// Default number of cached views per table instance.
pub const DEFAULT_CACHE_CAPACITY: usize = 8;

/// Computes the cache fingerprint for a request.
pub fn fingerprint(definition: &CrosstabDefinition, record_count: usize) -> u64 {
    let mut hasher = DefaultHasher::new();
    definition.hash(&mut hasher);
    record_count.hash(&mut hasher);
    hasher.finish()
}

/// A small LRU cache of computed views, keyed by fingerprint.
///
/// Front of the deque is most recently used.
#[derive(Debug, Clone)]
pub struct ResultCache {
    capacity: usize,
    entries: VecDeque<(u64, CrosstabView)>,
}

impl Default for ResultCache {
    fn default() -> Self {
        ResultCache::new(DEFAULT_CACHE_CAPACITY)
    }
}

impl ResultCache {
    pub fn new(capacity: usize) -> Self {
        ResultCache {
            capacity: capacity.max(1),
            entries: VecDeque::new(),
        }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }

    /// Looks up a view and marks it most recently used.
    pub fn get(&mut self, fingerprint: u64) -> Option<CrosstabView> {
        let pos = self.entries.iter().position(|(fp, _)| *fp == fingerprint)?;
        let entry = self.entries.remove(pos)?;
        let view = entry.1.clone();
        self.entries.push_front(entry);
        debug!("cache hit for fingerprint {fingerprint:#018x}");
        Some(view)
    }

    /// Stores a view, evicting the least recently used entry when full.
    pub fn insert(&mut self, fingerprint: u64, view: CrosstabView) {
        if let Some(pos) = self.entries.iter().position(|(fp, _)| *fp == fingerprint) {
            self.entries.remove(pos);
        }
        self.entries.push_front((fingerprint, view));
        while self.entries.len() > self.capacity {
            if let Some((evicted, _)) = self.entries.pop_back() {
                debug!("evicting cached view {evicted:#018x}");
            }
        }
    }
}
