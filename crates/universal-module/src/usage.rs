// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.
//
// Copyright (c) 2025 Pegasus Heavy Industries, LLC

//! Request-scoped usage tracking
//!
//! A server render creates one [`UsageTracker`], hands clones of it to every
//! [`UniversalLoader`](crate::UniversalLoader), and flushes it once the
//! render is done to learn which modules and chunks the response needs.

use parking_lot::Mutex;
use std::collections::HashSet;
use std::sync::Arc;

/// Insertion-ordered set of strings
#[derive(Debug, Default)]
struct OrderedSet {
    order: Vec<String>,
    seen: HashSet<String>,
}

impl OrderedSet {
    fn insert(&mut self, value: &str) -> bool {
        if self.seen.contains(value) {
            return false;
        }
        self.seen.insert(value.to_string());
        self.order.push(value.to_string());
        true
    }
}

#[derive(Debug, Default)]
struct UsageSets {
    // Created on first insertion
    module_ids: Option<OrderedSet>,
    chunk_names: Option<OrderedSet>,
}

/// Accumulates module ids and chunk names touched during one request
#[derive(Debug, Clone, Default)]
pub struct UsageTracker {
    sets: Arc<Mutex<UsageSets>>,
}

impl UsageTracker {
    /// Create a tracker for a new request
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a module id. Returns false if it was already recorded.
    pub fn add_module_id(&self, id: &str) -> bool {
        let inserted = self
            .sets
            .lock()
            .module_ids
            .get_or_insert_with(OrderedSet::default)
            .insert(id);
        if inserted {
            tracing::trace!(module = id, "module used");
        }
        inserted
    }

    /// Record a chunk name. Returns false if it was already recorded.
    pub fn add_chunk_name(&self, name: &str) -> bool {
        let inserted = self
            .sets
            .lock()
            .chunk_names
            .get_or_insert_with(OrderedSet::default)
            .insert(name);
        if inserted {
            tracing::trace!(chunk = name, "chunk used");
        }
        inserted
    }

    /// Read and reset the recorded module ids, in insertion order
    pub fn flush_module_ids(&self) -> Vec<String> {
        let ids = self
            .sets
            .lock()
            .module_ids
            .take()
            .map(|set| set.order)
            .unwrap_or_default();
        tracing::debug!(count = ids.len(), "flushed module ids");
        ids
    }

    /// Read and reset the recorded chunk names, in insertion order
    pub fn flush_chunk_names(&self) -> Vec<String> {
        let names = self
            .sets
            .lock()
            .chunk_names
            .take()
            .map(|set| set.order)
            .unwrap_or_default();
        tracing::debug!(count = names.len(), "flushed chunk names");
        names
    }

    /// Recorded module ids without resetting
    pub fn module_ids(&self) -> Vec<String> {
        self.sets
            .lock()
            .module_ids
            .as_ref()
            .map(|set| set.order.clone())
            .unwrap_or_default()
    }

    /// Recorded chunk names without resetting
    pub fn chunk_names(&self) -> Vec<String> {
        self.sets
            .lock()
            .chunk_names
            .as_ref()
            .map(|set| set.order.clone())
            .unwrap_or_default()
    }

    /// Drop everything recorded so far
    pub fn clear(&self) {
        let mut sets = self.sets.lock();
        sets.module_ids = None;
        sets.chunk_names = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_flush_empty() {
        let tracker = UsageTracker::new();
        assert!(tracker.flush_module_ids().is_empty());
        assert!(tracker.flush_chunk_names().is_empty());
    }

    #[test]
    fn test_insertion_order_and_dedup() {
        let tracker = UsageTracker::new();
        assert!(tracker.add_module_id("/es6"));
        assert!(tracker.add_module_id("/es5"));
        assert!(!tracker.add_module_id("/es6"));

        assert_eq!(tracker.flush_module_ids(), vec!["/es6", "/es5"]);
        assert!(tracker.flush_module_ids().is_empty());
    }

    #[test]
    fn test_sets_are_independent() {
        let tracker = UsageTracker::new();
        tracker.add_chunk_name("home");
        tracker.add_module_id("./Home");

        assert_eq!(tracker.flush_chunk_names(), vec!["home"]);
        assert_eq!(tracker.module_ids(), vec!["./Home"]);
        assert_eq!(tracker.flush_module_ids(), vec!["./Home"]);
    }

    #[test]
    fn test_clones_share_state() {
        let tracker = UsageTracker::new();
        let handle = tracker.clone();
        handle.add_chunk_name("a");

        assert_eq!(tracker.chunk_names(), vec!["a"]);
        tracker.clear();
        assert!(handle.chunk_names().is_empty());
    }

    #[test]
    fn test_trackers_do_not_leak_across_requests() {
        let first = UsageTracker::new();
        let second = UsageTracker::new();
        first.add_module_id("./A");
        second.add_module_id("./B");

        assert_eq!(first.flush_module_ids(), vec!["./A"]);
        assert_eq!(second.flush_module_ids(), vec!["./B"]);
    }

    #[test]
    fn test_concurrent_inserts() {
        let tracker = UsageTracker::new();
        let handles: Vec<_> = (0..8)
            .map(|i| {
                let tracker = tracker.clone();
                std::thread::spawn(move || {
                    for j in 0..50 {
                        tracker.add_module_id(&format!("m{}", (i * 50 + j) % 100));
                    }
                })
            })
            .collect();
        for handle in handles {
            handle.join().unwrap();
        }

        assert_eq!(tracker.flush_module_ids().len(), 100);
    }
}
