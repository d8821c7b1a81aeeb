//! Bounded, id-keyed probe log.
//!
//! Entries live in a hash map keyed by [`EntryId`]; a deque of ids carries
//! the display order (newest at the front). Settlement touches only the map,
//! so it is O(1) and unaffected by pushes, truncation or clears that happen
//! between a probe being issued and settling.

use std::collections::{HashMap, VecDeque};

use chrono::{DateTime, Utc};

use crate::monitor::types::{EntryId, LogEntry, MAX_LOG_ENTRIES};
use crate::probe::ProbeOutcome;

/// Ordered, bounded collection of log entries, newest first.
#[derive(Debug, Clone)]
pub struct LogStore {
    order: VecDeque<EntryId>,
    entries: HashMap<EntryId, LogEntry>,
    capacity: usize,
}

impl Default for LogStore {
    fn default() -> Self {
        Self::new()
    }
}

impl LogStore {
    /// Create an empty store holding at most [`MAX_LOG_ENTRIES`].
    pub fn new() -> Self {
        Self::with_capacity(MAX_LOG_ENTRIES)
    }

    /// Create an empty store with a custom bound (minimum 1).
    pub fn with_capacity(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            order: VecDeque::with_capacity(capacity),
            entries: HashMap::with_capacity(capacity),
            capacity,
        }
    }

    /// Maximum number of entries retained.
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Number of entries.
    pub fn len(&self) -> usize {
        self.order.len()
    }

    /// Whether the store is empty.
    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }

    /// Insert at the front, dropping the oldest entries beyond capacity.
    ///
    /// Returns the number of entries dropped.
    pub fn push(&mut self, entry: LogEntry) -> usize {
        let id = entry.id;
        if let Some(previous) = self.entries.insert(id, entry) {
            // Same id pushed twice: keep one slot, at the front.
            tracing::warn!(id = %previous.id, "Replacing log entry with duplicate id");
            self.order.retain(|existing| *existing != id);
        }
        self.order.push_front(id);

        let mut dropped = 0;
        while self.order.len() > self.capacity {
            if let Some(oldest) = self.order.pop_back() {
                self.entries.remove(&oldest);
                dropped += 1;
            }
        }
        dropped
    }

    /// Finalize a pending entry in place.
    ///
    /// Returns `false` when the id is absent (cleared or truncated) or the
    /// entry has already settled; the store is left untouched in both cases.
    pub fn settle(&mut self, id: &EntryId, outcome: ProbeOutcome, at: DateTime<Utc>) -> bool {
        match self.entries.get_mut(id) {
            Some(entry) if !entry.status.is_final() => {
                entry.settle(outcome, at);
                true
            }
            _ => false,
        }
    }

    /// Look up an entry by id.
    pub fn get(&self, id: &EntryId) -> Option<&LogEntry> {
        self.entries.get(id)
    }

    /// Remove every entry.
    pub fn clear(&mut self) {
        self.order.clear();
        self.entries.clear();
    }

    /// Iterate newest first.
    pub fn iter(&self) -> impl DoubleEndedIterator<Item = &LogEntry> + '_ {
        self.order.iter().filter_map(|id| self.entries.get(id))
    }

    /// Iterate oldest first.
    pub fn iter_chronological(&self) -> impl Iterator<Item = &LogEntry> + '_ {
        self.iter().rev()
    }

    /// Clone entries newest first.
    pub fn to_vec(&self) -> Vec<LogEntry> {
        self.iter().cloned().collect()
    }

    /// Number of entries still pending.
    pub fn pending_count(&self) -> usize {
        self.entries
            .values()
            .filter(|entry| !entry.status.is_final())
            .count()
    }
}
