/// Command history store
///
/// An ordered, bounded, deduplicated list of issued commands. The most
/// recent entry is at the tail. Two entries never share an `original`.

use serde::{Deserialize, Serialize};

/// Default number of commands kept
pub const DEFAULT_CAPACITY: usize = 100;

/// A dispatched command: the template the user typed and what it became
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HistoryEntry {
    pub original: String,
    pub expanded: String,
}

impl HistoryEntry {
    pub fn new(original: &str, expanded: &str) -> Self {
        Self {
            original: original.trim().to_string(),
            expanded: expanded.to_string(),
        }
    }

    /// Case-insensitive substring match on either form
    ///
    /// `needle` must already be lowercase.
    pub fn contains_lowercase(&self, needle: &str) -> bool {
        self.original.to_lowercase().contains(needle) || self.expanded.to_lowercase().contains(needle)
    }
}

/// Most-recent-last command list with a fixed capacity
#[derive(Debug, Clone)]
pub struct HistoryStore {
    entries: Vec<HistoryEntry>,
    capacity: usize,
}

impl Default for HistoryStore {
    fn default() -> Self {
        Self::new(DEFAULT_CAPACITY)
    }
}

impl HistoryStore {
    /// Create an empty store; a capacity of 0 is raised to 1
    pub fn new(capacity: usize) -> Self {
        Self {
            entries: Vec::new(),
            capacity: capacity.max(1),
        }
    }

    /// Rebuild a store from persisted entries, oldest first
    ///
    /// Duplicates and overflow are cleaned up the same way `append` would.
    pub fn from_entries(entries: Vec<HistoryEntry>, capacity: usize) -> Self {
        let mut store = Self::new(capacity);
        for entry in entries {
            store.append(&entry.original, &entry.expanded);
        }
        store
    }

    /// Record a command at the tail
    ///
    /// An earlier entry with the same (trimmed) original is removed first,
    /// then the oldest entries are evicted down to capacity. Returns false
    /// when the original is blank and nothing was recorded.
    pub fn append(&mut self, original: &str, expanded: &str) -> bool {
        let entry = HistoryEntry::new(original, expanded);
        if entry.original.is_empty() {
            return false;
        }

        self.entries.retain(|existing| existing.original != entry.original);
        self.entries.push(entry);

        if self.entries.len() > self.capacity {
            let overflow = self.entries.len() - self.capacity;
            self.entries.drain(..overflow);
        }
        true
    }

    pub fn entries(&self) -> &[HistoryEntry] {
        &self.entries
    }

    pub fn get(&self, index: usize) -> Option<&HistoryEntry> {
        self.entries.get(index)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Entries most recent first
    pub fn recent(&self) -> impl Iterator<Item = &HistoryEntry> {
        self.entries.iter().rev()
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }
}
