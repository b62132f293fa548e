/// Up/down browsing through history
///
/// The cursor is either "live" (the user's own input) or points at a store
/// index. Leaving the live position remembers the input so that walking past
/// the newest entry gives it back.

use crate::history::store::{HistoryEntry, HistoryStore};

#[derive(Debug, Clone, Default)]
pub struct HistoryNavigator {
    cursor: Option<usize>,
    live_text: String,
}

impl HistoryNavigator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Current index, `None` while on the live input
    pub fn cursor(&self) -> Option<usize> {
        self.cursor
    }

    pub fn is_live(&self) -> bool {
        self.cursor.is_none()
    }

    /// Step towards older entries
    ///
    /// From the live position `current_input` is saved and the cursor jumps
    /// to the newest entry. Returns the expanded command to display, or
    /// `None` when the store is empty.
    pub fn previous(&mut self, store: &HistoryStore, current_input: &str) -> Option<String> {
        if store.is_empty() {
            return None;
        }

        let index = match self.cursor {
            None => {
                self.live_text = current_input.to_string();
                store.len() - 1
            }
            Some(index) => index.saturating_sub(1).min(store.len() - 1),
        };
        self.cursor = Some(index);

        store.get(index).map(|entry| entry.expanded.clone())
    }

    /// Step towards newer entries
    ///
    /// Past the newest entry the cursor goes live again and the saved input
    /// is returned. Does nothing while already live.
    pub fn next(&mut self, store: &HistoryStore) -> Option<String> {
        let index = self.cursor?;

        if index + 1 < store.len() {
            self.cursor = Some(index + 1);
            return store.get(index + 1).map(|entry| entry.expanded.clone());
        }

        self.cursor = None;
        Some(std::mem::take(&mut self.live_text))
    }

    /// The entry under the cursor, if browsing
    pub fn current<'s>(&self, store: &'s HistoryStore) -> Option<&'s HistoryEntry> {
        self.cursor.and_then(|index| store.get(index))
    }

    /// The template form of the entry under the cursor
    pub fn restore_original(&self, store: &HistoryStore) -> Option<String> {
        self.current(store).map(|entry| entry.original.clone())
    }

    /// Back to live without touching the input
    pub fn reset(&mut self) {
        self.cursor = None;
        self.live_text.clear();
    }
}
