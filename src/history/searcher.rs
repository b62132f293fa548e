/// Incremental history search
///
/// A `SearchSession` filters the history by case-insensitive substring as
/// the user types and lets them cycle through the hits. `fuzzy` ranks the
/// history with a fuzzy matcher for the CLI.

use crate::history::store::{HistoryEntry, HistoryStore};
use fuzzy_matcher::skim::SkimMatcherV2;
use fuzzy_matcher::FuzzyMatcher;

/// Transient search state, most recent result first
#[derive(Debug, Clone, Default)]
pub struct SearchSession {
    active: bool,
    term: String,
    results: Vec<HistoryEntry>,
    cursor: usize,
}

impl SearchSession {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_active(&self) -> bool {
        self.active
    }

    pub fn term(&self) -> &str {
        &self.term
    }

    pub fn results(&self) -> &[HistoryEntry] {
        &self.results
    }

    pub fn cursor(&self) -> usize {
        self.cursor
    }

    /// Start searching, or move to the next hit if already searching
    ///
    /// Starting snapshots the whole history and selects nothing visible yet:
    /// it returns `None`. Re-entering returns the newly selected hit.
    pub fn enter(&mut self, store: &HistoryStore) -> Option<&HistoryEntry> {
        if self.active {
            return self.cycle(store);
        }

        self.active = true;
        self.term.clear();
        self.results = store.recent().cloned().collect();
        self.cursor = 0;
        None
    }

    /// Refilter for a new term and select the first hit
    pub fn update_term(&mut self, store: &HistoryStore, term: &str) -> Option<&HistoryEntry> {
        self.term = term.to_string();
        let needle = term.to_lowercase();
        self.results = store
            .recent()
            .filter(|entry| entry.contains_lowercase(&needle))
            .cloned()
            .collect();
        self.cursor = 0;
        self.current()
    }

    /// Select the next hit, wrapping around
    ///
    /// With no hits the full history is loaded first.
    pub fn cycle(&mut self, store: &HistoryStore) -> Option<&HistoryEntry> {
        if !self.active {
            return None;
        }
        if self.results.is_empty() {
            self.results = store.recent().cloned().collect();
            self.cursor = 0;
        }
        if self.results.is_empty() {
            return None;
        }

        self.cursor = (self.cursor + 1) % self.results.len();
        self.current()
    }

    /// The selected hit
    pub fn current(&self) -> Option<&HistoryEntry> {
        self.results.get(self.cursor)
    }

    /// Leave search mode, dropping the results
    pub fn exit(&mut self) {
        *self = Self::default();
    }
}

/// A history entry with its fuzzy match score
#[derive(Debug, Clone)]
pub struct ScoredEntry {
    pub entry: HistoryEntry,
    pub score: i64,
}

/// Rank history entries against `query`, best first
///
/// Both the template and its expansion are scored; the better one counts.
/// Equal scores keep the most recent entry first.
pub fn fuzzy(store: &HistoryStore, query: &str, limit: usize) -> Vec<ScoredEntry> {
    let matcher = SkimMatcherV2::default();

    let mut results: Vec<ScoredEntry> = store
        .recent()
        .filter_map(|entry| {
            let original = matcher.fuzzy_match(&entry.original, query);
            let expanded = matcher.fuzzy_match(&entry.expanded, query);
            original.max(expanded).map(|score| ScoredEntry {
                entry: entry.clone(),
                score,
            })
        })
        .collect();

    results.sort_by(|a, b| b.score.cmp(&a.score));
    results.truncate(limit);
    results
}

#[cfg(test)]
mod tests {
    use super::*;

    fn store() -> HistoryStore {
        let mut store = HistoryStore::default();
        store.append("python {file}", "python /ws/app.py");
        store.append("cargo build", "cargo build");
        store.append("PYTEST -x", "cd /ws && PYTEST -x");
        store.append("npm test", "npm test");
        store
    }

    #[test]
    fn test_enter_snapshots_without_selecting() {
        let store = store();
        let mut search = SearchSession::new();

        assert!(search.enter(&store).is_none());
        assert!(search.is_active());
        assert_eq!(search.term(), "");
        assert_eq!(search.results().len(), 4);
        assert_eq!(search.results()[0].original, "npm test");
        assert_eq!(search.cursor(), 0);
    }

    #[test]
    fn test_typing_filters_case_insensitively() {
        let store = store();
        let mut search = SearchSession::new();
        search.enter(&store);

        let first = search.update_term(&store, "py").cloned();
        let hits: Vec<_> = search.results().iter().map(|e| e.original.as_str()).collect();
        assert_eq!(hits, vec!["PYTEST -x", "python {file}"]);
        assert_eq!(first.unwrap().original, "PYTEST -x");
    }

    #[test]
    fn test_match_on_expanded_form() {
        let store = store();
        let mut search = SearchSession::new();
        search.enter(&store);

        search.update_term(&store, "app.py");
        assert_eq!(search.results().len(), 1);
        assert_eq!(search.results()[0].original, "python {file}");
    }

    #[test]
    fn test_cycle_wraps() {
        let store = store();
        let mut search = SearchSession::new();
        search.enter(&store);
        search.update_term(&store, "py");

        assert_eq!(search.cycle(&store).unwrap().original, "python {file}");
        assert_eq!(search.cycle(&store).unwrap().original, "PYTEST -x");
    }

    #[test]
    fn test_reenter_cycles() {
        let store = store();
        let mut search = SearchSession::new();
        search.enter(&store);

        assert_eq!(search.enter(&store).unwrap().original, "PYTEST -x");
        assert_eq!(search.cursor(), 1);
    }

    #[test]
    fn test_cycle_with_no_hits_loads_everything() {
        let store = store();
        let mut search = SearchSession::new();
        search.enter(&store);
        search.update_term(&store, "zzz");
        assert!(search.current().is_none());

        assert_eq!(search.cycle(&store).unwrap().original, "PYTEST -x");
        assert_eq!(search.results().len(), 4);
    }

    #[test]
    fn test_cycle_before_enter_does_nothing() {
        let store = store();
        let mut search = SearchSession::new();

        assert!(search.cycle(&store).is_none());
        assert!(search.results().is_empty());
        assert!(!search.is_active());
    }

    #[test]
    fn test_exit_resets() {
        let store = store();
        let mut search = SearchSession::new();
        search.enter(&store);
        search.update_term(&store, "npm");
        search.exit();

        assert!(!search.is_active());
        assert!(search.results().is_empty());
        assert!(search.cycle(&HistoryStore::default()).is_none());
    }

    #[test]
    fn test_fuzzy_ranking() {
        let store = store();

        let results = fuzzy(&store, "crgo", 10);
        assert!(!results.is_empty());
        assert_eq!(results[0].entry.original, "cargo build");

        let results = fuzzy(&store, "py", 1);
        assert_eq!(results.len(), 1);
    }
}
