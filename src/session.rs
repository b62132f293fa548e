/// Input session
///
/// Owns every piece of mutable state of one command prompt: the text being
/// edited, the history, the browsing cursor and the search state. Events
/// come in one at a time; `accept` resolves the input and produces a
/// `Dispatch` for a terminal sink.

use crate::command_input::PasteInput;
use crate::config::Settings;
use crate::core::context::ResolutionContext;
use crate::core::resolver::{resolve, ResolutionWarning};
use crate::history::{HistoryEntry, HistoryNavigator, HistoryStore, SearchSession};

/// A resolved command ready for the terminal
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Dispatch {
    pub command: String,
    pub auto_submit: bool,
    pub warnings: Vec<ResolutionWarning>,
}

#[derive(Debug, Clone)]
pub struct Session {
    store: HistoryStore,
    navigator: HistoryNavigator,
    search: SearchSession,
    input: String,
    auto_submit: bool,
}

impl Session {
    pub fn new(settings: &Settings) -> Self {
        Self {
            store: HistoryStore::new(settings.history_size),
            navigator: HistoryNavigator::new(),
            search: SearchSession::new(),
            input: String::new(),
            auto_submit: true,
        }
    }

    /// Seed the history with persisted entries, oldest first
    pub fn with_history(mut self, entries: Vec<HistoryEntry>) -> Self {
        self.store = HistoryStore::from_entries(entries, self.store.capacity());
        self
    }

    /// Whether dispatched commands should run right away
    pub fn with_auto_submit(mut self, auto_submit: bool) -> Self {
        self.auto_submit = auto_submit;
        self
    }

    pub fn history(&self) -> &HistoryStore {
        &self.store
    }

    pub fn search(&self) -> &SearchSession {
        &self.search
    }

    /// Text currently shown in the prompt
    pub fn input(&self) -> &str {
        &self.input
    }

    /// The user edited the prompt
    ///
    /// While searching, the text is the search term.
    pub fn set_input(&mut self, text: &str) {
        self.input = text.to_string();
        if self.search.is_active() {
            self.search.update_term(&self.store, text);
        }
    }

    pub fn history_previous(&mut self) {
        if let Some(text) = self.navigator.previous(&self.store, &self.input) {
            self.input = text;
        }
    }

    pub fn history_next(&mut self) {
        if let Some(text) = self.navigator.next(&self.store) {
            self.input = text;
        }
    }

    /// Swap the shown expansion for the template it came from
    pub fn restore_original(&mut self) {
        let original = if self.search.is_active() {
            self.search.current().map(|entry| entry.original.clone())
        } else {
            self.navigator.restore_original(&self.store)
        };

        if let Some(original) = original {
            self.input = original;
        }
    }

    /// Start searching; while already searching, show the next hit
    pub fn enter_search(&mut self) {
        if let Some(entry) = self.search.enter(&self.store) {
            self.input = entry.expanded.clone();
        }
    }

    /// Show the next hit; does nothing outside search mode
    pub fn cycle_search(&mut self) {
        if let Some(entry) = self.search.cycle(&self.store) {
            self.input = entry.expanded.clone();
        }
    }

    /// Leave search mode, keeping whatever is shown
    pub fn exit_search(&mut self) {
        self.search.exit();
    }

    /// Resolve and record the prompt text
    ///
    /// Blank input dispatches nothing. The prompt is cleared either way.
    pub fn accept(&mut self, context: &ResolutionContext<'_>) -> Option<Dispatch> {
        let original = std::mem::take(&mut self.input).trim().to_string();
        self.navigator.reset();
        self.search.exit();

        if original.is_empty() {
            return None;
        }

        let resolution = resolve(&original, context);
        log::debug!("Original command: {}", original);
        log::debug!("Processed command: {}", resolution.resolved_text);

        self.store.append(&original, &resolution.resolved_text);

        Some(Dispatch {
            command: resolution.resolved_text,
            auto_submit: self.auto_submit,
            warnings: resolution.warnings,
        })
    }

    /// Put a pasted command in the prompt, or run it right away
    pub fn paste(&mut self, input: PasteInput, context: &ResolutionContext<'_>) -> Option<Dispatch> {
        let request = input.into_request(context.active_document.as_ref());
        self.input = request.command;

        if request.auto_execute {
            self.accept(context)
        } else {
            None
        }
    }
}
