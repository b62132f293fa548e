/// Command history
///
/// The bounded store, the up/down browsing cursor and incremental search.

pub mod navigator;
pub mod searcher;
pub mod store;

pub use navigator::HistoryNavigator;
pub use searcher::{fuzzy, ScoredEntry, SearchSession};
pub use store::{HistoryEntry, HistoryStore, DEFAULT_CAPACITY};
