/// Data models for database entities

use crate::history::HistoryEntry;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// Key the command history is stored under
pub const HISTORY_KEY: &str = "quickTerm.commandHistory";

/// One persisted history entry
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct HistoryRow {
    pub id: i64,
    pub store_key: String,
    pub position: i64,
    pub original: String,
    pub expanded: String,
    pub recorded_at: String, // RFC 3339
}

impl From<HistoryRow> for HistoryEntry {
    fn from(row: HistoryRow) -> Self {
        HistoryEntry {
            original: row.original,
            expanded: row.expanded,
        }
    }
}

/// Database statistics
#[derive(Debug, Clone)]
pub struct DatabaseStats {
    pub total_entries: i64,
    pub stores: i64,
    pub last_saved: Option<String>,
    pub pool_size: u32,
    pub idle_connections: usize,
}
