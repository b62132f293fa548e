/// SQL query functions for history persistence
///
/// A store is saved as a whole: the rows for its key are replaced inside one
/// transaction so a crash never leaves a half-written history behind.

use crate::db::models::*;
use crate::db::Database;
use crate::error::{QuickTermError, Result};
use crate::history::HistoryEntry;
use chrono::Utc;
use std::collections::HashSet;

impl Database {
    /// Load the entries stored under `key`, oldest first
    pub async fn load_history(&self, key: &str) -> Result<Vec<HistoryEntry>> {
        let rows = sqlx::query_as::<_, HistoryRow>(
            "SELECT * FROM command_history WHERE store_key = ? ORDER BY position ASC",
        )
        .bind(key)
        .fetch_all(self.pool())
        .await
        .map_err(|e| persistence_error("load", key, e))?;

        Ok(rows.into_iter().map(HistoryEntry::from).collect())
    }

    /// Replace everything stored under `key` with `entries`
    ///
    /// Fails without touching the stored rows if two entries share an original.
    pub async fn save_history(&self, key: &str, entries: &[HistoryEntry]) -> Result<()> {
        let mut seen = HashSet::new();
        if let Some(dup) = entries.iter().find(|entry| !seen.insert(entry.original.as_str())) {
            return Err(QuickTermError::Persistence(format!(
                "refusing to save '{}': '{}' is recorded twice",
                key, dup.original
            )));
        }

        self.replace_rows(key, entries)
            .await
            .map_err(|e| persistence_error("save", key, e))?;

        log::debug!("Saved {} history entries under '{}'", entries.len(), key);
        Ok(())
    }

    async fn replace_rows(&self, key: &str, entries: &[HistoryEntry]) -> sqlx::Result<()> {
        let recorded_at = Utc::now().to_rfc3339();
        let mut tx = self.pool().begin().await?;

        sqlx::query("DELETE FROM command_history WHERE store_key = ?")
            .bind(key)
            .execute(&mut *tx)
            .await?;

        for (position, entry) in entries.iter().enumerate() {
            sqlx::query(
                r#"
                INSERT INTO command_history (store_key, position, original, expanded, recorded_at)
                VALUES (?, ?, ?, ?, ?)
                "#,
            )
            .bind(key)
            .bind(position as i64)
            .bind(&entry.original)
            .bind(&entry.expanded)
            .bind(&recorded_at)
            .execute(&mut *tx)
            .await?;
        }

        tx.commit().await
    }

    /// Remove everything stored under `key`, returning how many rows went
    pub async fn clear_history(&self, key: &str) -> Result<u64> {
        let result = sqlx::query("DELETE FROM command_history WHERE store_key = ?")
            .bind(key)
            .execute(self.pool())
            .await?;

        Ok(result.rows_affected())
    }

    /// Get database statistics
    pub async fn stats(&self) -> Result<DatabaseStats> {
        let (total_entries, stores, last_saved): (i64, i64, Option<String>) = sqlx::query_as(
            "SELECT COUNT(*), COUNT(DISTINCT store_key), MAX(recorded_at) FROM command_history",
        )
        .fetch_one(self.pool())
        .await?;

        Ok(DatabaseStats {
            total_entries,
            stores,
            last_saved,
            pool_size: self.pool().size(),
            idle_connections: self.pool().num_idle(),
        })
    }
}

fn persistence_error(action: &str, key: &str, err: sqlx::Error) -> QuickTermError {
    QuickTermError::Persistence(format!("could not {} '{}': {}", action, key, err))
}
