/// Database module for quick-term
///
/// Persists the command history in SQLite using sqlx.

pub mod connection;
pub mod models;
pub mod queries;

pub use connection::Database;
pub use models::*;
