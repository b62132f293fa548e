/// quick-term library
///
/// Turns command templates with `{placeholder}` tokens into ready-to-run
/// shell commands and keeps a searchable history of them.

pub mod command_input;
pub mod config;
pub mod core;
pub mod db;
pub mod error;
pub mod history;
pub mod session;
pub mod shell;

// Re-exports for convenience
pub use db::Database;
pub use error::{QuickTermError, Result};
