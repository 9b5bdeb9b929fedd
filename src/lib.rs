// Spendwise - Core Library
// Expense tracking with a safe regex search engine.
// Exposes all modules for use in CLI, API server, and tests

pub mod config;
pub mod db;
pub mod error;
pub mod search;
pub mod stats;
pub mod transaction;

// Re-export commonly used types
pub use config::{DangerConfig, SearchConfig};
pub use db::{
    delete_transaction, get_all_transactions, get_transaction, insert_transaction,
    insert_transactions, load_csv, setup_database, update_transaction, verify_count,
};
pub use error::{DangerSignal, Rejection, SearchError};
pub use search::{
    escape_html, fallback_search, parse_search_query, ApprovedPattern, Clock, SearchEngine,
    SearchField, SearchOptions, SteppingClock, SystemClock,
};
pub use stats::{CategoryTotal, Summary};
pub use transaction::{Category, Transaction};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
