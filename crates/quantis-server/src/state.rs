//! Shared application state for the Quantis server.

use std::path::PathBuf;

use quantis_core::config::Config;
use quantis_core::storage::DbPool;

/// Shared application state accessible by all route handlers.
pub struct AppState {
    /// SQLite connection pool.
    pub db: DbPool,
    /// Loaded configuration (LLM, mastery, pool, diversity, phase settings).
    pub config: Config,
    /// Path to the configuration file.
    pub config_path: PathBuf,
    /// Local bearer token for API authentication.
    pub api_token: String,
}
