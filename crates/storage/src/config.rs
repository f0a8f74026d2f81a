//! Storage configuration.

use serde::{Deserialize, Serialize};

/// URL of a private in-memory database.
pub const IN_MEMORY_URL: &str = "sqlite::memory:";

const DEFAULT_BUSY_TIMEOUT_MS: u64 = 5_000;

/// How to open the SQLite database.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    /// sqlx connection URL, e.g. `sqlite://hitos.db`
    pub database_url: String,
    /// Upper bound on pooled connections
    pub max_connections: u32,
    /// Create the database file when it does not exist
    pub create_if_missing: bool,
    /// How long a writer waits for a competing write lock, in milliseconds
    pub busy_timeout_ms: u64,
}

impl StorageConfig {
    /// Configuration for a throwaway in-memory database.
    ///
    /// Each SQLite connection to `:memory:` sees its own database, so the
    /// pool is pinned to a single connection.
    pub fn in_memory() -> Self {
        Self {
            database_url: IN_MEMORY_URL.to_string(),
            max_connections: 1,
            create_if_missing: true,
            busy_timeout_ms: DEFAULT_BUSY_TIMEOUT_MS,
        }
    }

    /// Configuration for a database URL with default pool settings.
    pub fn with_url(database_url: impl Into<String>) -> Self {
        Self {
            database_url: database_url.into(),
            ..Self::default()
        }
    }

    /// Whether the URL points at an in-memory database.
    pub fn is_in_memory(&self) -> bool {
        self.database_url.contains(":memory:") || self.database_url.contains("mode=memory")
    }
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            database_url: "sqlite://hitos.db".to_string(),
            max_connections: 5,
            create_if_missing: true,
            busy_timeout_ms: DEFAULT_BUSY_TIMEOUT_MS,
        }
    }
}
