//! Store configuration types.

use serde::Deserialize;

/// Store backend discriminator.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StoreType {
    /// In-memory store. Starts empty.
    #[default]
    Memory,
    Sqlite,
    Postgres,
    /// Hosted store over its REST endpoint.
    Rest,
}

/// Store configuration (discriminated union).
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct StoreConfig {
    /// Store type discriminator.
    #[serde(rename = "type")]
    pub store_type: StoreType,
    /// SQLite-specific configuration.
    pub sqlite: SqliteConfig,
    /// PostgreSQL-specific configuration.
    pub postgres: PostgresConfig,
    /// Hosted REST store configuration.
    pub rest: RestStoreConfig,
}

/// SQLite-specific configuration.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct SqliteConfig {
    /// Database file path. Created if missing.
    pub path: String,
}

impl Default for SqliteConfig {
    fn default() -> Self {
        Self {
            path: "data/kamhub.db".to_string(),
        }
    }
}

/// PostgreSQL-specific configuration.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct PostgresConfig {
    /// PostgreSQL connection URI.
    pub uri: String,
}

impl Default for PostgresConfig {
    fn default() -> Self {
        Self {
            uri: "postgres://localhost:5432/kamhub".to_string(),
        }
    }
}

/// Hosted REST store configuration.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct RestStoreConfig {
    /// Project base URL.
    pub url: String,
    /// Public API key.
    pub anon_key: String,
    /// Signed-in user's token, if any.
    pub access_token: Option<String>,
    /// Request timeout in seconds.
    pub timeout_secs: u64,
}

impl Default for RestStoreConfig {
    fn default() -> Self {
        Self {
            url: String::new(),
            anon_key: String::new(),
            access_token: None,
            timeout_secs: 30,
        }
    }
}
