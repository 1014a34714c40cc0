//! Store backends for the four dashboard tables.
//!
//! Every backend implements [`DashboardStore`]:
//! - `RestDashboardStore`: hosted store over its REST dialect
//! - `SqliteDashboardStore` / `PostgresDashboardStore`: SQL via sea-query + sqlx
//! - `MockDashboardStore`: in-memory, with failure injection for tests

use std::sync::Arc;

use async_trait::async_trait;
use tracing::{error, info};

use crate::config::{StoreConfig, StoreType};
use crate::model::{
    ConversionTrackingEntry, Drive, DriveDataPatch, DriveId, KamEmail, NewConversionEntry, ResId,
    RestaurantWithDrives, RowError,
};

pub mod mock;
pub mod rest;
#[cfg(any(feature = "sqlite", feature = "postgres"))]
pub mod schema;
#[cfg(any(feature = "sqlite", feature = "postgres"))]
pub mod sql;

pub use mock::MockDashboardStore;
pub use rest::{RestConfig, RestDashboardStore};
#[cfg(feature = "postgres")]
pub use sql::postgres::PostgresDashboardStore;
#[cfg(feature = "sqlite")]
pub use sql::sqlite::SqliteDashboardStore;

/// Table names as used by every backend.
pub mod tables {
    pub const RESTAURANTS: &str = "restaurants";
    pub const DRIVES: &str = "drives";
    pub const DRIVE_DATA: &str = "drive_data";
    pub const CONVERSION_TRACKING: &str = "conversion_tracking";
}

/// Errors reported by a store backend.
#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    #[error("No rows in {table} for {key}")]
    NotFound { table: &'static str, key: String },

    #[cfg(any(feature = "sqlite", feature = "postgres"))]
    #[error("Database error: {0}")]
    Database(sqlx::Error),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Store returned {status}: {message}")]
    Api { status: u16, message: String },

    #[error("Decode error: {0}")]
    Decode(String),

    #[error("Invalid row: {0}")]
    InvalidRow(#[from] RowError),

    #[error("Store configuration error: {0}")]
    Config(String),

    #[error("Injected failure: {0}")]
    Injected(String),
}

#[cfg(any(feature = "sqlite", feature = "postgres"))]
impl From<sqlx::Error> for StorageError {
    fn from(e: sqlx::Error) -> Self {
        StorageError::Database(e)
    }
}

impl From<serde_json::Error> for StorageError {
    fn from(e: serde_json::Error) -> Self {
        StorageError::Decode(e.to_string())
    }
}

pub type Result<T> = std::result::Result<T, StorageError>;

/// Filtered reads and writes against the dashboard tables.
///
/// Restaurant reads take the caller explicitly: a restaurant is visible to
/// `viewer` when it is the assigned KAM or the team lead. Writes never
/// create or delete `drive_data` or `drives` rows.
#[async_trait]
pub trait DashboardStore: Send + Sync {
    /// Restaurants visible to `viewer`, ordered by name ascending, with
    /// nested drive data and drives. Zero rows is an empty list.
    async fn list_restaurants(&self, viewer: &KamEmail) -> Result<Vec<RestaurantWithDrives>>;

    /// One restaurant visible to `viewer`, or `NotFound`.
    async fn get_restaurant(&self, viewer: &KamEmail, res_id: &ResId)
        -> Result<RestaurantWithDrives>;

    /// Drives with status `active`, start date descending, null start dates last.
    async fn list_active_drives(&self) -> Result<Vec<Drive>>;

    /// One drive by id, or `NotFound`.
    async fn get_drive(&self, drive_id: DriveId) -> Result<Drive>;

    /// Apply `patch` to the fact row for `(res_id, drive_id)`.
    ///
    /// Returns the number of rows matched. Matching nothing is not an error
    /// at this level; callers decide.
    async fn update_drive_data(
        &self,
        res_id: &ResId,
        drive_id: DriveId,
        patch: &DriveDataPatch,
    ) -> Result<u64>;

    /// Append an audit entry and return it as stored.
    async fn insert_conversion(&self, entry: &NewConversionEntry)
        -> Result<ConversionTrackingEntry>;

    /// Audit entries for a restaurant, oldest first.
    async fn list_conversions(&self, res_id: &ResId) -> Result<Vec<ConversionTrackingEntry>>;
}

/// Initialize the store backend selected by configuration.
pub async fn init_storage(config: &StoreConfig) -> Result<Arc<dyn DashboardStore>> {
    info!(store_type = ?config.store_type, "Initializing dashboard store");

    match config.store_type {
        StoreType::Memory => Ok(Arc::new(MockDashboardStore::new())),
        StoreType::Rest => {
            let rest = RestConfig::from_store_config(config)?;
            Ok(Arc::new(RestDashboardStore::new(rest)?))
        }
        #[cfg(feature = "sqlite")]
        StoreType::Sqlite => {
            if let Some(parent) = std::path::Path::new(&config.sqlite.path).parent() {
                std::fs::create_dir_all(parent)
                    .map_err(|e| StorageError::Config(format!("{}: {e}", parent.display())))?;
            }
            let pool =
                sqlx::SqlitePool::connect(&format!("sqlite:{}?mode=rwc", config.sqlite.path))
                    .await?;
            let store = SqliteDashboardStore::new(pool);
            store.init().await?;
            Ok(Arc::new(store))
        }
        #[cfg(feature = "postgres")]
        StoreType::Postgres => {
            let pool = sqlx::PgPool::connect(&config.postgres.uri).await?;
            let store = PostgresDashboardStore::new(pool);
            store.init().await?;
            Ok(Arc::new(store))
        }
        #[allow(unreachable_patterns)]
        other => {
            error!(store_type = ?other, "Store type requested but its feature is not enabled");
            Err(StorageError::Config(format!(
                "{other:?} store requested but its feature is not enabled"
            )))
        }
    }
}
