//! Backend factory for lifecycle tests.
//!
//! Seeds the selected store with the portfolio fixture.

use std::env;
use std::sync::Arc;

use kam_hub::storage::{DashboardStore, MockDashboardStore};
use kam_hub::test_utils::{portfolio_fixture, FixtureLoader};

/// Store backend type.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StoreBackend {
    Memory,
    Sqlite,
}

impl StoreBackend {
    pub fn from_env() -> Self {
        match env::var("STORAGE_BACKEND")
            .unwrap_or_else(|_| "memory".to_string())
            .to_lowercase()
            .as_str()
        {
            "sqlite" => StoreBackend::Sqlite,
            _ => StoreBackend::Memory,
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            StoreBackend::Memory => "memory",
            StoreBackend::Sqlite => "sqlite",
        }
    }

    /// Create a store seeded with the portfolio fixture.
    pub async fn seeded_store(&self) -> Arc<dyn DashboardStore> {
        match self {
            StoreBackend::Memory => {
                let store = MockDashboardStore::new();
                store
                    .load_fixture(&portfolio_fixture())
                    .await
                    .expect("Failed to seed memory store");
                Arc::new(store)
            }
            StoreBackend::Sqlite => Self::sqlite_store().await,
        }
    }

    #[cfg(feature = "sqlite")]
    async fn sqlite_store() -> Arc<dyn DashboardStore> {
        use kam_hub::storage::SqliteDashboardStore;
        use sqlx::sqlite::SqlitePoolOptions;

        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .connect("sqlite::memory:")
            .await
            .expect("Failed to create SQLite pool");
        let store = SqliteDashboardStore::new(pool);
        store.init().await.expect("Failed to create tables");
        store
            .load_fixture(&portfolio_fixture())
            .await
            .expect("Failed to seed SQLite store");
        Arc::new(store)
    }

    #[cfg(not(feature = "sqlite"))]
    async fn sqlite_store() -> Arc<dyn DashboardStore> {
        panic!("SQLite backend requested but the sqlite feature is not enabled")
    }
}
