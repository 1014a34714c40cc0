//! kam-hub - restaurant portfolio and promotional drive data access
//!
//! Query and mutation layers for key account managers tracking
//! promotional drives across their restaurant portfolio, over a pluggable
//! store (hosted REST, SQLite, PostgreSQL or in-memory) with an explicit,
//! invalidation-driven query cache.

pub mod auth;
pub mod cache;
pub mod config;
pub mod dashboard;
pub mod error;
pub mod model;
pub mod mutation;
pub mod notes;
pub mod portfolio;
pub mod query;
pub mod storage;
pub mod utils;

#[cfg(any(test, feature = "test-utils"))]
pub mod test_utils;

pub use dashboard::Dashboard;
pub use error::{Error, Result};
