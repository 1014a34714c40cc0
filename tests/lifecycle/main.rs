//! Lifecycle tests for the dashboard using Cucumber.
//!
//! Select a backend via environment variable:
//!
//! ```bash
//! # In-memory store (default)
//! cargo test --test lifecycle --features test-utils
//!
//! # SQLite
//! STORAGE_BACKEND=sqlite cargo test --test lifecycle --features test-utils,sqlite
//! ```

mod backend;
mod steps;

use cucumber::World;
use steps::LifecycleWorld;

#[tokio::main]
async fn main() {
    println!("\n=== Running Drive Lifecycle Tests ===\n");
    LifecycleWorld::cucumber()
        .fail_on_skipped()
        .run_and_exit("tests/lifecycle/features/drive_lifecycle.feature")
        .await;
}
