//! Test utilities and fixtures.
//!
//! Row builders and a fixture loader so tests can seed any backend with
//! the same restaurants, drives and fact rows.

use async_trait::async_trait;

use crate::model::{DriveDataRow, DriveRow, RestaurantRow};
use crate::storage::Result;

/// Rows to seed a store with.
#[derive(Debug, Clone, Default)]
pub struct Fixture {
    pub restaurants: Vec<RestaurantRow>,
    pub drives: Vec<DriveRow>,
    pub drive_data: Vec<DriveDataRow>,
}

impl Fixture {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn restaurant(mut self, row: RestaurantRow) -> Self {
        self.restaurants.push(row);
        self
    }

    pub fn drive(mut self, row: DriveRow) -> Self {
        self.drives.push(row);
        self
    }

    pub fn drive_data(mut self, row: DriveDataRow) -> Self {
        self.drive_data.push(row);
        self
    }
}

/// Seeds a backend with fixture rows.
#[async_trait]
pub trait FixtureLoader: Send + Sync {
    async fn load_fixture(&self, fixture: &Fixture) -> Result<()>;
}

/// Restaurant owned by `kam_email`.
pub fn make_restaurant(res_id: &str, res_name: &str, kam_email: &str) -> RestaurantRow {
    RestaurantRow {
        res_id: res_id.to_string(),
        res_name: res_name.to_string(),
        kam_name: Some("Test KAM".to_string()),
        kam_email: Some(kam_email.to_string()),
        tl_email: Some("lead@zomato.com".to_string()),
        cuisine: Some("North Indian".to_string()),
        locality: Some("Indiranagar".to_string()),
        account_type: Some("Key".to_string()),
        sept_ov: Some(125000.0),
        created_at: Some("2025-09-01T00:00:00+00:00".to_string()),
        ..Default::default()
    }
}

/// Drive with the given status and optional start date (`YYYY-MM-DD`).
pub fn make_drive(id: i64, drive_name: &str, status: &str, start_date: Option<&str>) -> DriveRow {
    DriveRow {
        id,
        drive_name: drive_name.to_string(),
        drive_type: Some("promo".to_string()),
        city: Some("Bengaluru".to_string()),
        start_date: start_date.map(str::to_string),
        end_date: None,
        status: Some(status.to_string()),
        created_at: None,
    }
}

/// Fresh, not yet approached fact row.
pub fn make_drive_data(id: i64, res_id: &str, drive_id: i64) -> DriveDataRow {
    DriveDataRow {
        id,
        res_id: Some(res_id.to_string()),
        drive_id: Some(drive_id),
        la: Some(0.5),
        mm: Some(0.3),
        um: Some(0.2),
        la_base_code_suggested: Some("LA40".to_string()),
        la_step1: Some("40% upto 80".to_string()),
        approached: Some(false),
        converted_stepper: Some(false),
        priority_score: Some(0.8),
        ..Default::default()
    }
}

/// Two restaurants for `a@x.com`, one for someone else, three active
/// drives (one without a start date) and one inactive drive.
pub fn portfolio_fixture() -> Fixture {
    Fixture::new()
        .restaurant(make_restaurant("R1", "Biryani House", "a@x.com"))
        .restaurant(make_restaurant("R2", "Annapurna", "a@x.com"))
        .restaurant(make_restaurant("R3", "Cafe Other", "b@x.com"))
        .drive(make_drive(5, "NCN", "active", Some("2025-01-01")))
        .drive(make_drive(6, "N2R", "active", Some("2025-03-01")))
        .drive(make_drive(7, "MRP", "active", Some("2025-02-01")))
        .drive(make_drive(8, "Legacy", "completed", Some("2024-06-01")))
        .drive(make_drive(9, "Draft", "active", None))
        .drive_data(make_drive_data(1, "R1", 5))
        .drive_data(make_drive_data(2, "R1", 6))
        .drive_data(make_drive_data(3, "R2", 5))
        .drive_data(make_drive_data(4, "R3", 5))
}
