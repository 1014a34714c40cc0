//! In-memory dashboard store.
//!
//! Keeps the four tables as flat rows and answers queries the way the SQL
//! backends do. Failure injection and call counters make it the store of
//! choice for query, cache and mutation tests.

use std::sync::atomic::{AtomicUsize, Ordering};

use async_trait::async_trait;
use chrono::Utc;
use tokio::sync::RwLock;

use super::{tables, DashboardStore, Result, StorageError};
use crate::model::rows::{attach_drive_data, format_timestamp};
use crate::model::{
    ConversionRow, ConversionTrackingEntry, Drive, DriveDataPatch, DriveDataRow, DriveId,
    DriveRow, KamEmail, NewConversionEntry, NewConversionRow, ResId, RestaurantRow,
    RestaurantWithDrives, ACTIVE_DRIVE_STATUS,
};

/// Mock store that keeps rows in memory.
#[derive(Default)]
pub struct MockDashboardStore {
    restaurants: RwLock<Vec<RestaurantRow>>,
    drives: RwLock<Vec<DriveRow>>,
    drive_data: RwLock<Vec<DriveDataRow>>,
    conversions: RwLock<Vec<ConversionRow>>,
    fail_on_read: RwLock<bool>,
    fail_on_update: RwLock<bool>,
    fail_on_insert: RwLock<bool>,
    reads: AtomicUsize,
    updates: AtomicUsize,
    inserts: AtomicUsize,
}

impl MockDashboardStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn set_fail_on_read(&self, fail: bool) {
        *self.fail_on_read.write().await = fail;
    }

    pub async fn set_fail_on_update(&self, fail: bool) {
        *self.fail_on_update.write().await = fail;
    }

    pub async fn set_fail_on_insert(&self, fail: bool) {
        *self.fail_on_insert.write().await = fail;
    }

    /// Number of read operations served.
    pub fn read_count(&self) -> usize {
        self.reads.load(Ordering::SeqCst)
    }

    /// Number of `update_drive_data` calls attempted.
    pub fn update_count(&self) -> usize {
        self.updates.load(Ordering::SeqCst)
    }

    /// Number of `insert_conversion` calls attempted.
    pub fn insert_count(&self) -> usize {
        self.inserts.load(Ordering::SeqCst)
    }

    pub async fn insert_restaurant_row(&self, row: RestaurantRow) {
        self.restaurants.write().await.push(row);
    }

    pub async fn insert_drive_row(&self, row: DriveRow) {
        self.drives.write().await.push(row);
    }

    pub async fn insert_drive_data_row(&self, row: DriveDataRow) {
        self.drive_data.write().await.push(row);
    }

    /// Raw fact row for a `(res_id, drive_id)` pair.
    pub async fn drive_data_row(&self, res_id: &str, drive_id: i64) -> Option<DriveDataRow> {
        self.drive_data
            .read()
            .await
            .iter()
            .find(|d| d.res_id.as_deref() == Some(res_id) && d.drive_id == Some(drive_id))
            .cloned()
    }

    /// Every audit row, in insertion order.
    pub async fn conversion_rows(&self) -> Vec<ConversionRow> {
        self.conversions.read().await.clone()
    }

    async fn check_read(&self) -> Result<()> {
        self.reads.fetch_add(1, Ordering::SeqCst);
        if *self.fail_on_read.read().await {
            return Err(StorageError::Injected("read failure".to_string()));
        }
        Ok(())
    }

    async fn visible_restaurants(
        &self,
        viewer: &KamEmail,
        res_id: Option<&ResId>,
    ) -> Vec<RestaurantRow> {
        let viewer = Some(viewer.as_str());
        let mut rows: Vec<RestaurantRow> = self
            .restaurants
            .read()
            .await
            .iter()
            .filter(|r| r.kam_email.as_deref() == viewer || r.tl_email.as_deref() == viewer)
            .filter(|r| res_id.map_or(true, |id| r.res_id == id.as_str()))
            .cloned()
            .collect();
        rows.sort_by(|a, b| {
            a.res_name
                .cmp(&b.res_name)
                .then_with(|| a.res_id.cmp(&b.res_id))
        });

        let res_ids: Vec<&str> = rows.iter().map(|r| r.res_id.as_str()).collect();
        let mut drive_data: Vec<DriveDataRow> = self
            .drive_data
            .read()
            .await
            .iter()
            .filter(|d| d.res_id.as_deref().is_some_and(|id| res_ids.contains(&id)))
            .cloned()
            .collect();
        drive_data.sort_by_key(|d| d.id);

        let drives = self.drives.read().await;
        attach_drive_data(&mut rows, drive_data, &drives);
        rows
    }
}

#[async_trait]
impl DashboardStore for MockDashboardStore {
    async fn list_restaurants(&self, viewer: &KamEmail) -> Result<Vec<RestaurantWithDrives>> {
        self.check_read().await?;
        let rows = self.visible_restaurants(viewer, None).await;
        Ok(rows
            .iter()
            .map(RestaurantWithDrives::assemble)
            .collect::<std::result::Result<Vec<_>, _>>()?)
    }

    async fn get_restaurant(
        &self,
        viewer: &KamEmail,
        res_id: &ResId,
    ) -> Result<RestaurantWithDrives> {
        self.check_read().await?;
        let rows = self.visible_restaurants(viewer, Some(res_id)).await;
        match rows.first() {
            Some(row) => Ok(RestaurantWithDrives::assemble(row)?),
            None => Err(StorageError::NotFound {
                table: tables::RESTAURANTS,
                key: res_id.to_string(),
            }),
        }
    }

    async fn list_active_drives(&self) -> Result<Vec<Drive>> {
        self.check_read().await?;
        let mut rows: Vec<DriveRow> = self
            .drives
            .read()
            .await
            .iter()
            .filter(|d| d.status.as_deref() == Some(ACTIVE_DRIVE_STATUS))
            .cloned()
            .collect();
        // Start date descending with nulls last, then id descending.
        rows.sort_by(|a, b| match (&a.start_date, &b.start_date) {
            (Some(x), Some(y)) => y.cmp(x).then_with(|| b.id.cmp(&a.id)),
            (Some(_), None) => std::cmp::Ordering::Less,
            (None, Some(_)) => std::cmp::Ordering::Greater,
            (None, None) => b.id.cmp(&a.id),
        });

        let mut drives = Vec::with_capacity(rows.len());
        for row in &rows {
            drives.push(Drive::try_from(row)?);
        }
        Ok(drives)
    }

    async fn get_drive(&self, drive_id: DriveId) -> Result<Drive> {
        self.check_read().await?;
        let drives = self.drives.read().await;
        match drives.iter().find(|d| d.id == drive_id.get()) {
            Some(row) => Ok(Drive::try_from(row)?),
            None => Err(StorageError::NotFound {
                table: tables::DRIVES,
                key: drive_id.to_string(),
            }),
        }
    }

    async fn update_drive_data(
        &self,
        res_id: &ResId,
        drive_id: DriveId,
        patch: &DriveDataPatch,
    ) -> Result<u64> {
        self.updates.fetch_add(1, Ordering::SeqCst);
        if *self.fail_on_update.read().await {
            return Err(StorageError::Injected("update failure".to_string()));
        }

        let mut matched = 0;
        let mut rows = self.drive_data.write().await;
        for row in rows.iter_mut().filter(|d| {
            d.res_id.as_deref() == Some(res_id.as_str()) && d.drive_id == Some(drive_id.get())
        }) {
            if let Some(approached) = patch.approached {
                row.approached = Some(approached);
            }
            if let Some(converted) = patch.converted_stepper {
                row.converted_stepper = Some(converted);
            }
            row.last_updated = Some(format_timestamp(patch.last_updated));
            matched += 1;
        }
        Ok(matched)
    }

    async fn insert_conversion(
        &self,
        entry: &NewConversionEntry,
    ) -> Result<ConversionTrackingEntry> {
        self.inserts.fetch_add(1, Ordering::SeqCst);
        if *self.fail_on_insert.read().await {
            return Err(StorageError::Injected("insert failure".to_string()));
        }

        let new = NewConversionRow::from(entry);
        let mut rows = self.conversions.write().await;
        let row = ConversionRow {
            id: rows.len() as i64 + 1,
            res_id: Some(new.res_id),
            drive_id: Some(new.drive_id),
            kam_email: new.kam_email,
            action_type: new.action_type,
            action_date: new.action_date,
            notes: new.notes,
            created_at: Some(format_timestamp(Utc::now())),
        };
        let stored = ConversionTrackingEntry::try_from(&row)?;
        rows.push(row);
        Ok(stored)
    }

    async fn list_conversions(&self, res_id: &ResId) -> Result<Vec<ConversionTrackingEntry>> {
        self.check_read().await?;
        let rows = self.conversions.read().await;
        let mut entries = Vec::new();
        for row in rows
            .iter()
            .filter(|r| r.res_id.as_deref() == Some(res_id.as_str()))
        {
            entries.push(ConversionTrackingEntry::try_from(row)?);
        }
        Ok(entries)
    }
}

#[cfg(any(test, feature = "test-utils"))]
#[async_trait]
impl crate::test_utils::FixtureLoader for MockDashboardStore {
    async fn load_fixture(&self, fixture: &crate::test_utils::Fixture) -> Result<()> {
        for row in &fixture.restaurants {
            self.insert_restaurant_row(row.clone()).await;
        }
        for row in &fixture.drives {
            self.insert_drive_row(row.clone()).await;
        }
        for row in &fixture.drive_data {
            self.insert_drive_data_row(row.clone()).await;
        }
        Ok(())
    }
}
