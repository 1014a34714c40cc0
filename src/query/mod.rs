//! Cache-aware read operations.
//!
//! Each read serves a fresh cache entry when one exists, otherwise asks the
//! store and caches the result. Failures are returned as-is and never cached.
//! A result fetched while an invalidation ran is cached stale.

use std::sync::Arc;

use tracing::{debug, warn};

use crate::cache::{CachedValue, QueryCache, QueryKey};
use crate::error::Result;
use crate::model::{ConversionTrackingEntry, Drive, DriveId, KamEmail, ResId, RestaurantWithDrives};
use crate::storage::DashboardStore;

/// Read side of the dashboard for one caller.
#[derive(Clone)]
pub struct DashboardQueries {
    store: Arc<dyn DashboardStore>,
    cache: Arc<QueryCache>,
    viewer: KamEmail,
}

impl DashboardQueries {
    pub fn new(store: Arc<dyn DashboardStore>, cache: Arc<QueryCache>, viewer: KamEmail) -> Self {
        Self {
            store,
            cache,
            viewer,
        }
    }

    pub fn viewer(&self) -> &KamEmail {
        &self.viewer
    }

    /// Restaurants visible to the caller, ordered by name.
    pub async fn list_restaurants(&self) -> Result<Vec<RestaurantWithDrives>> {
        let key = QueryKey::Restaurants {
            viewer: self.viewer.clone(),
        };
        if let Some(CachedValue::Restaurants(restaurants)) = self.cache.get(&key).await {
            debug!(viewer = %self.viewer, "Restaurant list served from cache");
            return Ok(restaurants);
        }

        let generation = self.cache.generation();
        let restaurants = self
            .store
            .list_restaurants(&self.viewer)
            .await
            .inspect_err(|e| warn!(viewer = %self.viewer, error = %e, "Failed to list restaurants"))?;
        self.cache
            .put_fetched(key, CachedValue::Restaurants(restaurants.clone()), generation)
            .await;
        Ok(restaurants)
    }

    /// One restaurant visible to the caller.
    pub async fn get_restaurant(&self, res_id: &ResId) -> Result<RestaurantWithDrives> {
        let key = QueryKey::Restaurant {
            viewer: self.viewer.clone(),
            res_id: res_id.clone(),
        };
        if let Some(CachedValue::Restaurant(restaurant)) = self.cache.get(&key).await {
            debug!(res_id = %res_id, "Restaurant served from cache");
            return Ok(restaurant);
        }

        let generation = self.cache.generation();
        let restaurant = self
            .store
            .get_restaurant(&self.viewer, res_id)
            .await
            .inspect_err(|e| warn!(res_id = %res_id, error = %e, "Failed to get restaurant"))?;
        self.cache
            .put_fetched(key, CachedValue::Restaurant(restaurant.clone()), generation)
            .await;
        Ok(restaurant)
    }

    /// Active drives, most recent start first.
    pub async fn list_active_drives(&self) -> Result<Vec<Drive>> {
        let key = QueryKey::ActiveDrives;
        if let Some(CachedValue::Drives(drives)) = self.cache.get(&key).await {
            return Ok(drives);
        }

        let generation = self.cache.generation();
        let drives = self
            .store
            .list_active_drives()
            .await
            .inspect_err(|e| warn!(error = %e, "Failed to list active drives"))?;
        self.cache
            .put_fetched(key, CachedValue::Drives(drives.clone()), generation)
            .await;
        Ok(drives)
    }

    pub async fn get_drive(&self, drive_id: DriveId) -> Result<Drive> {
        let key = QueryKey::Drive(drive_id);
        if let Some(CachedValue::Drive(drive)) = self.cache.get(&key).await {
            return Ok(drive);
        }

        let generation = self.cache.generation();
        let drive = self
            .store
            .get_drive(drive_id)
            .await
            .inspect_err(|e| warn!(drive_id = %drive_id, error = %e, "Failed to get drive"))?;
        self.cache
            .put_fetched(key, CachedValue::Drive(drive.clone()), generation)
            .await;
        Ok(drive)
    }

    /// Audit entries for a restaurant, oldest first.
    pub async fn conversion_history(&self, res_id: &ResId) -> Result<Vec<ConversionTrackingEntry>> {
        let key = QueryKey::ConversionHistory(res_id.clone());
        if let Some(CachedValue::Conversions(entries)) = self.cache.get(&key).await {
            return Ok(entries);
        }

        let generation = self.cache.generation();
        let entries = self
            .store
            .list_conversions(res_id)
            .await
            .inspect_err(|e| warn!(res_id = %res_id, error = %e, "Failed to list conversions"))?;
        self.cache
            .put_fetched(key, CachedValue::Conversions(entries.clone()), generation)
            .await;
        Ok(entries)
    }
}
