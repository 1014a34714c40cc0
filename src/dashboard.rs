//! Composition root.
//!
//! `Dashboard` owns the store handle, the query cache, the notes file and
//! the signed-in caller, and exposes the query and mutation layers bound to
//! that caller.

use std::sync::Arc;

use tokio::sync::broadcast;
use tracing::info;

use crate::auth::{EmailPolicy, Session};
use crate::cache::{QueryCache, QueryKey};
use crate::config::Config;
use crate::error::Result;
use crate::model::{ConversionTrackingEntry, Drive, DriveId, ResId, RestaurantWithDrives};
use crate::mutation::DriveMutations;
use crate::notes::NotesStore;
use crate::portfolio::{summarize, PortfolioSummary};
use crate::query::DashboardQueries;
use crate::storage::{init_storage, DashboardStore};

/// A signed-in dashboard.
pub struct Dashboard {
    session: Session,
    cache: Arc<QueryCache>,
    queries: DashboardQueries,
    mutations: DriveMutations,
    notes: NotesStore,
}

impl Dashboard {
    /// Authorize `email` against the configured policy and connect the
    /// configured store.
    pub async fn connect(config: &Config, email: &str, name: Option<&str>) -> Result<Self> {
        let session = EmailPolicy::from(&config.auth).authorize(email, name)?;
        let store = init_storage(&config.store).await?;

        info!(
            email = %session.email,
            store_type = ?config.store.store_type,
            "Dashboard connected"
        );
        Ok(Self::new(
            store,
            session,
            QueryCache::new(config.cache.stale_after()),
            NotesStore::new(&config.notes.path),
        ))
    }

    pub fn new(
        store: Arc<dyn DashboardStore>,
        session: Session,
        cache: QueryCache,
        notes: NotesStore,
    ) -> Self {
        let cache = Arc::new(cache);
        Self {
            queries: DashboardQueries::new(store.clone(), cache.clone(), session.email.clone()),
            mutations: DriveMutations::new(store, cache.clone()),
            session,
            cache,
            notes,
        }
    }

    pub fn session(&self) -> &Session {
        &self.session
    }

    pub fn queries(&self) -> &DashboardQueries {
        &self.queries
    }

    pub fn mutations(&self) -> &DriveMutations {
        &self.mutations
    }

    pub fn cache(&self) -> &QueryCache {
        &self.cache
    }

    pub async fn list_restaurants(&self) -> Result<Vec<RestaurantWithDrives>> {
        self.queries.list_restaurants().await
    }

    pub async fn get_restaurant(&self, res_id: &ResId) -> Result<RestaurantWithDrives> {
        self.queries.get_restaurant(res_id).await
    }

    pub async fn list_active_drives(&self) -> Result<Vec<Drive>> {
        self.queries.list_active_drives().await
    }

    pub async fn get_drive(&self, drive_id: DriveId) -> Result<Drive> {
        self.queries.get_drive(drive_id).await
    }

    pub async fn conversion_history(&self, res_id: &ResId) -> Result<Vec<ConversionTrackingEntry>> {
        self.queries.conversion_history(res_id).await
    }

    /// Mark approached as the signed-in caller.
    pub async fn mark_approached(
        &self,
        res_id: &ResId,
        drive_id: DriveId,
    ) -> Result<ConversionTrackingEntry> {
        self.mutations
            .mark_approached(res_id, drive_id, &self.session.email)
            .await
    }

    /// Mark converted as the signed-in caller.
    pub async fn mark_converted(
        &self,
        res_id: &ResId,
        drive_id: DriveId,
    ) -> Result<ConversionTrackingEntry> {
        self.mutations
            .mark_converted(res_id, drive_id, &self.session.email)
            .await
    }

    /// Funnel rollup of the caller's portfolio.
    pub async fn summary(&self) -> Result<PortfolioSummary> {
        Ok(summarize(&self.list_restaurants().await?))
    }

    pub async fn note(&self, res_id: &ResId) -> Result<Option<String>> {
        Ok(self.notes.load(res_id).await?)
    }

    pub async fn save_note(&self, res_id: &ResId, note: &str) -> Result<()> {
        Ok(self.notes.save(res_id, note).await?)
    }

    /// Keys invalidated from now on.
    pub fn subscribe(&self) -> broadcast::Receiver<QueryKey> {
        self.cache.subscribe()
    }
}
