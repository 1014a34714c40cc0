//! Approach and conversion mutations.
//!
//! Each mutation updates the fact row for `(res_id, drive_id)`, then appends
//! an audit entry, then invalidates what is cached about the restaurant.
//! The two writes are sequential and not atomic: if the audit append fails
//! the update stays applied, the error is returned and the cache is left
//! alone. An update that matches no row is logged and the audit entry is
//! still written.

use std::sync::Arc;

use chrono::Utc;
use tracing::{error, info, warn};

use crate::cache::QueryCache;
use crate::error::Result;
use crate::model::{
    ActionType, ConversionTrackingEntry, DriveDataPatch, DriveId, KamEmail, NewConversionEntry,
    ResId,
};
use crate::storage::DashboardStore;

/// Write side of the dashboard.
#[derive(Clone)]
pub struct DriveMutations {
    store: Arc<dyn DashboardStore>,
    cache: Arc<QueryCache>,
}

impl DriveMutations {
    pub fn new(store: Arc<dyn DashboardStore>, cache: Arc<QueryCache>) -> Self {
        Self { store, cache }
    }

    /// Record that `kam_email` approached the restaurant for this drive.
    ///
    /// Idempotent on the fact row; every call appends an audit entry. On a
    /// converted row only `approached` is rewritten, so it stays converted.
    pub async fn mark_approached(
        &self,
        res_id: &ResId,
        drive_id: DriveId,
        kam_email: &KamEmail,
    ) -> Result<ConversionTrackingEntry> {
        self.record(ActionType::Approached, res_id, drive_id, kam_email, None)
            .await
    }

    /// Record a conversion. Sets both `converted_stepper` and `approached`.
    pub async fn mark_converted(
        &self,
        res_id: &ResId,
        drive_id: DriveId,
        kam_email: &KamEmail,
    ) -> Result<ConversionTrackingEntry> {
        self.record(ActionType::Converted, res_id, drive_id, kam_email, None)
            .await
    }

    /// Apply `action` and append its audit entry, with an optional note.
    pub async fn record(
        &self,
        action: ActionType,
        res_id: &ResId,
        drive_id: DriveId,
        kam_email: &KamEmail,
        notes: Option<String>,
    ) -> Result<ConversionTrackingEntry> {
        let now = Utc::now();
        let patch = DriveDataPatch::for_action(action, now);

        let updated = self
            .store
            .update_drive_data(res_id, drive_id, &patch)
            .await
            .inspect_err(|e| {
                warn!(
                    res_id = %res_id,
                    drive_id = %drive_id,
                    action = %action,
                    error = %e,
                    "drive_data update failed"
                )
            })?;
        if updated == 0 {
            warn!(res_id = %res_id, drive_id = %drive_id, action = %action, "No drive_data row matched");
        }

        let entry = NewConversionEntry {
            res_id: res_id.clone(),
            drive_id,
            kam_email: kam_email.clone(),
            action_type: action,
            action_date: Some(now.date_naive()),
            notes: notes.filter(|n| !n.trim().is_empty()),
        };
        let stored = self
            .store
            .insert_conversion(&entry)
            .await
            .inspect_err(|e| {
                error!(
                    res_id = %res_id,
                    drive_id = %drive_id,
                    action = %action,
                    error = %e,
                    "drive_data updated but conversion_tracking entry was not written"
                )
            })?;

        let invalidated = self.cache.invalidate_restaurant(res_id).await;
        info!(
            res_id = %res_id,
            drive_id = %drive_id,
            kam_email = %kam_email,
            action = %action,
            updated,
            invalidated,
            "Recorded drive action"
        );
        Ok(stored)
    }
}
