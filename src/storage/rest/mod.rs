//! Hosted store reached over its REST dialect.
//!
//! Reads embed related tables with `select=*,drive_data(*,drives(*))`, so a
//! restaurant comes back with its fact rows and their drives in one request.
//! Filters use the `column=op.value` form. Updates ask for the affected rows
//! back with `Prefer: return=representation` to count them; audit inserts
//! use `return=minimal` since the caller may not be allowed to read the log.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, RequestBuilder, Response};
use serde::de::DeserializeOwned;
use serde::Serialize;
use tracing::{debug, error};

use super::{tables, DashboardStore, Result, StorageError};
use crate::config::StoreConfig;
use crate::model::rows::format_timestamp;
use crate::model::{
    ConversionRow, ConversionTrackingEntry, Drive, DriveDataPatch, DriveDataRow, DriveId,
    DriveRow, KamEmail, NewConversionEntry, NewConversionRow, ResId, RestaurantRow,
    RestaurantWithDrives, ACTIVE_DRIVE_STATUS,
};

/// Embedded selection returning restaurants with fact rows and drives.
pub const RESTAURANT_SELECT: &str = "*,drive_data(*,drives(*))";

/// Connection settings for the hosted store.
#[derive(Debug, Clone)]
pub struct RestConfig {
    /// Project base URL, without the `/rest/v1` suffix.
    pub url: String,

    /// Public API key sent as `apikey` on every request.
    pub anon_key: String,

    /// Signed-in user's token. Falls back to the anon key when absent.
    pub access_token: Option<String>,

    /// Request timeout.
    pub timeout: Duration,
}

impl Default for RestConfig {
    fn default() -> Self {
        Self {
            url: String::new(),
            anon_key: String::new(),
            access_token: None,
            timeout: Duration::from_secs(30),
        }
    }
}

impl RestConfig {
    /// Build from the `store.rest` configuration section.
    pub fn from_store_config(config: &StoreConfig) -> Result<Self> {
        let rest = &config.rest;
        if rest.url.trim().is_empty() {
            return Err(StorageError::Config("store.rest.url is not set".to_string()));
        }
        if rest.anon_key.trim().is_empty() {
            return Err(StorageError::Config(
                "store.rest.anon_key is not set".to_string(),
            ));
        }

        Ok(Self {
            url: rest.url.clone(),
            anon_key: rest.anon_key.clone(),
            access_token: rest.access_token.clone().filter(|t| !t.is_empty()),
            timeout: Duration::from_secs(rest.timeout_secs),
        })
    }

    /// Set the signed-in user's token.
    pub fn with_access_token(mut self, token: impl Into<String>) -> Self {
        self.access_token = Some(token.into());
        self
    }

    /// Set the request timeout.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Endpoint for a table.
    pub fn table_url(&self, table: &str) -> String {
        format!("{}/rest/v1/{}", self.url.trim_end_matches('/'), table)
    }

    fn bearer(&self) -> &str {
        self.access_token.as_deref().unwrap_or(&self.anon_key)
    }
}

/// Quote a value for use inside an `or=(...)` list.
fn quote(value: &str) -> String {
    let escaped = value.replace('\\', "\\\\").replace('"', "\\\"");
    format!("\"{escaped}\"")
}

fn eq(value: impl std::fmt::Display) -> String {
    format!("eq.{value}")
}

/// Query parameters for restaurants visible to `viewer`.
pub fn restaurants_params(viewer: &KamEmail, res_id: Option<&ResId>) -> Vec<(String, String)> {
    let viewer = quote(viewer.as_str());
    let mut params = vec![
        ("select".to_string(), RESTAURANT_SELECT.to_string()),
        (
            "or".to_string(),
            format!("(kam_email.eq.{viewer},tl_email.eq.{viewer})"),
        ),
    ];
    if let Some(res_id) = res_id {
        params.push(("res_id".to_string(), eq(res_id)));
    }
    params.push(("order".to_string(), "res_name.asc,res_id.asc".to_string()));
    params.push(("drive_data.order".to_string(), "id.asc".to_string()));
    params
}

/// Query parameters for the active drives listing.
pub fn active_drives_params() -> Vec<(String, String)> {
    vec![
        ("select".to_string(), "*".to_string()),
        ("status".to_string(), eq(ACTIVE_DRIVE_STATUS)),
        (
            "order".to_string(),
            "start_date.desc.nullslast,id.desc".to_string(),
        ),
    ]
}

/// Query parameters selecting one fact row.
pub fn drive_data_filter(res_id: &ResId, drive_id: DriveId) -> Vec<(String, String)> {
    vec![
        ("res_id".to_string(), eq(res_id)),
        ("drive_id".to_string(), eq(drive_id)),
    ]
}

/// PATCH body for a fact row. Unset flags are omitted.
#[derive(Debug, Serialize)]
pub struct DriveDataPatchBody {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub approached: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub converted_stepper: Option<bool>,
    pub last_updated: String,
}

impl From<&DriveDataPatch> for DriveDataPatchBody {
    fn from(patch: &DriveDataPatch) -> Self {
        Self {
            approached: patch.approached,
            converted_stepper: patch.converted_stepper,
            last_updated: format_timestamp(patch.last_updated),
        }
    }
}

/// Dashboard store backed by the hosted REST endpoint.
pub struct RestDashboardStore {
    client: Client,
    config: RestConfig,
}

impl RestDashboardStore {
    pub fn new(config: RestConfig) -> Result<Self> {
        if config.url.is_empty() {
            return Err(StorageError::Config("REST url not configured".to_string()));
        }

        let client = Client::builder().timeout(config.timeout).build()?;

        Ok(Self { client, config })
    }

    pub fn config(&self) -> &RestConfig {
        &self.config
    }

    fn authorize(&self, request: RequestBuilder) -> RequestBuilder {
        request
            .header("apikey", &self.config.anon_key)
            .header("Authorization", format!("Bearer {}", self.config.bearer()))
    }

    fn get(&self, table: &str, params: &[(String, String)]) -> RequestBuilder {
        self.authorize(self.client.get(self.config.table_url(table)).query(params))
    }

    /// Fail on non-success status, keeping the body as the message.
    async fn check(&self, table: &str, response: Response) -> Result<Response> {
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }

        let body = response.text().await.unwrap_or_default();
        error!(table, status = %status, body = %body, "REST store request failed");
        Err(StorageError::Api {
            status: status.as_u16(),
            message: body.chars().take(200).collect(),
        })
    }

    async fn fetch<T: DeserializeOwned>(&self, table: &str, request: RequestBuilder) -> Result<T> {
        let response = self.check(table, request.send().await?).await?;
        let body = response.bytes().await?;
        Ok(serde_json::from_slice(&body)?)
    }
}

#[async_trait]
impl DashboardStore for RestDashboardStore {
    async fn list_restaurants(&self, viewer: &KamEmail) -> Result<Vec<RestaurantWithDrives>> {
        let params = restaurants_params(viewer, None);
        let rows: Vec<RestaurantRow> = self
            .fetch(tables::RESTAURANTS, self.get(tables::RESTAURANTS, &params))
            .await?;

        debug!(viewer = %viewer, count = rows.len(), "Listed restaurants");
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
        let params = restaurants_params(viewer, Some(res_id));
        let rows: Vec<RestaurantRow> = self
            .fetch(tables::RESTAURANTS, self.get(tables::RESTAURANTS, &params))
            .await?;

        match rows.first() {
            Some(row) => Ok(RestaurantWithDrives::assemble(row)?),
            None => Err(StorageError::NotFound {
                table: tables::RESTAURANTS,
                key: res_id.to_string(),
            }),
        }
    }

    async fn list_active_drives(&self) -> Result<Vec<Drive>> {
        let rows: Vec<DriveRow> = self
            .fetch(tables::DRIVES, self.get(tables::DRIVES, &active_drives_params()))
            .await?;

        let mut drives = Vec::with_capacity(rows.len());
        for row in &rows {
            drives.push(Drive::try_from(row)?);
        }
        Ok(drives)
    }

    async fn get_drive(&self, drive_id: DriveId) -> Result<Drive> {
        let params = vec![
            ("select".to_string(), "*".to_string()),
            ("id".to_string(), eq(drive_id)),
        ];
        let rows: Vec<DriveRow> = self
            .fetch(tables::DRIVES, self.get(tables::DRIVES, &params))
            .await?;

        match rows.first() {
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
        let request = self.authorize(
            self.client
                .patch(self.config.table_url(tables::DRIVE_DATA))
                .query(&drive_data_filter(res_id, drive_id))
                .header("Prefer", "return=representation")
                .json(&DriveDataPatchBody::from(patch)),
        );
        let rows: Vec<DriveDataRow> = self.fetch(tables::DRIVE_DATA, request).await?;

        debug!(res_id = %res_id, drive_id = %drive_id, rows = rows.len(), "Patched drive_data");
        Ok(rows.len() as u64)
    }

    async fn insert_conversion(
        &self,
        entry: &NewConversionEntry,
    ) -> Result<ConversionTrackingEntry> {
        let request = self.authorize(
            self.client
                .post(self.config.table_url(tables::CONVERSION_TRACKING))
                .header("Prefer", "return=minimal")
                .json(&NewConversionRow::from(entry)),
        );
        self.check(tables::CONVERSION_TRACKING, request.send().await?)
            .await?;

        debug!(res_id = %entry.res_id, drive_id = %entry.drive_id, "Appended conversion_tracking entry");
        Ok(entry.unconfirmed())
    }

    async fn list_conversions(&self, res_id: &ResId) -> Result<Vec<ConversionTrackingEntry>> {
        let params = vec![
            ("select".to_string(), "*".to_string()),
            ("res_id".to_string(), eq(res_id)),
            ("order".to_string(), "id.asc".to_string()),
        ];
        let rows: Vec<ConversionRow> = self
            .fetch(
                tables::CONVERSION_TRACKING,
                self.get(tables::CONVERSION_TRACKING, &params),
            )
            .await?;

        let mut entries = Vec::with_capacity(rows.len());
        for row in &rows {
            entries.push(ConversionTrackingEntry::try_from(row)?);
        }
        Ok(entries)
    }
}

#[cfg(test)]
mod tests;
