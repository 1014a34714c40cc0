//! Flat table rows as the store returns them, and assembly into the domain model.
//!
//! Row field names match the table columns. The REST backend deserializes
//! them straight from JSON (nested `drive_data` / `drives` included); the
//! SQL and in-memory backends build them column by column and attach the
//! nested rows themselves.

use std::collections::HashMap;

use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::warn;

use super::{
    ConversionTrackingEntry, Drive, DriveAssignment, DriveData, DriveId, DriveStage, DriveStatus,
    KamEmail, NewConversionEntry, PreconditionError, PromoSegment, ResId, Restaurant,
    RestaurantWithDrives,
};

/// A row that cannot be turned into a domain value.
#[derive(Debug, thiserror::Error)]
pub enum RowError {
    #[error("invalid {column}: {value:?}")]
    InvalidValue { column: &'static str, value: String },

    #[error("invalid identifier: {0}")]
    InvalidId(#[from] PreconditionError),

    #[error("drive_data row {id} has no {column}")]
    Orphaned { id: i64, column: &'static str },
}

/// `restaurants` row, optionally carrying its nested `drive_data`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RestaurantRow {
    pub res_id: String,
    pub res_name: String,
    #[serde(default)]
    pub kam_name: Option<String>,
    #[serde(default)]
    pub kam_email: Option<String>,
    #[serde(default)]
    pub tl_email: Option<String>,
    #[serde(default)]
    pub cuisine: Option<String>,
    #[serde(default)]
    pub locality: Option<String>,
    #[serde(default)]
    pub concat_field: Option<String>,
    #[serde(default)]
    pub account_type: Option<String>,
    #[serde(default)]
    pub sept_ov: Option<f64>,
    #[serde(default)]
    pub created_at: Option<String>,
    #[serde(default)]
    pub updated_at: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub drive_data: Vec<DriveDataRow>,
}

/// `drives` row.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DriveRow {
    pub id: i64,
    pub drive_name: String,
    #[serde(default)]
    pub drive_type: Option<String>,
    #[serde(default)]
    pub city: Option<String>,
    #[serde(default)]
    pub start_date: Option<String>,
    #[serde(default)]
    pub end_date: Option<String>,
    #[serde(default)]
    pub status: Option<String>,
    #[serde(default)]
    pub created_at: Option<String>,
}

/// `drive_data` row, optionally carrying its joined drive.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DriveDataRow {
    pub id: i64,
    #[serde(default)]
    pub res_id: Option<String>,
    #[serde(default)]
    pub drive_id: Option<i64>,
    #[serde(default)]
    pub um: Option<f64>,
    #[serde(default)]
    pub mm: Option<f64>,
    #[serde(default)]
    pub la: Option<f64>,
    #[serde(default)]
    pub la_base_code_suggested: Option<String>,
    #[serde(default)]
    pub la_step1: Option<String>,
    #[serde(default)]
    pub la_step2: Option<String>,
    #[serde(default)]
    pub la_step3: Option<String>,
    #[serde(default)]
    pub mm_base_code_suggested: Option<String>,
    #[serde(default)]
    pub um_base_code_suggested: Option<String>,
    #[serde(default)]
    pub la_active_promos: Option<String>,
    #[serde(default)]
    pub mm_active_promos: Option<String>,
    #[serde(default)]
    pub um_active_promos: Option<String>,
    #[serde(default)]
    pub approached: Option<bool>,
    #[serde(default)]
    pub converted_stepper: Option<bool>,
    #[serde(default)]
    pub priority_score: Option<f64>,
    #[serde(default)]
    pub last_updated: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub drives: Option<DriveRow>,
}

/// `conversion_tracking` row.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ConversionRow {
    pub id: i64,
    #[serde(default)]
    pub res_id: Option<String>,
    #[serde(default)]
    pub drive_id: Option<i64>,
    pub kam_email: String,
    pub action_type: String,
    #[serde(default)]
    pub action_date: Option<String>,
    #[serde(default)]
    pub notes: Option<String>,
    #[serde(default)]
    pub created_at: Option<String>,
}

/// Insert payload for `conversion_tracking`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NewConversionRow {
    pub res_id: String,
    pub drive_id: i64,
    pub kam_email: String,
    pub action_type: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub action_date: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
}

impl From<&NewConversionEntry> for NewConversionRow {
    fn from(entry: &NewConversionEntry) -> Self {
        Self {
            res_id: entry.res_id.as_str().to_string(),
            drive_id: entry.drive_id.get(),
            kam_email: entry.kam_email.as_str().to_string(),
            action_type: entry.action_type.as_str().to_string(),
            action_date: entry.action_date.map(format_date),
            notes: entry.notes.clone(),
        }
    }
}

/// Render a timestamp the way it is written to text columns.
pub fn format_timestamp(ts: DateTime<Utc>) -> String {
    ts.to_rfc3339()
}

/// Render a date the way it is written to text columns.
pub fn format_date(date: NaiveDate) -> String {
    date.format("%Y-%m-%d").to_string()
}

fn parse_timestamp(
    column: &'static str,
    value: Option<&str>,
) -> Result<Option<DateTime<Utc>>, RowError> {
    let Some(raw) = value else {
        return Ok(None);
    };
    if let Ok(ts) = DateTime::parse_from_rfc3339(raw) {
        return Ok(Some(ts.with_timezone(&Utc)));
    }
    // Columns without a zone come back as naive local-less timestamps.
    for format in ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M:%S%.f"] {
        if let Ok(naive) = NaiveDateTime::parse_from_str(raw, format) {
            return Ok(Some(naive.and_utc()));
        }
    }
    Err(RowError::InvalidValue {
        column,
        value: raw.to_string(),
    })
}

fn parse_date(column: &'static str, value: Option<&str>) -> Result<Option<NaiveDate>, RowError> {
    let Some(raw) = value else {
        return Ok(None);
    };
    if let Ok(date) = NaiveDate::parse_from_str(raw, "%Y-%m-%d") {
        return Ok(Some(date));
    }
    parse_timestamp(column, Some(raw)).map(|ts| ts.map(|ts| ts.date_naive()))
}

impl TryFrom<&RestaurantRow> for Restaurant {
    type Error = RowError;

    fn try_from(row: &RestaurantRow) -> Result<Self, Self::Error> {
        Ok(Restaurant {
            res_id: ResId::new(row.res_id.clone())?,
            res_name: row.res_name.clone(),
            kam_name: row.kam_name.clone(),
            kam_email: row.kam_email.clone(),
            tl_email: row.tl_email.clone(),
            cuisine: row.cuisine.clone(),
            locality: row.locality.clone(),
            concat_field: row.concat_field.clone(),
            account_type: row.account_type.clone(),
            sept_ov: row.sept_ov,
            created_at: parse_timestamp("created_at", row.created_at.as_deref())?,
            updated_at: parse_timestamp("updated_at", row.updated_at.as_deref())?,
        })
    }
}

impl TryFrom<&DriveRow> for Drive {
    type Error = RowError;

    fn try_from(row: &DriveRow) -> Result<Self, Self::Error> {
        Ok(Drive {
            id: DriveId(row.id),
            drive_name: row.drive_name.clone(),
            drive_type: row.drive_type.clone(),
            city: row.city.clone(),
            start_date: parse_date("start_date", row.start_date.as_deref())?,
            end_date: parse_date("end_date", row.end_date.as_deref())?,
            status: DriveStatus::from_column(row.status.as_deref()),
            created_at: parse_timestamp("created_at", row.created_at.as_deref())?,
        })
    }
}

impl TryFrom<&DriveDataRow> for DriveData {
    type Error = RowError;

    fn try_from(row: &DriveDataRow) -> Result<Self, Self::Error> {
        let res_id = row.res_id.clone().ok_or(RowError::Orphaned {
            id: row.id,
            column: "res_id",
        })?;
        let drive_id = row.drive_id.ok_or(RowError::Orphaned {
            id: row.id,
            column: "drive_id",
        })?;

        let approached = row.approached.unwrap_or(false);
        let converted = row.converted_stepper.unwrap_or(false);
        if converted && !approached {
            warn!(
                drive_data_id = row.id,
                "drive_data row is converted but not approached; reading as converted"
            );
        }

        Ok(DriveData {
            id: row.id,
            res_id: ResId::new(res_id)?,
            drive_id: DriveId(drive_id),
            la: PromoSegment {
                share: row.la,
                base_code_suggested: row.la_base_code_suggested.clone(),
                active_promos: row.la_active_promos.clone(),
            },
            la_steps: [
                row.la_step1.clone(),
                row.la_step2.clone(),
                row.la_step3.clone(),
            ],
            mm: PromoSegment {
                share: row.mm,
                base_code_suggested: row.mm_base_code_suggested.clone(),
                active_promos: row.mm_active_promos.clone(),
            },
            um: PromoSegment {
                share: row.um,
                base_code_suggested: row.um_base_code_suggested.clone(),
                active_promos: row.um_active_promos.clone(),
            },
            stage: DriveStage::from_flags(approached, converted),
            priority_score: row.priority_score,
            last_updated: parse_timestamp("last_updated", row.last_updated.as_deref())?,
        })
    }
}

impl TryFrom<&ConversionRow> for ConversionTrackingEntry {
    type Error = RowError;

    fn try_from(row: &ConversionRow) -> Result<Self, Self::Error> {
        let res_id = row.res_id.clone().ok_or(RowError::InvalidValue {
            column: "res_id",
            value: "null".to_string(),
        })?;
        let drive_id = row.drive_id.ok_or(RowError::InvalidValue {
            column: "drive_id",
            value: "null".to_string(),
        })?;

        Ok(ConversionTrackingEntry {
            id: Some(row.id),
            res_id: ResId::new(res_id)?,
            drive_id: DriveId(drive_id),
            kam_email: KamEmail::new(row.kam_email.clone())?,
            action_type: row.action_type.parse()?,
            action_date: parse_date("action_date", row.action_date.as_deref())?,
            notes: row.notes.clone(),
            created_at: parse_timestamp("created_at", row.created_at.as_deref())?,
        })
    }
}

impl RestaurantWithDrives {
    /// Build the nested read model from a restaurant row and its nested rows.
    ///
    /// Fact rows that are orphaned, point at a different restaurant, or have
    /// no joined drive are dropped with a warning. Assignments are ordered by
    /// fact row id.
    pub fn assemble(row: &RestaurantRow) -> Result<Self, RowError> {
        let restaurant = Restaurant::try_from(row)?;
        let mut drives = Vec::with_capacity(row.drive_data.len());

        for data_row in &row.drive_data {
            let data = match DriveData::try_from(data_row) {
                Ok(data) => data,
                Err(RowError::Orphaned { id, column }) => {
                    warn!(drive_data_id = id, column, "skipping orphaned drive_data row");
                    continue;
                }
                Err(e) => return Err(e),
            };

            if data.res_id != restaurant.res_id {
                warn!(
                    drive_data_id = data.id,
                    expected = %restaurant.res_id,
                    actual = %data.res_id,
                    "skipping drive_data row joined to the wrong restaurant"
                );
                continue;
            }

            let Some(drive_row) = &data_row.drives else {
                warn!(
                    drive_data_id = data.id,
                    drive_id = %data.drive_id,
                    "skipping drive_data row without a joined drive"
                );
                continue;
            };

            drives.push(DriveAssignment {
                drive: Drive::try_from(drive_row)?,
                data,
            });
        }

        drives.sort_by_key(|a| a.data.id);
        Ok(Self { restaurant, drives })
    }
}

/// Attach fact rows and their drives to flat restaurant rows.
///
/// Used by backends that read the three tables separately.
pub fn attach_drive_data(
    restaurants: &mut [RestaurantRow],
    drive_data: Vec<DriveDataRow>,
    drives: &[DriveRow],
) {
    let drives_by_id: HashMap<i64, &DriveRow> = drives.iter().map(|d| (d.id, d)).collect();
    let mut by_restaurant: HashMap<String, Vec<DriveDataRow>> = HashMap::new();

    for mut row in drive_data {
        row.drives = row
            .drive_id
            .and_then(|id| drives_by_id.get(&id).map(|d| (*d).clone()));
        if let Some(res_id) = row.res_id.clone() {
            by_restaurant.entry(res_id).or_default().push(row);
        }
    }

    for restaurant in restaurants.iter_mut() {
        restaurant.drive_data = by_restaurant.remove(&restaurant.res_id).unwrap_or_default();
    }
}
