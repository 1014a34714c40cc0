//! Domain model for restaurants, drives, and the per-pair fact rows.
//!
//! The store hands back flat, nullable rows (see [`rows`]); everything the
//! query and mutation layers pass around is one of the composed types here.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Serialize, Serializer};

mod ids;
pub mod rows;

pub use ids::{DriveId, KamEmail, PreconditionError, ResId};
pub use rows::{
    ConversionRow, DriveDataRow, DriveRow, NewConversionRow, RestaurantRow, RowError,
};

/// Status value marking a drive as running.
pub const ACTIVE_DRIVE_STATUS: &str = "active";

/// A restaurant in a KAM portfolio.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Restaurant {
    pub res_id: ResId,
    pub res_name: String,
    pub kam_name: Option<String>,
    pub kam_email: Option<String>,
    pub tl_email: Option<String>,
    pub cuisine: Option<String>,
    pub locality: Option<String>,
    pub concat_field: Option<String>,
    pub account_type: Option<String>,
    /// Revenue figure for the reference month.
    pub sept_ov: Option<f64>,
    pub created_at: Option<DateTime<Utc>>,
    pub updated_at: Option<DateTime<Utc>>,
}

/// Drive lifecycle status as stored.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DriveStatus {
    Active,
    Other(String),
    Unset,
}

impl DriveStatus {
    pub fn from_column(value: Option<&str>) -> Self {
        match value {
            Some(ACTIVE_DRIVE_STATUS) => DriveStatus::Active,
            Some(other) => DriveStatus::Other(other.to_string()),
            None => DriveStatus::Unset,
        }
    }

    pub fn as_column(&self) -> Option<&str> {
        match self {
            DriveStatus::Active => Some(ACTIVE_DRIVE_STATUS),
            DriveStatus::Other(s) => Some(s.as_str()),
            DriveStatus::Unset => None,
        }
    }

    pub fn is_active(&self) -> bool {
        matches!(self, DriveStatus::Active)
    }
}

impl Serialize for DriveStatus {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        self.as_column().serialize(serializer)
    }
}

/// A time-boxed promotional campaign.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Drive {
    pub id: DriveId,
    pub drive_name: String,
    pub drive_type: Option<String>,
    pub city: Option<String>,
    pub start_date: Option<NaiveDate>,
    pub end_date: Option<NaiveDate>,
    pub status: DriveStatus,
    pub created_at: Option<DateTime<Utc>>,
}

/// One promo segment (`la`, `mm`, `um`) of a fact row.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct PromoSegment {
    pub share: Option<f64>,
    pub base_code_suggested: Option<String>,
    pub active_promos: Option<String>,
}

/// Where a restaurant stands for one drive.
///
/// Approach and conversion flags are derived from this, so a converted row
/// can never read as not approached.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum DriveStage {
    NotApproached,
    Approached,
    Converted,
}

impl DriveStage {
    /// Map stored flags to a stage. Conversion wins over a missing approach flag.
    pub fn from_flags(approached: bool, converted: bool) -> Self {
        match (approached, converted) {
            (_, true) => DriveStage::Converted,
            (true, false) => DriveStage::Approached,
            (false, false) => DriveStage::NotApproached,
        }
    }

    pub fn is_approached(self) -> bool {
        self != DriveStage::NotApproached
    }

    pub fn is_converted(self) -> bool {
        self == DriveStage::Converted
    }

    /// Stage after recording `action`. Converted is terminal.
    pub fn apply(self, action: ActionType) -> Self {
        self.max(action.target_stage())
    }
}

/// Fact row linking one restaurant to one drive.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DriveData {
    pub id: i64,
    pub res_id: ResId,
    pub drive_id: DriveId,
    pub la: PromoSegment,
    /// Stepper constructs suggested for the `la` segment.
    pub la_steps: [Option<String>; 3],
    pub mm: PromoSegment,
    pub um: PromoSegment,
    pub stage: DriveStage,
    pub priority_score: Option<f64>,
    pub last_updated: Option<DateTime<Utc>>,
}

impl DriveData {
    pub fn approached(&self) -> bool {
        self.stage.is_approached()
    }

    pub fn converted(&self) -> bool {
        self.stage.is_converted()
    }
}

/// A fact row together with the drive it references.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DriveAssignment {
    pub data: DriveData,
    pub drive: Drive,
}

/// A restaurant with its drive assignments eagerly joined.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RestaurantWithDrives {
    pub restaurant: Restaurant,
    pub drives: Vec<DriveAssignment>,
}

impl RestaurantWithDrives {
    pub fn res_id(&self) -> &ResId {
        &self.restaurant.res_id
    }

    /// The assignment for a given drive, if the restaurant is part of it.
    pub fn assignment(&self, drive_id: DriveId) -> Option<&DriveAssignment> {
        self.drives.iter().find(|a| a.data.drive_id == drive_id)
    }
}

/// Audit action recorded by a mutation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ActionType {
    Approached,
    Converted,
}

impl ActionType {
    pub fn as_str(self) -> &'static str {
        match self {
            ActionType::Approached => "approached",
            ActionType::Converted => "converted",
        }
    }

    pub fn target_stage(self) -> DriveStage {
        match self {
            ActionType::Approached => DriveStage::Approached,
            ActionType::Converted => DriveStage::Converted,
        }
    }
}

impl std::str::FromStr for ActionType {
    type Err = RowError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "approached" => Ok(ActionType::Approached),
            "converted" => Ok(ActionType::Converted),
            other => Err(RowError::InvalidValue {
                column: "action_type",
                value: other.to_string(),
            }),
        }
    }
}

impl std::fmt::Display for ActionType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Append-only audit entry.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ConversionTrackingEntry {
    /// Store-assigned id. `None` when the store did not hand the row back.
    pub id: Option<i64>,
    pub res_id: ResId,
    pub drive_id: DriveId,
    pub kam_email: KamEmail,
    pub action_type: ActionType,
    pub action_date: Option<NaiveDate>,
    pub notes: Option<String>,
    pub created_at: Option<DateTime<Utc>>,
}

/// Audit entry to append.
#[derive(Debug, Clone, PartialEq)]
pub struct NewConversionEntry {
    pub res_id: ResId,
    pub drive_id: DriveId,
    pub kam_email: KamEmail,
    pub action_type: ActionType,
    pub action_date: Option<NaiveDate>,
    pub notes: Option<String>,
}

impl NewConversionEntry {
    /// The entry as written, for stores that do not return the stored row.
    pub fn unconfirmed(&self) -> ConversionTrackingEntry {
        ConversionTrackingEntry {
            id: None,
            res_id: self.res_id.clone(),
            drive_id: self.drive_id,
            kam_email: self.kam_email.clone(),
            action_type: self.action_type,
            action_date: self.action_date,
            notes: self.notes.clone(),
            created_at: None,
        }
    }
}

/// Column changes applied to a fact row by a mutation.
///
/// `None` leaves the column untouched.
#[derive(Debug, Clone, PartialEq)]
pub struct DriveDataPatch {
    pub approached: Option<bool>,
    pub converted_stepper: Option<bool>,
    pub last_updated: DateTime<Utc>,
}

impl DriveDataPatch {
    /// Patch for recording `action`. Conversion always sets `approached` too.
    pub fn for_action(action: ActionType, now: DateTime<Utc>) -> Self {
        match action {
            ActionType::Approached => Self {
                approached: Some(true),
                converted_stepper: None,
                last_updated: now,
            },
            ActionType::Converted => Self {
                approached: Some(true),
                converted_stepper: Some(true),
                last_updated: now,
            },
        }
    }
}
