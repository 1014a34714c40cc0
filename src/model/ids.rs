//! Identifier newtypes.
//!
//! Empty identifiers are rejected at construction so operations that take
//! these types never see a missing restaurant id or KAM email.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Rejected identifier construction.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum PreconditionError {
    #[error("restaurant id must not be empty")]
    EmptyResId,

    #[error("KAM email must not be empty")]
    EmptyKamEmail,
}

/// Restaurant primary key (`restaurants.res_id`).
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct ResId(String);

impl ResId {
    pub fn new(value: impl Into<String>) -> Result<Self, PreconditionError> {
        let value = value.into();
        if value.trim().is_empty() {
            return Err(PreconditionError::EmptyResId);
        }
        Ok(Self(value))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl TryFrom<String> for ResId {
    type Error = PreconditionError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl TryFrom<&str> for ResId {
    type Error = PreconditionError;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<ResId> for String {
    fn from(id: ResId) -> Self {
        id.0
    }
}

impl fmt::Display for ResId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Email of the acting key account manager.
///
/// Stored as given (trimmed); visibility comparisons happen in the store.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct KamEmail(String);

impl KamEmail {
    pub fn new(value: impl Into<String>) -> Result<Self, PreconditionError> {
        let value = value.into();
        let trimmed = value.trim();
        if trimmed.is_empty() {
            return Err(PreconditionError::EmptyKamEmail);
        }
        Ok(Self(trimmed.to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl TryFrom<String> for KamEmail {
    type Error = PreconditionError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl TryFrom<&str> for KamEmail {
    type Error = PreconditionError;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<KamEmail> for String {
    fn from(email: KamEmail) -> Self {
        email.0
    }
}

impl fmt::Display for KamEmail {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Drive primary key (`drives.id`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct DriveId(pub i64);

impl DriveId {
    pub fn get(self) -> i64 {
        self.0
    }
}

impl From<i64> for DriveId {
    fn from(id: i64) -> Self {
        Self(id)
    }
}

impl fmt::Display for DriveId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}
