//! Portfolio rollups: per-drive approach/conversion funnel and the
//! performance tier used for status badges.

use std::collections::BTreeMap;

use serde::Serialize;

use crate::model::{DriveId, RestaurantWithDrives};

/// Funnel counts for one drive across a portfolio.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DriveFunnel {
    pub drive_id: DriveId,
    pub drive_name: String,
    pub assigned: usize,
    pub approached: usize,
    pub converted: usize,
}

impl DriveFunnel {
    /// Approached share of assigned restaurants, rounded percent.
    pub fn approach_rate(&self) -> u32 {
        percent(self.approached, self.assigned)
    }

    /// Converted share of assigned restaurants, rounded percent.
    pub fn conversion_rate(&self) -> u32 {
        percent(self.converted, self.assigned)
    }
}

fn percent(part: usize, whole: usize) -> u32 {
    if whole == 0 {
        return 0;
    }
    ((part as f64 / whole as f64) * 100.0).round() as u32
}

/// Rollup of a KAM's portfolio.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PortfolioSummary {
    pub restaurant_count: usize,
    /// One funnel per drive, ordered by drive id.
    pub drives: Vec<DriveFunnel>,
}

/// Count assignments, approaches and conversions per drive.
pub fn summarize(restaurants: &[RestaurantWithDrives]) -> PortfolioSummary {
    let mut funnels: BTreeMap<DriveId, DriveFunnel> = BTreeMap::new();

    for assignment in restaurants.iter().flat_map(|r| &r.drives) {
        let funnel = funnels
            .entry(assignment.drive.id)
            .or_insert_with(|| DriveFunnel {
                drive_id: assignment.drive.id,
                drive_name: assignment.drive.drive_name.clone(),
                assigned: 0,
                approached: 0,
                converted: 0,
            });
        funnel.assigned += 1;
        if assignment.data.approached() {
            funnel.approached += 1;
        }
        if assignment.data.converted() {
            funnel.converted += 1;
        }
    }

    PortfolioSummary {
        restaurant_count: restaurants.len(),
        drives: funnels.into_values().collect(),
    }
}

/// Badge tier for a percentage score.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum PerformanceTier {
    Success,
    Warning,
    Danger,
    Neutral,
}

impl PerformanceTier {
    /// Tier for a percentage: 70 and up is success, 40 and up is warning.
    pub fn from_score(score: f64) -> Self {
        if score >= 70.0 {
            PerformanceTier::Success
        } else if score >= 40.0 {
            PerformanceTier::Warning
        } else {
            PerformanceTier::Danger
        }
    }

    /// Tier for a displayed percentage such as `"85%"`.
    ///
    /// Only a leading integer is read, so `"85.5%"` scores 85. Values that do
    /// not start with a number (currency amounts, `"n/a"`) are neutral.
    pub fn parse(value: &str) -> Self {
        let trimmed = value.trim();
        let digits_end = trimmed
            .char_indices()
            .find(|&(i, c)| !(c.is_ascii_digit() || (i == 0 && c == '-')))
            .map_or(trimmed.len(), |(i, _)| i);
        match trimmed[..digits_end].parse::<i64>() {
            Ok(score) => Self::from_score(score as f64),
            Err(_) => PerformanceTier::Neutral,
        }
    }
}

#[cfg(test)]
mod tests;
