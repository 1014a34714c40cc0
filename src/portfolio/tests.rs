use crate::model::{DriveId, KamEmail};
use crate::storage::DashboardStore;
use crate::storage::MockDashboardStore;
use crate::test_utils::{make_drive_data, portfolio_fixture, FixtureLoader};

use super::*;

async fn portfolio(mark: impl FnOnce(&mut crate::test_utils::Fixture)) -> Vec<RestaurantWithDrives> {
    let mut fixture = portfolio_fixture();
    mark(&mut fixture);
    let store = MockDashboardStore::new();
    store.load_fixture(&fixture).await.unwrap();
    store
        .list_restaurants(&KamEmail::new("a@x.com").unwrap())
        .await
        .unwrap()
}

#[tokio::test]
async fn test_summarize_counts_per_drive() {
    let restaurants = portfolio(|f| {
        // R1 converted on NCN, R2 approached on NCN.
        f.drive_data[0].approached = Some(true);
        f.drive_data[0].converted_stepper = Some(true);
        f.drive_data[2].approached = Some(true);
    })
    .await;

    let summary = summarize(&restaurants);

    assert_eq!(summary.restaurant_count, 2);
    assert_eq!(summary.drives.len(), 2);

    let ncn = &summary.drives[0];
    assert_eq!(ncn.drive_id, DriveId(5));
    assert_eq!((ncn.assigned, ncn.approached, ncn.converted), (2, 2, 1));
    assert_eq!(ncn.approach_rate(), 100);
    assert_eq!(ncn.conversion_rate(), 50);

    let n2r = &summary.drives[1];
    assert_eq!(n2r.drive_name, "N2R");
    assert_eq!((n2r.assigned, n2r.approached, n2r.converted), (1, 0, 0));
    assert_eq!(n2r.conversion_rate(), 0);
}

#[tokio::test]
async fn test_converted_without_approach_flag_counts_as_approached() {
    let restaurants = portfolio(|f| {
        f.drive_data[1].converted_stepper = Some(true);
        f.drive_data.push(make_drive_data(20, "R2", 7));
    })
    .await;

    let summary = summarize(&restaurants);

    let n2r = summary.drives.iter().find(|d| d.drive_id == DriveId(6)).unwrap();
    assert_eq!((n2r.approached, n2r.converted), (1, 1));
    assert_eq!(summary.drives.last().unwrap().drive_id, DriveId(7));
}

#[test]
fn test_summarize_empty_portfolio() {
    let summary = summarize(&[]);
    assert_eq!(summary.restaurant_count, 0);
    assert!(summary.drives.is_empty());
}

#[test]
fn test_rates_round() {
    let funnel = DriveFunnel {
        drive_id: DriveId(1),
        drive_name: "NCN".to_string(),
        assigned: 3,
        approached: 2,
        converted: 1,
    };
    assert_eq!(funnel.approach_rate(), 67);
    assert_eq!(funnel.conversion_rate(), 33);
}

#[test]
fn test_tier_thresholds() {
    assert_eq!(PerformanceTier::from_score(80.0), PerformanceTier::Success);
    assert_eq!(PerformanceTier::from_score(70.0), PerformanceTier::Success);
    assert_eq!(PerformanceTier::from_score(69.9), PerformanceTier::Warning);
    assert_eq!(PerformanceTier::from_score(40.0), PerformanceTier::Warning);
    assert_eq!(PerformanceTier::from_score(39.9), PerformanceTier::Danger);
    assert_eq!(PerformanceTier::from_score(0.0), PerformanceTier::Danger);
}

#[test]
fn test_tier_parse_reads_leading_percentage() {
    assert_eq!(PerformanceTier::parse("85%"), PerformanceTier::Success);
    assert_eq!(PerformanceTier::parse(" 69.9% "), PerformanceTier::Warning);
    assert_eq!(PerformanceTier::parse("12"), PerformanceTier::Danger);
    assert_eq!(PerformanceTier::parse("-5%"), PerformanceTier::Danger);
}

#[test]
fn test_tier_parse_currency_is_neutral() {
    assert_eq!(PerformanceTier::parse("₹1,250K"), PerformanceTier::Neutral);
    assert_eq!(PerformanceTier::parse("n/a"), PerformanceTier::Neutral);
    assert_eq!(PerformanceTier::parse(""), PerformanceTier::Neutral);
    assert_eq!(PerformanceTier::parse("-"), PerformanceTier::Neutral);
}
