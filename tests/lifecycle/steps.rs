//! Lifecycle step definitions.

use cucumber::{given, then, when, World};
use kam_hub::auth::EmailPolicy;
use kam_hub::cache::{QueryCache, QueryKey};
use kam_hub::model::{DriveId, DriveStage, ResId};
use kam_hub::notes::NotesStore;
use kam_hub::{Dashboard, Error};
use tokio::sync::broadcast;

use crate::backend::StoreBackend;

/// Test context for lifecycle scenarios.
#[derive(World)]
#[world(init = Self::new)]
pub struct LifecycleWorld {
    backend: StoreBackend,
    dashboard: Option<Dashboard>,
    notes_dir: tempfile::TempDir,
    invalidations: Option<broadcast::Receiver<QueryKey>>,
    listed: Vec<String>,
    last_error: Option<Error>,
}

impl std::fmt::Debug for LifecycleWorld {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LifecycleWorld")
            .field("backend", &self.backend)
            .field("dashboard", &self.dashboard.as_ref().map(|_| "<Dashboard>"))
            .field("listed", &self.listed)
            .field("last_error", &self.last_error)
            .finish()
    }
}

impl LifecycleWorld {
    fn new() -> Self {
        Self {
            backend: StoreBackend::from_env(),
            dashboard: None,
            notes_dir: tempfile::tempdir().expect("Failed to create temp dir"),
            invalidations: None,
            listed: Vec::new(),
            last_error: None,
        }
    }

    fn dashboard(&self) -> &Dashboard {
        self.dashboard.as_ref().expect("Dashboard not initialized")
    }
}

fn res(id: &str) -> ResId {
    ResId::new(id).expect("valid restaurant id")
}

// --- Background ---

#[given(expr = "a dashboard signed in as {string}")]
async fn given_dashboard(world: &mut LifecycleWorld, email: String) {
    println!("Using backend: {}", world.backend.name());
    let store = world.backend.seeded_store().await;
    let domain = email.rsplit('@').next().unwrap_or_default().to_string();
    let session = EmailPolicy::new(domain, true, Vec::<String>::new())
        .authorize(&email, None)
        .expect("Sign-in rejected");

    world.dashboard = Some(Dashboard::new(
        store,
        session,
        QueryCache::default(),
        NotesStore::new(world.notes_dir.path().join("notes.json")),
    ));
}

// --- Given steps ---

#[given(expr = "I have viewed restaurant {string}")]
async fn given_viewed(world: &mut LifecycleWorld, res_id: String) {
    world
        .dashboard()
        .get_restaurant(&res(&res_id))
        .await
        .expect("Failed to view restaurant");
}

#[given("I have listed my restaurants")]
async fn given_listed(world: &mut LifecycleWorld) {
    world
        .dashboard()
        .list_restaurants()
        .await
        .expect("Failed to list restaurants");
}

#[given("I am subscribed to cache invalidations")]
async fn given_subscribed(world: &mut LifecycleWorld) {
    world.invalidations = Some(world.dashboard().subscribe());
}

// --- When steps ---

#[when("I list my restaurants")]
async fn when_list_restaurants(world: &mut LifecycleWorld) {
    let restaurants = world
        .dashboard()
        .list_restaurants()
        .await
        .expect("Failed to list restaurants");
    world.listed = restaurants
        .into_iter()
        .map(|r| r.restaurant.res_name)
        .collect();
}

#[when("I list active drives")]
async fn when_list_drives(world: &mut LifecycleWorld) {
    let drives = world
        .dashboard()
        .list_active_drives()
        .await
        .expect("Failed to list drives");
    world.listed = drives.into_iter().map(|d| d.drive_name).collect();
}

#[when(expr = "I open restaurant {string}")]
async fn when_open_restaurant(world: &mut LifecycleWorld, res_id: String) {
    world.last_error = world.dashboard().get_restaurant(&res(&res_id)).await.err();
}

#[when(expr = "I mark restaurant {string} {word} for drive {int}")]
async fn when_mark(world: &mut LifecycleWorld, res_id: String, action: String, drive_id: i64) {
    let dashboard = world.dashboard();
    let result = match action.as_str() {
        "approached" => dashboard.mark_approached(&res(&res_id), DriveId(drive_id)).await,
        "converted" => dashboard.mark_converted(&res(&res_id), DriveId(drive_id)).await,
        other => panic!("Unknown action: {other}"),
    };
    world.last_error = result.err();
}

// --- Then steps ---

#[then(expr = "I see restaurants {string}")]
async fn then_see_restaurants(world: &mut LifecycleWorld, names: String) {
    let expected: Vec<&str> = names.split(", ").collect();
    assert_eq!(world.listed, expected);
}

#[then(expr = "the drives are {string}")]
async fn then_drives_are(world: &mut LifecycleWorld, names: String) {
    let expected: Vec<&str> = names.split(", ").collect();
    assert_eq!(world.listed, expected);
}

#[then("every drive row belongs to its restaurant")]
async fn then_join_correct(world: &mut LifecycleWorld) {
    let restaurants = world.dashboard().list_restaurants().await.unwrap();
    for restaurant in &restaurants {
        for assignment in &restaurant.drives {
            assert_eq!(&assignment.data.res_id, restaurant.res_id());
        }
    }
}

#[then(expr = "restaurant {string} shows drive {int} as {string}")]
async fn then_stage(world: &mut LifecycleWorld, res_id: String, drive_id: i64, stage: String) {
    assert!(world.last_error.is_none(), "unexpected error: {:?}", world.last_error);
    let restaurant = world.dashboard().get_restaurant(&res(&res_id)).await.unwrap();
    let data = &restaurant
        .assignment(DriveId(drive_id))
        .expect("drive not assigned")
        .data;
    let expected = match stage.as_str() {
        "approached" => DriveStage::Approached,
        "converted" => DriveStage::Converted,
        _ => DriveStage::NotApproached,
    };
    assert_eq!(data.stage, expected);
}

#[then(expr = "drive {int} on restaurant {string} is approached")]
async fn then_is_approached(world: &mut LifecycleWorld, drive_id: i64, res_id: String) {
    let restaurant = world.dashboard().get_restaurant(&res(&res_id)).await.unwrap();
    assert!(restaurant
        .assignment(DriveId(drive_id))
        .expect("drive not assigned")
        .data
        .approached());
}

#[then(expr = "restaurant {string} has {int} audit entry/entries")]
async fn then_audit_count(world: &mut LifecycleWorld, res_id: String, count: usize) {
    let history = world
        .dashboard()
        .conversion_history(&res(&res_id))
        .await
        .unwrap();
    assert_eq!(history.len(), count);
}

#[then("the action is recorded")]
async fn then_recorded(world: &mut LifecycleWorld) {
    assert!(world.last_error.is_none(), "unexpected error: {:?}", world.last_error);
}

#[then("the error is not found")]
async fn then_not_found(world: &mut LifecycleWorld) {
    match &world.last_error {
        Some(Error::NotFound { .. }) => {}
        other => panic!("expected NotFound, got {other:?}"),
    }
}

#[then("I am notified that my restaurant list changed")]
async fn then_notified(world: &mut LifecycleWorld) {
    let viewer = world.dashboard().session().email.clone();
    let rx = world.invalidations.as_mut().expect("not subscribed");
    let mut keys = Vec::new();
    while let Ok(key) = rx.try_recv() {
        keys.push(key);
    }
    assert!(keys.contains(&QueryKey::Restaurants { viewer }));
}

#[then(expr = "drive {int} has {int} assigned, {int} approached and {int} converted")]
async fn then_funnel(
    world: &mut LifecycleWorld,
    drive_id: i64,
    assigned: usize,
    approached: usize,
    converted: usize,
) {
    let summary = world.dashboard().summary().await.unwrap();
    let funnel = summary
        .drives
        .iter()
        .find(|d| d.drive_id == DriveId(drive_id))
        .expect("drive missing from summary");
    assert_eq!(
        (funnel.assigned, funnel.approached, funnel.converted),
        (assigned, approached, converted)
    );
}
