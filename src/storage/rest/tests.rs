use std::time::Duration;

use chrono::{TimeZone, Utc};
use serde_json::json;
use wiremock::matchers::{body_partial_json, header, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

use crate::config::StoreConfig;
use crate::model::{ActionType, DriveDataPatch, DriveId, KamEmail, NewConversionEntry, ResId};
use crate::storage::{DashboardStore, StorageError};

use super::*;

fn store_at(url: &str) -> RestDashboardStore {
    let config = RestConfig {
        url: url.to_string(),
        anon_key: "anon-key".to_string(),
        access_token: None,
        timeout: Duration::from_secs(5),
    };
    RestDashboardStore::new(config).unwrap()
}

fn viewer() -> KamEmail {
    KamEmail::new("a@x.com").unwrap()
}

#[test]
fn test_restaurants_params_filter_by_kam_or_team_lead() {
    let params = restaurants_params(&viewer(), None);

    assert!(params.contains(&("select".to_string(), RESTAURANT_SELECT.to_string())));
    assert!(params.contains(&(
        "or".to_string(),
        "(kam_email.eq.\"a@x.com\",tl_email.eq.\"a@x.com\")".to_string()
    )));
    assert!(params.contains(&("order".to_string(), "res_name.asc,res_id.asc".to_string())));
    assert!(!params.iter().any(|(k, _)| k == "res_id"));
}

#[test]
fn test_restaurants_params_narrow_to_one_restaurant() {
    let res_id = ResId::new("R1").unwrap();
    let params = restaurants_params(&viewer(), Some(&res_id));

    assert!(params.contains(&("res_id".to_string(), "eq.R1".to_string())));
}

#[test]
fn test_quote_escapes_reserved_characters() {
    assert_eq!(quote(r#"a"b\c"#), r#""a\"b\\c""#);
}

#[test]
fn test_active_drives_params_order_nulls_last() {
    let params = active_drives_params();

    assert!(params.contains(&("status".to_string(), "eq.active".to_string())));
    assert!(params.contains(&(
        "order".to_string(),
        "start_date.desc.nullslast,id.desc".to_string()
    )));
}

#[test]
fn test_patch_body_omits_unset_flags() {
    let now = Utc.with_ymd_and_hms(2025, 10, 1, 0, 0, 0).unwrap();
    let body = DriveDataPatchBody::from(&DriveDataPatch::for_action(ActionType::Approached, now));

    let json = serde_json::to_value(&body).unwrap();
    assert_eq!(json["approached"], true);
    assert!(json.get("converted_stepper").is_none());
    assert_eq!(json["last_updated"], "2025-10-01T00:00:00+00:00");
}

#[test]
fn test_config_from_store_config_requires_url_and_key() {
    let mut store = StoreConfig::default();
    assert!(matches!(
        RestConfig::from_store_config(&store),
        Err(StorageError::Config(_))
    ));

    store.rest.url = "https://example.test".to_string();
    assert!(matches!(
        RestConfig::from_store_config(&store),
        Err(StorageError::Config(_))
    ));

    store.rest.anon_key = "k".to_string();
    store.rest.access_token = Some(String::new());
    let config = RestConfig::from_store_config(&store).unwrap();
    assert_eq!(config.access_token, None);
    assert_eq!(config.bearer(), "k");
    assert_eq!(
        config.table_url("drives"),
        "https://example.test/rest/v1/drives"
    );
}

#[test]
fn test_access_token_takes_precedence_for_bearer() {
    let config = RestConfig {
        anon_key: "anon".to_string(),
        ..Default::default()
    }
    .with_access_token("user-jwt");

    assert_eq!(config.bearer(), "user-jwt");
}

#[tokio::test]
async fn test_list_restaurants_decodes_nested_rows() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/rest/v1/restaurants"))
        .and(query_param("select", RESTAURANT_SELECT))
        .and(query_param("or", "(kam_email.eq.\"a@x.com\",tl_email.eq.\"a@x.com\")"))
        .and(header("apikey", "anon-key"))
        .and(header("authorization", "Bearer anon-key"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([{
            "res_id": "R1", "res_name": "Biryani House", "kam_email": "a@x.com",
            "drive_data": [{
                "id": 1, "res_id": "R1", "drive_id": 5, "approached": true,
                "converted_stepper": false,
                "drives": {"id": 5, "drive_name": "NCN", "status": "active", "start_date": "2025-01-01"}
            }]
        }])))
        .expect(1)
        .mount(&server)
        .await;
    let store = store_at(&server.uri());

    let restaurants = store.list_restaurants(&viewer()).await.unwrap();

    assert_eq!(restaurants.len(), 1);
    assert_eq!(restaurants[0].drives.len(), 1);
    assert!(restaurants[0].drives[0].data.approached());
}

#[tokio::test]
async fn test_access_token_is_sent_as_bearer() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/rest/v1/drives"))
        .and(header("apikey", "anon-key"))
        .and(header("authorization", "Bearer user-jwt"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
        .expect(1)
        .mount(&server)
        .await;
    let config = RestConfig {
        url: server.uri(),
        anon_key: "anon-key".to_string(),
        ..Default::default()
    }
    .with_access_token("user-jwt");
    let store = RestDashboardStore::new(config).unwrap();

    assert!(store.list_active_drives().await.unwrap().is_empty());
}

#[tokio::test]
async fn test_get_restaurant_empty_array_is_not_found() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/rest/v1/restaurants"))
        .and(query_param("res_id", "eq.R9"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
        .expect(1)
        .mount(&server)
        .await;
    let store = store_at(&server.uri());

    let result = store
        .get_restaurant(&viewer(), &ResId::new("R9").unwrap())
        .await;

    assert!(matches!(result, Err(StorageError::NotFound { .. })));
}

#[tokio::test]
async fn test_error_status_carries_body() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/rest/v1/drives"))
        .respond_with(ResponseTemplate::new(401).set_body_json(json!({"message": "JWT expired"})))
        .mount(&server)
        .await;
    let store = store_at(&server.uri());

    match store.list_active_drives().await {
        Err(StorageError::Api { status, message }) => {
            assert_eq!(status, 401);
            assert!(message.contains("JWT expired"));
        }
        other => panic!("expected Api error, got {other:?}"),
    }
}

#[tokio::test]
async fn test_error_message_is_truncated() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(500).set_body_string("x".repeat(1000)))
        .mount(&server)
        .await;
    let store = store_at(&server.uri());

    match store.get_drive(DriveId(5)).await {
        Err(StorageError::Api { status, message }) => {
            assert_eq!(status, 500);
            assert_eq!(message.len(), 200);
        }
        other => panic!("expected Api error, got {other:?}"),
    }
}

#[tokio::test]
async fn test_update_counts_returned_rows() {
    let server = MockServer::start().await;
    Mock::given(method("PATCH"))
        .and(path("/rest/v1/drive_data"))
        .and(query_param("res_id", "eq.R1"))
        .and(query_param("drive_id", "eq.5"))
        .and(header("prefer", "return=representation"))
        .and(body_partial_json(json!({"approached": true, "converted_stepper": true})))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(json!([{"id": 1, "res_id": "R1", "drive_id": 5}])),
        )
        .expect(1)
        .mount(&server)
        .await;
    let store = store_at(&server.uri());

    let rows = store
        .update_drive_data(
            &ResId::new("R1").unwrap(),
            DriveId(5),
            &DriveDataPatch::for_action(ActionType::Converted, Utc::now()),
        )
        .await
        .unwrap();

    assert_eq!(rows, 1);
}

#[tokio::test]
async fn test_update_matching_nothing_counts_zero() {
    let server = MockServer::start().await;
    Mock::given(method("PATCH"))
        .and(path("/rest/v1/drive_data"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
        .mount(&server)
        .await;
    let store = store_at(&server.uri());

    let rows = store
        .update_drive_data(
            &ResId::new("R2").unwrap(),
            DriveId(6),
            &DriveDataPatch::for_action(ActionType::Approached, Utc::now()),
        )
        .await
        .unwrap();

    assert_eq!(rows, 0);
}

#[tokio::test]
async fn test_insert_conversion_does_not_read_back() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/rest/v1/conversion_tracking"))
        .and(header("prefer", "return=minimal"))
        .and(body_partial_json(json!({
            "res_id": "R1",
            "drive_id": 5,
            "kam_email": "a@x.com",
            "action_type": "approached",
            "action_date": "2025-10-01"
        })))
        .respond_with(ResponseTemplate::new(201))
        .expect(1)
        .mount(&server)
        .await;
    let store = store_at(&server.uri());
    let entry = NewConversionEntry {
        res_id: ResId::new("R1").unwrap(),
        drive_id: DriveId(5),
        kam_email: viewer(),
        action_type: ActionType::Approached,
        action_date: chrono::NaiveDate::from_ymd_opt(2025, 10, 1),
        notes: None,
    };

    let stored = store.insert_conversion(&entry).await.unwrap();

    assert_eq!(stored.id, None);
    assert_eq!(stored.action_type, ActionType::Approached);
    assert_eq!(stored.res_id, entry.res_id);

    let requests = server.received_requests().await.unwrap();
    let body: serde_json::Value = serde_json::from_slice(&requests[0].body).unwrap();
    assert!(body.get("notes").is_none());
}

#[tokio::test]
async fn test_insert_conversion_rejected_is_api_error() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/rest/v1/conversion_tracking"))
        .respond_with(ResponseTemplate::new(403).set_body_json(json!({"message": "permission denied"})))
        .mount(&server)
        .await;
    let store = store_at(&server.uri());
    let entry = NewConversionEntry {
        res_id: ResId::new("R1").unwrap(),
        drive_id: DriveId(5),
        kam_email: viewer(),
        action_type: ActionType::Converted,
        action_date: None,
        notes: None,
    };

    assert!(matches!(
        store.insert_conversion(&entry).await,
        Err(StorageError::Api { status: 403, .. })
    ));
}
