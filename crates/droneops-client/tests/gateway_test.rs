//! Gateway behavior against the local store.
//!
//! Everything here runs offline with an in-memory store; flows that need a
//! provisioned backend live in `remote_backend_test.rs`.

use droneops_client::{config::Config, seed, Client};
use droneops_core::{Error, Operation, OperationStatus};
use serde_json::json;
use std::time::Duration;
use tokio::time::sleep;

async fn offline_client() -> Client {
    Client::connect(&Config::offline(":memory:"))
        .await
        .expect("offline client")
}

fn sample_operation(name: &str) -> Operation {
    Operation {
        name: name.to_string(),
        status: OperationStatus::Active,
        latitude: Some(-25.4284),
        longitude: Some(-49.2733),
        flight_altitude_m: Some(90.0),
        ..Operation::default()
    }
}

#[tokio::test]
async fn create_then_filter_by_id_returns_the_record() {
    let client = offline_client().await;

    let created = client
        .operations
        .create(&sample_operation("Bridge survey"))
        .await
        .unwrap();
    assert!(!created.id.is_empty());
    assert!(created.created_at.is_some());

    let found = client
        .operations
        .filter(&json!({ "id": created.id.clone() }))
        .await;
    assert_eq!(found, vec![created]);
}

#[tokio::test]
async fn empty_update_is_a_noop() {
    let client = offline_client().await;
    let created = client
        .operations
        .create(&sample_operation("Levee inspection"))
        .await
        .unwrap();

    let after = client
        .operations
        .update(&created.id, &json!({}))
        .await
        .unwrap();
    assert_eq!(after, created);
}

#[tokio::test]
async fn update_merges_partial_fields() {
    let client = offline_client().await;
    let created = client
        .operations
        .create(&sample_operation("Night patrol"))
        .await
        .unwrap();

    let after = client
        .operations
        .update(&created.id, &json!({ "status": "completed" }))
        .await
        .unwrap();
    assert_eq!(after.status, OperationStatus::Completed);
    assert_eq!(after.name, created.name);
    assert_eq!(after.latitude, created.latitude);
}

#[tokio::test]
async fn update_of_missing_id_is_not_found() {
    let client = offline_client().await;
    let err = client
        .operations
        .update("no-such-id", &json!({ "name": "x" }))
        .await
        .unwrap_err();
    assert!(matches!(err, Error::NotFound(_)));
}

#[tokio::test]
async fn delete_is_idempotent_locally() {
    let client = offline_client().await;
    let created = client
        .operations
        .create(&sample_operation("Training flight"))
        .await
        .unwrap();

    client.operations.delete(&created.id).await.unwrap();
    client.operations.delete(&created.id).await.unwrap();
    assert!(client
        .operations
        .filter(&json!({ "id": created.id.clone() }))
        .await
        .is_empty());
}

#[tokio::test]
async fn list_returns_newest_first_by_default() {
    let client = offline_client().await;
    for name in ["first", "second", "third"] {
        client
            .operations
            .create(&sample_operation(name))
            .await
            .unwrap();
        sleep(Duration::from_millis(10)).await;
    }

    let names: Vec<_> = client
        .operations
        .list(None)
        .await
        .into_iter()
        .map(|op| op.name)
        .collect();
    assert_eq!(names, ["third", "second", "first"]);
}

#[tokio::test]
async fn list_honors_an_explicit_order_spec() {
    let client = offline_client().await;
    for name in ["bravo", "alpha", "charlie"] {
        client
            .operations
            .create(&sample_operation(name))
            .await
            .unwrap();
    }

    let names: Vec<_> = client
        .operations
        .list(Some("name"))
        .await
        .into_iter()
        .map(|op| op.name)
        .collect();
    assert_eq!(names, ["alpha", "bravo", "charlie"]);

    let names: Vec<_> = client
        .operations
        .list(Some("-name"))
        .await
        .into_iter()
        .map(|op| op.name)
        .collect();
    assert_eq!(names, ["charlie", "bravo", "alpha"]);
}

#[tokio::test]
async fn filter_with_evaluates_an_arbitrary_predicate() {
    let client = offline_client().await;
    client
        .operations
        .create(&sample_operation("keep"))
        .await
        .unwrap();
    let mut done = sample_operation("drop");
    done.status = OperationStatus::Completed;
    client.operations.create(&done).await.unwrap();

    let active = client
        .operations
        .filter_with(|op| op.status == OperationStatus::Active)
        .await;
    assert_eq!(active.len(), 1);
    assert_eq!(active[0].name, "keep");
}

#[tokio::test]
async fn fresh_store_seeds_exactly_one_admin_pilot() {
    let client = offline_client().await;

    let pilots = client.pilots.list(None).await;
    let admins: Vec<_> = pilots
        .iter()
        .filter(|p| p.email == seed::ADMIN_EMAIL)
        .collect();
    assert_eq!(admins.len(), 1);

    // A second read (filter path) does not duplicate the seed.
    let again = client
        .pilots
        .filter(&json!({ "email": seed::ADMIN_EMAIL }))
        .await;
    assert_eq!(again.len(), 1);
}

#[tokio::test]
async fn drone_list_seeds_reference_airframes_once() {
    let client = offline_client().await;
    assert_eq!(client.drones.list(None).await.len(), 2);
    assert_eq!(client.drones.list(None).await.len(), 2);
}

#[tokio::test]
async fn credential_field_never_persists_through_create() {
    let client = offline_client().await;
    let draft = droneops_core::Pilot {
        full_name: "Casey Reeves".to_string(),
        email: "casey@example.org".to_string(),
        password: Some("should-be-stripped".to_string()),
        ..droneops_core::Pilot::default()
    };

    let created = client.pilots.create(&draft).await.unwrap();
    assert!(created.password.is_none());

    let stored = client
        .pilots
        .filter(&json!({ "id": created.id.clone() }))
        .await;
    assert!(stored[0].password.is_none());
}

#[tokio::test]
async fn every_entity_kind_round_trips_through_its_handler() {
    use droneops_core::{ChecklistItem, DroneChecklist, FlightLog, Maintenance};

    let client = offline_client().await;

    let log = client
        .flight_logs
        .create(&FlightLog {
            drone_id: Some("seed-1".to_string()),
            duration_min: Some(34.5),
            notes: Some("nominal".to_string()),
            ..FlightLog::default()
        })
        .await
        .unwrap();
    assert_eq!(
        client
            .flight_logs
            .filter(&json!({ "id": log.id.clone() }))
            .await,
        vec![log]
    );

    let checklist = client
        .checklists
        .create(&DroneChecklist {
            drone_id: "seed-1".to_string(),
            items: vec![ChecklistItem {
                label: "Propellers secured".to_string(),
                ok: true,
                note: None,
            }],
            passed: true,
            ..DroneChecklist::default()
        })
        .await
        .unwrap();
    assert_eq!(
        client
            .checklists
            .filter(&json!({ "id": checklist.id.clone() }))
            .await,
        vec![checklist]
    );

    let job = client
        .maintenance
        .create(&Maintenance {
            drone_id: "seed-1".to_string(),
            description: "Gimbal recalibration".to_string(),
            ..Maintenance::default()
        })
        .await
        .unwrap();
    client
        .maintenance
        .update(&job.id, &json!({ "status": "completed" }))
        .await
        .unwrap();
    client.maintenance.delete(&job.id).await.unwrap();
    assert!(client
        .maintenance
        .filter(&json!({ "id": job.id.clone() }))
        .await
        .is_empty());
}

#[tokio::test]
async fn unreachable_remote_falls_back_on_reads_and_classifies_writes() {
    // Remote "enabled" but pointing at a closed loopback port: reads must
    // degrade silently, writes must surface a connectivity failure.
    let config = Config {
        backend_url: "http://127.0.0.1:9".to_string(),
        backend_anon_key: "k".repeat(40),
        db_path: ":memory:".to_string(),
        media_dir: "data/media".to_string(),
    };
    let client = Client::connect(&config).await.unwrap();

    let listed = client.operations.list(None).await;
    assert!(listed.is_empty());

    let err = client
        .operations
        .create(&sample_operation("unreachable"))
        .await
        .unwrap_err();
    assert!(matches!(err, Error::Connectivity(_)));
}
