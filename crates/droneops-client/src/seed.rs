//! Administrative and reference data seeded into the local store in
//! remote-disabled mode. All seeding is idempotent.

use chrono::{Duration, NaiveDate, Utc};
use droneops_core::{Drone, DroneStatus, EntityKind, Pilot, PilotStatus, Result, Role};
use serde_json::Value;

use crate::store::LocalStore;

/// Reserved administrative identity for remote-disabled deployments.
pub const ADMIN_ID: &str = "admin-local-id";
pub const ADMIN_EMAIL: &str = "admin@droneops.local";
/// Aliases accepted at the login prompt for the administrative identity.
pub const ADMIN_EMAILS: [&str; 3] = ["admin", "admin@droneops.local", "admin@admin.com"];
/// Fixed administrative credential, valid only while remote is disabled.
pub(crate) const ADMIN_PASSWORD: &str = "admin123";

/// The distinguished administrative pilot.
pub fn admin_pilot() -> Pilot {
    Pilot {
        id: ADMIN_ID.to_string(),
        full_name: "System Administrator".to_string(),
        email: ADMIN_EMAIL.to_string(),
        role: Role::Admin,
        status: PilotStatus::Active,
        unit: Some("Operations Center".to_string()),
        terms_accepted: true,
        password: Some(ADMIN_PASSWORD.to_string()),
        ..Pilot::default()
    }
}

/// Seeding before a local list read.
pub(crate) async fn on_list(store: &LocalStore, kind: EntityKind) -> Result<()> {
    match kind {
        EntityKind::Pilot => ensure_admin_pilot(store).await,
        EntityKind::Drone => ensure_reference_airframes(store).await,
        _ => Ok(()),
    }
}

/// Seeding before a local filter read. Only the administrative pilot is
/// guaranteed here; reference airframes are seeded on list.
pub(crate) async fn on_filter(store: &LocalStore, kind: EntityKind) -> Result<()> {
    match kind {
        EntityKind::Pilot => ensure_admin_pilot(store).await,
        _ => Ok(()),
    }
}

/// Guarantee exactly one administrative pilot in the roster. Prepends
/// rather than appends so the admin stays first in storage order.
pub(crate) async fn ensure_admin_pilot(store: &LocalStore) -> Result<()> {
    let mut records = store.read_records(EntityKind::Pilot).await?;
    let present = records
        .iter()
        .any(|record| record.get("email").and_then(Value::as_str) == Some(ADMIN_EMAIL));
    if present {
        return Ok(());
    }
    records.insert(0, serde_json::to_value(admin_pilot())?);
    store.write_records(EntityKind::Pilot, &records).await
}

/// Two reference airframes so a fresh offline install is not empty.
fn reference_airframes() -> Vec<Drone> {
    let now = Utc::now();
    vec![
        Drone {
            id: "seed-1".to_string(),
            callsign: "FALCON 01".to_string(),
            brand: "DJI".to_string(),
            model: "Matrice 30T".to_string(),
            serial_number: Some("SN12345678".to_string()),
            registration: Some("REG-12345".to_string()),
            registration_expiry: NaiveDate::from_ymd_opt(2026, 12, 31),
            status: DroneStatus::Available,
            weight_g: Some(3700.0),
            max_flight_time_min: Some(41.0),
            max_range_m: Some(7000.0),
            max_altitude_m: Some(120.0),
            payloads: vec!["Thermal".to_string(), "Zoom".to_string()],
            total_flight_hours: Some(120.5),
            last_periodic_check: Some(now - Duration::days(10)),
            ..Drone::default()
        },
        Drone {
            id: "seed-2".to_string(),
            callsign: "FALCON 02".to_string(),
            brand: "DJI".to_string(),
            model: "Mavic 3 Thermal".to_string(),
            serial_number: Some("SN87654321".to_string()),
            registration: Some("REG-54321".to_string()),
            registration_expiry: NaiveDate::from_ymd_opt(2027, 6, 30),
            status: DroneStatus::Available,
            weight_g: Some(920.0),
            max_flight_time_min: Some(45.0),
            max_range_m: Some(5000.0),
            max_altitude_m: Some(120.0),
            payloads: vec!["Thermal".to_string()],
            total_flight_hours: Some(45.2),
            last_periodic_check: Some(now - Duration::days(25)),
            ..Drone::default()
        },
    ]
}

/// Seed the reference airframes into an empty airframe table.
pub(crate) async fn ensure_reference_airframes(store: &LocalStore) -> Result<()> {
    let records = store.read_records(EntityKind::Drone).await?;
    if !records.is_empty() {
        return Ok(());
    }
    let seeds = reference_airframes()
        .iter()
        .map(serde_json::to_value)
        .collect::<std::result::Result<Vec<_>, _>>()?;
    store.write_records(EntityKind::Drone, &seeds).await
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn admin_seeding_is_idempotent_and_prepends() {
        let store = LocalStore::open(":memory:").await.unwrap();
        ensure_admin_pilot(&store).await.unwrap();
        ensure_admin_pilot(&store).await.unwrap();

        let records = store.read_records(EntityKind::Pilot).await.unwrap();
        assert_eq!(records.len(), 1);
        assert_eq!(
            records[0].get("email").and_then(Value::as_str),
            Some(ADMIN_EMAIL)
        );
    }

    #[tokio::test]
    async fn airframes_seed_only_into_an_empty_table() {
        let store = LocalStore::open(":memory:").await.unwrap();
        ensure_reference_airframes(&store).await.unwrap();
        assert_eq!(store.read_records(EntityKind::Drone).await.unwrap().len(), 2);

        // A non-empty table is left alone.
        let kept = vec![serde_json::json!({"id": "mine"})];
        store.write_records(EntityKind::Drone, &kept).await.unwrap();
        ensure_reference_airframes(&store).await.unwrap();
        assert_eq!(store.read_records(EntityKind::Drone).await.unwrap(), kept);
    }

    #[test]
    fn admin_profile_is_privileged_and_active() {
        let admin = admin_pilot();
        assert_eq!(admin.id, ADMIN_ID);
        assert_eq!(admin.role, Role::Admin);
        assert_eq!(admin.status, PilotStatus::Active);
        assert!(ADMIN_EMAILS.contains(&admin.email.as_str()));
    }
}
