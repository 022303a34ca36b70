//! Entity records exchanged with the backend and the local store.
//!
//! Every record carries an opaque `id` (empty on a draft that has not been
//! persisted yet) and an optional `created_at` assigned at first
//! persistence. Optional wire fields default so that records written by
//! older versions still decode.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{de::DeserializeOwned, Deserialize, Serialize};

use crate::kind::EntityKind;

/// A named record kind with a unique identifier, usable with the generic
/// entity gateway.
pub trait Entity: Serialize + DeserializeOwned + Clone + Send + Sync + 'static {
    const KIND: EntityKind;

    /// Unique opaque identifier.
    fn id(&self) -> &str;
}

/// Access level of a pilot profile.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    Admin,
    Supervisor,
    /// Lowest privilege; the default for new and self-healed profiles.
    #[default]
    Operator,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PilotStatus {
    #[default]
    Active,
    Inactive,
    Suspended,
}

/// Pilot profile. Lives in the `profiles` table remotely and doubles as the
/// roster entry in remote-disabled mode.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Pilot {
    #[serde(default)]
    pub id: String,
    #[serde(default)]
    pub full_name: String,
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub role: Role,
    #[serde(default)]
    pub status: PilotStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub phone: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub license: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub unit: Option<String>,
    #[serde(default)]
    pub change_password_required: bool,
    #[serde(default)]
    pub terms_accepted: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub terms_accepted_at: Option<DateTime<Utc>>,
    /// Roster credential, only meaningful in remote-disabled mode. The
    /// gateway strips this field before any create.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub password: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<DateTime<Utc>>,
}

impl Entity for Pilot {
    const KIND: EntityKind = EntityKind::Pilot;

    fn id(&self) -> &str {
        &self.id
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OperationStatus {
    #[default]
    Planned,
    Active,
    Completed,
    Cancelled,
}

/// A dispatched flight operation, rendered on the operations-center map.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Operation {
    #[serde(default)]
    pub id: String,
    #[serde(default)]
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub incident_number: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mission_type: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sub_mission_type: Option<String>,
    #[serde(default)]
    pub status: OperationStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub latitude: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub longitude: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub flight_altitude_m: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub radius_m: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub start_time: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub end_time: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub drone_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pilot_id: Option<String>,
    /// Live video feed for the operations-center view, when available.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub stream_url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<DateTime<Utc>>,
}

impl Entity for Operation {
    const KIND: EntityKind = EntityKind::Operation;

    fn id(&self) -> &str {
        &self.id
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DroneStatus {
    #[default]
    Available,
    InOperation,
    Maintenance,
    Retired,
}

/// A registered airframe.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Drone {
    #[serde(default)]
    pub id: String,
    #[serde(default)]
    pub callsign: String,
    #[serde(default)]
    pub brand: String,
    #[serde(default)]
    pub model: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub serial_number: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub registration: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub registration_expiry: Option<NaiveDate>,
    #[serde(default)]
    pub status: DroneStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub weight_g: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_flight_time_min: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_range_m: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_altitude_m: Option<f64>,
    #[serde(default)]
    pub payloads: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub total_flight_hours: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_periodic_check: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<DateTime<Utc>>,
}

impl Entity for Drone {
    const KIND: EntityKind = EntityKind::Drone;

    fn id(&self) -> &str {
        &self.id
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MaintenanceStatus {
    #[default]
    Pending,
    InProgress,
    Completed,
}

/// A maintenance record for one airframe. `drone_id` is a lookup-only
/// reference; the airframe may have been deleted since.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Maintenance {
    #[serde(default)]
    pub id: String,
    #[serde(default)]
    pub drone_id: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub status: MaintenanceStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub maintenance_date: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cost: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<DateTime<Utc>>,
}

impl Entity for Maintenance {
    const KIND: EntityKind = EntityKind::Maintenance;

    fn id(&self) -> &str {
        &self.id
    }
}

/// Post-flight log entry.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FlightLog {
    #[serde(default)]
    pub id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub operation_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub drone_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pilot_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub flight_date: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub duration_min: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub distance_m: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<DateTime<Utc>>,
}

impl Entity for FlightLog {
    const KIND: EntityKind = EntityKind::FlightLog;

    fn id(&self) -> &str {
        &self.id
    }
}

/// Alert raised by the planning service when two active operations'
/// airspace volumes overlap. This client only retrieves and retires these;
/// it never creates them.
///
/// `acknowledged` is monotonic: once true it is never reset.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ConflictNotification {
    #[serde(default)]
    pub id: String,
    #[serde(default)]
    pub target_pilot_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub conflicting_op_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub conflicting_op_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub conflicting_pilot_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub conflicting_pilot_phone: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub conflicting_op_altitude_m: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub conflicting_op_radius_m: Option<f64>,
    #[serde(default)]
    pub acknowledged: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<DateTime<Utc>>,
}

impl Entity for ConflictNotification {
    const KIND: EntityKind = EntityKind::ConflictNotification;

    fn id(&self) -> &str {
        &self.id
    }
}

/// One line of a pre-flight checklist.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ChecklistItem {
    #[serde(default)]
    pub label: String,
    #[serde(default)]
    pub ok: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub note: Option<String>,
}

/// Completed pre-flight checklist for one airframe.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DroneChecklist {
    #[serde(default)]
    pub id: String,
    #[serde(default)]
    pub drone_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pilot_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub operation_id: Option<String>,
    #[serde(default)]
    pub items: Vec<ChecklistItem>,
    #[serde(default)]
    pub passed: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub completed_at: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<DateTime<Utc>>,
}

impl Entity for DroneChecklist {
    const KIND: EntityKind = EntityKind::DroneChecklist;

    fn id(&self) -> &str {
        &self.id
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn roles_serialize_lowercase() {
        assert_eq!(serde_json::to_value(Role::Admin).unwrap(), "admin");
        assert_eq!(serde_json::to_value(Role::Operator).unwrap(), "operator");
        assert_eq!(
            serde_json::to_value(DroneStatus::InOperation).unwrap(),
            "in_operation"
        );
    }

    #[test]
    fn default_role_is_lowest_privilege() {
        assert_eq!(Role::default(), Role::Operator);
    }

    #[test]
    fn records_decode_with_missing_optional_fields() {
        let pilot: Pilot =
            serde_json::from_str(r#"{"id":"p1","email":"p1@example.org"}"#).unwrap();
        assert_eq!(pilot.role, Role::Operator);
        assert_eq!(pilot.status, PilotStatus::Active);
        assert!(pilot.created_at.is_none());

        let alert: ConflictNotification =
            serde_json::from_str(r#"{"id":"n1","target_pilot_id":"p1"}"#).unwrap();
        assert!(!alert.acknowledged);
    }
}
