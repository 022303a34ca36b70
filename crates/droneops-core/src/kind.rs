//! Logical entity kinds and their physical names.

use std::fmt;

/// The record kinds managed by the entity gateway.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EntityKind {
    Operation,
    Pilot,
    Drone,
    Maintenance,
    FlightLog,
    ConflictNotification,
    DroneChecklist,
}

impl EntityKind {
    pub const ALL: [EntityKind; 7] = [
        EntityKind::Operation,
        EntityKind::Pilot,
        EntityKind::Drone,
        EntityKind::Maintenance,
        EntityKind::FlightLog,
        EntityKind::ConflictNotification,
        EntityKind::DroneChecklist,
    ];

    /// Physical table name on the remote relational backend.
    pub const fn table(self) -> &'static str {
        match self {
            EntityKind::Operation => "operations",
            EntityKind::Pilot => "profiles",
            EntityKind::Drone => "drones",
            EntityKind::Maintenance => "maintenances",
            EntityKind::FlightLog => "flight_logs",
            EntityKind::ConflictNotification => "conflict_notifications",
            EntityKind::DroneChecklist => "drone_checklists",
        }
    }

    /// Namespaced key of the record-set in the local store.
    pub const fn storage_key(self) -> &'static str {
        match self {
            EntityKind::Operation => "droneops_operations",
            EntityKind::Pilot => "droneops_pilots",
            EntityKind::Drone => "droneops_drones",
            EntityKind::Maintenance => "droneops_maintenance",
            EntityKind::FlightLog => "droneops_flight_logs",
            EntityKind::ConflictNotification => "droneops_notifications",
            EntityKind::DroneChecklist => "droneops_drone_checklists",
        }
    }
}

impl fmt::Display for EntityKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            EntityKind::Operation => "Operation",
            EntityKind::Pilot => "Pilot",
            EntityKind::Drone => "Drone",
            EntityKind::Maintenance => "Maintenance",
            EntityKind::FlightLog => "FlightLog",
            EntityKind::ConflictNotification => "ConflictNotification",
            EntityKind::DroneChecklist => "DroneChecklist",
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn physical_names_are_unique() {
        let mut tables: Vec<_> = EntityKind::ALL.iter().map(|k| k.table()).collect();
        tables.sort_unstable();
        tables.dedup();
        assert_eq!(tables.len(), EntityKind::ALL.len());

        let mut keys: Vec<_> = EntityKind::ALL.iter().map(|k| k.storage_key()).collect();
        keys.sort_unstable();
        keys.dedup();
        assert_eq!(keys.len(), EntityKind::ALL.len());
    }
}
