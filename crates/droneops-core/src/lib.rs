pub mod error;
pub mod kind;
pub mod models;

pub use error::{Error, Result};
pub use kind::EntityKind;
pub use models::{
    ChecklistItem, ConflictNotification, Drone, DroneChecklist, DroneStatus, Entity, FlightLog,
    Maintenance, MaintenanceStatus, Operation, OperationStatus, Pilot, PilotStatus, Role,
};
