//! DroneOps client core.
//!
//! Mediates between a remote relational backend and a durable local
//! fallback store: uniform CRUD per entity kind with remote-then-local
//! fallback on reads and classified failures on writes, a session layer
//! with self-healing of missing profiles, and the consumption side of
//! airspace-conflict notifications.

pub mod alerts;
pub mod config;
pub mod gateway;
pub mod media;
pub mod remote;
pub mod seed;
pub mod session;
pub mod store;
pub mod system;

use std::path::PathBuf;
use std::sync::Arc;

use droneops_core::{
    ConflictNotification, Drone, DroneChecklist, FlightLog, Maintenance, Operation, Pilot, Result,
};

use crate::alerts::AlertFeed;
use crate::config::Config;
use crate::gateway::EntityHandler;
use crate::media::MediaApi;
use crate::remote::RemoteClient;
use crate::session::SessionManager;
use crate::store::LocalStore;
use crate::system::SystemApi;

/// Backend resources shared by every handler. The remote-or-local strategy
/// chosen by the configuration resolver lives here, fixed for the life of
/// the client.
pub(crate) struct Backend {
    pub(crate) remote: Option<RemoteClient>,
    pub(crate) store: LocalStore,
    pub(crate) media_dir: PathBuf,
}

impl Backend {
    pub(crate) fn remote(&self) -> Option<&RemoteClient> {
        self.remote.as_ref()
    }
}

/// Handle to the DroneOps backend: one generic gateway per entity kind,
/// the auth session manager, and the system facilities.
pub struct Client {
    pub operations: EntityHandler<Operation>,
    pub pilots: EntityHandler<Pilot>,
    pub drones: EntityHandler<Drone>,
    pub maintenance: EntityHandler<Maintenance>,
    pub flight_logs: EntityHandler<FlightLog>,
    pub notifications: EntityHandler<ConflictNotification>,
    pub checklists: EntityHandler<DroneChecklist>,
    pub auth: SessionManager,
    pub system: SystemApi,
    pub media: MediaApi,
}

impl Client {
    /// Build a client from configuration. The remote-or-local strategy is
    /// decided here, once.
    pub async fn connect(config: &Config) -> Result<Self> {
        let store = LocalStore::open(&config.db_path).await?;
        let remote = config
            .remote_enabled()
            .then(|| RemoteClient::new(config.backend_url.as_str(), config.backend_anon_key.as_str()));
        let backend = Arc::new(Backend {
            remote,
            store,
            media_dir: PathBuf::from(&config.media_dir),
        });

        Ok(Self {
            operations: EntityHandler::new(backend.clone()),
            pilots: EntityHandler::new(backend.clone()),
            drones: EntityHandler::new(backend.clone()),
            maintenance: EntityHandler::new(backend.clone()),
            flight_logs: EntityHandler::new(backend.clone()),
            notifications: EntityHandler::new(backend.clone()),
            checklists: EntityHandler::new(backend.clone()),
            auth: SessionManager::new(backend.clone()),
            system: SystemApi::new(backend.clone()),
            media: MediaApi::new(backend),
        })
    }

    /// Conflict-alert feed for one signed-in pilot.
    pub fn alerts_for(&self, pilot_id: impl Into<String>) -> AlertFeed {
        AlertFeed::new(self.notifications.clone(), pilot_id)
    }
}
