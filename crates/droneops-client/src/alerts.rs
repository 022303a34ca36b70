//! Airspace-conflict alert consumption.
//!
//! Conflict notifications are produced by the planning service when two
//! active operations' airspace volumes overlap; this side only retrieves
//! them for a pilot and retires them on acknowledgement. The acknowledged
//! flag is monotonic: nothing here ever resets it.

use dashmap::DashMap;
use droneops_core::{ConflictNotification, Result};
use serde_json::json;
use tracing::warn;

use crate::gateway::EntityHandler;

/// In-memory alert set for one signed-in pilot, fed by polling.
///
/// A new poll's result wholesale replaces the previous snapshot, so
/// overlapping poll cycles supersede rather than queue.
pub struct AlertFeed {
    notifications: EntityHandler<ConflictNotification>,
    pilot_id: String,
    visible: DashMap<String, ConflictNotification>,
}

impl AlertFeed {
    pub(crate) fn new(
        notifications: EntityHandler<ConflictNotification>,
        pilot_id: impl Into<String>,
    ) -> Self {
        Self {
            notifications,
            pilot_id: pilot_id.into(),
            visible: DashMap::new(),
        }
    }

    /// Fetch the unacknowledged notifications addressed to this pilot and
    /// replace the visible set with them.
    pub async fn retrieve(&self) -> Vec<ConflictNotification> {
        let items = self
            .notifications
            .filter(&json!({ "target_pilot_id": self.pilot_id, "acknowledged": false }))
            .await;
        self.visible.clear();
        for item in &items {
            self.visible.insert(item.id.clone(), item.clone());
        }
        items
    }

    /// The alerts currently shown, as of the last poll.
    pub fn current(&self) -> Vec<ConflictNotification> {
        self.visible
            .iter()
            .map(|entry| entry.value().clone())
            .collect()
    }

    /// Acknowledge one alert.
    ///
    /// The item leaves the visible set before the persistence call
    /// resolves; if that call then fails, the set is re-fetched so an
    /// unacknowledged alert is not silently lost.
    pub async fn acknowledge(&self, id: &str) -> Result<()> {
        let pending = self.visible.remove(id);
        match self
            .notifications
            .update(id, &json!({ "acknowledged": true }))
            .await
        {
            Ok(_) => Ok(()),
            Err(err) => {
                warn!(notification = id, error = %err, "acknowledge failed, re-fetching alert set");
                if pending.is_some() {
                    self.retrieve().await;
                }
                Err(err)
            }
        }
    }
}
