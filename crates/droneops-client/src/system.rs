//! System facilities: the equipment catalog and backend schema
//! diagnostics.

use std::collections::BTreeMap;
use std::sync::Arc;

use droneops_core::Result;
use serde::Serialize;

use crate::Backend;

/// Free-form manufacturer → model-names document.
pub type DroneCatalog = BTreeMap<String, Vec<String>>;

const CATALOG_KEY: &str = "droneops_catalog";

/// Built-in catalog used until an administrator edits it.
pub fn default_catalog() -> DroneCatalog {
    let entries: [(&str, &[&str]); 3] = [
        (
            "DJI",
            &[
                "Matrice 350 RTK",
                "Matrice 30T",
                "Mavic 3 Thermal",
                "Mavic 3 Enterprise",
                "Mini 3 Pro",
            ],
        ),
        ("Autel Robotics", &["EVO II Dual 640T V3", "EVO Max 4T"]),
        ("Parrot", &["Anafi USA", "Anafi Ai"]),
    ];
    entries
        .into_iter()
        .map(|(brand, models)| {
            (
                brand.to_string(),
                models.iter().map(|m| m.to_string()).collect(),
            )
        })
        .collect()
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum DiagStatus {
    Ok,
    Warn,
    Error,
}

/// Outcome of one diagnostic probe.
#[derive(Debug, Clone, Serialize)]
pub struct DiagnosticCheck {
    pub check: String,
    pub status: DiagStatus,
    pub message: String,
}

pub struct SystemApi {
    backend: Arc<Backend>,
}

impl SystemApi {
    pub(crate) fn new(backend: Arc<Backend>) -> Self {
        Self { backend }
    }

    /// The manufacturer catalog, falling back to the built-in default when
    /// nothing has been stored yet.
    pub async fn catalog(&self) -> DroneCatalog {
        match self.backend.store.get(CATALOG_KEY).await {
            Ok(Some(raw)) => serde_json::from_str(&raw).unwrap_or_else(|_| default_catalog()),
            _ => default_catalog(),
        }
    }

    pub async fn update_catalog(&self, catalog: &DroneCatalog) -> Result<()> {
        self.backend
            .store
            .put(CATALOG_KEY, &serde_json::to_string(catalog)?)
            .await
    }

    /// Probe the remote tables for the columns this client expects.
    pub async fn diagnose(&self) -> Vec<DiagnosticCheck> {
        let Some(remote) = self.backend.remote() else {
            return vec![DiagnosticCheck {
                check: "Offline mode".to_string(),
                status: DiagStatus::Warn,
                message: "Running against the local store only.".to_string(),
            }];
        };

        let probes = [
            (
                "Pilot profiles table",
                "profiles",
                "id,email,phone,terms_accepted,license",
            ),
            ("Airframes table", "drones", "id,last_periodic_check"),
            (
                "Operations table",
                "operations",
                "id,flight_altitude_m,radius_m",
            ),
        ];

        let mut results = Vec::with_capacity(probes.len());
        for (check, table, columns) in probes {
            let outcome = remote.select_columns(table, columns, 1).await;
            results.push(match outcome {
                Ok(_) => DiagnosticCheck {
                    check: check.to_string(),
                    status: DiagStatus::Ok,
                    message: "Expected columns present.".to_string(),
                },
                Err(err) => DiagnosticCheck {
                    check: check.to_string(),
                    status: DiagStatus::Error,
                    message: err.to_string(),
                },
            });
        }
        results
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_catalog_is_non_empty_and_sorted() {
        let catalog = default_catalog();
        assert!(catalog.contains_key("DJI"));
        assert!(catalog.values().all(|models| !models.is_empty()));
    }
}
