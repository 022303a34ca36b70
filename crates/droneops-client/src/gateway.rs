//! Generic entity access gateway.
//!
//! One [`EntityHandler`] per entity kind provides the capability set
//! {list, filter, create, update, delete} over the remote relational
//! backend, degrading to the local store when the remote path is disabled
//! or unreachable. Reads never raise; writes propagate classified
//! failures.

use std::cmp::Ordering;
use std::marker::PhantomData;
use std::sync::Arc;

use chrono::Utc;
use droneops_core::{Entity, EntityKind, Error, Result};
use serde::de::DeserializeOwned;
use serde_json::{Map, Value};
use tracing::warn;
use uuid::Uuid;

use crate::remote::{OrderSpec, RemoteError};
use crate::seed;
use crate::Backend;

/// Which read operation is running, for kind-specific seeding of the local
/// store in remote-disabled mode.
#[derive(Clone, Copy)]
enum ReadOp {
    List,
    Filter,
}

/// Generic CRUD capability set for one entity kind.
pub struct EntityHandler<T: Entity> {
    backend: Arc<Backend>,
    _marker: PhantomData<fn() -> T>,
}

impl<T: Entity> Clone for EntityHandler<T> {
    fn clone(&self) -> Self {
        Self {
            backend: self.backend.clone(),
            _marker: PhantomData,
        }
    }
}

impl<T: Entity> EntityHandler<T> {
    pub(crate) fn new(backend: Arc<Backend>) -> Self {
        Self {
            backend,
            _marker: PhantomData,
        }
    }

    /// All records, newest first unless an explicit order spec is given
    /// (`"-field"` for descending, `"field"` for ascending).
    ///
    /// Never fails: when the remote path is disabled or errors, the local
    /// snapshot is returned instead.
    pub async fn list(&self, order: Option<&str>) -> Vec<T> {
        let order = order.map(OrderSpec::parse).unwrap_or_else(OrderSpec::newest_first);
        if let Some(remote) = self.backend.remote() {
            match remote.select(T::KIND.table(), Some(&order), &[]).await {
                Ok(rows) => decode_records(rows),
                Err(err) => {
                    warn!(kind = %T::KIND, error = %err, "remote list failed, serving local snapshot");
                    self.local_read(&[], Some(&order), None).await
                }
            }
        } else {
            self.local_read(&[], Some(&order), Some(ReadOp::List)).await
        }
    }

    /// Records whose named fields all equal the given values. `by` must be
    /// a JSON object; the equality qualifiers are pushed down to the remote
    /// query. Falls back like [`EntityHandler::list`].
    pub async fn filter(&self, by: &Value) -> Vec<T> {
        let Some(fields) = by.as_object() else {
            warn!(kind = %T::KIND, "structural filter requires a JSON object predicate");
            return Vec::new();
        };
        let eq: Vec<(String, Value)> =
            fields.iter().map(|(k, v)| (k.clone(), v.clone())).collect();

        if let Some(remote) = self.backend.remote() {
            match remote.select(T::KIND.table(), None, &eq).await {
                Ok(rows) => decode_records(rows),
                Err(err) => {
                    warn!(kind = %T::KIND, error = %err, "remote filter failed, serving local snapshot");
                    self.local_read(&eq, None, None).await
                }
            }
        } else {
            self.local_read(&eq, None, Some(ReadOp::Filter)).await
        }
    }

    /// Records satisfying an arbitrary predicate.
    ///
    /// In remote mode this fetches the full table and evaluates locally;
    /// fine at fleet scale, revisit before larger deployments.
    pub async fn filter_with<F>(&self, predicate: F) -> Vec<T>
    where
        F: Fn(&T) -> bool,
    {
        let records = if let Some(remote) = self.backend.remote() {
            match remote.select(T::KIND.table(), None, &[]).await {
                Ok(rows) => decode_records(rows),
                Err(err) => {
                    warn!(kind = %T::KIND, error = %err, "remote fetch failed, serving local snapshot");
                    self.local_read(&[], None, None).await
                }
            }
        } else {
            self.local_read(&[], None, Some(ReadOp::Filter)).await
        };
        records.into_iter().filter(|record| predicate(record)).collect()
    }

    /// Persist a new record.
    ///
    /// The credential field, if any, is stripped before the write. In
    /// remote mode the backend assigns identifier and creation timestamp;
    /// in local mode they are assigned here.
    pub async fn create(&self, draft: &T) -> Result<T> {
        let mut record = to_record(draft)?;
        record.remove("password");
        strip_unassigned(&mut record, "id");
        strip_unassigned(&mut record, "created_at");

        if let Some(remote) = self.backend.remote() {
            let row = remote
                .insert(T::KIND.table(), &Value::Object(record))
                .await
                .map_err(|err| classify_write(T::KIND, "save", err))?;
            return Ok(serde_json::from_value(row)?);
        }

        record.insert("id".into(), Value::String(Uuid::new_v4().to_string()));
        record.insert(
            "created_at".into(),
            Value::String(Utc::now().to_rfc3339()),
        );
        let value = Value::Object(record);

        let mut records = self.backend.store.read_records(T::KIND).await?;
        records.push(value.clone());
        self.backend.store.write_records(T::KIND, &records).await?;
        Ok(serde_json::from_value(value)?)
    }

    /// Merge `patch` into the record identified by `id` and return the
    /// updated record. An empty patch is a no-op.
    pub async fn update(&self, id: &str, patch: &Value) -> Result<T> {
        let fields = patch
            .as_object()
            .ok_or_else(|| Error::Validation("Update patch must be a JSON object.".into()))?;

        if let Some(remote) = self.backend.remote() {
            let row = remote
                .update(T::KIND.table(), id, patch)
                .await
                .map_err(|err| classify_write(T::KIND, "update", err))?;
            return Ok(serde_json::from_value(row)?);
        }

        let mut records = self.backend.store.read_records(T::KIND).await?;
        let updated = {
            let slot = records
                .iter_mut()
                .find(|record| record.get("id").and_then(Value::as_str) == Some(id))
                .ok_or_else(|| {
                    Error::NotFound(format!("No local {} record with id {id}.", T::KIND))
                })?;
            if let Some(target) = slot.as_object_mut() {
                for (field, value) in fields {
                    target.insert(field.clone(), value.clone());
                }
            }
            slot.clone()
        };
        self.backend.store.write_records(T::KIND, &records).await?;
        Ok(serde_json::from_value(updated)?)
    }

    /// Remove the record identified by `id`. Deleting an id that is
    /// already gone is not an error in local mode.
    pub async fn delete(&self, id: &str) -> Result<()> {
        if let Some(remote) = self.backend.remote() {
            return remote
                .delete(T::KIND.table(), id)
                .await
                .map_err(|err| classify_write(T::KIND, "delete", err));
        }

        let mut records = self.backend.store.read_records(T::KIND).await?;
        records.retain(|record| record.get("id").and_then(Value::as_str) != Some(id));
        self.backend.store.write_records(T::KIND, &records).await
    }

    /// Read from the local store: seed (when this is a first-class local
    /// read rather than a fallback), apply equality filters and ordering,
    /// decode. Failures degrade to an empty result.
    async fn local_read(
        &self,
        eq: &[(String, Value)],
        order: Option<&OrderSpec>,
        seed_for: Option<ReadOp>,
    ) -> Vec<T> {
        if let Some(op) = seed_for {
            let seeded = match op {
                ReadOp::List => seed::on_list(&self.backend.store, T::KIND).await,
                ReadOp::Filter => seed::on_filter(&self.backend.store, T::KIND).await,
            };
            if let Err(err) = seeded {
                warn!(kind = %T::KIND, error = %err, "seeding local store failed");
            }
        }

        let mut records = match self.backend.store.read_records(T::KIND).await {
            Ok(records) => records,
            Err(err) => {
                warn!(kind = %T::KIND, error = %err, "local read failed");
                return Vec::new();
            }
        };

        if !eq.is_empty() {
            records.retain(|record| {
                eq.iter()
                    .all(|(field, value)| record.get(field) == Some(value))
            });
        }
        if let Some(order) = order {
            sort_records(&mut records, order);
        }
        decode_records(records)
    }
}

fn to_record<T: Entity>(draft: &T) -> Result<Map<String, Value>> {
    match serde_json::to_value(draft)? {
        Value::Object(map) => Ok(map),
        _ => Err(Error::Validation(
            "Entity records must serialize to JSON objects.".into(),
        )),
    }
}

/// Drop a field the backend is supposed to assign when the draft left it
/// null or empty.
fn strip_unassigned(record: &mut Map<String, Value>, field: &str) {
    let unassigned = match record.get(field) {
        Some(Value::Null) => true,
        Some(Value::String(s)) => s.is_empty(),
        _ => false,
    };
    if unassigned {
        record.remove(field);
    }
}

fn decode_records<T: DeserializeOwned>(rows: Vec<Value>) -> Vec<T> {
    rows.into_iter()
        .filter_map(|row| match serde_json::from_value(row) {
            Ok(record) => Some(record),
            Err(err) => {
                warn!(error = %err, "skipping undecodable record");
                None
            }
        })
        .collect()
}

/// Order records by a column, comparing JSON values: numbers numerically,
/// strings lexically (RFC 3339 timestamps sort correctly this way).
/// Records without the column sort last in descending order.
fn sort_records(records: &mut [Value], order: &OrderSpec) {
    records.sort_by(|a, b| {
        let ordering = compare_fields(a.get(&order.column), b.get(&order.column));
        if order.ascending {
            ordering
        } else {
            ordering.reverse()
        }
    });
}

fn compare_fields(a: Option<&Value>, b: Option<&Value>) -> Ordering {
    let a = a.filter(|v| !v.is_null());
    let b = b.filter(|v| !v.is_null());
    match (a, b) {
        (Some(Value::Number(x)), Some(Value::Number(y))) => x
            .as_f64()
            .partial_cmp(&y.as_f64())
            .unwrap_or(Ordering::Equal),
        (Some(Value::String(x)), Some(Value::String(y))) => x.cmp(y),
        (Some(Value::Bool(x)), Some(Value::Bool(y))) => x.cmp(y),
        (Some(_), Some(_)) => Ordering::Equal,
        (Some(_), None) => Ordering::Greater,
        (None, Some(_)) => Ordering::Less,
        (None, None) => Ordering::Equal,
    }
}

/// Map a raw remote failure on a write path into the caller-facing
/// taxonomy: connectivity, schema mismatch, or passthrough.
fn classify_write(kind: EntityKind, verb: &str, err: RemoteError) -> Error {
    if err.is_connectivity() {
        return Error::Connectivity(
            "Connection error: could not reach the backend. Check your network connection \
             and that the backend is not blocked by a firewall."
                .into(),
        );
    }
    match err {
        RemoteError::Api { message, .. } => {
            if let Some(column) = missing_column(&message) {
                Error::Schema {
                    table: kind.table().to_string(),
                    column,
                }
            } else {
                Error::Generic(format!("Failed to {verb} {kind}: {message}"))
            }
        }
        RemoteError::Transport(err) => Error::Generic(format!("Failed to {verb} {kind}: {err}")),
    }
}

/// Parse the relational backend's "Could not find the 'x' column" message.
fn missing_column(message: &str) -> Option<String> {
    let rest = message.split("Could not find the '").nth(1)?;
    let column = rest.split('\'').next()?;
    (!column.is_empty()).then(|| column.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn missing_column_is_parsed_from_backend_message() {
        let message = "Could not find the 'terms_accepted' column of 'profiles' in the schema cache";
        assert_eq!(missing_column(message).as_deref(), Some("terms_accepted"));
        assert_eq!(missing_column("permission denied"), None);
    }

    #[test]
    fn schema_failures_are_classified_from_the_message() {
        let err = classify_write(
            EntityKind::Pilot,
            "save",
            RemoteError::Api {
                status: reqwest::StatusCode::BAD_REQUEST,
                message: "Could not find the 'license' column of 'profiles' in the schema cache"
                    .into(),
            },
        );
        assert!(matches!(
            err,
            Error::Schema { ref table, ref column } if table == "profiles" && column == "license"
        ));
    }

    #[test]
    fn unrecognized_api_errors_pass_the_message_through() {
        let err = classify_write(
            EntityKind::Drone,
            "update",
            RemoteError::Api {
                status: reqwest::StatusCode::CONFLICT,
                message: "duplicate key value".into(),
            },
        );
        match err {
            Error::Generic(message) => assert!(message.contains("duplicate key value")),
            other => panic!("expected Generic, got {other:?}"),
        }
    }

    #[test]
    fn sort_orders_timestamps_descending() {
        let mut records = vec![
            json!({"id": "a", "created_at": "2026-01-01T00:00:00+00:00"}),
            json!({"id": "c", "created_at": "2026-03-01T00:00:00+00:00"}),
            json!({"id": "b", "created_at": "2026-02-01T00:00:00+00:00"}),
            json!({"id": "none"}),
        ];
        sort_records(&mut records, &OrderSpec::newest_first());
        let ids: Vec<_> = records
            .iter()
            .map(|r| r.get("id").and_then(Value::as_str).unwrap())
            .collect();
        assert_eq!(ids, ["c", "b", "a", "none"]);
    }

    #[test]
    fn sort_orders_numbers_ascending() {
        let mut records = vec![
            json!({"altitude": 90.0}),
            json!({"altitude": 30.0}),
            json!({"altitude": 60.0}),
        ];
        sort_records(&mut records, &OrderSpec::parse("altitude"));
        let altitudes: Vec<_> = records
            .iter()
            .map(|r| r.get("altitude").and_then(Value::as_f64).unwrap())
            .collect();
        assert_eq!(altitudes, [30.0, 60.0, 90.0]);
    }

    #[test]
    fn unassigned_fields_are_stripped_from_drafts() {
        let mut record = json!({"id": "", "created_at": null, "name": "op"})
            .as_object()
            .cloned()
            .unwrap();
        strip_unassigned(&mut record, "id");
        strip_unassigned(&mut record, "created_at");
        assert!(!record.contains_key("id"));
        assert!(!record.contains_key("created_at"));
        assert!(record.contains_key("name"));

        let mut keep = json!({"id": "real-id"}).as_object().cloned().unwrap();
        strip_unassigned(&mut keep, "id");
        assert!(keep.contains_key("id"));
    }
}
