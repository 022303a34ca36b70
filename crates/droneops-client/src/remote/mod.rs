//! REST client for the remote backend: the relational query surface, the
//! identity service, and the blob-storage facility.
//!
//! Errors leave this module as [`RemoteError`]; the gateway and session
//! layers classify them into the caller-facing taxonomy.

pub mod auth;
pub mod storage;

use reqwest::{header, Client, Response, StatusCode};
use serde_json::Value;
use std::sync::RwLock;
use std::time::Duration;
use thiserror::Error;

/// Raw remote failure, prior to classification.
#[derive(Debug, Error)]
pub enum RemoteError {
    /// The transport itself rejected (unreachable host, timeout, TLS).
    #[error("transport error: {0}")]
    Transport(#[from] reqwest::Error),

    /// The backend answered with an error payload.
    #[error("{message}")]
    Api { status: StatusCode, message: String },
}

impl RemoteError {
    /// True when the failure means the backend could not be reached at all,
    /// as opposed to the backend rejecting the request.
    pub fn is_connectivity(&self) -> bool {
        match self {
            RemoteError::Transport(err) => !err.is_decode(),
            RemoteError::Api { .. } => false,
        }
    }
}

/// Sort column and direction for a select, parsed from an order spec
/// string. A `-` prefix means descending.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OrderSpec {
    pub column: String,
    pub ascending: bool,
}

impl OrderSpec {
    pub fn parse(spec: &str) -> Self {
        match spec.strip_prefix('-') {
            Some(column) => Self {
                column: column.to_string(),
                ascending: false,
            },
            None => Self {
                column: spec.to_string(),
                ascending: true,
            },
        }
    }

    /// Default ordering: newest records first.
    pub fn newest_first() -> Self {
        Self {
            column: "created_at".to_string(),
            ascending: false,
        }
    }
}

/// HTTP client for the remote backend.
pub struct RemoteClient {
    pub(crate) http: Client,
    pub(crate) base_url: String,
    pub(crate) anon_key: String,
    access_token: RwLock<Option<String>>,
}

impl RemoteClient {
    pub fn new(base_url: impl Into<String>, anon_key: impl Into<String>) -> Self {
        Self {
            http: Client::builder()
                .timeout(Duration::from_secs(10))
                .build()
                .expect("Failed to create HTTP client"),
            base_url: base_url.into().trim_end_matches('/').to_string(),
            anon_key: anon_key.into(),
            access_token: RwLock::new(None),
        }
    }

    /// Install or clear the signed-in user's access token. When present it
    /// is used as the bearer credential instead of the anon key.
    pub fn set_access_token(&self, token: Option<String>) {
        if let Ok(mut slot) = self.access_token.write() {
            *slot = token;
        }
    }

    pub fn access_token(&self) -> Option<String> {
        self.access_token.read().ok().and_then(|slot| slot.clone())
    }

    fn bearer(&self) -> String {
        let token = self.access_token().unwrap_or_else(|| self.anon_key.clone());
        format!("Bearer {token}")
    }

    fn rest_url(&self, table: &str) -> String {
        format!("{}/rest/v1/{}", self.base_url, table)
    }

    pub(crate) fn apply_headers(&self, request: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        request
            .header("apikey", &self.anon_key)
            .header(header::AUTHORIZATION, self.bearer())
    }

    /// Turn a non-success response into an `Api` error carrying the
    /// backend's message.
    pub(crate) async fn check(response: Response) -> Result<Response, RemoteError> {
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }
        let body = response.text().await.unwrap_or_default();
        Err(RemoteError::Api {
            status,
            message: extract_message(&body, status),
        })
    }

    /// Select rows with optional ordering and equality qualifiers.
    pub async fn select(
        &self,
        table: &str,
        order: Option<&OrderSpec>,
        eq: &[(String, Value)],
    ) -> Result<Vec<Value>, RemoteError> {
        let mut request = self
            .http
            .get(self.rest_url(table))
            .query(&[("select", "*")]);
        if let Some(order) = order {
            let direction = if order.ascending { "asc" } else { "desc" };
            request = request.query(&[("order", format!("{}.{}", order.column, direction))]);
        }
        for (column, value) in eq {
            request = request.query(&[(column.as_str(), format!("eq.{}", literal(value)))]);
        }

        let response = Self::check(self.apply_headers(request).send().await?).await?;
        Ok(response.json().await?)
    }

    /// Select an explicit column list, bounded by `limit`. Used by the
    /// schema diagnostics to probe for expected columns.
    pub async fn select_columns(
        &self,
        table: &str,
        columns: &str,
        limit: u32,
    ) -> Result<Vec<Value>, RemoteError> {
        let limit = limit.to_string();
        let request = self
            .http
            .get(self.rest_url(table))
            .query(&[("select", columns), ("limit", limit.as_str())]);
        let response = Self::check(self.apply_headers(request).send().await?).await?;
        Ok(response.json().await?)
    }

    /// Insert one record and return the stored representation.
    pub async fn insert(&self, table: &str, record: &Value) -> Result<Value, RemoteError> {
        let request = self
            .http
            .post(self.rest_url(table))
            .header("Prefer", "return=representation")
            .json(&[record]);
        let response = Self::check(self.apply_headers(request).send().await?).await?;
        let mut rows: Vec<Value> = response.json().await?;
        rows.pop().ok_or(RemoteError::Api {
            status: StatusCode::OK,
            message: "Insert returned no representation.".to_string(),
        })
    }

    /// Insert-or-merge one record keyed on its primary key.
    pub async fn upsert(&self, table: &str, record: &Value) -> Result<Value, RemoteError> {
        let request = self
            .http
            .post(self.rest_url(table))
            .header("Prefer", "resolution=merge-duplicates,return=representation")
            .json(&[record]);
        let response = Self::check(self.apply_headers(request).send().await?).await?;
        let mut rows: Vec<Value> = response.json().await?;
        rows.pop().ok_or(RemoteError::Api {
            status: StatusCode::OK,
            message: "Upsert returned no representation.".to_string(),
        })
    }

    /// Patch the row identified by `id` and return the stored
    /// representation.
    pub async fn update(
        &self,
        table: &str,
        id: &str,
        patch: &Value,
    ) -> Result<Value, RemoteError> {
        let request = self
            .http
            .patch(self.rest_url(table))
            .query(&[("id", format!("eq.{id}"))])
            .header("Prefer", "return=representation")
            .json(patch);
        let response = Self::check(self.apply_headers(request).send().await?).await?;
        let mut rows: Vec<Value> = response.json().await?;
        rows.pop().ok_or(RemoteError::Api {
            status: StatusCode::NOT_FOUND,
            message: format!("Update matched no row in '{table}' for id {id}."),
        })
    }

    /// Delete the row identified by `id`.
    pub async fn delete(&self, table: &str, id: &str) -> Result<(), RemoteError> {
        let request = self
            .http
            .delete(self.rest_url(table))
            .query(&[("id", format!("eq.{id}"))]);
        Self::check(self.apply_headers(request).send().await?).await?;
        Ok(())
    }
}

/// Render a JSON value as a query literal for an `eq.` qualifier.
fn literal(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

/// Pull a human-readable message out of an error body. The relational
/// surface uses `message`, the identity service `msg`/`error_description`.
fn extract_message(body: &str, status: StatusCode) -> String {
    if let Ok(parsed) = serde_json::from_str::<Value>(body) {
        for field in ["message", "msg", "error_description", "error"] {
            if let Some(message) = parsed.get(field).and_then(Value::as_str) {
                if !message.is_empty() {
                    return message.to_string();
                }
            }
        }
    }
    if body.trim().is_empty() {
        format!("Backend returned {status}.")
    } else {
        body.trim().to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn order_spec_parses_direction_prefix() {
        assert_eq!(
            OrderSpec::parse("-start_time"),
            OrderSpec {
                column: "start_time".into(),
                ascending: false
            }
        );
        assert_eq!(
            OrderSpec::parse("email"),
            OrderSpec {
                column: "email".into(),
                ascending: true
            }
        );
        assert_eq!(OrderSpec::newest_first().column, "created_at");
        assert!(!OrderSpec::newest_first().ascending);
    }

    #[test]
    fn literals_render_unquoted() {
        assert_eq!(literal(&json!("abc")), "abc");
        assert_eq!(literal(&json!(false)), "false");
        assert_eq!(literal(&json!(42)), "42");
    }

    #[test]
    fn error_messages_come_from_known_fields() {
        let status = StatusCode::BAD_REQUEST;
        assert_eq!(
            extract_message(r#"{"message":"no such column"}"#, status),
            "no such column"
        );
        assert_eq!(
            extract_message(r#"{"error_description":"bad grant"}"#, status),
            "bad grant"
        );
        assert_eq!(extract_message("plain text", status), "plain text");
        assert_eq!(
            extract_message("", status),
            "Backend returned 400 Bad Request."
        );
    }
}
