//! Failure taxonomy shared across the client.

use thiserror::Error;

pub type Result<T, E = Error> = std::result::Result<T, E>;

/// Classified failures surfaced to callers.
///
/// Display strings are complete sentences meant to be shown to the operator
/// verbatim. Read paths never surface these; write and auth paths always do.
#[derive(Debug, Error)]
pub enum Error {
    /// Malformed input; no I/O was attempted.
    #[error("{0}")]
    Validation(String),

    /// The transport could not reach the backend.
    #[error("{0}")]
    Connectivity(String),

    /// The remote backend rejected a request because an expected column is
    /// missing or renamed.
    #[error("Backend schema out of date: missing column '{column}' in table '{table}'.")]
    Schema { table: String, column: String },

    /// Bad credential or a disallowed account state.
    #[error("{0}")]
    Auth(String),

    /// A local lookup missed.
    #[error("{0}")]
    NotFound(String),

    /// Unclassified failure; the backend message is passed through.
    #[error("{0}")]
    Generic(String),
}

impl From<serde_json::Error> for Error {
    fn from(err: serde_json::Error) -> Self {
        Error::Generic(format!("Record serialization failed: {err}"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn schema_error_names_the_missing_column() {
        let err = Error::Schema {
            table: "profiles".into(),
            column: "terms_accepted".into(),
        };
        let shown = err.to_string();
        assert!(shown.contains("profiles"));
        assert!(shown.contains("terms_accepted"));
    }

    #[test]
    fn messages_pass_through_verbatim() {
        let err = Error::Auth("Email not confirmed. Check your inbox.".into());
        assert_eq!(err.to_string(), "Email not confirmed. Check your inbox.");
    }
}
