//! Client configuration from environment.

use std::env;

/// Startup configuration for the DroneOps client.
#[derive(Debug, Clone)]
pub struct Config {
    pub backend_url: String,
    pub backend_anon_key: String,
    pub db_path: String,
    pub media_dir: String,
}

/// Strip stray quotes and whitespace that tend to leak in from `.env`
/// files and shell exports.
fn sanitize(value: Option<String>) -> String {
    value
        .map(|v| v.replace(['"', '\''], "").trim().to_string())
        .unwrap_or_default()
}

impl Config {
    pub fn from_env() -> Self {
        Self {
            backend_url: sanitize(env::var("DRONEOPS_BACKEND_URL").ok()),
            backend_anon_key: sanitize(env::var("DRONEOPS_BACKEND_ANON_KEY").ok()),
            db_path: env::var("DRONEOPS_DB_PATH")
                .unwrap_or_else(|_| "data/droneops.db".to_string()),
            media_dir: env::var("DRONEOPS_MEDIA_DIR")
                .unwrap_or_else(|_| "data/media".to_string()),
        }
    }

    /// Local-only configuration for tests and air-gapped deployments.
    pub fn offline(db_path: impl Into<String>) -> Self {
        Self {
            backend_url: String::new(),
            backend_anon_key: String::new(),
            db_path: db_path.into(),
            media_dir: "data/media".to_string(),
        }
    }

    /// Whether a reachable, credentialed remote backend is configured.
    ///
    /// Evaluated once when the client is built; every gateway and session
    /// call follows the strategy chosen here.
    pub fn remote_enabled(&self) -> bool {
        self.backend_url.starts_with("http") && self.backend_anon_key.len() > 20
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sanitize_strips_quotes_and_whitespace() {
        assert_eq!(
            sanitize(Some("  \"https://backend.example\" ".to_string())),
            "https://backend.example"
        );
        assert_eq!(sanitize(None), "");
    }

    #[test]
    fn remote_requires_url_and_plausible_key() {
        let mut config = Config::offline(":memory:");
        assert!(!config.remote_enabled());

        config.backend_url = "https://backend.example".into();
        config.backend_anon_key = "short".into();
        assert!(!config.remote_enabled());

        config.backend_anon_key = "k".repeat(40);
        assert!(config.remote_enabled());

        config.backend_url = "backend.example".into();
        assert!(!config.remote_enabled());
    }
}
