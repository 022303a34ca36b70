//! Auth session manager: login, identity resolution, account
//! provisioning, credential rotation, and self-healing of profiles lost to
//! server-side provisioning races.
//!
//! The session context is two fixed store keys (an administrative flag and
//! the user-session payload) owned entirely by this module: written on
//! login or account creation, cleared on logout, and consulted by `me()`.

use std::sync::Arc;

use chrono::Utc;
use droneops_core::{EntityKind, Error, Pilot, PilotStatus, Result, Role};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{error, warn};
use uuid::Uuid;

use crate::gateway::EntityHandler;
use crate::remote::auth::AuthUser;
use crate::remote::{RemoteClient, RemoteError};
use crate::seed;
use crate::Backend;

const ADMIN_SESSION_KEY: &str = "droneops_admin_session";
const USER_SESSION_KEY: &str = "droneops_user_session";

/// Persisted user-session payload. In remote mode it carries the access
/// token so the session survives a process restart.
#[derive(Debug, Clone, Serialize, Deserialize)]
struct StoredSession {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    access_token: Option<String>,
    pilot: Pilot,
}

/// What to do when persisting a self-healed profile fails.
#[derive(Clone, Copy)]
enum HealFallback {
    /// Return the synthesized profile in memory (sign-in path); the next
    /// identity resolution retries the heal.
    Degraded,
    /// Report the failure upward (identity-resolution path); the caller
    /// must treat the identity as unauthenticated.
    Strict,
}

#[derive(Clone)]
pub struct SessionManager {
    backend: Arc<Backend>,
    pilots: EntityHandler<Pilot>,
}

impl SessionManager {
    pub(crate) fn new(backend: Arc<Backend>) -> Self {
        let pilots = EntityHandler::new(backend.clone());
        Self { backend, pilots }
    }

    /// Verify a credential and open a session.
    pub async fn login(&self, email: &str, password: &str) -> Result<Pilot> {
        if password.is_empty() {
            return Err(Error::Validation("A password is required.".into()));
        }

        let Some(remote) = self.backend.remote() else {
            return self.login_local(email, password).await;
        };

        let session = remote.sign_in(email, password).await.map_err(classify_auth)?;
        remote.set_access_token(Some(session.access_token.clone()));
        let profile = self
            .resolve_profile(remote, &session.user, HealFallback::Degraded)
            .await?;
        self.persist_session(Some(session.access_token), &profile)
            .await?;
        Ok(profile)
    }

    async fn login_local(&self, email: &str, password: &str) -> Result<Pilot> {
        let store = &self.backend.store;

        if seed::ADMIN_EMAILS.contains(&email.to_lowercase().as_str())
            && password == seed::ADMIN_PASSWORD
        {
            store.put(ADMIN_SESSION_KEY, "true").await?;
            return Ok(seed::admin_pilot());
        }

        let matched = self
            .pilots
            .filter(&serde_json::json!({ "email": email }))
            .await
            .into_iter()
            .find(|pilot| pilot.password.as_deref() == Some(password));

        match matched {
            Some(pilot) => {
                self.persist_session(None, &pilot).await?;
                Ok(pilot)
            }
            None => Err(Error::Auth(
                "Unknown user or wrong password (offline mode).".into(),
            )),
        }
    }

    /// Resolve the current identity from the session context.
    pub async fn me(&self) -> Result<Pilot> {
        let store = &self.backend.store;

        let Some(remote) = self.backend.remote() else {
            if store.get(ADMIN_SESSION_KEY).await?.as_deref() == Some("true") {
                return Ok(seed::admin_pilot());
            }
            if let Some(raw) = store.get(USER_SESSION_KEY).await? {
                let session: StoredSession = serde_json::from_str(&raw)?;
                return Ok(session.pilot);
            }
            return Err(Error::Auth("No session found (offline mode).".into()));
        };

        // A leftover offline admin marker must not shadow real auth.
        if store.get(ADMIN_SESSION_KEY).await?.is_some() {
            store.remove(ADMIN_SESSION_KEY).await?;
        }

        let token = self
            .current_token(remote)
            .await?
            .ok_or_else(|| Error::Auth("Not signed in.".into()))?;

        let user = remote.get_user(&token).await.map_err(|err| {
            if err.is_connectivity() {
                Error::Connectivity(
                    "Connection error: could not reach the authentication service. \
                     Check your network connection."
                        .into(),
                )
            } else {
                Error::Auth("Session expired or invalid. Sign in again.".into())
            }
        })?;

        self.resolve_profile(remote, &user, HealFallback::Strict).await
    }

    /// Register a new pilot account.
    ///
    /// Remote mode runs two phases: credential registration with the
    /// identity service (fatal on failure), then an explicit profile write
    /// as a guard against the asynchronous server-side provisioning
    /// trigger not having completed. The second phase is logged on
    /// failure, never raised: `me()`'s self-heal covers the gap.
    pub async fn create_account(&self, mut draft: Pilot, password: &str) -> Result<Pilot> {
        if draft.email.is_empty() || password.is_empty() {
            return Err(Error::Validation("Email and password are required.".into()));
        }

        let Some(remote) = self.backend.remote() else {
            return self.create_account_local(draft, password).await;
        };

        let display_name = if draft.full_name.is_empty() {
            "User"
        } else {
            draft.full_name.as_str()
        };
        let metadata = serde_json::json!({
            "full_name": display_name,
            "phone": draft.phone.clone().unwrap_or_default(),
            "license": draft.license.clone().unwrap_or_default(),
            "unit": draft.unit.clone().unwrap_or_default(),
            "role": draft.role,
            "terms_accepted": draft.terms_accepted,
        });

        let user = remote
            .sign_up(&draft.email, password, &metadata)
            .await
            .map_err(classify_sign_up)?;

        draft.id = user.id;
        draft.password = None;
        draft.status = PilotStatus::Active;
        draft.terms_accepted_at = Some(Utc::now());

        match remote
            .upsert(EntityKind::Pilot.table(), &serde_json::to_value(&draft)?)
            .await
        {
            Ok(_) => {}
            Err(err) => warn!(
                error = %err,
                "explicit profile write failed; the provisioning trigger or a later self-heal covers it"
            ),
        }

        Ok(draft)
    }

    async fn create_account_local(&self, mut draft: Pilot, password: &str) -> Result<Pilot> {
        let store = &self.backend.store;
        seed::ensure_admin_pilot(store).await?;

        let mut records = store.read_records(EntityKind::Pilot).await?;
        let taken = records
            .iter()
            .any(|record| record.get("email").and_then(Value::as_str) == Some(draft.email.as_str()));
        if taken {
            return Err(Error::Validation(format!(
                "A pilot with email {} already exists.",
                draft.email
            )));
        }

        draft.id = Uuid::new_v4().to_string();
        draft.role = Role::Operator;
        draft.status = PilotStatus::Active;
        draft.password = Some(password.to_string());
        draft.change_password_required = false;
        draft.terms_accepted_at = Some(Utc::now());
        draft.created_at = Some(Utc::now());

        records.push(serde_json::to_value(&draft)?);
        store.write_records(EntityKind::Pilot, &records).await?;
        self.persist_session(None, &draft).await?;
        Ok(draft)
    }

    /// Rotate a credential and clear the first-login flags. A no-op for
    /// the reserved administrative identity.
    pub async fn change_password(&self, pilot_id: &str, new_password: &str) -> Result<()> {
        if pilot_id == seed::ADMIN_ID {
            return Ok(());
        }

        let Some(remote) = self.backend.remote() else {
            return self.change_password_local(pilot_id, new_password).await;
        };

        let token = self
            .current_token(remote)
            .await?
            .ok_or_else(|| Error::Auth("Not signed in.".into()))?;
        remote
            .update_password(&token, new_password)
            .await
            .map_err(classify_auth)?;

        let flags = serde_json::json!({
            "change_password_required": false,
            "terms_accepted": true,
            "terms_accepted_at": Utc::now(),
        });
        if let Err(err) = remote
            .update(EntityKind::Pilot.table(), pilot_id, &flags)
            .await
        {
            // The session stays valid; a later access corrects the flags.
            warn!(pilot = pilot_id, error = %err, "clearing first-login flags failed");
        }
        Ok(())
    }

    async fn change_password_local(&self, pilot_id: &str, new_password: &str) -> Result<()> {
        let store = &self.backend.store;
        let mut records = store.read_records(EntityKind::Pilot).await?;
        if let Some(record) = records
            .iter_mut()
            .find(|record| record.get("id").and_then(Value::as_str) == Some(pilot_id))
        {
            if let Some(fields) = record.as_object_mut() {
                fields.insert("password".into(), Value::String(new_password.to_string()));
                fields.insert("change_password_required".into(), Value::Bool(false));
                fields.insert("terms_accepted".into(), Value::Bool(true));
            }
            store.write_records(EntityKind::Pilot, &records).await?;
        }
        Ok(())
    }

    /// Tear down the session context. Local markers are always cleared;
    /// the remote session is also signed out when remote is enabled.
    pub async fn logout(&self) -> Result<()> {
        let store = &self.backend.store;
        store.remove(ADMIN_SESSION_KEY).await?;
        store.remove(USER_SESSION_KEY).await?;

        if let Some(remote) = self.backend.remote() {
            if let Some(token) = remote.access_token() {
                if let Err(err) = remote.sign_out(&token).await {
                    warn!(error = %err, "remote sign-out failed");
                }
            }
            remote.set_access_token(None);
        }
        Ok(())
    }

    /// The live access token, restored from the persisted session payload
    /// after a process restart.
    async fn current_token(&self, remote: &RemoteClient) -> Result<Option<String>> {
        if let Some(token) = remote.access_token() {
            return Ok(Some(token));
        }
        if let Some(raw) = self.backend.store.get(USER_SESSION_KEY).await? {
            if let Ok(session) = serde_json::from_str::<StoredSession>(&raw) {
                if let Some(token) = session.access_token {
                    remote.set_access_token(Some(token.clone()));
                    return Ok(Some(token));
                }
            }
        }
        Ok(None)
    }

    /// Find the profile behind an authenticated identity, self-healing a
    /// missing record.
    ///
    /// Server-side provisioning can race with first sign-in, leaving an
    /// authenticated identity with no profile row. Rather than surfacing a
    /// hard failure, synthesize a minimal profile and persist it.
    async fn resolve_profile(
        &self,
        remote: &RemoteClient,
        user: &AuthUser,
        fallback: HealFallback,
    ) -> Result<Pilot> {
        let table = EntityKind::Pilot.table();

        if let Ok(rows) = remote
            .select(table, None, &[("id".to_string(), Value::String(user.id.clone()))])
            .await
        {
            if let Some(row) = rows.into_iter().next() {
                if let Ok(profile) = serde_json::from_value::<Pilot>(row) {
                    return Ok(profile);
                }
            }
        }

        warn!(user = %user.id, "profile missing for authenticated identity, attempting self-heal");
        let healed = synthesize_profile(user);
        match remote.insert(table, &serde_json::to_value(&healed)?).await {
            Ok(row) => Ok(serde_json::from_value(row).unwrap_or(healed)),
            Err(err) => {
                error!(user = %user.id, error = %err, "profile self-heal failed");
                match fallback {
                    HealFallback::Degraded => Ok(healed),
                    HealFallback::Strict => Err(Error::Auth(
                        "Profile not found. Sign in again once the backend has provisioned \
                         your account."
                            .into(),
                    )),
                }
            }
        }
    }

    async fn persist_session(&self, access_token: Option<String>, pilot: &Pilot) -> Result<()> {
        let payload = StoredSession {
            access_token,
            pilot: pilot.clone(),
        };
        self.backend
            .store
            .put(USER_SESSION_KEY, &serde_json::to_string(&payload)?)
            .await
    }
}

/// Minimal profile for an authenticated identity with no roster record:
/// identifier is the session subject, role is the lowest privilege.
fn synthesize_profile(user: &AuthUser) -> Pilot {
    let full_name = user
        .user_metadata
        .get("full_name")
        .and_then(Value::as_str)
        .unwrap_or("Recovered User")
        .to_string();
    Pilot {
        id: user.id.clone(),
        email: user.email.clone().unwrap_or_default(),
        full_name,
        role: Role::Operator,
        status: PilotStatus::Active,
        terms_accepted: true,
        ..Pilot::default()
    }
}

/// Map an identity-service failure into actionable caller-facing errors.
fn classify_auth(err: RemoteError) -> Error {
    if err.is_connectivity() {
        return Error::Connectivity(
            "Connection error: could not reach the authentication service. \
             Check your network connection."
                .into(),
        );
    }
    match err {
        RemoteError::Api { message, .. } => {
            if message.contains("Email not confirmed") {
                Error::Auth(
                    "Email not confirmed. Check your inbox, or ask an administrator to \
                     disable email confirmation on the backend."
                        .into(),
                )
            } else if message.contains("Email logins are disabled") {
                Error::Auth(
                    "The email sign-in provider is disabled on the backend. Enable it \
                     under Authentication > Providers."
                        .into(),
                )
            } else {
                Error::Auth(message)
            }
        }
        RemoteError::Transport(err) => Error::Auth(format!("Sign-in failed: {err}")),
    }
}

fn classify_sign_up(err: RemoteError) -> Error {
    if err.is_connectivity() {
        return Error::Connectivity(
            "Could not reach the backend. Check your internet connection.".into(),
        );
    }
    match err {
        RemoteError::Api { message, .. } => {
            if message.contains("Email logins are disabled") {
                Error::Auth(
                    "The email sign-in provider is disabled on the backend. Enable it \
                     under Authentication > Providers > Email."
                        .into(),
                )
            } else if message.contains("Database error saving new user") {
                Error::Generic(
                    "The backend rejected the signup; the profiles table is likely \
                     missing columns. Apply the pending database migration and try again."
                        .into(),
                )
            } else {
                Error::Auth(message)
            }
        }
        RemoteError::Transport(err) => Error::Auth(format!("Signup failed: {err}")),
    }
}
