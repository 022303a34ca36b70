//! Identity-service endpoints: sign-up, password sign-in, sign-out,
//! current-identity lookup, and credential rotation.

use reqwest::StatusCode;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::{RemoteClient, RemoteError};

/// Identity as reported by the auth service.
#[derive(Debug, Clone, Deserialize)]
pub struct AuthUser {
    pub id: String,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub user_metadata: Value,
}

/// A verified session returned by the password grant.
#[derive(Debug, Clone, Deserialize)]
pub struct AuthSession {
    pub access_token: String,
    #[serde(default)]
    pub refresh_token: Option<String>,
    pub user: AuthUser,
}

#[derive(Debug, Serialize)]
struct PasswordGrant<'a> {
    email: &'a str,
    password: &'a str,
}

#[derive(Debug, Serialize)]
struct SignUpRequest<'a> {
    email: &'a str,
    password: &'a str,
    data: &'a Value,
}

impl RemoteClient {
    fn auth_url(&self, path: &str) -> String {
        format!("{}/auth/v1/{}", self.base_url, path)
    }

    /// Verify a credential and open a remote session.
    pub async fn sign_in(&self, email: &str, password: &str) -> Result<AuthSession, RemoteError> {
        let request = self
            .http
            .post(self.auth_url("token"))
            .query(&[("grant_type", "password")])
            .header("apikey", &self.anon_key)
            .json(&PasswordGrant { email, password });
        let response = Self::check(request.send().await?).await?;
        Ok(response.json().await?)
    }

    /// Register a credential plus profile metadata with the identity
    /// service. Depending on confirmation settings the service wraps the
    /// identity in a session or returns it bare.
    pub async fn sign_up(
        &self,
        email: &str,
        password: &str,
        metadata: &Value,
    ) -> Result<AuthUser, RemoteError> {
        let request = self
            .http
            .post(self.auth_url("signup"))
            .header("apikey", &self.anon_key)
            .json(&SignUpRequest {
                email,
                password,
                data: metadata,
            });
        let response = Self::check(request.send().await?).await?;
        let body: Value = response.json().await?;
        let user = body.get("user").cloned().unwrap_or(body);
        serde_json::from_value(user).map_err(|err| RemoteError::Api {
            status: StatusCode::OK,
            message: format!("Malformed signup response: {err}"),
        })
    }

    /// Resolve the identity behind `token`.
    pub async fn get_user(&self, token: &str) -> Result<AuthUser, RemoteError> {
        let request = self
            .http
            .get(self.auth_url("user"))
            .header("apikey", &self.anon_key)
            .header("Authorization", format!("Bearer {token}"));
        let response = Self::check(request.send().await?).await?;
        Ok(response.json().await?)
    }

    /// Rotate the signed-in user's password.
    pub async fn update_password(
        &self,
        token: &str,
        new_password: &str,
    ) -> Result<(), RemoteError> {
        let request = self
            .http
            .put(self.auth_url("user"))
            .header("apikey", &self.anon_key)
            .header("Authorization", format!("Bearer {token}"))
            .json(&serde_json::json!({ "password": new_password }));
        Self::check(request.send().await?).await?;
        Ok(())
    }

    /// Invalidate the remote session behind `token`.
    pub async fn sign_out(&self, token: &str) -> Result<(), RemoteError> {
        let request = self
            .http
            .post(self.auth_url("logout"))
            .header("apikey", &self.anon_key)
            .header("Authorization", format!("Bearer {token}"));
        Self::check(request.send().await?).await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn auth_user_tolerates_sparse_payloads() {
        let user: AuthUser = serde_json::from_value(json!({ "id": "sub-1" })).unwrap();
        assert_eq!(user.id, "sub-1");
        assert!(user.email.is_none());
        assert!(user.user_metadata.is_null());
    }

    #[test]
    fn session_decodes_password_grant_payload() {
        let session: AuthSession = serde_json::from_value(json!({
            "access_token": "tok",
            "token_type": "bearer",
            "user": { "id": "sub-1", "email": "p@example.org" }
        }))
        .unwrap();
        assert_eq!(session.access_token, "tok");
        assert_eq!(session.user.email.as_deref(), Some("p@example.org"));
        assert!(session.refresh_token.is_none());
    }
}
