//! REST implementation of [`RemoteGateway`] for the hosted backend.
//!
//! Speaks the backend's three surfaces:
//!
//! - `/auth/v1` - password sign-in/sign-up, session tokens
//! - `/rest/v1` - table CRUD with `column=eq.value` filters
//! - `/storage/v1` - object upload and public URL derivation
//!
//! The signed-in session (access token + identity) is held behind a lock;
//! [`RemoteGateway::current_identity`] reads the cached session without a
//! network round trip. The backend re-validates the token on every data
//! call, so a revoked session surfaces as a rejected request there.

use std::sync::RwLock;

use async_trait::async_trait;
use reqwest::Response;
use secrecy::{ExposeSecret, SecretString};
use serde::Deserialize;
use serde_json::Value;
use tracing::{debug, instrument};

use kiosk_core::{Email, UserId};

use super::{GatewayError, Identity, RemoteGateway};
use crate::config::StorefrontConfig;

/// An established auth session.
struct Session {
    access_token: SecretString,
    identity: Identity,
}

/// REST client for the hosted backend.
pub struct RestGateway {
    http: reqwest::Client,
    /// Base URL without a trailing slash.
    base: String,
    anon_key: SecretString,
    session: RwLock<Option<Session>>,
}

/// Auth user payload shared by the token and signup endpoints.
#[derive(Deserialize)]
struct AuthUser {
    id: uuid::Uuid,
}

/// Response of the password-grant token endpoint.
#[derive(Deserialize)]
struct TokenResponse {
    access_token: String,
    user: AuthUser,
}

/// Response of the signup endpoint.
///
/// With auto-confirm enabled the backend returns a full session; otherwise
/// only the bare user object.
#[derive(Deserialize)]
struct SignupResponse {
    access_token: Option<String>,
    user: Option<AuthUser>,
    id: Option<uuid::Uuid>,
}

impl RestGateway {
    /// Create a gateway from configuration.
    ///
    /// # Errors
    ///
    /// Returns [`GatewayError::Http`] if the HTTP client cannot be built.
    pub fn new(config: &StorefrontConfig) -> Result<Self, GatewayError> {
        let http = reqwest::Client::builder()
            .timeout(config.request_timeout)
            .build()?;

        Ok(Self {
            http,
            base: config.backend_url.as_str().trim_end_matches('/').to_owned(),
            anon_key: config.anon_key.clone(),
            session: RwLock::new(None),
        })
    }

    /// Bearer token for data calls: the session token when signed in,
    /// the anonymous key otherwise.
    fn bearer(&self) -> SecretString {
        self.read_session()
            .as_ref()
            .map_or_else(|| self.anon_key.clone(), |s| s.access_token.clone())
    }

    fn read_session(&self) -> std::sync::RwLockReadGuard<'_, Option<Session>> {
        self.session
            .read()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
    }

    fn write_session(&self) -> std::sync::RwLockWriteGuard<'_, Option<Session>> {
        self.session
            .write()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
    }

    fn table_url(&self, table: &str) -> String {
        format!("{}/rest/v1/{table}", self.base)
    }

    fn object_url(&self, bucket: &str, path: &str) -> String {
        format!("{}/storage/v1/object/{bucket}/{path}", self.base)
    }

    /// Attach the standard auth headers to a request.
    fn authed(&self, req: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        req.header("apikey", self.anon_key.expose_secret())
            .bearer_auth(self.bearer().expose_secret())
    }
}

/// Map a transport error, distinguishing timeouts.
fn transport(e: reqwest::Error) -> GatewayError {
    if e.is_timeout() {
        GatewayError::Timeout
    } else {
        GatewayError::Http(e)
    }
}

/// Turn a non-success response into [`GatewayError::Rejected`].
async fn ensure_success(resp: Response) -> Result<Response, GatewayError> {
    let status = resp.status();
    if status.is_success() {
        return Ok(resp);
    }
    let message = resp.text().await.unwrap_or_default();
    Err(GatewayError::Rejected {
        status: status.as_u16(),
        message,
    })
}

#[async_trait]
impl RemoteGateway for RestGateway {
    async fn current_identity(&self) -> Result<Option<Identity>, GatewayError> {
        Ok(self.read_session().as_ref().map(|s| s.identity.clone()))
    }

    #[instrument(skip(self, password), fields(email = %email))]
    async fn sign_in(&self, email: &Email, password: &str) -> Result<Identity, GatewayError> {
        let url = format!("{}/auth/v1/token?grant_type=password", self.base);
        let resp = self
            .http
            .post(&url)
            .header("apikey", self.anon_key.expose_secret())
            .json(&serde_json::json!({ "email": email, "password": password }))
            .send()
            .await
            .map_err(transport)?;

        let token: TokenResponse = ensure_success(resp).await?.json().await.map_err(transport)?;

        let identity = Identity {
            id: UserId::new(token.user.id),
            email: email.clone(),
        };
        *self.write_session() = Some(Session {
            access_token: token.access_token.into(),
            identity: identity.clone(),
        });
        debug!(user_id = %identity.id, "signed in");
        Ok(identity)
    }

    #[instrument(skip(self, password), fields(email = %email))]
    async fn sign_up(&self, email: &Email, password: &str) -> Result<Identity, GatewayError> {
        let url = format!("{}/auth/v1/signup", self.base);
        let resp = self
            .http
            .post(&url)
            .header("apikey", self.anon_key.expose_secret())
            .json(&serde_json::json!({ "email": email, "password": password }))
            .send()
            .await
            .map_err(transport)?;

        let signup: SignupResponse =
            ensure_success(resp).await?.json().await.map_err(transport)?;

        let user_id = signup
            .user
            .map(|u| u.id)
            .or(signup.id)
            .ok_or_else(|| GatewayError::Unavailable("signup response missing user id".into()))?;

        let identity = Identity {
            id: UserId::new(user_id),
            email: email.clone(),
        };

        // Auto-confirm deployments hand back a session right away.
        if let Some(access_token) = signup.access_token {
            *self.write_session() = Some(Session {
                access_token: access_token.into(),
                identity: identity.clone(),
            });
        }
        debug!(user_id = %identity.id, "signed up");
        Ok(identity)
    }

    #[instrument(skip(self))]
    async fn sign_out(&self) -> Result<(), GatewayError> {
        let token = self
            .read_session()
            .as_ref()
            .map(|s| s.access_token.clone());

        // The local session is gone either way; token revocation is best
        // effort because the token also expires on its own.
        *self.write_session() = None;

        if let Some(token) = token {
            let url = format!("{}/auth/v1/logout", self.base);
            let result = self
                .http
                .post(&url)
                .header("apikey", self.anon_key.expose_secret())
                .bearer_auth(token.expose_secret())
                .send()
                .await;
            if let Err(e) = result {
                debug!(error = %e, "token revocation failed");
            }
        }
        Ok(())
    }

    #[instrument(skip(self))]
    async fn find_one(
        &self,
        table: &str,
        column: &str,
        value: &str,
    ) -> Result<Option<Value>, GatewayError> {
        let predicate = format!("eq.{value}");
        let resp = self
            .authed(self.http.get(self.table_url(table)))
            .query(&[
                ("select", "*"),
                (column, predicate.as_str()),
                ("limit", "1"),
            ])
            .send()
            .await
            .map_err(transport)?;

        let rows: Vec<Value> = ensure_success(resp).await?.json().await.map_err(transport)?;
        Ok(rows.into_iter().next())
    }

    #[instrument(skip(self))]
    async fn find_all(
        &self,
        table: &str,
        filter: Option<(&str, &str)>,
    ) -> Result<Vec<Value>, GatewayError> {
        let mut req = self
            .authed(self.http.get(self.table_url(table)))
            .query(&[("select", "*")]);
        if let Some((column, value)) = filter {
            let predicate = format!("eq.{value}");
            req = req.query(&[(column, predicate.as_str())]);
        }

        let resp = req.send().await.map_err(transport)?;
        let rows: Vec<Value> = ensure_success(resp).await?.json().await.map_err(transport)?;
        Ok(rows)
    }

    #[instrument(skip(self, record))]
    async fn insert(&self, table: &str, record: Value) -> Result<(), GatewayError> {
        let resp = self
            .authed(self.http.post(self.table_url(table)))
            .header("Prefer", "return=minimal")
            .json(&record)
            .send()
            .await
            .map_err(transport)?;

        ensure_success(resp).await?;
        Ok(())
    }

    #[instrument(skip(self, patch))]
    async fn update(
        &self,
        table: &str,
        column: &str,
        value: &str,
        patch: Value,
    ) -> Result<(), GatewayError> {
        let predicate = format!("eq.{value}");
        let resp = self
            .authed(self.http.patch(self.table_url(table)))
            .header("Prefer", "return=minimal")
            .query(&[(column, predicate.as_str())])
            .json(&patch)
            .send()
            .await
            .map_err(transport)?;

        ensure_success(resp).await?;
        Ok(())
    }

    #[instrument(skip(self))]
    async fn delete(&self, table: &str, column: &str, value: &str) -> Result<(), GatewayError> {
        let predicate = format!("eq.{value}");
        let resp = self
            .authed(self.http.delete(self.table_url(table)))
            .query(&[(column, predicate.as_str())])
            .send()
            .await
            .map_err(transport)?;

        ensure_success(resp).await?;
        Ok(())
    }

    #[instrument(skip(self, bytes), fields(len = bytes.len()))]
    async fn upload_object(
        &self,
        bucket: &str,
        path: &str,
        bytes: Vec<u8>,
        overwrite: bool,
    ) -> Result<(), GatewayError> {
        let resp = self
            .authed(self.http.post(self.object_url(bucket, path)))
            .header("x-upsert", if overwrite { "true" } else { "false" })
            .header("Content-Type", "application/octet-stream")
            .body(bytes)
            .send()
            .await
            .map_err(transport)?;

        ensure_success(resp).await?;
        Ok(())
    }

    fn public_url(&self, bucket: &str, path: &str) -> String {
        format!("{}/storage/v1/object/public/{bucket}/{path}", self.base)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::time::Duration;

    use super::*;

    fn test_config() -> StorefrontConfig {
        StorefrontConfig {
            backend_url: "https://demo.backend.test/".parse().unwrap(),
            anon_key: SecretString::from("anon-key".to_owned()),
            request_timeout: Duration::from_secs(10),
        }
    }

    #[test]
    fn test_public_url_contains_path_verbatim() {
        let gateway = RestGateway::new(&test_config()).unwrap();
        let url = gateway.public_url("avatars", "u1/avatar.png");
        assert_eq!(
            url,
            "https://demo.backend.test/storage/v1/object/public/avatars/u1/avatar.png"
        );
    }

    #[test]
    fn test_base_url_trailing_slash_is_normalized() {
        let gateway = RestGateway::new(&test_config()).unwrap();
        assert_eq!(
            gateway.table_url("profiles"),
            "https://demo.backend.test/rest/v1/profiles"
        );
    }

    #[tokio::test]
    async fn test_identity_is_none_before_sign_in() {
        let gateway = RestGateway::new(&test_config()).unwrap();
        assert_eq!(gateway.current_identity().await.unwrap(), None);
    }
}
