//! Authentication service.
//!
//! Thin validation layer over the hosted auth service: email and password
//! are checked locally before any network call, and backend rejections are
//! mapped to stable error variants so the UI never shows raw backend
//! detail.

use std::sync::Arc;

use tracing::instrument;

use kiosk_core::{Email, EmailError};

use crate::gateway::{GatewayError, Identity, RemoteGateway};

/// Minimum password length.
const MIN_PASSWORD_LENGTH: usize = 8;

/// Errors that can occur during authentication operations.
#[derive(Debug, thiserror::Error)]
pub enum AuthError {
    /// Invalid email format.
    #[error("invalid email: {0}")]
    InvalidEmail(#[from] EmailError),

    /// Password too weak or invalid.
    #[error("password validation failed: {0}")]
    WeakPassword(String),

    /// Invalid credentials (wrong password or unknown account).
    #[error("invalid credentials")]
    InvalidCredentials,

    /// An account with this email already exists.
    #[error("account already exists")]
    AlreadyRegistered,

    /// The backend rejected or failed the request for another reason.
    #[error("backend error: {0}")]
    Gateway(GatewayError),
}

/// Authentication service over the hosted identity provider.
pub struct AuthService {
    gateway: Arc<dyn RemoteGateway>,
}

impl AuthService {
    /// Create a new authentication service.
    #[must_use]
    pub const fn new(gateway: Arc<dyn RemoteGateway>) -> Self {
        Self { gateway }
    }

    /// Register a new account and establish the session.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::InvalidEmail` or `AuthError::WeakPassword` for
    /// local validation failures (no network call is made), and
    /// `AuthError::AlreadyRegistered` if the email is taken.
    #[instrument(skip(self, password))]
    pub async fn sign_up(&self, email: &str, password: &str) -> Result<Identity, AuthError> {
        let email = Email::parse(email)?;
        validate_password(password)?;

        self.gateway
            .sign_up(&email, password)
            .await
            .map_err(|e| match e.status() {
                Some(409 | 422) => AuthError::AlreadyRegistered,
                _ => AuthError::Gateway(e),
            })
    }

    /// Sign in with email and password.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::InvalidCredentials` if the email/password is
    /// wrong.
    #[instrument(skip(self, password))]
    pub async fn sign_in(&self, email: &str, password: &str) -> Result<Identity, AuthError> {
        let email = Email::parse(email)?;

        self.gateway
            .sign_in(&email, password)
            .await
            .map_err(|e| match e.status() {
                Some(400 | 401 | 403) => AuthError::InvalidCredentials,
                _ => AuthError::Gateway(e),
            })
    }

    /// End the current session.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::Gateway` if the backend call fails.
    #[instrument(skip(self))]
    pub async fn sign_out(&self) -> Result<(), AuthError> {
        self.gateway.sign_out().await.map_err(AuthError::Gateway)
    }

    /// The currently signed-in identity, if any.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::Gateway` if the lookup fails.
    pub async fn current_identity(&self) -> Result<Option<Identity>, AuthError> {
        self.gateway
            .current_identity()
            .await
            .map_err(AuthError::Gateway)
    }
}

fn validate_password(password: &str) -> Result<(), AuthError> {
    if password.len() < MIN_PASSWORD_LENGTH {
        return Err(AuthError::WeakPassword(format!(
            "password must be at least {MIN_PASSWORD_LENGTH} characters"
        )));
    }
    Ok(())
}
