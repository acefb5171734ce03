//! Remote gateway to the hosted backend.
//!
//! # Architecture
//!
//! - The backend is an opaque hosted service: relational tables, object
//!   storage buckets, and an identity endpoint, all behind a REST dialect.
//! - [`RemoteGateway`] is the narrow contract the rest of the crate depends
//!   on; services receive it as `Arc<dyn RemoteGateway>` so tests can swap
//!   in [`MemoryGateway`].
//! - The core never interprets backend-specific error codes; every failure
//!   surfaces as a [`GatewayError`] and is folded into observable state at
//!   the workflow boundary.
//! - No retries: a failed call is terminal for that attempt, and the user
//!   re-triggers the operation.

mod memory;
mod rest;

pub use memory::MemoryGateway;
pub use rest::RestGateway;

use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde_json::Value;

use kiosk_core::{Email, UserId};

/// Errors that can occur when talking to the hosted backend.
#[derive(Debug, thiserror::Error)]
pub enum GatewayError {
    /// HTTP transport failed.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// The request exceeded the configured per-call timeout.
    #[error("request timed out")]
    Timeout,

    /// The backend answered with a non-success status.
    #[error("backend rejected request ({status}): {message}")]
    Rejected {
        /// HTTP status code.
        status: u16,
        /// Response body, verbatim.
        message: String,
    },

    /// A response body could not be decoded.
    #[error("response decode error: {0}")]
    Decode(#[from] serde_json::Error),

    /// The backend could not be reached at all.
    #[error("backend unavailable: {0}")]
    Unavailable(String),
}

impl GatewayError {
    /// Whether this failure was a timeout.
    #[must_use]
    pub const fn is_timeout(&self) -> bool {
        matches!(self, Self::Timeout)
    }

    /// The HTTP status the backend answered with, if it answered.
    #[must_use]
    pub const fn status(&self) -> Option<u16> {
        match self {
            Self::Rejected { status, .. } => Some(*status),
            _ => None,
        }
    }
}

/// The authenticated user, as reported by the hosted auth service.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Identity {
    /// Stable account id.
    pub id: UserId,
    /// The account's email address.
    pub email: Email,
}

/// Narrow request/response contract over the hosted backend.
///
/// Predicates are single-column equality matches - the only shape the
/// storefront needs. Records travel as [`serde_json::Value`]; use
/// [`decode`] to turn them into typed models.
#[async_trait]
pub trait RemoteGateway: Send + Sync {
    /// The currently signed-in identity, if any.
    async fn current_identity(&self) -> Result<Option<Identity>, GatewayError>;

    /// Sign in with email and password, establishing the session.
    async fn sign_in(&self, email: &Email, password: &str) -> Result<Identity, GatewayError>;

    /// Register a new account and establish the session.
    async fn sign_up(&self, email: &Email, password: &str) -> Result<Identity, GatewayError>;

    /// End the current session.
    async fn sign_out(&self) -> Result<(), GatewayError>;

    /// Fetch the first record where `column` equals `value`.
    async fn find_one(
        &self,
        table: &str,
        column: &str,
        value: &str,
    ) -> Result<Option<Value>, GatewayError>;

    /// Fetch all records, optionally restricted to `column == value`.
    async fn find_all(
        &self,
        table: &str,
        filter: Option<(&str, &str)>,
    ) -> Result<Vec<Value>, GatewayError>;

    /// Insert a record.
    async fn insert(&self, table: &str, record: Value) -> Result<(), GatewayError>;

    /// Patch all records where `column` equals `value`.
    async fn update(
        &self,
        table: &str,
        column: &str,
        value: &str,
        patch: Value,
    ) -> Result<(), GatewayError>;

    /// Delete all records where `column` equals `value`.
    async fn delete(&self, table: &str, column: &str, value: &str) -> Result<(), GatewayError>;

    /// Upload bytes to an object storage bucket.
    ///
    /// With `overwrite` set, an existing object at `path` is replaced;
    /// otherwise the upload is rejected by the backend.
    async fn upload_object(
        &self,
        bucket: &str,
        path: &str,
        bytes: Vec<u8>,
        overwrite: bool,
    ) -> Result<(), GatewayError>;

    /// Derive the public URL for an object. Pure - no network.
    fn public_url(&self, bucket: &str, path: &str) -> String;
}

/// Decode a raw record into a typed model.
///
/// # Errors
///
/// Returns [`GatewayError::Decode`] if the record does not match the model.
pub fn decode<T: DeserializeOwned>(record: Value) -> Result<T, GatewayError> {
    Ok(serde_json::from_value(record)?)
}
