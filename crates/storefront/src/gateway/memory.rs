//! In-memory implementation of [`RemoteGateway`].
//!
//! Backs the test suites and offline development. Tables are vectors of raw
//! records, buckets are byte maps, and the identity is set directly or via
//! the in-memory credential store. Failure and latency injection let tests
//! exercise the error paths and the in-flight mutual exclusion of the
//! workflows.

use std::collections::{HashMap, VecDeque};
use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;
use serde_json::Value;

use kiosk_core::{Email, UserId};

use super::{GatewayError, Identity, RemoteGateway};

#[derive(Default)]
struct State {
    identity: Option<Identity>,
    /// email -> (password, identity)
    credentials: HashMap<String, (String, Identity)>,
    tables: HashMap<String, Vec<Value>>,
    /// "bucket/path" -> bytes
    objects: HashMap<String, Vec<u8>>,
    /// op name -> queued failure messages, consumed one per call
    failures: HashMap<String, VecDeque<String>>,
    /// audit log of op names, in call order
    ops: Vec<String>,
    latency: Option<Duration>,
}

/// In-memory gateway with failure and latency injection.
#[derive(Default)]
pub struct MemoryGateway {
    state: Mutex<State>,
}

impl MemoryGateway {
    /// Create an empty gateway with no identity and no data.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, State> {
        self.state
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
    }

    /// Record the op, wait out injected latency, and fail if a failure is
    /// queued for this op.
    async fn begin(&self, op: &str) -> Result<(), GatewayError> {
        let (latency, failure) = {
            let mut state = self.lock();
            state.ops.push(op.to_owned());
            let failure = state
                .failures
                .get_mut(op)
                .and_then(VecDeque::pop_front);
            (state.latency, failure)
        };

        if let Some(latency) = latency {
            tokio::time::sleep(latency).await;
        }

        match failure {
            Some(message) => Err(GatewayError::Unavailable(message)),
            None => Ok(()),
        }
    }

    // =========================================================================
    // Test harness surface
    // =========================================================================

    /// Sign in directly as the given user, bypassing credentials.
    pub fn sign_in_as(&self, id: UserId, email: &Email) {
        self.lock().identity = Some(Identity {
            id,
            email: email.clone(),
        });
    }

    /// Register a user in the in-memory credential store.
    pub fn add_user(&self, email: &Email, password: &str) -> UserId {
        let identity = Identity {
            id: UserId::generate(),
            email: email.clone(),
        };
        let id = identity.id;
        self.lock()
            .credentials
            .insert(email.as_str().to_owned(), (password.to_owned(), identity));
        id
    }

    /// Seed a table with a record.
    pub fn seed(&self, table: &str, record: Value) {
        self.lock()
            .tables
            .entry(table.to_owned())
            .or_default()
            .push(record);
    }

    /// All records currently in a table.
    #[must_use]
    pub fn records(&self, table: &str) -> Vec<Value> {
        self.lock().tables.get(table).cloned().unwrap_or_default()
    }

    /// Bytes stored at `bucket/path`, if any.
    #[must_use]
    pub fn object(&self, bucket: &str, path: &str) -> Option<Vec<u8>> {
        self.lock().objects.get(&format!("{bucket}/{path}")).cloned()
    }

    /// Paths of all objects in a bucket.
    #[must_use]
    pub fn object_paths(&self, bucket: &str) -> Vec<String> {
        let prefix = format!("{bucket}/");
        self.lock()
            .objects
            .keys()
            .filter_map(|key| key.strip_prefix(&prefix).map(str::to_owned))
            .collect()
    }

    /// Queue a failure for the next call to `op`.
    pub fn fail_next(&self, op: &str, message: &str) {
        self.lock()
            .failures
            .entry(op.to_owned())
            .or_default()
            .push_back(message.to_owned());
    }

    /// Delay every subsequent call by `latency`.
    pub fn set_latency(&self, latency: Duration) {
        self.lock().latency = Some(latency);
    }

    /// Total number of remote calls made so far.
    #[must_use]
    pub fn remote_calls(&self) -> usize {
        self.lock().ops.len()
    }

    /// Number of calls made to a specific op (e.g., `"insert"`).
    #[must_use]
    pub fn calls_to(&self, op: &str) -> usize {
        self.lock().ops.iter().filter(|o| o.as_str() == op).count()
    }
}

/// Compare a record field against a filter value.
///
/// Records store ids as JSON strings or numbers; filters arrive as strings,
/// so both sides are compared in string form.
fn field_matches(record: &Value, column: &str, value: &str) -> bool {
    match record.get(column) {
        Some(Value::String(s)) => s == value,
        Some(other) => other.to_string() == value,
        None => false,
    }
}

#[async_trait]
impl RemoteGateway for MemoryGateway {
    async fn current_identity(&self) -> Result<Option<Identity>, GatewayError> {
        self.begin("current_identity").await?;
        Ok(self.lock().identity.clone())
    }

    async fn sign_in(&self, email: &Email, password: &str) -> Result<Identity, GatewayError> {
        self.begin("sign_in").await?;
        let mut state = self.lock();
        match state.credentials.get(email.as_str()) {
            Some((stored, identity)) if stored == password => {
                let identity = identity.clone();
                state.identity = Some(identity.clone());
                Ok(identity)
            }
            _ => Err(GatewayError::Rejected {
                status: 400,
                message: "invalid login credentials".to_owned(),
            }),
        }
    }

    async fn sign_up(&self, email: &Email, password: &str) -> Result<Identity, GatewayError> {
        self.begin("sign_up").await?;
        let mut state = self.lock();
        if state.credentials.contains_key(email.as_str()) {
            return Err(GatewayError::Rejected {
                status: 422,
                message: "user already registered".to_owned(),
            });
        }
        let identity = Identity {
            id: UserId::generate(),
            email: email.clone(),
        };
        state
            .credentials
            .insert(email.as_str().to_owned(), (password.to_owned(), identity.clone()));
        state.identity = Some(identity.clone());
        Ok(identity)
    }

    async fn sign_out(&self) -> Result<(), GatewayError> {
        self.begin("sign_out").await?;
        self.lock().identity = None;
        Ok(())
    }

    async fn find_one(
        &self,
        table: &str,
        column: &str,
        value: &str,
    ) -> Result<Option<Value>, GatewayError> {
        self.begin("find_one").await?;
        let state = self.lock();
        Ok(state.tables.get(table).and_then(|rows| {
            rows.iter()
                .find(|row| field_matches(row, column, value))
                .cloned()
        }))
    }

    async fn find_all(
        &self,
        table: &str,
        filter: Option<(&str, &str)>,
    ) -> Result<Vec<Value>, GatewayError> {
        self.begin("find_all").await?;
        let state = self.lock();
        let rows = state.tables.get(table).cloned().unwrap_or_default();
        Ok(match filter {
            Some((column, value)) => rows
                .into_iter()
                .filter(|row| field_matches(row, column, value))
                .collect(),
            None => rows,
        })
    }

    async fn insert(&self, table: &str, record: Value) -> Result<(), GatewayError> {
        self.begin("insert").await?;
        self.lock()
            .tables
            .entry(table.to_owned())
            .or_default()
            .push(record);
        Ok(())
    }

    async fn update(
        &self,
        table: &str,
        column: &str,
        value: &str,
        patch: Value,
    ) -> Result<(), GatewayError> {
        self.begin("update").await?;
        let mut state = self.lock();
        if let Some(rows) = state.tables.get_mut(table) {
            for row in rows.iter_mut().filter(|row| field_matches(row, column, value)) {
                if let (Some(target), Some(fields)) = (row.as_object_mut(), patch.as_object()) {
                    for (key, val) in fields {
                        target.insert(key.clone(), val.clone());
                    }
                }
            }
        }
        Ok(())
    }

    async fn delete(&self, table: &str, column: &str, value: &str) -> Result<(), GatewayError> {
        self.begin("delete").await?;
        let mut state = self.lock();
        if let Some(rows) = state.tables.get_mut(table) {
            rows.retain(|row| !field_matches(row, column, value));
        }
        Ok(())
    }

    async fn upload_object(
        &self,
        bucket: &str,
        path: &str,
        bytes: Vec<u8>,
        overwrite: bool,
    ) -> Result<(), GatewayError> {
        self.begin("upload_object").await?;
        let key = format!("{bucket}/{path}");
        let mut state = self.lock();
        if !overwrite && state.objects.contains_key(&key) {
            return Err(GatewayError::Rejected {
                status: 409,
                message: "object already exists".to_owned(),
            });
        }
        state.objects.insert(key, bytes);
        Ok(())
    }

    fn public_url(&self, bucket: &str, path: &str) -> String {
        format!("memory://storage/{bucket}/{path}")
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use serde_json::json;

    use super::*;

    #[tokio::test]
    async fn test_find_one_matches_string_and_number_fields() {
        let gateway = MemoryGateway::new();
        gateway.seed("products", json!({"id": "p1", "price_cents": 100}));
        gateway.seed("products", json!({"id": "p2", "price_cents": 200}));

        let found = gateway.find_one("products", "id", "p2").await.unwrap();
        assert_eq!(found.unwrap()["price_cents"], 200);

        let by_number = gateway
            .find_one("products", "price_cents", "100")
            .await
            .unwrap();
        assert_eq!(by_number.unwrap()["id"], "p1");
    }

    #[tokio::test]
    async fn test_update_merges_patch() {
        let gateway = MemoryGateway::new();
        gateway.seed("profiles", json!({"id": "u1", "username": "old", "full_name": "Old"}));

        gateway
            .update("profiles", "id", "u1", json!({"username": "new"}))
            .await
            .unwrap();

        let rows = gateway.records("profiles");
        assert_eq!(rows[0]["username"], "new");
        assert_eq!(rows[0]["full_name"], "Old");
    }

    #[tokio::test]
    async fn test_fail_next_fails_exactly_once() {
        let gateway = MemoryGateway::new();
        gateway.fail_next("insert", "boom");

        let err = gateway.insert("t", json!({})).await.unwrap_err();
        assert!(matches!(err, GatewayError::Unavailable(_)));
        assert!(gateway.insert("t", json!({})).await.is_ok());
    }

    #[tokio::test]
    async fn test_upload_without_overwrite_conflicts() {
        let gateway = MemoryGateway::new();
        gateway
            .upload_object("b", "a.png", vec![1], false)
            .await
            .unwrap();
        let err = gateway
            .upload_object("b", "a.png", vec![2], false)
            .await
            .unwrap_err();
        assert_eq!(err.status(), Some(409));

        gateway
            .upload_object("b", "a.png", vec![3], true)
            .await
            .unwrap();
        assert_eq!(gateway.object("b", "a.png"), Some(vec![3]));
    }

    #[tokio::test]
    async fn test_sign_up_then_sign_in() {
        let gateway = MemoryGateway::new();
        let email = Email::parse("jane.doe@example.com").unwrap();

        let created = gateway.sign_up(&email, "hunter2-hunter2").await.unwrap();
        gateway.sign_out().await.unwrap();
        assert_eq!(gateway.current_identity().await.unwrap(), None);

        let identity = gateway.sign_in(&email, "hunter2-hunter2").await.unwrap();
        assert_eq!(identity.id, created.id);

        let wrong = gateway.sign_in(&email, "wrong").await.unwrap_err();
        assert_eq!(wrong.status(), Some(400));
    }
}
