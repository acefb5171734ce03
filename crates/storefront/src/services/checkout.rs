//! Checkout workflow: payment method, proof of payment, order submission.
//!
//! # State machine
//!
//! ```text
//! Idle -> MethodSelected -> ProofUploading -> ProofReady -> PlacingOrder -> Completed
//! ```
//!
//! The two remote steps (`upload_proof`, `place_order`) are mutually
//! exclusive: a second call while one is in flight is rejected with
//! [`CheckoutError::Busy`] rather than queued, so two uploads can never
//! race to set the final proof reference. A failed remote step reverts to
//! the prior stable state (`MethodSelected` or `ProofReady`) carrying an
//! error message; nothing is partially applied.
//!
//! Totals for submission are read from the cart immediately before the
//! order insert - never cached earlier in the flow - so mutations made
//! while the checkout screen is open are always reflected in the charge.

use std::sync::{Arc, Mutex, PoisonError};

use chrono::Utc;
use tokio::sync::watch;
use tracing::{debug, instrument, warn};
use uuid::Uuid;

use kiosk_core::OrderId;

use crate::gateway::{GatewayError, RemoteGateway};
use crate::models::{Order, OrderLine, PlacedOrder, payment_method};
use crate::services::cart::CartStore;

/// Table the order record is inserted into.
pub const ORDERS_TABLE: &str = "orders";

/// Bucket proof-of-payment images are uploaded to.
pub const PROOF_BUCKET: &str = "payment-proofs";

/// Errors from checkout operations.
#[derive(Debug, thiserror::Error)]
pub enum CheckoutError {
    /// Payment method id is not in the fixed catalog.
    #[error("unknown payment method: {0}")]
    UnknownMethod(String),

    /// A required step has not been completed yet.
    #[error("{0}")]
    Precondition(&'static str),

    /// No identity; checkout requires a signed-in user.
    #[error("not signed in")]
    NotAuthenticated,

    /// Another upload or order submission is already in flight.
    #[error("another checkout operation is already in progress")]
    Busy,

    /// The order was already placed by this workflow.
    #[error("order has already been placed")]
    AlreadyCompleted,

    /// The backend rejected or failed the remote step.
    #[error("backend error: {0}")]
    Gateway(#[from] GatewayError),
}

/// Phase of the checkout state machine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CheckoutPhase {
    /// Nothing selected yet.
    #[default]
    Idle,
    /// A payment method is selected.
    MethodSelected,
    /// Proof upload in flight.
    ProofUploading,
    /// Proof stored; ready to place the order.
    ProofReady,
    /// Order insert in flight.
    PlacingOrder,
    /// Order placed; the workflow is finished.
    Completed,
}

/// Observable checkout state.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct CheckoutState {
    /// Current phase.
    pub phase: CheckoutPhase,
    /// Selected payment method id, if any.
    pub selected_method_id: Option<String>,
    /// Storage path of the uploaded proof, if any.
    pub proof_path: Option<String>,
    /// Most recent error message, cleared by the next successful step.
    pub error_message: Option<String>,
}

impl CheckoutState {
    /// Whether a proof upload is in flight.
    #[must_use]
    pub const fn is_uploading(&self) -> bool {
        matches!(self.phase, CheckoutPhase::ProofUploading)
    }

    /// Whether an order submission is in flight.
    #[must_use]
    pub const fn is_placing_order(&self) -> bool {
        matches!(self.phase, CheckoutPhase::PlacingOrder)
    }

    /// Whether the order has been placed.
    #[must_use]
    pub const fn is_completed(&self) -> bool {
        matches!(self.phase, CheckoutPhase::Completed)
    }

    /// Whether the submit button should be enabled: both prerequisites met,
    /// nothing in flight, not yet completed.
    #[must_use]
    pub const fn can_place_order(&self) -> bool {
        self.selected_method_id.is_some()
            && self.proof_path.is_some()
            && matches!(
                self.phase,
                CheckoutPhase::MethodSelected | CheckoutPhase::ProofReady
            )
    }
}

/// Orchestrates one checkout over a cart and the remote gateway.
pub struct CheckoutWorkflow {
    gateway: Arc<dyn RemoteGateway>,
    cart: Arc<CartStore>,
    state: Mutex<CheckoutState>,
    snapshot: watch::Sender<CheckoutState>,
    /// Guards the remote steps; `try_lock` failure means one is in flight.
    in_flight: tokio::sync::Mutex<()>,
}

impl CheckoutWorkflow {
    /// Create a workflow over the given cart. State starts at `Idle`.
    #[must_use]
    pub fn new(gateway: Arc<dyn RemoteGateway>, cart: Arc<CartStore>) -> Self {
        let (snapshot, _) = watch::channel(CheckoutState::default());
        Self {
            gateway,
            cart,
            state: Mutex::new(CheckoutState::default()),
            snapshot,
            in_flight: tokio::sync::Mutex::new(()),
        }
    }

    /// Subscribe to checkout state snapshots.
    #[must_use]
    pub fn subscribe(&self) -> watch::Receiver<CheckoutState> {
        self.snapshot.subscribe()
    }

    /// The current state.
    #[must_use]
    pub fn state(&self) -> CheckoutState {
        self.lock().clone()
    }

    /// Public URL of the uploaded proof, derived from the stored path.
    #[must_use]
    pub fn proof_url(&self) -> Option<String> {
        self.lock()
            .proof_path
            .as_ref()
            .map(|path| self.gateway.public_url(PROOF_BUCKET, path))
    }

    /// Select a payment method from the fixed catalog.
    ///
    /// Re-selection is permitted any time before the order is placed and
    /// clears the last error.
    ///
    /// # Errors
    ///
    /// Returns [`CheckoutError::UnknownMethod`] for an id outside the
    /// catalog and [`CheckoutError::AlreadyCompleted`] after a placed order.
    pub fn select_payment_method(&self, id: &str) -> Result<(), CheckoutError> {
        let method =
            payment_method(id).ok_or_else(|| CheckoutError::UnknownMethod(id.to_owned()))?;

        let mut state = self.lock();
        if state.is_completed() {
            return Err(CheckoutError::AlreadyCompleted);
        }
        state.selected_method_id = Some(method.id.to_owned());
        state.error_message = None;
        if state.phase == CheckoutPhase::Idle {
            state.phase = CheckoutPhase::MethodSelected;
        }
        self.publish(&state);
        Ok(())
    }

    /// Upload a proof-of-payment image and store its path.
    ///
    /// On failure the state reverts to the prior phase with the error
    /// message set and any previously stored proof untouched.
    ///
    /// # Errors
    ///
    /// Returns [`CheckoutError::Busy`] if an upload or submission is
    /// already in flight, [`CheckoutError::AlreadyCompleted`] after a
    /// placed order, and [`CheckoutError::Gateway`] when the upload fails.
    #[instrument(skip(self, bytes), fields(len = bytes.len()))]
    pub async fn upload_proof(&self, bytes: Vec<u8>) -> Result<String, CheckoutError> {
        let Ok(_guard) = self.in_flight.try_lock() else {
            return Err(CheckoutError::Busy);
        };

        let prior = {
            let mut state = self.lock();
            if state.is_completed() {
                return Err(CheckoutError::AlreadyCompleted);
            }
            let prior = state.phase;
            state.phase = CheckoutPhase::ProofUploading;
            state.error_message = None;
            self.publish(&state);
            prior
        };

        let path = format!("{}.png", Uuid::new_v4());
        match self
            .gateway
            .upload_object(PROOF_BUCKET, &path, bytes, true)
            .await
        {
            Ok(()) => {
                let mut state = self.lock();
                state.proof_path = Some(path.clone());
                state.phase = CheckoutPhase::ProofReady;
                state.error_message = None;
                self.publish(&state);
                debug!(%path, "payment proof stored");
                Ok(path)
            }
            Err(e) => {
                let mut state = self.lock();
                state.phase = prior;
                state.error_message = Some(format!("Failed to upload payment proof: {e}"));
                self.publish(&state);
                Err(e.into())
            }
        }
    }

    /// Submit the order for the currently selected cart items.
    ///
    /// Preconditions: a payment method is selected, a proof is uploaded, at
    /// least one cart item is selected, and the user is signed in. If the
    /// local preconditions are unmet no remote call is made. The selected
    /// items and totals are read from the cart immediately before the
    /// insert. On success the purchased (selected) items are removed from
    /// the cart and the workflow completes; a completed workflow rejects
    /// further submissions.
    ///
    /// # Errors
    ///
    /// [`CheckoutError::Precondition`], [`CheckoutError::NotAuthenticated`],
    /// [`CheckoutError::Busy`], [`CheckoutError::AlreadyCompleted`], or
    /// [`CheckoutError::Gateway`] when the insert fails.
    #[instrument(skip(self))]
    pub async fn place_order(&self) -> Result<PlacedOrder, CheckoutError> {
        let Ok(_guard) = self.in_flight.try_lock() else {
            return Err(CheckoutError::Busy);
        };

        // Local precondition checks; no remote call on failure.
        let (method_id, proof_path) = {
            let mut state = self.lock();
            if state.is_completed() {
                return Err(CheckoutError::AlreadyCompleted);
            }
            let (Some(method_id), Some(proof_path)) = (
                state.selected_method_id.clone(),
                state.proof_path.clone(),
            ) else {
                const MSG: &str = "Select a payment method and upload proof of payment first";
                state.error_message = Some(MSG.to_owned());
                self.publish(&state);
                return Err(CheckoutError::Precondition(MSG));
            };
            (method_id, proof_path)
        };

        let identity = match self.gateway.current_identity().await {
            Ok(Some(identity)) => identity,
            Ok(None) => {
                self.fold_error("Sign in to place an order");
                return Err(CheckoutError::NotAuthenticated);
            }
            Err(e) => {
                self.fold_error(&format!("Failed to place order: {e}"));
                return Err(e.into());
            }
        };

        // Read the cart atomically, immediately before the insert.
        let snapshot = self.cart.snapshot();
        let lines: Vec<OrderLine> = snapshot.selected_items().map(OrderLine::from).collect();
        if lines.is_empty() {
            const MSG: &str = "No items selected for checkout";
            self.fold_error(MSG);
            return Err(CheckoutError::Precondition(MSG));
        }

        {
            let mut state = self.lock();
            state.phase = CheckoutPhase::PlacingOrder;
            state.error_message = None;
            self.publish(&state);
        }

        let order = Order {
            id: OrderId::generate(),
            user_id: identity.id,
            payment_method: method_id,
            payment_proof_path: proof_path,
            total_cents: snapshot.selected_total.to_minor_units(),
            lines,
            created_at: Utc::now(),
        };
        let line_count = order.lines.len();
        let order_id = order.id;
        let total = snapshot.selected_total;

        let record = serde_json::to_value(&order).map_err(GatewayError::from)?;
        match self.gateway.insert(ORDERS_TABLE, record).await {
            Ok(()) => {
                self.cart.remove_selected();
                let mut state = self.lock();
                state.phase = CheckoutPhase::Completed;
                state.error_message = None;
                self.publish(&state);
                debug!(%order_id, %total, "order placed");
                Ok(PlacedOrder {
                    order_id,
                    total,
                    line_count,
                })
            }
            Err(e) => {
                warn!(error = %e, "order insert failed");
                let mut state = self.lock();
                state.phase = CheckoutPhase::ProofReady;
                state.error_message = Some(format!("Failed to place order: {e}"));
                self.publish(&state);
                Err(e.into())
            }
        }
    }

    fn fold_error(&self, message: &str) {
        let mut state = self.lock();
        state.error_message = Some(message.to_owned());
        self.publish(&state);
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, CheckoutState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn publish(&self, state: &CheckoutState) {
        self.snapshot.send_replace(state.clone());
    }
}
