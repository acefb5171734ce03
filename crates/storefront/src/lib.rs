//! Kiosk Storefront - client core for the mobile storefront.
//!
//! This library is the data and workflow layer behind the storefront app:
//! the cart, the checkout flow, the user profile, and the product catalog.
//! The UI (screens, navigation, widgets) lives in the host app and consumes
//! this crate through observable state snapshots.
//!
//! # Architecture
//!
//! - All remote access goes through the [`gateway::RemoteGateway`] trait -
//!   a narrow request/response contract over the hosted backend (table CRUD,
//!   object storage, identity). [`gateway::RestGateway`] talks to the real
//!   service; [`gateway::MemoryGateway`] backs tests and offline development.
//! - Services own their state exclusively and publish snapshots over
//!   `tokio::sync::watch` channels; the UI subscribes and re-renders.
//! - Remote failures are folded into the relevant state object as the latest
//!   error message and never partially apply a mutation.
//! - The gateway is injected into every service constructor - no global
//!   client singleton.
//!
//! # Example
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use kiosk_storefront::config::StorefrontConfig;
//! use kiosk_storefront::gateway::RestGateway;
//! use kiosk_storefront::services::{CartStore, CheckoutWorkflow};
//!
//! let config = StorefrontConfig::load()?;
//! let gateway = Arc::new(RestGateway::new(&config)?);
//! let cart = Arc::new(CartStore::new());
//! let checkout = CheckoutWorkflow::new(gateway, Arc::clone(&cart));
//!
//! checkout.select_payment_method("bank_transfer")?;
//! checkout.upload_proof(image_bytes).await?;
//! let receipt = checkout.place_order().await?;
//! ```

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod config;
pub mod error;
pub mod gateway;
pub mod models;
pub mod services;

pub use error::{Result, StoreError};
