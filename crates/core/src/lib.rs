//! Kiosk Core - Shared types library.
//!
//! This crate provides common types used across all Kiosk components:
//! - `storefront` - The storefront client core (cart, checkout, profile)
//! - `integration-tests` - End-to-end workflow tests
//!
//! # Architecture
//!
//! The core crate contains only types - no I/O, no network access, no async.
//! This keeps it lightweight and allows it to be used anywhere, including
//! inside UI layers that only need to format prices or validate emails.
//!
//! # Modules
//!
//! - [`types`] - Newtype wrappers for type-safe IDs, money, and emails

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod types;

pub use types::*;
