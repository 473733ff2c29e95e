//! Florist Core - shared types and the cart store.
//!
//! This crate provides the types used across all Florist components:
//! - `storefront` - Server-rendered shop front talking to the flower API
//! - `cli` - Operator tooling (session store migration, catalog inspection)
//!
//! # Architecture
//!
//! The core crate contains only types and pure state - no I/O, no database
//! access, no HTTP clients. This keeps it lightweight and allows it to be used
//! anywhere, including in tests that never touch the network.
//!
//! # Modules
//!
//! - [`types`] - Newtype wrappers for ids, prices, emails, statuses and flowers
//! - [`cart`] - The visitor's cart: ordered lines with a derived total

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod cart;
pub mod types;

pub use cart::{Cart, CartLine};
pub use types::*;
