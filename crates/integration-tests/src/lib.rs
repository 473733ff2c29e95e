//! End-to-end tests for the Florist storefront.
//!
//! # Running Tests
//!
//! ```bash
//! cargo test -p florist-integration-tests
//! ```
//!
//! No external services are needed. Each test starts:
//!
//! - a [`FakeApi`]: an in-process flower API on an ephemeral port that
//!   records every request it receives
//! - a [`TestContext`]: the storefront router with an in-memory session
//!   store, driven with `tower::ServiceExt::oneshot` and a one-cookie jar
//!
//! # Test Categories
//!
//! - `cart_flow` - Cart store behaviour through the cart pages
//! - `checkout` - Order form, both submission paths and the payment return
//! - `session` - Sign-in, token refresh and forced sign-out
//! - `profile` - Order history, re-order, pay-later and favorites

#![allow(
    clippy::unwrap_used,
    clippy::expect_used,
    clippy::indexing_slicing,
    clippy::missing_panics_doc
)]

pub mod context;
pub mod fake_api;

pub use context::{TestContext, TestResponse};
pub use fake_api::{FakeApi, RecordedRequest};
