//! Core types for Florist.
//!
//! This module provides type-safe wrappers for common domain concepts.

pub mod email;
pub mod flower;
pub mod id;
pub mod price;
pub mod status;

pub use email::{Email, EmailError};
pub use flower::{Category, Flower};
pub use id::*;
pub use price::Price;
pub use status::*;
