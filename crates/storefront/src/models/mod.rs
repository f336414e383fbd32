//! Domain models for storefront.
//!
//! Records coming from the Canteen API live in [`crate::api::types`]; this
//! module holds what the storefront itself keeps per browser session.

pub mod session;

pub use session::{CurrentUser, Flash, keys as session_keys};
