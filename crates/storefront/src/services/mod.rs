//! Long-lived services owned by the application state.
//!
//! # Services
//!
//! - `notifications` - per-session bridge from the Canteen event feed to
//!   the browser's notification stream

pub mod notifications;

pub use notifications::{BridgeMessage, NotificationHub};
