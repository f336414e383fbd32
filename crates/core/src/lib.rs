//! Canteen Core - Shared domain types and rules.
//!
//! This crate provides the types and calculations used by the Canteen MS
//! storefront:
//! - customer screens (menu, cart, orders, reviews, favorites)
//! - admin screens (dashboard, products, orders, refunds, staff, expenses)
//! - the kitchen order queue
//!
//! # Architecture
//!
//! The core crate contains only types and pure functions - no I/O, no HTTP
//! clients, no clocks. Anything time dependent takes `now` as an argument.
//!
//! # Modules
//!
//! - [`types`] - IDs, prices, statuses, roles and menu vocabularies
//! - [`access`] - Role gate deciding which screens a user may open
//! - [`orders`] - Cart totals, refunds and cancellation rules
//! - [`kitchen`] - Kitchen item actions and board ordering
//! - [`analytics`] - Dashboard growth, top products, expense summaries
//! - [`notifications`] - Server event messages and the expiring toast log
//! - [`validation`] - Form checks run before calling the API

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod access;
pub mod analytics;
pub mod kitchen;
pub mod notifications;
pub mod orders;
pub mod types;
pub mod validation;

pub use types::*;
