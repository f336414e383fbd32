//! Canteen MS storefront library.
//!
//! Server-rendered front-end for the Canteen REST API: menu, cart and
//! orders for customers, the kitchen queue, and the admin screens. Exposed
//! as a library so the router can be exercised in tests.

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod api;
pub mod config;
pub mod error;
pub mod filters;
pub mod middleware;
pub mod models;
pub mod routes;
pub mod services;
pub mod state;
