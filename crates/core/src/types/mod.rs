//! Core types for Canteen MS.
//!
//! This module provides type-safe wrappers for common domain concepts.

pub mod catalog;
pub mod id;
pub mod price;
pub mod status;

pub use catalog::{CATEGORIES, CUISINES, DietaryInfo, ExpenseType, WEEKDAYS};
pub use id::*;
pub use price::{CurrencyCode, MenuPrice, Price, format_amount};
pub use status::*;
