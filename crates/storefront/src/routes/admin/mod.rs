//! Admin screens: dashboard, menu management, orders, staff and expenses.
//!
//! Every path here sits under `/admin` and is reserved for the admin role by
//! the access gate.

pub mod dashboard;
pub mod expenses;
pub mod orders;
pub mod products;
pub mod staff;

use axum::{
    Router,
    extract::DefaultBodyLimit,
    routing::{get, post},
};
use canteen_core::analytics::AnalyticsRange;
use canteen_core::validation::MAX_IMAGE_BYTES;

use crate::state::AppState;

/// An entry of the analytics range picker.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RangeOption {
    pub value: &'static str,
    pub label: &'static str,
}

/// Every analytics range, in picker order.
#[must_use]
pub fn range_options() -> Vec<RangeOption> {
    AnalyticsRange::ALL
        .iter()
        .map(|range| RangeOption {
            value: range.as_str(),
            label: range.label(),
        })
        .collect()
}

/// Room for the text fields of a product form next to its image.
const PRODUCT_FORM_LIMIT: usize = MAX_IMAGE_BYTES + 1024 * 1024;

/// Product create and update, which accept an image upload.
fn product_form_routes() -> Router<AppState> {
    Router::new()
        .route("/products/new", get(products::new_page).post(products::create))
        .route("/products/{id}", post(products::update))
        .layer(DefaultBodyLimit::max(PRODUCT_FORM_LIMIT))
}

/// Admin routes, relative to `/admin`.
pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/", get(dashboard::index))
        // Menu management
        .route("/products", get(products::index))
        .merge(product_form_routes())
        .route("/products/{id}/edit", get(products::edit_page))
        .route("/products/{id}/availability", post(products::toggle_availability))
        .route("/products/{id}/discount", post(products::set_discount))
        .route("/products/{id}/discount/clear", post(products::clear_discount))
        .route("/products/{id}/delete", post(products::delete))
        // Orders
        .route("/orders", get(orders::index))
        .route("/orders/{id}", get(orders::show))
        .route("/orders/{id}/complete", post(orders::complete))
        .route("/orders/{id}/reject", post(orders::reject))
        .route("/refund/{id}", get(orders::refund_page).post(orders::refund))
        // Staff
        .route("/staff", get(staff::index).post(staff::create))
        .route("/staff/{id}", post(staff::update))
        .route("/staff/{id}/delete", post(staff::delete))
        // Expenses
        .route("/expenses", get(expenses::index))
        .route("/expenses/new", get(expenses::new_page).post(expenses::create))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_range_options_follow_analytics_ranges() {
        let options = range_options();
        assert_eq!(options.len(), AnalyticsRange::ALL.len());
        assert_eq!(options[0].value, AnalyticsRange::SevenDays.as_str());
        assert_eq!(options[3].value, "all");
    }
}
