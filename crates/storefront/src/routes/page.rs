//! Page chrome shared by every screen, plus display models for records
//! that appear on several screens.

use axum::{
    extract::FromRequestParts,
    http::request::Parts,
    response::{IntoResponse, Redirect, Response},
};
use canteen_core::orders::OrderLine;
use canteen_core::{MenuPrice, Price};
use rust_decimal::Decimal;
use tower_sessions::Session;
use tracing::warn;

use crate::api::{ApiError, Order, OrderItem, Product};
use crate::config::CanteenApiConfig;
use crate::error::SESSION_EXPIRED_PATH;
use crate::middleware::{auth::load_auth, push_flash, take_flashes};
use crate::models::{CurrentUser, Flash};
use crate::state::AppState;

/// Layout data: who is signed in, pending flashes and the active path.
///
/// Extracting it consumes the session's flash messages.
pub struct Page {
    pub user: Option<CurrentUser>,
    pub flashes: Vec<Flash>,
    pub path: String,
    /// How many live toasts the notification tray shows.
    pub visible_toasts: usize,
    /// How long a toast stays up, in milliseconds.
    pub toast_ttl_ms: u128,
}

impl Page {
    #[must_use]
    pub fn is_admin(&self) -> bool {
        self.user.as_ref().is_some_and(CurrentUser::is_admin)
    }

    #[must_use]
    pub fn is_kitchen(&self) -> bool {
        self.user.as_ref().is_some_and(CurrentUser::is_kitchen)
    }

    #[must_use]
    pub fn can_shop(&self) -> bool {
        self.user.as_ref().is_some_and(CurrentUser::can_shop)
    }

    #[must_use]
    pub const fn signed_in(&self) -> bool {
        self.user.is_some()
    }

    /// Layout data that leaves pending flashes in the session for the next
    /// full page.
    pub async fn keeping_flashes(state: &AppState, session: Option<&Session>, path: &str) -> Self {
        let user = match session {
            Some(session) => load_auth(session).await.map(|auth| auth.user),
            None => None,
        };
        Self {
            user,
            flashes: Vec::new(),
            path: path.to_owned(),
            visible_toasts: state.notifications().visible(),
            toast_ttl_ms: state.notifications().ttl().as_millis(),
        }
    }

    /// Whether a nav link should be highlighted.
    #[must_use]
    pub fn is_active(&self, prefix: &str) -> bool {
        if prefix == "/" {
            return self.path == "/";
        }
        self.path == prefix
            || self
                .path
                .strip_prefix(prefix)
                .is_some_and(|rest| rest.starts_with('/'))
    }
}

impl FromRequestParts<AppState> for Page {
    type Rejection = std::convert::Infallible;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let (user, flashes) = match parts.extensions.get::<Session>() {
            Some(session) => (
                load_auth(session).await.map(|auth| auth.user),
                take_flashes(session).await,
            ),
            None => (None, Vec::new()),
        };

        Ok(Self {
            user,
            flashes,
            path: parts.uri.path().to_owned(),
            visible_toasts: state.notifications().visible(),
            toast_ttl_ms: state.notifications().ttl().as_millis(),
        })
    }
}

// =============================================================================
// Redirect helpers
// =============================================================================

/// A same-site path to go back to, or `fallback`.
///
/// Only absolute paths are accepted so a form cannot redirect off-site.
#[must_use]
pub fn local_path(target: Option<&str>, fallback: &str) -> String {
    target
        .filter(|t| t.starts_with('/') && !t.starts_with("//") && !t.contains('\\'))
        .unwrap_or(fallback)
        .to_owned()
}

/// Flash a message and redirect.
pub async fn redirect_with(session: &Session, to: &str, flash: Flash) -> Response {
    push_flash(session, flash).await;
    Redirect::to(to).into_response()
}

/// Report a failed API call from a form post.
///
/// An expired upstream session goes to the expiry screen; anything else is
/// flashed as an error on the page the form came from.
pub async fn redirect_with_error(session: &Session, to: &str, err: &ApiError) -> Response {
    if err.is_unauthorized() {
        return Redirect::to(SESSION_EXPIRED_PATH).into_response();
    }
    warn!(error = %err, "API call failed");
    redirect_with(session, to, Flash::error(err.user_message())).await
}

/// Format an amount in rupees, e.g. `₹120` or `₹99.50`.
#[must_use]
pub fn money(amount: Decimal) -> String {
    Price::inr(amount).display()
}

/// Date for list rows, e.g. `12 Mar 2025, 14:05`.
#[must_use]
pub fn timestamp(at: Option<chrono::DateTime<chrono::Utc>>) -> String {
    at.map_or_else(String::new, |at| at.format("%d %b %Y, %H:%M").to_string())
}

// =============================================================================
// Product cards
// =============================================================================

/// A product as shown on the menu, favorites and detail screens.
#[derive(Clone)]
pub struct ProductCard {
    pub id: String,
    pub name: String,
    pub description: String,
    pub image: String,
    /// What the customer pays.
    pub price: String,
    /// Struck-through list price when discounted.
    pub list_price: Option<String>,
    /// e.g. `15% OFF`.
    pub discount_badge: Option<String>,
    pub cuisine: String,
    pub categories: Vec<String>,
    pub dietary: Vec<&'static str>,
    pub is_vegetarian: bool,
    pub is_best_seller: bool,
    pub rating: String,
    pub rating_count: u32,
    pub available: bool,
    pub available_days: String,
    pub available_window: String,
    pub favorite: bool,
}

impl ProductCard {
    #[must_use]
    pub fn new(product: &Product, api: &CanteenApiConfig, favorite: bool) -> Self {
        let price = product.menu_price();
        let discounted = price.has_discount();

        Self {
            id: product.id.to_string(),
            name: product.name.clone(),
            description: product.description.clone(),
            image: api.asset(&product.image_url),
            price: money(price.effective()),
            list_price: discounted.then(|| money(product.price)),
            discount_badge: discount_badge(&price),
            cuisine: product.cuisine.clone(),
            categories: product.categories.clone(),
            dietary: product.dietary_info.labels(),
            is_vegetarian: product.dietary_info.is_vegetarian,
            is_best_seller: product.dietary_info.is_best_seller,
            rating: format!("{:.1}", product.rating.average),
            rating_count: product.rating.count,
            available: product.is_available(),
            available_days: product.availability.available_days.join(", "),
            available_window: format!(
                "{} - {}",
                product.availability.available_from, product.availability.available_until
            ),
            favorite,
        }
    }
}

/// `NN% OFF` when a real discount applies.
#[must_use]
pub fn discount_badge(price: &MenuPrice) -> Option<String> {
    price.discount_percent().map(|pct| format!("{pct}% OFF"))
}

// =============================================================================
// Orders
// =============================================================================

/// An order line for customer, admin and kitchen screens.
#[derive(Clone)]
pub struct OrderItemView {
    pub id: String,
    pub name: String,
    pub quantity: u32,
    pub price: String,
    pub line_total: String,
    pub status: String,
    pub rejection_message: Option<String>,
    pub cancellable: bool,
    pub dropped: bool,
}

impl From<&OrderItem> for OrderItemView {
    fn from(item: &OrderItem) -> Self {
        Self {
            id: item.id.to_string(),
            name: item.product_name.clone(),
            quantity: item.quantity,
            price: money(item.price),
            line_total: money(item.line_total()),
            status: item.status.to_string(),
            rejection_message: item.rejection_message.clone(),
            cancellable: item.status.is_cancellable(),
            dropped: item.status.is_rejected_or_cancelled(),
        }
    }
}

/// An order summary row.
#[derive(Clone)]
pub struct OrderView {
    pub id: String,
    /// Last six characters of the id.
    pub number: String,
    pub placed_at: String,
    pub total: String,
    pub status: String,
    pub payment_status: String,
    pub customer_name: String,
    pub customer_email: String,
    pub customer_phone: String,
    pub items: Vec<OrderItemView>,
    pub can_cancel: bool,
}

impl From<&Order> for OrderView {
    fn from(order: &Order) -> Self {
        let customer = order.customer();
        Self {
            id: order.id.to_string(),
            number: order.id.short().to_owned(),
            placed_at: timestamp(order.created_at),
            total: money(order.total_amount),
            status: order.overall_status.to_string(),
            payment_status: order.payment_status.to_string(),
            customer_name: customer.map_or_else(|| "Unknown".to_owned(), |c| c.full_name.clone()),
            customer_email: customer.map(|c| c.email.clone()).unwrap_or_default(),
            customer_phone: customer
                .and_then(|c| c.phone.clone())
                .unwrap_or_default(),
            items: order.items.iter().map(OrderItemView::from).collect(),
            can_cancel: canteen_core::orders::can_cancel(&order.overall_status),
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_local_path_rejects_offsite_targets() {
        assert_eq!(local_path(Some("/products/p1"), "/menu"), "/products/p1");
        assert_eq!(local_path(Some("https://evil.example"), "/menu"), "/menu");
        assert_eq!(local_path(Some("//evil.example"), "/menu"), "/menu");
        assert_eq!(local_path(None, "/menu"), "/menu");
    }

    fn product(json: &str) -> Product {
        serde_json::from_str(json).unwrap()
    }

    #[test]
    fn test_card_shows_discount() {
        let api = CanteenApiConfig::for_base("http://localhost:5000/api").unwrap();
        let card = ProductCard::new(
            &product(
                r#"{"_id":"p1","name":"Masala Dosa","price":120,"discountPrice":102,
                   "imageUrl":"/uploads/dosa.jpg","dietaryInfo":{"isVegetarian":true}}"#,
            ),
            &api,
            false,
        );
        assert_eq!(card.price, "₹102");
        assert_eq!(card.list_price.as_deref(), Some("₹120"));
        assert_eq!(card.discount_badge.as_deref(), Some("15% OFF"));
        assert_eq!(card.image, "http://localhost:5000/uploads/dosa.jpg");
        assert!(card.is_vegetarian);
        assert!(card.available);
    }

    #[test]
    fn test_card_without_discount() {
        let api = CanteenApiConfig::for_base("http://localhost:5000/api").unwrap();
        let card = ProductCard::new(
            &product(r#"{"_id":"p2","name":"Tea","price":20}"#),
            &api,
            true,
        );
        assert_eq!(card.price, "₹20");
        assert!(card.list_price.is_none());
        assert!(card.discount_badge.is_none());
        assert!(card.favorite);
    }

    #[test]
    fn test_order_view() {
        let order: Order = serde_json::from_str(
            r#"{"_id":"65f0a1b2c3d4e5f601234567","totalAmount":140,
                "overallStatus":"preparing","paymentStatus":"paid",
                "userId":{"_id":"u1","fullName":"Asha","email":"asha@example.com"},
                "items":[
                  {"_id":"i1","productName":"Dosa","price":60,"quantity":2,"status":"ready"},
                  {"_id":"i2","productName":"Tea","price":20,"quantity":1,"status":"rejected"}
                ]}"#,
        )
        .unwrap();
        let view = OrderView::from(&order);
        assert_eq!(view.number, "234567");
        assert_eq!(view.customer_name, "Asha");
        assert!(view.can_cancel);
        assert_eq!(view.items[0].line_total, "₹120");
        assert!(!view.items[0].cancellable);
        assert!(view.items[1].dropped);
    }
}
