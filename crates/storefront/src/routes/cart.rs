//! Cart route handlers.
//!
//! The cart lives on the Canteen API; every handler here forwards the
//! change and redirects back to the page it came from. Lines whose product
//! has been deleted are hidden and left out of the total.

use askama::Template;
use askama_web::WebTemplate;
use axum::{
    Form,
    extract::{Path, State},
    response::{IntoResponse, Response},
};
use canteen_core::orders::{cart_total, step_quantity};
use canteen_core::{PaymentStatus, ProductId};
use chrono::Utc;
use serde::Deserialize;
use tower_sessions::Session;
use tracing::{info, instrument, warn};

use crate::api::{
    ApiError, ApiSession, CartItem, PaymentConfirmation, PlaceOrder, PlaceOrderItem,
};
use crate::error::add_breadcrumb;
use crate::filters;
use crate::middleware::RequireAuth;
use crate::models::Flash;
use crate::routes::page::{Page, local_path, money, redirect_with, redirect_with_error};
use crate::state::AppState;

/// Cart line display data for templates.
#[derive(Clone)]
pub struct CartLineView {
    pub product_id: String,
    pub name: String,
    pub image: String,
    pub price: String,
    pub quantity: u32,
    pub line_total: String,
}

/// Cart display data for templates.
#[derive(Clone)]
pub struct CartView {
    pub lines: Vec<CartLineView>,
    pub total: String,
    pub item_count: u32,
}

impl CartView {
    /// Build the view, dropping lines whose product no longer exists.
    #[must_use]
    pub fn new(items: &[CartItem], api: &crate::config::CanteenApiConfig) -> Self {
        let lines = items
            .iter()
            .filter_map(|item| {
                let product = item.product()?;
                let price = product.menu_price().effective();
                Some(CartLineView {
                    product_id: product.id.to_string(),
                    name: product.name.clone(),
                    image: api.asset(&product.image_url),
                    price: money(price),
                    quantity: item.quantity,
                    line_total: money(price * rust_decimal::Decimal::from(item.quantity)),
                })
            })
            .collect::<Vec<_>>();

        Self {
            total: money(total(items)),
            item_count: lines.iter().map(|l| l.quantity).sum(),
            lines,
        }
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }
}

fn total(items: &[CartItem]) -> rust_decimal::Decimal {
    cart_total(
        items
            .iter()
            .map(|item| (item.product().map(|p| p.menu_price()), item.quantity)),
    )
}

/// Add to cart form data.
#[derive(Debug, Deserialize)]
pub struct AddToCartForm {
    pub product_id: String,
    pub quantity: Option<u32>,
    pub return_to: Option<String>,
}

/// Quantity step form data.
#[derive(Debug, Deserialize)]
pub struct StepForm {
    /// Quantity currently shown.
    pub quantity: u32,
    /// `1` or `-1`.
    pub delta: i32,
}

/// Cart page template.
#[derive(Template, WebTemplate)]
#[template(path = "cart.html")]
pub struct CartTemplate {
    pub page: Page,
    pub cart: CartView,
    pub error: Option<String>,
}

/// Cart count badge fragment.
#[derive(Template, WebTemplate)]
#[template(path = "partials/cart_count.html")]
pub struct CartCountTemplate {
    pub count: u32,
}

/// Display cart page.
#[instrument(skip(state, page, auth))]
pub async fn show(
    State(state): State<AppState>,
    page: Page,
    RequireAuth(auth): RequireAuth,
) -> Response {
    match state.api().cart(&auth.api).await {
        Ok(items) => CartTemplate {
            page,
            cart: CartView::new(&items, &state.config().api),
            error: None,
        }
        .into_response(),
        Err(e) if e.is_unauthorized() => crate::error::AppError::from(e).into_response(),
        Err(e) => {
            warn!(error = %e, "Failed to fetch cart");
            CartTemplate {
                page,
                cart: CartView::new(&[], &state.config().api),
                error: Some("Failed to load your cart".to_owned()),
            }
            .into_response()
        }
    }
}

/// Cart count badge for the navigation bar.
#[instrument(skip(state, auth))]
pub async fn count(State(state): State<AppState>, RequireAuth(auth): RequireAuth) -> impl IntoResponse {
    let count = state
        .api()
        .cart(&auth.api)
        .await
        .map(|items| {
            items
                .iter()
                .filter(|item| item.product().is_some())
                .map(|item| item.quantity)
                .sum()
        })
        .unwrap_or(0);

    CartCountTemplate { count }
}

/// Add a product to the cart.
#[instrument(skip(state, session, auth, form), fields(product_id = %form.product_id))]
pub async fn add(
    State(state): State<AppState>,
    session: Session,
    RequireAuth(auth): RequireAuth,
    Form(form): Form<AddToCartForm>,
) -> Response {
    let back = local_path(form.return_to.as_deref(), "/menu");
    let quantity = form.quantity.unwrap_or(1).max(1);
    let product_id = ProductId::new(form.product_id);

    match state.api().add_to_cart(&auth.api, &product_id, quantity).await {
        Ok(items) => {
            add_breadcrumb("cart", "Added to cart", Some(&[("product_id", product_id.as_str())]));
            let name = items
                .iter()
                .filter_map(CartItem::product)
                .find(|p| p.id == product_id)
                .map(|p| p.name.clone());
            let message = name.map_or_else(
                || "Added to cart successfully!".to_owned(),
                |name| format!("{quantity} {name} added to cart!"),
            );
            redirect_with(&session, &back, Flash::success(message)).await
        }
        Err(e) => redirect_with_error(&session, &back, &e).await,
    }
}

/// Step a line's quantity up or down. Never goes below one.
#[instrument(skip(state, session, auth, form), fields(product_id = %id))]
pub async fn step(
    State(state): State<AppState>,
    session: Session,
    RequireAuth(auth): RequireAuth,
    Path(id): Path<String>,
    Form(form): Form<StepForm>,
) -> Response {
    let Some(quantity) = step_quantity(form.quantity, form.delta) else {
        return axum::response::Redirect::to("/cart").into_response();
    };

    match state
        .api()
        .update_cart_item(&auth.api, &ProductId::new(id), quantity)
        .await
    {
        Ok(_) => axum::response::Redirect::to("/cart").into_response(),
        Err(e) => redirect_with_error(&session, "/cart", &e).await,
    }
}

/// Remove a line from the cart.
#[instrument(skip(state, session, auth), fields(product_id = %id))]
pub async fn remove(
    State(state): State<AppState>,
    session: Session,
    RequireAuth(auth): RequireAuth,
    Path(id): Path<String>,
) -> Response {
    match state
        .api()
        .remove_cart_item(&auth.api, &ProductId::new(id))
        .await
    {
        Ok(()) => redirect_with(&session, "/cart", Flash::success("Item removed from cart")).await,
        Err(e) => redirect_with_error(&session, "/cart", &e).await,
    }
}

/// Empty the cart.
#[instrument(skip(state, session, auth))]
pub async fn clear(
    State(state): State<AppState>,
    session: Session,
    RequireAuth(auth): RequireAuth,
) -> Response {
    match state.api().clear_cart(&auth.api).await {
        Ok(()) => redirect_with(&session, "/cart", Flash::success("Cart cleared")).await,
        Err(e) => redirect_with_error(&session, "/cart", &e).await,
    }
}

/// Place the order, confirm a simulated payment and empty the cart.
#[instrument(skip(state, session, auth))]
pub async fn checkout(
    State(state): State<AppState>,
    session: Session,
    RequireAuth(auth): RequireAuth,
) -> Response {
    let items = match state.api().cart(&auth.api).await {
        Ok(items) => items,
        Err(e) => return redirect_with_error(&session, "/cart", &e).await,
    };

    let lines = order_lines(&items);
    if lines.is_empty() {
        return redirect_with(&session, "/cart", Flash::warning("Your cart is empty")).await;
    }

    match place_and_pay(&state, &auth.api, lines, total(&items)).await {
        Ok(order_id) => {
            info!(order_id = %order_id, "Order placed");
            add_breadcrumb("order", "Placed order", Some(&[("order_id", order_id.as_str())]));
            redirect_with(&session, "/orders", Flash::success("Order placed successfully!")).await
        }
        Err(e) if e.is_unauthorized() => redirect_with_error(&session, "/cart", &e).await,
        Err(e) => {
            warn!(error = %e, "Checkout failed");
            redirect_with(
                &session,
                "/cart",
                Flash::error(format!("Error placing order: {}", e.user_message())),
            )
            .await
        }
    }
}

/// Snapshot of the cart sent with the order, at effective prices.
fn order_lines(items: &[CartItem]) -> Vec<PlaceOrderItem> {
    items
        .iter()
        .filter_map(|item| {
            let product = item.product()?;
            Some(PlaceOrderItem {
                product_id: product.id.clone(),
                product_name: product.name.clone(),
                price: product.menu_price().effective(),
                quantity: item.quantity,
            })
        })
        .collect()
}

async fn place_and_pay(
    state: &AppState,
    api: &ApiSession,
    items: Vec<PlaceOrderItem>,
    total_amount: rust_decimal::Decimal,
) -> Result<canteen_core::OrderId, ApiError> {
    let order = state
        .api()
        .place_order(
            api,
            &PlaceOrder {
                items,
                total_amount,
                address: &state.config().pickup_address,
            },
        )
        .await?;

    state
        .api()
        .confirm_payment(
            api,
            &PaymentConfirmation {
                order_id: order.id.clone(),
                payment_id: format!("PAY_{}", Utc::now().timestamp_millis()),
                status: PaymentStatus::Paid,
            },
        )
        .await?;

    state.api().clear_cart(api).await?;
    Ok(order.id)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::config::CanteenApiConfig;
    use rust_decimal::Decimal;

    fn items() -> Vec<CartItem> {
        serde_json::from_str(
            r#"[{"productId":{"_id":"p1","name":"Dosa","price":60,"discountPrice":50},"quantity":2},
                {"productId":null,"quantity":4},
                {"productId":{"_id":"p2","name":"Tea","price":20},"quantity":1}]"#,
        )
        .unwrap()
    }

    #[test]
    fn test_cart_view_hides_deleted_products() {
        let api = CanteenApiConfig::for_base("http://localhost:5000/api").unwrap();
        let view = CartView::new(&items(), &api);
        assert_eq!(view.lines.len(), 2);
        assert_eq!(view.item_count, 3);
        assert_eq!(view.total, "₹120");
        assert_eq!(view.lines[0].line_total, "₹100");
    }

    #[test]
    fn test_order_lines_use_effective_price() {
        let lines = order_lines(&items());
        assert_eq!(lines.len(), 2);
        assert_eq!(lines[0].price, Decimal::from(50));
        assert_eq!(lines[0].product_name, "Dosa");
        assert_eq!(lines[1].price, Decimal::from(20));
    }

    #[test]
    fn test_empty_cart_view() {
        let api = CanteenApiConfig::for_base("http://localhost:5000/api").unwrap();
        let view = CartView::new(&[], &api);
        assert!(view.is_empty());
        assert_eq!(view.total, "₹0");
    }
}
