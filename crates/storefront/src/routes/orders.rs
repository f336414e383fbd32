//! Customer order history and cancellation.

use askama::Template;
use askama_web::WebTemplate;
use axum::{
    Form,
    extract::{Path, State},
    response::{IntoResponse, Response},
};
use canteen_core::orders::cancellable_selection;
use canteen_core::{OrderId, OrderItemId, validation};
use tower_sessions::Session;
use tracing::{info, instrument, warn};

use crate::error::AppError;
use crate::filters;
use crate::middleware::RequireAuth;
use crate::models::Flash;
use crate::routes::page::{OrderView, Page, redirect_with, redirect_with_error};
use crate::state::AppState;

const ORDERS_PATH: &str = "/orders";

/// Orders page template.
#[derive(Template, WebTemplate)]
#[template(path = "orders.html")]
pub struct OrdersTemplate {
    pub page: Page,
    pub orders: Vec<OrderView>,
    pub error: Option<String>,
}

/// Cancel dialog submission.
///
/// Checkboxes arrive as repeated `items` fields, so the form is read as
/// raw pairs.
#[derive(Debug, Default, PartialEq, Eq)]
pub struct CancelForm {
    pub items: Vec<OrderItemId>,
    pub reason: String,
}

impl From<Vec<(String, String)>> for CancelForm {
    fn from(pairs: Vec<(String, String)>) -> Self {
        let mut form = Self::default();
        for (key, value) in pairs {
            match key.as_str() {
                "items" | "items[]" if !value.is_empty() => form.items.push(OrderItemId::new(value)),
                "reason" => form.reason = value,
                _ => {}
            }
        }
        form
    }
}

/// Display the customer's orders, newest first.
#[instrument(skip(state, page, auth))]
pub async fn index(
    State(state): State<AppState>,
    page: Page,
    RequireAuth(auth): RequireAuth,
) -> Response {
    match state.api().orders(&auth.api).await {
        Ok(mut orders) => {
            orders.sort_by(|a, b| b.created_at.cmp(&a.created_at));
            OrdersTemplate {
                page,
                orders: orders.iter().map(OrderView::from).collect(),
                error: None,
            }
            .into_response()
        }
        Err(e) if e.is_unauthorized() => AppError::from(e).into_response(),
        Err(e) => {
            warn!(error = %e, "Failed to fetch orders");
            OrdersTemplate {
                page,
                orders: Vec::new(),
                error: Some("Failed to load your orders".to_owned()),
            }
            .into_response()
        }
    }
}

/// Cancel selected items of an order.
///
/// The order is fetched first so a stale dialog cannot cancel items the
/// kitchen has finished, or anything on an order past preparation.
#[instrument(skip(state, session, auth, pairs), fields(order_id = %id))]
pub async fn cancel(
    State(state): State<AppState>,
    session: Session,
    RequireAuth(auth): RequireAuth,
    Path(id): Path<String>,
    Form(pairs): Form<Vec<(String, String)>>,
) -> Response {
    let form = CancelForm::from(pairs);
    let reason = match validation::cancellation(&form.items, &form.reason) {
        Ok(reason) => reason,
        Err(e) => return redirect_with(&session, ORDERS_PATH, Flash::error(e.to_string())).await,
    };

    let order_id = OrderId::new(id);
    let order = match state.api().order(&auth.api, &order_id).await {
        Ok(order) => order,
        Err(e) => return redirect_with_error(&session, ORDERS_PATH, &e).await,
    };
    let items = match cancellable_selection(
        &order.overall_status,
        order.items.iter().map(|item| (&item.id, &item.status)),
        &form.items,
    ) {
        Ok(items) => items,
        Err(e) => {
            warn!(error = %e, "Cancellation refused");
            return redirect_with(&session, ORDERS_PATH, Flash::error(e.to_string())).await;
        }
    };

    match state
        .api()
        .cancel_order(&auth.api, &order_id, &items, reason)
        .await
    {
        Ok(()) => {
            info!(items = items.len(), "Order items cancelled");
            redirect_with(
                &session,
                ORDERS_PATH,
                Flash::success("Selected items cancelled"),
            )
            .await
        }
        Err(e) if e.is_unauthorized() => redirect_with_error(&session, ORDERS_PATH, &e).await,
        Err(e) => {
            warn!(error = %e, "Cancellation failed");
            redirect_with(
                &session,
                ORDERS_PATH,
                Flash::error(format!("Cancellation failed: {}", e.user_message())),
            )
            .await
        }
    }
}
