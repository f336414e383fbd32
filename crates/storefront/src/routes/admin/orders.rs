//! Admin order management: this month's board, order detail and refunds.

use askama::Template;
use askama_web::WebTemplate;
use axum::{
    Form,
    extract::{Path, State},
    response::{IntoResponse, Redirect, Response},
};
use canteen_core::kitchen::{StatusCounts, admin_board_rank, on_admin_board};
use canteen_core::orders::{active_item_count, refund_amount, refundable_items, requires_refund};
use canteen_core::{OrderId, OverallStatus};
use chrono::{DateTime, Datelike, SecondsFormat, TimeZone, Utc};
use serde::Deserialize;
use tower_sessions::Session;
use tracing::{info, instrument, warn};

use crate::api::{AdminOrderFilter, ApiError, Order, OrderStatusUpdate};
use crate::error::{AppError, Result};
use crate::filters;
use crate::middleware::{AuthSession, RequireAuth};
use crate::models::Flash;
use crate::routes::page::{OrderItemView, OrderView, Page, money, redirect_with, redirect_with_error};
use crate::state::AppState;

const ORDERS_PATH: &str = "/admin/orders";

const REFRESH_MESSAGE: &str = "Some items were cancelled or rejected. Please refresh.";

/// `startDate`/`endDate` covering the current month up to `now`.
fn month_window(now: DateTime<Utc>) -> (String, String) {
    let start = Utc
        .with_ymd_and_hms(now.year(), now.month(), 1, 0, 0, 0)
        .single()
        .unwrap_or(now);
    (
        start.to_rfc3339_opts(SecondsFormat::Millis, true),
        now.to_rfc3339_opts(SecondsFormat::Millis, true),
    )
}

/// Orders still needing attention, ready first.
#[must_use]
pub fn admin_board(orders: &[Order]) -> Vec<OrderView> {
    let mut active: Vec<&Order> = orders
        .iter()
        .filter(|o| on_admin_board(&o.overall_status, &o.payment_status))
        .collect();
    active.sort_by_key(|o| admin_board_rank(&o.overall_status));
    active.into_iter().map(OrderView::from).collect()
}

/// Manage orders template.
#[derive(Template, WebTemplate)]
#[template(path = "admin/orders.html")]
pub struct OrdersTemplate {
    pub page: Page,
    pub counts: StatusCounts,
    pub orders: Vec<OrderView>,
    pub error: Option<String>,
}

/// Display this month's orders.
#[instrument(skip(state, page, auth))]
pub async fn index(
    State(state): State<AppState>,
    page: Page,
    RequireAuth(auth): RequireAuth,
) -> Response {
    let (start_date, end_date) = month_window(Utc::now());
    let filter = AdminOrderFilter {
        start_date: Some(start_date),
        end_date: Some(end_date),
        ..AdminOrderFilter::default()
    };

    match state.api().admin_orders(&auth.api, &filter).await {
        Ok(orders) => OrdersTemplate {
            page,
            counts: StatusCounts::tally(orders.iter().map(|o| &o.overall_status)),
            orders: admin_board(&orders),
            error: None,
        }
        .into_response(),
        Err(e) if e.is_unauthorized() => AppError::from(e).into_response(),
        Err(e) => {
            warn!(error = %e, "Error fetching orders");
            OrdersTemplate {
                page,
                counts: StatusCounts::default(),
                orders: Vec::new(),
                error: Some("Failed to load orders".to_owned()),
            }
            .into_response()
        }
    }
}

// =============================================================================
// Order detail
// =============================================================================

/// Order detail template.
#[derive(Template, WebTemplate)]
#[template(path = "admin/order.html")]
pub struct OrderTemplate {
    pub page: Page,
    pub order: OrderView,
    /// Paid with dropped items: both actions go to the refund page.
    pub refund_due: bool,
    /// Only ready orders can be completed.
    pub ready: bool,
    pub finished: bool,
}

/// Display one order with its complete and reject actions.
#[instrument(skip(state, page, auth), fields(order_id = %id))]
pub async fn show(
    State(state): State<AppState>,
    page: Page,
    RequireAuth(auth): RequireAuth,
    Path(id): Path<String>,
) -> Result<Response> {
    let order = state.api().admin_order(&auth.api, &OrderId::new(id)).await?;

    Ok(OrderTemplate {
        page,
        refund_due: requires_refund(&order.payment_status, &order.items),
        ready: matches!(order.overall_status, OverallStatus::Ready),
        finished: matches!(
            order.overall_status,
            OverallStatus::Completed | OverallStatus::Rejected | OverallStatus::Cancelled
        ),
        order: OrderView::from(&order),
    }
    .into_response())
}

fn detail_path(id: &str) -> String {
    format!("{ORDERS_PATH}/{id}")
}

fn refund_path(id: &str) -> String {
    format!("/admin/refund/{id}")
}

/// Send the order to its new status, unless money is owed back first.
async fn finish_order(
    state: &AppState,
    session: &Session,
    auth: &AuthSession,
    id: &str,
    status: OverallStatus,
    rejection_message: Option<String>,
) -> Response {
    let order_id = OrderId::new(id);
    let order = match state.api().admin_order(&auth.api, &order_id).await {
        Ok(order) => order,
        Err(e) => return redirect_with_error(session, ORDERS_PATH, &e).await,
    };

    if requires_refund(&order.payment_status, &order.items) {
        return Redirect::to(&refund_path(id)).into_response();
    }

    let update = OrderStatusUpdate {
        status,
        rejection_message,
        active_count: active_item_count(&order.items),
    };

    match state
        .api()
        .update_order_status(&auth.api, &order_id, &update)
        .await
    {
        Ok(()) => {
            info!(status = %update.status, "Order status updated");
            let message = format!("Order #{} marked {}", order_id.short(), update.status);
            redirect_with(session, ORDERS_PATH, Flash::success(message)).await
        }
        Err(e) if e.is_conflict() => {
            redirect_with(session, &detail_path(id), Flash::warning(REFRESH_MESSAGE)).await
        }
        Err(e) => redirect_with_error(session, &detail_path(id), &e).await,
    }
}

/// Complete an order.
#[instrument(skip(state, session, auth), fields(order_id = %id))]
pub async fn complete(
    State(state): State<AppState>,
    session: Session,
    RequireAuth(auth): RequireAuth,
    Path(id): Path<String>,
) -> Response {
    finish_order(&state, &session, &auth, &id, OverallStatus::Completed, None).await
}

/// Order rejection form.
#[derive(Debug, Deserialize)]
pub struct RejectOrderForm {
    #[serde(default)]
    pub reason: String,
}

/// Reject an order. A reason is required.
#[instrument(skip(state, session, auth, form), fields(order_id = %id))]
pub async fn reject(
    State(state): State<AppState>,
    session: Session,
    RequireAuth(auth): RequireAuth,
    Path(id): Path<String>,
    Form(form): Form<RejectOrderForm>,
) -> Response {
    let reason = form.reason.trim();
    if reason.is_empty() {
        return redirect_with(
            &session,
            &detail_path(&id),
            Flash::error("Please enter a rejection reason."),
        )
        .await;
    }
    let reason = reason.to_owned();
    finish_order(&state, &session, &auth, &id, OverallStatus::Rejected, Some(reason)).await
}

// =============================================================================
// Refund
// =============================================================================

/// Refund confirmation template.
#[derive(Template, WebTemplate)]
#[template(path = "admin/refund.html")]
pub struct RefundTemplate {
    pub page: Page,
    pub order: OrderView,
    pub items: Vec<OrderItemView>,
    pub amount: String,
    /// Nothing to refund; the confirm button is disabled.
    pub nothing_due: bool,
}

/// Display what is owed for an order.
#[instrument(skip(state, page, auth), fields(order_id = %id))]
pub async fn refund_page(
    State(state): State<AppState>,
    page: Page,
    RequireAuth(auth): RequireAuth,
    Path(id): Path<String>,
) -> Result<Response> {
    let order = state.api().admin_order(&auth.api, &OrderId::new(id)).await?;
    let amount = refund_amount(&order.items);

    Ok(RefundTemplate {
        page,
        items: refundable_items(&order.items).map(OrderItemView::from).collect(),
        amount: money(amount),
        nothing_due: amount.is_zero(),
        order: OrderView::from(&order),
    }
    .into_response())
}

/// Refund the dropped items of an order.
///
/// The amount is recomputed from the current order rather than taken from
/// the form.
#[instrument(skip(state, session, auth), fields(order_id = %id))]
pub async fn refund(
    State(state): State<AppState>,
    session: Session,
    RequireAuth(auth): RequireAuth,
    Path(id): Path<String>,
) -> Response {
    let order_id = OrderId::new(id.as_str());
    let back = refund_path(&id);

    let order = match state.api().admin_order(&auth.api, &order_id).await {
        Ok(order) => order,
        Err(e) => return redirect_with_error(&session, &back, &e).await,
    };

    let amount = refund_amount(&order.items);
    if amount.is_zero() {
        return redirect_with(&session, &back, Flash::warning("Nothing to refund for this order")).await;
    }

    match state.api().refund_order(&auth.api, &order_id, amount).await {
        Ok(()) => {
            info!(amount = %amount, "Refund processed");
            redirect_with(&session, ORDERS_PATH, Flash::success("Refund processed successfully!")).await
        }
        Err(e) => refund_failed(&session, &back, &e).await,
    }
}

async fn refund_failed(session: &Session, back: &str, err: &ApiError) -> Response {
    if err.is_unauthorized() {
        return redirect_with_error(session, back, err).await;
    }
    warn!(error = %err, "Refund failed");
    redirect_with(session, back, Flash::error("Refund failed. Try again.")).await
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn orders() -> Vec<Order> {
        serde_json::from_str(
            r#"[
              {"_id":"o1","totalAmount":40,"overallStatus":"pending","paymentStatus":"paid","items":[]},
              {"_id":"o2","totalAmount":60,"overallStatus":"completed","paymentStatus":"paid","items":[]},
              {"_id":"o3","totalAmount":90,"overallStatus":"ready","paymentStatus":"paid","items":[]},
              {"_id":"o4","totalAmount":20,"overallStatus":"rejected","paymentStatus":"refunded","items":[]},
              {"_id":"o5","totalAmount":20,"overallStatus":"cancelled","paymentStatus":"paid","items":[]},
              {"_id":"o6","totalAmount":30,"overallStatus":"preparing","paymentStatus":"paid","items":[]}
            ]"#,
        )
        .unwrap()
    }

    #[test]
    fn test_admin_board_order_and_visibility() {
        let board = admin_board(&orders());
        let ids: Vec<&str> = board.iter().map(|o| o.id.as_str()).collect();
        assert_eq!(ids, vec!["o3", "o6", "o1", "o5"]);
    }

    #[test]
    fn test_counts_cover_the_whole_month() {
        let orders = orders();
        let counts = StatusCounts::tally(orders.iter().map(|o| &o.overall_status));
        assert_eq!(counts.total, 6);
        assert_eq!(counts.completed, 1);
        assert_eq!(counts.rejected, 1);
    }

    #[test]
    fn test_month_window_starts_on_the_first() {
        let now = Utc.with_ymd_and_hms(2025, 3, 17, 9, 30, 0).unwrap();
        let (start, end) = month_window(now);
        assert_eq!(start, "2025-03-01T00:00:00.000Z");
        assert_eq!(end, "2025-03-17T09:30:00.000Z");
    }
}
