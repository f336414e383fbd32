//! Kitchen dashboard: the live queue of orders being prepared.

use askama::Template;
use askama_web::WebTemplate;
use axum::{
    Form,
    extract::{Path, State},
    response::{IntoResponse, Response},
};
use canteen_core::kitchen::{ItemActions, in_kitchen_queue, kitchen_rank};
use canteen_core::{ItemStatus, OrderId, OrderItemId};
use serde::Deserialize;
use tower_sessions::Session;
use tracing::{info, instrument, warn};

use crate::api::{ApiError, Order};
use crate::error::AppError;
use crate::filters;
use crate::middleware::RequireAuth;
use crate::models::Flash;
use crate::routes::page::{OrderItemView, OrderView, Page, redirect_with, redirect_with_error};
use crate::state::AppState;

const KITCHEN_PATH: &str = "/kitchen";

/// An order item with the buttons the kitchen may press.
#[derive(Clone)]
pub struct KitchenItem {
    pub item: OrderItemView,
    pub actions: ItemActions,
}

/// An order card on the kitchen board.
#[derive(Clone)]
pub struct KitchenOrder {
    pub order: OrderView,
    pub items: Vec<KitchenItem>,
}

impl From<&Order> for KitchenOrder {
    fn from(order: &Order) -> Self {
        Self {
            order: OrderView::from(order),
            items: order
                .items
                .iter()
                .map(|item| KitchenItem {
                    item: OrderItemView::from(item),
                    actions: ItemActions::for_status(&item.status),
                })
                .collect(),
        }
    }
}

/// Active orders, preparing first then pending.
#[must_use]
pub fn board(orders: &[Order]) -> Vec<KitchenOrder> {
    let mut active: Vec<&Order> = orders
        .iter()
        .filter(|o| in_kitchen_queue(&o.overall_status))
        .collect();
    active.sort_by_key(|o| kitchen_rank(&o.overall_status));
    active.into_iter().map(KitchenOrder::from).collect()
}

/// Kitchen dashboard template.
#[derive(Template, WebTemplate)]
#[template(path = "kitchen.html")]
pub struct KitchenTemplate {
    pub page: Page,
    pub orders: Vec<KitchenOrder>,
    pub error: Option<String>,
}

/// Item status change form.
#[derive(Debug, Deserialize)]
pub struct ItemStatusForm {
    /// `preparing` or `ready`.
    pub status: String,
}

/// Item rejection form.
#[derive(Debug, Deserialize)]
pub struct RejectForm {
    #[serde(default)]
    pub reason: String,
}

/// Display the kitchen queue.
#[instrument(skip(state, page, auth))]
pub async fn index(
    State(state): State<AppState>,
    page: Page,
    RequireAuth(auth): RequireAuth,
) -> Response {
    match state.api().kitchen_orders(&auth.api).await {
        Ok(orders) => KitchenTemplate {
            page,
            orders: board(&orders),
            error: None,
        }
        .into_response(),
        Err(e) if e.is_unauthorized() => AppError::from(e).into_response(),
        Err(e) => {
            warn!(error = %e, "Error fetching kitchen orders");
            KitchenTemplate {
                page,
                orders: Vec::new(),
                error: Some("Failed to load orders".to_owned()),
            }
            .into_response()
        }
    }
}

/// Move an item to preparing or ready.
#[instrument(skip(state, session, auth, form), fields(order_id = %order_id, item_id = %item_id))]
pub async fn set_status(
    State(state): State<AppState>,
    session: Session,
    RequireAuth(auth): RequireAuth,
    Path((order_id, item_id)): Path<(String, String)>,
    Form(form): Form<ItemStatusForm>,
) -> Response {
    let status = ItemStatus::from(form.status.as_str());
    if !matches!(status, ItemStatus::Preparing | ItemStatus::Ready) {
        return redirect_with(&session, KITCHEN_PATH, Flash::error("Unknown item status")).await;
    }

    let result = state
        .api()
        .set_item_status(
            &auth.api,
            &OrderId::new(order_id),
            &OrderItemId::new(item_id),
            &status,
            &auth.user.id,
        )
        .await;

    match result {
        Ok(()) => {
            info!(status = %status, "Item status updated");
            redirect_with(
                &session,
                KITCHEN_PATH,
                Flash::success(format!("Item marked {status}")),
            )
            .await
        }
        Err(e) => action_failed(&session, &e).await,
    }
}

/// Reject an item, with an optional reason for the customer.
#[instrument(skip(state, session, auth, form), fields(order_id = %order_id, item_id = %item_id))]
pub async fn reject(
    State(state): State<AppState>,
    session: Session,
    RequireAuth(auth): RequireAuth,
    Path((order_id, item_id)): Path<(String, String)>,
    Form(form): Form<RejectForm>,
) -> Response {
    let reason = Some(form.reason.trim()).filter(|r| !r.is_empty());
    let result = state
        .api()
        .reject_item(
            &auth.api,
            &OrderId::new(order_id),
            &OrderItemId::new(item_id),
            &auth.user.id,
            reason,
        )
        .await;

    match result {
        Ok(()) => {
            info!("Item rejected");
            redirect_with(&session, KITCHEN_PATH, Flash::warning("Item rejected")).await
        }
        Err(e) => action_failed(&session, &e).await,
    }
}

/// A conflict means someone else changed the order; the board reloads with
/// fresh data either way.
async fn action_failed(session: &Session, err: &ApiError) -> Response {
    if err.is_conflict() {
        return redirect_with(session, KITCHEN_PATH, Flash::warning(err.user_message())).await;
    }
    redirect_with_error(session, KITCHEN_PATH, err).await
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn orders() -> Vec<Order> {
        serde_json::from_str(
            r#"[
              {"_id":"o1","totalAmount":40,"overallStatus":"pending",
               "items":[{"_id":"i1","productName":"Idli","price":40,"quantity":1,"status":"pending"}]},
              {"_id":"o2","totalAmount":60,"overallStatus":"ready","items":[]},
              {"_id":"o3","totalAmount":90,"overallStatus":"preparing",
               "items":[{"_id":"i2","productName":"Dosa","price":60,"quantity":1,"status":"preparing"},
                        {"_id":"i3","productName":"Tea","price":30,"quantity":1,"status":"ready"}]},
              {"_id":"o4","totalAmount":20,"overallStatus":"completed","items":[]}
            ]"#,
        )
        .unwrap()
    }

    #[test]
    fn test_board_keeps_active_orders_preparing_first() {
        let board = board(&orders());
        let ids: Vec<&str> = board.iter().map(|o| o.order.id.as_str()).collect();
        assert_eq!(ids, vec!["o3", "o1"]);
    }

    #[test]
    fn test_board_item_actions() {
        let board = board(&orders());
        let preparing = &board[0].items[0].actions;
        assert!(!preparing.prepare);
        assert!(preparing.ready);
        assert!(preparing.reject);

        let ready = &board[0].items[1].actions;
        assert!(!ready.any());

        let pending = &board[1].items[0].actions;
        assert!(pending.prepare && pending.ready && pending.reject);
    }
}
