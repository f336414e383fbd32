//! Kitchen queue endpoints.
//!
//! Item actions answer `{success, message}`. A `success: false` means the
//! order moved on (another cook, a customer cancellation) and the caller
//! should refresh rather than retry.

use canteen_core::{ItemStatus, OrderId, OrderItemId, UserId};
use reqwest::Method;
use serde::{Deserialize, Serialize};
use tracing::instrument;

use super::orders::OrdersEnvelope;
use super::types::Order;
use super::{ApiError, ApiSession, CanteenClient, segment};

const UPDATED_EXTERNALLY: &str = "Order was updated externally. Refreshing...";

#[derive(Deserialize)]
struct Ack {
    #[serde(default = "succeeded")]
    success: bool,
    message: Option<String>,
}

const fn succeeded() -> bool {
    true
}

impl Ack {
    fn into_result(self) -> Result<(), ApiError> {
        if self.success {
            Ok(())
        } else {
            Err(ApiError::Conflict(
                self.message
                    .filter(|m| !m.trim().is_empty())
                    .unwrap_or_else(|| UPDATED_EXTERNALLY.to_owned()),
            ))
        }
    }
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct StatusChange<'a> {
    status: &'a ItemStatus,
    staff_id: &'a UserId,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct Rejection<'a> {
    staff_id: &'a UserId,
    #[serde(skip_serializing_if = "Option::is_none")]
    reason: Option<&'a str>,
}

fn item_path(order: &OrderId, item: &OrderItemId, action: &str) -> String {
    format!(
        "kitchen/orders/{}/items/{}/{action}",
        segment(order.as_str()),
        segment(item.as_str())
    )
}

impl CanteenClient {
    /// Orders waiting on the kitchen.
    ///
    /// # Errors
    ///
    /// Returns an error if the API request fails.
    #[instrument(skip(self, session))]
    pub async fn kitchen_orders(&self, session: &ApiSession) -> Result<Vec<Order>, ApiError> {
        let request = self.request(Method::GET, "kitchen/orders", Some(session))?;
        let envelope: OrdersEnvelope = self.execute(request).await?;
        Ok(envelope.orders)
    }

    /// Move an item to `preparing` or `ready`.
    ///
    /// # Errors
    ///
    /// Returns [`ApiError::Conflict`] when the order changed underneath.
    #[instrument(skip(self, session), fields(order_id = %order, item_id = %item, status = %status))]
    pub async fn set_item_status(
        &self,
        session: &ApiSession,
        order: &OrderId,
        item: &OrderItemId,
        status: &ItemStatus,
        staff_id: &UserId,
    ) -> Result<(), ApiError> {
        let request = self
            .request(Method::PUT, &item_path(order, item, "status"), Some(session))?
            .json(&StatusChange { status, staff_id });
        let ack: Ack = self.execute(request).await?;
        ack.into_result()
    }

    /// Refuse to prepare an item.
    ///
    /// # Errors
    ///
    /// Returns [`ApiError::Conflict`] when the order changed underneath.
    #[instrument(skip(self, session), fields(order_id = %order, item_id = %item))]
    pub async fn reject_item(
        &self,
        session: &ApiSession,
        order: &OrderId,
        item: &OrderItemId,
        staff_id: &UserId,
        reason: Option<&str>,
    ) -> Result<(), ApiError> {
        let request = self
            .request(Method::POST, &item_path(order, item, "reject"), Some(session))?
            .json(&Rejection { staff_id, reason });
        let ack: Ack = self.execute(request).await?;
        ack.into_result()
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_ack_failure_is_conflict() {
        let ack: Ack = serde_json::from_str(r#"{"success":false}"#).unwrap();
        match ack.into_result() {
            Err(ApiError::Conflict(message)) => assert_eq!(message, UPDATED_EXTERNALLY),
            other => panic!("expected conflict, got {other:?}"),
        }

        let ack: Ack = serde_json::from_str(r#"{"success":false,"message":"Item already ready"}"#).unwrap();
        assert!(matches!(ack.into_result(), Err(ApiError::Conflict(m)) if m == "Item already ready"));
    }

    #[test]
    fn test_ack_without_flag_is_success() {
        let ack: Ack = serde_json::from_str(r#"{"order":{}}"#).unwrap();
        assert!(ack.into_result().is_ok());
    }

    #[test]
    fn test_item_path() {
        assert_eq!(
            item_path(&OrderId::new("o1"), &OrderItemId::new("i1"), "reject"),
            "kitchen/orders/o1/items/i1/reject"
        );
    }
}
