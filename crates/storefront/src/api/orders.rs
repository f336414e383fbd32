//! Customer orders and payment confirmation.

use canteen_core::{OrderId, OrderItemId};
use reqwest::Method;
use serde::{Deserialize, Serialize};
use tracing::instrument;

use super::types::{Order, PaymentConfirmation, PlaceOrder};
use super::{ApiError, ApiSession, CanteenClient, segment};

#[derive(Deserialize)]
pub(super) struct OrdersEnvelope {
    #[serde(default)]
    pub orders: Vec<Order>,
}

#[derive(Deserialize)]
pub(super) struct OrderEnvelope {
    pub order: Order,
}

#[derive(Serialize)]
struct Cancellation<'a> {
    items: &'a [OrderItemId],
    reason: &'a str,
}

impl CanteenClient {
    /// The signed-in customer's orders.
    ///
    /// # Errors
    ///
    /// Returns an error if the API request fails.
    #[instrument(skip(self, session))]
    pub async fn orders(&self, session: &ApiSession) -> Result<Vec<Order>, ApiError> {
        let request = self.request(Method::GET, "orders", Some(session))?;
        let envelope: OrdersEnvelope = self.execute(request).await?;
        Ok(envelope.orders)
    }

    /// # Errors
    ///
    /// Returns [`ApiError::NotFound`] for unknown ids.
    #[instrument(skip(self, session), fields(order_id = %id))]
    pub async fn order(&self, session: &ApiSession, id: &OrderId) -> Result<Order, ApiError> {
        let path = format!("orders/{}", segment(id.as_str()));
        let request = self.request(Method::GET, &path, Some(session))?;
        let envelope: OrderEnvelope = self.execute(request).await?;
        Ok(envelope.order)
    }

    /// Place an order.
    ///
    /// # Errors
    ///
    /// Returns an error if the API refuses the order.
    #[instrument(skip(self, session, order), fields(total = %order.total_amount))]
    pub async fn place_order(
        &self,
        session: &ApiSession,
        order: &PlaceOrder<'_>,
    ) -> Result<Order, ApiError> {
        let request = self
            .request(Method::POST, "orders/place", Some(session))?
            .json(order);
        let envelope: OrderEnvelope = self.execute(request).await?;
        Ok(envelope.order)
    }

    /// Cancel selected items of an order.
    ///
    /// # Errors
    ///
    /// Returns an error if the API refuses the cancellation.
    #[instrument(skip(self, session, items, reason), fields(order_id = %id, items = items.len()))]
    pub async fn cancel_order(
        &self,
        session: &ApiSession,
        id: &OrderId,
        items: &[OrderItemId],
        reason: &str,
    ) -> Result<(), ApiError> {
        let path = format!("orders/{}/cancel", segment(id.as_str()));
        let request = self
            .request(Method::POST, &path, Some(session))?
            .json(&Cancellation { items, reason });
        self.execute_unit(request).await
    }

    /// Record the payment outcome for an order.
    ///
    /// # Errors
    ///
    /// Returns an error if the API request fails.
    #[instrument(skip(self, session, payment), fields(order_id = %payment.order_id))]
    pub async fn confirm_payment(
        &self,
        session: &ApiSession,
        payment: &PaymentConfirmation,
    ) -> Result<(), ApiError> {
        let request = self
            .request(Method::POST, "orders/payments/confirm", Some(session))?
            .json(payment);
        self.execute_unit(request).await
    }
}
