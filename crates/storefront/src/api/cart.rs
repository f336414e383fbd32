//! Server-side cart.

use canteen_core::ProductId;
use reqwest::Method;
use serde::{Deserialize, Serialize};
use tracing::instrument;

use super::types::CartItem;
use super::{ApiError, ApiSession, CanteenClient, segment};

#[derive(Deserialize)]
struct CartEnvelope {
    #[serde(default)]
    cart: Option<Vec<CartItem>>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct AddItem<'a> {
    product_id: &'a ProductId,
    quantity: u32,
}

#[derive(Serialize)]
struct SetQuantity {
    quantity: u32,
}

impl CanteenClient {
    /// Current cart lines.
    ///
    /// # Errors
    ///
    /// Returns an error if the API request fails.
    #[instrument(skip(self, session))]
    pub async fn cart(&self, session: &ApiSession) -> Result<Vec<CartItem>, ApiError> {
        let request = self.request(Method::GET, "orders/cart", Some(session))?;
        let envelope: CartEnvelope = self.execute(request).await?;
        Ok(envelope.cart.unwrap_or_default())
    }

    /// Add `quantity` of a product, returning the updated cart.
    ///
    /// # Errors
    ///
    /// Returns an error if the API request fails.
    #[instrument(skip(self, session), fields(product_id = %product_id))]
    pub async fn add_to_cart(
        &self,
        session: &ApiSession,
        product_id: &ProductId,
        quantity: u32,
    ) -> Result<Vec<CartItem>, ApiError> {
        let request = self
            .request(Method::POST, "orders/cart/items", Some(session))?
            .json(&AddItem {
                product_id,
                quantity,
            });
        let envelope: CartEnvelope = self.execute(request).await?;
        Ok(envelope.cart.unwrap_or_default())
    }

    /// Set the quantity of a cart line.
    ///
    /// # Errors
    ///
    /// Returns an error if the API request fails.
    #[instrument(skip(self, session), fields(product_id = %product_id))]
    pub async fn update_cart_item(
        &self,
        session: &ApiSession,
        product_id: &ProductId,
        quantity: u32,
    ) -> Result<Vec<CartItem>, ApiError> {
        let path = format!("orders/cart/items/{}", segment(product_id.as_str()));
        let request = self
            .request(Method::PUT, &path, Some(session))?
            .json(&SetQuantity { quantity });
        let envelope: CartEnvelope = self.execute(request).await?;
        Ok(envelope.cart.unwrap_or_default())
    }

    /// Drop a cart line.
    ///
    /// # Errors
    ///
    /// Returns an error if the API request fails.
    #[instrument(skip(self, session), fields(product_id = %product_id))]
    pub async fn remove_cart_item(
        &self,
        session: &ApiSession,
        product_id: &ProductId,
    ) -> Result<(), ApiError> {
        let path = format!("orders/cart/items/{}", segment(product_id.as_str()));
        let request = self.request(Method::DELETE, &path, Some(session))?;
        self.execute_unit(request).await
    }

    /// Empty the cart.
    ///
    /// # Errors
    ///
    /// Returns an error if the API request fails.
    #[instrument(skip(self, session))]
    pub async fn clear_cart(&self, session: &ApiSession) -> Result<(), ApiError> {
        let request = self.request(Method::DELETE, "orders/cart/clear", Some(session))?;
        self.execute_unit(request).await
    }
}
