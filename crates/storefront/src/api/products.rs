//! Catalogue endpoints and admin product maintenance.

use canteen_core::ProductId;
use reqwest::Method;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use tracing::{debug, instrument};

use super::cache::{CacheKey, CacheValue};
use super::types::{MenuCategories, Product, ProductFilter, ProductInput};
use super::{ApiError, ApiSession, CanteenClient, segment};

#[derive(Deserialize)]
struct ProductsEnvelope {
    #[serde(default)]
    products: Vec<Product>,
}

#[derive(Deserialize)]
struct ProductEnvelope {
    product: Product,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct AvailabilityUpdate {
    is_available: bool,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct DiscountUpdate {
    #[serde(with = "rust_decimal::serde::float_option")]
    discount_price: Option<Decimal>,
}

impl CanteenClient {
    /// List menu products matching a filter.
    ///
    /// # Errors
    ///
    /// Returns an error if the API request fails.
    #[instrument(skip(self))]
    pub async fn products(&self, filter: &ProductFilter) -> Result<Vec<Product>, ApiError> {
        let cache_key = CacheKey::Products(filter.clone());
        if let Some(CacheValue::Products(products)) = self.inner.cache.get(&cache_key).await {
            debug!("Cache hit for products");
            return Ok(products);
        }

        let request = self
            .request(Method::GET, "products", None)?
            .query(filter);
        let envelope: ProductsEnvelope = self.execute(request).await?;

        self.inner
            .cache
            .insert(cache_key, CacheValue::Products(envelope.products.clone()))
            .await;

        Ok(envelope.products)
    }

    /// Get a single product.
    ///
    /// # Errors
    ///
    /// Returns [`ApiError::NotFound`] for unknown ids.
    #[instrument(skip(self), fields(product_id = %id))]
    pub async fn product(&self, id: &ProductId) -> Result<Product, ApiError> {
        let request = self.request(Method::GET, &format!("products/{}", segment(id.as_str())), None)?;
        let envelope: ProductEnvelope = self.execute(request).await?;
        Ok(envelope.product)
    }

    /// Cuisines and categories offered as menu filters.
    ///
    /// # Errors
    ///
    /// Returns an error if the API request fails.
    #[instrument(skip(self))]
    pub async fn menu_categories(&self) -> Result<MenuCategories, ApiError> {
        if let Some(CacheValue::Categories(categories)) =
            self.inner.cache.get(&CacheKey::Categories).await
        {
            debug!("Cache hit for categories");
            return Ok(categories);
        }

        let request = self.request(Method::GET, "products/categories", None)?;
        let categories: MenuCategories = self.execute(request).await?;

        self.inner
            .cache
            .insert(CacheKey::Categories, CacheValue::Categories(categories.clone()))
            .await;

        Ok(categories)
    }

    /// Add a product to the menu.
    ///
    /// # Errors
    ///
    /// Returns an error if the API refuses the product.
    #[instrument(skip(self, session, input), fields(name = %input.name))]
    pub async fn create_product(
        &self,
        session: &ApiSession,
        input: &ProductInput,
    ) -> Result<Product, ApiError> {
        let request = self
            .request(Method::POST, "admin/products", Some(session))?
            .json(input);
        let envelope: ProductEnvelope = self.execute(request).await?;
        self.invalidate_catalogue();
        Ok(envelope.product)
    }

    /// Replace a product.
    ///
    /// # Errors
    ///
    /// Returns an error if the API refuses the update.
    #[instrument(skip(self, session, input), fields(product_id = %id))]
    pub async fn update_product(
        &self,
        session: &ApiSession,
        id: &ProductId,
        input: &ProductInput,
    ) -> Result<Product, ApiError> {
        let path = format!("admin/products/{}", segment(id.as_str()));
        let request = self.request(Method::PUT, &path, Some(session))?.json(input);
        let envelope: ProductEnvelope = self.execute(request).await?;
        self.invalidate_catalogue();
        Ok(envelope.product)
    }

    /// Mark a product as orderable or not.
    ///
    /// # Errors
    ///
    /// Returns an error if the API request fails.
    #[instrument(skip(self, session), fields(product_id = %id))]
    pub async fn set_availability(
        &self,
        session: &ApiSession,
        id: &ProductId,
        is_available: bool,
    ) -> Result<(), ApiError> {
        let path = format!("admin/products/{}/availability", segment(id.as_str()));
        let request = self
            .request(Method::PUT, &path, Some(session))?
            .json(&AvailabilityUpdate { is_available });
        self.execute_unit(request).await?;
        self.invalidate_catalogue();
        Ok(())
    }

    /// Set or clear (`None`) a product's discount price.
    ///
    /// # Errors
    ///
    /// Returns an error if the API request fails.
    #[instrument(skip(self, session), fields(product_id = %id))]
    pub async fn set_discount(
        &self,
        session: &ApiSession,
        id: &ProductId,
        discount_price: Option<Decimal>,
    ) -> Result<(), ApiError> {
        let path = format!("admin/products/{}/discount", segment(id.as_str()));
        let request = self
            .request(Method::PUT, &path, Some(session))?
            .json(&DiscountUpdate { discount_price });
        self.execute_unit(request).await?;
        self.invalidate_catalogue();
        Ok(())
    }

    /// Remove a product from the menu.
    ///
    /// # Errors
    ///
    /// Returns an error if the API request fails.
    #[instrument(skip(self, session), fields(product_id = %id))]
    pub async fn delete_product(&self, session: &ApiSession, id: &ProductId) -> Result<(), ApiError> {
        let path = format!("admin/products/{}", segment(id.as_str()));
        let request = self.request(Method::DELETE, &path, Some(session))?;
        self.execute_unit(request).await?;
        self.invalidate_catalogue();
        Ok(())
    }
}
