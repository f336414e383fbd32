//! Profile, address book and favorites.

use canteen_core::{AddressId, ProductId};
use reqwest::Method;
use serde::{Deserialize, Serialize};
use tracing::instrument;

use super::auth::UserEnvelope;
use super::types::{Address, Product, User};
use super::{ApiError, ApiSession, CanteenClient, segment};

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct ProfileUpdate<'a> {
    full_name: &'a str,
}

#[derive(Deserialize)]
struct FavoritesEnvelope {
    #[serde(default)]
    favorites: Vec<Product>,
}

impl CanteenClient {
    /// Rename the signed-in user.
    ///
    /// # Errors
    ///
    /// Returns an error if the API request fails.
    #[instrument(skip(self, session))]
    pub async fn update_profile(
        &self,
        session: &ApiSession,
        full_name: &str,
    ) -> Result<User, ApiError> {
        let request = self
            .request(Method::PUT, "user/profile", Some(session))?
            .json(&ProfileUpdate { full_name });
        let envelope: UserEnvelope = self.execute(request).await?;
        Ok(envelope.user)
    }

    /// Save a new address.
    ///
    /// # Errors
    ///
    /// Returns an error if the API request fails.
    #[instrument(skip(self, session, address))]
    pub async fn add_address(&self, session: &ApiSession, address: &Address) -> Result<(), ApiError> {
        let request = self
            .request(Method::POST, "user/addresses", Some(session))?
            .json(address);
        self.execute_unit(request).await
    }

    /// Replace a saved address.
    ///
    /// # Errors
    ///
    /// Returns an error if the API request fails.
    #[instrument(skip(self, session, address), fields(address_id = %id))]
    pub async fn update_address(
        &self,
        session: &ApiSession,
        id: &AddressId,
        address: &Address,
    ) -> Result<(), ApiError> {
        let path = format!("user/addresses/{}", segment(id.as_str()));
        let request = self.request(Method::PUT, &path, Some(session))?.json(address);
        self.execute_unit(request).await
    }

    /// Delete a saved address.
    ///
    /// # Errors
    ///
    /// Returns an error if the API request fails.
    #[instrument(skip(self, session), fields(address_id = %id))]
    pub async fn delete_address(&self, session: &ApiSession, id: &AddressId) -> Result<(), ApiError> {
        let path = format!("user/addresses/{}", segment(id.as_str()));
        let request = self.request(Method::DELETE, &path, Some(session))?;
        self.execute_unit(request).await
    }

    /// The user's favorite products.
    ///
    /// # Errors
    ///
    /// Returns an error if the API request fails.
    #[instrument(skip(self, session))]
    pub async fn favorites(&self, session: &ApiSession) -> Result<Vec<Product>, ApiError> {
        let request = self.request(Method::GET, "user/favorites", Some(session))?;
        let envelope: FavoritesEnvelope = self.execute(request).await?;
        Ok(envelope.favorites)
    }

    /// # Errors
    ///
    /// Returns an error if the API request fails.
    #[instrument(skip(self, session), fields(product_id = %id))]
    pub async fn add_favorite(&self, session: &ApiSession, id: &ProductId) -> Result<(), ApiError> {
        let path = format!("user/favorites/{}", segment(id.as_str()));
        let request = self.request(Method::POST, &path, Some(session))?;
        self.execute_unit(request).await
    }

    /// # Errors
    ///
    /// Returns an error if the API request fails.
    #[instrument(skip(self, session), fields(product_id = %id))]
    pub async fn remove_favorite(&self, session: &ApiSession, id: &ProductId) -> Result<(), ApiError> {
        let path = format!("user/favorites/{}", segment(id.as_str()));
        let request = self.request(Method::DELETE, &path, Some(session))?;
        self.execute_unit(request).await
    }
}
