//! Product reviews.

use canteen_core::{ProductId, ReviewId, UserId};
use reqwest::Method;
use serde::Deserialize;
use tracing::instrument;

use super::types::{NewReview, Review};
use super::{ApiError, ApiSession, CanteenClient, segment};

#[derive(Deserialize)]
struct ReviewsEnvelope {
    #[serde(default)]
    reviews: Vec<Review>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct ReviewCount {
    #[serde(default)]
    review_count: u64,
}

impl CanteenClient {
    /// Reviews of a product, as the API orders them.
    ///
    /// # Errors
    ///
    /// Returns an error if the API request fails.
    #[instrument(skip(self), fields(product_id = %product_id))]
    pub async fn product_reviews(&self, product_id: &ProductId) -> Result<Vec<Review>, ApiError> {
        let path = format!("reviews/product/{}", segment(product_id.as_str()));
        let request = self.request(Method::GET, &path, None)?;
        let envelope: ReviewsEnvelope = self.execute(request).await?;
        Ok(envelope.reviews)
    }

    /// # Errors
    ///
    /// Returns [`ApiError::Conflict`] when the user already reviewed the
    /// product.
    #[instrument(skip(self, session, review), fields(product_id = %review.product_id))]
    pub async fn create_review(
        &self,
        session: &ApiSession,
        review: &NewReview<'_>,
    ) -> Result<(), ApiError> {
        let request = self
            .request(Method::POST, "reviews", Some(session))?
            .json(review);
        self.execute_unit(request).await
    }

    /// # Errors
    ///
    /// Returns an error if the API request fails.
    #[instrument(skip(self, session), fields(review_id = %id))]
    pub async fn delete_review(&self, session: &ApiSession, id: &ReviewId) -> Result<(), ApiError> {
        let path = format!("reviews/{}", segment(id.as_str()));
        let request = self.request(Method::DELETE, &path, Some(session))?;
        self.execute_unit(request).await
    }

    /// Toggle the signed-in user's like on a review.
    ///
    /// # Errors
    ///
    /// Returns an error if the API request fails.
    #[instrument(skip(self, session), fields(review_id = %id))]
    pub async fn like_review(&self, session: &ApiSession, id: &ReviewId) -> Result<(), ApiError> {
        let path = format!("reviews/{}/like", segment(id.as_str()));
        let request = self.request(Method::POST, &path, Some(session))?;
        self.execute_unit(request).await
    }

    /// Number of reviews a user has written.
    ///
    /// # Errors
    ///
    /// Returns an error if the API request fails.
    #[instrument(skip(self, session), fields(user_id = %user_id))]
    pub async fn review_count(&self, session: &ApiSession, user_id: &UserId) -> Result<u64, ApiError> {
        let path = format!("reviews/user/{}/count", segment(user_id.as_str()));
        let request = self.request(Method::GET, &path, Some(session))?;
        let count: ReviewCount = self.execute(request).await?;
        Ok(count.review_count)
    }
}
