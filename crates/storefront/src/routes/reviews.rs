//! Product review route handlers.
//!
//! Reviews are shown on the product page. Likes are toggled optimistically
//! by the browser, which then adopts the state returned here.

use axum::{
    Form, Json,
    extract::{Path, State},
    http::{HeaderMap, StatusCode},
    response::{IntoResponse, Response},
};
use canteen_core::{ProductId, ReviewId, validation};
use serde::{Deserialize, Serialize};
use tower_sessions::Session;
use tracing::{instrument, warn};

use crate::api::{NewReview, Review};
use crate::error::add_breadcrumb;
use crate::middleware::OptionalAuth;
use crate::middleware::auth::{LOGIN_PATH, wants_json};
use crate::models::{CurrentUser, Flash};
use crate::routes::page::{local_path, redirect_with, redirect_with_error, timestamp};
use crate::state::AppState;

/// A review as shown under a product.
#[derive(Clone)]
pub struct ReviewView {
    pub id: String,
    pub author: String,
    pub rating: u8,
    pub comment: String,
    pub likes: usize,
    /// The viewer has liked this review.
    pub liked: bool,
    /// The viewer wrote this review.
    pub own: bool,
    pub created: String,
}

impl ReviewView {
    #[must_use]
    pub fn new(review: &Review, viewer: Option<&CurrentUser>) -> Self {
        Self {
            id: review.id.to_string(),
            author: review.author_name().to_owned(),
            rating: review.rating,
            comment: review.comment.clone(),
            likes: review.likes.len(),
            liked: viewer.is_some_and(|u| review.is_liked_by(&u.id)),
            own: viewer.is_some_and(|u| review.author_id() == Some(u.id.as_str())),
            created: timestamp(review.created_at),
        }
    }

    /// Filled and empty stars, e.g. `★★★★☆`.
    #[must_use]
    pub fn stars(&self) -> String {
        let filled = usize::from(self.rating.min(5));
        format!("{}{}", "★".repeat(filled), "☆".repeat(5 - filled))
    }
}

/// Review form data.
#[derive(Debug, Deserialize)]
pub struct ReviewForm {
    pub rating: u8,
    pub comment: String,
}

/// Hidden product id carried by review buttons.
#[derive(Debug, Deserialize)]
pub struct ReviewActionForm {
    pub product_id: String,
}

/// Like state returned to the browser after a toggle.
#[derive(Debug, Serialize, PartialEq, Eq)]
pub struct LikeState {
    pub liked: bool,
    pub count: usize,
}

fn product_path(id: &str) -> String {
    local_path(Some(&format!("/products/{id}")), "/menu")
}

/// Submit a review.
#[instrument(skip(state, session, auth, form), fields(product_id = %id))]
pub async fn create(
    State(state): State<AppState>,
    session: Session,
    auth: OptionalAuth,
    Path(id): Path<String>,
    Form(form): Form<ReviewForm>,
) -> Response {
    let back = product_path(&id);
    let Some(auth) = auth.0 else {
        return redirect_with(
            &session,
            LOGIN_PATH,
            Flash::warning("Please login to submit a review"),
        )
        .await;
    };

    let comment = match validation::review(form.rating, &form.comment) {
        Ok(comment) => comment,
        Err(validation::ValidationError::Required(_)) => {
            return redirect_with(
                &session,
                &back,
                Flash::error("Please write a comment for your review"),
            )
            .await;
        }
        Err(e) => return redirect_with(&session, &back, Flash::error(e.to_string())).await,
    };

    let product_id = ProductId::new(id);
    let review = NewReview {
        product_id: &product_id,
        rating: form.rating,
        comment,
    };

    match state.api().create_review(&auth.api, &review).await {
        Ok(()) => {
            add_breadcrumb(
                "review",
                "Submitted review",
                Some(&[("product_id", product_id.as_str())]),
            );
            redirect_with(&session, &back, Flash::success("Review submitted successfully!")).await
        }
        Err(e) if e.is_conflict() => {
            redirect_with(
                &session,
                &back,
                Flash::error("You have already reviewed this product"),
            )
            .await
        }
        Err(e) if e.is_unauthorized() => redirect_with_error(&session, &back, &e).await,
        Err(e) => {
            warn!(error = %e, "Failed to submit review");
            redirect_with(&session, &back, Flash::error("Failed to submit review")).await
        }
    }
}

/// Delete the viewer's own review.
#[instrument(skip(state, session, auth, form), fields(review_id = %id))]
pub async fn delete(
    State(state): State<AppState>,
    session: Session,
    auth: OptionalAuth,
    Path(id): Path<String>,
    Form(form): Form<ReviewActionForm>,
) -> Response {
    let back = product_path(&form.product_id);
    let Some(auth) = auth.0 else {
        return redirect_with(&session, LOGIN_PATH, Flash::warning("Please login first")).await;
    };

    match state.api().delete_review(&auth.api, &ReviewId::new(id)).await {
        Ok(()) => {
            redirect_with(&session, &back, Flash::success("Review deleted successfully")).await
        }
        Err(e) if e.is_unauthorized() => redirect_with_error(&session, &back, &e).await,
        Err(e) => {
            warn!(error = %e, "Failed to delete review");
            redirect_with(&session, &back, Flash::error("Failed to delete review")).await
        }
    }
}

/// Toggle a like.
///
/// Script-driven callers asking for JSON get the refetched like state so
/// the optimistic update can be reconciled. Plain form posts are
/// redirected back to the product.
#[instrument(skip(state, session, auth, headers, form), fields(review_id = %id))]
pub async fn like(
    State(state): State<AppState>,
    session: Session,
    auth: OptionalAuth,
    headers: HeaderMap,
    Path(id): Path<String>,
    Form(form): Form<ReviewActionForm>,
) -> Response {
    let json = wants_json("", &headers);
    let back = product_path(&form.product_id);
    let Some(auth) = auth.0 else {
        if json {
            return StatusCode::UNAUTHORIZED.into_response();
        }
        return redirect_with(
            &session,
            LOGIN_PATH,
            Flash::warning("Please login to like reviews"),
        )
        .await;
    };

    let review_id = ReviewId::new(id);
    if let Err(e) = state.api().like_review(&auth.api, &review_id).await {
        if json {
            let status = if e.is_unauthorized() {
                StatusCode::UNAUTHORIZED
            } else {
                StatusCode::BAD_GATEWAY
            };
            warn!(error = %e, "Failed to like review");
            return (status, "Failed to like review").into_response();
        }
        return redirect_with_error(&session, &back, &e).await;
    }

    if !json {
        return axum::response::Redirect::to(&back).into_response();
    }

    // Refetch so the browser adopts the server's view.
    let product_id = ProductId::new(form.product_id);
    match state.api().product_reviews(&product_id).await {
        Ok(reviews) => {
            let state = reviews
                .iter()
                .find(|r| r.id == review_id)
                .map_or(LikeState { liked: false, count: 0 }, |r| LikeState {
                    liked: r.is_liked_by(&auth.user.id),
                    count: r.likes.len(),
                });
            Json(state).into_response()
        }
        Err(e) => {
            warn!(error = %e, "Failed to refetch reviews after like");
            (StatusCode::BAD_GATEWAY, "Failed to like review").into_response()
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use canteen_core::{Role, UserId};
    use chrono::Utc;

    fn viewer(id: &str) -> CurrentUser {
        CurrentUser {
            id: UserId::new(id),
            full_name: "Ravi".into(),
            email: "ravi@example.com".into(),
            phone: None,
            role: Role::User,
            verified_at: Utc::now(),
        }
    }

    fn review() -> Review {
        serde_json::from_str(
            r#"{"_id":"r1","userId":{"_id":"u1","fullName":"Ravi"},"rating":4,
                "comment":"Crispy","likes":["u2","u3"]}"#,
        )
        .unwrap()
    }

    #[test]
    fn test_review_view_for_author() {
        let view = ReviewView::new(&review(), Some(&viewer("u1")));
        assert!(view.own);
        assert!(!view.liked);
        assert_eq!(view.likes, 2);
        assert_eq!(view.stars(), "★★★★☆");
    }

    #[test]
    fn test_review_view_for_liker_and_anonymous() {
        let liker = ReviewView::new(&review(), Some(&viewer("u2")));
        assert!(liker.liked);
        assert!(!liker.own);

        let anonymous = ReviewView::new(&review(), None);
        assert!(!anonymous.liked);
        assert!(!anonymous.own);
        assert_eq!(anonymous.author, "Ravi");
    }
}
