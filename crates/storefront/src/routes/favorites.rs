//! Favorites route handlers.

use askama::Template;
use askama_web::WebTemplate;
use axum::{
    extract::{Path, State},
    response::{IntoResponse, Response},
};
use canteen_core::ProductId;
use tower_sessions::Session;
use tracing::{instrument, warn};

use crate::filters;
use crate::middleware::RequireAuth;
use crate::models::Flash;
use crate::routes::page::{Page, ProductCard, redirect_with, redirect_with_error};
use crate::state::AppState;

/// Favorites page template.
#[derive(Template, WebTemplate)]
#[template(path = "favorites.html")]
pub struct FavoritesTemplate {
    pub page: Page,
    pub products: Vec<ProductCard>,
    pub error: Option<String>,
}

/// Display the signed-in user's favorites.
#[instrument(skip(state, page, auth))]
pub async fn index(
    State(state): State<AppState>,
    page: Page,
    RequireAuth(auth): RequireAuth,
) -> Response {
    match state.api().favorites(&auth.api).await {
        Ok(products) => FavoritesTemplate {
            page,
            products: products
                .iter()
                .map(|p| ProductCard::new(p, &state.config().api, true))
                .collect(),
            error: None,
        }
        .into_response(),
        Err(e) if e.is_unauthorized() => crate::error::AppError::from(e).into_response(),
        Err(e) => {
            warn!(error = %e, "Failed to load favorites");
            FavoritesTemplate {
                page,
                products: Vec::new(),
                error: Some("Failed to load favorites".to_owned()),
            }
            .into_response()
        }
    }
}

/// Remove a product from favorites.
#[instrument(skip(state, session, auth), fields(product_id = %id))]
pub async fn remove(
    State(state): State<AppState>,
    session: Session,
    RequireAuth(auth): RequireAuth,
    Path(id): Path<String>,
) -> Response {
    match state
        .api()
        .remove_favorite(&auth.api, &ProductId::new(id))
        .await
    {
        Ok(()) => redirect_with(&session, "/favorites", Flash::success("Removed from favorites")).await,
        Err(e) => redirect_with_error(&session, "/favorites", &e).await,
    }
}
