//! Menu and product detail route handlers.

use std::collections::HashSet;

use askama::Template;
use askama_web::WebTemplate;
use axum::{
    Form,
    extract::{Path, Query, State},
    response::{IntoResponse, Response},
};
use canteen_core::{CATEGORIES, CUISINES, ProductId};
use serde::Deserialize;
use tower_sessions::Session;
use tracing::{instrument, warn};

use crate::api::{ApiSession, MenuCategories, ProductFilter};
use crate::error::{Result, add_breadcrumb};
use crate::filters;
use crate::middleware::OptionalAuth;
use crate::models::Flash;
use crate::routes::page::{Page, ProductCard, local_path, redirect_with, redirect_with_error};
use crate::routes::reviews::ReviewView;
use crate::state::AppState;

/// Menu filter query. `all` or an empty value means no filter.
#[derive(Debug, Default, Deserialize)]
pub struct MenuQuery {
    pub search: Option<String>,
    pub cuisine: Option<String>,
    pub category: Option<String>,
}

impl MenuQuery {
    /// The API filter for this query.
    #[must_use]
    pub fn filter(&self) -> ProductFilter {
        let pick = |value: &Option<String>| {
            value
                .as_deref()
                .map(str::trim)
                .filter(|v| !v.is_empty() && !v.eq_ignore_ascii_case("all"))
                .map(str::to_owned)
        };
        ProductFilter {
            search: pick(&self.search),
            cuisine: pick(&self.cuisine),
            category: pick(&self.category),
        }
    }
}

/// Menu page template.
#[derive(Template, WebTemplate)]
#[template(path = "menu.html")]
pub struct MenuTemplate {
    pub page: Page,
    pub products: Vec<ProductCard>,
    pub cuisines: Vec<String>,
    pub categories: Vec<String>,
    pub search: String,
    pub cuisine: String,
    pub category: String,
    pub error: Option<String>,
}

/// Product detail page template.
#[derive(Template, WebTemplate)]
#[template(path = "products/show.html")]
pub struct ProductShowTemplate {
    pub page: Page,
    pub product: ProductCard,
    pub reviews: Vec<ReviewView>,
}

/// Favorite toggle form data.
#[derive(Debug, Deserialize)]
pub struct FavoriteForm {
    /// Whether the product is currently a favorite.
    #[serde(default)]
    pub favorite: bool,
    pub return_to: Option<String>,
}

/// Favorites of the signed-in shopper, for the heart icons.
///
/// Empty for anonymous visitors and kitchen staff, or when the call fails.
async fn favorite_ids(state: &AppState, auth: &OptionalAuth) -> HashSet<String> {
    let Some(auth) = auth.0.as_ref().filter(|a| a.user.can_shop()) else {
        return HashSet::new();
    };
    match state.api().favorites(&auth.api).await {
        Ok(products) => products.into_iter().map(|p| p.id.to_string()).collect(),
        Err(e) => {
            warn!(error = %e, "Failed to load favorites");
            HashSet::new()
        }
    }
}

/// Cuisines and categories for the filter bar, falling back to the
/// built-in lists.
async fn menu_vocabulary(state: &AppState) -> MenuCategories {
    let fetched = state.api().menu_categories().await.unwrap_or_else(|e| {
        warn!(error = %e, "Failed to load menu categories");
        MenuCategories::default()
    });
    let or_default = |values: Vec<String>, default: &[&str]| {
        if values.is_empty() {
            default.iter().map(|v| (*v).to_owned()).collect()
        } else {
            values
        }
    };
    MenuCategories {
        cuisines: or_default(fetched.cuisines, CUISINES),
        categories: or_default(fetched.categories, CATEGORIES),
    }
}

/// Display the menu.
#[instrument(skip(state, page, auth))]
pub async fn index(
    State(state): State<AppState>,
    page: Page,
    auth: OptionalAuth,
    Query(query): Query<MenuQuery>,
) -> impl IntoResponse {
    let filter = query.filter();
    let (products, vocabulary, favorites) = tokio::join!(
        state.api().products(&filter),
        menu_vocabulary(&state),
        favorite_ids(&state, &auth),
    );

    let (products, error) = match products {
        Ok(products) => (
            products
                .iter()
                .map(|p| {
                    ProductCard::new(p, &state.config().api, favorites.contains(p.id.as_str()))
                })
                .collect(),
            None,
        ),
        Err(e) => {
            warn!(error = %e, "Failed to load products");
            (Vec::new(), Some("Failed to load products".to_owned()))
        }
    };

    MenuTemplate {
        page,
        products,
        cuisines: vocabulary.cuisines,
        categories: vocabulary.categories,
        search: filter.search.unwrap_or_default(),
        cuisine: filter.cuisine.unwrap_or_else(|| "all".to_owned()),
        category: filter.category.unwrap_or_else(|| "all".to_owned()),
        error,
    }
}

/// Display a product with its reviews.
///
/// # Errors
///
/// Returns a 404 page when the product does not exist.
#[instrument(skip(state, page, auth), fields(product_id = %id))]
pub async fn show(
    State(state): State<AppState>,
    page: Page,
    auth: OptionalAuth,
    Path(id): Path<String>,
) -> Result<Response> {
    let id = ProductId::new(id);
    let (product, reviews, favorites) = tokio::join!(
        state.api().product(&id),
        state.api().product_reviews(&id),
        favorite_ids(&state, &auth),
    );
    let product = product?;

    let reviews = reviews.unwrap_or_else(|e| {
        warn!(error = %e, "Failed to load reviews");
        Vec::new()
    });
    let viewer = auth.0.as_ref().map(|a| &a.user);
    let reviews = reviews
        .iter()
        .map(|r| ReviewView::new(r, viewer))
        .collect();

    add_breadcrumb("product", "Viewed product", Some(&[("product_id", id.as_str())]));

    Ok(ProductShowTemplate {
        page,
        product: ProductCard::new(&product, &state.config().api, favorites.contains(id.as_str())),
        reviews,
    }
    .into_response())
}

/// Add or remove a favorite.
///
/// Anonymous visitors are sent to the login page.
#[instrument(skip(state, session, auth, form), fields(product_id = %id))]
pub async fn toggle_favorite(
    State(state): State<AppState>,
    session: Session,
    auth: OptionalAuth,
    Path(id): Path<String>,
    Form(form): Form<FavoriteForm>,
) -> Response {
    let back = local_path(form.return_to.as_deref(), &format!("/products/{id}"));
    let Some(auth) = auth.0 else {
        return redirect_with(
            &session,
            "/auth/login",
            Flash::warning("Please login to add favorites"),
        )
        .await;
    };

    let id = ProductId::new(id);
    match set_favorite(&state, &auth.api, &id, !form.favorite).await {
        Ok(message) => redirect_with(&session, &back, Flash::success(message)).await,
        Err(e) => redirect_with_error(&session, &back, &e).await,
    }
}

async fn set_favorite(
    state: &AppState,
    api: &ApiSession,
    id: &ProductId,
    favorite: bool,
) -> std::result::Result<&'static str, crate::api::ApiError> {
    if favorite {
        state.api().add_favorite(api, id).await?;
        Ok("Added to favorites")
    } else {
        state.api().remove_favorite(api, id).await?;
        Ok("Removed from favorites")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_all_means_no_filter() {
        let query = MenuQuery {
            search: Some("  ".into()),
            cuisine: Some("all".into()),
            category: Some("Breakfast".into()),
        };
        let filter = query.filter();
        assert_eq!(filter.search, None);
        assert_eq!(filter.cuisine, None);
        assert_eq!(filter.category.as_deref(), Some("Breakfast"));
    }

    #[test]
    fn test_search_is_trimmed() {
        let query = MenuQuery {
            search: Some(" dosa ".into()),
            ..MenuQuery::default()
        };
        assert_eq!(query.filter().search.as_deref(), Some("dosa"));
    }
}
