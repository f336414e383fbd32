//! Home page route handler.

use askama::Template;
use askama_web::WebTemplate;
use axum::{extract::State, response::IntoResponse};
use tracing::{instrument, warn};

use crate::api::ProductFilter;
use crate::filters;
use crate::routes::page::{Page, ProductCard};
use crate::state::AppState;

/// Number of products featured on the home page.
const FEATURED_COUNT: usize = 4;

/// A selling point shown under the hero.
pub struct Feature {
    pub title: &'static str,
    pub body: &'static str,
}

const FEATURES: [Feature; 3] = [
    Feature {
        title: "Fresh every day",
        body: "Meals cooked in our kitchen each morning from local produce.",
    },
    Feature {
        title: "Skip the queue",
        body: "Order ahead and pick up when the kitchen says it's ready.",
    },
    Feature {
        title: "Live updates",
        body: "Follow every item from the pan to the pickup counter.",
    },
];

/// Home page template.
#[derive(Template, WebTemplate)]
#[template(path = "home.html")]
pub struct HomeTemplate {
    pub page: Page,
    pub features: &'static [Feature],
    pub featured: Vec<ProductCard>,
}

/// Display the home page.
///
/// Best sellers are featured when the menu loads; a failure just leaves the
/// section out.
#[instrument(skip(state, page))]
pub async fn home(State(state): State<AppState>, page: Page) -> impl IntoResponse {
    let featured = match state.api().products(&ProductFilter::default()).await {
        Ok(products) => {
            let mut picks: Vec<_> = products
                .iter()
                .filter(|p| p.dietary_info.is_best_seller && p.is_available())
                .collect();
            if picks.is_empty() {
                picks = products.iter().filter(|p| p.is_available()).collect();
            }
            picks
                .into_iter()
                .take(FEATURED_COUNT)
                .map(|p| ProductCard::new(p, &state.config().api, false))
                .collect()
        }
        Err(e) => {
            warn!(error = %e, "Failed to load featured products");
            Vec::new()
        }
    };

    HomeTemplate {
        page,
        features: &FEATURES,
        featured,
    }
}
