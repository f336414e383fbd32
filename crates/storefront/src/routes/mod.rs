//! HTTP route handlers for the storefront.
//!
//! # Route Structure
//!
//! ```text
//! GET  /                                  - Home page
//! GET  /health                            - Liveness check
//! GET  /health/ready                      - Readiness check (pings the API)
//!
//! # Menu
//! GET  /menu                              - Menu with search and filters
//! GET  /products/{id}                     - Product detail with reviews
//! POST /products/{id}/favorite            - Toggle favorite
//! POST /products/{id}/reviews             - Submit a review (rate limited)
//! POST /reviews/{id}/delete               - Delete own review
//! POST /reviews/{id}/like                 - Toggle like (JSON for fetch callers)
//!
//! # Cart and orders (user, admin)
//! GET  /cart                              - Cart page
//! GET  /cart/count                        - Cart count badge (fragment)
//! POST /cart/add                          - Add to cart
//! POST /cart/items/{id}/quantity          - Step quantity up or down
//! POST /cart/items/{id}/remove            - Remove a line
//! POST /cart/clear                        - Empty the cart
//! POST /cart/checkout                     - Place and pay
//! GET  /orders                            - Order history
//! POST /orders/{id}/cancel                - Cancel selected items
//! GET  /favorites                         - Favorite products
//! POST /favorites/{id}/remove             - Remove a favorite
//!
//! # Profile (any signed-in user)
//! GET  /profile                           - Profile and stats
//! POST /profile                           - Change name
//! POST /profile/addresses                 - Add address
//! POST /profile/addresses/{id}            - Replace address
//! POST /profile/addresses/{id}/delete     - Delete address
//!
//! # Auth
//! GET  /auth/login                        - Login page
//! POST /auth/login                        - Login action (rate limited)
//! GET  /auth/register                     - Register page
//! POST /auth/register                     - Register action (rate limited)
//! POST /auth/logout                       - Logout action
//! GET  /auth/expired                      - Upstream session lapsed
//!
//! # Notifications (any signed-in user)
//! GET  /notifications/stream              - Server-sent toast stream
//! GET  /notifications                     - Live toasts (JSON)
//! POST /notifications/{id}/dismiss        - Dismiss one toast
//! POST /notifications/clear               - Dismiss all toasts
//!
//! # Kitchen
//! GET  /kitchen                           - Kitchen queue
//! POST /kitchen/orders/{o}/items/{i}/status - Mark preparing or ready
//! POST /kitchen/orders/{o}/items/{i}/reject - Reject an item
//!
//! # Admin
//! /admin/**                               - See [`admin::routes`]
//! ```

pub mod admin;
pub mod auth;
pub mod cart;
pub mod errors;
pub mod favorites;
pub mod home;
pub mod kitchen;
pub mod notifications;
pub mod orders;
pub mod page;
pub mod products;
pub mod profile;
pub mod reviews;

use axum::{
    Router,
    extract::State,
    handler::Handler,
    http::StatusCode,
    middleware::{from_fn, from_fn_with_state},
    routing::{get, post},
};
use tower_http::{services::ServeDir, trace::TraceLayer};
use tracing::warn;

use crate::middleware::{
    access_gate, api_rate_limiter, auth_rate_limiter, create_session_layer, request_id_middleware,
    request_span, security_headers_middleware,
};
use crate::state::AppState;

/// Static assets shipped with the crate.
const STATIC_DIR: &str = concat!(env!("CARGO_MANIFEST_DIR"), "/static");

/// Create the auth routes router.
pub fn auth_routes() -> Router<AppState> {
    Router::new()
        .route(
            "/login",
            get(auth::login_page).post(auth::login.layer(auth_rate_limiter())),
        )
        .route(
            "/register",
            get(auth::register_page).post(auth::register.layer(auth_rate_limiter())),
        )
        .route("/logout", post(auth::logout))
        .route("/expired", get(auth::expired))
}

/// Create the product and review routes router.
pub fn product_routes() -> Router<AppState> {
    Router::new()
        .route("/menu", get(products::index))
        .route("/products/{id}", get(products::show))
        .route("/products/{id}/favorite", post(products::toggle_favorite))
        .route(
            "/products/{id}/reviews",
            post(reviews::create.layer(api_rate_limiter())),
        )
        .route("/reviews/{id}/delete", post(reviews::delete))
        .route("/reviews/{id}/like", post(reviews::like.layer(api_rate_limiter())))
}

/// Create the cart routes router.
pub fn cart_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(cart::show))
        .route("/count", get(cart::count))
        .route("/add", post(cart::add))
        .route("/items/{id}/quantity", post(cart::step))
        .route("/items/{id}/remove", post(cart::remove))
        .route("/clear", post(cart::clear))
        .route("/checkout", post(cart::checkout))
}

/// Create the profile routes router.
pub fn profile_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(profile::show).post(profile::update))
        .route("/addresses", post(profile::add_address))
        .route("/addresses/{id}", post(profile::update_address))
        .route("/addresses/{id}/delete", post(profile::delete_address))
}

/// Create the notification routes router.
pub fn notification_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(notifications::index))
        .route("/stream", get(notifications::stream))
        .route("/{id}/dismiss", post(notifications::dismiss))
        .route("/clear", post(notifications::clear))
}

/// Create the kitchen routes router.
pub fn kitchen_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(kitchen::index))
        .route(
            "/orders/{order_id}/items/{item_id}/status",
            post(kitchen::set_status),
        )
        .route(
            "/orders/{order_id}/items/{item_id}/reject",
            post(kitchen::reject),
        )
}

/// Create all routes for the storefront.
pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/", get(home::home))
        .merge(product_routes())
        .nest("/cart", cart_routes())
        .route("/orders", get(orders::index))
        .route("/orders/{id}/cancel", post(orders::cancel))
        .route("/favorites", get(favorites::index))
        .route("/favorites/{id}/remove", post(favorites::remove))
        .nest("/profile", profile_routes())
        .nest("/auth", auth_routes())
        .nest("/notifications", notification_routes())
        .nest("/kitchen", kitchen_routes())
        .nest("/admin", admin::routes())
}

/// The complete application: routes, health checks, static files and the
/// middleware stack.
///
/// Layers run outermost first: Sentry, tracing, request id, security
/// headers, session, error pages, then the role gate. Unknown paths get
/// the 404 page.
pub fn app(state: AppState) -> Router {
    let session_layer = create_session_layer(state.config());

    Router::new()
        .route("/health", get(health))
        .route("/health/ready", get(readiness))
        .merge(routes())
        .nest_service("/static", ServeDir::new(STATIC_DIR))
        .fallback(errors::not_found)
        .layer(from_fn_with_state(state.clone(), access_gate))
        .layer(from_fn_with_state(state.clone(), errors::render_error_pages))
        .layer(session_layer)
        .layer(from_fn_with_state(state.clone(), security_headers_middleware))
        .layer(from_fn(request_id_middleware))
        .layer(TraceLayer::new_for_http().make_span_with(request_span))
        .with_state(state)
        // Sentry layers (outermost for full request coverage)
        .layer(sentry_tower::NewSentryLayer::new_from_top())
        .layer(sentry_tower::SentryHttpLayer::new().enable_transaction())
}

/// Liveness health check endpoint.
///
/// Returns "ok" if the server is running. Does not check dependencies.
async fn health() -> &'static str {
    "ok"
}

/// Readiness health check endpoint.
///
/// Returns 503 Service Unavailable if the Canteen API is not reachable.
async fn readiness(State(state): State<AppState>) -> StatusCode {
    match state.api().ping().await {
        Ok(()) => StatusCode::OK,
        Err(e) => {
            warn!(error = %e, "Canteen API not reachable");
            StatusCode::SERVICE_UNAVAILABLE
        }
    }
}
