//! Integration test harness for the Canteen MS storefront.
//!
//! # Running Tests
//!
//! ```bash
//! # Router tests against the in-process fake API
//! cargo test -p canteen-integration-tests
//!
//! # Live tests against a running deployment
//! STOREFRONT_BASE_URL=http://localhost:3000 cargo test -p canteen-integration-tests -- --ignored
//! ```
//!
//! [`FakeApi`] serves a small, fixed slice of the Canteen REST API on an
//! ephemeral port so the real router, sessions and templates can be driven
//! without a backend. It records every request it receives so tests can
//! check what the storefront sent.

#![allow(clippy::unwrap_used, clippy::expect_used, clippy::missing_panics_doc)]

use std::net::SocketAddr;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

use axum::{
    Json, Router,
    body::{Body, to_bytes},
    extract::{Path, Request, State},
    http::{HeaderMap, Method, StatusCode, header},
    middleware::{Next, from_fn_with_state},
    response::{IntoResponse, Response},
    routing::{delete, get, post, put},
};
use axum_test::TestServer;
use canteen_storefront::config::{CanteenApiConfig, StorefrontConfig};
use canteen_storefront::routes;
use canteen_storefront::state::AppState;
use serde_json::{Value, json};
use tokio::net::TcpListener;
use tokio::task::JoinHandle;

/// Password accepted for every fake account.
pub const PASSWORD: &str = "secret1";

pub const CUSTOMER_EMAIL: &str = "asha@example.com";
pub const KITCHEN_EMAIL: &str = "ravi@example.com";
pub const ADMIN_EMAIL: &str = "meena@example.com";

/// Id of the kitchen user, sent as `staffId`.
pub const KITCHEN_STAFF_ID: &str = "u2";

/// Name of the best-selling fake product.
pub const DOSA: &str = "Masala Dosa";
pub const DOSA_ID: &str = "p1";
/// Name of the plain fake product.
pub const COFFEE: &str = "Filter Coffee";

/// Customer order being prepared: `i1` can be cancelled, `i2` is ready.
pub const ORDER_ID: &str = "65f0a1b2c3d4e5f601234567";
/// Customer order already past preparation.
pub const READY_ORDER_ID: &str = "65f0a1b2c3d4e5f6012345aa";
/// Id the fake gives every newly placed order.
pub const PLACED_ORDER_ID: &str = "65f0a1b2c3d4e5f6012345ff";
/// Paid order with a rejected item, so it owes a refund.
pub const DROPPED_ORDER_ID: &str = "65f0a1b2c3d4e5f6012345bb";
/// Ready order whose status update the fake refuses with 409.
pub const STALE_ORDER_ID: &str = "65f0a1b2c3d4e5f6012345cc";

const SESSION_COOKIE: &str = "token";

fn role_for(email: &str) -> Option<&'static str> {
    match email {
        CUSTOMER_EMAIL => Some("user"),
        KITCHEN_EMAIL => Some("kitchen"),
        ADMIN_EMAIL => Some("admin"),
        _ => None,
    }
}

fn user(role: &str) -> Option<Value> {
    let (id, name, email) = match role {
        "user" => ("u1", "Asha", CUSTOMER_EMAIL),
        "kitchen" => (KITCHEN_STAFF_ID, "Ravi", KITCHEN_EMAIL),
        "admin" => ("u3", "Meena", ADMIN_EMAIL),
        _ => return None,
    };
    Some(json!({
        "_id": id,
        "fullName": name,
        "email": email,
        "phone": "9876543210",
        "role": role,
        "addresses": []
    }))
}

fn dosa() -> Value {
    json!({
        "_id": DOSA_ID,
        "name": DOSA,
        "description": "Crisp rice crepe with potato masala",
        "imageUrl": "/uploads/dosa.jpg",
        "price": 120,
        "discountPrice": 102,
        "cuisine": "South Indian",
        "categories": ["Breakfast"],
        "dietaryInfo": { "isVegetarian": true, "isBestSeller": true },
        "rating": { "average": 4.5, "count": 12 }
    })
}

fn coffee() -> Value {
    json!({
        "_id": "p2",
        "name": COFFEE,
        "description": "Strong and sweet",
        "price": 30,
        "cuisine": "South Indian",
        "categories": ["Drinks"],
        "dietaryInfo": { "isVegetarian": true }
    })
}

fn item(id: &str, name: &str, price: u32, quantity: u32, status: &str) -> Value {
    json!({
        "_id": id,
        "productName": name,
        "price": price,
        "quantity": quantity,
        "status": status
    })
}

fn order(id: &str, overall: &str, items: Value) -> Value {
    json!({
        "_id": id,
        "totalAmount": 234,
        "overallStatus": overall,
        "paymentStatus": "paid",
        "userId": { "_id": "u1", "fullName": "Asha", "email": CUSTOMER_EMAIL },
        "items": items
    })
}

fn customer_orders() -> Vec<Value> {
    vec![
        order(
            ORDER_ID,
            "preparing",
            json!([
                item("i1", DOSA, 102, 2, "preparing"),
                item("i2", COFFEE, 30, 1, "ready")
            ]),
        ),
        order(READY_ORDER_ID, "ready", json!([item("i3", DOSA, 102, 1, "pending")])),
    ]
}

fn admin_orders() -> Vec<Value> {
    vec![
        order(
            DROPPED_ORDER_ID,
            "ready",
            json!([
                item("i4", DOSA, 102, 1, "ready"),
                item("i5", COFFEE, 30, 1, "rejected")
            ]),
        ),
        order(STALE_ORDER_ID, "ready", json!([item("i6", DOSA, 102, 1, "ready")])),
    ]
}

fn message(status: StatusCode, text: &str) -> Response {
    (status, Json(json!({ "message": text }))).into_response()
}

fn not_authenticated() -> Response {
    message(StatusCode::UNAUTHORIZED, "Not authenticated")
}

fn find(orders: &[Value], id: &str) -> Response {
    orders.iter().find(|o| o["_id"] == id).map_or_else(
        || message(StatusCode::NOT_FOUND, "Order not found"),
        |o| Json(json!({ "order": o })).into_response(),
    )
}

/// Role carried by the fake session cookie, if any.
fn cookie_role(headers: &HeaderMap) -> Option<String> {
    headers
        .get(header::COOKIE)
        .and_then(|v| v.to_str().ok())?
        .split(';')
        .filter_map(|pair| pair.trim().split_once('='))
        .find(|(name, _)| *name == SESSION_COOKIE)
        .map(|(_, value)| value.to_owned())
}

/// A request the fake received.
#[derive(Debug, Clone)]
pub struct ApiCall {
    pub method: Method,
    pub path: String,
    /// JSON body, or `Null` when there was none.
    pub body: Value,
    pub request_id: Option<String>,
}

#[derive(Clone, Default)]
struct Fake {
    calls: Arc<Mutex<Vec<ApiCall>>>,
    /// Once set, every session cookie is refused.
    expired: Arc<AtomicBool>,
}

impl Fake {
    fn role(&self, headers: &HeaderMap) -> Option<String> {
        if self.expired.load(Ordering::SeqCst) {
            return None;
        }
        cookie_role(headers)
    }
}

/// Keep a copy of every request before it is handled.
async fn record(State(fake): State<Fake>, request: Request, next: Next) -> Response {
    let (parts, body) = request.into_parts();
    let bytes = to_bytes(body, usize::MAX).await.unwrap();
    fake.calls.lock().unwrap().push(ApiCall {
        method: parts.method.clone(),
        path: parts.uri.path().to_owned(),
        body: serde_json::from_slice(&bytes).unwrap_or(Value::Null),
        request_id: parts
            .headers
            .get("x-request-id")
            .and_then(|v| v.to_str().ok())
            .map(str::to_owned),
    });
    next.run(Request::from_parts(parts, Body::from(bytes))).await
}

async fn login(Json(body): Json<Value>) -> Response {
    let email = body["email"].as_str().unwrap_or_default();
    let password = body["password"].as_str().unwrap_or_default();
    match role_for(email).filter(|_| password == PASSWORD) {
        Some(role) => (
            [(
                header::SET_COOKIE,
                format!("{SESSION_COOKIE}={role}; Path=/; HttpOnly"),
            )],
            Json(json!({ "user": user(role) })),
        )
            .into_response(),
        None => message(StatusCode::UNAUTHORIZED, "Invalid credentials"),
    }
}

async fn me(State(fake): State<Fake>, headers: HeaderMap) -> Response {
    match fake.role(&headers).as_deref().and_then(user) {
        Some(user) => Json(json!({ "user": user })).into_response(),
        None => not_authenticated(),
    }
}

async fn products() -> Json<Value> {
    Json(json!({ "products": [dosa(), coffee()] }))
}

async fn product(Path(id): Path<String>) -> Response {
    [dosa(), coffee()]
        .into_iter()
        .find(|p| p["_id"] == id.as_str())
        .map_or_else(
            || message(StatusCode::NOT_FOUND, "Product not found"),
            |p| Json(json!({ "product": p })).into_response(),
        )
}

async fn categories() -> Json<Value> {
    Json(json!({
        "cuisines": ["North Indian", "South Indian"],
        "categories": ["Breakfast", "Drinks"]
    }))
}

async fn reviews() -> Json<Value> {
    Json(json!({ "reviews": [] }))
}

async fn cart(State(fake): State<Fake>, headers: HeaderMap) -> Response {
    if fake.role(&headers).is_none() {
        return not_authenticated();
    }
    Json(json!({
        "cart": [
            { "productId": dosa(), "quantity": 2 },
            { "productId": null, "quantity": 5 }
        ]
    }))
    .into_response()
}

async fn clear_cart() -> Response {
    message(StatusCode::OK, "Cart cleared")
}

async fn place_order(Json(body): Json<Value>) -> Json<Value> {
    Json(json!({
        "order": {
            "_id": PLACED_ORDER_ID,
            "totalAmount": body["totalAmount"],
            "items": []
        }
    }))
}

async fn confirm_payment() -> Response {
    message(StatusCode::OK, "Payment confirmed")
}

async fn orders(State(fake): State<Fake>, headers: HeaderMap) -> Response {
    if fake.role(&headers).is_none() {
        return not_authenticated();
    }
    Json(json!({ "orders": customer_orders() })).into_response()
}

async fn customer_order(
    State(fake): State<Fake>,
    headers: HeaderMap,
    Path(id): Path<String>,
) -> Response {
    if fake.role(&headers).is_none() {
        return not_authenticated();
    }
    find(&customer_orders(), &id)
}

async fn cancel_order() -> Response {
    message(StatusCode::OK, "Items cancelled")
}

async fn admin_order(Path(id): Path<String>) -> Response {
    find(&admin_orders(), &id)
}

async fn admin_order_status(Path(id): Path<String>) -> Response {
    if id == STALE_ORDER_ID {
        return message(StatusCode::CONFLICT, "Order items changed");
    }
    Json(json!({ "success": true })).into_response()
}

async fn favorites() -> Json<Value> {
    Json(json!({ "favorites": [] }))
}

async fn kitchen_orders() -> Json<Value> {
    Json(json!({ "orders": [customer_orders()[0].clone()] }))
}

async fn kitchen_item() -> Json<Value> {
    Json(json!({ "success": true, "message": "Item updated" }))
}

/// The slice of the Canteen API the storefront tests rely on.
fn fake_routes(fake: Fake) -> Router {
    Router::new()
        .route("/api/auth/login", post(login))
        .route("/api/auth/me", get(me))
        .route("/api/products", get(products))
        .route("/api/products/categories", get(categories))
        .route("/api/products/{id}", get(product))
        .route("/api/reviews/product/{id}", get(reviews))
        .route("/api/orders", get(orders))
        .route("/api/orders/cart", get(cart))
        .route("/api/orders/cart/clear", delete(clear_cart))
        .route("/api/orders/place", post(place_order))
        .route("/api/orders/payments/confirm", post(confirm_payment))
        .route("/api/orders/{id}", get(customer_order))
        .route("/api/orders/{id}/cancel", post(cancel_order))
        .route("/api/admin/orders/{id}", get(admin_order))
        .route("/api/admin/orders/{id}/status", put(admin_order_status))
        .route("/api/user/favorites", get(favorites))
        .route("/api/kitchen/orders", get(kitchen_orders))
        .route(
            "/api/kitchen/orders/{order_id}/items/{item_id}/status",
            put(kitchen_item),
        )
        .route(
            "/api/kitchen/orders/{order_id}/items/{item_id}/reject",
            post(kitchen_item),
        )
        .layer(from_fn_with_state(fake.clone(), record))
        .with_state(fake)
}

/// A fake Canteen API listening on `127.0.0.1` until dropped.
pub struct FakeApi {
    addr: SocketAddr,
    fake: Fake,
    task: JoinHandle<()>,
}

impl FakeApi {
    /// Start serving on an ephemeral port.
    pub async fn start() -> Self {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let fake = Fake::default();
        let app = fake_routes(fake.clone());
        let task = tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });
        Self { addr, fake, task }
    }

    /// Base URL the storefront should be pointed at.
    #[must_use]
    pub fn base_url(&self) -> String {
        format!("http://{}/api/", self.addr)
    }

    /// Every request received so far, oldest first.
    #[must_use]
    pub fn calls(&self) -> Vec<ApiCall> {
        self.fake.calls.lock().unwrap().clone()
    }

    /// Requests received for one method and path.
    #[must_use]
    pub fn calls_to(&self, method: &Method, path: &str) -> Vec<ApiCall> {
        self.calls()
            .into_iter()
            .filter(|c| c.method == *method && c.path == path)
            .collect()
    }

    /// Refuse every session from now on, as if it lapsed upstream.
    pub fn expire_sessions(&self) {
        self.fake.expired.store(true, Ordering::SeqCst);
    }
}

impl Drop for FakeApi {
    fn drop(&mut self) {
        self.task.abort();
    }
}

/// Storefront router wired to `base`, with cookies kept between requests.
#[must_use]
pub fn storefront_at(base: &str) -> TestServer {
    storefront_with_state(base).0
}

/// Like [`storefront_at`], also handing back the state the router shares.
#[must_use]
pub fn storefront_with_state(base: &str) -> (TestServer, AppState) {
    let config = StorefrontConfig::with_api(CanteenApiConfig::for_base(base).unwrap());
    let state = AppState::new(config);
    let mut server = TestServer::new(routes::app(state.clone())).unwrap();
    server.save_cookies();
    (server, state)
}

/// Storefront router talking to `api`.
#[must_use]
pub fn storefront(api: &FakeApi) -> TestServer {
    storefront_at(&api.base_url())
}

/// Sign in through the login form.
pub async fn sign_in(server: &TestServer, email: &str) {
    server
        .post("/auth/login")
        .form(&[("email", email), ("password", PASSWORD)])
        .await
        .assert_status(StatusCode::SEE_OTHER);
}
