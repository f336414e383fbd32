//! End-to-end flows through the storefront router against the fake API.

#![allow(clippy::unwrap_used)]

use axum::http::{HeaderValue, Method, StatusCode, header};
use canteen_integration_tests::{
    ADMIN_EMAIL, COFFEE, CUSTOMER_EMAIL, DOSA, DOSA_ID, FakeApi, KITCHEN_EMAIL, PASSWORD, sign_in,
    storefront, storefront_at,
};
use tokio::net::TcpListener;

#[tokio::test]
async fn test_health_checks() {
    let api = FakeApi::start().await;
    let server = storefront(&api);

    server.get("/health").await.assert_text("ok");
    server.get("/health/ready").await.assert_status_ok();
}

#[tokio::test]
async fn test_readiness_fails_without_api() {
    // Bind and release a port so nothing is listening on it
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);

    let server = storefront_at(&format!("http://{addr}/api/"));
    server.get("/health").await.assert_status_ok();
    server
        .get("/health/ready")
        .await
        .assert_status(StatusCode::SERVICE_UNAVAILABLE);
}

#[tokio::test]
async fn test_home_features_best_sellers() {
    let api = FakeApi::start().await;
    let server = storefront(&api);

    let response = server.get("/").await;
    response.assert_status_ok();
    response.assert_text_contains(DOSA);
}

#[tokio::test]
async fn test_menu_lists_products() {
    let api = FakeApi::start().await;
    let server = storefront(&api);

    let response = server.get("/menu").await;
    response.assert_status_ok();
    response.assert_text_contains(DOSA);
    response.assert_text_contains(COFFEE);
}

#[tokio::test]
async fn test_product_page_and_missing_product() {
    let api = FakeApi::start().await;
    let server = storefront(&api);

    server
        .get(&format!("/products/{DOSA_ID}"))
        .await
        .assert_text_contains(DOSA);
    let missing = server.get("/products/nope").await;
    missing.assert_status(StatusCode::NOT_FOUND);
    missing.assert_text_contains("Product not found");
    missing.assert_text_contains("class=\"brand\"");
}

#[tokio::test]
async fn test_unknown_path_gets_layout_404() {
    let api = FakeApi::start().await;
    let server = storefront(&api);
    sign_in(&server, CUSTOMER_EMAIL).await;

    let response = server.get("/no/such/page").await;
    response.assert_status(StatusCode::NOT_FOUND);
    response.assert_text_contains("Page not found");
    // Still signed in on the error page
    response.assert_text_contains("Logout");

    // The welcome flash waits for the next real page
    server.get("/menu").await.assert_text_contains("Welcome, Asha!");
}

#[tokio::test]
async fn test_signed_in_pages_carry_toast_lifetime() {
    let api = FakeApi::start().await;
    let server = storefront(&api);

    let anonymous = server.get("/menu").await.text();
    assert!(!anonymous.contains("data-toast-ttl"));

    sign_in(&server, CUSTOMER_EMAIL).await;
    server
        .get("/menu")
        .await
        .assert_text_contains("data-toast-ttl=\"5000\"");
}

#[tokio::test]
async fn test_anonymous_cart_goes_to_login() {
    let api = FakeApi::start().await;
    let server = storefront(&api);

    let response = server.get("/cart").await;
    response.assert_status(StatusCode::SEE_OTHER);
    assert_eq!(response.header(header::LOCATION), "/auth/login");
}

#[tokio::test]
async fn test_anonymous_json_caller_gets_401() {
    let api = FakeApi::start().await;
    let server = storefront(&api);

    server
        .get("/notifications")
        .add_header(header::ACCEPT, HeaderValue::from_static("application/json"))
        .await
        .assert_status(StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_bad_login_shows_api_message() {
    let api = FakeApi::start().await;
    let server = storefront(&api);

    let response = server
        .post("/auth/login")
        .form(&[("email", CUSTOMER_EMAIL), ("password", "wrong")])
        .await;
    response.assert_status_ok();
    response.assert_text_contains("Invalid credentials");
}

#[tokio::test]
async fn test_customer_login_and_cart() {
    let api = FakeApi::start().await;
    let server = storefront(&api);

    let response = server
        .post("/auth/login")
        .form(&[("email", CUSTOMER_EMAIL), ("password", PASSWORD)])
        .await;
    response.assert_status(StatusCode::SEE_OTHER);
    assert_eq!(response.header(header::LOCATION), "/menu");

    let cart = server.get("/cart").await;
    cart.assert_status_ok();
    cart.assert_text_contains(DOSA);

    // The line whose product was deleted is not counted
    server.get("/cart/count").await.assert_text("2");
}

#[tokio::test]
async fn test_login_page_redirects_signed_in_user_home() {
    let api = FakeApi::start().await;
    let server = storefront(&api);
    sign_in(&server, ADMIN_EMAIL).await;

    let response = server.get("/auth/login").await;
    response.assert_status(StatusCode::SEE_OTHER);
    assert_eq!(response.header(header::LOCATION), "/admin");
}

#[tokio::test]
async fn test_kitchen_staff_kept_out_of_admin() {
    let api = FakeApi::start().await;
    let server = storefront(&api);
    sign_in(&server, KITCHEN_EMAIL).await;

    let response = server.get("/admin").await;
    response.assert_status(StatusCode::SEE_OTHER);
    assert_eq!(response.header(header::LOCATION), "/");

    let queue = server.get("/kitchen").await;
    queue.assert_status_ok();
    queue.assert_text_contains(DOSA);
}

#[tokio::test]
async fn test_logout_ends_session() {
    let api = FakeApi::start().await;
    let server = storefront(&api);
    sign_in(&server, CUSTOMER_EMAIL).await;

    server.post("/auth/logout").await.assert_status(StatusCode::SEE_OTHER);

    let response = server.get("/cart").await;
    response.assert_status(StatusCode::SEE_OTHER);
    assert_eq!(response.header(header::LOCATION), "/auth/login");
}

#[tokio::test]
async fn test_security_headers_and_request_id() {
    let api = FakeApi::start().await;
    let server = storefront(&api);

    let response = server.get("/health").await;
    assert_eq!(response.header(header::X_FRAME_OPTIONS), "DENY");
    assert_eq!(response.header(header::X_CONTENT_TYPE_OPTIONS), "nosniff");
    let csp = response.header(header::CONTENT_SECURITY_POLICY);
    assert!(csp.to_str().unwrap().contains("script-src 'self'"));
    assert!(response.maybe_header("x-request-id").is_some());
}

#[tokio::test]
async fn test_forwarded_request_id_is_echoed() {
    let api = FakeApi::start().await;
    let server = storefront(&api);

    let response = server
        .get("/health")
        .add_header("x-request-id", HeaderValue::from_static("req-abc-123"))
        .await;
    assert_eq!(response.header("x-request-id"), "req-abc-123");
}

#[tokio::test]
async fn test_request_id_reaches_the_api() {
    let api = FakeApi::start().await;
    let server = storefront(&api);

    server
        .get("/menu")
        .add_header("x-request-id", HeaderValue::from_static("menu-42"))
        .await
        .assert_status_ok();

    let calls = api.calls_to(&Method::GET, "/api/products");
    assert!(!calls.is_empty());
    assert!(calls.iter().all(|c| c.request_id.as_deref() == Some("menu-42")));
}
