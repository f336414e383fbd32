//! Smoke tests against a running storefront.
//!
//! Ignored by default; point `STOREFRONT_BASE_URL` at a deployment and run
//! with `--ignored`.

#![allow(clippy::unwrap_used)]

use reqwest::StatusCode;

fn base_url() -> String {
    std::env::var("STOREFRONT_BASE_URL").unwrap_or_else(|_| "http://localhost:3000".to_owned())
}

fn client() -> reqwest::Client {
    reqwest::Client::builder()
        .cookie_store(true)
        .redirect(reqwest::redirect::Policy::none())
        .build()
        .unwrap()
}

#[tokio::test]
#[ignore = "requires a running storefront"]
async fn test_live_health() {
    let client = client();
    let response = client
        .get(format!("{}/health", base_url()))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(response.text().await.unwrap(), "ok");

    let ready = client
        .get(format!("{}/health/ready", base_url()))
        .send()
        .await
        .unwrap();
    assert_eq!(ready.status(), StatusCode::OK);
}

#[tokio::test]
#[ignore = "requires a running storefront"]
async fn test_live_menu_renders() {
    let response = client()
        .get(format!("{}/menu", base_url()))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert!(response.headers().contains_key("content-security-policy"));
    assert!(response.text().await.unwrap().contains("<html"));
}

#[tokio::test]
#[ignore = "requires a running storefront"]
async fn test_live_guarded_pages_need_login() {
    let response = client()
        .get(format!("{}/orders", base_url()))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::SEE_OTHER);
    assert_eq!(
        response.headers().get("location").unwrap().to_str().unwrap(),
        "/auth/login"
    );
}
