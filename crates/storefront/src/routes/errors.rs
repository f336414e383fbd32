//! Error pages in the site layout.
//!
//! Handlers fail with [`AppError`], whose response is plain text tagged with
//! an [`ErrorPage`] marker. [`render_error_pages`] sits inside the session
//! layer and swaps any tagged response for the full page, so a 404 or an
//! upstream failure keeps the navigation and sign-in state.

use askama::Template;
use askama_web::WebTemplate;
use axum::{
    extract::{Request, State},
    http::StatusCode,
    middleware::Next,
    response::{IntoResponse, Response},
};
use tower_sessions::Session;

use crate::error::{AppError, ErrorPage};
use crate::filters;
use crate::routes::page::Page;
use crate::state::AppState;

/// Error page template.
#[derive(Template, WebTemplate)]
#[template(path = "error.html")]
pub struct ErrorTemplate {
    pub page: Page,
    pub status: u16,
    pub heading: &'static str,
    pub message: String,
}

/// Heading for a status, e.g. "Page not found" for 404.
#[must_use]
pub fn heading(status: StatusCode) -> &'static str {
    match status {
        StatusCode::NOT_FOUND => "Page not found",
        StatusCode::FORBIDDEN => "Not allowed",
        StatusCode::CONFLICT => "Out of date",
        StatusCode::TOO_MANY_REQUESTS => "Slow down",
        s if s.is_client_error() => "Something is wrong with that request",
        _ => "The canteen service is having trouble",
    }
}

/// Router fallback for unknown paths.
pub async fn not_found() -> AppError {
    AppError::NotFound("We could not find that page.".to_owned())
}

/// Render tagged error responses through the layout.
///
/// Flashes stay in the session so they show on the next full page.
pub async fn render_error_pages(
    State(state): State<AppState>,
    request: Request,
    next: Next,
) -> Response {
    let path = request.uri().path().to_owned();
    let session = request.extensions().get::<Session>().cloned();

    let response = next.run(request).await;
    let Some(error) = response.extensions().get::<ErrorPage>().cloned() else {
        return response;
    };

    let page = Page::keeping_flashes(&state, session.as_ref(), &path).await;
    let mut rendered = ErrorTemplate {
        page,
        status: error.status.as_u16(),
        heading: heading(error.status),
        message: error.message,
    }
    .into_response();
    *rendered.status_mut() = error.status;
    rendered
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use axum::{Router, middleware::from_fn_with_state, routing::get};
    use axum_test::TestServer;

    use crate::api::ApiError;
    use crate::config::{CanteenApiConfig, StorefrontConfig};

    fn server() -> TestServer {
        let state = AppState::new(StorefrontConfig::with_api(
            CanteenApiConfig::for_base("http://127.0.0.1:9/api/").unwrap(),
        ));
        let app = Router::new()
            .route("/ok", get(|| async { "plain" }))
            .route(
                "/upstream",
                get(|| async {
                    AppError::from(ApiError::Status {
                        status: 500,
                        message: "stack trace".into(),
                    })
                }),
            )
            .fallback(not_found)
            .layer(from_fn_with_state(state.clone(), render_error_pages))
            .with_state(state);
        TestServer::new(app).unwrap()
    }

    #[test]
    fn test_headings() {
        assert_eq!(heading(StatusCode::NOT_FOUND), "Page not found");
        assert_eq!(
            heading(StatusCode::BAD_GATEWAY),
            "The canteen service is having trouble"
        );
    }

    #[tokio::test]
    async fn test_unknown_path_renders_layout() {
        let response = server().get("/nowhere").await;
        response.assert_status(StatusCode::NOT_FOUND);
        let body = response.text();
        assert!(body.contains("<nav class=\"nav\">"));
        assert!(body.contains("Page not found"));
        assert!(body.contains("We could not find that page."));
    }

    #[tokio::test]
    async fn test_upstream_failure_hides_details() {
        let response = server().get("/upstream").await;
        response.assert_status(StatusCode::BAD_GATEWAY);
        let body = response.text();
        assert!(body.contains("External service error"));
        assert!(!body.contains("stack trace"));
    }

    #[tokio::test]
    async fn test_untagged_responses_pass_through() {
        server().get("/ok").await.assert_text("plain");
    }
}
