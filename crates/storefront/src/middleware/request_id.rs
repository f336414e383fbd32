//! Request id tagging, shared with the Canteen API.
//!
//! Every browser request gets an id: the one a proxy already put in
//! `x-request-id`, or a fresh UUID v4. The id is recorded on the request span
//! and the Sentry scope, echoed in the response, and scoped to the handler
//! task so [`CanteenClient`](crate::api::CanteenClient) forwards it on every
//! API call the request makes. Storefront and API logs then share one key.

use axum::{extract::Request, http::HeaderValue, middleware::Next, response::Response};
use tracing::{Span, field::Empty};
use uuid::Uuid;

/// The HTTP header name for request IDs.
pub const REQUEST_ID_HEADER: &str = "x-request-id";

/// Longest incoming id accepted; anything longer is replaced.
const MAX_REQUEST_ID_LEN: usize = 128;

tokio::task_local! {
    static CURRENT_REQUEST_ID: String;
}

/// Id of the browser request being handled, if any.
///
/// `None` outside a request, e.g. in the event feed tasks.
#[must_use]
pub fn current_request_id() -> Option<String> {
    CURRENT_REQUEST_ID.try_with(Clone::clone).ok()
}

/// Reuse a proxy's id only when it is short, printable ASCII.
fn incoming_id(request: &Request) -> Option<String> {
    let value = request.headers().get(REQUEST_ID_HEADER)?.to_str().ok()?;
    let valid = !value.is_empty()
        && value.len() <= MAX_REQUEST_ID_LEN
        && value.bytes().all(|b| b.is_ascii_graphic());
    valid.then(|| value.to_owned())
}

/// Span for [`tower_http::trace::TraceLayer`] with an empty `request_id`
/// field for [`request_id_middleware`] to fill.
pub fn request_span(request: &Request) -> Span {
    tracing::info_span!(
        "request",
        method = %request.method(),
        path = %request.uri().path(),
        request_id = Empty,
    )
}

/// Tag the request with its id and run the rest of the stack inside it.
pub async fn request_id_middleware(request: Request, next: Next) -> Response {
    let request_id = incoming_id(&request).unwrap_or_else(|| Uuid::new_v4().to_string());

    Span::current().record("request_id", request_id.as_str());
    sentry::configure_scope(|scope| {
        scope.set_tag("request_id", &request_id);
    });

    let mut response = CURRENT_REQUEST_ID
        .scope(request_id.clone(), next.run(request))
        .await;

    if let Ok(value) = HeaderValue::from_str(&request_id) {
        response.headers_mut().insert(REQUEST_ID_HEADER, value);
    }
    response
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use axum::{Router, http::header::HeaderName, middleware::from_fn, routing::get};
    use axum_test::TestServer;

    fn server() -> TestServer {
        let app = Router::new()
            .route("/", get(|| async { current_request_id().unwrap_or_default() }))
            .layer(from_fn(request_id_middleware));
        TestServer::new(app).unwrap()
    }

    fn id_header() -> HeaderName {
        HeaderName::from_static(REQUEST_ID_HEADER)
    }

    #[tokio::test]
    async fn test_proxy_id_is_kept_and_visible_to_handlers() {
        let response = server()
            .get("/")
            .add_header(id_header(), HeaderValue::from_static("cf-1234"))
            .await;
        assert_eq!(response.header(id_header()), "cf-1234");
        response.assert_text("cf-1234");
    }

    #[tokio::test]
    async fn test_missing_or_oversized_id_is_replaced() {
        let response = server().get("/").await;
        let header = response.header(id_header()).to_str().unwrap().to_owned();
        assert!(Uuid::parse_str(&header).is_ok());
        response.assert_text(header);

        let long = "x".repeat(MAX_REQUEST_ID_LEN + 1);
        let response = server()
            .get("/")
            .add_header(id_header(), HeaderValue::from_str(&long).unwrap())
            .await;
        let header = response.header(id_header()).to_str().unwrap().to_owned();
        assert!(Uuid::parse_str(&header).is_ok());
    }

    #[test]
    fn test_no_id_outside_a_request() {
        assert!(current_request_id().is_none());
    }
}
