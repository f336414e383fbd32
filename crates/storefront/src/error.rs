//! Unified error handling with Sentry integration.
//!
//! Provides a unified `AppError` type that captures errors to Sentry before
//! responding to the client. All route handlers should return `Result<T, AppError>`.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Redirect, Response},
};
use thiserror::Error;

use crate::api::ApiError;

/// Where an expired upstream session is sent.
pub const SESSION_EXPIRED_PATH: &str = "/auth/expired";

/// Application-level error type for the storefront.
#[derive(Debug, Error)]
pub enum AppError {
    /// Canteen API call failed.
    #[error("API error: {0}")]
    Api(#[from] ApiError),

    /// No route or record under this path.
    #[error("Not found: {0}")]
    NotFound(String),
}

impl AppError {
    /// Whether the upstream session behind this request has expired.
    #[must_use]
    pub const fn is_session_expired(&self) -> bool {
        matches!(self, Self::Api(ApiError::Unauthorized(_)))
    }

    /// Status code shown to the browser.
    #[must_use]
    pub const fn status(&self) -> StatusCode {
        match self {
            Self::Api(err) => match err {
                ApiError::Unauthorized(_) => StatusCode::UNAUTHORIZED,
                ApiError::Forbidden(_) => StatusCode::FORBIDDEN,
                ApiError::NotFound(_) => StatusCode::NOT_FOUND,
                ApiError::Conflict(_) => StatusCode::CONFLICT,
                ApiError::RateLimited(_) => StatusCode::TOO_MANY_REQUESTS,
                ApiError::Upload(_) => StatusCode::BAD_REQUEST,
                _ => StatusCode::BAD_GATEWAY,
            },
            Self::NotFound(_) => StatusCode::NOT_FOUND,
        }
    }

    /// Message safe to show the browser.
    #[must_use]
    pub fn user_message(&self) -> String {
        match self {
            // Don't expose internal error details to clients
            Self::Api(err) => match err {
                ApiError::Forbidden(_)
                | ApiError::NotFound(_)
                | ApiError::Conflict(_)
                | ApiError::RateLimited(_)
                | ApiError::Upload(_) => err.user_message(),
                _ => "External service error".to_string(),
            },
            Self::NotFound(what) => what.clone(),
        }
    }
}

/// Response marker picked up by the error page renderer, which swaps the
/// plain-text body for the full layout.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ErrorPage {
    pub status: StatusCode,
    pub message: String,
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        if self.is_session_expired() {
            return Redirect::to(SESSION_EXPIRED_PATH).into_response();
        }

        // Capture upstream failures to Sentry
        if matches!(
            self,
            Self::Api(
                ApiError::Http(_)
                    | ApiError::Parse(_)
                    | ApiError::Url(_)
                    | ApiError::Status { .. }
                    | ApiError::MissingSession
            )
        ) {
            let event_id = sentry::capture_error(&self);
            tracing::error!(
                error = %self,
                sentry_event_id = %event_id,
                "Request error"
            );
        }

        let status = self.status();
        let message = self.user_message();
        let mut response = (status, message.clone()).into_response();
        response
            .extensions_mut()
            .insert(ErrorPage { status, message });
        response
    }
}

/// Result type alias for `AppError`.
pub type Result<T> = std::result::Result<T, AppError>;

/// Set the Sentry user context from a user ID.
///
/// Call this after successful authentication to associate errors with users.
pub fn set_sentry_user(user_id: &impl ToString, email: Option<&str>) {
    sentry::configure_scope(|scope| {
        scope.set_user(Some(sentry::User {
            id: Some(user_id.to_string()),
            email: email.map(String::from),
            ..Default::default()
        }));
    });
}

/// Clear the Sentry user context.
///
/// Call this on logout to stop associating errors with the user.
pub fn clear_sentry_user() {
    sentry::configure_scope(|scope| {
        scope.set_user(None);
    });
}

/// Add a breadcrumb for user actions.
///
/// Breadcrumbs appear in Sentry error reports to show the trail of user actions
/// leading up to an error.
///
/// # Example
///
/// ```rust,ignore
/// add_breadcrumb("cart", "Added to cart", Some(&[("product_id", "65f0a1")]));
/// ```
pub fn add_breadcrumb(category: &str, message: &str, data: Option<&[(&str, &str)]>) {
    let mut breadcrumb = sentry::Breadcrumb {
        category: Some(category.to_string()),
        message: Some(message.to_string()),
        level: sentry::Level::Info,
        ..Default::default()
    };

    if let Some(pairs) = data {
        for (key, value) in pairs {
            breadcrumb.data.insert(
                (*key).to_string(),
                serde_json::Value::String((*value).to_string()),
            );
        }
    }

    sentry::add_breadcrumb(breadcrumb);
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use axum::http::header;

    fn get_status(err: AppError) -> StatusCode {
        err.into_response().status()
    }

    #[test]
    fn test_app_error_display() {
        let err = AppError::NotFound("order-123".to_string());
        assert_eq!(err.to_string(), "Not found: order-123");

        let err = AppError::from(ApiError::Conflict("stale".into()));
        assert!(err.to_string().starts_with("API error: "));
    }

    #[test]
    fn test_api_errors_map_to_upstream_statuses() {
        assert_eq!(
            get_status(AppError::NotFound("Page not found".to_string())),
            StatusCode::NOT_FOUND
        );
        assert_eq!(
            get_status(ApiError::NotFound("Product not found".into()).into()),
            StatusCode::NOT_FOUND
        );
        assert_eq!(
            get_status(ApiError::Forbidden("Admins only".into()).into()),
            StatusCode::FORBIDDEN
        );
        assert_eq!(
            get_status(ApiError::Conflict("stale".into()).into()),
            StatusCode::CONFLICT
        );
        assert_eq!(
            get_status(
                ApiError::Status {
                    status: 500,
                    message: "boom".into()
                }
                .into()
            ),
            StatusCode::BAD_GATEWAY
        );
    }

    #[test]
    fn test_error_response_is_marked_for_the_layout() {
        let response = AppError::NotFound("Page not found".to_string()).into_response();
        assert_eq!(
            response.extensions().get::<ErrorPage>(),
            Some(&ErrorPage {
                status: StatusCode::NOT_FOUND,
                message: "Page not found".to_owned(),
            })
        );

        let response = AppError::from(ApiError::Status {
            status: 500,
            message: "stack trace".into(),
        })
        .into_response();
        let page = response.extensions().get::<ErrorPage>().unwrap();
        assert_eq!(page.status, StatusCode::BAD_GATEWAY);
        assert_eq!(page.message, "External service error");
    }

    #[test]
    fn test_expired_upstream_session_redirects() {
        let response = AppError::from(ApiError::Unauthorized("Session expired".into())).into_response();
        assert_eq!(response.status(), StatusCode::SEE_OTHER);
        assert_eq!(
            response.headers().get(header::LOCATION).unwrap(),
            SESSION_EXPIRED_PATH
        );
        assert!(response.extensions().get::<ErrorPage>().is_none());
    }
}
