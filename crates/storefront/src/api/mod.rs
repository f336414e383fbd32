//! Canteen REST API client.
//!
//! # Architecture
//!
//! - The Canteen API is the source of truth. NO local persistence, every
//!   page reads straight through this client.
//! - Calls made on behalf of a signed-in user replay that user's upstream
//!   session cookie ([`ApiSession`]).
//! - Public catalogue reads (product listings, menu categories) are cached
//!   in memory via `moka` for 60 seconds and dropped on any admin product
//!   mutation.
//!
//! # Example
//!
//! ```rust,ignore
//! use canteen_storefront::api::CanteenClient;
//!
//! let client = CanteenClient::new(&config.api);
//! let (user, session) = client.login("asha@example.com", "secret1").await?;
//! let cart = client.cart(&session).await?;
//! ```

mod admin;
mod auth;
mod cache;
mod cart;
mod events;
mod kitchen;
mod orders;
mod products;
mod reviews;
pub mod types;
mod user;

pub use auth::Registration;
pub use events::SseDecoder;
pub use types::*;

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use moka::future::Cache;
use reqwest::header::{self, HeaderMap};
use reqwest::{Method, RequestBuilder, StatusCode};
use secrecy::{ExposeSecret, SecretString};
use serde::Deserialize;
use serde::de::DeserializeOwned;
use thiserror::Error;
use url::Url;

use crate::config::CanteenApiConfig;
use crate::middleware::{REQUEST_ID_HEADER, current_request_id};

use cache::{CacheKey, CacheValue};

/// Errors that can occur when talking to the Canteen API.
#[derive(Debug, Error)]
pub enum ApiError {
    /// HTTP request failed.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// JSON parsing failed.
    #[error("JSON parse error: {0}")]
    Parse(#[from] serde_json::Error),

    /// A request path could not be joined onto the base URL.
    #[error("Invalid URL: {0}")]
    Url(#[from] url::ParseError),

    /// The upstream session is missing or expired (HTTP 401).
    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    /// The signed-in user may not perform this action (HTTP 403).
    #[error("Forbidden: {0}")]
    Forbidden(String),

    /// Resource not found (HTTP 404).
    #[error("Not found: {0}")]
    NotFound(String),

    /// The record changed underneath us (HTTP 409 or `success: false`).
    #[error("Conflict: {0}")]
    Conflict(String),

    /// Rate limited by the API.
    #[error("Rate limited, retry after {0} seconds")]
    RateLimited(u64),

    /// Any other non-success status.
    #[error("API error ({status}): {message}")]
    Status { status: u16, message: String },

    /// Image upload was refused.
    #[error("Upload failed: {0}")]
    Upload(String),

    /// Login or registration succeeded without handing out a session.
    #[error("API did not return a session cookie")]
    MissingSession,
}

impl ApiError {
    /// Text suitable for showing to the user in a flash message.
    #[must_use]
    pub fn user_message(&self) -> String {
        match self {
            Self::Unauthorized(message)
            | Self::Forbidden(message)
            | Self::NotFound(message)
            | Self::Conflict(message)
            | Self::Upload(message)
            | Self::Status { message, .. } => message.clone(),
            Self::RateLimited(_) => {
                "Too many requests. Please wait a moment and try again.".to_owned()
            }
            Self::Http(_) => "Could not reach the canteen service. Please try again.".to_owned(),
            Self::Parse(_) | Self::Url(_) | Self::MissingSession => {
                "Unexpected response from the canteen service.".to_owned()
            }
        }
    }

    /// Whether the upstream session has expired.
    #[must_use]
    pub const fn is_unauthorized(&self) -> bool {
        matches!(self, Self::Unauthorized(_))
    }

    /// Whether the API answered 409 (or an equivalent refusal).
    #[must_use]
    pub const fn is_conflict(&self) -> bool {
        matches!(self, Self::Conflict(_))
    }
}

// =============================================================================
// ApiSession
// =============================================================================

/// The upstream session cookie of one signed-in user.
///
/// Captured from the `Set-Cookie` headers of login/registration and sent
/// back as a `Cookie` header on every call for that user.
#[derive(Clone)]
pub struct ApiSession(SecretString);

impl ApiSession {
    #[must_use]
    pub fn new(cookie: impl Into<String>) -> Self {
        Self(SecretString::from(cookie.into()))
    }

    /// The `Cookie` header value.
    #[must_use]
    pub fn cookie(&self) -> &str {
        self.0.expose_secret()
    }

    /// Collect the `name=value` pairs of every `Set-Cookie` header.
    fn from_headers(headers: &HeaderMap) -> Option<Self> {
        let pairs: Vec<&str> = headers
            .get_all(header::SET_COOKIE)
            .iter()
            .filter_map(|value| value.to_str().ok())
            .filter_map(|value| value.split(';').next())
            .map(str::trim)
            .filter(|pair| pair.contains('='))
            .collect();

        (!pairs.is_empty()).then(|| Self::new(pairs.join("; ")))
    }
}

impl fmt::Debug for ApiSession {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("ApiSession([REDACTED])")
    }
}

// =============================================================================
// CanteenClient
// =============================================================================

/// Client for the Canteen REST API.
#[derive(Clone)]
pub struct CanteenClient {
    inner: Arc<CanteenClientInner>,
}

struct CanteenClientInner {
    client: reqwest::Client,
    config: CanteenApiConfig,
    cache: Cache<CacheKey, CacheValue>,
}

#[derive(Deserialize)]
struct ErrorBody {
    error: Option<String>,
    message: Option<String>,
}

/// Pull the human-readable reason out of an error body.
fn error_message(body: &str) -> Option<String> {
    let parsed: ErrorBody = serde_json::from_str(body).ok()?;
    parsed
        .error
        .or(parsed.message)
        .filter(|message| !message.trim().is_empty())
}

/// Percent-encode an id for use as a path segment.
fn segment(id: &str) -> String {
    urlencoding::encode(id).into_owned()
}

impl CanteenClient {
    /// Create a new Canteen API client.
    #[must_use]
    pub fn new(config: &CanteenApiConfig) -> Self {
        let cache = Cache::builder()
            .max_capacity(256)
            .time_to_live(Duration::from_secs(60))
            .build();

        Self {
            inner: Arc::new(CanteenClientInner {
                client: reqwest::Client::new(),
                config: config.clone(),
                cache,
            }),
        }
    }

    /// The configuration this client was built from.
    #[must_use]
    pub fn config(&self) -> &CanteenApiConfig {
        &self.inner.config
    }

    /// Check that the API answers at all. Any HTTP response counts.
    ///
    /// # Errors
    ///
    /// Returns an error if the API cannot be reached.
    pub async fn ping(&self) -> Result<(), ApiError> {
        self.inner
            .client
            .get(self.inner.config.base_url.clone())
            .timeout(Duration::from_secs(5))
            .send()
            .await?;
        Ok(())
    }

    /// Drop all cached catalogue responses.
    pub(crate) fn invalidate_catalogue(&self) {
        self.inner.cache.invalidate_all();
    }

    fn url(&self, path: &str) -> Result<Url, ApiError> {
        Ok(self
            .inner
            .config
            .base_url
            .join(path.trim_start_matches('/'))?)
    }

    /// Start a request, attaching the user's cookie when there is one.
    fn request(
        &self,
        method: Method,
        path: &str,
        session: Option<&ApiSession>,
    ) -> Result<RequestBuilder, ApiError> {
        let mut builder = self
            .inner
            .client
            .request(method, self.url(path)?)
            .timeout(self.inner.config.timeout)
            .header(header::ACCEPT, "application/json");
        if let Some(session) = session {
            builder = builder.header(header::COOKIE, session.cookie());
        }
        if let Some(request_id) = current_request_id() {
            builder = builder.header(REQUEST_ID_HEADER, request_id);
        }
        Ok(builder)
    }

    /// Send a request and return the headers and body of a success response.
    async fn execute_raw(&self, builder: RequestBuilder) -> Result<(HeaderMap, String), ApiError> {
        let response = builder.send().await?;
        let status = response.status();

        if status == StatusCode::TOO_MANY_REQUESTS {
            let retry_after = response
                .headers()
                .get(header::RETRY_AFTER)
                .and_then(|v| v.to_str().ok())
                .and_then(|s| s.parse::<u64>().ok())
                .unwrap_or(1);
            return Err(ApiError::RateLimited(retry_after));
        }

        let headers = response.headers().clone();
        // Get response body as text first for better error diagnostics
        let response_text = response.text().await?;

        if !status.is_success() {
            let message = error_message(&response_text)
                .unwrap_or_else(|| format!("Request failed with status {}", status.as_u16()));

            if status.is_server_error() {
                tracing::error!(
                    status = %status,
                    body = %response_text.chars().take(500).collect::<String>(),
                    "Canteen API returned server error"
                );
            } else {
                tracing::debug!(status = %status, message = %message, "Canteen API refused request");
            }

            return Err(match status {
                StatusCode::UNAUTHORIZED => ApiError::Unauthorized(message),
                StatusCode::FORBIDDEN => ApiError::Forbidden(message),
                StatusCode::NOT_FOUND => ApiError::NotFound(message),
                StatusCode::CONFLICT => ApiError::Conflict(message),
                _ => ApiError::Status {
                    status: status.as_u16(),
                    message,
                },
            });
        }

        Ok((headers, response_text))
    }

    /// Send a request and decode its JSON body.
    async fn execute<T: DeserializeOwned>(&self, builder: RequestBuilder) -> Result<T, ApiError> {
        let (_, body) = self.execute_raw(builder).await?;
        decode(&body)
    }

    /// Send a request whose body we do not need.
    async fn execute_unit(&self, builder: RequestBuilder) -> Result<(), ApiError> {
        self.execute_raw(builder).await.map(|_| ())
    }
}

fn decode<T: DeserializeOwned>(body: &str) -> Result<T, ApiError> {
    serde_json::from_str(body).map_err(|e| {
        tracing::error!(
            error = %e,
            body = %body.chars().take(500).collect::<String>(),
            "Failed to parse Canteen API response"
        );
        ApiError::Parse(e)
    })
}
