//! Storefront configuration loaded from environment variables.
//!
//! # Environment Variables
//!
//! ## Required
//! - `CANTEEN_API_URL` - Base URL of the Canteen REST API (e.g. `http://localhost:5000/api`)
//!
//! ## Optional
//! - `CANTEEN_EVENTS_URL` - Server event stream (default: `{api origin}/events`)
//! - `CANTEEN_ASSET_URL` - Origin product images are served from (default: API origin)
//! - `CANTEEN_API_TIMEOUT_SECS` - Per-request timeout (default: 15)
//! - `CANTEEN_UPLOAD_TIMEOUT_SECS` - Image upload timeout (default: 30)
//! - `CANTEEN_PICKUP_STREET`, `CANTEEN_PICKUP_CITY`, `CANTEEN_PICKUP_STATE`,
//!   `CANTEEN_PICKUP_POSTAL_CODE`, `CANTEEN_PICKUP_COUNTRY` - Address sent with orders
//! - `NOTIFICATION_CAPACITY` - Notifications kept per session (default: 50)
//! - `NOTIFICATION_TTL_SECS` - Seconds before a notification disappears (default: 5)
//! - `STOREFRONT_HOST` - Bind address (default: 127.0.0.1)
//! - `STOREFRONT_PORT` - Listen port (default: 3000)
//! - `STOREFRONT_BASE_URL` - Public URL for the storefront (default: `http://localhost:3000`)
//! - `SENTRY_DSN` - Sentry error tracking DSN
//! - `SENTRY_ENVIRONMENT` - Sentry environment name
//! - `SENTRY_SAMPLE_RATE` - Error sample rate (default: 1.0)
//! - `SENTRY_TRACES_SAMPLE_RATE` - Transaction sample rate (default: 0.0)

use std::net::{IpAddr, SocketAddr};
use std::str::FromStr;
use std::time::Duration;

use secrecy::{ExposeSecret, SecretString};
use serde::Serialize;
use thiserror::Error;
use url::Url;

/// Configuration errors that can occur during loading.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Missing environment variable: {0}")]
    MissingEnvVar(String),
    #[error("Invalid environment variable {0}: {1}")]
    InvalidEnvVar(String, String),
}

/// Storefront application configuration.
#[derive(Debug, Clone)]
pub struct StorefrontConfig {
    /// IP address to bind the server to
    pub host: IpAddr,
    /// Port to listen on
    pub port: u16,
    /// Public base URL for the storefront
    pub base_url: String,
    /// Canteen API connection settings
    pub api: CanteenApiConfig,
    /// Address attached to every placed order
    pub pickup_address: PickupAddress,
    /// Real-time notification settings
    pub notifications: NotificationConfig,
    /// Sentry settings
    pub sentry: SentryConfig,
}

/// Canteen REST API configuration.
#[derive(Debug, Clone)]
pub struct CanteenApiConfig {
    /// Base URL all REST paths are joined onto (always ends with `/`)
    pub base_url: Url,
    /// Server-sent event stream for real-time updates
    pub events_url: Url,
    /// Origin that relative image paths are resolved against
    pub asset_url: Url,
    /// Timeout for ordinary API calls
    pub timeout: Duration,
    /// Timeout for multipart image uploads
    pub upload_timeout: Duration,
}

/// Pickup address sent with orders. The canteen only supports collection
/// at the counter, so this is fixed per deployment.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PickupAddress {
    pub street: String,
    pub city: String,
    pub state: String,
    pub postal_code: String,
    pub country: String,
}

impl Default for PickupAddress {
    fn default() -> Self {
        Self {
            street: "337/1A, Vengal Village".to_owned(),
            city: "Chennai".to_owned(),
            state: "TamilNadu".to_owned(),
            postal_code: "601103".to_owned(),
            country: "India".to_owned(),
        }
    }
}

/// Limits for the per-session notification list.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NotificationConfig {
    /// Maximum notifications retained (newest first)
    pub capacity: usize,
    /// Lifetime of a single notification
    pub ttl: Duration,
    /// Maximum toasts shown at once
    pub visible: usize,
}

impl Default for NotificationConfig {
    fn default() -> Self {
        Self {
            capacity: 50,
            ttl: Duration::from_secs(5),
            visible: 3,
        }
    }
}

/// Sentry error tracking configuration.
///
/// Implements `Debug` manually to redact the DSN.
#[derive(Clone, Default)]
pub struct SentryConfig {
    pub dsn: Option<SecretString>,
    pub environment: Option<String>,
    pub sample_rate: f32,
    pub traces_sample_rate: f32,
}

impl std::fmt::Debug for SentryConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SentryConfig")
            .field("dsn", &self.dsn.as_ref().map(|_| "[REDACTED]"))
            .field("environment", &self.environment)
            .field("sample_rate", &self.sample_rate)
            .field("traces_sample_rate", &self.traces_sample_rate)
            .finish()
    }
}

impl SentryConfig {
    /// The DSN as a plain string, when configured.
    #[must_use]
    pub fn dsn(&self) -> Option<&str> {
        self.dsn.as_ref().map(ExposeSecret::expose_secret)
    }
}

impl StorefrontConfig {
    /// Load configuration from environment variables.
    ///
    /// Calls `dotenvy::dotenv()` to load from `.env` file if present.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if required variables are missing or invalid.
    pub fn from_env() -> Result<Self, ConfigError> {
        // Load .env file if present (ignore errors if not found)
        let _ = dotenvy::dotenv();

        let host = parse_env("STOREFRONT_HOST", "127.0.0.1")?;
        let port = parse_env("STOREFRONT_PORT", "3000")?;
        let base_url = get_env_or_default("STOREFRONT_BASE_URL", "http://localhost:3000");

        Ok(Self {
            host,
            port,
            base_url,
            api: CanteenApiConfig::from_env()?,
            pickup_address: PickupAddress::from_env(),
            notifications: NotificationConfig::from_env()?,
            sentry: SentryConfig::from_env()?,
        })
    }

    /// Returns the socket address for binding the server.
    #[must_use]
    pub const fn socket_addr(&self) -> SocketAddr {
        SocketAddr::new(self.host, self.port)
    }

    /// Whether cookies should carry the `Secure` flag.
    #[must_use]
    pub fn is_secure(&self) -> bool {
        self.base_url.starts_with("https://")
    }

    /// Local defaults around an explicit API config. Used by tests and
    /// local tooling.
    #[must_use]
    pub fn with_api(api: CanteenApiConfig) -> Self {
        Self {
            host: IpAddr::from([127, 0, 0, 1]),
            port: 3000,
            base_url: "http://localhost:3000".to_string(),
            api,
            pickup_address: PickupAddress::default(),
            notifications: NotificationConfig::default(),
            sentry: SentryConfig::default(),
        }
    }
}

impl CanteenApiConfig {
    fn from_env() -> Result<Self, ConfigError> {
        let base_url = parse_url("CANTEEN_API_URL", &get_required_env("CANTEEN_API_URL")?)?;
        let origin = origin_of(&base_url);

        let events_url = match get_optional_env("CANTEEN_EVENTS_URL") {
            Some(raw) => parse_absolute_url("CANTEEN_EVENTS_URL", &raw)?,
            None => origin.join("events").map_err(|e| {
                ConfigError::InvalidEnvVar("CANTEEN_API_URL".to_string(), e.to_string())
            })?,
        };
        let asset_url = match get_optional_env("CANTEEN_ASSET_URL") {
            Some(raw) => parse_absolute_url("CANTEEN_ASSET_URL", &raw)?,
            None => origin,
        };

        Ok(Self {
            base_url,
            events_url,
            asset_url,
            timeout: Duration::from_secs(parse_env("CANTEEN_API_TIMEOUT_SECS", "15")?),
            upload_timeout: Duration::from_secs(parse_env("CANTEEN_UPLOAD_TIMEOUT_SECS", "30")?),
        })
    }

    /// Absolute URL for a product image.
    ///
    /// The API stores uploads as paths relative to its origin; absolute
    /// URLs are returned unchanged.
    #[must_use]
    pub fn asset(&self, path: &str) -> String {
        let path = path.trim();
        if path.is_empty() || path.starts_with("http://") || path.starts_with("https://") {
            return path.to_string();
        }
        self.asset_url
            .join(path.trim_start_matches('/'))
            .map_or_else(|_| path.to_string(), String::from)
    }

    /// Build a config pointing every URL at one API base. Used by tests and
    /// local tooling.
    ///
    /// # Errors
    ///
    /// Returns an error if `base` is not an absolute URL.
    pub fn for_base(base: &str) -> Result<Self, ConfigError> {
        let base_url = parse_url("CANTEEN_API_URL", base)?;
        let origin = origin_of(&base_url);
        let events_url = base_url
            .join("events")
            .map_err(|e| ConfigError::InvalidEnvVar("CANTEEN_API_URL".to_string(), e.to_string()))?;
        Ok(Self {
            base_url,
            events_url,
            asset_url: origin,
            timeout: Duration::from_secs(15),
            upload_timeout: Duration::from_secs(30),
        })
    }
}

impl PickupAddress {
    fn from_env() -> Self {
        let default = Self::default();
        Self {
            street: get_optional_env("CANTEEN_PICKUP_STREET").unwrap_or(default.street),
            city: get_optional_env("CANTEEN_PICKUP_CITY").unwrap_or(default.city),
            state: get_optional_env("CANTEEN_PICKUP_STATE").unwrap_or(default.state),
            postal_code: get_optional_env("CANTEEN_PICKUP_POSTAL_CODE")
                .unwrap_or(default.postal_code),
            country: get_optional_env("CANTEEN_PICKUP_COUNTRY").unwrap_or(default.country),
        }
    }
}

impl NotificationConfig {
    fn from_env() -> Result<Self, ConfigError> {
        let capacity: usize = parse_env("NOTIFICATION_CAPACITY", "50")?;
        if capacity == 0 {
            return Err(ConfigError::InvalidEnvVar(
                "NOTIFICATION_CAPACITY".to_string(),
                "must be at least 1".to_string(),
            ));
        }
        Ok(Self {
            capacity,
            ttl: Duration::from_secs(parse_env("NOTIFICATION_TTL_SECS", "5")?),
            ..Self::default()
        })
    }
}

impl SentryConfig {
    fn from_env() -> Result<Self, ConfigError> {
        Ok(Self {
            dsn: get_optional_env("SENTRY_DSN").map(SecretString::from),
            environment: get_optional_env("SENTRY_ENVIRONMENT"),
            sample_rate: parse_env("SENTRY_SAMPLE_RATE", "1.0")?,
            traces_sample_rate: parse_env("SENTRY_TRACES_SAMPLE_RATE", "0.0")?,
        })
    }
}

// =============================================================================
// Helper Functions
// =============================================================================

/// Get a required environment variable.
fn get_required_env(key: &str) -> Result<String, ConfigError> {
    std::env::var(key).map_err(|_| ConfigError::MissingEnvVar(key.to_string()))
}

/// Get an optional environment variable. Empty values count as unset.
fn get_optional_env(key: &str) -> Option<String> {
    std::env::var(key).ok().filter(|v| !v.trim().is_empty())
}

/// Get an environment variable with a default value.
fn get_env_or_default(key: &str, default: &str) -> String {
    get_optional_env(key).unwrap_or_else(|| default.to_string())
}

/// Parse an environment variable (or its default) into `T`.
fn parse_env<T>(key: &str, default: &str) -> Result<T, ConfigError>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    get_env_or_default(key, default)
        .parse::<T>()
        .map_err(|e| ConfigError::InvalidEnvVar(key.to_string(), e.to_string()))
}

/// Parse an absolute URL as given.
fn parse_absolute_url(key: &str, raw: &str) -> Result<Url, ConfigError> {
    Url::parse(raw.trim()).map_err(|e| ConfigError::InvalidEnvVar(key.to_string(), e.to_string()))
}

/// Parse a base URL. A trailing slash is added so `Url::join` appends to
/// the path rather than replacing its last segment.
fn parse_url(key: &str, raw: &str) -> Result<Url, ConfigError> {
    let mut raw = raw.trim().to_string();
    if !raw.ends_with('/') {
        raw.push('/');
    }
    parse_absolute_url(key, &raw)
}

/// Scheme, host and port of a URL with an empty path.
fn origin_of(url: &Url) -> Url {
    let mut origin = url.clone();
    origin.set_path("/");
    origin.set_query(None);
    origin.set_fragment(None);
    origin
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_url_adds_trailing_slash() {
        let url = parse_url("X", "http://localhost:5000/api").unwrap();
        assert_eq!(url.as_str(), "http://localhost:5000/api/");
        assert_eq!(
            url.join("orders/cart").unwrap().as_str(),
            "http://localhost:5000/api/orders/cart"
        );
    }

    #[test]
    fn test_parse_url_rejects_relative() {
        let err = parse_url("CANTEEN_API_URL", "/api").unwrap_err();
        assert!(matches!(err, ConfigError::InvalidEnvVar(key, _) if key == "CANTEEN_API_URL"));
    }

    #[test]
    fn test_origin_strips_path() {
        let url = Url::parse("https://canteen.example.com:8443/api/v1/?x=1").unwrap();
        assert_eq!(origin_of(&url).as_str(), "https://canteen.example.com:8443/");
    }

    #[test]
    fn test_for_base_derives_urls() {
        let api = CanteenApiConfig::for_base("http://127.0.0.1:9000/api").unwrap();
        assert_eq!(api.events_url.as_str(), "http://127.0.0.1:9000/api/events");
        assert_eq!(api.asset_url.as_str(), "http://127.0.0.1:9000/");
    }

    #[test]
    fn test_asset_resolution() {
        let api = CanteenApiConfig::for_base("http://localhost:5000/api").unwrap();
        assert_eq!(
            api.asset("/uploads/tea.jpg"),
            "http://localhost:5000/uploads/tea.jpg"
        );
        assert_eq!(
            api.asset("https://cdn.example.com/tea.jpg"),
            "https://cdn.example.com/tea.jpg"
        );
        assert_eq!(api.asset(""), "");
    }

    #[test]
    fn test_socket_addr_and_secure_flag() {
        let config = StorefrontConfig {
            host: "127.0.0.1".parse().unwrap(),
            port: 3000,
            base_url: "https://canteen.example.com".to_string(),
            api: CanteenApiConfig::for_base("http://localhost:5000/api").unwrap(),
            pickup_address: PickupAddress::default(),
            notifications: NotificationConfig::default(),
            sentry: SentryConfig::default(),
        };

        let addr = config.socket_addr();
        assert_eq!(addr.ip().to_string(), "127.0.0.1");
        assert_eq!(addr.port(), 3000);
        assert!(config.is_secure());
    }

    #[test]
    fn test_sentry_config_debug_redacts_dsn() {
        let config = SentryConfig {
            dsn: Some(SecretString::from("https://key@sentry.example.com/1")),
            environment: Some("production".to_string()),
            sample_rate: 1.0,
            traces_sample_rate: 0.0,
        };

        let debug_output = format!("{config:?}");
        assert!(debug_output.contains("production"));
        assert!(debug_output.contains("[REDACTED]"));
        assert!(!debug_output.contains("sentry.example.com"));
    }

    #[test]
    fn test_notification_defaults() {
        let n = NotificationConfig::default();
        assert_eq!(n.capacity, 50);
        assert_eq!(n.ttl, Duration::from_secs(5));
        assert_eq!(n.visible, 3);
    }
}
