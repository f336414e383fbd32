//! Application state shared across handlers.

use std::sync::Arc;

use crate::api::CanteenClient;
use crate::config::StorefrontConfig;
use crate::services::NotificationHub;

/// Application state shared across all handlers.
///
/// This struct is cheaply cloneable via `Arc` and provides access to
/// the Canteen API client, the notification hub and configuration.
#[derive(Clone)]
pub struct AppState {
    inner: Arc<AppStateInner>,
}

struct AppStateInner {
    config: StorefrontConfig,
    api: CanteenClient,
    notifications: NotificationHub,
}

impl AppState {
    /// Create a new application state.
    ///
    /// Builds the API client and the notification hub from `config`.
    #[must_use]
    pub fn new(config: StorefrontConfig) -> Self {
        let api = CanteenClient::new(&config.api);
        let notifications = NotificationHub::new(api.clone(), config.notifications);

        Self {
            inner: Arc::new(AppStateInner {
                config,
                api,
                notifications,
            }),
        }
    }

    /// Get a reference to the storefront configuration.
    #[must_use]
    pub fn config(&self) -> &StorefrontConfig {
        &self.inner.config
    }

    /// Get a reference to the Canteen API client.
    #[must_use]
    pub fn api(&self) -> &CanteenClient {
        &self.inner.api
    }

    /// Get a reference to the per-session notification hub.
    #[must_use]
    pub fn notifications(&self) -> &NotificationHub {
        &self.inner.notifications
    }
}
