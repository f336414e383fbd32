//! Session-related types.
//!
//! Types stored in the (server-side) session for authentication state and
//! one-shot flash messages.

use canteen_core::notifications::NotificationKind;
use canteen_core::{Role, UserId};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::api::User;

/// Session-stored user identity.
///
/// A copy of the API's user record, refreshed from `GET /auth/me` once it
/// is older than [`CurrentUser::REVALIDATE_AFTER_SECS`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CurrentUser {
    pub id: UserId,
    pub full_name: String,
    pub email: String,
    pub phone: Option<String>,
    pub role: Role,
    /// When the record was last confirmed by the API.
    pub verified_at: DateTime<Utc>,
}

impl CurrentUser {
    /// How long a cached user is trusted without asking the API.
    pub const REVALIDATE_AFTER_SECS: i64 = 5 * 60;

    #[must_use]
    pub fn from_api(user: &User, now: DateTime<Utc>) -> Self {
        Self {
            id: user.id.clone(),
            full_name: user.full_name.clone(),
            email: user.email.clone(),
            phone: user.phone.clone(),
            role: user.role,
            verified_at: now,
        }
    }

    #[must_use]
    pub fn is_stale(&self, now: DateTime<Utc>) -> bool {
        (now - self.verified_at).num_seconds() >= Self::REVALIDATE_AFTER_SECS
    }

    #[must_use]
    pub const fn is_admin(&self) -> bool {
        matches!(self.role, Role::Admin)
    }

    #[must_use]
    pub const fn is_kitchen(&self) -> bool {
        matches!(self.role, Role::Kitchen)
    }

    /// Customers and admins may shop.
    #[must_use]
    pub const fn can_shop(&self) -> bool {
        matches!(self.role, Role::User | Role::Admin)
    }

    /// First letter of the name for the avatar bubble.
    #[must_use]
    pub fn initial(&self) -> String {
        self.full_name
            .chars()
            .next()
            .map(|c| c.to_uppercase().collect())
            .unwrap_or_default()
    }
}

/// A one-shot message rendered on the next page.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Flash {
    pub kind: NotificationKind,
    pub message: String,
}

impl Flash {
    #[must_use]
    pub fn new(kind: NotificationKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }

    #[must_use]
    pub fn success(message: impl Into<String>) -> Self {
        Self::new(NotificationKind::Success, message)
    }

    #[must_use]
    pub fn error(message: impl Into<String>) -> Self {
        Self::new(NotificationKind::Error, message)
    }

    #[must_use]
    pub fn warning(message: impl Into<String>) -> Self {
        Self::new(NotificationKind::Warning, message)
    }

    #[must_use]
    pub fn info(message: impl Into<String>) -> Self {
        Self::new(NotificationKind::Info, message)
    }

    /// CSS modifier for the toast.
    #[must_use]
    pub const fn css(&self) -> &'static str {
        self.kind.as_str()
    }
}

/// Session keys for authentication data.
pub mod keys {
    /// Key for storing the current logged-in user.
    pub const CURRENT_USER: &str = "current_user";

    /// Key for the upstream API session cookie.
    pub const API_COOKIE: &str = "api_cookie";

    /// Key for the id of this session's notification bridge.
    pub const BRIDGE_ID: &str = "bridge_id";

    /// Key for pending flash messages.
    pub const FLASHES: &str = "flashes";
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn user(role: Role, at: DateTime<Utc>) -> CurrentUser {
        CurrentUser {
            id: UserId::new("u1"),
            full_name: "asha".into(),
            email: "asha@example.com".into(),
            phone: None,
            role,
            verified_at: at,
        }
    }

    #[test]
    fn test_staleness() {
        let now = Utc::now();
        assert!(!user(Role::User, now).is_stale(now + Duration::seconds(299)));
        assert!(user(Role::User, now).is_stale(now + Duration::seconds(300)));
    }

    #[test]
    fn test_role_helpers() {
        let now = Utc::now();
        assert!(user(Role::Admin, now).can_shop());
        assert!(user(Role::User, now).can_shop());
        assert!(!user(Role::Kitchen, now).can_shop());
        assert!(user(Role::Kitchen, now).is_kitchen());
        assert_eq!(user(Role::User, now).initial(), "A");
    }
}
