//! Role-based access decisions for screens.
//!
//! The gate is evaluated against the locally cached session user before a
//! page renders. It never talks to the API; the server remains the
//! authority on what a user may actually do.

use crate::types::Role;

/// Which roles may open a screen.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Audience {
    /// Anyone, signed in or not.
    Public,
    /// Any signed-in user regardless of role.
    Authenticated,
    /// Signed-in users holding one of the listed roles.
    Roles(&'static [Role]),
}

/// Outcome of an access check.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Access {
    /// Render the screen.
    Allow,
    /// Nobody is signed in: send them to the login screen.
    Login,
    /// Signed in with the wrong role: send them home.
    Home,
}

/// Customers and admins (cart, orders, favorites).
pub const SHOPPERS: &[Role] = &[Role::User, Role::Admin];
/// Admin-only management screens.
pub const ADMINS: &[Role] = &[Role::Admin];
/// The kitchen order queue.
pub const KITCHEN: &[Role] = &[Role::Kitchen];

impl Audience {
    /// Decide whether a user with `role` (or nobody) may open the screen.
    #[must_use]
    pub fn check(self, role: Option<Role>) -> Access {
        match (self, role) {
            (Self::Public, _) => Access::Allow,
            (_, None) => Access::Login,
            (Self::Authenticated, Some(_)) => Access::Allow,
            (Self::Roles(allowed), Some(role)) if allowed.contains(&role) => Access::Allow,
            (Self::Roles(_), Some(_)) => Access::Home,
        }
    }
}

/// Audience for a screen path.
///
/// Unlisted paths are public; the API still enforces its own rules.
#[must_use]
pub fn audience_for(path: &str) -> Audience {
    let under = |prefix: &str| {
        path == prefix
            || path
                .strip_prefix(prefix)
                .is_some_and(|rest| rest.starts_with('/'))
    };

    if under("/admin") {
        Audience::Roles(ADMINS)
    } else if under("/kitchen") {
        Audience::Roles(KITCHEN)
    } else if under("/cart") || under("/orders") || under("/favorites") {
        Audience::Roles(SHOPPERS)
    } else if under("/profile") || under("/notifications") {
        Audience::Authenticated
    } else {
        Audience::Public
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_public_paths_allow_everyone() {
        for path in ["/", "/menu", "/products/abc", "/auth/login"] {
            assert_eq!(audience_for(path).check(None), Access::Allow, "{path}");
        }
    }

    #[test]
    fn test_missing_user_goes_to_login() {
        for path in ["/cart", "/orders", "/favorites", "/profile", "/admin", "/kitchen"] {
            assert_eq!(audience_for(path).check(None), Access::Login, "{path}");
        }
    }

    #[test]
    fn test_role_mismatch_goes_home() {
        assert_eq!(
            audience_for("/admin/staff").check(Some(Role::User)),
            Access::Home
        );
        assert_eq!(
            audience_for("/kitchen").check(Some(Role::Admin)),
            Access::Home
        );
        assert_eq!(
            audience_for("/cart").check(Some(Role::Kitchen)),
            Access::Home
        );
    }

    #[test]
    fn test_matching_roles_allowed() {
        assert_eq!(audience_for("/cart").check(Some(Role::Admin)), Access::Allow);
        assert_eq!(audience_for("/orders").check(Some(Role::User)), Access::Allow);
        assert_eq!(
            audience_for("/kitchen").check(Some(Role::Kitchen)),
            Access::Allow
        );
        assert_eq!(
            audience_for("/profile").check(Some(Role::Kitchen)),
            Access::Allow
        );
    }

    #[test]
    fn test_prefix_must_end_at_segment_boundary() {
        assert_eq!(audience_for("/administrator"), Audience::Public);
        assert_eq!(audience_for("/admin/products/new"), Audience::Roles(ADMINS));
    }
}
