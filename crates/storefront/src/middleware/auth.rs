//! Authentication middleware and extractors.
//!
//! Provides extractors for requiring a signed-in user in route handlers, the
//! session helpers used at login and logout, and the role gate that guards
//! every screen before its handler runs.

use axum::{
    extract::{FromRequestParts, Request, State},
    http::{HeaderMap, StatusCode, header, request::Parts},
    middleware::Next,
    response::{IntoResponse, Redirect, Response},
};
use canteen_core::access::{Access, Audience, audience_for};
use chrono::Utc;
use tower_sessions::Session;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::api::{ApiError, ApiSession, User};
use crate::error::{clear_sentry_user, set_sentry_user};
use crate::middleware::flash::push_flash;
use crate::models::{CurrentUser, Flash, session_keys};
use crate::state::AppState;

/// Login screen.
pub const LOGIN_PATH: &str = "/auth/login";

/// Message shown when the upstream session has lapsed.
pub const SESSION_EXPIRED_MESSAGE: &str = "Your session has expired. Please log in again.";

/// Everything a signed-in request carries.
#[derive(Debug, Clone)]
pub struct AuthSession {
    pub user: CurrentUser,
    /// Upstream session cookie replayed on API calls.
    pub api: ApiSession,
    /// Key of this browser session's notification bridge.
    pub bridge_id: String,
}

/// Extractor that requires a signed-in user.
///
/// If nobody is logged in, returns a redirect to the login page.
///
/// # Example
///
/// ```rust,ignore
/// async fn protected_handler(
///     RequireAuth(auth): RequireAuth,
/// ) -> impl IntoResponse {
///     format!("Hello, {}!", auth.user.full_name)
/// }
/// ```
pub struct RequireAuth(pub AuthSession);

/// Error returned when authentication is required but nobody is logged in.
pub enum AuthRejection {
    /// Redirect to login page (for HTML requests).
    RedirectToLogin,
    /// Unauthorized response (for JSON and event-stream requests).
    Unauthorized,
}

impl IntoResponse for AuthRejection {
    fn into_response(self) -> Response {
        match self {
            Self::RedirectToLogin => Redirect::to(LOGIN_PATH).into_response(),
            Self::Unauthorized => StatusCode::UNAUTHORIZED.into_response(),
        }
    }
}

/// Whether the caller expects a machine-readable answer rather than a page.
#[must_use]
pub fn wants_json(path: &str, headers: &HeaderMap) -> bool {
    path.starts_with("/notifications/stream")
        || headers
            .get(header::ACCEPT)
            .and_then(|v| v.to_str().ok())
            .is_some_and(|accept| {
                accept.contains("application/json") || accept.contains("text/event-stream")
            })
}

impl<S> FromRequestParts<S> for RequireAuth
where
    S: Send + Sync,
{
    type Rejection = AuthRejection;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        // Get the session from extensions (set by SessionManagerLayer)
        let session = parts
            .extensions
            .get::<Session>()
            .ok_or(AuthRejection::Unauthorized)?;

        load_auth(session).await.map(Self).ok_or_else(|| {
            if wants_json(parts.uri.path(), &parts.headers) {
                AuthRejection::Unauthorized
            } else {
                AuthRejection::RedirectToLogin
            }
        })
    }
}

/// Extractor that optionally gets the signed-in user.
///
/// Unlike `RequireAuth`, this does not reject the request if nobody is logged in.
pub struct OptionalAuth(pub Option<AuthSession>);

impl<S> FromRequestParts<S> for OptionalAuth
where
    S: Send + Sync,
{
    type Rejection = std::convert::Infallible;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let auth = match parts.extensions.get::<Session>() {
            Some(session) => load_auth(session).await,
            None => None,
        };

        Ok(Self(auth))
    }
}

/// Read the signed-in user from the session.
///
/// Returns `None` unless the user, the API cookie and the bridge id are
/// all present.
pub async fn load_auth(session: &Session) -> Option<AuthSession> {
    let user: CurrentUser = session
        .get(session_keys::CURRENT_USER)
        .await
        .ok()
        .flatten()?;
    let cookie: String = session
        .get(session_keys::API_COOKIE)
        .await
        .ok()
        .flatten()?;
    let bridge_id: String = session
        .get(session_keys::BRIDGE_ID)
        .await
        .ok()
        .flatten()?;

    Some(AuthSession {
        user,
        api: ApiSession::new(cookie),
        bridge_id,
    })
}

/// Store a freshly authenticated user in the session.
///
/// Rotates the session id to prevent fixation and returns the new bridge id.
///
/// # Errors
///
/// Returns an error if the session cannot be modified.
pub async fn set_current_user(
    session: &Session,
    user: &User,
    api: &ApiSession,
) -> Result<String, tower_sessions::session::Error> {
    session.cycle_id().await?;

    let bridge_id = Uuid::new_v4().to_string();
    session
        .insert(session_keys::CURRENT_USER, CurrentUser::from_api(user, Utc::now()))
        .await?;
    session
        .insert(session_keys::API_COOKIE, api.cookie())
        .await?;
    session.insert(session_keys::BRIDGE_ID, &bridge_id).await?;

    set_sentry_user(&user.id, Some(&user.email));
    Ok(bridge_id)
}

/// Helper to clear the signed-in user from the session (logout).
///
/// Flash messages survive so the next page can still show them.
///
/// # Errors
///
/// Returns an error if the session cannot be modified.
pub async fn clear_current_user(session: &Session) -> Result<(), tower_sessions::session::Error> {
    session
        .remove::<CurrentUser>(session_keys::CURRENT_USER)
        .await?;
    session.remove::<String>(session_keys::API_COOKIE).await?;
    session.remove::<String>(session_keys::BRIDGE_ID).await?;
    clear_sentry_user();
    Ok(())
}

/// End a session whose upstream cookie is no longer accepted.
///
/// Tears down the notification bridge, forgets the user and queues the
/// expiry message for the login page.
pub async fn expire_session(state: &AppState, session: &Session) {
    if let Some(bridge_id) = session
        .get::<String>(session_keys::BRIDGE_ID)
        .await
        .ok()
        .flatten()
    {
        state.notifications().disconnect(&bridge_id).await;
    }
    if let Err(e) = clear_current_user(session).await {
        tracing::error!(error = %e, "Failed to clear expired session");
    }
    push_flash(session, Flash::error(SESSION_EXPIRED_MESSAGE)).await;
    info!("Session expired");
}

/// Role gate run before every handler.
///
/// Public screens pass straight through. For guarded screens the cached
/// user is re-checked against `GET /auth/me` once it is stale; if the API
/// no longer accepts the session the user is signed out. A network failure
/// keeps the cached user.
pub async fn access_gate(
    State(state): State<AppState>,
    session: Session,
    request: Request,
    next: Next,
) -> Response {
    let path = request.uri().path().to_owned();
    let audience = audience_for(&path);
    if audience == Audience::Public {
        return next.run(request).await;
    }
    let json = wants_json(&path, request.headers());

    let mut user: Option<CurrentUser> = session
        .get(session_keys::CURRENT_USER)
        .await
        .ok()
        .flatten();

    if let Some(current) = user.as_ref().filter(|u| u.is_stale(Utc::now())) {
        match revalidate(&state, &session, current).await {
            Revalidation::Fresh(fresh) => user = Some(fresh),
            Revalidation::Kept => {}
            Revalidation::Expired => {
                expire_session(&state, &session).await;
                return if json {
                    StatusCode::UNAUTHORIZED.into_response()
                } else {
                    Redirect::to(LOGIN_PATH).into_response()
                };
            }
        }
    }

    match audience.check(user.as_ref().map(|u| u.role)) {
        Access::Allow => next.run(request).await,
        Access::Login if json => StatusCode::UNAUTHORIZED.into_response(),
        Access::Login => Redirect::to(LOGIN_PATH).into_response(),
        Access::Home if json => StatusCode::FORBIDDEN.into_response(),
        Access::Home => {
            debug!(path = %path, "Role not allowed, sending home");
            Redirect::to("/").into_response()
        }
    }
}

enum Revalidation {
    Fresh(CurrentUser),
    Kept,
    Expired,
}

async fn revalidate(state: &AppState, session: &Session, current: &CurrentUser) -> Revalidation {
    let Some(cookie) = session
        .get::<String>(session_keys::API_COOKIE)
        .await
        .ok()
        .flatten()
    else {
        return Revalidation::Expired;
    };

    match state.api().me(&ApiSession::new(cookie)).await {
        Ok(user) => {
            let fresh = CurrentUser::from_api(&user, Utc::now());
            if let Err(e) = session.insert(session_keys::CURRENT_USER, &fresh).await {
                warn!(error = %e, "Failed to store refreshed user");
            }
            Revalidation::Fresh(fresh)
        }
        Err(ApiError::Unauthorized(_)) => Revalidation::Expired,
        Err(e) => {
            warn!(error = %e, user_id = %current.id, "Could not revalidate session, keeping cached user");
            Revalidation::Kept
        }
    }
}
