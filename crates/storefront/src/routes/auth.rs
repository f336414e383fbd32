//! Authentication route handlers.
//!
//! Handles login, registration and logout against the Canteen API. The
//! API's session cookie is kept in the storefront session and replayed on
//! later calls.

use askama::Template;
use askama_web::WebTemplate;
use axum::{
    Form,
    extract::State,
    response::{IntoResponse, Redirect, Response},
};
use canteen_core::validation;
use serde::Deserialize;
use tower_sessions::Session;
use tracing::{error, info, instrument, warn};

use crate::api::{ApiError, ApiSession, Registration, User};
use crate::filters;
use crate::middleware::auth::{LOGIN_PATH, load_auth};
use crate::middleware::{clear_current_user, expire_session, set_current_user};
use crate::models::{Flash, session_keys};
use crate::routes::page::{Page, redirect_with};
use crate::state::AppState;

// =============================================================================
// Form Types
// =============================================================================

/// Login form data.
#[derive(Debug, Deserialize)]
pub struct LoginForm {
    pub email: String,
    pub password: String,
}

/// Registration form data.
#[derive(Debug, Deserialize)]
pub struct RegisterForm {
    pub full_name: String,
    pub email: String,
    #[serde(default)]
    pub phone: String,
    pub password: String,
    pub password_confirm: String,
}

// =============================================================================
// Templates
// =============================================================================

/// Login page template.
#[derive(Template, WebTemplate)]
#[template(path = "auth/login.html")]
pub struct LoginTemplate {
    pub page: Page,
    pub email: String,
    pub error: Option<String>,
}

/// Register page template.
#[derive(Template, WebTemplate)]
#[template(path = "auth/register.html")]
pub struct RegisterTemplate {
    pub page: Page,
    pub full_name: String,
    pub email: String,
    pub phone: String,
    pub error: Option<String>,
}

// =============================================================================
// Login Routes
// =============================================================================

/// Display the login page. Signed-in users go to their home screen.
pub async fn login_page(page: Page) -> Response {
    if let Some(user) = &page.user {
        return Redirect::to(user.role.home_path()).into_response();
    }
    LoginTemplate {
        page,
        email: String::new(),
        error: None,
    }
    .into_response()
}

/// Handle login form submission.
#[instrument(skip(state, session, page, form), fields(email = %form.email))]
pub async fn login(
    State(state): State<AppState>,
    session: Session,
    page: Page,
    Form(form): Form<LoginForm>,
) -> Response {
    let email = form.email.trim().to_lowercase();
    let render_error = |page, message: String| {
        LoginTemplate {
            page,
            email: email.clone(),
            error: Some(message),
        }
        .into_response()
    };

    if email.is_empty() || form.password.is_empty() {
        return render_error(page, "Email and password are required".to_owned());
    }

    match state.api().login(&email, &form.password).await {
        Ok((user, api)) => start_session(&state, &session, &user, &api).await,
        Err(e) => {
            warn!(error = %e, "Login failed");
            render_error(page, login_message(&e))
        }
    }
}

fn login_message(err: &ApiError) -> String {
    match err {
        ApiError::Unauthorized(message) | ApiError::Status { message, .. }
            if !message.is_empty() =>
        {
            message.clone()
        }
        ApiError::Unauthorized(_) => "Invalid email or password".to_owned(),
        other => other.user_message(),
    }
}

// =============================================================================
// Registration Routes
// =============================================================================

/// Display the registration page.
pub async fn register_page(page: Page) -> Response {
    if let Some(user) = &page.user {
        return Redirect::to(user.role.home_path()).into_response();
    }
    RegisterTemplate {
        page,
        full_name: String::new(),
        email: String::new(),
        phone: String::new(),
        error: None,
    }
    .into_response()
}

/// Handle registration form submission.
#[instrument(skip(state, session, page, form), fields(email = %form.email))]
pub async fn register(
    State(state): State<AppState>,
    session: Session,
    page: Page,
    Form(form): Form<RegisterForm>,
) -> Response {
    let render_error = |page, message: String| {
        RegisterTemplate {
            page,
            full_name: form.full_name.clone(),
            email: form.email.clone(),
            phone: form.phone.clone(),
            error: Some(message),
        }
        .into_response()
    };

    let checked = validation::required("Full name", &form.full_name).and_then(|name| {
        let email = validation::email(&form.email)?;
        validation::new_password(&form.password, &form.password_confirm)?;
        Ok((name, email))
    });
    let (full_name, email) = match checked {
        Ok(values) => values,
        Err(e) => return render_error(page, e.to_string()),
    };

    let registration = Registration {
        full_name,
        email: &email,
        phone: form.phone.trim(),
        password: &form.password,
    };

    match state.api().register(&registration).await {
        Ok((user, api)) => {
            info!(user_id = %user.id, "Account registered");
            start_session(&state, &session, &user, &api).await
        }
        Err(e) => {
            warn!(error = %e, "Registration failed");
            render_error(page, e.user_message())
        }
    }
}

/// Store the user, open their notification bridge and send them home.
///
/// A bridge left behind by a previous user of this browser is torn down.
async fn start_session(
    state: &AppState,
    session: &Session,
    user: &User,
    api: &ApiSession,
) -> Response {
    if let Some(previous) = load_auth(session).await {
        state.notifications().disconnect(&previous.bridge_id).await;
    }

    let bridge_id = match set_current_user(session, user, api).await {
        Ok(bridge_id) => bridge_id,
        Err(e) => {
            error!(error = %e, "Failed to set session");
            return redirect_with(
                session,
                LOGIN_PATH,
                Flash::error("Could not start your session. Please try again."),
            )
            .await;
        }
    };

    state
        .notifications()
        .connect(&bridge_id, &user.id, api)
        .await;
    info!(user_id = %user.id, role = %user.role, "User signed in");

    redirect_with(
        session,
        user.role.home_path(),
        Flash::success(format!("Welcome, {}!", user.full_name)),
    )
    .await
}

// =============================================================================
// Logout & expiry
// =============================================================================

/// Handle logout.
///
/// The upstream logout is best effort; the local session is always ended.
#[instrument(skip(state, session))]
pub async fn logout(State(state): State<AppState>, session: Session) -> Response {
    if let Some(auth) = load_auth(&session).await {
        if let Err(e) = state.api().logout(&auth.api).await {
            warn!(error = %e, "Failed to end upstream session");
        }
        state.notifications().disconnect(&auth.bridge_id).await;
    }

    if let Err(e) = clear_current_user(&session).await {
        error!(error = %e, "Failed to clear session");
    }

    // Also destroy the entire session
    if let Err(e) = session.flush().await {
        error!(error = %e, "Failed to flush session");
    }

    redirect_with(&session, "/", Flash::success("Logged out successfully")).await
}

/// Landing point for requests whose upstream session has lapsed.
#[instrument(skip(state, session))]
pub async fn expired(State(state): State<AppState>, session: Session) -> Response {
    if session
        .get::<String>(session_keys::API_COOKIE)
        .await
        .ok()
        .flatten()
        .is_some()
    {
        expire_session(&state, &session).await;
    }
    Redirect::to(LOGIN_PATH).into_response()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_login_message_prefers_api_text() {
        assert_eq!(
            login_message(&ApiError::Unauthorized("Invalid credentials".into())),
            "Invalid credentials"
        );
        assert_eq!(
            login_message(&ApiError::Unauthorized(String::new())),
            "Invalid email or password"
        );
        assert_eq!(
            login_message(&ApiError::RateLimited(30)),
            "Too many requests. Please wait a moment and try again."
        );
    }
}
