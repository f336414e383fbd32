//! Staff accounts: kitchen and admin users.

use askama::Template;
use askama_web::WebTemplate;
use axum::{
    Form,
    extract::{Path, State},
    response::{IntoResponse, Response},
};
use canteen_core::validation::{self, ValidationError};
use canteen_core::{Role, UserId};
use serde::Deserialize;
use tower_sessions::Session;
use tracing::{info, instrument, warn};

use crate::api::{StaffInput, User};
use crate::error::AppError;
use crate::filters;
use crate::middleware::RequireAuth;
use crate::models::Flash;
use crate::routes::page::{Page, redirect_with, redirect_with_error};
use crate::state::AppState;

const STAFF_PATH: &str = "/admin/staff";

/// Roles a staff account may hold.
pub const STAFF_ROLES: [Role; 2] = [Role::Kitchen, Role::Admin];

/// A staff member row.
#[derive(Clone)]
pub struct StaffView {
    pub id: String,
    pub name: String,
    pub email: String,
    pub phone: String,
    pub role: String,
}

impl From<&User> for StaffView {
    fn from(user: &User) -> Self {
        Self {
            id: user.id.to_string(),
            name: user.full_name.clone(),
            email: user.email.clone(),
            phone: user.phone.clone().unwrap_or_default(),
            role: user.role.to_string(),
        }
    }
}

impl StaffView {
    #[must_use]
    pub fn has_role(&self, role: &str) -> bool {
        self.role == role
    }
}

/// Staff page template.
#[derive(Template, WebTemplate)]
#[template(path = "admin/staff.html")]
pub struct StaffTemplate {
    pub page: Page,
    pub staff: Vec<StaffView>,
    pub roles: Vec<&'static str>,
    pub error: Option<String>,
}

/// Add or edit staff form.
#[derive(Debug, Deserialize)]
pub struct StaffForm {
    pub full_name: String,
    pub email: String,
    #[serde(default)]
    pub phone: String,
    /// Required when adding; left blank on edit to keep the current one.
    #[serde(default)]
    pub password: String,
    pub role: String,
}

impl StaffForm {
    fn into_input(self, creating: bool) -> Result<StaffInput, ValidationError> {
        let full_name = validation::required("Full name", &self.full_name)?.to_owned();
        let email = validation::email(&self.email)?;
        let role = self
            .role
            .parse::<Role>()
            .ok()
            .filter(|r| STAFF_ROLES.contains(r))
            .ok_or(ValidationError::Required("Role"))?;

        let password = if creating || !self.password.is_empty() {
            validation::required("Password", &self.password)?;
            validation::new_password(&self.password, &self.password)?;
            Some(self.password)
        } else {
            None
        };

        Ok(StaffInput {
            full_name,
            email,
            phone: self.phone.trim().to_owned(),
            password,
            role,
        })
    }
}

/// Display every staff account.
#[instrument(skip(state, page, auth))]
pub async fn index(
    State(state): State<AppState>,
    page: Page,
    RequireAuth(auth): RequireAuth,
) -> Response {
    let roles = STAFF_ROLES.iter().map(Role::as_str).collect();
    match state.api().staff(&auth.api).await {
        Ok(staff) => StaffTemplate {
            page,
            staff: staff.iter().map(StaffView::from).collect(),
            roles,
            error: None,
        }
        .into_response(),
        Err(e) if e.is_unauthorized() => AppError::from(e).into_response(),
        Err(e) => {
            warn!(error = %e, "Error fetching staff");
            StaffTemplate {
                page,
                staff: Vec::new(),
                roles,
                error: Some("Failed to load staff".to_owned()),
            }
            .into_response()
        }
    }
}

/// Add a staff account.
#[instrument(skip(state, session, auth, form))]
pub async fn create(
    State(state): State<AppState>,
    session: Session,
    RequireAuth(auth): RequireAuth,
    Form(form): Form<StaffForm>,
) -> Response {
    let input = match form.into_input(true) {
        Ok(input) => input,
        Err(e) => return redirect_with(&session, STAFF_PATH, Flash::error(e.to_string())).await,
    };

    match state.api().create_staff(&auth.api, &input).await {
        Ok(()) => {
            info!(email = %input.email, role = %input.role, "Staff member added");
            redirect_with(&session, STAFF_PATH, Flash::success("Staff member added")).await
        }
        Err(e) => redirect_with_error(&session, STAFF_PATH, &e).await,
    }
}

/// Edit a staff account.
#[instrument(skip(state, session, auth, form), fields(staff_id = %id))]
pub async fn update(
    State(state): State<AppState>,
    session: Session,
    RequireAuth(auth): RequireAuth,
    Path(id): Path<String>,
    Form(form): Form<StaffForm>,
) -> Response {
    let input = match form.into_input(false) {
        Ok(input) => input,
        Err(e) => return redirect_with(&session, STAFF_PATH, Flash::error(e.to_string())).await,
    };

    match state
        .api()
        .update_staff(&auth.api, &UserId::new(id), &input)
        .await
    {
        Ok(()) => redirect_with(&session, STAFF_PATH, Flash::success("Staff member updated")).await,
        Err(e) => redirect_with_error(&session, STAFF_PATH, &e).await,
    }
}

/// Delete a staff account. The page asks for confirmation first.
#[instrument(skip(state, session, auth), fields(staff_id = %id))]
pub async fn delete(
    State(state): State<AppState>,
    session: Session,
    RequireAuth(auth): RequireAuth,
    Path(id): Path<String>,
) -> Response {
    if id == auth.user.id.as_str() {
        return redirect_with(
            &session,
            STAFF_PATH,
            Flash::warning("You cannot delete your own account"),
        )
        .await;
    }

    match state.api().delete_staff(&auth.api, &UserId::new(id)).await {
        Ok(()) => redirect_with(&session, STAFF_PATH, Flash::success("Staff member deleted")).await,
        Err(e) => redirect_with_error(&session, STAFF_PATH, &e).await,
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn form(password: &str, role: &str) -> StaffForm {
        StaffForm {
            full_name: " Meena ".into(),
            email: "Meena@Canteen.in".into(),
            phone: "9876543210".into(),
            password: password.into(),
            role: role.into(),
        }
    }

    #[test]
    fn test_new_staff_needs_password() {
        assert_eq!(
            form("", "kitchen").into_input(true),
            Err(ValidationError::Required("Password"))
        );
        let input = form("secret1", "kitchen").into_input(true).unwrap();
        assert_eq!(input.full_name, "Meena");
        assert_eq!(input.email, "meena@canteen.in");
        assert_eq!(input.password.as_deref(), Some("secret1"));
        assert_eq!(input.role, Role::Kitchen);
    }

    #[test]
    fn test_edit_keeps_password_when_blank() {
        let input = form("", "admin").into_input(false).unwrap();
        assert!(input.password.is_none());
        assert_eq!(
            form("abc", "admin").into_input(false),
            Err(ValidationError::PasswordTooShort { min: 6 })
        );
    }

    #[test]
    fn test_customer_role_is_refused() {
        assert_eq!(
            form("secret1", "user").into_input(true),
            Err(ValidationError::Required("Role"))
        );
    }
}
