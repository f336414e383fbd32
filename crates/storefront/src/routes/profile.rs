//! Profile route handlers: name, activity stats and saved addresses.

use askama::Template;
use askama_web::WebTemplate;
use axum::{
    Form,
    extract::{Path, State},
    response::{IntoResponse, Response},
};
use canteen_core::{AddressId, validation};
use chrono::Utc;
use serde::Deserialize;
use tower_sessions::Session;
use tracing::{instrument, warn};

use crate::api::{Address, ApiError};
use crate::error::AppError;
use crate::filters;
use crate::middleware::RequireAuth;
use crate::models::{CurrentUser, Flash, session_keys};
use crate::routes::page::{Page, redirect_with, redirect_with_error};
use crate::state::AppState;

const PROFILE_PATH: &str = "/profile";

/// Activity counters shown on the profile.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ProfileStats {
    pub orders: usize,
    pub favorites: usize,
    pub reviews: u64,
}

/// Saved address display data.
#[derive(Clone)]
pub struct AddressView {
    pub id: String,
    pub street: String,
    pub city: String,
    pub state: String,
    pub postal_code: String,
    pub country: String,
    pub is_default: bool,
}

impl AddressView {
    /// One-line rendering, skipping empty parts.
    #[must_use]
    pub fn summary(&self) -> String {
        [
            self.street.as_str(),
            self.city.as_str(),
            self.state.as_str(),
            self.postal_code.as_str(),
            self.country.as_str(),
        ]
        .into_iter()
        .filter(|part| !part.is_empty())
        .collect::<Vec<_>>()
        .join(", ")
    }
}

impl From<&Address> for AddressView {
    fn from(address: &Address) -> Self {
        Self {
            id: address.id.as_ref().map(ToString::to_string).unwrap_or_default(),
            street: address.street.clone(),
            city: address.city.clone(),
            state: address.state.clone(),
            postal_code: address.postal_code.clone(),
            country: address.country.clone(),
            is_default: address.is_default,
        }
    }
}

/// Profile page template.
#[derive(Template, WebTemplate)]
#[template(path = "profile.html")]
pub struct ProfileTemplate {
    pub page: Page,
    pub user: CurrentUser,
    pub stats: ProfileStats,
    pub addresses: Vec<AddressView>,
}

/// Name change form.
#[derive(Debug, Deserialize)]
pub struct ProfileForm {
    pub full_name: String,
}

/// Address add/edit form.
#[derive(Debug, Deserialize)]
pub struct AddressForm {
    pub street: String,
    pub city: String,
    #[serde(default)]
    pub state: String,
    #[serde(default)]
    pub postal_code: String,
    #[serde(default)]
    pub country: String,
    /// Checkbox; present when ticked.
    pub is_default: Option<String>,
}

impl AddressForm {
    fn into_address(self) -> Result<Address, validation::ValidationError> {
        let street = validation::required("Street", &self.street)?.to_owned();
        let city = validation::required("City", &self.city)?.to_owned();
        Ok(Address {
            id: None,
            street,
            city,
            state: self.state.trim().to_owned(),
            postal_code: self.postal_code.trim().to_owned(),
            country: self.country.trim().to_owned(),
            is_default: self.is_default.is_some(),
        })
    }
}

/// Display the profile.
///
/// Each stat falls back to zero when its call fails.
#[instrument(skip(state, page, auth))]
pub async fn show(
    State(state): State<AppState>,
    page: Page,
    RequireAuth(auth): RequireAuth,
) -> Result<Response, AppError> {
    let api = state.api();
    let (me, favorites, orders, reviews) = tokio::join!(
        api.me(&auth.api),
        api.favorites(&auth.api),
        api.orders(&auth.api),
        api.review_count(&auth.api, &auth.user.id),
    );

    let addresses = match me {
        Ok(user) => user.addresses.iter().map(AddressView::from).collect(),
        Err(e @ ApiError::Unauthorized(_)) => return Err(e.into()),
        Err(e) => {
            warn!(error = %e, "Failed to load addresses");
            Vec::new()
        }
    };

    let stats = ProfileStats {
        orders: orders.map(|o| o.len()).unwrap_or_else(|e| {
            warn!(error = %e, "Failed to fetch orders");
            0
        }),
        favorites: favorites.map(|f| f.len()).unwrap_or_else(|e| {
            warn!(error = %e, "Failed to fetch favorites");
            0
        }),
        reviews: reviews.unwrap_or_else(|e| {
            warn!(error = %e, "Failed to fetch review count");
            0
        }),
    };

    Ok(ProfileTemplate {
        page,
        user: auth.user,
        stats,
        addresses,
    }
    .into_response())
}

/// Change the display name.
#[instrument(skip(state, session, auth, form))]
pub async fn update(
    State(state): State<AppState>,
    session: Session,
    RequireAuth(auth): RequireAuth,
    Form(form): Form<ProfileForm>,
) -> Response {
    let Ok(full_name) = validation::required("Name", &form.full_name) else {
        return redirect_with(&session, PROFILE_PATH, Flash::error("Name cannot be empty")).await;
    };

    match state.api().update_profile(&auth.api, full_name).await {
        Ok(user) => {
            if let Err(e) = session
                .insert(session_keys::CURRENT_USER, CurrentUser::from_api(&user, Utc::now()))
                .await
            {
                warn!(error = %e, "Failed to store updated user");
            }
            redirect_with(&session, PROFILE_PATH, Flash::success("Profile updated successfully")).await
        }
        Err(e) if e.is_unauthorized() => redirect_with_error(&session, PROFILE_PATH, &e).await,
        Err(e) => {
            warn!(error = %e, "Failed to update profile");
            redirect_with(&session, PROFILE_PATH, Flash::error("Failed to update profile")).await
        }
    }
}

/// Save a new address.
#[instrument(skip(state, session, auth, form))]
pub async fn add_address(
    State(state): State<AppState>,
    session: Session,
    RequireAuth(auth): RequireAuth,
    Form(form): Form<AddressForm>,
) -> Response {
    let address = match form.into_address() {
        Ok(address) => address,
        Err(e) => return redirect_with(&session, PROFILE_PATH, Flash::error(e.to_string())).await,
    };

    match state.api().add_address(&auth.api, &address).await {
        Ok(()) => redirect_with(&session, PROFILE_PATH, Flash::success("Address added")).await,
        Err(e) => redirect_with_error(&session, PROFILE_PATH, &e).await,
    }
}

/// Replace a saved address.
#[instrument(skip(state, session, auth, form), fields(address_id = %id))]
pub async fn update_address(
    State(state): State<AppState>,
    session: Session,
    RequireAuth(auth): RequireAuth,
    Path(id): Path<String>,
    Form(form): Form<AddressForm>,
) -> Response {
    let address = match form.into_address() {
        Ok(address) => address,
        Err(e) => return redirect_with(&session, PROFILE_PATH, Flash::error(e.to_string())).await,
    };

    match state
        .api()
        .update_address(&auth.api, &AddressId::new(id), &address)
        .await
    {
        Ok(()) => redirect_with(&session, PROFILE_PATH, Flash::success("Address updated")).await,
        Err(e) => redirect_with_error(&session, PROFILE_PATH, &e).await,
    }
}

/// Delete a saved address.
#[instrument(skip(state, session, auth), fields(address_id = %id))]
pub async fn delete_address(
    State(state): State<AppState>,
    session: Session,
    RequireAuth(auth): RequireAuth,
    Path(id): Path<String>,
) -> Response {
    match state
        .api()
        .delete_address(&auth.api, &AddressId::new(id))
        .await
    {
        Ok(()) => redirect_with(&session, PROFILE_PATH, Flash::success("Address deleted")).await,
        Err(e) => redirect_with_error(&session, PROFILE_PATH, &e).await,
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn form(street: &str, city: &str) -> AddressForm {
        AddressForm {
            street: street.into(),
            city: city.into(),
            state: " TamilNadu ".into(),
            postal_code: "601103".into(),
            country: "India".into(),
            is_default: Some("on".into()),
        }
    }

    #[test]
    fn test_address_form_trims_and_flags_default() {
        let address = form(" 12 Main Rd ", "Chennai").into_address().unwrap();
        assert_eq!(address.street, "12 Main Rd");
        assert_eq!(address.state, "TamilNadu");
        assert!(address.is_default);
        assert!(address.id.is_none());
    }

    #[test]
    fn test_address_form_requires_street_and_city() {
        assert_eq!(
            form("", "Chennai").into_address(),
            Err(validation::ValidationError::Required("Street"))
        );
        assert_eq!(
            form("12 Main Rd", " ").into_address(),
            Err(validation::ValidationError::Required("City"))
        );
    }

    #[test]
    fn test_address_summary_skips_blank_parts() {
        let view = AddressView::from(&Address {
            street: "12 Main Rd".into(),
            city: "Chennai".into(),
            country: "India".into(),
            ..Address::default()
        });
        assert_eq!(view.summary(), "12 Main Rd, Chennai, India");
    }
}
