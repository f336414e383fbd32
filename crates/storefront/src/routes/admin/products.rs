//! Menu management: product list, quick actions and the add/edit form.
//!
//! The add/edit form is posted as `multipart/form-data` so a photo can be
//! sent with it. A chosen photo is uploaded first and its URL replaces the
//! form's current image before the product is validated and saved.

use askama::Template;
use askama_web::WebTemplate;
use axum::{
    Form,
    extract::{Multipart, Path, State},
    response::{IntoResponse, Response},
};
use canteen_core::validation::{self, ProductDraft, ValidationError};
use canteen_core::{CATEGORIES, CUISINES, DietaryInfo, ProductId, WEEKDAYS};
use rust_decimal::Decimal;
use serde::Deserialize;
use tower_sessions::Session;
use tracing::{info, instrument, warn};

use crate::api::{ApiError, ApiSession, Availability, Product, ProductFilter, ProductInput};
use crate::error::AppError;
use crate::filters;
use crate::middleware::RequireAuth;
use crate::models::Flash;
use crate::routes::page::{Page, ProductCard, local_path, redirect_with, redirect_with_error};
use crate::state::AppState;

const PRODUCTS_PATH: &str = "/admin/products";

/// A row of the manage products table.
#[derive(Clone)]
pub struct ManagedProduct {
    pub card: ProductCard,
    /// Current discount price for the inline form, or empty.
    pub discount: String,
}

impl ManagedProduct {
    fn new(product: &Product, state: &AppState) -> Self {
        Self {
            card: ProductCard::new(product, &state.config().api, false),
            discount: product
                .discount_price
                .map(|d| d.normalize().to_string())
                .unwrap_or_default(),
        }
    }
}

/// Manage products template.
#[derive(Template, WebTemplate)]
#[template(path = "admin/products.html")]
pub struct ProductsTemplate {
    pub page: Page,
    pub products: Vec<ManagedProduct>,
    pub error: Option<String>,
}

// =============================================================================
// Product form values
// =============================================================================

/// Product form contents as typed, kept as text so a refused form can be
/// shown again unchanged.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProductFormValues {
    pub name: String,
    pub description: String,
    pub image_url: String,
    pub price: String,
    pub discount_price: String,
    pub currency: String,
    pub cuisine: String,
    pub categories: Vec<String>,
    pub dietary: DietaryInfo,
    pub is_available: bool,
    pub available_days: Vec<String>,
    pub available_from: String,
    pub available_until: String,
}

impl Default for ProductFormValues {
    fn default() -> Self {
        let availability = Availability::default();
        Self {
            name: String::new(),
            description: String::new(),
            image_url: String::new(),
            price: String::new(),
            discount_price: String::new(),
            currency: "INR".to_owned(),
            cuisine: String::new(),
            categories: Vec::new(),
            dietary: DietaryInfo::default(),
            is_available: availability.is_available,
            available_days: availability.available_days,
            available_from: availability.available_from,
            available_until: availability.available_until,
        }
    }
}

impl From<&Product> for ProductFormValues {
    fn from(product: &Product) -> Self {
        Self {
            name: product.name.clone(),
            description: product.description.clone(),
            image_url: product.image_url.clone(),
            price: product.price.normalize().to_string(),
            discount_price: product
                .discount_price
                .map(|d| d.normalize().to_string())
                .unwrap_or_default(),
            currency: product.currency.clone(),
            cuisine: product.cuisine.clone(),
            categories: product.categories.clone(),
            dietary: product.dietary_info,
            is_available: product.availability.is_available,
            available_days: product.availability.available_days.clone(),
            available_from: product.availability.available_from.clone(),
            available_until: product.availability.available_until.clone(),
        }
    }
}

impl ProductFormValues {
    /// Values for a submitted form. Unticked checkboxes are absent from a
    /// submission, so every flag starts cleared.
    fn submitted() -> Self {
        Self {
            is_available: false,
            available_days: Vec::new(),
            ..Self::default()
        }
    }

    /// Record one submitted text field.
    fn apply(&mut self, name: &str, value: String) {
        match name {
            "name" => self.name = value,
            "description" => self.description = value,
            "imageUrl" => self.image_url = value,
            "price" => self.price = value,
            "discountPrice" => self.discount_price = value,
            "currency" if !value.trim().is_empty() => self.currency = value,
            "cuisine" => self.cuisine = value,
            "categories" => {
                if !self.categories.contains(&value) {
                    self.categories.push(value);
                }
            }
            "isAvailable" => self.is_available = true,
            "availableDays" => {
                if !self.available_days.contains(&value) {
                    self.available_days.push(value);
                }
            }
            "availableFrom" => self.available_from = value,
            "availableUntil" => self.available_until = value,
            other => self.dietary.set(other, true),
        }
    }

    #[must_use]
    pub fn has_cuisine(&self, cuisine: &str) -> bool {
        self.cuisine == cuisine
    }

    #[must_use]
    pub fn has_category(&self, category: &str) -> bool {
        self.categories.iter().any(|c| c == category)
    }

    #[must_use]
    pub fn has_day(&self, day: &str) -> bool {
        self.available_days.iter().any(|d| d == day)
    }

    /// Check the form and build the API body.
    ///
    /// Amounts that are not numbers count as empty.
    fn to_input(&self) -> Result<ProductInput, ValidationError> {
        let price = parse_amount(&self.price);
        let discount_price = parse_amount(&self.discount_price);

        ProductDraft {
            name: &self.name,
            description: &self.description,
            price,
            discount_price,
            cuisine: &self.cuisine,
            image_url: &self.image_url,
            categories: &self.categories,
        }
        .validate()?;

        Ok(ProductInput {
            name: self.name.trim().to_owned(),
            description: self.description.trim().to_owned(),
            image_url: self.image_url.trim().to_owned(),
            price: price.ok_or(ValidationError::Required("Price"))?,
            discount_price,
            currency: self.currency.trim().to_owned(),
            cuisine: self.cuisine.trim().to_owned(),
            categories: self.categories.clone(),
            dietary_info: self.dietary,
            availability: Availability {
                is_available: self.is_available,
                available_days: WEEKDAYS
                    .iter()
                    .filter(|day| self.has_day(day))
                    .map(|day| (*day).to_owned())
                    .collect(),
                available_from: self.available_from.trim().to_owned(),
                available_until: self.available_until.trim().to_owned(),
            },
        })
    }
}

fn parse_amount(value: &str) -> Option<Decimal> {
    let value = value.trim();
    if value.is_empty() {
        return None;
    }
    value.parse().ok()
}

/// A photo chosen on the product form.
struct ImageFile {
    file_name: String,
    content_type: String,
    bytes: Vec<u8>,
}

/// Read the multipart product form.
async fn read_form(
    mut multipart: Multipart,
) -> Result<(ProductFormValues, Option<ImageFile>), axum::extract::multipart::MultipartError> {
    let mut values = ProductFormValues::submitted();
    let mut image = None;

    while let Some(field) = multipart.next_field().await? {
        let name = field.name().unwrap_or_default().to_owned();
        if name == "image" {
            let file_name = field.file_name().unwrap_or_default().to_owned();
            let content_type = field.content_type().unwrap_or_default().to_owned();
            let bytes = field.bytes().await?;
            if !file_name.is_empty() && !bytes.is_empty() {
                image = Some(ImageFile {
                    file_name,
                    content_type,
                    bytes: bytes.to_vec(),
                });
            }
            continue;
        }
        let value = field.text().await?;
        values.apply(&name, value);
    }

    Ok((values, image))
}

/// Add/edit product template.
#[derive(Template, WebTemplate)]
#[template(path = "admin/product_form.html")]
pub struct ProductFormTemplate {
    pub page: Page,
    /// Product being edited, `None` when adding.
    pub product_id: Option<String>,
    pub values: ProductFormValues,
    /// Image preview URL.
    pub preview: String,
    pub cuisines: &'static [&'static str],
    pub categories: &'static [&'static str],
    pub weekdays: &'static [&'static str],
    pub dietary_fields: &'static [(&'static str, &'static str)],
    pub error: Option<String>,
}

impl ProductFormTemplate {
    fn new(
        state: &AppState,
        page: Page,
        product_id: Option<String>,
        values: ProductFormValues,
        error: Option<String>,
    ) -> Self {
        let preview = if values.image_url.is_empty() {
            String::new()
        } else {
            state.config().api.asset(&values.image_url)
        };
        Self {
            page,
            product_id,
            values,
            preview,
            cuisines: CUISINES,
            categories: CATEGORIES,
            weekdays: WEEKDAYS,
            dietary_fields: &DietaryInfo::FIELDS,
            error,
        }
    }

    /// Where the form posts to.
    #[must_use]
    pub fn action(&self) -> String {
        self.product_id.as_ref().map_or_else(
            || format!("{PRODUCTS_PATH}/new"),
            |id| format!("{PRODUCTS_PATH}/{id}"),
        )
    }

    #[must_use]
    pub const fn editing(&self) -> bool {
        self.product_id.is_some()
    }
}

// =============================================================================
// List and quick actions
// =============================================================================

/// Display every product with its quick actions.
#[instrument(skip(state, page, _auth))]
pub async fn index(
    State(state): State<AppState>,
    page: Page,
    RequireAuth(_auth): RequireAuth,
) -> Response {
    match state.api().products(&ProductFilter::default()).await {
        Ok(products) => ProductsTemplate {
            products: products
                .iter()
                .map(|p| ManagedProduct::new(p, &state))
                .collect(),
            page,
            error: None,
        }
        .into_response(),
        Err(e) => {
            warn!(error = %e, "Error fetching products");
            ProductsTemplate {
                page,
                products: Vec::new(),
                error: Some("Failed to load products".to_owned()),
            }
            .into_response()
        }
    }
}

/// Availability toggle form.
#[derive(Debug, Deserialize)]
pub struct AvailabilityForm {
    /// The new state.
    pub available: bool,
    pub return_to: Option<String>,
}

/// Mark a product as orderable or not.
#[instrument(skip(state, session, auth, form), fields(product_id = %id))]
pub async fn toggle_availability(
    State(state): State<AppState>,
    session: Session,
    RequireAuth(auth): RequireAuth,
    Path(id): Path<String>,
    Form(form): Form<AvailabilityForm>,
) -> Response {
    let back = local_path(form.return_to.as_deref(), PRODUCTS_PATH);
    match state
        .api()
        .set_availability(&auth.api, &ProductId::new(id), form.available)
        .await
    {
        Ok(()) => {
            let message = if form.available {
                "Product is now available"
            } else {
                "Product marked unavailable"
            };
            redirect_with(&session, &back, Flash::success(message)).await
        }
        Err(e) => redirect_with_error(&session, &back, &e).await,
    }
}

/// Discount form.
#[derive(Debug, Deserialize)]
pub struct DiscountForm {
    pub discount_price: String,
}

/// Set a product's discount price.
#[instrument(skip(state, session, auth, form), fields(product_id = %id))]
pub async fn set_discount(
    State(state): State<AppState>,
    session: Session,
    RequireAuth(auth): RequireAuth,
    Path(id): Path<String>,
    Form(form): Form<DiscountForm>,
) -> Response {
    let discount = match parse_amount(&form.discount_price) {
        None => {
            return redirect_with(
                &session,
                PRODUCTS_PATH,
                Flash::error("Please enter a discount price"),
            )
            .await;
        }
        Some(d) if d.is_sign_negative() => {
            let message = ValidationError::Negative("Discount price").to_string();
            return redirect_with(&session, PRODUCTS_PATH, Flash::error(message)).await;
        }
        Some(d) => d,
    };

    match state
        .api()
        .set_discount(&auth.api, &ProductId::new(id), Some(discount))
        .await
    {
        Ok(()) => redirect_with(&session, PRODUCTS_PATH, Flash::success("Discount updated")).await,
        Err(e) => redirect_with_error(&session, PRODUCTS_PATH, &e).await,
    }
}

/// Remove a product's discount.
#[instrument(skip(state, session, auth), fields(product_id = %id))]
pub async fn clear_discount(
    State(state): State<AppState>,
    session: Session,
    RequireAuth(auth): RequireAuth,
    Path(id): Path<String>,
) -> Response {
    match state
        .api()
        .set_discount(&auth.api, &ProductId::new(id), None)
        .await
    {
        Ok(()) => redirect_with(&session, PRODUCTS_PATH, Flash::success("Discount removed")).await,
        Err(e) => redirect_with_error(&session, PRODUCTS_PATH, &e).await,
    }
}

/// Delete confirmation form.
#[derive(Debug, Deserialize)]
pub struct DeleteForm {
    pub return_to: Option<String>,
}

/// Remove a product from the menu.
#[instrument(skip(state, session, auth, form), fields(product_id = %id))]
pub async fn delete(
    State(state): State<AppState>,
    session: Session,
    RequireAuth(auth): RequireAuth,
    Path(id): Path<String>,
    Form(form): Form<DeleteForm>,
) -> Response {
    let back = local_path(form.return_to.as_deref(), PRODUCTS_PATH);
    match state.api().delete_product(&auth.api, &ProductId::new(id)).await {
        Ok(()) => {
            info!("Product deleted");
            redirect_with(&session, &back, Flash::success("Product deleted successfully!")).await
        }
        Err(e) if e.is_unauthorized() => redirect_with_error(&session, &back, &e).await,
        Err(e) => {
            warn!(error = %e, "Failed to delete product");
            let message = failure_message(&e, "Failed to delete product");
            redirect_with(&session, &back, Flash::error(message)).await
        }
    }
}

/// The API's message, or `fallback` when it gave none.
fn failure_message(err: &ApiError, fallback: &str) -> String {
    let message = err.user_message();
    if message.trim().is_empty() {
        fallback.to_owned()
    } else {
        message
    }
}

// =============================================================================
// Add / edit
// =============================================================================

/// Display the empty product form.
pub async fn new_page(State(state): State<AppState>, page: Page) -> Response {
    ProductFormTemplate::new(&state, page, None, ProductFormValues::default(), None).into_response()
}

/// Display the form for an existing product.
#[instrument(skip(state, session, page), fields(product_id = %id))]
pub async fn edit_page(
    State(state): State<AppState>,
    session: Session,
    page: Page,
    Path(id): Path<String>,
) -> Response {
    match state.api().product(&ProductId::new(id.clone())).await {
        Ok(product) => ProductFormTemplate::new(
            &state,
            page,
            Some(id),
            ProductFormValues::from(&product),
            None,
        )
        .into_response(),
        Err(e) => {
            warn!(error = %e, "Error fetching product");
            redirect_with(&session, PRODUCTS_PATH, Flash::error("Failed to load product data")).await
        }
    }
}

/// Add a product.
#[instrument(skip(state, session, page, auth, multipart))]
pub async fn create(
    State(state): State<AppState>,
    session: Session,
    page: Page,
    RequireAuth(auth): RequireAuth,
    multipart: Multipart,
) -> Response {
    save(&state, &session, page, &auth.api, None, multipart).await
}

/// Replace a product.
#[instrument(skip(state, session, page, auth, multipart), fields(product_id = %id))]
pub async fn update(
    State(state): State<AppState>,
    session: Session,
    page: Page,
    RequireAuth(auth): RequireAuth,
    Path(id): Path<String>,
    multipart: Multipart,
) -> Response {
    save(&state, &session, page, &auth.api, Some(id), multipart).await
}

/// Shared add/edit flow: read, upload, validate, save.
async fn save(
    state: &AppState,
    session: &Session,
    page: Page,
    api: &ApiSession,
    product_id: Option<String>,
    multipart: Multipart,
) -> Response {
    let (mut values, image) = match read_form(multipart).await {
        Ok(form) => form,
        Err(e) => {
            warn!(error = %e, "Unreadable product form");
            let back = product_id.as_ref().map_or_else(
                || format!("{PRODUCTS_PATH}/new"),
                |id| format!("{PRODUCTS_PATH}/{id}/edit"),
            );
            return redirect_with(
                session,
                &back,
                Flash::error(ValidationError::ImageTooLarge.to_string()),
            )
            .await;
        }
    };

    let refuse = |values: ProductFormValues, message: String| {
        ProductFormTemplate::new(state, page, product_id.clone(), values, Some(message))
            .into_response()
    };

    if let Some(image) = image {
        if let Err(e) = validation::image_upload(&image.content_type, image.bytes.len()) {
            return refuse(values, e.to_string());
        }
        match state
            .api()
            .upload_image(api, &image.file_name, &image.content_type, image.bytes)
            .await
        {
            Ok(url) => {
                info!(url = %url, "Image uploaded successfully");
                values.image_url = url;
            }
            Err(e) if e.is_unauthorized() => return AppError::from(e).into_response(),
            Err(e) => {
                warn!(error = %e, "Image upload failed");
                return refuse(values, failure_message(&e, "Failed to upload image"));
            }
        }
    }

    let input = match values.to_input() {
        Ok(input) => input,
        Err(e) => return refuse(values, e.to_string()),
    };

    let result = match &product_id {
        Some(id) => state
            .api()
            .update_product(api, &ProductId::new(id.clone()), &input)
            .await,
        None => state.api().create_product(api, &input).await,
    };

    match result {
        Ok(product) => {
            info!(product_id = %product.id, "Product saved");
            let message = if product_id.is_some() {
                "Product updated successfully!"
            } else {
                "Product added successfully!"
            };
            redirect_with(session, PRODUCTS_PATH, Flash::success(message)).await
        }
        Err(e) if e.is_unauthorized() => AppError::from(e).into_response(),
        Err(e) => {
            warn!(error = %e, "Failed to save product");
            let fallback = if product_id.is_some() {
                "Failed to update product"
            } else {
                "Failed to add product"
            };
            refuse(values, failure_message(&e, fallback))
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn filled() -> ProductFormValues {
        let mut values = ProductFormValues::submitted();
        for (name, value) in [
            ("name", " Masala Dosa "),
            ("description", "Crisp and golden"),
            ("imageUrl", "/uploads/dosa.jpg"),
            ("price", "120"),
            ("discountPrice", ""),
            ("cuisine", "South Indian"),
            ("categories", "Breakfast"),
            ("categories", "Breakfast"),
            ("isVegetarian", "on"),
            ("isAvailable", "on"),
            ("availableDays", "Sunday"),
            ("availableDays", "Monday"),
            ("availableFrom", "07:00"),
            ("availableUntil", "11:00"),
        ] {
            values.apply(name, value.to_owned());
        }
        values
    }

    #[test]
    fn test_submitted_form_builds_input() {
        let input = filled().to_input().unwrap();
        assert_eq!(input.name, "Masala Dosa");
        assert_eq!(input.price, Decimal::from(120));
        assert!(input.discount_price.is_none());
        assert_eq!(input.categories, vec!["Breakfast"]);
        assert!(input.dietary_info.is_vegetarian);
        assert!(!input.dietary_info.is_vegan);
        assert!(input.availability.is_available);
        assert_eq!(input.availability.available_days, vec!["Monday", "Sunday"]);
        assert_eq!(input.currency, "INR");
    }

    #[test]
    fn test_unticked_checkboxes_are_cleared() {
        let values = ProductFormValues::submitted();
        assert!(!values.is_available);
        assert!(values.available_days.is_empty());
        assert!(ProductFormValues::default().is_available);
    }

    #[test]
    fn test_missing_fields_listed_together() {
        let mut values = filled();
        values.name = " ".into();
        values.price = "abc".into();
        values.image_url = String::new();
        assert_eq!(
            values.to_input().unwrap_err().to_string(),
            "Missing required fields: name, price, imageUrl"
        );
    }

    #[test]
    fn test_category_required() {
        let mut values = filled();
        values.categories.clear();
        assert_eq!(values.to_input(), Err(ValidationError::NoCategory));
    }

    #[test]
    fn test_discount_sent_only_when_given() {
        let mut values = filled();
        values.discount_price = "99.5".into();
        assert_eq!(
            values.to_input().unwrap().discount_price,
            Some(Decimal::new(995, 1))
        );
    }

    #[test]
    fn test_edit_values_from_product() {
        let product: Product = serde_json::from_str(
            r#"{"_id":"p1","name":"Tea","price":20.00,"discountPrice":15,
                "categories":["Beverages"],"dietaryInfo":{"isVegan":true}}"#,
        )
        .unwrap();
        let values = ProductFormValues::from(&product);
        assert_eq!(values.price, "20");
        assert_eq!(values.discount_price, "15");
        assert!(values.has_category("Beverages"));
        assert!(values.has_day("Friday"));
        assert!(values.dietary.is_vegan);
    }

    #[test]
    fn test_failure_message_falls_back() {
        let err = ApiError::Status {
            status: 500,
            message: String::new(),
        };
        assert_eq!(failure_message(&err, "Failed to add product"), "Failed to add product");
        assert_eq!(
            failure_message(&ApiError::Conflict("Name taken".into()), "x"),
            "Name taken"
        );
    }
}
