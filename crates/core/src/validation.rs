//! Form validation.
//!
//! These checks run before a request is sent to the API so obvious mistakes
//! produce an immediate message. The API validates again and its answer
//! wins.

use chrono::NaiveDate;
use rust_decimal::Decimal;

/// Why a form submission was refused.
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    /// A required field is empty.
    #[error("{0} is required")]
    Required(&'static str),
    /// Several required fields are empty.
    #[error("Missing required fields: {}", .0.join(", "))]
    MissingFields(Vec<&'static str>),
    /// The email address is malformed.
    #[error("Please enter a valid email address")]
    InvalidEmail,
    /// The password is too short.
    #[error("Password must be at least {min} characters")]
    PasswordTooShort {
        /// Minimum length.
        min: usize,
    },
    /// Password and confirmation differ.
    #[error("Passwords do not match")]
    PasswordMismatch,
    /// A rating outside 1 to 5 stars.
    #[error("Rating must be between 1 and 5")]
    RatingOutOfRange,
    /// A money amount that must be positive is not.
    #[error("{0} must be greater than zero")]
    NotPositive(&'static str),
    /// A money amount that must not be negative is.
    #[error("{0} cannot be negative")]
    Negative(&'static str),
    /// No category ticked on the product form.
    #[error("Please select at least one category")]
    NoCategory,
    /// No item ticked in the cancel dialog.
    #[error("Please select at least one item to cancel")]
    NoItemsSelected,
    /// The order has moved past preparation.
    #[error("This order can no longer be cancelled")]
    OrderNotCancellable,
    /// Uploaded file is not a supported image type.
    #[error("Please select a valid image file (JPEG, PNG, WebP)")]
    UnsupportedImage,
    /// Uploaded file exceeds the size limit.
    #[error("Image size should be less than 5MB")]
    ImageTooLarge,
}

/// Minimum password length accepted at registration.
pub const MIN_PASSWORD_LEN: usize = 6;

/// Largest accepted product image.
pub const MAX_IMAGE_BYTES: usize = 5 * 1024 * 1024;

/// Image content types accepted for product photos.
pub const IMAGE_TYPES: &[&str] = &["image/jpeg", "image/jpg", "image/png", "image/webp"];

/// Trim a required text field.
///
/// # Errors
///
/// Returns [`ValidationError::Required`] when the trimmed value is empty.
pub fn required<'a>(field: &'static str, value: &'a str) -> Result<&'a str, ValidationError> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        Err(ValidationError::Required(field))
    } else {
        Ok(trimmed)
    }
}

/// Normalise and check an email address: trimmed, lowercased, one `@` with
/// text on both sides and at most 254 characters.
///
/// # Errors
///
/// Returns [`ValidationError::Required`] for empty input and
/// [`ValidationError::InvalidEmail`] for anything malformed.
pub fn email(value: &str) -> Result<String, ValidationError> {
    let value = required("Email", value)?;
    if value.len() > 254 {
        return Err(ValidationError::InvalidEmail);
    }
    match value.split_once('@') {
        Some((local, domain))
            if !local.is_empty() && !domain.is_empty() && !domain.contains('@') =>
        {
            Ok(value.to_lowercase())
        }
        _ => Err(ValidationError::InvalidEmail),
    }
}

/// Check a new password and its confirmation.
///
/// # Errors
///
/// Returns an error when the password is too short or the two differ.
pub fn new_password(password: &str, confirm: &str) -> Result<(), ValidationError> {
    if password.chars().count() < MIN_PASSWORD_LEN {
        return Err(ValidationError::PasswordTooShort {
            min: MIN_PASSWORD_LEN,
        });
    }
    if password != confirm {
        return Err(ValidationError::PasswordMismatch);
    }
    Ok(())
}

/// Check a review before submitting.
///
/// # Errors
///
/// Rejects ratings outside 1..=5 and empty comments.
pub fn review(rating: u8, comment: &str) -> Result<&str, ValidationError> {
    if !(1..=5).contains(&rating) {
        return Err(ValidationError::RatingOutOfRange);
    }
    required("Comment", comment)
}

/// Check a customer's cancellation request.
///
/// # Errors
///
/// Requires at least one selected item and a reason.
pub fn cancellation<'a, T>(selected: &[T], reason: &'a str) -> Result<&'a str, ValidationError> {
    if selected.is_empty() {
        return Err(ValidationError::NoItemsSelected);
    }
    required("Reason", reason)
}

/// Check an uploaded product image.
///
/// # Errors
///
/// Rejects unsupported content types and files over [`MAX_IMAGE_BYTES`].
pub fn image_upload(content_type: &str, size: usize) -> Result<(), ValidationError> {
    if !IMAGE_TYPES.contains(&content_type) {
        return Err(ValidationError::UnsupportedImage);
    }
    if size > MAX_IMAGE_BYTES {
        return Err(ValidationError::ImageTooLarge);
    }
    Ok(())
}

/// Fields of the product form that are checked before saving.
#[derive(Debug, Clone, Default)]
pub struct ProductDraft<'a> {
    pub name: &'a str,
    pub description: &'a str,
    pub price: Option<Decimal>,
    pub discount_price: Option<Decimal>,
    pub cuisine: &'a str,
    pub image_url: &'a str,
    pub categories: &'a [String],
}

impl ProductDraft<'_> {
    /// # Errors
    ///
    /// Lists every missing required field at once, then checks categories
    /// and amounts.
    pub fn validate(&self) -> Result<(), ValidationError> {
        let missing: Vec<&'static str> = [
            ("name", self.name.trim().is_empty()),
            ("description", self.description.trim().is_empty()),
            ("price", self.price.is_none()),
            ("cuisine", self.cuisine.trim().is_empty()),
            ("imageUrl", self.image_url.trim().is_empty()),
        ]
        .into_iter()
        .filter_map(|(field, empty)| empty.then_some(field))
        .collect();

        if !missing.is_empty() {
            return Err(ValidationError::MissingFields(missing));
        }
        if self.categories.is_empty() {
            return Err(ValidationError::NoCategory);
        }
        if self.price.is_some_and(|p| p <= Decimal::ZERO) {
            return Err(ValidationError::NotPositive("Price"));
        }
        if self.discount_price.is_some_and(|d| d.is_sign_negative()) {
            return Err(ValidationError::Negative("Discount price"));
        }
        Ok(())
    }
}

/// Check a new expense entry.
///
/// # Errors
///
/// Requires a positive amount and a date.
pub fn expense(amount: Option<Decimal>, date: Option<NaiveDate>) -> Result<(), ValidationError> {
    let amount = amount.ok_or(ValidationError::Required("Amount"))?;
    if amount <= Decimal::ZERO {
        return Err(ValidationError::NotPositive("Amount"));
    }
    date.ok_or(ValidationError::Required("Date"))?;
    Ok(())
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_email_normalises() {
        assert_eq!(email("  Priya@Example.COM ").unwrap(), "priya@example.com");
    }

    #[test]
    fn test_email_rejects_malformed() {
        assert_eq!(email(""), Err(ValidationError::Required("Email")));
        assert_eq!(email("no-at"), Err(ValidationError::InvalidEmail));
        assert_eq!(email("@x.com"), Err(ValidationError::InvalidEmail));
        assert_eq!(email("a@"), Err(ValidationError::InvalidEmail));
        assert_eq!(email("a@b@c"), Err(ValidationError::InvalidEmail));
    }

    #[test]
    fn test_password_rules() {
        assert!(new_password("secret1", "secret1").is_ok());
        assert_eq!(
            new_password("abc", "abc"),
            Err(ValidationError::PasswordTooShort { min: 6 })
        );
        assert_eq!(
            new_password("secret1", "secret2"),
            Err(ValidationError::PasswordMismatch)
        );
    }

    #[test]
    fn test_review_requires_comment_and_rating() {
        assert_eq!(review(5, "  tasty "), Ok("tasty"));
        assert_eq!(review(0, "ok"), Err(ValidationError::RatingOutOfRange));
        assert_eq!(review(6, "ok"), Err(ValidationError::RatingOutOfRange));
        assert_eq!(review(3, "   "), Err(ValidationError::Required("Comment")));
    }

    #[test]
    fn test_cancellation_needs_items_and_reason() {
        let none: [&str; 0] = [];
        assert_eq!(
            cancellation(&none, "late"),
            Err(ValidationError::NoItemsSelected)
        );
        assert_eq!(
            cancellation(&["i1"], " "),
            Err(ValidationError::Required("Reason"))
        );
        assert_eq!(cancellation(&["i1"], "changed my mind"), Ok("changed my mind"));
    }

    #[test]
    fn test_image_upload_rules() {
        assert!(image_upload("image/png", 1024).is_ok());
        assert_eq!(
            image_upload("image/gif", 10),
            Err(ValidationError::UnsupportedImage)
        );
        assert_eq!(
            image_upload("image/webp", MAX_IMAGE_BYTES + 1),
            Err(ValidationError::ImageTooLarge)
        );
    }

    #[test]
    fn test_product_draft_lists_missing_fields() {
        let draft = ProductDraft {
            name: "Idli",
            ..ProductDraft::default()
        };
        let err = draft.validate().unwrap_err();
        assert_eq!(
            err.to_string(),
            "Missing required fields: description, price, cuisine, imageUrl"
        );
    }

    #[test]
    fn test_product_draft_needs_category() {
        let cats: Vec<String> = Vec::new();
        let draft = ProductDraft {
            name: "Idli",
            description: "Steamed rice cakes",
            price: Some(Decimal::from(40)),
            discount_price: None,
            cuisine: "South Indian",
            image_url: "/uploads/idli.png",
            categories: &cats,
        };
        assert_eq!(draft.validate(), Err(ValidationError::NoCategory));

        let cats = vec!["Breakfast".to_owned()];
        let draft = ProductDraft {
            categories: &cats,
            ..draft
        };
        assert!(draft.validate().is_ok());
    }

    #[test]
    fn test_expense_rules() {
        let day = NaiveDate::from_ymd_opt(2025, 1, 2);
        assert!(expense(Some(Decimal::from(10)), day).is_ok());
        assert_eq!(
            expense(Some(Decimal::ZERO), day),
            Err(ValidationError::NotPositive("Amount"))
        );
        assert_eq!(
            expense(Some(Decimal::ONE), None),
            Err(ValidationError::Required("Date"))
        );
    }
}
