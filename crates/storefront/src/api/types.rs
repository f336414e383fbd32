//! Records exchanged with the Canteen REST API.
//!
//! The API speaks camelCase JSON with Mongo-style `_id` keys. References
//! such as `order.userId` arrive either populated (an object) or as a bare
//! id depending on the endpoint, which [`Ref`] models.

use canteen_core::orders::OrderLine;
use canteen_core::{
    AddressId, DietaryInfo, ExpenseId, ExpenseType, ItemStatus, MenuPrice, OrderId, OrderItemId,
    OverallStatus, PaymentStatus, ProductId, ReviewId, Role, UserId, WEEKDAYS,
};
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// A reference that may or may not have been populated by the server.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(untagged)]
pub enum Ref<T> {
    Populated(T),
    Id(String),
}

impl<T> Ref<T> {
    /// The populated record, if the server expanded it.
    pub const fn populated(&self) -> Option<&T> {
        match self {
            Self::Populated(value) => Some(value),
            Self::Id(_) => None,
        }
    }
}

// =============================================================================
// Users
// =============================================================================

/// A signed-in account.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct User {
    #[serde(rename = "_id")]
    pub id: UserId,
    pub full_name: String,
    pub email: String,
    #[serde(default)]
    pub phone: Option<String>,
    pub role: Role,
    #[serde(default)]
    pub addresses: Vec<Address>,
}

/// A saved delivery address on a user profile.
#[derive(Debug, Clone, PartialEq, Eq, Default, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Address {
    #[serde(rename = "_id", default, skip_serializing_if = "Option::is_none")]
    pub id: Option<AddressId>,
    #[serde(default)]
    pub street: String,
    #[serde(default)]
    pub city: String,
    #[serde(default)]
    pub state: String,
    #[serde(default)]
    pub postal_code: String,
    #[serde(default)]
    pub country: String,
    #[serde(default)]
    pub is_default: bool,
}

/// Name and contact details of a person referenced from another record.
#[derive(Debug, Clone, PartialEq, Eq, Default, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PersonRef {
    #[serde(rename = "_id", default)]
    pub id: Option<UserId>,
    #[serde(default)]
    pub full_name: String,
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub phone: Option<String>,
}

// =============================================================================
// Products
// =============================================================================

/// When a product can be ordered.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Availability {
    pub is_available: bool,
    pub available_days: Vec<String>,
    pub available_from: String,
    pub available_until: String,
}

impl Default for Availability {
    fn default() -> Self {
        Self {
            is_available: true,
            available_days: WEEKDAYS.iter().map(|d| (*d).to_owned()).collect(),
            available_from: "00:00".to_owned(),
            available_until: "23:59".to_owned(),
        }
    }
}

/// Aggregate review score.
#[derive(Debug, Clone, Copy, PartialEq, Default, Deserialize, Serialize)]
#[serde(default)]
pub struct Rating {
    pub average: f64,
    pub count: u32,
}

/// A menu item.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Product {
    #[serde(rename = "_id")]
    pub id: ProductId,
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub image_url: String,
    pub price: Decimal,
    #[serde(default)]
    pub discount_price: Option<Decimal>,
    #[serde(default = "default_currency")]
    pub currency: String,
    #[serde(default)]
    pub cuisine: String,
    #[serde(default)]
    pub categories: Vec<String>,
    #[serde(default)]
    pub dietary_info: DietaryInfo,
    #[serde(default)]
    pub availability: Availability,
    #[serde(default)]
    pub rating: Rating,
}

fn default_currency() -> String {
    "INR".to_owned()
}

impl Product {
    #[must_use]
    pub const fn menu_price(&self) -> MenuPrice {
        MenuPrice::new(self.price, self.discount_price)
    }

    #[must_use]
    pub const fn is_available(&self) -> bool {
        self.availability.is_available
    }
}

/// Minimal product details embedded in an order line.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProductSummary {
    #[serde(rename = "_id")]
    pub id: ProductId,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub image_url: Option<String>,
}

/// Filter vocabularies offered by the menu.
#[derive(Debug, Clone, PartialEq, Eq, Default, Deserialize, Serialize)]
#[serde(default)]
pub struct MenuCategories {
    pub cuisines: Vec<String>,
    pub categories: Vec<String>,
}

/// Query for `GET /products`. `None` means "all".
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default, Serialize)]
pub struct ProductFilter {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub search: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cuisine: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub category: Option<String>,
}

impl ProductFilter {
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.search.is_none() && self.cuisine.is_none() && self.category.is_none()
    }
}

/// Body for creating or replacing a product.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProductInput {
    pub name: String,
    pub description: String,
    pub image_url: String,
    #[serde(with = "rust_decimal::serde::float")]
    pub price: Decimal,
    #[serde(
        with = "rust_decimal::serde::float_option",
        skip_serializing_if = "Option::is_none"
    )]
    pub discount_price: Option<Decimal>,
    pub currency: String,
    pub cuisine: String,
    pub categories: Vec<String>,
    pub dietary_info: DietaryInfo,
    pub availability: Availability,
}

// =============================================================================
// Cart & orders
// =============================================================================

/// A line in the customer's server-side cart.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct CartItem {
    /// The product, or `None` when it has been deleted since it was added.
    #[serde(rename = "productId", default)]
    pub product: Option<Ref<Product>>,
    pub quantity: u32,
}

impl CartItem {
    #[must_use]
    pub fn product(&self) -> Option<&Product> {
        self.product.as_ref().and_then(Ref::populated)
    }
}

/// A line inside a placed order.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderItem {
    #[serde(rename = "_id")]
    pub id: OrderItemId,
    #[serde(rename = "productId", default)]
    pub product: Option<Ref<ProductSummary>>,
    #[serde(default)]
    pub product_name: String,
    pub price: Decimal,
    pub quantity: u32,
    #[serde(default = "pending_item")]
    pub status: ItemStatus,
    #[serde(default)]
    pub rejection_message: Option<String>,
}

fn pending_item() -> ItemStatus {
    ItemStatus::Pending
}

impl OrderItem {
    /// Id of the product when it still exists.
    #[must_use]
    pub fn product_id(&self) -> Option<&str> {
        match self.product.as_ref()? {
            Ref::Populated(p) => Some(p.id.as_str()),
            Ref::Id(id) => Some(id.as_str()),
        }
    }

    #[must_use]
    pub fn product_summary(&self) -> Option<&ProductSummary> {
        self.product.as_ref().and_then(Ref::populated)
    }
}

impl OrderLine for OrderItem {
    fn status(&self) -> &ItemStatus {
        &self.status
    }

    fn unit_price(&self) -> Decimal {
        self.price
    }

    fn quantity(&self) -> u32 {
        self.quantity
    }
}

/// A placed order.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Order {
    #[serde(rename = "_id")]
    pub id: OrderId,
    #[serde(rename = "userId", default)]
    pub customer: Option<Ref<PersonRef>>,
    #[serde(default)]
    pub items: Vec<OrderItem>,
    pub total_amount: Decimal,
    #[serde(default = "pending_order")]
    pub overall_status: OverallStatus,
    #[serde(default = "pending_payment")]
    pub payment_status: PaymentStatus,
    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,
}

fn pending_order() -> OverallStatus {
    OverallStatus::Pending
}

fn pending_payment() -> PaymentStatus {
    PaymentStatus::Pending
}

impl Order {
    #[must_use]
    pub fn customer(&self) -> Option<&PersonRef> {
        self.customer.as_ref().and_then(Ref::populated)
    }
}

/// One line of a new order.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PlaceOrderItem {
    pub product_id: ProductId,
    pub product_name: String,
    #[serde(with = "rust_decimal::serde::float")]
    pub price: Decimal,
    pub quantity: u32,
}

/// Body of `POST /orders/place`.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PlaceOrder<'a> {
    pub items: Vec<PlaceOrderItem>,
    #[serde(with = "rust_decimal::serde::float")]
    pub total_amount: Decimal,
    pub address: &'a crate::config::PickupAddress,
}

/// Body of `POST /orders/payments/confirm`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PaymentConfirmation {
    pub order_id: OrderId,
    pub payment_id: String,
    pub status: PaymentStatus,
}

// =============================================================================
// Reviews
// =============================================================================

/// A product review.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Review {
    #[serde(rename = "_id")]
    pub id: ReviewId,
    #[serde(rename = "userId", default)]
    pub author: Option<Ref<PersonRef>>,
    pub rating: u8,
    #[serde(default)]
    pub comment: String,
    #[serde(default)]
    pub likes: Vec<String>,
    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,
}

impl Review {
    /// Id of the author, whether or not the reference was populated.
    #[must_use]
    pub fn author_id(&self) -> Option<&str> {
        match self.author.as_ref()? {
            Ref::Populated(p) => p.id.as_ref().map(UserId::as_str),
            Ref::Id(id) => Some(id.as_str()),
        }
    }

    #[must_use]
    pub fn author_name(&self) -> &str {
        self.author
            .as_ref()
            .and_then(Ref::populated)
            .map_or("Anonymous", |p| p.full_name.as_str())
    }

    #[must_use]
    pub fn is_liked_by(&self, user: &UserId) -> bool {
        self.likes.iter().any(|id| id == user.as_str())
    }
}

/// Body of `POST /reviews`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct NewReview<'a> {
    pub product_id: &'a ProductId,
    pub rating: u8,
    pub comment: &'a str,
}

// =============================================================================
// Admin
// =============================================================================

/// Headline numbers for the admin dashboard.
#[derive(Debug, Clone, PartialEq, Eq, Default, Deserialize, Serialize)]
#[serde(rename_all = "camelCase", default)]
pub struct DashboardStats {
    pub total_revenue: Decimal,
    pub last_month_revenue: Option<Decimal>,
    pub total_orders: u64,
    pub last_month_orders: Option<u64>,
    pub total_customers: u64,
    pub last_month_customers: Option<u64>,
    pub net_profit: Decimal,
    pub last_month_profit: Option<Decimal>,
    pub total_expenses: Decimal,
}

/// Query for `GET /admin/orders`.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AdminOrderFilter {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub limit: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sort: Option<&'static str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub range: Option<&'static str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub start_date: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub end_date: Option<String>,
}

/// Body of `PUT /admin/orders/{id}/status`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderStatusUpdate {
    pub status: OverallStatus,
    pub rejection_message: Option<String>,
    pub active_count: usize,
}

/// A customer ranked by spend.
#[derive(Debug, Clone, PartialEq, Eq, Default, Deserialize, Serialize)]
#[serde(rename_all = "camelCase", default)]
pub struct TopCustomer {
    pub user: Option<PersonRef>,
    pub orders_count: u64,
    pub total_spent: Decimal,
}

/// One page of the top customers report.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase", default)]
pub struct TopCustomersPage {
    pub customers: Vec<TopCustomer>,
    pub total_pages: u32,
}

impl Default for TopCustomersPage {
    fn default() -> Self {
        Self {
            customers: Vec::new(),
            total_pages: 1,
        }
    }
}

/// Kitchen throughput for one staff member.
#[derive(Debug, Clone, PartialEq, Default, Deserialize, Serialize)]
#[serde(rename_all = "camelCase", default)]
pub struct StaffPerformance {
    pub staff: Option<PersonRef>,
    pub items_prepared: u64,
    pub total_revenue: Decimal,
    pub avg_prep_time_per_item: Option<f64>,
}

/// Body for creating or updating a staff account.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StaffInput {
    pub full_name: String,
    pub email: String,
    pub phone: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub password: Option<String>,
    pub role: Role,
}

/// A recorded operating expense.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Expense {
    #[serde(rename = "_id")]
    pub id: ExpenseId,
    #[serde(rename = "type")]
    pub kind: ExpenseType,
    pub amount: Decimal,
    pub date: DateTime<Utc>,
    #[serde(default)]
    pub note: Option<String>,
    #[serde(default)]
    pub recorded_by: Option<Ref<PersonRef>>,
}

impl Expense {
    #[must_use]
    pub fn recorded_by_name(&self) -> &str {
        self.recorded_by
            .as_ref()
            .and_then(Ref::populated)
            .map_or("Unknown", |p| p.full_name.as_str())
    }
}

/// Query for `GET /admin/expenses`.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ExpenseFilter {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub start_date: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub end_date: Option<String>,
    #[serde(rename = "type", skip_serializing_if = "Option::is_none")]
    pub kind: Option<ExpenseType>,
}

/// Body of `POST /admin/expenses`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct NewExpense {
    #[serde(rename = "type")]
    pub kind: ExpenseType,
    #[serde(with = "rust_decimal::serde::float")]
    pub amount: Decimal,
    pub date: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub note: Option<String>,
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_product_defaults() {
        let p: Product = serde_json::from_str(
            r#"{"_id":"p1","name":"Idli","price":40,"discountPrice":35.5}"#,
        )
        .unwrap();
        assert_eq!(p.currency, "INR");
        assert!(p.is_available());
        assert_eq!(p.availability.available_days.len(), 7);
        assert_eq!(p.menu_price().effective(), Decimal::new(355, 1));
    }

    #[test]
    fn test_cart_item_tolerates_deleted_product() {
        let items: Vec<CartItem> = serde_json::from_str(
            r#"[{"productId":null,"quantity":2},
                {"productId":{"_id":"p1","name":"Tea","price":10},"quantity":1},
                {"productId":"p2","quantity":3}]"#,
        )
        .unwrap();
        assert!(items[0].product().is_none());
        assert_eq!(items[1].product().unwrap().name, "Tea");
        assert!(items[2].product().is_none());
    }

    #[test]
    fn test_order_with_populated_customer() {
        let order: Order = serde_json::from_str(
            r#"{"_id":"o1","userId":{"_id":"u1","fullName":"Asha","email":"a@x.in"},
                "items":[{"_id":"i1","productId":"p1","productName":"Dosa","price":60,"quantity":2,"status":"rejected","rejectionMessage":"out of batter"}],
                "totalAmount":120,"overallStatus":"preparing","paymentStatus":"paid",
                "createdAt":"2025-03-01T10:00:00.000Z"}"#,
        )
        .unwrap();
        assert_eq!(order.customer().unwrap().full_name, "Asha");
        assert_eq!(order.items[0].product_id(), Some("p1"));
        assert_eq!(order.items[0].status, ItemStatus::Rejected);
        assert!(order.payment_status.is_paid());
    }

    #[test]
    fn test_review_like_and_author() {
        let r: Review = serde_json::from_str(
            r#"{"_id":"r1","userId":{"_id":"u1","fullName":"Ravi"},"rating":4,"comment":"good","likes":["u2"]}"#,
        )
        .unwrap();
        assert_eq!(r.author_id(), Some("u1"));
        assert_eq!(r.author_name(), "Ravi");
        assert!(r.is_liked_by(&UserId::new("u2")));
        assert!(!r.is_liked_by(&UserId::new("u1")));
    }

    #[test]
    fn test_product_input_sends_numbers() {
        let input = ProductInput {
            name: "Tea".into(),
            description: "Masala chai".into(),
            image_url: "/uploads/tea.png".into(),
            price: Decimal::from(20),
            discount_price: None,
            currency: "INR".into(),
            cuisine: "Beverages".into(),
            categories: vec!["Beverages".into()],
            dietary_info: DietaryInfo::default(),
            availability: Availability::default(),
        };
        let json = serde_json::to_value(&input).unwrap();
        assert_eq!(json["price"], serde_json::json!(20.0));
        assert!(json.get("discountPrice").is_none());
        assert_eq!(json["availability"]["availableFrom"], "00:00");
    }

    #[test]
    fn test_expense_recorder_populated_or_bare() {
        let expenses: Vec<Expense> = serde_json::from_str(
            r#"[{"_id":"e1","type":"goods","amount":250,"date":"2025-03-02T08:00:00.000Z",
                 "recordedBy":{"_id":"u3","fullName":"Meena"}},
                {"_id":"e1","type":"goods","amount":250,"date":"2025-03-02T08:00:00.000Z",
                 "recordedBy":"u3"}]"#,
        )
        .unwrap();
        assert_eq!(expenses[0].recorded_by_name(), "Meena");
        assert_eq!(expenses[1].recorded_by_name(), "Unknown");
        assert_eq!(expenses[1].recorded_by, Some(Ref::Id("u3".to_owned())));
        assert_ne!(expenses[0], expenses[1]);
        assert_eq!(expenses[0], expenses[0].clone());
    }

    #[test]
    fn test_order_item_product_summary() {
        let item: OrderItem = serde_json::from_str(
            r#"{"_id":"i1","productId":{"_id":"p1","name":"Dosa"},"productName":"Dosa","price":60,"quantity":1}"#,
        )
        .unwrap();
        let expected = ProductSummary {
            id: ProductId::new("p1"),
            name: Some("Dosa".to_owned()),
            image_url: None,
        };
        assert_eq!(item.product, Some(Ref::Populated(expected)));
    }
}
