//! Admin dashboard, order management, staff, expenses and uploads.

use canteen_core::{OrderId, UserId};
use reqwest::Method;
use reqwest::multipart::{Form, Part};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use tracing::instrument;

use super::orders::OrderEnvelope;
use super::types::{
    AdminOrderFilter, DashboardStats, Expense, ExpenseFilter, NewExpense, Order,
    OrderStatusUpdate, StaffInput, StaffPerformance, TopCustomersPage, User,
};
use super::{ApiError, ApiSession, CanteenClient, decode, segment};

/// `GET /admin/orders` answers with either `{orders: [...]}` or a bare array.
#[derive(Deserialize)]
#[serde(untagged)]
enum AdminOrders {
    Wrapped {
        #[serde(default)]
        orders: Vec<Order>,
    },
    Bare(Vec<Order>),
}

#[derive(Serialize)]
struct Refund {
    #[serde(with = "rust_decimal::serde::float")]
    amount: Decimal,
}

#[derive(Serialize)]
struct PeopleQuery<'a> {
    range: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    page: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    limit: Option<u32>,
}

#[derive(Deserialize)]
struct StaffPerformanceEnvelope {
    #[serde(default)]
    staff: Vec<StaffPerformance>,
}

#[derive(Deserialize)]
struct StaffEnvelope {
    #[serde(default)]
    staff: Vec<User>,
}

#[derive(Deserialize)]
struct ExpensesEnvelope {
    #[serde(default)]
    expenses: Vec<Expense>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct UploadResponse {
    #[serde(default)]
    success: bool,
    image_url: Option<String>,
    error: Option<String>,
}

impl CanteenClient {
    /// Headline numbers for the dashboard.
    ///
    /// # Errors
    ///
    /// Returns an error if the API request fails.
    #[instrument(skip(self, session))]
    pub async fn dashboard_stats(&self, session: &ApiSession) -> Result<DashboardStats, ApiError> {
        let request = self.request(Method::GET, "admin/dashboard/stats", Some(session))?;
        self.execute(request).await
    }

    /// All orders, filtered by date range or count.
    ///
    /// # Errors
    ///
    /// Returns an error if the API request fails.
    #[instrument(skip(self, session))]
    pub async fn admin_orders(
        &self,
        session: &ApiSession,
        filter: &AdminOrderFilter,
    ) -> Result<Vec<Order>, ApiError> {
        let request = self
            .request(Method::GET, "admin/orders", Some(session))?
            .query(filter);
        let orders = match self.execute(request).await? {
            AdminOrders::Wrapped { orders } | AdminOrders::Bare(orders) => orders,
        };
        Ok(orders)
    }

    /// Any customer's order, with the customer populated.
    ///
    /// # Errors
    ///
    /// Returns [`ApiError::NotFound`] for unknown ids.
    #[instrument(skip(self, session), fields(order_id = %id))]
    pub async fn admin_order(&self, session: &ApiSession, id: &OrderId) -> Result<Order, ApiError> {
        let path = format!("admin/orders/{}", segment(id.as_str()));
        let request = self.request(Method::GET, &path, Some(session))?;
        let envelope: OrderEnvelope = self.execute(request).await?;
        Ok(envelope.order)
    }

    /// Complete or reject an order.
    ///
    /// # Errors
    ///
    /// Returns [`ApiError::Conflict`] when items changed since the page was
    /// rendered.
    #[instrument(skip(self, session, update), fields(order_id = %id, status = %update.status))]
    pub async fn update_order_status(
        &self,
        session: &ApiSession,
        id: &OrderId,
        update: &OrderStatusUpdate,
    ) -> Result<(), ApiError> {
        let path = format!("admin/orders/{}/status", segment(id.as_str()));
        let request = self.request(Method::PUT, &path, Some(session))?.json(update);
        self.execute_unit(request).await
    }

    /// Refund the rejected and cancelled part of an order.
    ///
    /// # Errors
    ///
    /// Returns an error if the API request fails.
    #[instrument(skip(self, session), fields(order_id = %id))]
    pub async fn refund_order(
        &self,
        session: &ApiSession,
        id: &OrderId,
        amount: Decimal,
    ) -> Result<(), ApiError> {
        let path = format!("admin/orders/{}/refund", segment(id.as_str()));
        let request = self
            .request(Method::POST, &path, Some(session))?
            .json(&Refund { amount });
        self.execute_unit(request).await
    }

    /// Customers ranked by spend, one page at a time.
    ///
    /// # Errors
    ///
    /// Returns an error if the API request fails.
    #[instrument(skip(self, session))]
    pub async fn top_customers(
        &self,
        session: &ApiSession,
        range: &str,
        page: u32,
        limit: u32,
    ) -> Result<TopCustomersPage, ApiError> {
        let request = self
            .request(Method::GET, "admin/analytics/top-customers", Some(session))?
            .query(&PeopleQuery {
                range,
                page: Some(page),
                limit: Some(limit),
            });
        self.execute(request).await
    }

    /// # Errors
    ///
    /// Returns an error if the API request fails.
    #[instrument(skip(self, session))]
    pub async fn staff_performance(
        &self,
        session: &ApiSession,
        range: &str,
    ) -> Result<Vec<StaffPerformance>, ApiError> {
        let request = self
            .request(Method::GET, "admin/analytics/staff-performance", Some(session))?
            .query(&PeopleQuery {
                range,
                page: None,
                limit: None,
            });
        let envelope: StaffPerformanceEnvelope = self.execute(request).await?;
        Ok(envelope.staff)
    }

    /// Kitchen and admin accounts.
    ///
    /// # Errors
    ///
    /// Returns an error if the API request fails.
    #[instrument(skip(self, session))]
    pub async fn staff(&self, session: &ApiSession) -> Result<Vec<User>, ApiError> {
        let request = self.request(Method::GET, "admin/staff", Some(session))?;
        let envelope: StaffEnvelope = self.execute(request).await?;
        Ok(envelope.staff)
    }

    /// # Errors
    ///
    /// Returns an error carrying the API's message when refused.
    #[instrument(skip(self, session, input), fields(email = %input.email))]
    pub async fn create_staff(&self, session: &ApiSession, input: &StaffInput) -> Result<(), ApiError> {
        let request = self
            .request(Method::POST, "admin/staff", Some(session))?
            .json(input);
        self.execute_unit(request).await
    }

    /// # Errors
    ///
    /// Returns an error carrying the API's message when refused.
    #[instrument(skip(self, session, input), fields(staff_id = %id))]
    pub async fn update_staff(
        &self,
        session: &ApiSession,
        id: &UserId,
        input: &StaffInput,
    ) -> Result<(), ApiError> {
        let path = format!("admin/staff/{}", segment(id.as_str()));
        let request = self.request(Method::PUT, &path, Some(session))?.json(input);
        self.execute_unit(request).await
    }

    /// # Errors
    ///
    /// Returns an error if the API request fails.
    #[instrument(skip(self, session), fields(staff_id = %id))]
    pub async fn delete_staff(&self, session: &ApiSession, id: &UserId) -> Result<(), ApiError> {
        let path = format!("admin/staff/{}", segment(id.as_str()));
        let request = self.request(Method::DELETE, &path, Some(session))?;
        self.execute_unit(request).await
    }

    /// # Errors
    ///
    /// Returns an error if the API request fails.
    #[instrument(skip(self, session))]
    pub async fn expenses(
        &self,
        session: &ApiSession,
        filter: &ExpenseFilter,
    ) -> Result<Vec<Expense>, ApiError> {
        let request = self
            .request(Method::GET, "admin/expenses", Some(session))?
            .query(filter);
        let envelope: ExpensesEnvelope = self.execute(request).await?;
        Ok(envelope.expenses)
    }

    /// # Errors
    ///
    /// Returns an error if the API request fails.
    #[instrument(skip(self, session, expense), fields(kind = %expense.kind, amount = %expense.amount))]
    pub async fn create_expense(&self, session: &ApiSession, expense: &NewExpense) -> Result<(), ApiError> {
        let request = self
            .request(Method::POST, "admin/expenses", Some(session))?
            .json(expense);
        self.execute_unit(request).await
    }

    /// Upload a product photo and return its URL.
    ///
    /// Uses the longer upload timeout.
    ///
    /// # Errors
    ///
    /// Returns [`ApiError::Upload`] with the API's reason when refused.
    #[instrument(skip(self, session, bytes), fields(size = bytes.len()))]
    pub async fn upload_image(
        &self,
        session: &ApiSession,
        file_name: &str,
        content_type: &str,
        bytes: Vec<u8>,
    ) -> Result<String, ApiError> {
        let part = Part::bytes(bytes)
            .file_name(file_name.to_owned())
            .mime_str(content_type)?;
        let form = Form::new().part("image", part);

        let request = self
            .request(Method::POST, "admin/upload", Some(session))?
            .timeout(self.inner.config.upload_timeout)
            .multipart(form);

        let body = match self.execute_raw(request).await {
            Ok((_, body)) => body,
            Err(ApiError::Status { status, message }) => {
                return Err(ApiError::Upload(if message.starts_with("Request failed") {
                    format!("Upload failed: {status}")
                } else {
                    message
                }));
            }
            Err(e) => return Err(e),
        };

        let response: UploadResponse = decode(&body)?;
        match response.image_url {
            Some(url) if response.success => Ok(url),
            _ => Err(ApiError::Upload(
                response.error.unwrap_or_else(|| "Upload failed".to_owned()),
            )),
        }
    }
}
