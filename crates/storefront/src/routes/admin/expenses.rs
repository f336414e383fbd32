//! Operating expenses: filtered list with totals and the add form.

use askama::Template;
use askama_web::WebTemplate;
use axum::{
    Form,
    extract::{Query, State},
    response::{IntoResponse, Response},
};
use canteen_core::analytics::ExpenseSummary;
use canteen_core::validation::{self, ValidationError};
use canteen_core::ExpenseType;
use chrono::{NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::Deserialize;
use tower_sessions::Session;
use tracing::{info, instrument, warn};

use crate::api::{Expense, ExpenseFilter, NewExpense};
use crate::error::AppError;
use crate::filters;
use crate::middleware::RequireAuth;
use crate::models::Flash;
use crate::routes::page::{Page, money, redirect_with};
use crate::state::AppState;

const EXPENSES_PATH: &str = "/admin/expenses";

const DATE_FORMAT: &str = "%Y-%m-%d";

/// An entry of the expense type picker.
#[derive(Debug, Clone, Copy)]
pub struct TypeOption {
    pub value: &'static str,
    pub label: &'static str,
}

fn type_options() -> Vec<TypeOption> {
    ExpenseType::ALL
        .iter()
        .map(|t| TypeOption {
            value: t.as_str(),
            label: t.label(),
        })
        .collect()
}

fn parse_date(value: &str) -> Option<NaiveDate> {
    NaiveDate::parse_from_str(value.trim(), DATE_FORMAT).ok()
}

/// Expense list filters, as typed. Blank or malformed values are ignored.
#[derive(Debug, Default, Deserialize)]
pub struct ExpenseQuery {
    #[serde(default)]
    pub start_date: String,
    #[serde(default)]
    pub end_date: String,
    #[serde(default, rename = "type")]
    pub kind: String,
}

impl ExpenseQuery {
    /// The API filter for this query.
    #[must_use]
    pub fn filter(&self) -> ExpenseFilter {
        let date = |value: &str| parse_date(value).map(|d| d.format(DATE_FORMAT).to_string());
        ExpenseFilter {
            start_date: date(&self.start_date),
            end_date: date(&self.end_date),
            kind: self.kind.parse().ok(),
        }
    }
}

/// An expense row.
#[derive(Clone)]
pub struct ExpenseView {
    pub date: String,
    pub kind: &'static str,
    pub amount: String,
    pub note: String,
    pub recorded_by: String,
}

impl From<&Expense> for ExpenseView {
    fn from(expense: &Expense) -> Self {
        Self {
            date: expense.date.format("%d %b %Y").to_string(),
            kind: expense.kind.label(),
            amount: money(expense.amount),
            note: expense.note.clone().unwrap_or_default(),
            recorded_by: expense.recorded_by_name().to_owned(),
        }
    }
}

/// Expense totals, formatted.
#[derive(Clone)]
pub struct SummaryView {
    pub total: String,
    pub today: String,
    pub this_month: String,
}

impl From<ExpenseSummary> for SummaryView {
    fn from(summary: ExpenseSummary) -> Self {
        Self {
            total: money(summary.total),
            today: money(summary.today),
            this_month: money(summary.this_month),
        }
    }
}

/// Totals over the listed expenses.
#[must_use]
pub fn summarize(expenses: &[Expense], today: NaiveDate) -> ExpenseSummary {
    ExpenseSummary::compute(
        expenses.iter().map(|e| (e.date.date_naive(), e.amount)),
        today,
    )
}

/// Expense list template.
#[derive(Template, WebTemplate)]
#[template(path = "admin/expenses.html")]
pub struct ExpensesTemplate {
    pub page: Page,
    pub expenses: Vec<ExpenseView>,
    pub summary: SummaryView,
    pub query: ExpenseQuery,
    pub types: Vec<TypeOption>,
    pub error: Option<String>,
}

/// Display expenses matching the filters.
#[instrument(skip(state, page, auth))]
pub async fn index(
    State(state): State<AppState>,
    page: Page,
    RequireAuth(auth): RequireAuth,
    Query(query): Query<ExpenseQuery>,
) -> Response {
    let (expenses, error) = match state.api().expenses(&auth.api, &query.filter()).await {
        Ok(expenses) => (expenses, None),
        Err(e) if e.is_unauthorized() => return AppError::from(e).into_response(),
        Err(e) => {
            warn!(error = %e, "Error fetching expenses");
            (Vec::new(), Some("Failed to load expenses".to_owned()))
        }
    };

    ExpensesTemplate {
        page,
        summary: summarize(&expenses, Utc::now().date_naive()).into(),
        expenses: expenses.iter().map(ExpenseView::from).collect(),
        query,
        types: type_options(),
        error,
    }
    .into_response()
}

// =============================================================================
// Add expense
// =============================================================================

/// Add expense form.
#[derive(Debug, Default, Deserialize)]
pub struct ExpenseForm {
    #[serde(default, rename = "type")]
    pub kind: String,
    #[serde(default)]
    pub amount: String,
    #[serde(default)]
    pub date: String,
    #[serde(default)]
    pub note: String,
}

impl ExpenseForm {
    fn to_expense(&self) -> Result<NewExpense, ValidationError> {
        let kind = self
            .kind
            .parse::<ExpenseType>()
            .map_err(|_| ValidationError::Required("Type"))?;
        let amount = self.amount.trim().parse::<Decimal>().ok();
        let date = parse_date(&self.date);
        validation::expense(amount, date)?;

        let note = self.note.trim();
        Ok(NewExpense {
            kind,
            amount: amount.unwrap_or_default(),
            date: date.map(|d| d.format(DATE_FORMAT).to_string()).unwrap_or_default(),
            note: (!note.is_empty()).then(|| note.to_owned()),
        })
    }
}

/// Add expense template.
#[derive(Template, WebTemplate)]
#[template(path = "admin/expense_form.html")]
pub struct ExpenseFormTemplate {
    pub page: Page,
    pub form: ExpenseForm,
    pub types: Vec<TypeOption>,
    pub error: Option<String>,
}

/// Display the add expense form, dated today.
pub async fn new_page(page: Page) -> Response {
    ExpenseFormTemplate {
        page,
        form: ExpenseForm {
            date: Utc::now().date_naive().format(DATE_FORMAT).to_string(),
            ..ExpenseForm::default()
        },
        types: type_options(),
        error: None,
    }
    .into_response()
}

/// Record an expense.
#[instrument(skip(state, session, page, auth, form))]
pub async fn create(
    State(state): State<AppState>,
    session: Session,
    page: Page,
    RequireAuth(auth): RequireAuth,
    Form(form): Form<ExpenseForm>,
) -> Response {
    let refuse = |page, form, message: String| {
        ExpenseFormTemplate {
            page,
            form,
            types: type_options(),
            error: Some(message),
        }
        .into_response()
    };

    let expense = match form.to_expense() {
        Ok(expense) => expense,
        Err(e) => return refuse(page, form, e.to_string()),
    };

    match state.api().create_expense(&auth.api, &expense).await {
        Ok(()) => {
            info!(kind = %expense.kind, amount = %expense.amount, "Expense recorded");
            redirect_with(&session, EXPENSES_PATH, Flash::success("Expense added successfully!")).await
        }
        Err(e) if e.is_unauthorized() => AppError::from(e).into_response(),
        Err(e) => {
            warn!(error = %e, "Expense creation failed");
            refuse(page, form, "Failed to add expense".to_owned())
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_query_drops_blank_and_malformed_filters() {
        let query = ExpenseQuery {
            start_date: "2025-03-01".into(),
            end_date: "yesterday".into(),
            kind: String::new(),
        };
        let filter = query.filter();
        assert_eq!(filter.start_date.as_deref(), Some("2025-03-01"));
        assert!(filter.end_date.is_none());
        assert!(filter.kind.is_none());

        let query = ExpenseQuery {
            kind: "goods".into(),
            ..ExpenseQuery::default()
        };
        assert_eq!(query.filter().kind, Some(ExpenseType::Goods));
    }

    fn form(kind: &str, amount: &str, date: &str) -> ExpenseForm {
        ExpenseForm {
            kind: kind.into(),
            amount: amount.into(),
            date: date.into(),
            note: "  ".into(),
        }
    }

    #[test]
    fn test_expense_form_checks() {
        assert_eq!(
            form("", "100", "2025-03-01").to_expense(),
            Err(ValidationError::Required("Type"))
        );
        assert_eq!(
            form("salary", "0", "2025-03-01").to_expense(),
            Err(ValidationError::NotPositive("Amount"))
        );
        assert_eq!(
            form("salary", "100", "").to_expense(),
            Err(ValidationError::Required("Date"))
        );

        let expense = form("utilities", "1250.50", "2025-03-01").to_expense().unwrap();
        assert_eq!(expense.kind, ExpenseType::Utilities);
        assert_eq!(expense.amount, Decimal::new(125_050, 2));
        assert_eq!(expense.date, "2025-03-01");
        assert!(expense.note.is_none());
    }

    #[test]
    fn test_summary_of_listed_expenses() {
        let expenses: Vec<Expense> = serde_json::from_str(
            r#"[
              {"_id":"e1","type":"salary","amount":1000,"date":"2025-03-17T08:00:00.000Z"},
              {"_id":"e2","type":"goods","amount":250,"date":"2025-03-02T08:00:00.000Z"},
              {"_id":"e3","type":"goods","amount":400,"date":"2025-02-20T08:00:00.000Z"}
            ]"#,
        )
        .unwrap();
        let today = NaiveDate::from_ymd_opt(2025, 3, 17).unwrap();
        let summary = SummaryView::from(summarize(&expenses, today));
        assert_eq!(summary.total, "₹1650");
        assert_eq!(summary.today, "₹1000");
        assert_eq!(summary.this_month, "₹1250");
    }
}
