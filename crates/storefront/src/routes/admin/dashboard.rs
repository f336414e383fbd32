//! Admin dashboard: headline stats, best sellers and people analytics.

use askama::Template;
use askama_web::WebTemplate;
use axum::{
    extract::{Query, State},
    response::{IntoResponse, Response},
};
use canteen_core::analytics::{
    AnalyticsRange, SaleLine, TopProduct, growth_badge, growth_percent, top_products,
};
use rust_decimal::Decimal;
use serde::Deserialize;
use tracing::{instrument, warn};

use crate::api::{AdminOrderFilter, DashboardStats, Order, StaffPerformance, TopCustomer};
use crate::config::CanteenApiConfig;
use crate::error::AppError;
use crate::filters;
use crate::middleware::RequireAuth;
use crate::routes::admin::{RangeOption, range_options};
use crate::routes::page::{OrderView, Page, money};
use crate::state::AppState;

/// Customers per page of the top customers table.
pub const CUSTOMERS_PER_PAGE: u32 = 10;

/// Best sellers listed.
const TOP_PRODUCT_LIMIT: usize = 10;

/// Orders scanned for best sellers.
const TOP_PRODUCT_SCAN: u32 = 500;

/// Dashboard query.
#[derive(Debug, Default, Deserialize)]
pub struct DashboardQuery {
    pub product_range: Option<String>,
    pub people_range: Option<String>,
    pub page: Option<u32>,
}

impl DashboardQuery {
    fn product_range(&self) -> AnalyticsRange {
        parse_range(self.product_range.as_deref(), AnalyticsRange::SevenDays)
    }

    fn people_range(&self) -> AnalyticsRange {
        parse_range(self.people_range.as_deref(), AnalyticsRange::ThirtyDays)
    }

    fn page(&self) -> u32 {
        self.page.unwrap_or(1).max(1)
    }
}

fn parse_range(raw: Option<&str>, default: AnalyticsRange) -> AnalyticsRange {
    raw.and_then(|r| r.parse().ok()).unwrap_or(default)
}

/// A headline number with its month-over-month change.
#[derive(Clone)]
pub struct StatCard {
    pub title: &'static str,
    pub value: String,
    pub change: String,
    /// Whether the change is an increase (or unknown).
    pub rising: bool,
    pub note: Option<String>,
}

impl StatCard {
    fn new(title: &'static str, value: String, change: Option<Decimal>) -> Self {
        Self {
            title,
            value,
            change: growth_badge(change),
            rising: change.is_none_or(|c| !c.is_sign_negative()),
            note: None,
        }
    }
}

/// The four headline cards.
#[must_use]
pub fn stat_cards(stats: &DashboardStats) -> Vec<StatCard> {
    let count_growth = |current: u64, previous: Option<u64>| {
        growth_percent(Decimal::from(current), previous.map(Decimal::from))
    };

    let mut profit = StatCard::new(
        "Net Profit",
        money(stats.net_profit),
        growth_percent(stats.net_profit, stats.last_month_profit),
    );
    profit.note = Some(format!(
        "Revenue - Expenses (Expenses: {})",
        money(stats.total_expenses)
    ));

    vec![
        StatCard::new(
            "Total Revenue",
            money(stats.total_revenue),
            growth_percent(stats.total_revenue, stats.last_month_revenue),
        ),
        StatCard::new(
            "Total Orders",
            stats.total_orders.to_string(),
            count_growth(stats.total_orders, stats.last_month_orders),
        ),
        StatCard::new(
            "Total Customers",
            stats.total_customers.to_string(),
            count_growth(stats.total_customers, stats.last_month_customers),
        ),
        profit,
    ]
}

/// A best-selling product row.
#[derive(Clone)]
pub struct TopProductView {
    pub rank: usize,
    pub name: String,
    pub image: String,
    pub total_sold: u64,
    pub revenue: String,
}

/// Rank products across the given orders by revenue.
#[must_use]
pub fn best_sellers(orders: &[Order], api: &CanteenApiConfig) -> Vec<TopProductView> {
    let lines = orders.iter().flat_map(|order| {
        order.items.iter().map(|item| {
            let summary = item.product_summary();
            SaleLine {
                product_id: item.product_id(),
                product_name: summary.and_then(|p| p.name.as_deref()),
                line_name: &item.product_name,
                image_url: summary.and_then(|p| p.image_url.as_deref()),
                unit_price: item.price,
                quantity: item.quantity,
            }
        })
    });

    top_products(lines, TOP_PRODUCT_LIMIT)
        .into_iter()
        .enumerate()
        .map(|(i, TopProduct { name, image_url, total_sold, revenue, .. })| TopProductView {
            rank: i + 1,
            name,
            image: image_url.map(|url| api.asset(&url)).unwrap_or_default(),
            total_sold,
            revenue: money(revenue),
        })
        .collect()
}

/// A top customer row.
#[derive(Clone)]
pub struct TopCustomerView {
    pub name: String,
    pub email: String,
    pub orders: u64,
    pub spent: String,
}

impl From<&TopCustomer> for TopCustomerView {
    fn from(customer: &TopCustomer) -> Self {
        Self {
            name: customer
                .user
                .as_ref()
                .map_or_else(|| "Unknown".to_owned(), |u| u.full_name.clone()),
            email: customer.user.as_ref().map(|u| u.email.clone()).unwrap_or_default(),
            orders: customer.orders_count,
            spent: money(customer.total_spent),
        }
    }
}

/// A kitchen staff performance row.
#[derive(Clone)]
pub struct StaffPerformanceView {
    pub name: String,
    pub items_prepared: u64,
    pub revenue: String,
    pub avg_prep: String,
}

impl From<&StaffPerformance> for StaffPerformanceView {
    fn from(row: &StaffPerformance) -> Self {
        Self {
            name: row
                .staff
                .as_ref()
                .map_or_else(|| "Unknown".to_owned(), |s| s.full_name.clone()),
            items_prepared: row.items_prepared,
            revenue: money(row.total_revenue),
            avg_prep: row
                .avg_prep_time_per_item
                .map_or_else(|| "N/A".to_owned(), |mins| format!("{mins:.1} min")),
        }
    }
}

/// Admin dashboard template.
#[derive(Template, WebTemplate)]
#[template(path = "admin/dashboard.html")]
pub struct DashboardTemplate {
    pub page: Page,
    pub cards: Vec<StatCard>,
    pub last_order: Option<OrderView>,
    pub top_products: Vec<TopProductView>,
    pub product_range: &'static str,
    pub people_range: &'static str,
    pub ranges: Vec<RangeOption>,
    pub customers: Vec<TopCustomerView>,
    pub customer_page: u32,
    pub customer_pages: u32,
    pub staff: Vec<StaffPerformanceView>,
    pub error: Option<String>,
}

impl DashboardTemplate {
    /// Link to another page of the customers table, keeping the ranges.
    #[must_use]
    pub fn customers_link(&self, page: u32) -> String {
        format!(
            "/admin?product_range={}&people_range={}&page={page}",
            self.product_range, self.people_range
        )
    }

    #[must_use]
    pub const fn has_previous(&self) -> bool {
        self.customer_page > 1
    }

    #[must_use]
    pub const fn has_next(&self) -> bool {
        self.customer_page < self.customer_pages
    }

    #[must_use]
    pub const fn previous_page(&self) -> u32 {
        self.customer_page.saturating_sub(1)
    }

    #[must_use]
    pub const fn next_page(&self) -> u32 {
        self.customer_page + 1
    }
}

/// Display the admin dashboard.
///
/// Only the headline stats are required; the other panels render empty
/// when their calls fail.
#[instrument(skip(state, page, auth))]
pub async fn index(
    State(state): State<AppState>,
    page: Page,
    RequireAuth(auth): RequireAuth,
    Query(query): Query<DashboardQuery>,
) -> Response {
    let api = state.api();
    let product_range = query.product_range();
    let people_range = query.people_range();
    let customer_page = query.page();

    let recent_filter = AdminOrderFilter {
        limit: Some(20),
        sort: Some("desc"),
        ..AdminOrderFilter::default()
    };
    let ranged_filter = AdminOrderFilter {
        limit: Some(TOP_PRODUCT_SCAN),
        range: Some(product_range.as_str()),
        ..AdminOrderFilter::default()
    };

    let (stats, recent, ranged, customers, staff) = tokio::join!(
        api.dashboard_stats(&auth.api),
        api.admin_orders(&auth.api, &recent_filter),
        api.admin_orders(&auth.api, &ranged_filter),
        api.top_customers(&auth.api, people_range.as_str(), customer_page, CUSTOMERS_PER_PAGE),
        api.staff_performance(&auth.api, people_range.as_str()),
    );

    let (cards, error) = match stats {
        Ok(stats) => (stat_cards(&stats), None),
        Err(e) if e.is_unauthorized() => return AppError::from(e).into_response(),
        Err(e) => {
            warn!(error = %e, "Error loading admin dashboard");
            (Vec::new(), Some("Failed to load dashboard data".to_owned()))
        }
    };

    let last_order = recent
        .map_err(|e| warn!(error = %e, "Failed to load recent orders"))
        .ok()
        .and_then(|orders| orders.into_iter().max_by_key(|o| o.created_at))
        .map(|order| OrderView::from(&order));

    let top_products = ranged.map_or_else(
        |e| {
            warn!(error = %e, "Error loading filtered order data");
            Vec::new()
        },
        |orders| best_sellers(&orders, &state.config().api),
    );

    let customers = customers.unwrap_or_else(|e| {
        warn!(error = %e, "Error loading top customers");
        crate::api::TopCustomersPage::default()
    });
    let staff = staff.unwrap_or_else(|e| {
        warn!(error = %e, "Error loading staff performance");
        Vec::new()
    });

    DashboardTemplate {
        page,
        cards,
        last_order,
        top_products,
        product_range: product_range.as_str(),
        people_range: people_range.as_str(),
        ranges: range_options(),
        customers: customers.customers.iter().map(TopCustomerView::from).collect(),
        customer_page,
        customer_pages: customers.total_pages.max(1),
        staff: staff.iter().map(StaffPerformanceView::from).collect(),
        error,
    }
    .into_response()
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_stat_cards_growth() {
        let stats = DashboardStats {
            total_revenue: Decimal::from(1500),
            last_month_revenue: Some(Decimal::from(1000)),
            total_orders: 40,
            last_month_orders: Some(50),
            total_customers: 12,
            last_month_customers: Some(0),
            net_profit: Decimal::from(-200),
            last_month_profit: None,
            total_expenses: Decimal::from(1700),
        };
        let cards = stat_cards(&stats);
        assert_eq!(cards[0].value, "₹1500");
        assert_eq!(cards[0].change, "+50.0% vs last month");
        assert!(cards[0].rising);
        assert_eq!(cards[1].change, "-20.0% vs last month");
        assert!(!cards[1].rising);
        assert_eq!(cards[2].change, "N/A");
        assert_eq!(cards[3].value, "₹-200");
        assert_eq!(
            cards[3].note.as_deref(),
            Some("Revenue - Expenses (Expenses: ₹1700)")
        );
    }

    #[test]
    fn test_best_sellers_group_deleted_products_by_name() {
        let orders: Vec<Order> = serde_json::from_str(
            r#"[{"_id":"o1","totalAmount":0,"items":[
                  {"_id":"i1","productId":{"_id":"p1","name":"Dosa","imageUrl":"/uploads/d.jpg"},"productName":"Dosa","price":60,"quantity":2},
                  {"_id":"i2","productId":null,"productName":"Old Tea","price":10,"quantity":3}]},
                {"_id":"o2","totalAmount":0,"items":[
                  {"_id":"i3","productId":"p1","productName":"Dosa","price":60,"quantity":1},
                  {"_id":"i4","productName":"Old Tea","price":10,"quantity":1}]}]"#,
        )
        .unwrap();
        let api = CanteenApiConfig::for_base("http://localhost:5000/api").unwrap();
        let rows = best_sellers(&orders, &api);
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].name, "Dosa");
        assert_eq!(rows[0].total_sold, 3);
        assert_eq!(rows[0].revenue, "₹180");
        assert_eq!(rows[0].image, "http://localhost:5000/uploads/d.jpg");
        assert_eq!(rows[1].name, "Old Tea");
        assert_eq!(rows[1].total_sold, 4);
    }

    #[test]
    fn test_query_defaults() {
        let query = DashboardQuery::default();
        assert_eq!(query.product_range(), AnalyticsRange::SevenDays);
        assert_eq!(query.people_range(), AnalyticsRange::ThirtyDays);
        assert_eq!(query.page(), 1);

        let query = DashboardQuery {
            product_range: Some("bogus".into()),
            people_range: Some("all".into()),
            page: Some(0),
        };
        assert_eq!(query.product_range(), AnalyticsRange::SevenDays);
        assert_eq!(query.people_range(), AnalyticsRange::All);
        assert_eq!(query.page(), 1);
    }
}
