//! Dashboard arithmetic: month-over-month change, top products and expense
//! summaries.

use std::collections::HashMap;

use chrono::{Datelike, NaiveDate};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Percentage change from `previous` to `current`.
///
/// `None` when there is no previous value or it is zero.
#[must_use]
pub fn growth_percent(current: Decimal, previous: Option<Decimal>) -> Option<Decimal> {
    let previous = previous.filter(|p| !p.is_zero())?;
    Some((current - previous) / previous * Decimal::ONE_HUNDRED)
}

/// Badge text for a change value, e.g. `+12.5% vs last month` or `N/A`.
#[must_use]
pub fn growth_badge(change: Option<Decimal>) -> String {
    change.map_or_else(
        || "N/A".to_owned(),
        |c| {
            let sign = if c.is_sign_negative() { "" } else { "+" };
            format!("{sign}{:.1}% vs last month", c.round_dp(1))
        },
    )
}

/// Reporting window accepted by the admin analytics endpoints.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum AnalyticsRange {
    #[serde(rename = "7days")]
    #[default]
    SevenDays,
    #[serde(rename = "30days")]
    ThirtyDays,
    #[serde(rename = "90days")]
    NinetyDays,
    #[serde(rename = "all")]
    All,
}

impl AnalyticsRange {
    pub const ALL: [Self; 4] = [Self::SevenDays, Self::ThirtyDays, Self::NinetyDays, Self::All];

    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::SevenDays => "7days",
            Self::ThirtyDays => "30days",
            Self::NinetyDays => "90days",
            Self::All => "all",
        }
    }

    #[must_use]
    pub const fn label(&self) -> &'static str {
        match self {
            Self::SevenDays => "Last 7 days",
            Self::ThirtyDays => "Last 30 days",
            Self::NinetyDays => "Last 90 days",
            Self::All => "All time",
        }
    }
}

impl std::str::FromStr for AnalyticsRange {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|r| r.as_str() == s)
            .ok_or_else(|| format!("invalid range: {s}"))
    }
}

/// One order line as seen by the top products report.
#[derive(Debug, Clone, Copy)]
pub struct SaleLine<'a> {
    /// Product id, or `None` when the product has since been deleted.
    pub product_id: Option<&'a str>,
    /// Current product name when the product still exists.
    pub product_name: Option<&'a str>,
    /// Name captured on the order line at purchase time.
    pub line_name: &'a str,
    pub image_url: Option<&'a str>,
    pub unit_price: Decimal,
    pub quantity: u32,
}

/// Aggregated sales for one product.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TopProduct {
    pub key: String,
    pub name: String,
    pub image_url: Option<String>,
    pub total_sold: u64,
    pub revenue: Decimal,
}

/// Aggregate order lines per product and keep the `limit` best sellers by
/// revenue.
///
/// Lines of deleted products are grouped under `deleted-<line name>`.
pub fn top_products<'a, I>(lines: I, limit: usize) -> Vec<TopProduct>
where
    I: IntoIterator<Item = SaleLine<'a>>,
{
    let mut totals: HashMap<String, TopProduct> = HashMap::new();
    let mut order: Vec<String> = Vec::new();

    for line in lines {
        let key = line
            .product_id
            .map_or_else(|| format!("deleted-{}", line.line_name), str::to_owned);

        let entry = totals.entry(key.clone()).or_insert_with(|| {
            order.push(key.clone());
            let name = line
                .product_name
                .filter(|n| !n.is_empty())
                .or(Some(line.line_name).filter(|n| !n.is_empty()))
                .unwrap_or("Unknown Product");
            TopProduct {
                key,
                name: name.to_owned(),
                image_url: line.image_url.map(str::to_owned),
                total_sold: 0,
                revenue: Decimal::ZERO,
            }
        });

        entry.total_sold += u64::from(line.quantity);
        entry.revenue += line.unit_price * Decimal::from(line.quantity);
    }

    let mut ranked: Vec<TopProduct> = order
        .into_iter()
        .filter_map(|k| totals.remove(&k))
        .collect();
    // Stable sort keeps first-seen order between equal revenues.
    ranked.sort_by(|a, b| b.revenue.cmp(&a.revenue));
    ranked.truncate(limit);
    ranked
}

/// Expense totals shown above the expense list.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ExpenseSummary {
    pub total: Decimal,
    pub today: Decimal,
    pub this_month: Decimal,
}

impl ExpenseSummary {
    /// Sum `(date, amount)` pairs relative to `today`.
    ///
    /// "This month" means the same calendar year and month.
    pub fn compute<I>(entries: I, today: NaiveDate) -> Self
    where
        I: IntoIterator<Item = (NaiveDate, Decimal)>,
    {
        entries
            .into_iter()
            .fold(Self::default(), |mut acc, (date, amount)| {
                acc.total += amount;
                if date == today {
                    acc.today += amount;
                }
                if date.year() == today.year() && date.month() == today.month() {
                    acc.this_month += amount;
                }
                acc
            })
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn dec(s: &str) -> Decimal {
        s.parse().unwrap()
    }

    #[test]
    fn test_growth_percent() {
        assert_eq!(growth_percent(dec("150"), Some(dec("100"))), Some(dec("50")));
        assert_eq!(growth_percent(dec("50"), Some(dec("100"))), Some(dec("-50")));
        assert_eq!(growth_percent(dec("10"), Some(Decimal::ZERO)), None);
        assert_eq!(growth_percent(dec("10"), None), None);
    }

    #[test]
    fn test_growth_badge() {
        assert_eq!(growth_badge(None), "N/A");
        assert_eq!(growth_badge(Some(dec("12.345"))), "+12.3% vs last month");
        assert_eq!(growth_badge(Some(dec("-4"))), "-4.0% vs last month");
        assert_eq!(growth_badge(Some(Decimal::ZERO)), "+0.0% vs last month");
    }

    #[test]
    fn test_range_parse() {
        assert_eq!("90days".parse::<AnalyticsRange>().unwrap(), AnalyticsRange::NinetyDays);
        assert!("year".parse::<AnalyticsRange>().is_err());
    }

    fn line<'a>(id: Option<&'a str>, name: &'a str, price: i64, qty: u32) -> SaleLine<'a> {
        SaleLine {
            product_id: id,
            product_name: id.map(|_| name),
            line_name: name,
            image_url: None,
            unit_price: Decimal::from(price),
            quantity: qty,
        }
    }

    #[test]
    fn test_top_products_groups_and_ranks() {
        let lines = vec![
            line(Some("a"), "Dosa", 50, 2),
            line(Some("b"), "Thali", 200, 1),
            line(Some("a"), "Dosa", 50, 3),
            line(None, "Old Soup", 10, 1),
        ];
        let top = top_products(lines, 10);
        assert_eq!(top.len(), 3);
        assert_eq!(top[0].key, "a");
        assert_eq!(top[0].total_sold, 5);
        assert_eq!(top[0].revenue, Decimal::from(250));
        assert_eq!(top[1].key, "b");
        assert_eq!(top[2].key, "deleted-Old Soup");
    }

    #[test]
    fn test_top_products_truncates() {
        let names: Vec<String> = (1..=15).map(|i| format!("p{i}")).collect();
        let lines = names.iter().zip(1_i64..).map(|(name, price)| SaleLine {
            product_id: None,
            product_name: None,
            line_name: name,
            image_url: None,
            unit_price: Decimal::from(price),
            quantity: 1,
        });
        let top = top_products(lines, 10);
        assert_eq!(top.len(), 10);
        assert_eq!(top[0].name, "p15");
    }

    #[test]
    fn test_expense_summary_compares_year_and_month() {
        let today = NaiveDate::from_ymd_opt(2025, 3, 14).unwrap();
        let entries = vec![
            (today, dec("100")),
            (NaiveDate::from_ymd_opt(2025, 3, 1).unwrap(), dec("50")),
            (NaiveDate::from_ymd_opt(2024, 3, 14).unwrap(), dec("25")),
        ];
        let s = ExpenseSummary::compute(entries, today);
        assert_eq!(s.total, dec("175"));
        assert_eq!(s.today, dec("100"));
        assert_eq!(s.this_month, dec("150"));
    }
}
