//! Type-safe price representation using decimal arithmetic.
//!
//! Menu prices arrive from the API as JSON numbers in the currency's
//! standard unit (rupees, not paise). They are held as [`Decimal`] so cart
//! and refund totals never accumulate floating point error.

use core::fmt;

use rust_decimal::prelude::ToPrimitive;
use rust_decimal::{Decimal, RoundingStrategy};
use serde::{Deserialize, Serialize};

/// A price with currency information.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Price {
    /// Amount in the currency's standard unit.
    pub amount: Decimal,
    /// ISO 4217 currency code.
    pub currency_code: CurrencyCode,
}

impl Price {
    /// Create a new price.
    #[must_use]
    pub const fn new(amount: Decimal, currency_code: CurrencyCode) -> Self {
        Self {
            amount,
            currency_code,
        }
    }

    /// Create a price in the default currency (INR).
    #[must_use]
    pub fn inr(amount: Decimal) -> Self {
        Self::new(amount, CurrencyCode::INR)
    }

    /// Multiply by a line quantity.
    #[must_use]
    pub fn times(self, quantity: u32) -> Self {
        Self::new(self.amount * Decimal::from(quantity), self.currency_code)
    }

    /// Format for display, e.g. `₹120` or `₹99.50`.
    #[must_use]
    pub fn display(&self) -> String {
        format!("{}{}", self.currency_code.symbol(), format_amount(self.amount))
    }
}

impl fmt::Display for Price {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.display())
    }
}

/// Format an amount without trailing zero paise.
#[must_use]
pub fn format_amount(amount: Decimal) -> String {
    let rounded = amount.round_dp(2);
    if rounded.fract().is_zero() {
        rounded.trunc().to_string()
    } else {
        format!("{rounded:.2}")
    }
}

/// ISO 4217 currency codes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub enum CurrencyCode {
    #[default]
    INR,
    USD,
    EUR,
    GBP,
}

impl CurrencyCode {
    /// Display symbol for the currency.
    #[must_use]
    pub const fn symbol(&self) -> &'static str {
        match self {
            Self::INR => "₹",
            Self::USD => "$",
            Self::EUR => "€",
            Self::GBP => "£",
        }
    }
}

/// A menu price together with its optional discounted price.
///
/// A discount only counts when it is strictly below the list price.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MenuPrice {
    pub price: Decimal,
    pub discount_price: Option<Decimal>,
}

impl MenuPrice {
    #[must_use]
    pub const fn new(price: Decimal, discount_price: Option<Decimal>) -> Self {
        Self {
            price,
            discount_price,
        }
    }

    /// Whether a real discount applies.
    #[must_use]
    pub fn has_discount(&self) -> bool {
        self.discount_price.is_some_and(|d| d < self.price)
    }

    /// The price the customer pays: the discount price when set, otherwise
    /// the list price.
    #[must_use]
    pub fn effective(&self) -> Decimal {
        self.discount_price.unwrap_or(self.price)
    }

    /// Whole-number percentage saved, rounded half away from zero.
    ///
    /// Returns `None` when there is no discount or the list price is zero.
    #[must_use]
    pub fn discount_percent(&self) -> Option<u32> {
        let discount = self.discount_price.filter(|_| self.has_discount())?;
        if self.price.is_zero() {
            return None;
        }
        let pct = (self.price - discount) / self.price * Decimal::ONE_HUNDRED;
        pct.round_dp_with_strategy(0, RoundingStrategy::MidpointAwayFromZero)
            .to_u32()
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
    fn test_display_drops_zero_paise() {
        assert_eq!(Price::inr(dec("120")).display(), "₹120");
        assert_eq!(Price::inr(dec("120.00")).display(), "₹120");
        assert_eq!(Price::inr(dec("99.5")).display(), "₹99.50");
    }

    #[test]
    fn test_effective_prefers_discount() {
        let p = MenuPrice::new(dec("200"), Some(dec("150")));
        assert_eq!(p.effective(), dec("150"));
        assert!(p.has_discount());
        assert_eq!(p.discount_percent(), Some(25));
    }

    #[test]
    fn test_discount_not_below_price_is_not_a_discount() {
        let p = MenuPrice::new(dec("100"), Some(dec("100")));
        assert!(!p.has_discount());
        assert_eq!(p.discount_percent(), None);
    }

    #[test]
    fn test_discount_percent_rounds() {
        // (90 - 60) / 90 = 33.33%
        let p = MenuPrice::new(dec("90"), Some(dec("60")));
        assert_eq!(p.discount_percent(), Some(33));
        // (80 - 70) / 80 = 12.5% rounds up
        let p = MenuPrice::new(dec("80"), Some(dec("70")));
        assert_eq!(p.discount_percent(), Some(13));
    }

    #[test]
    fn test_times() {
        assert_eq!(Price::inr(dec("45.5")).times(3).amount, dec("136.5"));
    }
}
