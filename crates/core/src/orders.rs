//! Cart and order arithmetic shared by the customer, admin and kitchen
//! screens.

use rust_decimal::Decimal;

use crate::types::{ItemStatus, MenuPrice, OverallStatus, PaymentStatus};
use crate::validation::ValidationError;

/// A priced line inside a placed order.
///
/// Implemented by the API's order item record so the calculations here stay
/// independent of the wire format.
pub trait OrderLine {
    fn status(&self) -> &ItemStatus;
    fn unit_price(&self) -> Decimal;
    fn quantity(&self) -> u32;

    /// Price times quantity.
    fn line_total(&self) -> Decimal {
        self.unit_price() * Decimal::from(self.quantity())
    }
}

/// Total of cart lines at their effective price.
///
/// Lines whose product no longer exists are passed as `None` and skipped.
pub fn cart_total<I>(lines: I) -> Decimal
where
    I: IntoIterator<Item = (Option<MenuPrice>, u32)>,
{
    lines
        .into_iter()
        .filter_map(|(price, qty)| price.map(|p| p.effective() * Decimal::from(qty)))
        .sum()
}

/// Apply a +/- step to a cart quantity.
///
/// Returns `None` when the result would drop below one; the caller leaves
/// the line unchanged in that case.
#[must_use]
pub fn step_quantity(current: u32, delta: i32) -> Option<u32> {
    let next = i64::from(current) + i64::from(delta);
    u32::try_from(next).ok().filter(|q| *q >= 1)
}

/// Items that were cancelled or rejected and therefore owe the customer.
pub fn refundable_items<L: OrderLine>(items: &[L]) -> impl Iterator<Item = &L> {
    items.iter().filter(|i| i.status().is_rejected_or_cancelled())
}

/// Sum owed back to the customer: price times quantity of every cancelled or
/// rejected item.
pub fn refund_amount<L: OrderLine>(items: &[L]) -> Decimal {
    refundable_items(items).map(|i| i.line_total()).sum()
}

/// Items still counted toward the order (neither cancelled nor rejected).
pub fn active_item_count<L: OrderLine>(items: &[L]) -> usize {
    items
        .iter()
        .filter(|i| !i.status().is_rejected_or_cancelled())
        .count()
}

/// A paid order with dropped items must be refunded before an admin can
/// complete or reject it.
pub fn requires_refund<L: OrderLine>(payment: &PaymentStatus, items: &[L]) -> bool {
    payment.is_paid() && refundable_items(items).next().is_some()
}

/// Whether a customer may open the cancel dialog for this order.
#[must_use]
pub const fn can_cancel(status: &OverallStatus) -> bool {
    status.allows_cancellation()
}

/// Narrow a cancel request to the selected items that may still be
/// cancelled, given the order as the API reports it now.
///
/// Selected ids missing from the order, or whose item is ready or already
/// dropped, are left out.
///
/// # Errors
///
/// [`ValidationError::OrderNotCancellable`] once the order is past
/// preparation, [`ValidationError::NoItemsSelected`] when nothing selected
/// survives the filter.
pub fn cancellable_selection<'a, K>(
    status: &OverallStatus,
    items: impl IntoIterator<Item = (&'a K, &'a ItemStatus)>,
    selected: &[K],
) -> Result<Vec<K>, ValidationError>
where
    K: PartialEq + Clone + 'a,
{
    if !can_cancel(status) {
        return Err(ValidationError::OrderNotCancellable);
    }
    let open: Vec<&K> = items
        .into_iter()
        .filter(|(_, item_status)| item_status.is_cancellable())
        .map(|(id, _)| id)
        .collect();
    let kept: Vec<K> = selected
        .iter()
        .filter(|id| open.contains(id))
        .cloned()
        .collect();
    if kept.is_empty() {
        return Err(ValidationError::NoItemsSelected);
    }
    Ok(kept)
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Line(ItemStatus, i64, u32);

    impl OrderLine for Line {
        fn status(&self) -> &ItemStatus {
            &self.0
        }
        fn unit_price(&self) -> Decimal {
            Decimal::from(self.1)
        }
        fn quantity(&self) -> u32 {
            self.2
        }
    }

    #[test]
    fn test_cart_total_uses_effective_price_and_skips_missing() {
        let lines = vec![
            (
                Some(MenuPrice::new(Decimal::from(100), Some(Decimal::from(80)))),
                2,
            ),
            (Some(MenuPrice::new(Decimal::from(50), None)), 1),
            (None, 4),
        ];
        assert_eq!(cart_total(lines), Decimal::from(210));
    }

    #[test]
    fn test_step_quantity_never_below_one() {
        assert_eq!(step_quantity(2, -1), Some(1));
        assert_eq!(step_quantity(1, -1), None);
        assert_eq!(step_quantity(1, 1), Some(2));
        assert_eq!(step_quantity(0, -5), None);
    }

    #[test]
    fn test_refund_counts_only_dropped_items() {
        let items = vec![
            Line(ItemStatus::Cancelled, 120, 2),
            Line(ItemStatus::Rejected, 60, 1),
            Line(ItemStatus::Ready, 500, 1),
        ];
        assert_eq!(refund_amount(&items), Decimal::from(300));
        assert_eq!(active_item_count(&items), 1);
    }

    #[test]
    fn test_requires_refund_only_when_paid() {
        let items = vec![Line(ItemStatus::Rejected, 10, 1)];
        assert!(requires_refund(&PaymentStatus::Paid, &items));
        assert!(!requires_refund(&PaymentStatus::Pending, &items));
        let clean = vec![Line(ItemStatus::Ready, 10, 1)];
        assert!(!requires_refund(&PaymentStatus::Paid, &clean));
    }

    #[test]
    fn test_cancellable_selection_drops_finished_items() {
        let items = [
            ("i1", ItemStatus::Pending),
            ("i2", ItemStatus::Ready),
            ("i3", ItemStatus::Preparing),
            ("i4", ItemStatus::Rejected),
        ];
        let pairs = || items.iter().map(|(id, status)| (id, status));

        assert_eq!(
            cancellable_selection(&OverallStatus::Preparing, pairs(), &["i1", "i2", "i3", "i9"]),
            Ok(vec!["i1", "i3"])
        );
        assert_eq!(
            cancellable_selection(&OverallStatus::Pending, pairs(), &["i2", "i4"]),
            Err(ValidationError::NoItemsSelected)
        );
        assert_eq!(
            cancellable_selection(&OverallStatus::Ready, pairs(), &["i1"]),
            Err(ValidationError::OrderNotCancellable)
        );
    }

    #[test]
    fn test_nothing_to_refund_is_zero() {
        let items: Vec<Line> = vec![Line(ItemStatus::Completed, 10, 3)];
        assert!(refund_amount(&items).is_zero());
    }
}
