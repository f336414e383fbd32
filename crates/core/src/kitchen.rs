//! Kitchen queue rules: which item actions are offered and how orders are
//! ordered on the kitchen and admin boards.

use crate::types::{ItemStatus, OverallStatus, PaymentStatus};

/// Actions offered for a single order item on the kitchen screen.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ItemActions {
    /// Move the item to `preparing`.
    pub prepare: bool,
    /// Mark the item `ready`.
    pub ready: bool,
    /// Reject the item.
    pub reject: bool,
}

impl ItemActions {
    #[must_use]
    pub const fn for_status(status: &ItemStatus) -> Self {
        Self {
            prepare: matches!(status, ItemStatus::Pending),
            ready: matches!(status, ItemStatus::Pending | ItemStatus::Preparing),
            reject: !matches!(
                status,
                ItemStatus::Rejected | ItemStatus::Ready | ItemStatus::Cancelled
            ),
        }
    }

    #[must_use]
    pub const fn any(&self) -> bool {
        self.prepare || self.ready || self.reject
    }
}

/// Whether an order belongs in the kitchen's working queue.
#[must_use]
pub const fn in_kitchen_queue(status: &OverallStatus) -> bool {
    matches!(status, OverallStatus::Pending | OverallStatus::Preparing)
}

/// Sort key for the kitchen queue: orders in progress come first.
#[must_use]
pub const fn kitchen_rank(status: &OverallStatus) -> u8 {
    match status {
        OverallStatus::Preparing => 0,
        OverallStatus::Pending => 1,
        _ => 2,
    }
}

/// Whether an order shows on the admin's active board.
///
/// Completed orders are done. Rejected and cancelled orders only stay
/// visible while the customer's payment still has to be dealt with.
#[must_use]
pub const fn on_admin_board(status: &OverallStatus, payment: &PaymentStatus) -> bool {
    match status {
        OverallStatus::Completed => false,
        OverallStatus::Rejected | OverallStatus::Cancelled => payment.is_paid(),
        _ => true,
    }
}

/// Sort key for the admin board: ready, preparing, pending, then the rest.
#[must_use]
pub const fn admin_board_rank(status: &OverallStatus) -> u8 {
    match status {
        OverallStatus::Ready => 0,
        OverallStatus::Preparing => 1,
        OverallStatus::Pending => 2,
        _ => 3,
    }
}

/// Per-status order counts for the admin board header.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct StatusCounts {
    pub total: usize,
    pub pending: usize,
    pub preparing: usize,
    pub ready: usize,
    pub completed: usize,
    pub rejected: usize,
    pub cancelled: usize,
}

impl StatusCounts {
    /// Tally a sequence of overall statuses.
    pub fn tally<'a, I>(statuses: I) -> Self
    where
        I: IntoIterator<Item = &'a OverallStatus>,
    {
        statuses.into_iter().fold(Self::default(), |mut acc, s| {
            acc.total += 1;
            match s {
                OverallStatus::Pending => acc.pending += 1,
                OverallStatus::Preparing => acc.preparing += 1,
                OverallStatus::Ready => acc.ready += 1,
                OverallStatus::Completed => acc.completed += 1,
                OverallStatus::Rejected => acc.rejected += 1,
                OverallStatus::Cancelled => acc.cancelled += 1,
                OverallStatus::Other(_) => {}
            }
            acc
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pending_item_offers_everything() {
        let a = ItemActions::for_status(&ItemStatus::Pending);
        assert!(a.prepare && a.ready && a.reject);
    }

    #[test]
    fn test_preparing_item_can_be_readied_or_rejected() {
        let a = ItemActions::for_status(&ItemStatus::Preparing);
        assert!(!a.prepare);
        assert!(a.ready);
        assert!(a.reject);
    }

    #[test]
    fn test_finished_items_offer_nothing() {
        for s in [ItemStatus::Ready, ItemStatus::Rejected, ItemStatus::Cancelled] {
            assert!(!ItemActions::for_status(&s).any(), "{s}");
        }
    }

    #[test]
    fn test_kitchen_queue_puts_preparing_first() {
        let mut statuses = vec![
            OverallStatus::Pending,
            OverallStatus::Preparing,
            OverallStatus::Pending,
        ];
        statuses.sort_by_key(kitchen_rank);
        assert_eq!(statuses.first(), Some(&OverallStatus::Preparing));
        assert!(in_kitchen_queue(&OverallStatus::Pending));
        assert!(!in_kitchen_queue(&OverallStatus::Ready));
    }

    #[test]
    fn test_admin_board_hides_unpaid_failures_and_completed() {
        assert!(!on_admin_board(&OverallStatus::Completed, &PaymentStatus::Paid));
        assert!(!on_admin_board(&OverallStatus::Rejected, &PaymentStatus::Pending));
        assert!(on_admin_board(&OverallStatus::Cancelled, &PaymentStatus::Paid));
        assert!(on_admin_board(&OverallStatus::Pending, &PaymentStatus::Pending));
    }

    #[test]
    fn test_admin_board_order() {
        let mut statuses = vec![
            OverallStatus::Rejected,
            OverallStatus::Pending,
            OverallStatus::Ready,
            OverallStatus::Preparing,
        ];
        statuses.sort_by_key(admin_board_rank);
        assert_eq!(
            statuses,
            vec![
                OverallStatus::Ready,
                OverallStatus::Preparing,
                OverallStatus::Pending,
                OverallStatus::Rejected,
            ]
        );
    }

    #[test]
    fn test_status_counts() {
        let statuses = [
            OverallStatus::Pending,
            OverallStatus::Pending,
            OverallStatus::Completed,
            OverallStatus::Other("held".into()),
        ];
        let counts = StatusCounts::tally(&statuses);
        assert_eq!(counts.total, 4);
        assert_eq!(counts.pending, 2);
        assert_eq!(counts.completed, 1);
    }
}
