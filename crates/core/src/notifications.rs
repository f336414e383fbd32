//! Real-time notifications: translating server events into short messages
//! and keeping a bounded, self-expiring list of them.
//!
//! Everything here is pure. The storefront owns the network connection and
//! the timers; this module only decides what a message says and which
//! messages are still alive at a given instant.

use std::collections::VecDeque;

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Visual style of a notification.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum NotificationKind {
    #[default]
    Info,
    Success,
    Warning,
    Error,
}

impl NotificationKind {
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Info => "info",
            Self::Success => "success",
            Self::Warning => "warning",
            Self::Error => "error",
        }
    }
}

/// A server-pushed event the front-end reacts to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ServerEvent {
    OrderNew,
    OrderUpdate { new_status: String },
    OrderPaid,
    ItemUpdate { item_name: String, new_status: String },
    ItemReady { item_name: String, remaining_items: String },
    AllReady,
    ProductNew { name: String },
    ProductUpdate { name: String },
    DiscountUpdate { name: String, discount_percent: String },
}

impl ServerEvent {
    /// Event names the feed is expected to carry.
    pub const NAMES: [&'static str; 9] = [
        "order:new",
        "order:update",
        "order:paid",
        "order:item_update",
        "order:item_ready",
        "order:all_ready",
        "product:new",
        "product:update",
        "discount:update",
    ];

    /// Interpret a named event with its JSON payload.
    ///
    /// Returns `None` for event names the front-end does not handle. Missing
    /// or malformed payload fields render as empty text rather than dropping
    /// the event.
    #[must_use]
    pub fn parse(name: &str, data: &str) -> Option<Self> {
        let payload: Value = serde_json::from_str(data).unwrap_or(Value::Null);
        let field = |key: &str| text_field(&payload, key);

        let event = match name {
            "order:new" => Self::OrderNew,
            "order:update" => Self::OrderUpdate {
                new_status: field("newStatus"),
            },
            "order:paid" => Self::OrderPaid,
            "order:item_update" => Self::ItemUpdate {
                item_name: field("itemName"),
                new_status: field("newStatus"),
            },
            "order:item_ready" => Self::ItemReady {
                item_name: field("itemName"),
                remaining_items: field("remainingItems"),
            },
            "order:all_ready" => Self::AllReady,
            "product:new" => Self::ProductNew {
                name: field("name"),
            },
            "product:update" => Self::ProductUpdate {
                name: field("name"),
            },
            "discount:update" => Self::DiscountUpdate {
                name: field("name"),
                discount_percent: field("discountPercent"),
            },
            _ => return None,
        };
        Some(event)
    }

    /// The user-facing message and its style.
    #[must_use]
    pub fn message(&self) -> (String, NotificationKind) {
        use NotificationKind::{Info, Success};

        match self {
            Self::OrderNew => ("New order received!".to_owned(), Info),
            Self::OrderUpdate { new_status } => {
                (format!("Order status updated to {new_status}"), Info)
            }
            Self::OrderPaid => ("Payment confirmed!".to_owned(), Success),
            Self::ItemUpdate {
                item_name,
                new_status,
            } => (format!("{item_name} status: {new_status}"), Info),
            Self::ItemReady {
                item_name,
                remaining_items,
            } => (
                format!("{item_name} is ready! {remaining_items} items remaining"),
                Success,
            ),
            Self::AllReady => ("Your order is ready for pickup!".to_owned(), Success),
            Self::ProductNew { name } => (format!("New product: {name}"), Info),
            Self::ProductUpdate { name } => (format!("Product updated: {name}"), Info),
            Self::DiscountUpdate {
                name,
                discount_percent,
            } => (format!("{name} now {discount_percent}% off!"), Success),
        }
    }
}

fn text_field(payload: &Value, key: &str) -> String {
    match payload.get(key) {
        Some(Value::String(s)) => s.clone(),
        Some(Value::Null) | None => String::new(),
        Some(other) => other.to_string(),
    }
}

/// A message shown to the user.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Notification {
    pub id: u64,
    pub message: String,
    pub kind: NotificationKind,
    pub created_at: DateTime<Utc>,
}

/// Bounded, newest-first list of notifications with per-entry expiry.
///
/// Entries beyond `capacity` are dropped from the old end. An entry expires
/// `ttl` after it was created; callers pass `now` so expiry is testable.
#[derive(Debug, Clone)]
pub struct NotificationLog {
    entries: VecDeque<Notification>,
    capacity: usize,
    ttl: Duration,
    next_id: u64,
}

impl NotificationLog {
    #[must_use]
    pub fn new(capacity: usize, ttl: Duration) -> Self {
        Self {
            entries: VecDeque::with_capacity(capacity),
            capacity,
            ttl,
            next_id: 1,
        }
    }

    /// Add a message at the front. Returns the stored notification.
    pub fn push(
        &mut self,
        message: String,
        kind: NotificationKind,
        now: DateTime<Utc>,
    ) -> Notification {
        let notification = Notification {
            id: self.next_id,
            message,
            kind,
            created_at: now,
        };
        self.next_id += 1;
        self.entries.push_front(notification.clone());
        self.entries.truncate(self.capacity);
        notification
    }

    /// Remove one notification. Returns whether it was present.
    pub fn dismiss(&mut self, id: u64) -> bool {
        let before = self.entries.len();
        self.entries.retain(|n| n.id != id);
        self.entries.len() != before
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }

    /// Drop expired entries and return their ids.
    pub fn purge_expired(&mut self, now: DateTime<Utc>) -> Vec<u64> {
        let ttl = self.ttl;
        let mut expired = Vec::new();
        self.entries.retain(|n| {
            let alive = now - n.created_at < ttl;
            if !alive {
                expired.push(n.id);
            }
            alive
        });
        expired
    }

    /// Live entries, newest first.
    #[must_use]
    pub fn snapshot(&self, now: DateTime<Utc>) -> Vec<Notification> {
        self.entries
            .iter()
            .filter(|n| now - n.created_at < self.ttl)
            .cloned()
            .collect()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn at(secs: i64) -> DateTime<Utc> {
        DateTime::from_timestamp(1_700_000_000 + secs, 0).unwrap_or_default()
    }

    #[test]
    fn test_item_ready_message() {
        let e = ServerEvent::parse(
            "order:item_ready",
            r#"{"itemName":"Masala Dosa","remainingItems":2}"#,
        );
        let (msg, kind) = e.map(|e| e.message()).unwrap_or_default();
        assert_eq!(msg, "Masala Dosa is ready! 2 items remaining");
        assert_eq!(kind, NotificationKind::Success);
    }

    #[test]
    fn test_discount_message() {
        let e = ServerEvent::parse("discount:update", r#"{"name":"Lassi","discountPercent":15}"#);
        assert_eq!(
            e.map(|e| e.message().0).as_deref(),
            Some("Lassi now 15% off!")
        );
    }

    #[test]
    fn test_every_known_name_parses() {
        for name in ServerEvent::NAMES {
            assert!(ServerEvent::parse(name, "{}").is_some(), "{name}");
        }
    }

    #[test]
    fn test_unknown_event_is_ignored() {
        assert_eq!(ServerEvent::parse("order:deleted", "{}"), None);
    }

    #[test]
    fn test_bad_payload_still_notifies() {
        let e = ServerEvent::parse("order:update", "not json");
        assert_eq!(
            e,
            Some(ServerEvent::OrderUpdate {
                new_status: String::new()
            })
        );
    }

    #[test]
    fn test_log_is_newest_first_and_capped() {
        let mut log = NotificationLog::new(3, Duration::seconds(5));
        for i in 0..5 {
            log.push(format!("m{i}"), NotificationKind::Info, at(0));
        }
        let snap = log.snapshot(at(1));
        let messages: Vec<_> = snap.iter().map(|n| n.message.as_str()).collect();
        assert_eq!(messages, vec!["m4", "m3", "m2"]);
    }

    #[test]
    fn test_entries_expire_after_ttl() {
        let mut log = NotificationLog::new(50, Duration::seconds(5));
        let old = log.push("old".into(), NotificationKind::Info, at(0));
        log.push("new".into(), NotificationKind::Info, at(3));

        assert_eq!(log.snapshot(at(4)).len(), 2);
        assert_eq!(log.purge_expired(at(5)), vec![old.id]);
        assert_eq!(log.len(), 1);
        assert_eq!(log.purge_expired(at(8)).len(), 1);
        assert!(log.is_empty());
    }

    #[test]
    fn test_dismiss_and_clear() {
        let mut log = NotificationLog::new(50, Duration::seconds(5));
        let a = log.push("a".into(), NotificationKind::Info, at(0));
        log.push("b".into(), NotificationKind::Success, at(0));
        assert!(log.dismiss(a.id));
        assert!(!log.dismiss(a.id));
        assert_eq!(log.len(), 1);
        log.clear();
        assert!(log.is_empty());
    }
}
