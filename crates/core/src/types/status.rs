//! Status enums for canteen orders and users.
//!
//! Statuses are assigned by the server. Labels this crate does not know are
//! kept verbatim in an `Other` variant so a newer backend never breaks page
//! rendering.

use serde::{Deserialize, Serialize};

/// Declares a server-assigned status enum with a lossless fallback variant.
macro_rules! status_enum {
    (
        $(#[$meta:meta])*
        $name:ident { $($variant:ident => $label:literal),+ $(,)? }
    ) => {
        $(#[$meta])*
        #[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
        #[serde(from = "String", into = "String")]
        pub enum $name {
            $($variant,)+
            /// A label this build does not recognise.
            Other(String),
        }

        impl $name {
            /// Wire label, e.g. `"preparing"`.
            #[must_use]
            pub fn as_str(&self) -> &str {
                match self {
                    $(Self::$variant => $label,)+
                    Self::Other(s) => s.as_str(),
                }
            }
        }

        impl From<String> for $name {
            fn from(s: String) -> Self {
                match s.as_str() {
                    $($label => Self::$variant,)+
                    _ => Self::Other(s),
                }
            }
        }

        impl From<&str> for $name {
            fn from(s: &str) -> Self {
                Self::from(s.to_owned())
            }
        }

        impl From<$name> for String {
            fn from(status: $name) -> Self {
                status.as_str().to_owned()
            }
        }

        impl std::fmt::Display for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                f.write_str(self.as_str())
            }
        }
    };
}

status_enum! {
    /// Order lifecycle label.
    OverallStatus {
        Pending => "pending",
        Preparing => "preparing",
        Ready => "ready",
        Completed => "completed",
        Rejected => "rejected",
        Cancelled => "cancelled",
    }
}

status_enum! {
    /// Per-item kitchen status.
    ItemStatus {
        Pending => "pending",
        Accepted => "accepted",
        Preparing => "preparing",
        Ready => "ready",
        Completed => "completed",
        Rejected => "rejected",
        Cancelled => "cancelled",
    }
}

status_enum! {
    /// Payment state of an order.
    PaymentStatus {
        Pending => "pending",
        Paid => "paid",
        Failed => "failed",
        Refunded => "refunded",
    }
}

impl OverallStatus {
    /// Customers may cancel items while the kitchen has not finished.
    #[must_use]
    pub const fn allows_cancellation(&self) -> bool {
        matches!(self, Self::Pending | Self::Preparing)
    }

    /// Terminal failure states that may require a refund.
    #[must_use]
    pub const fn is_rejected_or_cancelled(&self) -> bool {
        matches!(self, Self::Rejected | Self::Cancelled)
    }
}

impl ItemStatus {
    /// Whether this item no longer counts toward the order.
    #[must_use]
    pub const fn is_rejected_or_cancelled(&self) -> bool {
        matches!(self, Self::Rejected | Self::Cancelled)
    }

    /// Items that are ready (or gone) cannot be cancelled by a customer.
    #[must_use]
    pub const fn is_cancellable(&self) -> bool {
        !matches!(self, Self::Ready | Self::Rejected | Self::Cancelled)
    }
}

impl PaymentStatus {
    #[must_use]
    pub const fn is_paid(&self) -> bool {
        matches!(self, Self::Paid)
    }
}

/// Account role, deciding which screens a user can reach.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    /// A customer.
    User,
    /// Full access to management screens.
    Admin,
    /// Kitchen staff working the order queue.
    Kitchen,
}

impl Role {
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::User => "user",
            Self::Admin => "admin",
            Self::Kitchen => "kitchen",
        }
    }

    /// Where a freshly signed-in user of this role lands.
    #[must_use]
    pub const fn home_path(&self) -> &'static str {
        match self {
            Self::User => "/menu",
            Self::Admin => "/admin",
            Self::Kitchen => "/kitchen",
        }
    }
}

impl std::fmt::Display for Role {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for Role {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "user" => Ok(Self::User),
            "admin" => Ok(Self::Admin),
            "kitchen" => Ok(Self::Kitchen),
            _ => Err(format!("invalid role: {s}")),
        }
    }
}
