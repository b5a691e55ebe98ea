//! Order status state machine.
//!
//! Orders move forward through a fixed set of states until a terminal state:
//!
//! ```text
//! PendingPayment(1) -> Paid(2) -> Shipped(3) -> Completed(4)
//!        \                \
//!         +-> Cancelled(5) +-> Cancelled(5)
//! ```
//!
//! `Completed` and `Cancelled` are terminal. The transition table is total:
//! every (from, to) pair is either explicitly allowed here or rejected by the
//! workflow engine with `IllegalStatusTransition`.

use serde::{Deserialize, Serialize};
use std::fmt::Display;

/// The lifecycle status of an order.
///
/// Numeric codes are the wire/storage representation and match the original
/// order schema (1 through 5).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OrderStatus {
    /// Order created, awaiting payment.
    PendingPayment,
    /// Payment received, awaiting shipment.
    Paid,
    /// Shipped, awaiting buyer confirmation.
    Shipped,
    /// Buyer confirmed receipt. Terminal.
    Completed,
    /// Cancelled before shipment; reserved stock has been restored. Terminal.
    Cancelled,
}

impl OrderStatus {
    /// All statuses, in code order. Useful for exhaustive checks.
    pub const ALL: [Self; 5] = [
        Self::PendingPayment,
        Self::Paid,
        Self::Shipped,
        Self::Completed,
        Self::Cancelled,
    ];

    /// Returns the numeric storage code for this status.
    pub const fn code(self) -> u8 {
        match self {
            Self::PendingPayment => 1,
            Self::Paid => 2,
            Self::Shipped => 3,
            Self::Completed => 4,
            Self::Cancelled => 5,
        }
    }

    /// Decodes a storage code, returning `None` for unknown codes.
    pub const fn from_code(code: u8) -> Option<Self> {
        match code {
            1 => Some(Self::PendingPayment),
            2 => Some(Self::Paid),
            3 => Some(Self::Shipped),
            4 => Some(Self::Completed),
            5 => Some(Self::Cancelled),
            _ => None,
        }
    }

    /// Whether no further transitions are permitted from this status.
    pub const fn is_terminal(self) -> bool {
        matches!(self, Self::Completed | Self::Cancelled)
    }

    /// The legal-transition table.
    ///
    /// | from           | allowed to       |
    /// |----------------|------------------|
    /// | PendingPayment | Paid, Cancelled  |
    /// | Paid           | Shipped, Cancelled |
    /// | Shipped        | Completed        |
    /// | Completed      | (none)           |
    /// | Cancelled      | (none)           |
    pub const fn can_transition_to(self, next: Self) -> bool {
        matches!(
            (self, next),
            (Self::PendingPayment, Self::Paid | Self::Cancelled)
                | (Self::Paid, Self::Shipped | Self::Cancelled)
                | (Self::Shipped, Self::Completed)
        )
    }

    /// Whether an order in this status may still be cancelled by its owner.
    pub const fn is_cancellable(self) -> bool {
        self.can_transition_to(Self::Cancelled)
    }
}

impl Display for OrderStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Self::PendingPayment => "pending payment",
            Self::Paid => "paid",
            Self::Shipped => "shipped",
            Self::Completed => "completed",
            Self::Cancelled => "cancelled",
        };
        write!(f, "{name}")
    }
}
