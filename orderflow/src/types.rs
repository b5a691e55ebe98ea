//! Core value types for the `OrderFlow` workflow engine.
//!
//! All types use smart constructors so that an instance, once it exists, is
//! valid: a `Quantity` is always positive, a `Money` amount is never negative
//! and never carries more than two decimal places, an `OrderNumber` always has
//! the expected shape.

use chrono::{DateTime, Utc};
use nutype::nutype;
use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt::Display;
use uuid::Uuid;

/// Server-assigned identifier of an order.
///
/// Generated as a UUIDv7 so identifiers created in sequence sort by creation
/// time and never collide under concurrent creation.
#[nutype(derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    PartialOrd,
    Ord,
    Hash,
    AsRef,
    Deref,
    Display,
    Serialize,
    Deserialize
))]
pub struct OrderId(Uuid);

impl OrderId {
    /// Generates a fresh order identifier.
    pub fn generate() -> Self {
        Self::new(Uuid::now_v7())
    }
}

/// Identifier of a single order line.
#[nutype(derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    PartialOrd,
    Ord,
    Hash,
    AsRef,
    Deref,
    Display,
    Serialize,
    Deserialize
))]
pub struct OrderItemId(Uuid);

impl OrderItemId {
    /// Generates a fresh order-item identifier.
    pub fn generate() -> Self {
        Self::new(Uuid::now_v7())
    }
}

/// Identifier of a product in the inventory collaborator.
#[nutype(derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    PartialOrd,
    Ord,
    Hash,
    AsRef,
    Deref,
    Display,
    Serialize,
    Deserialize
))]
pub struct ProductId(Uuid);

/// Identifier of the buyer who owns an order.
#[nutype(derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    AsRef,
    Deref,
    Display,
    Serialize,
    Deserialize
))]
pub struct UserId(Uuid);

/// Identifier of a shipping address in the user-identity collaborator.
#[nutype(derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    AsRef,
    Deref,
    Display,
    Serialize,
    Deserialize
))]
pub struct AddressId(Uuid);

/// Human-readable, unique order number.
///
/// Format: `ORD-` followed by the 32 hex digits of a UUIDv7. The UUIDv7
/// payload makes order numbers time-ordered and collision-resistant under
/// concurrent creation within the same second, which a date prefix plus a
/// short random suffix is not.
#[nutype(
    sanitize(trim),
    validate(predicate = |value| {
        value.strip_prefix("ORD-").is_some_and(|digits| {
            digits.len() == 32
                && digits
                    .bytes()
                    .all(|b| b.is_ascii_digit() || (b'A'..=b'F').contains(&b))
        })
    }),
    derive(
        Debug,
        Clone,
        PartialEq,
        Eq,
        PartialOrd,
        Ord,
        Hash,
        AsRef,
        Deref,
        Display,
        Serialize,
        Deserialize,
        TryFrom
    )
)]
pub struct OrderNumber(String);

impl OrderNumber {
    /// Generates a new order number from a fresh UUIDv7.
    pub fn generate() -> Self {
        let token = Uuid::now_v7().simple().to_string().to_uppercase();
        Self::try_new(format!("ORD-{token}")).expect("generated OrderNumber should be valid")
    }
}

/// Product name snapshotted onto order items.
#[nutype(
    sanitize(trim),
    validate(not_empty, len_char_max = 100),
    derive(
        Debug,
        Clone,
        PartialEq,
        Eq,
        Display,
        AsRef,
        Deref,
        Serialize,
        Deserialize,
        TryFrom
    )
)]
pub struct ProductName(String);

/// Error produced by the [`Quantity`] smart constructor.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("invalid quantity: {0}")]
pub struct QuantityError(String);

/// Quantity of a product on an order line.
///
/// Always at least 1, at most [`Quantity::MAX_PER_LINE`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Quantity(u32);

impl Quantity {
    /// Maximum quantity accepted on a single order line.
    pub const MAX_PER_LINE: u32 = 1000;

    /// Creates a new quantity, rejecting zero and oversized values.
    pub fn new(value: u32) -> Result<Self, QuantityError> {
        if value == 0 {
            return Err(QuantityError("quantity must be greater than 0".to_string()));
        }
        if value > Self::MAX_PER_LINE {
            return Err(QuantityError(format!(
                "quantity {} exceeds maximum {}",
                value,
                Self::MAX_PER_LINE
            )));
        }
        Ok(Self(value))
    }

    /// Returns the underlying value.
    pub const fn value(self) -> u32 {
        self.0
    }
}

impl Display for Quantity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Error produced by the [`Money`] smart constructor.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("invalid money amount: {0}")]
pub struct MoneyError(String);

/// A non-negative money amount with at most two decimal places.
///
/// Uses `Decimal` for precise financial arithmetic; totals and subtotals are
/// computed exactly, never through floating point.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
pub struct Money(Decimal);

impl Money {
    /// Maximum representable amount (100 million).
    pub const MAX_AMOUNT: Decimal = Decimal::from_parts(100_000_000, 0, 0, false, 0);

    /// Creates a money amount from whole cents, avoiding floating point.
    pub fn from_cents(cents: u64) -> Result<Self, MoneyError> {
        let cents = i64::try_from(cents)
            .map_err(|_| MoneyError(format!("cent amount {cents} out of range")))?;
        Self::new(Decimal::new(cents, 2))
    }

    /// Creates a money amount from a decimal value.
    pub fn new(amount: Decimal) -> Result<Self, MoneyError> {
        if amount.is_sign_negative() {
            return Err(MoneyError(format!("amount cannot be negative: {amount}")));
        }
        if amount.scale() > 2 {
            return Err(MoneyError(format!(
                "amount cannot have more than 2 decimal places: {amount}"
            )));
        }
        if amount > Self::MAX_AMOUNT {
            return Err(MoneyError(format!(
                "amount {} exceeds maximum {}",
                amount,
                Self::MAX_AMOUNT
            )));
        }
        Ok(Self(amount))
    }

    /// Returns the zero amount.
    pub const fn zero() -> Self {
        Self(Decimal::ZERO)
    }

    /// Returns the underlying decimal value.
    pub const fn amount(&self) -> Decimal {
        self.0
    }

    /// Converts to whole cents.
    pub fn to_cents(&self) -> u64 {
        (self.0 * Decimal::from(100)).to_u64().unwrap_or(0)
    }

    /// Adds two amounts, rejecting results outside the valid range.
    pub fn checked_add(self, other: Self) -> Result<Self, MoneyError> {
        Self::new(self.0 + other.0)
    }

    /// Multiplies a unit price by an order-line quantity.
    pub fn multiply_by_quantity(self, quantity: Quantity) -> Result<Self, MoneyError> {
        Self::new(self.0 * Decimal::from(quantity.value()))
    }
}

impl Display for Money {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "${:.2}", self.0)
    }
}

impl std::str::FromStr for Money {
    type Err = MoneyError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim();
        let amount_str = trimmed
            .strip_prefix('$')
            .map_or(trimmed, |stripped| stripped);

        let decimal = amount_str
            .parse::<Decimal>()
            .map_err(|e| MoneyError(format!("failed to parse '{s}': {e}")))?;

        Self::new(decimal)
    }
}

/// A timestamp recorded on orders and used by date-window queries.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Timestamp(DateTime<Utc>);

impl Timestamp {
    /// Creates a new timestamp from a UTC `DateTime`.
    pub const fn new(datetime: DateTime<Utc>) -> Self {
        Self(datetime)
    }

    /// Creates a timestamp representing the current moment.
    pub fn now() -> Self {
        Self(Utc::now())
    }

    /// Returns the underlying `DateTime`.
    pub const fn as_datetime(&self) -> &DateTime<Utc> {
        &self.0
    }

    /// Converts the timestamp into the underlying `DateTime`.
    pub const fn into_datetime(self) -> DateTime<Utc> {
        self.0
    }
}

impl From<DateTime<Utc>> for Timestamp {
    fn from(datetime: DateTime<Utc>) -> Self {
        Self::new(datetime)
    }
}

impl From<Timestamp> for DateTime<Utc> {
    fn from(timestamp: Timestamp) -> Self {
        timestamp.into_datetime()
    }
}

impl Display for Timestamp {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        self.0.fmt(f)
    }
}
