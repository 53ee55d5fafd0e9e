//! Order value types.
//!
//! `OrderSpec` is the immutable, submittable order. Lifecycle statuses follow
//! FIX semantics: `New` acknowledges, `PartiallyFilled` reports progress, and
//! `Filled`/`Canceled`/`Rejected` are terminal.

use std::fmt;

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::side::Side;
use crate::symbol::Symbol;

/// Unique order identifier.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct OrderId(String);

impl OrderId {
    /// Wrap an existing identifier, e.g. one assigned by a broker.
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Generate a fresh random identifier.
    #[must_use]
    pub fn generate() -> Self {
        Self(Uuid::new_v4().to_string())
    }

    /// The identifier as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for OrderId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Order lifecycle status, FIX tag 39 semantics.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum OrderStatus {
    /// Order acknowledged by the broker, no fills yet.
    New,
    /// Order partially executed.
    PartiallyFilled,
    /// Order completely executed.
    Filled,
    /// Order canceled before completion.
    Canceled,
    /// Order rejected by the broker.
    Rejected,
    /// Any status the ledger does not handle.
    #[serde(other)]
    Unknown,
}

impl OrderStatus {
    /// Whether this status ends the order's lifecycle.
    #[must_use]
    pub const fn is_terminal(&self) -> bool {
        matches!(self, Self::Filled | Self::Canceled | Self::Rejected)
    }
}

impl fmt::Display for OrderStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Self::New => "NEW",
            Self::PartiallyFilled => "PARTIALLY_FILLED",
            Self::Filled => "FILLED",
            Self::Canceled => "CANCELED",
            Self::Rejected => "REJECTED",
            Self::Unknown => "UNKNOWN",
        };
        write!(f, "{label}")
    }
}

/// How long an order remains working.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TimeInForce {
    /// Valid for the trading day.
    #[default]
    Day,
    /// Valid until explicitly canceled.
    GoodTillCancel,
    /// Fill what is immediately available, cancel the rest.
    ImmediateOrCancel,
}

/// Order pricing instruction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum OrderKind {
    /// Execute at the prevailing market price.
    Market,
    /// Execute at the given price or better.
    Limit(Decimal),
}

/// A fully specified, submittable order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OrderSpec {
    /// Unique identifier, assigned at build time.
    pub order_id: OrderId,
    /// Instrument being traded.
    pub symbol: Symbol,
    /// Direction of the order.
    pub side: Side,
    /// Unsigned order quantity.
    pub quantity: Decimal,
    /// Market or limit.
    pub kind: OrderKind,
    /// Working duration.
    pub time_in_force: TimeInForce,
    /// Destination account, if the gateway requires one.
    pub account: Option<String>,
    /// Routing broker identifier, if the gateway requires one.
    pub broker_id: Option<String>,
    /// Build timestamp.
    pub created_at: DateTime<Utc>,
}
