//! Order construction.
//!
//! Builders are pure: they assemble an `OrderSpec` and assign its id, and
//! never talk to a gateway.

use chrono::Utc;
use rust_decimal::Decimal;

use crate::order::{OrderId, OrderKind, OrderSpec, TimeInForce};
use crate::side::Side;
use crate::symbol::Symbol;

/// Per-order options passed to a builder.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OrderOptions {
    /// Pricing instruction.
    pub kind: OrderKind,
    /// Override of the builder's default time-in-force.
    pub time_in_force: Option<TimeInForce>,
}

impl OrderOptions {
    /// Options for a market order.
    #[must_use]
    pub const fn market() -> Self {
        Self {
            kind: OrderKind::Market,
            time_in_force: None,
        }
    }

    /// Options for a limit order at `price`.
    #[must_use]
    pub const fn limit(price: Decimal) -> Self {
        Self {
            kind: OrderKind::Limit(price),
            time_in_force: None,
        }
    }

    /// Override the time-in-force for this order only.
    #[must_use]
    pub const fn with_time_in_force(mut self, time_in_force: TimeInForce) -> Self {
        self.time_in_force = Some(time_in_force);
        self
    }
}

/// Assembles submittable orders.
pub trait OrderBuilder: Send + Sync {
    /// Build an order for `quantity` of `symbol` on `side`.
    fn build(
        &self,
        symbol: &Symbol,
        quantity: Decimal,
        side: Side,
        options: &OrderOptions,
    ) -> OrderSpec;
}

/// Default builder carrying account routing defaults.
///
/// Generates uuid-v4 order ids and stamps the configured broker id, account,
/// and time-in-force onto every order.
#[derive(Debug, Clone, Default)]
pub struct StandardOrderBuilder {
    broker_id: Option<String>,
    account: Option<String>,
    time_in_force: TimeInForce,
}

impl StandardOrderBuilder {
    /// Builder with no routing defaults and `Day` time-in-force.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the default routing broker.
    #[must_use]
    pub fn with_broker_id(mut self, broker_id: impl Into<String>) -> Self {
        self.broker_id = Some(broker_id.into());
        self
    }

    /// Set the default destination account.
    #[must_use]
    pub fn with_account(mut self, account: impl Into<String>) -> Self {
        self.account = Some(account.into());
        self
    }

    /// Set the default time-in-force.
    #[must_use]
    pub const fn with_time_in_force(mut self, time_in_force: TimeInForce) -> Self {
        self.time_in_force = time_in_force;
        self
    }
}

impl OrderBuilder for StandardOrderBuilder {
    fn build(
        &self,
        symbol: &Symbol,
        quantity: Decimal,
        side: Side,
        options: &OrderOptions,
    ) -> OrderSpec {
        OrderSpec {
            order_id: OrderId::generate(),
            symbol: symbol.clone(),
            side,
            quantity,
            kind: options.kind,
            time_in_force: options.time_in_force.unwrap_or(self.time_in_force),
            account: self.account.clone(),
            broker_id: self.broker_id.clone(),
            created_at: Utc::now(),
        }
    }
}
