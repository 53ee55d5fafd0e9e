//! Inbound feed events.
//!
//! `ExecutionReport` carries the broker's view of one order's progress.
//! `MarketTrade` is a tape print, used only for mark-to-market.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::order::{OrderId, OrderStatus};
use crate::side::Side;
use crate::symbol::Symbol;

/// Broker execution report for a single order.
///
/// `leaves_qty` and `cumulative_qty` are trusted snapshots: for a working
/// order they always sum to the order's original quantity.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExecutionReport {
    /// Instrument the order trades.
    pub symbol: Symbol,
    /// Identifier of the order this report describes.
    pub order_id: OrderId,
    /// Lifecycle status conveyed by the report.
    pub status: OrderStatus,
    /// Direction of the order.
    pub side: Side,
    /// Quantity still working.
    pub leaves_qty: Decimal,
    /// Total quantity filled so far.
    pub cumulative_qty: Decimal,
    /// Execution price of the latest fill.
    pub price: Decimal,
}

impl ExecutionReport {
    /// Create a report with zeroed fill fields.
    #[must_use]
    pub fn new(symbol: Symbol, order_id: OrderId, status: OrderStatus) -> Self {
        Self {
            symbol,
            order_id,
            status,
            side: Side::None,
            leaves_qty: Decimal::ZERO,
            cumulative_qty: Decimal::ZERO,
            price: Decimal::ZERO,
        }
    }

    /// Set the order direction.
    #[must_use]
    pub const fn with_side(mut self, side: Side) -> Self {
        self.side = side;
        self
    }

    /// Set the fill progress snapshot.
    #[must_use]
    pub const fn with_fill(mut self, leaves_qty: Decimal, cumulative_qty: Decimal) -> Self {
        self.leaves_qty = leaves_qty;
        self.cumulative_qty = cumulative_qty;
        self
    }

    /// Set the execution price.
    #[must_use]
    pub const fn with_price(mut self, price: Decimal) -> Self {
        self.price = price;
        self
    }
}

/// A trade print from the market data feed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MarketTrade {
    /// Instrument that traded.
    pub symbol: Symbol,
    /// Trade price.
    pub price: Decimal,
    /// Trade size.
    pub size: Decimal,
    /// Exchange timestamp.
    pub timestamp: DateTime<Utc>,
}

impl MarketTrade {
    /// Create a market trade stamped with the current time.
    #[must_use]
    pub fn new(symbol: Symbol, price: Decimal, size: Decimal) -> Self {
        Self {
            symbol,
            price,
            size,
            timestamp: Utc::now(),
        }
    }
}
