// Allow unwrap/expect in tests - tests should panic on unexpected errors
#![cfg_attr(
    test,
    allow(
        clippy::unwrap_used,
        clippy::expect_used,
        clippy::float_cmp,
        clippy::significant_drop_tightening,
        clippy::too_many_lines,
        clippy::needless_pass_by_value
    )
)]

//! Trade Ledger - Rust Core Library
//!
//! Per-instrument position ledger with an embedded order-lifecycle
//! controller, for algorithmic trading strategies that work one order at
//! a time per instrument.
//!
//! # Architecture
//!
//! - [`portfolio::Portfolio`] owns one [`trade::Trade`] per registered
//!   instrument and routes the execution-report and market-data feeds to it.
//! - [`trade::Trade`] is the position ledger: fills from the report stream
//!   are merged into the settled position with signed arithmetic, and at
//!   most one order may be in flight per instrument at any time.
//! - Orders are assembled by an [`builder::OrderBuilder`] and handed to an
//!   [`gateway::OrderGateway`], fire-and-forget. Acknowledgement only ever
//!   arrives through the report stream.
//! - Every send arms a cancellable one-shot timeout; strategies react to
//!   fills, timeouts, and rejections through the [`policy`] traits.

#![forbid(unsafe_code)]
#![warn(missing_docs)]
#![warn(clippy::pedantic)]

pub mod builder;
pub mod error;
pub mod gateway;
pub mod order;
pub mod policy;
pub mod portfolio;
pub mod report;
pub mod side;
pub mod symbol;
pub mod timer;
pub mod trade;

mod controller;

pub use builder::{OrderBuilder, OrderOptions, StandardOrderBuilder};
pub use error::SendOrderError;
pub use gateway::{GatewayError, MockGateway, OrderGateway};
pub use order::{OrderId, OrderKind, OrderSpec, OrderStatus, TimeInForce};
pub use policy::{FillPolicy, OrderTimeoutPolicy, RejectPolicy};
pub use portfolio::Portfolio;
pub use report::{ExecutionReport, MarketTrade};
pub use side::Side;
pub use symbol::Symbol;
pub use trade::{DEFAULT_ORDER_TIMEOUT, Trade};
