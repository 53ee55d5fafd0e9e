//! Reaction policies.
//!
//! Strategies plug behavior into the ledger through three callbacks: fills
//! (partial and full), order timeouts, and rejections. The `ctx` argument is
//! the owning portfolio, giving policies gateway access for follow-up orders.
//!
//! Policies run with no ledger locks held, so they may call back into the
//! same trade (e.g. resend after a timeout). A panicking policy is caught
//! and logged; it never corrupts the report or timer path.

use std::panic::{AssertUnwindSafe, catch_unwind};
use std::sync::Arc;
use std::time::Duration;

use crate::order::OrderId;
use crate::portfolio::Portfolio;
use crate::report::ExecutionReport;
use crate::trade::Trade;

/// Reaction to fills, partial and full.
pub trait FillPolicy: Send + Sync {
    /// Called after the ledger has absorbed a fill report.
    fn on_fill(&self, ctx: &Portfolio, order_id: &OrderId, trade: &Trade, report: &ExecutionReport);
}

/// Reaction to an order outliving its timeout.
pub trait OrderTimeoutPolicy: Send + Sync {
    /// Called when `order_id` is still pending after `timeout` has elapsed.
    fn on_order_timeout(&self, ctx: &Portfolio, order_id: &OrderId, timeout: Duration, trade: &Trade);
}

/// Reaction to a broker rejection.
pub trait RejectPolicy: Send + Sync {
    /// Called after a rejected order has been cleared from the ledger.
    fn on_reject(&self, ctx: &Portfolio, order_id: &OrderId, trade: &Trade, report: &ExecutionReport);
}

/// Default fill policy: log and do nothing.
#[derive(Debug, Default)]
pub struct WarnOnFill;

impl FillPolicy for WarnOnFill {
    fn on_fill(
        &self,
        _ctx: &Portfolio,
        order_id: &OrderId,
        trade: &Trade,
        report: &ExecutionReport,
    ) {
        tracing::warn!(
            symbol = %trade.symbol(),
            order_id = %order_id,
            cumulative_qty = %report.cumulative_qty,
            "fill received, no fill policy installed"
        );
    }
}

/// Default timeout policy: log and do nothing.
#[derive(Debug, Default)]
pub struct WarnOnTimeout;

impl OrderTimeoutPolicy for WarnOnTimeout {
    fn on_order_timeout(
        &self,
        _ctx: &Portfolio,
        order_id: &OrderId,
        timeout: Duration,
        trade: &Trade,
    ) {
        tracing::warn!(
            symbol = %trade.symbol(),
            order_id = %order_id,
            timeout_secs = timeout.as_secs(),
            "order timed out, no timeout policy installed"
        );
    }
}

/// Default reject policy: log and do nothing.
#[derive(Debug, Default)]
pub struct WarnOnReject;

impl RejectPolicy for WarnOnReject {
    fn on_reject(
        &self,
        _ctx: &Portfolio,
        order_id: &OrderId,
        trade: &Trade,
        _report: &ExecutionReport,
    ) {
        tracing::warn!(
            symbol = %trade.symbol(),
            order_id = %order_id,
            "order rejected, no reject policy installed"
        );
    }
}

pub(crate) fn dispatch_fill(
    policy: &Arc<dyn FillPolicy>,
    ctx: &Portfolio,
    order_id: &OrderId,
    trade: &Trade,
    report: &ExecutionReport,
) {
    let outcome = catch_unwind(AssertUnwindSafe(|| {
        policy.on_fill(ctx, order_id, trade, report);
    }));
    if outcome.is_err() {
        tracing::error!(symbol = %trade.symbol(), order_id = %order_id, "fill policy panicked");
    }
}

pub(crate) fn dispatch_timeout(
    policy: &Arc<dyn OrderTimeoutPolicy>,
    ctx: &Portfolio,
    order_id: &OrderId,
    timeout: Duration,
    trade: &Trade,
) {
    let outcome = catch_unwind(AssertUnwindSafe(|| {
        policy.on_order_timeout(ctx, order_id, timeout, trade);
    }));
    if outcome.is_err() {
        tracing::error!(symbol = %trade.symbol(), order_id = %order_id, "timeout policy panicked");
    }
}

pub(crate) fn dispatch_reject(
    policy: &Arc<dyn RejectPolicy>,
    ctx: &Portfolio,
    order_id: &OrderId,
    trade: &Trade,
    report: &ExecutionReport,
) {
    let outcome = catch_unwind(AssertUnwindSafe(|| {
        policy.on_reject(ctx, order_id, trade, report);
    }));
    if outcome.is_err() {
        tracing::error!(symbol = %trade.symbol(), order_id = %order_id, "reject policy panicked");
    }
}
