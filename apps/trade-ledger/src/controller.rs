//! Order lifecycle control.
//!
//! One controller is embedded in each trade. It guards the single
//! pending-order slot, hands orders to the gateway, and arms a one-shot
//! timeout per send. The timeout callback captures the order id it was
//! armed for and re-checks it against the current pending id when it
//! fires, so a timer that loses the race with a terminal report is a
//! no-op.

use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;
use rust_decimal::Decimal;

use crate::builder::OrderOptions;
use crate::error::SendOrderError;
use crate::order::OrderId;
use crate::policy::{self, OrderTimeoutPolicy};
use crate::side::Side;
use crate::timer::{self, TimerHandle};
use crate::trade::Trade;

pub(crate) struct OrderController {
    armed: Mutex<Option<TimerHandle>>,
}

impl OrderController {
    pub(crate) const fn new() -> Self {
        Self {
            armed: Mutex::new(None),
        }
    }

    /// Build, record, and submit a market order, then arm its timeout.
    ///
    /// Gateway failures are logged and absorbed: acknowledgement only ever
    /// arrives through the report stream, and the armed timeout covers an
    /// order that never gets one.
    pub(crate) fn send_order(
        &self,
        trade: &Trade,
        quantity: Decimal,
        side: Side,
        timeout: Duration,
        timeout_policy: Arc<dyn OrderTimeoutPolicy>,
    ) -> Result<(), SendOrderError> {
        let Some(portfolio) = trade.portfolio_ref().upgrade() else {
            tracing::error!(
                symbol = %trade.symbol(),
                "trade is no longer attached to a portfolio"
            );
            return Err(SendOrderError::Unlinked {
                symbol: trade.symbol().clone(),
            });
        };

        let order = portfolio
            .order_builder()
            .build(trade.symbol(), quantity, side, &OrderOptions::market());

        if !trade.reserve_pending(&order.order_id, side) {
            tracing::error!(
                symbol = %trade.symbol(),
                "cannot send an order while another is pending"
            );
            return Ok(());
        }

        match portfolio.gateway().submit(&order) {
            Ok(()) => {
                tracing::info!(
                    symbol = %trade.symbol(),
                    order_id = %order.order_id,
                    side = %side,
                    quantity = %quantity,
                    "order sent"
                );
            }
            Err(error) => {
                tracing::error!(
                    symbol = %trade.symbol(),
                    order_id = %order.order_id,
                    error = %error,
                    "order submission failed"
                );
            }
        }

        self.arm_timeout(trade, order.order_id, timeout, timeout_policy);
        Ok(())
    }

    fn arm_timeout(
        &self,
        trade: &Trade,
        order_id: OrderId,
        timeout: Duration,
        timeout_policy: Arc<dyn OrderTimeoutPolicy>,
    ) {
        let weak_trade = trade.weak_handle();
        let weak_portfolio = trade.portfolio_ref().clone();

        let handle = timer::schedule_once(timeout, move || {
            let (Some(trade), Some(portfolio)) = (weak_trade.upgrade(), weak_portfolio.upgrade())
            else {
                return;
            };
            if !trade.pending_matches(&order_id) {
                tracing::debug!(
                    symbol = %trade.symbol(),
                    order_id = %order_id,
                    "timeout fired for a completed order, ignoring"
                );
                return;
            }
            policy::dispatch_timeout(
                &timeout_policy,
                portfolio.as_ref(),
                &order_id,
                timeout,
                trade.as_ref(),
            );
        });

        // The slot holds at most one armed timer.
        let previous = self.armed.lock().replace(handle);
        if let Some(previous) = previous {
            previous.cancel();
        }
    }

    /// Cancel the armed timeout, if any. Idempotent.
    pub(crate) fn kill_timeout(&self) {
        if let Some(handle) = self.armed.lock().take() {
            handle.cancel();
        }
    }
}
