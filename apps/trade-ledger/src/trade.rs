//! Per-instrument position ledger.
//!
//! A `Trade` tracks one instrument's settled position and the single order
//! that may be in flight for it. Execution reports drive all accounting:
//! partial fills update a progress snapshot, and a `Filled` report merges
//! the executed quantity into the position with signed arithmetic, so a
//! large opposite-side fill can flip the position through flat.
//!
//! Trades are created by a [`Portfolio`](crate::portfolio::Portfolio) and
//! hold only a weak reference back to it. Policy callbacks and gateway
//! access die gracefully when the portfolio goes away.

use std::fmt;
use std::sync::{Arc, Weak};
use std::time::Duration;

use parking_lot::{Mutex, RwLock};
use rust_decimal::Decimal;

use crate::controller::OrderController;
use crate::error::SendOrderError;
use crate::order::{OrderId, OrderStatus};
use crate::policy::{
    self, FillPolicy, OrderTimeoutPolicy, RejectPolicy, WarnOnFill, WarnOnReject, WarnOnTimeout,
};
use crate::portfolio::Portfolio;
use crate::report::{ExecutionReport, MarketTrade};
use crate::side::Side;
use crate::symbol::Symbol;

/// Default order timeout, matching a patient manual workflow.
pub const DEFAULT_ORDER_TIMEOUT: Duration = Duration::from_secs(60);

/// Accounting state, serialized under one lock.
#[derive(Debug)]
struct PositionState {
    quantity: Decimal,
    side: Side,
    average_price: Decimal,
    pending_order_id: Option<OrderId>,
    pending_side: Side,
    leaves_qty: Decimal,
    cumulative_qty: Decimal,
    order_status: Option<OrderStatus>,
    last_trade: Option<MarketTrade>,
}

impl PositionState {
    fn new() -> Self {
        Self {
            quantity: Decimal::ZERO,
            side: Side::None,
            average_price: Decimal::ZERO,
            pending_order_id: None,
            pending_side: Side::None,
            leaves_qty: Decimal::ZERO,
            cumulative_qty: Decimal::ZERO,
            order_status: None,
            last_trade: None,
        }
    }

    /// Merge a completed fill into the settled position.
    ///
    /// Signed arithmetic: a fill larger than the current position on the
    /// opposite side flips it through flat, restarting the cost basis at
    /// the fill price. Same-side fills extend the position with a
    /// quantity-weighted basis.
    fn apply_fill(&mut self, fill_side: Side, filled: Decimal, price: Decimal) {
        let signed = self.side.polarize(self.quantity) + fill_side.polarize(filled);
        let new_quantity = signed.abs();

        self.average_price = if new_quantity.is_zero() {
            Decimal::ZERO
        } else if self.quantity.is_zero() || fill_side == self.side {
            (self.average_price * self.quantity + price * filled) / (self.quantity + filled)
        } else if filled > self.quantity {
            price
        } else {
            self.average_price
        };

        self.quantity = new_quantity;
        self.side = Side::from_signed(signed);
    }

    fn clear_pending(&mut self) {
        self.pending_order_id = None;
        self.pending_side = Side::None;
        self.leaves_qty = Decimal::ZERO;
        self.cumulative_qty = Decimal::ZERO;
    }
}

/// Runtime-settable reaction configuration.
struct PolicySlots {
    fill: RwLock<Arc<dyn FillPolicy>>,
    timeout: RwLock<Arc<dyn OrderTimeoutPolicy>>,
    reject: RwLock<Arc<dyn RejectPolicy>>,
    order_timeout: RwLock<Duration>,
}

impl PolicySlots {
    fn new() -> Self {
        Self {
            fill: RwLock::new(Arc::new(WarnOnFill)),
            timeout: RwLock::new(Arc::new(WarnOnTimeout)),
            reject: RwLock::new(Arc::new(WarnOnReject)),
            order_timeout: RwLock::new(DEFAULT_ORDER_TIMEOUT),
        }
    }
}

/// What to do after the state lock is released.
enum Reaction {
    Nothing,
    Fill,
    TerminalFill,
    Terminal,
    Reject,
}

/// Position ledger and order-lifecycle controller for one instrument.
pub struct Trade {
    symbol: Symbol,
    portfolio: Weak<Portfolio>,
    weak_self: Weak<Self>,
    state: Mutex<PositionState>,
    policies: PolicySlots,
    controller: OrderController,
}

impl Trade {
    pub(crate) fn new(symbol: Symbol, portfolio: &Arc<Portfolio>) -> Arc<Self> {
        Arc::new_cyclic(|weak_self| Self {
            symbol,
            portfolio: Arc::downgrade(portfolio),
            weak_self: weak_self.clone(),
            state: Mutex::new(PositionState::new()),
            policies: PolicySlots::new(),
            controller: OrderController::new(),
        })
    }

    /// Instrument this ledger tracks.
    #[must_use]
    pub const fn symbol(&self) -> &Symbol {
        &self.symbol
    }

    /// Unsigned magnitude of the settled position.
    #[must_use]
    pub fn quantity(&self) -> Decimal {
        self.state.lock().quantity
    }

    /// Polarity of the settled position. `Side::None` iff the position is flat.
    #[must_use]
    pub fn side(&self) -> Side {
        self.state.lock().side
    }

    /// Cost basis of the open position; zero when flat.
    #[must_use]
    pub fn average_price(&self) -> Decimal {
        self.state.lock().average_price
    }

    /// Position with its sign applied.
    #[must_use]
    pub fn signed_quantity(&self) -> Decimal {
        let state = self.state.lock();
        state.side.polarize(state.quantity)
    }

    /// Projected position assuming the pending order's fills settle.
    ///
    /// The sign of the result flips relative to `side` when pending fills
    /// have pushed the position through flat.
    #[must_use]
    pub fn net_quantity(&self) -> Decimal {
        let state = self.state.lock();
        state.quantity + (state.side.factor() * state.pending_side.factor()) * state.cumulative_qty
    }

    /// Identifier of the in-flight order, if any.
    #[must_use]
    pub fn pending_order_id(&self) -> Option<OrderId> {
        self.state.lock().pending_order_id.clone()
    }

    /// Direction of the in-flight order.
    #[must_use]
    pub fn pending_side(&self) -> Side {
        self.state.lock().pending_side
    }

    /// Unfilled quantity of the in-flight order.
    #[must_use]
    pub fn leaves_quantity(&self) -> Decimal {
        self.state.lock().leaves_qty
    }

    /// Filled quantity of the in-flight order.
    #[must_use]
    pub fn cumulative_quantity(&self) -> Decimal {
        self.state.lock().cumulative_qty
    }

    /// Status carried by the last relevant execution report.
    #[must_use]
    pub fn order_status(&self) -> Option<OrderStatus> {
        self.state.lock().order_status
    }

    /// Whether an order is in flight.
    #[must_use]
    pub fn is_pending(&self) -> bool {
        self.state.lock().pending_order_id.is_some()
    }

    /// Whether an in-flight order still has quantity working.
    #[must_use]
    pub fn is_filling(&self) -> bool {
        let state = self.state.lock();
        state.pending_order_id.is_some() && !state.leaves_qty.is_zero()
    }

    /// Most recent market trade seen for this instrument.
    #[must_use]
    pub fn last_trade(&self) -> Option<MarketTrade> {
        self.state.lock().last_trade.clone()
    }

    /// Last traded price, or zero when no market trade has been seen.
    #[must_use]
    pub fn last_price(&self) -> Decimal {
        self.state
            .lock()
            .last_trade
            .as_ref()
            .map_or(Decimal::ZERO, |trade| trade.price)
    }

    /// Install the fill policy.
    pub fn set_fill_policy(&self, fill_policy: Arc<dyn FillPolicy>) {
        *self.policies.fill.write() = fill_policy;
    }

    /// Install the order timeout policy used by default-timeout sends.
    pub fn set_order_timeout_policy(&self, timeout_policy: Arc<dyn OrderTimeoutPolicy>) {
        *self.policies.timeout.write() = timeout_policy;
    }

    /// Install the reject policy.
    pub fn set_reject_policy(&self, reject_policy: Arc<dyn RejectPolicy>) {
        *self.policies.reject.write() = reject_policy;
    }

    /// Set the timeout used by default-timeout sends.
    pub fn set_order_timeout(&self, timeout: Duration) {
        *self.policies.order_timeout.write() = timeout;
    }

    /// The timeout used by default-timeout sends.
    #[must_use]
    pub fn order_timeout(&self) -> Duration {
        *self.policies.order_timeout.read()
    }

    /// Record a market trade for mark-to-market. No validation.
    pub fn accept_market_trade(&self, event: MarketTrade) {
        self.state.lock().last_trade = Some(event);
    }

    /// Absorb an execution report.
    ///
    /// Reports for a different symbol are ignored. A report whose order id
    /// does not match the pending order is logged and applied anyway; the
    /// broker's view wins over local bookkeeping.
    pub fn accept_execution_report(&self, report: &ExecutionReport) {
        if report.symbol != self.symbol {
            tracing::warn!(
                symbol = %self.symbol,
                report_symbol = %report.symbol,
                order_id = %report.order_id,
                "received external execution report, ignoring"
            );
            return;
        }

        let reaction = {
            let mut state = self.state.lock();

            if state.pending_order_id.as_ref() != Some(&report.order_id) {
                tracing::warn!(
                    symbol = %self.symbol,
                    order_id = %report.order_id,
                    "received external execution report, accepting"
                );
            }
            state.order_status = Some(report.status);

            match report.status {
                OrderStatus::New => {
                    tracing::info!(
                        symbol = %self.symbol,
                        order_id = %report.order_id,
                        "order acknowledged"
                    );
                    Reaction::Nothing
                }
                OrderStatus::PartiallyFilled => {
                    state.pending_side = report.side;
                    state.leaves_qty = report.leaves_qty;
                    state.cumulative_qty = report.cumulative_qty;
                    Reaction::Fill
                }
                OrderStatus::Filled => {
                    state.apply_fill(report.side, report.cumulative_qty, report.price);
                    state.clear_pending();
                    Reaction::TerminalFill
                }
                OrderStatus::Canceled => {
                    state.clear_pending();
                    Reaction::Terminal
                }
                OrderStatus::Rejected => {
                    state.clear_pending();
                    Reaction::Reject
                }
                OrderStatus::Unknown => {
                    tracing::error!(
                        symbol = %self.symbol,
                        order_id = %report.order_id,
                        "execution report carries an unimplemented status"
                    );
                    Reaction::Nothing
                }
            }
        };

        // Policies and timer bookkeeping run with the state lock released.
        match reaction {
            Reaction::Nothing => {}
            Reaction::Fill => self.notify_fill(report),
            Reaction::TerminalFill => {
                self.controller.kill_timeout();
                self.notify_fill(report);
            }
            Reaction::Terminal => self.controller.kill_timeout(),
            Reaction::Reject => {
                self.controller.kill_timeout();
                self.notify_reject(report);
            }
        }
    }

    /// Submit a market order with the configured timeout and policy.
    pub fn market_order(&self, quantity: Decimal, side: Side) -> Result<(), SendOrderError> {
        let timeout = self.order_timeout();
        let timeout_policy = self.policies.timeout.read().clone();
        self.market_order_with(quantity, side, timeout, timeout_policy)
    }

    /// Submit a market order with an explicit timeout and policy.
    pub fn market_order_with(
        &self,
        quantity: Decimal,
        side: Side,
        timeout: Duration,
        timeout_policy: Arc<dyn OrderTimeoutPolicy>,
    ) -> Result<(), SendOrderError> {
        self.controller
            .send_order(self, quantity, side, timeout, timeout_policy)
    }

    /// Buy `quantity` at market.
    pub fn long_market(&self, quantity: Decimal) -> Result<(), SendOrderError> {
        self.market_order(quantity, Side::Buy)
    }

    /// Buy `quantity` at market with an explicit timeout and policy.
    pub fn long_market_with(
        &self,
        quantity: Decimal,
        timeout: Duration,
        timeout_policy: Arc<dyn OrderTimeoutPolicy>,
    ) -> Result<(), SendOrderError> {
        self.market_order_with(quantity, Side::Buy, timeout, timeout_policy)
    }

    /// Sell `quantity` at market.
    pub fn short_market(&self, quantity: Decimal) -> Result<(), SendOrderError> {
        self.market_order(quantity, Side::Sell)
    }

    /// Sell `quantity` at market with an explicit timeout and policy.
    pub fn short_market_with(
        &self,
        quantity: Decimal,
        timeout: Duration,
        timeout_policy: Arc<dyn OrderTimeoutPolicy>,
    ) -> Result<(), SendOrderError> {
        self.market_order_with(quantity, Side::Sell, timeout, timeout_policy)
    }

    /// Flatten the position: the full quantity at the opposing side.
    pub fn close_market(&self) -> Result<(), SendOrderError> {
        let (quantity, side) = {
            let state = self.state.lock();
            (state.quantity, state.side.opposite())
        };
        self.market_order(quantity, side)
    }

    /// Flatten the position with an explicit timeout and policy.
    pub fn close_market_with(
        &self,
        timeout: Duration,
        timeout_policy: Arc<dyn OrderTimeoutPolicy>,
    ) -> Result<(), SendOrderError> {
        let (quantity, side) = {
            let state = self.state.lock();
            (state.quantity, state.side.opposite())
        };
        self.market_order_with(quantity, side, timeout, timeout_policy)
    }

    /// Shrink the position by `quantity` at the opposing side.
    pub fn reduce_market(&self, quantity: Decimal) -> Result<(), SendOrderError> {
        let side = self.side().opposite();
        self.market_order(quantity, side)
    }

    /// Shrink the position with an explicit timeout and policy.
    pub fn reduce_market_with(
        &self,
        quantity: Decimal,
        timeout: Duration,
        timeout_policy: Arc<dyn OrderTimeoutPolicy>,
    ) -> Result<(), SendOrderError> {
        let side = self.side().opposite();
        self.market_order_with(quantity, side, timeout, timeout_policy)
    }

    pub(crate) const fn portfolio_ref(&self) -> &Weak<Portfolio> {
        &self.portfolio
    }

    pub(crate) fn weak_handle(&self) -> Weak<Self> {
        self.weak_self.clone()
    }

    /// Claim the pending-order slot. Fails if an order is already in flight.
    pub(crate) fn reserve_pending(&self, order_id: &OrderId, side: Side) -> bool {
        let mut state = self.state.lock();
        if state.pending_order_id.is_some() {
            return false;
        }
        state.pending_order_id = Some(order_id.clone());
        state.pending_side = side;
        true
    }

    /// Whether `order_id` is still the in-flight order.
    pub(crate) fn pending_matches(&self, order_id: &OrderId) -> bool {
        self.state.lock().pending_order_id.as_ref() == Some(order_id)
    }

    fn notify_fill(&self, report: &ExecutionReport) {
        let Some(portfolio) = self.portfolio.upgrade() else {
            tracing::warn!(
                symbol = %self.symbol,
                order_id = %report.order_id,
                "fill on a detached trade, skipping fill policy"
            );
            return;
        };
        let fill_policy = self.policies.fill.read().clone();
        policy::dispatch_fill(&fill_policy, portfolio.as_ref(), &report.order_id, self, report);
    }

    fn notify_reject(&self, report: &ExecutionReport) {
        let Some(portfolio) = self.portfolio.upgrade() else {
            tracing::warn!(
                symbol = %self.symbol,
                order_id = %report.order_id,
                "reject on a detached trade, skipping reject policy"
            );
            return;
        };
        let reject_policy = self.policies.reject.read().clone();
        policy::dispatch_reject(
            &reject_policy,
            portfolio.as_ref(),
            &report.order_id,
            self,
            report,
        );
    }
}

impl fmt::Display for Trade {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state = self.state.lock();
        let last_price = state
            .last_trade
            .as_ref()
            .map_or(Decimal::ZERO, |trade| trade.price);
        write!(
            f,
            "{{{}:[{}]:{}{}@{}}}",
            self.symbol,
            last_price,
            state.side.marker(),
            state.quantity,
            state.average_price
        )
    }
}

impl fmt::Debug for Trade {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Trade")
            .field("symbol", &self.symbol)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::builder::StandardOrderBuilder;
    use crate::gateway::MockGateway;
    use rust_decimal_macros::dec;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn make_portfolio() -> (Arc<Portfolio>, Arc<MockGateway>) {
        let gateway = Arc::new(MockGateway::new());
        let portfolio = Portfolio::new(
            gateway.clone(),
            Arc::new(StandardOrderBuilder::new().with_account("TEST")),
        );
        (portfolio, gateway)
    }

    fn filled(symbol: &str, order_id: &str, side: Side, qty: Decimal, price: Decimal) -> ExecutionReport {
        ExecutionReport::new(
            Symbol::new(symbol),
            OrderId::new(order_id),
            OrderStatus::Filled,
        )
        .with_side(side)
        .with_fill(Decimal::ZERO, qty)
        .with_price(price)
    }

    #[derive(Default)]
    struct CountingFill {
        calls: AtomicUsize,
    }

    impl FillPolicy for CountingFill {
        fn on_fill(&self, _: &Portfolio, _: &OrderId, _: &Trade, _: &ExecutionReport) {
            self.calls.fetch_add(1, Ordering::SeqCst);
        }
    }

    #[derive(Default)]
    struct CountingReject {
        calls: AtomicUsize,
    }

    impl RejectPolicy for CountingReject {
        fn on_reject(&self, _: &Portfolio, _: &OrderId, _: &Trade, _: &ExecutionReport) {
            self.calls.fetch_add(1, Ordering::SeqCst);
        }
    }

    #[derive(Default)]
    struct CountingTimeout {
        calls: AtomicUsize,
    }

    impl OrderTimeoutPolicy for CountingTimeout {
        fn on_order_timeout(&self, _: &Portfolio, _: &OrderId, _: Duration, _: &Trade) {
            self.calls.fetch_add(1, Ordering::SeqCst);
        }
    }

    #[test]
    fn test_new_trade_is_flat() {
        let (portfolio, _) = make_portfolio();
        let trade = portfolio.register(Symbol::new("AAPL"));

        assert_eq!(trade.quantity(), Decimal::ZERO);
        assert_eq!(trade.side(), Side::None);
        assert_eq!(trade.average_price(), Decimal::ZERO);
        assert!(!trade.is_pending());
        assert!(!trade.is_filling());
        assert_eq!(trade.order_status(), None);
    }

    #[test]
    fn test_foreign_symbol_report_is_ignored() {
        let (portfolio, _) = make_portfolio();
        let trade = portfolio.register(Symbol::new("AAPL"));

        trade.accept_execution_report(&filled("MSFT", "ord-1", Side::Buy, dec!(100), dec!(50)));

        assert_eq!(trade.quantity(), Decimal::ZERO);
        assert_eq!(trade.order_status(), None);
    }

    #[test]
    fn test_unexpected_order_id_is_accepted() {
        // No order was ever sent; the broker's report still lands.
        let (portfolio, _) = make_portfolio();
        let trade = portfolio.register(Symbol::new("AAPL"));

        trade.accept_execution_report(&filled("AAPL", "ext-1", Side::Buy, dec!(100), dec!(150)));

        assert_eq!(trade.quantity(), dec!(100));
        assert_eq!(trade.side(), Side::Buy);
        assert_eq!(trade.average_price(), dec!(150));
    }

    #[test]
    fn test_unknown_status_leaves_accounting_unchanged() {
        let (portfolio, _) = make_portfolio();
        let trade = portfolio.register(Symbol::new("AAPL"));
        trade.accept_execution_report(&filled("AAPL", "ord-1", Side::Buy, dec!(100), dec!(150)));

        let report: ExecutionReport = serde_json::from_str(
            r#"{"symbol":"AAPL","order_id":"ord-2","status":"EXPIRED",
                "side":"BUY","leaves_qty":"0","cumulative_qty":"100","price":"1"}"#,
        )
        .unwrap();
        trade.accept_execution_report(&report);

        assert_eq!(trade.quantity(), dec!(100));
        assert_eq!(trade.average_price(), dec!(150));
        assert_eq!(trade.order_status(), Some(OrderStatus::Unknown));
    }

    #[test]
    fn test_same_side_fill_extends_with_weighted_basis() {
        let (portfolio, _) = make_portfolio();
        let trade = portfolio.register(Symbol::new("AAPL"));

        trade.accept_execution_report(&filled("AAPL", "ord-1", Side::Buy, dec!(100), dec!(10)));
        trade.accept_execution_report(&filled("AAPL", "ord-2", Side::Buy, dec!(100), dec!(20)));

        assert_eq!(trade.quantity(), dec!(200));
        assert_eq!(trade.side(), Side::Buy);
        assert_eq!(trade.average_price(), dec!(15));
    }

    #[test]
    fn test_opposite_fill_reduces_and_keeps_basis() {
        let (portfolio, _) = make_portfolio();
        let trade = portfolio.register(Symbol::new("AAPL"));

        trade.accept_execution_report(&filled("AAPL", "ord-1", Side::Buy, dec!(100), dec!(10)));
        trade.accept_execution_report(&filled("AAPL", "ord-2", Side::Sell, dec!(40), dec!(12)));

        assert_eq!(trade.quantity(), dec!(60));
        assert_eq!(trade.side(), Side::Buy);
        assert_eq!(trade.average_price(), dec!(10));
    }

    #[test]
    fn test_oversized_opposite_fill_flips_through_flat() {
        let (portfolio, _) = make_portfolio();
        let trade = portfolio.register(Symbol::new("AAPL"));

        trade.accept_execution_report(&filled("AAPL", "ord-1", Side::Buy, dec!(100), dec!(10)));
        trade.accept_execution_report(&filled("AAPL", "ord-2", Side::Sell, dec!(150), dec!(12)));

        assert_eq!(trade.quantity(), dec!(50));
        assert_eq!(trade.side(), Side::Sell);
        assert_eq!(trade.average_price(), dec!(12));
    }

    #[test]
    fn test_exact_close_resets_basis() {
        let (portfolio, _) = make_portfolio();
        let trade = portfolio.register(Symbol::new("AAPL"));

        trade.accept_execution_report(&filled("AAPL", "ord-1", Side::Buy, dec!(100), dec!(10)));
        trade.accept_execution_report(&filled("AAPL", "ord-2", Side::Sell, dec!(100), dec!(12)));

        assert_eq!(trade.quantity(), Decimal::ZERO);
        assert_eq!(trade.side(), Side::None);
        assert_eq!(trade.average_price(), Decimal::ZERO);
        assert_eq!(trade.signed_quantity(), Decimal::ZERO);
    }

    #[test]
    fn test_partial_fill_updates_snapshot_not_position() {
        let (portfolio, _) = make_portfolio();
        let trade = portfolio.register(Symbol::new("AAPL"));
        let fills = Arc::new(CountingFill::default());
        trade.set_fill_policy(fills.clone());

        let report = ExecutionReport::new(
            Symbol::new("AAPL"),
            OrderId::new("ord-1"),
            OrderStatus::PartiallyFilled,
        )
        .with_side(Side::Buy)
        .with_fill(dec!(60), dec!(40))
        .with_price(dec!(10));
        trade.accept_execution_report(&report);

        assert_eq!(trade.quantity(), Decimal::ZERO);
        assert_eq!(trade.cumulative_quantity(), dec!(40));
        assert_eq!(trade.leaves_quantity(), dec!(60));
        assert_eq!(trade.pending_side(), Side::Buy);
        assert_eq!(fills.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_net_quantity_projects_pending_fills() {
        let (portfolio, gateway) = make_portfolio();
        let trade = portfolio.register(Symbol::new("AAPL"));
        trade.accept_execution_report(&filled("AAPL", "ord-1", Side::Buy, dec!(100), dec!(10)));

        // Opposite-side order partially filled for 40 of 150.
        trade.market_order(dec!(150), Side::Sell).unwrap();
        let order_id = gateway.last_submission().unwrap().order_id;
        let report = ExecutionReport::new(
            Symbol::new("AAPL"),
            order_id,
            OrderStatus::PartiallyFilled,
        )
        .with_side(Side::Sell)
        .with_fill(dec!(110), dec!(40))
        .with_price(dec!(12));
        trade.accept_execution_report(&report);

        assert_eq!(trade.quantity(), dec!(100));
        assert_eq!(trade.net_quantity(), dec!(60));
        assert!(trade.is_filling());
    }

    #[test]
    fn test_net_quantity_is_zero_while_flat() {
        // Partial fills on a flat position do not project: the settled
        // side contributes no sign to the formula.
        let (portfolio, _) = make_portfolio();
        let trade = portfolio.register(Symbol::new("AAPL"));

        let report = ExecutionReport::new(
            Symbol::new("AAPL"),
            OrderId::new("ord-1"),
            OrderStatus::PartiallyFilled,
        )
        .with_side(Side::Buy)
        .with_fill(dec!(60), dec!(40))
        .with_price(dec!(10));
        trade.accept_execution_report(&report);

        assert_eq!(trade.cumulative_quantity(), dec!(40));
        assert_eq!(trade.net_quantity(), Decimal::ZERO);
    }

    #[test]
    fn test_rejected_clears_pending_and_invokes_policy() {
        let (portfolio, _) = make_portfolio();
        let trade = portfolio.register(Symbol::new("AAPL"));
        let rejects = Arc::new(CountingReject::default());
        trade.set_reject_policy(rejects.clone());

        trade.accept_execution_report(&ExecutionReport::new(
            Symbol::new("AAPL"),
            OrderId::new("ord-1"),
            OrderStatus::Rejected,
        ));

        assert!(!trade.is_pending());
        assert_eq!(trade.order_status(), Some(OrderStatus::Rejected));
        assert_eq!(rejects.calls.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_market_trade_updates_last_price() {
        let (portfolio, _) = make_portfolio();
        let trade = portfolio.register(Symbol::new("AAPL"));

        assert_eq!(trade.last_price(), Decimal::ZERO);
        trade.accept_market_trade(MarketTrade::new(Symbol::new("AAPL"), dec!(151.02), dec!(5)));
        assert_eq!(trade.last_price(), dec!(151.02));
        assert!(trade.last_trade().is_some());
    }

    #[test]
    fn test_send_on_detached_trade_fails() {
        let (portfolio, _) = make_portfolio();
        let trade = portfolio.register(Symbol::new("AAPL"));
        drop(portfolio);

        let result = trade.long_market(dec!(100));
        assert!(matches!(result, Err(SendOrderError::Unlinked { .. })));
    }

    #[tokio::test]
    async fn test_long_market_submits_buy_order() {
        let (portfolio, gateway) = make_portfolio();
        let trade = portfolio.register(Symbol::new("AAPL"));

        trade.long_market(dec!(100)).unwrap();

        let order = gateway.last_submission().unwrap();
        assert_eq!(order.symbol, Symbol::new("AAPL"));
        assert_eq!(order.side, Side::Buy);
        assert_eq!(order.quantity, dec!(100));
        assert_eq!(order.account.as_deref(), Some("TEST"));
        assert_eq!(trade.pending_order_id(), Some(order.order_id));
        assert_eq!(trade.pending_side(), Side::Buy);
    }

    #[tokio::test]
    async fn test_second_send_while_pending_is_a_no_op() {
        let (portfolio, gateway) = make_portfolio();
        let trade = portfolio.register(Symbol::new("AAPL"));

        trade.long_market(dec!(100)).unwrap();
        let pending = trade.pending_order_id();

        trade.short_market(dec!(50)).unwrap();

        assert_eq!(gateway.submission_count(), 1);
        assert_eq!(trade.pending_order_id(), pending);
    }

    #[tokio::test]
    async fn test_fill_frees_slot_for_next_order() {
        let (portfolio, gateway) = make_portfolio();
        let trade = portfolio.register(Symbol::new("AAPL"));

        trade.long_market(dec!(100)).unwrap();
        let order = gateway.last_submission().unwrap();
        trade.accept_execution_report(&filled(
            "AAPL",
            order.order_id.as_str(),
            Side::Buy,
            dec!(100),
            dec!(10),
        ));

        assert!(!trade.is_pending());
        trade.short_market(dec!(50)).unwrap();
        assert_eq!(gateway.submission_count(), 2);
    }

    #[tokio::test]
    async fn test_close_market_flattens_at_opposite_side() {
        let (portfolio, gateway) = make_portfolio();
        let trade = portfolio.register(Symbol::new("AAPL"));
        trade.accept_execution_report(&filled("AAPL", "ord-1", Side::Buy, dec!(100), dec!(10)));

        trade.close_market().unwrap();

        let order = gateway.last_submission().unwrap();
        assert_eq!(order.side, Side::Sell);
        assert_eq!(order.quantity, dec!(100));
    }

    #[tokio::test]
    async fn test_reduce_market_sends_opposite_side() {
        let (portfolio, gateway) = make_portfolio();
        let trade = portfolio.register(Symbol::new("AAPL"));
        trade.accept_execution_report(&filled("AAPL", "ord-1", Side::Sell, dec!(80), dec!(10)));

        trade.reduce_market(dec!(30)).unwrap();

        let order = gateway.last_submission().unwrap();
        assert_eq!(order.side, Side::Buy);
        assert_eq!(order.quantity, dec!(30));
    }

    #[tokio::test]
    async fn test_gateway_failure_is_absorbed() {
        let (portfolio, gateway) = make_portfolio();
        let trade = portfolio.register(Symbol::new("AAPL"));
        gateway.set_failing(true);

        // Fire-and-forget: the submit error is logged, the slot stays
        // reserved, and the armed timeout is left to resolve it.
        trade.long_market(dec!(100)).unwrap();
        assert!(trade.is_pending());
        assert_eq!(gateway.submission_count(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_timeout_policy_fires_while_order_pends() {
        let (portfolio, _gateway) = make_portfolio();
        let trade = portfolio.register(Symbol::new("AAPL"));
        let timeouts = Arc::new(CountingTimeout::default());

        trade
            .long_market_with(dec!(100), Duration::from_secs(5), timeouts.clone())
            .unwrap();

        tokio::time::sleep(Duration::from_secs(6)).await;
        assert_eq!(timeouts.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_fill_before_timeout_suppresses_policy() {
        let (portfolio, gateway) = make_portfolio();
        let trade = portfolio.register(Symbol::new("AAPL"));
        let timeouts = Arc::new(CountingTimeout::default());

        trade
            .long_market_with(dec!(100), Duration::from_secs(5), timeouts.clone())
            .unwrap();
        let order = gateway.last_submission().unwrap();
        trade.accept_execution_report(&filled(
            "AAPL",
            order.order_id.as_str(),
            Side::Buy,
            dec!(100),
            dec!(10),
        ));

        tokio::time::sleep(Duration::from_secs(10)).await;
        assert_eq!(timeouts.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_configured_timeout_applies_to_plain_sends() {
        let (portfolio, _gateway) = make_portfolio();
        let trade = portfolio.register(Symbol::new("AAPL"));
        let timeouts = Arc::new(CountingTimeout::default());
        trade.set_order_timeout(Duration::from_secs(3));
        trade.set_order_timeout_policy(timeouts.clone());

        trade.short_market(dec!(10)).unwrap();

        tokio::time::sleep(Duration::from_secs(4)).await;
        assert_eq!(timeouts.calls.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_display_format() {
        let (portfolio, _) = make_portfolio();
        let trade = portfolio.register(Symbol::new("AAPL"));
        trade.accept_execution_report(&filled("AAPL", "ord-1", Side::Buy, dec!(100), dec!(10)));
        trade.accept_market_trade(MarketTrade::new(Symbol::new("AAPL"), dec!(11), dec!(1)));

        assert_eq!(trade.to_string(), "{AAPL:[11]:+100@10}");
    }
}
