//! Instrument registry and feed router.
//!
//! The portfolio owns every trade, the order builder, and the gateway.
//! Inbound execution reports and market trades are routed to the matching
//! trade by symbol; events for unregistered symbols are dropped with a
//! warning.

use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::RwLock;

use crate::builder::OrderBuilder;
use crate::gateway::OrderGateway;
use crate::report::{ExecutionReport, MarketTrade};
use crate::symbol::Symbol;
use crate::trade::Trade;

/// Owning container for per-instrument trades.
pub struct Portfolio {
    gateway: Arc<dyn OrderGateway>,
    order_builder: Arc<dyn OrderBuilder>,
    trades: RwLock<HashMap<Symbol, Arc<Trade>>>,
}

impl Portfolio {
    /// Create a portfolio around a gateway and an order builder.
    #[must_use]
    pub fn new(gateway: Arc<dyn OrderGateway>, order_builder: Arc<dyn OrderBuilder>) -> Arc<Self> {
        Arc::new(Self {
            gateway,
            order_builder,
            trades: RwLock::new(HashMap::new()),
        })
    }

    /// Register an instrument, creating its trade if absent.
    ///
    /// Registering an already-registered symbol returns the existing trade.
    pub fn register(self: &Arc<Self>, symbol: Symbol) -> Arc<Trade> {
        let mut trades = self.trades.write();
        trades
            .entry(symbol)
            .or_insert_with_key(|symbol| Trade::new(symbol.clone(), self))
            .clone()
    }

    /// The trade for `symbol`, if registered.
    #[must_use]
    pub fn trade(&self, symbol: &Symbol) -> Option<Arc<Trade>> {
        self.trades.read().get(symbol).cloned()
    }

    /// Drop an instrument from the portfolio, returning its trade.
    pub fn remove(&self, symbol: &Symbol) -> Option<Arc<Trade>> {
        self.trades.write().remove(symbol)
    }

    /// Registered symbols, in no particular order.
    #[must_use]
    pub fn symbols(&self) -> Vec<Symbol> {
        self.trades.read().keys().cloned().collect()
    }

    /// Number of registered instruments.
    #[must_use]
    pub fn len(&self) -> usize {
        self.trades.read().len()
    }

    /// Whether no instruments are registered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.trades.read().is_empty()
    }

    /// The order submission gateway.
    #[must_use]
    pub fn gateway(&self) -> &Arc<dyn OrderGateway> {
        &self.gateway
    }

    /// The order builder.
    #[must_use]
    pub fn order_builder(&self) -> &Arc<dyn OrderBuilder> {
        &self.order_builder
    }

    /// Route an execution report to the trade for its symbol.
    pub fn accept_execution_report(&self, report: &ExecutionReport) {
        // Clone out of the registry so report processing and policy
        // callbacks run without the registry lock.
        let trade = self.trades.read().get(&report.symbol).cloned();
        match trade {
            Some(trade) => trade.accept_execution_report(report),
            None => {
                tracing::warn!(
                    symbol = %report.symbol,
                    order_id = %report.order_id,
                    "execution report for an unregistered symbol, dropping"
                );
            }
        }
    }

    /// Route a market trade to the trade for its symbol.
    pub fn accept_market_trade(&self, event: MarketTrade) {
        let trade = self.trades.read().get(&event.symbol).cloned();
        match trade {
            Some(trade) => trade.accept_market_trade(event),
            None => {
                tracing::debug!(
                    symbol = %event.symbol,
                    "market trade for an unregistered symbol, dropping"
                );
            }
        }
    }
}
