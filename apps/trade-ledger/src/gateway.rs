//! Order submission gateway.
//!
//! The gateway is fire-and-forget: `submit` enqueues an order with the
//! transport and returns. Acknowledgement, fills, and rejections arrive
//! later through the execution-report feed, never through the return value.

use std::sync::atomic::{AtomicBool, Ordering};

use parking_lot::Mutex;
use thiserror::Error;

use crate::order::OrderSpec;

/// Transport-level submission failure.
#[derive(Debug, Error)]
pub enum GatewayError {
    /// The transport is down or unreachable.
    #[error("gateway unavailable: {0}")]
    Unavailable(String),
    /// The transport refused to enqueue the order.
    #[error("order refused by transport: {0}")]
    Refused(String),
}

/// Trait for order submission transports.
pub trait OrderGateway: Send + Sync {
    /// Enqueue an order for execution.
    ///
    /// An `Ok` return means the order was handed to the transport, not that
    /// the broker accepted it.
    fn submit(&self, order: &OrderSpec) -> Result<(), GatewayError>;
}

/// In-memory gateway recording every submission, for tests.
#[derive(Debug, Default)]
pub struct MockGateway {
    submissions: Mutex<Vec<OrderSpec>>,
    failing: AtomicBool,
}

impl MockGateway {
    /// Create a recording gateway that accepts everything.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Make subsequent submissions fail with `GatewayError::Unavailable`.
    pub fn set_failing(&self, failing: bool) {
        self.failing.store(failing, Ordering::SeqCst);
    }

    /// All orders submitted so far, in order.
    #[must_use]
    pub fn submissions(&self) -> Vec<OrderSpec> {
        self.submissions.lock().clone()
    }

    /// Number of orders submitted so far.
    #[must_use]
    pub fn submission_count(&self) -> usize {
        self.submissions.lock().len()
    }

    /// The most recently submitted order.
    #[must_use]
    pub fn last_submission(&self) -> Option<OrderSpec> {
        self.submissions.lock().last().cloned()
    }
}

impl OrderGateway for MockGateway {
    fn submit(&self, order: &OrderSpec) -> Result<(), GatewayError> {
        if self.failing.load(Ordering::SeqCst) {
            return Err(GatewayError::Unavailable("mock gateway failing".into()));
        }
        self.submissions.lock().push(order.clone());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::builder::{OrderBuilder, OrderOptions, StandardOrderBuilder};
    use crate::side::Side;
    use crate::symbol::Symbol;
    use rust_decimal_macros::dec;

    fn make_order() -> OrderSpec {
        StandardOrderBuilder::new().build(
            &Symbol::new("AAPL"),
            dec!(100),
            Side::Buy,
            &OrderOptions::market(),
        )
    }

    #[test]
    fn test_records_submissions_in_order() {
        let gateway = MockGateway::new();
        let first = make_order();
        let second = make_order();

        gateway.submit(&first).unwrap();
        gateway.submit(&second).unwrap();

        assert_eq!(gateway.submission_count(), 2);
        assert_eq!(gateway.submissions()[0].order_id, first.order_id);
        assert_eq!(
            gateway.last_submission().unwrap().order_id,
            second.order_id
        );
    }

    #[test]
    fn test_failing_mode_rejects_without_recording() {
        let gateway = MockGateway::new();
        gateway.set_failing(true);

        let result = gateway.submit(&make_order());
        assert!(matches!(result, Err(GatewayError::Unavailable(_))));
        assert_eq!(gateway.submission_count(), 0);

        gateway.set_failing(false);
        gateway.submit(&make_order()).unwrap();
        assert_eq!(gateway.submission_count(), 1);
    }
}
