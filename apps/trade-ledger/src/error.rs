//! Crate error types.
//!
//! Most operational problems on the report path are absorbed and logged
//! rather than returned: a live feed cannot be paused to surface an error to
//! a caller that no longer exists. Send operations return an error only for
//! configuration defects.

use thiserror::Error;

use crate::symbol::Symbol;

/// Failure to initiate an order.
#[derive(Debug, Error)]
pub enum SendOrderError {
    /// The trade's owning portfolio has been dropped. Orders require the
    /// portfolio's builder and gateway, so this is fatal for the call.
    #[error("trade for {symbol} is not attached to a portfolio")]
    Unlinked {
        /// Instrument of the detached trade.
        symbol: Symbol,
    },
}
