//! Position polarity.
//!
//! `Side` is tri-state: a flat instrument has `Side::None`, and a position
//! carries `Buy` (+1) or `Sell` (-1). The numeric factor turns unsigned
//! magnitudes into signed quantities and back.

use std::fmt;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Polarity of a position or order.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Side {
    /// Long (+1).
    Buy,
    /// Short (-1).
    Sell,
    /// Flat (0).
    #[default]
    None,
}

impl Side {
    /// Numeric sign of the side.
    #[must_use]
    pub const fn sign(&self) -> i64 {
        match self {
            Self::Buy => 1,
            Self::Sell => -1,
            Self::None => 0,
        }
    }

    /// Sign as a `Decimal` multiplier.
    #[must_use]
    pub fn factor(&self) -> Decimal {
        Decimal::from(self.sign())
    }

    /// The opposing side. `None` has no opposite.
    #[must_use]
    pub const fn opposite(&self) -> Self {
        match self {
            Self::Buy => Self::Sell,
            Self::Sell => Self::Buy,
            Self::None => Self::None,
        }
    }

    /// Apply this side's sign to an unsigned magnitude.
    #[must_use]
    pub fn polarize(&self, magnitude: Decimal) -> Decimal {
        magnitude * self.factor()
    }

    /// Side implied by a signed quantity.
    #[must_use]
    pub fn from_signed(value: Decimal) -> Self {
        if value > Decimal::ZERO {
            Self::Buy
        } else if value < Decimal::ZERO {
            Self::Sell
        } else {
            Self::None
        }
    }

    /// Single-character sign marker, for compact display.
    #[must_use]
    pub const fn marker(&self) -> &'static str {
        match self {
            Self::Buy => "+",
            Self::Sell => "-",
            Self::None => "",
        }
    }
}

impl fmt::Display for Side {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Self::Buy => "BUY",
            Self::Sell => "SELL",
            Self::None => "NONE",
        };
        write!(f, "{label}")
    }
}
