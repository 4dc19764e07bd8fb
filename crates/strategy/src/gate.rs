//! Trade gate: an ordered veto chain over the indicator reading.
//!
//! Checks run in a fixed order and the first failing one wins, so operators
//! always see the same reason for the same account state. Reasons are
//! surfaced verbatim on the operator channel, pass or fail.

use crate::sizing::Store;
use fibgrid_core::params::Parameters;
use fibgrid_core::side::Side;
use fibgrid_core::types::{Indicator, Position, ShouldTradeResult};
use rust_decimal::Decimal;

#[must_use]
pub fn should_trade(
    indicator: &Indicator,
    position: &Position,
    store: &Store,
    params: &Parameters,
) -> ShouldTradeResult {
    if indicator.rw > params.max_rw {
        return ShouldTradeResult::reject(format!(
            "Rw ({:.4}) exceeds maxRw ({:.4})",
            indicator.rw, params.max_rw
        ));
    }

    if indicator.side.is_flat() {
        return ShouldTradeResult::reject("No indicator side");
    }

    if !position.side.is_flat() && position.side != indicator.side {
        return ShouldTradeResult::reject(
            "Current holding position side is opposite to indicator side",
        );
    }

    if position.unrealized_pnl > Decimal::ZERO {
        return ShouldTradeResult::reject(format!(
            "In profit (unrealized P&L is {:.2})",
            position.unrealized_pnl
        ));
    }

    if indicator.side == Side::Long && !params.allow_long {
        return ShouldTradeResult::reject("Disallow long side");
    }

    if indicator.side == Side::Short && !params.allow_short {
        return ShouldTradeResult::reject("Disallow short side");
    }

    if position.qty >= store.max_pos_qty {
        return ShouldTradeResult::reject("Current holding position qty exceeds allowed max value");
    }

    ShouldTradeResult::pass("Pass all checks")
}
