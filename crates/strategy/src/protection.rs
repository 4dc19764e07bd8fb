//! Protective order construction: one take-profit limit and one stop-loss
//! trigger per open position.

use fibgrid_core::params::Parameters;
use fibgrid_core::side::Side;
use fibgrid_core::types::{Order, OrderExtras, Position, TradingContext};

/// Take-profit order for the position: a reduce-only limit on the opposite
/// side, the configured distance into profit, price rounded to the venue's
/// precision.
///
/// Returns `None` with a warning for a flat position; well-formed callers
/// never pass one.
#[must_use]
pub fn take_profit_order(
    context: &TradingContext,
    params: &Parameters,
    position: &Position,
) -> Option<Order> {
    let price = match position.side {
        Side::Long => position.avg_price + params.long_take_profit_distance,
        Side::Short => position.avg_price - params.short_take_profit_distance,
        Side::Flat => {
            tracing::warn!("cannot take profit without a position");
            return None;
        }
    };

    Some(
        Order::limit(
            context.pair.clone(),
            position.side.flip(),
            position.qty,
            price.round_dp(context.price_precision),
        )
        .with_extras(OrderExtras::reduce_only()),
    )
}

/// Stop-loss order for the position: a trigger on the opposite side, the
/// configured distance into loss. The venue adapter submits it reduce-only
/// with the price as the trigger price.
#[must_use]
pub fn stop_loss_order(
    context: &TradingContext,
    params: &Parameters,
    position: &Position,
) -> Option<Order> {
    let price = match position.side {
        Side::Long => position.avg_price - params.long_stop_loss_distance,
        Side::Short => position.avg_price + params.short_stop_loss_distance,
        Side::Flat => {
            tracing::warn!("cannot stop loss without a position");
            return None;
        }
    };

    Some(Order::trigger(
        context.pair.clone(),
        position.side.flip(),
        position.qty,
        price.round_dp(context.price_precision),
    ))
}
