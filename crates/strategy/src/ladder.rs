//! Fibonacci-spaced order ladders.
//!
//! Rung n sits `offset_factor * fib(n)` away from the base price, on the
//! better side for the given direction; the sequence widens the spacing
//! geometrically so add-ons chase a runaway price less and less eagerly.

use crate::math::fib;
use crate::protection::{stop_loss_order, take_profit_order};
use crate::sizing::Store;
use fibgrid_core::errors::InvariantError;
use fibgrid_core::params::Parameters;
use fibgrid_core::side::Side;
use fibgrid_core::types::{Order, Position, TradingContext};
use rust_decimal::Decimal;

fn fib_rung(
    context: &TradingContext,
    store: &Store,
    side: Side,
    base_price: Decimal,
    offset_factor: Decimal,
    n: u32,
) -> Order {
    let offset = offset_factor * Decimal::from(fib(n));
    Order::limit(
        context.pair.clone(),
        side,
        store.open_pos_qty,
        side.better_price(base_price, offset),
    )
}

/// Entry ladder for a flat book: Fibonacci rungs n = 1, 2 plus single-tick
/// and double-tick entries straddling the base price. Four limit orders, all
/// at the per-rung quantity.
#[must_use]
pub fn opening_ladder(
    context: &TradingContext,
    store: &Store,
    params: &Parameters,
    side: Side,
    base_price: Decimal,
) -> Vec<Order> {
    let offset_factor = params.addition_distance(side);
    let mut orders: Vec<Order> = (1..=2)
        .map(|n| fib_rung(context, store, side, base_price, offset_factor, n))
        .collect();

    let tick = context.price_tick;
    orders.push(Order::limit(
        context.pair.clone(),
        side,
        store.open_pos_qty,
        side.better_price(base_price, tick),
    ));
    orders.push(Order::limit(
        context.pair.clone(),
        side,
        store.open_pos_qty,
        side.better_price(base_price, Decimal::TWO * tick),
    ));
    orders
}

/// Add-on ladder for an existing position: Fibonacci rungs n = 1..3, cut
/// short as soon as a rung crosses the liquidation price, with freshly
/// recomputed take-profit and stop-loss orders always appended.
///
/// # Errors
/// Returns `InvariantError::FlatProtection` when called against a flat
/// position.
pub fn adding_ladder(
    context: &TradingContext,
    store: &Store,
    params: &Parameters,
    position: &Position,
    side: Side,
    base_price: Decimal,
) -> Result<Vec<Order>, InvariantError> {
    let offset_factor = params.addition_distance(side);
    let mut orders = Vec::new();
    for n in 1..=3 {
        let rung = fib_rung(context, store, side, base_price, offset_factor, n);
        let crossed = match side {
            Side::Long => rung.price < position.liq_price,
            Side::Short => rung.price > position.liq_price,
            Side::Flat => false,
        };
        if crossed {
            break;
        }
        orders.push(rung);
    }

    let take_profit = take_profit_order(context, params, position)
        .ok_or(InvariantError::FlatProtection)?;
    let stop_loss =
        stop_loss_order(context, params, position).ok_or(InvariantError::FlatProtection)?;
    orders.push(take_profit);
    orders.push(stop_loss);
    Ok(orders)
}
