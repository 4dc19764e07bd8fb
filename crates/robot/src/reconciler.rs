//! Protective order reconciliation.
//!
//! An open position must always sit behind exactly two working orders: a
//! limit take-profit and a trigger stop-loss. Venue state drifts away from
//! that ideal whenever fills, manual cancels, or aborted cycles intervene,
//! so every cycle starts by comparing what is live against what the
//! strategy expects and picking one corrective action:
//!
//! | position | live orders | action                            |
//! |----------|-------------|-----------------------------------|
//! | flat     | 0           | keep                              |
//! | flat     | 1+          | cancel all                        |
//! | open     | 0           | place the pair                    |
//! | open     | 2           | keep, or replace on drifted legs  |
//! | open     | 1 or 3+     | cancel all, place the pair        |
//!
//! Leg comparison looks at side, quantity, and price only. Venue-specific
//! extras never participate, so an adapter enriching a stop order on the
//! wire does not cause churn.

use fibgrid_core::params::Parameters;
use fibgrid_core::types::{Order, OrderType, Position, TradingContext};
use fibgrid_strategy::{stop_loss_order, take_profit_order};

/// The two protective orders an open position is expected to carry.
#[derive(Debug, Clone, PartialEq)]
pub struct ProtectionPair {
    pub take_profit: Order,
    pub stop_loss: Order,
}

impl ProtectionPair {
    /// Expected protection for `position`, `None` when flat.
    #[must_use]
    pub fn for_position(
        context: &TradingContext,
        params: &Parameters,
        position: &Position,
    ) -> Option<Self> {
        Some(Self {
            take_profit: take_profit_order(context, params, position)?,
            stop_loss: stop_loss_order(context, params, position)?,
        })
    }

    /// The pair in placement order, take-profit first.
    #[must_use]
    pub fn into_orders(self) -> [Order; 2] {
        [self.take_profit, self.stop_loss]
    }
}

/// Which protective legs survived comparison against the live orders.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LegDiff {
    pub take_profit_matched: bool,
    pub stop_loss_matched: bool,
}

/// Corrective action chosen by [`plan`].
#[derive(Debug, Clone, PartialEq)]
pub enum ReconcileAction {
    /// Live orders already agree with the expected state.
    Keep,
    /// Stray orders with no position behind them.
    CancelAll,
    /// Open position without any working orders.
    Place(ProtectionPair),
    /// Wrong number of working orders for an open position.
    Reset(ProtectionPair),
    /// Two working orders, but at least one leg drifted from expectation.
    Replace { pair: ProtectionPair, diff: LegDiff },
}

/// Compares `live_orders` against the protection expected for `position`.
///
/// Pure; the caller executes the returned action against the venue. A limit
/// order is compared against the take-profit leg and a trigger order against
/// the stop-loss leg, so two live limits leave the stop-loss unmatched and
/// force a replace.
#[must_use]
pub fn plan(
    context: &TradingContext,
    params: &Parameters,
    position: &Position,
    live_orders: &[Order],
) -> ReconcileAction {
    if position.is_flat() {
        if live_orders.is_empty() {
            return ReconcileAction::Keep;
        }
        return ReconcileAction::CancelAll;
    }

    let Some(pair) = ProtectionPair::for_position(context, params, position) else {
        // Nonzero quantity with no side is venue garbage; clear it.
        return ReconcileAction::CancelAll;
    };

    if live_orders.is_empty() {
        return ReconcileAction::Place(pair);
    }
    if live_orders.len() != 2 {
        return ReconcileAction::Reset(pair);
    }

    let mut diff = LegDiff {
        take_profit_matched: false,
        stop_loss_matched: false,
    };
    for order in live_orders {
        match order.order_type {
            OrderType::Limit => diff.take_profit_matched = legs_match(order, &pair.take_profit),
            OrderType::Trigger => diff.stop_loss_matched = legs_match(order, &pair.stop_loss),
            OrderType::Market => {}
        }
    }

    if diff.take_profit_matched && diff.stop_loss_matched {
        ReconcileAction::Keep
    } else {
        ReconcileAction::Replace { pair, diff }
    }
}

fn legs_match(live: &Order, expected: &Order) -> bool {
    live.side == expected.side && live.qty == expected.qty && live.price == expected.price
}
