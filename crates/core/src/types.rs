use crate::side::Side;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Contract family of the traded pair. Sizing math branches on the
/// inverse/linear split; spot and margin markets are not tradeable here.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MarketType {
    InversePerpetual,
    InverseDelivery,
    LinearPerpetual,
    LinearDelivery,
    Spots,
    Margin,
}

impl MarketType {
    #[must_use]
    pub const fn is_inverse(self) -> bool {
        matches!(self, Self::InversePerpetual | Self::InverseDelivery)
    }

    #[must_use]
    pub const fn is_linear(self) -> bool {
        matches!(self, Self::LinearPerpetual | Self::LinearDelivery)
    }
}

/// Session-immutable description of what is being traded and how the venue
/// quantizes it. Assembled once at startup, read-only afterwards.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TradingContext {
    pub pair: String,
    pub target_currency: String,
    pub market_type: MarketType,
    pub price_precision: u32,
    pub price_tick: Decimal,
    pub qty_precision: u32,
}

impl fmt::Display for TradingContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{{pair: {}, target_currency: {}, market_type: {:?}, price_precision: {}, qty_precision: {}, price_tick: {}}}",
            self.pair,
            self.target_currency,
            self.market_type,
            self.price_precision,
            self.qty_precision,
            self.price_tick
        )
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OrderType {
    Market,
    Limit,
    /// Stop order. `Order::price` is the trigger price; venue adapters submit
    /// these reduce-only.
    Trigger,
}

/// Portable order flags. Venue adapters translate these to wire parameters.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderExtras {
    #[serde(default)]
    pub reduce_only: bool,
}

impl OrderExtras {
    #[must_use]
    pub const fn reduce_only() -> Self {
        Self { reduce_only: true }
    }
}

/// An order intent. Identity (order id) is assigned by the venue; two intents
/// compare equal when every field matches.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Order {
    pub pair: String,
    pub order_type: OrderType,
    pub side: Side,
    pub qty: Decimal,
    pub price: Decimal,
    #[serde(default)]
    pub extras: OrderExtras,
}

impl Order {
    #[must_use]
    pub fn limit(pair: impl Into<String>, side: Side, qty: Decimal, price: Decimal) -> Self {
        Self {
            pair: pair.into(),
            order_type: OrderType::Limit,
            side,
            qty,
            price,
            extras: OrderExtras::default(),
        }
    }

    #[must_use]
    pub fn trigger(pair: impl Into<String>, side: Side, qty: Decimal, price: Decimal) -> Self {
        Self {
            pair: pair.into(),
            order_type: OrderType::Trigger,
            side,
            qty,
            price,
            extras: OrderExtras::default(),
        }
    }

    #[must_use]
    pub fn with_extras(mut self, extras: OrderExtras) -> Self {
        self.extras = extras;
        self
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Candle {
    pub timestamp: DateTime<Utc>,
    pub open: Decimal,
    pub high: Decimal,
    pub low: Decimal,
    pub close: Decimal,
    pub volume: Decimal,
}

/// Top of book: best ask and best bid.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderBookTicker {
    pub ask0: Decimal,
    pub bid0: Decimal,
}

impl OrderBookTicker {
    /// Best price for a directional taker: the ask for longs, the bid for
    /// shorts. `None` when there is no direction.
    #[must_use]
    pub const fn best(&self, side: Side) -> Option<Decimal> {
        match side.book_index() {
            Some(0) => Some(self.ask0),
            Some(_) => Some(self.bid0),
            None => None,
        }
    }
}

/// Net position snapshot as reported by the venue. `qty` is unsigned; the
/// direction lives in `side`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Position {
    pub qty: Decimal,
    pub side: Side,
    pub avg_price: Decimal,
    pub liq_price: Decimal,
    pub unrealized_pnl: Decimal,
}

impl Position {
    #[must_use]
    pub const fn flat() -> Self {
        Self {
            qty: Decimal::ZERO,
            side: Side::Flat,
            avg_price: Decimal::ZERO,
            liq_price: Decimal::ZERO,
            unrealized_pnl: Decimal::ZERO,
        }
    }

    #[must_use]
    pub fn is_flat(&self) -> bool {
        self.qty.is_zero()
    }

    #[must_use]
    pub fn signed_qty(&self) -> Decimal {
        self.side.factor() * self.qty
    }
}

impl Default for Position {
    fn default() -> Self {
        Self::flat()
    }
}

/// Position projection pushed to the control plane, camelCase on the wire.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PositionRecord {
    pub side: Side,
    pub qty: Decimal,
    pub avg_price: Decimal,
    pub liq_price: Decimal,
    pub unrealized_pnl: Decimal,
}

impl From<&Position> for PositionRecord {
    fn from(position: &Position) -> Self {
        Self {
            side: position.side,
            qty: position.qty,
            avg_price: position.avg_price,
            liq_price: position.liq_price,
            unrealized_pnl: position.unrealized_pnl,
        }
    }
}

/// Output of the indicator calculator: a direction and a volatility score.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Indicator {
    pub side: Side,
    /// Forecast dispersion relative to the last price, in percent. Never
    /// negative.
    pub rw: f64,
}

impl Indicator {
    /// Counter-trend view of the same reading.
    #[must_use]
    pub fn invert(self) -> Self {
        Self {
            side: self.side.flip(),
            rw: self.rw,
        }
    }
}

/// Verdict of the trade gate. The reason is operator-facing and surfaced
/// verbatim, pass or fail.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ShouldTradeResult {
    pub pass: bool,
    pub reason: String,
}

impl ShouldTradeResult {
    #[must_use]
    pub fn pass(reason: impl Into<String>) -> Self {
        Self {
            pass: true,
            reason: reason.into(),
        }
    }

    #[must_use]
    pub fn reject(reason: impl Into<String>) -> Self {
        Self {
            pass: false,
            reason: reason.into(),
        }
    }
}
