//! In-memory venue for paper trading.
//!
//! Makes zero network calls: orders rest in a local book and fill only when
//! [`PaperVenue::advance_price`] moves the price across them, so runs and
//! tests are fully deterministic. One market per instance; the pair argument
//! on the trait methods is accepted as-is.
//!
//! Fill semantics follow the usual working-order rules: a long limit fills
//! at or below its price and a short limit at or above, while triggers fire
//! on the opposite comparisons. Opposite-side fills only ever reduce the
//! position; the strategy's ladders never flip a position in one order.

use anyhow::Result;
use async_trait::async_trait;
use chrono::Utc;
use fibgrid_core::config::PaperVenueConfig;
use fibgrid_core::errors::VenueError;
use fibgrid_core::side::Side;
use fibgrid_core::traits::Venue;
use fibgrid_core::types::{Candle, Order, OrderBookTicker, OrderType, Position};
use rust_decimal::Decimal;
use tokio::sync::Mutex;

/// Matches the candle fetch limit of the live adapters.
const CANDLE_WINDOW: usize = 201;

struct PaperState {
    last_price: Decimal,
    balance: Decimal,
    position: Position,
    open_orders: Vec<Order>,
    candles: Vec<Candle>,
}

impl PaperState {
    fn push_candle(&mut self, close: Decimal) {
        self.candles.push(Candle {
            timestamp: Utc::now(),
            open: close,
            high: close,
            low: close,
            close,
            volume: Decimal::ZERO,
        });
        if self.candles.len() > CANDLE_WINDOW {
            let excess = self.candles.len() - CANDLE_WINDOW;
            self.candles.drain(..excess);
        }
    }

    fn refresh_unrealized(&mut self, price: Decimal) {
        self.position.unrealized_pnl = if self.position.is_flat() {
            Decimal::ZERO
        } else {
            (price - self.position.avg_price) * self.position.qty * self.position.side.factor()
        };
    }
}

pub struct PaperVenue {
    price_precision: u32,
    qty_precision: u32,
    state: Mutex<PaperState>,
}

impl PaperVenue {
    #[must_use]
    pub fn new(config: &PaperVenueConfig) -> Self {
        Self {
            price_precision: config.price_precision,
            qty_precision: config.qty_precision,
            state: Mutex::new(PaperState {
                last_price: config.initial_price,
                balance: config.initial_balance,
                position: Position::flat(),
                open_orders: Vec::new(),
                candles: Vec::new(),
            }),
        }
    }

    /// Appends one synthetic candle per close, oldest first.
    pub async fn seed_candles(&self, closes: &[Decimal]) {
        let mut state = self.state.lock().await;
        for close in closes {
            state.push_candle(*close);
        }
    }

    /// Overwrites the working position. Scenario setup for tests that do not
    /// want to walk the price through fills first.
    pub async fn set_position(&self, position: Position) {
        let mut state = self.state.lock().await;
        state.position = position;
        let last_price = state.last_price;
        state.refresh_unrealized(last_price);
    }

    /// Overwrites the free balance.
    pub async fn set_balance(&self, balance: Decimal) {
        self.state.lock().await.balance = balance;
    }

    /// Moves the market to `price`: records a candle, fills every working
    /// order the move crosses, and refreshes unrealized P&L.
    pub async fn advance_price(&self, price: Decimal) {
        let mut state = self.state.lock().await;
        state.last_price = price;
        state.push_candle(price);

        let orders = std::mem::take(&mut state.open_orders);
        for order in orders {
            if Self::fills_at(&order, price) {
                tracing::debug!(
                    "Paper fill: {:?} {:?} {} @ {}",
                    order.order_type,
                    order.side,
                    order.qty,
                    order.price
                );
                Self::apply_fill(&mut state, &order);
            } else {
                state.open_orders.push(order);
            }
        }
        state.refresh_unrealized(price);
    }

    fn fills_at(order: &Order, price: Decimal) -> bool {
        match (order.order_type, order.side) {
            (OrderType::Limit, Side::Long) => price <= order.price,
            (OrderType::Limit, Side::Short) => price >= order.price,
            (OrderType::Trigger, Side::Long) => price >= order.price,
            (OrderType::Trigger, Side::Short) => price <= order.price,
            (OrderType::Market, _) => true,
            (_, Side::Flat) => false,
        }
    }

    fn apply_fill(state: &mut PaperState, order: &Order) {
        let fill_price = if order.order_type == OrderType::Market {
            state.last_price
        } else {
            order.price
        };

        if state.position.is_flat() || state.position.side == order.side {
            let prev_qty = state.position.qty;
            let prev_avg = state.position.avg_price;
            let new_qty = prev_qty + order.qty;
            state.position.avg_price = (prev_avg * prev_qty + fill_price * order.qty) / new_qty;
            state.position.qty = new_qty;
            state.position.side = order.side;
            state.position.liq_price = liquidation_band(order.side, state.position.avg_price);
        } else {
            let close_qty = order.qty.min(state.position.qty);
            let realized =
                (fill_price - state.position.avg_price) * close_qty * state.position.side.factor();
            state.balance += realized;
            state.position.qty -= close_qty;
            if state.position.qty.is_zero() {
                state.position = Position::flat();
            }
        }
    }
}

/// Crude paper liquidation level: half the entry price for longs, double
/// for shorts. Far enough out that ladder rungs never cross it by accident.
fn liquidation_band(side: Side, avg_price: Decimal) -> Decimal {
    match side {
        Side::Long => avg_price / Decimal::TWO,
        Side::Short => avg_price * Decimal::TWO,
        Side::Flat => Decimal::ZERO,
    }
}

#[async_trait]
impl Venue for PaperVenue {
    async fn fetch_last_price(&self, _pair: &str) -> Result<Decimal> {
        Ok(self.state.lock().await.last_price)
    }

    async fn fetch_order_book_ticker(&self, _pair: &str) -> Result<OrderBookTicker> {
        let last = self.state.lock().await.last_price;
        let tick = Decimal::new(1, self.price_precision);
        Ok(OrderBookTicker {
            ask0: last + tick,
            bid0: last - tick,
        })
    }

    async fn fetch_candles(&self, _pair: &str, _period: &str) -> Result<Vec<Candle>> {
        Ok(self.state.lock().await.candles.clone())
    }

    async fn fetch_total_balance(&self, _currency: &str) -> Result<Decimal> {
        Ok(self.state.lock().await.balance)
    }

    async fn fetch_position(&self, _pair: &str) -> Result<Position> {
        let mut state = self.state.lock().await;
        let last = state.last_price;
        state.refresh_unrealized(last);
        Ok(state.position.clone())
    }

    async fn fetch_current_orders(&self, _pair: &str) -> Result<Vec<Order>> {
        Ok(self.state.lock().await.open_orders.clone())
    }

    async fn cancel_current_orders(&self, _pair: &str) -> Result<()> {
        self.state.lock().await.open_orders.clear();
        Ok(())
    }

    async fn place_order(&self, order: &Order) -> Result<()> {
        if order.side == Side::Flat {
            return Err(VenueError::Rejected("order side must not be flat".to_string()).into());
        }
        if order.qty <= Decimal::ZERO {
            return Err(VenueError::Rejected("order quantity must be positive".to_string()).into());
        }
        if order.order_type != OrderType::Market && order.price <= Decimal::ZERO {
            return Err(VenueError::Rejected("order price must be positive".to_string()).into());
        }

        let mut state = self.state.lock().await;
        if order.order_type == OrderType::Market {
            Self::apply_fill(&mut state, order);
            let last = state.last_price;
            state.refresh_unrealized(last);
            return Ok(());
        }
        state.open_orders.push(order.clone());
        Ok(())
    }

    fn price_precision(&self, _pair: &str) -> Result<u32> {
        Ok(self.price_precision)
    }

    fn qty_precision(&self, _pair: &str) -> Result<u32> {
        Ok(self.qty_precision)
    }

    fn price_tick(&self, _pair: &str) -> Result<Decimal> {
        Ok(Decimal::new(1, self.price_precision))
    }
}
