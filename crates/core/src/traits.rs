//! Collaborator contracts. The strategy core only ever talks to a venue and
//! a control plane through these traits; live adapters, the paper venue, and
//! test stubs all plug in here.

use crate::params::Parameters;
use crate::types::{Candle, Order, OrderBookTicker, Position, PositionRecord};
use anyhow::Result;
use async_trait::async_trait;
use futures_util::future::try_join_all;
use rust_decimal::Decimal;

/// Order placement and account/market reads against one trading venue.
///
/// Error contract: async methods fail with a [`crate::errors::VenueError`]
/// inside the `anyhow` chain on transport failure or venue-side rejection.
/// Adapters submit `Trigger` orders reduce-only, with `Order::price` as the
/// trigger price.
#[async_trait]
pub trait Venue: Send + Sync {
    async fn fetch_last_price(&self, pair: &str) -> Result<Decimal>;

    async fn fetch_order_book_ticker(&self, pair: &str) -> Result<OrderBookTicker>;

    /// Candle history for `period` (venue notation, e.g. `"5m"`), oldest
    /// first, most recent last.
    async fn fetch_candles(&self, pair: &str, period: &str) -> Result<Vec<Candle>>;

    async fn fetch_total_balance(&self, currency: &str) -> Result<Decimal>;

    /// Net position for the pair. Returns a flat position when none is open;
    /// a venue reporting several positions for one pair must reject here.
    async fn fetch_position(&self, pair: &str) -> Result<Position>;

    async fn fetch_current_orders(&self, pair: &str) -> Result<Vec<Order>>;

    async fn cancel_current_orders(&self, pair: &str) -> Result<()>;

    async fn place_order(&self, order: &Order) -> Result<()>;

    /// Places a batch concurrently, failing fast on the first error. No
    /// rollback: siblings already in flight may have landed, and the next
    /// reconciliation pass owns the cleanup.
    async fn place_orders_batch(&self, orders: &[Order]) -> Result<()> {
        try_join_all(orders.iter().map(|order| self.place_order(order))).await?;
        Ok(())
    }

    fn price_precision(&self, pair: &str) -> Result<u32>;

    fn qty_precision(&self, pair: &str) -> Result<u32>;

    fn price_tick(&self, pair: &str) -> Result<Decimal>;
}

/// Remote strategy console: serves parameters and the enabled flag, receives
/// telemetry. Wire format is adapter-defined.
#[async_trait]
pub trait ControlPlane: Send + Sync {
    async fn fetch_enabled(&self) -> Result<bool>;

    /// Full parameter snapshot; the caller replaces its previous copy
    /// wholesale.
    async fn fetch_parameters(&self) -> Result<Parameters>;

    async fn ping(&self) -> Result<()>;

    /// Operator-facing message line.
    async fn send_log(&self, text: &str) -> Result<()>;

    async fn push_balance(&self, balance: Decimal) -> Result<()>;

    /// Position snapshots, empty slice when flat.
    async fn push_positions(&self, positions: &[PositionRecord]) -> Result<()>;
}
