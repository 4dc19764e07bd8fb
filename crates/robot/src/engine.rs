//! One trading cycle against a venue: account sync, store recompute,
//! protective order reconciliation, indicator, trade gate, ladder placement.
//!
//! The engine never sleeps and never loops; [`crate::robot::Robot`] owns
//! pacing and error recovery. Telemetry reads engine state through the
//! [`EngineSnapshot`] watch channel, published exactly once per cycle after
//! the store recompute, so observers always see balance, position, and store
//! from the same instant.

use crate::reconciler::{self, ReconcileAction};
use anyhow::{bail, Result};
use fibgrid_core::params::Parameters;
use fibgrid_core::traits::Venue;
use fibgrid_core::types::{Position, TradingContext};
use fibgrid_strategy::{adding_ladder, compute_indicator, opening_ladder, should_trade, Store};
use rust_decimal::Decimal;
use std::sync::Arc;
use tokio::sync::{mpsc, watch};

/// Coherent view of engine state for telemetry tasks.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct EngineSnapshot {
    pub balance: Decimal,
    pub position: Position,
    pub store: Store,
    pub last_price: Decimal,
}

/// How a cycle ended, for the caller's pacing decision.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CycleOutcome {
    /// A ladder was handed to the venue; rest while it fills.
    Placed { orders: usize },
    /// The trade gate vetoed the cycle.
    Rejected { reason: String },
}

pub struct Engine<V>
where
    V: Venue,
{
    venue: Arc<V>,
    context: TradingContext,
    params: Parameters,
    balance: Decimal,
    position: Position,
    store: Store,
    snapshot_tx: watch::Sender<EngineSnapshot>,
    op_log_tx: mpsc::Sender<String>,
}

impl<V> Engine<V>
where
    V: Venue,
{
    pub fn new(
        venue: Arc<V>,
        context: TradingContext,
        snapshot_tx: watch::Sender<EngineSnapshot>,
        op_log_tx: mpsc::Sender<String>,
    ) -> Self {
        Self {
            venue,
            context,
            params: Parameters::default(),
            balance: Decimal::ZERO,
            position: Position::flat(),
            store: Store::default(),
            snapshot_tx,
            op_log_tx,
        }
    }

    #[must_use]
    pub fn context(&self) -> &TradingContext {
        &self.context
    }

    #[must_use]
    pub fn parameters(&self) -> &Parameters {
        &self.params
    }

    /// Replaces the parameter snapshot wholesale; no merging.
    pub fn set_parameters(&mut self, params: Parameters) {
        self.params = params;
    }

    /// Queues an operator-facing line. Non-blocking; lines are dropped when
    /// the forwarder falls behind rather than stalling the trading cycle.
    pub fn operator(&self, text: impl Into<String>) {
        if let Err(err) = self.op_log_tx.try_send(text.into()) {
            tracing::debug!("Operator log line dropped: {err}");
        }
    }

    /// Refreshes balance and position concurrently from the venue.
    pub async fn sync_account(&mut self) -> Result<()> {
        let (balance, position) = tokio::try_join!(
            self.venue.fetch_total_balance(&self.context.target_currency),
            self.venue.fetch_position(&self.context.pair),
        )?;
        self.balance = balance;
        self.position = position;
        Ok(())
    }

    /// Brings working orders back in line with the held position, per
    /// [`reconciler::plan`].
    pub async fn reconcile(&self) -> Result<()> {
        let live = self
            .venue
            .fetch_current_orders(&self.context.pair)
            .await?;
        let action = reconciler::plan(&self.context, &self.params, &self.position, &live);
        match action {
            ReconcileAction::Keep => {}
            ReconcileAction::CancelAll => {
                tracing::info!("Cancelling {} stray orders with no position behind them", live.len());
                self.venue.cancel_current_orders(&self.context.pair).await?;
            }
            ReconcileAction::Place(pair) => {
                tracing::info!("Placing missing take profit and stop loss orders");
                self.operator("Placing missing take profit and stop loss orders");
                self.venue
                    .place_orders_batch(&pair.into_orders())
                    .await?;
            }
            ReconcileAction::Reset(pair) => {
                tracing::warn!("Unexpected working order count ({}), resetting protection", live.len());
                self.venue.cancel_current_orders(&self.context.pair).await?;
                self.venue
                    .place_orders_batch(&pair.into_orders())
                    .await?;
            }
            ReconcileAction::Replace { pair, diff } => {
                if !diff.take_profit_matched {
                    tracing::warn!("Unmatched take profit order");
                    self.operator("Unmatched take profit order");
                }
                if !diff.stop_loss_matched {
                    tracing::warn!("Unmatched stop loss order");
                    self.operator("Unmatched stop loss order");
                }
                tracing::info!("Cancel all current orders...");
                self.operator("Cancelling all current orders...");
                self.venue.cancel_current_orders(&self.context.pair).await?;
                tracing::info!("Replace take profit order and stop loss order");
                self.operator("Replacing take profit and stop loss orders...");
                self.venue
                    .place_orders_batch(&pair.into_orders())
                    .await?;
            }
        }
        Ok(())
    }

    /// Runs one full cycle. Does not rest afterwards; the caller decides
    /// pacing from the returned [`CycleOutcome`].
    pub async fn trade_once(&mut self) -> Result<CycleOutcome> {
        self.sync_account().await?;

        let last_price = self.venue.fetch_last_price(&self.context.pair).await?;
        self.store = Store::sync(self.balance, &self.params, last_price, &self.context)?;
        self.publish_snapshot(last_price);

        self.reconcile().await?;

        let candles = self
            .venue
            .fetch_candles(&self.context.pair, &self.params.candle_period)
            .await?;
        let closes: Vec<Decimal> = candles.iter().map(|candle| candle.close).collect();
        let mut indicator = compute_indicator(&closes)?;
        if !self.params.trend_following {
            indicator = indicator.invert();
        }
        let indicator_line = format!(
            "Indicator {{side: {}, rw: {:.4}}}",
            indicator.side as i8,
            indicator.rw
        );
        tracing::info!("{indicator_line}");
        self.operator(indicator_line);

        let verdict = should_trade(&indicator, &self.position, &self.store, &self.params);
        if !verdict.pass {
            tracing::info!("Could not satisfy the trading condition: {}", verdict.reason);
            self.operator(format!("Trading condition not met: {}", verdict.reason));
            return Ok(CycleOutcome::Rejected {
                reason: verdict.reason,
            });
        }

        let book = self
            .venue
            .fetch_order_book_ticker(&self.context.pair)
            .await?;
        let Some(base_price) = book.best(indicator.side) else {
            bail!("order book side requested for a flat indicator");
        };

        let orders = if self.position.is_flat() {
            tracing::info!("Preparing open position orders...");
            self.operator("Preparing open position orders...");
            opening_ladder(
                &self.context,
                &self.store,
                &self.params,
                indicator.side,
                base_price,
            )
        } else {
            tracing::info!("Preparing add position orders...");
            self.operator("Preparing add position orders...");
            adding_ladder(
                &self.context,
                &self.store,
                &self.params,
                &self.position,
                indicator.side,
                base_price,
            )?
        };

        self.venue.cancel_current_orders(&self.context.pair).await?;
        self.venue.place_orders_batch(&orders).await?;
        tracing::info!("Placed {} orders, waiting for fills...", orders.len());
        self.operator("Orders placed, waiting for fills...");

        Ok(CycleOutcome::Placed {
            orders: orders.len(),
        })
    }

    fn publish_snapshot(&self, last_price: Decimal) {
        let _ = self.snapshot_tx.send(EngineSnapshot {
            balance: self.balance,
            position: self.position.clone(),
            store: self.store,
            last_price,
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use chrono::{TimeZone, Utc};
    use fibgrid_core::side::Side;
    use fibgrid_core::types::{Candle, MarketType, Order, OrderBookTicker, OrderType};
    use rust_decimal_macros::dec;
    use std::sync::Mutex;

    struct StubVenue {
        balance: Decimal,
        position: Position,
        last_price: Decimal,
        candles: Vec<Candle>,
        book: OrderBookTicker,
        live_orders: Mutex<Vec<Order>>,
        placed: Mutex<Vec<Order>>,
        cancels: Mutex<u32>,
    }

    impl StubVenue {
        fn flat_book() -> Self {
            Self {
                balance: dec!(10000),
                position: Position::flat(),
                last_price: dec!(350),
                candles: rising_candles(),
                book: OrderBookTicker {
                    ask0: dec!(350),
                    bid0: dec!(349.99),
                },
                live_orders: Mutex::new(Vec::new()),
                placed: Mutex::new(Vec::new()),
                cancels: Mutex::new(0),
            }
        }

        fn with_position(position: Position) -> Self {
            Self {
                position,
                ..Self::flat_book()
            }
        }

        fn placed_orders(&self) -> Vec<Order> {
            self.placed.lock().unwrap().clone()
        }

        fn cancel_count(&self) -> u32 {
            *self.cancels.lock().unwrap()
        }
    }

    #[async_trait]
    impl Venue for StubVenue {
        async fn fetch_last_price(&self, _pair: &str) -> Result<Decimal> {
            Ok(self.last_price)
        }

        async fn fetch_order_book_ticker(&self, _pair: &str) -> Result<OrderBookTicker> {
            Ok(self.book.clone())
        }

        async fn fetch_candles(&self, _pair: &str, _period: &str) -> Result<Vec<Candle>> {
            Ok(self.candles.clone())
        }

        async fn fetch_total_balance(&self, _currency: &str) -> Result<Decimal> {
            Ok(self.balance)
        }

        async fn fetch_position(&self, _pair: &str) -> Result<Position> {
            Ok(self.position.clone())
        }

        async fn fetch_current_orders(&self, _pair: &str) -> Result<Vec<Order>> {
            Ok(self.live_orders.lock().unwrap().clone())
        }

        async fn cancel_current_orders(&self, _pair: &str) -> Result<()> {
            *self.cancels.lock().unwrap() += 1;
            self.live_orders.lock().unwrap().clear();
            Ok(())
        }

        async fn place_order(&self, order: &Order) -> Result<()> {
            self.placed.lock().unwrap().push(order.clone());
            Ok(())
        }

        fn price_precision(&self, _pair: &str) -> Result<u32> {
            Ok(2)
        }

        fn qty_precision(&self, _pair: &str) -> Result<u32> {
            Ok(3)
        }

        fn price_tick(&self, _pair: &str) -> Result<Decimal> {
            Ok(dec!(0.01))
        }
    }

    fn context() -> TradingContext {
        TradingContext {
            pair: "ETHUSDT".to_string(),
            target_currency: "USDT".to_string(),
            market_type: MarketType::LinearPerpetual,
            price_precision: 2,
            price_tick: dec!(0.01),
            qty_precision: 3,
        }
    }

    /// Gently but strictly rising closes: unanimous long forecasts with a
    /// volatility reading far below the default ceiling.
    fn rising_candles() -> Vec<Candle> {
        let closes: Vec<Decimal> = (0..28).map(|i| dec!(350) + Decimal::new(i, 2)).collect();
        candle_series(&closes)
    }

    fn candle_series(closes: &[Decimal]) -> Vec<Candle> {
        let start = Utc.with_ymd_and_hms(2021, 1, 1, 0, 0, 0).unwrap();
        closes
            .iter()
            .enumerate()
            .map(|(i, close)| Candle {
                timestamp: start + chrono::Duration::minutes(5 * i as i64),
                open: *close,
                high: *close,
                low: *close,
                close: *close,
                volume: Decimal::ONE,
            })
            .collect()
    }

    fn engine_for(
        venue: Arc<StubVenue>,
        params: Parameters,
    ) -> (
        Engine<StubVenue>,
        watch::Receiver<EngineSnapshot>,
        mpsc::Receiver<String>,
    ) {
        let (snapshot_tx, snapshot_rx) = watch::channel(EngineSnapshot::default());
        let (log_tx, log_rx) = mpsc::channel(64);
        let mut engine = Engine::new(venue, context(), snapshot_tx, log_tx);
        engine.set_parameters(params);
        (engine, snapshot_rx, log_rx)
    }

    fn drain(rx: &mut mpsc::Receiver<String>) -> Vec<String> {
        let mut lines = Vec::new();
        while let Ok(line) = rx.try_recv() {
            lines.push(line);
        }
        lines
    }

    #[tokio::test]
    async fn trade_once_opens_ladder_when_flat() {
        let venue = Arc::new(StubVenue::flat_book());
        let params = Parameters {
            long_addition_distance: dec!(0.05),
            ..Parameters::default()
        };
        let (mut engine, snapshot_rx, mut log_rx) = engine_for(venue.clone(), params);

        let outcome = engine.trade_once().await.unwrap();
        assert_eq!(outcome, CycleOutcome::Placed { orders: 4 });

        // One cancel right before placement; the reconciler had nothing to do.
        assert_eq!(venue.cancel_count(), 1);

        let mut prices: Vec<Decimal> = venue.placed_orders().iter().map(|o| o.price).collect();
        prices.sort();
        assert_eq!(
            prices,
            vec![dec!(349.95), dec!(349.95), dec!(349.98), dec!(349.99)]
        );
        for order in venue.placed_orders() {
            assert_eq!(order.order_type, OrderType::Limit);
            assert_eq!(order.side, Side::Long);
            assert_eq!(order.qty, dec!(0.857));
        }

        let snapshot = snapshot_rx.borrow().clone();
        assert_eq!(snapshot.balance, dec!(10000));
        assert_eq!(snapshot.store.open_pos_qty, dec!(0.857));
        assert_eq!(snapshot.last_price, dec!(350));

        let lines = drain(&mut log_rx);
        assert!(lines.iter().any(|l| l == "Preparing open position orders..."));
    }

    #[tokio::test]
    async fn trade_once_rejects_high_volatility() {
        let venue = Arc::new(StubVenue::flat_book());
        let params = Parameters {
            max_rw: 0.0,
            ..Parameters::default()
        };
        let (mut engine, _snapshot_rx, mut log_rx) = engine_for(venue.clone(), params);

        let outcome = engine.trade_once().await.unwrap();
        let CycleOutcome::Rejected { reason } = outcome else {
            panic!("expected rejection, got {outcome:?}");
        };
        assert!(reason.contains("exceeds maxRw"));
        assert!(venue.placed_orders().is_empty());
        assert_eq!(venue.cancel_count(), 0);

        let lines = drain(&mut log_rx);
        assert!(lines.iter().any(|l| l.contains("Trading condition not met")));
    }

    #[tokio::test]
    async fn trade_once_adds_to_open_position() {
        let position = Position {
            qty: dec!(0.5),
            side: Side::Long,
            avg_price: dec!(359.1),
            liq_price: dec!(0),
            // Held long must be at a loss or the gate waits for take-profit.
            unrealized_pnl: dec!(-4.5),
        };
        let venue = Arc::new(StubVenue::with_position(position));
        let params = Parameters {
            long_addition_distance: dec!(0.05),
            ..Parameters::default()
        };
        let (mut engine, _snapshot_rx, _log_rx) = engine_for(venue.clone(), params);

        let outcome = engine.trade_once().await.unwrap();
        // Three rungs plus refreshed take-profit and stop-loss.
        assert_eq!(outcome, CycleOutcome::Placed { orders: 5 });

        let placed = venue.placed_orders();
        // Reconcile placed protection first (position with no working
        // orders), then the cycle replaced it along with the rungs.
        assert_eq!(placed.len(), 7);
        let cycle_orders = &placed[2..];
        let rungs: Vec<Decimal> = cycle_orders
            .iter()
            .filter(|o| o.order_type == OrderType::Limit && o.side == Side::Long)
            .map(|o| o.price)
            .collect();
        assert_eq!(rungs, vec![dec!(349.95), dec!(349.95), dec!(349.90)]);
        let tp = cycle_orders
            .iter()
            .find(|o| o.order_type == OrderType::Limit && o.side == Side::Short)
            .unwrap();
        assert_eq!(tp.price, dec!(359.6));
        let sl = cycle_orders
            .iter()
            .find(|o| o.order_type == OrderType::Trigger)
            .unwrap();
        assert_eq!(sl.price, dec!(349.1));
    }

    #[tokio::test]
    async fn reconcile_heals_missing_protection() {
        let position = Position {
            qty: dec!(1.5),
            side: Side::Short,
            avg_price: dec!(340.1),
            liq_price: dec!(999999),
            unrealized_pnl: dec!(0),
        };
        let venue = Arc::new(StubVenue::with_position(position));
        let (mut engine, _snapshot_rx, _log_rx) =
            engine_for(venue.clone(), Parameters::default());

        engine.sync_account().await.unwrap();
        engine.reconcile().await.unwrap();

        let placed = venue.placed_orders();
        assert_eq!(placed.len(), 2);
        assert_eq!(placed[0].price, dec!(339.6));
        assert_eq!(placed[0].order_type, OrderType::Limit);
        assert_eq!(placed[1].price, dec!(350.1));
        assert_eq!(placed[1].order_type, OrderType::Trigger);
        assert_eq!(venue.cancel_count(), 0);
    }

    #[tokio::test]
    async fn reconcile_replaces_drifted_stop_loss() {
        let position = Position {
            qty: dec!(1.5),
            side: Side::Short,
            avg_price: dec!(340.1),
            liq_price: dec!(999999),
            unrealized_pnl: dec!(0),
        };
        let venue = Arc::new(StubVenue::with_position(position));
        {
            let mut live = venue.live_orders.lock().unwrap();
            live.push(Order::limit("ETHUSDT", Side::Long, dec!(1.5), dec!(339.6)));
            // Stop loss drifted: stale quantity from before the last fill.
            live.push(Order::trigger("ETHUSDT", Side::Long, dec!(0.5), dec!(350.1)));
        }
        let (mut engine, _snapshot_rx, mut log_rx) =
            engine_for(venue.clone(), Parameters::default());

        engine.sync_account().await.unwrap();
        engine.reconcile().await.unwrap();

        assert_eq!(venue.cancel_count(), 1);
        let placed = venue.placed_orders();
        assert_eq!(placed.len(), 2);
        assert_eq!(placed[1].qty, dec!(1.5));

        let lines = drain(&mut log_rx);
        assert!(lines.iter().any(|l| l == "Unmatched stop loss order"));
        assert!(!lines.iter().any(|l| l == "Unmatched take profit order"));
    }
}
