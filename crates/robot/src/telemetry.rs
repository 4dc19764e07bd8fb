//! Background telemetry: liveness pings, operator log forwarding, balance
//! and position feedback, and a periodic status report.
//!
//! Each task is independent and read-only over engine state, which arrives
//! as [`EngineSnapshot`] values through a watch channel. Control-plane
//! failures are logged and the task keeps going; telemetry must never take
//! the trading loop down with it.

use crate::engine::EngineSnapshot;
use fibgrid_core::traits::ControlPlane;
use fibgrid_core::types::{PositionRecord, TradingContext};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;

const PING_INTERVAL: Duration = Duration::from_secs(5);
const FEEDBACK_INTERVAL: Duration = Duration::from_secs(5);
const REPORT_INTERVAL: Duration = Duration::from_secs(30);

/// Spawns the four telemetry tasks. The log forwarder ends when the engine
/// side of the channel closes; the periodic tasks run until aborted.
pub fn spawn_telemetry<C>(
    control: Arc<C>,
    snapshot_rx: watch::Receiver<EngineSnapshot>,
    log_rx: mpsc::Receiver<String>,
    context: TradingContext,
) -> Vec<JoinHandle<()>>
where
    C: ControlPlane + 'static,
{
    vec![
        tokio::spawn(ping_task(Arc::clone(&control))),
        tokio::spawn(log_task(Arc::clone(&control), log_rx)),
        tokio::spawn(feedback_task(Arc::clone(&control), snapshot_rx.clone())),
        tokio::spawn(report_task(control, snapshot_rx, context)),
    ]
}

async fn ping_task<C: ControlPlane>(control: Arc<C>) {
    loop {
        tokio::time::sleep(PING_INTERVAL).await;
        if let Err(err) = control.ping().await {
            tracing::error!("Control plane ping failed: {err:#}");
        }
    }
}

async fn log_task<C: ControlPlane>(control: Arc<C>, mut log_rx: mpsc::Receiver<String>) {
    while let Some(text) = log_rx.recv().await {
        if let Err(err) = control.send_log(&text).await {
            tracing::error!("Operator log delivery failed: {err:#}");
        }
    }
    tracing::debug!("Operator log channel closed, forwarder exiting");
}

async fn feedback_task<C: ControlPlane>(
    control: Arc<C>,
    snapshot_rx: watch::Receiver<EngineSnapshot>,
) {
    loop {
        tokio::time::sleep(FEEDBACK_INTERVAL).await;
        let snapshot = snapshot_rx.borrow().clone();
        if let Err(err) = control.push_balance(snapshot.balance).await {
            tracing::error!("Balance feedback failed: {err:#}");
        }
        let records = if snapshot.position.is_flat() {
            Vec::new()
        } else {
            vec![PositionRecord::from(&snapshot.position)]
        };
        if let Err(err) = control.push_positions(&records).await {
            tracing::error!("Position feedback failed: {err:#}");
        }
    }
}

async fn report_task<C: ControlPlane>(
    control: Arc<C>,
    snapshot_rx: watch::Receiver<EngineSnapshot>,
    context: TradingContext,
) {
    loop {
        tokio::time::sleep(REPORT_INTERVAL).await;
        let snapshot = snapshot_rx.borrow().clone();
        let lines = [
            format!(
                "Status <pair: {}, target_currency: {}>",
                context.pair, context.target_currency
            ),
            format!(
                "Current position: {}@{}, liquidation price: {}",
                snapshot.position.signed_qty(),
                snapshot.position.avg_price,
                snapshot.position.liq_price
            ),
            format!("Store: {:?}", snapshot.store),
        ];
        for line in lines {
            tracing::info!("{line}");
            if let Err(err) = control.send_log(&line).await {
                tracing::error!("Status report delivery failed: {err:#}");
            }
        }
    }
}
