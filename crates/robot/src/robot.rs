//! The outer robot loop: control-plane gating, wholesale parameter refresh,
//! cycle dispatch, and per-class error recovery.

use crate::engine::{CycleOutcome, Engine};
use anyhow::Result;
use fibgrid_core::config::RobotConfig;
use fibgrid_core::errors::RobotError;
use fibgrid_core::traits::{ControlPlane, Venue};
use fibgrid_core::types::TradingContext;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;

/// Fixed pause between cycles; doubles as the backoff after a venue error.
const CYCLE_INTERVAL: Duration = Duration::from_secs(10);
/// Poll interval while the control plane keeps the robot disabled.
const IDLE_INTERVAL: Duration = Duration::from_secs(10);

/// Builds the trading context from static config plus the venue's precision
/// rules for the pair.
///
/// # Errors
/// Fails when the venue does not know the pair's precision or tick.
pub fn assemble_context<V: Venue>(venue: &V, config: &RobotConfig) -> Result<TradingContext> {
    let context = TradingContext {
        pair: config.pair.clone(),
        target_currency: config.target_currency.clone(),
        market_type: config.market_type,
        price_precision: venue.price_precision(&config.pair)?,
        price_tick: venue.price_tick(&config.pair)?,
        qty_precision: venue.qty_precision(&config.pair)?,
    };
    tracing::info!("Current trading context {context}");
    Ok(context)
}

enum IterationOutcome {
    Disabled,
    Traded(CycleOutcome),
}

pub struct Robot<V, C>
where
    V: Venue,
    C: ControlPlane,
{
    engine: Engine<V>,
    control: Arc<C>,
    shutdown_rx: watch::Receiver<bool>,
}

impl<V, C> Robot<V, C>
where
    V: Venue,
    C: ControlPlane,
{
    pub fn new(engine: Engine<V>, control: Arc<C>, shutdown_rx: watch::Receiver<bool>) -> Self {
        Self {
            engine,
            control,
            shutdown_rx,
        }
    }

    /// Runs until shutdown is signalled or configuration turns out invalid.
    ///
    /// Venue and invariant errors abort the cycle, never the loop; anything
    /// unclassified triggers a protective reconciliation before the loop
    /// carries on. Shutdown always gets one final reconciliation pass so no
    /// position is left without its take-profit and stop-loss.
    ///
    /// # Errors
    /// Returns the underlying `ConfigError` when the control plane serves
    /// parameters the strategy cannot trade on.
    // Allow cognitive_complexity: one dispatch match over the error taxonomy;
    // splitting it would scatter the recovery policy across helpers.
    #[allow(clippy::cognitive_complexity)]
    pub async fn run(mut self) -> Result<()> {
        tracing::info!("Robot is ready to start");
        self.engine.operator(format!(
            "Robot starting, trading context {}",
            self.engine.context()
        ));

        loop {
            if *self.shutdown_rx.borrow() {
                break;
            }

            match self.iteration().await {
                Ok(IterationOutcome::Disabled) => {
                    if self.sleep_or_shutdown(IDLE_INTERVAL).await {
                        break;
                    }
                    continue;
                }
                Ok(IterationOutcome::Traded(CycleOutcome::Placed { orders })) => {
                    tracing::debug!("Cycle placed {orders} orders");
                    let rest = Duration::from_secs(self.engine.parameters().rest_interval_secs);
                    if self.sleep_or_shutdown(rest).await {
                        break;
                    }
                }
                Ok(IterationOutcome::Traded(CycleOutcome::Rejected { .. })) => {}
                Err(err) => match RobotError::classify(err) {
                    RobotError::Config(err) => {
                        tracing::error!("Invalid configuration, stopping robot: {err}");
                        self.engine
                            .operator(format!("Invalid configuration, stopping robot: {err}"));
                        return Err(err.into());
                    }
                    RobotError::Venue(err) => {
                        tracing::error!("Venue error, retrying next cycle: {err}");
                        self.engine
                            .operator(format!("Venue error, retrying next cycle: {err}"));
                    }
                    RobotError::Invariant(err) => {
                        tracing::error!("Invariant violated, skipping cycle: {err}");
                    }
                    RobotError::Unexpected(err) => {
                        tracing::error!(
                            "Unexpected error ({err:#}), reconciling protective orders..."
                        );
                        self.engine.operator(format!(
                            "Unexpected error ({err}), reconciling protective orders..."
                        ));
                        self.protective_reconcile().await;
                    }
                },
            }

            if self.sleep_or_shutdown(CYCLE_INTERVAL).await {
                break;
            }
        }

        tracing::info!("Stop signal received, reconciling protective orders before exit");
        self.engine
            .operator("Stopping, reconciling protective orders...");
        self.protective_reconcile().await;
        Ok(())
    }

    async fn iteration(&mut self) -> Result<IterationOutcome> {
        if !self.control.fetch_enabled().await? {
            tracing::info!("Robot is not enabled");
            self.engine.operator("Robot is not enabled, standing by...");
            return Ok(IterationOutcome::Disabled);
        }

        let params = self.control.fetch_parameters().await?;
        params.validate()?;
        self.engine.set_parameters(params);

        let outcome = self.engine.trade_once().await?;
        Ok(IterationOutcome::Traded(outcome))
    }

    /// Best-effort protection pass used on unexpected errors and at
    /// shutdown. Failures are logged, never propagated.
    async fn protective_reconcile(&mut self) {
        if let Err(err) = self.engine.sync_account().await {
            tracing::warn!("Account sync before reconciliation failed: {err:#}");
        }
        if let Err(err) = self.engine.reconcile().await {
            tracing::error!("Protective reconciliation failed: {err:#}");
        }
    }

    /// Waits out `duration`, returning true when shutdown wins the race.
    async fn sleep_or_shutdown(&mut self, duration: Duration) -> bool {
        tokio::select! {
            () = tokio::time::sleep(duration) => false,
            changed = self.shutdown_rx.changed() => {
                changed.is_err() || *self.shutdown_rx.borrow()
            }
        }
    }
}
