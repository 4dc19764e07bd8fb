use clap::{Parser, Subcommand};
use std::sync::Arc;
use std::time::Duration;

use fibgrid_core::ConfigLoader;
use fibgrid_robot::{assemble_context, spawn_telemetry, Engine, EngineSnapshot, Robot};
use fibgrid_venue_paper::PaperVenue;
use rust_decimal::Decimal;
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;

mod local;

use local::LocalControlPlane;

/// Candles seeded at the initial price before the walk starts moving, enough
/// for the forecast indicator's minimum history.
const WARMUP_CANDLES: usize = 30;

/// Paper market drift cadence and zig-zag leg length. One tick every two
/// seconds, reversing after sixty, swings the price far enough to fill ladder
/// rungs and reach default take-profit distances within a few minutes.
const WALK_INTERVAL: Duration = Duration::from_secs(2);
const WALK_LEG_TICKS: u32 = 60;

#[derive(Parser)]
#[command(name = "fibgrid")]
#[command(about = "Fibonacci ladder trading robot", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the robot against the in-memory paper venue
    Run {
        /// Config file path
        #[arg(short, long, default_value = "config/Config.toml")]
        config: String,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    match cli.command {
        Commands::Run { config } => {
            run_robot(&config).await?;
        }
    }

    Ok(())
}

async fn run_robot(config_path: &str) -> anyhow::Result<()> {
    use anyhow::Context;

    tracing::info!("Starting paper robot with config: {}", config_path);

    let config = ConfigLoader::load_from(config_path)
        .with_context(|| format!("Failed to load config from {config_path}"))?;
    config
        .parameters
        .validate()
        .context("Invalid trading parameters")?;

    let venue = Arc::new(PaperVenue::new(&config.paper));
    venue
        .seed_candles(&vec![config.paper.initial_price; WARMUP_CANDLES])
        .await;

    let context = assemble_context(venue.as_ref(), &config.robot)?;
    let tick = context.price_tick;

    let (snapshot_tx, snapshot_rx) = watch::channel(EngineSnapshot::default());
    let (log_tx, log_rx) = mpsc::channel(64);
    let engine = Engine::new(Arc::clone(&venue), context.clone(), snapshot_tx, log_tx);

    let control = Arc::new(LocalControlPlane::new(config.parameters));
    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    let robot = Robot::new(engine, Arc::clone(&control), shutdown_rx);

    let telemetry = spawn_telemetry(Arc::clone(&control), snapshot_rx, log_rx, context);
    let walk = spawn_price_walk(Arc::clone(&venue), config.paper.initial_price, tick);

    let mut robot_handle = tokio::spawn(robot.run());

    // Wait for shutdown signal (SIGINT or SIGTERM), or for the robot to stop
    // on its own after a fatal configuration error.
    let result = tokio::select! {
        result = &mut robot_handle => result?,
        () = shutdown_signal() => {
            let _ = shutdown_tx.send(true);
            robot_handle.await?
        }
    };

    walk.abort();
    for task in telemetry {
        task.abort();
    }

    result?;
    tracing::info!("Paper robot stopped");
    Ok(())
}

async fn shutdown_signal() {
    let mut sigterm = tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
        .expect("Failed to create SIGTERM handler");

    let mut sigint = tokio::signal::unix::signal(tokio::signal::unix::SignalKind::interrupt())
        .expect("Failed to create SIGINT handler");

    tokio::select! {
        _ = sigterm.recv() => {
            tracing::info!("Received SIGTERM, initiating graceful shutdown");
        }
        _ = sigint.recv() => {
            tracing::info!("Received SIGINT (Ctrl+C), initiating graceful shutdown");
        }
    }
}

/// Drifts the paper market in a deterministic zig-zag so the dry run has
/// fills and protective-order churn to show.
fn spawn_price_walk(venue: Arc<PaperVenue>, start: Decimal, tick: Decimal) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut price = start;
        let mut falling = true;
        let mut leg = 0u32;
        loop {
            tokio::time::sleep(WALK_INTERVAL).await;
            price = if falling { price - tick } else { price + tick };
            leg += 1;
            if leg >= WALK_LEG_TICKS {
                leg = 0;
                falling = !falling;
            }
            venue.advance_price(price).await;
        }
    })
}
