//! Signalis - headless signal pipeline
//!
//! Runs the analysis cycle against the mock market data provider and
//! emits signals as structured logs to stdout.
//!
//! # Usage
//! ```sh
//! MIN_CONFIDENCE=0.65 cargo run
//! ```
//!
//! # Environment Variables
//! - `PAIRS` - Comma-separated pair list (default: BTC/USDT,ETH/USDT)
//! - `MIN_CONFIDENCE` - Directional probability floor (default: 0.80)
//! - `CYCLE_SECS_BASE` / `CYCLE_SECS_MAX` - Cycle cadence bounds

use anyhow::Result;
use signalis::application::pipeline::Pipeline;
use signalis::config::Config;
use signalis::infrastructure::advisory::UnavailableAdvisory;
use signalis::infrastructure::feedback::InMemoryFeedbackRepository;
use signalis::infrastructure::mock::{ChannelOutcomeFeed, MockMarketDataProvider};
use signalis::infrastructure::sink::TracingSignalSink;
use std::sync::Arc;
use tracing::{Level, info};
use tracing_subscriber::prelude::*;

#[tokio::main]
async fn main() -> Result<()> {
    // Load environment variables
    dotenvy::dotenv().ok();

    let stdout_layer = tracing_subscriber::fmt::layer().with_target(false).pretty();

    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::from_default_env().add_directive(Level::INFO.into()))
        .with(stdout_layer)
        .init();

    info!("Signalis {} starting...", env!("CARGO_PKG_VERSION"));

    let config = Config::from_env()?;
    info!(
        "Configuration loaded: pairs={:?}, timeframes={:?}, min_confidence={}",
        config.pairs, config.enabled_timeframes, config.min_confidence
    );

    // Mock provider with a mild uptrend on the first pair so demo runs
    // exercise the full gate path.
    let mut provider = MockMarketDataProvider::new(400, config.base_timeframe);
    if let Some(pair) = config.pairs.first() {
        provider = provider.with_drift(pair, 0.0005);
    }

    let (_outcome_tx, outcome_feed) = ChannelOutcomeFeed::new();
    let mut pipeline = Pipeline::new(
        config,
        Arc::new(provider),
        Some(Arc::new(UnavailableAdvisory)),
        Arc::new(TracingSignalSink),
        Arc::new(outcome_feed),
        Arc::new(InMemoryFeedbackRepository::new()),
    );

    info!("Pipeline running. Press Ctrl+C to shutdown.");

    tokio::select! {
        _ = pipeline.run() => {}
        _ = tokio::signal::ctrl_c() => {
            info!("Shutdown signal received. Exiting...");
        }
    }

    Ok(())
}
