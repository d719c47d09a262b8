//! Trait seams to the pipeline's external collaborators.
//!
//! The core only ever talks to these contracts; exchange connectivity,
//! notification channels, and any AI advisory backend live behind them.

use crate::domain::market::timeframe::Timeframe;
use crate::domain::market::{Candle, TrendDirection};
use crate::domain::signal::{OutcomeRecord, Signal};
use anyhow::Result;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Base-resolution candle history per (pair, timeframe label).
///
/// Missing pairs or timeframes mean "skip", never an error.
pub type MarketSnapshot = HashMap<String, HashMap<Timeframe, Vec<Candle>>>;

/// Supplies raw candle data for the configured pairs.
#[async_trait]
pub trait MarketDataProvider: Send + Sync {
    /// Fetch the latest candle history for the given pairs at the base
    /// resolution. May return empty or partial data.
    async fn fetch(&self, pairs: &[String]) -> Result<MarketSnapshot>;
}

/// Structured context handed to the optional advisory capability.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AdvisoryContext {
    pub pair: String,
    pub direction_hint: TrendDirection,
    pub confidence: f64,
    pub trend_strength: f64,
    pub pattern_count: usize,
    pub rsi: Option<f64>,
}

/// Confidence delta with rationale from the advisory capability.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Advice {
    pub confidence_delta: f64,
    pub rationale: String,
}

/// Optional external advisory capability.
///
/// `None` means "unavailable"; the pipeline must behave identically with
/// or without it.
#[async_trait]
pub trait AdvisoryService: Send + Sync {
    async fn advise(&self, ctx: &AdvisoryContext) -> Result<Option<Advice>>;
}

/// Downstream consumer of finalized signals (persistence, notification).
/// Interaction is fire-and-forget.
#[async_trait]
pub trait SignalSink: Send + Sync {
    async fn submit(&self, signal: &Signal) -> Result<()>;
}

/// Periodically supplies realized outcomes for emitted signals. May
/// supply nothing for long stretches.
#[async_trait]
pub trait OutcomeFeed: Send + Sync {
    /// Drain whatever outcome tuples have accumulated since the last call.
    async fn poll(&self) -> Result<Vec<OutcomeRecord>>;
}
