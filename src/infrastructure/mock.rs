//! Mock market data for demo runs and integration tests.

use crate::domain::market::candle::Candle;
use crate::domain::market::timeframe::Timeframe;
use crate::domain::ports::{MarketDataProvider, MarketSnapshot, OutcomeFeed};
use crate::domain::signal::OutcomeRecord;
use anyhow::Result;
use async_trait::async_trait;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use rust_decimal::Decimal;
use rust_decimal::prelude::FromPrimitive;
use std::collections::HashMap;
use tokio::sync::Mutex;
use tracing::info;

/// Synthetic candle source: a seeded random walk per pair, with an
/// optional per-pair drift so tests can force a trending market.
pub struct MockMarketDataProvider {
    candle_count: usize,
    base_timeframe: Timeframe,
    drift: HashMap<String, f64>,
    rng: Mutex<StdRng>,
}

impl MockMarketDataProvider {
    pub fn new(candle_count: usize, base_timeframe: Timeframe) -> Self {
        Self::with_seed(candle_count, base_timeframe, 7)
    }

    pub fn with_seed(candle_count: usize, base_timeframe: Timeframe, seed: u64) -> Self {
        Self {
            candle_count,
            base_timeframe,
            drift: HashMap::new(),
            rng: Mutex::new(StdRng::seed_from_u64(seed)),
        }
    }

    /// Per-candle drift as a fraction of price, e.g. 0.002 for a steady
    /// uptrend.
    pub fn with_drift(mut self, pair: &str, drift: f64) -> Self {
        self.drift.insert(pair.to_string(), drift);
        self
    }

    fn base_price(pair: &str) -> f64 {
        if pair.contains("BTC") {
            96_000.0
        } else if pair.contains("ETH") {
            3_400.0
        } else {
            150.0
        }
    }

    fn walk(&self, pair: &str, rng: &mut StdRng) -> Vec<Candle> {
        let drift = self.drift.get(pair).copied().unwrap_or(0.0);
        let step_ms = self.base_timeframe.to_millis();
        let mut price = Self::base_price(pair);
        let mut candles = Vec::with_capacity(self.candle_count);

        for i in 0..self.candle_count {
            let open = price;
            let noise = rng.random_range(-0.001..=0.001);
            price *= 1.0 + drift + noise;
            let close = price;

            let wick = rng.random_range(0.0..=0.0005);
            let high = open.max(close) * (1.0 + wick);
            let low = open.min(close) * (1.0 - wick);
            let volume = rng.random_range(50.0..150.0);

            candles.push(Candle {
                open: Decimal::from_f64(open).unwrap_or_default(),
                high: Decimal::from_f64(high).unwrap_or_default(),
                low: Decimal::from_f64(low).unwrap_or_default(),
                close: Decimal::from_f64(close).unwrap_or_default(),
                volume: Decimal::from_f64(volume).unwrap_or_default(),
                timestamp: (i as i64 + 1) * step_ms,
                timeframe: self.base_timeframe,
            });
        }
        candles
    }
}

#[async_trait]
impl MarketDataProvider for MockMarketDataProvider {
    async fn fetch(&self, pairs: &[String]) -> Result<MarketSnapshot> {
        let mut rng = self.rng.lock().await;
        let mut snapshot = MarketSnapshot::new();
        for pair in pairs {
            let candles = self.walk(pair, &mut rng);
            info!(pair, candles = candles.len(), "generated mock market data");
            snapshot.insert(
                pair.clone(),
                HashMap::from([(self.base_timeframe, candles)]),
            );
        }
        Ok(snapshot)
    }
}

/// Outcome feed backed by an mpsc channel; `poll` drains whatever has
/// accumulated. Useful for tests and for wiring a paper-trade tracker.
pub struct ChannelOutcomeFeed {
    rx: Mutex<tokio::sync::mpsc::UnboundedReceiver<OutcomeRecord>>,
}

impl ChannelOutcomeFeed {
    pub fn new() -> (tokio::sync::mpsc::UnboundedSender<OutcomeRecord>, Self) {
        let (tx, rx) = tokio::sync::mpsc::unbounded_channel();
        (tx, Self { rx: Mutex::new(rx) })
    }
}

#[async_trait]
impl OutcomeFeed for ChannelOutcomeFeed {
    async fn poll(&self) -> Result<Vec<OutcomeRecord>> {
        let mut rx = self.rx.lock().await;
        let mut drained = Vec::new();
        while let Ok(record) = rx.try_recv() {
            drained.push(record);
        }
        Ok(drained)
    }
}
