use crate::domain::market::timeframe::Timeframe;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// A single OHLCV candle. Immutable once created.
///
/// Timestamps are Unix milliseconds and refer to the close of the period
/// the candle covers.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Candle {
    pub open: Decimal,
    pub high: Decimal,
    pub low: Decimal,
    pub close: Decimal,
    pub volume: Decimal,
    pub timestamp: i64,
    pub timeframe: Timeframe,
}

impl Candle {
    /// Size of the candle body relative to its total range, in [0, 1].
    /// Zero-range candles report a full body.
    pub fn body_ratio(&self) -> Decimal {
        let range = self.high - self.low;
        if range.is_zero() {
            return Decimal::ONE;
        }
        let body = (self.close - self.open).abs();
        body / range
    }

    pub fn is_bullish(&self) -> bool {
        self.close > self.open
    }

    pub fn is_bearish(&self) -> bool {
        self.close < self.open
    }
}

/// Ordered candle history for one (pair, timeframe).
///
/// Timestamps are strictly increasing; a candle whose timestamp is not
/// newer than the current tail is dropped, so replays and overlapping
/// fetches cannot rewrite history.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TimeframeSeries {
    candles: Vec<Candle>,
}

impl TimeframeSeries {
    pub fn new() -> Self {
        Self {
            candles: Vec::new(),
        }
    }

    pub fn from_candles(candles: Vec<Candle>) -> Self {
        let mut series = Self::new();
        for candle in candles {
            series.push(candle);
        }
        series
    }

    /// Append a candle. Returns false if it was rejected as stale or
    /// a duplicate of the current tail timestamp.
    pub fn push(&mut self, candle: Candle) -> bool {
        if let Some(last) = self.candles.last()
            && candle.timestamp <= last.timestamp
        {
            return false;
        }
        self.candles.push(candle);
        true
    }

    pub fn candles(&self) -> &[Candle] {
        &self.candles
    }

    pub fn len(&self) -> usize {
        self.candles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.candles.is_empty()
    }

    pub fn last(&self) -> Option<&Candle> {
        self.candles.last()
    }
}
