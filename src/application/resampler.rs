//! Timeframe resampling.
//!
//! Aggregates a base-resolution candle stream into coarser target
//! resolutions using fixed-size buckets: open of the first, max high,
//! min low, close of the last, summed volume, timestamp of the last
//! input. Trailing incomplete buckets are dropped, so an output candle
//! never depends on inputs newer than its own timestamp.

use crate::domain::market::candle::Candle;
use crate::domain::market::timeframe::Timeframe;
use anyhow::Result;
use rust_decimal::Decimal;
use std::collections::HashMap;
use tracing::debug;

pub struct Resampler {
    base: Timeframe,
}

impl Resampler {
    pub fn new(base: Timeframe) -> Self {
        Self { base }
    }

    /// Resample `base`-resolution candles into `target` candles.
    ///
    /// Empty input yields empty output. The target must be an integer
    /// multiple of the base resolution.
    pub fn resample(&self, candles: &[Candle], target: Timeframe) -> Result<Vec<Candle>> {
        let factor = target.factor_of(self.base)?;
        if factor == 1 {
            return Ok(candles.to_vec());
        }

        let mut out = Vec::with_capacity(candles.len() / factor);
        for bucket in candles.chunks_exact(factor) {
            out.push(Self::aggregate(bucket, target));
        }
        Ok(out)
    }

    /// Expand one pair's base series into every enabled timeframe.
    /// Timeframes that cannot be derived are skipped with a log line.
    pub fn expand(
        &self,
        pair: &str,
        base_candles: &[Candle],
        timeframes: &[Timeframe],
    ) -> HashMap<Timeframe, Vec<Candle>> {
        let mut expanded = HashMap::new();
        for &tf in timeframes {
            match self.resample(base_candles, tf) {
                Ok(candles) => {
                    expanded.insert(tf, candles);
                }
                Err(e) => {
                    debug!(pair, timeframe = %tf, "skipping underivable timeframe: {}", e);
                }
            }
        }
        expanded
    }

    fn aggregate(bucket: &[Candle], target: Timeframe) -> Candle {
        let first = &bucket[0];
        let last = &bucket[bucket.len() - 1];

        let mut high = first.high;
        let mut low = first.low;
        let mut volume = Decimal::ZERO;
        for candle in bucket {
            if candle.high > high {
                high = candle.high;
            }
            if candle.low < low {
                low = candle.low;
            }
            volume += candle.volume;
        }

        Candle {
            open: first.open,
            high,
            low,
            close: last.close,
            volume,
            timestamp: last.timestamp,
            timeframe: target,
        }
    }
}
