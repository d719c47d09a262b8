//! Market structure analysis.
//!
//! Computes trend, structural breaks (BOS/CHoCH), key levels, liquidity
//! zones, momentum, and a volatility bucket per (pair, timeframe), then
//! synthesizes the timeframe reads into one pair-level view via an
//! explicit multi-timeframe alignment score.

use crate::domain::errors::PipelineError;
use crate::domain::market::candle::Candle;
use crate::domain::market::structure::{
    KeyLevel, LevelKind, LiquidityZone, PairStructure, StructureSnapshot, TrendDirection,
    VolatilityBucket,
};
use crate::domain::market::timeframe::Timeframe;
use rust_decimal::Decimal;
use rust_decimal::prelude::ToPrimitive;
use std::collections::{BTreeMap, HashMap};
use tracing::debug;

use super::indicators::{sma, wilder_rsi};

#[derive(Debug, Clone)]
pub struct StructureParams {
    /// Minimum candles per timeframe before analysis runs.
    pub min_history: usize,
    pub short_ma: usize,
    pub medium_ma: usize,
    pub long_ma: usize,
    /// BOS compares the newest extreme against the preceding window.
    pub bos_window: usize,
    /// CHoCH compares two adjacent short-term direction reads of this size.
    pub choch_window: usize,
    /// Key levels are the extreme high/low of this many recent candles.
    pub key_level_period: usize,
    pub rsi_period: usize,
    /// (high - low) / close above this is high volatility.
    pub high_vol_threshold: f64,
    /// ... and below this is low volatility.
    pub low_vol_threshold: f64,
    /// Fraction of timeframes that must agree for a pair-level direction.
    pub alignment_threshold: f64,
}

impl Default for StructureParams {
    fn default() -> Self {
        Self {
            min_history: 100,
            short_ma: 10,
            medium_ma: 50,
            long_ma: 100,
            bos_window: 10,
            choch_window: 5,
            key_level_period: 20,
            rsi_period: 14,
            high_vol_threshold: 0.05,
            low_vol_threshold: 0.01,
            alignment_threshold: 0.6,
        }
    }
}

pub struct StructureAnalyzer {
    params: StructureParams,
    primary_timeframe: Timeframe,
}

impl StructureAnalyzer {
    pub fn new(params: StructureParams, primary_timeframe: Timeframe) -> Self {
        Self {
            params,
            primary_timeframe,
        }
    }

    /// Analyze every timeframe with enough history and merge the reads.
    ///
    /// Fails with `DataUnavailable` when no timeframe clears the minimum
    /// history; the caller skips the pair for the cycle.
    pub fn analyze_pair(
        &self,
        pair: &str,
        timeframes: &HashMap<Timeframe, Vec<Candle>>,
    ) -> Result<PairStructure, PipelineError> {
        let mut by_timeframe = BTreeMap::new();
        for (&tf, candles) in timeframes {
            if candles.len() < self.params.min_history {
                debug!(
                    pair,
                    timeframe = %tf,
                    have = candles.len(),
                    need = self.params.min_history,
                    "insufficient history, skipping timeframe"
                );
                continue;
            }
            by_timeframe.insert(tf, self.analyze_timeframe(tf, candles));
        }

        if by_timeframe.is_empty() {
            return Err(PipelineError::data_unavailable(pair));
        }

        let (primary_trend, alignment_score) = self.synthesize(&by_timeframe);

        // Primary snapshot: configured primary timeframe when analyzed,
        // otherwise the coarsest timeframe that was.
        let primary = by_timeframe
            .get(&self.primary_timeframe)
            .or_else(|| by_timeframe.values().next_back())
            .cloned()
            .expect("by_timeframe verified non-empty");

        Ok(PairStructure {
            pair: pair.to_string(),
            primary_trend,
            alignment_score,
            primary,
            by_timeframe,
        })
    }

    /// Alignment-score merge of per-timeframe direction reads: the
    /// winning direction carries the pair only when enough timeframes
    /// agree; otherwise the pair-level read is neutral.
    fn synthesize(
        &self,
        by_timeframe: &BTreeMap<Timeframe, StructureSnapshot>,
    ) -> (TrendDirection, f64) {
        let total = by_timeframe.len();
        let bullish = by_timeframe
            .values()
            .filter(|s| s.trend == TrendDirection::Bullish)
            .count();
        let bearish = by_timeframe
            .values()
            .filter(|s| s.trend == TrendDirection::Bearish)
            .count();

        let (winner, count) = if bullish >= bearish {
            (TrendDirection::Bullish, bullish)
        } else {
            (TrendDirection::Bearish, bearish)
        };

        let score = count as f64 / total as f64;
        if count > 0 && score >= self.params.alignment_threshold {
            (winner, score)
        } else {
            (TrendDirection::Neutral, score)
        }
    }

    pub fn analyze_timeframe(&self, timeframe: Timeframe, candles: &[Candle]) -> StructureSnapshot {
        let closes: Vec<Decimal> = candles.iter().map(|c| c.close).collect();
        let highs: Vec<Decimal> = candles.iter().map(|c| c.high).collect();
        let lows: Vec<Decimal> = candles.iter().map(|c| c.low).collect();

        let (trend, trend_strength) = self.trend(&closes);
        let rsi = wilder_rsi(&closes, self.params.rsi_period);
        let momentum = match rsi {
            Some(value) if value > 50.0 => TrendDirection::Bullish,
            Some(_) => TrendDirection::Bearish,
            None => TrendDirection::Neutral,
        };

        let last = &candles[candles.len() - 1];

        StructureSnapshot {
            timeframe,
            trend,
            trend_strength,
            key_levels: self.key_levels(&highs, &lows),
            liquidity_zones: Self::liquidity_zones(&highs, &lows),
            bos_confirmed: self.detect_bos(&highs, &lows),
            choch_confirmed: self.detect_choch(&highs, &lows),
            rsi,
            momentum,
            volatility: self.volatility(last),
            last_close: last.close,
            volume_increasing: Self::volume_increasing(candles),
        }
    }

    /// Trend from the short/medium/long MA stack: bullish when fully
    /// ordered upward, bearish when fully reversed, else neutral.
    /// Strength is the normalized short/long spread, clamped to [0, 1].
    fn trend(&self, closes: &[Decimal]) -> (TrendDirection, f64) {
        let (Some(short), Some(medium), Some(long)) = (
            sma(closes, self.params.short_ma),
            sma(closes, self.params.medium_ma),
            sma(closes, self.params.long_ma),
        ) else {
            return (TrendDirection::Neutral, 0.0);
        };

        let direction = if short > medium && medium > long {
            TrendDirection::Bullish
        } else if short < medium && medium < long {
            TrendDirection::Bearish
        } else {
            TrendDirection::Neutral
        };

        if direction == TrendDirection::Neutral || long.is_zero() {
            return (direction, 0.0);
        }

        let spread = ((short - long).abs() / long).to_f64().unwrap_or(0.0);
        (direction, (spread * 20.0).min(1.0))
    }

    /// Break of structure: the newest extreme exceeds the preceding
    /// window's extreme in the same direction.
    fn detect_bos(&self, highs: &[Decimal], lows: &[Decimal]) -> bool {
        let w = self.params.bos_window;
        if highs.len() < w {
            return false;
        }
        let recent_high = highs[highs.len() - 1];
        let recent_low = lows[lows.len() - 1];
        let prev_highs = &highs[highs.len() - w..highs.len() - 1];
        let prev_lows = &lows[lows.len() - w..lows.len() - 1];

        let broke_up = prev_highs.iter().all(|h| recent_high > *h);
        let broke_down = prev_lows.iter().all(|l| recent_low < *l);
        broke_up || broke_down
    }

    /// Change of character: the short-term direction read flipped
    /// relative to the immediately preceding read.
    fn detect_choch(&self, highs: &[Decimal], lows: &[Decimal]) -> bool {
        let w = self.params.choch_window;
        if highs.len() < 2 * w {
            return false;
        }
        let n = highs.len();
        let recent = Self::direction_read(&highs[n - w..], &lows[n - w..]);
        let previous = Self::direction_read(&highs[n - 2 * w..n - w], &lows[n - 2 * w..n - w]);
        recent != previous && recent != TrendDirection::Neutral
    }

    /// Directional read of a window: both highs and lows rising is
    /// bullish, both falling is bearish, anything mixed is neutral.
    fn direction_read(highs: &[Decimal], lows: &[Decimal]) -> TrendDirection {
        if highs.len() < 2 {
            return TrendDirection::Neutral;
        }
        let highs_up = highs[highs.len() - 1] > highs[0];
        let lows_up = lows[lows.len() - 1] > lows[0];
        match (highs_up, lows_up) {
            (true, true) => TrendDirection::Bullish,
            (false, false) => TrendDirection::Bearish,
            _ => TrendDirection::Neutral,
        }
    }

    fn key_levels(&self, highs: &[Decimal], lows: &[Decimal]) -> Vec<KeyLevel> {
        let w = self.params.key_level_period.min(highs.len());
        if w == 0 {
            return Vec::new();
        }
        let resistance = highs[highs.len() - w..].iter().max().copied();
        let support = lows[lows.len() - w..].iter().min().copied();

        let mut levels = Vec::with_capacity(2);
        if let Some(price) = support {
            levels.push(KeyLevel {
                price,
                kind: LevelKind::Support,
            });
        }
        if let Some(price) = resistance {
            levels.push(KeyLevel {
                price,
                kind: LevelKind::Resistance,
            });
        }
        levels
    }

    /// Liquidity pools sit at the lookback extremes where resting stops
    /// cluster.
    fn liquidity_zones(highs: &[Decimal], lows: &[Decimal]) -> Vec<LiquidityZone> {
        let mut zones = Vec::with_capacity(2);
        if let Some(high) = highs.iter().max() {
            zones.push(LiquidityZone { price: *high });
        }
        if let Some(low) = lows.iter().min() {
            zones.push(LiquidityZone { price: *low });
        }
        zones
    }

    fn volatility(&self, last: &Candle) -> VolatilityBucket {
        if last.close.is_zero() {
            return VolatilityBucket::Medium;
        }
        let ratio = ((last.high - last.low) / last.close).to_f64().unwrap_or(0.0);
        if ratio > self.params.high_vol_threshold {
            VolatilityBucket::High
        } else if ratio < self.params.low_vol_threshold {
            VolatilityBucket::Low
        } else {
            VolatilityBucket::Medium
        }
    }

    /// Average volume of the latest 10 candles vs the 10 before them.
    fn volume_increasing(candles: &[Candle]) -> bool {
        if candles.len() < 20 {
            return false;
        }
        let n = candles.len();
        let recent: Decimal = candles[n - 10..].iter().map(|c| c.volume).sum();
        let previous: Decimal = candles[n - 20..n - 10].iter().map(|c| c.volume).sum();
        recent > previous
    }
}
