use crate::domain::market::timeframe::Timeframe;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// Directional read of the market.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TrendDirection {
    Bullish,
    Bearish,
    Neutral,
}

impl fmt::Display for TrendDirection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TrendDirection::Bullish => write!(f, "bullish"),
            TrendDirection::Bearish => write!(f, "bearish"),
            TrendDirection::Neutral => write!(f, "neutral"),
        }
    }
}

/// Range-based volatility classification of the latest candle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum VolatilityBucket {
    Low,
    Medium,
    High,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum LevelKind {
    Support,
    Resistance,
}

/// A key price level (recent N-period extreme).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct KeyLevel {
    pub price: Decimal,
    pub kind: LevelKind,
}

/// A price assumed to cluster resting orders/stops (lookback extreme).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LiquidityZone {
    pub price: Decimal,
}

/// Market structure read for one (pair, timeframe). Recomputed every
/// cycle; never versioned.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StructureSnapshot {
    pub timeframe: Timeframe,
    pub trend: TrendDirection,
    /// Trend conviction in [0, 1].
    pub trend_strength: f64,
    pub key_levels: Vec<KeyLevel>,
    pub liquidity_zones: Vec<LiquidityZone>,
    pub bos_confirmed: bool,
    pub choch_confirmed: bool,
    /// Wilder RSI of the closes, period-configured (None below warmup).
    pub rsi: Option<f64>,
    pub momentum: TrendDirection,
    pub volatility: VolatilityBucket,
    /// Close of the latest candle, used as the entry reference.
    pub last_close: Decimal,
    /// Volume trend over the recent window vs the window before it.
    pub volume_increasing: bool,
}

/// Pair-level synthesis across all analyzed timeframes.
///
/// The per-timeframe reads are merged via an explicit alignment score —
/// the fraction of timeframes agreeing on the winning direction — rather
/// than field-by-field overwrites.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PairStructure {
    pub pair: String,
    /// Winning direction when alignment reaches the threshold, else neutral.
    pub primary_trend: TrendDirection,
    /// Fraction of analyzed timeframes agreeing with `primary_trend`'s
    /// winning direction, in [0, 1].
    pub alignment_score: f64,
    /// Snapshot of the configured primary timeframe (or the coarsest
    /// analyzed one when the primary lacked history).
    pub primary: StructureSnapshot,
    pub by_timeframe: BTreeMap<Timeframe, StructureSnapshot>,
}

impl PairStructure {
    /// Trend strength of the primary snapshot, zeroed when the pair-level
    /// direction is neutral so downstream thresholds stay meaningful.
    pub fn trend_strength(&self) -> f64 {
        if self.primary_trend == TrendDirection::Neutral {
            0.0
        } else {
            self.primary.trend_strength
        }
    }
}
