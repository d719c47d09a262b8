//! Probability aggregation.
//!
//! Fuses structure, pattern, volume, and momentum evidence into one
//! weighted confidence per pair. The directional buy/sell split is a
//! separate, deterministic function of the primary trend and is never
//! blended into the weighted confidence.

use crate::config::ScoreWeights;
use crate::domain::market::pattern::{PatternKind, PatternScan};
use crate::domain::market::structure::{PairStructure, TrendDirection};
use crate::domain::signal::ProbabilityResult;

/// Sub-score significance thresholds used for the reason string.
const STRUCTURE_SIGNIFICANT: f64 = 0.7;
const PATTERN_SIGNIFICANT: f64 = 0.7;
const VOLUME_SIGNIFICANT: f64 = 0.6;
const MOMENTUM_SIGNIFICANT: f64 = 0.6;

/// Neutral fallback when a sub-score has nothing to evaluate.
const NEUTRAL_SCORE: f64 = 0.5;

pub struct ProbabilityAggregator {
    weights: ScoreWeights,
}

impl ProbabilityAggregator {
    pub fn new(weights: ScoreWeights) -> Self {
        Self { weights }
    }

    pub fn aggregate(&self, structure: &PairStructure, patterns: &PatternScan) -> ProbabilityResult {
        let structure_score = Self::structure_score(structure);
        let pattern_score = Self::pattern_score(patterns);
        let volume_score = Self::volume_score(structure);
        let momentum_score = Self::momentum_score(structure);

        let confidence = (structure_score * self.weights.structure
            + pattern_score * self.weights.pattern
            + volume_score * self.weights.volume
            + momentum_score * self.weights.momentum)
            .clamp(0.0, 1.0);

        let (buy_probability, sell_probability) = Self::directional_split(structure.primary_trend);

        ProbabilityResult {
            pair: structure.pair.clone(),
            confidence,
            buy_probability,
            sell_probability,
            reason: Self::reason(structure_score, pattern_score, volume_score, momentum_score),
        }
    }

    /// Average of the boolean structure contributions, normalized by how
    /// many were actually evaluated. Factors without data are excluded
    /// rather than counted against the pair.
    fn structure_score(structure: &PairStructure) -> f64 {
        let primary = &structure.primary;
        let mut score = 0.0;
        let mut factors = 0u32;

        if structure.trend_strength() > 0.7 {
            score += 0.8;
            factors += 1;
        }
        if !primary.liquidity_zones.is_empty() {
            score += 0.7;
            factors += 1;
        }
        if primary.bos_confirmed {
            score += 0.9;
            factors += 1;
        }
        if primary.choch_confirmed {
            score += 0.8;
            factors += 1;
        }

        if factors == 0 {
            NEUTRAL_SCORE
        } else {
            score / factors as f64
        }
    }

    /// Per-event weights summed over the scan and divided by the event
    /// count, capped at 1.0.
    fn pattern_score(patterns: &PatternScan) -> f64 {
        if patterns.events.is_empty() {
            return NEUTRAL_SCORE;
        }

        let mut score = 0.0;
        for event in &patterns.events {
            match event.kind {
                PatternKind::OrderBlock if event.is_strong() => score += 0.8,
                PatternKind::FairValueGap if event.is_active() => score += 0.7,
                PatternKind::StructureShift if event.confirmed => score += 0.75,
                _ => {}
            }
        }

        (score / patterns.count() as f64).min(1.0)
    }

    fn volume_score(structure: &PairStructure) -> f64 {
        // Only the volume-trend factor is observable from candles; delta
        // and open interest would come from an order-flow feed.
        if structure.primary.volume_increasing {
            0.7
        } else {
            NEUTRAL_SCORE
        }
    }

    /// 0.7 when RSI sits strictly inside the (30, 70) band, 0.4 when
    /// stretched; neutral without momentum data.
    fn momentum_score(structure: &PairStructure) -> f64 {
        match structure.primary.rsi {
            Some(rsi) if rsi > 30.0 && rsi < 70.0 => 0.7,
            Some(_) => 0.4,
            None => NEUTRAL_SCORE,
        }
    }

    /// Deterministic trend-derived split, decoupled from the weighted
    /// confidence by design.
    fn directional_split(trend: TrendDirection) -> (f64, f64) {
        match trend {
            TrendDirection::Bullish => (0.7, 0.3),
            TrendDirection::Bearish => (0.3, 0.7),
            TrendDirection::Neutral => (0.5, 0.5),
        }
    }

    fn reason(structure: f64, pattern: f64, volume: f64, momentum: f64) -> String {
        let mut reasons = Vec::new();
        if structure > STRUCTURE_SIGNIFICANT {
            reasons.push("Strong market structure");
        }
        if pattern > PATTERN_SIGNIFICANT {
            reasons.push("High pattern confidence");
        }
        if volume > VOLUME_SIGNIFICANT {
            reasons.push("Supportive volume");
        }
        if momentum > MOMENTUM_SIGNIFICANT {
            reasons.push("Good momentum");
        }

        if reasons.is_empty() {
            "Mixed signals".to_string()
        } else {
            reasons.join(", ")
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::market::pattern::{PatternEvent, PatternStrength, PriceRange};
    use crate::domain::market::structure::{StructureSnapshot, VolatilityBucket};
    use crate::domain::market::timeframe::Timeframe;
    use rust_decimal_macros::dec;
    use std::collections::BTreeMap;

    fn snapshot() -> StructureSnapshot {
        StructureSnapshot {
            timeframe: Timeframe::FifteenMin,
            trend: TrendDirection::Bullish,
            trend_strength: 0.8,
            key_levels: Vec::new(),
            liquidity_zones: Vec::new(),
            bos_confirmed: false,
            choch_confirmed: false,
            rsi: Some(60.0),
            momentum: TrendDirection::Bullish,
            volatility: VolatilityBucket::Medium,
            last_close: dec!(100),
            volume_increasing: false,
        }
    }

    fn structure_with(primary: StructureSnapshot, trend: TrendDirection) -> PairStructure {
        let mut by_timeframe = BTreeMap::new();
        by_timeframe.insert(primary.timeframe, primary.clone());
        PairStructure {
            pair: "BTC/USDT".to_string(),
            primary_trend: trend,
            alignment_score: 1.0,
            primary,
            by_timeframe,
        }
    }

    fn event(kind: PatternKind, strength: PatternStrength, resolved: bool) -> PatternEvent {
        PatternEvent {
            kind,
            range: PriceRange::new(dec!(100), dec!(101)),
            timeframe: Timeframe::FifteenMin,
            strength,
            direction: TrendDirection::Bullish,
            timestamp: 0,
            resolved,
            confirmed: true,
        }
    }

    #[test]
    fn test_bullish_structure_scores_above_neutral() {
        // Strong trend, BOS confirmed, RSI 60: the structure sub-score
        // must clear the 0.5 neutral baseline.
        let mut primary = snapshot();
        primary.bos_confirmed = true;
        let structure = structure_with(primary, TrendDirection::Bullish);

        assert!(ProbabilityAggregator::structure_score(&structure) > 0.5);
        assert_eq!(ProbabilityAggregator::momentum_score(&structure), 0.7);
    }

    #[test]
    fn test_structure_score_excludes_unevaluated_factors() {
        // Only BOS fires: score is 0.9 / 1, not 0.9 / 4.
        let mut primary = snapshot();
        primary.bos_confirmed = true;
        primary.trend_strength = 0.1;
        let structure = structure_with(primary, TrendDirection::Bullish);
        assert!((ProbabilityAggregator::structure_score(&structure) - 0.9).abs() < 1e-12);
    }

    #[test]
    fn test_structure_score_defaults_neutral() {
        let mut primary = snapshot();
        primary.trend_strength = 0.1;
        let structure = structure_with(primary, TrendDirection::Bullish);
        assert_eq!(ProbabilityAggregator::structure_score(&structure), 0.5);
    }

    #[test]
    fn test_pattern_score_weighted_per_event() {
        let scan = PatternScan {
            events: vec![
                event(PatternKind::OrderBlock, PatternStrength::Strong, false),
                event(PatternKind::FairValueGap, PatternStrength::Medium, false),
            ],
        };
        // (0.8 + 0.7) / 2
        assert!((ProbabilityAggregator::pattern_score(&scan) - 0.75).abs() < 1e-12);
    }

    #[test]
    fn test_resolved_gap_contributes_nothing() {
        let scan = PatternScan {
            events: vec![event(PatternKind::FairValueGap, PatternStrength::Strong, true)],
        };
        assert_eq!(ProbabilityAggregator::pattern_score(&scan), 0.0);
    }

    #[test]
    fn test_empty_scan_is_neutral() {
        assert_eq!(
            ProbabilityAggregator::pattern_score(&PatternScan::default()),
            0.5
        );
    }

    #[test]
    fn test_momentum_band_is_strict() {
        let mut primary = snapshot();
        primary.rsi = Some(70.0);
        let structure = structure_with(primary, TrendDirection::Bullish);
        // 70 exactly is outside the strict band
        assert_eq!(ProbabilityAggregator::momentum_score(&structure), 0.4);
    }

    #[test]
    fn test_directional_split() {
        assert_eq!(
            ProbabilityAggregator::directional_split(TrendDirection::Bullish),
            (0.7, 0.3)
        );
        assert_eq!(
            ProbabilityAggregator::directional_split(TrendDirection::Bearish),
            (0.3, 0.7)
        );
        assert_eq!(
            ProbabilityAggregator::directional_split(TrendDirection::Neutral),
            (0.5, 0.5)
        );
    }

    #[test]
    fn test_confidence_bounds() {
        let aggregator = ProbabilityAggregator::new(ScoreWeights::default());
        let mut primary = snapshot();
        primary.bos_confirmed = true;
        primary.choch_confirmed = true;
        primary.volume_increasing = true;
        primary.liquidity_zones.push(
            crate::domain::market::structure::LiquidityZone { price: dec!(100) },
        );
        let structure = structure_with(primary, TrendDirection::Bullish);
        let scan = PatternScan {
            events: vec![event(PatternKind::OrderBlock, PatternStrength::Strong, false)],
        };

        let result = aggregator.aggregate(&structure, &scan);
        assert!((0.0..=1.0).contains(&result.confidence));
        assert!((0.0..=1.0).contains(&result.buy_probability));
        assert!((0.0..=1.0).contains(&result.sell_probability));
        assert_eq!(result.buy_probability, 0.7);
        assert!(result.reason.contains("Strong market structure"));
    }

    #[test]
    fn test_mixed_signals_reason() {
        let aggregator = ProbabilityAggregator::new(ScoreWeights::default());
        let mut primary = snapshot();
        primary.trend_strength = 0.1;
        primary.rsi = Some(80.0);
        let structure = structure_with(primary, TrendDirection::Neutral);

        let result = aggregator.aggregate(&structure, &PatternScan::default());
        assert_eq!(result.reason, "Mixed signals");
    }
}
