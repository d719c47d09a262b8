//! Trade decision gate.
//!
//! Per-pair, per-cycle state machine over the aggregated probabilities:
//! either the directional evidence is too weak (WAIT), a risk limit is
//! breached (rejected, kept for audit), or a fully-priced signal is
//! emitted. A pair is evaluated at most once per cycle; there are no
//! retries until the next cycle delivers fresh inputs.

use crate::config::Config;
use crate::domain::market::structure::{PairStructure, VolatilityBucket};
use crate::domain::signal::{Direction, ProbabilityResult, Signal};
use chrono::Utc;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use uuid::Uuid;

/// Outcome of one gate evaluation. `Rejected` is an auditable result,
/// not an error.
#[derive(Debug, Clone, PartialEq)]
pub enum GateOutcome {
    /// Directional evidence below threshold; nothing to do this cycle.
    Wait,
    /// A direction was selected but a risk limit blocked emission.
    Rejected { reason: String },
    Emitted(Signal),
}

/// Running account risk state fed from realized outcomes. Drawdown is
/// measured against the peak of the cumulative pnl curve; daily loss
/// resets when the UTC day rolls over.
#[derive(Debug, Clone, Default)]
pub struct RiskLedger {
    cumulative_pnl: f64,
    peak_pnl: f64,
    daily_pnl: f64,
    current_day: i64,
}

impl RiskLedger {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record_pnl(&mut self, pnl: f64, timestamp: i64) {
        let day = timestamp.div_euclid(86_400_000);
        if day != self.current_day {
            self.current_day = day;
            self.daily_pnl = 0.0;
        }
        self.cumulative_pnl += pnl;
        self.daily_pnl += pnl;
        if self.cumulative_pnl > self.peak_pnl {
            self.peak_pnl = self.cumulative_pnl;
        }
    }

    /// Percent distance below the equity peak, as a positive number.
    pub fn drawdown_pct(&self) -> f64 {
        self.peak_pnl - self.cumulative_pnl
    }

    /// Today's realized loss as a positive percentage, zero when flat
    /// or profitable.
    pub fn daily_loss_pct(&self) -> f64 {
        (-self.daily_pnl).max(0.0)
    }
}

pub struct DecisionGate {
    min_confidence: f64,
    reward_risk_ratio: Decimal,
    max_drawdown_pct: f64,
    daily_loss_limit_pct: f64,
}

impl DecisionGate {
    pub fn new(config: &Config) -> Self {
        Self {
            min_confidence: config.min_confidence,
            reward_risk_ratio: Decimal::from_f64_retain(config.reward_risk_ratio)
                .unwrap_or(dec!(3)),
            max_drawdown_pct: config.max_drawdown_pct,
            daily_loss_limit_pct: config.daily_loss_limit_pct,
        }
    }

    pub fn evaluate(
        &self,
        structure: &PairStructure,
        probability: &ProbabilityResult,
        risk: &RiskLedger,
    ) -> GateOutcome {
        // no-signal -> direction-selected
        let direction = if probability.buy_probability >= self.min_confidence
            && probability.buy_probability > probability.sell_probability
        {
            Direction::Buy
        } else if probability.sell_probability >= self.min_confidence
            && probability.sell_probability > probability.buy_probability
        {
            Direction::Sell
        } else {
            return GateOutcome::Wait;
        };

        // direction-selected -> risk-rejected
        if probability.confidence < self.min_confidence {
            return GateOutcome::Rejected {
                reason: "confidence below minimum".to_string(),
            };
        }
        if risk.drawdown_pct() >= self.max_drawdown_pct {
            return GateOutcome::Rejected {
                reason: "max drawdown reached".to_string(),
            };
        }
        if risk.daily_loss_pct() >= self.daily_loss_limit_pct {
            return GateOutcome::Rejected {
                reason: "daily loss limit reached".to_string(),
            };
        }

        // direction-selected -> signal-emitted
        let entry = structure.primary.last_close;
        let stop_pct = Self::stop_pct(structure.primary.volatility);
        let (stop_loss, take_profit) = self.price_levels(entry, stop_pct, direction);

        GateOutcome::Emitted(Signal {
            id: Uuid::new_v4(),
            pair: structure.pair.clone(),
            direction,
            entry,
            stop_loss,
            take_profit,
            confidence: probability.confidence,
            adjusted_confidence: probability.confidence,
            timeframe: structure.primary.timeframe,
            reason: probability.reason.clone(),
            timestamp: Utc::now().timestamp_millis(),
        })
    }

    /// Stop distance as a fraction of entry, by volatility bucket.
    fn stop_pct(volatility: VolatilityBucket) -> Decimal {
        match volatility {
            VolatilityBucket::High => dec!(0.02),
            VolatilityBucket::Medium => dec!(0.01),
            VolatilityBucket::Low => dec!(0.005),
        }
    }

    fn price_levels(
        &self,
        entry: Decimal,
        stop_pct: Decimal,
        direction: Direction,
    ) -> (Decimal, Decimal) {
        let risk = entry * stop_pct;
        match direction {
            Direction::Buy => (entry - risk, entry + risk * self.reward_risk_ratio),
            Direction::Sell => (entry + risk, entry - risk * self.reward_risk_ratio),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::market::structure::{StructureSnapshot, TrendDirection};
    use crate::domain::market::timeframe::Timeframe;
    use rust_decimal::prelude::ToPrimitive;
    use std::collections::BTreeMap;

    fn structure(volatility: VolatilityBucket) -> PairStructure {
        let primary = StructureSnapshot {
            timeframe: Timeframe::FifteenMin,
            trend: TrendDirection::Bullish,
            trend_strength: 0.8,
            key_levels: Vec::new(),
            liquidity_zones: Vec::new(),
            bos_confirmed: true,
            choch_confirmed: false,
            rsi: Some(60.0),
            momentum: TrendDirection::Bullish,
            volatility,
            last_close: dec!(100),
            volume_increasing: true,
        };
        let mut by_timeframe = BTreeMap::new();
        by_timeframe.insert(primary.timeframe, primary.clone());
        PairStructure {
            pair: "BTC/USDT".to_string(),
            primary_trend: TrendDirection::Bullish,
            alignment_score: 1.0,
            primary,
            by_timeframe,
        }
    }

    fn probability(buy: f64, sell: f64, confidence: f64) -> ProbabilityResult {
        ProbabilityResult {
            pair: "BTC/USDT".to_string(),
            confidence,
            buy_probability: buy,
            sell_probability: sell,
            reason: "Strong market structure".to_string(),
        }
    }

    fn gate() -> DecisionGate {
        DecisionGate::new(&Config::default())
    }

    #[test]
    fn test_buy_signal_emitted() {
        let outcome = gate().evaluate(
            &structure(VolatilityBucket::Medium),
            &probability(0.88, 0.12, 0.85),
            &RiskLedger::new(),
        );
        match outcome {
            GateOutcome::Emitted(signal) => {
                assert_eq!(signal.direction, Direction::Buy);
                assert_eq!(signal.entry, dec!(100));
                assert_eq!(signal.stop_loss, dec!(99));
                assert_eq!(signal.take_profit, dec!(103));
            }
            other => panic!("expected emission, got {:?}", other),
        }
    }

    #[test]
    fn test_weak_probability_waits() {
        let outcome = gate().evaluate(
            &structure(VolatilityBucket::Medium),
            &probability(0.60, 0.40, 0.85),
            &RiskLedger::new(),
        );
        assert_eq!(outcome, GateOutcome::Wait);
    }

    #[test]
    fn test_low_confidence_rejected() {
        let outcome = gate().evaluate(
            &structure(VolatilityBucket::Medium),
            &probability(0.88, 0.12, 0.5),
            &RiskLedger::new(),
        );
        assert_eq!(
            outcome,
            GateOutcome::Rejected {
                reason: "confidence below minimum".to_string()
            }
        );
    }

    #[test]
    fn test_drawdown_breach_rejected() {
        let mut risk = RiskLedger::new();
        risk.record_pnl(6.0, 0);
        risk.record_pnl(-6.0, 0);
        assert!(risk.drawdown_pct() >= 5.0);

        let outcome = gate().evaluate(
            &structure(VolatilityBucket::Medium),
            &probability(0.88, 0.12, 0.85),
            &risk,
        );
        assert_eq!(
            outcome,
            GateOutcome::Rejected {
                reason: "max drawdown reached".to_string()
            }
        );
    }

    #[test]
    fn test_daily_loss_resets_on_day_rollover() {
        let mut risk = RiskLedger::new();
        risk.record_pnl(-3.0, 0);
        assert!(risk.daily_loss_pct() >= 2.0);

        // Next UTC day; the drawdown persists but the daily bucket resets.
        risk.record_pnl(0.0, 86_400_000);
        assert_eq!(risk.daily_loss_pct(), 0.0);
        assert!(risk.drawdown_pct() > 0.0);
    }

    #[test]
    fn test_daily_loss_breach_rejected() {
        let mut risk = RiskLedger::new();
        // Gains first so drawdown stays under its own limit.
        risk.record_pnl(2.0, 0);
        risk.record_pnl(4.0, 0);
        risk.record_pnl(-2.5, 86_400_000);
        assert!(risk.drawdown_pct() < 5.0);
        assert!(risk.daily_loss_pct() >= 2.0);

        let outcome = gate().evaluate(
            &structure(VolatilityBucket::Medium),
            &probability(0.88, 0.12, 0.85),
            &risk,
        );
        assert_eq!(
            outcome,
            GateOutcome::Rejected {
                reason: "daily loss limit reached".to_string()
            }
        );
    }

    #[test]
    fn test_sell_levels_mirror_buy() {
        let mut structure = structure(VolatilityBucket::High);
        structure.primary_trend = TrendDirection::Bearish;
        let outcome = gate().evaluate(&structure, &probability(0.12, 0.88, 0.85), &RiskLedger::new());
        match outcome {
            GateOutcome::Emitted(signal) => {
                assert_eq!(signal.direction, Direction::Sell);
                // High volatility: 2% stop above entry, target 3x below.
                assert!(signal.take_profit < signal.entry);
                assert!(signal.entry < signal.stop_loss);
                assert_eq!(signal.stop_loss, dec!(102));
                assert_eq!(signal.take_profit, dec!(94));
            }
            other => panic!("expected emission, got {:?}", other),
        }
    }

    #[test]
    fn test_reward_risk_ratio_holds() {
        for volatility in [
            VolatilityBucket::High,
            VolatilityBucket::Medium,
            VolatilityBucket::Low,
        ] {
            let outcome = gate().evaluate(
                &structure(volatility),
                &probability(0.88, 0.12, 0.85),
                &RiskLedger::new(),
            );
            let GateOutcome::Emitted(signal) = outcome else {
                panic!("expected emission");
            };
            assert!(signal.stop_loss < signal.entry);
            assert!(signal.entry < signal.take_profit);

            let risk = (signal.entry - signal.stop_loss).to_f64().unwrap();
            let reward = (signal.take_profit - signal.entry).to_f64().unwrap();
            assert!((reward / risk - 3.0).abs() < 1e-9);
        }
    }

    #[test]
    fn test_raising_threshold_only_demotes() {
        // For fixed inputs, a higher confidence floor can only move the
        // outcome from emitted toward rejected/wait, never the reverse.
        let structure = structure(VolatilityBucket::Medium);
        let probability = probability(0.88, 0.12, 0.85);
        let rank = |outcome: &GateOutcome| match outcome {
            GateOutcome::Emitted(_) => 2,
            GateOutcome::Rejected { .. } => 1,
            GateOutcome::Wait => 0,
        };

        let mut previous = 2;
        for threshold in [0.5, 0.7, 0.84, 0.86, 0.89, 0.95] {
            let mut config = Config::default();
            config.min_confidence = threshold;
            let outcome =
                DecisionGate::new(&config).evaluate(&structure, &probability, &RiskLedger::new());
            let current = rank(&outcome);
            assert!(
                current <= previous,
                "outcome improved when threshold rose to {threshold}"
            );
            previous = current;
        }
    }

    #[test]
    fn test_equal_split_waits() {
        // 0.5/0.5 never clears the directional comparison even with a
        // permissive threshold.
        let mut config = Config::default();
        config.min_confidence = 0.4;
        let gate = DecisionGate::new(&config);
        let outcome = gate.evaluate(
            &structure(VolatilityBucket::Medium),
            &probability(0.5, 0.5, 0.85),
            &RiskLedger::new(),
        );
        assert_eq!(outcome, GateOutcome::Wait);
    }
}
