//! Adaptive confidence calibration.
//!
//! Runs after the gate has emitted a signal: either an external advisory
//! service proposes a confidence delta, or a local heuristic derived
//! from structure context does. The advisory path is strictly optional;
//! a timeout, an error, or a malformed delta silently falls back to the
//! heuristic. Realized outcomes feed a win-rate nudge on the heuristic.

use crate::domain::market::structure::{PairStructure, TrendDirection};
use crate::domain::ports::{AdvisoryContext, AdvisoryService};
use crate::domain::repositories::FeedbackRepository;
use crate::domain::signal::{Direction, OutcomeRecord, Signal, SignalOutcome};
use std::collections::VecDeque;
use std::fmt;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, warn};
use uuid::Uuid;

/// Hard bounds on adjusted confidence.
const CONFIDENCE_FLOOR: f64 = 0.10;
const CONFIDENCE_CEILING: f64 = 0.95;

/// An advisory delta outside this band is treated as malformed.
const MAX_ADVISORY_DELTA: f64 = 0.25;

/// Heuristic adjustment components.
const TREND_ALIGNED_DELTA: f64 = 0.05;
const COUNTER_TREND_DELTA: f64 = -0.08;
const VOLUME_DELTA: f64 = 0.02;
const MOMENTUM_DELTA: f64 = 0.02;

/// Win-rate nudge applied on top of the heuristic.
const WIN_RATE_NUDGE: f64 = 0.03;
const WIN_RATE_MIN_OUTCOMES: usize = 10;

const ADJUSTMENT_LOG_CAPACITY: usize = 200;

/// Which path produced the adjustment.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mechanism {
    Heuristic,
    Advisory,
}

impl fmt::Display for Mechanism {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Mechanism::Heuristic => write!(f, "heuristic"),
            Mechanism::Advisory => write!(f, "advisory"),
        }
    }
}

/// One calibration, kept in a bounded rolling log for audit.
#[derive(Debug, Clone)]
pub struct AdjustmentRecord {
    pub timestamp: i64,
    pub signal_id: Uuid,
    pub original: f64,
    pub adjusted: f64,
    pub mechanism: Mechanism,
}

pub struct AdaptiveCalibrator {
    advisory: Option<Arc<dyn AdvisoryService>>,
    advisory_timeout: Duration,
    feedback: Arc<dyn FeedbackRepository>,
    adjustments: VecDeque<AdjustmentRecord>,
}

impl AdaptiveCalibrator {
    pub fn new(
        advisory: Option<Arc<dyn AdvisoryService>>,
        advisory_timeout: Duration,
        feedback: Arc<dyn FeedbackRepository>,
    ) -> Self {
        Self {
            advisory,
            advisory_timeout,
            feedback,
            adjustments: VecDeque::with_capacity(ADJUSTMENT_LOG_CAPACITY),
        }
    }

    /// Adjust the signal's confidence in place and log the adjustment.
    pub async fn calibrate(
        &mut self,
        signal: &mut Signal,
        structure: &PairStructure,
        pattern_count: usize,
    ) {
        let original = signal.confidence;
        let (adjusted, mechanism) = match self
            .advisory_delta(signal, structure, pattern_count)
            .await
        {
            Some(delta) => (original + delta, Mechanism::Advisory),
            None => (
                original + self.heuristic_delta(signal, structure).await,
                Mechanism::Heuristic,
            ),
        };

        signal.adjusted_confidence = adjusted.clamp(CONFIDENCE_FLOOR, CONFIDENCE_CEILING);

        self.push_adjustment(AdjustmentRecord {
            timestamp: signal.timestamp,
            signal_id: signal.id,
            original,
            adjusted: signal.adjusted_confidence,
            mechanism,
        });
        debug!(
            pair = %signal.pair,
            original,
            adjusted = signal.adjusted_confidence,
            mechanism = %mechanism,
            "calibrated signal confidence"
        );
    }

    /// Record a realized outcome. Repository writes are idempotent by
    /// signal id, so replays from the feed are harmless.
    pub async fn ingest_outcome(&self, outcome: OutcomeRecord) {
        if let Err(e) = self.feedback.record(outcome).await {
            warn!("failed to record outcome feedback: {e:#}");
        }
    }

    pub fn adjustments(&self) -> &VecDeque<AdjustmentRecord> {
        &self.adjustments
    }

    /// Ask the advisory service, bounded by the configured timeout.
    /// Returns None on absence, timeout, error, or a malformed delta.
    async fn advisory_delta(
        &self,
        signal: &Signal,
        structure: &PairStructure,
        pattern_count: usize,
    ) -> Option<f64> {
        let advisory = self.advisory.as_ref()?;
        let ctx = AdvisoryContext {
            pair: signal.pair.clone(),
            direction_hint: structure.primary_trend,
            confidence: signal.confidence,
            trend_strength: structure.trend_strength(),
            pattern_count,
            rsi: structure.primary.rsi,
        };

        let advice = match tokio::time::timeout(self.advisory_timeout, advisory.advise(&ctx)).await
        {
            Ok(Ok(Some(advice))) => advice,
            Ok(Ok(None)) => return None,
            Ok(Err(e)) => {
                warn!(pair = %signal.pair, "advisory call failed: {e:#}");
                return None;
            }
            Err(_) => {
                warn!(
                    pair = %signal.pair,
                    deadline_ms = self.advisory_timeout.as_millis() as u64,
                    "advisory call timed out"
                );
                return None;
            }
        };

        if !advice.confidence_delta.is_finite()
            || advice.confidence_delta.abs() > MAX_ADVISORY_DELTA
        {
            warn!(
                pair = %signal.pair,
                delta = advice.confidence_delta,
                "discarding malformed advisory delta"
            );
            return None;
        }

        debug!(pair = %signal.pair, rationale = %advice.rationale, "applying advisory delta");
        Some(advice.confidence_delta)
    }

    /// Local adjustment from structure context plus the win-rate nudge.
    async fn heuristic_delta(&self, signal: &Signal, structure: &PairStructure) -> f64 {
        let aligned = matches!(
            (signal.direction, structure.primary_trend),
            (Direction::Buy, TrendDirection::Bullish) | (Direction::Sell, TrendDirection::Bearish)
        );
        let mut delta = if aligned {
            TREND_ALIGNED_DELTA
        } else if structure.primary_trend != TrendDirection::Neutral {
            COUNTER_TREND_DELTA
        } else {
            0.0
        };

        if structure.primary.volume_increasing {
            delta += VOLUME_DELTA;
        }
        if matches!(structure.primary.rsi, Some(rsi) if rsi > 30.0 && rsi < 70.0) {
            delta += MOMENTUM_DELTA;
        }

        delta + self.win_rate_nudge().await
    }

    /// ±0.03 once at least ten decisive outcomes are on record and the
    /// win rate is clearly one-sided.
    async fn win_rate_nudge(&self) -> f64 {
        let recent = match self.feedback.recent(500).await {
            Ok(recent) => recent,
            Err(e) => {
                warn!("failed to read outcome history: {e:#}");
                return 0.0;
            }
        };

        let mut wins = 0usize;
        let mut decisive = 0usize;
        for record in &recent {
            match record.outcome {
                SignalOutcome::Success => {
                    wins += 1;
                    decisive += 1;
                }
                SignalOutcome::Failure => decisive += 1,
                SignalOutcome::Neutral => {}
            }
        }

        if decisive < WIN_RATE_MIN_OUTCOMES {
            return 0.0;
        }
        let win_rate = wins as f64 / decisive as f64;
        if win_rate >= 0.6 {
            WIN_RATE_NUDGE
        } else if win_rate <= 0.4 {
            -WIN_RATE_NUDGE
        } else {
            0.0
        }
    }

    fn push_adjustment(&mut self, record: AdjustmentRecord) {
        if self.adjustments.len() == ADJUSTMENT_LOG_CAPACITY {
            self.adjustments.pop_front();
        }
        self.adjustments.push_back(record);
    }
}
