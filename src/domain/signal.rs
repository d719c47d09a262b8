use crate::domain::market::timeframe::Timeframe;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

/// Trade direction of an emitted signal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Direction {
    Buy,
    Sell,
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Direction::Buy => write!(f, "BUY"),
            Direction::Sell => write!(f, "SELL"),
        }
    }
}

/// Fused evidence for one pair.
///
/// `confidence` (the weighted sub-score blend) and the trend-derived
/// `buy_probability`/`sell_probability` split are intentionally distinct
/// outputs; neither is derived from the other.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProbabilityResult {
    pub pair: String,
    pub confidence: f64,
    pub buy_probability: f64,
    pub sell_probability: f64,
    pub reason: String,
}

/// A risk-validated trade signal.
///
/// Created once by the decision gate; only `adjusted_confidence` is
/// written afterwards, by the calibrator, before the signal reaches the
/// sink.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Signal {
    pub id: Uuid,
    pub pair: String,
    pub direction: Direction,
    pub entry: Decimal,
    pub stop_loss: Decimal,
    pub take_profit: Decimal,
    pub confidence: f64,
    pub adjusted_confidence: f64,
    pub timeframe: Timeframe,
    pub reason: String,
    pub timestamp: i64,
}

/// Realized result of a signal, supplied by the outcome feedback source.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SignalOutcome {
    Success,
    Failure,
    Neutral,
}

/// One (signal, outcome, pnl) tuple from the feedback source.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OutcomeRecord {
    pub signal_id: Uuid,
    pub outcome: SignalOutcome,
    pub pnl: Decimal,
    pub timestamp: i64,
}
