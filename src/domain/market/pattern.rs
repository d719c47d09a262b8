use crate::domain::market::structure::TrendDirection;
use crate::domain::market::timeframe::Timeframe;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Microstructure event classes detected by the scanner.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PatternKind {
    OrderBlock,
    FairValueGap,
    StopHunt,
    StructureShift,
}

impl fmt::Display for PatternKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PatternKind::OrderBlock => write!(f, "order_block"),
            PatternKind::FairValueGap => write!(f, "fair_value_gap"),
            PatternKind::StopHunt => write!(f, "stop_hunt"),
            PatternKind::StructureShift => write!(f, "structure_shift"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PatternStrength {
    Medium,
    Strong,
}

/// Inclusive price band covered by an event. Invariant: low < high.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PriceRange {
    pub low: Decimal,
    pub high: Decimal,
}

impl PriceRange {
    /// Builds a range, swapping the bounds if given out of order.
    pub fn new(a: Decimal, b: Decimal) -> Self {
        if a < b {
            Self { low: a, high: b }
        } else {
            Self { low: b, high: a }
        }
    }

    /// Whether a candle's [low, high] span overlaps this range.
    pub fn overlaps(&self, low: Decimal, high: Decimal) -> bool {
        low < self.high && high > self.low
    }
}

/// A discrete microstructure event on one timeframe.
///
/// `resolved` is the only mutable part: later scans flip it once price
/// re-enters the event's range (a filled gap, a mitigated block).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PatternEvent {
    pub kind: PatternKind,
    pub range: PriceRange,
    pub timeframe: Timeframe,
    pub strength: PatternStrength,
    pub direction: TrendDirection,
    pub timestamp: i64,
    /// For gaps/blocks: whether later price action has re-entered the range.
    pub resolved: bool,
    /// Confirmation by the stricter follow-through rule.
    pub confirmed: bool,
}

impl PatternEvent {
    pub fn is_strong(&self) -> bool {
        self.strength == PatternStrength::Strong
    }

    /// Active events are unresolved and still tradeable.
    pub fn is_active(&self) -> bool {
        !self.resolved
    }
}

/// All events found for one pair across its enabled timeframes.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PatternScan {
    pub events: Vec<PatternEvent>,
}

impl PatternScan {
    pub fn count(&self) -> usize {
        self.events.len()
    }

    pub fn strong(&self) -> Vec<&PatternEvent> {
        self.events.iter().filter(|e| e.is_strong()).collect()
    }
}
