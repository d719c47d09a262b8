//! Microstructure pattern scanning.
//!
//! One parameterized detector covers all four event classes (fair value
//! gaps, order blocks, stop hunts, structure shifts) so threshold
//! variants cannot drift apart across callers. Each timeframe series is
//! scanned independently; events are aggregated per pair into a flat
//! list with a strong subset.

use crate::domain::market::candle::Candle;
use crate::domain::market::pattern::{
    PatternEvent, PatternKind, PatternScan, PatternStrength, PriceRange,
};
use crate::domain::market::structure::TrendDirection;
use crate::domain::market::timeframe::Timeframe;
use rust_decimal::prelude::ToPrimitive;
use std::collections::HashMap;
use tracing::trace;

#[derive(Debug, Clone)]
pub struct DetectorParams {
    /// Minimum body/range ratio qualifying an order-block candle.
    pub body_ratio_min: f64,
    /// Body ratio at or above which an event is tagged strong.
    pub strong_body_ratio: f64,
    /// Minimum body ratio for a sweep candle's directional close.
    pub sweep_body_ratio: f64,
    /// Window a structure shift must break out of.
    pub shift_window: usize,
    /// Only the newest candles are scanned; older events are stale.
    pub lookback: usize,
}

impl Default for DetectorParams {
    fn default() -> Self {
        Self {
            body_ratio_min: 0.7,
            strong_body_ratio: 0.8,
            sweep_body_ratio: 0.5,
            shift_window: 5,
            lookback: 50,
        }
    }
}

pub struct PatternScanner {
    params: DetectorParams,
}

impl PatternScanner {
    pub fn new(params: DetectorParams) -> Self {
        Self { params }
    }

    /// Scan every enabled timeframe of one pair and flatten the events.
    pub fn scan_pair(
        &self,
        pair: &str,
        timeframes: &HashMap<Timeframe, Vec<Candle>>,
    ) -> PatternScan {
        let mut events = Vec::new();
        for (&tf, candles) in timeframes {
            let found = self.scan_timeframe(tf, candles);
            trace!(pair, timeframe = %tf, count = found.len(), "timeframe scanned");
            events.extend(found);
        }
        events.sort_by_key(|e| e.timestamp);
        PatternScan { events }
    }

    pub fn scan_timeframe(&self, timeframe: Timeframe, candles: &[Candle]) -> Vec<PatternEvent> {
        // Bound the scan to the newest candles; indices below stay
        // relative to this window.
        let start = candles.len().saturating_sub(self.params.lookback);
        let window = &candles[start..];
        if window.len() < 3 {
            return Vec::new();
        }

        let mut events = Vec::new();
        self.detect_gaps(timeframe, window, &mut events);
        self.detect_order_blocks(timeframe, window, &mut events);
        self.detect_stop_hunts(timeframe, window, &mut events);
        self.detect_structure_shifts(timeframe, window, &mut events);
        events
    }

    fn body_ratio(candle: &Candle) -> f64 {
        candle.body_ratio().to_f64().unwrap_or(0.0)
    }

    fn strength_from_body(&self, ratio: f64) -> PatternStrength {
        if ratio >= self.params.strong_body_ratio {
            PatternStrength::Strong
        } else {
            PatternStrength::Medium
        }
    }

    /// Fair value gap: candle[i] gaps entirely past candle[i-1].
    ///
    /// The event is confirmed when the following candle does not
    /// immediately trade through the whole gap, and marked resolved once
    /// any later candle's range re-enters the gap.
    fn detect_gaps(&self, timeframe: Timeframe, window: &[Candle], out: &mut Vec<PatternEvent>) {
        for i in 1..window.len() {
            let prev = &window[i - 1];
            let cur = &window[i];

            let (direction, range) = if cur.low > prev.high {
                (TrendDirection::Bullish, PriceRange::new(prev.high, cur.low))
            } else if cur.high < prev.low {
                (TrendDirection::Bearish, PriceRange::new(cur.high, prev.low))
            } else {
                continue;
            };

            let confirmed = match window.get(i + 1) {
                Some(next) => match direction {
                    // Closing the gap means trading through its far edge.
                    TrendDirection::Bullish => next.low > range.low,
                    _ => next.high < range.high,
                },
                // Fresh gap with nothing after it yet.
                None => true,
            };

            let resolved = window[i + 1..]
                .iter()
                .any(|later| range.overlaps(later.low, later.high));

            out.push(PatternEvent {
                kind: PatternKind::FairValueGap,
                range,
                timeframe,
                strength: if confirmed {
                    PatternStrength::Strong
                } else {
                    PatternStrength::Medium
                },
                direction,
                timestamp: cur.timestamp,
                resolved,
                confirmed,
            });
        }
    }

    /// Order block: a dominant-body candle whose extreme is broken by a
    /// same-direction confirming close on the next candle. The block's
    /// range is the candle's own high/low.
    fn detect_order_blocks(
        &self,
        timeframe: Timeframe,
        window: &[Candle],
        out: &mut Vec<PatternEvent>,
    ) {
        for i in 0..window.len() - 1 {
            let block = &window[i];
            let next = &window[i + 1];

            let ratio = Self::body_ratio(block);
            if ratio < self.params.body_ratio_min {
                continue;
            }

            let direction = if block.is_bullish() && next.close > block.high {
                TrendDirection::Bullish
            } else if block.is_bearish() && next.close < block.low {
                TrendDirection::Bearish
            } else {
                continue;
            };

            let range = PriceRange::new(block.low, block.high);
            let resolved = window[i + 2..]
                .iter()
                .any(|later| range.overlaps(later.low, later.high));

            out.push(PatternEvent {
                kind: PatternKind::OrderBlock,
                range,
                timeframe,
                strength: self.strength_from_body(ratio),
                direction,
                timestamp: block.timestamp,
                resolved,
                confirmed: true,
            });
        }
    }

    /// Liquidity sweep: a candle prints a new extreme beyond the prior
    /// candle, then closes back across the prior candle's opposite
    /// extreme with a dominant directional body.
    fn detect_stop_hunts(
        &self,
        timeframe: Timeframe,
        window: &[Candle],
        out: &mut Vec<PatternEvent>,
    ) {
        for i in 1..window.len() {
            let prev = &window[i - 1];
            let cur = &window[i];

            let ratio = Self::body_ratio(cur);
            if ratio < self.params.sweep_body_ratio {
                continue;
            }

            let direction = if cur.low < prev.low && cur.close > prev.high {
                // Swept the lows, closed above: bullish stop hunt.
                TrendDirection::Bullish
            } else if cur.high > prev.high && cur.close < prev.low {
                TrendDirection::Bearish
            } else {
                continue;
            };

            out.push(PatternEvent {
                kind: PatternKind::StopHunt,
                range: PriceRange::new(cur.low, cur.high),
                timeframe,
                strength: self.strength_from_body(ratio),
                direction,
                timestamp: cur.timestamp,
                resolved: false,
                confirmed: true,
            });
        }
    }

    /// Structure shift: a new local extreme beyond the shift window,
    /// immediately rejected by the next candle.
    fn detect_structure_shifts(
        &self,
        timeframe: Timeframe,
        window: &[Candle],
        out: &mut Vec<PatternEvent>,
    ) {
        let w = self.params.shift_window;
        if window.len() < w + 2 {
            return;
        }
        for i in w..window.len() - 1 {
            let cur = &window[i];
            let next = &window[i + 1];
            let lookback = &window[i - w..i];

            let max_high = lookback.iter().map(|c| c.high).max();
            let min_low = lookback.iter().map(|c| c.low).min();

            if let Some(max_high) = max_high
                && cur.high > max_high
                && next.high < cur.high
            {
                out.push(PatternEvent {
                    kind: PatternKind::StructureShift,
                    range: PriceRange::new(max_high, cur.high),
                    timeframe,
                    strength: PatternStrength::Strong,
                    direction: TrendDirection::Bearish,
                    timestamp: cur.timestamp,
                    resolved: false,
                    confirmed: true,
                });
            }

            if let Some(min_low) = min_low
                && cur.low < min_low
                && next.low > cur.low
            {
                out.push(PatternEvent {
                    kind: PatternKind::StructureShift,
                    range: PriceRange::new(cur.low, min_low),
                    timeframe,
                    strength: PatternStrength::Strong,
                    direction: TrendDirection::Bullish,
                    timestamp: cur.timestamp,
                    resolved: false,
                    confirmed: true,
                });
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::market::candle::test_support::candle;

    fn scanner() -> PatternScanner {
        PatternScanner::new(DetectorParams::default())
    }

    fn flat(n: usize) -> Vec<Candle> {
        (0..n)
            .map(|i| candle(100.0, 101.0, 99.0, 100.0, 1000.0, i as i64 * 60_000))
            .collect()
    }

    fn events_of_kind(events: &[PatternEvent], kind: PatternKind) -> Vec<&PatternEvent> {
        events.iter().filter(|e| e.kind == kind).collect()
    }

    #[test]
    fn test_bullish_fvg_unfilled() {
        // Gap between high=101 and low=104; the follow-up stays above.
        let mut candles = flat(5);
        candles.push(candle(100.0, 101.0, 99.0, 100.5, 1000.0, 5 * 60_000));
        candles.push(candle(104.0, 108.0, 104.0, 107.0, 2000.0, 6 * 60_000));
        candles.push(candle(107.0, 109.0, 105.0, 108.0, 1000.0, 7 * 60_000));

        let events = scanner().scan_timeframe(Timeframe::FifteenMin, &candles);
        let gaps = events_of_kind(&events, PatternKind::FairValueGap);
        assert_eq!(gaps.len(), 1);
        let gap = gaps[0];
        assert_eq!(gap.direction, TrendDirection::Bullish);
        assert!(!gap.resolved);
        assert!(gap.confirmed);
        assert!(gap.range.low < gap.range.high);
    }

    #[test]
    fn test_fvg_filled_by_retracement() {
        let mut candles = flat(5);
        candles.push(candle(100.0, 101.0, 99.0, 100.5, 1000.0, 5 * 60_000));
        candles.push(candle(104.0, 108.0, 104.0, 107.0, 2000.0, 6 * 60_000));
        // Retraces into the 101-104 gap
        candles.push(candle(107.0, 107.5, 102.0, 103.0, 1000.0, 7 * 60_000));

        let events = scanner().scan_timeframe(Timeframe::FifteenMin, &candles);
        let gaps = events_of_kind(&events, PatternKind::FairValueGap);
        assert_eq!(gaps.len(), 1);
        assert!(gaps[0].resolved);
    }

    #[test]
    fn test_bearish_fvg() {
        let mut candles = flat(5);
        candles.push(candle(100.0, 101.0, 98.0, 99.0, 1000.0, 5 * 60_000));
        // Gaps down entirely below the prior low of 98
        candles.push(candle(95.0, 96.0, 92.0, 93.0, 2000.0, 6 * 60_000));
        candles.push(candle(93.0, 94.0, 91.0, 92.0, 1000.0, 7 * 60_000));

        let events = scanner().scan_timeframe(Timeframe::FifteenMin, &candles);
        let gaps = events_of_kind(&events, PatternKind::FairValueGap);
        assert_eq!(gaps.len(), 1);
        assert_eq!(gaps[0].direction, TrendDirection::Bearish);
    }

    #[test]
    fn test_bullish_order_block() {
        let mut candles = flat(5);
        // Body 8 over range 10 = 0.8 ratio, bullish
        candles.push(candle(100.0, 110.0, 100.0, 108.0, 2000.0, 5 * 60_000));
        // Confirming close beyond the block's high
        candles.push(candle(108.0, 112.0, 108.0, 111.0, 1500.0, 6 * 60_000));

        let events = scanner().scan_timeframe(Timeframe::FifteenMin, &candles);
        let blocks = events_of_kind(&events, PatternKind::OrderBlock);
        assert_eq!(blocks.len(), 1);
        let block = blocks[0];
        assert_eq!(block.direction, TrendDirection::Bullish);
        assert_eq!(block.strength, PatternStrength::Strong);
        assert_eq!(block.range.low, rust_decimal_macros::dec!(100.0));
        assert_eq!(block.range.high, rust_decimal_macros::dec!(110.0));
    }

    #[test]
    fn test_order_block_requires_confirming_move() {
        let mut candles = flat(5);
        candles.push(candle(100.0, 110.0, 100.0, 108.0, 2000.0, 5 * 60_000));
        // Next candle stalls below the block high: no confirmation
        candles.push(candle(108.0, 109.5, 107.0, 109.0, 1000.0, 6 * 60_000));

        let events = scanner().scan_timeframe(Timeframe::FifteenMin, &candles);
        assert!(events_of_kind(&events, PatternKind::OrderBlock).is_empty());
    }

    #[test]
    fn test_small_body_is_not_an_order_block() {
        let mut candles = flat(5);
        // Body 2 over range 10 = 0.2 ratio
        candles.push(candle(100.0, 110.0, 100.0, 102.0, 2000.0, 5 * 60_000));
        candles.push(candle(108.0, 112.0, 108.0, 111.0, 1500.0, 6 * 60_000));

        let events = scanner().scan_timeframe(Timeframe::FifteenMin, &candles);
        assert!(events_of_kind(&events, PatternKind::OrderBlock).is_empty());
    }

    #[test]
    fn test_bullish_stop_hunt() {
        let mut candles = flat(5);
        candles.push(candle(100.0, 101.0, 99.0, 100.0, 1000.0, 5 * 60_000));
        // Sweeps below 99, closes above 101 with a dominant body
        candles.push(candle(99.5, 103.0, 98.0, 102.5, 2000.0, 6 * 60_000));

        let events = scanner().scan_timeframe(Timeframe::FifteenMin, &candles);
        let hunts = events_of_kind(&events, PatternKind::StopHunt);
        assert_eq!(hunts.len(), 1);
        assert_eq!(hunts[0].direction, TrendDirection::Bullish);
    }

    #[test]
    fn test_structure_shift_bearish() {
        let mut candles = flat(8);
        // New local high above the prior window...
        candles.push(candle(100.0, 106.0, 100.0, 105.0, 1000.0, 8 * 60_000));
        // ...rejected by the next candle
        candles.push(candle(104.0, 105.0, 100.0, 101.0, 1000.0, 9 * 60_000));

        let events = scanner().scan_timeframe(Timeframe::FifteenMin, &candles);
        let shifts = events_of_kind(&events, PatternKind::StructureShift);
        assert_eq!(shifts.len(), 1);
        assert_eq!(shifts[0].direction, TrendDirection::Bearish);
        assert!(shifts[0].is_strong());
    }

    #[test]
    fn test_flat_series_has_no_events() {
        let events = scanner().scan_timeframe(Timeframe::FifteenMin, &flat(30));
        assert!(events.is_empty());
    }

    #[test]
    fn test_scan_pair_aggregates_across_timeframes() {
        let mut with_gap = flat(5);
        with_gap.push(candle(100.0, 101.0, 99.0, 100.5, 1000.0, 5 * 60_000));
        with_gap.push(candle(104.0, 108.0, 104.0, 107.0, 2000.0, 6 * 60_000));
        with_gap.push(candle(107.0, 109.0, 105.0, 108.0, 1000.0, 7 * 60_000));

        let mut timeframes = HashMap::new();
        timeframes.insert(Timeframe::FiveMin, with_gap.clone());
        timeframes.insert(Timeframe::FifteenMin, with_gap);
        timeframes.insert(Timeframe::OneHour, flat(30));

        let scan = scanner().scan_pair("BTC/USDT", &timeframes);
        assert_eq!(scan.count(), 2);
        assert_eq!(scan.strong().len(), 2);
    }
}
