//! Moving-average and momentum primitives shared by the analyzers.

use rust_decimal::Decimal;
use rust_decimal::prelude::ToPrimitive;

/// Simple moving average over the last `period` values.
/// Returns None when there is not enough history.
pub fn sma(values: &[Decimal], period: usize) -> Option<Decimal> {
    if period == 0 || values.len() < period {
        return None;
    }
    let sum: Decimal = values[values.len() - period..].iter().sum();
    Some(sum / Decimal::from(period))
}

/// Wilder relative-strength index over closes.
///
/// Seeds the averages with a plain mean of the first `period` deltas,
/// then applies Wilder smoothing: `avg = (avg * (period-1) + delta) / period`.
/// Returns None below `period + 1` closes.
pub fn wilder_rsi(closes: &[Decimal], period: usize) -> Option<f64> {
    if period == 0 || closes.len() < period + 1 {
        return None;
    }

    let mut gains = 0.0f64;
    let mut losses = 0.0f64;
    for w in closes[..period + 1].windows(2) {
        let delta = (w[1] - w[0]).to_f64()?;
        if delta >= 0.0 {
            gains += delta;
        } else {
            losses -= delta;
        }
    }
    let mut avg_gain = gains / period as f64;
    let mut avg_loss = losses / period as f64;

    for w in closes[period..].windows(2) {
        let delta = (w[1] - w[0]).to_f64()?;
        let (gain, loss) = if delta >= 0.0 {
            (delta, 0.0)
        } else {
            (0.0, -delta)
        };
        avg_gain = (avg_gain * (period - 1) as f64 + gain) / period as f64;
        avg_loss = (avg_loss * (period - 1) as f64 + loss) / period as f64;
    }

    if avg_loss == 0.0 {
        return Some(100.0);
    }
    let rs = avg_gain / avg_loss;
    Some(100.0 - 100.0 / (1.0 + rs))
}
