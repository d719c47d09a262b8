//! Signal sinks.

use crate::domain::ports::SignalSink;
use crate::domain::signal::Signal;
use anyhow::Result;
use async_trait::async_trait;
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::info;

/// Emits signals as structured JSON log lines. The default sink for
/// headless runs; downstream consumers parse the payload field.
pub struct TracingSignalSink;

#[async_trait]
impl SignalSink for TracingSignalSink {
    async fn submit(&self, signal: &Signal) -> Result<()> {
        let payload = serde_json::to_string(signal)?;
        info!(
            pair = %signal.pair,
            direction = %signal.direction,
            confidence = signal.adjusted_confidence,
            %payload,
            "signal emitted"
        );
        Ok(())
    }
}

/// Collects submitted signals in memory for test assertions.
#[derive(Default)]
pub struct RecordingSignalSink {
    signals: Arc<Mutex<Vec<Signal>>>,
}

impl RecordingSignalSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn signals(&self) -> Vec<Signal> {
        self.signals.lock().await.clone()
    }

    pub fn handle(&self) -> Arc<Mutex<Vec<Signal>>> {
        self.signals.clone()
    }
}

#[async_trait]
impl SignalSink for RecordingSignalSink {
    async fn submit(&self, signal: &Signal) -> Result<()> {
        self.signals.lock().await.push(signal.clone());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::market::timeframe::Timeframe;
    use crate::domain::signal::Direction;
    use rust_decimal_macros::dec;
    use uuid::Uuid;

    fn signal() -> Signal {
        Signal {
            id: Uuid::new_v4(),
            pair: "BTC/USDT".to_string(),
            direction: Direction::Buy,
            entry: dec!(100),
            stop_loss: dec!(99),
            take_profit: dec!(103),
            confidence: 0.85,
            adjusted_confidence: 0.87,
            timeframe: Timeframe::FifteenMin,
            reason: "Strong market structure".to_string(),
            timestamp: 0,
        }
    }

    #[test]
    fn test_tracing_sink_accepts_any_signal() {
        tokio_test::block_on(async {
            TracingSignalSink.submit(&signal()).await.unwrap();
        });
    }

    #[test]
    fn test_recording_sink_captures_submissions() {
        tokio_test::block_on(async {
            let sink = RecordingSignalSink::new();
            sink.submit(&signal()).await.unwrap();
            sink.submit(&signal()).await.unwrap();
            assert_eq!(sink.signals().await.len(), 2);
        });
    }
}
