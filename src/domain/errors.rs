use crate::domain::market::timeframe::Timeframe;
use thiserror::Error;

/// Failure taxonomy of the analysis pipeline.
///
/// Only `ConfigInvalid` is fatal, and only at startup. Everything else is
/// scoped to a pair or a cycle: the affected unit is logged and skipped
/// while the rest of the cycle proceeds.
#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("No usable candle data for {pair}{}", timeframe.map(|tf| format!(" on {}", tf)).unwrap_or_default())]
    DataUnavailable {
        pair: String,
        timeframe: Option<Timeframe>,
    },

    #[error("Analysis failed for {pair}: {reason}")]
    AnalysisFailure { pair: String, reason: String },

    #[error("{what} exceeded its {deadline_ms}ms deadline")]
    ExternalTimeout { what: String, deadline_ms: u64 },

    #[error("Invalid configuration: {reason}")]
    ConfigInvalid { reason: String },
}

impl PipelineError {
    pub fn data_unavailable(pair: impl Into<String>) -> Self {
        PipelineError::DataUnavailable {
            pair: pair.into(),
            timeframe: None,
        }
    }

    pub fn insufficient_history(pair: impl Into<String>, timeframe: Timeframe) -> Self {
        PipelineError::DataUnavailable {
            pair: pair.into(),
            timeframe: Some(timeframe),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_data_unavailable_formatting() {
        let err = PipelineError::data_unavailable("BTC/USDT");
        assert_eq!(err.to_string(), "No usable candle data for BTC/USDT");

        let err = PipelineError::insufficient_history("ETH/USDT", Timeframe::FifteenMin);
        assert!(err.to_string().contains("ETH/USDT"));
        assert!(err.to_string().contains("15m"));
    }

    #[test]
    fn test_timeout_formatting() {
        let err = PipelineError::ExternalTimeout {
            what: "advisory call".to_string(),
            deadline_ms: 5000,
        };
        assert!(err.to_string().contains("5000ms"));
    }
}
