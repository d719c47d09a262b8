//! Advisory service implementations.

use crate::domain::ports::{Advice, AdvisoryContext, AdvisoryService};
use anyhow::Result;
use async_trait::async_trait;

/// Always returns the same advice. Stands in for a remote advisory
/// backend in demos and tests.
pub struct StaticAdvisory {
    delta: f64,
    rationale: String,
}

impl StaticAdvisory {
    pub fn new(delta: f64, rationale: impl Into<String>) -> Self {
        Self {
            delta,
            rationale: rationale.into(),
        }
    }
}

#[async_trait]
impl AdvisoryService for StaticAdvisory {
    async fn advise(&self, _ctx: &AdvisoryContext) -> Result<Option<Advice>> {
        Ok(Some(Advice {
            confidence_delta: self.delta,
            rationale: self.rationale.clone(),
        }))
    }
}

/// Reports "unavailable" on every call.
pub struct UnavailableAdvisory;

#[async_trait]
impl AdvisoryService for UnavailableAdvisory {
    async fn advise(&self, _ctx: &AdvisoryContext) -> Result<Option<Advice>> {
        Ok(None)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::market::structure::TrendDirection;

    fn ctx() -> AdvisoryContext {
        AdvisoryContext {
            pair: "BTC/USDT".to_string(),
            direction_hint: TrendDirection::Bullish,
            confidence: 0.85,
            trend_strength: 0.8,
            pattern_count: 2,
            rsi: Some(60.0),
        }
    }

    #[tokio::test]
    async fn test_static_advisory() {
        let advisory = StaticAdvisory::new(0.05, "strong confluence");
        let advice = advisory.advise(&ctx()).await.unwrap().unwrap();
        assert_eq!(advice.confidence_delta, 0.05);
    }

    #[tokio::test]
    async fn test_unavailable_advisory() {
        assert!(UnavailableAdvisory.advise(&ctx()).await.unwrap().is_none());
    }
}
