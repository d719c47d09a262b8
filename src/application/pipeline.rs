//! Cycle orchestration.
//!
//! One cycle: drain outcome feedback, fetch raw candles under a
//! deadline, resample per pair, fan the per-pair analysis out on a
//! `JoinSet`, then run aggregation, the gate, and calibration serially
//! over the joined results. A pair failing anywhere is logged and
//! skipped; only a cycle-level fetch failure propagates, which the run
//! loop answers with a longer sleep before the next attempt.

use crate::application::calibrator::AdaptiveCalibrator;
use crate::application::decision_gate::{DecisionGate, GateOutcome, RiskLedger};
use crate::application::pattern_scanner::{DetectorParams, PatternScanner};
use crate::application::probability::ProbabilityAggregator;
use crate::application::resampler::Resampler;
use crate::application::structure_analyzer::{StructureAnalyzer, StructureParams};
use crate::config::Config;
use crate::domain::errors::PipelineError;
use crate::domain::market::pattern::PatternScan;
use crate::domain::market::structure::PairStructure;
use crate::domain::ports::{
    AdvisoryService, MarketDataProvider, MarketSnapshot, OutcomeFeed, SignalSink,
};
use crate::domain::repositories::FeedbackRepository;
use anyhow::Result;
use rust_decimal::prelude::ToPrimitive;
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinSet;
use tracing::{debug, info, warn};

/// Counters from one cycle, for logs and test assertions.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CycleReport {
    pub pairs_analyzed: usize,
    pub pairs_skipped: usize,
    pub waited: usize,
    pub rejected: usize,
    pub emitted: usize,
}

pub struct Pipeline {
    config: Config,
    provider: Arc<dyn MarketDataProvider>,
    sink: Arc<dyn SignalSink>,
    outcome_feed: Arc<dyn OutcomeFeed>,
    resampler: Resampler,
    analyzer: Arc<StructureAnalyzer>,
    scanner: Arc<PatternScanner>,
    aggregator: ProbabilityAggregator,
    gate: DecisionGate,
    calibrator: AdaptiveCalibrator,
    risk: RiskLedger,
}

impl Pipeline {
    pub fn new(
        config: Config,
        provider: Arc<dyn MarketDataProvider>,
        advisory: Option<Arc<dyn AdvisoryService>>,
        sink: Arc<dyn SignalSink>,
        outcome_feed: Arc<dyn OutcomeFeed>,
        feedback: Arc<dyn FeedbackRepository>,
    ) -> Self {
        let structure_params = StructureParams {
            min_history: config.min_history,
            ..StructureParams::default()
        };
        let analyzer = Arc::new(StructureAnalyzer::new(
            structure_params,
            config.primary_timeframe,
        ));
        let scanner = Arc::new(PatternScanner::new(DetectorParams::default()));
        let aggregator = ProbabilityAggregator::new(config.weights);
        let gate = DecisionGate::new(&config);
        let calibrator = AdaptiveCalibrator::new(
            advisory,
            Duration::from_secs(config.advisory_timeout_secs),
            feedback,
        );
        let resampler = Resampler::new(config.base_timeframe);

        Self {
            config,
            provider,
            sink,
            outcome_feed,
            resampler,
            analyzer,
            scanner,
            aggregator,
            gate,
            calibrator,
            risk: RiskLedger::new(),
        }
    }

    /// Run cycles until the task is cancelled. The sleep between cycles
    /// doubles toward the configured max after a failed cycle and snaps
    /// back to base after a successful one.
    pub async fn run(&mut self) {
        let mut sleep_secs = self.config.cycle_secs_base;
        loop {
            match self.run_cycle().await {
                Ok(report) => {
                    info!(
                        analyzed = report.pairs_analyzed,
                        skipped = report.pairs_skipped,
                        waited = report.waited,
                        rejected = report.rejected,
                        emitted = report.emitted,
                        "cycle complete"
                    );
                    sleep_secs = self.config.cycle_secs_base;
                }
                Err(e) => {
                    warn!("cycle failed: {e:#}");
                    sleep_secs = (sleep_secs * 2).min(self.config.cycle_secs_max);
                }
            }
            tokio::time::sleep(Duration::from_secs(sleep_secs)).await;
        }
    }

    pub async fn run_cycle(&mut self) -> Result<CycleReport> {
        self.drain_outcomes().await;

        let snapshot = self.fetch().await?;
        let analyses = self.analyze(snapshot).await;

        let mut report = CycleReport::default();
        for (structure, patterns) in &analyses {
            report.pairs_analyzed += 1;
            let probability = self.aggregator.aggregate(structure, patterns);
            match self.gate.evaluate(structure, &probability, &self.risk) {
                GateOutcome::Wait => {
                    debug!(pair = %structure.pair, "no actionable direction");
                    report.waited += 1;
                }
                GateOutcome::Rejected { reason } => {
                    info!(pair = %structure.pair, %reason, "signal rejected");
                    report.rejected += 1;
                }
                GateOutcome::Emitted(mut signal) => {
                    self.calibrator
                        .calibrate(&mut signal, structure, patterns.count())
                        .await;
                    if let Err(e) = self.sink.submit(&signal).await {
                        warn!(pair = %signal.pair, "signal sink failed: {e:#}");
                    }
                    report.emitted += 1;
                }
            }
        }
        report.pairs_skipped = self.config.pairs.len() - report.pairs_analyzed;
        Ok(report)
    }

    /// Apply whatever outcome tuples have accumulated since last cycle.
    async fn drain_outcomes(&mut self) {
        let outcomes = match self.outcome_feed.poll().await {
            Ok(outcomes) => outcomes,
            Err(e) => {
                warn!("outcome feed poll failed: {e:#}");
                return;
            }
        };
        for outcome in outcomes {
            if let Some(pnl) = outcome.pnl.to_f64() {
                self.risk.record_pnl(pnl, outcome.timestamp);
            }
            self.calibrator.ingest_outcome(outcome).await;
        }
    }

    async fn fetch(&self) -> Result<MarketSnapshot, PipelineError> {
        let deadline = Duration::from_secs(self.config.fetch_timeout_secs);
        tokio::time::timeout(deadline, self.provider.fetch(&self.config.pairs))
            .await
            .map_err(|_| PipelineError::ExternalTimeout {
                what: "market data fetch".to_string(),
                deadline_ms: deadline.as_millis() as u64,
            })?
            .map_err(|e| PipelineError::AnalysisFailure {
                pair: "*".to_string(),
                reason: format!("market data fetch failed: {e:#}"),
            })
    }

    /// Resample and analyze each pair on its own task. Pairs with no
    /// data, insufficient history, or a panicked task are skipped.
    async fn analyze(&self, snapshot: MarketSnapshot) -> Vec<(PairStructure, PatternScan)> {
        let mut tasks = JoinSet::new();
        for pair in &self.config.pairs {
            let Some(base_candles) = snapshot
                .get(pair)
                .and_then(|by_tf| by_tf.get(&self.config.base_timeframe))
                .filter(|candles| !candles.is_empty())
            else {
                debug!(pair, "no base candles in snapshot, skipping pair");
                continue;
            };

            let expanded =
                self.resampler
                    .expand(pair, base_candles, &self.config.enabled_timeframes);
            let analyzer = self.analyzer.clone();
            let scanner = self.scanner.clone();
            let pair = pair.clone();
            tasks.spawn(async move {
                let structure = analyzer.analyze_pair(&pair, &expanded)?;
                let patterns = scanner.scan_pair(&pair, &expanded);
                Ok::<_, PipelineError>((structure, patterns))
            });
        }

        let mut analyses = Vec::new();
        while let Some(joined) = tasks.join_next().await {
            match joined {
                Ok(Ok(result)) => analyses.push(result),
                Ok(Err(e)) => warn!("pair skipped: {e}"),
                Err(e) => warn!("analysis task failed: {e}"),
            }
        }
        analyses
    }

    pub fn calibrator(&self) -> &AdaptiveCalibrator {
        &self.calibrator
    }
}
