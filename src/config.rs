//! Configuration for the signal pipeline.
//!
//! All options load from environment variables with sane defaults and are
//! validated once at startup; the pipeline never starts with an
//! inconsistent configuration. The resulting `Config` is immutable and
//! passed explicitly into every component at construction.

use crate::domain::errors::PipelineError;
use crate::domain::market::timeframe::Timeframe;
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::env;
use std::str::FromStr;

/// Weights for the four probability sub-scores. Must sum to 1.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct ScoreWeights {
    pub structure: f64,
    pub pattern: f64,
    pub volume: f64,
    pub momentum: f64,
}

impl Default for ScoreWeights {
    fn default() -> Self {
        Self {
            structure: 0.35,
            pattern: 0.30,
            volume: 0.20,
            momentum: 0.15,
        }
    }
}

impl ScoreWeights {
    pub fn sum(&self) -> f64 {
        self.structure + self.pattern + self.volume + self.momentum
    }
}

#[derive(Debug, Clone)]
pub struct Config {
    /// Tradable pairs to analyze each cycle.
    pub pairs: Vec<String>,
    /// Resolution of the raw candle feed.
    pub base_timeframe: Timeframe,
    /// Timeframes the analyzers run on (base included or not).
    pub enabled_timeframes: Vec<Timeframe>,
    /// Timeframe whose snapshot supplies the entry price and signal tag.
    pub primary_timeframe: Timeframe,
    /// Minimum candles per timeframe before structure analysis runs.
    pub min_history: usize,
    /// Directional probability floor for taking a trade.
    pub min_confidence: f64,
    /// Reward distance as a multiple of risk distance.
    pub reward_risk_ratio: f64,
    /// Drawdown ceiling in percent; at or above it every signal is rejected.
    pub max_drawdown_pct: f64,
    /// Daily loss ceiling in percent.
    pub daily_loss_limit_pct: f64,
    pub weights: ScoreWeights,
    /// Sleep between cycles; stretches toward max on cycle-level failure.
    pub cycle_secs_base: u64,
    pub cycle_secs_max: u64,
    pub fetch_timeout_secs: u64,
    pub advisory_timeout_secs: u64,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            pairs: vec!["BTC/USDT".to_string(), "ETH/USDT".to_string()],
            base_timeframe: Timeframe::OneMin,
            enabled_timeframes: vec![
                Timeframe::OneMin,
                Timeframe::FiveMin,
                Timeframe::FifteenMin,
                Timeframe::OneHour,
            ],
            primary_timeframe: Timeframe::FifteenMin,
            min_history: 100,
            min_confidence: 0.80,
            reward_risk_ratio: 3.0,
            max_drawdown_pct: 5.0,
            daily_loss_limit_pct: 2.0,
            weights: ScoreWeights::default(),
            cycle_secs_base: 2,
            cycle_secs_max: 10,
            fetch_timeout_secs: 10,
            advisory_timeout_secs: 5,
        }
    }
}

fn env_parse<T: FromStr>(key: &str, default: T) -> Result<T>
where
    T::Err: std::error::Error + Send + Sync + 'static,
{
    match env::var(key) {
        Ok(raw) => raw
            .trim()
            .parse::<T>()
            .with_context(|| format!("Invalid {}: '{}'", key, raw)),
        Err(_) => Ok(default),
    }
}

impl Config {
    pub fn from_env() -> Result<Self> {
        let defaults = Config::default();

        let pairs = match env::var("PAIRS") {
            Ok(raw) => raw
                .split(',')
                .map(|s| s.trim().to_string())
                .filter(|s| !s.is_empty())
                .collect(),
            Err(_) => defaults.pairs,
        };

        let base_timeframe = match env::var("BASE_TIMEFRAME") {
            Ok(raw) => Timeframe::from_str(&raw)?,
            Err(_) => defaults.base_timeframe,
        };

        let enabled_timeframes = match env::var("TIMEFRAMES") {
            Ok(raw) => raw
                .split(',')
                .map(|s| Timeframe::from_str(s.trim()))
                .collect::<Result<Vec<_>>>()?,
            Err(_) => defaults.enabled_timeframes,
        };

        let primary_timeframe = match env::var("PRIMARY_TIMEFRAME") {
            Ok(raw) => Timeframe::from_str(&raw)?,
            Err(_) => defaults.primary_timeframe,
        };

        let weights = ScoreWeights {
            structure: env_parse("WEIGHT_STRUCTURE", defaults.weights.structure)?,
            pattern: env_parse("WEIGHT_PATTERN", defaults.weights.pattern)?,
            volume: env_parse("WEIGHT_VOLUME", defaults.weights.volume)?,
            momentum: env_parse("WEIGHT_MOMENTUM", defaults.weights.momentum)?,
        };

        let config = Config {
            pairs,
            base_timeframe,
            enabled_timeframes,
            primary_timeframe,
            min_history: env_parse("MIN_HISTORY", defaults.min_history)?,
            min_confidence: env_parse("MIN_CONFIDENCE", defaults.min_confidence)?,
            reward_risk_ratio: env_parse("REWARD_RISK_RATIO", defaults.reward_risk_ratio)?,
            max_drawdown_pct: env_parse("MAX_DRAWDOWN_PCT", defaults.max_drawdown_pct)?,
            daily_loss_limit_pct: env_parse("DAILY_LOSS_LIMIT_PCT", defaults.daily_loss_limit_pct)?,
            weights,
            cycle_secs_base: env_parse("CYCLE_SECS_BASE", defaults.cycle_secs_base)?,
            cycle_secs_max: env_parse("CYCLE_SECS_MAX", defaults.cycle_secs_max)?,
            fetch_timeout_secs: env_parse("FETCH_TIMEOUT_SECS", defaults.fetch_timeout_secs)?,
            advisory_timeout_secs: env_parse(
                "ADVISORY_TIMEOUT_SECS",
                defaults.advisory_timeout_secs,
            )?,
        };

        config.validate()?;
        Ok(config)
    }

    /// Fails fast on inconsistent configuration (fatal at startup only).
    pub fn validate(&self) -> Result<(), PipelineError> {
        let invalid = |reason: String| PipelineError::ConfigInvalid { reason };

        if self.pairs.is_empty() {
            return Err(invalid("no pairs configured".to_string()));
        }

        for w in [
            self.weights.structure,
            self.weights.pattern,
            self.weights.volume,
            self.weights.momentum,
        ] {
            if !(0.0..=1.0).contains(&w) {
                return Err(invalid(format!("score weight {} outside [0, 1]", w)));
            }
        }
        if (self.weights.sum() - 1.0).abs() > 1e-9 {
            return Err(invalid(format!(
                "score weights sum to {}, expected 1.0",
                self.weights.sum()
            )));
        }

        if !(self.min_confidence > 0.0 && self.min_confidence <= 1.0) {
            return Err(invalid(format!(
                "minimum confidence {} outside (0, 1]",
                self.min_confidence
            )));
        }
        if self.reward_risk_ratio <= 0.0 {
            return Err(invalid(format!(
                "reward:risk ratio {} must be positive",
                self.reward_risk_ratio
            )));
        }

        if self.enabled_timeframes.is_empty() {
            return Err(invalid("no timeframes enabled".to_string()));
        }
        for tf in &self.enabled_timeframes {
            if tf.factor_of(self.base_timeframe).is_err() {
                return Err(invalid(format!(
                    "timeframe {} is not a multiple of the base timeframe {}",
                    tf, self.base_timeframe
                )));
            }
        }
        if !self.enabled_timeframes.contains(&self.primary_timeframe) {
            return Err(invalid(format!(
                "primary timeframe {} is not in the enabled set",
                self.primary_timeframe
            )));
        }

        if self.cycle_secs_base == 0 || self.cycle_secs_max < self.cycle_secs_base {
            return Err(invalid(format!(
                "cycle cadence bounds [{}, {}] are inconsistent",
                self.cycle_secs_base, self.cycle_secs_max
            )));
        }

        Ok(())
    }
}
