//! Repository abstraction for the calibrator's feedback history.
//!
//! The store is the only cross-cycle shared mutable resource in the
//! pipeline. Single-writer discipline applies: only the calibrator
//! appends. Writes are keyed by signal id so repeats are idempotent, and
//! implementations must enforce a hard retention cap (drop-oldest) to
//! bound memory. The in-memory implementation lives in
//! `infrastructure::feedback`; the same trait supports any embedded or
//! key-value store.

use crate::domain::signal::OutcomeRecord;
use anyhow::Result;
use async_trait::async_trait;
use uuid::Uuid;

#[async_trait]
pub trait FeedbackRepository: Send + Sync {
    /// Record an outcome. Re-recording the same signal id overwrites the
    /// previous entry instead of growing the history.
    async fn record(&self, outcome: OutcomeRecord) -> Result<()>;

    /// Most recent outcomes, newest last, up to `limit`.
    async fn recent(&self, limit: usize) -> Result<Vec<OutcomeRecord>>;

    async fn get(&self, signal_id: Uuid) -> Result<Option<OutcomeRecord>>;

    async fn len(&self) -> Result<usize>;
}
