//! In-memory feedback store.

use crate::domain::repositories::FeedbackRepository;
use crate::domain::signal::OutcomeRecord;
use anyhow::Result;
use async_trait::async_trait;
use std::collections::VecDeque;
use tokio::sync::RwLock;
use uuid::Uuid;

const DEFAULT_CAPACITY: usize = 500;

/// Bounded in-memory outcome history. Insertion order is kept; hitting
/// the capacity drops the oldest entry.
pub struct InMemoryFeedbackRepository {
    records: RwLock<VecDeque<OutcomeRecord>>,
    capacity: usize,
}

impl InMemoryFeedbackRepository {
    pub fn new() -> Self {
        Self::with_capacity(DEFAULT_CAPACITY)
    }

    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            records: RwLock::new(VecDeque::with_capacity(capacity)),
            capacity,
        }
    }
}

impl Default for InMemoryFeedbackRepository {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl FeedbackRepository for InMemoryFeedbackRepository {
    async fn record(&self, outcome: OutcomeRecord) -> Result<()> {
        let mut records = self.records.write().await;
        if let Some(existing) = records.iter_mut().find(|r| r.signal_id == outcome.signal_id) {
            *existing = outcome;
            return Ok(());
        }
        if records.len() == self.capacity {
            records.pop_front();
        }
        records.push_back(outcome);
        Ok(())
    }

    async fn recent(&self, limit: usize) -> Result<Vec<OutcomeRecord>> {
        let records = self.records.read().await;
        let skip = records.len().saturating_sub(limit);
        Ok(records.iter().skip(skip).cloned().collect())
    }

    async fn get(&self, signal_id: Uuid) -> Result<Option<OutcomeRecord>> {
        let records = self.records.read().await;
        Ok(records.iter().find(|r| r.signal_id == signal_id).cloned())
    }

    async fn len(&self) -> Result<usize> {
        Ok(self.records.read().await.len())
    }
}
