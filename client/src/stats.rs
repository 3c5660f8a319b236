//! Global counters shared by every connected client.

use crate::error::Result;
use crate::store::{DocumentStore, GlobalStats, StatField};
use chrono::Utc;
use std::sync::Arc;

pub struct StatsService<S> {
    store: Arc<S>,
}

impl<S: DocumentStore> StatsService<S> {
    pub fn new(store: Arc<S>) -> Self {
        StatsService { store }
    }

    /// Current counters, lazily initialized to zeros on first read.
    pub async fn current(&self) -> Result<GlobalStats> {
        if let Some(stats) = self.store.global_stats().await? {
            return Ok(stats);
        }
        let stats = GlobalStats::zeroed(Utc::now());
        self.store.put_global_stats(&stats).await?;
        Ok(stats)
    }

    pub async fn increment_votes(&self) -> Result<GlobalStats> {
        self.store
            .bump_stat(StatField::TotalVotes, 1, Utc::now())
            .await
    }

    pub async fn increment_users(&self) -> Result<GlobalStats> {
        self.store
            .bump_stat(StatField::TotalUsers, 1, Utc::now())
            .await
    }

    pub async fn update_poll_count(&self, total: u64) -> Result<GlobalStats> {
        self.store
            .set_stat(StatField::TotalPolls, total, Utc::now())
            .await
    }

    pub async fn update_active_polls(&self, active: u64) -> Result<GlobalStats> {
        self.store
            .set_stat(StatField::ActivePolls, active, Utc::now())
            .await
    }
}
