//! In-memory registry of discovery jobs.
//!
//! The registry owns the job state machine: transitions are strictly
//! forward (`pending -> running -> completed | failed`) and terminal states
//! are never left. Kept behind a trait so a durable implementation can
//! replace the in-memory one without touching orchestration.

use async_trait::async_trait;
use chrono::Utc;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::RwLock;
use tracing::debug;

use crate::domain::{CatalogEntry, DiscoveryJob, JobState};

/// Job storage interface.
#[async_trait]
pub trait JobRegistry: Send + Sync {
    /// Insert or replace a job record.
    async fn put(&self, job: DiscoveryJob);

    /// Look up a job by id.
    async fn get(&self, job_id: &str) -> Option<DiscoveryJob>;

    /// Transition `pending -> running`. Ignored for any other state.
    async fn mark_running(&self, job_id: &str);

    /// Transition to `completed` with results. Ignored once terminal.
    async fn complete(&self, job_id: &str, results: Vec<CatalogEntry>);

    /// Transition to `failed` with an error message. Ignored once terminal.
    async fn fail(&self, job_id: &str, error: String);

    /// Delete-if-present; idempotent.
    async fn remove(&self, job_id: &str);

    /// Fire-and-forget eviction timer. Scheduling twice is harmless since
    /// eviction is just a delete-if-present.
    fn schedule_eviction(&self, job_id: &str, after: Duration);
}

/// Default single-process implementation.
#[derive(Default)]
pub struct InMemoryJobRegistry {
    jobs: Arc<RwLock<HashMap<String, DiscoveryJob>>>,
}

impl InMemoryJobRegistry {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl JobRegistry for InMemoryJobRegistry {
    async fn put(&self, job: DiscoveryJob) {
        self.jobs.write().await.insert(job.id.clone(), job);
    }

    async fn get(&self, job_id: &str) -> Option<DiscoveryJob> {
        self.jobs.read().await.get(job_id).cloned()
    }

    async fn mark_running(&self, job_id: &str) {
        let mut jobs = self.jobs.write().await;
        if let Some(job) = jobs.get_mut(job_id) {
            if job.state == JobState::Pending {
                job.state = JobState::Running;
            }
        }
    }

    async fn complete(&self, job_id: &str, results: Vec<CatalogEntry>) {
        let mut jobs = self.jobs.write().await;
        if let Some(job) = jobs.get_mut(job_id) {
            if !job.state.is_terminal() {
                job.state = JobState::Completed;
                job.results = results;
                job.completed_at = Some(Utc::now());
            }
        }
    }

    async fn fail(&self, job_id: &str, error: String) {
        let mut jobs = self.jobs.write().await;
        if let Some(job) = jobs.get_mut(job_id) {
            if !job.state.is_terminal() {
                job.state = JobState::Failed;
                job.error = Some(error);
                job.completed_at = Some(Utc::now());
            }
        }
    }

    async fn remove(&self, job_id: &str) {
        self.jobs.write().await.remove(job_id);
    }

    fn schedule_eviction(&self, job_id: &str, after: Duration) {
        let jobs = self.jobs.clone();
        let job_id = job_id.to_string();
        tokio::spawn(async move {
            tokio::time::sleep(after).await;
            if jobs.write().await.remove(&job_id).is_some() {
                debug!("Evicted job {} after retention window", job_id);
            }
        });
    }
}
