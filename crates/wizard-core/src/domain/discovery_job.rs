//! Asynchronous discovery job tracking.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::CatalogEntry;

/// Job state machine: `pending -> running -> completed | failed`.
/// Strictly forward-progressing; no transition leaves a terminal state and
/// no transition skips `running`.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum JobState {
    Pending,
    Running,
    Completed,
    Failed,
}

impl JobState {
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Completed | Self::Failed)
    }
}

/// Tracks one asynchronous discovery request.
///
/// Held only in the in-memory job registry - job state is lost on process
/// restart by design.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DiscoveryJob {
    pub id: String,
    pub state: JobState,
    /// Original free-text query, retained for display
    pub query: String,
    /// Populated only when state is `completed`
    #[serde(default)]
    pub results: Vec<CatalogEntry>,
    /// Populated only when state is `failed`
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    pub started_at: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub completed_at: Option<DateTime<Utc>>,
}

impl DiscoveryJob {
    /// Create a new job in `pending` state with a freshly generated id.
    pub fn new(query: impl Into<String>) -> Self {
        Self {
            id: generate_job_id(),
            state: JobState::Pending,
            query: query.into(),
            results: Vec::new(),
            error: None,
            started_at: Utc::now(),
            completed_at: None,
        }
    }
}

/// Generate a job id unique for the lifetime of the registry:
/// millisecond timestamp plus a random suffix.
fn generate_job_id() -> String {
    let suffix = Uuid::new_v4().simple().to_string();
    format!("{}-{}", Utc::now().timestamp_millis(), &suffix[..8])
}
