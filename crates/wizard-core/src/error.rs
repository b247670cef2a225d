//! Error taxonomy for the discovery pipeline.
//!
//! Provider clients return `DiscoveryError` so callers can tell a rate-limit
//! exhaustion apart from a generic fetch failure and back off instead of
//! retrying. Missing entities (jobs, cached analyses) are `None` at the core
//! API boundary, not an error variant - the HTTP layer turns them into 404s.

use chrono::{DateTime, Utc};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum DiscoveryError {
    /// A call to an external provider failed. `context` carries the
    /// owner/repo pair, package name, or URL so logs are actionable.
    #[error("fetch failed for {context}: {message}")]
    Fetch { context: String, message: String },

    /// The repository provider signalled quota exhaustion (403 with a
    /// zero-remaining rate-limit header).
    #[error("{provider} rate limit exceeded, resets at {reset_at}")]
    RateLimit {
        provider: String,
        reset_at: DateTime<Utc>,
    },

    /// Caller-supplied input failed a precondition before any I/O.
    #[error("invalid input: {0}")]
    Validation(String),
}

impl DiscoveryError {
    /// Build a `Fetch` error with context.
    pub fn fetch(context: impl Into<String>, message: impl ToString) -> Self {
        Self::Fetch {
            context: context.into(),
            message: message.to_string(),
        }
    }

    /// True if this error is the repository provider's exhaustion signal.
    pub fn is_rate_limit(&self) -> bool {
        matches!(self, Self::RateLimit { .. })
    }
}
