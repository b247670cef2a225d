//! Saved server configurations and their version snapshots.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use uuid::Uuid;

/// A user's saved configuration for one catalog entry.
///
/// Secret values never live here - `secret_refs` holds vault references
/// (see `SecretVault`), keyed by parameter name.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UserConfig {
    pub id: Uuid,
    pub owner_id: String,
    /// Catalog entry identity this configuration targets
    pub entry_id: String,
    pub name: String,
    /// Non-secret parameter values
    #[serde(default)]
    pub values: HashMap<String, String>,
    /// Parameter name -> secret vault reference
    #[serde(default)]
    pub secret_refs: HashMap<String, String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl UserConfig {
    pub fn new(owner_id: impl Into<String>, entry_id: impl Into<String>, name: impl Into<String>) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            owner_id: owner_id.into(),
            entry_id: entry_id.into(),
            name: name.into(),
            values: HashMap::new(),
            secret_refs: HashMap::new(),
            created_at: now,
            updated_at: now,
        }
    }
}

/// An immutable, numbered snapshot of a `UserConfig`'s values.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConfigVersion {
    pub id: Uuid,
    pub config_id: Uuid,
    /// 1-based, monotonically increasing per configuration
    pub version: u32,
    pub values: HashMap<String, String>,
    pub secret_refs: HashMap<String, String>,
    /// Optional note describing what changed
    pub note: Option<String>,
    pub created_at: DateTime<Utc>,
}
