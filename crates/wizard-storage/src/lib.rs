//! MCP Wizard Storage Layer
//!
//! SQLite persistence for the catalog and saved configurations, an
//! in-memory TTL cache, and an OS-keychain secret vault.
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────────────┐
//! │                    Application                       │
//! ├──────────────────────────────────────────────────────┤
//! │            Repository Traits (wizard-core)           │
//! │   (CatalogRepository, CacheStore, SecretVault, ...)  │
//! ├──────────────────────────────────────────────────────┤
//! │     SQLite Implementations │ MemoryCache │ Keychain  │
//! ├──────────────────────────────────────────────────────┤
//! │        Database (SQLite)   │  OS secure storage      │
//! └──────────────────────────────────────────────────────┘
//! ```

mod cache;
mod database;
pub mod keychain;
mod repositories;

pub use cache::MemoryCache;
pub use database::Database;
pub use keychain::KeychainSecretVault;
pub use repositories::*;

/// Default database file name.
pub const DATABASE_FILE: &str = "wizard.db";

/// Get the default database path for the current platform.
pub fn default_database_path() -> Option<std::path::PathBuf> {
    dirs::data_local_dir().map(|p| p.join("mcp-wizard").join(DATABASE_FILE))
}
