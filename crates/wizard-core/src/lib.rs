//! # MCP Wizard Core Library
//!
//! Domain logic, entities, and business rules for MCP Wizard.
//!
//! ## Modules
//!
//! - `branding` - Centralized branding constants
//! - `domain` - Core entities (CatalogEntry, DiscoveryJob, PackageAnalysis)
//! - `error` - Discovery error taxonomy
//! - `repository` - Data access traits
//! - `service` - Provider clients, analyzers, and the aggregation service

pub mod branding;
pub mod domain;
pub mod error;
pub mod repository;
pub mod service;

// Re-export commonly used types
pub use domain::*;
pub use error::DiscoveryError;
pub use repository::*;
pub use service::*;
