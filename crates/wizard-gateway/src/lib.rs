//! MCP Wizard HTTP API
//!
//! Thin axum layer over the core-exposed discovery interface. The core
//! returns `None` for missing entities; this layer translates them to 404s
//! and maps the error taxonomy to status codes.

pub mod server;

pub use server::{ApiConfig, ApiServer, AppState};
