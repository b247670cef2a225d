//! Centralized branding constants.
//!
//! Everything that names the product in logs, HTTP headers, or the OS
//! keychain lives here so a rebrand touches a single file.

/// Product name used in logs and generated documents.
pub const APP_NAME: &str = "MCP Wizard";

/// User agent sent on every outbound provider request.
pub const USER_AGENT: &str = "McpWizard/0.2";

/// Service name for OS keychain entries.
pub const KEYCHAIN_SERVICE: &str = "com.mcpwizard.app";

/// Default port for the HTTP API.
pub const DEFAULT_API_PORT: u16 = 3200;

/// The protocol this product discovers servers for.
pub const PROTOCOL_ABBREV: &str = "mcp";

/// Full protocol name, lowercase, as matched in free text.
pub const PROTOCOL_NAME: &str = "model context protocol";
