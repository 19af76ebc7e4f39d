// crates/parchment-mcp/src/lib.rs
// ============================================================================
// Module: Parchment MCP Library
// Description: MCP server wiring for Parchment tools.
// Purpose: Expose domain routers and utility tools over JSON-RPC 2.0.
// Dependencies: parchment-config, parchment-core, parchment-lint
// ============================================================================

//! ## Overview
//! `parchment-mcp` assembles the Parchment tool surface: content domain
//! routers, the system discovery tool, and the template linter, registered
//! behind one executor and served over stdio or HTTP transports.

// ============================================================================
// SECTION: Modules
// ============================================================================

pub mod audit;
pub mod auth;
pub mod domains;
pub mod registry;
pub mod server;

// ============================================================================
// SECTION: Re-Exports
// ============================================================================

pub use audit::AuditSink;
pub use audit::McpAuditEvent;
pub use audit::MemoryAuditSink;
pub use audit::NoopAuditSink;
pub use audit::StderrAuditSink;
pub use auth::AuthPolicy;
pub use auth::RequestContext;
pub use domains::build_registry;
pub use registry::ToolDefinition;
pub use registry::ToolError;
pub use registry::ToolRegistry;
pub use server::McpServer;
pub use server::McpServerError;
