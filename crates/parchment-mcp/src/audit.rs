// crates/parchment-mcp/src/audit.rs
// ============================================================================
// Module: Request Audit
// Description: Structured audit records for server-level request handling.
// Purpose: Record transport events separately from tool lifecycle logs.
// Dependencies: serde, serde_json
// ============================================================================

//! ## Overview
//! The audit sink records what happened at the transport boundary: requests
//! received, authentication rejections, and tool dispatches. Tool-internal
//! lifecycle records (start, success, failure) belong to the correlation
//! logger, not here. Sink failures are swallowed.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::io::Write;
use std::sync::Mutex;

use serde::Serialize;

// ============================================================================
// SECTION: Events
// ============================================================================

/// Server-level audit event.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum McpAuditEvent {
    /// A JSON-RPC request was accepted for dispatch.
    RequestReceived {
        /// Transport label, `stdio` or `http`.
        transport: &'static str,
        /// JSON-RPC method name.
        method: String,
        /// JSON-RPC request id rendered as a string.
        request_id: String,
    },
    /// An HTTP request failed authentication.
    AuthRejected {
        /// Peer address when known.
        peer: Option<String>,
    },
    /// A tool call was dispatched to the registry.
    ToolCalled {
        /// Registered tool name.
        tool: String,
        /// JSON-RPC request id rendered as a string.
        request_id: String,
    },
}

// ============================================================================
// SECTION: Sinks
// ============================================================================

/// Sink for server-level audit events.
pub trait AuditSink: Send + Sync {
    /// Records one audit event. Implementations must not fail outward.
    fn record(&self, event: &McpAuditEvent);
}

/// Sink that writes JSON lines to stderr.
pub struct StderrAuditSink;

impl AuditSink for StderrAuditSink {
    fn record(&self, event: &McpAuditEvent) {
        if let Ok(payload) = serde_json::to_string(event) {
            let _ = writeln!(std::io::stderr(), "{payload}");
        }
    }
}

/// No-op sink.
pub struct NoopAuditSink;

impl AuditSink for NoopAuditSink {
    fn record(&self, _event: &McpAuditEvent) {}
}

/// In-memory sink for assertions in tests.
#[derive(Default)]
pub struct MemoryAuditSink {
    /// Recorded events in arrival order.
    events: Mutex<Vec<McpAuditEvent>>,
}

impl MemoryAuditSink {
    /// Creates an empty in-memory sink.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns a copy of the recorded events.
    #[must_use]
    pub fn events(&self) -> Vec<McpAuditEvent> {
        self.events.lock().map(|events| events.clone()).unwrap_or_default()
    }
}

impl AuditSink for MemoryAuditSink {
    fn record(&self, event: &McpAuditEvent) {
        if let Ok(mut events) = self.events.lock() {
            events.push(event.clone());
        }
    }
}
