// crates/parchment-core/src/logging.rs
// ============================================================================
// Module: Correlation Logger
// Description: Per-invocation correlation ids, sanitized lifecycle records.
// Purpose: Join every response to its log records without leaking secrets.
// Dependencies: rand, serde, serde_json
// ============================================================================

//! ## Overview
//! The correlation logger assigns an opaque id per tool invocation and emits
//! structured started/succeeded/failed records plus a performance warning for
//! slow calls. Logged arguments are always sanitized: sensitive keys are
//! redacted and long strings truncated, recursively. Failure detail (error
//! kind, source location) goes to the sink only, never into responses.
//!
//! Sink failures are swallowed rather than propagated; logging must never
//! take down a request. See DESIGN.md for the recorded decision.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::fs::File;
use std::fs::OpenOptions;
use std::io;
use std::io::Write;
use std::path::Path;
use std::sync::Arc;
use std::sync::Mutex;
use std::sync::atomic::AtomicU64;
use std::sync::atomic::Ordering;
use std::time::Duration;
use std::time::SystemTime;
use std::time::UNIX_EPOCH;

use rand::RngCore;
use rand::rngs::OsRng;
use serde::Serialize;
use serde_json::Value;

use crate::errors::ToolFailure;

// ============================================================================
// SECTION: Constants
// ============================================================================

/// Replacement value for redacted argument entries.
pub const REDACTION_MARKER: &str = "[REDACTED]";
/// Suffix appended to truncated string values.
pub const TRUNCATION_MARKER: &str = "...[TRUNCATED]";
/// Maximum logged string length before truncation applies.
pub const MAX_LOGGED_STRING_CHARS: usize = 1000;
/// Invocation duration beyond which a performance warning is emitted.
pub const PERFORMANCE_WARNING_THRESHOLD: Duration = Duration::from_secs(5);
/// Prefix for server-issued correlation identifiers.
const CORRELATION_PREFIX: &str = "pmt";

/// Case-insensitive key fragments that trigger redaction.
const SENSITIVE_KEY_TERMS: &[&str] = &[
    "password",
    "token",
    "secret",
    "key",
    "api_key",
    "access_token",
    "refresh_token",
    "private_key",
];

// ============================================================================
// SECTION: Correlation Ids
// ============================================================================

/// Boot-scoped correlation ID generator.
///
/// # Invariants
/// - Issued identifiers are unique within the process lifetime.
#[derive(Debug)]
pub struct CorrelationIdGenerator {
    /// Boot-scoped random identifier for entropy.
    boot_id: u64,
    /// Monotonic counter for IDs issued in this process.
    counter: AtomicU64,
}

impl CorrelationIdGenerator {
    /// Creates a new generator with fresh boot entropy.
    #[must_use]
    pub fn new() -> Self {
        let mut bytes = [0u8; 8];
        OsRng.fill_bytes(&mut bytes);
        Self {
            boot_id: u64::from_be_bytes(bytes),
            counter: AtomicU64::new(1),
        }
    }

    /// Issues a new opaque correlation ID.
    #[must_use]
    pub fn issue(&self) -> String {
        let seq = self.counter.fetch_add(1, Ordering::Relaxed);
        format!("{CORRELATION_PREFIX}-{:016x}-{seq:08x}", self.boot_id)
    }
}

impl Default for CorrelationIdGenerator {
    fn default() -> Self {
        Self::new()
    }
}

// ============================================================================
// SECTION: Argument Sanitization
// ============================================================================

/// Returns a sanitized copy of the given arguments for logging.
///
/// Sensitive keys are replaced with [`REDACTION_MARKER`], long strings are
/// truncated with [`TRUNCATION_MARKER`], and sanitization recurses into nested
/// maps and arrays. The function is idempotent.
#[must_use]
pub fn sanitize_arguments(value: &Value) -> Value {
    match value {
        Value::Object(map) => {
            let mut sanitized = serde_json::Map::with_capacity(map.len());
            for (key, entry) in map {
                if is_sensitive_key(key) {
                    sanitized.insert(key.clone(), Value::String(REDACTION_MARKER.to_string()));
                } else {
                    sanitized.insert(key.clone(), sanitize_arguments(entry));
                }
            }
            Value::Object(sanitized)
        }
        Value::Array(items) => Value::Array(items.iter().map(sanitize_arguments).collect()),
        Value::String(text) => Value::String(truncate_logged_string(text)),
        other => other.clone(),
    }
}

/// Returns true when a key must be redacted.
fn is_sensitive_key(key: &str) -> bool {
    let lowered = key.to_ascii_lowercase();
    SENSITIVE_KEY_TERMS.iter().any(|term| lowered.contains(term))
}

/// Truncates a string value beyond the logged length limit.
fn truncate_logged_string(text: &str) -> String {
    if text.chars().count() <= MAX_LOGGED_STRING_CHARS {
        return text.to_string();
    }
    let truncated: String = text.chars().take(MAX_LOGGED_STRING_CHARS).collect();
    format!("{truncated}{TRUNCATION_MARKER}")
}

// ============================================================================
// SECTION: Log Events
// ============================================================================

/// Structured tool lifecycle log event.
///
/// # Invariants
/// - `arguments` in `ToolStarted` are always sanitized before construction.
/// - Failure detail never flows from these events back into responses.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum ToolLogEvent {
    /// Invocation accepted and about to execute.
    ToolStarted {
        /// Event timestamp (milliseconds since epoch).
        timestamp_ms: u128,
        /// Tool name.
        tool: String,
        /// Server-issued correlation identifier.
        correlation_id: String,
        /// Sanitized copy of the invocation arguments.
        arguments: Value,
    },
    /// Invocation completed successfully.
    ToolSucceeded {
        /// Event timestamp (milliseconds since epoch).
        timestamp_ms: u128,
        /// Tool name.
        tool: String,
        /// Server-issued correlation identifier.
        correlation_id: String,
        /// Invocation duration in milliseconds.
        duration_ms: u64,
        /// Optional completion metadata.
        metadata: Value,
    },
    /// Invocation failed.
    ToolFailed {
        /// Event timestamp (milliseconds since epoch).
        timestamp_ms: u128,
        /// Tool name.
        tool: String,
        /// Server-issued correlation identifier.
        correlation_id: String,
        /// Invocation duration in milliseconds.
        duration_ms: u64,
        /// Failure message.
        error: String,
        /// Classified error code.
        error_kind: String,
        /// Source location when available (log-only detail).
        source_location: Option<String>,
        /// Optional failure metadata.
        metadata: Value,
    },
    /// Invocation exceeded the performance threshold.
    PerformanceWarning {
        /// Event timestamp (milliseconds since epoch).
        timestamp_ms: u128,
        /// Tool name.
        tool: String,
        /// Server-issued correlation identifier.
        correlation_id: String,
        /// Invocation duration in milliseconds.
        duration_ms: u64,
        /// Threshold that was exceeded, in milliseconds.
        threshold_ms: u64,
    },
}

// ============================================================================
// SECTION: Sinks
// ============================================================================

/// Sink for tool lifecycle log events.
pub trait ToolLogSink: Send + Sync {
    /// Records a lifecycle event. Implementations must not fail outward.
    fn record(&self, event: &ToolLogEvent);
}

/// Sink that writes JSON lines to stderr.
pub struct StderrLogSink;

impl ToolLogSink for StderrLogSink {
    fn record(&self, event: &ToolLogEvent) {
        if let Ok(payload) = serde_json::to_string(event) {
            let _ = writeln!(std::io::stderr(), "{payload}");
        }
    }
}

/// Sink that appends JSON lines to a file.
pub struct FileLogSink {
    /// File handle used for append-only logging.
    file: Mutex<File>,
}

impl FileLogSink {
    /// Opens the log file in append mode.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be opened.
    pub fn new(path: &Path) -> io::Result<Self> {
        let file = OpenOptions::new().create(true).append(true).open(path)?;
        Ok(Self {
            file: Mutex::new(file),
        })
    }
}

impl ToolLogSink for FileLogSink {
    fn record(&self, event: &ToolLogEvent) {
        if let Ok(payload) = serde_json::to_string(event)
            && let Ok(mut file) = self.file.lock()
        {
            let _ = writeln!(file, "{payload}");
            let _ = file.flush();
        }
    }
}

/// No-op sink.
pub struct NoopLogSink;

impl ToolLogSink for NoopLogSink {
    fn record(&self, _event: &ToolLogEvent) {}
}

/// In-memory sink for assertions in tests.
#[derive(Default)]
pub struct MemoryLogSink {
    /// Recorded events in arrival order.
    events: Mutex<Vec<ToolLogEvent>>,
}

impl MemoryLogSink {
    /// Creates an empty in-memory sink.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns a copy of the recorded events.
    #[must_use]
    pub fn events(&self) -> Vec<ToolLogEvent> {
        self.events.lock().map(|events| events.clone()).unwrap_or_default()
    }
}

impl ToolLogSink for MemoryLogSink {
    fn record(&self, event: &ToolLogEvent) {
        if let Ok(mut events) = self.events.lock() {
            events.push(event.clone());
        }
    }
}

// ============================================================================
// SECTION: Tool Logger
// ============================================================================

/// Correlation logger driving lifecycle events for tool invocations.
pub struct ToolLogger {
    /// Destination sink for lifecycle events.
    sink: Arc<dyn ToolLogSink>,
    /// Correlation id generator.
    generator: CorrelationIdGenerator,
}

impl ToolLogger {
    /// Creates a logger over the given sink.
    #[must_use]
    pub fn new(sink: Arc<dyn ToolLogSink>) -> Self {
        Self {
            sink,
            generator: CorrelationIdGenerator::new(),
        }
    }

    /// Emits a started record and returns the issued correlation id.
    #[must_use]
    pub fn start(&self, tool: &str, arguments: &Value) -> String {
        let correlation_id = self.generator.issue();
        self.sink.record(&ToolLogEvent::ToolStarted {
            timestamp_ms: now_millis(),
            tool: tool.to_string(),
            correlation_id: correlation_id.clone(),
            arguments: sanitize_arguments(arguments),
        });
        correlation_id
    }

    /// Emits a completion record with rounded millisecond duration.
    pub fn success(&self, tool: &str, correlation_id: &str, duration: Duration, metadata: Value) {
        self.sink.record(&ToolLogEvent::ToolSucceeded {
            timestamp_ms: now_millis(),
            tool: tool.to_string(),
            correlation_id: correlation_id.to_string(),
            duration_ms: duration_millis(duration),
            metadata,
        });
    }

    /// Emits an error record including classified failure detail.
    pub fn failure(
        &self,
        tool: &str,
        correlation_id: &str,
        failure: &ToolFailure,
        duration: Duration,
        metadata: Value,
    ) {
        self.sink.record(&ToolLogEvent::ToolFailed {
            timestamp_ms: now_millis(),
            tool: tool.to_string(),
            correlation_id: correlation_id.to_string(),
            duration_ms: duration_millis(duration),
            error: failure.message.clone(),
            error_kind: failure.kind.code().to_string(),
            source_location: failure.source_location.clone(),
            metadata,
        });
    }

    /// Emits a performance warning when the threshold was exceeded.
    pub fn performance_warning(&self, tool: &str, correlation_id: &str, duration: Duration) {
        self.sink.record(&ToolLogEvent::PerformanceWarning {
            timestamp_ms: now_millis(),
            tool: tool.to_string(),
            correlation_id: correlation_id.to_string(),
            duration_ms: duration_millis(duration),
            threshold_ms: duration_millis(PERFORMANCE_WARNING_THRESHOLD),
        });
    }
}

// ============================================================================
// SECTION: Helpers
// ============================================================================

/// Returns milliseconds since the unix epoch.
fn now_millis() -> u128 {
    SystemTime::now().duration_since(UNIX_EPOCH).unwrap_or_default().as_millis()
}

/// Converts a duration into saturating whole milliseconds.
fn duration_millis(duration: Duration) -> u64 {
    u64::try_from(duration.as_millis()).unwrap_or(u64::MAX)
}

// ============================================================================
// SECTION: Tests
// ============================================================================
