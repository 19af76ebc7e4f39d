// crates/parchment-core/src/tool.rs
// ============================================================================
// Module: Tool Executor
// Description: Lifecycle wrapper around individual tool invocations.
// Purpose: Guarantee every invocation logs, validates, and returns an envelope.
// Dependencies: serde_json, crate::{envelope, errors, logging, store}
// ============================================================================

//! ## Overview
//! Every tool call flows through one lifecycle: log start, validate raw
//! arguments, execute, shape the result, log completion. The executor never
//! propagates a failure or a panic to the transport; every outcome becomes an
//! envelope-shaped JSON value.
//!
//! ## Invariants
//! - Arguments containing null bytes are rejected before execution.
//! - A handler result already carrying `success` and `meta` keys passes
//!   through untouched; anything else is wrapped as success data.
//! - Caller-facing failure messages are stripped of null bytes and capped;
//!   error kind and source location reach responses only in debug deployments.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::panic::AssertUnwindSafe;
use std::panic::catch_unwind;
use std::sync::Arc;
use std::time::Duration;
use std::time::Instant;

use serde_json::Value;
use serde_json::json;

use crate::envelope::ResponseEnvelope;
use crate::envelope::ResponseMeta;
use crate::errors::ErrorKind;
use crate::errors::ToolFailure;
use crate::logging::PERFORMANCE_WARNING_THRESHOLD;
use crate::logging::ToolLogger;
use crate::store::RuntimeInspector;

// ============================================================================
// SECTION: Constants
// ============================================================================

/// Maximum characters of a caller-facing failure message.
pub const MAX_ERROR_MESSAGE_CHARS: usize = 500;

/// Prefix applied to caller-facing failure messages.
const ERROR_MESSAGE_PREFIX: &str = "Tool execution failed: ";

// ============================================================================
// SECTION: Handler Contract
// ============================================================================

/// A named tool that executes JSON arguments.
pub trait ToolHandler: Send + Sync {
    /// Returns the tool's registered name.
    fn name(&self) -> &str;

    /// Executes the tool against already-validated arguments.
    ///
    /// # Errors
    ///
    /// Returns a classified [`ToolFailure`] on any handled error.
    fn execute(&self, arguments: &Value) -> Result<Value, ToolFailure>;
}

/// Executor deployment settings.
#[derive(Debug, Clone)]
pub struct ExecutorConfig {
    /// Whether debug detail may appear in error responses.
    pub debug: bool,
    /// Duration beyond which a performance warning is logged.
    pub performance_threshold: Duration,
}

impl Default for ExecutorConfig {
    fn default() -> Self {
        Self {
            debug: false,
            performance_threshold: PERFORMANCE_WARNING_THRESHOLD,
        }
    }
}

// ============================================================================
// SECTION: Executor
// ============================================================================

/// Lifecycle wrapper shared by every registered tool.
pub struct ToolExecutor {
    /// Correlation logger for lifecycle records.
    logger: Arc<ToolLogger>,
    /// Runtime version source for envelope metadata.
    runtime: Arc<dyn RuntimeInspector>,
    /// Deployment settings.
    config: ExecutorConfig,
}

impl ToolExecutor {
    /// Creates an executor over the given logger and runtime inspector.
    #[must_use]
    pub fn new(
        logger: Arc<ToolLogger>,
        runtime: Arc<dyn RuntimeInspector>,
        config: ExecutorConfig,
    ) -> Self {
        Self {
            logger,
            runtime,
            config,
        }
    }

    /// Runs one tool invocation through the full lifecycle.
    ///
    /// Always returns an envelope-shaped JSON value; failures and panics are
    /// converted, never propagated.
    #[must_use]
    pub fn run(&self, tool: &dyn ToolHandler, arguments: &Value) -> Value {
        let name = tool.name().to_string();
        let correlation_id = self.logger.start(&name, arguments);
        let started = Instant::now();

        if contains_null_bytes(arguments) {
            let failure =
                ToolFailure::new(ErrorKind::MaliciousInput, "arguments contain null bytes");
            self.logger.failure(&name, &correlation_id, &failure, started.elapsed(), json!({}));
            return self.failure_value(&name, &correlation_id, &failure);
        }

        let outcome = catch_unwind(AssertUnwindSafe(|| tool.execute(arguments)));
        let duration = started.elapsed();

        let value = match outcome {
            Ok(Ok(result)) => {
                self.logger.success(&name, &correlation_id, duration, json!({}));
                self.shape_success(&name, result)
            }
            Ok(Err(failure)) => {
                self.logger.failure(&name, &correlation_id, &failure, duration, json!({}));
                self.failure_value(&name, &correlation_id, &failure)
            }
            Err(panic) => {
                let failure = ToolFailure::internal(panic_message(panic.as_ref()));
                self.logger.failure(&name, &correlation_id, &failure, duration, json!({}));
                self.failure_value(&name, &correlation_id, &failure)
            }
        };

        if duration > self.config.performance_threshold {
            self.logger.performance_warning(&name, &correlation_id, duration);
        }
        value
    }

    /// Applies the pass-through rule to a successful handler result.
    fn shape_success(&self, tool: &str, result: Value) -> Value {
        if is_envelope_shaped(&result) {
            return result;
        }
        ResponseEnvelope::success(tool, &self.runtime.versions(), result, Vec::new()).into_value()
    }

    /// Builds the caller-facing error envelope for a failure.
    fn failure_value(&self, tool: &str, correlation_id: &str, failure: &ToolFailure) -> Value {
        let mut data = json!({
            "code": failure.kind.code(),
            "status": failure.kind.http_status(),
            "correlation_id": correlation_id,
        });
        if self.config.debug
            && let Value::Object(map) = &mut data
        {
            map.insert("error_kind".to_string(), json!(failure.kind.code()));
            map.insert("source_location".to_string(), json!(failure.source_location));
        }
        let envelope = ResponseEnvelope {
            success: false,
            data: Some(data),
            errors: Some(vec![safe_message(&failure.message)]),
            warnings: Vec::new(),
            meta: ResponseMeta::new(tool, &self.runtime.versions()),
        };
        envelope.into_value()
    }
}

// ============================================================================
// SECTION: Helpers
// ============================================================================

/// Returns true when a value already carries the envelope contract keys.
fn is_envelope_shaped(value: &Value) -> bool {
    value
        .as_object()
        .is_some_and(|map| map.contains_key("success") && map.contains_key("meta"))
}

/// Returns true when any string in the value contains a null byte.
fn contains_null_bytes(value: &Value) -> bool {
    match value {
        Value::Object(map) => map
            .iter()
            .any(|(key, entry)| key.contains('\0') || contains_null_bytes(entry)),
        Value::Array(items) => items.iter().any(contains_null_bytes),
        Value::String(text) => text.contains('\0'),
        _ => false,
    }
}

/// Strips null bytes, caps length, and prefixes a failure message.
fn safe_message(message: &str) -> String {
    let stripped: String = message.chars().filter(|ch| *ch != '\0').collect();
    let capped: String = stripped.chars().take(MAX_ERROR_MESSAGE_CHARS).collect();
    format!("{ERROR_MESSAGE_PREFIX}{capped}")
}

/// Extracts a printable message from a panic payload.
fn panic_message(panic: &(dyn std::any::Any + Send)) -> String {
    if let Some(text) = panic.downcast_ref::<&str>() {
        (*text).to_string()
    } else if let Some(text) = panic.downcast_ref::<String>() {
        text.clone()
    } else {
        "tool panicked".to_string()
    }
}

// ============================================================================
// SECTION: Tests
// ============================================================================

#[cfg(test)]
mod tests {
    #![allow(
        clippy::panic,
        clippy::unwrap_used,
        clippy::expect_used,
        reason = "Test-only panic-based assertions are permitted."
    )]

    use std::sync::Arc;
    use std::time::Duration;

    use serde_json::Value;
    use serde_json::json;

    use super::ExecutorConfig;
    use super::MAX_ERROR_MESSAGE_CHARS;
    use super::ToolExecutor;
    use super::ToolHandler;
    use crate::errors::ErrorKind;
    use crate::errors::ToolFailure;
    use crate::logging::MemoryLogSink;
    use crate::logging::ToolLogEvent;
    use crate::logging::ToolLogger;
    use crate::store::StaticRuntimeInspector;

    struct FakeTool {
        result: fn(&Value) -> Result<Value, ToolFailure>,
    }

    impl ToolHandler for FakeTool {
        fn name(&self) -> &str {
            "fake"
        }

        fn execute(&self, arguments: &Value) -> Result<Value, ToolFailure> {
            (self.result)(arguments)
        }
    }

    fn executor(config: ExecutorConfig) -> (ToolExecutor, Arc<MemoryLogSink>) {
        let sink = Arc::new(MemoryLogSink::new());
        let logger = Arc::new(ToolLogger::new(sink.clone()));
        let runtime = Arc::new(StaticRuntimeInspector::unknown());
        (ToolExecutor::new(logger, runtime, config), sink)
    }

    #[test]
    fn plain_results_are_wrapped_as_success() {
        let (executor, _) = executor(ExecutorConfig::default());
        let tool = FakeTool {
            result: |_| Ok(json!({"items": [1, 2]})),
        };
        let value = executor.run(&tool, &json!({}));
        assert_eq!(value["success"], true);
        assert_eq!(value["data"]["items"], json!([1, 2]));
        assert!(value["meta"]["tool"] == "fake");
    }

    #[test]
    fn envelope_shaped_results_pass_through() {
        let (executor, _) = executor(ExecutorConfig::default());
        let tool = FakeTool {
            result: |_| {
                Ok(json!({
                    "success": false,
                    "error": "safety_protocol_required",
                    "guidance": {"dry_run": "set dry_run=true"},
                    "meta": {"tool": "fake"},
                }))
            },
        };
        let value = executor.run(&tool, &json!({}));
        assert_eq!(value["error"], "safety_protocol_required");
        assert_eq!(value["guidance"]["dry_run"], "set dry_run=true");
        assert!(value.get("data").is_none());
    }

    #[test]
    fn null_bytes_are_rejected_before_execution() {
        let (executor, sink) = executor(ExecutorConfig::default());
        let tool = FakeTool {
            result: |_| panic!("must not execute"),
        };
        let value = executor.run(&tool, &json!({"title": "bad\u{0}input"}));
        assert_eq!(value["success"], false);
        assert_eq!(value["data"]["code"], "MALICIOUS_INPUT");
        let events = sink.events();
        assert!(matches!(events[1], ToolLogEvent::ToolFailed { .. }));
    }

    #[test]
    fn panics_become_internal_error_envelopes() {
        let (executor, _) = executor(ExecutorConfig::default());
        let tool = FakeTool {
            result: |_| panic!("index out of bounds"),
        };
        let value = executor.run(&tool, &json!({}));
        assert_eq!(value["success"], false);
        assert_eq!(value["data"]["code"], "INTERNAL_ERROR");
        let message = value["errors"][0].as_str().unwrap();
        assert!(message.contains("index out of bounds"));
    }

    #[test]
    fn failure_messages_are_capped_and_stripped() {
        let (executor, _) = executor(ExecutorConfig::default());
        let tool = FakeTool {
            result: |_| {
                Err(ToolFailure::internal(format!("bad\u{0}byte {}", "x".repeat(900))))
            },
        };
        let value = executor.run(&tool, &json!({}));
        let message = value["errors"][0].as_str().unwrap();
        assert!(!message.contains('\u{0}'));
        assert!(message.chars().count() <= MAX_ERROR_MESSAGE_CHARS + 30);
    }

    #[test]
    fn debug_detail_is_gated_on_deployment_mode() {
        let tool_result: fn(&Value) -> Result<Value, ToolFailure> = |_| {
            Err(ToolFailure::new(ErrorKind::CacheError, "backend gone")
                .with_source_location("cache.rs:10"))
        };

        let (production, _) = executor(ExecutorConfig::default());
        let value = production.run(&FakeTool { result: tool_result }, &json!({}));
        assert!(value["data"].get("source_location").is_none());

        let (debug, _) = executor(ExecutorConfig {
            debug: true,
            ..ExecutorConfig::default()
        });
        let value = debug.run(&FakeTool { result: tool_result }, &json!({}));
        assert_eq!(value["data"]["source_location"], "cache.rs:10");
        assert_eq!(value["data"]["error_kind"], "CACHE_ERROR");
    }

    #[test]
    fn slow_invocations_log_a_performance_warning() {
        let (executor, sink) = executor(ExecutorConfig {
            debug: false,
            performance_threshold: Duration::from_millis(0),
        });
        let tool = FakeTool {
            result: |_| {
                std::thread::sleep(Duration::from_millis(5));
                Ok(json!(null))
            },
        };
        let _ = executor.run(&tool, &json!({}));
        let warned = sink
            .events()
            .iter()
            .any(|event| matches!(event, ToolLogEvent::PerformanceWarning { .. }));
        assert!(warned);
    }

    #[test]
    fn every_failure_carries_the_correlation_id() {
        let (executor, sink) = executor(ExecutorConfig::default());
        let tool = FakeTool {
            result: |_| Err(ToolFailure::invalid("nope")),
        };
        let value = executor.run(&tool, &json!({}));
        let envelope_id = value["data"]["correlation_id"].as_str().unwrap().to_string();
        let events = sink.events();
        match &events[0] {
            ToolLogEvent::ToolStarted { correlation_id, .. } => {
                assert_eq!(*correlation_id, envelope_id);
            }
            _ => panic!("expected started event first"),
        }
    }
}
