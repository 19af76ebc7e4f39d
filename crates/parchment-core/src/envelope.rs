// crates/parchment-core/src/envelope.rs
// ============================================================================
// Module: Response Envelope
// Description: Uniform success/error response construction for all tools.
// Purpose: Guarantee every tool response carries the same contract shape.
// Dependencies: serde, time, crate::errors
// ============================================================================

//! ## Overview
//! Every Parchment operation returns the same envelope:
//! `{success, data|errors, warnings, meta}`. Construction is pure; the only
//! environmental inputs are the wall clock and the runtime version strings,
//! and both degrade to `"unknown"` instead of failing.
//!
//! ## Invariants
//! - Exactly one of `data` / `errors` is meaningful per the `success` flag.
//! - `warnings` is always present, possibly empty.
//! - `meta` is always present and well-formed.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::collections::BTreeMap;

use serde::Deserialize;
use serde::Serialize;
use serde_json::Value;
use serde_json::json;
use time::OffsetDateTime;
use time::format_description::well_known::Rfc3339;

use crate::errors::ErrorKind;

// ============================================================================
// SECTION: Constants
// ============================================================================

/// Fallback string used when a version or timestamp cannot be obtained.
pub const UNKNOWN_MARKER: &str = "unknown";

// ============================================================================
// SECTION: Runtime Versions
// ============================================================================

/// Version identifiers for the wrapped runtime and this server.
///
/// # Invariants
/// - Fields always hold a value; lookups that fail use [`UNKNOWN_MARKER`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RuntimeVersions {
    /// Version string of the wrapped content runtime.
    pub runtime_version: String,
    /// Version string of the Parchment server itself.
    pub server_version: String,
}

impl RuntimeVersions {
    /// Creates a version pair from the given strings.
    #[must_use]
    pub fn new(runtime_version: impl Into<String>, server_version: impl Into<String>) -> Self {
        Self {
            runtime_version: runtime_version.into(),
            server_version: server_version.into(),
        }
    }

    /// Returns the fallback version pair.
    #[must_use]
    pub fn unknown() -> Self {
        Self::new(UNKNOWN_MARKER, UNKNOWN_MARKER)
    }
}

impl Default for RuntimeVersions {
    fn default() -> Self {
        Self::unknown()
    }
}

// ============================================================================
// SECTION: Envelope Types
// ============================================================================

/// Response metadata attached to every envelope.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResponseMeta {
    /// Name of the tool that produced the response.
    pub tool: String,
    /// RFC 3339 timestamp of envelope construction.
    pub timestamp: String,
    /// Version string of the wrapped content runtime.
    pub runtime_version: String,
    /// Version string of the Parchment server.
    pub server_version: String,
}

impl ResponseMeta {
    /// Builds metadata for the given tool and version pair.
    #[must_use]
    pub fn new(tool: &str, versions: &RuntimeVersions) -> Self {
        Self {
            tool: tool.to_string(),
            timestamp: now_rfc3339(),
            runtime_version: versions.runtime_version.clone(),
            server_version: versions.server_version.clone(),
        }
    }
}

/// Uniform response envelope returned by every tool.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResponseEnvelope {
    /// Whether the operation succeeded.
    pub success: bool,
    /// Result payload; present iff `success` is true.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<Value>,
    /// Failure descriptions; present iff `success` is false.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub errors: Option<Vec<String>>,
    /// Non-fatal notices; always present, possibly empty.
    pub warnings: Vec<String>,
    /// Response metadata; always present.
    pub meta: ResponseMeta,
}

impl ResponseEnvelope {
    /// Builds a success envelope around the given data.
    #[must_use]
    pub fn success(
        tool: &str,
        versions: &RuntimeVersions,
        data: Value,
        warnings: Vec<String>,
    ) -> Self {
        Self {
            success: true,
            data: Some(data),
            errors: None,
            warnings,
            meta: ResponseMeta::new(tool, versions),
        }
    }

    /// Builds an error envelope from a classified kind.
    ///
    /// The fixed kind message is the first error entry; `context` rides along
    /// in `data` together with the machine code and status class.
    #[must_use]
    pub fn error(
        tool: &str,
        versions: &RuntimeVersions,
        kind: ErrorKind,
        context: Value,
        warnings: Vec<String>,
    ) -> Self {
        let mut data = json!({
            "code": kind.code(),
            "status": kind.http_status(),
        });
        merge_context(&mut data, context);
        Self {
            success: false,
            data: Some(data),
            errors: Some(vec![kind.message().to_string()]),
            warnings,
            meta: ResponseMeta::new(tool, versions),
        }
    }

    /// Builds an error envelope from a plain message.
    ///
    /// Plain messages default the kind to [`ErrorKind::InternalError`].
    #[must_use]
    pub fn error_message(
        tool: &str,
        versions: &RuntimeVersions,
        message: impl Into<String>,
        context: Value,
        warnings: Vec<String>,
    ) -> Self {
        let kind = ErrorKind::InternalError;
        let mut data = json!({
            "code": kind.code(),
            "status": kind.http_status(),
        });
        merge_context(&mut data, context);
        Self {
            success: false,
            data: Some(data),
            errors: Some(vec![message.into()]),
            warnings,
            meta: ResponseMeta::new(tool, versions),
        }
    }

    /// Builds a validation-error envelope from per-field messages.
    #[must_use]
    pub fn validation_error(
        tool: &str,
        versions: &RuntimeVersions,
        field_errors: &BTreeMap<String, String>,
    ) -> Self {
        let context = json!({ "fields": field_errors });
        Self::error(tool, versions, ErrorKind::ValidationFailed, context, Vec::new())
    }

    /// Builds a not-found envelope for a resource lookup.
    #[must_use]
    pub fn not_found(
        tool: &str,
        versions: &RuntimeVersions,
        resource: &str,
        id: Option<&str>,
        suggestions: &[String],
    ) -> Self {
        let context = json!({
            "resource": resource,
            "id": id,
            "suggestions": suggestions,
        });
        Self::error(tool, versions, ErrorKind::NotFound, context, Vec::new())
    }

    /// Builds a permission-denied envelope for an operation.
    #[must_use]
    pub fn permission_denied(
        tool: &str,
        versions: &RuntimeVersions,
        operation: &str,
        resource: Option<&str>,
        required_permissions: &[String],
    ) -> Self {
        let context = json!({
            "operation": operation,
            "resource": resource,
            "required_permissions": required_permissions,
        });
        Self::error(tool, versions, ErrorKind::PermissionDenied, context, Vec::new())
    }

    /// Builds a security-error envelope from a security kind.
    #[must_use]
    pub fn security_error(
        tool: &str,
        versions: &RuntimeVersions,
        kind: ErrorKind,
        details: Option<&str>,
    ) -> Self {
        let context = json!({ "details": details });
        Self::error(tool, versions, kind, context, Vec::new())
    }

    /// Serializes the envelope into a JSON value.
    ///
    /// Serialization of this shape cannot fail; the null fallback is never
    /// observed in practice.
    #[must_use]
    pub fn into_value(self) -> Value {
        serde_json::to_value(self).unwrap_or(Value::Null)
    }
}

// ============================================================================
// SECTION: Helpers
// ============================================================================

/// Returns the current wall-clock time in RFC 3339, or the unknown marker.
#[must_use]
pub fn now_rfc3339() -> String {
    OffsetDateTime::now_utc()
        .format(&Rfc3339)
        .unwrap_or_else(|_| UNKNOWN_MARKER.to_string())
}

/// Merges caller-provided context keys into an error data object.
fn merge_context(data: &mut Value, context: Value) {
    if let (Value::Object(target), Value::Object(extra)) = (data, context) {
        for (key, value) in extra {
            target.insert(key, value);
        }
    }
}

// ============================================================================
// SECTION: Tests
// ============================================================================
