// crates/parchment-core/src/errors.rs
// ============================================================================
// Module: Error Taxonomy
// Description: Closed error kind enumeration for tool responses.
// Purpose: Map every failure onto a fixed code, message, and status class.
// Dependencies: serde, thiserror
// ============================================================================

//! ## Overview
//! The error taxonomy is a closed set of named kinds. Each kind carries a
//! canonical machine code, one fixed human-readable message independent of the
//! call site, and a suggested HTTP status class. Kinds are immutable and
//! referenced by value; there is no mutable state in this module.
//!
//! ## Invariants
//! - `message()` never interpolates; identical kinds yield identical strings.
//! - Every `*NotFound` variant maps to status 404.
//! - Unknown or unclassified failures default to `InternalError` (500).

// ============================================================================
// SECTION: Imports
// ============================================================================

use serde::Deserialize;
use serde::Serialize;
use thiserror::Error;

// ============================================================================
// SECTION: Error Kinds
// ============================================================================

/// Closed enumeration of tool error kinds.
///
/// # Invariants
/// - Variants are stable; codes are used in envelopes and audit records.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorKind {
    /// Request arguments were malformed.
    InvalidInput,
    /// Request arguments failed field-level validation.
    ValidationFailed,
    /// Caller is not authenticated.
    Unauthorized,
    /// Caller is authenticated but not allowed.
    Forbidden,
    /// Generic missing resource.
    NotFound,
    /// Entry resource missing.
    EntryNotFound,
    /// Collection resource missing.
    CollectionNotFound,
    /// Blueprint resource missing.
    BlueprintNotFound,
    /// Asset resource missing.
    AssetNotFound,
    /// Taxonomy resource missing.
    TaxonomyNotFound,
    /// User resource missing.
    UserNotFound,
    /// Resource state conflict.
    Conflict,
    /// Caller exceeded rate limits.
    RateLimited,
    /// Unclassified internal failure.
    InternalError,
    /// Resource creation failed.
    CreationFailed,
    /// Resource update failed.
    UpdateFailed,
    /// Resource deletion failed.
    DeletionFailed,
    /// Operation denied by permission policy.
    PermissionDenied,
    /// External collaborator failed.
    DependencyError,
    /// Cache layer failure.
    CacheError,
    /// Filesystem access failure.
    FilesystemError,
    /// Template parsing or rendering failure.
    TemplateError,
    /// Schema definition or validation failure.
    SchemaError,
    /// Path escaped its allowed root.
    PathTraversal,
    /// Input matched a malicious pattern.
    MaliciousInput,
    /// Destructive operation attempted without safety confirmation.
    UnsafeOperation,
}

impl ErrorKind {
    /// Returns the canonical machine code for this kind.
    #[must_use]
    pub const fn code(self) -> &'static str {
        match self {
            Self::InvalidInput => "INVALID_INPUT",
            Self::ValidationFailed => "VALIDATION_FAILED",
            Self::Unauthorized => "UNAUTHORIZED",
            Self::Forbidden => "FORBIDDEN",
            Self::NotFound => "NOT_FOUND",
            Self::EntryNotFound => "ENTRY_NOT_FOUND",
            Self::CollectionNotFound => "COLLECTION_NOT_FOUND",
            Self::BlueprintNotFound => "BLUEPRINT_NOT_FOUND",
            Self::AssetNotFound => "ASSET_NOT_FOUND",
            Self::TaxonomyNotFound => "TAXONOMY_NOT_FOUND",
            Self::UserNotFound => "USER_NOT_FOUND",
            Self::Conflict => "CONFLICT",
            Self::RateLimited => "RATE_LIMITED",
            Self::InternalError => "INTERNAL_ERROR",
            Self::CreationFailed => "CREATION_FAILED",
            Self::UpdateFailed => "UPDATE_FAILED",
            Self::DeletionFailed => "DELETION_FAILED",
            Self::PermissionDenied => "PERMISSION_DENIED",
            Self::DependencyError => "DEPENDENCY_ERROR",
            Self::CacheError => "CACHE_ERROR",
            Self::FilesystemError => "FILESYSTEM_ERROR",
            Self::TemplateError => "TEMPLATE_ERROR",
            Self::SchemaError => "SCHEMA_ERROR",
            Self::PathTraversal => "PATH_TRAVERSAL",
            Self::MaliciousInput => "MALICIOUS_INPUT",
            Self::UnsafeOperation => "UNSAFE_OPERATION",
        }
    }

    /// Returns the fixed human-readable message for this kind.
    ///
    /// Messages are pure functions of the kind; no call-site interpolation.
    #[must_use]
    pub const fn message(self) -> &'static str {
        match self {
            Self::InvalidInput => "Invalid input provided",
            Self::ValidationFailed => "Validation failed",
            Self::Unauthorized => "Authentication required",
            Self::Forbidden => "Access forbidden",
            Self::NotFound => "Resource not found",
            Self::EntryNotFound => "Entry not found",
            Self::CollectionNotFound => "Collection not found",
            Self::BlueprintNotFound => "Blueprint not found",
            Self::AssetNotFound => "Asset not found",
            Self::TaxonomyNotFound => "Taxonomy not found",
            Self::UserNotFound => "User not found",
            Self::Conflict => "Resource conflict",
            Self::RateLimited => "Rate limit exceeded",
            Self::InternalError => "Internal server error",
            Self::CreationFailed => "Resource creation failed",
            Self::UpdateFailed => "Resource update failed",
            Self::DeletionFailed => "Resource deletion failed",
            Self::PermissionDenied => "Permission denied",
            Self::DependencyError => "Dependency unavailable",
            Self::CacheError => "Cache operation failed",
            Self::FilesystemError => "Filesystem operation failed",
            Self::TemplateError => "Template processing failed",
            Self::SchemaError => "Schema processing failed",
            Self::PathTraversal => "Path traversal detected",
            Self::MaliciousInput => "Malicious input detected",
            Self::UnsafeOperation => "Unsafe operation blocked",
        }
    }

    /// Returns the suggested HTTP status class for this kind.
    #[must_use]
    pub const fn http_status(self) -> u16 {
        match self {
            Self::InvalidInput
            | Self::ValidationFailed
            | Self::SchemaError
            | Self::PathTraversal
            | Self::MaliciousInput
            | Self::UnsafeOperation => 400,
            Self::Unauthorized => 401,
            Self::Forbidden | Self::PermissionDenied => 403,
            Self::NotFound
            | Self::EntryNotFound
            | Self::CollectionNotFound
            | Self::BlueprintNotFound
            | Self::AssetNotFound
            | Self::TaxonomyNotFound
            | Self::UserNotFound => 404,
            Self::Conflict => 409,
            Self::RateLimited => 429,
            Self::InternalError
            | Self::CreationFailed
            | Self::UpdateFailed
            | Self::DeletionFailed
            | Self::DependencyError
            | Self::CacheError
            | Self::FilesystemError
            | Self::TemplateError => 500,
        }
    }
}

// ============================================================================
// SECTION: Tool Failure
// ============================================================================

/// Classified failure raised by tool and router handlers.
///
/// # Invariants
/// - `message` is caller-facing and must not embed secrets or file paths.
/// - `source_location` is log-only detail; the dispatch layer never copies it
///   into responses outside debug deployments.
#[derive(Debug, Clone, Error)]
#[error("{message}")]
pub struct ToolFailure {
    /// Classified error kind.
    pub kind: ErrorKind,
    /// Caller-facing failure description.
    pub message: String,
    /// Optional source location for log records.
    pub source_location: Option<String>,
}

impl ToolFailure {
    /// Creates a failure with the given kind and message.
    #[must_use]
    pub fn new(kind: ErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
            source_location: None,
        }
    }

    /// Creates an internal failure from a message.
    #[must_use]
    pub fn internal(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::InternalError, message)
    }

    /// Creates an invalid-input failure from a message.
    #[must_use]
    pub fn invalid(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::InvalidInput, message)
    }

    /// Returns a copy with the source location attached.
    #[must_use]
    pub fn with_source_location(mut self, location: impl Into<String>) -> Self {
        self.source_location = Some(location.into());
        self
    }
}

// ============================================================================
// SECTION: Tests
// ============================================================================
