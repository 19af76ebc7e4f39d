// crates/parchment-core/src/lib.rs
// ============================================================================
// Module: Parchment Core Library
// Description: Public API surface for the Parchment core.
// Purpose: Expose the envelope, error, logging, cache, and dispatch layers.
// Dependencies: crate::{cache, envelope, errors, logging, router, store, tool}
// ============================================================================

//! ## Overview
//! Parchment core provides the request-dispatch, response-standardization, and
//! safety-protocol layers shared by every Parchment tool. Content persistence
//! is backend-agnostic and integrates through the [`store::ContentStore`]
//! interface rather than embedding into a specific CMS runtime.

// ============================================================================
// SECTION: Modules
// ============================================================================

pub mod cache;
pub mod envelope;
pub mod errors;
pub mod logging;
pub mod router;
pub mod store;
pub mod tool;

// ============================================================================
// SECTION: Re-Exports
// ============================================================================

pub use cache::CacheBackend;
pub use cache::InMemoryCacheBackend;
pub use cache::ToolCache;
pub use envelope::ResponseEnvelope;
pub use envelope::ResponseMeta;
pub use envelope::RuntimeVersions;
pub use errors::ErrorKind;
pub use errors::ToolFailure;
pub use logging::CorrelationIdGenerator;
pub use logging::FileLogSink;
pub use logging::MemoryLogSink;
pub use logging::NoopLogSink;
pub use logging::StderrLogSink;
pub use logging::ToolLogEvent;
pub use logging::ToolLogSink;
pub use logging::ToolLogger;
pub use logging::sanitize_arguments;
pub use router::ActionDescriptor;
pub use router::Router;
pub use router::RouterTool;
pub use router::SafetyDecision;
pub use router::SafetyPolicy;
pub use router::SimulationReport;
pub use router::TypeDescriptor;
pub use store::ContentStore;
pub use store::InMemoryContentStore;
pub use store::ListQuery;
pub use store::ResourceKind;
pub use store::RuntimeInspector;
pub use store::StaticRuntimeInspector;
pub use store::StoreError;
pub use tool::ExecutorConfig;
pub use tool::ToolExecutor;
pub use tool::ToolHandler;
