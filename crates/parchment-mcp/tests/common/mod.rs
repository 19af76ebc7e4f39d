// crates/parchment-mcp/tests/common/mod.rs
// ============================================================================
// Module: MCP Test Support
// Description: Shared fixtures for registry integration tests.
// Purpose: Build a fully wired registry over in-memory services.
// Dependencies: parchment-config, parchment-core, parchment-mcp
// ============================================================================

//! ## Overview
//! Shared fixtures wiring a complete registry over in-memory services for the
//! MCP integration tests.

#![allow(dead_code, reason = "Shared test helpers may be unused in some cases.")]

use std::sync::Arc;

use parchment_config::ParchmentConfig;
use parchment_core::InMemoryCacheBackend;
use parchment_core::InMemoryContentStore;
use parchment_core::MemoryLogSink;
use parchment_core::RuntimeInspector;
use parchment_core::RuntimeVersions;
use parchment_core::StaticRuntimeInspector;
use parchment_core::ToolCache;
use parchment_core::ToolLogger;
use parchment_mcp::ToolRegistry;
use parchment_mcp::build_registry;

/// Registry plus the backing services tests assert against.
pub struct TestHarness {
    /// Fully wired registry.
    pub registry: ToolRegistry,
    /// Backing store, kept concrete for mutation counting.
    pub store: Arc<InMemoryContentStore>,
    /// Captured tool lifecycle log events.
    pub log: Arc<MemoryLogSink>,
}

/// Builds a harness from the given configuration.
#[must_use]
pub fn harness_with_config(config: &ParchmentConfig) -> TestHarness {
    let store = Arc::new(InMemoryContentStore::new());
    let log = Arc::new(MemoryLogSink::new());
    let runtime = Arc::new(StaticRuntimeInspector::new(RuntimeVersions {
        runtime_version: "5.0.0".to_string(),
        server_version: "0.1.0".to_string(),
    }));
    let cache = Arc::new(ToolCache::new(
        Arc::new(InMemoryCacheBackend::new()),
        Arc::clone(&runtime) as Arc<dyn RuntimeInspector>,
        config.cache.enabled,
    ));
    let registry = build_registry(
        config,
        Arc::clone(&store) as Arc<dyn parchment_core::ContentStore>,
        runtime,
        Arc::new(ToolLogger::new(Arc::clone(&log) as Arc<dyn parchment_core::ToolLogSink>)),
        cache,
        vec!["seo-pro@6.0.0".to_string()],
    );
    TestHarness {
        registry,
        store,
        log,
    }
}

/// Builds a harness with default configuration.
#[must_use]
pub fn harness() -> TestHarness {
    harness_with_config(&ParchmentConfig::default())
}
