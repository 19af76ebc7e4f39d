// crates/parchment-config/tests/common/mod.rs
// ============================================================================
// Module: Common Test Fixtures
// Description: Shared fixtures for configuration tests.
// Purpose: Build minimal valid configurations for mutation in tests.
// Dependencies: parchment-config
// ============================================================================

//! ## Overview
//! Shared helpers for the configuration integration tests.

#![allow(dead_code, reason = "Shared test helpers may be unused in some cases.")]

use parchment_config::ConfigError;
use parchment_config::ParchmentConfig;

/// Returns a minimal configuration that passes validation.
pub fn minimal_config() -> Result<ParchmentConfig, ConfigError> {
    let config = ParchmentConfig::default();
    config.validate()?;
    Ok(config)
}
