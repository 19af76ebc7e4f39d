// crates/parchment-config/src/lib.rs
// ============================================================================
// Module: Parchment Config Library
// Description: Canonical config model and validation.
// Purpose: Single source of truth for parchment.toml semantics.
// Dependencies: serde, thiserror, toml
// ============================================================================

//! ## Overview
//! `parchment-config` defines the canonical configuration model for the
//! Parchment server. Parsing is strict and fail-closed: size limits, UTF-8
//! enforcement, and structural validation all reject rather than degrade.

// ============================================================================
// SECTION: Modules
// ============================================================================

pub mod config;

// ============================================================================
// SECTION: Re-Exports
// ============================================================================

pub use config::*;
