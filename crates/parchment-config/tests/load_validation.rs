// crates/parchment-config/tests/load_validation.rs
// =============================================================================
// Module: Config Load Validation Tests
// Description: Validate file loading, parsing, and fail-closed behavior.
// Purpose: Ensure on-disk configuration resolves and rejects correctly.
// =============================================================================

//! Config file loading tests for parchment-config.

use std::fs;

use parchment_config::ParchmentConfig;
use parchment_config::ServerTransport;

mod common;

type TestResult = Result<(), String>;

#[test]
fn loads_a_full_toml_file() -> TestResult {
    let dir = tempfile::tempdir().map_err(|err| err.to_string())?;
    let path = dir.path().join("parchment.toml");
    fs::write(
        &path,
        r#"
[server]
transport = "http"
bind = "127.0.0.1:8087"
auth_tokens = ["local-dev-token"]
debug = true

[cache]
enabled = false
memoize_ttl_secs = 60

[logging]
sink = "none"

[safety]
bypass = false

[lint]
extra_tags = ["seo:meta"]

[store]
blueprint_paths = ["resources/blueprints/article.yaml"]
"#,
    )
    .map_err(|err| err.to_string())?;

    let config = ParchmentConfig::load(Some(&path)).map_err(|err| err.to_string())?;
    if config.server.transport != ServerTransport::Http {
        return Err("expected http transport".to_string());
    }
    if config.cache.enabled {
        return Err("expected cache disabled".to_string());
    }
    if config.cache.memoize_ttl_secs != 60 {
        return Err("expected overridden memoize ttl".to_string());
    }
    if config.store.blueprint_paths.len() != 1 {
        return Err("expected one blueprint path".to_string());
    }
    Ok(())
}

#[test]
fn empty_file_yields_defaults() -> TestResult {
    let dir = tempfile::tempdir().map_err(|err| err.to_string())?;
    let path = dir.path().join("parchment.toml");
    fs::write(&path, "").map_err(|err| err.to_string())?;
    let config = ParchmentConfig::load(Some(&path)).map_err(|err| err.to_string())?;
    let defaults = common::minimal_config().map_err(|err| err.to_string())?;
    if config.cache.memoize_ttl_secs != defaults.cache.memoize_ttl_secs {
        return Err("empty file should produce default cache ttls".to_string());
    }
    Ok(())
}

#[test]
fn missing_file_fails_closed() -> TestResult {
    let dir = tempfile::tempdir().map_err(|err| err.to_string())?;
    let path = dir.path().join("absent.toml");
    match ParchmentConfig::load(Some(&path)) {
        Err(error) => {
            if error.to_string().contains("config io error") {
                Ok(())
            } else {
                Err(format!("unexpected error: {error}"))
            }
        }
        Ok(_) => Err("expected missing config to fail".to_string()),
    }
}

#[test]
fn malformed_toml_fails_closed() -> TestResult {
    let dir = tempfile::tempdir().map_err(|err| err.to_string())?;
    let path = dir.path().join("parchment.toml");
    fs::write(&path, "[server\ntransport = ").map_err(|err| err.to_string())?;
    match ParchmentConfig::load(Some(&path)) {
        Err(error) => {
            if error.to_string().contains("config parse error") {
                Ok(())
            } else {
                Err(format!("unexpected error: {error}"))
            }
        }
        Ok(_) => Err("expected malformed config to fail".to_string()),
    }
}

#[test]
fn invalid_values_fail_validation_on_load() -> TestResult {
    let dir = tempfile::tempdir().map_err(|err| err.to_string())?;
    let path = dir.path().join("parchment.toml");
    fs::write(&path, "[server]\ntransport = \"http\"\n").map_err(|err| err.to_string())?;
    match ParchmentConfig::load(Some(&path)) {
        Err(error) => {
            if error.to_string().contains("http transport requires a bind address") {
                Ok(())
            } else {
                Err(format!("unexpected error: {error}"))
            }
        }
        Ok(_) => Err("expected invalid config to fail".to_string()),
    }
}
