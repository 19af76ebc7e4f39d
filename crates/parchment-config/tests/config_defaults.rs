// crates/parchment-config/tests/config_defaults.rs
// =============================================================================
// Module: Config Defaults and Core Validation Tests
// Description: Validate default behavior and core config invariants.
// Purpose: Ensure minimal config is valid and critical invariants are enforced.
// =============================================================================

//! Config defaults and core validation tests for parchment-config.

use parchment_config::ConfigError;
use parchment_config::LogSinkKind;
use parchment_config::ServerTransport;

mod common;

type TestResult = Result<(), String>;

fn assert_invalid(result: Result<(), ConfigError>, needle: &str) -> TestResult {
    match result {
        Err(error) => {
            let message = error.to_string();
            if message.contains(needle) {
                Ok(())
            } else {
                Err(format!("error {message} did not contain {needle}"))
            }
        }
        Ok(()) => Err("expected invalid config".to_string()),
    }
}

#[test]
fn default_config_validates() -> TestResult {
    let config = common::minimal_config().map_err(|err| err.to_string())?;
    config.validate().map_err(|err| err.to_string())?;
    Ok(())
}

#[test]
fn defaults_match_documented_values() -> TestResult {
    let config = common::minimal_config().map_err(|err| err.to_string())?;
    if config.server.transport != ServerTransport::Stdio {
        return Err("server.transport should default to stdio".to_string());
    }
    if config.server.debug {
        return Err("server.debug should default to false".to_string());
    }
    if !config.cache.enabled {
        return Err("cache.enabled should default to true".to_string());
    }
    if config.cache.memoize_ttl_secs != 300 {
        return Err("cache.memoize_ttl_secs should default to 300".to_string());
    }
    if config.cache.discovery_ttl_secs != 3600 {
        return Err("cache.discovery_ttl_secs should default to 3600".to_string());
    }
    if config.cache.scan_ttl_secs != 1800 {
        return Err("cache.scan_ttl_secs should default to 1800".to_string());
    }
    if config.logging.sink != LogSinkKind::Stderr {
        return Err("logging.sink should default to stderr".to_string());
    }
    if config.safety.bypass {
        return Err("safety.bypass should default to false".to_string());
    }
    Ok(())
}

#[test]
fn http_transport_requires_bind() -> TestResult {
    let mut config = common::minimal_config().map_err(|err| err.to_string())?;
    config.server.transport = ServerTransport::Http;
    config.server.bind = None;
    assert_invalid(config.validate(), "http transport requires a bind address")?;
    Ok(())
}

#[test]
fn http_transport_rejects_unparseable_bind() -> TestResult {
    let mut config = common::minimal_config().map_err(|err| err.to_string())?;
    config.server.transport = ServerTransport::Http;
    config.server.bind = Some("not-an-address".to_string());
    assert_invalid(config.validate(), "invalid bind address")?;
    Ok(())
}

#[test]
fn stdio_transport_rejects_bind_and_tokens() -> TestResult {
    let mut config = common::minimal_config().map_err(|err| err.to_string())?;
    config.server.bind = Some("127.0.0.1:8080".to_string());
    assert_invalid(config.validate(), "stdio transport does not take a bind address")?;

    let mut config = common::minimal_config().map_err(|err| err.to_string())?;
    config.server.auth_tokens = vec!["token".to_string()];
    assert_invalid(config.validate(), "auth tokens require the http transport")?;
    Ok(())
}

#[test]
fn empty_auth_tokens_are_rejected() -> TestResult {
    let mut config = common::minimal_config().map_err(|err| err.to_string())?;
    config.server.transport = ServerTransport::Http;
    config.server.bind = Some("127.0.0.1:8080".to_string());
    config.server.auth_tokens = vec!["   ".to_string()];
    assert_invalid(config.validate(), "auth_tokens entries must be non-empty")?;
    Ok(())
}

#[test]
fn zero_body_limit_is_rejected() -> TestResult {
    let mut config = common::minimal_config().map_err(|err| err.to_string())?;
    config.server.max_body_bytes = 0;
    assert_invalid(config.validate(), "max_body_bytes")?;
    Ok(())
}

#[test]
fn cache_ttls_are_range_checked() -> TestResult {
    let mut config = common::minimal_config().map_err(|err| err.to_string())?;
    config.cache.memoize_ttl_secs = 0;
    assert_invalid(config.validate(), "cache.memoize_ttl_secs")?;

    let mut config = common::minimal_config().map_err(|err| err.to_string())?;
    config.cache.discovery_ttl_secs = 1_000_000;
    assert_invalid(config.validate(), "cache.discovery_ttl_secs")?;
    Ok(())
}

#[test]
fn file_sink_requires_path() -> TestResult {
    let mut config = common::minimal_config().map_err(|err| err.to_string())?;
    config.logging.sink = LogSinkKind::File;
    config.logging.path = None;
    assert_invalid(config.validate(), "file log sink requires logging.path")?;
    Ok(())
}

#[test]
fn stderr_sink_rejects_path() -> TestResult {
    let mut config = common::minimal_config().map_err(|err| err.to_string())?;
    config.logging.path = Some("/tmp/parchment.log".to_string());
    assert_invalid(config.validate(), "logging.path is only valid with the file sink")?;
    Ok(())
}

#[test]
fn lint_extra_tags_are_shape_checked() -> TestResult {
    let mut config = common::minimal_config().map_err(|err| err.to_string())?;
    config.lint.extra_tags = vec!["my_addon:widget".to_string()];
    config.validate().map_err(|err| err.to_string())?;

    config.lint.extra_tags = vec!["bad tag".to_string()];
    assert_invalid(config.validate(), "invalid lint.extra_tags entry")?;
    Ok(())
}

#[test]
fn blueprint_paths_may_not_escape() -> TestResult {
    let mut config = common::minimal_config().map_err(|err| err.to_string())?;
    config.store.blueprint_paths = vec!["../outside/article.yaml".to_string()];
    assert_invalid(config.validate(), "escapes its root")?;
    Ok(())
}
