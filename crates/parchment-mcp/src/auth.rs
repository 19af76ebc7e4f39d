// crates/parchment-mcp/src/auth.rs
// ============================================================================
// Module: Request Authentication
// Description: Transport-level request context and bearer-token checks.
// Purpose: Gate HTTP tool calls behind configured tokens.
// Dependencies: std
// ============================================================================

//! ## Overview
//! Stdio requests come from the parent process and are trusted. HTTP requests
//! carry an `Authorization: Bearer` header checked against the configured
//! token list; an empty list means the deployment opted out of token auth.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::net::IpAddr;

// ============================================================================
// SECTION: Request Context
// ============================================================================

/// Transport a request arrived on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RequestTransport {
    /// Parent-process stdio framing.
    Stdio,
    /// HTTP JSON-RPC.
    Http,
}

/// Per-request transport context.
#[derive(Debug, Clone)]
pub struct RequestContext {
    /// Transport the request arrived on.
    pub transport: RequestTransport,
    /// Peer address for HTTP requests.
    pub peer: Option<IpAddr>,
}

impl RequestContext {
    /// Builds the context for a stdio request.
    #[must_use]
    pub const fn stdio() -> Self {
        Self {
            transport: RequestTransport::Stdio,
            peer: None,
        }
    }

    /// Builds the context for an HTTP request.
    #[must_use]
    pub const fn http(peer: IpAddr) -> Self {
        Self {
            transport: RequestTransport::Http,
            peer: Some(peer),
        }
    }
}

// ============================================================================
// SECTION: Auth Policy
// ============================================================================

/// Bearer-token policy for the HTTP transport.
#[derive(Debug, Clone, Default)]
pub struct AuthPolicy {
    /// Accepted tokens; empty means token auth is disabled.
    tokens: Vec<String>,
}

impl AuthPolicy {
    /// Creates a policy from configured tokens.
    #[must_use]
    pub fn new(tokens: Vec<String>) -> Self {
        Self {
            tokens,
        }
    }

    /// Checks an `Authorization` header value against the policy.
    #[must_use]
    pub fn authorize(&self, header: Option<&str>) -> bool {
        if self.tokens.is_empty() {
            return true;
        }
        let Some(header) = header else {
            return false;
        };
        let Some(presented) = header.strip_prefix("Bearer ") else {
            return false;
        };
        let presented = presented.trim();
        self.tokens.iter().any(|token| constant_time_eq(token.as_bytes(), presented.as_bytes()))
    }
}

/// Compares two byte strings without early exit on mismatch.
fn constant_time_eq(left: &[u8], right: &[u8]) -> bool {
    if left.len() != right.len() {
        return false;
    }
    let mut diff = 0u8;
    for (a, b) in left.iter().zip(right.iter()) {
        diff |= a ^ b;
    }
    diff == 0
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

    use super::AuthPolicy;

    #[test]
    fn empty_policy_allows_everything() {
        let policy = AuthPolicy::default();
        assert!(policy.authorize(None));
        assert!(policy.authorize(Some("Bearer anything")));
    }

    #[test]
    fn configured_tokens_are_enforced() {
        let policy = AuthPolicy::new(vec!["secret-token".to_string()]);
        assert!(policy.authorize(Some("Bearer secret-token")));
        assert!(policy.authorize(Some("Bearer secret-token ")));
        assert!(!policy.authorize(Some("Bearer wrong")));
        assert!(!policy.authorize(Some("secret-token")));
        assert!(!policy.authorize(None));
    }
}
