// crates/parchment-lint/src/tags.rs
// ============================================================================
// Module: Tag Scanner
// Description: Regex extraction and classification of template tags.
// Purpose: Turn a template string into a flat list of parsed tag occurrences.
// Dependencies: regex, serde
// ============================================================================

//! ## Overview
//! Tags are extracted line by line with a delimiter regex and classified by a
//! second string-splitting pass: name, colon-namespaced suffix, `key="value"`
//! parameters, bare boolean flags, and pipe-delimited modifiers. No tree is
//! built here; nesting is the pair-balance rule's concern.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::collections::BTreeMap;
use std::sync::LazyLock;

use regex::Regex;
use serde::Serialize;

// ============================================================================
// SECTION: Constants
// ============================================================================

/// Tag names treated as conditionals.
pub const CONDITIONAL_NAMES: &[&str] = &["if", "unless", "elseif", "else"];

/// Tag names treated as loops over content.
pub const LOOP_NAMES: &[&str] = &["collection", "taxonomy", "nav", "foreach", "loop"];

/// Matches one `{{ ... }}` tag occurrence within a line.
static TAG_RE: LazyLock<Regex> = LazyLock::new(|| {
    #[allow(clippy::expect_used, reason = "Pattern is a compile-time constant.")]
    Regex::new(r"\{\{\s*([^{}]*?)\s*\}\}").expect("tag pattern is valid")
});

/// Matches one `key="value"` parameter, value may contain spaces.
static PARAM_RE: LazyLock<Regex> = LazyLock::new(|| {
    #[allow(clippy::expect_used, reason = "Pattern is a compile-time constant.")]
    Regex::new(r#"([A-Za-z_][\w:]*)="([^"]*)""#).expect("param pattern is valid")
});

// ============================================================================
// SECTION: Parsed Tags
// ============================================================================

/// Heuristic classification of a tag occurrence.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum TagKind {
    /// Branching tag such as `if` or `unless`.
    Conditional,
    /// Content loop such as `collection` or `nav`.
    Loop,
    /// Colon-namespaced addon or scoped tag.
    NamespacedTag,
    /// Plain variable interpolation.
    Variable,
}

/// One parsed tag occurrence.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ParsedTag {
    /// Raw inner text between the delimiters.
    pub raw: String,
    /// One-based line number of the occurrence.
    pub line: usize,
    /// One-based byte column of the opening delimiter.
    pub column: usize,
    /// Tag name before any colon suffix.
    pub name: String,
    /// Colon-namespaced suffix when present.
    pub namespace: Option<String>,
    /// `key="value"` parameters in appearance order.
    pub params: BTreeMap<String, String>,
    /// Bare boolean flags.
    pub flags: Vec<String>,
    /// Pipe-delimited modifiers.
    pub modifiers: Vec<String>,
    /// Heuristic classification.
    pub kind: TagKind,
    /// Whether this is a `/name` closing tag.
    pub closing: bool,
}

/// Scans a template into a flat list of parsed tags.
#[must_use]
pub fn scan_tags(template: &str) -> Vec<ParsedTag> {
    let mut tags = Vec::new();
    for (index, line) in template.lines().enumerate() {
        for capture in TAG_RE.captures_iter(line) {
            let (Some(whole), Some(inner)) = (capture.get(0), capture.get(1)) else {
                continue;
            };
            tags.push(parse_tag(inner.as_str(), index + 1, whole.start() + 1));
        }
    }
    tags
}

/// Parses the inner text of one tag occurrence.
fn parse_tag(inner: &str, line: usize, column: usize) -> ParsedTag {
    let mut segments = inner.split('|');
    let head = segments.next().unwrap_or_default().trim();
    let modifiers: Vec<String> =
        segments.map(str::trim).filter(|part| !part.is_empty()).map(str::to_string).collect();

    // Quoted parameters come out first so their values keep embedded spaces.
    let mut params = BTreeMap::new();
    for capture in PARAM_RE.captures_iter(head) {
        if let (Some(key), Some(value)) = (capture.get(1), capture.get(2)) {
            params.insert(key.as_str().to_string(), value.as_str().to_string());
        }
    }
    let remainder = PARAM_RE.replace_all(head, " ");

    let mut tokens = remainder.split_whitespace();
    let first = tokens.next().unwrap_or_default();
    let closing = first.starts_with('/');
    let identifier = first.trim_start_matches('/');
    let (name, namespace) = match identifier.split_once(':') {
        Some((name, suffix)) => (name.to_string(), Some(suffix.to_string())),
        None => (identifier.to_string(), None),
    };

    let mut flags = Vec::new();
    for token in tokens {
        if let Some((key, value)) = token.split_once('=') {
            params.insert(key.to_string(), value.trim_matches('"').to_string());
        } else {
            flags.push(token.to_string());
        }
    }

    let kind = classify(&name, namespace.as_deref());
    ParsedTag {
        raw: inner.to_string(),
        line,
        column,
        name,
        namespace,
        params,
        flags,
        modifiers,
        kind,
        closing,
    }
}

/// Classifies a tag by name and namespace presence.
fn classify(name: &str, namespace: Option<&str>) -> TagKind {
    if CONDITIONAL_NAMES.contains(&name) {
        return TagKind::Conditional;
    }
    if LOOP_NAMES.contains(&name) {
        return TagKind::Loop;
    }
    if namespace.is_some() {
        return TagKind::NamespacedTag;
    }
    TagKind::Variable
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

    use super::TagKind;
    use super::scan_tags;

    #[test]
    fn scans_multiple_tags_per_line_with_line_numbers() {
        let tags = scan_tags("{{ title }} and {{ subtitle }}\n{{ author }}");
        assert_eq!(tags.len(), 3);
        assert_eq!(tags[0].line, 1);
        assert_eq!(tags[0].column, 1);
        assert_eq!(tags[1].line, 1);
        assert!(tags[1].column > tags[0].column);
        assert_eq!(tags[2].line, 2);
        assert_eq!(tags[2].name, "author");
    }

    #[test]
    fn extracts_namespace_params_and_flags() {
        let tags = scan_tags(r#"{{ collection:blog limit="5" paginate sort="date desc" }}"#);
        let tag = &tags[0];
        assert_eq!(tag.name, "collection");
        assert_eq!(tag.namespace.as_deref(), Some("blog"));
        assert_eq!(tag.params.get("limit").map(String::as_str), Some("5"));
        assert_eq!(tag.params.get("sort").map(String::as_str), Some("date desc"));
        assert_eq!(tag.flags, vec!["paginate".to_string()]);
        assert_eq!(tag.kind, TagKind::Loop);
    }

    #[test]
    fn extracts_pipe_modifiers() {
        let tags = scan_tags("{{ title | upper | truncate:20 }}");
        let tag = &tags[0];
        assert_eq!(tag.name, "title");
        assert_eq!(tag.kind, TagKind::Variable);
        assert_eq!(tag.modifiers, vec!["upper".to_string(), "truncate:20".to_string()]);
    }

    #[test]
    fn classifies_conditionals_and_closing_tags() {
        let tags = scan_tags("{{ if signed_in }}{{ user:name }}{{ /if }}");
        assert_eq!(tags[0].kind, TagKind::Conditional);
        assert!(!tags[0].closing);
        assert_eq!(tags[1].kind, TagKind::NamespacedTag);
        assert_eq!(tags[2].name, "if");
        assert!(tags[2].closing);
    }

    #[test]
    fn sort_param_keeps_quoted_value_intact() {
        let tags = scan_tags(r#"{{ collection:blog sort="date" }}"#);
        assert_eq!(tags[0].params.get("sort").map(String::as_str), Some("date"));
    }
}
