// crates/parchment-lint/src/rules.rs
// ============================================================================
// Module: Lint Rules
// Description: Pluggable validation strategies over parsed template tags.
// Purpose: Emit error and warning records for heuristic template problems.
// Dependencies: serde, crate::tags
// ============================================================================

//! ## Overview
//! Each rule declares whether it applies to a parsed template and, if so,
//! emits issue records. The pair-balance rule keeps a stack of open tags so
//! unclosed, cross-nested, and orphan closing tags are all reported with the
//! line of the offending occurrence.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::collections::BTreeSet;

use serde::Serialize;

use crate::tags::ParsedTag;
use crate::tags::TagKind;
use crate::tags::scan_tags;

// ============================================================================
// SECTION: Constants
// ============================================================================

/// Tag names shipped with the wrapped CMS runtime.
const BUILT_IN_TAGS: &[&str] = &[
    "asset",
    "assets",
    "cache",
    "collection",
    "dump",
    "foreach",
    "form",
    "glide",
    "if",
    "elseif",
    "else",
    "unless",
    "link",
    "locales",
    "loop",
    "markdown",
    "mix",
    "nav",
    "obfuscate",
    "partial",
    "path",
    "query",
    "range",
    "redirect",
    "route",
    "scope",
    "section",
    "session",
    "set",
    "structure",
    "svg",
    "taxonomy",
    "theme",
    "trans",
    "user",
    "users",
    "vite",
    "yield",
];

/// Branch continuation tags that sit inside an open conditional.
const BRANCH_NAMES: &[&str] = &["else", "elseif"];

// ============================================================================
// SECTION: Issues and Reports
// ============================================================================

/// Severity of a lint issue.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum LintSeverity {
    /// The template is malformed.
    Error,
    /// The template is suspicious but renderable.
    Warning,
}

/// One lint finding.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LintIssue {
    /// Issue severity.
    pub severity: LintSeverity,
    /// Name of the rule that produced the issue.
    pub rule: &'static str,
    /// One-based line number of the offending occurrence.
    pub line: usize,
    /// Human-readable description.
    pub message: String,
}

/// Aggregate lint result for one template.
#[derive(Debug, Clone, Serialize)]
pub struct LintReport {
    /// All findings, ordered by line.
    pub issues: Vec<LintIssue>,
    /// Number of tags scanned.
    pub tag_count: usize,
}

impl LintReport {
    /// Returns the number of error-severity findings.
    #[must_use]
    pub fn error_count(&self) -> usize {
        self.issues.iter().filter(|issue| issue.severity == LintSeverity::Error).count()
    }

    /// Returns the number of warning-severity findings.
    #[must_use]
    pub fn warning_count(&self) -> usize {
        self.issues.iter().filter(|issue| issue.severity == LintSeverity::Warning).count()
    }

    /// Returns true when no findings were emitted.
    #[must_use]
    pub fn is_clean(&self) -> bool {
        self.issues.is_empty()
    }
}

// ============================================================================
// SECTION: Rule Contract
// ============================================================================

/// One pluggable validation strategy.
pub trait LintRule: Send + Sync {
    /// Returns the rule's stable name.
    fn name(&self) -> &'static str;

    /// Returns whether the rule has anything to say about this template.
    fn applies(&self, _source: &str, _tags: &[ParsedTag]) -> bool {
        true
    }

    /// Emits findings for the template.
    fn check(&self, source: &str, tags: &[ParsedTag]) -> Vec<LintIssue>;
}

// ============================================================================
// SECTION: Syntax Rule
// ============================================================================

/// Flags unbalanced delimiters and empty tags.
pub struct SyntaxRule;

impl LintRule for SyntaxRule {
    fn name(&self) -> &'static str {
        "syntax"
    }

    fn check(&self, source: &str, tags: &[ParsedTag]) -> Vec<LintIssue> {
        let mut issues = Vec::new();
        for (index, line) in source.lines().enumerate() {
            let opens = line.matches("{{").count();
            let closes = line.matches("}}").count();
            if opens != closes {
                issues.push(LintIssue {
                    severity: LintSeverity::Error,
                    rule: self.name(),
                    line: index + 1,
                    message: format!("unbalanced tag delimiters ({opens} \"{{{{\" vs {closes} \"}}}}\")"),
                });
            }
        }
        for tag in tags {
            if tag.name.is_empty() {
                issues.push(LintIssue {
                    severity: LintSeverity::Error,
                    rule: self.name(),
                    line: tag.line,
                    message: "empty tag".to_string(),
                });
            }
        }
        issues
    }
}

// ============================================================================
// SECTION: Known Tag Rule
// ============================================================================

/// Warns when a tag-like occurrence uses an unrecognized name.
///
/// Plain variables are skipped; only conditionals, loops, and namespaced
/// tags are checked, since a bare variable is indistinguishable from a
/// single-word custom tag.
pub struct KnownTagRule {
    /// Accepted tag names, built-in plus configured extras.
    known: BTreeSet<String>,
}

impl KnownTagRule {
    /// Creates the rule with extra accepted tag names.
    #[must_use]
    pub fn new(extra_tags: &[String]) -> Self {
        let mut known: BTreeSet<String> =
            BUILT_IN_TAGS.iter().map(|tag| (*tag).to_string()).collect();
        for tag in extra_tags {
            // Namespaced extras register their root name.
            let root = tag.split(':').next().unwrap_or(tag);
            known.insert(root.to_string());
        }
        Self {
            known,
        }
    }
}

impl LintRule for KnownTagRule {
    fn name(&self) -> &'static str {
        "unknown_tag"
    }

    fn applies(&self, _source: &str, tags: &[ParsedTag]) -> bool {
        tags.iter().any(|tag| tag.kind != TagKind::Variable)
    }

    fn check(&self, _source: &str, tags: &[ParsedTag]) -> Vec<LintIssue> {
        tags.iter()
            .filter(|tag| {
                tag.kind != TagKind::Variable
                    && !tag.name.is_empty()
                    && !self.known.contains(&tag.name)
            })
            .map(|tag| LintIssue {
                severity: LintSeverity::Warning,
                rule: self.name(),
                line: tag.line,
                message: format!("unknown tag '{}'", tag.name),
            })
            .collect()
    }
}

// ============================================================================
// SECTION: Pair Balance Rule
// ============================================================================

/// Tracks open/close tag pairs with a stack.
///
/// Conditionals always require a close. Other tags are treated as paired only
/// when the template closes them somewhere, which keeps bare variables and
/// self-contained tags out of the stack.
pub struct PairBalanceRule;

impl PairBalanceRule {
    /// Returns whether an open tag participates in pair tracking.
    fn is_paired(tag: &ParsedTag, closed_names: &BTreeSet<&str>) -> bool {
        if BRANCH_NAMES.contains(&tag.name.as_str()) {
            return false;
        }
        if tag.kind == TagKind::Conditional {
            return true;
        }
        closed_names.contains(tag.name.as_str())
    }
}

impl LintRule for PairBalanceRule {
    fn name(&self) -> &'static str {
        "pair_balance"
    }

    fn check(&self, _source: &str, tags: &[ParsedTag]) -> Vec<LintIssue> {
        let closed_names: BTreeSet<&str> =
            tags.iter().filter(|tag| tag.closing).map(|tag| tag.name.as_str()).collect();

        let mut issues = Vec::new();
        let mut stack: Vec<&ParsedTag> = Vec::new();
        for tag in tags {
            if tag.closing {
                match stack.last() {
                    Some(open) if open.name == tag.name => {
                        stack.pop();
                    }
                    Some(open) => {
                        if stack.iter().any(|candidate| candidate.name == tag.name) {
                            issues.push(LintIssue {
                                severity: LintSeverity::Error,
                                rule: self.name(),
                                line: tag.line,
                                message: format!(
                                    "cross-nested close '/{}' while '{}' from line {} is open",
                                    tag.name, open.name, open.line
                                ),
                            });
                            // Unwind through the mismatched opens.
                            while let Some(candidate) = stack.pop() {
                                if candidate.name == tag.name {
                                    break;
                                }
                            }
                        } else {
                            issues.push(LintIssue {
                                severity: LintSeverity::Error,
                                rule: self.name(),
                                line: tag.line,
                                message: format!("closing tag '/{}' without a matching open", tag.name),
                            });
                        }
                    }
                    None => {
                        issues.push(LintIssue {
                            severity: LintSeverity::Error,
                            rule: self.name(),
                            line: tag.line,
                            message: format!("closing tag '/{}' without a matching open", tag.name),
                        });
                    }
                }
                continue;
            }
            if BRANCH_NAMES.contains(&tag.name.as_str()) {
                let inside_conditional =
                    stack.iter().any(|open| open.kind == TagKind::Conditional);
                if !inside_conditional {
                    issues.push(LintIssue {
                        severity: LintSeverity::Error,
                        rule: self.name(),
                        line: tag.line,
                        message: format!("'{}' outside of an open conditional", tag.name),
                    });
                }
                continue;
            }
            if Self::is_paired(tag, &closed_names) {
                stack.push(tag);
            }
        }
        for open in stack {
            issues.push(LintIssue {
                severity: LintSeverity::Error,
                rule: self.name(),
                line: open.line,
                message: format!("unclosed tag '{}'", open.name),
            });
        }
        issues
    }
}

// ============================================================================
// SECTION: Linter
// ============================================================================

/// Rule-driven template linter.
pub struct TemplateLinter {
    /// Active validation strategies.
    rules: Vec<Box<dyn LintRule>>,
}

impl TemplateLinter {
    /// Creates a linter with the default rule set.
    #[must_use]
    pub fn new(extra_tags: &[String]) -> Self {
        Self {
            rules: vec![
                Box::new(SyntaxRule),
                Box::new(KnownTagRule::new(extra_tags)),
                Box::new(PairBalanceRule),
            ],
        }
    }

    /// Creates a linter with a custom rule set.
    #[must_use]
    pub fn with_rules(rules: Vec<Box<dyn LintRule>>) -> Self {
        Self {
            rules,
        }
    }

    /// Lints one template.
    #[must_use]
    pub fn lint(&self, source: &str) -> LintReport {
        let tags = scan_tags(source);
        let mut issues = Vec::new();
        for rule in &self.rules {
            if rule.applies(source, &tags) {
                issues.extend(rule.check(source, &tags));
            }
        }
        issues.sort_by_key(|issue| issue.line);
        LintReport {
            issues,
            tag_count: tags.len(),
        }
    }
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

    use super::LintSeverity;
    use super::TemplateLinter;

    fn linter() -> TemplateLinter {
        TemplateLinter::new(&[])
    }

    #[test]
    fn clean_template_reports_nothing() {
        let report = linter().lint(
            "{{ if signed_in }}\n  {{ collection:blog limit=\"5\" }}{{ title }}{{ /collection:blog }}\n{{ /if }}",
        );
        assert!(report.is_clean(), "unexpected issues: {:?}", report.issues.first());
        assert_eq!(report.tag_count, 5);
    }

    #[test]
    fn unbalanced_delimiters_are_syntax_errors() {
        let report = linter().lint("{{ title }\nplain text\n{{ author }}");
        assert_eq!(report.error_count(), 1);
        assert_eq!(report.issues[0].rule, "syntax");
        assert_eq!(report.issues[0].line, 1);
    }

    #[test]
    fn unknown_namespaced_tag_warns() {
        let report = linter().lint("{{ widgetizer:sidebar }}");
        assert_eq!(report.warning_count(), 1);
        assert_eq!(report.issues[0].rule, "unknown_tag");
        assert!(report.issues[0].message.contains("widgetizer"));
    }

    #[test]
    fn extra_tags_suppress_unknown_warnings() {
        let linter = TemplateLinter::new(&["widgetizer:sidebar".to_string()]);
        let report = linter.lint("{{ widgetizer:sidebar }}");
        assert!(report.is_clean());
    }

    #[test]
    fn unclosed_conditional_is_reported_at_its_open_line() {
        let report = linter().lint("{{ title }}\n{{ if signed_in }}\n{{ name }}");
        assert_eq!(report.error_count(), 1);
        assert_eq!(report.issues[0].rule, "pair_balance");
        assert_eq!(report.issues[0].line, 2);
        assert!(report.issues[0].message.contains("unclosed"));
    }

    #[test]
    fn cross_nested_pairs_are_detected() {
        let report = linter().lint("{{ if a }}{{ collection:blog }}{{ /if }}{{ /collection:blog }}");
        assert!(report.error_count() >= 1);
        let cross = report
            .issues
            .iter()
            .find(|issue| issue.message.contains("cross-nested"))
            .expect("expected a cross-nesting error");
        assert_eq!(cross.rule, "pair_balance");
    }

    #[test]
    fn orphan_close_is_an_error() {
        let report = linter().lint("{{ /if }}");
        assert_eq!(report.error_count(), 1);
        assert!(report.issues[0].message.contains("without a matching open"));
    }

    #[test]
    fn else_outside_conditional_is_an_error() {
        let report = linter().lint("{{ else }}");
        assert_eq!(report.error_count(), 1);
        assert!(report.issues[0].message.contains("outside of an open conditional"));
    }

    #[test]
    fn variables_never_join_the_pair_stack() {
        let report = linter().lint("{{ title }}{{ subtitle }}");
        assert!(report.is_clean());
    }

    #[test]
    fn severities_are_split_between_errors_and_warnings() {
        let report = linter().lint("{{ widgetizer:x }}\n{{ if a }}");
        assert_eq!(report.warning_count(), 1);
        assert_eq!(report.error_count(), 1);
        assert!(report.issues.iter().any(|issue| issue.severity == LintSeverity::Warning));
    }
}
