// crates/parchment-lint/src/lib.rs
// ============================================================================
// Module: Parchment Lint Library
// Description: Heuristic linter for Antlers-style template tags.
// Purpose: Surface template problems without a full grammar-driven parser.
// Dependencies: regex, serde
// ============================================================================

//! ## Overview
//! `parchment-lint` scans a template for `{{ ... }}` tag occurrences,
//! classifies each one, and runs a set of pluggable rules over the result.
//! This is pattern matching over lines, not a grammar; rules report what the
//! heuristics can see, including unbalanced open/close pairs via a tag stack.

// ============================================================================
// SECTION: Modules
// ============================================================================

pub mod rules;
pub mod tags;

// ============================================================================
// SECTION: Re-Exports
// ============================================================================

pub use rules::KnownTagRule;
pub use rules::LintIssue;
pub use rules::LintReport;
pub use rules::LintRule;
pub use rules::LintSeverity;
pub use rules::PairBalanceRule;
pub use rules::SyntaxRule;
pub use rules::TemplateLinter;
pub use tags::ParsedTag;
pub use tags::TagKind;
pub use tags::scan_tags;
