// crates/parchment-mcp/src/domains/templates.rs
// ============================================================================
// Module: Template Lint Tool
// Description: Template source linting exposed as a direct tool.
// Purpose: Validate template tag syntax before content is published.
// Dependencies: parchment-core, parchment-lint, serde_json
// ============================================================================

//! ## Overview
//! `templates.lint` runs the tag linter over a template source string and
//! returns the full issue list. The call itself succeeds even when the
//! template has errors; `valid` tells the caller whether it is publishable.

// ============================================================================
// SECTION: Imports
// ============================================================================

use parchment_core::ErrorKind;
use parchment_core::ToolFailure;
use parchment_core::ToolHandler;
use parchment_lint::TemplateLinter;
use serde_json::Value;
use serde_json::json;

use crate::registry::ToolDefinition;

// ============================================================================
// SECTION: Tool
// ============================================================================

/// Direct tool wrapping the template linter.
pub struct TemplateLintTool {
    /// Configured linter instance.
    linter: TemplateLinter,
}

impl TemplateLintTool {
    /// Creates the tool with extra tag names registered.
    #[must_use]
    pub fn new(extra_tags: &[String]) -> Self {
        Self {
            linter: TemplateLinter::new(extra_tags),
        }
    }

    /// MCP definition for this tool.
    #[must_use]
    pub fn definition() -> ToolDefinition {
        ToolDefinition {
            name: "templates.lint".to_string(),
            description: "Lint template source for tag syntax problems".to_string(),
            input_schema: json!({
                "type": "object",
                "properties": {
                    "template": {
                        "type": "string",
                        "description": "Template source to lint",
                    },
                },
                "required": ["template"],
                "additionalProperties": false,
            }),
        }
    }
}

impl ToolHandler for TemplateLintTool {
    fn name(&self) -> &str {
        "templates.lint"
    }

    fn execute(&self, arguments: &Value) -> Result<Value, ToolFailure> {
        let source = arguments.get("template").and_then(Value::as_str).ok_or_else(|| {
            ToolFailure::new(
                ErrorKind::ValidationFailed,
                "argument 'template' must be a string",
            )
        })?;
        let report = self.linter.lint(source);
        let valid = report.error_count() == 0;
        let issues = serde_json::to_value(&report.issues)
            .map_err(|err| ToolFailure::internal(format!("lint report serialization: {err}")))?;
        Ok(json!({
            "valid": valid,
            "error_count": report.error_count(),
            "warning_count": report.warning_count(),
            "tag_count": report.tag_count,
            "issues": issues,
        }))
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

    use parchment_core::ErrorKind;
    use parchment_core::ToolHandler;
    use serde_json::json;

    use super::TemplateLintTool;

    #[test]
    fn clean_template_is_valid() {
        let tool = TemplateLintTool::new(&[]);
        let result = tool
            .execute(&json!({"template": "{{ if signed_in }}{{ title }}{{ /if }}"}))
            .unwrap();
        assert_eq!(result["valid"], true);
        assert_eq!(result["error_count"], 0);
    }

    #[test]
    fn broken_template_reports_issues_without_failing_the_call() {
        let tool = TemplateLintTool::new(&[]);
        let result = tool
            .execute(&json!({"template": "{{ if signed_in }}never closed"}))
            .unwrap();
        assert_eq!(result["valid"], false);
        assert!(result["issues"].as_array().is_some_and(|issues| !issues.is_empty()));
    }

    #[test]
    fn missing_template_argument_fails_validation() {
        let tool = TemplateLintTool::new(&[]);
        let error = tool.execute(&json!({})).unwrap_err();
        assert_eq!(error.kind, ErrorKind::ValidationFailed);
    }

    #[test]
    fn extra_tags_are_honored() {
        let tool = TemplateLintTool::new(&["seo_pro".to_string()]);
        let result = tool.execute(&json!({"template": "{{ seo_pro:meta }}"})).unwrap();
        assert_eq!(result["valid"], true);
    }
}
