// crates/parchment-core/src/router.rs
// ============================================================================
// Module: Action Router
// Description: Action dispatch with a destructive-operation safety gate.
// Purpose: Route domain actions and enforce dry-run/confirm before mutations.
// Dependencies: serde, serde_json, crate::{envelope, errors, store, tool}
// ============================================================================

//! ## Overview
//! A router groups the actions of one content domain behind a single tool.
//! Each action is declared up front with its argument contract and a
//! destructive flag. Destructive actions are gated: without `dry_run` or
//! `confirm` the router refuses and explains both paths, with `dry_run` it
//! simulates without touching the mutation path, and only with `confirm` does
//! the real handler run.
//!
//! ## Invariants
//! - `dry_run` wins over `confirm`; a simulated call never mutates.
//! - Refusal and simulation payloads are envelope-shaped so the executor
//!   passes them through unchanged.
//! - Meta-actions (`help`, `discover`, `examples`) are pure.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::sync::Arc;

use serde::Serialize;
use serde_json::Value;
use serde_json::json;

use crate::envelope::ResponseMeta;
use crate::errors::ErrorKind;
use crate::errors::ToolFailure;
use crate::store::RuntimeInspector;
use crate::tool::ToolHandler;

// ============================================================================
// SECTION: Descriptors
// ============================================================================

/// Static description of one routable action.
///
/// # Invariants
/// - `destructive` is declarative; the gate consults only this flag.
#[derive(Debug, Clone, Copy)]
pub struct ActionDescriptor {
    /// Action name as supplied in the `action` argument.
    pub name: &'static str,
    /// One-line description for manifests.
    pub description: &'static str,
    /// When to reach for this action.
    pub purpose: &'static str,
    /// Arguments that must be present and non-null.
    pub required_args: &'static [&'static str],
    /// Arguments the action understands but does not require.
    pub optional_args: &'static [&'static str],
    /// Worked invocation examples.
    pub examples: &'static [&'static str],
    /// Whether this action mutates or removes content.
    pub destructive: bool,
}

/// Static description of a domain data type exposed by a router.
#[derive(Debug, Clone, Copy)]
pub struct TypeDescriptor {
    /// Type name.
    pub name: &'static str,
    /// One-line shape description.
    pub description: &'static str,
}

/// Structured outcome of a dry-run simulation.
#[derive(Debug, Clone, Serialize)]
pub struct SimulationReport {
    /// Preview of the state the mutation would produce.
    pub preview: Value,
    /// Concrete changes the real call would make.
    pub expected_changes: Vec<String>,
    /// Risks worth flagging before confirming.
    pub risks: Vec<String>,
    /// Suggested follow-up steps.
    pub recommendations: Vec<String>,
}

impl SimulationReport {
    /// Builds a minimal report naming the gated action.
    #[must_use]
    pub fn generic(action: &str) -> Self {
        Self {
            preview: Value::Null,
            expected_changes: vec![format!("would execute action '{action}'")],
            risks: vec!["changes cannot be previewed for this action".to_string()],
            recommendations: vec![format!("re-run '{action}' with confirm=true to apply")],
        }
    }
}

// ============================================================================
// SECTION: Safety Gate
// ============================================================================

/// Outcome of the destructive-operation gate.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SafetyDecision {
    /// Refuse and explain both safety paths.
    Refuse,
    /// Simulate without invoking the mutation path.
    Simulate,
    /// Run the real handler.
    Execute {
        /// Whether the call passed through the gate via `confirm`.
        safety_gated: bool,
    },
}

/// Deployment policy for the safety gate.
#[derive(Debug, Clone, Copy, Default)]
pub struct SafetyPolicy {
    /// When set, destructive actions execute without gating.
    pub bypass: bool,
}

/// Evaluates the gate for one invocation.
///
/// `dry_run` takes precedence over `confirm`; a bypassing deployment skips
/// the gate entirely for real execution.
#[must_use]
pub const fn evaluate_safety(
    destructive: bool,
    dry_run: bool,
    confirm: bool,
    bypass: bool,
) -> SafetyDecision {
    if !destructive {
        return SafetyDecision::Execute {
            safety_gated: false,
        };
    }
    if dry_run {
        return SafetyDecision::Simulate;
    }
    if bypass {
        return SafetyDecision::Execute {
            safety_gated: false,
        };
    }
    if confirm {
        return SafetyDecision::Execute {
            safety_gated: true,
        };
    }
    SafetyDecision::Refuse
}

// ============================================================================
// SECTION: Router Contract
// ============================================================================

/// One content domain's action surface.
pub trait Router: Send + Sync {
    /// Returns the domain name, which doubles as the tool name.
    fn domain(&self) -> &'static str;

    /// Returns a one-line domain description.
    fn description(&self) -> &'static str;

    /// Returns the manifest schema version.
    fn schema_version(&self) -> &'static str {
        "1"
    }

    /// Returns the declared actions.
    fn actions(&self) -> &'static [ActionDescriptor];

    /// Returns the domain data types.
    fn types(&self) -> &'static [TypeDescriptor] {
        &[]
    }

    /// Returns names of related tools worth discovering next.
    fn related_tools(&self) -> &'static [&'static str] {
        &[]
    }

    /// Returns suggested usage patterns, ordered by typical workflow.
    fn usage_patterns(&self) -> &'static [&'static str] {
        &[]
    }

    /// Returns the shared services this domain is wired against.
    fn dependencies(&self) -> &'static [&'static str] {
        &[]
    }

    /// Executes one action against validated arguments.
    ///
    /// # Errors
    ///
    /// Returns a classified [`ToolFailure`] on any handled error.
    fn execute_action(&self, action: &str, arguments: &Value) -> Result<Value, ToolFailure>;

    /// Simulates a destructive action without mutating.
    ///
    /// The default report names the action and recommends confirming.
    fn simulate(&self, action: &str, _arguments: &Value) -> SimulationReport {
        SimulationReport::generic(action)
    }
}

// ============================================================================
// SECTION: Router Tool
// ============================================================================

/// Adapter exposing a [`Router`] as a single executable tool.
pub struct RouterTool {
    /// The routed domain.
    router: Arc<dyn Router>,
    /// Runtime version source for response metadata.
    runtime: Arc<dyn RuntimeInspector>,
    /// Deployment gate policy.
    safety: SafetyPolicy,
}

impl RouterTool {
    /// Creates a tool over the given router.
    #[must_use]
    pub fn new(
        router: Arc<dyn Router>,
        runtime: Arc<dyn RuntimeInspector>,
        safety: SafetyPolicy,
    ) -> Self {
        Self {
            router,
            runtime,
            safety,
        }
    }

    /// Builds extended response metadata for an action outcome.
    fn action_meta(&self, action: &str, dry_run: bool, safety_gated: bool) -> Value {
        let meta = ResponseMeta::new(self.router.domain(), &self.runtime.versions());
        json!({
            "tool": meta.tool,
            "timestamp": meta.timestamp,
            "runtime_version": meta.runtime_version,
            "server_version": meta.server_version,
            "action": action,
            "dry_run": dry_run,
            "safety_gated": safety_gated,
        })
    }

    /// Builds the refusal payload for an ungated destructive call.
    fn refusal(&self, action: &str) -> Value {
        json!({
            "success": false,
            "error": "safety_protocol_required",
            "errors": [ErrorKind::UnsafeOperation.message()],
            "action": action,
            "guidance": {
                "dry_run": format!(
                    "re-run '{action}' with dry_run=true to preview the change"
                ),
                "confirm": format!(
                    "re-run '{action}' with confirm=true to execute it"
                ),
            },
            "warnings": [],
            "meta": self.action_meta(action, false, false),
        })
    }

    /// Builds the simulation payload for a dry run.
    fn simulation(&self, action: &str, arguments: &Value) -> Value {
        let report = self.router.simulate(action, arguments);
        json!({
            "success": true,
            "data": {
                "simulation": true,
                "would_execute": action,
                "preview": report.preview,
                "expected_changes": report.expected_changes,
                "risks": report.risks,
                "recommendations": report.recommendations,
            },
            "warnings": [],
            "meta": self.action_meta(action, true, false),
        })
    }

    /// Builds the help payload.
    fn help(&self) -> Value {
        let actions: Vec<Value> = self
            .router
            .actions()
            .iter()
            .map(|action| {
                json!({
                    "name": action.name,
                    "description": action.description,
                    "purpose": action.purpose,
                    "required_args": action.required_args,
                    "optional_args": action.optional_args,
                    "destructive": action.destructive,
                })
            })
            .collect();
        let types: Vec<Value> = self
            .router
            .types()
            .iter()
            .map(|ty| json!({ "name": ty.name, "description": ty.description }))
            .collect();
        json!({
            "domain": self.router.domain(),
            "description": self.router.description(),
            "actions": actions,
            "types": types,
            "patterns": self.router.usage_patterns(),
            "context": {
                "related_tools": self.router.related_tools(),
            },
            "safety": {
                "destructive_actions": self.destructive_action_names(),
                "protocol": "destructive actions require dry_run=true or confirm=true",
            },
        })
    }

    /// Builds the discovery manifest.
    fn discover(&self) -> Value {
        let actions: Vec<Value> = self
            .router
            .actions()
            .iter()
            .map(|action| {
                json!({
                    "name": action.name,
                    "description": action.description,
                    "destructive": action.destructive,
                })
            })
            .collect();
        json!({
            "domain": self.router.domain(),
            "description": self.router.description(),
            "primary_use": self.router.description(),
            "schema_version": self.router.schema_version(),
            "features": self.feature_names(),
            "workflow": self.router.usage_patterns(),
            "decision_tree": self.decision_tree(),
            "actions": actions,
            "types": self
                .router
                .types()
                .iter()
                .map(|ty| ty.name)
                .collect::<Vec<_>>(),
            "dependencies": self.router.dependencies(),
            "related_tools": self.router.related_tools(),
            "destructive_actions": self.destructive_action_names(),
        })
    }

    /// Returns capability feature names derived from the action table.
    fn feature_names(&self) -> Vec<&'static str> {
        let mut features = vec!["discovery"];
        if self.router.actions().iter().any(|action| !action.destructive) {
            features.push("read");
        }
        if self.router.actions().iter().any(|action| action.destructive) {
            features.push("mutation");
            features.push("simulation");
            features.push("safety_gate");
        }
        features
    }

    /// Builds the discovery decision tree from patterns and the action table.
    fn decision_tree(&self) -> Vec<Value> {
        let mut steps = vec![json!({
            "when": "unfamiliar with this domain",
            "call": "help",
        })];
        for pattern in self.router.usage_patterns() {
            steps.push(json!({ "guidance": pattern }));
        }
        for action in self.destructive_action_names() {
            steps.push(json!({
                "when": format!("about to run '{action}'"),
                "call": format!("{action} with dry_run=true first"),
            }));
        }
        steps
    }

    /// Builds the worked-examples payload.
    fn examples(&self) -> Value {
        let examples: Vec<Value> = self
            .router
            .actions()
            .iter()
            .filter(|action| !action.examples.is_empty())
            .map(|action| json!({ "action": action.name, "examples": action.examples }))
            .collect();
        json!({ "domain": self.router.domain(), "examples": examples })
    }

    /// Returns the names of declared destructive actions.
    fn destructive_action_names(&self) -> Vec<&'static str> {
        self.router
            .actions()
            .iter()
            .filter(|action| action.destructive)
            .map(|action| action.name)
            .collect()
    }

    /// Returns the names of all declared actions plus meta-actions.
    fn known_action_names(&self) -> Vec<&'static str> {
        let mut names = vec!["help", "discover", "examples"];
        names.extend(self.router.actions().iter().map(|action| action.name));
        names
    }
}

impl ToolHandler for RouterTool {
    fn name(&self) -> &str {
        self.router.domain()
    }

    fn execute(&self, arguments: &Value) -> Result<Value, ToolFailure> {
        let Some(action) = arguments.get("action").and_then(Value::as_str) else {
            return Err(ToolFailure::invalid("missing required argument: action"));
        };

        match action {
            "help" => return Ok(self.help()),
            "discover" => return Ok(self.discover()),
            "examples" => return Ok(self.examples()),
            _ => {}
        }

        let Some(descriptor) =
            self.router.actions().iter().find(|candidate| candidate.name == action)
        else {
            return Err(ToolFailure::invalid(format!(
                "unknown action '{action}'; known actions: {}",
                self.known_action_names().join(", ")
            )));
        };

        let missing: Vec<&str> = descriptor
            .required_args
            .iter()
            .filter(|arg| arguments.get(**arg).is_none_or(Value::is_null))
            .copied()
            .collect();
        if !missing.is_empty() {
            return Err(ToolFailure::new(
                ErrorKind::ValidationFailed,
                format!("missing required arguments: {}", missing.join(", ")),
            ));
        }

        let dry_run = arguments.get("dry_run").and_then(Value::as_bool).unwrap_or(false);
        let confirm = arguments.get("confirm").and_then(Value::as_bool).unwrap_or(false);

        match evaluate_safety(descriptor.destructive, dry_run, confirm, self.safety.bypass) {
            SafetyDecision::Refuse => Ok(self.refusal(action)),
            SafetyDecision::Simulate => Ok(self.simulation(action, arguments)),
            SafetyDecision::Execute {
                safety_gated,
            } => {
                let result = self.router.execute_action(action, arguments)?;
                Ok(json!({
                    "success": true,
                    "data": result,
                    "warnings": [],
                    "meta": self.action_meta(action, false, safety_gated),
                }))
            }
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

    use std::sync::Arc;
    use std::sync::atomic::AtomicU32;
    use std::sync::atomic::Ordering;

    use serde_json::Value;
    use serde_json::json;

    use super::ActionDescriptor;
    use super::Router;
    use super::RouterTool;
    use super::SafetyDecision;
    use super::SafetyPolicy;
    use super::evaluate_safety;
    use crate::errors::ErrorKind;
    use crate::errors::ToolFailure;
    use crate::store::StaticRuntimeInspector;
    use crate::tool::ToolHandler;

    const ACTIONS: &[ActionDescriptor] = &[
        ActionDescriptor {
            name: "list",
            description: "List entries",
            purpose: "Browse entries in a collection",
            required_args: &["collection"],
            optional_args: &["limit"],
            examples: &[r#"{"action": "list", "collection": "blog"}"#],
            destructive: false,
        },
        ActionDescriptor {
            name: "delete",
            description: "Delete an entry",
            purpose: "Remove an entry permanently",
            required_args: &["collection", "id"],
            optional_args: &[],
            examples: &[],
            destructive: true,
        },
    ];

    struct TestRouter {
        mutations: AtomicU32,
    }

    impl Router for TestRouter {
        fn domain(&self) -> &'static str {
            "entries"
        }

        fn description(&self) -> &'static str {
            "Entry management"
        }

        fn actions(&self) -> &'static [ActionDescriptor] {
            ACTIONS
        }

        fn usage_patterns(&self) -> &'static [&'static str] {
            &["list before delete"]
        }

        fn dependencies(&self) -> &'static [&'static str] {
            &["content store"]
        }

        fn execute_action(&self, action: &str, _arguments: &Value) -> Result<Value, ToolFailure> {
            if action == "delete" {
                self.mutations.fetch_add(1, Ordering::Relaxed);
                return Ok(json!({"deleted": true}));
            }
            Ok(json!({"items": []}))
        }
    }

    fn tool() -> (RouterTool, Arc<TestRouter>) {
        let router = Arc::new(TestRouter {
            mutations: AtomicU32::new(0),
        });
        let tool = RouterTool::new(
            router.clone(),
            Arc::new(StaticRuntimeInspector::unknown()),
            SafetyPolicy::default(),
        );
        (tool, router)
    }

    #[test]
    fn gate_decision_table() {
        let execute = |gated| SafetyDecision::Execute {
            safety_gated: gated,
        };
        assert_eq!(evaluate_safety(false, false, false, false), execute(false));
        assert_eq!(evaluate_safety(true, false, false, false), SafetyDecision::Refuse);
        assert_eq!(evaluate_safety(true, true, false, false), SafetyDecision::Simulate);
        assert_eq!(evaluate_safety(true, true, true, false), SafetyDecision::Simulate);
        assert_eq!(evaluate_safety(true, false, true, false), execute(true));
        assert_eq!(evaluate_safety(true, false, false, true), execute(false));
    }

    #[test]
    fn ungated_delete_refuses_with_both_hints() {
        let (tool, router) = tool();
        let value = tool
            .execute(&json!({"action": "delete", "collection": "blog", "id": "post-1"}))
            .unwrap();
        assert_eq!(value["success"], false);
        assert_eq!(value["error"], "safety_protocol_required");
        assert_eq!(value["errors"][0], ErrorKind::UnsafeOperation.message());
        let guidance = &value["guidance"];
        assert!(guidance["dry_run"].as_str().unwrap().contains("dry_run=true"));
        assert!(guidance["confirm"].as_str().unwrap().contains("confirm=true"));
        assert!(value["meta"]["tool"] == "entries");
        assert_eq!(router.mutations.load(Ordering::Relaxed), 0);
    }

    #[test]
    fn dry_run_simulates_without_mutating() {
        let (tool, router) = tool();
        let value = tool
            .execute(&json!({
                "action": "delete",
                "collection": "blog",
                "id": "post-1",
                "dry_run": true,
            }))
            .unwrap();
        assert_eq!(value["success"], true);
        assert_eq!(value["data"]["simulation"], true);
        assert_eq!(value["data"]["would_execute"], "delete");
        assert!(value["data"]["expected_changes"].as_array().is_some());
        assert!(value["data"]["risks"].as_array().is_some());
        assert!(value["data"]["recommendations"].as_array().is_some());
        assert_eq!(value["meta"]["dry_run"], true);
        assert_eq!(router.mutations.load(Ordering::Relaxed), 0);
    }

    #[test]
    fn dry_run_wins_over_confirm() {
        let (tool, router) = tool();
        let value = tool
            .execute(&json!({
                "action": "delete",
                "collection": "blog",
                "id": "post-1",
                "dry_run": true,
                "confirm": true,
            }))
            .unwrap();
        assert_eq!(value["data"]["simulation"], true);
        assert_eq!(router.mutations.load(Ordering::Relaxed), 0);
    }

    #[test]
    fn confirmed_delete_executes_with_gated_meta() {
        let (tool, router) = tool();
        let value = tool
            .execute(&json!({
                "action": "delete",
                "collection": "blog",
                "id": "post-1",
                "confirm": true,
            }))
            .unwrap();
        assert_eq!(value["success"], true);
        assert_eq!(value["data"]["deleted"], true);
        assert_eq!(value["meta"]["action"], "delete");
        assert_eq!(value["meta"]["dry_run"], false);
        assert_eq!(value["meta"]["safety_gated"], true);
        assert_eq!(router.mutations.load(Ordering::Relaxed), 1);
    }

    #[test]
    fn bypass_policy_executes_without_gating() {
        let router = Arc::new(TestRouter {
            mutations: AtomicU32::new(0),
        });
        let tool = RouterTool::new(
            router.clone(),
            Arc::new(StaticRuntimeInspector::unknown()),
            SafetyPolicy {
                bypass: true,
            },
        );
        let value = tool
            .execute(&json!({"action": "delete", "collection": "blog", "id": "post-1"}))
            .unwrap();
        assert_eq!(value["success"], true);
        assert_eq!(value["meta"]["safety_gated"], false);
        assert_eq!(router.mutations.load(Ordering::Relaxed), 1);
    }

    #[test]
    fn non_destructive_actions_skip_the_gate() {
        let (tool, _) = tool();
        let value = tool.execute(&json!({"action": "list", "collection": "blog"})).unwrap();
        assert_eq!(value["success"], true);
        assert_eq!(value["meta"]["safety_gated"], false);
    }

    #[test]
    fn unknown_action_lists_known_names() {
        let (tool, _) = tool();
        let error = tool.execute(&json!({"action": "obliterate"})).unwrap_err();
        assert_eq!(error.kind, ErrorKind::InvalidInput);
        assert!(error.message.contains("help"));
        assert!(error.message.contains("list"));
        assert!(error.message.contains("delete"));
    }

    #[test]
    fn missing_required_arguments_fail_validation() {
        let (tool, _) = tool();
        let error = tool.execute(&json!({"action": "delete", "collection": "blog"})).unwrap_err();
        assert_eq!(error.kind, ErrorKind::ValidationFailed);
        assert!(error.message.contains("id"));
    }

    #[test]
    fn meta_actions_are_pure_and_descriptive() {
        let (tool, router) = tool();
        let help = tool.execute(&json!({"action": "help"})).unwrap();
        assert_eq!(help["domain"], "entries");
        assert_eq!(help["safety"]["destructive_actions"][0], "delete");

        let manifest = tool.execute(&json!({"action": "discover"})).unwrap();
        assert_eq!(manifest["schema_version"], "1");
        assert_eq!(manifest["actions"].as_array().unwrap().len(), 2);
        let features = manifest["features"].as_array().unwrap();
        assert!(features.contains(&json!("read")));
        assert!(features.contains(&json!("mutation")));
        assert!(features.contains(&json!("safety_gate")));
        assert_eq!(manifest["dependencies"], json!(["content store"]));
        let tree = manifest["decision_tree"].as_array().unwrap();
        assert_eq!(tree[0]["call"], "help");
        assert!(tree.iter().any(|step| step["guidance"] == "list before delete"));
        assert!(tree.iter().any(|step| step["when"] == "about to run 'delete'"));
        assert_eq!(manifest["workflow"], json!(["list before delete"]));

        let examples = tool.execute(&json!({"action": "examples"})).unwrap();
        assert_eq!(examples["examples"][0]["action"], "list");
        assert_eq!(router.mutations.load(Ordering::Relaxed), 0);
    }
}
