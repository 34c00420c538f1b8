//! Code review mini-agent.
//!
//! A five-node graph over the built-in code analysis tools:
//!
//! ```text
//! extract -> check_complexity -> detect_issues -> suggest_improvements -> evaluate_quality
//!                                                        ^                        |
//!                                                        └──── below threshold ───┘
//! ```
//!
//! `evaluate_quality` ends the run once the quality score reaches the
//! threshold, or once `max_loops` suggestion passes have run.

use serde_json::json;
use tracing::debug;

use waypoint_core::error::Result;
use waypoint_core::state::State;
use waypoint_core::traits::NodeLogic;
use waypoint_core::types::{GraphId, ToolTable};
use waypoint_engine::{Engine, GraphDefinition, Node, NodeRegistry};
use waypoint_tools::builtin::code::{
    CodeInput, ComplexityReport, FunctionList, IssueReport, ReviewSummary, Suggestions,
};

/// Fixed id of the installed graph.
pub const CODE_REVIEW_GRAPH_ID: &str = "code_review";
pub const DEFAULT_THRESHOLD: f64 = 0.8;
pub const DEFAULT_MAX_LOOPS: i64 = 3;

pub const STATUS_ACCEPTED: &str = "accepted";
pub const STATUS_STOPPED_MAX_LOOPS: &str = "stopped_max_loops";

fn code_input(state: &State) -> CodeInput {
    CodeInput {
        code: state.get_str("code").unwrap_or_default().to_string(),
    }
}

// ── ExtractNode ─────────────────────────────────────────────────

pub struct ExtractNode;

impl NodeLogic for ExtractNode {
    fn invoke(&self, state: &mut State, tools: &ToolTable) -> Result<Option<String>> {
        let result: FunctionList = tools.call_as("extract_functions", &code_input(state))?;
        state.set("functions", json!(result.functions));
        Ok(None)
    }

    fn required_tools(&self) -> Vec<&str> {
        vec!["extract_functions"]
    }
}

// ── CheckComplexityNode ─────────────────────────────────────────

pub struct CheckComplexityNode;

impl NodeLogic for CheckComplexityNode {
    fn invoke(&self, state: &mut State, tools: &ToolTable) -> Result<Option<String>> {
        let report: ComplexityReport = tools.call_as("check_complexity", &code_input(state))?;
        state.set("complexity", serde_json::to_value(report)?);
        Ok(None)
    }

    fn required_tools(&self) -> Vec<&str> {
        vec!["check_complexity"]
    }
}

// ── DetectIssuesNode ────────────────────────────────────────────

pub struct DetectIssuesNode;

impl NodeLogic for DetectIssuesNode {
    fn invoke(&self, state: &mut State, tools: &ToolTable) -> Result<Option<String>> {
        let report: IssueReport = tools.call_as("detect_issues", &code_input(state))?;
        state.set("issues", json!(report.issues));
        state.set("issue_count", json!(report.issue_count));
        Ok(None)
    }

    fn required_tools(&self) -> Vec<&str> {
        vec!["detect_issues"]
    }
}

// ── SuggestImprovementsNode ─────────────────────────────────────

pub struct SuggestImprovementsNode;

impl NodeLogic for SuggestImprovementsNode {
    fn invoke(&self, state: &mut State, tools: &ToolTable) -> Result<Option<String>> {
        let complexity_score = state
            .get("complexity")
            .and_then(|c| c.get("complexity_score"))
            .and_then(|v| v.as_f64())
            .unwrap_or(0.0);
        let summary = ReviewSummary {
            complexity_score,
            issue_count: state.get_i64_or("issue_count", 0).max(0) as usize,
        };

        let result: Suggestions = tools.call_as("suggest_improvements", &summary)?;
        state.set("suggestions", json!(result.suggestions));
        state.set("quality_score", json!(result.quality_score));
        state.set("iterations", json!(state.get_i64_or("iterations", 0) + 1));
        Ok(None)
    }

    fn required_tools(&self) -> Vec<&str> {
        vec!["suggest_improvements"]
    }
}

// ── EvaluateQualityNode ─────────────────────────────────────────

/// Branch node. Reads `threshold` and `max_loops` from the state, falling
/// back to [`DEFAULT_THRESHOLD`] and [`DEFAULT_MAX_LOOPS`].
pub struct EvaluateQualityNode;

impl NodeLogic for EvaluateQualityNode {
    fn invoke(&self, state: &mut State, _tools: &ToolTable) -> Result<Option<String>> {
        let threshold = state.get_f64_or("threshold", DEFAULT_THRESHOLD);
        let quality = state.get_f64_or("quality_score", 0.0);
        let iterations = state.get_i64_or("iterations", 0);
        let max_loops = state.get_i64_or("max_loops", DEFAULT_MAX_LOOPS);

        if quality >= threshold {
            state.set_str("status", STATUS_ACCEPTED);
            state.set("done", json!(true));
            return Ok(None);
        }

        if iterations >= max_loops {
            state.set_str("status", STATUS_STOPPED_MAX_LOOPS);
            state.set("done", json!(true));
            return Ok(None);
        }

        debug!(quality, threshold, iterations, max_loops, "Quality below threshold, looping");
        Ok(Some("suggest_improvements".to_string()))
    }
}

// ── Registration ────────────────────────────────────────────────

/// Bind the review node logic under its function names.
pub fn register_nodes(nodes: &mut NodeRegistry) {
    nodes.register("extract", ExtractNode);
    nodes.register("check_complexity", CheckComplexityNode);
    nodes.register("detect_issues", DetectIssuesNode);
    nodes.register("suggest_improvements", SuggestImprovementsNode);
    nodes.register("evaluate_quality", EvaluateQualityNode);
}

/// Register the review graph under [`CODE_REVIEW_GRAPH_ID`].
///
/// The node logic is looked up in the engine's node registry, so
/// [`register_nodes`] must have run on it first.
pub fn install_code_review(engine: &mut Engine) -> Result<GraphId> {
    let registry = engine.node_registry();
    let node = |name: &str, description: &str| -> Result<Node> {
        Ok(Node::from_arc(name, registry.get(name)?).with_description(description))
    };

    let graph = GraphDefinition::builder("Code Review Mini-Agent", "extract")
        .id(GraphId::from_string(CODE_REVIEW_GRAPH_ID))
        .node(node("extract", "Extract functions from source code")?)
        .node(node("check_complexity", "Compute a toy complexity score")?)
        .node(node("detect_issues", "Find basic code issues")?)
        .node(node(
            "suggest_improvements",
            "Suggest improvements and compute a quality score",
        )?)
        .node(node(
            "evaluate_quality",
            "Decide whether to loop or stop based on quality score",
        )?)
        .edge("extract", "check_complexity")
        .edge("check_complexity", "detect_issues")
        .edge("detect_issues", "suggest_improvements")
        .edge("suggest_improvements", "evaluate_quality")
        .terminal("evaluate_quality")
        .build()?;

    let graph = engine.add_graph(graph)?;
    Ok(graph.id().clone())
}

/// Initial state for a review of `code`.
pub fn review_state(code: &str, threshold: Option<f64>, max_loops: Option<i64>) -> State {
    let mut state = State::new();
    state.set_str("code", code);
    if let Some(threshold) = threshold {
        state.set("threshold", json!(threshold));
    }
    if let Some(max_loops) = max_loops {
        state.set("max_loops", json!(max_loops));
    }
    state
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use waypoint_core::error::WaypointError;
    use waypoint_tools::ToolRegistry;

    fn engine() -> Engine {
        let mut nodes = NodeRegistry::new();
        register_nodes(&mut nodes);
        Engine::new(Arc::new(ToolRegistry::with_builtins()), Arc::new(nodes))
    }

    fn review(engine: &mut Engine, state: &State) -> waypoint_engine::RunRecord {
        let id = install_code_review(engine).unwrap();
        engine.run(&id, state).unwrap()
    }

    #[test]
    fn test_clean_code_accepted_in_one_pass() {
        let mut engine = engine();
        let run = review(&mut engine, &review_state("def add(a, b):\n    return a + b\n", None, None));

        assert!(run.finished);
        assert_eq!(
            run.path(),
            vec![
                "extract",
                "check_complexity",
                "detect_issues",
                "suggest_improvements",
                "evaluate_quality"
            ]
        );
        assert_eq!(run.state.get_str("status"), Some(STATUS_ACCEPTED));
        assert_eq!(run.state.get("done"), Some(&json!(true)));
        assert_eq!(run.state.get_i64_or("iterations", 0), 1);
        assert_eq!(run.state.get("functions"), Some(&json!(["add"])));
        assert_eq!(run.current_node, None);
    }

    #[test]
    fn test_issues_loop_until_max_loops() {
        let mut engine = engine();
        let code = "def f():\n    print('x')  # TODO\n";
        let run = review(&mut engine, &review_state(code, None, None));

        assert_eq!(run.state.get_str("status"), Some(STATUS_STOPPED_MAX_LOOPS));
        assert_eq!(run.state.get_i64_or("iterations", 0), 3);
        assert_eq!(run.state.get_i64_or("issue_count", 0), 2);
        assert_eq!(run.log.len(), 9);
        assert_eq!(run.log[4].next_override.as_deref(), Some("suggest_improvements"));
        assert_eq!(run.log[5].node, "suggest_improvements");
        assert_eq!(run.log[8].next_override, None);
    }

    #[test]
    fn test_lower_threshold_accepts() {
        let mut engine = engine();
        let code = "def f():\n    print('x')  # TODO\n";
        let run = review(&mut engine, &review_state(code, Some(0.5), None));

        assert_eq!(run.state.get_str("status"), Some(STATUS_ACCEPTED));
        assert_eq!(run.log.len(), 5);
    }

    #[test]
    fn test_single_loop_budget() {
        let mut engine = engine();
        let run = review(&mut engine, &review_state("print(1)\n", Some(0.99), Some(1)));

        assert_eq!(run.state.get_str("status"), Some(STATUS_STOPPED_MAX_LOOPS));
        assert_eq!(run.state.get_i64_or("iterations", 0), 1);
    }

    #[test]
    fn test_missing_code_reviews_empty_source() {
        let mut engine = engine();
        let run = review(&mut engine, &State::new());

        assert_eq!(run.state.get("functions"), Some(&json!([])));
        assert_eq!(run.state.get_str("status"), Some(STATUS_ACCEPTED));
    }

    #[test]
    fn test_install_uses_fixed_id() {
        let mut engine = engine();
        let id = install_code_review(&mut engine).unwrap();
        assert_eq!(id.as_str(), CODE_REVIEW_GRAPH_ID);

        let graph = engine.get_graph(&id).unwrap();
        assert_eq!(graph.name(), "Code Review Mini-Agent");
        assert_eq!(graph.successor("suggest_improvements"), Some("evaluate_quality"));
        assert_eq!(graph.successor("evaluate_quality"), None);
        assert_eq!(
            graph.node("extract").unwrap().description,
            "Extract functions from source code"
        );

        // Reinstalling replaces rather than duplicates.
        install_code_review(&mut engine).unwrap();
        assert_eq!(engine.graph_count(), 1);
    }

    #[test]
    fn test_install_requires_tools() {
        let mut nodes = NodeRegistry::new();
        register_nodes(&mut nodes);
        let mut engine = Engine::new(Arc::new(ToolRegistry::new()), Arc::new(nodes));

        let err = install_code_review(&mut engine).unwrap_err();
        assert!(matches!(err, WaypointError::ToolNotFound(_)));
        assert_eq!(engine.graph_count(), 0);
    }

    #[test]
    fn test_install_requires_nodes() {
        let mut engine = Engine::new(
            Arc::new(ToolRegistry::with_builtins()),
            Arc::new(NodeRegistry::new()),
        );
        let err = install_code_review(&mut engine).unwrap_err();
        assert!(matches!(err, WaypointError::UnknownNodeFunction(name) if name == "extract"));
    }

    #[test]
    fn test_evaluate_quality_defaults() {
        let mut state = State::new();
        state.set("quality_score", json!(0.79));
        state.set("iterations", json!(2));
        let next = EvaluateQualityNode
            .invoke(&mut state, &ToolTable::new())
            .unwrap();
        assert_eq!(next.as_deref(), Some("suggest_improvements"));
        assert!(state.get("status").is_none());
    }
}
