use std::collections::HashMap;
use std::sync::Arc;
use std::time::Instant;

use serde::Serialize;
use tracing::{debug, error, info, warn};

use waypoint_core::config::DEFAULT_MAX_STEPS;
use waypoint_core::error::{Result, WaypointError};
use waypoint_core::state::State;
use waypoint_core::types::{GraphId, GraphSpec, RunId};
use waypoint_tools::ToolRegistry;

use crate::graph::{GraphDefinition, Node, RunRecord, StepEntry, Transition};
use crate::registry::NodeRegistry;

/// Listing entry for a registered graph.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GraphSummary {
    pub id: GraphId,
    pub name: String,
    pub start_node: String,
    pub nodes: Vec<String>,
}

/// Owns graph and run storage and drives runs.
///
/// The registries are built once at startup and injected here; the engine
/// never mutates them. Runs execute synchronously inside [`Engine::run_graph`].
pub struct Engine {
    tools: Arc<ToolRegistry>,
    nodes: Arc<NodeRegistry>,
    graphs: HashMap<GraphId, Arc<GraphDefinition>>,
    runs: HashMap<RunId, RunRecord>,
    max_steps: usize,
}

impl Engine {
    pub fn new(tools: Arc<ToolRegistry>, nodes: Arc<NodeRegistry>) -> Self {
        Self {
            tools,
            nodes,
            graphs: HashMap::new(),
            runs: HashMap::new(),
            max_steps: DEFAULT_MAX_STEPS,
        }
    }

    /// Set the step ceiling used by [`Engine::run`].
    pub fn with_max_steps(mut self, max_steps: usize) -> Self {
        self.max_steps = max_steps;
        self
    }

    pub fn max_steps(&self) -> usize {
        self.max_steps
    }

    pub fn node_registry(&self) -> &NodeRegistry {
        &self.nodes
    }

    // ── Graph management ────────────────────────────────────────

    /// Register a graph built with [`GraphDefinition::builder`].
    ///
    /// Replaces any graph with the same id.
    pub fn add_graph(&mut self, graph: GraphDefinition) -> Result<Arc<GraphDefinition>> {
        self.check_required_tools(&graph)?;

        let graph = Arc::new(graph);
        if self
            .graphs
            .insert(graph.id().clone(), Arc::clone(&graph))
            .is_some()
        {
            debug!(graph_id = %graph.id(), "Replaced graph");
        }
        info!(
            graph_id = %graph.id(),
            name = %graph.name(),
            start_node = %graph.start_node(),
            "Registered graph"
        );
        Ok(graph)
    }

    /// Resolve a spec against the node registry and register the result.
    ///
    /// Nothing is stored unless every node function resolves, the start node
    /// is declared, every edge endpoint is declared, and every tool the nodes
    /// need is registered.
    pub fn create_graph_from_spec(&mut self, spec: &GraphSpec) -> Result<Arc<GraphDefinition>> {
        let mut builder = GraphDefinition::builder(&spec.name, &spec.start_node);
        for (node_name, function) in &spec.nodes {
            let logic = self.nodes.get(function)?;
            builder = builder.node(Node::from_arc(node_name, logic));
        }

        let graph = builder
            .edges(spec.edges.iter().map(|(from, to)| (from.clone(), to.clone())))
            .build()?;

        self.add_graph(graph)
    }

    /// Get a graph by id.
    pub fn get_graph(&self, graph_id: &GraphId) -> Result<&Arc<GraphDefinition>> {
        self.graphs
            .get(graph_id)
            .ok_or_else(|| WaypointError::GraphNotFound(graph_id.to_string()))
    }

    /// Summaries of all registered graphs, sorted by name then id.
    pub fn list_graphs(&self) -> Vec<GraphSummary> {
        let mut summaries: Vec<GraphSummary> = self
            .graphs
            .values()
            .map(|g| GraphSummary {
                id: g.id().clone(),
                name: g.name().to_string(),
                start_node: g.start_node().to_string(),
                nodes: g.node_names().into_iter().map(str::to_string).collect(),
            })
            .collect();
        summaries.sort_by(|a, b| a.name.cmp(&b.name).then_with(|| a.id.cmp(&b.id)));
        summaries
    }

    pub fn graph_count(&self) -> usize {
        self.graphs.len()
    }

    fn check_required_tools(&self, graph: &GraphDefinition) -> Result<()> {
        for node in graph.nodes() {
            for tool in node.logic.required_tools() {
                if !self.tools.contains(tool) {
                    warn!(node = %node.name, tool, "Node requires an unregistered tool");
                    return Err(WaypointError::ToolNotFound(tool.to_string()));
                }
            }
        }
        Ok(())
    }

    // ── Execution ───────────────────────────────────────────────

    /// Run a graph with the engine's configured step ceiling.
    pub fn run(&mut self, graph_id: &GraphId, initial_state: &State) -> Result<RunRecord> {
        let max_steps = self.max_steps;
        self.run_graph(graph_id, initial_state, max_steps)
    }

    /// Run a graph from its start node until a terminal transition or until
    /// `max_steps` nodes have been invoked.
    ///
    /// The run is stored before the first step. On success the stored record
    /// is finished and a copy is returned. If a node fails, or overrides to a
    /// node the graph does not declare, the error is returned and the stored
    /// record stays unfinished with its partial log.
    pub fn run_graph(
        &mut self,
        graph_id: &GraphId,
        initial_state: &State,
        max_steps: usize,
    ) -> Result<RunRecord> {
        let graph = Arc::clone(self.get_graph(graph_id)?);
        let tools = self.tools.all();
        let run_id = RunId::new();

        info!(run_id = %run_id, graph_id = %graph_id, max_steps, "Starting graph run");

        let run = self.runs.entry(run_id.clone()).or_insert_with(|| {
            RunRecord::new(
                run_id.clone(),
                graph_id.clone(),
                initial_state.clone(),
                graph.start_node(),
            )
        });

        let start = Instant::now();
        let mut step = 0;

        while step < max_steps {
            let Some(current) = run.current_node.clone() else {
                break;
            };

            // Unreachable while transitions are checked below
            let node = graph
                .node(&current)
                .ok_or_else(|| WaypointError::InvalidTransition {
                    run_id: run_id.to_string(),
                    from: run.log.last().map(|e| e.node.clone()).unwrap_or_default(),
                    to: current.clone(),
                })?;

            let before = run.state.clone();
            let node_start = Instant::now();

            let next_override = match node.invoke(&mut run.state, &tools) {
                Ok(next) => next,
                Err(e) => {
                    error!(run_id = %run_id, node = %current, step, error = %e, "Graph node failed");
                    return Err(WaypointError::NodeFailed {
                        run_id: run_id.to_string(),
                        node: current,
                        message: e.to_string(),
                    });
                }
            };

            let elapsed_ms = node_start.elapsed().as_millis() as u64;
            run.log.push(StepEntry {
                step,
                node: current.clone(),
                before,
                after: run.state.clone(),
                next_override: next_override.clone(),
                elapsed_ms,
            });

            let transition = Transition::resolve(next_override.as_deref(), graph.successor(&current));
            if let Some(next) = transition.target() {
                if !graph.contains(next) {
                    error!(run_id = %run_id, node = %current, next, "Override names an unknown node");
                    return Err(WaypointError::InvalidTransition {
                        run_id: run_id.to_string(),
                        from: current,
                        to: next.to_string(),
                    });
                }
            }

            debug!(
                run_id = %run_id,
                step,
                node = %current,
                next = ?transition.target(),
                overridden = transition.is_override(),
                elapsed_ms,
                "Step complete"
            );

            run.current_node = transition.target().map(str::to_string);
            step += 1;
        }

        if let Some(pending) = &run.current_node {
            warn!(run_id = %run_id, node = %pending, max_steps, "Step ceiling reached, ending run");
        }

        run.finish();
        info!(
            run_id = %run_id,
            steps = step,
            elapsed_ms = start.elapsed().as_millis() as u64,
            "Graph run finished"
        );

        Ok(run.clone())
    }

    // ── Introspection ───────────────────────────────────────────

    /// Get a stored run by id.
    pub fn get_run(&self, run_id: &RunId) -> Result<&RunRecord> {
        self.runs
            .get(run_id)
            .ok_or_else(|| WaypointError::RunNotFound(run_id.to_string()))
    }

    pub fn run_count(&self) -> usize {
        self.runs.len()
    }
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeMap;

    use super::*;
    use waypoint_core::traits::{node_fn, FnTool};
    use waypoint_core::types::ToolTable;
    use waypoint_test_utils::{failing, goto, incrementing, linear_spec, passthrough, CallCounter};

    fn registry() -> NodeRegistry {
        let mut nodes = NodeRegistry::new();
        nodes.register("passthrough", passthrough());
        nodes.register("loop_to_extract", goto("extract"));
        nodes.register("fail", failing("boom"));
        nodes.register("count", incrementing("visits"));
        nodes
    }

    fn engine() -> Engine {
        Engine::new(Arc::new(ToolRegistry::new()), Arc::new(registry()))
    }

    fn spec(nodes: &[(&str, &str)], edges: &[(&str, Option<&str>)], start: &str) -> GraphSpec {
        GraphSpec {
            name: "test".into(),
            nodes: nodes
                .iter()
                .map(|(n, f)| (n.to_string(), f.to_string()))
                .collect::<BTreeMap<_, _>>(),
            edges: edges
                .iter()
                .map(|(from, to)| (from.to_string(), to.map(str::to_string)))
                .collect(),
            start_node: start.into(),
        }
    }

    #[test]
    fn test_linear_graph_runs_to_completion() {
        let mut engine = engine();
        let graph = engine
            .create_graph_from_spec(&linear_spec("linear", &["extract", "check"], "passthrough"))
            .unwrap();

        let run = engine.run_graph(graph.id(), &State::new(), 100).unwrap();

        assert!(run.finished);
        assert!(run.finished_at.is_some());
        assert_eq!(run.log.len(), 2);
        assert_eq!(run.current_node, None);
        assert_eq!(run.path(), vec!["extract", "check"]);
    }

    #[test]
    fn test_self_loop_hits_step_ceiling() {
        let mut engine = engine();
        let graph = engine
            .create_graph_from_spec(&spec(&[("extract", "loop_to_extract")], &[], "extract"))
            .unwrap();

        let run = engine.run_graph(graph.id(), &State::new(), 5).unwrap();

        assert!(run.finished);
        assert_eq!(run.log.len(), 5);
        assert_eq!(run.current_node.as_deref(), Some("extract"));
    }

    #[test]
    fn test_invalid_start_node_registers_nothing() {
        let mut engine = engine();
        let err = engine
            .create_graph_from_spec(&spec(&[("extract", "passthrough")], &[], "missing"))
            .unwrap_err();

        assert!(matches!(err, WaypointError::InvalidStartNode(name) if name == "missing"));
        assert_eq!(engine.graph_count(), 0);
    }

    #[test]
    fn test_unknown_node_function_registers_nothing() {
        let mut engine = engine();
        let err = engine
            .create_graph_from_spec(&spec(
                &[("a", "passthrough"), ("b", "no_such_function")],
                &[("a", Some("b"))],
                "a",
            ))
            .unwrap_err();

        assert!(matches!(err, WaypointError::UnknownNodeFunction(name) if name == "no_such_function"));
        assert_eq!(engine.graph_count(), 0);
    }

    #[test]
    fn test_invalid_edge_registers_nothing() {
        let mut engine = engine();
        let err = engine
            .create_graph_from_spec(&spec(
                &[("a", "passthrough")],
                &[("a", Some("ghost"))],
                "a",
            ))
            .unwrap_err();

        assert!(matches!(err, WaypointError::InvalidEdgeReference { .. }));
        assert_eq!(engine.graph_count(), 0);
    }

    #[test]
    fn test_missing_required_tool_registers_nothing() {
        let mut nodes = registry();
        nodes.register(
            "needs_tool",
            node_fn(|_: &mut State, _: &ToolTable| Ok(None)).requires("summarize"),
        );
        let mut engine = Engine::new(Arc::new(ToolRegistry::new()), Arc::new(nodes));

        let err = engine
            .create_graph_from_spec(&spec(&[("a", "needs_tool")], &[], "a"))
            .unwrap_err();
        assert!(matches!(err, WaypointError::ToolNotFound(name) if name == "summarize"));
        assert_eq!(engine.graph_count(), 0);
    }

    #[test]
    fn test_first_current_node_is_start_node() {
        let mut engine = engine();
        let graph = engine
            .create_graph_from_spec(&spec(
                &[("first", "passthrough"), ("second", "passthrough")],
                &[("second", Some("first"))],
                "second",
            ))
            .unwrap();

        let run = engine.run_graph(graph.id(), &State::new(), 10).unwrap();
        assert_eq!(run.log[0].node, "second");
        assert_eq!(run.path(), vec!["second", "first"]);
    }

    #[test]
    fn test_step_indices_are_gapless() {
        let mut engine = engine();
        let graph = engine
            .create_graph_from_spec(&spec(&[("extract", "loop_to_extract")], &[], "extract"))
            .unwrap();

        let run = engine.run_graph(graph.id(), &State::new(), 7).unwrap();
        let steps: Vec<usize> = run.log.iter().map(|e| e.step).collect();
        assert_eq!(steps, (0..7).collect::<Vec<_>>());
    }

    #[test]
    fn test_override_beats_static_edge() {
        let mut nodes = registry();
        nodes.register_fn("branch", |state: &mut State, _: &ToolTable| {
            if state.get_i64_or("visits", 0) >= 3 {
                Ok(Some("done".into()))
            } else {
                Ok(Some("count".into()))
            }
        });
        let mut engine = Engine::new(Arc::new(ToolRegistry::new()), Arc::new(nodes));
        let graph = engine
            .create_graph_from_spec(&spec(
                &[("count", "count"), ("branch", "branch"), ("done", "passthrough")],
                // The static edge from branch points at done, but overrides win.
                &[("count", Some("branch")), ("branch", Some("done"))],
                "count",
            ))
            .unwrap();

        let run = engine.run_graph(graph.id(), &State::new(), 100).unwrap();

        assert_eq!(
            run.path(),
            vec!["count", "branch", "count", "branch", "count", "branch", "done"]
        );
        assert_eq!(run.state.get_i64_or("visits", 0), 3);
        assert_eq!(run.log[1].next_override.as_deref(), Some("count"));
        assert_eq!(run.current_node, None);
    }

    #[test]
    fn test_null_return_follows_edge() {
        let mut engine = engine();
        let graph = engine
            .create_graph_from_spec(&spec(
                &[("a", "passthrough"), ("b", "passthrough"), ("c", "passthrough")],
                &[("a", Some("c")), ("c", Some("b"))],
                "a",
            ))
            .unwrap();

        let run = engine.run_graph(graph.id(), &State::new(), 100).unwrap();
        assert_eq!(run.path(), vec!["a", "c", "b"]);
        assert!(run.log.iter().all(|e| e.next_override.is_none()));
    }

    #[test]
    fn test_never_exceeds_max_steps() {
        let counter = Arc::new(CallCounter::returning(Some("a")));
        let mut nodes = NodeRegistry::new();
        nodes.register_arc("counted", counter.clone());
        let mut engine = Engine::new(Arc::new(ToolRegistry::new()), Arc::new(nodes));
        let graph = engine
            .create_graph_from_spec(&spec(&[("a", "counted")], &[], "a"))
            .unwrap();

        for max_steps in [0, 1, 3, 12] {
            let before = counter.calls();
            let run = engine.run_graph(graph.id(), &State::new(), max_steps).unwrap();
            assert_eq!(run.log.len(), max_steps);
            assert_eq!(counter.calls() - before, max_steps);
            assert!(run.finished);
        }
    }

    #[test]
    fn test_zero_steps_leaves_start_pending() {
        let mut engine = engine();
        let graph = engine
            .create_graph_from_spec(&spec(&[("a", "passthrough")], &[], "a"))
            .unwrap();

        let run = engine.run_graph(graph.id(), &State::new(), 0).unwrap();
        assert!(run.finished);
        assert!(run.log.is_empty());
        assert_eq!(run.current_node.as_deref(), Some("a"));
    }

    #[test]
    fn test_default_ceiling_from_engine() {
        let mut engine = engine().with_max_steps(4);
        let graph = engine
            .create_graph_from_spec(&spec(&[("extract", "loop_to_extract")], &[], "extract"))
            .unwrap();

        let run = engine.run(graph.id(), &State::new()).unwrap();
        assert_eq!(run.log.len(), 4);
        assert_eq!(engine.max_steps(), 4);
    }

    #[test]
    fn test_get_run_is_idempotent() {
        let mut engine = engine();
        let graph = engine
            .create_graph_from_spec(&spec(&[("a", "count")], &[], "a"))
            .unwrap();

        let returned = engine.run_graph(graph.id(), &State::new(), 10).unwrap();
        let first = engine.get_run(&returned.id).unwrap().clone();
        let second = engine.get_run(&returned.id).unwrap().clone();

        assert_eq!(first, second);
        assert_eq!(first, returned);
        assert_eq!(first.state.get_i64_or("visits", 0), 1);
        assert_eq!(engine.run_count(), 1);
    }

    #[test]
    fn test_snapshots_are_value_copies() {
        let mut engine = engine();
        let graph = engine
            .create_graph_from_spec(&spec(
                &[("a", "count"), ("b", "count"), ("c", "count")],
                &[("a", Some("b")), ("b", Some("c"))],
                "a",
            ))
            .unwrap();

        let run = engine.run_graph(graph.id(), &State::new(), 10).unwrap();

        assert!(run.log[0].before.get("visits").is_none());
        assert_eq!(run.log[0].after.get_i64_or("visits", 0), 1);
        assert_eq!(run.log[1].before.get_i64_or("visits", 0), 1);
        assert_eq!(run.log[1].after.get_i64_or("visits", 0), 2);
        assert_eq!(run.log[2].after.get_i64_or("visits", 0), 3);
        assert_eq!(run.state.get_i64_or("visits", 0), 3);

        // The stored record's snapshots did not follow later mutations either.
        let stored = engine.get_run(&run.id).unwrap();
        assert_eq!(stored.log[0].after.get_i64_or("visits", 0), 1);
    }

    #[test]
    fn test_initial_state_is_copied() {
        let mut engine = engine();
        let graph = engine
            .create_graph_from_spec(&spec(&[("a", "count")], &[], "a"))
            .unwrap();

        let mut initial = State::new();
        initial.set("visits", serde_json::json!(10));
        let run = engine.run_graph(graph.id(), &initial, 10).unwrap();

        assert_eq!(run.state.get_i64_or("visits", 0), 11);
        assert_eq!(initial.get_i64_or("visits", 0), 10);
    }

    #[test]
    fn test_node_failure_aborts_run() {
        let mut engine = engine();
        let graph = engine
            .create_graph_from_spec(&spec(
                &[("a", "count"), ("b", "fail"), ("c", "count")],
                &[("a", Some("b")), ("b", Some("c"))],
                "a",
            ))
            .unwrap();

        let err = engine
            .run_graph(graph.id(), &State::new(), 10)
            .unwrap_err();

        let run_id = match err {
            WaypointError::NodeFailed {
                run_id,
                node,
                message,
            } => {
                assert_eq!(node, "b");
                assert!(message.contains("boom"));
                RunId::from_string(run_id)
            }
            other => panic!("unexpected error: {other}"),
        };

        let stored = engine.get_run(&run_id).unwrap();
        assert!(!stored.finished);
        assert!(stored.finished_at.is_none());
        assert_eq!(stored.path(), vec!["a"]);
        assert_eq!(stored.current_node.as_deref(), Some("b"));
    }

    #[test]
    fn test_override_to_unknown_node_is_rejected() {
        let mut nodes = registry();
        nodes.register("wander", goto("nowhere"));
        let mut engine = Engine::new(Arc::new(ToolRegistry::new()), Arc::new(nodes));
        let graph = engine
            .create_graph_from_spec(&spec(&[("a", "wander")], &[], "a"))
            .unwrap();

        let err = engine.run_graph(graph.id(), &State::new(), 10).unwrap_err();
        let run_id = match err {
            WaypointError::InvalidTransition { run_id, from, to } => {
                assert_eq!(from, "a");
                assert_eq!(to, "nowhere");
                RunId::from_string(run_id)
            }
            other => panic!("unexpected error: {other}"),
        };

        let stored = engine.get_run(&run_id).unwrap();
        assert!(!stored.finished);
        assert_eq!(stored.log.len(), 1);
        assert_eq!(stored.current_node.as_deref(), Some("a"));
    }

    #[test]
    fn test_unknown_graph_and_run() {
        let mut engine = engine();
        assert!(matches!(
            engine.run_graph(&GraphId::from_string("nope"), &State::new(), 10),
            Err(WaypointError::GraphNotFound(id)) if id == "nope"
        ));
        assert!(matches!(
            engine.get_run(&RunId::from_string("nope")),
            Err(WaypointError::RunNotFound(_))
        ));
        assert_eq!(engine.run_count(), 0);
    }

    #[test]
    fn test_nodes_receive_tool_table() {
        let mut tools = ToolRegistry::new();
        tools.register(FnTool::new("shout", "Uppercase", |input| {
            Ok(serde_json::json!(input.as_str().unwrap_or_default().to_uppercase()))
        }));
        let mut nodes = NodeRegistry::new();
        nodes.register(
            "greet",
            node_fn(|state: &mut State, tools: &ToolTable| {
                let loud: String = tools.call_as("shout", "hello")?;
                state.set_str("greeting", loud);
                Ok(None)
            })
            .requires("shout"),
        );
        let mut engine = Engine::new(Arc::new(tools), Arc::new(nodes));
        let graph = engine
            .create_graph_from_spec(&spec(&[("greet", "greet")], &[], "greet"))
            .unwrap();

        let run = engine.run(graph.id(), &State::new()).unwrap();
        assert_eq!(run.state.get_str("greeting"), Some("HELLO"));
    }

    #[test]
    fn test_graphs_share_node_logic() {
        let counter = Arc::new(CallCounter::returning(None));
        let mut nodes = NodeRegistry::new();
        nodes.register_arc("counted", counter.clone());
        let mut engine = Engine::new(Arc::new(ToolRegistry::new()), Arc::new(nodes));

        let g1 = engine
            .create_graph_from_spec(&spec(&[("x", "counted")], &[], "x"))
            .unwrap();
        let g2 = engine
            .create_graph_from_spec(&spec(&[("y", "counted"), ("z", "counted")], &[("y", Some("z"))], "y"))
            .unwrap();

        engine.run(g1.id(), &State::new()).unwrap();
        engine.run(g2.id(), &State::new()).unwrap();
        assert_eq!(counter.calls(), 3);
        assert_eq!(engine.list_graphs().len(), 2);
    }

    #[test]
    fn test_add_graph_with_fixed_id() {
        let mut engine = engine();
        let graph = GraphDefinition::builder("fixed", "a")
            .id(GraphId::from_string("fixed_graph"))
            .node(Node::new("a", passthrough()))
            .build()
            .unwrap();
        engine.add_graph(graph).unwrap();

        let summaries = engine.list_graphs();
        assert_eq!(summaries.len(), 1);
        assert_eq!(summaries[0].id.as_str(), "fixed_graph");
        assert_eq!(summaries[0].nodes, vec!["a"]);

        let run = engine
            .run(&GraphId::from_string("fixed_graph"), &State::new())
            .unwrap();
        assert_eq!(run.graph_id.as_str(), "fixed_graph");
    }
}
