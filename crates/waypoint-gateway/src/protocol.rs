use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use waypoint_core::state::State;
use waypoint_core::types::{GraphId, GraphSpec, RunId};
use waypoint_engine::{RunRecord, StepEntry};

/// A node in a create request: its name in the graph and the registered
/// function it runs.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NodeEntry {
    pub name: String,
    pub function: String,
}

/// Body of `POST /graph/create`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateGraphRequest {
    pub name: String,
    pub nodes: Vec<NodeEntry>,
    #[serde(default)]
    pub edges: BTreeMap<String, Option<String>>,
    pub start_node: String,
}

impl CreateGraphRequest {
    /// Convert to a graph spec. A repeated node name keeps its last function.
    pub fn into_spec(self) -> GraphSpec {
        GraphSpec {
            name: self.name,
            nodes: self
                .nodes
                .into_iter()
                .map(|n| (n.name, n.function))
                .collect(),
            edges: self.edges,
            start_node: self.start_node,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateGraphResponse {
    pub graph_id: GraphId,
}

/// Body of `POST /graph/run`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunGraphRequest {
    pub graph_id: GraphId,
    #[serde(default)]
    pub initial_state: State,
    /// Lowers the configured step ceiling for this run. Larger values are capped.
    #[serde(default)]
    pub max_steps: Option<usize>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunGraphResponse {
    pub run_id: RunId,
    pub final_state: State,
    pub log: Vec<StepEntry>,
}

impl From<RunRecord> for RunGraphResponse {
    fn from(run: RunRecord) -> Self {
        Self {
            run_id: run.id,
            final_state: run.state,
            log: run.log,
        }
    }
}

/// Body of `GET /graph/state/{run_id}`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunStateResponse {
    pub run_id: RunId,
    pub graph_id: GraphId,
    pub state: State,
    pub current_node: Option<String>,
    pub finished: bool,
    pub log: Vec<StepEntry>,
}

impl From<RunRecord> for RunStateResponse {
    fn from(run: RunRecord) -> Self {
        Self {
            run_id: run.id,
            graph_id: run.graph_id,
            state: run.state,
            current_node: run.current_node,
            finished: run.finished,
            log: run.log,
        }
    }
}
