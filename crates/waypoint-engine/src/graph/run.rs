use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use waypoint_core::state::State;
use waypoint_core::types::{GraphId, RunId};

/// One node invocation in a run's log.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StepEntry {
    /// 0-based, gapless within a run.
    pub step: usize,
    /// Which node was invoked.
    pub node: String,
    /// Deep copy of the state before the invocation.
    pub before: State,
    /// Deep copy of the state after the invocation.
    pub after: State,
    /// What the node returned.
    pub next_override: Option<String>,
    /// Invocation time in milliseconds.
    pub elapsed_ms: u64,
}

/// Execution state of one invocation of a graph.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunRecord {
    pub id: RunId,
    pub graph_id: GraphId,
    pub state: State,
    /// Node to invoke next; `None` once the run reached a terminal transition.
    pub current_node: Option<String>,
    pub log: Vec<StepEntry>,
    pub finished: bool,
    pub started_at: DateTime<Utc>,
    pub finished_at: Option<DateTime<Utc>>,
}

impl RunRecord {
    /// Create a run positioned at `start_node`.
    pub fn new(id: RunId, graph_id: GraphId, state: State, start_node: &str) -> Self {
        Self {
            id,
            graph_id,
            state,
            current_node: Some(start_node.to_string()),
            log: Vec::new(),
            finished: false,
            started_at: Utc::now(),
            finished_at: None,
        }
    }

    /// Number of node invocations performed so far.
    pub fn steps(&self) -> usize {
        self.log.len()
    }

    /// Mark the run finished and stamp the finish time.
    pub fn finish(&mut self) {
        self.finished = true;
        self.finished_at = Some(Utc::now());
    }

    /// Total wall time, once finished.
    pub fn elapsed_ms(&self) -> Option<i64> {
        self.finished_at
            .map(|end| (end - self.started_at).num_milliseconds())
    }

    /// Names of the invoked nodes, in order.
    pub fn path(&self) -> Vec<&str> {
        self.log.iter().map(|e| e.node.as_str()).collect()
    }
}
