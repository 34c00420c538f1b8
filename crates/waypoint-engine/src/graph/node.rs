use std::sync::Arc;

use waypoint_core::error::Result;
use waypoint_core::state::State;
use waypoint_core::traits::NodeLogic;
use waypoint_core::types::ToolTable;

/// A named unit of workflow logic inside a graph.
///
/// The logic is shared by reference: several nodes, in one graph or many,
/// can point at the same registered logic.
#[derive(Clone)]
pub struct Node {
    /// Name of the node inside its graph.
    pub name: String,
    /// The logic invoked when the run reaches this node.
    pub logic: Arc<dyn NodeLogic>,
    /// Human-readable description.
    pub description: String,
}

impl Node {
    /// Create a node owning fresh logic.
    pub fn new(name: impl Into<String>, logic: impl NodeLogic) -> Self {
        Self::from_arc(name, Arc::new(logic))
    }

    /// Create a node over shared logic.
    pub fn from_arc(name: impl Into<String>, logic: Arc<dyn NodeLogic>) -> Self {
        Self {
            name: name.into(),
            logic,
            description: String::new(),
        }
    }

    /// Set the description.
    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    /// Run the node's logic.
    pub fn invoke(&self, state: &mut State, tools: &ToolTable) -> Result<Option<String>> {
        self.logic.invoke(state, tools)
    }
}

impl std::fmt::Debug for Node {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Node")
            .field("name", &self.name)
            .field("description", &self.description)
            .finish_non_exhaustive()
    }
}
