use std::collections::HashMap;
use std::sync::Arc;

use tracing::debug;

use waypoint_core::error::{Result, WaypointError};
use waypoint_core::state::State;
use waypoint_core::traits::{FnNode, NodeLogic};
use waypoint_core::types::ToolTable;

/// Registry of reusable node logic, looked up by function name when graphs
/// are built from a spec.
pub struct NodeRegistry {
    nodes: HashMap<String, Arc<dyn NodeLogic>>,
}

impl NodeRegistry {
    pub fn new() -> Self {
        Self {
            nodes: HashMap::new(),
        }
    }

    /// Register logic under `name`, replacing any previous binding.
    pub fn register(&mut self, name: impl Into<String>, logic: impl NodeLogic) {
        self.register_arc(name, Arc::new(logic));
    }

    /// Register already shared logic.
    pub fn register_arc(&mut self, name: impl Into<String>, logic: Arc<dyn NodeLogic>) {
        let name = name.into();
        if self.nodes.insert(name.clone(), logic).is_some() {
            debug!(function = %name, "Replaced node function binding");
        }
    }

    /// Register a closure as node logic.
    pub fn register_fn<F>(&mut self, name: impl Into<String>, func: F)
    where
        F: Fn(&mut State, &ToolTable) -> Result<Option<String>> + Send + Sync + 'static,
    {
        self.register(name, FnNode::new(func));
    }

    /// Get logic by function name.
    pub fn get(&self, name: &str) -> Result<Arc<dyn NodeLogic>> {
        self.nodes
            .get(name)
            .cloned()
            .ok_or_else(|| WaypointError::UnknownNodeFunction(name.to_string()))
    }

    pub fn contains(&self, name: &str) -> bool {
        self.nodes.contains_key(name)
    }

    /// List registered function names, sorted.
    pub fn list(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.nodes.keys().map(|s| s.as_str()).collect();
        names.sort_unstable();
        names
    }

    /// Snapshot of the full mapping.
    pub fn all(&self) -> HashMap<String, Arc<dyn NodeLogic>> {
        self.nodes.clone()
    }
}

impl Default for NodeRegistry {
    fn default() -> Self {
        Self::new()
    }
}
