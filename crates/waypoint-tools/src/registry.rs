use std::collections::HashMap;
use std::sync::Arc;

use tracing::debug;

use waypoint_core::error::{Result, WaypointError};
use waypoint_core::traits::Tool;
use waypoint_core::types::ToolTable;

/// Registry of tools that node logic can call.
pub struct ToolRegistry {
    tools: HashMap<String, Arc<dyn Tool>>,
}

impl ToolRegistry {
    pub fn new() -> Self {
        Self {
            tools: HashMap::new(),
        }
    }

    /// Register a tool under its own name, replacing any previous binding.
    pub fn register(&mut self, tool: impl Tool) {
        self.register_arc(Arc::new(tool));
    }

    /// Register an already shared tool.
    pub fn register_arc(&mut self, tool: Arc<dyn Tool>) {
        let name = tool.name().to_string();
        if self.tools.insert(name.clone(), tool).is_some() {
            debug!(tool = %name, "Replaced tool binding");
        }
    }

    /// Get a tool by name.
    pub fn get(&self, name: &str) -> Result<Arc<dyn Tool>> {
        self.tools
            .get(name)
            .cloned()
            .ok_or_else(|| WaypointError::ToolNotFound(name.to_string()))
    }

    pub fn contains(&self, name: &str) -> bool {
        self.tools.contains_key(name)
    }

    /// List all registered tool names, sorted.
    pub fn list(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.tools.keys().map(|s| s.as_str()).collect();
        names.sort_unstable();
        names
    }

    /// Snapshot of the full mapping, handed to node logic during a run.
    pub fn all(&self) -> ToolTable {
        ToolTable::from_map(self.tools.clone())
    }

    /// Create a registry with all built-in tools registered.
    pub fn with_builtins() -> Self {
        let mut registry = Self::new();

        // ── Code analysis (4) ───────────────────────────────────
        registry.register(crate::builtin::code::ExtractFunctionsTool);
        registry.register(crate::builtin::code::CheckComplexityTool);
        registry.register(crate::builtin::code::DetectIssuesTool);
        registry.register(crate::builtin::code::SuggestImprovementsTool);

        registry
    }
}

impl Default for ToolRegistry {
    fn default() -> Self {
        Self::new()
    }
}
