use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::{Result, WaypointError};
use crate::traits::Tool;

/// Unique graph identifier.
#[derive(Debug, Clone, Hash, Eq, PartialEq, Ord, PartialOrd, Serialize, Deserialize)]
#[serde(transparent)]
pub struct GraphId(pub String);

impl GraphId {
    pub fn new() -> Self {
        Self(Uuid::new_v4().to_string())
    }

    pub fn from_string(s: impl Into<String>) -> Self {
        Self(s.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Default for GraphId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for GraphId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Unique run identifier.
#[derive(Debug, Clone, Hash, Eq, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RunId(pub String);

impl RunId {
    pub fn new() -> Self {
        Self(Uuid::new_v4().to_string())
    }

    pub fn from_string(s: impl Into<String>) -> Self {
        Self(s.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Default for RunId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for RunId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Read-only table of tools handed to every node invocation of a run.
///
/// Cloning is cheap: tools are shared behind `Arc`.
#[derive(Clone, Default)]
pub struct ToolTable {
    tools: HashMap<String, Arc<dyn Tool>>,
}

impl ToolTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_map(tools: HashMap<String, Arc<dyn Tool>>) -> Self {
        Self { tools }
    }

    /// Get a tool by name.
    pub fn get(&self, name: &str) -> Option<&Arc<dyn Tool>> {
        self.tools.get(name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.tools.contains_key(name)
    }

    /// Names of all tools in the table, sorted.
    pub fn names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.tools.keys().map(|s| s.as_str()).collect();
        names.sort_unstable();
        names
    }

    /// Call a tool by name with raw JSON input.
    pub fn call(&self, name: &str, input: serde_json::Value) -> Result<serde_json::Value> {
        let tool = self
            .get(name)
            .ok_or_else(|| WaypointError::ToolNotFound(name.to_string()))?;
        tool.call(input)
    }

    /// Call a tool with a typed input and decode its output into `O`.
    pub fn call_as<I, O>(&self, name: &str, input: &I) -> Result<O>
    where
        I: Serialize + ?Sized,
        O: DeserializeOwned,
    {
        let output = self.call(name, serde_json::to_value(input)?)?;
        serde_json::from_value(output).map_err(|e| WaypointError::ToolExecution {
            tool: name.to_string(),
            message: format!("unexpected output shape: {}", e),
        })
    }
}

impl std::fmt::Debug for ToolTable {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ToolTable")
            .field("tools", &self.names())
            .finish()
    }
}

/// Declarative description of a graph, resolved against the node registry.
///
/// `nodes` maps a node name inside the graph to the name of a registered
/// node function. `edges` maps a node name to its default successor; a
/// missing entry or `null` terminates the run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GraphSpec {
    pub name: String,
    pub nodes: BTreeMap<String, String>,
    #[serde(default)]
    pub edges: BTreeMap<String, Option<String>>,
    pub start_node: String,
}

impl GraphSpec {
    /// Check that `start_node` and every edge endpoint name a declared node.
    pub fn validate_references(&self) -> Result<()> {
        check_references(&self.start_node, &self.edges, |name| {
            self.nodes.contains_key(name)
        })
    }
}

/// Reference check shared by graph specs and the engine's graph builder.
///
/// The start node is checked first, then edges in source-name order so the
/// reported error does not depend on map iteration order.
pub fn check_references<'a, E>(
    start_node: &str,
    edges: E,
    is_declared: impl Fn(&str) -> bool,
) -> Result<()>
where
    E: IntoIterator<Item = (&'a String, &'a Option<String>)>,
{
    if !is_declared(start_node) {
        return Err(WaypointError::InvalidStartNode(start_node.to_string()));
    }

    let mut edges: Vec<_> = edges.into_iter().collect();
    edges.sort_unstable_by(|a, b| a.0.cmp(b.0));
    for (from, to) in edges {
        if !is_declared(from) {
            return Err(WaypointError::InvalidEdgeReference {
                from: from.clone(),
                to: to.clone().unwrap_or_default(),
            });
        }
        if let Some(to) = to {
            if !is_declared(to) {
                return Err(WaypointError::InvalidEdgeReference {
                    from: from.clone(),
                    to: to.clone(),
                });
            }
        }
    }
    Ok(())
}
