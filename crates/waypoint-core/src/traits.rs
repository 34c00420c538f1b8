use serde::de::DeserializeOwned;
use serde::Serialize;

use crate::error::{Result, WaypointError};
use crate::state::State;
use crate::types::ToolTable;

/// A named, side-effect-free helper that node logic can call.
pub trait Tool: Send + Sync + 'static {
    /// Tool name (the key nodes look it up by).
    fn name(&self) -> &str;

    /// Human-readable description.
    fn description(&self) -> &str;

    /// Run the tool on a JSON input.
    fn call(&self, input: serde_json::Value) -> Result<serde_json::Value>;
}

/// Node logic: receives the mutable run state and the read-only tool table,
/// and optionally names the node to run next.
///
/// Returning `Ok(None)` follows the graph's static edge. Returning
/// `Ok(Some(name))` overrides it for this one transition. An `Err` aborts
/// the run.
pub trait NodeLogic: Send + Sync + 'static {
    fn invoke(&self, state: &mut State, tools: &ToolTable) -> Result<Option<String>>;

    /// Tools this logic looks up by name. Checked when a graph using the
    /// logic is registered.
    fn required_tools(&self) -> Vec<&str> {
        Vec::new()
    }
}

type ToolFn = dyn Fn(serde_json::Value) -> Result<serde_json::Value> + Send + Sync;

/// A tool backed by a closure.
pub struct FnTool {
    name: String,
    description: String,
    func: Box<ToolFn>,
}

impl FnTool {
    /// Wrap a closure over raw JSON.
    pub fn new<F>(name: impl Into<String>, description: impl Into<String>, func: F) -> Self
    where
        F: Fn(serde_json::Value) -> Result<serde_json::Value> + Send + Sync + 'static,
    {
        Self {
            name: name.into(),
            description: description.into(),
            func: Box::new(func),
        }
    }

    /// Wrap a closure with a typed signature. The input is decoded from JSON
    /// before the call and the output encoded after it.
    pub fn typed<I, O, F>(
        name: impl Into<String>,
        description: impl Into<String>,
        func: F,
    ) -> Self
    where
        I: DeserializeOwned,
        O: Serialize,
        F: Fn(I) -> Result<O> + Send + Sync + 'static,
    {
        Self::new(name, description, move |input| {
            let parsed: I = serde_json::from_value(input)
                .map_err(|e| WaypointError::ToolValidation(e.to_string()))?;
            let output = func(parsed)?;
            Ok(serde_json::to_value(output)?)
        })
    }
}

impl Tool for FnTool {
    fn name(&self) -> &str {
        &self.name
    }

    fn description(&self) -> &str {
        &self.description
    }

    fn call(&self, input: serde_json::Value) -> Result<serde_json::Value> {
        (self.func)(input)
    }
}

/// Node logic backed by a closure.
pub struct FnNode<F> {
    func: F,
    tools: Vec<String>,
}

impl<F> FnNode<F> {
    pub fn new(func: F) -> Self
    where
        F: Fn(&mut State, &ToolTable) -> Result<Option<String>> + Send + Sync + 'static,
    {
        Self {
            func,
            tools: Vec::new(),
        }
    }

    /// Declare a tool the closure looks up.
    pub fn requires(mut self, tool: impl Into<String>) -> Self {
        self.tools.push(tool.into());
        self
    }
}

impl<F> NodeLogic for FnNode<F>
where
    F: Fn(&mut State, &ToolTable) -> Result<Option<String>> + Send + Sync + 'static,
{
    fn invoke(&self, state: &mut State, tools: &ToolTable) -> Result<Option<String>> {
        (self.func)(state, tools)
    }

    fn required_tools(&self) -> Vec<&str> {
        self.tools.iter().map(String::as_str).collect()
    }
}

/// Shorthand for [`FnNode::new`].
pub fn node_fn<F>(func: F) -> FnNode<F>
where
    F: Fn(&mut State, &ToolTable) -> Result<Option<String>> + Send + Sync + 'static,
{
    FnNode::new(func)
}
