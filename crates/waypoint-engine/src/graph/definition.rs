use std::collections::HashMap;

use waypoint_core::error::Result;
use waypoint_core::types::{check_references, GraphId};

use super::node::Node;

/// An immutable workflow description.
///
/// Only [`GraphBuilder::build`] creates one, and it rejects definitions whose
/// start node or edges point at undeclared nodes. Runs can therefore trust
/// every name reachable through the edge map.
#[derive(Debug, Clone)]
pub struct GraphDefinition {
    id: GraphId,
    name: String,
    nodes: HashMap<String, Node>,
    edges: HashMap<String, Option<String>>,
    start_node: String,
}

impl GraphDefinition {
    /// Start building a graph.
    pub fn builder(name: impl Into<String>, start_node: impl Into<String>) -> GraphBuilder {
        GraphBuilder::new(name, start_node)
    }

    pub fn id(&self) -> &GraphId {
        &self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn start_node(&self) -> &str {
        &self.start_node
    }

    /// Get a node by name.
    pub fn node(&self, name: &str) -> Option<&Node> {
        self.nodes.get(name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.nodes.contains_key(name)
    }

    /// Node names, sorted.
    pub fn node_names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.nodes.keys().map(|s| s.as_str()).collect();
        names.sort_unstable();
        names
    }

    pub fn nodes(&self) -> impl Iterator<Item = &Node> {
        self.nodes.values()
    }

    /// The static successor of `name`, or `None` to terminate.
    pub fn successor(&self, name: &str) -> Option<&str> {
        self.edges.get(name).and_then(|to| to.as_deref())
    }

    pub fn edges(&self) -> &HashMap<String, Option<String>> {
        &self.edges
    }
}

/// Builder for [`GraphDefinition`].
pub struct GraphBuilder {
    id: Option<GraphId>,
    name: String,
    start_node: String,
    nodes: HashMap<String, Node>,
    edges: HashMap<String, Option<String>>,
}

impl GraphBuilder {
    pub fn new(name: impl Into<String>, start_node: impl Into<String>) -> Self {
        Self {
            id: None,
            name: name.into(),
            start_node: start_node.into(),
            nodes: HashMap::new(),
            edges: HashMap::new(),
        }
    }

    /// Use a fixed id instead of a generated one.
    pub fn id(mut self, id: GraphId) -> Self {
        self.id = Some(id);
        self
    }

    /// Add a node. A node with the same name is replaced.
    pub fn node(mut self, node: Node) -> Self {
        self.nodes.insert(node.name.clone(), node);
        self
    }

    /// Set the default successor of `from`.
    pub fn edge(mut self, from: impl Into<String>, to: impl Into<String>) -> Self {
        self.edges.insert(from.into(), Some(to.into()));
        self
    }

    /// Mark `from` as terminal: the run ends after it unless it overrides.
    pub fn terminal(mut self, from: impl Into<String>) -> Self {
        self.edges.insert(from.into(), None);
        self
    }

    /// Add several edges at once.
    pub fn edges<I>(mut self, edges: I) -> Self
    where
        I: IntoIterator<Item = (String, Option<String>)>,
    {
        self.edges.extend(edges);
        self
    }

    /// Validate and freeze the definition.
    pub fn build(self) -> Result<GraphDefinition> {
        check_references(&self.start_node, &self.edges, |name| {
            self.nodes.contains_key(name)
        })?;

        Ok(GraphDefinition {
            id: self.id.unwrap_or_default(),
            name: self.name,
            nodes: self.nodes,
            edges: self.edges,
            start_node: self.start_node,
        })
    }
}
