pub mod engine;
pub mod graph;
pub mod registry;

pub use engine::{Engine, GraphSummary};
pub use graph::{GraphBuilder, GraphDefinition, Node, RunRecord, StepEntry, Transition};
pub use registry::NodeRegistry;
