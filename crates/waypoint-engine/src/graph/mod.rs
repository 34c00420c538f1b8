//! Graph model: immutable workflow definitions and per-run records.
//!
//! A workflow is a set of named `Node`s plus a default-successor edge map and
//! a start node. A node may override its successor for one transition by
//! returning a node name; otherwise the static edge is followed.

pub mod definition;
pub mod edge;
pub mod node;
pub mod run;

pub use definition::{GraphBuilder, GraphDefinition};
pub use edge::Transition;
pub use node::Node;
pub use run::{RunRecord, StepEntry};
