pub mod config;
pub mod error;
pub mod state;
pub mod traits;
pub mod types;

pub use config::AppConfig;
pub use error::{Result, WaypointError};
pub use state::State;
pub use traits::{node_fn, FnNode, FnTool, NodeLogic, Tool};
pub use types::*;
