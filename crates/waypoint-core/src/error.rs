use thiserror::Error;

#[derive(Debug, Error)]
pub enum WaypointError {
    // Lookup errors
    #[error("Graph '{0}' not found")]
    GraphNotFound(String),

    #[error("Run '{0}' not found")]
    RunNotFound(String),

    // Graph construction errors
    #[error("Unknown node function: {0}")]
    UnknownNodeFunction(String),

    #[error("start_node '{0}' not in nodes")]
    InvalidStartNode(String),

    #[error("Edge references unknown node: {from} -> {to}")]
    InvalidEdgeReference { from: String, to: String },

    // Tool errors
    #[error("Tool not found: {0}")]
    ToolNotFound(String),

    #[error("Tool execution failed: {tool}: {message}")]
    ToolExecution { tool: String, message: String },

    #[error("Tool input validation failed: {0}")]
    ToolValidation(String),

    // Run errors
    #[error("Node '{node}' failed in run {run_id}: {message}")]
    NodeFailed {
        run_id: String,
        node: String,
        message: String,
    },

    #[error("Node '{from}' in run {run_id} named unknown successor '{to}'")]
    InvalidTransition {
        run_id: String,
        from: String,
        to: String,
    },

    // Config errors
    #[error("Config error: {0}")]
    Config(String),

    #[error("Config file not found: {0}")]
    ConfigNotFound(String),

    // I/O errors
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    // JSON errors
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, WaypointError>;
