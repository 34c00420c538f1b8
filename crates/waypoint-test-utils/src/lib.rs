//! Fixtures shared by the Waypoint test suites.
//!
//! Depends only on `waypoint-core` so any crate can pull it in as a
//! dev-dependency.

use std::io::Write;
use std::sync::atomic::{AtomicUsize, Ordering};

use tempfile::NamedTempFile;

use waypoint_core::error::{Result, WaypointError};
use waypoint_core::state::State;
use waypoint_core::traits::{node_fn, NodeLogic};
use waypoint_core::types::{GraphSpec, ToolTable};

// ── Node doubles ────────────────────────────────────────────────

/// Logic that leaves the state alone and follows the static edge.
pub fn passthrough() -> impl NodeLogic {
    node_fn(|_: &mut State, _: &ToolTable| Ok(None))
}

/// Logic that always overrides to `target`.
pub fn goto(target: &str) -> impl NodeLogic {
    let target = target.to_string();
    node_fn(move |_: &mut State, _: &ToolTable| Ok(Some(target.clone())))
}

/// Logic that always fails with `message`.
pub fn failing(message: &str) -> impl NodeLogic {
    let message = message.to_string();
    node_fn(move |_: &mut State, _: &ToolTable| {
        Err(WaypointError::ToolExecution {
            tool: "failing".into(),
            message: message.clone(),
        })
    })
}

/// Logic that increments the integer at `key` and follows the static edge.
pub fn incrementing(key: &str) -> impl NodeLogic {
    let key = key.to_string();
    node_fn(move |state: &mut State, _: &ToolTable| {
        let next = state.get_i64_or(&key, 0) + 1;
        state.set(key.clone(), serde_json::json!(next));
        Ok(None)
    })
}

/// Logic that counts its invocations and returns a fixed override.
pub struct CallCounter {
    calls: AtomicUsize,
    next: Option<String>,
}

impl CallCounter {
    pub fn returning(next: Option<&str>) -> Self {
        Self {
            calls: AtomicUsize::new(0),
            next: next.map(str::to_string),
        }
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

impl NodeLogic for CallCounter {
    fn invoke(&self, _state: &mut State, _tools: &ToolTable) -> Result<Option<String>> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Ok(self.next.clone())
    }
}

// ── Graph specs ─────────────────────────────────────────────────

/// A chain `names[0] -> names[1] -> ...` where every node uses `function`.
pub fn linear_spec(name: &str, names: &[&str], function: &str) -> GraphSpec {
    let nodes = names
        .iter()
        .map(|n| (n.to_string(), function.to_string()))
        .collect();
    let mut edges: std::collections::BTreeMap<String, Option<String>> = names
        .windows(2)
        .map(|pair| (pair[0].to_string(), Some(pair[1].to_string())))
        .collect();
    if let Some(last) = names.last() {
        edges.insert(last.to_string(), None);
    }

    GraphSpec {
        name: name.to_string(),
        nodes,
        edges,
        start_node: names.first().map(|n| n.to_string()).unwrap_or_default(),
    }
}

// ── Config files ────────────────────────────────────────────────

/// Write `contents` to a temporary `.toml` file that lives as long as the
/// returned handle.
pub fn write_temp_config(contents: &str) -> NamedTempFile {
    let mut file = tempfile::Builder::new()
        .suffix(".toml")
        .tempfile()
        .expect("create temp config");
    file.write_all(contents.as_bytes())
        .expect("write temp config");
    file
}
