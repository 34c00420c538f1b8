use std::collections::HashMap;

use serde::{Deserialize, Serialize};

/// Shared mutable state threaded through every node of one run.
///
/// Keys are strings; values are JSON so heterogeneous node logic can read and
/// write arbitrary keys without a schema. Cloning produces a deep copy, which
/// is what run logs rely on for their before/after snapshots.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct State {
    data: HashMap<String, serde_json::Value>,
}

impl State {
    pub fn new() -> Self {
        Self::default()
    }

    /// Get a value by key.
    pub fn get(&self, key: &str) -> Option<&serde_json::Value> {
        self.data.get(key)
    }

    /// Get a value as a string, if it's a string.
    pub fn get_str(&self, key: &str) -> Option<&str> {
        self.data.get(key).and_then(|v| v.as_str())
    }

    /// Get a numeric value as f64, falling back to `default` when absent or
    /// not a number.
    pub fn get_f64_or(&self, key: &str, default: f64) -> f64 {
        self.data
            .get(key)
            .and_then(|v| v.as_f64())
            .unwrap_or(default)
    }

    /// Get an integer value, falling back to `default` when absent or not an
    /// integer. Floats are truncated.
    pub fn get_i64_or(&self, key: &str, default: i64) -> i64 {
        match self.data.get(key) {
            Some(v) => v
                .as_i64()
                .or_else(|| v.as_f64().map(|f| f as i64))
                .unwrap_or(default),
            None => default,
        }
    }

    /// Set a value.
    pub fn set(&mut self, key: impl Into<String>, value: serde_json::Value) {
        self.data.insert(key.into(), value);
    }

    /// Set a string value.
    pub fn set_str(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.data
            .insert(key.into(), serde_json::Value::String(value.into()));
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }
}
