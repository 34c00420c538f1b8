use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::{Result, WaypointError};
use crate::types::GraphSpec;

/// Step ceiling applied when a caller does not pick one.
pub const DEFAULT_MAX_STEPS: usize = 100;

/// Top-level Waypoint configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppConfig {
    #[serde(default)]
    pub engine: EngineConfig,
    #[serde(default)]
    pub gateway: Option<GatewayConfig>,
    #[serde(default)]
    pub log: LogConfig,
    /// Graphs registered from their spec at startup.
    #[serde(default)]
    pub graphs: Vec<GraphSpec>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EngineConfig {
    /// Maximum node invocations per run.
    #[serde(default = "default_max_steps")]
    pub max_steps: usize,
    /// Register the built-in workflows (tools, nodes, and graphs).
    #[serde(default = "default_builtin_workflows")]
    pub builtin_workflows: bool,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            max_steps: default_max_steps(),
            builtin_workflows: default_builtin_workflows(),
        }
    }
}

fn default_max_steps() -> usize { DEFAULT_MAX_STEPS }
fn default_builtin_workflows() -> bool { true }

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GatewayConfig {
    #[serde(default = "default_bind")]
    pub bind: String,
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            bind: default_bind(),
        }
    }
}

fn default_bind() -> String { "127.0.0.1:8000".to_string() }

/// Logging configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct LogConfig {
    /// `tracing` filter directive used when `RUST_LOG` is not set,
    /// e.g. `"waypoint=debug,warn"`.
    #[serde(default)]
    pub filter: Option<String>,
}

impl AppConfig {
    /// Load config from a TOML file, with env var expansion.
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .map_err(|_| WaypointError::ConfigNotFound(path.display().to_string()))?;

        // Expand ${ENV_VAR} references
        let expanded = expand_env_vars(&content);

        let config: AppConfig =
            toml::from_str(&expanded).map_err(|e| WaypointError::Config(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Load config if the file exists, defaults otherwise.
    pub fn load_or_default(path: &Path) -> Result<Self> {
        if path.exists() {
            Self::load(path)
        } else {
            tracing::debug!(path = %path.display(), "No config file, using defaults");
            Ok(Self::default())
        }
    }

    fn validate(&self) -> Result<()> {
        if self.engine.max_steps == 0 {
            return Err(WaypointError::Config(
                "engine.max_steps must be at least 1".to_string(),
            ));
        }
        for spec in &self.graphs {
            spec.validate_references().map_err(|e| {
                WaypointError::Config(format!("graph '{}': {}", spec.name, e))
            })?;
        }
        Ok(())
    }

    /// Gateway settings, falling back to defaults when the section is absent.
    pub fn gateway_or_default(&self) -> GatewayConfig {
        self.gateway.clone().unwrap_or_default()
    }
}

/// Expand `${ENV_VAR}` patterns in a string.
fn expand_env_vars(input: &str) -> String {
    let mut result = String::with_capacity(input.len());
    let mut chars = input.chars().peekable();

    while let Some(c) = chars.next() {
        if c == '$' && chars.peek() == Some(&'{') {
            chars.next(); // consume '{'
            let mut var_name = String::new();
            for c in chars.by_ref() {
                if c == '}' {
                    break;
                }
                var_name.push(c);
            }
            match std::env::var(&var_name) {
                Ok(val) => result.push_str(&val),
                Err(_) => {
                    // Keep original if env var not set
                    result.push_str(&format!("${{{}}}", var_name));
                }
            }
        } else {
            result.push(c);
        }
    }
    result
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_expand_env_vars() {
        std::env::set_var("TEST_WAYPOINT_VAR", "hello");
        let result = expand_env_vars("key = \"${TEST_WAYPOINT_VAR}\"");
        assert_eq!(result, "key = \"hello\"");
        std::env::remove_var("TEST_WAYPOINT_VAR");
    }

    #[test]
    fn test_expand_env_vars_missing() {
        let result = expand_env_vars("key = \"${NONEXISTENT_WAYPOINT_VAR}\"");
        assert_eq!(result, "key = \"${NONEXISTENT_WAYPOINT_VAR}\"");
    }

    #[test]
    fn test_defaults_from_empty_toml() {
        let config: AppConfig = toml::from_str("").unwrap();
        assert_eq!(config.engine.max_steps, 100);
        assert!(config.engine.builtin_workflows);
        assert!(config.gateway.is_none());
        assert!(config.log.filter.is_none());
        assert!(config.graphs.is_empty());
        assert_eq!(config.gateway_or_default().bind, "127.0.0.1:8000");
    }

    #[test]
    fn test_graph_tables() {
        let toml_str = r#"
[[graphs]]
name = "triage"
start_node = "extract"
nodes = { extract = "extract", issues = "detect_issues" }
edges = { extract = "issues" }
"#;
        let config: AppConfig = toml::from_str(toml_str).unwrap();
        assert_eq!(config.graphs.len(), 1);
        let spec = &config.graphs[0];
        assert_eq!(spec.start_node, "extract");
        assert_eq!(spec.edges.get("extract"), Some(&Some("issues".to_string())));
        assert_eq!(spec.edges.get("issues"), None);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_validate_rejects_zero_steps() {
        let config: AppConfig = toml::from_str("[engine]\nmax_steps = 0\n").unwrap();
        assert!(matches!(config.validate(), Err(WaypointError::Config(_))));
    }

    #[test]
    fn test_validate_rejects_bad_graph() {
        let toml_str = r#"
[[graphs]]
name = "broken"
start_node = "nope"
nodes = { extract = "extract" }
"#;
        let config: AppConfig = toml::from_str(toml_str).unwrap();
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("broken"));
    }
}
