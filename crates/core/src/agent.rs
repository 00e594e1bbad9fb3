//! Agent configuration, per-run options, and loop state types.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Keys never copied into an execution trace.
const SECRET_PARAMS: &[&str] = &["api_key"];

/// Configuration for the agent's behavior.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AgentConfig {
    /// Maximum model calls per run before giving up
    #[serde(default = "default_max_steps")]
    pub max_steps: u32,

    /// Fail fast on tool and gateway errors instead of feeding them back
    #[serde(default)]
    pub strict: bool,

    /// Install a debug-level log subscriber on construction
    #[serde(default)]
    pub debug: bool,

    /// Record an execution trace for each run
    #[serde(default = "default_true")]
    pub enable_tracing: bool,

    /// Retention bound for the default conversation store (None = unbounded)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_messages: Option<usize>,
}

fn default_max_steps() -> u32 {
    10
}
fn default_true() -> bool {
    true
}

impl Default for AgentConfig {
    fn default() -> Self {
        Self {
            max_steps: default_max_steps(),
            strict: false,
            debug: false,
            enable_tracing: true,
            max_messages: None,
        }
    }
}

/// Options for a single run, forwarded to the gateway.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RunOptions {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub temperature: Option<f32>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_tokens: Option<u32>,

    /// Overrides `AgentConfig::max_steps` for this run
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_steps: Option<u32>,

    /// Backend-specific parameters
    #[serde(default, skip_serializing_if = "Map::is_empty")]
    pub extra: Map<String, Value>,
}

impl RunOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_temperature(mut self, temperature: f32) -> Self {
        self.temperature = Some(temperature);
        self
    }

    pub fn with_max_tokens(mut self, max_tokens: u32) -> Self {
        self.max_tokens = Some(max_tokens);
        self
    }

    pub fn with_max_steps(mut self, max_steps: u32) -> Self {
        self.max_steps = Some(max_steps);
        self
    }

    pub fn with_param(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.extra.insert(key.into(), value.into());
        self
    }

    /// The model parameters as a flat map, secrets removed. This is what a
    /// trace records for each model call.
    pub fn traced_params(&self) -> Map<String, Value> {
        let mut params = Map::new();
        if let Some(t) = self.temperature {
            params.insert("temperature".into(), Value::from(t));
        }
        if let Some(n) = self.max_tokens {
            params.insert("max_tokens".into(), Value::from(n));
        }
        for (key, value) in &self.extra {
            if !SECRET_PARAMS.contains(&key.as_str()) {
                params.insert(key.clone(), value.clone());
            }
        }
        params
    }
}

/// Where the loop is within a run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LoopState {
    /// Waiting on the gateway for the next decision
    AwaitingModel,
    /// Tool results were appended; another model round is needed
    Continue,
    /// A final answer was produced
    Done,
    /// The run ended in an error
    Failed,
}

impl LoopState {
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Done | Self::Failed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn config_defaults() {
        let config = AgentConfig::default();
        assert_eq!(config.max_steps, 10);
        assert!(!config.strict);
        assert!(config.enable_tracing);
        assert!(config.max_messages.is_none());
    }

    #[test]
    fn config_fills_missing_fields() {
        let config: AgentConfig = serde_json::from_str(r#"{"strict": true}"#).unwrap();
        assert!(config.strict);
        assert_eq!(config.max_steps, 10);
    }

    #[test]
    fn traced_params_drop_secrets() {
        let options = RunOptions::new()
            .with_temperature(0.5)
            .with_param("api_key", "sk-secret")
            .with_param("top_p", 0.9);
        let params = options.traced_params();
        assert!(params.contains_key("temperature"));
        assert!(params.contains_key("top_p"));
        assert!(!params.contains_key("api_key"));
    }

    #[test]
    fn terminal_states() {
        assert!(LoopState::Done.is_terminal());
        assert!(LoopState::Failed.is_terminal());
        assert!(!LoopState::Continue.is_terminal());
        assert!(!LoopState::AwaitingModel.is_terminal());
    }
}
