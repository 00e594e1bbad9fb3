//! Error types for the MicroClaw domain.
//!
//! Uses `thiserror` for ergonomic error definitions.
//! Every failure the agent loop can surface is a variant of [`AgentError`],
//! so callers can catch coarsely on the one type and match finely on the
//! variant or its [`ErrorKind`].

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// The top-level error type for all MicroClaw operations.
#[derive(Debug, Error)]
pub enum AgentError {
    // --- Tool errors ---
    #[error("Tool '{tool_name}' not found")]
    ToolNotFound { tool_name: String },

    #[error("Invalid arguments for tool '{tool_name}': {reason}")]
    InvalidToolArguments { tool_name: String, reason: String },

    #[error("Error executing tool '{tool_name}': {error_type}: {message}")]
    ToolExecution {
        tool_name: String,
        error_type: String,
        message: String,
    },

    #[error("Tool with name '{name}' already registered")]
    DuplicateTool { name: String },

    // --- Gateway errors ---
    #[error("Error in LLM communication: {0}")]
    Gateway(#[from] GatewayError),

    // --- Loop errors ---
    #[error("Maximum number of steps ({max_steps}) reached")]
    StepLimitExceeded { max_steps: u32 },

    // --- Memory errors ---
    #[error("Memory error: {0}")]
    Memory(#[from] MemoryError),

    // --- Serialization ---
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Result type alias using our error.
pub type Result<T> = std::result::Result<T, AgentError>;

/// Coarse classification of an [`AgentError`].
///
/// This is what the execution trace records, so it stays serializable
/// regardless of what the underlying error carried.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ErrorKind {
    ToolNotFound,
    InvalidToolArguments,
    ToolExecutionError,
    DuplicateTool,
    #[serde(rename = "LLMGatewayError")]
    LlmGatewayError,
    StepLimitExceeded,
    MemoryError,
    SerializationError,
}

impl std::fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Self::ToolNotFound => "ToolNotFound",
            Self::InvalidToolArguments => "InvalidToolArguments",
            Self::ToolExecutionError => "ToolExecutionError",
            Self::DuplicateTool => "DuplicateTool",
            Self::LlmGatewayError => "LLMGatewayError",
            Self::StepLimitExceeded => "StepLimitExceeded",
            Self::MemoryError => "MemoryError",
            Self::SerializationError => "SerializationError",
        };
        f.write_str(name)
    }
}

impl AgentError {
    /// The coarse kind of this error.
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::ToolNotFound { .. } => ErrorKind::ToolNotFound,
            Self::InvalidToolArguments { .. } => ErrorKind::InvalidToolArguments,
            Self::ToolExecution { .. } => ErrorKind::ToolExecutionError,
            Self::DuplicateTool { .. } => ErrorKind::DuplicateTool,
            Self::Gateway(_) => ErrorKind::LlmGatewayError,
            Self::StepLimitExceeded { .. } => ErrorKind::StepLimitExceeded,
            Self::Memory(_) => ErrorKind::MemoryError,
            Self::Serialization(_) => ErrorKind::SerializationError,
        }
    }

    /// Whether a non-strict agent may absorb this error into the
    /// conversation instead of failing the run.
    pub fn is_recoverable(&self) -> bool {
        matches!(
            self,
            Self::ToolNotFound { .. }
                | Self::InvalidToolArguments { .. }
                | Self::ToolExecution { .. }
                | Self::Gateway(_)
        )
    }

    /// `"<kind>: <message>"`, the form errors take in traces.
    pub fn summary(&self) -> String {
        format!("{}: {}", self.kind(), self)
    }
}

// --- Bounded context errors ---

#[derive(Debug, Clone, Error)]
pub enum GatewayError {
    #[error("API request failed: {message} (status: {status_code})")]
    Api { status_code: u16, message: String },

    #[error("Network error: {0}")]
    Network(String),

    #[error("Request timed out: {0}")]
    Timeout(String),

    #[error("Unparseable model response: {0}")]
    InvalidResponse(String),

    #[error("Gateway not configured: {0}")]
    NotConfigured(String),
}

#[derive(Debug, Clone, Error)]
pub enum MemoryError {
    #[error("Storage error: {0}")]
    Storage(String),
}
