//! Gateway trait: the abstraction over language-model backends.
//!
//! A Gateway knows how to send a conversation plus the available tool
//! descriptors to a model and get back its decision: either final text or a
//! list of tool invocations. The concrete network client lives outside this
//! workspace; the agent loop only ever sees this trait.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::agent::RunOptions;
use crate::error::GatewayError;
use crate::message::{Message, ToolInvocationRequest};

/// A tool descriptor sent to the model so it knows what it can call.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolDefinition {
    /// The tool name
    pub name: String,

    /// Description of what the tool does
    pub description: String,

    /// JSON Schema describing the tool's parameters
    pub parameters: serde_json::Value,
}

/// Everything the model needs to decide its next action.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GatewayRequest {
    /// Conversation history, oldest first
    pub messages: Vec<Message>,

    /// Registered tools, in registration order
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub tools: Vec<ToolDefinition>,

    /// Per-run model parameters
    #[serde(default)]
    pub options: RunOptions,
}

/// The model's decision.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct GatewayResponse {
    /// Final answer text, if any
    #[serde(default)]
    pub content: Option<String>,

    /// Requested tool invocations, in the order they should run
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub tool_calls: Vec<ToolInvocationRequest>,

    /// Token usage statistics
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub usage: Option<Usage>,
}

impl GatewayResponse {
    /// A final text answer.
    pub fn text(content: impl Into<String>) -> Self {
        Self {
            content: Some(content.into()),
            ..Self::default()
        }
    }

    /// A round of tool invocations.
    pub fn tool_calls(tool_calls: Vec<ToolInvocationRequest>) -> Self {
        Self {
            tool_calls,
            ..Self::default()
        }
    }

    pub fn with_usage(mut self, usage: Usage) -> Self {
        self.usage = Some(usage);
        self
    }

    /// The final answer, if this response carries non-empty text.
    pub fn final_text(&self) -> Option<&str> {
        self.content.as_deref().filter(|text| !text.is_empty())
    }
}

/// Token usage information.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Usage {
    pub prompt_tokens: u32,
    pub completion_tokens: u32,
    pub total_tokens: u32,
}

/// The core Gateway trait.
///
/// Any model backend implements this. The agent loop calls `complete()`
/// without knowing which backend is behind it.
#[async_trait]
pub trait Gateway: Send + Sync {
    /// A human-readable name for this gateway (e.g., "openai", "groq").
    fn name(&self) -> &str;

    /// Send the conversation and tools, get the model's decision.
    async fn complete(
        &self,
        request: GatewayRequest,
    ) -> std::result::Result<GatewayResponse, GatewayError>;
}
