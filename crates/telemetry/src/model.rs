//! Data model for run traces and their steps.

use chrono::{DateTime, Utc};
use microclaw_core::error::{AgentError, ErrorKind};
use microclaw_core::gateway::Usage;
use microclaw_core::message::Message;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use uuid::Uuid;

// ── Step ──────────────────────────────────────────────────────────────────

/// The kind of interaction a step records.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum StepKind {
    /// A request to the model.
    ModelCall,
    /// A tool invocation requested by the model.
    ToolCall,
    /// The outcome of a tool invocation.
    ToolResult,
}

impl std::fmt::Display for StepKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::ModelCall => write!(f, "model_call"),
            Self::ToolCall => write!(f, "tool_call"),
            Self::ToolResult => write!(f, "tool_result"),
        }
    }
}

/// One recorded interaction within a run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "step_type", rename_all = "snake_case")]
pub enum TraceStep {
    ModelCall {
        timestamp: DateTime<Utc>,
        /// The history sent to the model
        messages: Vec<Message>,
        /// Names of the tools offered
        tools: Vec<String>,
        /// Model parameters, secrets removed
        #[serde(default, skip_serializing_if = "Map::is_empty")]
        params: Map<String, Value>,
    },
    ToolCall {
        timestamp: DateTime<Utc>,
        call_id: String,
        tool_name: String,
        /// Parsed arguments, or the raw text when it was not valid JSON
        arguments: Value,
    },
    ToolResult {
        timestamp: DateTime<Utc>,
        call_id: String,
        tool_name: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        output: Option<String>,
        /// `"<kind>: <message>"` when the invocation failed
        #[serde(default, skip_serializing_if = "Option::is_none")]
        error: Option<String>,
    },
}

impl TraceStep {
    pub fn kind(&self) -> StepKind {
        match self {
            Self::ModelCall { .. } => StepKind::ModelCall,
            Self::ToolCall { .. } => StepKind::ToolCall,
            Self::ToolResult { .. } => StepKind::ToolResult,
        }
    }

    pub fn timestamp(&self) -> DateTime<Utc> {
        match self {
            Self::ModelCall { timestamp, .. }
            | Self::ToolCall { timestamp, .. }
            | Self::ToolResult { timestamp, .. } => *timestamp,
        }
    }
}

// ── Error ─────────────────────────────────────────────────────────────────

/// How a failed run's error is kept: its kind and message, nothing else.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TraceError {
    pub kind: ErrorKind,
    pub message: String,
}

impl From<&AgentError> for TraceError {
    fn from(err: &AgentError) -> Self {
        Self {
            kind: err.kind(),
            message: err.to_string(),
        }
    }
}

impl std::fmt::Display for TraceError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.kind, self.message)
    }
}

// ── Run ───────────────────────────────────────────────────────────────────

/// The record of one `run` call, from user input to answer or failure.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunTrace {
    /// Unique run id.
    pub run_id: String,
    /// The user message that started the run.
    pub input: String,
    /// Final answer, when the run produced one.
    pub output: Option<String>,
    /// Classified error, when the run failed or absorbed a gateway failure.
    pub error: Option<TraceError>,
    /// When the run started.
    pub start_time: DateTime<Utc>,
    /// When the run ended (None while running).
    pub end_time: Option<DateTime<Utc>>,
    /// Wall-clock duration in milliseconds (computed on end).
    pub duration_ms: Option<u64>,
    /// Token usage reported by the gateway, summed over the run.
    #[serde(default)]
    pub usage: Usage,
    /// Every recorded step, oldest first.
    pub steps: Vec<TraceStep>,
}

impl RunTrace {
    /// Start a new run trace.
    pub fn new(input: impl Into<String>) -> Self {
        Self {
            run_id: Uuid::new_v4().to_string(),
            input: input.into(),
            output: None,
            error: None,
            start_time: Utc::now(),
            end_time: None,
            duration_ms: None,
            usage: Usage::default(),
            steps: Vec::new(),
        }
    }

    /// Mark the run as finished.
    pub fn end(&mut self, output: Option<String>, error: Option<TraceError>) {
        let now = Utc::now().max(self.last_timestamp());
        self.end_time = Some(now);
        self.duration_ms = Some(
            now.signed_duration_since(self.start_time)
                .num_milliseconds()
                .max(0) as u64,
        );
        self.output = output;
        self.error = error;
    }

    pub fn is_finished(&self) -> bool {
        self.end_time.is_some()
    }

    /// The latest timestamp in the trace (the start time when empty).
    pub fn last_timestamp(&self) -> DateTime<Utc> {
        self.steps
            .last()
            .map(TraceStep::timestamp)
            .unwrap_or(self.start_time)
    }

    /// Add usage reported by one model call.
    pub fn add_usage(&mut self, usage: &Usage) {
        let total = &mut self.usage;
        total.prompt_tokens = total.prompt_tokens.saturating_add(usage.prompt_tokens);
        total.completion_tokens = total
            .completion_tokens
            .saturating_add(usage.completion_tokens);
        total.total_tokens = total.total_tokens.saturating_add(usage.total_tokens);
    }

    /// Number of steps of the given kind.
    pub fn count(&self, kind: StepKind) -> usize {
        self.steps.iter().filter(|s| s.kind() == kind).count()
    }

    /// Step kinds in order, handy for asserting on the shape of a run.
    pub fn step_kinds(&self) -> Vec<StepKind> {
        self.steps.iter().map(TraceStep::kind).collect()
    }

    /// Serialize to JSON.
    pub fn to_json(&self) -> Result<Value, serde_json::Error> {
        serde_json::to_value(self)
    }
}
