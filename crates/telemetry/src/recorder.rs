//! The trace recorder owned by an agent.
//!
//! Holds at most one [`RunTrace`]: starting a run discards the previous one.
//! Every `record_*` call is a no-op when tracing is disabled or no run is
//! active, so callers never branch on whether tracing is on.

use chrono::{DateTime, Utc};
use microclaw_core::error::AgentError;
use microclaw_core::gateway::{ToolDefinition, Usage};
use microclaw_core::message::Message;
use serde_json::{Map, Value};

use crate::model::{RunTrace, TraceError, TraceStep};

/// Collects the structured trace of the current (or most recent) run.
#[derive(Debug, Clone)]
pub struct Tracer {
    enabled: bool,
    current: Option<RunTrace>,
}

impl Tracer {
    pub fn new(enabled: bool) -> Self {
        Self {
            enabled,
            current: None,
        }
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    // ── Run lifecycle ─────────────────────────────────────────────────

    /// Start tracing a new run, discarding the previous trace.
    pub fn start_run(&mut self, input: &str) {
        if !self.enabled {
            return;
        }
        self.current = Some(RunTrace::new(input));
    }

    /// Finish the current run with its output or error.
    pub fn end_run(&mut self, output: Option<&str>, error: Option<&AgentError>) {
        let Some(run) = self.active_run() else {
            return;
        };
        run.end(output.map(str::to_string), error.map(TraceError::from));
    }

    /// Drop the current trace.
    pub fn discard(&mut self) {
        self.current = None;
    }

    /// The current or most recent run's trace.
    pub fn current_trace(&self) -> Option<&RunTrace> {
        self.current.as_ref()
    }

    pub fn run_id(&self) -> Option<&str> {
        self.current.as_ref().map(|run| run.run_id.as_str())
    }

    // ── Step logging ──────────────────────────────────────────────────

    /// Log a request to the model.
    pub fn record_model_call(
        &mut self,
        messages: &[Message],
        tools: &[ToolDefinition],
        params: Map<String, Value>,
    ) {
        self.push_step(|timestamp| TraceStep::ModelCall {
            timestamp,
            messages: messages.to_vec(),
            tools: tools.iter().map(|t| t.name.clone()).collect(),
            params,
        });
    }

    /// Log a tool invocation requested by the model.
    ///
    /// `raw_arguments` is kept as parsed JSON when it parses, as a string
    /// otherwise, so malformed calls still show up verbatim.
    pub fn record_tool_call(&mut self, call_id: &str, tool_name: &str, raw_arguments: &str) {
        self.push_step(|timestamp| TraceStep::ToolCall {
            timestamp,
            call_id: call_id.to_string(),
            tool_name: tool_name.to_string(),
            arguments: serde_json::from_str(raw_arguments)
                .unwrap_or_else(|_| Value::String(raw_arguments.to_string())),
        });
    }

    /// Log the output or error of a tool invocation.
    pub fn record_tool_result(
        &mut self,
        call_id: &str,
        tool_name: &str,
        outcome: Result<&str, &AgentError>,
    ) {
        let (output, error) = match outcome {
            Ok(output) => (Some(output.to_string()), None),
            Err(err) => (None, Some(err.summary())),
        };
        self.push_step(|timestamp| TraceStep::ToolResult {
            timestamp,
            call_id: call_id.to_string(),
            tool_name: tool_name.to_string(),
            output,
            error,
        });
    }

    /// Add usage reported by the gateway.
    pub fn record_usage(&mut self, usage: &Usage) {
        if let Some(run) = self.active_run() {
            run.add_usage(usage);
        }
    }

    fn active_run(&mut self) -> Option<&mut RunTrace> {
        if !self.enabled {
            return None;
        }
        self.current.as_mut().filter(|run| !run.is_finished())
    }

    fn push_step(&mut self, build: impl FnOnce(DateTime<Utc>) -> TraceStep) {
        let Some(run) = self.active_run() else {
            return;
        };
        // Steps must be strictly ordered even when the clock has not advanced.
        let last = run.last_timestamp();
        let now = Utc::now();
        let timestamp = if now > last {
            now
        } else {
            last + chrono::Duration::nanoseconds(1)
        };
        run.steps.push(build(timestamp));
    }
}

impl Default for Tracer {
    fn default() -> Self {
        Self::new(true)
    }
}
