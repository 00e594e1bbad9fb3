//! The agent reasoning loop implementation.

use microclaw_core::agent::{AgentConfig, LoopState, RunOptions};
use microclaw_core::error::{AgentError, Result};
use microclaw_core::gateway::{Gateway, GatewayRequest};
use microclaw_core::memory::ConversationStore;
use microclaw_core::message::{Message, ToolInvocationRequest};
use microclaw_core::tool::ToolSpec;
use microclaw_memory::InMemoryStore;
use microclaw_telemetry::{RunTrace, Tracer};
use microclaw_tools::{ToolRegistry, ToolSource};
use serde_json::{Value, json};
use std::sync::Arc;
use tracing::{debug, error, info, warn};

use crate::logging::init_logging;

/// An agent: a gateway, a set of tools, a conversation store and the trace
/// of its most recent run.
///
/// `run` takes `&mut self`, so one instance never has two runs in flight.
/// Share an agent across tasks behind a `tokio::sync::Mutex`.
pub struct Agent {
    /// The model backend
    gateway: Arc<dyn Gateway>,

    /// Conversation history, kept across runs until `reset`
    store: Arc<dyn ConversationStore>,

    /// Registered tools
    tools: ToolRegistry,

    /// Trace of the current or most recent run
    tracer: Tracer,

    config: AgentConfig,

    /// Where the last run got to
    state: Option<LoopState>,
}

impl Agent {
    /// Create an agent with an in-memory store bounded by
    /// `config.max_messages`.
    ///
    /// Zero limits are raised to 1: a run always calls the model at least
    /// once and a bounded store always keeps the latest message.
    pub fn new(gateway: Arc<dyn Gateway>, mut config: AgentConfig) -> Self {
        config.max_steps = at_least_one(config.max_steps);
        config.max_messages = config.max_messages.map(|n| n.max(1));

        if config.debug {
            init_logging(true);
        }

        let tools = if config.strict {
            ToolRegistry::strict()
        } else {
            ToolRegistry::new()
        };

        Self {
            gateway,
            store: Arc::new(InMemoryStore::with_limit(config.max_messages)),
            tools,
            tracer: Tracer::new(config.enable_tracing),
            config,
            state: None,
        }
    }

    /// Use a caller-provided conversation store instead of the default.
    pub fn with_store(mut self, store: Arc<dyn ConversationStore>) -> Self {
        self.store = store;
        self
    }

    /// Register a tool under its own name.
    pub fn register_tool(&mut self, tool: impl Into<ToolSource>) -> Result<Option<&ToolSpec>> {
        self.tools.register(tool, None)
    }

    /// Register a tool under `name`.
    pub fn register_tool_as(
        &mut self,
        tool: impl Into<ToolSource>,
        name: &str,
    ) -> Result<Option<&ToolSpec>> {
        self.tools.register(tool, Some(name))
    }

    /// Answer `input`, calling tools as the model requests them.
    ///
    /// Returns the model's final text. Fails with `StepLimitExceeded` when
    /// the model has not answered after `max_steps` calls. In strict mode
    /// tool and gateway failures also fail the run; otherwise tool failures
    /// are fed back to the model as text, and a gateway failure's text is
    /// returned as the answer.
    pub async fn run(&mut self, input: &str, options: RunOptions) -> Result<String> {
        let max_steps = at_least_one(options.max_steps.unwrap_or(self.config.max_steps));

        self.tracer.start_run(input);
        info!(
            run_id = self.tracer.run_id().unwrap_or("untraced"),
            max_steps,
            tools = self.tools.len(),
            "Starting run"
        );

        let result = self.drive(input, &options, max_steps).await;

        // A no-op when the run already ended on an absorbed gateway failure.
        match &result {
            Ok(output) => {
                self.state = Some(LoopState::Done);
                self.tracer.end_run(Some(output.as_str()), None);
            }
            Err(err) => {
                self.state = Some(LoopState::Failed);
                error!(error = %err, "Run failed");
                self.tracer.end_run(None, Some(err));
            }
        }
        result
    }

    async fn drive(&mut self, input: &str, options: &RunOptions, max_steps: u32) -> Result<String> {
        self.store.append(Message::user(input)).await?;

        let definitions = self.tools.definitions();
        let params = options.traced_params();

        for step in 1..=max_steps {
            self.state = Some(LoopState::AwaitingModel);

            let history = self.store.history(None).await?;
            self.tracer
                .record_model_call(&history, &definitions, params.clone());
            debug!(step, messages = history.len(), "Calling gateway");

            let request = GatewayRequest {
                messages: history,
                tools: definitions.clone(),
                options: options.clone(),
            };

            let response = match self.gateway.complete(request).await {
                Ok(response) => response,
                Err(e) => {
                    let err = AgentError::from(e);
                    if self.config.strict {
                        return Err(err);
                    }
                    warn!(step, error = %err, "Gateway call failed, returning error text");
                    let text = err.to_string();
                    self.tracer.end_run(Some(&text), Some(&err));
                    return Ok(text);
                }
            };

            if let Some(usage) = &response.usage {
                self.tracer.record_usage(usage);
            }

            if !response.tool_calls.is_empty() {
                debug!(step, count = response.tool_calls.len(), "Executing tool calls");
                for call in response.tool_calls {
                    self.act(call).await?;
                }
                self.state = Some(LoopState::Continue);
                continue;
            }

            if let Some(text) = response.final_text() {
                self.store.append(Message::assistant(text)).await?;
                info!(step, "Run finished");
                return Ok(text.to_string());
            }

            warn!(step, "Gateway returned neither text nor tool calls");
        }

        Err(AgentError::StepLimitExceeded { max_steps })
    }

    /// Run one requested tool and append the request and its result.
    async fn act(&mut self, call: ToolInvocationRequest) -> Result<()> {
        self.store
            .append(Message::tool_request(vec![call.clone()]))
            .await?;

        let content = match self.tools.invoke_traced(&call, &mut self.tracer).await {
            Ok(output) => {
                debug!(tool = %call.tool_name, call_id = %call.id, "Tool succeeded");
                output
            }
            Err(err) if self.tools.is_fatal(&call.tool_name, &err) => return Err(err),
            Err(err) => {
                warn!(tool = %call.tool_name, error = %err, "Tool failed, reporting to model");
                err.to_string()
            }
        };

        self.store
            .append(Message::tool_result(call.id, content))
            .await?;
        Ok(())
    }

    /// The current or most recent run's trace as JSON, or
    /// `{"status": "no_active_run"}`.
    pub fn explain(&self) -> Result<Value> {
        match self.tracer.current_trace() {
            Some(trace) => Ok(trace.to_json()?),
            None => Ok(json!({ "status": "no_active_run" })),
        }
    }

    /// Clear the conversation and drop the trace. Tools stay registered.
    pub async fn reset(&mut self) -> Result<()> {
        self.store.clear().await?;
        self.tracer.discard();
        self.state = None;
        debug!("Agent reset");
        Ok(())
    }

    pub fn last_trace(&self) -> Option<&RunTrace> {
        self.tracer.current_trace()
    }

    pub fn state(&self) -> Option<LoopState> {
        self.state
    }

    pub fn store(&self) -> &Arc<dyn ConversationStore> {
        &self.store
    }

    pub fn tools(&self) -> &ToolRegistry {
        &self.tools
    }

    pub fn config(&self) -> &AgentConfig {
        &self.config
    }
}

fn at_least_one(max_steps: u32) -> u32 {
    if max_steps == 0 {
        warn!("max_steps of 0 raised to 1");
    }
    max_steps.max(1)
}
