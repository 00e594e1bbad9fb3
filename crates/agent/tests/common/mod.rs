//! Helpers shared by the agent integration tests.

#![allow(dead_code)]

use microclaw_core::error::GatewayError;
use microclaw_core::gateway::{Gateway, GatewayRequest, GatewayResponse};
use microclaw_core::message::ToolInvocationRequest;
use microclaw_core::tool::{ArgError, ToolArgs};
use microclaw_tools::FunctionTool;
use std::collections::VecDeque;
use std::sync::Mutex;

/// A gateway that replays a script of canned responses.
///
/// Once the script runs out it keeps returning `fallback`, or an
/// `InvalidResponse` error when there is none. Every request is kept for
/// inspection.
pub struct ScriptedGateway {
    script: Mutex<VecDeque<Result<GatewayResponse, GatewayError>>>,
    fallback: Option<GatewayResponse>,
    requests: Mutex<Vec<GatewayRequest>>,
}

impl ScriptedGateway {
    pub fn new(responses: Vec<GatewayResponse>) -> Self {
        Self::with_results(responses.into_iter().map(Ok).collect())
    }

    pub fn with_results(results: Vec<Result<GatewayResponse, GatewayError>>) -> Self {
        Self {
            script: Mutex::new(results.into()),
            fallback: None,
            requests: Mutex::new(Vec::new()),
        }
    }

    pub fn repeating(response: GatewayResponse) -> Self {
        Self {
            fallback: Some(response),
            ..Self::new(vec![])
        }
    }

    pub fn call_count(&self) -> usize {
        self.requests.lock().unwrap().len()
    }

    pub fn requests(&self) -> Vec<GatewayRequest> {
        self.requests.lock().unwrap().clone()
    }
}

#[async_trait::async_trait]
impl Gateway for ScriptedGateway {
    fn name(&self) -> &str {
        "scripted"
    }

    async fn complete(&self, request: GatewayRequest) -> Result<GatewayResponse, GatewayError> {
        self.requests.lock().unwrap().push(request);
        match self.script.lock().unwrap().pop_front() {
            Some(result) => result,
            None => self
                .fallback
                .clone()
                .ok_or_else(|| GatewayError::InvalidResponse("script exhausted".into())),
        }
    }
}

/// A response requesting a single tool call.
pub fn call(id: &str, tool: &str, args: serde_json::Value) -> GatewayResponse {
    GatewayResponse::tool_calls(vec![ToolInvocationRequest::new(id, tool, args.to_string())])
}

pub fn add_tool() -> FunctionTool {
    FunctionTool::new("add", |args: &ToolArgs| {
        Ok::<_, ArgError>(args.get::<i64>("a")? + args.get::<i64>("b")?)
    })
    .describe("Add two numbers.")
    .param::<i64>("a")
    .param::<i64>("b")
}

/// A tool whose body always fails with `ValueError: bad input`.
pub fn failing_tool() -> FunctionTool {
    FunctionTool::new("explode", |_: &ToolArgs| Err::<String, _>(ValueError("bad input".into())))
        .describe("Always fails.")
}

#[derive(Debug)]
pub struct ValueError(pub String);

impl std::fmt::Display for ValueError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}
