//! Tool registry: registration, argument binding, validation and dispatch.
//!
//! The agent loop uses this to:
//! 1. Get tool definitions to send to the model
//! 2. Turn a model-issued [`ToolInvocationRequest`] into a native call
//!
//! An invocation goes through lookup, JSON parsing, binding (missing or
//! unknown arguments), a shallow type check, and finally the native function.
//! Any failure before the last stage means the function is never called.

use futures::FutureExt;
use microclaw_core::error::AgentError;
use microclaw_core::gateway::ToolDefinition;
use microclaw_core::message::ToolInvocationRequest;
use microclaw_core::tool::{ToolArgs, ToolSpec, json_type_name};
use microclaw_telemetry::Tracer;
use serde_json::{Map, Value};
use std::any::Any;
use std::collections::HashMap;
use std::panic::AssertUnwindSafe;
use tracing::{debug, warn};

use crate::function::FunctionTool;

/// What can be registered: a function still to be described, or a spec
/// that is already complete.
#[derive(Debug)]
pub enum ToolSource {
    Function(FunctionTool),
    Spec(ToolSpec),
}

impl From<FunctionTool> for ToolSource {
    fn from(tool: FunctionTool) -> Self {
        Self::Function(tool)
    }
}

impl From<ToolSpec> for ToolSource {
    fn from(spec: ToolSpec) -> Self {
        Self::Spec(spec)
    }
}

/// A registry of available tools, kept in registration order.
#[derive(Debug, Default)]
pub struct ToolRegistry {
    tools: Vec<ToolSpec>,
    index: HashMap<String, usize>,
    strict: bool,
}

impl ToolRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// A registry whose duplicate registrations fail and whose tools are
    /// all marked strict.
    pub fn strict() -> Self {
        Self {
            strict: true,
            ..Self::default()
        }
    }

    pub fn is_strict(&self) -> bool {
        self.strict
    }

    /// Register a tool, deriving its spec if it is a function.
    ///
    /// Returns the registered spec, or `None` when a tool with the same
    /// name already exists and this registry is not strict (the first one
    /// is kept). In strict mode a duplicate is an error.
    pub fn register(
        &mut self,
        source: impl Into<ToolSource>,
        explicit_name: Option<&str>,
    ) -> Result<Option<&ToolSpec>, AgentError> {
        let mut spec = match source.into() {
            ToolSource::Function(tool) => tool.into_spec(explicit_name),
            ToolSource::Spec(mut spec) => {
                if let Some(name) = explicit_name {
                    spec.name = name.to_string();
                }
                spec
            }
        };

        if self.index.contains_key(&spec.name) {
            if self.strict {
                return Err(AgentError::DuplicateTool { name: spec.name });
            }
            warn!(tool = %spec.name, "Tool already registered, skipping");
            return Ok(None);
        }

        if self.strict {
            spec.strict = true;
        }

        debug!(tool = %spec.name, params = spec.parameters.len(), "Registered tool");
        self.index.insert(spec.name.clone(), self.tools.len());
        self.tools.push(spec);
        Ok(self.tools.last())
    }

    /// Get a tool by name.
    pub fn get(&self, name: &str) -> Option<&ToolSpec> {
        self.index.get(name).map(|&i| &self.tools[i])
    }

    /// All tool definitions, in registration order.
    pub fn definitions(&self) -> Vec<ToolDefinition> {
        self.tools.iter().map(ToolSpec::to_definition).collect()
    }

    /// All registered tool names, in registration order.
    pub fn names(&self) -> Vec<&str> {
        self.tools.iter().map(|t| t.name.as_str()).collect()
    }

    pub fn len(&self) -> usize {
        self.tools.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tools.is_empty()
    }

    /// Whether `err`, raised while invoking `tool_name`, must fail the run
    /// rather than be fed back to the model.
    pub fn is_fatal(&self, tool_name: &str, err: &AgentError) -> bool {
        !err.is_recoverable() || self.strict || self.get(tool_name).is_some_and(|t| t.strict)
    }

    /// Invoke a tool and mirror the attempt and its outcome into `tracer`.
    pub async fn invoke_traced(
        &self,
        request: &ToolInvocationRequest,
        tracer: &mut Tracer,
    ) -> Result<String, AgentError> {
        tracer.record_tool_call(&request.id, &request.tool_name, &request.arguments);
        let result = self.invoke(&request.tool_name, &request.arguments).await;
        tracer.record_tool_result(&request.id, &request.tool_name, result.as_deref());
        result
    }

    /// Look up, bind, validate and execute a tool call.
    pub async fn invoke(&self, tool_name: &str, arguments: &str) -> Result<String, AgentError> {
        let tool = self.get(tool_name).ok_or_else(|| AgentError::ToolNotFound {
            tool_name: tool_name.to_string(),
        })?;

        let supplied = parse_arguments(tool_name, arguments)?;
        let args = bind(tool, supplied)?;

        debug!(tool = %tool_name, args = args.len(), "Executing tool");

        match AssertUnwindSafe(tool.function.call(args)).catch_unwind().await {
            Ok(Ok(output)) => Ok(output),
            Ok(Err(failure)) => Err(AgentError::ToolExecution {
                tool_name: tool_name.to_string(),
                error_type: failure.error_type,
                message: failure.message,
            }),
            Err(payload) => Err(AgentError::ToolExecution {
                tool_name: tool_name.to_string(),
                error_type: "panic".into(),
                message: panic_message(payload.as_ref()),
            }),
        }
    }
}

/// Parse the wire arguments into a JSON object. An empty string means no
/// arguments.
fn parse_arguments(tool_name: &str, arguments: &str) -> Result<Map<String, Value>, AgentError> {
    let invalid = |reason: String| AgentError::InvalidToolArguments {
        tool_name: tool_name.to_string(),
        reason,
    };

    if arguments.trim().is_empty() {
        return Ok(Map::new());
    }

    match serde_json::from_str::<Value>(arguments) {
        Ok(Value::Object(map)) => Ok(map),
        Ok(other) => Err(invalid(format!(
            "arguments must be a JSON object, got {}",
            json_type_name(&other)
        ))),
        Err(e) => Err(invalid(format!("Invalid JSON in tool arguments: {e}"))),
    }
}

/// Bind supplied arguments to the declared parameters, all or nothing.
fn bind(tool: &ToolSpec, mut supplied: Map<String, Value>) -> Result<ToolArgs, AgentError> {
    let invalid = |reason: String| AgentError::InvalidToolArguments {
        tool_name: tool.name.clone(),
        reason,
    };

    let missing: Vec<&str> = tool
        .parameters
        .iter()
        .filter(|p| p.required && !supplied.contains_key(&p.name))
        .map(|p| p.name.as_str())
        .collect();
    if !missing.is_empty() {
        return Err(invalid(format!(
            "missing required argument(s): {}",
            quoted(&missing)
        )));
    }

    let unknown: Vec<&str> = supplied
        .keys()
        .filter(|key| tool.parameter(key).is_none())
        .map(String::as_str)
        .collect();
    if !unknown.is_empty() {
        return Err(invalid(format!(
            "unexpected argument(s): {}",
            quoted(&unknown)
        )));
    }

    for (name, value) in &supplied {
        if let Some(param) = tool.parameter(name) {
            if !param.check(value) {
                return Err(invalid(format!(
                    "invalid type for argument '{name}': expected {}, got {}",
                    param.type_label,
                    json_type_name(value)
                )));
            }
        }
    }

    for param in &tool.parameters {
        if let Some(default) = &param.default {
            supplied
                .entry(param.name.clone())
                .or_insert_with(|| default.clone());
        }
    }

    Ok(ToolArgs::new(supplied))
}

fn quoted(names: &[&str]) -> String {
    names
        .iter()
        .map(|n| format!("'{n}'"))
        .collect::<Vec<_>>()
        .join(", ")
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "tool panicked".to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use microclaw_core::error::ErrorKind;
    use microclaw_core::tool::{ArgError, ParameterSpec, SchemaType};
    use std::collections::HashMap;
    use std::sync::Arc;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn add_tool() -> FunctionTool {
        FunctionTool::new("add", |args: &ToolArgs| {
            Ok::<_, ArgError>(args.get::<i64>("a")? + args.get::<i64>("b")?)
        })
        .describe("Add two numbers.")
        .param::<i64>("a")
        .param::<i64>("b")
    }

    fn counted_tool(counter: Arc<AtomicUsize>) -> FunctionTool {
        FunctionTool::new("counted", move |args: &ToolArgs| {
            counter.fetch_add(1, Ordering::SeqCst);
            args.get::<i64>("x")
        })
        .param::<i64>("x")
    }

    fn kind_of(result: Result<String, AgentError>) -> ErrorKind {
        result.unwrap_err().kind()
    }

    #[test]
    fn register_and_lookup() {
        let mut registry = ToolRegistry::new();
        let spec = registry.register(add_tool(), None).unwrap().unwrap();
        assert_eq!(spec.name, "add");
        assert!(registry.get("add").is_some());
        assert!(registry.get("nonexistent").is_none());
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn definitions_keep_registration_order() {
        let mut registry = ToolRegistry::new();
        registry.register(add_tool(), Some("zeta")).unwrap();
        registry.register(add_tool(), Some("alpha")).unwrap();
        let defs = registry.definitions();
        assert_eq!(defs[0].name, "zeta");
        assert_eq!(defs[1].name, "alpha");
        assert_eq!(defs[0].parameters["required"], serde_json::json!(["a", "b"]));
        assert_eq!(registry.names(), vec!["zeta", "alpha"]);
    }

    #[test]
    fn duplicate_skipped_when_lenient() {
        let mut registry = ToolRegistry::new();
        registry.register(add_tool().describe("first"), Some("x")).unwrap();
        let second = registry.register(add_tool().describe("second"), Some("x")).unwrap();
        assert!(second.is_none());
        assert_eq!(registry.len(), 1);
        assert_eq!(registry.get("x").unwrap().description, "first");
    }

    #[test]
    fn duplicate_rejected_when_strict() {
        let mut registry = ToolRegistry::strict();
        registry.register(add_tool(), Some("x")).unwrap();
        let err = registry.register(add_tool(), Some("x")).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::DuplicateTool);
        assert!(registry.get("x").unwrap().strict);
    }

    #[test]
    fn prebuilt_spec_registers_as_is() {
        let spec = add_tool().into_spec(Some("sum"));
        let mut registry = ToolRegistry::new();
        registry.register(spec, None).unwrap();
        assert!(registry.get("sum").is_some());
    }

    #[tokio::test]
    async fn invoke_happy_path() {
        let mut registry = ToolRegistry::new();
        registry.register(add_tool(), None).unwrap();
        let out = registry.invoke("add", r#"{"a": 2, "b": 3}"#).await.unwrap();
        assert_eq!(out, "5");
    }

    #[tokio::test]
    async fn defaults_fill_omitted_parameters() {
        let greet = FunctionTool::new("greet", |args: &ToolArgs| {
            Ok::<_, ArgError>(format!(
                "Hello, {} {}",
                args.get::<String>("title")?,
                args.get::<String>("name")?
            ))
        })
        .param::<String>("name")
        .param_or("title", "Mr.".to_string());

        let mut registry = ToolRegistry::new();
        registry.register(greet, None).unwrap();

        let out = registry.invoke("greet", r#"{"name": "Smith"}"#).await.unwrap();
        assert_eq!(out, "Hello, Mr. Smith");
        let out = registry
            .invoke("greet", r#"{"name": "Smith", "title": "Dr."}"#)
            .await
            .unwrap();
        assert_eq!(out, "Hello, Dr. Smith");
    }

    #[tokio::test]
    async fn unknown_tool_is_not_found() {
        let registry = ToolRegistry::new();
        let result = registry.invoke("nope", "{}").await;
        assert_eq!(kind_of(result), ErrorKind::ToolNotFound);
    }

    #[tokio::test]
    async fn malformed_json_is_rejected_with_tool_name() {
        let mut registry = ToolRegistry::new();
        registry.register(add_tool(), None).unwrap();
        let err = registry.invoke("add", "{\"a\": 1,").await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidToolArguments);
        assert!(err.to_string().contains("'add'"));
        assert!(err.to_string().contains("Invalid JSON"));
    }

    #[tokio::test]
    async fn non_object_arguments_rejected() {
        let mut registry = ToolRegistry::new();
        registry.register(add_tool(), None).unwrap();
        let err = registry.invoke("add", "[1, 2]").await.unwrap_err();
        assert!(err.to_string().contains("got array"));
    }

    #[tokio::test]
    async fn missing_argument_never_calls_function() {
        let counter = Arc::new(AtomicUsize::new(0));
        let mut registry = ToolRegistry::new();
        registry.register(counted_tool(counter.clone()), None).unwrap();

        let err = registry.invoke("counted", "{}").await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidToolArguments);
        assert!(err.to_string().contains("'x'"));
        assert_eq!(counter.load(Ordering::SeqCst), 0);

        registry.invoke("counted", r#"{"x": 1}"#).await.unwrap();
        assert_eq!(counter.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn unknown_argument_rejected_atomically() {
        let counter = Arc::new(AtomicUsize::new(0));
        let mut registry = ToolRegistry::new();
        registry.register(counted_tool(counter.clone()), None).unwrap();

        let err = registry
            .invoke("counted", r#"{"x": 1, "y": 2}"#)
            .await
            .unwrap_err();
        assert!(err.to_string().contains("unexpected argument(s): 'y'"));
        assert_eq!(counter.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn type_mismatch_names_parameter_and_types() {
        let counter = Arc::new(AtomicUsize::new(0));
        let mut registry = ToolRegistry::new();
        registry.register(counted_tool(counter.clone()), None).unwrap();

        let err = registry
            .invoke("counted", r#"{"x": "not_an_int"}"#)
            .await
            .unwrap_err();
        let text = err.to_string();
        assert!(text.contains("'x'"));
        assert!(text.contains("expected integer"));
        assert!(text.contains("got string"));
        assert_eq!(counter.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn nested_container_elements_checked() {
        let tool = FunctionTool::new("total", |args: &ToolArgs| {
            let items: Vec<HashMap<String, i64>> = args.get("items")?;
            Ok::<_, ArgError>(items.iter().flat_map(|m| m.values()).sum::<i64>())
        })
        .param::<Vec<HashMap<String, i64>>>("items")
        .param_or::<Option<i64>>("limit", None);

        let mut registry = ToolRegistry::new();
        registry.register(tool, None).unwrap();

        let spec = registry.get("total").unwrap();
        assert_eq!(spec.parameter("items").unwrap().schema_type, SchemaType::Array);
        assert_eq!(spec.parameter("limit").unwrap().schema_type, SchemaType::Integer);

        let out = registry
            .invoke("total", r#"{"items": [{"a": 1}, {"b": 2}]}"#)
            .await
            .unwrap();
        assert_eq!(out, "3");

        let err = registry
            .invoke("total", r#"{"items": [{"a": "one"}]}"#)
            .await
            .unwrap_err();
        assert!(err.to_string().contains("expected array<object<integer>>"));
    }

    #[tokio::test]
    async fn null_only_accepted_for_optional_types() {
        let mut registry = ToolRegistry::new();
        registry
            .register(
                FunctionTool::new("maybe", |args: &ToolArgs| {
                    let n: Option<i64> = args.get("n")?;
                    Ok::<_, ArgError>(n.map_or("none".to_string(), |n| n.to_string()))
                })
                .param::<Option<i64>>("n"),
                None,
            )
            .unwrap();
        registry.register(add_tool(), None).unwrap();

        assert_eq!(registry.invoke("maybe", r#"{"n": null}"#).await.unwrap(), "none");
        let err = registry
            .invoke("add", r#"{"a": null, "b": 1}"#)
            .await
            .unwrap_err();
        assert!(err.to_string().contains("got null"));
    }

    #[tokio::test]
    async fn execution_error_carries_type_and_message() {
        let mut registry = ToolRegistry::new();
        registry
            .register(
                FunctionTool::new("error_func", |_: &ToolArgs| {
                    Err::<String, _>(anyhow::anyhow!("Something went wrong"))
                })
                .describe("Raise an error."),
                None,
            )
            .unwrap();

        let err = registry.invoke("error_func", "").await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::ToolExecutionError);
        let text = err.to_string();
        assert!(text.contains("Error executing tool 'error_func'"));
        assert!(text.contains("Something went wrong"));
    }

    #[tokio::test]
    async fn panics_are_contained() {
        let mut registry = ToolRegistry::new();
        registry
            .register(
                FunctionTool::new("boom", |_: &ToolArgs| -> Result<String, ArgError> {
                    panic!("kaboom")
                }),
                None,
            )
            .unwrap();

        match registry.invoke("boom", "{}").await.unwrap_err() {
            AgentError::ToolExecution {
                error_type,
                message,
                ..
            } => {
                assert_eq!(error_type, "panic");
                assert_eq!(message, "kaboom");
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[tokio::test]
    async fn untyped_parameter_accepts_anything() {
        let mut registry = ToolRegistry::new();
        registry
            .register(
                FunctionTool::new("echo", |args: &ToolArgs| {
                    Ok::<_, ArgError>(args.raw("value").cloned().unwrap_or_default())
                })
                .untyped_param("value"),
                None,
            )
            .unwrap();

        let out = registry.invoke("echo", r#"{"value": [1, 2]}"#).await.unwrap();
        assert_eq!(out, "[1,2]");
        assert_eq!(
            registry.get("echo").unwrap().parameter("value").unwrap().schema_type,
            SchemaType::String
        );
    }

    #[tokio::test]
    async fn traced_invocation_records_call_and_result() {
        let mut registry = ToolRegistry::new();
        registry.register(add_tool(), None).unwrap();
        let mut tracer = Tracer::new(true);
        tracer.start_run("hi");

        let ok = ToolInvocationRequest::new("call_1", "add", r#"{"a": 1, "b": 1}"#);
        registry.invoke_traced(&ok, &mut tracer).await.unwrap();
        let bad = ToolInvocationRequest::new("call_2", "missing", "{}");
        registry.invoke_traced(&bad, &mut tracer).await.unwrap_err();

        let trace = tracer.current_trace().unwrap();
        assert_eq!(trace.steps.len(), 4);
        let json = trace.to_json().unwrap();
        assert_eq!(json["steps"][1]["output"], "2");
        assert_eq!(json["steps"][3]["tool_name"], "missing");
        assert!(
            json["steps"][3]["error"]
                .as_str()
                .unwrap()
                .starts_with("ToolNotFound")
        );
    }

    #[test]
    fn fatality_follows_strictness() {
        let mut lenient = ToolRegistry::new();
        lenient.register(add_tool(), None).unwrap();
        let strict_spec = ToolSpec::new(
            "strict_add",
            "",
            vec![ParameterSpec::required::<i64>("a")],
            lenient.get("add").unwrap().function.clone(),
        )
        .with_strict(true);
        lenient.register(strict_spec, None).unwrap();

        let not_found = AgentError::ToolNotFound {
            tool_name: "x".into(),
        };
        assert!(!lenient.is_fatal("x", &not_found));
        let bad_args = AgentError::InvalidToolArguments {
            tool_name: "strict_add".into(),
            reason: "missing".into(),
        };
        assert!(lenient.is_fatal("strict_add", &bad_args));
        assert!(!lenient.is_fatal("add", &bad_args));
        assert!(ToolRegistry::strict().is_fatal("x", &not_found));
        assert!(lenient.is_fatal("add", &AgentError::StepLimitExceeded { max_steps: 1 }));
    }
}
