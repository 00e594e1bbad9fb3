//! Function tools: plain Rust closures made callable by the model.
//!
//! Rust has no runtime reflection over function signatures, so a
//! [`FunctionTool`] declares its parameters next to the closure. Each
//! declaration carries the Rust type, which fixes the schema type and the
//! structural check; declaring a default is what makes a parameter optional.
//!
//! ```rust,ignore
//! let add = FunctionTool::new("add", |args: &ToolArgs| {
//!     Ok::<_, ArgError>(args.get::<i64>("a")? + args.get::<i64>("b")?)
//! })
//! .describe("Add two numbers.")
//! .param::<i64>("a")
//! .param::<i64>("b");
//! ```

use async_trait::async_trait;
use microclaw_core::tool::{NativeFunction, ParamType, ParameterSpec, ToolArgs, ToolFailure, ToolSpec};
use serde::Serialize;
use std::fmt::Display;
use std::future::Future;
use std::marker::PhantomData;
use std::sync::Arc;

/// A native function plus its declared parameters, not yet registered.
pub struct FunctionTool {
    name: String,
    description: String,
    parameters: Vec<ParameterSpec>,
    function: Arc<dyn NativeFunction>,
}

impl std::fmt::Debug for FunctionTool {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FunctionTool")
            .field("name", &self.name)
            .field("parameters", &self.parameters)
            .finish_non_exhaustive()
    }
}

impl FunctionTool {
    /// Wrap a synchronous function. Its return value is rendered with
    /// `Display`; its error keeps its type name and message.
    pub fn new<F, O, E>(name: impl Into<String>, function: F) -> Self
    where
        F: Fn(&ToolArgs) -> Result<O, E> + Send + Sync + 'static,
        O: Display + 'static,
        E: Display + 'static,
    {
        Self::from_native(
            name,
            SyncFn {
                function,
                _types: PhantomData,
            },
        )
    }

    /// Wrap an async function.
    pub fn new_async<F, Fut, O, E>(name: impl Into<String>, function: F) -> Self
    where
        F: Fn(ToolArgs) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<O, E>> + Send + 'static,
        O: Display + 'static,
        E: Display + 'static,
    {
        Self::from_native(
            name,
            AsyncFn {
                function,
                _types: PhantomData,
            },
        )
    }

    /// Wrap anything implementing [`NativeFunction`].
    pub fn from_native(name: impl Into<String>, function: impl NativeFunction + 'static) -> Self {
        Self {
            name: name.into(),
            description: String::new(),
            parameters: Vec::new(),
            function: Arc::new(function),
        }
    }

    /// The description shown to the model (the function's doc text).
    pub fn describe(mut self, description: impl Into<String>) -> Self {
        self.description = description.into().trim().to_string();
        self
    }

    /// Declare a required parameter of type `T`.
    pub fn param<T: ParamType>(mut self, name: impl Into<String>) -> Self {
        self.parameters.push(ParameterSpec::required::<T>(name));
        self
    }

    /// Declare an optional parameter of type `T` with its default.
    pub fn param_or<T: ParamType + Serialize>(mut self, name: impl Into<String>, default: T) -> Self {
        self.parameters.push(ParameterSpec::with_default(name, default));
        self
    }

    /// Declare a required parameter with no type: advertised as a string,
    /// never type-checked.
    pub fn untyped_param(mut self, name: impl Into<String>) -> Self {
        self.parameters.push(ParameterSpec::untyped(name));
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Derive the tool's spec, optionally under a different name.
    pub fn into_spec(self, explicit_name: Option<&str>) -> ToolSpec {
        let name = explicit_name.map(str::to_string).unwrap_or(self.name);
        ToolSpec::new(name, self.description, self.parameters, self.function)
    }
}

struct SyncFn<F, O, E> {
    function: F,
    _types: PhantomData<fn() -> (O, E)>,
}

#[async_trait]
impl<F, O, E> NativeFunction for SyncFn<F, O, E>
where
    F: Fn(&ToolArgs) -> Result<O, E> + Send + Sync,
    O: Display,
    E: Display,
{
    async fn call(&self, args: ToolArgs) -> Result<String, ToolFailure> {
        (self.function)(&args)
            .map(|output| output.to_string())
            .map_err(ToolFailure::from_error)
    }
}

struct AsyncFn<F, O, E> {
    function: F,
    _types: PhantomData<fn() -> (O, E)>,
}

#[async_trait]
impl<F, Fut, O, E> NativeFunction for AsyncFn<F, O, E>
where
    F: Fn(ToolArgs) -> Fut + Send + Sync,
    Fut: Future<Output = Result<O, E>> + Send,
    O: Display,
    E: Display,
{
    async fn call(&self, args: ToolArgs) -> Result<String, ToolFailure> {
        (self.function)(args)
            .await
            .map(|output| output.to_string())
            .map_err(ToolFailure::from_error)
    }
}
