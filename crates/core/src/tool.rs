//! Tool domain types: the contract between model-issued JSON and native code.
//!
//! A tool is described once, at registration time, by a [`ToolSpec`]: a name,
//! a description, one [`ParameterSpec`] per declared parameter, and the
//! [`NativeFunction`] that does the work. Parameter types are declared through
//! the [`ParamType`] trait, which maps a Rust type onto one of the six JSON
//! schema types and knows how to structurally check a JSON value against it.

use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::{BTreeMap, HashMap, HashSet};
use std::sync::Arc;

use crate::gateway::ToolDefinition;

/// Number of container elements (or map values) checked during validation.
pub const CONTAINER_SAMPLE: usize = 5;

/// The JSON schema types a parameter can be declared as.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SchemaType {
    String,
    Integer,
    Number,
    Boolean,
    Array,
    Object,
}

impl std::fmt::Display for SchemaType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::String => write!(f, "string"),
            Self::Integer => write!(f, "integer"),
            Self::Number => write!(f, "number"),
            Self::Boolean => write!(f, "boolean"),
            Self::Array => write!(f, "array"),
            Self::Object => write!(f, "object"),
        }
    }
}

/// The runtime type name of a JSON value, as reported in validation errors.
pub fn json_type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(n) if n.is_f64() => "number",
        Value::Number(_) => "integer",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

/// A Rust type that can be declared as a tool parameter.
///
/// `Option<T>` reduces to `T`'s schema type and additionally accepts `null`.
/// `serde_json::Value` is the untyped parameter: it is advertised as
/// `"string"` and accepts anything.
pub trait ParamType {
    /// The schema type advertised to the model.
    fn schema_type() -> SchemaType;

    /// A readable name for the declared type, used in error messages.
    fn type_label() -> String {
        Self::schema_type().to_string()
    }

    /// Shallow structural check. Containers check their kind and at most
    /// [`CONTAINER_SAMPLE`] elements.
    fn accepts(value: &Value) -> bool;
}

impl ParamType for String {
    fn schema_type() -> SchemaType {
        SchemaType::String
    }

    fn accepts(value: &Value) -> bool {
        value.is_string()
    }
}

impl ParamType for bool {
    fn schema_type() -> SchemaType {
        SchemaType::Boolean
    }

    fn accepts(value: &Value) -> bool {
        value.is_boolean()
    }
}

macro_rules! integer_param {
    ($($t:ty),*) => {$(
        impl ParamType for $t {
            fn schema_type() -> SchemaType {
                SchemaType::Integer
            }

            fn accepts(value: &Value) -> bool {
                if let Some(n) = value.as_i64() {
                    <$t>::try_from(n).is_ok()
                } else if let Some(n) = value.as_u64() {
                    <$t>::try_from(n).is_ok()
                } else {
                    false
                }
            }
        }
    )*};
}

integer_param!(i8, i16, i32, i64, isize, u8, u16, u32, u64, usize);

macro_rules! number_param {
    ($($t:ty),*) => {$(
        impl ParamType for $t {
            fn schema_type() -> SchemaType {
                SchemaType::Number
            }

            fn accepts(value: &Value) -> bool {
                value.is_number()
            }
        }
    )*};
}

number_param!(f32, f64);

fn sample_accepts<'a, T: ParamType>(items: impl Iterator<Item = &'a Value>) -> bool {
    items.take(CONTAINER_SAMPLE).all(|item| T::accepts(item))
}

impl<T: ParamType> ParamType for Vec<T> {
    fn schema_type() -> SchemaType {
        SchemaType::Array
    }

    fn type_label() -> String {
        format!("array<{}>", T::type_label())
    }

    fn accepts(value: &Value) -> bool {
        value
            .as_array()
            .is_some_and(|items| sample_accepts::<T>(items.iter()))
    }
}

impl<T: ParamType> ParamType for HashSet<T> {
    fn schema_type() -> SchemaType {
        SchemaType::Array
    }

    fn type_label() -> String {
        format!("array<{}>", T::type_label())
    }

    fn accepts(value: &Value) -> bool {
        <Vec<T>>::accepts(value)
    }
}

impl<T: ParamType> ParamType for HashMap<String, T> {
    fn schema_type() -> SchemaType {
        SchemaType::Object
    }

    fn type_label() -> String {
        format!("object<{}>", T::type_label())
    }

    fn accepts(value: &Value) -> bool {
        value
            .as_object()
            .is_some_and(|map| sample_accepts::<T>(map.values()))
    }
}

impl<T: ParamType> ParamType for BTreeMap<String, T> {
    fn schema_type() -> SchemaType {
        SchemaType::Object
    }

    fn type_label() -> String {
        format!("object<{}>", T::type_label())
    }

    fn accepts(value: &Value) -> bool {
        <HashMap<String, T>>::accepts(value)
    }
}

impl ParamType for Map<String, Value> {
    fn schema_type() -> SchemaType {
        SchemaType::Object
    }

    fn accepts(value: &Value) -> bool {
        value.is_object()
    }
}

impl ParamType for Value {
    fn schema_type() -> SchemaType {
        SchemaType::String
    }

    fn type_label() -> String {
        "any".into()
    }

    fn accepts(_value: &Value) -> bool {
        true
    }
}

impl<T: ParamType> ParamType for Option<T> {
    fn schema_type() -> SchemaType {
        T::schema_type()
    }

    fn type_label() -> String {
        format!("{}|null", T::type_label())
    }

    fn accepts(value: &Value) -> bool {
        value.is_null() || T::accepts(value)
    }
}

/// One declared parameter of a tool.
#[derive(Debug, Clone, Serialize)]
pub struct ParameterSpec {
    pub name: String,

    /// Schema type advertised to the model
    pub schema_type: SchemaType,

    /// Declared type, for error messages (e.g. `array<integer>`)
    pub type_label: String,

    /// Required iff no default was declared
    pub required: bool,

    /// Value bound when the model omits the parameter
    #[serde(skip_serializing_if = "Option::is_none")]
    pub default: Option<Value>,

    #[serde(skip)]
    accepts: fn(&Value) -> bool,
}

impl ParameterSpec {
    /// A required parameter of type `T`.
    pub fn required<T: ParamType>(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            schema_type: T::schema_type(),
            type_label: T::type_label(),
            required: true,
            default: None,
            accepts: T::accepts,
        }
    }

    /// An optional parameter of type `T`, bound to `default` when omitted.
    pub fn with_default<T: ParamType + Serialize>(name: impl Into<String>, default: T) -> Self {
        Self {
            required: false,
            default: Some(serde_json::to_value(default).unwrap_or(Value::Null)),
            ..Self::required::<T>(name)
        }
    }

    /// A parameter with no declared type: advertised as a string, never checked.
    pub fn untyped(name: impl Into<String>) -> Self {
        Self::required::<Value>(name)
    }

    /// Structural check of a bound value against the declared type.
    pub fn check(&self, value: &Value) -> bool {
        (self.accepts)(value)
    }
}

/// Arguments bound to a tool's parameters, handed to its native function.
///
/// Every declared parameter is present (defaults already applied) and has
/// passed its structural check by the time the function sees it.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ToolArgs(Map<String, Value>);

impl ToolArgs {
    pub fn new(values: Map<String, Value>) -> Self {
        Self(values)
    }

    /// Decode the named argument into `T`.
    pub fn get<T: DeserializeOwned>(&self, name: &str) -> Result<T, ArgError> {
        let value = self
            .0
            .get(name)
            .ok_or_else(|| ArgError::Missing(name.to_string()))?;
        T::deserialize(value).map_err(|e| ArgError::Decode {
            name: name.to_string(),
            reason: e.to_string(),
        })
    }

    /// The raw JSON value of the named argument.
    pub fn raw(&self, name: &str) -> Option<&Value> {
        self.0.get(name)
    }

    pub fn as_map(&self) -> &Map<String, Value> {
        &self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

/// Failure to read a bound argument inside a tool body.
#[derive(Debug, Clone, thiserror::Error)]
pub enum ArgError {
    #[error("missing argument '{0}'")]
    Missing(String),

    #[error("argument '{name}' could not be decoded: {reason}")]
    Decode { name: String, reason: String },
}

/// A failure raised by a tool body: the error's type name and message.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ToolFailure {
    pub error_type: String,
    pub message: String,
}

impl ToolFailure {
    pub fn new(error_type: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            error_type: error_type.into(),
            message: message.into(),
        }
    }

    /// Capture any displayable error along with its type name.
    pub fn from_error<E: std::fmt::Display>(err: E) -> Self {
        Self::new(short_type_name::<E>(), err.to_string())
    }
}

/// `core::num::error::ParseIntError` → `ParseIntError`.
fn short_type_name<T: ?Sized>() -> &'static str {
    let full = std::any::type_name::<T>();
    let base = full.split('<').next().unwrap_or(full);
    base.rsplit("::").next().unwrap_or(base)
}

/// The callable behind a tool.
///
/// Closures are adapted by `microclaw_tools::FunctionTool`; stateful tools can
/// implement this trait directly.
#[async_trait]
pub trait NativeFunction: Send + Sync {
    /// Run the tool body. The return value is the text handed back to the model.
    async fn call(&self, args: ToolArgs) -> Result<String, ToolFailure>;
}

/// Static description of a callable capability.
#[derive(Clone)]
pub struct ToolSpec {
    /// Unique name within one agent
    pub name: String,

    /// Description shown to the model
    pub description: String,

    /// Declared parameters, in declaration order
    pub parameters: Vec<ParameterSpec>,

    /// The underlying callable
    pub function: Arc<dyn NativeFunction>,

    /// When true, invocation failures are fatal instead of degraded to text
    pub strict: bool,
}

impl std::fmt::Debug for ToolSpec {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ToolSpec")
            .field("name", &self.name)
            .field("description", &self.description)
            .field("parameters", &self.parameters)
            .field("strict", &self.strict)
            .finish_non_exhaustive()
    }
}

impl ToolSpec {
    pub fn new(
        name: impl Into<String>,
        description: impl Into<String>,
        parameters: Vec<ParameterSpec>,
        function: Arc<dyn NativeFunction>,
    ) -> Self {
        Self {
            name: name.into(),
            description: description.into(),
            parameters,
            function,
            strict: false,
        }
    }

    pub fn with_strict(mut self, strict: bool) -> Self {
        self.strict = strict;
        self
    }

    /// Look up a declared parameter by name.
    pub fn parameter(&self, name: &str) -> Option<&ParameterSpec> {
        self.parameters.iter().find(|p| p.name == name)
    }

    /// JSON Schema object describing the parameters.
    pub fn parameter_schema(&self) -> Value {
        let mut properties = Map::new();
        let mut required = Vec::new();
        for param in &self.parameters {
            properties.insert(
                param.name.clone(),
                serde_json::json!({
                    "type": param.schema_type,
                    "description": "",
                }),
            );
            if param.required {
                required.push(Value::String(param.name.clone()));
            }
        }
        serde_json::json!({
            "type": "object",
            "properties": properties,
            "required": required,
        })
    }

    /// Convert this tool into a ToolDefinition for sending to the model.
    pub fn to_definition(&self) -> ToolDefinition {
        ToolDefinition {
            name: self.name.clone(),
            description: self.description.clone(),
            parameters: self.parameter_schema(),
        }
    }
}
