//! # MicroClaw Core
//!
//! Domain types, traits, and error definitions for the MicroClaw agent runtime.
//! It defines the domain model that all other crates implement against and
//! performs no I/O of its own.
//!
//! ## Design Philosophy
//!
//! Every seam of the agent loop is a trait here: the model backend
//! ([`Gateway`]), the conversation log ([`ConversationStore`]) and the tool
//! body ([`NativeFunction`]). Implementations live in their respective crates,
//! so tests can swap in scripted fakes.

pub mod agent;
pub mod error;
pub mod gateway;
pub mod memory;
pub mod message;
pub mod tool;

// Re-export key types at crate root for ergonomics
pub use agent::{AgentConfig, LoopState, RunOptions};
pub use error::{AgentError, ErrorKind, GatewayError, MemoryError, Result};
pub use gateway::{Gateway, GatewayRequest, GatewayResponse, ToolDefinition, Usage};
pub use memory::ConversationStore;
pub use message::{Message, Role, ToolInvocationRequest};
pub use tool::{
    ArgError, NativeFunction, ParamType, ParameterSpec, SchemaType, ToolArgs, ToolFailure,
    ToolSpec,
};
