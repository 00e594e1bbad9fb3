//! Tools for MicroClaw agents.
//!
//! A [`FunctionTool`] wraps a native Rust function together with its
//! declared parameters. The [`ToolRegistry`] derives a schema from those
//! declarations, advertises it to the model, and validates every
//! model-issued call before the function runs.

pub mod function;
pub mod registry;

pub use function::FunctionTool;
pub use registry::{ToolRegistry, ToolSource};
