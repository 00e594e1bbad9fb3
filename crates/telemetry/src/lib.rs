//! Execution tracing for MicroClaw agents.
//!
//! Records every model call, tool call, and tool result of a run as a
//! timestamped, serializable [`RunTrace`], so a run can be inspected after
//! the fact even when it failed.

pub mod model;
pub mod recorder;

pub use model::{RunTrace, StepKind, TraceError, TraceStep};
pub use recorder::Tracer;
