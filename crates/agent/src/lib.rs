//! The core agent loop for MicroClaw.
//!
//! The agent alternates between two moves until the model answers:
//!
//! 1. **Ask** the gateway for the next action, given the conversation so
//!    far and the registered tools
//! 2. **Act** on each tool invocation it requests, appending the request
//!    and its result to the conversation
//!
//! A response with plain text ends the run. A model that keeps requesting
//! tools past `max_steps` fails the run with `StepLimitExceeded`.
//! Every model call, tool call and tool result is recorded in the run's
//! trace, available through [`Agent::explain`].

pub mod logging;
pub mod loop_runner;

pub use logging::init_logging;
pub use loop_runner::Agent;
