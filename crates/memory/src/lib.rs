//! Conversation store implementations for MicroClaw.

pub mod in_memory;

pub use in_memory::InMemoryStore;
