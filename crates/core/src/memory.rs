//! ConversationStore trait: the ordered message log the agent loop reads
//! from and appends to.
//!
//! The store is append-only from the loop's point of view. Implementations
//! may bound it (evicting oldest-first), but never reorder it.

use async_trait::async_trait;

use crate::error::MemoryError;
use crate::message::{Message, Role, ToolInvocationRequest};

/// The core ConversationStore trait.
///
/// Implementations: in-memory (bounded or unbounded).
#[async_trait]
pub trait ConversationStore: Send + Sync {
    /// The backend name (e.g., "in_memory").
    fn name(&self) -> &str;

    /// Append a message. No validation beyond what the type enforces.
    async fn append(&self, message: Message) -> std::result::Result<(), MemoryError>;

    /// Snapshot of the history, oldest first. With `limit`, only the most
    /// recent `limit` messages.
    async fn history(&self, limit: Option<usize>) -> std::result::Result<Vec<Message>, MemoryError>;

    /// Remove every message.
    async fn clear(&self) -> std::result::Result<(), MemoryError>;

    /// Number of retained messages.
    async fn len(&self) -> std::result::Result<usize, MemoryError>;

    async fn is_empty(&self) -> std::result::Result<bool, MemoryError> {
        Ok(self.len().await? == 0)
    }

    /// Build and append a message from its parts.
    async fn append_parts(
        &self,
        role: Role,
        content: Option<String>,
        tool_calls: Vec<ToolInvocationRequest>,
        tool_call_id: Option<String>,
    ) -> std::result::Result<(), MemoryError> {
        self.append(Message::new(role, content, tool_calls, tool_call_id))
            .await
    }
}
