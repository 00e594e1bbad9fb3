//! In-memory conversation store: optionally bounded, oldest messages
//! evicted first.

use async_trait::async_trait;
use microclaw_core::error::MemoryError;
use microclaw_core::memory::ConversationStore;
use microclaw_core::message::Message;
use std::collections::VecDeque;
use tokio::sync::RwLock;
use tracing::trace;

/// A conversation store that keeps messages in a ring buffer.
///
/// With `max_messages` set, appending past the bound drops the oldest
/// messages, so the model sees recent context rather than complete context.
pub struct InMemoryStore {
    messages: RwLock<VecDeque<Message>>,
    max_messages: Option<usize>,
}

impl InMemoryStore {
    /// An unbounded store.
    pub fn new() -> Self {
        Self {
            messages: RwLock::new(VecDeque::new()),
            max_messages: None,
        }
    }

    /// A store retaining at most `max_messages` messages. The buffer grows
    /// on demand; the bound only triggers eviction.
    pub fn bounded(max_messages: usize) -> Self {
        Self {
            messages: RwLock::new(VecDeque::new()),
            max_messages: Some(max_messages),
        }
    }

    /// Build from an optional bound, as found in `AgentConfig::max_messages`.
    pub fn with_limit(max_messages: Option<usize>) -> Self {
        match max_messages {
            Some(max) => Self::bounded(max),
            None => Self::new(),
        }
    }

    pub fn max_messages(&self) -> Option<usize> {
        self.max_messages
    }
}

impl Default for InMemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl ConversationStore for InMemoryStore {
    fn name(&self) -> &str {
        "in_memory"
    }

    async fn append(&self, message: Message) -> Result<(), MemoryError> {
        let mut messages = self.messages.write().await;
        messages.push_back(message);

        if let Some(max) = self.max_messages {
            while messages.len() > max {
                if let Some(evicted) = messages.pop_front() {
                    trace!(role = %evicted.role, "Evicted oldest message");
                }
            }
        }
        Ok(())
    }

    async fn history(&self, limit: Option<usize>) -> Result<Vec<Message>, MemoryError> {
        let messages = self.messages.read().await;
        let skip = match limit {
            Some(limit) => messages.len().saturating_sub(limit),
            None => 0,
        };
        Ok(messages.iter().skip(skip).cloned().collect())
    }

    async fn clear(&self) -> Result<(), MemoryError> {
        self.messages.write().await.clear();
        Ok(())
    }

    async fn len(&self) -> Result<usize, MemoryError> {
        Ok(self.messages.read().await.len())
    }
}
