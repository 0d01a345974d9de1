//! Cross-session memory.
//!
//! Gives the assistant continuity across conversations by pulling the user's
//! most recent messages from their *other* sessions. Read-only.

use spendscope_types::chat::ChatMessage;
use spendscope_types::error::RepositoryError;
use spendscope_types::user::UserId;
use uuid::Uuid;

use crate::chat::repository::ChatRepository;

/// Memory injected into the instruction block.
#[derive(Debug, Clone, PartialEq)]
pub enum MemoryBlock {
    /// The request did not ask for memory.
    NotRequested,
    /// Memory was requested but the user has no other conversations.
    NoPriorConversation,
    /// Recent messages from other sessions, oldest first.
    Messages(Vec<ChatMessage>),
}

/// Collects a bounded window of recent messages from a user's other sessions.
#[derive(Debug, Clone, Copy)]
pub struct MemoryAggregator {
    window: usize,
}

impl MemoryAggregator {
    pub fn new(window: usize) -> Self {
        Self { window }
    }

    pub fn window(&self) -> usize {
        self.window
    }

    /// The `window` most recent messages outside `exclude_session`, in
    /// chronological order, or the `NoPriorConversation` sentinel.
    pub async fn collect<C: ChatRepository>(
        &self,
        repo: &C,
        user_id: &UserId,
        exclude_session: &Uuid,
    ) -> Result<MemoryBlock, RepositoryError> {
        if self.window == 0 {
            return Ok(MemoryBlock::NoPriorConversation);
        }

        let mut recent = repo
            .recent_messages_excluding(user_id, exclude_session, self.window)
            .await?;
        recent.retain(|m| m.session_id != *exclude_session);
        recent.truncate(self.window);

        if recent.is_empty() {
            return Ok(MemoryBlock::NoPriorConversation);
        }
        recent.reverse();
        Ok(MemoryBlock::Messages(recent))
    }
}
