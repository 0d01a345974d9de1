//! ChatRepository trait definition.
//!
//! Provides session and message persistence. Every operation that names a
//! session is scoped to the owning user: a session that exists but belongs
//! to someone else is reported as `RepositoryError::NotFound`.

use chrono::{DateTime, Utc};
use spendscope_types::chat::{ChatMessage, ChatSession, TurnCommit};
use spendscope_types::error::RepositoryError;
use spendscope_types::user::UserId;
use uuid::Uuid;

/// Repository trait for chat session and message persistence.
///
/// Implementations live in spendscope-infra (e.g., `SqliteChatRepository`).
/// Uses native async fn in traits (RPITIT, Rust 2024 edition).
pub trait ChatRepository: Send + Sync {
    /// Create a new chat session.
    fn create_session(
        &self,
        session: &ChatSession,
    ) -> impl std::future::Future<Output = Result<ChatSession, RepositoryError>> + Send;

    /// Get a session owned by `user_id`.
    fn get_session(
        &self,
        user_id: &UserId,
        session_id: &Uuid,
    ) -> impl std::future::Future<Output = Result<ChatSession, RepositoryError>> + Send;

    /// List the user's sessions, ordered by updated_at DESC.
    fn list_sessions(
        &self,
        user_id: &UserId,
        limit: Option<i64>,
        offset: Option<i64>,
    ) -> impl std::future::Future<Output = Result<Vec<ChatSession>, RepositoryError>> + Send;

    /// Delete a session and its messages.
    fn delete_session(
        &self,
        user_id: &UserId,
        session_id: &Uuid,
    ) -> impl std::future::Future<Output = Result<(), RepositoryError>> + Send;

    /// Append a message to a session owned by `user_id`.
    fn save_message(
        &self,
        user_id: &UserId,
        message: &ChatMessage,
    ) -> impl std::future::Future<Output = Result<(), RepositoryError>> + Send;

    /// Get a session's messages, ordered by created_at ASC (insertion order on ties).
    fn get_messages(
        &self,
        user_id: &UserId,
        session_id: &Uuid,
    ) -> impl std::future::Future<Output = Result<Vec<ChatMessage>, RepositoryError>> + Send;

    /// Get a single message of a session.
    fn get_message(
        &self,
        user_id: &UserId,
        session_id: &Uuid,
        message_id: &Uuid,
    ) -> impl std::future::Future<Output = Result<ChatMessage, RepositoryError>> + Send;

    /// Delete every message of the session created strictly after `after`.
    ///
    /// Returns the number of deleted messages.
    fn delete_messages_after(
        &self,
        user_id: &UserId,
        session_id: &Uuid,
        after: &DateTime<Utc>,
    ) -> impl std::future::Future<Output = Result<u64, RepositoryError>> + Send;

    /// Delete a single message.
    fn delete_message(
        &self,
        user_id: &UserId,
        session_id: &Uuid,
        message_id: &Uuid,
    ) -> impl std::future::Future<Output = Result<(), RepositoryError>> + Send;

    /// The user's most recent messages from every session except `exclude_session`,
    /// most recent first, at most `limit` of them.
    fn recent_messages_excluding(
        &self,
        user_id: &UserId,
        exclude_session: &Uuid,
        limit: usize,
    ) -> impl std::future::Future<Output = Result<Vec<ChatMessage>, RepositoryError>> + Send;

    /// Apply a turn's edits and reply atomically.
    ///
    /// Either every edit and the reply are persisted, or nothing is. Fails with
    /// `RepositoryError::Conflict` if the session's last message is no longer
    /// `commit.expected_head`.
    fn commit_turn(
        &self,
        commit: &TurnCommit,
    ) -> impl std::future::Future<Output = Result<(), RepositoryError>> + Send;
}
