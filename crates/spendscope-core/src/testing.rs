//! In-memory doubles for the core ports, shared by the unit tests.

use std::collections::VecDeque;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use chrono::{DateTime, Utc};
use spendscope_types::chat::{ChatMessage, ChatSession, HistoryEdit, MessageRole, TurnCommit};
use spendscope_types::error::RepositoryError;
use spendscope_types::llm::{
    CompletionRequest, CompletionResponse, LlmError, StopReason, Usage,
};
use spendscope_types::receipt::FinancialRecord;
use spendscope_types::user::UserId;
use uuid::Uuid;

use crate::chat::repository::ChatRepository;
use crate::llm::provider::LlmProvider;
use crate::records::FinancialRecordsProvider;

pub fn base_time() -> DateTime<Utc> {
    DateTime::from_timestamp_micros(1_767_225_600_000_000).unwrap()
}

pub fn session_for(user_id: UserId, title: &str) -> ChatSession {
    ChatSession {
        id: Uuid::now_v7(),
        user_id,
        title: title.to_string(),
        created_at: base_time(),
        updated_at: base_time(),
    }
}

/// Message timestamped `offset_micros` after [`base_time`].
pub fn message_at(session_id: Uuid, role: MessageRole, content: &str, offset_micros: i64) -> ChatMessage {
    ChatMessage {
        id: Uuid::now_v7(),
        session_id,
        role,
        content: content.to_string(),
        created_at: base_time() + chrono::Duration::microseconds(offset_micros),
    }
}

#[derive(Debug, Clone, Default)]
struct State {
    sessions: Vec<ChatSession>,
    /// Insertion order is the tie-break, like rowid in SQLite.
    messages: Vec<ChatMessage>,
}

impl State {
    fn owned_session(&self, user_id: &UserId, session_id: &Uuid) -> Result<&ChatSession, RepositoryError> {
        self.sessions
            .iter()
            .find(|s| s.id == *session_id && s.user_id == *user_id)
            .ok_or(RepositoryError::NotFound)
    }

    fn ordered(&self, session_id: &Uuid) -> Vec<ChatMessage> {
        let mut out: Vec<ChatMessage> = self
            .messages
            .iter()
            .filter(|m| m.session_id == *session_id)
            .cloned()
            .collect();
        out.sort_by_key(|m| m.created_at);
        out
    }

    fn apply(&mut self, user_id: &UserId, session_id: &Uuid, edit: &HistoryEdit) -> Result<(), RepositoryError> {
        match edit {
            HistoryEdit::CreateSession(session) => {
                if self.sessions.iter().any(|s| s.id == session.id) {
                    return Err(RepositoryError::Conflict("session already exists".into()));
                }
                self.sessions.push(session.clone());
            }
            HistoryEdit::Append(message) => {
                self.owned_session(user_id, &message.session_id)?;
                self.messages.push(message.clone());
            }
            HistoryEdit::Rewrite { message_id, content } => {
                self.owned_session(user_id, session_id)?;
                let message = self
                    .messages
                    .iter_mut()
                    .find(|m| m.id == *message_id && m.session_id == *session_id)
                    .ok_or(RepositoryError::NotFound)?;
                message.content = content.clone();
            }
            HistoryEdit::TruncateAfter { created_at } => {
                self.owned_session(user_id, session_id)?;
                self.messages
                    .retain(|m| m.session_id != *session_id || m.created_at <= *created_at);
            }
            HistoryEdit::Remove { message_id } => {
                self.owned_session(user_id, session_id)?;
                let before = self.messages.len();
                self.messages
                    .retain(|m| !(m.id == *message_id && m.session_id == *session_id));
                if self.messages.len() == before {
                    return Err(RepositoryError::NotFound);
                }
            }
        }
        Ok(())
    }
}

/// Thread-safe in-memory `ChatRepository` with the same ownership and
/// ordering rules as the SQLite implementation.
#[derive(Debug, Clone, Default)]
pub struct InMemoryChatRepository {
    state: Arc<Mutex<State>>,
    commits: Arc<Mutex<usize>>,
}

impl InMemoryChatRepository {
    pub fn new() -> Self {
        Self::default()
    }

    /// Every message of every session, for asserting that nothing leaked.
    pub fn message_count(&self) -> usize {
        self.state.lock().unwrap().messages.len()
    }

    pub fn session_count(&self) -> usize {
        self.state.lock().unwrap().sessions.len()
    }

    pub fn commit_count(&self) -> usize {
        *self.commits.lock().unwrap()
    }

    /// Insert a message without ownership checks, simulating another writer.
    pub fn inject_message(&self, message: ChatMessage) {
        self.state.lock().unwrap().messages.push(message);
    }
}

impl ChatRepository for InMemoryChatRepository {
    async fn create_session(&self, session: &ChatSession) -> Result<ChatSession, RepositoryError> {
        let mut state = self.state.lock().unwrap();
        state.apply(&session.user_id, &session.id, &HistoryEdit::CreateSession(session.clone()))?;
        Ok(session.clone())
    }

    async fn get_session(&self, user_id: &UserId, session_id: &Uuid) -> Result<ChatSession, RepositoryError> {
        let state = self.state.lock().unwrap();
        state.owned_session(user_id, session_id).cloned()
    }

    async fn list_sessions(
        &self,
        user_id: &UserId,
        limit: Option<i64>,
        offset: Option<i64>,
    ) -> Result<Vec<ChatSession>, RepositoryError> {
        let state = self.state.lock().unwrap();
        let mut sessions: Vec<ChatSession> = state
            .sessions
            .iter()
            .filter(|s| s.user_id == *user_id)
            .cloned()
            .collect();
        sessions.sort_by(|a, b| b.updated_at.cmp(&a.updated_at));
        let offset = offset.unwrap_or(0).max(0) as usize;
        let limit = limit.unwrap_or(i64::MAX).max(0) as usize;
        Ok(sessions.into_iter().skip(offset).take(limit).collect())
    }

    async fn delete_session(&self, user_id: &UserId, session_id: &Uuid) -> Result<(), RepositoryError> {
        let mut state = self.state.lock().unwrap();
        state.owned_session(user_id, session_id)?;
        state.sessions.retain(|s| s.id != *session_id);
        state.messages.retain(|m| m.session_id != *session_id);
        Ok(())
    }

    async fn save_message(&self, user_id: &UserId, message: &ChatMessage) -> Result<(), RepositoryError> {
        let mut state = self.state.lock().unwrap();
        state.apply(user_id, &message.session_id, &HistoryEdit::Append(message.clone()))
    }

    async fn get_messages(&self, user_id: &UserId, session_id: &Uuid) -> Result<Vec<ChatMessage>, RepositoryError> {
        let state = self.state.lock().unwrap();
        state.owned_session(user_id, session_id)?;
        Ok(state.ordered(session_id))
    }

    async fn get_message(
        &self,
        user_id: &UserId,
        session_id: &Uuid,
        message_id: &Uuid,
    ) -> Result<ChatMessage, RepositoryError> {
        let state = self.state.lock().unwrap();
        state.owned_session(user_id, session_id)?;
        state
            .messages
            .iter()
            .find(|m| m.id == *message_id && m.session_id == *session_id)
            .cloned()
            .ok_or(RepositoryError::NotFound)
    }

    async fn delete_messages_after(
        &self,
        user_id: &UserId,
        session_id: &Uuid,
        after: &DateTime<Utc>,
    ) -> Result<u64, RepositoryError> {
        let mut state = self.state.lock().unwrap();
        let before = state.messages.len();
        state.apply(user_id, session_id, &HistoryEdit::TruncateAfter { created_at: *after })?;
        Ok((before - state.messages.len()) as u64)
    }

    async fn delete_message(
        &self,
        user_id: &UserId,
        session_id: &Uuid,
        message_id: &Uuid,
    ) -> Result<(), RepositoryError> {
        let mut state = self.state.lock().unwrap();
        state.apply(user_id, session_id, &HistoryEdit::Remove { message_id: *message_id })
    }

    async fn recent_messages_excluding(
        &self,
        user_id: &UserId,
        exclude_session: &Uuid,
        limit: usize,
    ) -> Result<Vec<ChatMessage>, RepositoryError> {
        let state = self.state.lock().unwrap();
        let owned: Vec<Uuid> = state
            .sessions
            .iter()
            .filter(|s| s.user_id == *user_id && s.id != *exclude_session)
            .map(|s| s.id)
            .collect();
        let mut recent: Vec<ChatMessage> = state
            .messages
            .iter()
            .filter(|m| owned.contains(&m.session_id))
            .cloned()
            .collect();
        recent.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        recent.truncate(limit);
        Ok(recent)
    }

    async fn commit_turn(&self, commit: &TurnCommit) -> Result<(), RepositoryError> {
        let mut state = self.state.lock().unwrap();
        // Apply to a copy and swap, so a failing edit leaves nothing behind.
        let mut next = state.clone();

        let creates_session = commit
            .edits
            .iter()
            .any(|e| matches!(e, HistoryEdit::CreateSession(_)));
        if !creates_session {
            next.owned_session(&commit.user_id, &commit.session_id)?;
            let head = next.ordered(&commit.session_id).last().map(|m| m.id);
            if head != commit.expected_head {
                return Err(RepositoryError::Conflict(
                    "session history changed during the turn".into(),
                ));
            }
        }

        for edit in &commit.edits {
            next.apply(&commit.user_id, &commit.session_id, edit)?;
        }
        next.apply(
            &commit.user_id,
            &commit.session_id,
            &HistoryEdit::Append(commit.reply.clone()),
        )?;
        if let Some(session) = next.sessions.iter_mut().find(|s| s.id == commit.session_id) {
            session.updated_at = commit.reply.created_at;
        }

        *state = next;
        *self.commits.lock().unwrap() += 1;
        Ok(())
    }
}

/// Records provider returning a fixed list for every user.
#[derive(Debug, Clone, Default)]
pub struct StaticRecords {
    pub records: Vec<FinancialRecord>,
}

impl FinancialRecordsProvider for StaticRecords {
    async fn list_records(&self, _user_id: &UserId) -> Result<Vec<FinancialRecord>, RepositoryError> {
        Ok(self.records.clone())
    }
}

type Hook = Box<dyn Fn(&CompletionRequest) + Send + Sync>;

/// Scripted LLM provider.
///
/// Returns queued outcomes in order (falling back to "ok" when the queue is
/// empty) and records every request it receives.
pub struct MockLlm {
    outcomes: Mutex<VecDeque<Result<(String, StopReason), LlmError>>>,
    requests: Arc<Mutex<Vec<CompletionRequest>>>,
    delay: Option<Duration>,
    hook: Option<Hook>,
}

impl MockLlm {
    pub fn new() -> Self {
        Self {
            outcomes: Mutex::new(VecDeque::new()),
            requests: Arc::new(Mutex::new(Vec::new())),
            delay: None,
            hook: None,
        }
    }

    pub fn reply(self, text: &str) -> Self {
        self.reply_stopped(text, StopReason::EndTurn)
    }

    /// Queue a reply that ends for `stop_reason`.
    pub fn reply_stopped(self, text: &str, stop_reason: StopReason) -> Self {
        self.outcomes
            .lock()
            .unwrap()
            .push_back(Ok((text.to_string(), stop_reason)));
        self
    }

    pub fn fail(self, error: LlmError) -> Self {
        self.outcomes.lock().unwrap().push_back(Err(error));
        self
    }

    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    /// Run `hook` while the request is "in flight".
    pub fn with_hook(mut self, hook: impl Fn(&CompletionRequest) + Send + Sync + 'static) -> Self {
        self.hook = Some(Box::new(hook));
        self
    }

    /// Shared handle to the captured requests.
    pub fn requests(&self) -> Arc<Mutex<Vec<CompletionRequest>>> {
        Arc::clone(&self.requests)
    }
}

impl LlmProvider for MockLlm {
    fn name(&self) -> &str {
        "mock"
    }

    async fn complete(&self, request: &CompletionRequest) -> Result<CompletionResponse, LlmError> {
        self.requests.lock().unwrap().push(request.clone());
        if let Some(hook) = &self.hook {
            hook(request);
        }
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }

        let outcome = self
            .outcomes
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| Ok(("ok".to_string(), StopReason::EndTurn)));
        outcome.map(|(content, stop_reason)| CompletionResponse {
            id: format!("mock-{}", Uuid::now_v7()),
            content,
            model: request.model.clone(),
            stop_reason,
            usage: Usage::default(),
        })
    }
}
