//! Chat service: the turn controller of the expense assistant.
//!
//! ChatService coordinates the ChatRepository, the FinancialRecordsProvider
//! and the LLM provider to answer chat requests. A turn runs as:
//!
//! 1. resolve the session (existing and owned, or minted for a new one)
//! 2. take the session's lock and plan the history edits in memory
//! 3. gather records and cross-session memory, render the instruction block
//! 4. call the model under a timeout
//! 5. commit edits plus reply in one transaction
//!
//! Nothing is written before step 5, so a failed, timed-out or cancelled
//! model call leaves the store exactly as it was.

use std::time::{Duration, Instant};

use chrono::Utc;
use spendscope_types::chat::{ChatMessage, ChatReply, ChatRequest, ChatSession, TurnMode};
use spendscope_types::config::AssistantConfig;
use spendscope_types::error::ChatError;
use spendscope_types::llm::{CompletionRequest, LlmError, StopReason};
use spendscope_types::preset::{ResponseFormat, Tone};
use spendscope_types::user::UserId;
use tracing::{Instrument, debug, error, info, info_span, warn};
use uuid::Uuid;

use crate::chat::lock::SessionLocks;
use crate::chat::repository::ChatRepository;
use crate::chat::title::derive_title;
use crate::chat::turn::{normalize_timestamp, plan_turn};
use crate::context::ContextAssembler;
use crate::llm::box_provider::BoxLlmProvider;
use crate::memory::{MemoryAggregator, MemoryBlock};
use crate::records::FinancialRecordsProvider;

/// Session the turn runs against.
enum SessionTarget {
    /// An existing session; must be owned by the caller.
    Existing(Uuid),
    /// A session minted for this turn, inserted at commit.
    New(ChatSession),
}

/// Orchestrates chat turns and session lifecycle.
///
/// Generic over `ChatRepository` and `FinancialRecordsProvider` to maintain
/// clean architecture (spendscope-core never depends on spendscope-infra).
/// The model client is injected as a `BoxLlmProvider`.
pub struct ChatService<C: ChatRepository, R: FinancialRecordsProvider> {
    chat_repo: C,
    records: R,
    provider: BoxLlmProvider,
    config: AssistantConfig,
    memory: MemoryAggregator,
    locks: SessionLocks,
}

impl<C: ChatRepository, R: FinancialRecordsProvider> ChatService<C, R> {
    pub fn new(chat_repo: C, records: R, provider: BoxLlmProvider, config: AssistantConfig) -> Self {
        let memory = MemoryAggregator::new(config.chat.memory_window);
        Self {
            chat_repo,
            records,
            provider,
            config,
            memory,
            locks: SessionLocks::new(),
        }
    }

    /// Access the chat repository.
    pub fn chat_repo(&self) -> &C {
        &self.chat_repo
    }

    pub fn config(&self) -> &AssistantConfig {
        &self.config
    }

    pub fn provider_name(&self) -> &str {
        self.provider.name()
    }

    // --- Session lifecycle ---

    /// Create an empty session titled after `first_message`.
    ///
    /// The session is persisted immediately; the message itself is sent with
    /// [`post_message`](Self::post_message).
    #[tracing::instrument(skip_all, fields(user_id = %user_id))]
    pub async fn create_session(
        &self,
        user_id: UserId,
        first_message: &str,
    ) -> Result<ChatSession, ChatError> {
        require_message(first_message)?;
        let session = self.mint_session(user_id, first_message);
        let session = self.chat_repo.create_session(&session).await?;
        info!(session_id = %session.id, "Session created");
        Ok(session)
    }

    pub async fn get_session(
        &self,
        user_id: &UserId,
        session_id: &Uuid,
    ) -> Result<ChatSession, ChatError> {
        Ok(self.chat_repo.get_session(user_id, session_id).await?)
    }

    /// List the user's sessions, most recently updated first.
    pub async fn list_sessions(
        &self,
        user_id: &UserId,
        limit: Option<i64>,
        offset: Option<i64>,
    ) -> Result<Vec<ChatSession>, ChatError> {
        Ok(self.chat_repo.list_sessions(user_id, limit, offset).await?)
    }

    /// Get a session's messages in order.
    pub async fn get_messages(
        &self,
        user_id: &UserId,
        session_id: &Uuid,
    ) -> Result<Vec<ChatMessage>, ChatError> {
        Ok(self.chat_repo.get_messages(user_id, session_id).await?)
    }

    /// Delete a session and all its messages.
    ///
    /// Waits for any in-flight turn on the session to finish first.
    #[tracing::instrument(skip_all, fields(user_id = %user_id, session_id = %session_id))]
    pub async fn delete_session(&self, user_id: UserId, session_id: Uuid) -> Result<(), ChatError> {
        self.chat_repo.get_session(&user_id, &session_id).await?;
        let _guard = self.locks.acquire(session_id).await;
        self.chat_repo.delete_session(&user_id, &session_id).await?;
        info!("Session deleted");
        Ok(())
    }

    // --- Turns ---

    /// Answer a chat request.
    ///
    /// Without a `session_id` an Append turn creates the session as part of
    /// its commit. Edit and Regenerate always need an existing session.
    #[tracing::instrument(
        skip_all,
        fields(user_id = %user_id, session_id = ?request.session_id)
    )]
    pub async fn handle_chat_request(
        &self,
        user_id: UserId,
        request: ChatRequest,
    ) -> Result<ChatReply, ChatError> {
        let mode = request.mode();
        let target = match (request.session_id, &mode) {
            (Some(id), _) => SessionTarget::Existing(id),
            (None, TurnMode::Append { content }) => {
                require_message(content)?;
                SessionTarget::New(self.mint_session(user_id, content))
            }
            (None, _) => {
                return Err(ChatError::InvalidState(format!(
                    "{} requires an existing session",
                    mode.name()
                )));
            }
        };
        self.run_turn(user_id, target, &request, mode).await
    }

    /// Answer a message in an existing session.
    ///
    /// `request.session_id` is ignored in favour of `session_id`.
    #[tracing::instrument(skip_all, fields(user_id = %user_id, session_id = %session_id))]
    pub async fn post_message(
        &self,
        user_id: UserId,
        session_id: Uuid,
        request: ChatRequest,
    ) -> Result<ChatReply, ChatError> {
        let mode = request.mode();
        self.run_turn(user_id, SessionTarget::Existing(session_id), &request, mode)
            .await
    }

    async fn run_turn(
        &self,
        user_id: UserId,
        target: SessionTarget,
        request: &ChatRequest,
        mode: TurnMode,
    ) -> Result<ChatReply, ChatError> {
        let (session, new_session, _guard, history) = match target {
            SessionTarget::Existing(id) => {
                let session = self.chat_repo.get_session(&user_id, &id).await?;
                let guard = self.locks.acquire(id).await;
                let history = self.chat_repo.get_messages(&user_id, &id).await?;
                (session, None, Some(guard), history)
            }
            SessionTarget::New(session) => (session.clone(), Some(session), None, Vec::new()),
        };

        let plan = plan_turn(session.id, history, &mode, Utc::now())?;
        debug!(
            session_id = %session.id,
            mode = mode.name(),
            edits = plan.edits.len(),
            prior = plan.prior.len(),
            "Turn planned"
        );

        let records = self.records.list_records(&user_id).await?;
        let use_memory = request
            .use_memory
            .unwrap_or(self.config.chat.memory_default);
        let memory = if use_memory {
            self.memory
                .collect(&self.chat_repo, &user_id, &session.id)
                .await?
        } else {
            MemoryBlock::NotRequested
        };

        let instructions = ContextAssembler::build(
            &records,
            &memory,
            Tone::from_choice(&request.tone),
            ResponseFormat::from_choice(&request.format),
        );
        let completion = CompletionRequest {
            model: self
                .config
                .model
                .model_for(request.model_size())
                .to_string(),
            messages: plan.model_messages(),
            system: Some(instructions),
            max_tokens: self.config.model.max_tokens,
            temperature: Some(self.config.model.temperature),
        };

        let reply_text = self.invoke_model(&session.id, &completion).await?;

        let reply = plan.reply_message(reply_text.clone(), Utc::now());
        let user_message_id = plan.live.id;
        let reply_message_id = reply.id;
        let commit = plan.into_commit(user_id, new_session, reply);

        if let Err(e) = self.chat_repo.commit_turn(&commit).await {
            warn!(session_id = %session.id, mode = mode.name(), error = %e, "Turn rolled back");
            return Err(e.into());
        }
        info!(
            session_id = %session.id,
            mode = mode.name(),
            reply_message_id = %reply_message_id,
            "Turn committed"
        );

        Ok(ChatReply {
            reply: reply_text,
            session_id: session.id,
            title: session.title,
            user_message_id,
            reply_message_id,
        })
    }

    /// Call the model under the configured timeout.
    ///
    /// Every failure, including an empty or filtered reply, becomes
    /// `UpstreamUnavailable`. The cause is logged here and carried for logs
    /// only. A reply cut off at `max_tokens` is kept and logged as a warning.
    async fn invoke_model(
        &self,
        session_id: &Uuid,
        request: &CompletionRequest,
    ) -> Result<String, ChatError> {
        let timeout_secs = self.config.model.timeout_secs;
        let span = info_span!(
            "gen_ai.complete",
            gen_ai.system = self.provider.name(),
            gen_ai.request.model = %request.model,
            gen_ai.request.max_tokens = request.max_tokens,
            gen_ai.request.temperature = ?request.temperature,
        );

        let started = Instant::now();
        let outcome = tokio::time::timeout(
            Duration::from_secs(timeout_secs),
            self.provider.complete(request).instrument(span),
        )
        .await;
        let elapsed_ms = started.elapsed().as_millis() as u64;

        let cause = match outcome {
            Ok(Ok(response)) if response.stop_reason == StopReason::ContentFilter => {
                format!("reply withheld by the provider ({})", response.stop_reason)
            }
            Ok(Ok(response)) if !response.content.trim().is_empty() => {
                if response.stop_reason == StopReason::MaxTokens {
                    warn!(
                        session_id = %session_id,
                        model = %response.model,
                        max_tokens = request.max_tokens,
                        output_tokens = response.usage.output_tokens,
                        "Model reply truncated at max_tokens"
                    );
                }
                info!(
                    session_id = %session_id,
                    model = %response.model,
                    elapsed_ms,
                    input_tokens = response.usage.input_tokens,
                    output_tokens = response.usage.output_tokens,
                    "Model replied"
                );
                return Ok(response.content);
            }
            Ok(Ok(_)) => "model returned an empty reply".to_string(),
            Ok(Err(e)) => e.to_string(),
            Err(_) => LlmError::Timeout(timeout_secs).to_string(),
        };

        error!(
            session_id = %session_id,
            model = %request.model,
            elapsed_ms,
            error = %cause,
            "Model call failed; turn rolled back"
        );
        Err(ChatError::UpstreamUnavailable(cause))
    }

    fn mint_session(&self, user_id: UserId, first_message: &str) -> ChatSession {
        let now = normalize_timestamp(Utc::now());
        ChatSession {
            id: Uuid::now_v7(),
            user_id,
            title: derive_title(first_message, self.config.chat.title_max_chars),
            created_at: now,
            updated_at: now,
        }
    }
}

fn require_message(content: &str) -> Result<(), ChatError> {
    if content.trim().is_empty() {
        return Err(ChatError::InvalidRequest("message must not be empty".to_string()));
    }
    Ok(())
}
