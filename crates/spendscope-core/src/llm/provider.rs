//! LlmProvider trait definition.
//!
//! This is the model boundary the chat engine calls once per turn.
//! Uses RPITIT for `complete`; `BoxLlmProvider` erases the type so the
//! concrete client can be injected at construction.

use spendscope_types::llm::{CompletionRequest, CompletionResponse, LlmError};

/// Trait for LLM provider backends (Gemini, OpenAI, test doubles, ...).
///
/// Implementations live in spendscope-infra (e.g., `OpenAiCompatibleProvider`).
pub trait LlmProvider: Send + Sync {
    /// Human-readable provider name (e.g., "gemini", "openai").
    fn name(&self) -> &str;

    /// Send a completion request and receive the full response.
    fn complete(
        &self,
        request: &CompletionRequest,
    ) -> impl std::future::Future<Output = Result<CompletionResponse, LlmError>> + Send;
}
