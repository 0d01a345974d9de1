//! Chat session, message, request, and turn-commit types for SpendScope.
//!
//! These types model conversations between a user and the expense assistant:
//! sessions, their ordered messages, the chat request/reply pair exposed to
//! the UI layer, and the edit list a turn applies to the message log.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::llm::ModelSize;
use crate::user::UserId;

// Re-export MessageRole from llm module (it's used in both chat and llm contexts).
pub use crate::llm::MessageRole;

/// Marker appended to a derived title when the first message was truncated.
pub const TITLE_TRUNCATION_MARKER: &str = "...";

/// A chat session owned by a single user.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatSession {
    pub id: Uuid,
    pub user_id: UserId,
    /// Short label derived from the first user message.
    pub title: String,
    pub created_at: DateTime<Utc>,
    /// Bumped on every committed turn; session listings sort on it.
    pub updated_at: DateTime<Utc>,
}

/// A single message within a chat session.
///
/// Messages are totally ordered by `created_at` within a session.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub id: Uuid,
    pub session_id: Uuid,
    pub role: MessageRole,
    pub content: String,
    pub created_at: DateTime<Utc>,
}

impl ChatMessage {
    pub fn is_user(&self) -> bool {
        self.role == MessageRole::User
    }

    pub fn is_assistant(&self) -> bool {
        self.role == MessageRole::Assistant
    }
}

/// Incoming chat request from the UI layer.
///
/// Field names follow the wire format of the web client.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ChatRequest {
    /// Free-text message. Ignored for regenerate requests.
    #[serde(default)]
    pub message: String,
    /// Model-size selector (e.g. "flash", "pro", "gemini-3-pro").
    #[serde(default)]
    pub model: String,
    /// Existing session to continue; absent means "start a new session".
    #[serde(default)]
    pub session_id: Option<Uuid>,
    /// Whether to inject messages from the user's other sessions.
    /// `None` falls back to the configured default.
    #[serde(default, alias = "use_global_memory")]
    pub use_memory: Option<bool>,
    #[serde(default)]
    pub tone: String,
    #[serde(default)]
    pub format: String,
    #[serde(default)]
    pub regenerate: bool,
    #[serde(default, alias = "edit_message_id")]
    pub edit_target: Option<Uuid>,
}

impl ChatRequest {
    /// Resolve which history mutation this request performs.
    ///
    /// Priority is fixed: an edit target wins over the regenerate flag,
    /// which wins over a plain append.
    pub fn mode(&self) -> TurnMode {
        if let Some(target) = self.edit_target {
            TurnMode::Edit {
                target,
                content: self.message.clone(),
            }
        } else if self.regenerate {
            TurnMode::Regenerate
        } else {
            TurnMode::Append {
                content: self.message.clone(),
            }
        }
    }

    pub fn model_size(&self) -> ModelSize {
        ModelSize::from_selector(&self.model)
    }
}

/// The history mutation a single chat request performs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TurnMode {
    /// Append a new user message.
    Append { content: String },
    /// Overwrite a past user message and discard everything after it.
    Edit { target: Uuid, content: String },
    /// Drop the trailing assistant reply and resend the last user message.
    Regenerate,
}

impl TurnMode {
    pub fn name(&self) -> &'static str {
        match self {
            TurnMode::Append { .. } => "append",
            TurnMode::Edit { .. } => "edit",
            TurnMode::Regenerate => "regenerate",
        }
    }
}

/// Reply returned to the UI layer after a completed turn.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatReply {
    pub reply: String,
    pub session_id: Uuid,
    pub title: String,
    /// The user message the reply answers (new, edited, or resent).
    pub user_message_id: Uuid,
    pub reply_message_id: Uuid,
}

/// One mutation of a session's message log, applied at turn commit.
#[derive(Debug, Clone, PartialEq)]
pub enum HistoryEdit {
    /// Insert a brand-new session row (implicit creation).
    CreateSession(ChatSession),
    /// Append a message to the session.
    Append(ChatMessage),
    /// Overwrite the content of an existing message in place.
    Rewrite { message_id: Uuid, content: String },
    /// Delete every message created strictly after `created_at`.
    TruncateAfter { created_at: DateTime<Utc> },
    /// Delete a single message.
    Remove { message_id: Uuid },
}

/// Everything a turn writes, committed atomically after the model replies.
#[derive(Debug, Clone)]
pub struct TurnCommit {
    pub user_id: UserId,
    pub session_id: Uuid,
    /// Id of the session's last message when the turn was planned.
    /// The commit is rejected if the log has moved on since.
    pub expected_head: Option<Uuid>,
    pub edits: Vec<HistoryEdit>,
    /// The assistant reply, appended after all edits.
    pub reply: ChatMessage,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mode_priority_edit_wins() {
        let target = Uuid::now_v7();
        let req = ChatRequest {
            message: "fixed".to_string(),
            regenerate: true,
            edit_target: Some(target),
            ..Default::default()
        };
        assert_eq!(
            req.mode(),
            TurnMode::Edit {
                target,
                content: "fixed".to_string()
            }
        );
    }

    #[test]
    fn test_mode_priority_regenerate_over_append() {
        let req = ChatRequest {
            message: "ignored".to_string(),
            regenerate: true,
            ..Default::default()
        };
        assert_eq!(req.mode(), TurnMode::Regenerate);
    }

    #[test]
    fn test_mode_default_append() {
        let req = ChatRequest {
            message: "hello".to_string(),
            ..Default::default()
        };
        assert_eq!(
            req.mode(),
            TurnMode::Append {
                content: "hello".to_string()
            }
        );
        assert_eq!(req.mode().name(), "append");
    }

    #[test]
    fn test_request_accepts_web_client_field_names() {
        let json = r#"{
            "message": "How much on coffee?",
            "model": "gemini-3-pro",
            "use_global_memory": false,
            "tone": "roast",
            "format": "table",
            "regenerate": false,
            "edit_message_id": null
        }"#;
        let req: ChatRequest = serde_json::from_str(json).unwrap();
        assert_eq!(req.use_memory, Some(false));
        assert_eq!(req.model_size(), ModelSize::Pro);
        assert!(req.session_id.is_none());
        assert!(req.edit_target.is_none());
    }

    #[test]
    fn test_request_minimal_body() {
        let req: ChatRequest = serde_json::from_str(r#"{"message":"hi"}"#).unwrap();
        assert_eq!(req.use_memory, None);
        assert!(!req.regenerate);
        assert_eq!(req.model_size(), ModelSize::Flash);
    }
}
