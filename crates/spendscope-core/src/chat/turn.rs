//! Turn planning: the history state machine of a single chat request.
//!
//! `plan_turn` is pure. Given a session's current messages and the request
//! mode it returns the edits the turn will apply, the history the model sees,
//! and the live user message. Nothing is persisted here; the plan is only
//! written (together with the assistant reply) once the model has answered.

use chrono::{DateTime, Duration, SubsecRound, Utc};
use spendscope_types::chat::{
    ChatMessage, ChatSession, HistoryEdit, MessageRole, TurnCommit, TurnMode,
};
use spendscope_types::error::ChatError;
use spendscope_types::llm::Message;
use spendscope_types::user::UserId;
use uuid::Uuid;

/// Truncate a timestamp to the microsecond precision the store persists.
pub fn normalize_timestamp(ts: DateTime<Utc>) -> DateTime<Utc> {
    ts.trunc_subsecs(6)
}

/// Timestamp for a message appended after `last`.
///
/// Always strictly greater than `last`: if the clock has not advanced past
/// it, `last` is bumped by one microsecond.
pub fn next_timestamp(last: Option<DateTime<Utc>>, now: DateTime<Utc>) -> DateTime<Utc> {
    let now = normalize_timestamp(now);
    match last {
        Some(last) if now <= last => last + Duration::microseconds(1),
        _ => now,
    }
}

/// The in-memory outcome of resolving a request against a session's history.
#[derive(Debug, Clone)]
pub struct TurnPlan {
    pub session_id: Uuid,
    /// Mutations to apply at commit, in order.
    pub edits: Vec<HistoryEdit>,
    /// Messages preceding the live message, as the model sees them.
    pub prior: Vec<ChatMessage>,
    /// The user message this turn answers (new, edited, or resent).
    pub live: ChatMessage,
    /// Id of the session's last message before the turn.
    pub expected_head: Option<Uuid>,
}

impl TurnPlan {
    /// Conversation sent to the model: prior history followed by the live message.
    pub fn model_messages(&self) -> Vec<Message> {
        self.prior
            .iter()
            .chain(std::iter::once(&self.live))
            .map(|m| Message {
                role: m.role,
                content: m.content.clone(),
            })
            .collect()
    }

    /// Build the assistant reply message, ordered after the live message.
    pub fn reply_message(&self, content: String, now: DateTime<Utc>) -> ChatMessage {
        let last = self
            .prior
            .iter()
            .map(|m| m.created_at)
            .chain(std::iter::once(self.live.created_at))
            .max();
        ChatMessage {
            id: Uuid::now_v7(),
            session_id: self.session_id,
            role: MessageRole::Assistant,
            content,
            created_at: next_timestamp(last, now),
        }
    }

    /// Turn the plan into the atomic commit for the store.
    ///
    /// `new_session` is set when the turn creates its session; the session row
    /// is then inserted first, inside the same transaction.
    pub fn into_commit(
        self,
        user_id: UserId,
        new_session: Option<ChatSession>,
        reply: ChatMessage,
    ) -> TurnCommit {
        let mut edits = Vec::with_capacity(self.edits.len() + 1);
        if let Some(session) = new_session {
            edits.push(HistoryEdit::CreateSession(session));
        }
        edits.extend(self.edits);
        TurnCommit {
            user_id,
            session_id: self.session_id,
            expected_head: self.expected_head,
            edits,
            reply,
        }
    }
}

/// Resolve `mode` against `history` (ordered oldest first).
///
/// Fails without side effects when the request cannot apply to the history:
/// - empty Append/Edit content: `InvalidRequest`
/// - Edit target absent from the session: `NotFound`
/// - Edit target not a user message: `InvalidState`
/// - Regenerate with no user message to resend: `InvalidState`
pub fn plan_turn(
    session_id: Uuid,
    history: Vec<ChatMessage>,
    mode: &TurnMode,
    now: DateTime<Utc>,
) -> Result<TurnPlan, ChatError> {
    let expected_head = history.last().map(|m| m.id);

    match mode {
        TurnMode::Append { content } => {
            require_content(content)?;
            let live = ChatMessage {
                id: Uuid::now_v7(),
                session_id,
                role: MessageRole::User,
                content: content.clone(),
                created_at: next_timestamp(history.last().map(|m| m.created_at), now),
            };
            Ok(TurnPlan {
                session_id,
                edits: vec![HistoryEdit::Append(live.clone())],
                prior: history,
                live,
                expected_head,
            })
        }

        TurnMode::Edit { target, content } => {
            require_content(content)?;
            let original = history
                .iter()
                .find(|m| m.id == *target)
                .cloned()
                .ok_or(ChatError::NotFound)?;
            if !original.is_user() {
                return Err(ChatError::InvalidState(
                    "only user messages can be edited".to_string(),
                ));
            }

            let cutoff = original.created_at;
            let mut prior: Vec<ChatMessage> = history
                .into_iter()
                .filter(|m| m.created_at <= cutoff && m.id != original.id)
                .collect();
            prior.sort_by_key(|m| m.created_at);

            let live = ChatMessage {
                content: content.clone(),
                ..original
            };
            Ok(TurnPlan {
                session_id,
                edits: vec![
                    HistoryEdit::Rewrite {
                        message_id: live.id,
                        content: content.clone(),
                    },
                    HistoryEdit::TruncateAfter { created_at: cutoff },
                ],
                prior,
                live,
                expected_head,
            })
        }

        TurnMode::Regenerate => {
            let mut remaining = history;
            let mut edits = Vec::new();
            if remaining.last().is_some_and(ChatMessage::is_assistant) {
                if let Some(previous_reply) = remaining.pop() {
                    edits.push(HistoryEdit::Remove {
                        message_id: previous_reply.id,
                    });
                }
            }

            match remaining.pop() {
                Some(live) if live.is_user() => Ok(TurnPlan {
                    session_id,
                    edits,
                    prior: remaining,
                    live,
                    expected_head,
                }),
                _ => Err(ChatError::InvalidState(
                    "no user message to regenerate from".to_string(),
                )),
            }
        }
    }
}

fn require_content(content: &str) -> Result<(), ChatError> {
    if content.trim().is_empty() {
        return Err(ChatError::InvalidRequest("message must not be empty".to_string()));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn at(micros: i64) -> DateTime<Utc> {
        DateTime::from_timestamp_micros(1_767_225_600_000_000 + micros).unwrap()
    }

    fn msg(session_id: Uuid, role: MessageRole, content: &str, micros: i64) -> ChatMessage {
        ChatMessage {
            id: Uuid::now_v7(),
            session_id,
            role,
            content: content.to_string(),
            created_at: at(micros),
        }
    }

    fn append(content: &str) -> TurnMode {
        TurnMode::Append {
            content: content.to_string(),
        }
    }

    #[test]
    fn test_next_timestamp_uses_clock_when_ahead() {
        assert_eq!(next_timestamp(Some(at(5)), at(10)), at(10));
        assert_eq!(next_timestamp(None, at(10)), at(10));
    }

    #[test]
    fn test_next_timestamp_bumps_when_clock_stalls() {
        assert_eq!(next_timestamp(Some(at(10)), at(10)), at(11));
        assert_eq!(next_timestamp(Some(at(10)), at(3)), at(11));
    }

    #[test]
    fn test_normalize_drops_nanoseconds() {
        let ts = at(7) + Duration::nanoseconds(999);
        assert_eq!(normalize_timestamp(ts), at(7));
    }

    #[test]
    fn test_append_to_empty_session() {
        let sid = Uuid::now_v7();
        let plan = plan_turn(sid, vec![], &append("Coffee today?"), at(0)).unwrap();

        assert!(plan.prior.is_empty());
        assert_eq!(plan.live.content, "Coffee today?");
        assert_eq!(plan.live.role, MessageRole::User);
        assert_eq!(plan.expected_head, None);
        assert_eq!(plan.edits, vec![HistoryEdit::Append(plan.live.clone())]);
    }

    #[test]
    fn test_append_orders_after_existing_history() {
        let sid = Uuid::now_v7();
        let history = vec![
            msg(sid, MessageRole::User, "hi", 0),
            msg(sid, MessageRole::Assistant, "hello", 50),
        ];
        let head = history[1].id;
        // Clock behind the last message.
        let plan = plan_turn(sid, history, &append("next"), at(20)).unwrap();

        assert_eq!(plan.prior.len(), 2);
        assert_eq!(plan.live.created_at, at(51));
        assert_eq!(plan.expected_head, Some(head));
    }

    #[test]
    fn test_append_rejects_blank_message() {
        let err = plan_turn(Uuid::now_v7(), vec![], &append("   "), at(0)).unwrap_err();
        assert!(matches!(err, ChatError::InvalidRequest(_)));
    }

    #[test]
    fn test_edit_rewrites_and_truncates_later_messages() {
        let sid = Uuid::now_v7();
        let first = msg(sid, MessageRole::User, "Coffee?", 0);
        let history = vec![
            first.clone(),
            msg(sid, MessageRole::Assistant, "2 coffees", 10),
            msg(sid, MessageRole::User, "Lunch?", 20),
            msg(sid, MessageRole::Assistant, "1 lunch", 30),
        ];
        let mode = TurnMode::Edit {
            target: first.id,
            content: "Coffee today? Also lunch?".to_string(),
        };
        let plan = plan_turn(sid, history, &mode, at(100)).unwrap();

        assert!(plan.prior.is_empty());
        assert_eq!(plan.live.id, first.id);
        assert_eq!(plan.live.created_at, first.created_at);
        assert_eq!(plan.live.content, "Coffee today? Also lunch?");
        assert_eq!(
            plan.edits,
            vec![
                HistoryEdit::Rewrite {
                    message_id: first.id,
                    content: "Coffee today? Also lunch?".to_string(),
                },
                HistoryEdit::TruncateAfter {
                    created_at: first.created_at
                },
            ]
        );
    }

    #[test]
    fn test_edit_keeps_earlier_messages_as_prior() {
        let sid = Uuid::now_v7();
        let history = vec![
            msg(sid, MessageRole::User, "a", 0),
            msg(sid, MessageRole::Assistant, "b", 10),
            msg(sid, MessageRole::User, "c", 20),
            msg(sid, MessageRole::Assistant, "d", 30),
        ];
        let target = history[2].id;
        let mode = TurnMode::Edit {
            target,
            content: "c2".to_string(),
        };
        let plan = plan_turn(sid, history, &mode, at(100)).unwrap();

        let prior: Vec<&str> = plan.prior.iter().map(|m| m.content.as_str()).collect();
        assert_eq!(prior, vec!["a", "b"]);
        assert_eq!(plan.model_messages().len(), 3);
    }

    #[test]
    fn test_edit_missing_target_fails_closed() {
        let sid = Uuid::now_v7();
        let history = vec![msg(sid, MessageRole::User, "a", 0)];
        let mode = TurnMode::Edit {
            target: Uuid::now_v7(),
            content: "x".to_string(),
        };
        assert!(matches!(
            plan_turn(sid, history, &mode, at(1)),
            Err(ChatError::NotFound)
        ));
    }

    #[test]
    fn test_edit_assistant_message_is_invalid_state() {
        let sid = Uuid::now_v7();
        let history = vec![
            msg(sid, MessageRole::User, "a", 0),
            msg(sid, MessageRole::Assistant, "b", 10),
        ];
        let mode = TurnMode::Edit {
            target: history[1].id,
            content: "x".to_string(),
        };
        assert!(matches!(
            plan_turn(sid, history, &mode, at(20)),
            Err(ChatError::InvalidState(_))
        ));
    }

    #[test]
    fn test_regenerate_removes_trailing_reply() {
        let sid = Uuid::now_v7();
        let history = vec![
            msg(sid, MessageRole::User, "a", 0),
            msg(sid, MessageRole::Assistant, "b", 10),
            msg(sid, MessageRole::User, "c", 20),
            msg(sid, MessageRole::Assistant, "d", 30),
        ];
        let reply_id = history[3].id;
        let user_id = history[2].id;
        let plan = plan_turn(sid, history, &TurnMode::Regenerate, at(40)).unwrap();

        assert_eq!(plan.edits, vec![HistoryEdit::Remove { message_id: reply_id }]);
        assert_eq!(plan.live.id, user_id);
        assert_eq!(plan.live.content, "c");
        assert_eq!(plan.prior.len(), 2);
        assert_eq!(plan.expected_head, Some(reply_id));
    }

    #[test]
    fn test_regenerate_without_reply_resends_last_user_message() {
        let sid = Uuid::now_v7();
        let history = vec![msg(sid, MessageRole::User, "Coffee today? Also lunch?", 0)];
        let plan = plan_turn(sid, history, &TurnMode::Regenerate, at(5)).unwrap();

        assert!(plan.edits.is_empty());
        assert_eq!(plan.live.content, "Coffee today? Also lunch?");
    }

    #[test]
    fn test_regenerate_empty_session_is_invalid_state() {
        let err = plan_turn(Uuid::now_v7(), vec![], &TurnMode::Regenerate, at(0)).unwrap_err();
        assert!(matches!(err, ChatError::InvalidState(_)));
    }

    #[test]
    fn test_reply_message_is_ordered_after_live() {
        let sid = Uuid::now_v7();
        let history = vec![msg(sid, MessageRole::User, "a", 100)];
        let plan = plan_turn(sid, history, &TurnMode::Regenerate, at(0)).unwrap();
        let reply = plan.reply_message("answer".to_string(), at(50));

        assert_eq!(reply.role, MessageRole::Assistant);
        assert_eq!(reply.session_id, sid);
        assert_eq!(reply.created_at, at(101));
    }

    #[test]
    fn test_into_commit_puts_session_creation_first() {
        let sid = Uuid::now_v7();
        let user = UserId::new();
        let session = ChatSession {
            id: sid,
            user_id: user,
            title: "hi".to_string(),
            created_at: at(0),
            updated_at: at(0),
        };
        let plan = plan_turn(sid, vec![], &append("hi"), at(0)).unwrap();
        let reply = plan.reply_message("hello".to_string(), at(1));
        let commit = plan.into_commit(user, Some(session.clone()), reply.clone());

        assert_eq!(commit.edits.len(), 2);
        assert_eq!(commit.edits[0], HistoryEdit::CreateSession(session));
        assert!(matches!(commit.edits[1], HistoryEdit::Append(_)));
        assert_eq!(commit.reply, reply);
        assert_eq!(commit.expected_head, None);
    }
}
