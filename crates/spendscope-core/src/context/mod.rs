//! Context assembly: renders the instruction block sent with every turn.
//!
//! `ContextAssembler::build` is a pure function of its inputs. The same
//! records, memory and presets always produce byte-identical text.

use std::fmt::Write;

use spendscope_types::chat::MessageRole;
use spendscope_types::preset::{ResponseFormat, Tone};
use spendscope_types::receipt::FinancialRecord;

use crate::memory::MemoryBlock;

pub const NO_RECORDS: &str = "No receipts uploaded yet.";
pub const MEMORY_NOT_REQUESTED: &str = "No global memory requested.";
pub const NO_PRIOR_CONVERSATION: &str = "No previous conversations found.";

const UNKNOWN_STORE: &str = "Unknown Store";
const UNKNOWN_DATE: &str = "Unknown Date";
const NO_LINE_ITEMS: &str = "No specific items detailed";

/// Builds the system instruction for a turn.
#[derive(Debug, Clone, Copy, Default)]
pub struct ContextAssembler;

impl ContextAssembler {
    pub fn build(
        records: &[FinancialRecord],
        memory: &MemoryBlock,
        tone: Tone,
        format: ResponseFormat,
    ) -> String {
        format!(
            "\
You are SpendScope AI, an expert financial assistant built into the user's expense tracking app.

CRITICAL RULES:
1. YOU ALREADY HAVE THE DATA: the \"USER RECEIPTS DATA\" section below is the live record of the user's expenses. Never tell the user you cannot access their receipts or bank.
2. IF DATA IS MISSING: when the user asks about something absent from \"USER RECEIPTS DATA\", answer: \"I checked your uploaded receipts, but I don't see any expenses matching that description.\"
3. BOUNDARIES: only answer questions about the user's expenses, finance, accounting and budgeting, based on the data provided.
4. CHAIN OF THOUGHT: before the final answer, write your reasoning inside <thinking>...</thinking> tags. Use it to plan, calculate totals and analyze the data. After </thinking>, write the user-facing response.

USER PREFERENCES:
- Persona/Tone: {tone}
- Output Format: {format}

---
USER RECEIPTS DATA:
{records}

---
PREVIOUS CHAT CONTEXT (Global Memory):
{memory}
",
            tone = tone.instruction(),
            format = format.instruction(),
            records = render_records(records),
            memory = render_memory(memory),
        )
    }
}

/// One line per record, in the order given.
pub fn render_records(records: &[FinancialRecord]) -> String {
    if records.is_empty() {
        return NO_RECORDS.to_string();
    }

    let mut out = String::new();
    for (i, record) in records.iter().enumerate() {
        if i > 0 {
            out.push('\n');
        }
        let date = record
            .date
            .map(|d| d.format("%Y-%m-%d").to_string())
            .unwrap_or_else(|| UNKNOWN_DATE.to_string());
        let store = record.store.as_deref().unwrap_or(UNKNOWN_STORE);
        let items = if record.line_items.is_empty() {
            NO_LINE_ITEMS.to_string()
        } else {
            record
                .line_items
                .iter()
                .map(|item| format!("{} ({:.2}{})", item.description, item.amount, record.currency))
                .collect::<Vec<_>>()
                .join(", ")
        };
        // Writing into a String cannot fail.
        let _ = write!(
            out,
            "- Date: {date} | Store: {store} | Total: {:.2} {} | Items bought: {items}",
            record.total, record.currency
        );
    }
    out
}

pub fn render_memory(memory: &MemoryBlock) -> String {
    match memory {
        MemoryBlock::NotRequested => MEMORY_NOT_REQUESTED.to_string(),
        MemoryBlock::NoPriorConversation => NO_PRIOR_CONVERSATION.to_string(),
        MemoryBlock::Messages(messages) if messages.is_empty() => NO_PRIOR_CONVERSATION.to_string(),
        MemoryBlock::Messages(messages) => messages
            .iter()
            .map(|m| {
                let label = match m.role {
                    MessageRole::User => "USER",
                    MessageRole::Assistant => "ASSISTANT",
                };
                format!("{label}: {}", m.content)
            })
            .collect::<Vec<_>>()
            .join("\n"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{NaiveDate, Utc};
    use spendscope_types::chat::ChatMessage;
    use spendscope_types::receipt::LineItem;
    use uuid::Uuid;

    fn groceries() -> FinancialRecord {
        FinancialRecord {
            store: Some("Lidl".to_string()),
            date: NaiveDate::from_ymd_opt(2026, 3, 14),
            total: 23.5,
            currency: "EUR".to_string(),
            line_items: vec![
                LineItem {
                    description: "Milk".to_string(),
                    amount: 1.2,
                    category: "Groceries".to_string(),
                },
                LineItem {
                    description: "Coffee".to_string(),
                    amount: 7.99,
                    category: "Groceries".to_string(),
                },
            ],
        }
    }

    fn memory_message(role: MessageRole, content: &str) -> ChatMessage {
        ChatMessage {
            id: Uuid::now_v7(),
            session_id: Uuid::now_v7(),
            role,
            content: content.to_string(),
            created_at: Utc::now(),
        }
    }

    #[test]
    fn test_render_record_line() {
        assert_eq!(
            render_records(&[groceries()]),
            "- Date: 2026-03-14 | Store: Lidl | Total: 23.50 EUR | Items bought: Milk (1.20EUR), Coffee (7.99EUR)"
        );
    }

    #[test]
    fn test_render_record_unknowns() {
        let record = FinancialRecord {
            store: None,
            date: None,
            total: 4.0,
            currency: "USD".to_string(),
            line_items: vec![],
        };
        assert_eq!(
            render_records(&[record]),
            "- Date: Unknown Date | Store: Unknown Store | Total: 4.00 USD | Items bought: No specific items detailed"
        );
    }

    #[test]
    fn test_render_no_records_sentinel() {
        assert_eq!(render_records(&[]), NO_RECORDS);
    }

    #[test]
    fn test_render_memory_variants() {
        assert_eq!(render_memory(&MemoryBlock::NotRequested), MEMORY_NOT_REQUESTED);
        assert_eq!(
            render_memory(&MemoryBlock::NoPriorConversation),
            NO_PRIOR_CONVERSATION
        );
        let block = MemoryBlock::Messages(vec![
            memory_message(MessageRole::User, "rent?"),
            memory_message(MessageRole::Assistant, "900 EUR"),
        ]);
        assert_eq!(render_memory(&block), "USER: rent?\nASSISTANT: 900 EUR");
    }

    #[test]
    fn test_build_includes_every_section() {
        let text = ContextAssembler::build(
            &[groceries()],
            &MemoryBlock::NotRequested,
            Tone::Candid,
            ResponseFormat::Tabular,
        );
        assert!(text.starts_with("You are SpendScope AI"));
        assert!(text.contains("<thinking>"));
        assert!(text.contains(Tone::Candid.instruction()));
        assert!(text.contains(ResponseFormat::Tabular.instruction()));
        assert!(text.contains("Store: Lidl"));
        assert!(text.contains(MEMORY_NOT_REQUESTED));
    }

    #[test]
    fn test_build_is_deterministic() {
        let memory = MemoryBlock::Messages(vec![memory_message(MessageRole::User, "hi")]);
        let a = ContextAssembler::build(&[groceries()], &memory, Tone::Friendly, ResponseFormat::Bullet);
        let b = ContextAssembler::build(&[groceries()], &memory, Tone::Friendly, ResponseFormat::Bullet);
        assert_eq!(a, b);
    }

    #[test]
    fn test_build_with_defaults_for_unknown_choices() {
        let text = ContextAssembler::build(
            &[],
            &MemoryBlock::NoPriorConversation,
            Tone::from_choice("pirate"),
            ResponseFormat::from_choice(""),
        );
        assert!(text.contains(Tone::Professional.instruction()));
        assert!(text.contains(ResponseFormat::Prose.instruction()));
        assert!(text.contains(NO_RECORDS));
        assert!(text.contains(NO_PRIOR_CONVERSATION));
    }
}
