//! One-shot chat turn from the command line.
//!
//! Builds a `ChatRequest` from the flags, runs it through the same
//! `ChatService` pipeline the REST API uses, and prints the reply.

use anyhow::Result;
use console::style;

use spendscope_types::chat::{ChatReply, ChatRequest};

use crate::cli::ChatArgs;
use crate::state::AppState;

/// Map CLI flags onto the request the chat engine understands.
fn build_request(args: ChatArgs) -> ChatRequest {
    ChatRequest {
        message: args.message.unwrap_or_default(),
        model: if args.pro { "pro" } else { "flash" }.to_string(),
        session_id: args.session,
        use_memory: args.no_memory.then_some(false),
        tone: args.tone,
        format: args.format,
        regenerate: args.regenerate,
        edit_target: args.edit,
    }
}

/// Split a reply into its `<thinking>` block (if any) and the user-facing answer.
fn split_reasoning(reply: &str) -> (Option<&str>, &str) {
    let Some(start) = reply.find("<thinking>") else {
        return (None, reply.trim());
    };
    let Some(end) = reply[start..].find("</thinking>").map(|i| start + i) else {
        return (None, reply.trim());
    };

    let reasoning = reply[start + "<thinking>".len()..end].trim();
    let answer = reply[end + "</thinking>".len()..].trim();
    (Some(reasoning), answer)
}

/// Send one chat turn.
///
/// # Examples
///
/// ```bash
/// spendscope chat "How much did I spend on groceries in May?"
/// spendscope chat "And in June?" --session <id> --format tabular
/// spendscope chat --session <id> --regenerate
/// ```
pub async fn chat(state: &AppState, args: ChatArgs, json: bool, verbose: bool) -> Result<()> {
    let request = build_request(args);
    let reply = state
        .chat_service
        .handle_chat_request(state.user_id, request)
        .await?;

    if json {
        println!("{}", serde_json::to_string_pretty(&reply)?);
        return Ok(());
    }

    print_reply(&reply, verbose);
    Ok(())
}

fn print_reply(reply: &ChatReply, verbose: bool) {
    let (reasoning, answer) = split_reasoning(&reply.reply);

    println!();
    println!(
        "  {} {}",
        style(&reply.title).cyan().bold(),
        style(format!("({})", reply.session_id)).dim()
    );
    println!();

    if verbose {
        if let Some(reasoning) = reasoning {
            for line in reasoning.lines() {
                println!("  {}", style(line).dim().italic());
            }
            println!();
        }
    }

    for line in answer.lines() {
        println!("  {line}");
    }
    println!();
    println!(
        "  {}",
        style(format!(
            "Continue with: spendscope chat \"...\" --session {}",
            reply.session_id
        ))
        .dim()
    );
    println!();
}

#[cfg(test)]
mod tests {
    use super::*;
    use uuid::Uuid;

    fn args() -> ChatArgs {
        ChatArgs {
            message: Some("Coffee?".to_string()),
            session: None,
            tone: "friendly".to_string(),
            format: "bullet".to_string(),
            pro: false,
            no_memory: false,
            regenerate: false,
            edit: None,
        }
    }

    #[test]
    fn memory_defers_to_config_unless_disabled() {
        assert_eq!(build_request(args()).use_memory, None);

        let mut a = args();
        a.no_memory = true;
        assert_eq!(build_request(a).use_memory, Some(false));
    }

    #[test]
    fn pro_flag_selects_pro_model() {
        let mut a = args();
        a.pro = true;
        assert_eq!(build_request(a).model, "pro");
        assert_eq!(build_request(args()).model, "flash");
    }

    #[test]
    fn edit_and_session_carry_through() {
        let sid = Uuid::now_v7();
        let mid = Uuid::now_v7();
        let mut a = args();
        a.session = Some(sid);
        a.edit = Some(mid);

        let req = build_request(a);
        assert_eq!(req.session_id, Some(sid));
        assert_eq!(req.edit_target, Some(mid));
        assert_eq!(req.tone, "friendly");
        assert_eq!(req.format, "bullet");
    }

    #[test]
    fn regenerate_without_message_sends_empty_text() {
        let mut a = args();
        a.message = None;
        a.regenerate = true;
        let req = build_request(a);
        assert!(req.message.is_empty());
        assert!(req.regenerate);
    }

    #[test]
    fn reasoning_is_split_from_answer() {
        let (reasoning, answer) =
            split_reasoning("<thinking>\nsum 3 receipts\n</thinking>\n\nYou spent 12.40 EUR.");
        assert_eq!(reasoning, Some("sum 3 receipts"));
        assert_eq!(answer, "You spent 12.40 EUR.");
    }

    #[test]
    fn reply_without_reasoning_is_unchanged() {
        assert_eq!(split_reasoning("  Plain answer. "), (None, "Plain answer."));
        // Unclosed tag: show everything.
        assert_eq!(
            split_reasoning("<thinking> never closed"),
            (None, "<thinking> never closed")
        );
    }
}
