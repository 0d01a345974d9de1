//! Session management CLI commands: list, show, delete.
//!
//! Provides session browsing with rich tables, transcript display, and
//! deletion with confirmation prompt.

use anyhow::{Context, Result};
use comfy_table::{Cell, Color, ContentArrangement, Table, presets};
use console::style;
use dialoguer::Confirm;
use uuid::Uuid;

use spendscope_types::chat::MessageRole;

use crate::state::AppState;

/// List the local user's sessions, most recently active first.
///
/// # Examples
///
/// ```bash
/// spendscope sessions list
/// spendscope sessions list --limit 5 --json
/// ```
pub async fn list_sessions(state: &AppState, limit: Option<i64>, json: bool) -> Result<()> {
    let sessions = state
        .chat_service
        .list_sessions(&state.user_id, limit, None)
        .await?;

    if json {
        println!("{}", serde_json::to_string_pretty(&sessions)?);
        return Ok(());
    }

    if sessions.is_empty() {
        println!();
        println!(
            "  {} No sessions yet. Start one with: {}",
            style("i").blue().bold(),
            style("spendscope chat \"How much did I spend this month?\"").yellow()
        );
        println!();
        return Ok(());
    }

    let mut table = Table::new();
    table.load_preset(presets::UTF8_FULL_CONDENSED);
    table.set_content_arrangement(ContentArrangement::Dynamic);

    table.set_header(vec![
        Cell::new("ID").fg(Color::White),
        Cell::new("Title").fg(Color::White),
        Cell::new("Started").fg(Color::White),
        Cell::new("Last active").fg(Color::White),
    ]);

    for session in &sessions {
        table.add_row(vec![
            Cell::new(session.id.to_string()).fg(Color::DarkGrey),
            Cell::new(&session.title).fg(Color::Cyan),
            Cell::new(session.created_at.format("%Y-%m-%d %H:%M").to_string()).fg(Color::White),
            Cell::new(format_age(chrono::Utc::now() - session.updated_at)).fg(Color::DarkGrey),
        ]);
    }

    println!();
    println!("{table}");
    println!();
    println!(
        "  {} session{}",
        style(sessions.len()).bold(),
        if sessions.len() == 1 { "" } else { "s" }
    );
    println!();

    Ok(())
}

/// Print a session transcript.
///
/// Message ids are shown so a past message can be targeted with
/// `spendscope chat --edit <id>`.
pub async fn show_session(state: &AppState, session_id: Uuid, json: bool) -> Result<()> {
    let session = state
        .chat_service
        .get_session(&state.user_id, &session_id)
        .await
        .with_context(|| format!("Session '{session_id}' not found"))?;

    let messages = state
        .chat_service
        .get_messages(&state.user_id, &session_id)
        .await?;

    if json {
        let export = serde_json::json!({
            "session": session,
            "messages": messages,
        });
        println!("{}", serde_json::to_string_pretty(&export)?);
        return Ok(());
    }

    println!();
    println!("  {}", style(&session.title).cyan().bold());
    println!(
        "  {}",
        style(format!(
            "{} · started {}",
            session.id,
            session.created_at.format("%Y-%m-%d %H:%M UTC")
        ))
        .dim()
    );
    println!();

    for msg in &messages {
        let label = match msg.role {
            MessageRole::User => style("You").green().bold(),
            MessageRole::Assistant => style("SpendScope").magenta().bold(),
        };
        println!(
            "  {} {}",
            label,
            style(format!("{} · {}", msg.created_at.format("%H:%M"), msg.id)).dim()
        );
        for line in msg.content.lines() {
            println!("    {line}");
        }
        println!();
    }

    Ok(())
}

/// Delete a session with confirmation.
///
/// # Examples
///
/// ```bash
/// spendscope sessions delete <session-id>
/// spendscope sessions delete <session-id> --force
/// ```
pub async fn delete_session(state: &AppState, session_id: Uuid, force: bool, json: bool) -> Result<()> {
    let session = state
        .chat_service
        .get_session(&state.user_id, &session_id)
        .await
        .with_context(|| format!("Session '{session_id}' not found"))?;

    if !force && !json {
        let confirmed = Confirm::new()
            .with_prompt(format!(
                "Delete session '{}' and all its messages?",
                style(&session.title).red().bold()
            ))
            .default(false)
            .interact()?;

        if !confirmed {
            println!("  Cancelled.");
            return Ok(());
        }
    }

    state
        .chat_service
        .delete_session(state.user_id, session_id)
        .await?;

    if json {
        println!(
            "{}",
            serde_json::json!({"deleted": true, "session_id": session_id.to_string()})
        );
    } else {
        println!(
            "  {} Session '{}' deleted.",
            style("x").red().bold(),
            session.title
        );
    }

    Ok(())
}

// --- Formatting helpers ---

fn format_age(age: chrono::TimeDelta) -> String {
    let secs = age.num_seconds().max(0);
    match secs {
        0..60 => "just now".to_string(),
        60..3600 => format!("{}m ago", secs / 60),
        3600..86_400 => format!("{}h ago", secs / 3600),
        _ => format!("{}d ago", secs / 86_400),
    }
}
