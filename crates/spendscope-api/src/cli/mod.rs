//! CLI command definitions for the `spendscope` binary.
//!
//! Uses clap derive macros for argument parsing.

pub mod chat;
pub mod session;

use clap::{Args, Parser, Subcommand};
use clap_complete::Shell;
use uuid::Uuid;

use spendscope_types::user::UserId;

/// Ask questions about your expenses.
#[derive(Parser)]
#[command(name = "spendscope", version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Output machine-readable JSON instead of styled text.
    #[arg(long, global = true)]
    pub json: bool,

    /// Suppress all output except errors.
    #[arg(long, global = true)]
    pub quiet: bool,

    /// Detailed output (-v for info, -vv for debug, -vvv for trace).
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Export spans to stdout via OpenTelemetry.
    #[arg(long, global = true)]
    pub otel: bool,

    /// Act as this user instead of the local identity in the data directory.
    #[arg(long, global = true, env = "SPENDSCOPE_USER")]
    pub user: Option<UserId>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Start the REST API server.
    Serve {
        /// Port to listen on.
        #[arg(short, long, default_value = "3000")]
        port: u16,

        /// Host to bind to.
        #[arg(long, default_value = "127.0.0.1")]
        host: String,
    },

    /// Send one chat turn and print the reply.
    Chat(ChatArgs),

    /// Browse and manage chat sessions.
    Sessions {
        #[command(subcommand)]
        action: SessionCommand,
    },

    /// Generate shell completions.
    Completions {
        /// Shell to generate completions for.
        shell: Shell,
    },
}

#[derive(Args)]
pub struct ChatArgs {
    /// The message to send. Optional with --regenerate.
    pub message: Option<String>,

    /// Continue this session instead of starting a new one.
    #[arg(short, long)]
    pub session: Option<Uuid>,

    /// Response tone (professional, friendly, candid).
    #[arg(long, default_value = "professional")]
    pub tone: String,

    /// Response format (prose, bullet, tabular).
    #[arg(long, default_value = "prose")]
    pub format: String,

    /// Use the larger model.
    #[arg(long)]
    pub pro: bool,

    /// Do not inject messages from other sessions.
    #[arg(long)]
    pub no_memory: bool,

    /// Drop the last reply and answer the last message again.
    #[arg(long, requires = "session", conflicts_with = "edit")]
    pub regenerate: bool,

    /// Replace this user message with MESSAGE and answer again.
    #[arg(long, value_name = "MESSAGE_ID", requires_all = ["session", "message"])]
    pub edit: Option<Uuid>,
}

#[derive(Subcommand)]
pub enum SessionCommand {
    /// List sessions, most recently active first.
    #[command(alias = "ls")]
    List {
        /// Maximum number of sessions to show.
        #[arg(short, long)]
        limit: Option<i64>,
    },

    /// Show a session transcript.
    Show {
        /// Session ID.
        id: Uuid,
    },

    /// Delete a session and all its messages.
    #[command(alias = "rm")]
    Delete {
        /// Session ID.
        id: Uuid,

        /// Skip confirmation prompt.
        #[arg(long)]
        force: bool,
    },
}
