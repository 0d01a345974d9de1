//! Infrastructure layer for SpendScope.
//!
//! Contains implementations of the ports defined in `spendscope-core`:
//! SQLite storage for chat sessions and receipts, the OpenAI-compatible
//! model client, and the `config.toml` loader.

pub mod config;
pub mod llm;
pub mod sqlite;
