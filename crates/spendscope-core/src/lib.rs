//! Conversational session engine and port trait definitions for SpendScope.
//!
//! This crate defines the "ports" (repository, records, and model traits)
//! that the infrastructure layer implements, plus the engine built on them:
//! turn planning, cross-session memory, prompt assembly, and the chat
//! service that orchestrates a turn. It depends only on `spendscope-types`
//! -- never on `spendscope-infra` or any database/IO crate.

pub mod chat;
pub mod context;
pub mod llm;
pub mod memory;
pub mod records;

#[cfg(test)]
pub(crate) mod testing;
