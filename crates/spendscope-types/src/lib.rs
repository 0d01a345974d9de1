//! Shared domain types for SpendScope.
//!
//! This crate contains the domain types used across the SpendScope chat engine:
//! users, chat sessions and messages, LLM request shapes, receipts, response
//! presets, configuration, and the associated error types.
//!
//! Zero infrastructure dependencies -- only serde, uuid, chrono, thiserror.

pub mod chat;
pub mod config;
pub mod error;
pub mod llm;
pub mod preset;
pub mod receipt;
pub mod user;
