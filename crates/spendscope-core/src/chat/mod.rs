//! Chat session engine.
//!
//! - `repository`: the `ChatRepository` port for sessions and messages
//! - `turn`: pure planning of the history mutation a request performs
//! - `lock`: per-session serialization of turns
//! - `title`: session title derivation
//! - `service`: `ChatService`, the turn controller

pub mod lock;
pub mod repository;
pub mod service;
pub mod title;
pub mod turn;
