//! # lasttalk
//!
//! Turns an exported KakaoTalk transcript into a reusable conversational
//! persona and answers new messages as that speaker.
//!
//! The pipeline: parse the export into turns, extract style/keyword/phrase
//! signals, repair the LLM-produced persona profile, index the history for
//! retrieval (pgvector via sqlx), and stream replies that merge persona,
//! retrieved context, and bounded conversation memory.

pub mod chat;
pub mod config;
pub mod error;
pub mod index;
pub mod job;
pub mod memory;
pub mod model;
pub mod persona;
pub mod pipeline;
pub mod prompt;
pub mod providers;
pub mod store;
pub mod style;
pub mod telemetry;
pub mod transcript;
