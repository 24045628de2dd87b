//! Inbox Labeler — classifies unread mail with an LLM and applies one label per message.

pub mod config;
pub mod error;
pub mod llm;
pub mod mail;
pub mod pipeline;
pub mod scheduler;
