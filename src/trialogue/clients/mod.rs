//! Provider specific [`ClientWrapper`](crate::client_wrapper::ClientWrapper) implementations.
//!
//! [`claude`] speaks Anthropic's native Messages API (separate `system` field), [`deepseek`]
//! speaks the OpenAI-compatible chat-completions API (system prompt as the first message).
//! Both converge on the same plain-text reply contract.

pub mod common;

pub mod claude;
pub mod deepseek;
