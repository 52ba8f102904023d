// src/trialogue/mod.rs

pub mod agent_router;
pub mod client_wrapper;
pub mod clients;
pub mod config;
pub mod context_formatter;
pub mod conversation_store;
pub mod http_client_pool;
pub mod message_record;
pub mod orchestrator;
#[cfg(feature = "server")]
pub mod server;
pub mod snapshot;
