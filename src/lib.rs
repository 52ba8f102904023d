//! # Trialogue
//!
//! Trialogue runs one conversation between three participants: a human and two language-model
//! agents, Claude (Anthropic) and DeepSeek. The human moderates. Every turn names the agent that
//! should answer next, and that agent receives the whole shared history with every other
//! participant's turns labelled by speaker.
//!
//! The crate is layered as:
//!
//! * [`MessageRecord`]: one immutable turn (role, content, speaker, timestamp).
//! * [`ConversationStore`]: concurrent map of conversation id → ordered history, with optional
//!   idle expiry.
//! * [`context_formatter`]: history → role/content messages a backend understands.
//! * [`ClientWrapper`]: the backend seam, implemented by [`clients::claude::ClaudeClient`] and
//!   [`clients::deepseek::DeepSeekClient`].
//! * [`AgentRouter`]: agent name → system prompt, display name and client.
//! * [`Orchestrator`]: runs turns, serialises them per conversation and records failures.
//! * [`snapshot`]: JSON save/restore of whole conversations.
//! * `server` (feature `server`, on by default): the axum HTTP API.
//!
//! ## Getting Started
//!
//! ```rust,no_run
//! use trialogue::{Orchestrator, TrialogueConfig};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     trialogue::init_logger();
//!
//!     let config = TrialogueConfig::from_env()?;
//!     let orchestrator = Orchestrator::from_config(&config);
//!
//!     let turn = orchestrator
//!         .chat("default", "What is a monad, in one sentence?", "claude")
//!         .await?;
//!     println!("{}: {}", turn.display_name, turn.content);
//!
//!     let turn = orchestrator.request_agent_turn("default", "deepseek").await?;
//!     println!("{}: {}", turn.display_name, turn.content);
//!     Ok(())
//! }
//! ```

use std::sync::Once;

static INIT_LOGGER: Once = Once::new();

/// Initialise the global [`env_logger`] subscriber exactly once.
///
/// ```rust
/// trialogue::init_logger();
/// log::info!("Logger is ready");
/// ```
pub fn init_logger() {
    INIT_LOGGER.call_once(|| {
        env_logger::init();
    });
}

pub mod trialogue;

pub use trialogue::agent_router;
pub use trialogue::agent_router::{AgentProfile, AgentRouter};
pub use trialogue::client_wrapper;
pub use trialogue::client_wrapper::{
    BackendFailure, BackendFailureKind, ClientWrapper, Completion, Message, Role, TokenUsage,
};
pub use trialogue::clients;
pub use trialogue::config;
pub use trialogue::config::{ConfigError, TrialogueConfig};
pub use trialogue::context_formatter;
pub use trialogue::conversation_store;
pub use trialogue::conversation_store::ConversationStore;
pub use trialogue::http_client_pool;
pub use trialogue::message_record;
pub use trialogue::message_record::{MessageRecord, TurnRole};
pub use trialogue::orchestrator;
pub use trialogue::orchestrator::{AgentTurn, BackendFailurePolicy, Orchestrator, OrchestratorError};
#[cfg(feature = "server")]
pub use trialogue::server;
pub use trialogue::snapshot;
pub use trialogue::snapshot::{ConversationSnapshot, SnapshotStore};
