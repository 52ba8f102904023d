//! The orchestrator ties the store, the formatter, the router and the backends together.
//!
//! One agent turn runs as:
//!
//! ```text
//! request_agent_turn(conv_id, agent)
//!   ├─ route(agent)                    UnknownAgent -> error, history untouched
//!   ├─ lock(conv_id)                   one turn at a time per conversation
//!   ├─ format_history(store.get(conv_id))
//!   ├─ client.send_message(context, system_prompt)   bounded by backend_timeout
//!   ├─ store.append(reply | failure per BackendFailurePolicy)
//!   └─ AgentTurn { content, display_name, failure, usage }
//! ```
//!
//! Turn order is never validated: the human moderates and may call on any agent at any time,
//! including the same agent twice in a row.
//!
//! # Example
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use trialogue::{AgentRouter, ConversationStore, Orchestrator, TrialogueConfig};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = TrialogueConfig::from_env()?;
//!     let orchestrator = Orchestrator::new(
//!         Arc::new(ConversationStore::new()),
//!         AgentRouter::from_config(&config),
//!     );
//!
//!     orchestrator.submit_human_turn("c1", "Hi everyone!").await;
//!     let claude = orchestrator.request_agent_turn("c1", "claude").await?;
//!     println!("{}: {}", claude.display_name, claude.content);
//!
//!     let deepseek = orchestrator.request_agent_turn("c1", "deepseek").await?;
//!     println!("{}: {}", deepseek.display_name, deepseek.content);
//!     Ok(())
//! }
//! ```

use crate::agent_router::{AgentProfile, AgentRouter};
use crate::client_wrapper::{BackendFailure, BackendFailureKind, TokenUsage};
use crate::config::TrialogueConfig;
use crate::context_formatter::format_history;
use crate::conversation_store::ConversationStore;
use crate::message_record::MessageRecord;
use crate::snapshot::ConversationSnapshot;
use dashmap::DashMap;
use std::error::Error;
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::Mutex;

/// Errors surfaced to callers. Backend failures are not among them, see [`AgentTurn::failure`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OrchestratorError {
    /// The requested agent is not registered.
    UnknownAgent(String),
    /// Persisted conversation data failed to parse or validate.
    MalformedSnapshot(String),
    /// No snapshot file exists at the given path.
    SnapshotNotFound(String),
    /// Reading or writing a snapshot failed.
    SnapshotIo(String),
}

impl fmt::Display for OrchestratorError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            OrchestratorError::UnknownAgent(name) => write!(f, "Unknown agent: {}", name),
            OrchestratorError::MalformedSnapshot(msg) => write!(f, "Malformed snapshot: {}", msg),
            OrchestratorError::SnapshotNotFound(path) => write!(f, "Snapshot not found: {}", path),
            OrchestratorError::SnapshotIo(msg) => write!(f, "Snapshot I/O error: {}", msg),
        }
    }
}

impl Error for OrchestratorError {}

/// What gets recorded in history when a backend call fails.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BackendFailurePolicy {
    /// Record the error text as the agent's own turn. It will be replayed to models on later
    /// turns like any other agent message.
    AgentTurn,
    /// Record a notice tagged `"system"`. Notices are visible in history but never replayed.
    SystemNotice,
}

impl fmt::Display for BackendFailurePolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BackendFailurePolicy::AgentTurn => write!(f, "agent-turn"),
            BackendFailurePolicy::SystemNotice => write!(f, "system-notice"),
        }
    }
}

impl FromStr for BackendFailurePolicy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "agent-turn" => Ok(BackendFailurePolicy::AgentTurn),
            "system-notice" => Ok(BackendFailurePolicy::SystemNotice),
            other => Err(format!("unknown failure policy: {}", other)),
        }
    }
}

/// Outcome of one agent turn.
#[derive(Debug, Clone, PartialEq)]
pub struct AgentTurn {
    pub conversation_id: String,
    /// Agent tag the turn was recorded under.
    pub speaker: String,
    /// Human-readable agent name.
    pub display_name: String,
    /// Reply text, or the error text standing in for it.
    pub content: String,
    /// Set when the backend call failed.
    pub failure: Option<BackendFailure>,
    pub usage: Option<TokenUsage>,
}

impl AgentTurn {
    pub fn is_failure(&self) -> bool {
        self.failure.is_some()
    }
}

/// Routes turns to agents and keeps every conversation's history coherent.
pub struct Orchestrator {
    store: Arc<ConversationStore>,
    router: AgentRouter,
    turn_locks: DashMap<String, Arc<Mutex<()>>>,
    backend_timeout: Duration,
    failure_policy: BackendFailurePolicy,
    conversation_ttl: Option<Duration>,
}

impl Orchestrator {
    /// Orchestrator over `store` and `router` with the default timeout, failure policy and no
    /// idle expiry.
    pub fn new(store: Arc<ConversationStore>, router: AgentRouter) -> Self {
        let defaults = TrialogueConfig::default();
        Orchestrator {
            store,
            router,
            turn_locks: DashMap::new(),
            backend_timeout: defaults.backend_timeout,
            failure_policy: defaults.failure_policy,
            conversation_ttl: defaults.conversation_ttl,
        }
    }

    /// Fresh store, the stock agents and every tunable taken from `config`.
    pub fn from_config(config: &TrialogueConfig) -> Self {
        Self::new(
            Arc::new(ConversationStore::new()),
            AgentRouter::from_config(config),
        )
        .with_backend_timeout(config.backend_timeout)
        .with_failure_policy(config.failure_policy)
        .with_conversation_ttl(config.conversation_ttl)
    }

    pub fn with_backend_timeout(mut self, timeout: Duration) -> Self {
        self.backend_timeout = timeout;
        self
    }

    pub fn with_failure_policy(mut self, policy: BackendFailurePolicy) -> Self {
        self.failure_policy = policy;
        self
    }

    pub fn with_conversation_ttl(mut self, ttl: Option<Duration>) -> Self {
        self.conversation_ttl = ttl;
        self
    }

    pub fn store(&self) -> &Arc<ConversationStore> {
        &self.store
    }

    pub fn router(&self) -> &AgentRouter {
        &self.router
    }

    pub fn failure_policy(&self) -> BackendFailurePolicy {
        self.failure_policy
    }

    pub fn conversation_ttl(&self) -> Option<Duration> {
        self.conversation_ttl
    }

    /// Append a human turn. Always succeeds.
    pub async fn submit_human_turn(&self, conv_id: &str, text: &str) -> MessageRecord {
        let lock = self.turn_lock(conv_id);
        let _turn = lock.lock().await;
        self.store.append(conv_id, MessageRecord::human(text))
    }

    /// Let `agent_name` speak in `conv_id`.
    ///
    /// Fails only with [`OrchestratorError::UnknownAgent`], in which case history is left
    /// unchanged. A failed backend call still completes the turn; see [`AgentTurn::failure`].
    pub async fn request_agent_turn(
        &self,
        conv_id: &str,
        agent_name: &str,
    ) -> Result<AgentTurn, OrchestratorError> {
        let profile = self.router.route(agent_name)?;
        let lock = self.turn_lock(conv_id);
        let _turn = lock.lock().await;
        Ok(self.run_agent_turn(conv_id, profile).await)
    }

    /// Human turn followed by an agent turn, atomically with respect to other turns on
    /// `conv_id`. The agent is resolved first, so an unknown agent records nothing.
    pub async fn chat(
        &self,
        conv_id: &str,
        text: &str,
        agent_name: &str,
    ) -> Result<AgentTurn, OrchestratorError> {
        let profile = self.router.route(agent_name)?;
        let lock = self.turn_lock(conv_id);
        let _turn = lock.lock().await;
        self.store.append(conv_id, MessageRecord::human(text));
        Ok(self.run_agent_turn(conv_id, profile).await)
    }

    /// Ordered history of `conv_id`; empty for an unknown id.
    pub fn history(&self, conv_id: &str) -> Vec<MessageRecord> {
        self.store.get(conv_id)
    }

    /// Forget `conv_id`. Waits for an in-flight turn on it to finish first.
    pub async fn delete_conversation(&self, conv_id: &str) -> bool {
        let lock = self.turn_lock(conv_id);
        let _turn = lock.lock().await;
        let removed = self.store.delete(conv_id);
        if removed {
            log::info!(
                "Orchestrator::delete_conversation(...): cleared conversation {}",
                conv_id
            );
        }
        removed
    }

    pub fn conversation_count(&self) -> usize {
        self.store.count()
    }

    /// Current state of `conv_id` as a snapshot.
    pub fn snapshot(&self, conv_id: &str) -> ConversationSnapshot {
        ConversationSnapshot::new(conv_id, self.store.get(conv_id))
    }

    /// Replace the history of `snapshot.conversation_id` with the snapshot's records.
    ///
    /// The snapshot is validated before anything is touched; on error the in-memory history
    /// is unchanged. Returns the number of restored records.
    pub async fn restore(&self, snapshot: ConversationSnapshot) -> Result<usize, OrchestratorError> {
        snapshot.validate()?;
        let conv_id = snapshot.conversation_id;
        let restored = snapshot.messages.len();

        let lock = self.turn_lock(&conv_id);
        let _turn = lock.lock().await;
        self.store.replace(&conv_id, snapshot.messages);

        log::info!(
            "Orchestrator::restore(...): loaded conversation {} with {} messages",
            conv_id,
            restored
        );
        Ok(restored)
    }

    /// Plain-text overview: id, message count, then one line per turn with the first 100
    /// characters of its content.
    pub fn summary(&self, conv_id: &str) -> String {
        let history = self.store.get(conv_id);
        let mut summary = format!(
            "Conversation ID: {}\nTotal messages: {}\n\n",
            conv_id,
            history.len()
        );
        for (i, record) in history.iter().enumerate() {
            let preview: String = record.content.chars().take(100).collect();
            summary.push_str(&format!("{}. [{}] {}...\n", i + 1, record.speaker, preview));
        }
        summary
    }

    /// Apply the idle TTL, if one is configured, and drop turn locks nobody is using.
    ///
    /// A conversation with a turn in progress is never evicted, however long its backend call
    /// has been running. Returns the number of evicted conversations.
    pub fn evict_idle_conversations(&self) -> usize {
        let mut evicted = 0;
        if let Some(ttl) = self.conversation_ttl {
            for conv_id in self.store.idle_ids(ttl) {
                let lock = self.turn_lock(&conv_id);
                let Ok(_turn) = lock.try_lock() else {
                    log::debug!(
                        "Orchestrator::evict_idle_conversations(): {} has a turn in progress, skipping",
                        conv_id
                    );
                    continue;
                };
                if self.store.remove_if_idle(&conv_id, ttl) {
                    evicted += 1;
                }
            }
        }
        self.turn_locks.retain(|_, lock| Arc::strong_count(lock) > 1);
        if evicted > 0 {
            log::info!(
                "Orchestrator::evict_idle_conversations(): evicted {} idle conversations",
                evicted
            );
        }
        evicted
    }

    fn turn_lock(&self, conv_id: &str) -> Arc<Mutex<()>> {
        self.turn_locks
            .entry(conv_id.to_string())
            .or_insert_with(|| Arc::new(Mutex::new(())))
            .clone()
    }

    /// Format → call → record. The caller holds `conv_id`'s turn lock.
    async fn run_agent_turn(&self, conv_id: &str, profile: &AgentProfile) -> AgentTurn {
        let context = format_history(&self.store.get(conv_id));
        log::info!(
            "Orchestrator::request_agent_turn(...): {} speaking in {} with {} context messages",
            profile.name,
            conv_id,
            context.len()
        );

        let started = Instant::now();
        let result = match tokio::time::timeout(
            self.backend_timeout,
            profile
                .client
                .send_message(&context, &profile.system_prompt),
        )
        .await
        {
            Ok(result) => result,
            Err(_) => Err(BackendFailure::new(
                profile.client.model_name(),
                BackendFailureKind::Timeout,
                format!("no reply within {:?}", self.backend_timeout),
            )),
        };

        match result {
            Ok(completion) => {
                if let Some(usage) = &completion.usage {
                    log::debug!(
                        "Orchestrator::request_agent_turn(...): {} used {} input / {} output tokens",
                        profile.name,
                        usage.input_tokens,
                        usage.output_tokens
                    );
                }
                log::info!(
                    "Orchestrator::request_agent_turn(...): {} replied in {} after {:?}",
                    profile.name,
                    conv_id,
                    started.elapsed()
                );
                self.store.append(
                    conv_id,
                    MessageRecord::agent(&profile.name, completion.content.as_str()),
                );
                AgentTurn {
                    conversation_id: conv_id.to_string(),
                    speaker: profile.name.clone(),
                    display_name: profile.display_name.clone(),
                    content: completion.content,
                    failure: None,
                    usage: completion.usage,
                }
            }
            Err(failure) => {
                log::error!(
                    "Orchestrator::request_agent_turn(...): {} failed in {}: {}",
                    profile.name,
                    conv_id,
                    failure
                );
                let content = format!(
                    "Error: Unable to get response from {}. {}",
                    profile.display_name, failure
                );
                let record = match self.failure_policy {
                    BackendFailurePolicy::AgentTurn => {
                        MessageRecord::agent(&profile.name, content.as_str())
                    }
                    BackendFailurePolicy::SystemNotice => MessageRecord::notice(content.as_str()),
                };
                self.store.append(conv_id, record);
                AgentTurn {
                    conversation_id: conv_id.to_string(),
                    speaker: profile.name.clone(),
                    display_name: profile.display_name.clone(),
                    content,
                    failure: Some(failure),
                    usage: None,
                }
            }
        }
    }
}
