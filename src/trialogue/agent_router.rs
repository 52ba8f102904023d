//! Agent registry: agent name → system prompt, display name and backend.
//!
//! The router is a lookup table over [`AgentProfile`]s. Adding a third backend means
//! registering another profile; the [`Orchestrator`](crate::Orchestrator) never changes.
//!
//! ```rust
//! use std::sync::Arc;
//! use trialogue::agent_router::{AgentProfile, AgentRouter};
//! use trialogue::clients::deepseek::{DeepSeekClient, Model};
//!
//! let mut router = AgentRouter::new();
//! router.register(AgentProfile::new(
//!     "deepseek",
//!     "DeepSeek",
//!     "You are DeepSeek.",
//!     Arc::new(DeepSeekClient::new_with_model_enum("key", Model::DeepSeekChat)),
//! ));
//!
//! assert!(router.route("deepseek").is_ok());
//! assert!(router.route("DeepSeek").is_err()); // exact, case-sensitive match
//! ```

use crate::client_wrapper::ClientWrapper;
use crate::clients::claude::ClaudeClient;
use crate::clients::deepseek::DeepSeekClient;
use crate::config::TrialogueConfig;
use crate::orchestrator::OrchestratorError;
use std::collections::HashMap;
use std::sync::Arc;

pub const CLAUDE_AGENT: &str = "claude";
pub const DEEPSEEK_AGENT: &str = "deepseek";

pub const CLAUDE_SYSTEM_PROMPT: &str = "You are Claude, participating in a three-way conversation with a human \
and another AI called DeepSeek. The human moderates the conversation and \
chooses who speaks. Be natural, engaged, and aware of the multi-party context. \
Reference previous messages from all participants when relevant.";

pub const DEEPSEEK_SYSTEM_PROMPT: &str = "You are DeepSeek, participating in a three-way conversation with a human \
and Claude (Anthropic AI). The human moderates and chooses who speaks. \
Bring your analytical and technical perspective. Reference the full conversation context.";

/// Everything needed to let one agent speak.
#[derive(Clone)]
pub struct AgentProfile {
    /// Routing tag, also the speaker tag of the agent's turns.
    pub name: String,
    /// Human-readable name returned to callers.
    pub display_name: String,
    pub system_prompt: String,
    pub client: Arc<dyn ClientWrapper>,
}

impl AgentProfile {
    pub fn new(
        name: impl Into<String>,
        display_name: impl Into<String>,
        system_prompt: impl Into<String>,
        client: Arc<dyn ClientWrapper>,
    ) -> Self {
        AgentProfile {
            name: name.into(),
            display_name: display_name.into(),
            system_prompt: system_prompt.into(),
            client,
        }
    }

    /// Claude on Anthropic's Messages API with the stock persona.
    pub fn claude(client: Arc<dyn ClientWrapper>) -> Self {
        Self::new(CLAUDE_AGENT, "Claude", CLAUDE_SYSTEM_PROMPT, client)
    }

    /// DeepSeek on its chat-completions API with the stock persona.
    pub fn deepseek(client: Arc<dyn ClientWrapper>) -> Self {
        Self::new(DEEPSEEK_AGENT, "DeepSeek", DEEPSEEK_SYSTEM_PROMPT, client)
    }
}

impl std::fmt::Debug for AgentProfile {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AgentProfile")
            .field("name", &self.name)
            .field("display_name", &self.display_name)
            .field("model", &self.client.model_name())
            .finish()
    }
}

/// Lookup table from agent name to [`AgentProfile`].
#[derive(Clone, Default)]
pub struct AgentRouter {
    agents: HashMap<String, AgentProfile>,
}

impl AgentRouter {
    pub fn new() -> Self {
        Self::default()
    }

    /// The two stock agents, `claude` and `deepseek`, wired from `config`.
    ///
    /// Agents are registered even without an API key; their calls then fail with
    /// [`BackendFailureKind::MissingCredentials`](crate::client_wrapper::BackendFailureKind::MissingCredentials).
    pub fn from_config(config: &TrialogueConfig) -> Self {
        let claude = ClaudeClient::new_with_base_url(
            config.anthropic_api_key.as_deref().unwrap_or_default(),
            &config.claude_model,
            &config.anthropic_base_url,
        );
        let deepseek = DeepSeekClient::new_with_base_url(
            config.deepseek_api_key.as_deref().unwrap_or_default(),
            &config.deepseek_model,
            &config.deepseek_base_url,
        );

        let mut router = Self::new();
        router.register(AgentProfile::claude(Arc::new(claude)));
        router.register(AgentProfile::deepseek(Arc::new(deepseek)));
        router
    }

    /// Add or replace the profile registered under `profile.name`.
    pub fn register(&mut self, profile: AgentProfile) {
        log::debug!(
            "AgentRouter::register(...): {} -> {}",
            profile.name,
            profile.client.model_name()
        );
        self.agents.insert(profile.name.clone(), profile);
    }

    /// Resolve `agent_name` by exact, case-sensitive match.
    pub fn route(&self, agent_name: &str) -> Result<&AgentProfile, OrchestratorError> {
        self.agents
            .get(agent_name)
            .ok_or_else(|| OrchestratorError::UnknownAgent(agent_name.to_string()))
    }

    pub fn contains(&self, agent_name: &str) -> bool {
        self.agents.contains_key(agent_name)
    }

    /// Registered agent names, sorted.
    pub fn names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.agents.keys().cloned().collect();
        names.sort();
        names
    }

    pub fn profiles(&self) -> impl Iterator<Item = &AgentProfile> {
        self.agents.values()
    }
}
