//! Anthropic Claude client speaking the native Messages API.
//!
//! Unlike chat-completions providers, the Messages API takes the system prompt as a separate
//! `system` field and requires the conversation to start with a user turn and alternate roles.
//! [`ClaudeClient`] adapts the formatted multi-agent context to those rules before sending.
//!
//! # Example
//!
//! ```rust,no_run
//! use trialogue::client_wrapper::{ClientWrapper, Message, Role};
//! use trialogue::clients::claude::{ClaudeClient, Model};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let key = std::env::var("ANTHROPIC_API_KEY")?;
//!     let client = ClaudeClient::new_with_model_enum(&key, Model::ClaudeSonnet4);
//!     let reply = client
//!         .send_message(&[Message::new(Role::User, "Hi everyone!")], "You are terse.")
//!         .await?;
//!     println!("{}", reply.content);
//!     Ok(())
//! }
//! ```

use crate::client_wrapper::{
    BackendFailure, BackendFailureKind, ClientWrapper, Completion, Message, Role, TokenUsage,
};
use crate::clients::common::{endpoint_url, send_and_decode};
use crate::http_client_pool::get_or_create_client;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

/// Default Anthropic endpoint root.
pub const DEFAULT_BASE_URL: &str = "https://api.anthropic.com";
/// Messages API version header value.
pub const ANTHROPIC_VERSION: &str = "2023-06-01";
/// Reply budget for every call.
pub const DEFAULT_MAX_TOKENS: u32 = 4096;

/// Claude model tiers.
pub enum Model {
    /// `claude-sonnet-4-20250514` – balanced reasoning and throughput.
    ClaudeSonnet4,
    /// `claude-opus-4-20250514` – deepest reasoning tier.
    ClaudeOpus4,
    /// `claude-opus-4-1` – later Opus reasoning tier.
    ClaudeOpus41,
    /// `claude-sonnet-4-5` – newer Sonnet generation.
    ClaudeSonnet45,
    /// `claude-haiku-4-5` – fastest response tier.
    ClaudeHaiku45,
}

/// Convert a [`Model`] variant into its public string identifier.
pub fn model_to_string(model: Model) -> String {
    match model {
        Model::ClaudeSonnet4 => "claude-sonnet-4-20250514".to_string(),
        Model::ClaudeOpus4 => "claude-opus-4-20250514".to_string(),
        Model::ClaudeOpus41 => "claude-opus-4-1".to_string(),
        Model::ClaudeSonnet45 => "claude-sonnet-4-5".to_string(),
        Model::ClaudeHaiku45 => "claude-haiku-4-5".to_string(),
    }
}

/// Client wrapper for Anthropic's Messages API.
pub struct ClaudeClient {
    http: reqwest::Client,
    api_key: String,
    model: String,
    base_url: String,
    max_tokens: u32,
}

#[derive(Serialize)]
struct MessagesRequest<'a> {
    model: &'a str,
    max_tokens: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    system: Option<String>,
    messages: Vec<WireMessage>,
}

#[derive(Serialize, Debug, PartialEq)]
struct WireMessage {
    role: &'static str,
    content: String,
}

#[derive(Deserialize)]
struct MessagesResponse {
    #[serde(default)]
    content: Vec<ContentBlock>,
    usage: Option<WireUsage>,
}

#[derive(Deserialize)]
struct ContentBlock {
    #[serde(rename = "type")]
    kind: String,
    #[serde(default)]
    text: Option<String>,
}

#[derive(Deserialize)]
struct WireUsage {
    input_tokens: usize,
    output_tokens: usize,
}

impl ClaudeClient {
    /// Create a client from an API key and strongly typed model variant.
    pub fn new_with_model_enum(secret_key: &str, model: Model) -> Self {
        Self::new_with_model_str(secret_key, &model_to_string(model))
    }

    /// Create a client from an API key and explicit model string.
    pub fn new_with_model_str(secret_key: &str, model_name: &str) -> Self {
        Self::new_with_base_url(secret_key, model_name, DEFAULT_BASE_URL)
    }

    /// Create a client pointing at a custom Messages-API compatible base URL.
    pub fn new_with_base_url(secret_key: &str, model_name: &str, base_url: &str) -> Self {
        ClaudeClient {
            http: get_or_create_client(base_url),
            api_key: secret_key.to_string(),
            model: model_name.to_string(),
            base_url: base_url.to_string(),
            max_tokens: DEFAULT_MAX_TOKENS,
        }
    }

    /// Overrides the reply token budget.
    pub fn with_max_tokens(mut self, max_tokens: u32) -> Self {
        self.max_tokens = max_tokens;
        self
    }
}

/// Lay the context out the way the Messages API accepts it.
///
/// Everything before the first user message is sent as user-role (the API must open with a
/// user turn), consecutive same-role messages are merged with a blank line, and any
/// system-role entries are moved into the `system` field. A trailing assistant run is folded
/// into the preceding user turn: the API would otherwise treat it as a prefill and continue
/// that text instead of answering.
fn to_wire_messages(messages: &[Message], system_prompt: &str) -> (Option<String>, Vec<WireMessage>) {
    let mut system = system_prompt.to_string();
    let mut wire: Vec<WireMessage> = Vec::with_capacity(messages.len());
    let mut seen_user = false;

    for msg in messages {
        let role = match msg.role {
            Role::System => {
                if !system.is_empty() {
                    system.push_str("\n\n");
                }
                system.push_str(&msg.content);
                continue;
            }
            Role::User => {
                seen_user = true;
                Role::User
            }
            Role::Assistant if !seen_user => Role::User,
            Role::Assistant => Role::Assistant,
        };

        match wire.last_mut() {
            Some(last) if last.role == role.as_str() => {
                last.content.push_str("\n\n");
                last.content.push_str(&msg.content);
            }
            _ => wire.push(WireMessage {
                role: role.as_str(),
                content: msg.content.to_string(),
            }),
        }
    }

    if wire.last().map_or(false, |last| last.role == Role::Assistant.as_str()) {
        if let Some(trailing) = wire.pop() {
            match wire.last_mut() {
                Some(prev) => {
                    prev.content.push_str("\n\n");
                    prev.content.push_str(&trailing.content);
                }
                None => wire.push(WireMessage {
                    role: Role::User.as_str(),
                    content: trailing.content,
                }),
            }
        }
    }

    let system = if system.is_empty() { None } else { Some(system) };
    (system, wire)
}

#[async_trait]
impl ClientWrapper for ClaudeClient {
    async fn send_message(
        &self,
        messages: &[Message],
        system_prompt: &str,
    ) -> Result<Completion, BackendFailure> {
        if self.api_key.is_empty() {
            return Err(BackendFailure::missing_credentials(&self.model));
        }

        let (system, wire_messages) = to_wire_messages(messages, system_prompt);
        if wire_messages.is_empty() {
            return Err(BackendFailure::empty_input(&self.model));
        }

        let body = MessagesRequest {
            model: &self.model,
            max_tokens: self.max_tokens,
            system,
            messages: wire_messages,
        };

        log::debug!(
            "ClaudeClient::send_message(...): {} messages to {}",
            body.messages.len(),
            self.model
        );

        let request = self
            .http
            .post(endpoint_url(&self.base_url, "/v1/messages"))
            .header("x-api-key", &self.api_key)
            .header("anthropic-version", ANTHROPIC_VERSION)
            .json(&body);

        let response: MessagesResponse = send_and_decode(request, &self.model).await?;

        let text: Vec<String> = response
            .content
            .into_iter()
            .filter(|block| block.kind == "text")
            .filter_map(|block| block.text)
            .collect();
        if text.is_empty() {
            return Err(BackendFailure::new(
                &self.model,
                BackendFailureKind::MalformedResponse,
                "response carried no text content",
            ));
        }

        Ok(Completion {
            content: text.join(""),
            usage: response.usage.map(|u| TokenUsage {
                input_tokens: u.input_tokens,
                output_tokens: u.output_tokens,
                total_tokens: u.input_tokens + u.output_tokens,
            }),
        })
    }

    fn model_name(&self) -> &str {
        &self.model
    }

    fn has_credentials(&self) -> bool {
        !self.api_key.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn msg(role: Role, content: &str) -> Message {
        Message::new(role, content)
    }

    #[test]
    fn test_alternating_context_passes_through() {
        let (system, wire) = to_wire_messages(
            &[
                msg(Role::User, "Hi everyone!"),
                msg(Role::Assistant, "[DEEPSEEK]: Hello."),
                msg(Role::User, "Claude?"),
            ],
            "be brief",
        );
        assert_eq!(system.as_deref(), Some("be brief"));
        assert_eq!(wire.len(), 3);
        assert_eq!(wire[1].role, "assistant");
        assert_eq!(wire[1].content, "[DEEPSEEK]: Hello.");
    }

    #[test]
    fn test_consecutive_agent_turns_are_merged() {
        let (_, wire) = to_wire_messages(
            &[
                msg(Role::User, "Debate!"),
                msg(Role::Assistant, "[CLAUDE]: First."),
                msg(Role::Assistant, "[DEEPSEEK]: Second."),
                msg(Role::User, "Now agree on one answer."),
            ],
            "",
        );
        assert_eq!(wire.len(), 3);
        assert_eq!(wire[1].content, "[CLAUDE]: First.\n\n[DEEPSEEK]: Second.");
    }

    #[test]
    fn test_leading_agent_turn_becomes_user_role() {
        let (system, wire) = to_wire_messages(
            &[
                msg(Role::Assistant, "[DEEPSEEK]: I start."),
                msg(Role::User, "ok"),
            ],
            "",
        );
        assert!(system.is_none());
        assert_eq!(wire.len(), 1);
        assert_eq!(wire[0].role, "user");
        assert_eq!(wire[0].content, "[DEEPSEEK]: I start.\n\nok");
    }

    #[test]
    fn test_trailing_agent_turn_is_not_sent_as_prefill() {
        let (_, wire) = to_wire_messages(
            &[
                msg(Role::User, "Hi"),
                msg(Role::Assistant, "[CLAUDE]: Hello."),
                msg(Role::User, "DeepSeek?"),
                msg(Role::Assistant, "[DEEPSEEK]: I think X"),
            ],
            "",
        );
        assert_eq!(wire.len(), 3);
        assert_eq!(wire[1].role, "assistant");
        assert_eq!(wire[2].role, "user");
        assert_eq!(wire[2].content, "DeepSeek?\n\n[DEEPSEEK]: I think X");
    }

    #[test]
    fn test_model_strings() {
        assert_eq!(
            model_to_string(Model::ClaudeSonnet4),
            "claude-sonnet-4-20250514"
        );
        assert_eq!(model_to_string(Model::ClaudeHaiku45), "claude-haiku-4-5");
    }
}
