//! DeepSeek client speaking the OpenAI-compatible chat-completions API.
//!
//! The system prompt travels as the first entry of the `messages` array rather than as a
//! separate field, and the formatted context follows it unchanged.
//!
//! # Example
//!
//! ```rust,no_run
//! use trialogue::client_wrapper::{ClientWrapper, Message, Role};
//! use trialogue::clients::deepseek::{DeepSeekClient, Model};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let key = std::env::var("DEEPSEEK_API_KEY")?;
//!     let client = DeepSeekClient::new_with_model_enum(&key, Model::DeepSeekChat);
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

/// Default DeepSeek endpoint root.
pub const DEFAULT_BASE_URL: &str = "https://api.deepseek.com";

/// DeepSeek models.
pub enum Model {
    /// `deepseek-chat` – general chat model.
    DeepSeekChat,
    /// `deepseek-reasoner` – reasoning model.
    DeepSeekReasoner,
}

/// Convert a [`Model`] variant into the string identifier expected by the REST API.
pub fn model_to_string(model: Model) -> String {
    match model {
        Model::DeepSeekChat => "deepseek-chat".to_string(),
        Model::DeepSeekReasoner => "deepseek-reasoner".to_string(),
    }
}

/// Client wrapper for DeepSeek's chat-completions endpoint.
pub struct DeepSeekClient {
    http: reqwest::Client,
    api_key: String,
    model: String,
    base_url: String,
}

#[derive(Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage<'a>>,
    stream: bool,
}

#[derive(Serialize)]
struct ChatMessage<'a> {
    role: &'static str,
    content: &'a str,
}

#[derive(Deserialize)]
struct ChatResponse {
    #[serde(default)]
    choices: Vec<Choice>,
    usage: Option<WireUsage>,
}

#[derive(Deserialize)]
struct Choice {
    message: ChoiceMessage,
}

#[derive(Deserialize)]
struct ChoiceMessage {
    #[serde(default)]
    content: Option<String>,
}

#[derive(Deserialize)]
struct WireUsage {
    prompt_tokens: usize,
    completion_tokens: usize,
    total_tokens: usize,
}

impl DeepSeekClient {
    /// Construct a new client using the provided API key and [`Model`] variant.
    pub fn new_with_model_enum(secret_key: &str, model: Model) -> Self {
        Self::new_with_model_string(secret_key, &model_to_string(model))
    }

    /// Construct a new client using the provided API key and explicit model name.
    pub fn new_with_model_string(secret_key: &str, model_name: &str) -> Self {
        Self::new_with_base_url(secret_key, model_name, DEFAULT_BASE_URL)
    }

    /// Construct a client targeting a custom OpenAI compatible base URL.
    pub fn new_with_base_url(secret_key: &str, model_name: &str, base_url: &str) -> Self {
        DeepSeekClient {
            http: get_or_create_client(base_url),
            api_key: secret_key.to_string(),
            model: model_name.to_string(),
            base_url: base_url.to_string(),
        }
    }
}

#[async_trait]
impl ClientWrapper for DeepSeekClient {
    async fn send_message(
        &self,
        messages: &[Message],
        system_prompt: &str,
    ) -> Result<Completion, BackendFailure> {
        if self.api_key.is_empty() {
            return Err(BackendFailure::missing_credentials(&self.model));
        }
        if messages.is_empty() {
            return Err(BackendFailure::empty_input(&self.model));
        }

        let mut formatted_messages = Vec::with_capacity(messages.len() + 1);
        if !system_prompt.is_empty() {
            formatted_messages.push(ChatMessage {
                role: Role::System.as_str(),
                content: system_prompt,
            });
        }
        for msg in messages {
            formatted_messages.push(ChatMessage {
                role: msg.role.as_str(),
                content: &msg.content,
            });
        }

        log::debug!(
            "DeepSeekClient::send_message(...): {} messages to {}",
            formatted_messages.len(),
            self.model
        );

        let body = ChatRequest {
            model: &self.model,
            messages: formatted_messages,
            stream: false,
        };
        let request = self
            .http
            .post(endpoint_url(&self.base_url, "/chat/completions"))
            .bearer_auth(&self.api_key)
            .json(&body);

        let response: ChatResponse = send_and_decode(request, &self.model).await?;

        let content = response
            .choices
            .into_iter()
            .next()
            .and_then(|choice| choice.message.content)
            .ok_or_else(|| {
                BackendFailure::new(
                    &self.model,
                    BackendFailureKind::MalformedResponse,
                    "response carried no choices",
                )
            })?;

        Ok(Completion {
            content,
            usage: response.usage.map(|u| TokenUsage {
                input_tokens: u.prompt_tokens,
                output_tokens: u.completion_tokens,
                total_tokens: u.total_tokens,
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
