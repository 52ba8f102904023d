//! The backend seam.
//!
//! A [`ClientWrapper`] is a wrapper around one LLM provider. It performs exactly one remote
//! call per [`ClientWrapper::send_message`] and does not keep track of the conversation; the
//! [`Orchestrator`](crate::Orchestrator) owns history and hands each call an already formatted
//! context plus the agent's system prompt.
//!
//! Every failure a provider call can produce is folded into a [`BackendFailure`], so callers
//! never have to deal with transport-specific error types.

use async_trait::async_trait;
use std::error::Error;
use std::fmt;
use std::sync::Arc;

/// Represents the possible roles for a message on the wire.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Role {
    /// Steers the model's responses. Adapters decide how (and whether) to send it.
    System,
    /// A message written by the human participant.
    User,
    /// A message written by one of the agents, including agents other than the callee.
    Assistant,
}

impl Role {
    /// Role string used by both provider APIs.
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::System => "system",
            Role::User => "user",
            Role::Assistant => "assistant",
        }
    }
}

/// How many tokens were spent on prompt vs. completion.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TokenUsage {
    pub input_tokens: usize,
    pub output_tokens: usize,
    pub total_tokens: usize,
}

/// A role/content pair as consumed by a backend.
#[derive(Clone, Debug, PartialEq)]
pub struct Message {
    /// The role associated with the message.
    pub role: Role,
    /// The actual content of the message.
    pub content: Arc<str>,
}

impl Message {
    pub fn new(role: Role, content: impl Into<Arc<str>>) -> Self {
        Message {
            role,
            content: content.into(),
        }
    }
}

/// A successful provider reply.
#[derive(Clone, Debug, PartialEq)]
pub struct Completion {
    /// Plain text of the reply.
    pub content: String,
    /// Token accounting, when the provider reports it.
    pub usage: Option<TokenUsage>,
}

/// Classification of a failed backend call.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum BackendFailureKind {
    /// The formatted context was empty, nothing to send.
    EmptyInput,
    /// No API key is configured for the provider.
    MissingCredentials,
    /// Connection, DNS, TLS or body transfer failure.
    Transport,
    /// The provider rejected the credentials (HTTP 401/403).
    Authentication,
    /// Any other non-success HTTP status.
    Provider { status: u16 },
    /// The body could not be decoded or carried no text.
    MalformedResponse,
    /// The call did not finish within the configured backend timeout.
    Timeout,
}

impl fmt::Display for BackendFailureKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BackendFailureKind::EmptyInput => write!(f, "empty input"),
            BackendFailureKind::MissingCredentials => write!(f, "missing credentials"),
            BackendFailureKind::Transport => write!(f, "transport error"),
            BackendFailureKind::Authentication => write!(f, "authentication failed"),
            BackendFailureKind::Provider { status } => write!(f, "provider error (HTTP {})", status),
            BackendFailureKind::MalformedResponse => write!(f, "malformed response"),
            BackendFailureKind::Timeout => write!(f, "timed out"),
        }
    }
}

/// A failed backend call.
///
/// This is a value, not a propagated error: the orchestrator records it according to its
/// [`BackendFailurePolicy`](crate::orchestrator::BackendFailurePolicy) and reports it back to
/// the caller alongside the turn.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct BackendFailure {
    /// Model (or agent) that failed.
    pub backend: String,
    pub kind: BackendFailureKind,
    /// Provider or transport detail.
    pub message: String,
}

impl BackendFailure {
    pub fn new(
        backend: impl Into<String>,
        kind: BackendFailureKind,
        message: impl Into<String>,
    ) -> Self {
        BackendFailure {
            backend: backend.into(),
            kind,
            message: message.into(),
        }
    }

    pub fn empty_input(backend: &str) -> Self {
        Self::new(backend, BackendFailureKind::EmptyInput, "no messages to send")
    }

    pub fn missing_credentials(backend: &str) -> Self {
        Self::new(
            backend,
            BackendFailureKind::MissingCredentials,
            "API key is not configured",
        )
    }

    /// Map an HTTP error status to the matching failure kind.
    pub fn from_status(backend: &str, status: u16, body: impl Into<String>) -> Self {
        let kind = match status {
            401 | 403 => BackendFailureKind::Authentication,
            _ => BackendFailureKind::Provider { status },
        };
        Self::new(backend, kind, body)
    }
}

impl fmt::Display for BackendFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.message.is_empty() {
            write!(f, "{}: {}", self.backend, self.kind)
        } else {
            write!(f, "{}: {}: {}", self.backend, self.kind, self.message)
        }
    }
}

impl Error for BackendFailure {}

/// Trait defining the interface to interact with an LLM provider.
#[async_trait]
pub trait ClientWrapper: Send + Sync {
    /// Send the formatted context and the system prompt, get the reply text back.
    ///
    /// Implementations must not retry and must report every failure as a [`BackendFailure`].
    /// An empty `messages` slice fails with [`BackendFailureKind::EmptyInput`] without any
    /// network traffic.
    async fn send_message(
        &self,
        messages: &[Message],
        system_prompt: &str,
    ) -> Result<Completion, BackendFailure>;

    /// Model identifier sent with every request.
    fn model_name(&self) -> &str;

    /// Whether a credential is configured. Default impl assumes one is.
    fn has_credentials(&self) -> bool {
        true
    }
}
