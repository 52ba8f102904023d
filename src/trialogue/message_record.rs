//! One turn of dialogue as it is kept in history.

use chrono::{DateTime, NaiveDateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};

/// Speaker tag of the human participant.
pub const HUMAN_SPEAKER: &str = "human";
/// Speaker tag of notices recorded under [`BackendFailurePolicy::SystemNotice`](crate::orchestrator::BackendFailurePolicy::SystemNotice).
pub const SYSTEM_SPEAKER: &str = "system";

/// Who produced a turn, in API terms.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum TurnRole {
    /// Written by the human participant.
    #[serde(rename = "user")]
    Human,
    /// Written by an agent.
    #[serde(rename = "assistant")]
    Agent,
    /// Orchestrator notice about a failed backend call. Never replayed to a model.
    #[serde(rename = "system")]
    Notice,
}

/// A single immutable entry of a conversation's history.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct MessageRecord {
    pub role: TurnRole,
    pub content: String,
    /// `"human"` or an agent name such as `"claude"`.
    pub speaker: String,
    /// Written as RFC 3339. Read with or without an offset; see [`parse_timestamp`].
    #[serde(deserialize_with = "deserialize_timestamp")]
    pub timestamp: DateTime<Utc>,
}

/// Parse an RFC 3339 timestamp, or an ISO 8601 local time without offset
/// (`2025-07-01T12:00:00.123456`), which is taken as UTC.
pub fn parse_timestamp(raw: &str) -> Result<DateTime<Utc>, String> {
    if let Ok(timestamp) = DateTime::parse_from_rfc3339(raw) {
        return Ok(timestamp.with_timezone(&Utc));
    }
    NaiveDateTime::parse_from_str(raw, "%Y-%m-%dT%H:%M:%S%.f")
        .map(|naive| naive.and_utc())
        .map_err(|err| format!("invalid timestamp {:?}: {}", raw, err))
}

pub(crate) fn deserialize_timestamp<'de, D>(deserializer: D) -> Result<DateTime<Utc>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = String::deserialize(deserializer)?;
    parse_timestamp(&raw).map_err(serde::de::Error::custom)
}

impl MessageRecord {
    /// A human turn stamped now.
    pub fn human(content: impl Into<String>) -> Self {
        Self::with_timestamp(TurnRole::Human, HUMAN_SPEAKER, content, Utc::now())
    }

    /// An agent turn stamped now.
    pub fn agent(speaker: impl Into<String>, content: impl Into<String>) -> Self {
        Self::with_timestamp(TurnRole::Agent, speaker, content, Utc::now())
    }

    /// A system notice stamped now.
    pub fn notice(content: impl Into<String>) -> Self {
        Self::with_timestamp(TurnRole::Notice, SYSTEM_SPEAKER, content, Utc::now())
    }

    pub fn with_timestamp(
        role: TurnRole,
        speaker: impl Into<String>,
        content: impl Into<String>,
        timestamp: DateTime<Utc>,
    ) -> Self {
        MessageRecord {
            role,
            content: content.into(),
            speaker: speaker.into(),
            timestamp,
        }
    }

    pub fn is_human(&self) -> bool {
        self.speaker == HUMAN_SPEAKER
    }

    pub fn is_notice(&self) -> bool {
        self.role == TurnRole::Notice
    }
}
