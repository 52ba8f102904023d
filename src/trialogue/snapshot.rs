//! Conversation snapshots.
//!
//! A [`ConversationSnapshot`] is the persisted form of one conversation: its id, the ordered
//! records with all four fields, and the time it was taken. Snapshots round-trip losslessly
//! through JSON and are validated before they may replace in-memory history. Timestamps are
//! written as RFC 3339; files whose timestamps carry no offset are still accepted and read as
//! UTC.
//!
//! [`SnapshotStore`] keeps one pretty-printed JSON file per conversation in a directory:
//!
//! ```text
//! conversations/
//!   ├─ default.json
//!   └─ team%2Fstandup.json      <- ids are percent-encoded into file names
//! ```
//!
//! ```json
//! {
//!   "conversation_id": "c1",
//!   "messages": [
//!     {"role": "user", "content": "Hi everyone!", "speaker": "human", "timestamp": "2025-07-01T12:00:00Z"},
//!     {"role": "assistant", "content": "Hello!", "speaker": "claude", "timestamp": "2025-07-01T12:00:03Z"}
//!   ],
//!   "saved_at": "2025-07-01T12:05:00Z"
//! }
//! ```

use crate::message_record::{deserialize_timestamp, MessageRecord};
use crate::orchestrator::OrchestratorError;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

/// Persisted form of a conversation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConversationSnapshot {
    pub conversation_id: String,
    pub messages: Vec<MessageRecord>,
    #[serde(deserialize_with = "deserialize_timestamp")]
    pub saved_at: DateTime<Utc>,
}

impl ConversationSnapshot {
    /// Snapshot `messages` as of now.
    pub fn new(conversation_id: impl Into<String>, messages: Vec<MessageRecord>) -> Self {
        ConversationSnapshot {
            conversation_id: conversation_id.into(),
            messages,
            saved_at: Utc::now(),
        }
    }

    /// Parse and validate a snapshot.
    pub fn from_json(json: &str) -> Result<Self, OrchestratorError> {
        let snapshot: ConversationSnapshot = serde_json::from_str(json)
            .map_err(|e| OrchestratorError::MalformedSnapshot(e.to_string()))?;
        snapshot.validate()?;
        Ok(snapshot)
    }

    pub fn to_json_pretty(&self) -> Result<String, OrchestratorError> {
        serde_json::to_string_pretty(self).map_err(|e| OrchestratorError::SnapshotIo(e.to_string()))
    }

    /// Structural checks beyond what the JSON shape enforces: a non-empty id and
    /// non-decreasing timestamps.
    pub fn validate(&self) -> Result<(), OrchestratorError> {
        if self.conversation_id.is_empty() {
            return Err(OrchestratorError::MalformedSnapshot(
                "conversation_id is empty".to_string(),
            ));
        }
        for (index, pair) in self.messages.windows(2).enumerate() {
            if pair[1].timestamp < pair[0].timestamp {
                return Err(OrchestratorError::MalformedSnapshot(format!(
                    "message {} is older than message {}",
                    index + 1,
                    index
                )));
            }
        }
        Ok(())
    }
}

/// Directory of snapshot files, one per conversation.
#[derive(Debug, Clone)]
pub struct SnapshotStore {
    dir: PathBuf,
}

impl SnapshotStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        SnapshotStore { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// File that holds `conv_id`'s snapshot.
    pub fn path_for(&self, conv_id: &str) -> PathBuf {
        self.dir
            .join(format!("{}.json", urlencoding::encode(conv_id)))
    }

    /// Write `snapshot`, replacing any previous file for the same conversation.
    pub fn save(&self, snapshot: &ConversationSnapshot) -> Result<PathBuf, OrchestratorError> {
        let json = snapshot.to_json_pretty()?;
        let path = self.path_for(&snapshot.conversation_id);
        let tmp_path = path.with_extension("json.tmp");

        fs::create_dir_all(&self.dir).map_err(io_error)?;
        fs::write(&tmp_path, json).map_err(io_error)?;
        fs::rename(&tmp_path, &path).map_err(io_error)?;

        log::info!(
            "SnapshotStore::save(...): conversation {} saved to {} ({} messages)",
            snapshot.conversation_id,
            path.display(),
            snapshot.messages.len()
        );
        Ok(path)
    }

    /// Read and validate `conv_id`'s snapshot.
    pub fn load(&self, conv_id: &str) -> Result<ConversationSnapshot, OrchestratorError> {
        Self::load_path(&self.path_for(conv_id))
    }

    /// Read and validate the snapshot at `path`.
    pub fn load_path(path: &Path) -> Result<ConversationSnapshot, OrchestratorError> {
        let json = fs::read_to_string(path).map_err(|e| {
            if e.kind() == io::ErrorKind::NotFound {
                OrchestratorError::SnapshotNotFound(path.display().to_string())
            } else {
                io_error(e)
            }
        })?;
        ConversationSnapshot::from_json(&json)
    }
}

fn io_error(err: io::Error) -> OrchestratorError {
    OrchestratorError::SnapshotIo(err.to_string())
}
