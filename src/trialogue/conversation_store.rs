//! In-memory conversation store.
//!
//! Maps a conversation id to its ordered, append-only history. Conversations come into
//! existence on the first append and disappear on [`ConversationStore::delete`] or idle
//! eviction. Reading an unknown id is a normal event and yields an empty history.
//!
//! The store is an owned object shared through an `Arc`; it is safe to use from many tasks.
//! It does not serialize multi-step operations (read, call a backend, append): that is the
//! [`Orchestrator`](crate::Orchestrator)'s per-conversation lock.
//!
//! ```rust
//! use trialogue::conversation_store::ConversationStore;
//! use trialogue::message_record::MessageRecord;
//!
//! let store = ConversationStore::new();
//! store.append("c1", MessageRecord::human("Hi everyone!"));
//! store.append("c1", MessageRecord::agent("claude", "Hello!"));
//!
//! assert_eq!(store.get("c1").len(), 2);
//! assert!(store.get("unknown").is_empty());
//! assert_eq!(store.count(), 1);
//! ```

use crate::message_record::MessageRecord;
use dashmap::DashMap;
use std::time::{Duration, Instant};

struct Conversation {
    history: Vec<MessageRecord>,
    last_activity: Instant,
}

impl Conversation {
    fn new() -> Self {
        Conversation {
            history: Vec::new(),
            last_activity: Instant::now(),
        }
    }
}

/// Conversation id → ordered history.
#[derive(Default)]
pub struct ConversationStore {
    conversations: DashMap<String, Conversation>,
}

impl ConversationStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append `record` to the end of `conv_id`'s history, creating the conversation if needed.
    ///
    /// Timestamps never go backwards within a conversation: if the wall clock stepped back
    /// since the previous turn, the record is stored with the previous turn's timestamp.
    /// Returns the record as stored.
    pub fn append(&self, conv_id: &str, mut record: MessageRecord) -> MessageRecord {
        let mut conversation = self
            .conversations
            .entry(conv_id.to_string())
            .or_insert_with(Conversation::new);

        if let Some(last) = conversation.history.last() {
            if record.timestamp < last.timestamp {
                record.timestamp = last.timestamp;
            }
        }
        conversation.history.push(record.clone());
        conversation.last_activity = Instant::now();
        record
    }

    /// Ordered history of `conv_id`; empty when the id is unknown.
    pub fn get(&self, conv_id: &str) -> Vec<MessageRecord> {
        self.conversations
            .get(conv_id)
            .map(|conversation| conversation.history.clone())
            .unwrap_or_default()
    }

    /// Number of records in `conv_id`; zero when the id is unknown.
    pub fn history_len(&self, conv_id: &str) -> usize {
        self.conversations
            .get(conv_id)
            .map(|conversation| conversation.history.len())
            .unwrap_or(0)
    }

    /// Remove the conversation entirely. Deleting an unknown id is a no-op.
    ///
    /// Returns whether a conversation was removed.
    pub fn delete(&self, conv_id: &str) -> bool {
        self.conversations.remove(conv_id).is_some()
    }

    /// Replace the whole history of `conv_id`.
    pub fn replace(&self, conv_id: &str, history: Vec<MessageRecord>) {
        self.conversations.insert(
            conv_id.to_string(),
            Conversation {
                history,
                last_activity: Instant::now(),
            },
        );
    }

    /// Number of live conversations.
    pub fn count(&self) -> usize {
        self.conversations.len()
    }

    /// Ids of the live conversations, sorted.
    pub fn ids(&self) -> Vec<String> {
        let mut ids: Vec<String> = self
            .conversations
            .iter()
            .map(|entry| entry.key().clone())
            .collect();
        ids.sort();
        ids
    }

    /// Drop every conversation with no append or replace for at least `ttl`.
    ///
    /// Returns how many were evicted.
    pub fn evict_idle(&self, ttl: Duration) -> usize {
        let mut evicted = 0;
        self.conversations.retain(|conv_id, conversation| {
            let keep = conversation.last_activity.elapsed() < ttl;
            if !keep {
                log::debug!(
                    "ConversationStore::evict_idle(...): evicting idle conversation {}",
                    conv_id
                );
                evicted += 1;
            }
            keep
        });
        evicted
    }

    /// Ids of the conversations with no append or replace for at least `ttl`, sorted.
    pub fn idle_ids(&self, ttl: Duration) -> Vec<String> {
        let mut ids: Vec<String> = self
            .conversations
            .iter()
            .filter(|entry| entry.value().last_activity.elapsed() >= ttl)
            .map(|entry| entry.key().clone())
            .collect();
        ids.sort();
        ids
    }

    /// Remove `conv_id` if it is still idle for at least `ttl`.
    ///
    /// Returns whether it was removed.
    pub fn remove_if_idle(&self, conv_id: &str, ttl: Duration) -> bool {
        let removed = self
            .conversations
            .remove_if(conv_id, |_, conversation| {
                conversation.last_activity.elapsed() >= ttl
            })
            .is_some();
        if removed {
            log::debug!(
                "ConversationStore::remove_if_idle(...): evicting idle conversation {}",
                conv_id
            );
        }
        removed
    }
}
