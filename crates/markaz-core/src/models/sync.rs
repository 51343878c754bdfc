//! Sync outbox vocabulary.
//!
//! The durable record layout lives with the storage layer; only the
//! event kinds are shared vocabulary.

use serde::{Deserialize, Serialize};

/// The kind of mutation a sync record captures.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SyncEvent {
    Create,
    Update,
    Delete,
}

impl SyncEvent {
    pub fn as_str(&self) -> &'static str {
        match self {
            SyncEvent::Create => "create",
            SyncEvent::Update => "update",
            SyncEvent::Delete => "delete",
        }
    }
}
