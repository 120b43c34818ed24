//! Watcher identity and lifecycle states

use std::fmt;

use crate::session::ConversationId;

/// Identifies one watcher: form ids are only unique within a conversation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct WatchKey {
    pub conversation: ConversationId,
    pub form_id: usize,
}

impl WatchKey {
    pub fn new(conversation: ConversationId, form_id: usize) -> Self {
        Self {
            conversation,
            form_id,
        }
    }
}

impl fmt::Display for WatchKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}#{}", self.conversation, self.form_id)
    }
}

/// Why a watcher task returned
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WatchExit {
    /// Its own cancel signal fired (stop or replacement)
    Stopped,
    /// The process-wide shutdown signal fired
    Shutdown,
}

/// Outcome of comparing a fresh observation with the last known price
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PriceDiff {
    Unchanged,
    Changed { old: String, new: String },
}

impl PriceDiff {
    pub fn between(old: &str, new: &str) -> Self {
        if old == new {
            PriceDiff::Unchanged
        } else {
            PriceDiff::Changed {
                old: old.to_string(),
                new: new.to_string(),
            }
        }
    }

    pub fn is_change(&self) -> bool {
        matches!(self, PriceDiff::Changed { .. })
    }
}
