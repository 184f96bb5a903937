use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::message::Message;

/// Phase of the support dialogue.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ConversationStep {
    /// Greeting shown, full menu offered.
    Greeting,
    /// A topic answer was shown.
    Topic,
    /// The free-text input is open.
    AwaitingFreeText,
}

impl ConversationStep {
    pub fn name(&self) -> &'static str {
        match self {
            Self::Greeting => "greeting",
            Self::Topic => "topic",
            Self::AwaitingFreeText => "awaiting_free_text",
        }
    }
}

/// A canned reply scheduled after a free-text submission.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PendingReply {
    /// Monotonic per session; lets a host timer tell stale firings apart.
    pub id: u64,
    pub due_at: DateTime<Utc>,
}

/// Session-scoped dialogue state. Owned by whoever hosts the widget and
/// passed to `DialogueEngine` for every transition.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConversationState {
    pub(crate) step: ConversationStep,
    pub(crate) locale: String,
    pub(crate) log: Vec<Message>,
    pub(crate) pending: Option<PendingReply>,
    pub(crate) next_reply_id: u64,
}

impl ConversationState {
    pub(crate) fn new(locale: String) -> Self {
        Self {
            step: ConversationStep::Greeting,
            locale,
            log: Vec::new(),
            pending: None,
            next_reply_id: 0,
        }
    }

    pub fn step(&self) -> ConversationStep {
        self.step
    }

    /// Language code of the active content table.
    pub fn locale(&self) -> &str {
        &self.locale
    }

    /// The message log, oldest first.
    pub fn messages(&self) -> &[Message] {
        &self.log
    }

    pub fn last_message(&self) -> Option<&Message> {
        self.log.last()
    }

    pub fn pending(&self) -> Option<&PendingReply> {
        self.pending.as_ref()
    }

    pub(crate) fn push(&mut self, message: Message) {
        self.log.push(message);
    }

    pub(crate) fn schedule(&mut self, due_at: DateTime<Utc>) -> PendingReply {
        self.next_reply_id += 1;
        let reply = PendingReply {
            id: self.next_reply_id,
            due_at,
        };
        self.pending = Some(reply);
        reply
    }
}
