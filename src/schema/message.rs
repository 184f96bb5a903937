use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Who wrote a message in the log.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Author {
    Bot,
    User,
}

impl Author {
    /// CSS class used for the message bubble ("bot" / "user").
    pub fn css_class(&self) -> &'static str {
        match self {
            Self::Bot => "bot",
            Self::User => "user",
        }
    }
}

/// One entry in the conversation log.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Message {
    pub author: Author,
    pub text: String,
    pub timestamp: DateTime<Utc>,
}

impl Message {
    pub fn bot(text: impl Into<String>, timestamp: DateTime<Utc>) -> Self {
        Self {
            author: Author::Bot,
            text: text.into(),
            timestamp,
        }
    }

    pub fn user(text: impl Into<String>, timestamp: DateTime<Utc>) -> Self {
        Self {
            author: Author::User,
            text: text.into(),
            timestamp,
        }
    }
}
