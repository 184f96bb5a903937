use rustc_hash::FxHashMap;
use serde::{Deserialize, Serialize};

/// Reserved action-id that opens the free-text input instead of a topic.
pub const CUSTOM_ACTION: &str = "custom";

/// A single FAQ subject: a title line and an HTML body.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TopicEntry {
    pub title: String,
    pub body: String,
}

/// All user-facing strings for one language.
///
/// Bot-side strings are authored HTML and are rendered verbatim; only
/// user input is escaped on the way into the message log.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LocaleContent {
    /// Widget header title.
    pub header: String,
    /// Sub-line under the header.
    #[serde(default)]
    pub subtitle: String,
    pub greeting: String,
    /// Placeholder for the free-text input.
    pub placeholder: String,
    /// Button label per action-id, including `custom`.
    pub labels: FxHashMap<String, String>,
    /// Topic entries keyed by topic id.
    pub knowledge: FxHashMap<String, TopicEntry>,
    /// Prompt shown when the user picks `custom`.
    pub custom_question: String,
    /// Canned reply to any free-text question.
    pub thank_you: String,
    /// Suffix appended to every topic reply.
    pub more_questions: String,
}

impl LocaleContent {
    /// Returns the topic entry for `action`, if this locale defines one.
    pub fn topic(&self, action: &str) -> Option<&TopicEntry> {
        self.knowledge.get(action)
    }

    /// Returns the button label for `action`, falling back to the raw id.
    pub fn label<'a>(&'a self, action: &'a str) -> &'a str {
        self.labels.get(action).map(String::as_str).unwrap_or(action)
    }
}
