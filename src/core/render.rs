/// Turn rendering — reply composition and message bubble markup.
use chrono::{DateTime, FixedOffset, Utc};

use crate::schema::locale::TopicEntry;
use crate::schema::message::{Author, Message};

/// Compose a topic answer: bold title, body, then the "more questions"
/// prompt.
pub fn topic_reply(entry: &TopicEntry, more_questions: &str) -> String {
    format!(
        "<strong>{}</strong>\n{}\n\n{}",
        entry.title.trim(),
        entry.body.trim(),
        more_questions.trim()
    )
}

/// Escape text for safe inclusion in HTML element content.
pub fn escape_html(input: &str) -> String {
    let mut out = String::with_capacity(input.len());
    for c in input.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(c),
        }
    }
    out
}

/// `HH:MM` in the viewer's offset.
pub fn time_label(timestamp: &DateTime<Utc>, offset: &FixedOffset) -> String {
    timestamp.with_timezone(offset).format("%H:%M").to_string()
}

/// Bubble markup for one message. Bot text is authored HTML and passes
/// through; user text is escaped.
pub fn render_message_html(message: &Message, offset: &FixedOffset) -> String {
    let body = match message.author {
        Author::Bot => message.text.trim().to_string(),
        Author::User => escape_html(&message.text),
    };
    format!(
        "<div class=\"chat-message {}\"><div class=\"message-bubble\">{}</div><div class=\"message-time\">{}</div></div>",
        message.author.css_class(),
        body,
        time_label(&message.timestamp, offset)
    )
}
