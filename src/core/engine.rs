/// The dialogue engine: state transitions for the support chat.
///
/// Every transition takes the session's `ConversationState` explicitly, so
/// the engine itself is immutable and can be shared by any number of
/// sessions. The host (DOM adapter, CLI) owns the state and renders the
/// returned `Turn`.
use chrono::{DateTime, TimeDelta, Utc};
use serde::Serialize;
use std::path::PathBuf;
use std::time::Duration;
use thiserror::Error;

use crate::core::clock::{Clock, SystemClock};
use crate::core::config::{ChatConfig, MenuItem, MAX_REPLY_DELAY_MS};
use crate::core::content::{ContentError, LocaleTable};
use crate::core::render;
use crate::schema::conversation::{ConversationState, ConversationStep, PendingReply};
use crate::schema::locale::{LocaleContent, CUSTOM_ACTION};
use crate::schema::message::{Author, Message};

#[derive(Debug, Error)]
pub enum DialogueError {
    #[error("action '{action}' is not defined for locale '{locale}'")]
    UnknownAction { locale: String, action: String },
    #[error("free text is not expected in step '{}'", .step.name())]
    InvalidState { step: ConversationStep },
}

#[derive(Debug, Error)]
pub enum EngineError {
    #[error("content error: {0}")]
    Content(#[from] ContentError),
    #[error("reply delay out of range: {0:?}")]
    DelayOutOfRange(Duration),
}

/// A menu button resolved against the active locale.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ActionButton {
    pub id: String,
    pub label: String,
    pub icon: String,
}

/// What the host should render after a transition.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Turn {
    /// Bot message appended by this transition, if any.
    pub reply: Option<String>,
    /// Menu to show. Empty means hide the menu.
    pub actions: Vec<ActionButton>,
    /// Whether the free-text input should be visible.
    pub input_open: bool,
    /// Set when a delayed reply was scheduled; the host arms a timer for
    /// `due_at` and then calls `deliver_due`.
    pub scheduled: Option<PendingReply>,
}

impl Turn {
    /// True for the no-op turn: nothing to render.
    pub fn is_empty(&self) -> bool {
        *self == Turn::default()
    }

    pub fn action_ids(&self) -> Vec<&str> {
        self.actions.iter().map(|a| a.id.as_str()).collect()
    }
}

/// The support dialogue engine. Built via `DialogueEngine::builder()`.
pub struct DialogueEngine {
    locales: LocaleTable,
    config: ChatConfig,
    /// Content of the default locale, used when a state names a locale
    /// this engine does not know.
    fallback: LocaleContent,
    reply_delay: TimeDelta,
    clock: Box<dyn Clock>,
}

/// Builder for constructing a `DialogueEngine`.
pub struct DialogueEngineBuilder {
    locales: Option<LocaleTable>,
    locales_dir: Option<PathBuf>,
    config: Option<ChatConfig>,
    config_path: Option<PathBuf>,
    default_locale: Option<String>,
    reply_delay: Option<Duration>,
    strict_free_text: Option<bool>,
    clock: Option<Box<dyn Clock>>,
}

impl DialogueEngine {
    pub fn builder() -> DialogueEngineBuilder {
        DialogueEngineBuilder {
            locales: None,
            locales_dir: None,
            config: None,
            config_path: None,
            default_locale: None,
            reply_delay: None,
            strict_free_text: None,
            clock: None,
        }
    }

    pub fn config(&self) -> &ChatConfig {
        &self.config
    }

    pub fn locales(&self) -> &LocaleTable {
        &self.locales
    }

    pub fn default_locale(&self) -> &str {
        &self.config.default_locale
    }

    /// Map a requested language code onto the table, falling back to the
    /// default locale.
    pub fn resolve_locale(&self, requested: &str) -> String {
        match self.locales.lookup_code(requested) {
            Some(code) => code.to_string(),
            None => {
                tracing::warn!(
                    requested,
                    fallback = %self.config.default_locale,
                    "unsupported locale, using default"
                );
                self.config.default_locale.clone()
            }
        }
    }

    /// Begin a session: greeting message plus the greeting menu.
    pub fn start(&self, locale: &str) -> (ConversationState, Turn) {
        let mut state = ConversationState::new(self.resolve_locale(locale));
        let turn = self.greet(&mut state);
        tracing::debug!(locale = %state.locale, "conversation started");
        (state, turn)
    }

    /// Handle a menu click.
    pub fn select_action(
        &self,
        state: &mut ConversationState,
        action: &str,
    ) -> Result<Turn, DialogueError> {
        let content = self.content(&state.locale);

        if action == CUSTOM_ACTION {
            let now = self.clock.now();
            self.drop_pending(state);
            state.push(Message::user(content.label(action), now));
            state.push(Message::bot(content.custom_question.trim(), now));
            state.step = ConversationStep::AwaitingFreeText;
            tracing::debug!(locale = %state.locale, "free-text input opened");

            return Ok(Turn {
                reply: Some(content.custom_question.trim().to_string()),
                actions: Vec::new(),
                input_open: true,
                scheduled: None,
            });
        }

        let entry = content
            .topic(action)
            .ok_or_else(|| DialogueError::UnknownAction {
                locale: state.locale.clone(),
                action: action.to_string(),
            })?;

        let now = self.clock.now();
        let reply = render::topic_reply(entry, &content.more_questions);
        self.drop_pending(state);
        state.push(Message::user(content.label(action), now));
        state.push(Message::bot(reply.clone(), now));
        state.step = ConversationStep::Topic;
        tracing::debug!(locale = %state.locale, topic = action, "topic answered");

        Ok(Turn {
            reply: Some(reply),
            actions: self.menu(content, &self.config.menus.topic),
            input_open: false,
            scheduled: None,
        })
    }

    /// Handle a free-text submission. The user message is logged at once;
    /// the canned answer is scheduled and appended by `deliver_due`.
    pub fn submit_free_text(
        &self,
        state: &mut ConversationState,
        text: &str,
    ) -> Result<Turn, DialogueError> {
        let text = text.trim();
        if text.is_empty() {
            return Ok(Turn::default());
        }

        if state.step != ConversationStep::AwaitingFreeText {
            if self.config.strict_free_text {
                return Err(DialogueError::InvalidState { step: state.step });
            }
            tracing::debug!(step = state.step.name(), "accepting free text outside input step");
        }

        let now = self.clock.now();
        state.push(Message::user(text, now));
        state.step = ConversationStep::AwaitingFreeText;
        let due_at = now
            .checked_add_signed(self.reply_delay)
            .unwrap_or(DateTime::<Utc>::MAX_UTC);
        let pending = state.schedule(due_at);
        tracing::debug!(reply_id = pending.id, due_at = %pending.due_at, "reply scheduled");

        Ok(Turn {
            reply: None,
            actions: Vec::new(),
            input_open: true,
            scheduled: Some(pending),
        })
    }

    /// Append the scheduled reply if its time has come. Returns `None` when
    /// nothing is pending or it is not yet due.
    pub fn deliver_due(&self, state: &mut ConversationState) -> Option<Turn> {
        let pending = state.pending?;
        let now = self.clock.now();
        if now < pending.due_at {
            return None;
        }

        state.pending = None;
        let content = self.content(&state.locale);
        let reply = content.thank_you.trim().to_string();
        state.push(Message::bot(reply.clone(), now));
        tracing::debug!(reply_id = pending.id, "scheduled reply delivered");

        Some(Turn {
            reply: Some(reply),
            actions: self.menu(content, &self.config.menus.follow_up),
            input_open: false,
            scheduled: None,
        })
    }

    /// Discard a scheduled reply, e.g. when the widget closes. Returns
    /// whether anything was pending.
    pub fn cancel_pending(&self, state: &mut ConversationState) -> bool {
        self.drop_pending(state).is_some()
    }

    /// Switch language. Same locale is a no-op; otherwise the session
    /// restarts from the greeting in the new language.
    pub fn change_locale(&self, state: &mut ConversationState, locale: &str) -> Turn {
        let code = self.resolve_locale(locale);
        if code == state.locale {
            return Turn::default();
        }

        tracing::debug!(from = %state.locale, to = %code, "locale changed");
        let (fresh, turn) = self.start(&code);
        *state = fresh;
        turn
    }

    /// The menu and input visibility for the current step, without
    /// appending anything. Used when a closed widget is reopened.
    pub fn resume(&self, state: &ConversationState) -> Turn {
        let content = self.content(&state.locale);
        let menus = &self.config.menus;

        match state.step {
            ConversationStep::Greeting => Turn {
                actions: self.menu(content, &menus.greeting),
                ..Turn::default()
            },
            ConversationStep::Topic => Turn {
                actions: self.menu(content, &menus.topic),
                ..Turn::default()
            },
            ConversationStep::AwaitingFreeText => {
                let answered = state.pending.is_none()
                    && state
                        .last_message()
                        .is_some_and(|m| m.author == Author::Bot && m.text == content.thank_you.trim());
                if answered {
                    Turn {
                        actions: self.menu(content, &menus.follow_up),
                        ..Turn::default()
                    }
                } else {
                    Turn {
                        input_open: true,
                        scheduled: state.pending,
                        ..Turn::default()
                    }
                }
            }
        }
    }

    /// Header title and subtitle for the active locale.
    pub fn header<'a>(&'a self, state: &ConversationState) -> (&'a str, &'a str) {
        let content = self.content(&state.locale);
        (&content.header, &content.subtitle)
    }

    pub fn placeholder<'a>(&'a self, state: &ConversationState) -> &'a str {
        &self.content(&state.locale).placeholder
    }

    /// Time at which the current pending reply becomes due, if any.
    pub fn pending_due(&self, state: &ConversationState) -> Option<DateTime<Utc>> {
        state.pending.map(|p| p.due_at)
    }

    pub fn now(&self) -> DateTime<Utc> {
        self.clock.now()
    }

    fn greet(&self, state: &mut ConversationState) -> Turn {
        let content = self.content(&state.locale);
        let greeting = content.greeting.trim().to_string();
        state.push(Message::bot(greeting.clone(), self.clock.now()));
        state.step = ConversationStep::Greeting;

        Turn {
            reply: Some(greeting),
            actions: self.menu(content, &self.config.menus.greeting),
            input_open: false,
            scheduled: None,
        }
    }

    fn content(&self, code: &str) -> &LocaleContent {
        self.locales.get(code).unwrap_or(&self.fallback)
    }

    fn menu(&self, content: &LocaleContent, items: &[MenuItem]) -> Vec<ActionButton> {
        items
            .iter()
            .map(|item| ActionButton {
                id: item.action.clone(),
                label: content.label(&item.action).to_string(),
                icon: item.icon.clone(),
            })
            .collect()
    }

    fn drop_pending(&self, state: &mut ConversationState) -> Option<PendingReply> {
        let dropped = state.pending.take();
        if let Some(reply) = dropped {
            tracing::debug!(reply_id = reply.id, "pending reply cancelled");
        }
        dropped
    }
}

impl DialogueEngineBuilder {
    /// Provide locales directly instead of the built-in table.
    pub fn with_locales(mut self, locales: LocaleTable) -> Self {
        self.locales = Some(locales);
        self
    }

    /// Load every `*.ron` file in `path` on top of the base table.
    pub fn locales_dir(mut self, path: impl Into<PathBuf>) -> Self {
        self.locales_dir = Some(path.into());
        self
    }

    pub fn with_config(mut self, config: ChatConfig) -> Self {
        self.config = Some(config);
        self
    }

    /// Read the config from a RON file (ignored if `with_config` is used).
    pub fn config_file(mut self, path: impl Into<PathBuf>) -> Self {
        self.config_path = Some(path.into());
        self
    }

    pub fn default_locale(mut self, code: &str) -> Self {
        self.default_locale = Some(code.to_string());
        self
    }

    pub fn reply_delay(mut self, delay: Duration) -> Self {
        self.reply_delay = Some(delay);
        self
    }

    pub fn strict_free_text(mut self, strict: bool) -> Self {
        self.strict_free_text = Some(strict);
        self
    }

    pub fn with_clock(mut self, clock: Box<dyn Clock>) -> Self {
        self.clock = Some(clock);
        self
    }

    pub fn build(self) -> Result<DialogueEngine, EngineError> {
        let mut config = match (self.config, self.config_path) {
            (Some(config), _) => config,
            (None, Some(path)) => ChatConfig::load_from_ron(&path)?,
            (None, None) => ChatConfig::default(),
        };
        if let Some(code) = self.default_locale {
            config.default_locale = code;
        }
        if let Some(delay) = self.reply_delay {
            config.reply_delay_ms = u64::try_from(delay.as_millis())
                .map_err(|_| EngineError::DelayOutOfRange(delay))?;
        }
        if let Some(strict) = self.strict_free_text {
            config.strict_free_text = strict;
        }
        config.default_locale = config.default_locale.trim().to_ascii_lowercase();

        let mut locales = match self.locales {
            Some(table) => table,
            None => LocaleTable::builtin()?,
        };
        if let Some(ref dir) = self.locales_dir {
            locales.load_dir(dir)?;
        }

        locales.validate(&config.menus, &config.default_locale)?;
        let fallback = locales
            .get(&config.default_locale)
            .cloned()
            .ok_or_else(|| ContentError::MissingDefaultLocale(config.default_locale.clone()))?;

        let delay = config.reply_delay();
        if config.reply_delay_ms > MAX_REPLY_DELAY_MS {
            return Err(EngineError::DelayOutOfRange(delay));
        }
        let reply_delay =
            TimeDelta::from_std(delay).map_err(|_| EngineError::DelayOutOfRange(delay))?;

        tracing::info!(
            locales = locales.len(),
            default_locale = %config.default_locale,
            reply_delay_ms = config.reply_delay_ms,
            "dialogue engine ready"
        );

        Ok(DialogueEngine {
            locales,
            config,
            fallback,
            reply_delay,
            clock: self.clock.unwrap_or_else(|| Box::new(SystemClock)),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::clock::ManualClock;
    use chrono::TimeZone;

    fn engine_with_clock() -> (DialogueEngine, ManualClock) {
        let clock = ManualClock::new(Utc.with_ymd_and_hms(2024, 9, 2, 10, 0, 0).unwrap());
        let engine = DialogueEngine::builder()
            .with_clock(Box::new(clock.clone()))
            .build()
            .unwrap();
        (engine, clock)
    }

    #[test]
    fn start_appends_greeting() {
        let (engine, _) = engine_with_clock();
        let (state, turn) = engine.start("en");
        assert_eq!(state.step(), ConversationStep::Greeting);
        assert_eq!(state.messages().len(), 1);
        assert_eq!(state.messages()[0].author, Author::Bot);
        assert_eq!(turn.reply.as_deref(), Some(state.messages()[0].text.as_str()));
        assert_eq!(
            turn.action_ids(),
            vec!["pricing", "features", "setup", "trial", "contact", "custom"]
        );
    }

    #[test]
    fn unknown_locale_uses_default() {
        let (engine, _) = engine_with_clock();
        let (state, _) = engine.start("xx");
        assert_eq!(state.locale(), "uz");
    }

    #[test]
    fn topic_appends_user_label_then_reply() {
        let (engine, _) = engine_with_clock();
        let (mut state, _) = engine.start("en");
        let turn = engine.select_action(&mut state, "trial").unwrap();

        assert_eq!(state.step(), ConversationStep::Topic);
        assert_eq!(state.messages().len(), 3);
        assert_eq!(state.messages()[1].author, Author::User);
        assert_eq!(state.messages()[1].text, "Free trial");
        assert_eq!(state.messages()[2].author, Author::Bot);
        assert!(turn.reply.unwrap().starts_with("<strong>"));
        assert_eq!(turn.actions.len(), 5);
        assert!(!turn.input_open);
    }

    #[test]
    fn custom_opens_input() {
        let (engine, _) = engine_with_clock();
        let (mut state, _) = engine.start("en");
        let turn = engine.select_action(&mut state, "custom").unwrap();
        assert_eq!(state.step(), ConversationStep::AwaitingFreeText);
        assert!(turn.actions.is_empty());
        assert!(turn.input_open);
        assert_eq!(state.messages().len(), 3);
    }

    #[test]
    fn unknown_action_leaves_state_alone() {
        let (engine, _) = engine_with_clock();
        let (mut state, _) = engine.start("ru");
        let err = engine.select_action(&mut state, "refunds").unwrap_err();
        assert!(matches!(
            err,
            DialogueError::UnknownAction { ref locale, ref action } if locale == "ru" && action == "refunds"
        ));
        assert_eq!(state.messages().len(), 1);
        assert_eq!(state.step(), ConversationStep::Greeting);
    }

    #[test]
    fn reply_waits_for_delay() {
        let (engine, clock) = engine_with_clock();
        let (mut state, _) = engine.start("en");
        engine.select_action(&mut state, "custom").unwrap();

        let turn = engine.submit_free_text(&mut state, "  hello  ").unwrap();
        let scheduled = turn.scheduled.unwrap();
        assert_eq!(scheduled.due_at, engine.now() + TimeDelta::milliseconds(1000));
        assert_eq!(state.last_message().unwrap().text, "hello");

        clock.advance(TimeDelta::milliseconds(999));
        assert!(engine.deliver_due(&mut state).is_none());

        clock.advance(TimeDelta::milliseconds(1));
        let delivered = engine.deliver_due(&mut state).unwrap();
        assert_eq!(delivered.action_ids(), vec!["pricing", "features", "contact"]);
        assert!(state.pending().is_none());
        assert!(engine.deliver_due(&mut state).is_none());
    }

    #[test]
    fn second_submission_replaces_pending() {
        let (engine, clock) = engine_with_clock();
        let (mut state, _) = engine.start("en");
        engine.select_action(&mut state, "custom").unwrap();
        let first = engine.submit_free_text(&mut state, "one").unwrap().scheduled.unwrap();
        clock.advance(TimeDelta::milliseconds(500));
        let second = engine.submit_free_text(&mut state, "two").unwrap().scheduled.unwrap();
        assert!(second.id > first.id);
        assert_eq!(state.pending(), Some(&second));

        clock.advance(TimeDelta::milliseconds(600));
        assert!(engine.deliver_due(&mut state).is_none());
        clock.advance(TimeDelta::milliseconds(400));
        assert!(engine.deliver_due(&mut state).is_some());
        let bot_replies = state
            .messages()
            .iter()
            .filter(|m| m.author == Author::Bot)
            .count();
        // greeting, custom prompt, one thank-you
        assert_eq!(bot_replies, 3);
    }

    #[test]
    fn strict_mode_rejects_free_text_outside_input_step() {
        let engine = DialogueEngine::builder()
            .strict_free_text(true)
            .build()
            .unwrap();
        let (mut state, _) = engine.start("en");
        let err = engine.submit_free_text(&mut state, "hi").unwrap_err();
        assert!(matches!(
            err,
            DialogueError::InvalidState {
                step: ConversationStep::Greeting
            }
        ));
        assert_eq!(state.messages().len(), 1);
    }

    #[test]
    fn lenient_mode_accepts_free_text_anywhere() {
        let (engine, _) = engine_with_clock();
        let (mut state, _) = engine.start("en");
        let turn = engine.submit_free_text(&mut state, "hi").unwrap();
        assert!(turn.scheduled.is_some());
        assert_eq!(state.step(), ConversationStep::AwaitingFreeText);
    }

    #[test]
    fn selecting_action_cancels_pending_reply() {
        let (engine, clock) = engine_with_clock();
        let (mut state, _) = engine.start("en");
        engine.select_action(&mut state, "custom").unwrap();
        engine.submit_free_text(&mut state, "question").unwrap();
        engine.select_action(&mut state, "pricing").unwrap();
        clock.advance(TimeDelta::seconds(5));
        assert!(engine.deliver_due(&mut state).is_none());
    }

    #[test]
    fn resume_reflects_step() {
        let (engine, clock) = engine_with_clock();
        let (mut state, _) = engine.start("en");
        assert_eq!(engine.resume(&state).actions.len(), 6);

        engine.select_action(&mut state, "features").unwrap();
        assert_eq!(engine.resume(&state).actions.len(), 5);

        engine.select_action(&mut state, "custom").unwrap();
        assert!(engine.resume(&state).input_open);

        engine.submit_free_text(&mut state, "hi").unwrap();
        assert!(engine.resume(&state).scheduled.is_some());

        clock.advance(TimeDelta::seconds(1));
        engine.deliver_due(&mut state).unwrap();
        let resumed = engine.resume(&state);
        assert_eq!(resumed.action_ids(), vec!["pricing", "features", "contact"]);
        assert!(resumed.reply.is_none());
    }

    #[test]
    fn state_from_unknown_locale_renders_with_fallback() {
        let (engine, _) = engine_with_clock();
        let state = ConversationState::new("de".to_string());
        let (header, _) = engine.header(&state);
        assert_eq!(header, engine.locales().get("uz").unwrap().header);
    }

    #[test]
    fn builder_overrides_config() {
        let engine = DialogueEngine::builder()
            .default_locale("EN")
            .reply_delay(Duration::from_millis(20))
            .build()
            .unwrap();
        assert_eq!(engine.default_locale(), "en");
        assert_eq!(engine.config().reply_delay_ms, 20);
    }

    #[test]
    fn builder_rejects_huge_reply_delay() {
        let result = DialogueEngine::builder()
            .reply_delay(Duration::from_millis(10_000_000_000_000_000))
            .build();
        assert!(matches!(result, Err(EngineError::DelayOutOfRange(_))));

        let config = ChatConfig {
            reply_delay_ms: MAX_REPLY_DELAY_MS + 1,
            ..ChatConfig::default()
        };
        let result = DialogueEngine::builder().with_config(config).build();
        assert!(matches!(result, Err(EngineError::DelayOutOfRange(_))));
    }

    #[test]
    fn longest_allowed_delay_schedules_without_overflow() {
        let (clock, start) = {
            let start = Utc.with_ymd_and_hms(2024, 9, 2, 10, 0, 0).unwrap();
            (ManualClock::new(start), start)
        };
        let engine = DialogueEngine::builder()
            .reply_delay(Duration::from_millis(MAX_REPLY_DELAY_MS))
            .with_clock(Box::new(clock.clone()))
            .build()
            .unwrap();
        let (mut state, _) = engine.start("en");
        let turn = engine.submit_free_text(&mut state, "hi").unwrap();
        assert_eq!(turn.scheduled.unwrap().due_at, start + TimeDelta::hours(1));

        clock.set(DateTime::<Utc>::MAX_UTC - TimeDelta::minutes(1));
        let turn = engine.submit_free_text(&mut state, "again").unwrap();
        assert_eq!(turn.scheduled.unwrap().due_at, DateTime::<Utc>::MAX_UTC);
    }

    #[test]
    fn build_fails_on_incomplete_content() {
        let mut table = LocaleTable::builtin().unwrap();
        let mut en = table.get("en").unwrap().clone();
        en.knowledge.remove("setup");
        table.insert("en", en);

        let result = DialogueEngine::builder().with_locales(table).build();
        assert!(matches!(
            result,
            Err(EngineError::Content(ContentError::Validation(_)))
        ));
    }

    #[test]
    fn turn_serializes_for_hosts() {
        let (engine, _) = engine_with_clock();
        let (_, turn) = engine.start("en");
        let json = serde_json::to_value(&turn).unwrap();
        assert_eq!(json["actions"][0]["id"], "pricing");
        assert_eq!(json["actions"][0]["icon"], "fas fa-tags");
        assert_eq!(json["input_open"], false);
    }
}
