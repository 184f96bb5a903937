//! WASM bindings for support-chat — the browser side of the help widget.
//!
//! The page script owns the DOM; `SupportChat` owns the conversation. Every
//! call returns JSON describing what to render. Delayed replies are driven
//! by the page: when a result carries `delay_ms`, arm a `setTimeout` and
//! call `poll()` when it fires. `close()` and `dispose()` discard a pending
//! reply, so a timer firing afterwards renders nothing. Input is accepted
//! whether or not the widget is shown; a reply scheduled while hidden is
//! delivered by the next `poll()`.

use chrono::{FixedOffset, Offset, Utc};
use serde::Serialize;
use wasm_bindgen::prelude::*;

use support_chat::core::engine::{ActionButton, DialogueEngine, Turn};
use support_chat::core::render::render_message_html;
use support_chat::schema::conversation::ConversationState;

// ---------------------------------------------------------------------------
// JSON helper types for communication across the WASM boundary
// ---------------------------------------------------------------------------
#[derive(Serialize)]
struct TurnView<'a> {
    /// Rendered bubbles appended by this call, oldest first.
    appended: Vec<String>,
    actions: &'a [ActionButton],
    input_open: bool,
    /// Milliseconds until `poll()` should be called, if a reply is pending.
    delay_ms: Option<i64>,
    step: &'static str,
}

#[derive(Serialize)]
struct HeaderView<'a> {
    title: &'a str,
    subtitle: &'a str,
    placeholder: &'a str,
    locale: &'a str,
}

// ---------------------------------------------------------------------------
// SupportChat — the exported widget session
// ---------------------------------------------------------------------------
#[wasm_bindgen]
pub struct SupportChat {
    engine: DialogueEngine,
    state: ConversationState,
    offset: FixedOffset,
    open: bool,
    disposed: bool,
}

#[wasm_bindgen]
impl SupportChat {
    /// Mount a session. `utc_offset_minutes` is the viewer's offset east of
    /// UTC (i.e. `-new Date().getTimezoneOffset()`), used for time labels.
    #[wasm_bindgen(constructor)]
    pub fn new(locale: &str, utc_offset_minutes: i32) -> Result<SupportChat, JsError> {
        let engine = DialogueEngine::builder()
            .build()
            .map_err(|e| JsError::new(&format!("Engine build error: {e}")))?;
        Ok(SupportChat::with_engine(engine, locale, utc_offset_minutes))
    }

    /// Show the widget. Returns the whole log plus the menu for the
    /// current step; history is kept across close/open.
    pub fn open(&mut self) -> Result<String, JsError> {
        self.open = true;
        let turn = self.engine.resume(&self.state);
        self.view(&turn, 0)
    }

    /// Hide the widget and drop any pending reply.
    pub fn close(&mut self) -> bool {
        self.open = false;
        self.engine.cancel_pending(&mut self.state)
    }

    pub fn is_open(&self) -> bool {
        self.open
    }

    /// Handle a menu click.
    pub fn select_action(&mut self, action: &str) -> Result<String, JsError> {
        self.ensure_live()?;
        let before = self.state.messages().len();
        let turn = self
            .engine
            .select_action(&mut self.state, action)
            .map_err(|e| JsError::new(&format!("Action error: {e}")))?;
        self.view(&turn, before)
    }

    /// Handle the input box. Empty text yields an empty view.
    pub fn submit_text(&mut self, text: &str) -> Result<String, JsError> {
        self.ensure_live()?;
        let before = self.state.messages().len();
        let turn = self
            .engine
            .submit_free_text(&mut self.state, text)
            .map_err(|e| JsError::new(&format!("Input error: {e}")))?;
        self.view(&turn, before)
    }

    /// Deliver the pending reply if due. Returns `null` when there is
    /// nothing to render (not due, cancelled, or disposed).
    pub fn poll(&mut self) -> Result<Option<String>, JsError> {
        if self.disposed {
            return Ok(None);
        }
        let before = self.state.messages().len();
        match self.engine.deliver_due(&mut self.state) {
            Some(turn) => self.view(&turn, before).map(Some),
            None => Ok(None),
        }
    }

    /// Switch language. Returns `null` if the locale did not change;
    /// otherwise the page should clear the log and render the result.
    pub fn change_locale(&mut self, locale: &str) -> Result<Option<String>, JsError> {
        self.ensure_live()?;
        let turn = self.engine.change_locale(&mut self.state, locale);
        if turn.is_empty() {
            return Ok(None);
        }
        self.view(&turn, 0).map(Some)
    }

    /// Tear the session down. Further calls fail; pending replies are
    /// discarded.
    pub fn dispose(&mut self) {
        self.engine.cancel_pending(&mut self.state);
        self.open = false;
        self.disposed = true;
    }

    /// Header strings for the active locale as JSON.
    pub fn header(&self) -> Result<String, JsError> {
        let (title, subtitle) = self.engine.header(&self.state);
        let view = HeaderView {
            title,
            subtitle,
            placeholder: self.engine.placeholder(&self.state),
            locale: self.state.locale(),
        };
        serde_json::to_string(&view)
            .map_err(|e| JsError::new(&format!("Serialization error: {e}")))
    }

    /// The whole log as a JSON array of messages.
    pub fn messages(&self) -> Result<String, JsError> {
        serde_json::to_string(self.state.messages())
            .map_err(|e| JsError::new(&format!("Serialization error: {e}")))
    }

    /// JSON array of supported language codes.
    pub fn supported_locales(&self) -> String {
        let codes: Vec<&str> = self.engine.locales().codes().collect();
        serde_json::to_string(&codes).unwrap_or_else(|_| "[]".to_string())
    }
}

// Private helpers
impl SupportChat {
    fn with_engine(engine: DialogueEngine, locale: &str, utc_offset_minutes: i32) -> SupportChat {
        let offset = FixedOffset::east_opt(utc_offset_minutes.saturating_mul(60))
            .unwrap_or_else(|| Utc.fix());
        let (state, _) = engine.start(locale);

        SupportChat {
            engine,
            state,
            offset,
            open: false,
            disposed: false,
        }
    }

    fn ensure_live(&self) -> Result<(), JsError> {
        if self.disposed {
            Err(JsError::new("Support chat was disposed"))
        } else {
            Ok(())
        }
    }

    fn view(&self, turn: &Turn, from: usize) -> Result<String, JsError> {
        let appended = self.state.messages()[from.min(self.state.messages().len())..]
            .iter()
            .map(|m| render_message_html(m, &self.offset))
            .collect();
        let delay_ms = turn
            .scheduled
            .map(|p| (p.due_at - self.engine.now()).num_milliseconds().max(0));

        let view = TurnView {
            appended,
            actions: &turn.actions,
            input_open: turn.input_open,
            delay_ms,
            step: self.state.step().name(),
        };
        serde_json::to_string(&view)
            .map_err(|e| JsError::new(&format!("Serialization error: {e}")))
    }
}
