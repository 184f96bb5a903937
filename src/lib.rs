//! Support Chat — a localized, canned-response help widget engine.
//!
//! Drives the dashboard's support chat: a greeting, a menu of FAQ topics
//! rendered from per-language content tables, and a free-text path that
//! answers with a delayed canned reply. The engine is pure state
//! transitions; hosts (the WASM adapter, the preview CLI) own the session
//! state and render what each transition returns.

pub mod api;
pub mod core;
pub mod schema;
