//! Terminal chat client for Google Gemini.
//!
//! The [`conversation`] controller owns the message log and the send/reply
//! state machine; [`formatter`] turns model replies into a render tree that
//! [`ui::render`] draws.

pub mod app;
pub mod attachment;
pub mod config;
pub mod conversation;
pub mod error;
pub mod events;
pub mod formatter;
pub mod llm;
pub mod logging;
pub mod tui;
pub mod ui;
