use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::attachment::Attachment;
use crate::error::{ExtractionError, UpstreamError};

/// Who authored a message
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Assistant,
}

impl Role {
    pub fn display_name(&self) -> &'static str {
        match self {
            Role::User => "You",
            Role::Assistant => "Assistant",
        }
    }
}

/// Identifier ordered by creation
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct MessageId(pub u64);

impl fmt::Display for MessageId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "msg-{}", self.0)
    }
}

/// Individual conversation entry. Immutable once created.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Message {
    id: MessageId,
    role: Role,
    api_content: String,
    display_content: String,
    timestamp: DateTime<Utc>,
}

impl Message {
    pub(crate) fn new(
        id: MessageId,
        role: Role,
        display_content: impl Into<String>,
        api_content: impl Into<String>,
    ) -> Self {
        Self {
            id,
            role,
            api_content: api_content.into(),
            display_content: display_content.into(),
            timestamp: Utc::now(),
        }
    }

    pub fn id(&self) -> MessageId {
        self.id
    }

    pub fn role(&self) -> Role {
        self.role
    }

    /// Exact text exchanged with the upstream model
    pub fn api_content(&self) -> &str {
        &self.api_content
    }

    /// Text shown in the UI
    pub fn display_content(&self) -> &str {
        &self.display_content
    }

    pub fn timestamp(&self) -> DateTime<Utc> {
        self.timestamp
    }

    /// True for user messages that carried extra content (an attached PDF)
    pub fn has_attachment(&self) -> bool {
        self.role == Role::User && self.api_content != self.display_content
    }
}

/// Terminal events (keyboard, resize, animation ticks)
#[derive(Debug, Clone)]
pub enum TuiEvent {
    /// Key press event
    Key(crossterm::event::KeyEvent),

    /// Paste event
    Paste(String),

    /// Terminal resize
    Resize(u16, u16),

    /// Animation/poll tick
    Tick,
}

/// Results delivered back to the UI loop from background tasks
#[derive(Debug)]
pub enum AppEvent {
    /// Upstream call finished; `generation` is the conversation generation it was issued under
    ReplyReady {
        generation: u64,
        result: Result<String, UpstreamError>,
    },

    /// PDF extraction finished; `ticket` identifies the request it answers
    AttachmentReady {
        ticket: u64,
        result: Result<Attachment, ExtractionError>,
    },
}
