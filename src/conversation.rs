//! Conversation controller: the message log plus the Idle/Sending state
//! machine around a single upstream call.
//!
//! A send is split into [`Conversation::begin_send`] and
//! [`Conversation::complete`] so the UI loop can run the upstream call on a
//! background task and hand the result back later. Every call is tagged with
//! the generation it was issued under; [`Conversation::reset`] bumps the
//! generation, so replies that land after a reset are dropped.

use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::error::{UpstreamError, ValidationError};
use crate::events::{Message, MessageId, Role};
use crate::llm::{Generator, WireContent};

/// Assistant message recorded when the upstream call fails.
pub const APOLOGY_MESSAGE: &str =
    "I'm sorry, I encountered an error while processing your request. Please try again.";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConversationState {
    Idle,
    Sending,
}

/// What happened to a call to [`Conversation::send`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SendOutcome {
    /// The reply (or the apology) was appended
    Completed,
    /// Another send was in flight; nothing changed
    Rejected,
}

/// An upstream call that has been started but not yet completed
#[derive(Debug, Clone)]
pub struct PendingReply {
    generation: u64,
    history: Vec<WireContent>,
}

impl PendingReply {
    pub fn generation(&self) -> u64 {
        self.generation
    }

    pub fn into_parts(self) -> (u64, Vec<WireContent>) {
        (self.generation, self.history)
    }
}

pub struct Conversation {
    id: Uuid,
    messages: Vec<Message>,
    state: ConversationState,
    generation: u64,
    next_id: u64,
}

impl Default for Conversation {
    fn default() -> Self {
        Self::new()
    }
}

impl Conversation {
    pub fn new() -> Self {
        Self {
            id: Uuid::new_v4(),
            messages: Vec::new(),
            state: ConversationState::Idle,
            generation: 0,
            next_id: 1,
        }
    }

    /// Identifier of the current conversation; changes on every reset
    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn messages(&self) -> &[Message] {
        &self.messages
    }

    pub fn state(&self) -> ConversationState {
        self.state
    }

    pub fn is_busy(&self) -> bool {
        self.state == ConversationState::Sending
    }

    /// Full log in the upstream wire format
    pub fn wire_history(&self) -> Vec<WireContent> {
        self.messages.iter().map(WireContent::from).collect()
    }

    /// Append the user message and enter `Sending`.
    ///
    /// Returns `Ok(None)` without touching anything when a send is already in
    /// flight. Fails when there is neither typed text nor attached content.
    pub fn begin_send(
        &mut self,
        display_text: &str,
        api_text: &str,
    ) -> Result<Option<PendingReply>, ValidationError> {
        if self.is_busy() {
            warn!(conversation = %self.id, "send rejected: reply still pending");
            return Ok(None);
        }
        if display_text.is_empty() && api_text == display_text {
            return Err(ValidationError::EmptyMessage);
        }

        self.push(Role::User, display_text, api_text);
        self.state = ConversationState::Sending;

        debug!(
            conversation = %self.id,
            generation = self.generation,
            turns = self.messages.len(),
            "send started"
        );

        Ok(Some(PendingReply {
            generation: self.generation,
            history: self.wire_history(),
        }))
    }

    /// Record the outcome of an upstream call issued under `generation`.
    ///
    /// Returns false when the result is stale (a reset happened since the
    /// call was issued) and was ignored.
    pub fn complete(&mut self, generation: u64, result: Result<String, UpstreamError>) -> bool {
        if generation != self.generation || !self.is_busy() {
            debug!(
                conversation = %self.id,
                generation,
                current = self.generation,
                "discarding stale reply"
            );
            return false;
        }

        match result {
            Ok(text) => {
                self.push(Role::Assistant, &text, &text);
            }
            Err(err) => {
                warn!(conversation = %self.id, error = %err, "upstream call failed");
                self.push(Role::Assistant, APOLOGY_MESSAGE, APOLOGY_MESSAGE);
            }
        }

        self.state = ConversationState::Idle;
        true
    }

    /// Send a message and wait for the reply on the current task.
    ///
    /// Upstream failures never reach the caller; they become an apology
    /// message in the log.
    pub async fn send<G>(
        &mut self,
        generator: &G,
        display_text: &str,
        api_text: &str,
    ) -> Result<SendOutcome, ValidationError>
    where
        G: Generator + ?Sized,
    {
        let Some(pending) = self.begin_send(display_text, api_text)? else {
            return Ok(SendOutcome::Rejected);
        };

        let (generation, history) = pending.into_parts();
        let result = generator.generate(&history).await;
        self.complete(generation, result);

        Ok(SendOutcome::Completed)
    }

    /// Discard all history and return to `Idle`. Any reply still in flight
    /// will be ignored when it arrives.
    pub fn reset(&mut self) {
        info!(
            conversation = %self.id,
            discarded = self.messages.len(),
            "conversation reset"
        );
        self.messages.clear();
        self.state = ConversationState::Idle;
        self.generation += 1;
        self.id = Uuid::new_v4();
    }

    fn push(&mut self, role: Role, display: &str, api: &str) {
        let id = MessageId(self.next_id);
        self.next_id += 1;
        self.messages.push(Message::new(id, role, display, api));
    }
}
