//! Applies stream events to the transcript.
//!
//! The reducer owns the message list and the open-message pointer. Only the
//! most recently started assistant message may receive deltas; any tool event,
//! user message or terminal signal closes it for good.
//!
//! Messages sit behind their own `Arc`, so a write copies the list of pointers
//! and at most the open message. Frozen messages stay shared with every
//! snapshot already handed out.

use std::sync::Arc;

use tokio::sync::watch;
use tracing::{debug, trace, warn};

use super::{Message, MessageContent, Role, TranscriptSnapshot};
use crate::protocol::{PartKind, StreamEvent};

/// What happened when an event was applied.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Applied {
    /// The transcript changed and a snapshot was published.
    Mutated,
    /// The event was rejected; the transcript is unchanged.
    Dropped(DropReason),
    /// The event carries nothing to apply.
    Ignored,
}

/// Why an event was dropped.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DropReason {
    /// A delta arrived while no assistant message was open.
    NoOpenMessage,
}

/// Owns the transcript and applies events to it in arrival order.
#[derive(Debug)]
pub struct TranscriptReducer {
    messages: Arc<Vec<Arc<Message>>>,
    open: Option<usize>,
    revision: u64,
    publisher: watch::Sender<TranscriptSnapshot>,
}

impl Default for TranscriptReducer {
    fn default() -> Self {
        Self::new()
    }
}

impl TranscriptReducer {
    /// Creates a reducer over an empty transcript.
    pub fn new() -> Self {
        Self::with_history(Vec::new())
    }

    /// Creates a reducer hydrated from previously stored messages.
    ///
    /// Hydrated messages are frozen; nothing is open until the next `part_start`.
    pub fn with_history(history: Vec<Message>) -> Self {
        let messages: Arc<Vec<Arc<Message>>> =
            Arc::new(history.into_iter().map(Arc::new).collect());
        let publisher = watch::Sender::new(TranscriptSnapshot {
            revision: 0,
            messages: Arc::clone(&messages),
            open: None,
        });
        Self {
            messages,
            open: None,
            revision: 0,
            publisher,
        }
    }

    /// Subscribes to published snapshots.
    pub fn subscribe(&self) -> watch::Receiver<TranscriptSnapshot> {
        self.publisher.subscribe()
    }

    /// Returns the current state as a snapshot.
    pub fn snapshot(&self) -> TranscriptSnapshot {
        TranscriptSnapshot {
            revision: self.revision,
            messages: Arc::clone(&self.messages),
            open: self.open,
        }
    }

    pub fn messages(&self) -> &[Arc<Message>] {
        &self.messages
    }

    /// Index of the open message, if any.
    pub fn open(&self) -> Option<usize> {
        self.open
    }

    /// Applies one decoded event.
    pub fn apply(&mut self, event: StreamEvent) -> Applied {
        match event {
            StreamEvent::PartStart { kind, payload } => {
                let mut message = Message::assistant();
                append_part(&mut message, kind, &payload);
                let index = self.push(message);
                self.open = Some(index);
                trace!(index, %kind, "assistant part started");
                self.publish()
            }
            StreamEvent::PartDelta { kind, payload } => {
                let Some(index) = self.open_assistant() else {
                    warn!(%kind, len = payload.len(), "dropping delta with no open message");
                    return Applied::Dropped(DropReason::NoOpenMessage);
                };
                let messages = Arc::make_mut(&mut self.messages);
                append_part(Arc::make_mut(&mut messages[index]), kind, &payload);
                self.publish()
            }
            StreamEvent::ToolCall { name, args } => {
                self.open = None;
                self.push(Message::tool_call(name, args));
                self.publish()
            }
            StreamEvent::ToolResult { name, result } => {
                self.open = None;
                self.push(Message::tool_result(name, result));
                self.publish()
            }
            StreamEvent::Done => self.close("done"),
            StreamEvent::Noop => Applied::Ignored,
        }
    }

    /// Appends a user message. Closes any open assistant message.
    pub fn push_user(&mut self, text: impl Into<String>) -> Applied {
        self.open = None;
        self.push(Message::user(text));
        self.publish()
    }

    /// Freezes the open message at the end of a well-formed stream.
    pub fn complete(&mut self) -> Applied {
        self.close("stream completed")
    }

    /// Freezes the open message after cancellation, keeping its partial content.
    pub fn cancel(&mut self) -> Applied {
        self.close("stream cancelled")
    }

    /// Freezes the open message after a network failure, keeping its partial content.
    pub fn fail(&mut self) -> Applied {
        self.close("stream failed")
    }

    fn close(&mut self, why: &'static str) -> Applied {
        let Some(index) = self.open.take() else {
            return Applied::Ignored;
        };
        debug!(index, why, "closing open message");
        self.publish()
    }

    fn push(&mut self, message: Message) -> usize {
        let messages = Arc::make_mut(&mut self.messages);
        messages.push(Arc::new(message));
        messages.len() - 1
    }

    /// Returns the open index if it points at an assistant message.
    fn open_assistant(&self) -> Option<usize> {
        self.open
            .filter(|&index| matches!(self.messages.get(index), Some(m) if m.role == Role::Assistant))
    }

    fn publish(&mut self) -> Applied {
        self.revision += 1;
        self.publisher.send_replace(self.snapshot());
        Applied::Mutated
    }
}

fn append_part(message: &mut Message, kind: PartKind, payload: &str) {
    match kind {
        PartKind::Text => match &mut message.content {
            MessageContent::Text(text) => text.push_str(payload),
            MessageContent::Structured(_) => {
                warn!("dropping text for structured message");
            }
        },
        PartKind::Reasoning => message
            .reasoning
            .get_or_insert_with(String::new)
            .push_str(payload),
    }
}
