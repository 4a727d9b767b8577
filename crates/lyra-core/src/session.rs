//! Chat dialog state for the active app.
//!
//! A session owns the message list of one app. Sending is split in two so
//! the caller decides where the network round trip runs:
//! [`ChatSession::begin_send`] records the user message and hands back a
//! [`PendingSend`]; the reply (or the fallback text) comes back through
//! [`ChatSession::complete`]. Replies addressed to a previous app are dropped.

use tracing::debug;

use crate::state::{to_history, AppDescriptor, ChatMessage, ConversationTurn};

pub fn welcome_text(app: &AppDescriptor) -> String {
    format!("Welcome to {}! How can I help you today?", app.name)
}

/// Everything needed to run one request against the chat endpoint
#[derive(Debug, Clone)]
pub struct PendingSend {
    pub epoch: u64,
    pub app: AppDescriptor,
    pub query: String,
    /// Messages that preceded `query`, projected to wire turns
    pub history: Vec<ConversationTurn>,
}

#[derive(Debug, Clone)]
pub struct ChatSession {
    app: AppDescriptor,
    messages: Vec<ChatMessage>,
    epoch: u64,
    in_flight: usize,
}

impl ChatSession {
    pub fn new(app: AppDescriptor) -> Self {
        let messages = vec![ChatMessage::app(welcome_text(&app))];
        Self {
            app,
            messages,
            epoch: 0,
            in_flight: 0,
        }
    }

    /// Discard the conversation and start over with `app`
    pub fn switch_app(&mut self, app: AppDescriptor) {
        self.messages = vec![ChatMessage::app(welcome_text(&app))];
        self.app = app;
        self.epoch += 1;
        self.in_flight = 0;
    }

    pub fn app(&self) -> &AppDescriptor {
        &self.app
    }

    pub fn title(&self) -> &str {
        self.app.dialog_title()
    }

    pub fn messages(&self) -> &[ChatMessage] {
        &self.messages
    }

    pub fn epoch(&self) -> u64 {
        self.epoch
    }

    /// True while a reply is outstanding
    pub fn is_typing(&self) -> bool {
        self.in_flight > 0
    }

    /// Record a user message. Blank input is ignored and yields `None`.
    pub fn begin_send(&mut self, input: &str) -> Option<PendingSend> {
        if input.trim().is_empty() {
            return None;
        }

        let history = to_history(&self.messages);
        self.messages.push(ChatMessage::user(input));
        self.in_flight += 1;

        Some(PendingSend {
            epoch: self.epoch,
            app: self.app.clone(),
            query: input.to_string(),
            history,
        })
    }

    /// Append the reply for a request started in `epoch`.
    /// Returns false when the session has since moved to another app.
    pub fn complete(&mut self, epoch: u64, reply: impl Into<String>) -> bool {
        if epoch != self.epoch {
            debug!(stale = epoch, current = self.epoch, "Dropping reply for previous app");
            return false;
        }
        self.in_flight = self.in_flight.saturating_sub(1);
        self.messages.push(ChatMessage::app(reply));
        true
    }
}
