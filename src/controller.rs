//! Single-flight conversation state machine.
//!
//! `IDLE -> SENDING -> STREAMING -> {SETTLED | FAILED}`. Every event coming
//! back from a stream carries the [`ExchangeId`] it was started with; events
//! for anything other than the current exchange are dropped, which is how a
//! cleared conversation stays untouched by a stream still running behind it.

use crate::attachment::Attachment;
use crate::conversation::{Conversation, GroundingSource, Message, MessageId, Role};
use crate::strings::ERROR_REPLY;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ExchangeId(u64);

/// Bumped by every clear. An attachment read that started under an older
/// generation is dropped when it finishes.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub struct AttachmentGeneration(u64);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    Idle,
    Sending,
    Streaming,
}

#[derive(Debug, Clone, Copy)]
struct InFlight {
    exchange: ExchangeId,
    placeholder: MessageId,
    streaming: bool,
}

/// Everything the streaming task needs, captured when the exchange starts.
#[derive(Debug, Clone)]
pub struct PendingExchange {
    pub exchange: ExchangeId,
    pub placeholder: MessageId,
    pub text: String,
    pub attachment: Option<Attachment>,
    /// Turns settled before this exchange; excludes the new user turn and
    /// the placeholder.
    pub history: Vec<Message>,
}

#[derive(Debug, Default)]
pub struct ConversationController {
    conversation: Conversation,
    pending_attachment: Option<Attachment>,
    in_flight: Option<InFlight>,
    next_exchange: u64,
    attachment_generation: AttachmentGeneration,
}

impl ConversationController {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn conversation(&self) -> &Conversation {
        &self.conversation
    }

    pub fn messages(&self) -> &[Message] {
        self.conversation.messages()
    }

    pub fn phase(&self) -> Phase {
        match self.in_flight {
            None => Phase::Idle,
            Some(InFlight { streaming: false, .. }) => Phase::Sending,
            Some(InFlight { streaming: true, .. }) => Phase::Streaming,
        }
    }

    pub fn is_loading(&self) -> bool {
        self.in_flight.is_some()
    }

    pub fn current_exchange(&self) -> Option<ExchangeId> {
        self.in_flight.map(|f| f.exchange)
    }

    pub fn pending_attachment(&self) -> Option<&Attachment> {
        self.pending_attachment.as_ref()
    }

    /// Replaces any previously selected attachment.
    pub fn set_attachment(&mut self, attachment: Attachment) {
        self.pending_attachment = Some(attachment);
    }

    pub fn attachment_generation(&self) -> AttachmentGeneration {
        self.attachment_generation
    }

    /// Sets an attachment whose read began under `generation`. Returns false
    /// and leaves state alone if the conversation was cleared since.
    pub fn accept_loaded_attachment(
        &mut self,
        generation: AttachmentGeneration,
        attachment: Attachment,
    ) -> bool {
        if generation != self.attachment_generation {
            tracing::debug!(?generation, "dropping attachment loaded before clear");
            return false;
        }
        self.set_attachment(attachment);
        true
    }

    pub fn remove_attachment(&mut self) {
        self.pending_attachment = None;
    }

    /// Starts an exchange, or returns `None` when there is nothing to send or
    /// another exchange is still in flight. On success the user turn and an
    /// empty model placeholder are appended and the pending attachment is
    /// consumed.
    pub fn begin_send(&mut self, text: &str) -> Option<PendingExchange> {
        if self.in_flight.is_some() {
            tracing::debug!("send ignored: exchange already in flight");
            return None;
        }
        if text.trim().is_empty() && self.pending_attachment.is_none() {
            return None;
        }

        let history = self.conversation.messages().to_vec();
        let attachment = self.pending_attachment.take();

        self.conversation.push(Role::User, text, attachment.clone());
        let placeholder = self.conversation.push(Role::Model, "", None);

        self.next_exchange += 1;
        let exchange = ExchangeId(self.next_exchange);
        self.in_flight = Some(InFlight {
            exchange,
            placeholder,
            streaming: false,
        });

        Some(PendingExchange {
            exchange,
            placeholder,
            text: text.to_string(),
            attachment,
            history,
        })
    }

    fn current_placeholder(&self, exchange: ExchangeId) -> Option<MessageId> {
        match self.in_flight {
            Some(f) if f.exchange == exchange => Some(f.placeholder),
            _ => {
                tracing::debug!(?exchange, "dropping event for stale exchange");
                None
            }
        }
    }

    /// Appends a delta to the placeholder. Returns false if the event was
    /// stale and nothing changed.
    pub fn apply_delta(&mut self, exchange: ExchangeId, delta: &str) -> bool {
        let Some(id) = self.current_placeholder(exchange) else {
            return false;
        };
        let Some(msg) = self.conversation.get_mut(id) else {
            return false;
        };
        msg.text.push_str(delta);
        if let Some(f) = self.in_flight.as_mut() {
            f.streaming = true;
        }
        true
    }

    pub fn settle(&mut self, exchange: ExchangeId, sources: Vec<GroundingSource>) -> bool {
        let Some(id) = self.current_placeholder(exchange) else {
            return false;
        };
        if let Some(msg) = self.conversation.get_mut(id) {
            msg.grounding_sources = sources;
        }
        self.in_flight = None;
        true
    }

    /// Replaces whatever was streamed so far with the fixed error reply.
    pub fn fail(&mut self, exchange: ExchangeId) -> bool {
        let Some(id) = self.current_placeholder(exchange) else {
            return false;
        };
        if let Some(msg) = self.conversation.get_mut(id) {
            msg.text = ERROR_REPLY.to_string();
            msg.is_error = true;
        }
        self.in_flight = None;
        true
    }

    /// New chat: empties the store, drops the pending attachment and
    /// abandons any in-flight exchange.
    pub fn clear(&mut self) {
        if let Some(f) = self.in_flight.take() {
            tracing::info!(exchange = ?f.exchange, "abandoning in-flight exchange");
        }
        self.conversation.clear();
        self.pending_attachment = None;
        self.attachment_generation.0 += 1;
    }
}
