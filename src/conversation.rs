//! In-memory message store for a single chat session.
//!
//! Messages are kept in chronological order and addressed by [`MessageId`].
//! Lookups always go through the id so an in-flight update never depends on
//! list position.

use crate::attachment::Attachment;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Model,
}

impl Role {
    /// Role tag expected by the Gemini `contents` schema.
    pub fn as_wire(&self) -> &'static str {
        match self {
            Role::User => "user",
            Role::Model => "model",
        }
    }
}

/// Opaque, process-unique message identifier. Never reused, even after the
/// conversation is cleared.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct MessageId(u64);

/// A web reference attached by the model to support its answer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GroundingSource {
    pub title: String,
    pub uri: String,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Message {
    pub id: MessageId,
    pub role: Role,
    pub text: String,
    /// Only set on user turns.
    pub attachment: Option<Attachment>,
    pub is_error: bool,
    pub grounding_sources: Vec<GroundingSource>,
}

impl Message {
    pub fn is_user(&self) -> bool {
        self.role == Role::User
    }
}

#[derive(Debug, Default)]
pub struct Conversation {
    messages: Vec<Message>,
    next_id: u64,
}

impl Conversation {
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends a turn and returns its fresh id. Attachments on model turns
    /// are dropped.
    pub fn push(&mut self, role: Role, text: impl Into<String>, attachment: Option<Attachment>) -> MessageId {
        self.next_id += 1;
        let id = MessageId(self.next_id);
        let attachment = match role {
            Role::User => attachment,
            Role::Model => None,
        };
        self.messages.push(Message {
            id,
            role,
            text: text.into(),
            attachment,
            is_error: false,
            grounding_sources: Vec::new(),
        });
        id
    }

    pub fn get(&self, id: MessageId) -> Option<&Message> {
        self.messages.iter().find(|m| m.id == id)
    }

    pub fn get_mut(&mut self, id: MessageId) -> Option<&mut Message> {
        self.messages.iter_mut().find(|m| m.id == id)
    }

    pub fn messages(&self) -> &[Message] {
        &self.messages
    }

    pub fn len(&self) -> usize {
        self.messages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }

    /// Drops every message. The id counter keeps running.
    pub fn clear(&mut self) {
        self.messages.clear();
    }
}
