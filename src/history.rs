use crate::attachment::Attachment;
use crate::conversation::{Message, Role};
use crate::gemini::{Content, Part};

/// Maps settled turns to Gemini `contents`, one entry per message, in order.
/// Errored turns are kept so the model sees the same context the user saw.
pub fn format_history(messages: &[Message]) -> Vec<Content> {
    messages
        .iter()
        .map(|msg| {
            let mut parts = Vec::new();
            if !msg.text.is_empty() {
                parts.push(Part::text(msg.text.clone()));
            }
            if msg.role == Role::User {
                if let Some(attachment) = &msg.attachment {
                    parts.push(Part::inline(attachment));
                }
            }
            Content {
                role: msg.role.as_wire().to_string(),
                parts,
            }
        })
        .collect()
}

/// Parts for the outgoing turn: the image first, then the text. An empty
/// text part is left out when an image carries the turn on its own.
pub fn build_turn_parts(text: &str, attachment: Option<&Attachment>) -> Vec<Part> {
    let mut parts = Vec::new();
    if let Some(attachment) = attachment {
        parts.push(Part::inline(attachment));
    }
    if !text.is_empty() || parts.is_empty() {
        parts.push(Part::text(text));
    }
    parts
}
