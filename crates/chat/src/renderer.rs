use tracing::debug;

use crate::blocks::{MessageBuilder, MessageTemplate};
use crate::payload;

/// Turns assistant text into a narrative block followed by product cards.
///
/// Rendering never fails: text without a decodable payload comes back as a
/// single verbatim narrative block.
#[derive(Clone, Copy, Debug, Default)]
pub struct ResponseRenderer;

impl ResponseRenderer {
    pub fn new() -> Self {
        Self
    }

    pub fn render(&self, text: &str) -> MessageTemplate {
        let extracted = match payload::extract(text) {
            Ok(extracted) => extracted,
            Err(error) => {
                debug!(
                    event_name = "chat.render.verbatim_fallback",
                    reason = %error,
                    "response rendered as plain narrative"
                );
                return verbatim(text);
            }
        };

        let mut builder = MessageBuilder::new(text);
        if !extracted.preamble.is_empty() {
            builder = builder.narrative("chat.response.narrative.v1", |narrative| {
                narrative.plain(extracted.preamble);
            });
        }
        for (index, entry) in extracted.entries.into_iter().enumerate() {
            builder = builder.card(
                format!("chat.response.card.{index}.v1"),
                entry.name,
                entry.description,
            );
        }

        builder.build()
    }
}

fn verbatim(text: &str) -> MessageTemplate {
    MessageBuilder::new(text)
        .narrative("chat.response.narrative.v1", |narrative| {
            narrative.plain(text);
        })
        .build()
}
