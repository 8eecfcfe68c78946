//! Presentation of assistant responses as structured chat messages.

pub mod blocks;
pub mod payload;
pub mod renderer;
pub mod terminal;

pub use blocks::{Block, MessageBuilder, MessageTemplate, TextObject};
pub use renderer::ResponseRenderer;
pub use terminal::{sanitize_for_terminal, TerminalPainter};
