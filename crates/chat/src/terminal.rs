//! Plain terminal presentation of message templates.

use colored::Colorize;

use crate::blocks::{Block, MessageTemplate};

const DEFAULT_WIDTH: usize = 72;
const MIN_WIDTH: usize = 24;

/// Removes control characters except newlines and tabs so model output cannot
/// move the cursor or recolor the terminal.
pub fn sanitize_for_terminal(text: &str) -> String {
    text.chars().filter(|ch| !ch.is_control() || matches!(ch, '\n' | '\t')).collect()
}

#[derive(Clone, Debug)]
pub struct TerminalPainter {
    color: bool,
    width: usize,
}

impl Default for TerminalPainter {
    fn default() -> Self {
        Self { color: true, width: DEFAULT_WIDTH }
    }
}

impl TerminalPainter {
    pub fn new(color: bool, width: usize) -> Self {
        Self { color, width: width.max(MIN_WIDTH) }
    }

    pub fn with_color(color: bool) -> Self {
        Self::new(color, DEFAULT_WIDTH)
    }

    pub fn plain() -> Self {
        Self::with_color(false)
    }

    /// Renders one conversation turn: a speaker label followed by its blocks.
    pub fn paint_turn(&self, label: &str, message: &MessageTemplate) -> String {
        let mut output = String::new();
        let label = format!("{label}:");
        output.push_str(&self.styled(&label, |text| text.cyan().bold().to_string()));
        output.push('\n');
        output.push_str(&self.paint(message));
        output
    }

    pub fn paint(&self, message: &MessageTemplate) -> String {
        let mut sections = Vec::with_capacity(message.blocks.len());
        for block in &message.blocks {
            match block {
                Block::Narrative { text, .. } => {
                    sections.push(sanitize_for_terminal(text.text()));
                }
                Block::Card { title, body, .. } => sections.push(self.card(title, body)),
                Block::Context { elements, .. } => {
                    let line = elements
                        .iter()
                        .map(|element| sanitize_for_terminal(element.text()))
                        .collect::<Vec<_>>()
                        .join("  ");
                    sections.push(self.styled(&line, |text| text.dimmed().to_string()));
                }
            }
        }

        let mut output = sections.join("\n\n");
        output.push('\n');
        output
    }

    fn card(&self, title: &str, body: &str) -> String {
        let inner = self.width - 4;
        let rule = "─".repeat(self.width - 2);
        let mut lines = Vec::new();

        lines.push(self.styled(&format!("┌{rule}"), |text| text.blue().to_string()));
        for line in wrap(&sanitize_for_terminal(title), inner) {
            let title = self.styled(&line, |text| text.yellow().bold().to_string());
            lines.push(format!("{} {title}", self.border()));
        }
        for line in wrap(&sanitize_for_terminal(body), inner) {
            lines.push(format!("{} {line}", self.border()));
        }
        lines.push(self.styled(&format!("└{rule}"), |text| text.blue().to_string()));

        lines.join("\n")
    }

    fn border(&self) -> String {
        self.styled("│", |text| text.blue().to_string())
    }

    fn styled(&self, text: &str, style: impl FnOnce(&str) -> String) -> String {
        if self.color {
            style(text)
        } else {
            text.to_string()
        }
    }
}

fn wrap(text: &str, width: usize) -> Vec<String> {
    let mut lines = Vec::new();
    for paragraph in text.split('\n') {
        let mut current = String::new();
        for word in paragraph.split_whitespace() {
            let needed = usize::from(!current.is_empty()) + word.chars().count();
            if !current.is_empty() && current.chars().count() + needed > width {
                lines.push(std::mem::take(&mut current));
            }
            if !current.is_empty() {
                current.push(' ');
            }
            current.push_str(word);
        }
        lines.push(current);
    }
    lines
}
