use aether_chat::{ResponseRenderer, TerminalPainter};

use super::{CommandResult, EXIT_OK};

pub fn run(text: &str, json: bool, painter: &TerminalPainter) -> CommandResult {
    let message = ResponseRenderer::new().render(text);

    if json {
        return match serde_json::to_string_pretty(&message) {
            Ok(output) => CommandResult::output(EXIT_OK, output),
            Err(error) => CommandResult::failure("render", "serialization", error.to_string(), 1),
        };
    }

    let painted = painter.paint(&message);
    let output = painted.strip_suffix('\n').unwrap_or(&painted);
    CommandResult::output(EXIT_OK, output)
}
