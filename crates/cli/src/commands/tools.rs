use aether_agent::tools::ToolRegistry;

use super::{CommandResult, EXIT_OK};

/// Lists the registered tools with their argument schemas.
pub fn run() -> CommandResult {
    let definitions = ToolRegistry::with_recommendation_tools().definitions();
    match serde_json::to_string_pretty(&definitions) {
        Ok(output) => CommandResult::output(EXIT_OK, output),
        Err(error) => CommandResult::failure("tools", "serialization", error.to_string(), 1),
    }
}
