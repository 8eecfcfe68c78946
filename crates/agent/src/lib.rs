//! Agent runtime: turns user utterances into assistant replies.
//!
//! A [`DialogueEngine`](llm::DialogueEngine) decides which recommendation
//! rule to call. Rules are reached only through the [`ToolRegistry`](tools::ToolRegistry),
//! so every product the assistant mentions comes from the deterministic rule
//! engine in `aether-core`, never from the model.
//!
//! - `conversation`: transcript, starter prompts and the offline keyword engine
//! - `guardrails`: user input sanitization
//! - `llm`: the engine trait and the chat completions client
//! - `runtime`: per-session turn cycle
//! - `tools`: recommendation rules exposed as callable tools

pub mod conversation;
pub mod guardrails;
pub mod llm;
pub mod runtime;
pub mod tools;

pub use conversation::{OfflineDialogueEngine, Transcript};
pub use llm::{ChatCompletionsEngine, DialogueEngine, DialogueError, SessionIdentity};
pub use runtime::{AgentRuntime, TurnOutcome};
pub use tools::ToolRegistry;
