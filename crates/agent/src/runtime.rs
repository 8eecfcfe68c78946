use std::sync::Arc;

use aether_core::errors::{ApplicationError, InterfaceError};
use tracing::{info, warn};
use uuid::Uuid;

use crate::conversation::{Transcript, FALLBACK_REPLY, STARTER_PROMPTS};
use crate::guardrails::{GuardrailDecision, GuardrailPolicy};
use crate::llm::{DialogueEngine, DialogueTurn, SessionIdentity};
use crate::tools::ToolRegistry;

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum TurnOutcome {
    /// Nothing to send: the input was empty after sanitization.
    Ignored,
    Replied {
        correlation_id: String,
        reply: String,
        notice: Option<String>,
    },
}

/// Owns one chat session: the engine, its tools and the transcript.
pub struct AgentRuntime {
    engine: Arc<dyn DialogueEngine>,
    tools: Arc<ToolRegistry>,
    guardrails: GuardrailPolicy,
    identity: SessionIdentity,
    transcript: Transcript,
    session_open: bool,
}

impl AgentRuntime {
    pub fn new(
        engine: Arc<dyn DialogueEngine>,
        tools: Arc<ToolRegistry>,
        guardrails: GuardrailPolicy,
        identity: SessionIdentity,
    ) -> Self {
        Self {
            engine,
            tools,
            guardrails,
            identity,
            transcript: Transcript::with_greeting(),
            session_open: false,
        }
    }

    pub fn engine_name(&self) -> &'static str {
        self.engine.name()
    }

    pub fn tools(&self) -> &ToolRegistry {
        &self.tools
    }

    pub fn identity(&self) -> &SessionIdentity {
        &self.identity
    }

    pub fn transcript(&self) -> &Transcript {
        &self.transcript
    }

    /// Starter prompts, offered only while the greeting is the sole message.
    pub fn starter_prompts(&self) -> Option<&'static [&'static str]> {
        let prompts: &'static [&'static str] = &STARTER_PROMPTS;
        self.transcript.awaiting_first_question().then_some(prompts)
    }

    pub async fn open_session(&mut self) -> Result<(), InterfaceError> {
        if self.session_open {
            return Ok(());
        }

        let correlation_id = format!("session-{}", self.identity.session_id);
        self.engine.open_session(&self.identity).await.map_err(|error| {
            warn!(
                event_name = "agent.session.open_failed",
                correlation_id = %correlation_id,
                session_id = %self.identity.session_id,
                error = %error,
                "dialogue session could not be opened"
            );
            ApplicationError::from(error).into_interface(correlation_id.clone())
        })?;
        self.session_open = true;
        Ok(())
    }

    /// Runs one user turn. On engine failure the user message stays in the
    /// transcript and no assistant message is recorded.
    pub async fn handle_turn(&mut self, raw_input: &str) -> Result<TurnOutcome, InterfaceError> {
        let correlation_id = Uuid::new_v4().to_string();

        let resolved = match self.transcript.starter_selection(raw_input) {
            Some(prompt) => prompt.to_string(),
            None => raw_input.to_string(),
        };
        let decision = self.guardrails.evaluate(&resolved);
        let (utterance, notice) = match decision {
            GuardrailDecision::Allow { text } => (text, None),
            GuardrailDecision::Degrade { text, reason_code, user_message } => {
                info!(
                    event_name = "agent.guardrail.degraded",
                    correlation_id = %correlation_id,
                    reason_code,
                    "user input modified by guardrail"
                );
                (text, Some(user_message))
            }
            GuardrailDecision::Ignore { .. } => return Ok(TurnOutcome::Ignored),
        };

        self.open_session().await?;

        info!(
            event_name = "agent.turn.received",
            correlation_id = %correlation_id,
            session_id = %self.identity.session_id,
            engine = self.engine.name(),
            chars = utterance.chars().count(),
            "user turn received"
        );

        let history_len = self.transcript.len();
        self.transcript.push_user(utterance.clone());
        let history = &self.transcript.messages()[..history_len];
        let turn = DialogueTurn { correlation_id: &correlation_id, utterance: &utterance, history };

        let reply = match self.engine.respond(turn).await {
            Ok(reply) if reply.trim().is_empty() => {
                warn!(
                    event_name = "agent.turn.empty_response",
                    correlation_id = %correlation_id,
                    "engine returned no final answer"
                );
                FALLBACK_REPLY.to_string()
            }
            Ok(reply) => reply,
            Err(error) => {
                warn!(
                    event_name = "agent.turn.failed",
                    correlation_id = %correlation_id,
                    error = %error,
                    "dialogue engine failed"
                );
                return Err(ApplicationError::from(error).into_interface(correlation_id));
            }
        };

        self.transcript.push_assistant(reply.clone());
        info!(
            event_name = "agent.turn.completed",
            correlation_id = %correlation_id,
            session_id = %self.identity.session_id,
            "assistant reply recorded"
        );

        Ok(TurnOutcome::Replied { correlation_id, reply, notice })
    }
}
