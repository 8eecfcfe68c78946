use std::sync::Arc;

use aether_agent::conversation::OfflineDialogueEngine;
use aether_agent::guardrails::GuardrailPolicy;
use aether_agent::llm::{ChatCompletionsEngine, DialogueEngine, DialogueError, SessionIdentity};
use aether_agent::runtime::AgentRuntime;
use aether_agent::tools::ToolRegistry;
use aether_chat::{ResponseRenderer, TerminalPainter};
use aether_core::config::{AppConfig, ConfigError, DialogueEngineKind, LoadOptions};
use aether_core::errors::{ApplicationError, InterfaceError};
use thiserror::Error;
use tracing::info;

const BOOTSTRAP_CORRELATION_ID: &str = "bootstrap";

/// Process-wide state for one chat session, built once at startup.
pub struct Application {
    pub config: AppConfig,
    pub runtime: AgentRuntime,
    pub renderer: ResponseRenderer,
    pub painter: TerminalPainter,
}

#[derive(Debug, Error)]
pub enum BootstrapError {
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error("dialogue engine setup failed: {0}")]
    Engine(#[from] DialogueError),
    #[error("chat session could not be started: {0}")]
    Session(#[source] InterfaceError),
}

impl BootstrapError {
    /// User-facing form of the failure, tagged with the bootstrap correlation id.
    pub fn into_interface(self) -> InterfaceError {
        let application = match self {
            Self::Config(error) => ApplicationError::Configuration(error.to_string()),
            Self::Engine(error) => ApplicationError::from(error),
            Self::Session(interface) => return interface,
        };
        application.into_interface(BOOTSTRAP_CORRELATION_ID)
    }
}

pub async fn bootstrap(
    options: LoadOptions,
    painter: TerminalPainter,
) -> Result<Application, BootstrapError> {
    let config = AppConfig::load(options)?;
    bootstrap_with_config(config, painter).await
}

pub async fn bootstrap_with_config(
    config: AppConfig,
    painter: TerminalPainter,
) -> Result<Application, BootstrapError> {
    info!(
        event_name = "system.bootstrap.start",
        correlation_id = BOOTSTRAP_CORRELATION_ID,
        session_id = %config.session.session_id,
        engine = ?config.dialogue.engine,
        "starting application bootstrap"
    );

    let tools = Arc::new(ToolRegistry::with_recommendation_tools());
    let engine = build_engine(&config, Arc::clone(&tools))?;
    let mut runtime = AgentRuntime::new(
        engine,
        tools,
        GuardrailPolicy::default(),
        SessionIdentity::from(&config.session),
    );
    runtime.open_session().await.map_err(BootstrapError::Session)?;

    info!(
        event_name = "system.bootstrap.session_opened",
        correlation_id = BOOTSTRAP_CORRELATION_ID,
        session_id = %config.session.session_id,
        engine = runtime.engine_name(),
        "chat session ready"
    );

    Ok(Application { config, runtime, renderer: ResponseRenderer::new(), painter })
}

pub fn build_engine(
    config: &AppConfig,
    tools: Arc<ToolRegistry>,
) -> Result<Arc<dyn DialogueEngine>, DialogueError> {
    let engine: Arc<dyn DialogueEngine> = match config.dialogue.engine {
        DialogueEngineKind::Offline => Arc::new(OfflineDialogueEngine::new(tools)),
        DialogueEngineKind::OpenAi | DialogueEngineKind::Ollama => {
            Arc::new(ChatCompletionsEngine::new(&config.dialogue, tools)?)
        }
    };
    Ok(engine)
}
