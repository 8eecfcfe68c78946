//! Dialogue engine seam and the OpenAI-compatible chat completions client.
//!
//! An engine receives one user utterance plus the prior transcript and
//! returns the final assistant text. Engines may call recommendation tools
//! through the shared [`ToolRegistry`] any number of times per turn.

use std::sync::Arc;
use std::time::Duration;

use aether_core::config::{DialogueConfig, SessionConfig};
use aether_core::domain::message::ChatMessage;
use aether_core::errors::ApplicationError;
use async_trait::async_trait;
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use thiserror::Error;
use tracing::{debug, info, warn};

use crate::tools::{ToolDefinition, ToolRegistry};

pub const SYSTEM_INSTRUCTION: &str = "You are a friendly virtual insurance assistant. \
Understand what the user needs and recommend the most suitable insurance products. \
Use the available tools to build recommendations from the details the user gives you, \
greet the user warmly and explain your answer clearly.";

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SessionIdentity {
    pub app_name: String,
    pub user_id: String,
    pub session_id: String,
}

impl From<&SessionConfig> for SessionIdentity {
    fn from(config: &SessionConfig) -> Self {
        Self {
            app_name: config.app_name.clone(),
            user_id: config.user_id.clone(),
            session_id: config.session_id.clone(),
        }
    }
}

#[derive(Clone, Copy, Debug)]
pub struct DialogueTurn<'a> {
    pub correlation_id: &'a str,
    pub utterance: &'a str,
    /// Messages preceding `utterance`, oldest first.
    pub history: &'a [ChatMessage],
}

#[derive(Debug, Error)]
pub enum DialogueError {
    #[error("dialogue engine is misconfigured: {0}")]
    Misconfigured(String),
    #[error("session could not be opened: {0}")]
    SessionInit(String),
    #[error("transport failure: {0}")]
    Transport(#[from] reqwest::Error),
    #[error("upstream returned status {status}: {body}")]
    UpstreamStatus { status: u16, body: String },
    #[error("malformed upstream response: {0}")]
    MalformedResponse(String),
    #[error("no final answer after {rounds} tool rounds")]
    ToolRoundsExhausted { rounds: u32 },
}

impl From<DialogueError> for ApplicationError {
    fn from(error: DialogueError) -> Self {
        match error {
            DialogueError::Misconfigured(message) => Self::Configuration(message),
            DialogueError::SessionInit(message) => Self::Session(message),
            other => Self::Integration(other.to_string()),
        }
    }
}

#[async_trait]
pub trait DialogueEngine: Send + Sync {
    fn name(&self) -> &'static str;

    async fn open_session(&self, identity: &SessionIdentity) -> Result<(), DialogueError>;

    /// Final assistant text for the turn. An empty string means the engine
    /// produced no answer.
    async fn respond(&self, turn: DialogueTurn<'_>) -> Result<String, DialogueError>;
}

/// One chat completions round trip. The HTTP client is the only production
/// implementation.
#[async_trait]
trait CompletionTransport: Send + Sync {
    async fn complete(&self, request: &CompletionRequest) -> Result<WireMessage, DialogueError>;
}

struct HttpTransport {
    client: reqwest::Client,
    endpoint: String,
    api_key: Option<SecretString>,
}

#[async_trait]
impl CompletionTransport for HttpTransport {
    async fn complete(&self, request: &CompletionRequest) -> Result<WireMessage, DialogueError> {
        let mut builder = self.client.post(&self.endpoint).json(request);
        if let Some(api_key) = &self.api_key {
            builder = builder.bearer_auth(api_key.expose_secret());
        }

        let response = builder.send().await?;
        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(DialogueError::UpstreamStatus { status: status.as_u16(), body });
        }

        let body: CompletionResponse = response.json().await?;
        first_choice(body)
    }
}

pub struct ChatCompletionsEngine {
    transport: Box<dyn CompletionTransport>,
    endpoint: String,
    model: String,
    max_tool_rounds: u32,
    tools: Arc<ToolRegistry>,
}

impl ChatCompletionsEngine {
    pub fn new(config: &DialogueConfig, tools: Arc<ToolRegistry>) -> Result<Self, DialogueError> {
        let base_url = config.base_url.as_deref().ok_or_else(|| {
            DialogueError::Misconfigured("dialogue.base_url is required".to_string())
        })?;
        let client =
            reqwest::Client::builder().timeout(Duration::from_secs(config.timeout_secs)).build()?;
        let endpoint = format!("{}/chat/completions", base_url.trim_end_matches('/'));
        let transport =
            HttpTransport { client, endpoint: endpoint.clone(), api_key: config.api_key.clone() };

        Ok(Self {
            transport: Box::new(transport),
            endpoint,
            model: config.model.clone(),
            max_tool_rounds: config.max_tool_rounds,
            tools,
        })
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    async fn dispatch(&self, call: &WireToolCall) -> String {
        let output = match serde_json::from_str::<Value>(&call.function.arguments) {
            Ok(arguments) => self.tools.execute(&call.function.name, arguments).await,
            Err(error) => Err(error.into()),
        };

        match output {
            Ok(value) => value.to_string(),
            Err(error) => {
                warn!(
                    event_name = "agent.tool.rejected",
                    tool = %call.function.name,
                    error = %error,
                    "tool call rejected"
                );
                json!({ "error": format!("{error:#}") }).to_string()
            }
        }
    }
}

#[async_trait]
impl DialogueEngine for ChatCompletionsEngine {
    fn name(&self) -> &'static str {
        "chat_completions"
    }

    async fn open_session(&self, identity: &SessionIdentity) -> Result<(), DialogueError> {
        info!(
            event_name = "agent.session.opened",
            engine = self.name(),
            endpoint = %self.endpoint,
            model = %self.model,
            app_name = %identity.app_name,
            user_id = %identity.user_id,
            session_id = %identity.session_id,
            "dialogue session opened"
        );
        Ok(())
    }

    async fn respond(&self, turn: DialogueTurn<'_>) -> Result<String, DialogueError> {
        let mut request = CompletionRequest::new(&self.model, &turn, &self.tools.definitions());

        for round in 1..=self.max_tool_rounds {
            let message = self.transport.complete(&request).await?;
            let calls = message.tool_calls.clone().unwrap_or_default();
            if calls.is_empty() {
                return Ok(message.content.unwrap_or_default());
            }

            debug!(
                event_name = "agent.dialogue.tool_round",
                correlation_id = %turn.correlation_id,
                round,
                calls = calls.len(),
                "model requested tool calls"
            );
            request.messages.push(message);
            for call in &calls {
                let content = self.dispatch(call).await;
                request.messages.push(WireMessage::tool_result(&call.id, content));
            }
        }

        Err(DialogueError::ToolRoundsExhausted { rounds: self.max_tool_rounds })
    }
}

#[derive(Clone, Debug, Serialize)]
struct CompletionRequest {
    model: String,
    messages: Vec<WireMessage>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    tools: Vec<WireTool>,
}

impl CompletionRequest {
    fn new(model: &str, turn: &DialogueTurn<'_>, definitions: &[ToolDefinition]) -> Self {
        let mut messages = Vec::with_capacity(turn.history.len() + 2);
        messages.push(WireMessage::text("system", SYSTEM_INSTRUCTION));
        messages.extend(
            turn.history
                .iter()
                .map(|message| WireMessage::text(message.role.as_str(), &message.content)),
        );
        messages.push(WireMessage::text("user", turn.utterance));

        Self {
            model: model.to_string(),
            messages,
            tools: definitions.iter().map(WireTool::from).collect(),
        }
    }
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
struct WireMessage {
    role: String,
    #[serde(default)]
    content: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    tool_calls: Option<Vec<WireToolCall>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    tool_call_id: Option<String>,
}

impl WireMessage {
    fn text(role: &str, content: &str) -> Self {
        Self { role: role.to_string(), content: Some(content.to_string()), ..Self::default() }
    }

    fn tool_result(call_id: &str, content: String) -> Self {
        Self {
            role: "tool".to_string(),
            content: Some(content),
            tool_call_id: Some(call_id.to_string()),
            ..Self::default()
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
struct WireToolCall {
    id: String,
    #[serde(rename = "type", default = "function_kind")]
    kind: String,
    function: WireFunctionCall,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
struct WireFunctionCall {
    name: String,
    #[serde(default)]
    arguments: String,
}

#[derive(Clone, Debug, Serialize)]
struct WireTool {
    #[serde(rename = "type")]
    kind: &'static str,
    function: ToolDefinition,
}

impl From<&ToolDefinition> for WireTool {
    fn from(definition: &ToolDefinition) -> Self {
        Self { kind: "function", function: definition.clone() }
    }
}

#[derive(Debug, Deserialize)]
struct CompletionResponse {
    #[serde(default)]
    choices: Vec<CompletionChoice>,
}

#[derive(Debug, Deserialize)]
struct CompletionChoice {
    message: WireMessage,
}

fn function_kind() -> String {
    "function".to_string()
}

fn first_choice(response: CompletionResponse) -> Result<WireMessage, DialogueError> {
    response
        .choices
        .into_iter()
        .next()
        .map(|choice| choice.message)
        .ok_or_else(|| {
            DialogueError::MalformedResponse("response contained no choices".to_string())
        })
}

#[cfg(test)]
mod tests {
    use std::collections::VecDeque;
    use std::sync::{Arc, Mutex};

    use aether_core::config::AppConfig;
    use aether_core::domain::message::ChatMessage;
    use aether_core::errors::ApplicationError;
    use async_trait::async_trait;
    use serde_json::{json, Value};

    use super::{
        first_choice, ChatCompletionsEngine, CompletionRequest, CompletionResponse,
        CompletionTransport, DialogueEngine, DialogueError, DialogueTurn, SessionIdentity,
        WireMessage, WireToolCall, SYSTEM_INSTRUCTION,
    };
    use crate::conversation::FALLBACK_REPLY;
    use crate::guardrails::GuardrailPolicy;
    use crate::runtime::{AgentRuntime, TurnOutcome};
    use crate::tools::ToolRegistry;

    /// Replays canned assistant messages and records every request body.
    #[derive(Clone, Default)]
    struct ScriptedTransport {
        replies: Arc<Mutex<VecDeque<Value>>>,
        requests: Arc<Mutex<Vec<Value>>>,
    }

    impl ScriptedTransport {
        fn new(replies: impl IntoIterator<Item = Value>) -> Self {
            Self {
                replies: Arc::new(Mutex::new(replies.into_iter().collect())),
                requests: Arc::default(),
            }
        }

        fn requests(&self) -> Vec<Value> {
            self.requests.lock().expect("requests lock").clone()
        }
    }

    #[async_trait]
    impl CompletionTransport for ScriptedTransport {
        async fn complete(
            &self,
            request: &CompletionRequest,
        ) -> Result<WireMessage, DialogueError> {
            let body = serde_json::to_value(request).expect("request serializes");
            self.requests.lock().expect("requests lock").push(body);

            let reply = self
                .replies
                .lock()
                .expect("replies lock")
                .pop_front()
                .ok_or_else(|| DialogueError::MalformedResponse("script exhausted".to_string()))?;
            Ok(serde_json::from_value(reply).expect("scripted reply decodes"))
        }
    }

    fn scripted_engine(
        transport: &ScriptedTransport,
        max_tool_rounds: u32,
    ) -> ChatCompletionsEngine {
        ChatCompletionsEngine {
            transport: Box::new(transport.clone()),
            endpoint: "http://stub.local/v1/chat/completions".to_string(),
            model: "test-model".to_string(),
            max_tool_rounds,
            tools: Arc::new(ToolRegistry::with_recommendation_tools()),
        }
    }

    fn tool_call_reply(id: &str, name: &str, arguments: Value) -> Value {
        json!({
            "role": "assistant",
            "content": null,
            "tool_calls": [{
                "id": id,
                "type": "function",
                "function": { "name": name, "arguments": arguments.to_string() }
            }]
        })
    }

    fn engine() -> ChatCompletionsEngine {
        let mut config = AppConfig::default().dialogue;
        config.base_url = Some("http://localhost:11434/v1/".to_string());
        ChatCompletionsEngine::new(&config, Arc::new(ToolRegistry::with_recommendation_tools()))
            .expect("engine builds")
    }

    #[test]
    fn endpoint_joins_base_url_without_double_slash() {
        assert_eq!(engine().endpoint(), "http://localhost:11434/v1/chat/completions");
    }

    #[test]
    fn missing_base_url_is_a_configuration_error() {
        let config = AppConfig::default().dialogue;
        let error = ChatCompletionsEngine::new(&config, Arc::new(ToolRegistry::default())).err();

        assert!(matches!(error, Some(DialogueError::Misconfigured(_))));
        let mapped = error.map(ApplicationError::from);
        assert_eq!(
            mapped,
            Some(ApplicationError::Configuration("dialogue.base_url is required".to_string()))
        );
    }

    #[tokio::test]
    async fn tool_results_are_sent_back_before_the_final_answer() {
        let transport = ScriptedTransport::new([
            tool_call_reply(
                "call_1",
                "recommend_retirement_fund",
                json!({ "current_age": 30, "target_retirement_age": 55 }),
            ),
            json!({ "role": "assistant", "content": "Start with the income protector." }),
        ]);
        let engine = scripted_engine(&transport, 4);
        let history = vec![ChatMessage::assistant("Hello!")];

        let reply = engine
            .respond(DialogueTurn {
                correlation_id: "turn-1",
                utterance: "I am 30 and want to retire at 55",
                history: &history,
            })
            .await
            .expect("engine answers");

        assert_eq!(reply, "Start with the income protector.");
        let requests = transport.requests();
        assert_eq!(requests.len(), 2);
        assert_eq!(requests[0]["messages"].as_array().map(Vec::len), Some(3));

        let messages = requests[1]["messages"].as_array().cloned().unwrap_or_default();
        assert_eq!(messages.len(), 5);
        assert_eq!(messages[3]["role"], "assistant");
        assert_eq!(messages[3]["tool_calls"][0]["id"], "call_1");
        assert_eq!(messages[4]["role"], "tool");
        assert_eq!(messages[4]["tool_call_id"], "call_1");

        let content = messages[4]["content"].as_str().unwrap_or_default();
        let output: Value = serde_json::from_str(content).expect("tool output is JSON");
        assert_eq!(output["status"], "success");
        assert_eq!(output["recommendation"]["name"], "Sequis Q Heritage Income Protector");
    }

    #[tokio::test]
    async fn endless_tool_calls_stop_after_the_round_limit() {
        let call = tool_call_reply(
            "call_loop",
            "recommend_investment_insurance",
            json!({ "risk_profile": "moderate" }),
        );
        let transport = ScriptedTransport::new([call.clone(), call.clone(), call]);
        let engine = scripted_engine(&transport, 2);

        let error = engine
            .respond(DialogueTurn { correlation_id: "turn-2", utterance: "invest", history: &[] })
            .await
            .err();

        assert!(matches!(error, Some(DialogueError::ToolRoundsExhausted { rounds: 2 })));
        assert_eq!(transport.requests().len(), 2);
    }

    #[tokio::test]
    async fn null_content_without_tool_calls_becomes_the_fallback_reply() {
        let transport =
            ScriptedTransport::new([json!({ "role": "assistant", "content": null })]);
        let engine = scripted_engine(&transport, 4);

        let direct = engine
            .respond(DialogueTurn { correlation_id: "turn-3", utterance: "hi", history: &[] })
            .await
            .expect("empty answer is not an error");
        assert!(direct.is_empty());

        let transport =
            ScriptedTransport::new([json!({ "role": "assistant", "content": null })]);
        let mut runtime = AgentRuntime::new(
            Arc::new(scripted_engine(&transport, 4)),
            Arc::new(ToolRegistry::with_recommendation_tools()),
            GuardrailPolicy::default(),
            SessionIdentity {
                app_name: "aether_insurance_app".to_string(),
                user_id: "tester".to_string(),
                session_id: "s-1".to_string(),
            },
        );

        let outcome = runtime.handle_turn("hi").await.expect("turn succeeds");

        assert!(matches!(
            outcome,
            TurnOutcome::Replied { ref reply, .. } if reply == FALLBACK_REPLY
        ));
        assert_eq!(
            runtime.transcript().last().map(|message| message.content.as_str()),
            Some(FALLBACK_REPLY)
        );
    }

    #[test]
    fn request_carries_instruction_history_and_tools() {
        let history = vec![ChatMessage::assistant("Hello!"), ChatMessage::user("hi")];
        let turn =
            DialogueTurn { correlation_id: "turn-1", utterance: "family cover", history: &history };
        let definitions = ToolRegistry::with_recommendation_tools().definitions();

        let body = serde_json::to_value(CompletionRequest::new("test-model", &turn, &definitions))
            .expect("request serializes");

        assert_eq!(body["model"], "test-model");
        assert_eq!(body["messages"][0]["role"], "system");
        assert_eq!(body["messages"][0]["content"], SYSTEM_INSTRUCTION);
        assert_eq!(body["messages"][1]["role"], "assistant");
        assert_eq!(body["messages"][3]["content"], "family cover");
        assert!(body["messages"][3].get("tool_calls").is_none());
        assert_eq!(body["tools"].as_array().map(Vec::len), Some(4));
        assert_eq!(body["tools"][0]["type"], "function");
        assert_eq!(body["tools"][0]["function"]["name"], "recommend_education_insurance");
    }

    #[test]
    fn tool_call_responses_decode() {
        let response: CompletionResponse = serde_json::from_value(json!({
            "choices": [{
                "message": {
                    "role": "assistant",
                    "content": null,
                    "tool_calls": [{
                        "id": "call_1",
                        "type": "function",
                        "function": {
                            "name": "recommend_investment_insurance",
                            "arguments": "{\"risk_profile\":\"moderat\"}"
                        }
                    }]
                }
            }]
        }))
        .expect("response decodes");

        let message = first_choice(response).expect("one choice");
        let calls: Vec<WireToolCall> = message.tool_calls.unwrap_or_default();
        assert_eq!(calls.len(), 1);
        assert_eq!(calls[0].function.name, "recommend_investment_insurance");
        assert!(message.content.is_none());
    }

    #[test]
    fn empty_choices_are_malformed() {
        let response: CompletionResponse =
            serde_json::from_value(json!({ "choices": [] })).expect("response decodes");
        assert!(matches!(first_choice(response), Err(DialogueError::MalformedResponse(_))));
    }

    #[tokio::test]
    async fn rejected_tool_calls_report_errors_back_to_the_model() {
        let engine = engine();
        let call: WireToolCall = serde_json::from_value(json!({
            "id": "call_2",
            "function": { "name": "recommend_pet_insurance", "arguments": "{}" }
        }))
        .expect("call decodes");

        let content: Value =
            serde_json::from_str(&engine.dispatch(&call).await).expect("tool content is JSON");
        assert!(content["error"].as_str().unwrap_or_default().contains("unknown tool"));
    }

    #[test]
    fn session_failures_map_to_session_errors() {
        let mapped = ApplicationError::from(DialogueError::SessionInit("down".to_string()));
        assert_eq!(mapped, ApplicationError::Session("down".to_string()));

        let mapped = ApplicationError::from(DialogueError::ToolRoundsExhausted { rounds: 2 });
        assert!(matches!(
            mapped,
            ApplicationError::Integration(message) if message.contains("2 tool rounds")
        ));
    }
}
