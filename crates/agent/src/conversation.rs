use std::sync::Arc;

use aether_core::domain::message::{ChatMessage, ChatRole};
use aether_core::domain::product::ProductRecommendation;
use aether_core::recommendation::{
    CoverageTarget, EducationLevel, Recommendation, RecommendationRequest, RiskProfile,
};
use async_trait::async_trait;
use serde_json::Value;
use tracing::{debug, info};

use crate::llm::{DialogueEngine, DialogueError, DialogueTurn, SessionIdentity};
use crate::tools::{invocation_for, ToolRegistry};

pub const GREETING: &str = "Hello! How can I help you plan your future?";

pub const STARTER_PROMPTS: [&str; 4] = [
    "I need health insurance for my family.",
    "Plan an education fund for a 5-year-old child.",
    "How do I prepare a retirement fund?",
    "Which investment product suits me?",
];

pub const FALLBACK_REPLY: &str = "Sorry, something went wrong while processing your request.";

/// Append-only record of one chat session, oldest message first.
#[derive(Clone, Debug, Default)]
pub struct Transcript {
    messages: Vec<ChatMessage>,
}

impl Transcript {
    pub fn with_greeting() -> Self {
        Self { messages: vec![ChatMessage::assistant(GREETING)] }
    }

    pub fn messages(&self) -> &[ChatMessage] {
        &self.messages
    }

    pub fn len(&self) -> usize {
        self.messages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }

    pub fn last(&self) -> Option<&ChatMessage> {
        self.messages.last()
    }

    pub fn push_user(&mut self, content: impl Into<String>) {
        self.messages.push(ChatMessage::user(content));
    }

    pub fn push_assistant(&mut self, content: impl Into<String>) {
        self.messages.push(ChatMessage::assistant(content));
    }

    /// True while the greeting is the only message.
    pub fn awaiting_first_question(&self) -> bool {
        matches!(self.messages.as_slice(), [only] if only.role == ChatRole::Assistant)
    }

    /// Starter prompt picked by its 1-based number, only offered before the
    /// first question.
    pub fn starter_selection(&self, input: &str) -> Option<&'static str> {
        if !self.awaiting_first_question() {
            return None;
        }
        let index = input.trim().parse::<usize>().ok()?.checked_sub(1)?;
        STARTER_PROMPTS.get(index).copied()
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Topic {
    Health,
    Education,
    Retirement,
    Investment,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ExtractedIntent {
    pub topic: Option<Topic>,
    pub request: Option<RecommendationRequest>,
    pub clarification_prompt: Option<String>,
}

/// Keyword matcher mapping an utterance onto one recommendation request.
///
/// When the utterance names no topic but carries arguments for the most
/// recent topic, such as "30 and 55" after a retirement question, that topic
/// is reused. Details the follow-up leaves out (coverage target, education
/// level) are taken from the earlier message.
#[derive(Clone, Debug, Default)]
pub struct IntentExtractor;

impl IntentExtractor {
    pub fn new() -> Self {
        Self
    }

    pub fn extract(&self, utterance: &str, history: &[ChatMessage]) -> ExtractedIntent {
        let current = Utterance::new(utterance);
        let earlier = history
            .iter()
            .rev()
            .filter(|message| message.role == ChatRole::User)
            .map(|message| Utterance::new(&message.content))
            .find_map(|earlier| earlier.topic().map(|topic| (topic, earlier)));

        let (topic, earlier) = match (current.topic(), earlier) {
            (Some(topic), earlier) => {
                let earlier = earlier.filter(|(previous, _)| *previous == topic);
                (topic, earlier.map(|(_, utterance)| utterance))
            }
            (None, Some((topic, earlier))) if current.supplies_arguments_for(topic) => {
                (topic, Some(earlier))
            }
            _ => {
                return ExtractedIntent {
                    topic: None,
                    request: None,
                    clarification_prompt: Some(
                        "I can recommend health, education, retirement or investment insurance. \
                         Which one would you like to explore?"
                            .to_string(),
                    ),
                };
            }
        };

        let numbers = current.numbers();
        let request = match topic {
            Topic::Health => Some(RecommendationRequest::Health {
                target: current
                    .target()
                    .or_else(|| earlier.as_ref().and_then(Utterance::target))
                    .unwrap_or(CoverageTarget::Individual),
                needs_critical_illness_cover: current.mentions_critical_illness(),
            }),
            Topic::Education => numbers.first().map(|child_age| RecommendationRequest::Education {
                child_age: *child_age,
                education_level: current
                    .education_level()
                    .or_else(|| earlier.as_ref().and_then(Utterance::education_level))
                    .unwrap_or(EducationLevel::Elementary),
            }),
            Topic::Retirement => match numbers[..] {
                [current_age, target_retirement_age, ..] => {
                    Some(RecommendationRequest::Retirement { current_age, target_retirement_age })
                }
                _ => None,
            },
            Topic::Investment => current
                .risk_profile()
                .map(|risk_profile| RecommendationRequest::Investment { risk_profile }),
        };

        let clarification_prompt = match (&request, topic) {
            (Some(_), _) => None,
            (None, Topic::Education) => Some(
                "How old is your child? Education planning works best when it starts before \
                 age 10."
                    .to_string(),
            ),
            (None, Topic::Retirement) => {
                Some("How old are you now, and at what age would you like to retire?".to_string())
            }
            (None, _) => Some(
                "What is your risk profile: conservative, moderate or aggressive?".to_string(),
            ),
        };

        ExtractedIntent { topic: Some(topic), request, clarification_prompt }
    }
}

/// Deterministic engine that routes keyword intents to the recommendation
/// tools without a language model.
pub struct OfflineDialogueEngine {
    extractor: IntentExtractor,
    tools: Arc<ToolRegistry>,
}

impl OfflineDialogueEngine {
    pub fn new(tools: Arc<ToolRegistry>) -> Self {
        Self { extractor: IntentExtractor::new(), tools }
    }
}

#[async_trait]
impl DialogueEngine for OfflineDialogueEngine {
    fn name(&self) -> &'static str {
        "offline"
    }

    async fn open_session(&self, identity: &SessionIdentity) -> Result<(), DialogueError> {
        info!(
            event_name = "agent.session.opened",
            engine = self.name(),
            app_name = %identity.app_name,
            user_id = %identity.user_id,
            session_id = %identity.session_id,
            "dialogue session opened"
        );
        Ok(())
    }

    async fn respond(&self, turn: DialogueTurn<'_>) -> Result<String, DialogueError> {
        let intent = self.extractor.extract(turn.utterance, turn.history);
        debug!(
            event_name = "agent.dialogue.intent_extracted",
            correlation_id = %turn.correlation_id,
            topic = ?intent.topic,
            resolved = intent.request.is_some(),
            "offline intent extracted"
        );

        let Some(request) = intent.request else {
            return Ok(intent.clarification_prompt.unwrap_or_default());
        };

        let (tool, arguments) = invocation_for(&request)
            .map_err(|error| DialogueError::MalformedResponse(format!("{error:#}")))?;
        let output = self
            .tools
            .execute(tool, arguments)
            .await
            .map_err(|error| DialogueError::MalformedResponse(format!("{error:#}")))?;

        reply_from_tool_output(&output)
    }
}

/// Conversational text for a serialized rule result.
pub fn reply_from_tool_output(output: &Value) -> Result<String, DialogueError> {
    let malformed = || DialogueError::MalformedResponse(format!("unexpected tool output {output}"));

    match output.get("status").and_then(Value::as_str) {
        Some("failure") => output
            .get("error_message")
            .and_then(Value::as_str)
            .map(str::to_string)
            .ok_or_else(malformed),
        Some("success") => match output.get("recommendation") {
            Some(Value::String(narrative)) => Ok(narrative.clone()),
            Some(record @ Value::Object(_)) => {
                let product: ProductRecommendation =
                    serde_json::from_value(record.clone()).map_err(|_| malformed())?;
                Ok(Recommendation::Single(product).to_text())
            }
            _ => Err(malformed()),
        },
        _ => Err(malformed()),
    }
}

/// Lowercased text and alphanumeric tokens of one message.
struct Utterance {
    text: String,
    tokens: Vec<String>,
}

impl Utterance {
    fn new(raw: &str) -> Self {
        let text = raw.to_lowercase();
        let tokens = text
            .split(|character: char| !character.is_alphanumeric())
            .filter(|token| !token.is_empty())
            .map(str::to_string)
            .collect();
        Self { text, tokens }
    }

    fn has_stem(&self, stems: &[&str]) -> bool {
        self.tokens.iter().any(|token| stems.iter().any(|stem| token.starts_with(stem)))
    }

    fn has_word(&self, words: &[&str]) -> bool {
        self.tokens.iter().any(|token| words.contains(&token.as_str()))
    }

    fn topic(&self) -> Option<Topic> {
        if self.has_stem(&["retire", "pension", "pensiun"]) {
            Some(Topic::Retirement)
        } else if self.has_stem(&["educat", "pendidikan", "school", "sekolah", "tuition"]) {
            Some(Topic::Education)
        } else if self.has_stem(&["invest", "unit", "fund"]) {
            Some(Topic::Investment)
        } else if self.has_stem(&["health", "kesehatan", "medic", "hospital", "critical"]) {
            Some(Topic::Health)
        } else {
            None
        }
    }

    /// Whether a topic-less follow-up answers a question about `topic`.
    fn supplies_arguments_for(&self, topic: Topic) -> bool {
        match topic {
            Topic::Health => self.target().is_some() || self.mentions_critical_illness(),
            Topic::Education => !self.numbers().is_empty() || self.education_level().is_some(),
            Topic::Retirement => !self.numbers().is_empty(),
            Topic::Investment => self.risk_profile().is_some(),
        }
    }

    fn numbers(&self) -> Vec<u32> {
        self.tokens.iter().filter_map(|token| token.parse::<u32>().ok()).collect()
    }

    fn mentions_critical_illness(&self) -> bool {
        self.has_stem(&["critical", "kritis", "cancer"])
    }

    fn target(&self) -> Option<CoverageTarget> {
        if self.has_stem(&["famil", "keluarga", "wife", "husband", "kids", "children", "spouse"]) {
            Some(CoverageTarget::Family)
        } else if self.has_stem(&["individu", "myself", "personal"])
            || self.has_word(&["me", "alone", "single"])
        {
            Some(CoverageTarget::Individual)
        } else {
            None
        }
    }

    fn education_level(&self) -> Option<EducationLevel> {
        if self.text.contains("perguruan tinggi")
            || self.has_word(&["university", "college", "kuliah"])
        {
            Some(EducationLevel::University)
        } else if self.text.contains("high school") || self.has_word(&["sma"]) {
            Some(EducationLevel::High)
        } else if self.text.contains("middle school") || self.has_word(&["smp", "junior"]) {
            Some(EducationLevel::Middle)
        } else if self.text.contains("elementary") || self.has_word(&["sd", "primary"]) {
            Some(EducationLevel::Elementary)
        } else {
            None
        }
    }

    fn risk_profile(&self) -> Option<RiskProfile> {
        if self.has_stem(&["conservative", "konservatif", "safe", "low"]) {
            Some(RiskProfile::Conservative)
        } else if self.has_stem(&["moderat", "balanced", "medium"]) {
            Some(RiskProfile::Moderate)
        } else if self.has_stem(&["aggressive", "agresif", "high"]) {
            Some(RiskProfile::Aggressive)
        } else {
            None
        }
    }
}
