use std::collections::HashMap;

use aether_core::recommendation::RecommendationRequest;
use anyhow::{anyhow, bail, Context, Result};
use async_trait::async_trait;
use serde::Serialize;
use serde_json::{json, Value};
use tracing::info;

#[async_trait]
pub trait Tool: Send + Sync {
    fn name(&self) -> &'static str;
    fn description(&self) -> &'static str;
    /// JSON schema describing the accepted arguments object.
    fn parameters(&self) -> Value;
    async fn execute(&self, input: Value) -> Result<Value>;
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct ToolDefinition {
    pub name: String,
    pub description: String,
    pub parameters: Value,
}

#[derive(Default)]
pub struct ToolRegistry {
    tools: HashMap<String, Box<dyn Tool>>,
}

impl ToolRegistry {
    /// Registry holding the four recommendation rules.
    pub fn with_recommendation_tools() -> Self {
        let mut registry = Self::default();
        for tool in RuleTool::all() {
            registry.register(tool);
        }
        registry
    }

    pub fn register<T>(&mut self, tool: T)
    where
        T: Tool + 'static,
    {
        self.tools.insert(tool.name().to_string(), Box::new(tool));
    }

    pub fn get(&self, name: &str) -> Option<&dyn Tool> {
        self.tools.get(name).map(|tool| tool.as_ref())
    }

    pub fn len(&self) -> usize {
        self.tools.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tools.is_empty()
    }

    /// Tool definitions sorted by name.
    pub fn definitions(&self) -> Vec<ToolDefinition> {
        let mut definitions = self
            .tools
            .values()
            .map(|tool| ToolDefinition {
                name: tool.name().to_string(),
                description: tool.description().to_string(),
                parameters: tool.parameters(),
            })
            .collect::<Vec<_>>();
        definitions.sort_by(|left, right| left.name.cmp(&right.name));
        definitions
    }

    pub async fn execute(&self, name: &str, input: Value) -> Result<Value> {
        let tool = self.get(name).ok_or_else(|| anyhow!("unknown tool `{name}`"))?;
        let output = tool.execute(input).await?;
        let status = output.get("status").and_then(serde_json::Value::as_str).unwrap_or("unknown");
        info!(
            event_name = "agent.tool.executed",
            tool = name,
            status,
            "recommendation tool executed"
        );
        Ok(output)
    }
}

/// Tool name and argument object that evaluate `request` through the registry.
pub fn invocation_for(request: &RecommendationRequest) -> Result<(&'static str, Value)> {
    let mut arguments = serde_json::to_value(request).context("serializing request")?;
    if let Value::Object(fields) = &mut arguments {
        fields.remove("rule");
    }
    Ok((RuleKind::from_request(request).tool_name(), arguments))
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum RuleKind {
    Health,
    Education,
    Retirement,
    Investment,
}

impl RuleKind {
    const ALL: [Self; 4] = [Self::Health, Self::Education, Self::Retirement, Self::Investment];

    fn from_request(request: &RecommendationRequest) -> Self {
        match request {
            RecommendationRequest::Health { .. } => Self::Health,
            RecommendationRequest::Education { .. } => Self::Education,
            RecommendationRequest::Retirement { .. } => Self::Retirement,
            RecommendationRequest::Investment { .. } => Self::Investment,
        }
    }

    fn rule_tag(self) -> &'static str {
        match self {
            Self::Health => "health",
            Self::Education => "education",
            Self::Retirement => "retirement",
            Self::Investment => "investment",
        }
    }

    fn tool_name(self) -> &'static str {
        match self {
            Self::Health => "recommend_health_insurance",
            Self::Education => "recommend_education_insurance",
            Self::Retirement => "recommend_retirement_fund",
            Self::Investment => "recommend_investment_insurance",
        }
    }
}

/// Exposes one recommendation rule as a callable tool.
#[derive(Clone, Copy, Debug)]
pub struct RuleTool {
    kind: RuleKind,
}

impl RuleTool {
    pub fn all() -> impl Iterator<Item = Self> {
        RuleKind::ALL.into_iter().map(|kind| Self { kind })
    }
}

#[async_trait]
impl Tool for RuleTool {
    fn name(&self) -> &'static str {
        self.kind.tool_name()
    }

    fn description(&self) -> &'static str {
        match self.kind {
            RuleKind::Health => {
                "Recommends health insurance for an individual or a family, optionally with \
                 critical illness cover."
            }
            RuleKind::Education => {
                "Recommends education insurance for a child. Planning should start before the \
                 child turns 10."
            }
            RuleKind::Retirement => {
                "Recommends a retirement fund product from the current and target retirement age."
            }
            RuleKind::Investment => {
                "Recommends a unit-linked investment insurance product for a risk profile."
            }
        }
    }

    fn parameters(&self) -> Value {
        match self.kind {
            RuleKind::Health => json!({
                "type": "object",
                "properties": {
                    "target": {
                        "type": "string",
                        "enum": ["individual", "family"],
                        "description": "Who the coverage is for."
                    },
                    "needs_critical_illness_cover": {
                        "type": "boolean",
                        "description": "Whether critical illness protection is needed."
                    }
                },
                "required": ["target"]
            }),
            RuleKind::Education => json!({
                "type": "object",
                "properties": {
                    "child_age": {
                        "type": "integer",
                        "minimum": 0,
                        "description": "Current age of the child in years."
                    },
                    "education_level": {
                        "type": "string",
                        "enum": ["elementary", "middle", "high", "university"],
                        "description": "Education level the fund is planned for."
                    }
                },
                "required": ["child_age", "education_level"]
            }),
            RuleKind::Retirement => json!({
                "type": "object",
                "properties": {
                    "current_age": { "type": "integer", "minimum": 0 },
                    "target_retirement_age": { "type": "integer", "minimum": 0 }
                },
                "required": ["current_age", "target_retirement_age"]
            }),
            RuleKind::Investment => json!({
                "type": "object",
                "properties": {
                    "risk_profile": {
                        "type": "string",
                        "enum": ["conservative", "moderate", "aggressive"]
                    }
                },
                "required": ["risk_profile"]
            }),
        }
    }

    async fn execute(&self, input: Value) -> Result<Value> {
        let Value::Object(mut arguments) = input else {
            bail!("arguments for `{}` must be a JSON object", self.name());
        };
        arguments.insert("rule".to_string(), Value::from(self.kind.rule_tag()));

        let request: RecommendationRequest = serde_json::from_value(Value::Object(arguments))
            .with_context(|| format!("invalid arguments for `{}`", self.name()))?;
        let result = request.evaluate();

        serde_json::to_value(&result).context("serializing rule result")
    }
}

#[cfg(test)]
mod tests {
    use aether_core::recommendation::{EducationLevel, RecommendationRequest};
    use serde_json::json;

    use super::{invocation_for, ToolRegistry};

    #[test]
    fn registry_lists_all_rules_in_name_order() {
        let registry = ToolRegistry::with_recommendation_tools();
        let names = registry
            .definitions()
            .into_iter()
            .map(|definition| definition.name)
            .collect::<Vec<_>>();

        assert_eq!(registry.len(), 4);
        assert_eq!(
            names,
            vec![
                "recommend_education_insurance",
                "recommend_health_insurance",
                "recommend_investment_insurance",
                "recommend_retirement_fund",
            ]
        );
    }

    #[tokio::test]
    async fn health_tool_accepts_original_literals() {
        let registry = ToolRegistry::with_recommendation_tools();
        let output = registry
            .execute("recommend_health_insurance", json!({ "target": "keluarga" }))
            .await
            .expect("tool should run");

        assert_eq!(output["status"], "success");
        let narrative = output["recommendation"].as_str().unwrap_or_default();
        assert!(narrative.contains("family"));
    }

    #[tokio::test]
    async fn business_failure_is_a_successful_tool_call() {
        let registry = ToolRegistry::with_recommendation_tools();
        let output = registry
            .execute(
                "recommend_retirement_fund",
                json!({ "current_age": 40, "target_retirement_age": 35 }),
            )
            .await
            .expect("tool should run");

        assert_eq!(output["status"], "failure");
        assert!(output["error_message"]
            .as_str()
            .unwrap_or_default()
            .contains("less than the target retirement age"));
    }

    #[tokio::test]
    async fn unknown_tool_and_bad_arguments_are_errors() {
        let registry = ToolRegistry::with_recommendation_tools();

        assert!(registry.execute("recommend_pet_insurance", json!({})).await.is_err());
        assert!(registry
            .execute("recommend_investment_insurance", json!({ "risk_profile": "reckless" }))
            .await
            .is_err());
        assert!(registry
            .execute("recommend_investment_insurance", json!("moderate"))
            .await
            .is_err());
    }

    #[tokio::test]
    async fn invocation_round_trips_through_registry() {
        let request = RecommendationRequest::Education {
            child_age: 5,
            education_level: EducationLevel::Elementary,
        };
        let (name, arguments) = invocation_for(&request).expect("request serializes");

        assert_eq!(name, "recommend_education_insurance");
        assert!(arguments.get("rule").is_none());

        let output = ToolRegistry::with_recommendation_tools()
            .execute(name, arguments)
            .await
            .expect("tool should run");
        assert_eq!(output["status"], "success");
    }
}
