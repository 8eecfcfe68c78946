use aether_core::recommendation::{
    CoverageTarget, EducationLevel, RecommendationRequest, RiskProfile, UnknownLiteral,
};
use tracing::info;

use super::{CommandResult, EXIT_BAD_INPUT, EXIT_BUSINESS_FAILURE, EXIT_OK};

/// Raw rule arguments as typed on the command line. Enumerated values stay
/// strings until [`run`] so unsupported literals produce a structured error.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum RecommendArgs {
    Health { target: String, critical_illness: bool },
    Education { child_age: u32, education_level: String },
    Retirement { current_age: u32, target_retirement_age: u32 },
    Investment { risk_profile: String },
}

impl RecommendArgs {
    pub fn into_request(self) -> Result<RecommendationRequest, UnknownLiteral> {
        Ok(match self {
            Self::Health { target, critical_illness } => RecommendationRequest::Health {
                target: target.parse::<CoverageTarget>()?,
                needs_critical_illness_cover: critical_illness,
            },
            Self::Education { child_age, education_level } => RecommendationRequest::Education {
                child_age,
                education_level: education_level.parse::<EducationLevel>()?,
            },
            Self::Retirement { current_age, target_retirement_age } => {
                RecommendationRequest::Retirement { current_age, target_retirement_age }
            }
            Self::Investment { risk_profile } => RecommendationRequest::Investment {
                risk_profile: risk_profile.parse::<RiskProfile>()?,
            },
        })
    }
}

/// Evaluates one rule and prints its result as JSON.
pub fn run(args: RecommendArgs) -> CommandResult {
    let request = match args.into_request() {
        Ok(request) => request,
        Err(error) => {
            return CommandResult::failure(
                "recommend",
                "invalid_input",
                error.to_string(),
                EXIT_BAD_INPUT,
            );
        }
    };

    let result = request.evaluate();
    info!(
        event_name = "cli.recommend.evaluated",
        correlation_id = "cli",
        rule = request.rule_name(),
        success = result.is_success(),
        "recommendation rule evaluated"
    );

    let exit_code = if result.is_success() { EXIT_OK } else { EXIT_BUSINESS_FAILURE };
    match serde_json::to_string_pretty(&result) {
        Ok(output) => CommandResult::output(exit_code, output),
        Err(error) => CommandResult::failure("recommend", "serialization", error.to_string(), 1),
    }
}
