//! Deterministic insurance recommendation rules.
//!
//! Each rule validates its typed inputs and returns a [`RuleResult`]. Business
//! failures (age thresholds) are values, never errors. Rules hold no state and
//! perform no I/O, so identical inputs always produce identical results.

pub mod narrative;
pub mod rules;

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize, Serializer};

use crate::domain::product::ProductRecommendation;

pub use rules::{
    education_insurance, health_insurance, investment_insurance, retirement_fund,
    EDUCATION_MAX_CHILD_AGE,
};

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Recommendation {
    Single(ProductRecommendation),
    /// An ordered product list embedded in a human-readable narrative.
    Narrated { narrative: String, products: Vec<ProductRecommendation> },
}

impl Recommendation {
    pub fn products(&self) -> &[ProductRecommendation] {
        match self {
            Self::Single(product) => std::slice::from_ref(product),
            Self::Narrated { products, .. } => products,
        }
    }

    /// Text form handed to the conversation. A single product is emitted as a
    /// record literal so the renderer can still pick it up as a card.
    pub fn to_text(&self) -> String {
        match self {
            Self::Single(product) => format!(
                "Here is the product that fits your needs: {}",
                narrative::product_record_literal(product)
            ),
            Self::Narrated { narrative, .. } => narrative.clone(),
        }
    }
}

impl Serialize for Recommendation {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        match self {
            Self::Single(product) => product.serialize(serializer),
            Self::Narrated { narrative, .. } => serializer.serialize_str(narrative),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum RuleResult {
    Success { recommendation: Recommendation },
    Failure { error_message: String },
}

impl RuleResult {
    pub fn success(recommendation: Recommendation) -> Self {
        Self::Success { recommendation }
    }

    pub fn failure(error_message: impl Into<String>) -> Self {
        Self::Failure { error_message: error_message.into() }
    }

    pub fn is_success(&self) -> bool {
        matches!(self, Self::Success { .. })
    }

    pub fn products(&self) -> &[ProductRecommendation] {
        match self {
            Self::Success { recommendation } => recommendation.products(),
            Self::Failure { .. } => &[],
        }
    }

    pub fn error_message(&self) -> Option<&str> {
        match self {
            Self::Success { .. } => None,
            Self::Failure { error_message } => Some(error_message),
        }
    }

    pub fn to_text(&self) -> String {
        match self {
            Self::Success { recommendation } => recommendation.to_text(),
            Self::Failure { error_message } => error_message.clone(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnknownLiteral {
    pub field: &'static str,
    pub value: String,
}

impl fmt::Display for UnknownLiteral {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "unsupported {} `{}`", self.field, self.value)
    }
}

impl std::error::Error for UnknownLiteral {}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CoverageTarget {
    #[serde(alias = "individu")]
    Individual,
    #[serde(alias = "keluarga")]
    Family,
}

impl CoverageTarget {
    pub const ALL: [Self; 2] = [Self::Individual, Self::Family];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Individual => "individual",
            Self::Family => "family",
        }
    }
}

impl FromStr for CoverageTarget {
    type Err = UnknownLiteral;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "individual" | "individu" => Ok(Self::Individual),
            "family" | "keluarga" => Ok(Self::Family),
            _ => Err(UnknownLiteral { field: "coverage target", value: value.to_string() }),
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EducationLevel {
    #[serde(alias = "SD")]
    Elementary,
    #[serde(alias = "SMP")]
    Middle,
    #[serde(alias = "SMA")]
    High,
    #[serde(alias = "Perguruan Tinggi")]
    University,
}

impl EducationLevel {
    pub const ALL: [Self; 4] = [Self::Elementary, Self::Middle, Self::High, Self::University];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Elementary => "elementary",
            Self::Middle => "middle",
            Self::High => "high",
            Self::University => "university",
        }
    }
}

impl FromStr for EducationLevel {
    type Err = UnknownLiteral;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "elementary" | "sd" => Ok(Self::Elementary),
            "middle" | "smp" => Ok(Self::Middle),
            "high" | "sma" => Ok(Self::High),
            "university" | "perguruan tinggi" => Ok(Self::University),
            _ => Err(UnknownLiteral { field: "education level", value: value.to_string() }),
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RiskProfile {
    #[serde(alias = "konservatif")]
    Conservative,
    #[serde(alias = "moderat")]
    Moderate,
    #[serde(alias = "agresif")]
    Aggressive,
}

impl RiskProfile {
    pub const ALL: [Self; 3] = [Self::Conservative, Self::Moderate, Self::Aggressive];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Conservative => "conservative",
            Self::Moderate => "moderate",
            Self::Aggressive => "aggressive",
        }
    }
}

impl FromStr for RiskProfile {
    type Err = UnknownLiteral;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "conservative" | "konservatif" => Ok(Self::Conservative),
            "moderate" | "moderat" => Ok(Self::Moderate),
            "aggressive" | "agresif" => Ok(Self::Aggressive),
            _ => Err(UnknownLiteral { field: "risk profile", value: value.to_string() }),
        }
    }
}

macro_rules! display_as_str {
    ($($ty:ty),*) => {
        $(impl fmt::Display for $ty {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(self.as_str())
            }
        })*
    };
}

display_as_str!(CoverageTarget, EducationLevel, RiskProfile);

/// A recognized intent mapped onto exactly one rule. Intent classification
/// itself happens upstream in the dialogue engine.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "rule", rename_all = "snake_case")]
pub enum RecommendationRequest {
    Health {
        target: CoverageTarget,
        #[serde(default)]
        needs_critical_illness_cover: bool,
    },
    Education {
        child_age: u32,
        education_level: EducationLevel,
    },
    Retirement {
        current_age: u32,
        target_retirement_age: u32,
    },
    Investment {
        risk_profile: RiskProfile,
    },
}

impl RecommendationRequest {
    pub fn rule_name(&self) -> &'static str {
        match self {
            Self::Health { .. } => "health",
            Self::Education { .. } => "education",
            Self::Retirement { .. } => "retirement",
            Self::Investment { .. } => "investment",
        }
    }

    pub fn evaluate(&self) -> RuleResult {
        match *self {
            Self::Health { target, needs_critical_illness_cover } => {
                health_insurance(target, needs_critical_illness_cover)
            }
            Self::Education { child_age, education_level } => {
                education_insurance(child_age, education_level)
            }
            Self::Retirement { current_age, target_retirement_age } => {
                retirement_fund(current_age, target_retirement_age)
            }
            Self::Investment { risk_profile } => investment_insurance(risk_profile),
        }
    }
}
