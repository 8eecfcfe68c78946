//! Aether core: insurance recommendation rules and shared domain types.
//!
//! The rule engine is pure and synchronous. Everything that talks to a
//! language model or a terminal lives in the `aether-agent` and
//! `aether-chat` crates.

pub mod config;
pub mod domain;
pub mod errors;
pub mod recommendation;

pub use domain::message::{ChatMessage, ChatRole};
pub use domain::product::ProductRecommendation;
pub use errors::{ApplicationError, InterfaceError};
pub use recommendation::{
    CoverageTarget, EducationLevel, Recommendation, RecommendationRequest, RiskProfile,
    RuleResult,
};
