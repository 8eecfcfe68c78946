use serde::{Deserialize, Serialize};

/// One insurance product suggested by a recommendation rule.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProductRecommendation {
    pub name: String,
    pub description: String,
}

impl ProductRecommendation {
    pub fn new(name: impl Into<String>, description: impl Into<String>) -> Self {
        Self { name: name.into(), description: description.into() }
    }
}
