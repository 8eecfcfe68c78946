pub const DEFAULT_MAX_INPUT_CHARS: usize = 2000;

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum GuardrailDecision {
    Allow { text: String },
    /// Input accepted after modification; the user is told why.
    Degrade { text: String, reason_code: &'static str, user_message: String },
    Ignore { reason_code: &'static str },
}

impl GuardrailDecision {
    pub fn accepted_text(&self) -> Option<&str> {
        match self {
            Self::Allow { text } | Self::Degrade { text, .. } => Some(text),
            Self::Ignore { .. } => None,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct GuardrailPolicy {
    pub max_input_chars: usize,
}

impl Default for GuardrailPolicy {
    fn default() -> Self {
        Self { max_input_chars: DEFAULT_MAX_INPUT_CHARS }
    }
}

impl GuardrailPolicy {
    pub fn evaluate(&self, raw: &str) -> GuardrailDecision {
        let cleaned = raw
            .chars()
            .filter(|ch| !ch.is_control() || *ch == '\n')
            .collect::<String>();
        let trimmed = cleaned.trim();

        if trimmed.is_empty() {
            return GuardrailDecision::Ignore { reason_code: "empty_input" };
        }

        if trimmed.chars().count() > self.max_input_chars {
            let text = trimmed.chars().take(self.max_input_chars).collect::<String>();
            return GuardrailDecision::Degrade {
                text: text.trim_end().to_string(),
                reason_code: "input_truncated",
                user_message: format!(
                    "Your message was longer than {} characters and has been shortened.",
                    self.max_input_chars
                ),
            };
        }

        GuardrailDecision::Allow { text: trimmed.to_string() }
    }
}
