use std::env;
use std::fs;
use std::path::Path;

use aether_core::config::{resolve_config_path, AppConfig, LoadOptions};
use toml::Value;

use super::{CommandResult, EXIT_BAD_INPUT, EXIT_OK};

struct Field {
    key: &'static str,
    value: String,
    env_keys: &'static [&'static str],
    overridden: bool,
}

pub fn run(options: LoadOptions) -> CommandResult {
    let config_file_path = resolve_config_path(options.config_path.as_deref());
    let overrides = options.overrides.clone();

    let config = match AppConfig::load(options) {
        Ok(config) => config,
        Err(error) => {
            return CommandResult::failure(
                "config",
                "config_validation",
                format!("config validation failed: {error}"),
                EXIT_BAD_INPUT,
            );
        }
    };

    let config_file_doc = load_config_file_doc(config_file_path.as_deref());
    let api_key = if config.dialogue.api_key.is_some() { "<redacted>" } else { "<unset>" };

    let fields = [
        Field {
            key: "dialogue.engine",
            value: format!("{:?}", config.dialogue.engine),
            env_keys: &["AETHER_DIALOGUE_ENGINE"],
            overridden: overrides.dialogue_engine.is_some(),
        },
        Field {
            key: "dialogue.model",
            value: config.dialogue.model.clone(),
            env_keys: &["AETHER_DIALOGUE_MODEL"],
            overridden: overrides.dialogue_model.is_some(),
        },
        Field {
            key: "dialogue.base_url",
            value: config.dialogue.base_url.clone().unwrap_or_else(|| "<unset>".to_string()),
            env_keys: &["AETHER_DIALOGUE_BASE_URL"],
            overridden: overrides.dialogue_base_url.is_some(),
        },
        Field {
            key: "dialogue.api_key",
            value: api_key.to_string(),
            env_keys: &["AETHER_DIALOGUE_API_KEY"],
            overridden: overrides.dialogue_api_key.is_some(),
        },
        Field {
            key: "dialogue.timeout_secs",
            value: config.dialogue.timeout_secs.to_string(),
            env_keys: &["AETHER_DIALOGUE_TIMEOUT_SECS"],
            overridden: false,
        },
        Field {
            key: "dialogue.max_tool_rounds",
            value: config.dialogue.max_tool_rounds.to_string(),
            env_keys: &["AETHER_DIALOGUE_MAX_TOOL_ROUNDS"],
            overridden: false,
        },
        Field {
            key: "session.app_name",
            value: config.session.app_name.clone(),
            env_keys: &["AETHER_SESSION_APP_NAME"],
            overridden: false,
        },
        Field {
            key: "session.user_id",
            value: config.session.user_id.clone(),
            env_keys: &["AETHER_SESSION_USER_ID"],
            overridden: overrides.session_user_id.is_some(),
        },
        Field {
            key: "session.session_id",
            value: config.session.session_id.clone(),
            env_keys: &["AETHER_SESSION_ID"],
            overridden: overrides.session_id.is_some(),
        },
        Field {
            key: "logging.level",
            value: config.logging.level.clone(),
            env_keys: &["AETHER_LOGGING_LEVEL", "AETHER_LOG_LEVEL"],
            overridden: overrides.log_level.is_some(),
        },
        Field {
            key: "logging.format",
            value: format!("{:?}", config.logging.format),
            env_keys: &["AETHER_LOGGING_FORMAT", "AETHER_LOG_FORMAT"],
            overridden: false,
        },
    ];

    let mut lines =
        vec!["effective config (source precedence: flag > env > file > default):".to_string()];
    for field in &fields {
        let source = field_source(field, config_file_doc.as_ref(), config_file_path.as_deref());
        lines.push(render_line(field.key, &field.value, source));
    }

    CommandResult::output(EXIT_OK, lines.join("\n"))
}

fn load_config_file_doc(path: Option<&Path>) -> Option<Value> {
    let raw = fs::read_to_string(path?).ok()?;
    raw.parse::<Value>().ok()
}

fn field_source(
    field: &Field,
    config_file_doc: Option<&Value>,
    config_file_path: Option<&Path>,
) -> String {
    if field.overridden {
        return "flag".to_string();
    }

    if let Some(env_key) = field.env_keys.iter().find(|key| env::var_os(key).is_some()) {
        return format!("env ({env_key})");
    }

    if let Some(doc) = config_file_doc {
        if contains_path(doc, field.key) {
            let file_path = config_file_path
                .map(|path| path.display().to_string())
                .unwrap_or_else(|| "config file".to_string());
            return format!("file ({file_path})");
        }
    }

    "default".to_string()
}

fn contains_path(root: &Value, key_path: &str) -> bool {
    let mut current = root;
    for key in key_path.split('.') {
        let Some(next) = current.get(key) else {
            return false;
        };
        current = next;
    }
    true
}

fn render_line(key: &str, value: &str, source: String) -> String {
    format!("- {key} = {value} (source: {source})")
}
