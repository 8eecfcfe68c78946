use std::env;
use std::fs;
use std::path::{Path, PathBuf};

use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use thiserror::Error;

pub const DEFAULT_CONFIG_PATHS: [&str; 2] = ["aether.toml", "config/aether.toml"];

#[derive(Clone, Debug)]
pub struct AppConfig {
    pub dialogue: DialogueConfig,
    pub session: SessionConfig,
    pub logging: LoggingConfig,
}

#[derive(Clone, Debug)]
pub struct DialogueConfig {
    pub engine: DialogueEngineKind,
    pub api_key: Option<SecretString>,
    pub base_url: Option<String>,
    pub model: String,
    pub timeout_secs: u64,
    pub max_tool_rounds: u32,
}

/// Opaque identity passed through to the dialogue engine.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SessionConfig {
    pub app_name: String,
    pub user_id: String,
    pub session_id: String,
}

#[derive(Clone, Debug)]
pub struct LoggingConfig {
    pub level: String,
    pub format: LogFormat,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DialogueEngineKind {
    Offline,
    #[serde(alias = "openai")]
    OpenAi,
    Ollama,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LogFormat {
    Compact,
    Pretty,
    Json,
}

#[derive(Clone, Debug, Default)]
pub struct ConfigOverrides {
    pub dialogue_engine: Option<DialogueEngineKind>,
    pub dialogue_model: Option<String>,
    pub dialogue_base_url: Option<String>,
    pub dialogue_api_key: Option<String>,
    pub session_user_id: Option<String>,
    pub session_id: Option<String>,
    pub log_level: Option<String>,
}

#[derive(Clone, Debug, Default)]
pub struct LoadOptions {
    pub config_path: Option<PathBuf>,
    pub require_file: bool,
    pub overrides: ConfigOverrides,
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("could not read config file `{path}`: {source}")]
    ReadFile { path: PathBuf, source: std::io::Error },
    #[error("could not parse config file `{path}`: {source}")]
    ParseFile { path: PathBuf, source: toml::de::Error },
    #[error("required config file was not found: `{0}`")]
    MissingConfigFile(PathBuf),
    #[error("environment variable interpolation failed for `{var}`")]
    MissingEnvInterpolation { var: String },
    #[error("unterminated environment interpolation expression")]
    UnterminatedInterpolation,
    #[error("invalid environment override for `{key}`: `{value}`")]
    InvalidEnvOverride { key: String, value: String },
    #[error("configuration validation failed: {0}")]
    Validation(String),
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            dialogue: DialogueConfig {
                engine: DialogueEngineKind::Offline,
                api_key: None,
                base_url: None,
                model: "gemini-1.5-flash".to_string(),
                timeout_secs: 60,
                max_tool_rounds: 4,
            },
            session: SessionConfig {
                app_name: "aether_insurance_app".to_string(),
                user_id: "cli_user".to_string(),
                session_id: "default_session".to_string(),
            },
            logging: LoggingConfig { level: "warn".to_string(), format: LogFormat::Compact },
        }
    }
}

fn secret_value(value: String) -> SecretString {
    value.into()
}

impl std::str::FromStr for DialogueEngineKind {
    type Err = ConfigError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "offline" => Ok(Self::Offline),
            "openai" | "open_ai" => Ok(Self::OpenAi),
            "ollama" => Ok(Self::Ollama),
            other => Err(ConfigError::Validation(format!(
                "unsupported dialogue engine `{other}` (expected offline|openai|ollama)"
            ))),
        }
    }
}

impl std::str::FromStr for LogFormat {
    type Err = ConfigError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "compact" => Ok(Self::Compact),
            "pretty" => Ok(Self::Pretty),
            "json" => Ok(Self::Json),
            other => Err(ConfigError::Validation(format!(
                "unsupported log format `{other}` (expected compact|pretty|json)"
            ))),
        }
    }
}

impl AppConfig {
    pub fn load(options: LoadOptions) -> Result<Self, ConfigError> {
        let mut config = Self::default();
        let maybe_path = resolve_config_path(options.config_path.as_deref());

        if let Some(path) = maybe_path {
            let patch = read_patch(&path)?;
            config.apply_patch(patch);
        } else if options.require_file {
            let expected = options.config_path.unwrap_or_else(|| PathBuf::from("aether.toml"));
            return Err(ConfigError::MissingConfigFile(expected));
        }

        config.apply_env_overrides()?;
        config.apply_overrides(options.overrides);
        config.validate()?;

        Ok(config)
    }

    fn apply_patch(&mut self, patch: ConfigPatch) {
        if let Some(dialogue) = patch.dialogue {
            if let Some(engine) = dialogue.engine {
                self.dialogue.engine = engine;
            }
            if let Some(api_key_value) = dialogue.api_key {
                self.dialogue.api_key = Some(secret_value(api_key_value));
            }
            if let Some(base_url) = dialogue.base_url {
                self.dialogue.base_url = Some(base_url);
            }
            if let Some(model) = dialogue.model {
                self.dialogue.model = model;
            }
            if let Some(timeout_secs) = dialogue.timeout_secs {
                self.dialogue.timeout_secs = timeout_secs;
            }
            if let Some(max_tool_rounds) = dialogue.max_tool_rounds {
                self.dialogue.max_tool_rounds = max_tool_rounds;
            }
        }

        if let Some(session) = patch.session {
            if let Some(app_name) = session.app_name {
                self.session.app_name = app_name;
            }
            if let Some(user_id) = session.user_id {
                self.session.user_id = user_id;
            }
            if let Some(session_id) = session.session_id {
                self.session.session_id = session_id;
            }
        }

        if let Some(logging) = patch.logging {
            if let Some(level) = logging.level {
                self.logging.level = level;
            }
            if let Some(format) = logging.format {
                self.logging.format = format;
            }
        }
    }

    fn apply_env_overrides(&mut self) -> Result<(), ConfigError> {
        if let Some(value) = read_env("AETHER_DIALOGUE_ENGINE") {
            self.dialogue.engine = value.parse()?;
        }
        if let Some(value) = read_env("AETHER_DIALOGUE_API_KEY") {
            self.dialogue.api_key = Some(secret_value(value));
        }
        if let Some(value) = read_env("AETHER_DIALOGUE_BASE_URL") {
            self.dialogue.base_url = Some(value);
        }
        if let Some(value) = read_env("AETHER_DIALOGUE_MODEL") {
            self.dialogue.model = value;
        }
        if let Some(value) = read_env("AETHER_DIALOGUE_TIMEOUT_SECS") {
            self.dialogue.timeout_secs = parse_u64("AETHER_DIALOGUE_TIMEOUT_SECS", &value)?;
        }
        if let Some(value) = read_env("AETHER_DIALOGUE_MAX_TOOL_ROUNDS") {
            self.dialogue.max_tool_rounds = parse_u32("AETHER_DIALOGUE_MAX_TOOL_ROUNDS", &value)?;
        }

        if let Some(value) = read_env("AETHER_SESSION_APP_NAME") {
            self.session.app_name = value;
        }
        if let Some(value) = read_env("AETHER_SESSION_USER_ID") {
            self.session.user_id = value;
        }
        if let Some(value) = read_env("AETHER_SESSION_ID") {
            self.session.session_id = value;
        }

        let log_level = read_env("AETHER_LOGGING_LEVEL").or_else(|| read_env("AETHER_LOG_LEVEL"));
        if let Some(value) = log_level {
            self.logging.level = value;
        }
        let log_format =
            read_env("AETHER_LOGGING_FORMAT").or_else(|| read_env("AETHER_LOG_FORMAT"));
        if let Some(value) = log_format {
            self.logging.format = value.parse()?;
        }

        Ok(())
    }

    fn apply_overrides(&mut self, overrides: ConfigOverrides) {
        if let Some(engine) = overrides.dialogue_engine {
            self.dialogue.engine = engine;
        }
        if let Some(model) = overrides.dialogue_model {
            self.dialogue.model = model;
        }
        if let Some(base_url) = overrides.dialogue_base_url {
            self.dialogue.base_url = Some(base_url);
        }
        if let Some(api_key) = overrides.dialogue_api_key {
            self.dialogue.api_key = Some(secret_value(api_key));
        }
        if let Some(user_id) = overrides.session_user_id {
            self.session.user_id = user_id;
        }
        if let Some(session_id) = overrides.session_id {
            self.session.session_id = session_id;
        }
        if let Some(log_level) = overrides.log_level {
            self.logging.level = log_level;
        }
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        validate_dialogue(&self.dialogue)?;
        validate_session(&self.session)?;
        validate_logging(&self.logging)?;
        Ok(())
    }
}

/// Returns the first config file that exists, honoring an explicit path.
pub fn resolve_config_path(explicit_path: Option<&Path>) -> Option<PathBuf> {
    if let Some(path) = explicit_path {
        return path.exists().then_some(path.to_path_buf());
    }

    DEFAULT_CONFIG_PATHS.into_iter().map(PathBuf::from).find(|path| path.exists())
}

fn read_patch(path: &Path) -> Result<ConfigPatch, ConfigError> {
    let raw = fs::read_to_string(path)
        .map_err(|source| ConfigError::ReadFile { path: path.to_path_buf(), source })?;

    let interpolated = interpolate_env_vars(&raw)?;
    toml::from_str::<ConfigPatch>(&interpolated)
        .map_err(|source| ConfigError::ParseFile { path: path.to_path_buf(), source })
}

fn interpolate_env_vars(input: &str) -> Result<String, ConfigError> {
    let mut output = String::with_capacity(input.len());
    let mut chars = input.chars().peekable();

    while let Some(ch) = chars.next() {
        if ch == '$' && matches!(chars.peek(), Some('{')) {
            chars.next();
            let mut key = String::new();

            loop {
                match chars.next() {
                    Some('}') => break,
                    Some(next) => key.push(next),
                    None => return Err(ConfigError::UnterminatedInterpolation),
                }
            }

            let value = env::var(&key)
                .map_err(|_| ConfigError::MissingEnvInterpolation { var: key.clone() })?;
            output.push_str(&value);
            continue;
        }

        output.push(ch);
    }

    Ok(output)
}

fn validate_dialogue(dialogue: &DialogueConfig) -> Result<(), ConfigError> {
    if dialogue.timeout_secs == 0 || dialogue.timeout_secs > 300 {
        return Err(ConfigError::Validation(
            "dialogue.timeout_secs must be in range 1..=300".to_string(),
        ));
    }

    if dialogue.max_tool_rounds == 0 || dialogue.max_tool_rounds > 8 {
        return Err(ConfigError::Validation(
            "dialogue.max_tool_rounds must be in range 1..=8".to_string(),
        ));
    }

    if dialogue.model.trim().is_empty() {
        return Err(ConfigError::Validation("dialogue.model must not be empty".to_string()));
    }

    let base_url_missing =
        dialogue.base_url.as_ref().map(|value| value.trim().is_empty()).unwrap_or(true);

    match dialogue.engine {
        DialogueEngineKind::Offline => {}
        DialogueEngineKind::OpenAi => {
            let key_missing = dialogue
                .api_key
                .as_ref()
                .map(|value| value.expose_secret().trim().is_empty())
                .unwrap_or(true);
            if key_missing {
                return Err(ConfigError::Validation(
                    "dialogue.api_key is required for the openai engine".to_string(),
                ));
            }
            if base_url_missing {
                return Err(ConfigError::Validation(
                    "dialogue.base_url is required for the openai engine".to_string(),
                ));
            }
        }
        DialogueEngineKind::Ollama => {
            if base_url_missing {
                return Err(ConfigError::Validation(
                    "dialogue.base_url is required for the ollama engine".to_string(),
                ));
            }
        }
    }

    if let Some(base_url) = &dialogue.base_url {
        if !base_url.starts_with("http://") && !base_url.starts_with("https://") {
            return Err(ConfigError::Validation(
                "dialogue.base_url must start with http:// or https://".to_string(),
            ));
        }
    }

    Ok(())
}

fn validate_session(session: &SessionConfig) -> Result<(), ConfigError> {
    for (key, value) in [
        ("session.app_name", &session.app_name),
        ("session.user_id", &session.user_id),
        ("session.session_id", &session.session_id),
    ] {
        if value.trim().is_empty() {
            return Err(ConfigError::Validation(format!("{key} must not be empty")));
        }
    }
    Ok(())
}

fn validate_logging(logging: &LoggingConfig) -> Result<(), ConfigError> {
    let level = logging.level.trim().to_ascii_lowercase();
    match level.as_str() {
        "trace" | "debug" | "info" | "warn" | "error" => Ok(()),
        _ => Err(ConfigError::Validation(
            "logging.level must be one of trace|debug|info|warn|error".to_string(),
        )),
    }
}

fn read_env(key: &str) -> Option<String> {
    env::var(key).ok().filter(|value| !value.trim().is_empty())
}

fn parse_u32(key: &str, value: &str) -> Result<u32, ConfigError> {
    value.parse::<u32>().map_err(|_| ConfigError::InvalidEnvOverride {
        key: key.to_string(),
        value: value.to_string(),
    })
}

fn parse_u64(key: &str, value: &str) -> Result<u64, ConfigError> {
    value.parse::<u64>().map_err(|_| ConfigError::InvalidEnvOverride {
        key: key.to_string(),
        value: value.to_string(),
    })
}

#[derive(Debug, Default, Deserialize)]
struct ConfigPatch {
    dialogue: Option<DialoguePatch>,
    session: Option<SessionPatch>,
    logging: Option<LoggingPatch>,
}

#[derive(Debug, Default, Deserialize)]
struct DialoguePatch {
    engine: Option<DialogueEngineKind>,
    api_key: Option<String>,
    base_url: Option<String>,
    model: Option<String>,
    timeout_secs: Option<u64>,
    max_tool_rounds: Option<u32>,
}

#[derive(Debug, Default, Deserialize)]
struct SessionPatch {
    app_name: Option<String>,
    user_id: Option<String>,
    session_id: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
struct LoggingPatch {
    level: Option<String>,
    format: Option<LogFormat>,
}

#[cfg(test)]
mod tests {
    use std::env;
    use std::fs;
    use std::io;
    use std::sync::{Mutex, OnceLock};

    use secrecy::ExposeSecret;
    use tempfile::TempDir;

    use super::{
        AppConfig, ConfigError, ConfigOverrides, DialogueEngineKind, LoadOptions, LogFormat,
    };

    static ENV_LOCK: OnceLock<Mutex<()>> = OnceLock::new();

    fn env_lock() -> &'static Mutex<()> {
        ENV_LOCK.get_or_init(|| Mutex::new(()))
    }

    fn clear_vars(vars: &[&str]) {
        for var in vars {
            env::remove_var(var);
        }
    }

    fn ensure(condition: bool, message: &'static str) -> Result<(), String> {
        if condition {
            Ok(())
        } else {
            Err(message.to_string())
        }
    }

    #[test]
    fn defaults_select_offline_engine_and_original_session_identity() -> Result<(), String> {
        let _guard = env_lock().lock().map_err(|_| "env lock is poisoned".to_string())?;

        let config = AppConfig::load(LoadOptions::default())
            .map_err(|err| format!("config load failed: {err}"))?;

        ensure(config.dialogue.engine == DialogueEngineKind::Offline, "offline engine by default")?;
        ensure(config.session.app_name == "aether_insurance_app", "default app name")?;
        ensure(config.session.session_id == "default_session", "default session id")?;
        ensure(matches!(config.logging.format, LogFormat::Compact), "compact logs by default")
    }

    #[test]
    fn file_load_supports_env_interpolation() -> Result<(), String> {
        let _guard = env_lock().lock().map_err(|_| "env lock is poisoned".to_string())?;

        env::set_var("TEST_AETHER_API_KEY", "sk-from-env");

        let result = (|| -> Result<(), String> {
            let dir = TempDir::new().map_err(|err: io::Error| err.to_string())?;
            let path = dir.path().join("aether.toml");
            fs::write(
                &path,
                r#"
[dialogue]
engine = "open_ai"
base_url = "https://api.example.test/v1"
api_key = "${TEST_AETHER_API_KEY}"
model = "gpt-4o-mini"
"#,
            )
            .map_err(|err| err.to_string())?;

            let config =
                AppConfig::load(LoadOptions { config_path: Some(path), ..LoadOptions::default() })
                    .map_err(|err| format!("config load failed: {err}"))?;

            ensure(config.dialogue.engine == DialogueEngineKind::OpenAi, "engine from file")?;
            ensure(
                config.dialogue.api_key.as_ref().map(|key| key.expose_secret().to_string())
                    == Some("sk-from-env".to_string()),
                "api key should be interpolated from environment",
            )?;
            ensure(config.dialogue.model == "gpt-4o-mini", "model from file")?;
            Ok(())
        })();

        clear_vars(&["TEST_AETHER_API_KEY"]);
        result
    }

    #[test]
    fn missing_interpolation_variable_is_reported() -> Result<(), String> {
        let _guard = env_lock().lock().map_err(|_| "env lock is poisoned".to_string())?;

        let dir = TempDir::new().map_err(|err: io::Error| err.to_string())?;
        let path = dir.path().join("aether.toml");
        fs::write(&path, "[session]\nuser_id = \"${AETHER_TEST_UNSET_VAR}\"\n")
            .map_err(|err| err.to_string())?;

        let error =
            match AppConfig::load(LoadOptions { config_path: Some(path), ..LoadOptions::default() })
            {
                Ok(_) => return Err("expected interpolation failure".to_string()),
                Err(error) => error,
            };
        ensure(
            matches!(error, ConfigError::MissingEnvInterpolation { ref var } if var == "AETHER_TEST_UNSET_VAR"),
            "interpolation failure should name the variable",
        )
    }

    #[test]
    fn logging_env_aliases_are_supported() -> Result<(), String> {
        let _guard = env_lock().lock().map_err(|_| "env lock is poisoned".to_string())?;

        env::set_var("AETHER_LOG_LEVEL", "debug");
        env::set_var("AETHER_LOG_FORMAT", "json");

        let result = (|| -> Result<(), String> {
            let config = AppConfig::load(LoadOptions::default())
                .map_err(|err| format!("config load failed: {err}"))?;

            ensure(config.logging.level == "debug", "debug log level should be set from env var")?;
            ensure(
                matches!(config.logging.format, LogFormat::Json),
                "json logging format should be set from env var",
            )?;
            Ok(())
        })();

        clear_vars(&["AETHER_LOG_LEVEL", "AETHER_LOG_FORMAT"]);
        result
    }

    #[test]
    fn precedence_defaults_file_env_overrides() -> Result<(), String> {
        let _guard = env_lock().lock().map_err(|_| "env lock is poisoned".to_string())?;

        env::set_var("AETHER_SESSION_USER_ID", "user-from-env");
        env::set_var("AETHER_SESSION_ID", "session-from-env");

        let result = (|| -> Result<(), String> {
            let dir = TempDir::new().map_err(|err: io::Error| err.to_string())?;
            let path = dir.path().join("aether.toml");
            fs::write(
                &path,
                r#"
[session]
app_name = "app-from-file"
user_id = "user-from-file"
session_id = "session-from-file"

[logging]
level = "warn"
"#,
            )
            .map_err(|err| err.to_string())?;

            let config = AppConfig::load(LoadOptions {
                config_path: Some(path),
                overrides: ConfigOverrides {
                    session_id: Some("session-from-override".to_string()),
                    log_level: Some("info".to_string()),
                    ..ConfigOverrides::default()
                },
                ..LoadOptions::default()
            })
            .map_err(|err| format!("config load failed: {err}"))?;

            ensure(config.session.app_name == "app-from-file", "file should beat defaults")?;
            ensure(config.session.user_id == "user-from-env", "env should beat file")?;
            ensure(
                config.session.session_id == "session-from-override",
                "override should beat env",
            )?;
            ensure(config.logging.level == "info", "overridden log level should be info")?;
            Ok(())
        })();

        clear_vars(&["AETHER_SESSION_USER_ID", "AETHER_SESSION_ID"]);
        result
    }

    #[test]
    fn validation_fails_fast_with_actionable_error() -> Result<(), String> {
        let _guard = env_lock().lock().map_err(|_| "env lock is poisoned".to_string())?;

        env::set_var("AETHER_DIALOGUE_ENGINE", "openai");
        env::set_var("AETHER_DIALOGUE_BASE_URL", "https://api.example.test/v1");

        let result = (|| -> Result<(), String> {
            let error = match AppConfig::load(LoadOptions::default()) {
                Ok(_) => {
                    return Err("expected validation failure but config load succeeded".to_string())
                }
                Err(error) => error,
            };
            let has_message = matches!(
                error,
                ConfigError::Validation(ref message) if message.contains("dialogue.api_key")
            );
            ensure(has_message, "validation failure should mention dialogue.api_key")
        })();

        clear_vars(&["AETHER_DIALOGUE_ENGINE", "AETHER_DIALOGUE_BASE_URL"]);
        result
    }

    #[test]
    fn invalid_numeric_env_override_is_rejected() -> Result<(), String> {
        let _guard = env_lock().lock().map_err(|_| "env lock is poisoned".to_string())?;

        env::set_var("AETHER_DIALOGUE_TIMEOUT_SECS", "soon");

        let result = match AppConfig::load(LoadOptions::default()) {
            Ok(_) => Err("expected invalid override failure".to_string()),
            Err(error) => ensure(
                matches!(error, ConfigError::InvalidEnvOverride { ref key, .. } if key == "AETHER_DIALOGUE_TIMEOUT_SECS"),
                "override failure should name the variable",
            ),
        };

        clear_vars(&["AETHER_DIALOGUE_TIMEOUT_SECS"]);
        result
    }

    #[test]
    fn secret_values_are_not_leaked_by_debug() -> Result<(), String> {
        let _guard = env_lock().lock().map_err(|_| "env lock is poisoned".to_string())?;

        env::set_var("AETHER_DIALOGUE_API_KEY", "sk-secret-value");

        let result = (|| -> Result<(), String> {
            let config = AppConfig::load(LoadOptions::default())
                .map_err(|err| format!("config load failed: {err}"))?;
            let debug = format!("{config:?}");

            ensure(!debug.contains("sk-secret-value"), "debug output should not contain api key")
        })();

        clear_vars(&["AETHER_DIALOGUE_API_KEY"]);
        result
    }
}
