use std::env;
use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::command::SafetyMode;
use crate::safety::SafetyConfig;

#[derive(Clone, Debug)]
pub struct GateConfig {
    pub default_region: String,
    pub safety: SafetyConfig,
    pub pagination: PaginationConfig,
    pub execution: ExecutionConfig,
    pub context: ContextConfig,
    pub logging: LoggingConfig,
}

#[derive(Clone, Debug)]
pub struct PaginationConfig {
    pub max_pages: usize,
    pub max_items: usize,
}

#[derive(Clone, Debug)]
pub struct ExecutionConfig {
    pub request_timeout_secs: u64,
}

#[derive(Clone, Debug)]
pub struct ContextConfig {
    pub enabled: bool,
    pub capacity: usize,
}

#[derive(Clone, Debug)]
pub struct LoggingConfig {
    pub level: String,
    pub format: LogFormat,
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
    pub default_region: Option<String>,
    pub safety_mode: Option<SafetyMode>,
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

impl Default for GateConfig {
    fn default() -> Self {
        Self {
            default_region: "us-east-1".to_string(),
            safety: SafetyConfig::default(),
            pagination: PaginationConfig { max_pages: 100, max_items: 1000 },
            execution: ExecutionConfig { request_timeout_secs: 60 },
            context: ContextConfig { enabled: true, capacity: 100 },
            logging: LoggingConfig { level: "info".to_string(), format: LogFormat::Compact },
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

fn parse_safety_mode(key: &str, value: &str) -> Result<SafetyMode, ConfigError> {
    value.parse::<SafetyMode>().map_err(|_| ConfigError::InvalidEnvOverride {
        key: key.to_string(),
        value: value.to_string(),
    })
}

impl GateConfig {
    pub fn load(options: LoadOptions) -> Result<Self, ConfigError> {
        let mut config = Self::default();
        let maybe_path = resolve_config_path(options.config_path.as_deref());

        if let Some(path) = maybe_path {
            let patch = read_patch(&path)?;
            config.apply_patch(patch);
        } else if options.require_file {
            let expected = options.config_path.unwrap_or_else(|| PathBuf::from("cloudgate.toml"));
            return Err(ConfigError::MissingConfigFile(expected));
        }

        config.apply_env_overrides()?;
        config.apply_overrides(options.overrides);
        config.validate()?;

        Ok(config)
    }

    fn apply_patch(&mut self, patch: ConfigPatch) {
        if let Some(region) = patch.default_region {
            self.default_region = region;
        }

        if let Some(safety) = patch.safety {
            if let Some(mode) = safety.mode {
                self.safety.mode = mode;
            }
            if let Some(categories) = safety.require_confirmation_for {
                self.safety.require_confirmation_for = categories;
            }
            if let Some(dry_run) = safety.dry_run_when_available {
                self.safety.dry_run_when_available = dry_run;
            }
            if let Some(ceiling) = safety.max_resources_per_operation {
                self.safety.max_resources_per_operation = ceiling;
            }
        }

        if let Some(pagination) = patch.pagination {
            if let Some(max_pages) = pagination.max_pages {
                self.pagination.max_pages = max_pages;
            }
            if let Some(max_items) = pagination.max_items {
                self.pagination.max_items = max_items;
            }
        }

        if let Some(execution) = patch.execution {
            if let Some(timeout) = execution.request_timeout_secs {
                self.execution.request_timeout_secs = timeout;
            }
        }

        if let Some(context) = patch.context {
            if let Some(enabled) = context.enabled {
                self.context.enabled = enabled;
            }
            if let Some(capacity) = context.capacity {
                self.context.capacity = capacity;
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
        if let Some(value) = read_env("CLOUDGATE_DEFAULT_REGION") {
            self.default_region = value;
        }

        if let Some(value) = read_env("CLOUDGATE_SAFETY_MODE") {
            self.safety.mode = parse_safety_mode("CLOUDGATE_SAFETY_MODE", &value)?;
        }
        if let Some(value) = read_env("CLOUDGATE_SAFETY_DRY_RUN") {
            self.safety.dry_run_when_available = parse_bool("CLOUDGATE_SAFETY_DRY_RUN", &value)?;
        }
        if let Some(value) = read_env("CLOUDGATE_SAFETY_MAX_RESOURCES") {
            self.safety.max_resources_per_operation =
                parse_usize("CLOUDGATE_SAFETY_MAX_RESOURCES", &value)?;
        }

        if let Some(value) = read_env("CLOUDGATE_PAGINATION_MAX_PAGES") {
            self.pagination.max_pages = parse_usize("CLOUDGATE_PAGINATION_MAX_PAGES", &value)?;
        }
        if let Some(value) = read_env("CLOUDGATE_PAGINATION_MAX_ITEMS") {
            self.pagination.max_items = parse_usize("CLOUDGATE_PAGINATION_MAX_ITEMS", &value)?;
        }

        if let Some(value) = read_env("CLOUDGATE_REQUEST_TIMEOUT_SECS") {
            self.execution.request_timeout_secs =
                parse_u64("CLOUDGATE_REQUEST_TIMEOUT_SECS", &value)?;
        }

        if let Some(value) = read_env("CLOUDGATE_CONTEXT_ENABLED") {
            self.context.enabled = parse_bool("CLOUDGATE_CONTEXT_ENABLED", &value)?;
        }

        let log_level =
            read_env("CLOUDGATE_LOGGING_LEVEL").or_else(|| read_env("CLOUDGATE_LOG_LEVEL"));
        if let Some(value) = log_level {
            self.logging.level = value;
        }
        let log_format =
            read_env("CLOUDGATE_LOGGING_FORMAT").or_else(|| read_env("CLOUDGATE_LOG_FORMAT"));
        if let Some(value) = log_format {
            self.logging.format = value.parse()?;
        }

        Ok(())
    }

    fn apply_overrides(&mut self, overrides: ConfigOverrides) {
        if let Some(region) = overrides.default_region {
            self.default_region = region;
        }
        if let Some(mode) = overrides.safety_mode {
            self.safety.mode = mode;
        }
        if let Some(level) = overrides.log_level {
            self.logging.level = level;
        }
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.default_region.trim().is_empty() {
            return Err(ConfigError::Validation("default_region must not be empty".to_string()));
        }

        if self.safety.max_resources_per_operation == 0 {
            return Err(ConfigError::Validation(
                "safety.max_resources_per_operation must be greater than zero".to_string(),
            ));
        }

        if self.pagination.max_pages == 0 || self.pagination.max_items == 0 {
            return Err(ConfigError::Validation(
                "pagination.max_pages and pagination.max_items must be greater than zero"
                    .to_string(),
            ));
        }

        if self.execution.request_timeout_secs == 0 || self.execution.request_timeout_secs > 900 {
            return Err(ConfigError::Validation(
                "execution.request_timeout_secs must be in range 1..=900".to_string(),
            ));
        }

        if self.context.enabled && self.context.capacity == 0 {
            return Err(ConfigError::Validation(
                "context.capacity must be greater than zero when context is enabled".to_string(),
            ));
        }

        let level = self.logging.level.trim().to_ascii_lowercase();
        match level.as_str() {
            "trace" | "debug" | "info" | "warn" | "error" => Ok(()),
            _ => Err(ConfigError::Validation(
                "logging.level must be one of trace|debug|info|warn|error".to_string(),
            )),
        }
    }
}

fn resolve_config_path(explicit_path: Option<&Path>) -> Option<PathBuf> {
    if let Some(path) = explicit_path {
        return path.exists().then_some(path.to_path_buf());
    }

    [PathBuf::from("cloudgate.toml"), PathBuf::from("config/cloudgate.toml")]
        .into_iter()
        .find(|path| path.exists())
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

fn read_env(key: &str) -> Option<String> {
    env::var(key).ok().filter(|value| !value.trim().is_empty())
}

fn parse_u64(key: &str, value: &str) -> Result<u64, ConfigError> {
    value.parse::<u64>().map_err(|_| ConfigError::InvalidEnvOverride {
        key: key.to_string(),
        value: value.to_string(),
    })
}

fn parse_usize(key: &str, value: &str) -> Result<usize, ConfigError> {
    value.parse::<usize>().map_err(|_| ConfigError::InvalidEnvOverride {
        key: key.to_string(),
        value: value.to_string(),
    })
}

fn parse_bool(key: &str, value: &str) -> Result<bool, ConfigError> {
    value.parse::<bool>().map_err(|_| ConfigError::InvalidEnvOverride {
        key: key.to_string(),
        value: value.to_string(),
    })
}

#[derive(Debug, Default, Deserialize)]
struct ConfigPatch {
    default_region: Option<String>,
    safety: Option<SafetyPatch>,
    pagination: Option<PaginationPatch>,
    execution: Option<ExecutionPatch>,
    context: Option<ContextPatch>,
    logging: Option<LoggingPatch>,
}

#[derive(Debug, Default, Deserialize)]
struct SafetyPatch {
    mode: Option<SafetyMode>,
    require_confirmation_for: Option<Vec<crate::command::OperationCategory>>,
    dry_run_when_available: Option<bool>,
    max_resources_per_operation: Option<usize>,
}

#[derive(Debug, Default, Deserialize)]
struct PaginationPatch {
    max_pages: Option<usize>,
    max_items: Option<usize>,
}

#[derive(Debug, Default, Deserialize)]
struct ExecutionPatch {
    request_timeout_secs: Option<u64>,
}

#[derive(Debug, Default, Deserialize)]
struct ContextPatch {
    enabled: Option<bool>,
    capacity: Option<usize>,
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

    use tempfile::TempDir;

    use super::{ConfigError, ConfigOverrides, GateConfig, LoadOptions, LogFormat};
    use crate::command::SafetyMode;

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
    fn defaults_are_conservative() -> Result<(), String> {
        let _guard = env_lock().lock().map_err(|_| "env lock is poisoned".to_string())?;

        let config = GateConfig::load(LoadOptions::default())
            .map_err(|err| format!("config load failed: {err}"))?;
        ensure(config.safety.mode == SafetyMode::ReadOnly, "default mode should be read-only")?;
        ensure(config.pagination.max_items == 1000, "default item ceiling should be 1000")?;
        ensure(config.safety.max_resources_per_operation == 50, "default blast radius is 50")
    }

    #[test]
    fn file_load_supports_env_interpolation() -> Result<(), String> {
        let _guard = env_lock().lock().map_err(|_| "env lock is poisoned".to_string())?;

        env::set_var("TEST_GATE_REGION", "eu-west-1");

        let result = (|| -> Result<(), String> {
            let dir = TempDir::new().map_err(|err: io::Error| err.to_string())?;
            let path = dir.path().join("cloudgate.toml");
            fs::write(
                &path,
                r#"
default_region = "${TEST_GATE_REGION}"

[safety]
mode = "standard"
"#,
            )
            .map_err(|err| err.to_string())?;

            let config =
                GateConfig::load(LoadOptions { config_path: Some(path), ..LoadOptions::default() })
                    .map_err(|err| format!("config load failed: {err}"))?;

            ensure(config.default_region == "eu-west-1", "region should come from environment")?;
            ensure(config.safety.mode == SafetyMode::Standard, "mode should come from file")
        })();

        clear_vars(&["TEST_GATE_REGION"]);
        result
    }

    #[test]
    fn precedence_defaults_file_env_overrides() -> Result<(), String> {
        let _guard = env_lock().lock().map_err(|_| "env lock is poisoned".to_string())?;

        env::set_var("CLOUDGATE_DEFAULT_REGION", "ap-southeast-2");
        env::set_var("CLOUDGATE_LOG_FORMAT", "pretty");

        let result = (|| -> Result<(), String> {
            let dir = TempDir::new().map_err(|err: io::Error| err.to_string())?;
            let path = dir.path().join("cloudgate.toml");
            fs::write(
                &path,
                r#"
default_region = "us-west-2"

[logging]
level = "warn"
"#,
            )
            .map_err(|err| err.to_string())?;

            let config = GateConfig::load(LoadOptions {
                config_path: Some(path),
                overrides: ConfigOverrides {
                    log_level: Some("debug".to_string()),
                    ..ConfigOverrides::default()
                },
                ..LoadOptions::default()
            })
            .map_err(|err| format!("config load failed: {err}"))?;

            ensure(
                config.default_region == "ap-southeast-2",
                "env region should win over the file",
            )?;
            ensure(config.logging.level == "debug", "explicit override should win over file")?;
            ensure(
                matches!(config.logging.format, LogFormat::Pretty),
                "log format should come from env",
            )
        })();

        clear_vars(&["CLOUDGATE_DEFAULT_REGION", "CLOUDGATE_LOG_FORMAT"]);
        result
    }

    #[test]
    fn invalid_env_value_is_rejected() -> Result<(), String> {
        let _guard = env_lock().lock().map_err(|_| "env lock is poisoned".to_string())?;

        env::set_var("CLOUDGATE_SAFETY_MODE", "yolo");

        let result = (|| -> Result<(), String> {
            let error = match GateConfig::load(LoadOptions::default()) {
                Ok(_) => return Err("expected load failure for bad mode".to_string()),
                Err(error) => error,
            };
            let matches = matches!(
                error,
                ConfigError::InvalidEnvOverride { ref key, .. } if key == "CLOUDGATE_SAFETY_MODE"
            );
            ensure(matches, "bad safety mode should report the env key")
        })();

        clear_vars(&["CLOUDGATE_SAFETY_MODE"]);
        result
    }

    #[test]
    fn validation_rejects_zero_ceilings() -> Result<(), String> {
        let _guard = env_lock().lock().map_err(|_| "env lock is poisoned".to_string())?;

        let mut config = GateConfig::default();
        config.pagination.max_items = 0;
        let error = match config.validate() {
            Ok(()) => return Err("expected validation failure".to_string()),
            Err(error) => error,
        };
        ensure(
            matches!(error, ConfigError::Validation(ref message) if message.contains("pagination")),
            "validation error should name the pagination section",
        )
    }
}
