use std::env;
use std::fs;
use std::path::{Path, PathBuf};

use cloudgate_core::{GateConfig, LoadOptions};
use toml::Value;

pub fn run() -> String {
    let config = match GateConfig::load(LoadOptions::default()) {
        Ok(config) => config,
        Err(error) => return format!("config validation failed: {error}"),
    };

    let config_file_path = detect_config_path();
    let config_file_doc = load_config_file_doc(config_file_path.as_deref());
    let doc = config_file_doc.as_ref();
    let file = config_file_path.as_deref();

    let mode = format!("{}", config.safety.mode);
    let format = format!("{:?}", config.logging.format).to_ascii_lowercase();
    let confirmation_categories = config
        .safety
        .require_confirmation_for
        .iter()
        .map(|category| category.as_str())
        .collect::<Vec<_>>()
        .join(",");

    let rows: Vec<(&str, String, Option<&str>)> = vec![
        ("default_region", config.default_region.clone(), Some("CLOUDGATE_DEFAULT_REGION")),
        ("safety.mode", mode, Some("CLOUDGATE_SAFETY_MODE")),
        ("safety.require_confirmation_for", confirmation_categories, None),
        (
            "safety.dry_run_when_available",
            config.safety.dry_run_when_available.to_string(),
            Some("CLOUDGATE_SAFETY_DRY_RUN"),
        ),
        (
            "safety.max_resources_per_operation",
            config.safety.max_resources_per_operation.to_string(),
            Some("CLOUDGATE_SAFETY_MAX_RESOURCES"),
        ),
        (
            "pagination.max_pages",
            config.pagination.max_pages.to_string(),
            Some("CLOUDGATE_PAGINATION_MAX_PAGES"),
        ),
        (
            "pagination.max_items",
            config.pagination.max_items.to_string(),
            Some("CLOUDGATE_PAGINATION_MAX_ITEMS"),
        ),
        (
            "execution.request_timeout_secs",
            config.execution.request_timeout_secs.to_string(),
            Some("CLOUDGATE_REQUEST_TIMEOUT_SECS"),
        ),
        ("context.enabled", config.context.enabled.to_string(), Some("CLOUDGATE_CONTEXT_ENABLED")),
        ("context.capacity", config.context.capacity.to_string(), None),
        ("logging.level", config.logging.level.clone(), Some("CLOUDGATE_LOGGING_LEVEL")),
        ("logging.format", format, Some("CLOUDGATE_LOGGING_FORMAT")),
    ];

    let mut lines = vec!["effective config (source precedence: env > file > default):".to_string()];
    for (key, value, env_var) in rows {
        lines.push(render_line(key, &value, field_source(key, env_var, doc, file)));
    }
    lines.join("\n")
}

fn render_line(key: &str, value: &str, source: String) -> String {
    format!("  {key} = {value}  [{source}]")
}

fn detect_config_path() -> Option<PathBuf> {
    [PathBuf::from("cloudgate.toml"), PathBuf::from("config/cloudgate.toml")]
        .into_iter()
        .find(|path| path.exists())
}

fn load_config_file_doc(path: Option<&Path>) -> Option<Value> {
    let raw = fs::read_to_string(path?).ok()?;
    raw.parse::<Value>().ok()
}

fn field_source(
    key: &str,
    env_var: Option<&str>,
    doc: Option<&Value>,
    path: Option<&Path>,
) -> String {
    if let Some(var) = env_var {
        if env::var(var).map(|value| !value.trim().is_empty()).unwrap_or(false) {
            return format!("env:{var}");
        }
    }

    if let (Some(doc), Some(path)) = (doc, path) {
        let mut node = Some(doc);
        for part in key.split('.') {
            node = node.and_then(|value| value.get(part));
        }
        if node.is_some() {
            return format!("file:{}", path.display());
        }
    }

    "default".to_string()
}
