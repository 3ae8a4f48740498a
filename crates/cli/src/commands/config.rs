use std::env;
use std::fs;
use std::path::{Path, PathBuf};

use secrecy::ExposeSecret;
use tanya_core::config::{AppConfig, LoadOptions};
use toml::Value;

pub fn run() -> String {
    let config = match AppConfig::load(LoadOptions::default()) {
        Ok(config) => config,
        Err(error) => return format!("config validation failed: {error}"),
    };

    let config_file_path = detect_config_path();
    let config_file_doc = load_config_file_doc(config_file_path.as_deref());
    let source = |key_path: &str, env_key: &str| {
        field_source(key_path, env_key, config_file_doc.as_ref(), config_file_path.as_deref())
    };

    let mut lines = vec!["effective config (source precedence: env > file > default):".to_string()];
    for (key_path, env_key, value) in effective_values(&config) {
        lines.push(render_line(key_path, &value, source(key_path, env_key)));
    }

    lines.join("\n")
}

fn effective_values(config: &AppConfig) -> Vec<(&'static str, &'static str, String)> {
    vec![
        ("erp.base_url", "TANYA_ERP_BASE_URL", config.erp.base_url.clone()),
        (
            "erp.bearer_token",
            "TANYA_ERP_BEARER_TOKEN",
            redact_token(config.erp.bearer_token.expose_secret()),
        ),
        ("erp.tenant", "TANYA_ERP_TENANT", or_unset(&config.erp.tenant)),
        ("erp.timeout_secs", "TANYA_ERP_TIMEOUT_SECS", config.erp.timeout_secs.to_string()),
        ("erp.max_retries", "TANYA_ERP_MAX_RETRIES", config.erp.max_retries.to_string()),
        ("llm.api_url", "TANYA_LLM_API_URL", config.llm.api_url.clone()),
        (
            "llm.api_key",
            "TANYA_LLM_API_KEY",
            config
                .llm
                .api_key
                .as_ref()
                .map(|key| redact_token(key.expose_secret()))
                .unwrap_or_else(|| "<unset>".to_string()),
        ),
        ("llm.model", "TANYA_LLM_MODEL", config.llm.model.clone()),
        ("llm.max_tokens", "TANYA_LLM_MAX_TOKENS", config.llm.max_tokens.to_string()),
        ("llm.timeout_secs", "TANYA_LLM_TIMEOUT_SECS", config.llm.timeout_secs.to_string()),
        ("llm.max_retries", "TANYA_LLM_MAX_RETRIES", config.llm.max_retries.to_string()),
        (
            "vision.api_url",
            "TANYA_VISION_API_URL",
            config.vision.api_url.clone().unwrap_or_else(|| "<unset>".to_string()),
        ),
        (
            "vision.api_key",
            "TANYA_VISION_API_KEY",
            if config.vision.api_key.is_some() { "<redacted>" } else { "<unset>" }.to_string(),
        ),
        ("vision.model", "TANYA_VISION_MODEL", config.vision.model.clone()),
        ("vision.max_tokens", "TANYA_VISION_MAX_TOKENS", config.vision.max_tokens.to_string()),
        (
            "vision.timeout_secs",
            "TANYA_VISION_TIMEOUT_SECS",
            config.vision.timeout_secs.to_string(),
        ),
        ("server.bind_address", "TANYA_SERVER_BIND_ADDRESS", config.server.bind_address.clone()),
        ("server.port", "TANYA_SERVER_PORT", config.server.port.to_string()),
        ("server.webhook_url", "TANYA_SERVER_WEBHOOK_URL", config.server.webhook_url.clone()),
        (
            "server.index_path",
            "TANYA_SERVER_INDEX_PATH",
            config.server.index_path.display().to_string(),
        ),
        ("logging.level", "TANYA_LOGGING_LEVEL", config.logging.level.clone()),
        ("logging.format", "TANYA_LOGGING_FORMAT", format!("{:?}", config.logging.format)),
    ]
}

fn detect_config_path() -> Option<PathBuf> {
    [PathBuf::from("tanya.toml"), PathBuf::from("config/tanya.toml")]
        .into_iter()
        .find(|path| path.exists())
}

fn load_config_file_doc(path: Option<&Path>) -> Option<Value> {
    let raw = fs::read_to_string(path?).ok()?;
    raw.parse::<Value>().ok()
}

fn field_source(
    key_path: &str,
    env_key: &str,
    config_file_doc: Option<&Value>,
    config_file_path: Option<&Path>,
) -> String {
    if env::var_os(env_key).is_some() {
        return format!("env ({env_key})");
    }

    if let Some(doc) = config_file_doc {
        if contains_path(doc, key_path) {
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

fn or_unset(value: &str) -> String {
    if value.trim().is_empty() {
        "<unset>".to_string()
    } else {
        value.to_string()
    }
}

/// Keeps a short prefix of provider keys (`sk-`) and hides the rest.
pub fn redact_token(token: &str) -> String {
    let trimmed = token.trim();
    if trimmed.is_empty() {
        return "<empty>".to_string();
    }

    if let Some((prefix, _)) = trimmed.split_once('-') {
        if prefix.len() <= 4 {
            return format!("{prefix}-***");
        }
    }

    "<redacted>".to_string()
}
