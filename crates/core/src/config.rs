use std::env;
use std::fs;
use std::path::{Path, PathBuf};

use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use thiserror::Error;

pub const DEFAULT_ERP_BASE_URL: &str = "https://go.zahironline.com/api/v2";

#[derive(Clone, Debug)]
pub struct AppConfig {
    pub erp: ErpConfig,
    pub llm: LlmConfig,
    pub vision: VisionConfig,
    pub server: ServerConfig,
    pub logging: LoggingConfig,
}

#[derive(Clone, Debug)]
pub struct ErpConfig {
    pub base_url: String,
    pub bearer_token: SecretString,
    pub tenant: String,
    pub timeout_secs: u64,
    pub max_retries: u32,
}

#[derive(Clone, Debug)]
pub struct LlmConfig {
    pub api_url: String,
    pub api_key: Option<SecretString>,
    pub model: String,
    pub max_tokens: u32,
    pub timeout_secs: u64,
    pub max_retries: u32,
}

/// Vision-capable model endpoint. Image requests fail when this is not configured.
#[derive(Clone, Debug)]
pub struct VisionConfig {
    pub api_url: Option<String>,
    pub api_key: Option<SecretString>,
    pub model: String,
    pub max_tokens: u32,
    pub timeout_secs: u64,
}

#[derive(Clone, Debug)]
pub struct ServerConfig {
    pub bind_address: String,
    pub port: u16,
    pub webhook_url: String,
    pub index_path: PathBuf,
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
    pub erp_base_url: Option<String>,
    pub erp_bearer_token: Option<String>,
    pub erp_tenant: Option<String>,
    pub llm_api_url: Option<String>,
    pub llm_api_key: Option<String>,
    pub llm_model: Option<String>,
    pub server_port: Option<u16>,
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
            erp: ErpConfig {
                base_url: DEFAULT_ERP_BASE_URL.to_string(),
                bearer_token: String::new().into(),
                tenant: String::new(),
                timeout_secs: 30,
                max_retries: 2,
            },
            llm: LlmConfig {
                api_url: "https://api.openai.com/v1/chat/completions".to_string(),
                api_key: None,
                model: "gpt-4o-mini".to_string(),
                max_tokens: 3500,
                timeout_secs: 60,
                max_retries: 2,
            },
            vision: VisionConfig {
                api_url: None,
                api_key: None,
                model: "gpt-4o".to_string(),
                max_tokens: 3500,
                timeout_secs: 120,
            },
            server: ServerConfig {
                bind_address: "127.0.0.1".to_string(),
                port: 8991,
                webhook_url: "http://127.0.0.1:8991/webhook".to_string(),
                index_path: PathBuf::from("static/index.html"),
            },
            logging: LoggingConfig { level: "info".to_string(), format: LogFormat::Compact },
        }
    }
}

impl ErpConfig {
    /// Both a default token and tenant are set, so requests may omit credentials.
    pub fn has_default_credentials(&self) -> bool {
        !self.bearer_token.expose_secret().trim().is_empty() && !self.tenant.trim().is_empty()
    }
}

impl VisionConfig {
    pub fn is_configured(&self) -> bool {
        let has_url = self.api_url.as_ref().is_some_and(|url| !url.trim().is_empty());
        let has_key =
            self.api_key.as_ref().is_some_and(|key| !key.expose_secret().trim().is_empty());
        has_url && has_key
    }
}

fn secret_value(value: String) -> SecretString {
    value.into()
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
            let expected = options.config_path.unwrap_or_else(|| PathBuf::from("tanya.toml"));
            return Err(ConfigError::MissingConfigFile(expected));
        }

        config.apply_env_overrides()?;
        config.apply_overrides(options.overrides);
        config.validate()?;

        Ok(config)
    }

    fn apply_patch(&mut self, patch: ConfigPatch) {
        if let Some(erp) = patch.erp {
            if let Some(base_url) = erp.base_url {
                self.erp.base_url = base_url;
            }
            if let Some(bearer_token_value) = erp.bearer_token {
                self.erp.bearer_token = secret_value(bearer_token_value);
            }
            if let Some(tenant) = erp.tenant {
                self.erp.tenant = tenant;
            }
            if let Some(timeout_secs) = erp.timeout_secs {
                self.erp.timeout_secs = timeout_secs;
            }
            if let Some(max_retries) = erp.max_retries {
                self.erp.max_retries = max_retries;
            }
        }

        if let Some(llm) = patch.llm {
            if let Some(api_url) = llm.api_url {
                self.llm.api_url = api_url;
            }
            if let Some(llm_api_key_value) = llm.api_key {
                self.llm.api_key = Some(secret_value(llm_api_key_value));
            }
            if let Some(model) = llm.model {
                self.llm.model = model;
            }
            if let Some(max_tokens) = llm.max_tokens {
                self.llm.max_tokens = max_tokens;
            }
            if let Some(timeout_secs) = llm.timeout_secs {
                self.llm.timeout_secs = timeout_secs;
            }
            if let Some(max_retries) = llm.max_retries {
                self.llm.max_retries = max_retries;
            }
        }

        if let Some(vision) = patch.vision {
            if let Some(api_url) = vision.api_url {
                self.vision.api_url = Some(api_url);
            }
            if let Some(vision_api_key_value) = vision.api_key {
                self.vision.api_key = Some(secret_value(vision_api_key_value));
            }
            if let Some(model) = vision.model {
                self.vision.model = model;
            }
            if let Some(max_tokens) = vision.max_tokens {
                self.vision.max_tokens = max_tokens;
            }
            if let Some(timeout_secs) = vision.timeout_secs {
                self.vision.timeout_secs = timeout_secs;
            }
        }

        if let Some(server) = patch.server {
            if let Some(bind_address) = server.bind_address {
                self.server.bind_address = bind_address;
            }
            if let Some(port) = server.port {
                self.server.port = port;
            }
            if let Some(webhook_url) = server.webhook_url {
                self.server.webhook_url = webhook_url;
            }
            if let Some(index_path) = server.index_path {
                self.server.index_path = index_path;
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
        if let Some(value) = read_env("TANYA_ERP_BASE_URL") {
            self.erp.base_url = value;
        }
        if let Some(value) = read_env("TANYA_ERP_BEARER_TOKEN") {
            self.erp.bearer_token = secret_value(value);
        }
        if let Some(value) = read_env("TANYA_ERP_TENANT") {
            self.erp.tenant = value;
        }
        if let Some(value) = read_env("TANYA_ERP_TIMEOUT_SECS") {
            self.erp.timeout_secs = parse_u64("TANYA_ERP_TIMEOUT_SECS", &value)?;
        }
        if let Some(value) = read_env("TANYA_ERP_MAX_RETRIES") {
            self.erp.max_retries = parse_u32("TANYA_ERP_MAX_RETRIES", &value)?;
        }

        if let Some(value) = read_env("TANYA_LLM_API_URL") {
            self.llm.api_url = value;
        }
        if let Some(value) = read_env("TANYA_LLM_API_KEY") {
            self.llm.api_key = Some(secret_value(value));
        }
        if let Some(value) = read_env("TANYA_LLM_MODEL") {
            self.llm.model = value;
        }
        if let Some(value) = read_env("TANYA_LLM_MAX_TOKENS") {
            self.llm.max_tokens = parse_u32("TANYA_LLM_MAX_TOKENS", &value)?;
        }
        if let Some(value) = read_env("TANYA_LLM_TIMEOUT_SECS") {
            self.llm.timeout_secs = parse_u64("TANYA_LLM_TIMEOUT_SECS", &value)?;
        }
        if let Some(value) = read_env("TANYA_LLM_MAX_RETRIES") {
            self.llm.max_retries = parse_u32("TANYA_LLM_MAX_RETRIES", &value)?;
        }

        if let Some(value) = read_env("TANYA_VISION_API_URL") {
            self.vision.api_url = Some(value);
        }
        if let Some(value) = read_env("TANYA_VISION_API_KEY") {
            self.vision.api_key = Some(secret_value(value));
        }
        if let Some(value) = read_env("TANYA_VISION_MODEL") {
            self.vision.model = value;
        }
        if let Some(value) = read_env("TANYA_VISION_MAX_TOKENS") {
            self.vision.max_tokens = parse_u32("TANYA_VISION_MAX_TOKENS", &value)?;
        }
        if let Some(value) = read_env("TANYA_VISION_TIMEOUT_SECS") {
            self.vision.timeout_secs = parse_u64("TANYA_VISION_TIMEOUT_SECS", &value)?;
        }

        if let Some(value) = read_env("TANYA_SERVER_BIND_ADDRESS") {
            self.server.bind_address = value;
        }
        if let Some(value) = read_env("TANYA_SERVER_PORT") {
            self.server.port = parse_u16("TANYA_SERVER_PORT", &value)?;
        }
        if let Some(value) = read_env("TANYA_SERVER_WEBHOOK_URL") {
            self.server.webhook_url = value;
        }
        if let Some(value) = read_env("TANYA_SERVER_INDEX_PATH") {
            self.server.index_path = PathBuf::from(value);
        }

        let log_level = read_env("TANYA_LOGGING_LEVEL").or_else(|| read_env("TANYA_LOG_LEVEL"));
        if let Some(value) = log_level {
            self.logging.level = value;
        }
        let log_format = read_env("TANYA_LOGGING_FORMAT").or_else(|| read_env("TANYA_LOG_FORMAT"));
        if let Some(value) = log_format {
            self.logging.format = value.parse()?;
        }

        Ok(())
    }

    fn apply_overrides(&mut self, overrides: ConfigOverrides) {
        if let Some(base_url) = overrides.erp_base_url {
            self.erp.base_url = base_url;
        }
        if let Some(bearer_token) = overrides.erp_bearer_token {
            self.erp.bearer_token = secret_value(bearer_token);
        }
        if let Some(tenant) = overrides.erp_tenant {
            self.erp.tenant = tenant;
        }
        if let Some(api_url) = overrides.llm_api_url {
            self.llm.api_url = api_url;
        }
        if let Some(api_key) = overrides.llm_api_key {
            self.llm.api_key = Some(secret_value(api_key));
        }
        if let Some(model) = overrides.llm_model {
            self.llm.model = model;
        }
        if let Some(port) = overrides.server_port {
            self.server.port = port;
        }
        if let Some(log_level) = overrides.log_level {
            self.logging.level = log_level;
        }
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        validate_erp(&self.erp)?;
        validate_llm(&self.llm)?;
        validate_vision(&self.vision)?;
        validate_server(&self.server)?;
        validate_logging(&self.logging)?;
        Ok(())
    }
}

fn resolve_config_path(explicit_path: Option<&Path>) -> Option<PathBuf> {
    if let Some(path) = explicit_path {
        return path.exists().then_some(path.to_path_buf());
    }

    [PathBuf::from("tanya.toml"), PathBuf::from("config/tanya.toml")]
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

fn is_http_url(value: &str) -> bool {
    let value = value.trim();
    value.starts_with("http://") || value.starts_with("https://")
}

fn validate_erp(erp: &ErpConfig) -> Result<(), ConfigError> {
    if !is_http_url(&erp.base_url) {
        return Err(ConfigError::Validation(
            "erp.base_url must start with http:// or https://".to_string(),
        ));
    }

    if erp.timeout_secs == 0 || erp.timeout_secs > 300 {
        return Err(ConfigError::Validation(
            "erp.timeout_secs must be in range 1..=300".to_string(),
        ));
    }

    if erp.max_retries > 5 {
        return Err(ConfigError::Validation("erp.max_retries must be at most 5".to_string()));
    }

    Ok(())
}

fn validate_llm(llm: &LlmConfig) -> Result<(), ConfigError> {
    if !is_http_url(&llm.api_url) {
        return Err(ConfigError::Validation(
            "llm.api_url must start with http:// or https://".to_string(),
        ));
    }

    let missing_key =
        llm.api_key.as_ref().map(|value| value.expose_secret().trim().is_empty()).unwrap_or(true);
    if missing_key {
        return Err(ConfigError::Validation(
            "llm.api_key is required (set TANYA_LLM_API_KEY or [llm].api_key)".to_string(),
        ));
    }

    if llm.model.trim().is_empty() {
        return Err(ConfigError::Validation("llm.model must not be empty".to_string()));
    }

    if llm.max_tokens == 0 {
        return Err(ConfigError::Validation(
            "llm.max_tokens must be greater than zero".to_string(),
        ));
    }

    if llm.timeout_secs == 0 || llm.timeout_secs > 300 {
        return Err(ConfigError::Validation(
            "llm.timeout_secs must be in range 1..=300".to_string(),
        ));
    }

    if llm.max_retries > 5 {
        return Err(ConfigError::Validation("llm.max_retries must be at most 5".to_string()));
    }

    Ok(())
}

fn validate_vision(vision: &VisionConfig) -> Result<(), ConfigError> {
    let Some(api_url) = vision.api_url.as_deref() else {
        return Ok(());
    };

    if !is_http_url(api_url) {
        return Err(ConfigError::Validation(
            "vision.api_url must start with http:// or https://".to_string(),
        ));
    }

    if !vision.is_configured() {
        return Err(ConfigError::Validation(
            "vision.api_key is required when vision.api_url is set".to_string(),
        ));
    }

    if vision.max_tokens == 0 {
        return Err(ConfigError::Validation(
            "vision.max_tokens must be greater than zero".to_string(),
        ));
    }

    if vision.timeout_secs == 0 {
        return Err(ConfigError::Validation(
            "vision.timeout_secs must be greater than zero".to_string(),
        ));
    }

    Ok(())
}

fn validate_server(server: &ServerConfig) -> Result<(), ConfigError> {
    if server.port == 0 {
        return Err(ConfigError::Validation("server.port must be greater than zero".to_string()));
    }

    if server.bind_address.trim().is_empty() {
        return Err(ConfigError::Validation("server.bind_address must not be empty".to_string()));
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

fn parse_u16(key: &str, value: &str) -> Result<u16, ConfigError> {
    value.parse::<u16>().map_err(|_| ConfigError::InvalidEnvOverride {
        key: key.to_string(),
        value: value.to_string(),
    })
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
    erp: Option<ErpPatch>,
    llm: Option<LlmPatch>,
    vision: Option<VisionPatch>,
    server: Option<ServerPatch>,
    logging: Option<LoggingPatch>,
}

#[derive(Debug, Default, Deserialize)]
struct ErpPatch {
    base_url: Option<String>,
    bearer_token: Option<String>,
    tenant: Option<String>,
    timeout_secs: Option<u64>,
    max_retries: Option<u32>,
}

#[derive(Debug, Default, Deserialize)]
struct LlmPatch {
    api_url: Option<String>,
    api_key: Option<String>,
    model: Option<String>,
    max_tokens: Option<u32>,
    timeout_secs: Option<u64>,
    max_retries: Option<u32>,
}

#[derive(Debug, Default, Deserialize)]
struct VisionPatch {
    api_url: Option<String>,
    api_key: Option<String>,
    model: Option<String>,
    max_tokens: Option<u32>,
    timeout_secs: Option<u64>,
}

#[derive(Debug, Default, Deserialize)]
struct ServerPatch {
    bind_address: Option<String>,
    port: Option<u16>,
    webhook_url: Option<String>,
    index_path: Option<PathBuf>,
}

#[derive(Debug, Default, Deserialize)]
struct LoggingPatch {
    level: Option<String>,
    format: Option<LogFormat>,
}
