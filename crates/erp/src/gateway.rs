use std::collections::BTreeMap;
use std::fmt;

use async_trait::async_trait;
use secrecy::{ExposeSecret, SecretString};
use serde_json::{Map, Value};
use tanya_core::config::ErpConfig;
use tanya_core::domain::request::ResponseStatus;
use tanya_core::retry::Retryable;
use thiserror::Error;

use crate::decoders::{DecodeError, ResourceData};

pub const WRITE_SUCCESS_MESSAGE: &str = "Sukses input data";

#[derive(Debug, Error)]
pub enum GatewayError {
    #[error("could not build backend client: {0}")]
    Client(String),
    #[error("backend request failed: {message}")]
    Transport { message: String, retryable: bool },
    #[error("backend returned HTTP {status}: {body}")]
    Status { status: u16, body: String },
    #[error(transparent)]
    Decode(#[from] DecodeError),
}

impl Retryable for GatewayError {
    fn is_retryable(&self) -> bool {
        match self {
            Self::Transport { retryable, .. } => *retryable,
            Self::Status { status, .. } => *status == 429 || *status >= 500,
            Self::Client(_) | Self::Decode(_) => false,
        }
    }
}

/// Bearer token and tenant slug sent with every backend call.
#[derive(Clone)]
pub struct Credentials {
    pub bearer_token: SecretString,
    pub tenant: String,
}

impl Credentials {
    pub fn new(bearer_token: impl Into<String>, tenant: impl Into<String>) -> Self {
        Self { bearer_token: SecretString::from(bearer_token.into()), tenant: tenant.into() }
    }

    pub fn from_config(config: &ErpConfig) -> Self {
        Self { bearer_token: config.bearer_token.clone(), tenant: config.tenant.clone() }
    }

    /// Per-request values win when supplied and non-empty.
    pub fn resolve(&self, bearer_token: Option<&str>, tenant: Option<&str>) -> Self {
        let bearer_token = match bearer_token.map(str::trim).filter(|value| !value.is_empty()) {
            Some(token) => SecretString::from(token.to_string()),
            None => self.bearer_token.clone(),
        };
        let tenant = tenant
            .map(str::trim)
            .filter(|value| !value.is_empty())
            .map(str::to_string)
            .unwrap_or_else(|| self.tenant.clone());
        Self { bearer_token, tenant }
    }

    pub fn authorization_header(&self) -> String {
        format!("Bearer {}", self.bearer_token.expose_secret())
    }
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("bearer_token", &"<redacted>")
            .field("tenant", &self.tenant)
            .finish()
    }
}

/// Outcome of one backend call. Failures are values, never panics or `Err`.
#[derive(Clone, Debug, PartialEq)]
pub struct NormalizedResult {
    pub status: ResponseStatus,
    pub message: String,
    pub data: Option<ResourceData>,
    /// Business error echoed by the backend, if any.
    pub error: Option<Value>,
}

impl NormalizedResult {
    pub fn success(message: impl Into<String>, data: Option<ResourceData>) -> Self {
        Self { status: ResponseStatus::Ok, message: message.into(), data, error: None }
    }

    pub fn failure(message: impl Into<String>) -> Self {
        Self { status: ResponseStatus::Error, message: message.into(), data: None, error: None }
    }

    pub fn with_error(mut self, error: Option<Value>) -> Self {
        self.error = error;
        self
    }

    pub fn is_ok(&self) -> bool {
        self.status == ResponseStatus::Ok
    }

    pub fn has_business_error(&self) -> bool {
        self.error.is_some()
    }

    /// Data payload as JSON for prompts and response envelopes.
    pub fn data_json(&self) -> Option<Value> {
        self.data.as_ref().map(ResourceData::to_json)
    }
}

impl From<GatewayError> for NormalizedResult {
    fn from(error: GatewayError) -> Self {
        Self::failure(error.to_string())
    }
}

#[async_trait]
pub trait ErpGateway: Send + Sync {
    async fn fetch(
        &self,
        resource: &str,
        params: &BTreeMap<String, String>,
        credentials: &Credentials,
    ) -> NormalizedResult;

    async fn write(
        &self,
        resource: &str,
        fields: &Map<String, Value>,
        credentials: &Credentials,
    ) -> NormalizedResult;
}

#[cfg(test)]
mod tests {
    use serde_json::json;
    use tanya_core::retry::Retryable;

    use super::{Credentials, GatewayError, NormalizedResult};

    #[test]
    fn request_credentials_override_configured_defaults() {
        let defaults = Credentials::new("default-token", "default-tenant");

        let resolved = defaults.resolve(Some("caller-token"), Some("toko-maju"));
        assert_eq!(resolved.authorization_header(), "Bearer caller-token");
        assert_eq!(resolved.tenant, "toko-maju");

        let fallback = defaults.resolve(Some("  "), None);
        assert_eq!(fallback.authorization_header(), "Bearer default-token");
        assert_eq!(fallback.tenant, "default-tenant");
    }

    #[test]
    fn credentials_debug_is_redacted() {
        let debug = format!("{:?}", Credentials::new("secret-token", "acme"));
        assert!(!debug.contains("secret-token"));
        assert!(debug.contains("acme"));
    }

    #[test]
    fn server_errors_and_timeouts_are_retryable() {
        assert!(GatewayError::Status { status: 503, body: String::new() }.is_retryable());
        assert!(GatewayError::Status { status: 429, body: String::new() }.is_retryable());
        assert!(!GatewayError::Status { status: 401, body: String::new() }.is_retryable());
        assert!(GatewayError::Transport { message: "timeout".into(), retryable: true }
            .is_retryable());
    }

    #[test]
    fn gateway_errors_become_error_results() {
        let result = NormalizedResult::from(GatewayError::Status {
            status: 401,
            body: "unauthorized".to_string(),
        });
        assert!(!result.is_ok());
        assert!(result.message.contains("401"));
        assert!(!result.has_business_error());

        let business = NormalizedResult::failure("rejected").with_error(Some(json!({"name": "x"})));
        assert!(business.has_business_error());
    }
}
