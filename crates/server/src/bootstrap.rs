use std::sync::Arc;

use axum::Router;
use tanya_agent::{AgentRuntime, RuntimeError};
use tanya_core::config::{AppConfig, ConfigError, LoadOptions};
use thiserror::Error;
use tracing::info;

use crate::{health, index, webhook};

pub struct Application {
    pub config: Arc<AppConfig>,
    pub runtime: Arc<AgentRuntime>,
}

#[derive(Debug, Error)]
pub enum BootstrapError {
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error("agent runtime initialization failed: {0}")]
    Runtime(#[from] RuntimeError),
}

pub fn bootstrap(options: LoadOptions) -> Result<Application, BootstrapError> {
    let config = AppConfig::load(options)?;
    bootstrap_with_config(config)
}

pub fn bootstrap_with_config(config: AppConfig) -> Result<Application, BootstrapError> {
    info!(
        event_name = "system.bootstrap.start",
        correlation_id = "bootstrap",
        "starting application bootstrap"
    );
    config.validate()?;

    let runtime = AgentRuntime::from_config(&config)?;
    info!(
        event_name = "system.bootstrap.runtime_ready",
        correlation_id = "bootstrap",
        erp_base_url = %config.erp.base_url,
        llm_model = %config.llm.model,
        vision_enabled = runtime.vision_enabled(),
        "agent runtime initialized"
    );

    Ok(Application { config: Arc::new(config), runtime: Arc::new(runtime) })
}

impl Application {
    pub fn router(&self) -> Router {
        router(self.config.clone(), self.runtime.clone())
    }
}

/// Webhook, health and index routes over one runtime.
pub fn router(config: Arc<AppConfig>, runtime: Arc<AgentRuntime>) -> Router {
    Router::new()
        .merge(webhook::router(runtime.clone()))
        .merge(health::router(config.clone(), runtime))
        .merge(index::router(config))
}

#[cfg(test)]
mod tests {
    use tanya_core::config::{AppConfig, ConfigOverrides, LoadOptions};

    use super::{bootstrap, bootstrap_with_config, BootstrapError};

    #[test]
    fn bootstrap_fails_fast_without_language_model_key() {
        let result = bootstrap_with_config(AppConfig::default());

        let Err(BootstrapError::Config(error)) = result else {
            panic!("missing llm key must be a configuration error");
        };
        assert!(error.to_string().contains("llm.api_key"));
    }

    #[test]
    fn bootstrap_builds_runtime_from_overrides() {
        let app = bootstrap(LoadOptions {
            config_path: Some("does-not-exist.toml".into()),
            overrides: ConfigOverrides {
                llm_api_key: Some("sk-test".to_string()),
                erp_bearer_token: Some("erp-token".to_string()),
                erp_tenant: Some("toko-maju".to_string()),
                ..ConfigOverrides::default()
            },
            ..LoadOptions::default()
        })
        .expect("bootstrap should succeed with an llm key");

        assert_eq!(app.config.erp.tenant, "toko-maju");
        assert!(!app.runtime.vision_enabled());
    }
}
