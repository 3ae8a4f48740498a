use std::sync::Arc;

use axum::{extract::State, http::StatusCode, routing::get, Json, Router};
use chrono::Utc;
use serde::Serialize;
use tanya_agent::AgentRuntime;
use tanya_core::config::AppConfig;

#[derive(Clone)]
pub struct HealthState {
    config: Arc<AppConfig>,
    runtime: Arc<AgentRuntime>,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct HealthCheck {
    pub status: &'static str,
    pub detail: String,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub service: HealthCheck,
    pub language_model: HealthCheck,
    pub erp: HealthCheck,
    pub vision: HealthCheck,
    pub active_sessions: usize,
    pub checked_at: String,
}

pub fn router(config: Arc<AppConfig>, runtime: Arc<AgentRuntime>) -> Router {
    Router::new().route("/health", get(health)).with_state(HealthState { config, runtime })
}

pub async fn health(State(state): State<HealthState>) -> (StatusCode, Json<HealthResponse>) {
    let language_model = language_model_check(&state.config);
    let ready = language_model.status == "ready";

    let payload = HealthResponse {
        status: if ready { "ready" } else { "degraded" },
        service: HealthCheck {
            status: "ready",
            detail: "tanya-server runtime initialized".to_string(),
        },
        language_model,
        erp: erp_check(&state.config),
        vision: if state.runtime.vision_enabled() {
            HealthCheck { status: "ready", detail: state.config.vision.model.clone() }
        } else {
            HealthCheck {
                status: "disabled",
                detail: "image messages will be rejected".to_string(),
            }
        },
        active_sessions: state.runtime.sessions().active_sessions().await,
        checked_at: Utc::now().to_rfc3339(),
    };

    let status_code = if ready { StatusCode::OK } else { StatusCode::SERVICE_UNAVAILABLE };
    (status_code, Json(payload))
}

fn language_model_check(config: &AppConfig) -> HealthCheck {
    match config.validate() {
        Ok(()) => HealthCheck {
            status: "ready",
            detail: format!("model `{}` at {}", config.llm.model, config.llm.api_url),
        },
        Err(error) => HealthCheck { status: "degraded", detail: error.to_string() },
    }
}

fn erp_check(config: &AppConfig) -> HealthCheck {
    let detail = if config.erp.has_default_credentials() {
        format!("{} (tenant `{}`)", config.erp.base_url, config.erp.tenant)
    } else {
        format!("{} (per-request credentials only)", config.erp.base_url)
    };
    HealthCheck { status: "ready", detail }
}
