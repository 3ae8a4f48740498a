use std::path::Path;
use std::sync::Arc;

use axum::{
    extract::State,
    http::StatusCode,
    response::{Html, IntoResponse, Response},
    routing::get,
    Router,
};
use tanya_core::config::AppConfig;
use tracing::error;

#[derive(Clone)]
pub struct IndexState {
    config: Arc<AppConfig>,
}

pub fn router(config: Arc<AppConfig>) -> Router {
    Router::new().route("/", get(index)).with_state(IndexState { config })
}

pub async fn index(State(state): State<IndexState>) -> Response {
    let server = &state.config.server;
    match render_index(&server.index_path, &server.webhook_url).await {
        Ok(html) => Html(html).into_response(),
        Err(err) => {
            error!(
                event_name = "server.index.unavailable",
                correlation_id = "index",
                path = %server.index_path.display(),
                error = %err,
                "index page could not be read"
            );
            (StatusCode::INTERNAL_SERVER_ERROR, "index.html not found").into_response()
        }
    }
}

/// Reads the page and announces the webhook URL to the browser script.
pub async fn render_index(path: &Path, webhook_url: &str) -> std::io::Result<String> {
    let page = tokio::fs::read_to_string(path).await?;
    Ok(inject_webhook_url(&page, webhook_url))
}

/// Inserts the webhook script right after the first `<head>`. Pages without a
/// `<head>` are returned unchanged.
pub fn inject_webhook_url(page: &str, webhook_url: &str) -> String {
    let literal = serde_json::to_string(webhook_url).unwrap_or_else(|_| "\"\"".to_string());
    let script = format!("<script>window.WEBHOOK_URL = {literal};</script>");
    page.replacen("<head>", &format!("<head>{script}"), 1)
}
