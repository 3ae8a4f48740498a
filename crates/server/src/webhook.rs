//! Chat webhook.
//!
//! - `POST /webhook`: run one conversational turn and return the turn envelope
//!
//! Turn failures are reported inside the envelope with HTTP 200. Only transport
//! problems (wrong method, unreadable JSON) produce non-2xx plain-text replies.

use std::sync::Arc;

use axum::{
    extract::{rejection::JsonRejection, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::post,
    Json, Router,
};
use tanya_agent::AgentRuntime;
use tanya_core::domain::request::IncomingRequest;
use tracing::warn;

#[derive(Clone)]
pub struct WebhookState {
    runtime: Arc<AgentRuntime>,
}

pub fn router(runtime: Arc<AgentRuntime>) -> Router {
    Router::new()
        .route("/webhook", post(webhook).fallback(method_not_allowed))
        .with_state(WebhookState { runtime })
}

pub async fn webhook(
    State(state): State<WebhookState>,
    payload: Result<Json<IncomingRequest>, JsonRejection>,
) -> Response {
    let request = match payload {
        Ok(Json(request)) => request,
        Err(rejection) => {
            warn!(
                event_name = "server.webhook.bad_request",
                correlation_id = "webhook",
                error = %rejection.body_text(),
                "webhook body rejected"
            );
            return (StatusCode::BAD_REQUEST, rejection.body_text()).into_response();
        }
    };

    Json(state.runtime.handle_turn(request).await).into_response()
}

async fn method_not_allowed() -> (StatusCode, &'static str) {
    (StatusCode::METHOD_NOT_ALLOWED, "Method not allowed")
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use axum::{
        body::{to_bytes, Body},
        http::{header, Method, Request, StatusCode},
    };
    use serde_json::{json, Value};
    use tower::ServiceExt;

    use crate::testing::{runtime_with, StubGateway, StubLlm};

    use super::router;

    fn post_json(body: &str) -> Request<Body> {
        Request::builder()
            .method(Method::POST)
            .uri("/webhook")
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(body.to_string()))
            .expect("request builds")
    }

    async fn body_text(response: axum::response::Response) -> String {
        let bytes = to_bytes(response.into_body(), usize::MAX).await.expect("body reads");
        String::from_utf8(bytes.to_vec()).expect("utf-8 body")
    }

    #[tokio::test]
    async fn data_free_turn_returns_ok_envelope() {
        let llm = StubLlm::replying(&[r#"{"endpoint":"null"}"#, "Halo! Ada yang bisa dibantu?"]);
        let app = router(Arc::new(runtime_with(llm, StubGateway::unused())));

        let response = app
            .oneshot(post_json(r#"{"message":"halo","slug":"toko-maju"}"#))
            .await
            .expect("router responds");

        assert_eq!(response.status(), StatusCode::OK);
        let payload: Value = serde_json::from_str(&body_text(response).await).expect("json body");
        assert_eq!(payload, json!({ "status": "OK", "message": "Halo! Ada yang bisa dibantu?" }));
    }

    #[tokio::test]
    async fn empty_message_is_an_error_envelope_not_a_transport_error() {
        let app = router(Arc::new(runtime_with(StubLlm::replying(&[]), StubGateway::unused())));

        let response =
            app.oneshot(post_json(r#"{"message":"  "}"#)).await.expect("router responds");

        assert_eq!(response.status(), StatusCode::OK);
        let payload: Value = serde_json::from_str(&body_text(response).await).expect("json body");
        assert_eq!(payload["status"], "error");
        assert_eq!(payload["message"], "Pesan tidak boleh kosong.");
        assert_eq!(payload["error"]["stage"], "intake");
    }

    #[tokio::test]
    async fn get_is_rejected_with_plain_text() {
        let app = router(Arc::new(runtime_with(StubLlm::replying(&[]), StubGateway::unused())));

        let response = app
            .oneshot(
                Request::builder()
                    .method(Method::GET)
                    .uri("/webhook")
                    .body(Body::empty())
                    .expect("request builds"),
            )
            .await
            .expect("router responds");

        assert_eq!(response.status(), StatusCode::METHOD_NOT_ALLOWED);
        assert_eq!(body_text(response).await, "Method not allowed");
    }

    #[tokio::test]
    async fn malformed_json_is_a_bad_request() {
        let app = router(Arc::new(runtime_with(StubLlm::replying(&[]), StubGateway::unused())));

        let response =
            app.oneshot(post_json(r#"{"message": "halo""#)).await.expect("router responds");

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert!(!body_text(response).await.is_empty());
    }
}
