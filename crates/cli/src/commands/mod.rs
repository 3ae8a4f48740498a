pub mod ask;
pub mod config;
pub mod doctor;

use serde::Serialize;
use serde_json::Value;
use tanya_core::domain::request::TurnResponse;

#[derive(Debug, Clone)]
pub struct CommandResult {
    pub exit_code: u8,
    pub output: String,
}

#[derive(Debug, Serialize)]
struct CommandOutcome {
    command: String,
    status: String,
    error_class: Option<String>,
    message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    results: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<Value>,
}

impl CommandResult {
    pub fn success(command: &str, message: impl Into<String>) -> Self {
        let payload = CommandOutcome {
            command: command.to_string(),
            status: "ok".to_string(),
            error_class: None,
            message: message.into(),
            results: None,
            error: None,
        };
        Self { exit_code: 0, output: serialize_payload(payload) }
    }

    pub fn failure(
        command: &str,
        error_class: &str,
        message: impl Into<String>,
        exit_code: u8,
    ) -> Self {
        let payload = CommandOutcome {
            command: command.to_string(),
            status: "error".to_string(),
            error_class: Some(error_class.to_string()),
            message: message.into(),
            results: None,
            error: None,
        };
        Self { exit_code, output: serialize_payload(payload) }
    }

    /// A failed turn exits with 1 and carries the stage in `error_class`.
    pub fn turn(command: &str, response: &TurnResponse) -> Self {
        let error_class = response
            .error
            .as_ref()
            .and_then(|error| error.get("stage"))
            .and_then(Value::as_str)
            .map(str::to_string);
        let payload = CommandOutcome {
            command: command.to_string(),
            status: if response.is_ok() { "ok" } else { "error" }.to_string(),
            error_class: if response.is_ok() { None } else { error_class },
            message: response.message.clone(),
            results: response.results.clone(),
            error: response.error.clone(),
        };
        Self { exit_code: if response.is_ok() { 0 } else { 1 }, output: serialize_payload(payload) }
    }
}

fn serialize_payload(payload: CommandOutcome) -> String {
    serde_json::to_string(&payload).unwrap_or_else(|error| {
        format!(
            "{{\"command\":\"unknown\",\"status\":\"error\",\"error_class\":\"serialization\",\"message\":\"{}\"}}",
            error.to_string().replace('\\', "\\\\").replace('"', "\\\"")
        )
    })
}
