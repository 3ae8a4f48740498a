use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

use crate::errors::TurnError;

/// Inbound chat message as posted by the web front end.
#[derive(Clone, Default, Deserialize)]
pub struct IncomingRequest {
    #[serde(default)]
    pub message: String,
    /// `data:<mime>;base64,<payload>` URI.
    #[serde(default)]
    pub image: Option<String>,
    #[serde(default, alias = "bearer_token")]
    pub credential: Option<String>,
    #[serde(default, alias = "slug")]
    pub tenant: Option<String>,
    #[serde(default)]
    pub conversation_id: Option<String>,
}

impl IncomingRequest {
    pub fn new(message: impl Into<String>) -> Self {
        Self { message: message.into(), ..Self::default() }
    }

    pub fn image(&self) -> Option<&str> {
        self.image.as_deref().map(str::trim).filter(|image| !image.is_empty())
    }

    pub fn credential(&self) -> Option<&str> {
        self.credential.as_deref().map(str::trim).filter(|value| !value.is_empty())
    }

    pub fn tenant(&self) -> Option<&str> {
        self.tenant.as_deref().map(str::trim).filter(|value| !value.is_empty())
    }

    /// A request with neither text nor an image carries nothing to classify.
    pub fn is_blank(&self) -> bool {
        self.message.trim().is_empty() && self.image().is_none()
    }

    /// Key for the per-conversation cache.
    pub fn conversation_key(&self) -> String {
        if let Some(id) =
            self.conversation_id.as_deref().map(str::trim).filter(|value| !value.is_empty())
        {
            return id.to_string();
        }
        match self.tenant() {
            Some(tenant) => format!("tenant:{tenant}"),
            None => "default".to_string(),
        }
    }
}

impl fmt::Debug for IncomingRequest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("IncomingRequest")
            .field("message", &self.message)
            .field("image_len", &self.image.as_ref().map(String::len))
            .field("credential", &self.credential.as_ref().map(|_| "<redacted>"))
            .field("tenant", &self.tenant)
            .field("conversation_id", &self.conversation_id)
            .finish()
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum ResponseStatus {
    #[serde(rename = "OK")]
    Ok,
    #[serde(rename = "error")]
    Error,
}

/// Envelope returned to the caller for every turn.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct TurnResponse {
    pub status: ResponseStatus,
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub results: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<Value>,
}

impl TurnResponse {
    pub fn ok(message: impl Into<String>) -> Self {
        Self { status: ResponseStatus::Ok, message: message.into(), results: None, error: None }
    }

    pub fn with_results(mut self, results: Option<Value>) -> Self {
        self.results = results;
        self
    }

    pub fn is_ok(&self) -> bool {
        self.status == ResponseStatus::Ok
    }
}

impl From<&TurnError> for TurnResponse {
    fn from(error: &TurnError) -> Self {
        Self {
            status: ResponseStatus::Error,
            message: error.user_message(),
            results: None,
            error: Some(json!({ "stage": error.stage(), "detail": error.to_string() })),
        }
    }
}
