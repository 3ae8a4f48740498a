use async_trait::async_trait;
use serde::Serialize;
use tanya_core::retry::Retryable;
use tanya_core::text::flatten_for_prompt;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum LlmError {
    #[error("language model is not configured: {0}")]
    NotConfigured(String),
    #[error("could not build language model client: {0}")]
    Client(String),
    #[error("language model request failed: {message}")]
    Transport { message: String, retryable: bool },
    #[error("language model returned HTTP {status}: {body}")]
    Status { status: u16, body: String },
    #[error("language model reply has no content: {0}")]
    MalformedResponse(String),
}

impl Retryable for LlmError {
    fn is_retryable(&self) -> bool {
        match self {
            Self::Transport { retryable, .. } => *retryable,
            Self::Status { status, .. } => *status == 429 || *status >= 500,
            Self::NotConfigured(_) | Self::Client(_) | Self::MalformedResponse(_) => false,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    System,
    Assistant,
    User,
}

#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ContentPart {
    Text { text: String },
    ImageUrl { image_url: ImageUrl },
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct ImageUrl {
    pub url: String,
}

#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(untagged)]
pub enum MessageContent {
    Text(String),
    Parts(Vec<ContentPart>),
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct ChatMessage {
    pub role: Role,
    pub content: MessageContent,
}

impl ChatMessage {
    pub fn text(role: Role, content: impl Into<String>) -> Self {
        Self { role, content: MessageContent::Text(content.into()) }
    }

    pub fn text_content(&self) -> Option<&str> {
        match &self.content {
            MessageContent::Text(text) => Some(text),
            MessageContent::Parts(_) => None,
        }
    }
}

/// Sampling settings sent with a request.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Sampling {
    pub temperature: f32,
    pub top_p: f32,
}

impl Sampling {
    /// Deterministic output for JSON decisions and data-free answers.
    pub const PRECISE: Self = Self { temperature: 0.0, top_p: 0.01 };
    /// Slightly wider nucleus for prose composed over fetched data.
    pub const COMPOSING: Self = Self { temperature: 0.0, top_p: 0.6 };
}

/// Conversation context replayed into every prompt of a turn.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct PromptContext {
    pub cached_data: Option<String>,
    pub last_answer: Option<String>,
}

#[derive(Clone, Debug, PartialEq)]
pub struct ChatRequest {
    pub messages: Vec<ChatMessage>,
    /// `None` leaves sampling to the provider (image requests).
    pub sampling: Option<Sampling>,
}

impl ChatRequest {
    /// Instruction, cached data, previous answer, then the user message. Text is
    /// flattened to single lines.
    pub fn ask(
        instruction: &str,
        context: &PromptContext,
        user_message: &str,
        sampling: Sampling,
    ) -> Self {
        let mut messages = vec![ChatMessage::text(Role::System, instruction)];
        if let Some(data) = context.cached_data.as_deref().filter(|data| !data.is_empty()) {
            messages.push(ChatMessage::text(Role::System, flatten_for_prompt(data)));
        }
        if let Some(answer) = context.last_answer.as_deref().filter(|answer| !answer.is_empty()) {
            messages.push(ChatMessage::text(Role::Assistant, flatten_for_prompt(answer)));
        }
        messages.push(ChatMessage::text(Role::User, flatten_for_prompt(user_message)));
        Self { messages, sampling: Some(sampling) }
    }

    /// Single user message carrying an instruction and an image.
    pub fn with_image(instruction: &str, image_data_uri: &str) -> Self {
        let parts = vec![
            ContentPart::Text { text: instruction.to_string() },
            ContentPart::ImageUrl { image_url: ImageUrl { url: image_data_uri.to_string() } },
        ];
        Self {
            messages: vec![ChatMessage { role: Role::User, content: MessageContent::Parts(parts) }],
            sampling: None,
        }
    }

    /// Text of the last message, usually the user turn.
    pub fn user_text(&self) -> Option<&str> {
        self.messages.last().and_then(ChatMessage::text_content)
    }

    pub fn instruction(&self) -> Option<&str> {
        self.messages.first().and_then(ChatMessage::text_content)
    }
}

#[async_trait]
pub trait LlmClient: Send + Sync {
    async fn complete(&self, request: ChatRequest) -> Result<String, LlmError>;
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::{ChatRequest, PromptContext, Role, Sampling};

    #[test]
    fn ask_orders_instruction_context_answer_then_user() {
        let context = PromptContext {
            cached_data: Some("data contacts:[{\"name\":\"Andi\"}]".to_string()),
            last_answer: Some("<table>\n<tr><td>Andi</td></tr>\n</table>".to_string()),
        };

        let request =
            ChatRequest::ask("instruction", &context, "siapa\tsaja?\n", Sampling::PRECISE);

        let roles: Vec<Role> = request.messages.iter().map(|message| message.role).collect();
        assert_eq!(roles, vec![Role::System, Role::System, Role::Assistant, Role::User]);
        assert_eq!(request.user_text(), Some("siapa saja? "));
        assert!(!request.messages[2].text_content().unwrap_or_default().contains('\n'));
    }

    #[test]
    fn empty_context_sends_only_instruction_and_user() {
        let request =
            ChatRequest::ask("instruction", &PromptContext::default(), "halo", Sampling::COMPOSING);
        assert_eq!(request.messages.len(), 2);
        assert_eq!(request.sampling, Some(Sampling::COMPOSING));
    }

    #[test]
    fn image_request_serializes_text_and_image_parts() {
        let request = ChatRequest::with_image("describe", "data:image/png;base64,aGVsbG8=");
        let encoded = serde_json::to_value(&request.messages).expect("messages serialize");

        assert_eq!(
            encoded,
            json!([{
                "role": "user",
                "content": [
                    { "type": "text", "text": "describe" },
                    { "type": "image_url", "image_url": { "url": "data:image/png;base64,aGVsbG8=" } }
                ]
            }])
        );
        assert_eq!(request.sampling, None);
    }
}
