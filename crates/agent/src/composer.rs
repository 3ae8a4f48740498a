use std::sync::Arc;

use tanya_core::errors::TurnError;
use tanya_core::text::strip_code_fences;

use crate::llm::{ChatRequest, LlmClient, PromptContext, Sampling};
use crate::prompts::{COMPOSE_INSTRUCTION, DATA_FREE_NOTE, GUIDED_FORM_INSTRUCTION};

/// Writes the user-facing answer. Fetched data reaches the model through the
/// cached-data slot of the [`PromptContext`].
pub struct ResponseComposer {
    llm: Arc<dyn LlmClient>,
    data_free_instruction: String,
}

impl ResponseComposer {
    pub fn new(llm: Arc<dyn LlmClient>) -> Self {
        Self { llm, data_free_instruction: format!("{COMPOSE_INSTRUCTION}{DATA_FREE_NOTE}") }
    }

    pub async fn compose_from_data(
        &self,
        message: &str,
        context: &PromptContext,
    ) -> Result<String, TurnError> {
        let request = ChatRequest::ask(COMPOSE_INSTRUCTION, context, message, Sampling::COMPOSING);
        self.ask(request).await.map_err(TurnError::Composer)
    }

    pub async fn compose_without_data(
        &self,
        message: &str,
        context: &PromptContext,
    ) -> Result<String, TurnError> {
        let request =
            ChatRequest::ask(&self.data_free_instruction, context, message, Sampling::PRECISE);
        self.ask(request).await.map_err(TurnError::Composer)
    }

    /// Form asking the user for the fields a rejected write was missing.
    pub async fn guided_form(
        &self,
        message: &str,
        context: &PromptContext,
    ) -> Result<String, TurnError> {
        let request =
            ChatRequest::ask(GUIDED_FORM_INSTRUCTION, context, message, Sampling::PRECISE);
        self.ask(request).await.map_err(TurnError::FormFallback)
    }

    async fn ask(&self, request: ChatRequest) -> Result<String, String> {
        let reply = self.llm.complete(request).await.map_err(|error| error.to_string())?;
        Ok(strip_code_fences(&reply))
    }
}
