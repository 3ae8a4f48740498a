use std::sync::Arc;

use tanya_core::catalog::EndpointCatalog;
use tanya_core::domain::routing::RoutingDecision;
use tanya_core::errors::TurnError;
use tracing::debug;

use crate::decision::RawDecision;
use crate::llm::{ChatRequest, LlmClient, PromptContext, Sampling};
use crate::prompts::classifier_instruction;

/// Decides whether a message needs a read, a write or no backend call at all.
pub struct IntentClassifier {
    llm: Arc<dyn LlmClient>,
    catalog: Arc<EndpointCatalog>,
    instruction: String,
}

impl IntentClassifier {
    pub fn new(llm: Arc<dyn LlmClient>, catalog: Arc<EndpointCatalog>) -> Self {
        let instruction = classifier_instruction(&catalog);
        Self { llm, catalog, instruction }
    }

    pub async fn classify(
        &self,
        message: &str,
        context: &PromptContext,
    ) -> Result<RoutingDecision, TurnError> {
        let request = ChatRequest::ask(&self.instruction, context, message, Sampling::PRECISE);
        let reply = self
            .llm
            .complete(request)
            .await
            .map_err(|error| TurnError::Classifier(error.to_string()))?;
        debug!(reply = %reply, "classifier replied");

        RawDecision::parse(&reply)
            .and_then(|raw| raw.resolve(&self.catalog))
            .map_err(|error| TurnError::Classifier(error.to_string()))
    }
}
