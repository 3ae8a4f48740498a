use std::collections::BTreeMap;
use std::sync::Arc;

use serde::Deserialize;
use serde_json::{Map, Value};
use tanya_core::catalog::EndpointCatalog;
use tanya_core::errors::TurnError;
use tanya_core::text::strip_json_fence;
use tracing::debug;

use crate::decision::allowed_filters;
use crate::llm::{ChatRequest, LlmClient, PromptContext, Sampling};
use crate::prompts::refinement_instruction;

#[derive(Debug, Deserialize)]
struct RefinedParams {
    #[serde(default)]
    params: Map<String, Value>,
}

/// Turns the natural-language filters of a read into query parameters.
pub struct ParameterRefiner {
    llm: Arc<dyn LlmClient>,
    catalog: Arc<EndpointCatalog>,
}

impl ParameterRefiner {
    pub fn new(llm: Arc<dyn LlmClient>, catalog: Arc<EndpointCatalog>) -> Self {
        Self { llm, catalog }
    }

    /// Returns `defaults ← classifier filters ← refined params`. Resources without
    /// a rule set skip the model call.
    pub async fn refine(
        &self,
        message: &str,
        resource: &str,
        classifier_filters: &BTreeMap<String, String>,
        context: &PromptContext,
    ) -> Result<BTreeMap<String, String>, TurnError> {
        let endpoint = self
            .catalog
            .get(resource)
            .ok_or_else(|| TurnError::Refinement(format!("unknown endpoint `{resource}`")))?;

        let mut params = endpoint.default_params();
        params.extend(classifier_filters.iter().map(|(key, value)| (key.clone(), value.clone())));

        let Some(instruction) = refinement_instruction(endpoint) else {
            return Ok(params);
        };

        let request = ChatRequest::ask(&instruction, context, message, Sampling::PRECISE);
        let reply = self
            .llm
            .complete(request)
            .await
            .map_err(|error| TurnError::Refinement(error.to_string()))?;
        debug!(resource, reply = %reply, "refiner replied");

        let refined: RefinedParams = serde_json::from_str(strip_json_fence(&reply))
            .map_err(|error| TurnError::Refinement(format!("malformed params reply: {error}")))?;
        params.extend(allowed_filters(endpoint, Some(&refined.params)));
        Ok(params)
    }
}

#[cfg(test)]
mod tests {
    use std::collections::{BTreeMap, VecDeque};
    use std::sync::Arc;

    use async_trait::async_trait;
    use tanya_core::catalog::EndpointCatalog;
    use tanya_core::errors::TurnError;
    use tokio::sync::Mutex;

    use super::ParameterRefiner;
    use crate::llm::{ChatRequest, LlmClient, LlmError, PromptContext};

    #[derive(Default)]
    struct ScriptedLlm {
        replies: Mutex<VecDeque<String>>,
        calls: Mutex<usize>,
    }

    impl ScriptedLlm {
        fn with_replies(replies: &[&str]) -> Arc<Self> {
            Arc::new(Self {
                replies: Mutex::new(replies.iter().map(|reply| reply.to_string()).collect()),
                calls: Mutex::new(0),
            })
        }
    }

    #[async_trait]
    impl LlmClient for ScriptedLlm {
        async fn complete(&self, _request: ChatRequest) -> Result<String, LlmError> {
            *self.calls.lock().await += 1;
            self.replies
                .lock()
                .await
                .pop_front()
                .ok_or_else(|| LlmError::MalformedResponse("script exhausted".to_string()))
        }
    }

    fn refiner(llm: Arc<ScriptedLlm>) -> ParameterRefiner {
        ParameterRefiner::new(llm, Arc::new(EndpointCatalog::default()))
    }

    #[tokio::test]
    async fn refined_params_keep_every_default_key() {
        let llm = ScriptedLlm::with_replies(&[
            r#"{"params":{"date[$gte]":"2024-01-01","is_skip_pagination":"false","colour":"red"}}"#,
        ]);
        let mut classifier_filters = BTreeMap::new();
        classifier_filters.insert("payment_status".to_string(), "open".to_string());

        let params = refiner(llm)
            .refine(
                "faktur belum lunas sejak 1 Januari 2024",
                "sales_invoices",
                &classifier_filters,
                &PromptContext::default(),
            )
            .await
            .expect("refinement succeeds");

        assert_eq!(params.get("is_skip_pagination").map(String::as_str), Some("false"));
        assert_eq!(params.get("payment_status").map(String::as_str), Some("open"));
        assert_eq!(params.get("date[$gte]").map(String::as_str), Some("2024-01-01"));
        assert!(!params.contains_key("colour"));
    }

    #[tokio::test]
    async fn endpoints_without_rules_skip_the_model() {
        let llm = ScriptedLlm::with_replies(&[]);

        let params = refiner(llm.clone())
            .refine(
                "neraca bulan ini",
                "dashboards/balance_sheet_simple",
                &BTreeMap::new(),
                &PromptContext::default(),
            )
            .await
            .expect("no refinement needed");

        assert!(params.is_empty());
        assert_eq!(*llm.calls.lock().await, 0);
    }

    #[tokio::test]
    async fn malformed_reply_is_a_refinement_error() {
        let llm = ScriptedLlm::with_replies(&["is_skip_pagination=true"]);

        let error = refiner(llm)
            .refine("produk", "products", &BTreeMap::new(), &PromptContext::default())
            .await
            .expect_err("reply is not json");

        assert!(matches!(error, TurnError::Refinement(_)));
    }
}
