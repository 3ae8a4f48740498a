use std::sync::Arc;
use std::time::{Duration, Instant};

use serde_json::Value;
use tanya_core::catalog::EndpointCatalog;
use tanya_core::config::AppConfig;
use tanya_core::domain::request::{IncomingRequest, TurnResponse};
use tanya_core::domain::routing::RoutingDecision;
use tanya_core::errors::TurnError;
use tanya_erp::{Credentials, ErpGateway, GatewayError, HttpErpGateway};
use thiserror::Error;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::chat::HttpChatClient;
use crate::classifier::IntentClassifier;
use crate::composer::ResponseComposer;
use crate::llm::LlmClient;
use crate::prompts::image_instruction;
use crate::refiner::ParameterRefiner;
use crate::session::{ConversationCache, InMemorySessionStore, SessionStore};
use crate::vision::{merge_image_context, ImageDescriber};

const FALLBACK_CACHE_TTL: Duration = Duration::from_secs(300);

#[derive(Debug, Error)]
pub enum RuntimeError {
    #[error(transparent)]
    Llm(#[from] crate::llm::LlmError),
    #[error(transparent)]
    Gateway(#[from] GatewayError),
}

/// Runs one conversational turn: optional image description, classification,
/// parameter refinement, backend dispatch and composition.
pub struct AgentRuntime {
    catalog: Arc<EndpointCatalog>,
    classifier: IntentClassifier,
    refiner: ParameterRefiner,
    composer: ResponseComposer,
    describer: ImageDescriber,
    gateway: Arc<dyn ErpGateway>,
    sessions: Arc<dyn SessionStore>,
    default_credentials: Credentials,
}

impl AgentRuntime {
    pub fn new(
        llm: Arc<dyn LlmClient>,
        gateway: Arc<dyn ErpGateway>,
        default_credentials: Credentials,
    ) -> Self {
        let catalog = Arc::new(EndpointCatalog::default());
        Self {
            classifier: IntentClassifier::new(llm.clone(), catalog.clone()),
            refiner: ParameterRefiner::new(llm.clone(), catalog.clone()),
            composer: ResponseComposer::new(llm),
            describer: ImageDescriber::new(None, image_instruction(&catalog)),
            catalog,
            gateway,
            sessions: Arc::new(InMemorySessionStore::new()),
            default_credentials,
        }
    }

    /// Wires HTTP clients for the language model, the optional vision model and
    /// the ERP backend from configuration.
    pub fn from_config(config: &AppConfig) -> Result<Self, RuntimeError> {
        let llm: Arc<dyn LlmClient> = Arc::new(HttpChatClient::from_llm_config(&config.llm)?);
        let gateway: Arc<dyn ErpGateway> = Arc::new(HttpErpGateway::from_config(&config.erp)?);
        let mut runtime = Self::new(llm, gateway, Credentials::from_config(&config.erp));
        if let Some(vision) = HttpChatClient::from_vision_config(&config.vision)? {
            runtime = runtime.with_vision(Arc::new(vision));
        }
        Ok(runtime)
    }

    pub fn with_vision(mut self, vision: Arc<dyn LlmClient>) -> Self {
        self.describer = ImageDescriber::new(Some(vision), image_instruction(&self.catalog));
        self
    }

    pub fn with_sessions(mut self, sessions: Arc<dyn SessionStore>) -> Self {
        self.sessions = sessions;
        self
    }

    pub fn sessions(&self) -> Arc<dyn SessionStore> {
        self.sessions.clone()
    }

    pub fn vision_enabled(&self) -> bool {
        self.describer.is_configured()
    }

    pub async fn handle_turn(&self, request: IncomingRequest) -> TurnResponse {
        let correlation_id = Uuid::new_v4().to_string();
        let conversation_id = request.conversation_key();
        info!(
            event_name = "agent.turn.received",
            correlation_id = %correlation_id,
            conversation_id = %conversation_id,
            has_image = request.image().is_some(),
            "turn received"
        );

        if request.is_blank() {
            let error = TurnError::EmptyMessage;
            warn!(
                event_name = "agent.turn.rejected",
                correlation_id = %correlation_id,
                stage = error.stage(),
                "empty message rejected"
            );
            return TurnResponse::from(&error);
        }

        let session = self.sessions.session(&conversation_id).await;
        let mut cache = session.lock().await;
        if cache.evict_expired(Instant::now()) {
            debug!(correlation_id = %correlation_id, "expired cached data dropped");
        }

        match self.run_turn(&request, &mut cache, &correlation_id).await {
            Ok(response) => {
                info!(
                    event_name = "agent.turn.completed",
                    correlation_id = %correlation_id,
                    conversation_id = %conversation_id,
                    "turn completed"
                );
                response
            }
            Err(error) => {
                warn!(
                    event_name = "agent.turn.failed",
                    correlation_id = %correlation_id,
                    conversation_id = %conversation_id,
                    stage = error.stage(),
                    error = %error,
                    "turn failed"
                );
                TurnResponse::from(&error)
            }
        }
    }

    async fn run_turn(
        &self,
        request: &IncomingRequest,
        cache: &mut ConversationCache,
        correlation_id: &str,
    ) -> Result<TurnResponse, TurnError> {
        let message = match request.image() {
            Some(image) => {
                let description = self.describer.describe(image).await?;
                merge_image_context(&description, &request.message)
            }
            None => request.message.trim().to_string(),
        };

        let decision = self.classifier.classify(&message, &cache.get()).await?;
        info!(
            event_name = "agent.turn.classified",
            correlation_id,
            decision = decision.kind(),
            resource = decision.resource().unwrap_or("none"),
            "message classified"
        );

        let credentials =
            self.default_credentials.resolve(request.credential(), request.tenant());

        match decision {
            RoutingDecision::NoData => {
                let answer = self.composer.compose_without_data(&message, &cache.get()).await?;
                cache.set_answer(answer.clone());
                Ok(TurnResponse::ok(answer))
            }
            RoutingDecision::Read { resource, filters, .. } => {
                let params =
                    self.refiner.refine(&message, &resource, &filters, &cache.get()).await?;
                let result = self.gateway.fetch(&resource, &params, &credentials).await;
                if !result.is_ok() {
                    return Err(TurnError::Gateway(result.message));
                }

                let payload = result.data_json().unwrap_or(Value::Null);
                let ttl = self.catalog.cache_ttl(&resource).unwrap_or(FALLBACK_CACHE_TTL);
                cache.set_data(&resource, payload, ttl);

                let answer = self.composer.compose_from_data(&message, &cache.get()).await?;
                cache.set_answer(answer.clone());
                Ok(TurnResponse::ok(answer))
            }
            RoutingDecision::Write { resource, fields, .. } => {
                let result = self.gateway.write(&resource, &fields, &credentials).await;
                if result.has_business_error() {
                    info!(
                        event_name = "agent.write.form_fallback",
                        correlation_id,
                        resource = %resource,
                        "backend rejected write; composing guided form"
                    );
                    let form = self.composer.guided_form(&message, &cache.get()).await?;
                    return Ok(TurnResponse::ok(form));
                }
                if !result.is_ok() {
                    return Err(TurnError::WriteRejected(result.message));
                }

                cache.clear();
                let results = result.data_json();
                Ok(TurnResponse::ok(result.message).with_results(results))
            }
        }
    }
}
