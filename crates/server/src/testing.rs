use std::collections::{BTreeMap, VecDeque};
use std::sync::Arc;

use async_trait::async_trait;
use serde_json::{Map, Value};
use tanya_agent::{AgentRuntime, ChatRequest, LlmClient, LlmError};
use tanya_erp::{Credentials, ErpGateway, NormalizedResult};
use tokio::sync::Mutex;

pub struct StubLlm {
    replies: Mutex<VecDeque<String>>,
}

impl StubLlm {
    pub fn replying(replies: &[&str]) -> Arc<Self> {
        Arc::new(Self {
            replies: Mutex::new(replies.iter().map(|reply| reply.to_string()).collect()),
        })
    }
}

#[async_trait]
impl LlmClient for StubLlm {
    async fn complete(&self, _request: ChatRequest) -> Result<String, LlmError> {
        self.replies
            .lock()
            .await
            .pop_front()
            .ok_or_else(|| LlmError::MalformedResponse("no scripted reply".to_string()))
    }
}

pub struct StubGateway;

impl StubGateway {
    pub fn unused() -> Arc<Self> {
        Arc::new(Self)
    }
}

#[async_trait]
impl ErpGateway for StubGateway {
    async fn fetch(
        &self,
        resource: &str,
        _params: &BTreeMap<String, String>,
        _credentials: &Credentials,
    ) -> NormalizedResult {
        NormalizedResult::failure(format!("unexpected fetch of {resource}"))
    }

    async fn write(
        &self,
        resource: &str,
        _fields: &Map<String, Value>,
        _credentials: &Credentials,
    ) -> NormalizedResult {
        NormalizedResult::failure(format!("unexpected write to {resource}"))
    }
}

pub fn runtime_with(llm: Arc<StubLlm>, gateway: Arc<StubGateway>) -> AgentRuntime {
    AgentRuntime::new(llm, gateway, Credentials::new("test-token", "test-tenant"))
}
