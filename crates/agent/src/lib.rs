//! Conversational runtime for the Tanya ERP assistant.
//!
//! A turn runs through these stages, each backed by one language model call:
//! 1. **Image description** (`vision`) - only when an image is attached
//! 2. **Intent classification** (`classifier`, `decision`) - read, write or no data
//! 3. **Parameter refinement** (`refiner`) - query parameters for reads
//! 4. **Composition** (`composer`) - the answer, or a guided form when a write is rejected
//!
//! Backend calls go through `tanya_erp::ErpGateway`. The last fetched dataset and
//! the last answer are kept per conversation in a `session::SessionStore` and
//! replayed into every prompt.
//!
//! # Key Types
//!
//! - `AgentRuntime` - turn orchestrator (see `runtime`)
//! - `LlmClient` - pluggable chat-completion backend
//! - `SessionStore` - per-conversation cache with one lock per conversation

pub mod chat;
pub mod classifier;
pub mod composer;
pub mod decision;
pub mod llm;
pub mod prompts;
pub mod refiner;
pub mod runtime;
pub mod session;
pub mod vision;

pub use chat::HttpChatClient;
pub use llm::{ChatRequest, LlmClient, LlmError, PromptContext};
pub use runtime::{AgentRuntime, RuntimeError};
pub use session::{ConversationCache, InMemorySessionStore, SessionStore};
