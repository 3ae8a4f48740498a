//! Shared building blocks for the Tanya ERP assistant.
//!
//! - `catalog`: the static table of ERP resources, their filters and cache lifetimes
//! - `config`: layered runtime configuration
//! - `domain`: request/response envelopes and routing decisions
//! - `errors`: per-stage turn failures with user-facing Indonesian messages

pub mod catalog;
pub mod config;
pub mod domain;
pub mod errors;
pub mod retry;
pub mod text;

pub use catalog::{EndpointCatalog, EndpointDefinition, RuleSet};
pub use domain::request::{IncomingRequest, ResponseStatus, TurnResponse};
pub use domain::routing::{Category, ContactRole, RoutingDecision};
pub use errors::TurnError;
pub use retry::{RetryPolicy, Retryable};
