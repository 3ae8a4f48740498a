//! ERP backend gateway.
//!
//! Reads go through [`ErpGateway::fetch`], are flattened to dotted keys and decoded
//! by the [`DecoderRegistry`] entry for the resource. Writes go through
//! [`ErpGateway::write`] and are never retried.

pub mod decoders;
pub mod flatten;
pub mod gateway;
pub mod http;
pub mod records;

pub use decoders::{DecodeError, DecoderRegistry, ResourceData};
pub use gateway::{Credentials, ErpGateway, GatewayError, NormalizedResult};
pub use http::HttpErpGateway;
