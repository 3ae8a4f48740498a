use std::collections::HashMap;

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;

use crate::flatten::flatten;
use crate::records::{Contact, Product, PurchaseInvoice, RecordList, SalesInvoice};

#[derive(Debug, Error)]
pub enum DecodeError {
    #[error("backend body is not valid JSON: {0}")]
    InvalidJson(String),
    #[error("backend body does not match the `{resource}` shape: {detail}")]
    Shape { resource: String, detail: String },
}

/// Normalized payload of a read.
#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(untagged)]
pub enum ResourceData {
    Contacts(Vec<Contact>),
    SalesInvoices(Vec<SalesInvoice>),
    Products(Vec<Product>),
    PurchaseInvoices(Vec<PurchaseInvoice>),
    Raw(Value),
}

impl ResourceData {
    /// Number of typed records, or `None` for raw payloads.
    pub fn record_count(&self) -> Option<usize> {
        match self {
            Self::Contacts(records) => Some(records.len()),
            Self::SalesInvoices(records) => Some(records.len()),
            Self::Products(records) => Some(records.len()),
            Self::PurchaseInvoices(records) => Some(records.len()),
            Self::Raw(_) => None,
        }
    }

    pub fn to_json(&self) -> Value {
        serde_json::to_value(self).unwrap_or(Value::Null)
    }
}

/// Generic `{status, message, results, error}` envelope the backend wraps responses in.
#[derive(Clone, Debug, Default, Deserialize)]
pub struct BackendEnvelope {
    #[serde(default)]
    pub status: Option<Value>,
    #[serde(default)]
    pub message: Option<String>,
    #[serde(default)]
    pub results: Option<Value>,
    #[serde(default)]
    pub error: Option<Value>,
}

impl BackendEnvelope {
    pub fn parse(body: &[u8]) -> Option<Self> {
        let value: Value = serde_json::from_slice(body).ok()?;
        if !value.is_object() {
            return None;
        }
        serde_json::from_value(value).ok()
    }

    /// Backend-reported error detail; JSON null and empty values count as absent.
    pub fn error_detail(&self) -> Option<&Value> {
        self.error.as_ref().filter(|error| match error {
            Value::Null => false,
            Value::String(text) => !text.trim().is_empty(),
            Value::Object(map) => !map.is_empty(),
            Value::Array(items) => !items.is_empty(),
            _ => true,
        })
    }

    /// Failure reported inside a successful HTTP response: an error status, or
    /// error detail with no results. Returns the backend's message.
    pub fn read_failure(&self) -> Option<String> {
        let failed_status = match &self.status {
            Some(Value::String(status)) => {
                matches!(status.trim().to_ascii_lowercase().as_str(), "error" | "failed" | "fail")
            }
            Some(Value::Bool(ok)) => !ok,
            Some(Value::Number(code)) => code.as_u64().is_some_and(|code| code >= 400),
            _ => false,
        };
        let detail_without_results = self.error_detail().is_some() && self.results.is_none();
        if !failed_status && !detail_without_results {
            return None;
        }

        let message = self
            .message
            .as_deref()
            .map(str::trim)
            .filter(|message| !message.is_empty())
            .map(str::to_string)
            .or_else(|| self.error_detail().map(Value::to_string))
            .unwrap_or_else(|| "backend reported an error".to_string());
        Some(message)
    }
}

pub type Decoder = fn(&str, &[u8]) -> Result<ResourceData, DecodeError>;

/// Resource name → decoder, with a fallback for resources that have no entry.
#[derive(Clone)]
pub struct DecoderRegistry {
    decoders: HashMap<String, Decoder>,
    fallback: Decoder,
}

impl Default for DecoderRegistry {
    fn default() -> Self {
        let mut registry = Self::empty();
        registry.register("contacts", |resource, body| {
            decode_records(resource, body).map(ResourceData::Contacts)
        });
        registry.register("sales_invoices", |resource, body| {
            decode_records(resource, body).map(ResourceData::SalesInvoices)
        });
        registry.register("products", |resource, body| {
            decode_records(resource, body).map(ResourceData::Products)
        });
        registry.register("purchases_invoices", |resource, body| {
            decode_records(resource, body).map(ResourceData::PurchaseInvoices)
        });
        registry.register("dashboards/daily_sales", decode_raw);
        registry.register("dashboards/balance_sheet_simple", decode_raw);
        registry
    }
}

impl std::fmt::Debug for DecoderRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let mut resources: Vec<_> = self.decoders.keys().collect();
        resources.sort();
        f.debug_struct("DecoderRegistry").field("resources", &resources).finish()
    }
}

impl DecoderRegistry {
    pub fn empty() -> Self {
        Self { decoders: HashMap::new(), fallback: decode_envelope }
    }

    pub fn register(&mut self, resource: impl Into<String>, decoder: Decoder) {
        self.decoders.insert(resource.into(), decoder);
    }

    pub fn has_decoder(&self, resource: &str) -> bool {
        self.decoders.contains_key(resource)
    }

    pub fn decode(&self, resource: &str, body: &[u8]) -> Result<ResourceData, DecodeError> {
        let decoder = self.decoders.get(resource).copied().unwrap_or(self.fallback);
        decoder(resource, body)
    }
}

fn parse_json(body: &[u8]) -> Result<Value, DecodeError> {
    serde_json::from_slice(body).map_err(|error| DecodeError::InvalidJson(error.to_string()))
}

fn decode_records<T: DeserializeOwned>(resource: &str, body: &[u8]) -> Result<Vec<T>, DecodeError> {
    let flat = flatten(&parse_json(body)?);
    let list: RecordList<T> = serde_json::from_value(flat).map_err(|error| DecodeError::Shape {
        resource: resource.to_string(),
        detail: error.to_string(),
    })?;
    Ok(list.results)
}

fn decode_raw(_resource: &str, body: &[u8]) -> Result<ResourceData, DecodeError> {
    parse_json(body).map(ResourceData::Raw)
}

/// Envelope first (keeping only `results`), then the raw body.
fn decode_envelope(_resource: &str, body: &[u8]) -> Result<ResourceData, DecodeError> {
    let value = parse_json(body)?;
    let results = match &value {
        Value::Object(map) => map.get("results").cloned(),
        _ => None,
    };
    Ok(ResourceData::Raw(results.unwrap_or(value)))
}
