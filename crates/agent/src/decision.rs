//! Decoding and validation of the classifier's JSON reply.

use std::collections::BTreeMap;

use serde::{Deserialize, Deserializer};
use serde_json::{Map, Value};
use tanya_core::catalog::{EndpointCatalog, EndpointDefinition};
use tanya_core::domain::routing::{Category, ContactRole, RoutingDecision};
use tanya_core::text::strip_json_fence;
use thiserror::Error;
use tracing::warn;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum DecisionError {
    #[error("reply is not a JSON decision object: {0}")]
    Malformed(String),
    #[error("unknown endpoint `{0}`")]
    UnknownResource(String),
}

/// Decision exactly as the model wrote it.
#[derive(Clone, Debug, Default, Deserialize, PartialEq)]
pub struct RawDecision {
    #[serde(default, rename = "needsInput", alias = "input", deserialize_with = "loose_bool")]
    pub needs_input: bool,
    #[serde(default)]
    pub endpoint: Option<String>,
    #[serde(default, alias = "type")]
    pub category: Option<String>,
    #[serde(default)]
    pub params: Option<Map<String, Value>>,
}

fn loose_bool<'de, D: Deserializer<'de>>(deserializer: D) -> Result<bool, D::Error> {
    Ok(match Option::<Value>::deserialize(deserializer)? {
        Some(Value::Bool(flag)) => flag,
        Some(Value::String(text)) => text.trim().eq_ignore_ascii_case("true"),
        Some(Value::Number(number)) => number.as_i64().is_some_and(|value| value != 0),
        _ => false,
    })
}

impl RawDecision {
    pub fn parse(reply: &str) -> Result<Self, DecisionError> {
        serde_json::from_str(strip_json_fence(reply))
            .map_err(|error| DecisionError::Malformed(error.to_string()))
    }

    fn endpoint_name(&self) -> Option<&str> {
        self.endpoint
            .as_deref()
            .map(|endpoint| endpoint.trim().trim_matches('/'))
            .filter(|endpoint| !endpoint.is_empty() && !endpoint.eq_ignore_ascii_case("null"))
    }

    /// Applies the routing rules in order: write, data-free, read.
    pub fn resolve(self, catalog: &EndpointCatalog) -> Result<RoutingDecision, DecisionError> {
        let label = self.category.clone().unwrap_or_default();
        let mut category = Category::from_label(&label);
        if category == Category::None {
            if let Some(endpoint) = self.endpoint_name().and_then(|name| catalog.get(name)) {
                category = endpoint.category;
            }
        }

        if self.needs_input && category.is_write_eligible() {
            return Ok(self.resolve_write(catalog, category, &label));
        }

        let Some(name) = self.endpoint_name() else {
            return Ok(RoutingDecision::NoData);
        };
        let endpoint =
            catalog.get(name).ok_or_else(|| DecisionError::UnknownResource(name.to_string()))?;
        let filters = allowed_filters(endpoint, self.params.as_ref());
        Ok(RoutingDecision::Read {
            resource: endpoint.resource.to_string(),
            category: endpoint.category,
            filters,
        })
    }

    fn resolve_write(
        self,
        catalog: &EndpointCatalog,
        category: Category,
        label: &str,
    ) -> RoutingDecision {
        let endpoint = catalog.write_target(category);
        let target = endpoint
            .map(|endpoint| endpoint.resource)
            .unwrap_or(if category == Category::Contact { "contacts" } else { "products" });

        if let Some(named) = self.endpoint_name() {
            if named != target {
                warn!(
                    requested = named,
                    resource = target,
                    "re-targeting write to canonical resource"
                );
            }
        }

        let mut fields = self.params.unwrap_or_default();
        if let Some(endpoint) = endpoint {
            fields.retain(|key, _| {
                let accepted = endpoint.accepts_write_field(key);
                if !accepted {
                    warn!(
                        resource = target,
                        field = %key,
                        "dropping field not writable for endpoint"
                    );
                }
                accepted
            });
        }
        if category == Category::Contact {
            if let Some(role) = ContactRole::from_label(label) {
                fields.entry(role.flag_field()).or_insert(Value::Bool(true));
            }
        }

        RoutingDecision::Write { resource: target.to_string(), category, fields }
    }
}

/// Query value as sent on the wire. Nested values are not representable and are skipped.
pub fn param_value(value: &Value) -> Option<String> {
    match value {
        Value::String(text) => Some(text.clone()),
        Value::Bool(flag) => Some(flag.to_string()),
        Value::Number(number) => Some(number.to_string()),
        Value::Null | Value::Array(_) | Value::Object(_) => None,
    }
}

/// Keeps the params the endpoint accepts, logging the rest.
pub fn allowed_filters(
    endpoint: &EndpointDefinition,
    params: Option<&Map<String, Value>>,
) -> BTreeMap<String, String> {
    let mut filters = BTreeMap::new();
    for (key, value) in params.into_iter().flatten() {
        if !endpoint.accepts_param(key) {
            warn!(
                resource = endpoint.resource,
                param = %key,
                "dropping filter not allowed for endpoint"
            );
            continue;
        }
        match param_value(value) {
            Some(value) => {
                filters.insert(key.trim().to_string(), value);
            }
            None => {
                warn!(
                    resource = endpoint.resource,
                    param = %key,
                    "dropping filter with non-scalar value"
                );
            }
        }
    }
    filters
}
