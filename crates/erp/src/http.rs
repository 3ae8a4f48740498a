use std::collections::BTreeMap;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde_json::{Map, Value};
use tanya_core::config::ErpConfig;
use tanya_core::retry::RetryPolicy;
use tracing::{debug, warn};

use crate::decoders::{BackendEnvelope, DecoderRegistry, ResourceData};
use crate::gateway::{
    Credentials, ErpGateway, GatewayError, NormalizedResult, WRITE_SUCCESS_MESSAGE,
};

/// [`ErpGateway`] over the backend's REST API.
#[derive(Clone, Debug)]
pub struct HttpErpGateway {
    client: Client,
    base_url: String,
    decoders: DecoderRegistry,
    retry: RetryPolicy,
}

impl HttpErpGateway {
    pub fn new(base_url: impl Into<String>, timeout: Duration) -> Result<Self, GatewayError> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|error| GatewayError::Client(error.to_string()))?;
        Ok(Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            decoders: DecoderRegistry::default(),
            retry: RetryPolicy::default(),
        })
    }

    pub fn from_config(config: &ErpConfig) -> Result<Self, GatewayError> {
        Ok(Self::new(&config.base_url, Duration::from_secs(config.timeout_secs))?
            .with_retry(RetryPolicy::with_max_retries(config.max_retries)))
    }

    pub fn with_retry(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    pub fn with_decoders(mut self, decoders: DecoderRegistry) -> Self {
        self.decoders = decoders;
        self
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn url_for(&self, resource: &str) -> String {
        format!("{}/{}", self.base_url, resource.trim().trim_matches('/'))
    }

    async fn get_once(
        &self,
        url: &str,
        params: &BTreeMap<String, String>,
        credentials: &Credentials,
    ) -> Result<Vec<u8>, GatewayError> {
        let response = self
            .client
            .get(url)
            .query(params)
            .header("Authorization", credentials.authorization_header())
            .header("slug", &credentials.tenant)
            .header("Content-Type", "application/json")
            .send()
            .await
            .map_err(transport_error)?;

        let status = response.status();
        let body = response.bytes().await.map_err(transport_error)?;
        if !status.is_success() {
            return Err(GatewayError::Status {
                status: status.as_u16(),
                body: String::from_utf8_lossy(&body).chars().take(500).collect(),
            });
        }
        Ok(body.to_vec())
    }
}

fn transport_error(error: reqwest::Error) -> GatewayError {
    GatewayError::Transport {
        retryable: error.is_timeout() || error.is_connect(),
        message: error.to_string(),
    }
}

fn is_write_accepted(status: StatusCode) -> bool {
    status.is_success() || status.is_redirection()
}

#[async_trait]
impl ErpGateway for HttpErpGateway {
    async fn fetch(
        &self,
        resource: &str,
        params: &BTreeMap<String, String>,
        credentials: &Credentials,
    ) -> NormalizedResult {
        let url = self.url_for(resource);
        debug!(
            resource,
            url = %url,
            params = ?params,
            tenant = %credentials.tenant,
            "fetching backend data"
        );

        let fetched = self.retry.run("erp.fetch", || self.get_once(&url, params, credentials)).await;
        let body = match fetched {
            Ok(body) => body,
            Err(error) => {
                warn!(resource, error = %error, "backend fetch failed");
                return error.into();
            }
        };

        if let Some(envelope) = BackendEnvelope::parse(&body) {
            if let Some(message) = envelope.read_failure() {
                warn!(resource, message = %message, "backend reported a failed read");
                return NormalizedResult::failure(message)
                    .with_error(envelope.error_detail().cloned());
            }
        }

        match self.decoders.decode(resource.trim().trim_matches('/'), &body) {
            Ok(data) => {
                debug!(
                    resource,
                    records = ?data.record_count(),
                    bytes = body.len(),
                    "backend data decoded"
                );
                NormalizedResult::success("OK", Some(data))
            }
            Err(error) => {
                warn!(resource, error = %error, "backend body could not be decoded");
                GatewayError::from(error).into()
            }
        }
    }

    async fn write(
        &self,
        resource: &str,
        fields: &Map<String, Value>,
        credentials: &Credentials,
    ) -> NormalizedResult {
        let url = self.url_for(resource);
        debug!(resource, url = %url, field_count = fields.len(), "posting backend write");

        let response = match self
            .client
            .post(&url)
            .header("Authorization", credentials.authorization_header())
            .header("slug", &credentials.tenant)
            .json(fields)
            .send()
            .await
        {
            Ok(response) => response,
            Err(error) => {
                warn!(resource, error = %error, "backend write failed");
                return transport_error(error).into();
            }
        };

        let status = response.status();
        let body = match response.bytes().await {
            Ok(body) => body,
            Err(error) => return transport_error(error).into(),
        };
        let envelope = BackendEnvelope::parse(&body).unwrap_or_default();
        let business_error = envelope.error_detail().cloned();

        if is_write_accepted(status) {
            let data = envelope.results.map(ResourceData::Raw);
            return NormalizedResult::success(WRITE_SUCCESS_MESSAGE, data)
                .with_error(business_error);
        }

        warn!(
            resource,
            status = status.as_u16(),
            has_detail = business_error.is_some(),
            "backend rejected write"
        );
        let message =
            envelope.message.filter(|message| !message.trim().is_empty()).unwrap_or_else(|| {
                GatewayError::Status {
                    status: status.as_u16(),
                    body: String::from_utf8_lossy(&body).chars().take(500).collect(),
                }
                .to_string()
            });
        NormalizedResult::failure(message).with_error(business_error)
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::HttpErpGateway;

    #[test]
    fn urls_join_base_and_resource_without_double_slashes() {
        let gateway = HttpErpGateway::new("https://erp.example.com/api/v2/", Duration::from_secs(5))
            .expect("client builds");
        assert_eq!(gateway.base_url(), "https://erp.example.com/api/v2");
        assert_eq!(
            gateway.url_for(" /dashboards/daily_sales "),
            "https://erp.example.com/api/v2/dashboards/daily_sales"
        );
    }
}
