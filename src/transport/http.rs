use std::time::Duration;

use reqwest::Client;
use serde_json::Value;
use tracing::{debug, error};

use crate::config::{SERVICE_PLACEHOLDER, SdkConfig};
use crate::errors::Error;

use super::{ApiRequest, Method, Transport};

const USER_AGENT: &str = concat!("sdk-token-rust/", env!("CARGO_PKG_VERSION"));
const LOGGED_BODY_CHARS: usize = 200;

/// reqwest-backed transport rooted at a base URL that may contain a
/// `{service}` placeholder.
#[derive(Clone, Debug)]
pub struct HttpTransport {
    client: Client,
    base_url: String,
    timeout: Duration,
}

impl HttpTransport {
    pub fn new(base_url: impl Into<String>, timeout: Duration) -> Result<Self, Error> {
        let client = Client::builder()
            .timeout(timeout)
            .user_agent(USER_AGENT)
            .build()?;
        Ok(Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            timeout,
        })
    }

    pub fn from_config(config: &SdkConfig) -> Result<Self, Error> {
        Self::new(config.base_url.as_str(), config.effective_request_timeout())
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// Builds the absolute URL for an endpoint, substituting the service name
    /// into the base URL when one is given.
    pub fn resolve_url(&self, endpoint: &str, service: &str) -> String {
        let base = if service.is_empty() {
            self.base_url.clone()
        } else {
            self.base_url.replace(SERVICE_PLACEHOLDER, service)
        };
        format!("{}/{}", base, endpoint.trim_start_matches('/'))
    }

    fn map_send_error(&self, err: reqwest::Error) -> Error {
        if err.is_timeout() {
            error!(timeout_ms = self.timeout.as_millis() as u64, "request timeout");
            Error::Timeout(self.timeout)
        } else if err.is_builder() {
            Error::from(err)
        } else {
            error!(error = %err, "network error");
            Error::Network {
                status: 0,
                body: err.to_string(),
            }
        }
    }
}

impl Transport for HttpTransport {
    async fn send(&self, request: ApiRequest) -> Result<Value, Error> {
        let url = self.resolve_url(&request.endpoint, &request.service);
        debug!(method = %request.method, url = %url, "http.request");

        let mut builder = match request.method {
            Method::Get => self.client.get(&url),
            Method::Post => self.client.post(&url),
            Method::Put => self.client.put(&url),
        };
        for (name, value) in &request.headers {
            builder = builder.header(name.as_str(), value.as_str());
        }
        if let Some(body) = request.body.as_ref()
            && matches!(request.method, Method::Post | Method::Put)
        {
            builder = builder.json(body);
        }

        let resp = builder.send().await.map_err(|e| self.map_send_error(e))?;
        let status = resp.status();
        let body = resp.text().await.map_err(|e| self.map_send_error(e))?;
        if !status.is_success() {
            error!(status = status.as_u16(), body = %body, "http.failure");
            return Err(Error::Network {
                status: status.as_u16(),
                body,
            });
        }

        let preview: String = body.chars().take(LOGGED_BODY_CHARS).collect();
        debug!(status = status.as_u16(), body = %preview, "http.response");
        if body.trim().is_empty() {
            return Ok(Value::Null);
        }
        Ok(serde_json::from_str(&body)?)
    }
}
