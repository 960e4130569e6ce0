use std::time::Duration;

use async_trait::async_trait;
use bytes::Bytes;

use crate::error::DeliveryFailure;

/// A fully built delivery request.
///
/// Built once per endpoint and reused unchanged for every attempt.
#[derive(Debug, Clone)]
pub struct OutboundRequest {
    pub url: String,
    pub headers: Vec<(String, String)>,
    pub body: Bytes,
    pub timeout: Duration,
}

impl OutboundRequest {
    /// First header value with this name, ignoring case.
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(key, _)| key.eq_ignore_ascii_case(name))
            .map(|(_, value)| value.as_str())
    }
}

/// Outbound HTTP used by the dispatcher.
///
/// Returns the status code of a completed exchange, whatever it is.
/// Deciding what counts as success is left to the caller.
#[async_trait]
pub trait Transport: Send + Sync {
    async fn send(&self, request: &OutboundRequest) -> Result<u16, DeliveryFailure>;
}

/// `reqwest`-backed transport. Certificates are always verified.
#[derive(Debug, Clone, Default)]
pub struct HttpTransport {
    client: reqwest::Client,
}

impl HttpTransport {
    pub fn new() -> Self {
        Self::default()
    }

    /// Use a preconfigured client (proxies, connection pool sizing).
    pub fn from_client(client: reqwest::Client) -> Self {
        Self { client }
    }
}

#[async_trait]
impl Transport for HttpTransport {
    async fn send(&self, request: &OutboundRequest) -> Result<u16, DeliveryFailure> {
        let mut http_request = self
            .client
            .post(&request.url)
            .timeout(request.timeout)
            .body(request.body.clone());

        for (name, value) in &request.headers {
            http_request = http_request.header(name.as_str(), value.as_str());
        }

        match http_request.send().await {
            Ok(response) => Ok(response.status().as_u16()),
            Err(err) => {
                if err.is_timeout() {
                    Err(DeliveryFailure::Timeout)
                } else if err.is_connect() {
                    Err(DeliveryFailure::Connection(err.to_string()))
                } else {
                    Err(DeliveryFailure::Unexpected(err.to_string()))
                }
            }
        }
    }
}
