use std::borrow::Borrow;
use std::collections::{BTreeSet, HashMap};
use std::fmt;
use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Unique identifier for an endpoint.
///
/// This is a strongly-typed wrapper to avoid accidental mixing
/// of endpoint IDs with other string identifiers.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct EndpointId(pub String);

impl From<&str> for EndpointId {
    fn from(id: &str) -> Self {
        EndpointId(id.to_string())
    }
}

impl From<String> for EndpointId {
    fn from(id: String) -> Self {
        EndpointId(id)
    }
}

impl Borrow<str> for EndpointId {
    fn borrow(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for EndpointId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Unique identifier for an event.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct EventId(pub String);

impl fmt::Display for EventId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// A registered receiver of events.
///
/// Endpoints are owned by the registry. Everything handed out by the
/// dispatcher is a snapshot copy; mutating it has no effect on delivery.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Endpoint {
    /// Logical identifier for the endpoint.
    pub id: EndpointId,

    /// Target URL for webhook delivery.
    pub url: String,

    /// Event types this endpoint subscribes to.
    pub event_types: BTreeSet<String>,

    /// Secret for HMAC signing. Never serialized.
    #[serde(skip_serializing, default)]
    pub secret: Option<String>,

    pub enabled: bool,

    /// Retries after the initial attempt.
    pub max_retries: u32,

    /// Maximum time allowed for a single delivery attempt.
    pub timeout: Duration,

    /// Extra headers sent with every delivery.
    pub headers: HashMap<String, String>,
}

impl Endpoint {
    /// Whether an event of `event_type` should be delivered here.
    pub fn accepts(&self, event_type: &str) -> bool {
        self.enabled && self.event_types.contains(event_type)
    }
}

/// A request to register an endpoint.
///
/// Unset secret, retry count and timeout fall back to the dispatcher
/// defaults when the registration is applied.
#[derive(Debug, Clone)]
pub struct EndpointRegistration {
    pub id: EndpointId,
    pub url: String,
    pub event_types: BTreeSet<String>,
    pub secret: Option<String>,
    pub enabled: bool,
    pub max_retries: Option<u32>,
    pub timeout: Option<Duration>,
    pub headers: HashMap<String, String>,
}

impl EndpointRegistration {
    /// Create a new, enabled registration with default delivery settings.
    pub fn new<I, S>(id: impl Into<String>, url: impl Into<String>, event_types: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            id: EndpointId(id.into()),
            url: url.into(),
            event_types: event_types.into_iter().map(Into::into).collect(),
            secret: None,
            enabled: true,
            max_retries: None,
            timeout: None,
            headers: HashMap::new(),
        }
    }

    /// Set a secret for HMAC signing.
    pub fn with_secret(mut self, secret: impl Into<String>) -> Self {
        self.secret = Some(secret.into());
        self
    }

    /// Register the endpoint enabled or disabled.
    pub fn with_enabled(mut self, enabled: bool) -> Self {
        self.enabled = enabled;
        self
    }

    /// Set the maximum number of retry attempts.
    pub fn with_max_retries(mut self, max_retries: u32) -> Self {
        self.max_retries = Some(max_retries);
        self
    }

    /// Set a custom timeout for delivery attempts.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    /// Add an extra header sent with every delivery.
    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.insert(name.into(), value.into());
        self
    }
}

/// How `dispatch` runs the per-endpoint deliveries.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DispatchMode {
    /// One task per endpoint, joined within the configured window.
    Concurrent,
    /// One endpoint after another.
    Sequential,
}

/// Outcome of delivering one event to one endpoint.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeliveryAttemptResult {
    pub endpoint_id: EndpointId,
    pub url: String,
    pub attempts: u32,
    pub success: bool,
    pub error: Option<String>,
}

/// Summary of one `dispatch` call.
///
/// `endpoints_sent + endpoints_failed == endpoints_matched` always holds.
/// Deliveries abandoned at the join timeout count as failed and have no
/// entry in `results`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeliveryReport {
    pub event_id: EventId,
    pub event_type: String,
    pub endpoints_matched: usize,
    pub endpoints_sent: usize,
    pub endpoints_failed: usize,
    pub endpoints_abandoned: usize,
    pub results: Vec<DeliveryAttemptResult>,
}

impl DeliveryReport {
    pub(crate) fn assemble(
        event_id: EventId,
        event_type: String,
        endpoints_matched: usize,
        results: Vec<DeliveryAttemptResult>,
    ) -> Self {
        let endpoints_sent = results.iter().filter(|r| r.success).count();
        let endpoints_abandoned = endpoints_matched.saturating_sub(results.len());
        Self {
            event_id,
            event_type,
            endpoints_matched,
            endpoints_sent,
            endpoints_failed: endpoints_matched - endpoints_sent,
            endpoints_abandoned,
            results,
        }
    }
}
