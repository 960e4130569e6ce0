use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use serde_json::Value;
use tokio::task::JoinHandle;
use tokio::time::timeout;
use tracing::{debug, error, info, warn};

use crate::error::RegistrationError;
use crate::event::Event;
use crate::registry::{EndpointDefaults, EndpointRegistry};
use crate::stats::{DeliveryStats, StatsSnapshot};
use crate::transport::{HttpTransport, Transport};
use crate::types::{
    DeliveryAttemptResult, DeliveryReport, DispatchMode, Endpoint, EndpointId, EndpointRegistration,
};
use crate::worker::{build_request, deliver_with_retries, WorkerContext};

#[cfg(feature = "metrics")]
fn metric_inc(name: &'static str) {
    metrics::increment_counter!(name);
}

#[cfg(not(feature = "metrics"))]
fn metric_inc(_name: &'static str) {}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DispatcherConfig {
    /// Secret for registrations that do not bring one.
    pub default_secret: Option<String>,
    pub default_max_retries: u32,
    pub default_timeout: Duration,
    /// Backoff before retry `n` (0-based) is `retry_delay * (n + 1)`.
    pub retry_delay: Duration,
    /// How long a concurrent dispatch waits on each delivery task.
    pub join_timeout: Duration,
    /// Event type to receiver URLs, registered by `load_default_endpoints`.
    pub default_endpoints: BTreeMap<String, Vec<String>>,
}

impl Default for DispatcherConfig {
    fn default() -> Self {
        Self {
            default_secret: None,
            default_max_retries: 3,
            default_timeout: Duration::from_secs(10),
            retry_delay: Duration::from_secs(2),
            join_timeout: Duration::from_secs(30),
            default_endpoints: BTreeMap::new(),
        }
    }
}

impl DispatcherConfig {
    /// Parse a JSON config document. Missing fields keep their defaults.
    pub fn from_json(raw: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(raw)
    }
}

/// Webhook fan-out engine.
///
/// Owns the endpoint registry and the delivery counters. Create one per
/// process and share it (`Arc<Dispatcher>`) with every producer.
pub struct Dispatcher {
    registry: EndpointRegistry,
    ctx: Arc<WorkerContext>,
    config: DispatcherConfig,
}

impl Dispatcher {
    /// Dispatcher delivering over HTTP.
    pub fn new(config: DispatcherConfig) -> Self {
        Self::with_transport(config, Arc::new(HttpTransport::new()))
    }

    pub fn with_transport(config: DispatcherConfig, transport: Arc<dyn Transport>) -> Self {
        let registry = EndpointRegistry::new(EndpointDefaults {
            secret: config.default_secret.clone(),
            max_retries: config.default_max_retries,
            timeout: config.default_timeout,
        });

        let ctx = Arc::new(WorkerContext {
            transport,
            stats: Arc::new(DeliveryStats::new()),
            retry_delay: config.retry_delay,
        });

        Self { registry, ctx, config }
    }

    pub fn config(&self) -> &DispatcherConfig {
        &self.config
    }

    /// Register (or replace) an endpoint. Returns `false` when the URL
    /// lacks a scheme or a host; nothing is stored in that case.
    pub async fn register_endpoint(&self, registration: EndpointRegistration) -> bool {
        let id = registration.id.clone();
        match self.try_register_endpoint(registration).await {
            Ok(()) => true,
            Err(err) => {
                error!(endpoint_id = %id, error = %err, "rejected webhook endpoint");
                false
            }
        }
    }

    /// Like `register_endpoint`, with the rejection reason.
    pub async fn try_register_endpoint(
        &self,
        registration: EndpointRegistration,
    ) -> Result<(), RegistrationError> {
        let id = registration.id.clone();
        let url = registration.url.clone();
        self.registry.add(registration).await?;
        info!(endpoint_id = %id, url = %url, "added webhook endpoint");
        Ok(())
    }

    pub async fn remove_endpoint(&self, endpoint_id: &str) -> bool {
        let removed = self.registry.remove(endpoint_id).await;
        if removed {
            info!(endpoint_id, "removed webhook endpoint");
        }
        removed
    }

    pub async fn enable_endpoint(&self, endpoint_id: &str) -> bool {
        let found = self.registry.set_enabled(endpoint_id, true).await;
        if found {
            info!(endpoint_id, "enabled webhook endpoint");
        }
        found
    }

    pub async fn disable_endpoint(&self, endpoint_id: &str) -> bool {
        let found = self.registry.set_enabled(endpoint_id, false).await;
        if found {
            info!(endpoint_id, "disabled webhook endpoint");
        }
        found
    }

    /// Snapshot of every registered endpoint, ordered by id.
    pub async fn list_endpoints(&self) -> Vec<Endpoint> {
        self.registry.list().await
    }

    pub(crate) async fn get_endpoint(&self, endpoint_id: &str) -> Option<Endpoint> {
        self.registry.get(endpoint_id).await
    }

    pub async fn stats(&self) -> StatsSnapshot {
        StatsSnapshot::new(self.registry.counts().await, self.ctx.stats.counters())
    }

    /// Register every URL in `default_endpoints` as `"{event_type}_{n}"`.
    ///
    /// Invalid URLs are logged and skipped. Returns how many were stored.
    pub async fn load_default_endpoints(&self) -> usize {
        let mut loaded = 0;
        for (event_type, urls) in &self.config.default_endpoints {
            for (index, url) in urls.iter().enumerate() {
                let registration = EndpointRegistration::new(
                    format!("{}_{}", event_type, index + 1),
                    url.clone(),
                    [event_type.clone()],
                );
                if self.register_endpoint(registration).await {
                    loaded += 1;
                }
            }
        }
        loaded
    }

    pub fn create_event(&self, event_type: &str, data: Value, custom_id: Option<&str>) -> Event {
        Event::create(event_type, data, custom_id)
    }

    pub(crate) fn worker_context(&self) -> &WorkerContext {
        &self.ctx
    }

    /// Deliver `event` to every enabled endpoint subscribed to its type.
    ///
    /// Never fails. With `DispatchMode::Concurrent` each delivery runs in
    /// its own task and is awaited for at most `join_timeout`; tasks still
    /// running after that keep going in the background but are reported
    /// as failed.
    pub async fn dispatch(&self, event: &Event, mode: DispatchMode) -> DeliveryReport {
        let matched = self.registry.matching(event.event_type()).await;
        let endpoints_matched = matched.len();

        if matched.is_empty() {
            debug!(event_type = event.event_type(), "no matching endpoints");
            return DeliveryReport::assemble(
                event.id().clone(),
                event.event_type().to_string(),
                0,
                Vec::new(),
            );
        }

        let results = match event.to_body() {
            Ok(body) => {
                let jobs = matched.into_iter().map(|endpoint| {
                    let request = build_request(&endpoint, event, body.clone());
                    (endpoint, request)
                });

                match mode {
                    DispatchMode::Sequential => {
                        let mut results = Vec::with_capacity(endpoints_matched);
                        for (endpoint, request) in jobs {
                            results.push(deliver_with_retries(endpoint, request, self.ctx.clone()).await);
                        }
                        results
                    }
                    DispatchMode::Concurrent => {
                        let handles: Vec<(EndpointId, JoinHandle<DeliveryAttemptResult>)> = jobs
                            .map(|(endpoint, request)| {
                                let id = endpoint.id.clone();
                                let handle = tokio::spawn(deliver_with_retries(endpoint, request, self.ctx.clone()));
                                (id, handle)
                            })
                            .collect();
                        self.join_deliveries(event, handles).await
                    }
                }
            }
            Err(err) => {
                error!(event_id = %event.id(), error = %err, "failed to serialize event");
                matched
                    .into_iter()
                    .map(|endpoint| DeliveryAttemptResult {
                        endpoint_id: endpoint.id,
                        url: endpoint.url,
                        attempts: 0,
                        success: false,
                        error: Some(format!("failed to serialize event: {}", err)),
                    })
                    .collect()
            }
        };

        let report = DeliveryReport::assemble(
            event.id().clone(),
            event.event_type().to_string(),
            endpoints_matched,
            results,
        );
        info!(
            event_id = %report.event_id,
            "webhook event {} sent to {}/{} endpoints",
            report.event_id,
            report.endpoints_sent,
            report.endpoints_matched
        );
        report
    }

    async fn join_deliveries(
        &self,
        event: &Event,
        handles: Vec<(EndpointId, JoinHandle<DeliveryAttemptResult>)>,
    ) -> Vec<DeliveryAttemptResult> {
        let mut results = Vec::with_capacity(handles.len());
        for (endpoint_id, handle) in handles {
            // Dropping the handle on timeout detaches the task.
            match timeout(self.config.join_timeout, handle).await {
                Ok(Ok(result)) => results.push(result),
                Ok(Err(join_err)) => {
                    error!(
                        event_id = %event.id(),
                        endpoint_id = %endpoint_id,
                        error = %join_err,
                        "delivery task did not complete"
                    );
                }
                Err(_) => {
                    metric_inc("webhook.dispatch.abandoned");
                    warn!(
                        event_id = %event.id(),
                        endpoint_id = %endpoint_id,
                        join_timeout_ms = self.config.join_timeout.as_millis() as u64,
                        "delivery still running after join timeout, leaving it in the background"
                    );
                }
            }
        }
        results
    }
}
