use std::sync::Arc;
use std::time::Duration;

use bytes::Bytes;
use tokio::time::sleep;
use tracing::{debug, error, warn};

use crate::error::DeliveryFailure;
use crate::event::Event;
use crate::signing::{signature_header_value, SIGNATURE_HEADER};
use crate::stats::{AttemptOutcome, DeliveryStats};
use crate::transport::{OutboundRequest, Transport};
use crate::types::{DeliveryAttemptResult, Endpoint};

/// Fixed `User-Agent` on every delivery.
pub const USER_AGENT: &str = "BP-Monitor-Microservice/1.0";

#[cfg(feature = "metrics")]
fn metric_inc(name: &'static str) {
    metrics::increment_counter!(name);
}

#[cfg(not(feature = "metrics"))]
fn metric_inc(_name: &'static str) {}

/// Shared context for all delivery tasks.
pub(crate) struct WorkerContext {
    pub transport: Arc<dyn Transport>,
    pub stats: Arc<DeliveryStats>,
    /// Base of the linear backoff.
    pub retry_delay: Duration,
}

/// Build the request for one endpoint around an already serialized body.
///
/// Endpoint headers replace standard headers of the same name. The
/// signature is computed over `body` itself and is added last.
pub(crate) fn build_request(endpoint: &Endpoint, event: &Event, body: Bytes) -> OutboundRequest {
    let mut headers: Vec<(String, String)> = vec![
        ("Content-Type".to_string(), "application/json".to_string()),
        ("User-Agent".to_string(), USER_AGENT.to_string()),
        ("X-Event-Type".to_string(), event.event_type().to_string()),
        ("X-Event-ID".to_string(), event.id().0.clone()),
        ("X-Timestamp".to_string(), event.timestamp().to_string()),
    ];

    let mut extra: Vec<(&String, &String)> = endpoint.headers.iter().collect();
    extra.sort();
    for (name, value) in extra {
        set_header(&mut headers, name, value);
    }

    if let Some(signature) = signature_header_value(&body, endpoint.secret.as_deref()) {
        set_header(&mut headers, SIGNATURE_HEADER, &signature);
    }

    OutboundRequest {
        url: endpoint.url.clone(),
        headers,
        body,
        timeout: endpoint.timeout,
    }
}

fn set_header(headers: &mut Vec<(String, String)>, name: &str, value: &str) {
    match headers.iter_mut().find(|(key, _)| key.eq_ignore_ascii_case(name)) {
        Some(entry) => entry.1 = value.to_string(),
        None => headers.push((name.to_string(), value.to_string())),
    }
}

/// One POST. Only a 200 response counts as delivered.
pub(crate) async fn attempt_once(
    transport: &dyn Transport,
    request: &OutboundRequest,
) -> Result<(), DeliveryFailure> {
    metric_inc("webhook.delivery.attempt");
    match transport.send(request).await? {
        200 => Ok(()),
        status => Err(DeliveryFailure::Status(status)),
    }
}

/// Deliver to one endpoint, retrying up to `endpoint.max_retries` times.
///
/// Never fails: every error ends up in the returned result. Sleeps
/// `retry_delay * (attempt + 1)` between attempts.
pub(crate) async fn deliver_with_retries(
    endpoint: Endpoint,
    request: OutboundRequest,
    ctx: Arc<WorkerContext>,
) -> DeliveryAttemptResult {
    let mut attempt: u32 = 0;

    loop {
        match attempt_once(ctx.transport.as_ref(), &request).await {
            Ok(()) => {
                ctx.stats.record(AttemptOutcome::Delivered);
                metric_inc("webhook.delivery.success");
                debug!(endpoint_id = %endpoint.id, url = %endpoint.url, attempt, "webhook delivered");
                return DeliveryAttemptResult {
                    endpoint_id: endpoint.id,
                    url: endpoint.url,
                    attempts: attempt + 1,
                    success: true,
                    error: None,
                };
            }
            Err(failure) => {
                warn!(
                    endpoint_id = %endpoint.id,
                    url = %endpoint.url,
                    attempt,
                    error = %failure,
                    "webhook attempt failed"
                );

                if attempt < endpoint.max_retries {
                    ctx.stats.record(AttemptOutcome::Retrying);
                    metric_inc("webhook.delivery.retry");
                    sleep(ctx.retry_delay.saturating_mul(attempt + 1)).await;
                    attempt += 1;
                    continue;
                }

                ctx.stats.record(AttemptOutcome::Exhausted);
                metric_inc("webhook.delivery.failure");
                let attempts = attempt + 1;
                error!(endpoint_id = %endpoint.id, url = %endpoint.url, attempts, "webhook delivery failed");
                return DeliveryAttemptResult {
                    endpoint_id: endpoint.id,
                    url: endpoint.url,
                    attempts,
                    success: false,
                    error: Some(format!("Failed after {} attempts", attempts)),
                };
            }
        }
    }
}
