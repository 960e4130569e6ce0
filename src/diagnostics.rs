//! Operator checks against a single endpoint.

use serde::Serialize;
use serde_json::json;
use tracing::{info, warn};

use crate::dispatcher::Dispatcher;
use crate::error::DiagnosticsError;
use crate::event::{now_iso, random_hex8, Event};
use crate::stats::AttemptOutcome;
use crate::types::{EndpointId, EventId};
use crate::worker::{attempt_once, build_request};

/// Result of `Dispatcher::test_endpoint`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TestOutcome {
    pub endpoint_id: EndpointId,
    pub url: String,
    pub success: bool,
    pub test_event_id: EventId,
    pub timestamp: String,
}

impl Dispatcher {
    /// Send one synthetic `status` event straight to `endpoint_id`.
    ///
    /// Ignores the endpoint's event types and enabled flag, and makes a
    /// single attempt with no retries.
    pub async fn test_endpoint(&self, endpoint_id: &str) -> Result<TestOutcome, DiagnosticsError> {
        let endpoint = self
            .get_endpoint(endpoint_id)
            .await
            .ok_or_else(|| DiagnosticsError::EndpointNotFound {
                endpoint_id: EndpointId::from(endpoint_id),
            })?;

        let now = now_iso();
        let test_id = format!("test_{}", random_hex8());
        let event = Event::create(
            "status",
            json!({
                "test": true,
                "message": "Webhook endpoint test",
                "timestamp": now,
            }),
            Some(&test_id),
        );

        let success = match event.to_body() {
            Ok(body) => {
                let request = build_request(&endpoint, &event, body);
                let ctx = self.worker_context();
                match attempt_once(ctx.transport.as_ref(), &request).await {
                    Ok(()) => {
                        ctx.stats.record(AttemptOutcome::Delivered);
                        true
                    }
                    Err(failure) => {
                        ctx.stats.record(AttemptOutcome::ProbeFailed);
                        warn!(endpoint_id, error = %failure, "endpoint test failed");
                        false
                    }
                }
            }
            Err(err) => {
                warn!(endpoint_id, error = %err, "failed to serialize test event");
                false
            }
        };

        info!(endpoint_id, success, test_event_id = %event.id(), "endpoint test finished");

        Ok(TestOutcome {
            endpoint_id: endpoint.id,
            url: endpoint.url,
            success,
            test_event_id: event.id().clone(),
            timestamp: now,
        })
    }
}
