//! An in-process webhook fan-out engine.
//!
//! Producers hand an event to a [`Dispatcher`]; it selects every enabled
//! endpoint subscribed to the event type, POSTs the signed JSON body to
//! each of them with linear-backoff retries, and returns a
//! [`DeliveryReport`].
//!
//! ## Guarantees
//! - Per-endpoint isolation: one failing receiver never blocks the others
//! - `dispatch` never fails; failures are reported, not raised
//! - Bodies are signed over the exact bytes sent
//! - Lock-free, lossless delivery counters
//!
//! ## Non-Guarantees
//! - Durability across restarts
//! - Ordering between events or endpoints
//! - Results of deliveries still running after the join timeout
//!
//! Only a `200` response counts as delivered.

mod diagnostics;
mod dispatcher;
mod domain;
mod error;
mod event;
mod registry;
mod signing;
mod stats;
mod transport;
mod types;
mod worker;

pub use diagnostics::TestOutcome;
pub use dispatcher::{Dispatcher, DispatcherConfig};
pub use domain::{alert_level, assess_reading_severity, BpReading, Prediction, Severity};
pub use error::{DeliveryFailure, DiagnosticsError, RegistrationError};
pub use event::{Event, EVENT_SOURCE, PROTOCOL_VERSION};
pub use signing::{sign, SIGNATURE_HEADER};
pub use stats::{DeliveryCounters, EndpointCounts, StatsSnapshot};
pub use transport::{HttpTransport, OutboundRequest, Transport};
pub use types::{
    DeliveryAttemptResult,
    DeliveryReport,
    DispatchMode,
    Endpoint,
    EndpointId,
    EndpointRegistration,
    EventId,
};
pub use worker::USER_AGENT;
