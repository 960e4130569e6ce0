use bytes::Bytes;
use chrono::{SecondsFormat, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::types::EventId;

/// Value of the `source` field on every event.
pub const EVENT_SOURCE: &str = "bp-monitor-microservice";

/// Value of the `version` field on every event.
pub const PROTOCOL_VERSION: &str = "1.0";

/// Immutable notification record.
///
/// Serializes to the wire body `{event_id, event_type, timestamp, data,
/// source, version}` in that field order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Event {
    event_id: EventId,
    event_type: String,
    timestamp: String,
    data: Value,
    source: String,
    version: String,
}

impl Event {
    /// Build an event stamped with the current time.
    ///
    /// Without `custom_id` the id is `"{event_type}_{8 hex digits}"`.
    pub fn create(event_type: impl Into<String>, data: Value, custom_id: Option<&str>) -> Self {
        let event_type = event_type.into();
        let event_id = match custom_id {
            Some(id) => id.to_string(),
            None => generated_id(&event_type),
        };

        Self {
            event_id: EventId(event_id),
            event_type,
            timestamp: now_iso(),
            data,
            source: EVENT_SOURCE.to_string(),
            version: PROTOCOL_VERSION.to_string(),
        }
    }

    pub fn id(&self) -> &EventId {
        &self.event_id
    }

    pub fn event_type(&self) -> &str {
        &self.event_type
    }

    /// ISO-8601 creation time.
    pub fn timestamp(&self) -> &str {
        &self.timestamp
    }

    pub fn data(&self) -> &Value {
        &self.data
    }

    pub fn source(&self) -> &str {
        &self.source
    }

    pub fn version(&self) -> &str {
        &self.version
    }

    /// Serialize the event into the request body.
    ///
    /// The returned bytes are what gets signed and what gets sent.
    pub fn to_body(&self) -> Result<Bytes, serde_json::Error> {
        serde_json::to_vec(self).map(Bytes::from)
    }
}

/// Current UTC time as RFC 3339 with microseconds.
pub(crate) fn now_iso() -> String {
    Utc::now().to_rfc3339_opts(SecondsFormat::Micros, true)
}

pub(crate) fn random_hex8() -> String {
    format!("{:08x}", fastrand::u32(..))
}

fn generated_id(event_type: &str) -> String {
    format!("{}_{}", event_type, random_hex8())
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn generated_id_has_type_prefix_and_hex_suffix() {
        let event = Event::create("alert", json!({}), None);
        let id = &event.id().0;
        let suffix = id.strip_prefix("alert_").expect("type prefix");
        assert_eq!(suffix.len(), 8);
        assert!(suffix.chars().all(|c| c.is_ascii_hexdigit()));
    }

    #[test]
    fn custom_id_is_kept() {
        let event = Event::create("bp_reading", json!({"x": 1}), Some("bp_42"));
        assert_eq!(event.id().0, "bp_42");
        assert_eq!(event.source(), EVENT_SOURCE);
        assert_eq!(event.version(), PROTOCOL_VERSION);
    }

    #[test]
    fn timestamp_is_rfc3339() {
        let event = Event::create("status", json!(null), None);
        assert!(chrono::DateTime::parse_from_rfc3339(event.timestamp()).is_ok());
    }

    #[test]
    fn body_has_wire_field_order() {
        let event = Event::create("alert", json!({"level": "high"}), Some("a1"));
        let body = event.to_body().unwrap();
        let text = std::str::from_utf8(&body).unwrap();

        let positions: Vec<usize> = ["event_id", "event_type", "timestamp", "data", "source", "version"]
            .iter()
            .map(|field| text.find(&format!("\"{}\"", field)).expect("field present"))
            .collect();
        assert!(positions.windows(2).all(|w| w[0] < w[1]), "{}", text);
    }
}
