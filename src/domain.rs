//! Typed constructors for the events the monitoring service emits.

use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};

use crate::dispatcher::Dispatcher;
use crate::event::{now_iso, EVENT_SOURCE};
use crate::types::{DeliveryReport, DispatchMode};

/// A blood pressure measurement.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BpReading {
    pub id: String,
    pub user_id: Option<i64>,
    pub systolic: u32,
    pub diastolic: u32,
    pub heart_rate: u32,
    pub timestamp: String,
    pub device_id: String,
}

/// Model output for one reading.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Prediction {
    pub reading_id: String,
    pub prediction: String,
    pub probability: f64,
    pub risk_level: String,
    pub recommendation: String,
    pub confidence: String,
    pub bp_category: String,
    pub timestamp: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Normal,
    Borderline,
    Elevated,
    High,
    Critical,
}

impl Severity {
    pub fn as_str(&self) -> &'static str {
        match self {
            Severity::Normal => "normal",
            Severity::Borderline => "borderline",
            Severity::Elevated => "elevated",
            Severity::High => "high",
            Severity::Critical => "critical",
        }
    }
}

/// Classify a reading; either value reaching a band is enough.
pub fn assess_reading_severity(reading: &BpReading) -> Severity {
    let (sys, dia) = (reading.systolic, reading.diastolic);
    if sys >= 180 || dia >= 120 {
        Severity::Critical
    } else if sys >= 160 || dia >= 100 {
        Severity::High
    } else if sys >= 140 || dia >= 90 {
        Severity::Elevated
    } else if sys >= 120 || dia >= 80 {
        Severity::Borderline
    } else {
        Severity::Normal
    }
}

/// `high`, `medium` or `low` from the prediction's free-text risk level.
pub fn alert_level(prediction: &Prediction) -> &'static str {
    let risk = prediction.risk_level.to_lowercase();
    if risk.contains("high") || risk.contains("critical") {
        "high"
    } else if risk.contains("medium") {
        "medium"
    } else {
        "low"
    }
}

fn with_additional(mut data: Map<String, Value>, additional: Option<Value>) -> Value {
    if let Some(additional) = additional {
        data.insert("additional_data".to_string(), additional);
    }
    Value::Object(data)
}

impl Dispatcher {
    pub async fn send_reading_event(&self, reading: &BpReading, mode: DispatchMode) -> DeliveryReport {
        let data = json!({
            "reading": reading,
            "severity": assess_reading_severity(reading),
            "timestamp": reading.timestamp,
        });
        let event = self.create_event("bp_reading", data, Some(&format!("bp_{}", reading.id)));
        self.dispatch(&event, mode).await
    }

    pub async fn send_prediction_event(
        &self,
        prediction: &Prediction,
        reading: &BpReading,
        mode: DispatchMode,
    ) -> DeliveryReport {
        let data = json!({
            "prediction": prediction,
            "reading": reading,
            "alert_level": alert_level(prediction),
            "timestamp": prediction.timestamp,
        });
        let event = self.create_event("prediction", data, Some(&format!("pred_{}", prediction.reading_id)));
        self.dispatch(&event, mode).await
    }

    pub async fn send_alert_event(
        &self,
        alert_type: &str,
        message: &str,
        severity: &str,
        additional_data: Option<Value>,
        mode: DispatchMode,
    ) -> DeliveryReport {
        let mut data = Map::new();
        data.insert("alert_type".to_string(), json!(alert_type));
        data.insert("message".to_string(), json!(message));
        data.insert("severity".to_string(), json!(severity));
        data.insert("timestamp".to_string(), json!(now_iso()));

        let event = self.create_event("alert", with_additional(data, additional_data), None);
        self.dispatch(&event, mode).await
    }

    pub async fn send_status_event(
        &self,
        status: &str,
        message: &str,
        additional_data: Option<Value>,
        mode: DispatchMode,
    ) -> DeliveryReport {
        let mut data = Map::new();
        data.insert("status".to_string(), json!(status));
        data.insert("message".to_string(), json!(message));
        data.insert("timestamp".to_string(), json!(now_iso()));
        data.insert("service".to_string(), json!(EVENT_SOURCE));

        let event = self.create_event("status", with_additional(data, additional_data), None);
        self.dispatch(&event, mode).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn reading(systolic: u32, diastolic: u32) -> BpReading {
        BpReading {
            id: "r1".to_string(),
            user_id: Some(7),
            systolic,
            diastolic,
            heart_rate: 72,
            timestamp: "2025-01-01T08:00:00Z".to_string(),
            device_id: "BP_MONITOR_001".to_string(),
        }
    }

    fn prediction(risk_level: &str) -> Prediction {
        Prediction {
            reading_id: "r1".to_string(),
            prediction: "Hypertension Stage 1".to_string(),
            probability: 0.8,
            risk_level: risk_level.to_string(),
            recommendation: "Recheck in a week".to_string(),
            confidence: "high".to_string(),
            bp_category: "stage1".to_string(),
            timestamp: "2025-01-01T08:00:01Z".to_string(),
        }
    }

    #[test]
    fn severity_bands() {
        assert_eq!(assess_reading_severity(&reading(110, 70)), Severity::Normal);
        assert_eq!(assess_reading_severity(&reading(120, 70)), Severity::Borderline);
        assert_eq!(assess_reading_severity(&reading(115, 90)), Severity::Elevated);
        assert_eq!(assess_reading_severity(&reading(165, 85)), Severity::High);
        assert_eq!(assess_reading_severity(&reading(130, 120)), Severity::Critical);
    }

    #[test]
    fn severity_serializes_lowercase() {
        assert_eq!(serde_json::to_value(Severity::Critical).unwrap(), json!("critical"));
        assert_eq!(Severity::Borderline.as_str(), "borderline");
    }

    #[test]
    fn alert_levels() {
        assert_eq!(alert_level(&prediction("Critical")), "high");
        assert_eq!(alert_level(&prediction("HIGH risk")), "high");
        assert_eq!(alert_level(&prediction("Medium")), "medium");
        assert_eq!(alert_level(&prediction("low")), "low");
        assert_eq!(alert_level(&prediction("unknown")), "low");
    }
}
