//! JSON payloads served by the telemetry backend.

use serde::Deserialize;
use serde_json::Value;

use crate::risk::{DiagnoseMap, InspectionPoint};
use crate::telemetry::parse::lenient_f64;
use crate::tracing::prelude::*;

/// `GET /api/metrics`
#[derive(Debug, Clone, Default, Deserialize)]
pub struct MetricsResponse {
    #[serde(default)]
    pub metrics: Vec<MetricRecord>,
}

/// One row of the metrics feed, oldest first.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct MetricRecord {
    #[serde(default)]
    pub time: Option<String>,
    #[serde(default, deserialize_with = "lenient_f64")]
    pub temperature: Option<f64>,
    #[serde(default, deserialize_with = "lenient_f64")]
    pub vibration: Option<f64>,
    #[serde(default, deserialize_with = "lenient_f64")]
    pub battery: Option<f64>,
}

/// `GET /api/temperature`
#[derive(Debug, Clone, Default, Deserialize)]
pub struct EnvironmentResponse {
    #[serde(default)]
    pub data: Vec<EnvironmentRecord>,
}

/// One row of the environment sensor feed, oldest first.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct EnvironmentRecord {
    #[serde(default)]
    pub time: Option<String>,
    #[serde(default)]
    pub principal: Option<String>,
    #[serde(default)]
    pub model_id: Option<String>,
    #[serde(default, deserialize_with = "lenient_f64")]
    pub battery_v: Option<f64>,
    #[serde(default, deserialize_with = "lenient_f64")]
    pub humidity: Option<f64>,
    #[serde(default, deserialize_with = "lenient_f64")]
    pub temperature_0: Option<f64>,
    #[serde(default, deserialize_with = "lenient_f64")]
    pub temperature_1: Option<f64>,
}

/// `POST /api/diagnose`
///
/// Entries that are not inspection-point objects (status strings and
/// the like) are skipped rather than failing the whole scan.
pub fn diagnose_from_value(value: Value) -> DiagnoseMap {
    let Value::Object(entries) = value else {
        return DiagnoseMap::new();
    };
    entries
        .into_iter()
        .filter_map(|(point, entry)| {
            if !entry.is_object() {
                warn!(point = %point, "Skipping non-object diagnose entry");
                return None;
            }
            match serde_json::from_value::<InspectionPoint>(entry) {
                Ok(parsed) => Some((point, parsed)),
                Err(e) => {
                    warn!(point = %point, error = %e, "Skipping malformed diagnose entry");
                    None
                }
            }
        })
        .collect()
}
