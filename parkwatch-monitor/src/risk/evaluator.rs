use super::diagnose::{CRACK_RULE, DIRT_RULE, DiagnoseMap, InspectionPoint, message_reports_damage};
use super::thresholds::ThresholdSet;
use crate::api_client::types::{MetricSample, RiskState};

/// Pure mapping from the latest sample and scan to [`RiskState`].
#[derive(Debug, Clone)]
pub struct ThresholdEvaluator {
    thresholds: ThresholdSet,
    /// Inspection point checked for cracks.
    primary_point: String,
    /// Inspection point checked for dirt / surface damage.
    secondary_point: String,
}

impl ThresholdEvaluator {
    pub fn new(
        thresholds: ThresholdSet,
        primary_point: impl Into<String>,
        secondary_point: impl Into<String>,
    ) -> Self {
        Self {
            thresholds,
            primary_point: primary_point.into(),
            secondary_point: secondary_point.into(),
        }
    }

    pub fn thresholds(&self) -> &ThresholdSet {
        &self.thresholds
    }

    /// Evaluate the current inputs. A missing sample reads as all zeros.
    pub fn evaluate(&self, sample: Option<&MetricSample>, diagnose: &DiagnoseMap) -> RiskState {
        let (temperature, vibration, humidity) = sample
            .map(|s| (s.temperature_c, s.vibration_mm_per_sec, s.humidity_pct))
            .unwrap_or_default();

        let mut risk = self.evaluate_readings(temperature, vibration, humidity);
        risk.crack_detected = crack_detected(diagnose.get(&self.primary_point));
        risk.dirt_detected = dirt_detected(diagnose.get(&self.secondary_point));
        risk
    }

    /// Threshold comparisons only; damage flags stay false.
    pub fn evaluate_readings(&self, temperature_c: f64, vibration: f64, humidity: f64) -> RiskState {
        let t = &self.thresholds;
        RiskState {
            temp_fault: temperature_c > t.temperature_fault_c,
            vibration_fault: vibration > t.vibration_fault_mm_s,
            vibration_alarm: vibration > t.vibration_alarm_mm_s,
            humidity_fault: humidity > t.humidity_fault_pct,
            crack_detected: false,
            dirt_detected: false,
        }
    }
}

fn crack_detected(point: Option<&InspectionPoint>) -> bool {
    let Some(point) = point else {
        return false;
    };
    let Some(report) = &point.damage_report else {
        return false;
    };

    CRACK_RULE.matches(report) || point.message.as_deref().is_some_and(message_reports_damage)
}

fn dirt_detected(point: Option<&InspectionPoint>) -> bool {
    point
        .and_then(|point| point.damage_report.as_ref())
        .is_some_and(|report| DIRT_RULE.matches(report))
}
