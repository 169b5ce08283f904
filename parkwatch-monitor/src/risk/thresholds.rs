use serde::{Deserialize, Serialize};
use strum::{Display, EnumString, VariantNames};

use crate::error::{Error, Result};

/// Humidity above this (%) is a fault in every profile.
const HUMIDITY_FAULT_PCT: f64 = 80.0;

/// Named threshold sets, one per deployment.
///
/// `Structural` is the canonical set for the parking-structure sensors.
/// `Ambient` is for enclosures reporting ambient rather than surface
/// temperature, and `Legacy` keeps the wider vibration fault band of the
/// first sensor generation.
#[derive(
    Debug,
    Default,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Display,
    EnumString,
    VariantNames,
    Serialize,
    Deserialize,
)]
#[strum(serialize_all = "lowercase", ascii_case_insensitive)]
#[serde(rename_all = "lowercase")]
pub enum ThresholdProfile {
    #[default]
    Structural,
    Ambient,
    Legacy,
}

impl ThresholdProfile {
    pub fn thresholds(self) -> ThresholdSet {
        match self {
            ThresholdProfile::Structural => ThresholdSet {
                temperature_fault_c: 300.0,
                vibration_fault_mm_s: 2.0,
                vibration_alarm_mm_s: 5.0,
                humidity_fault_pct: HUMIDITY_FAULT_PCT,
            },
            ThresholdProfile::Ambient => ThresholdSet {
                temperature_fault_c: 85.0,
                vibration_fault_mm_s: 2.0,
                vibration_alarm_mm_s: 5.0,
                humidity_fault_pct: HUMIDITY_FAULT_PCT,
            },
            ThresholdProfile::Legacy => ThresholdSet {
                temperature_fault_c: 300.0,
                vibration_fault_mm_s: 3.0,
                vibration_alarm_mm_s: 5.0,
                humidity_fault_pct: HUMIDITY_FAULT_PCT,
            },
        }
    }
}

/// Fault and alarm limits. All comparisons are strict (`value > limit`).
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ThresholdSet {
    pub temperature_fault_c: f64,
    pub vibration_fault_mm_s: f64,
    pub vibration_alarm_mm_s: f64,
    pub humidity_fault_pct: f64,
}

impl Default for ThresholdSet {
    fn default() -> Self {
        ThresholdProfile::default().thresholds()
    }
}

impl ThresholdSet {
    /// Reject sets where an alarm could fire without the matching fault.
    pub fn validate(&self) -> Result<()> {
        let limits = [
            ("temperature_fault_c", self.temperature_fault_c),
            ("vibration_fault_mm_s", self.vibration_fault_mm_s),
            ("vibration_alarm_mm_s", self.vibration_alarm_mm_s),
            ("humidity_fault_pct", self.humidity_fault_pct),
        ];
        if let Some((name, value)) = limits.iter().find(|(_, value)| !value.is_finite()) {
            return Err(Error::Config(format!("{name} must be finite, got {value}")));
        }

        if self.vibration_alarm_mm_s < self.vibration_fault_mm_s {
            return Err(Error::Config(format!(
                "vibration alarm threshold ({}) is below the fault threshold ({})",
                self.vibration_alarm_mm_s, self.vibration_fault_mm_s
            )));
        }

        Ok(())
    }
}
