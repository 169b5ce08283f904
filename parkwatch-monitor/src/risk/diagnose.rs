//! Diagnose scan results and the damage rules applied to them.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::telemetry::parse::{lenient_bool, lenient_f64, lenient_string};

/// Result of an on-demand diagnose scan, keyed by inspection point.
pub type DiagnoseMap = BTreeMap<String, InspectionPoint>;

/// Scan outcome for a single inspection point.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct InspectionPoint {
    #[serde(default)]
    pub damage_report: Option<DamageReport>,
    /// Free-text operator or model note attached to the scan.
    #[serde(default, deserialize_with = "lenient_string")]
    pub message: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct DamageReport {
    #[serde(default, deserialize_with = "lenient_bool")]
    pub triggered: bool,
    #[serde(default, deserialize_with = "lenient_string")]
    pub type_of_damage: Option<String>,
    #[serde(default, deserialize_with = "lenient_string")]
    pub severity: Option<String>,
    #[serde(default, deserialize_with = "lenient_f64")]
    pub initial_level: Option<f64>,
    #[serde(default, deserialize_with = "lenient_f64")]
    pub latest_level: Option<f64>,
    #[serde(default, deserialize_with = "lenient_f64")]
    pub increase_fraction: Option<f64>,
    #[serde(default, deserialize_with = "lenient_string")]
    pub location: Option<String>,
}

/// How a damage rule treats the report's `triggered` flag.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TriggerPolicy {
    /// Only reports the scanner marked as triggered count.
    RequireTriggered,
    /// A matching damage type counts whether triggered or not.
    IgnoreTriggered,
}

/// Keyword match on `type_of_damage` plus a trigger policy.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DamageRule {
    pub keywords: &'static [&'static str],
    pub policy: TriggerPolicy,
}

pub const CRACK_RULE: DamageRule = DamageRule {
    keywords: &["crack"],
    policy: TriggerPolicy::RequireTriggered,
};

pub const DIRT_RULE: DamageRule = DamageRule {
    keywords: &["dirt", "surface"],
    policy: TriggerPolicy::IgnoreTriggered,
};

impl DamageRule {
    pub fn matches(&self, report: &DamageReport) -> bool {
        if self.policy == TriggerPolicy::RequireTriggered && !report.triggered {
            return false;
        }

        let Some(damage) = report.type_of_damage.as_deref() else {
            return false;
        };
        let damage = damage.to_lowercase();
        self.keywords.iter().any(|keyword| damage.contains(keyword))
    }
}

/// A scan note reports damage unless it says "good" or "no" anywhere.
///
/// Plain substring match, so "no" also matches inside words.
pub fn message_reports_damage(message: &str) -> bool {
    let message = message.to_lowercase();
    !message.contains("good") && !message.contains("no")
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn report(triggered: bool, damage: &str) -> DamageReport {
        DamageReport {
            triggered,
            type_of_damage: Some(damage.to_string()),
            ..Default::default()
        }
    }

    #[test]
    fn crack_rule_requires_triggered() {
        assert!(CRACK_RULE.matches(&report(true, "Crack line")));
        assert!(!CRACK_RULE.matches(&report(false, "Crack line")));
    }

    #[test]
    fn dirt_rule_ignores_triggered() {
        assert!(DIRT_RULE.matches(&report(false, "Dirt accumulation")));
        assert!(DIRT_RULE.matches(&report(true, "SURFACE stain")));
        assert!(!DIRT_RULE.matches(&report(true, "Crack line")));
    }

    #[test]
    fn rule_without_damage_type_never_matches() {
        let report = DamageReport {
            triggered: true,
            ..Default::default()
        };
        assert!(!CRACK_RULE.matches(&report));
        assert!(!DIRT_RULE.matches(&report));
    }

    #[test]
    fn message_negations() {
        assert!(message_reports_damage("Hairline fracture on beam 3"));
        assert!(!message_reports_damage("All Good"));
        assert!(!message_reports_damage("No damage found"));
        // substring semantics
        assert!(!message_reports_damage("Anomaly near joint"));
    }

    #[test]
    fn decodes_scan_map() {
        let map: DiagnoseMap = serde_json::from_value(json!({
            "A1": {"damage_report": {
                "triggered": true,
                "type_of_damage": "Crack line",
                "severity": 2,
                "initial_level": "0.10",
                "latest_level": 0.18,
                "increase_fraction": 0.8,
                "location": "Platform A-1"
            }},
            "B1": {"message": "surface looks good"}
        }))
        .unwrap();

        let a1 = map["A1"].damage_report.as_ref().unwrap();
        assert!(a1.triggered);
        assert_eq!(a1.severity.as_deref(), Some("2"));
        assert_eq!(a1.initial_level, Some(0.10));
        assert!(map["B1"].damage_report.is_none());
        assert_eq!(map["B1"].message.as_deref(), Some("surface looks good"));
    }

    #[test]
    fn triggered_flag_is_lenient() {
        let map: DiagnoseMap = serde_json::from_value(json!({
            "A1": {
                "damage_report": {"triggered": null, "type_of_damage": "Crack line"},
                "message": "Crack spreading"
            },
            "A2": {"damage_report": {"triggered": "true", "type_of_damage": "Crack line"}},
            "A3": {"damage_report": {"triggered": 1, "type_of_damage": "Crack line"}},
            "A4": {"damage_report": {"triggered": "false", "type_of_damage": "Crack line"}}
        }))
        .unwrap();

        let a1 = &map["A1"];
        assert!(!a1.damage_report.as_ref().unwrap().triggered);
        assert!(message_reports_damage(a1.message.as_deref().unwrap()));
        assert!(CRACK_RULE.matches(map["A2"].damage_report.as_ref().unwrap()));
        assert!(CRACK_RULE.matches(map["A3"].damage_report.as_ref().unwrap()));
        assert!(!CRACK_RULE.matches(map["A4"].damage_report.as_ref().unwrap()));
    }
}
