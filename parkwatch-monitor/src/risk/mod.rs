mod diagnose;
mod evaluator;
mod thresholds;

pub use diagnose::{
    CRACK_RULE, DIRT_RULE, DamageReport, DamageRule, DiagnoseMap, InspectionPoint, TriggerPolicy,
    message_reports_damage,
};
pub use evaluator::ThresholdEvaluator;
pub use thresholds::{ThresholdProfile, ThresholdSet};
