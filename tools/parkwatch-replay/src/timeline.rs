//! Run a capture through the evaluator and alarm machine.

use parkwatch_monitor::alarm::{AlarmMachine, Transition};
use parkwatch_monitor::api_client::types::RiskState;
use parkwatch_monitor::risk::ThresholdEvaluator;

use crate::capture::Reading;

#[derive(Debug, Clone, PartialEq)]
pub enum EventKind {
    /// One or more risk flags changed; holds the flags now raised.
    Risk(Vec<&'static str>),
    Alarm(Transition),
}

#[derive(Debug, Clone, PartialEq)]
pub struct TimelineEvent {
    pub row: usize,
    pub time: String,
    pub vibration_mm_per_sec: f64,
    pub kind: EventKind,
}

#[derive(Debug, Default, Clone, PartialEq)]
pub struct Summary {
    pub readings: usize,
    pub activations: usize,
    pub peak_vibration: f64,
    /// Whether the alarm was still sounding after the last row.
    pub active_at_end: bool,
}

pub fn raised_flags(risk: &RiskState) -> Vec<&'static str> {
    [
        (risk.temp_fault, "temp_fault"),
        (risk.vibration_fault, "vibration_fault"),
        (risk.vibration_alarm, "vibration_alarm"),
        (risk.humidity_fault, "humidity_fault"),
        (risk.crack_detected, "crack_detected"),
        (risk.dirt_detected, "dirt_detected"),
    ]
    .into_iter()
    .filter_map(|(raised, name)| raised.then_some(name))
    .collect()
}

pub fn replay(readings: &[Reading], evaluator: &ThresholdEvaluator) -> (Vec<TimelineEvent>, Summary) {
    let mut machine = AlarmMachine::new();
    let mut previous = RiskState::default();
    let mut events = Vec::new();
    let mut summary = Summary {
        readings: readings.len(),
        ..Default::default()
    };

    for reading in readings {
        let risk = evaluator.evaluate_readings(
            reading.temperature_c,
            reading.vibration_mm_per_sec,
            reading.humidity_pct,
        );
        summary.peak_vibration = summary.peak_vibration.max(reading.vibration_mm_per_sec);

        let event = |kind| TimelineEvent {
            row: reading.row,
            time: reading.time.clone(),
            vibration_mm_per_sec: reading.vibration_mm_per_sec,
            kind,
        };

        if risk != previous {
            events.push(event(EventKind::Risk(raised_flags(&risk))));
            previous = risk;
        }

        if let Some(transition) = machine.observe(risk.vibration_alarm) {
            if matches!(transition, Transition::Activated(_)) {
                summary.activations += 1;
            }
            events.push(event(EventKind::Alarm(transition)));
        }
    }

    summary.active_at_end = machine.state().active;
    (events, summary)
}

#[cfg(test)]
mod tests {
    use super::*;
    use parkwatch_monitor::alarm::{ClearCause, TriggerCause};
    use parkwatch_monitor::risk::{ThresholdProfile, ThresholdSet};
    use test_case::test_case;

    fn readings(vibrations: &[f64]) -> Vec<Reading> {
        vibrations
            .iter()
            .enumerate()
            .map(|(i, &v)| Reading {
                row: i + 1,
                time: format!("t{i}"),
                temperature_c: 20.0,
                vibration_mm_per_sec: v,
                humidity_pct: 40.0,
            })
            .collect()
    }

    fn evaluator(profile: ThresholdProfile) -> ThresholdEvaluator {
        ThresholdEvaluator::new(profile.thresholds(), "A1", "B1")
    }

    fn transitions(events: &[TimelineEvent]) -> Vec<(usize, Transition)> {
        events
            .iter()
            .filter_map(|e| match e.kind {
                EventKind::Alarm(t) => Some((e.row, t)),
                EventKind::Risk(_) => None,
            })
            .collect()
    }

    #[test]
    fn replays_reference_timeline() {
        let (events, summary) = replay(
            &readings(&[1.0, 3.0, 6.0, 6.5, 4.0, 5.5]),
            &evaluator(ThresholdProfile::Structural),
        );

        assert_eq!(
            transitions(&events),
            vec![
                (3, Transition::Activated(TriggerCause::Threshold)),
                (5, Transition::Cleared(ClearCause::Resolved)),
                (6, Transition::Activated(TriggerCause::Threshold)),
            ]
        );
        assert_eq!(summary.activations, 2);
        assert_eq!(summary.peak_vibration, 6.5);
        assert!(summary.active_at_end);
    }

    #[test]
    fn risk_events_only_on_change() {
        let (events, _) = replay(
            &readings(&[1.0, 1.2, 2.5, 2.7, 1.0]),
            &evaluator(ThresholdProfile::Structural),
        );

        let risk_rows: Vec<_> = events
            .iter()
            .filter(|e| matches!(e.kind, EventKind::Risk(_)))
            .map(|e| e.row)
            .collect();
        assert_eq!(risk_rows, vec![3, 5]);
        assert_eq!(events[0].kind, EventKind::Risk(vec!["vibration_fault"]));
        assert_eq!(events[1].kind, EventKind::Risk(vec![]));
    }

    #[test_case(ThresholdProfile::Structural, 1 ; "structural")]
    #[test_case(ThresholdProfile::Legacy, 0 ; "legacy")]
    fn profile_changes_fault_band(profile: ThresholdProfile, risk_events: usize) {
        let (events, _) = replay(&readings(&[2.5]), &evaluator(profile));
        assert_eq!(events.len(), risk_events);
    }

    #[test]
    fn equal_to_threshold_is_not_alarm() {
        let (events, summary) = replay(
            &readings(&[5.0]),
            &ThresholdEvaluator::new(ThresholdSet::default(), "A1", "B1"),
        );
        assert!(transitions(&events).is_empty());
        assert_eq!(summary.activations, 0);
    }
}
