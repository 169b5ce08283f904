//! Edge-triggered vibration alarm.
//!
//! # State Machine
//!
//! ```text
//!           rising edge / manual trigger
//!  Armed ───────────────► Triggered ──► Active
//!    ▲                                    │
//!    │   falling edge / acknowledge       │
//!    └────────────────────────────────────┘
//! ```
//!
//! - **Armed:** no alarm raised. Waiting for the alarm condition.
//! - **Triggered:** transient; the trigger transition sets `triggered`
//!   and immediately activates.
//! - **Active:** siren running, banner and flash visible. Repeated high
//!   readings are suppressed.
//!
//! Edges are tracked on the alarm *condition*, not on the raised flags.
//! An acknowledge while vibration stays high therefore silences the
//! alarm until the condition falls and rises again.

use crate::api_client::types::AlarmPhase;

/// Alarm flags owned by the machine.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct AlarmState {
    pub triggered: bool,
    pub active: bool,
    pub flashing: bool,
}

impl AlarmState {
    pub fn phase(&self) -> AlarmPhase {
        if self.active {
            AlarmPhase::Active
        } else if self.triggered {
            AlarmPhase::Triggered
        } else {
            AlarmPhase::Armed
        }
    }

    fn is_raised(&self) -> bool {
        self.triggered || self.active || self.flashing
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TriggerCause {
    /// Rising edge of the vibration alarm condition.
    Threshold,
    /// Operator double press of the test key.
    Manual,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClearCause {
    /// Vibration fell back to or below the alarm threshold.
    Resolved,
    /// Operator issued the decrease-speed command.
    Acknowledged,
}

/// A transition that callers act on (start or stop the siren).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Transition {
    Activated(TriggerCause),
    Cleared(ClearCause),
}

#[derive(Debug, Default)]
pub struct AlarmMachine {
    condition_high: bool,
    state: AlarmState,
}

impl AlarmMachine {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn state(&self) -> AlarmState {
        self.state
    }

    /// Feed the latest `vibration_alarm` evaluation.
    ///
    /// | condition was | condition is | Result |
    /// |---------------|--------------|--------|
    /// | low  | low  | `None` |
    /// | low  | high | `Activated(Threshold)` unless already raised |
    /// | high | high | `None` |
    /// | high | low  | `Cleared(Resolved)` if still raised |
    pub fn observe(&mut self, vibration_alarm: bool) -> Option<Transition> {
        let was_high = std::mem::replace(&mut self.condition_high, vibration_alarm);
        match (was_high, vibration_alarm) {
            (false, true) => self.trigger(TriggerCause::Threshold),
            (true, false) => self.clear(ClearCause::Resolved),
            _ => None,
        }
    }

    /// Force the trigger transition for a siren test.
    ///
    /// No-op while already active, so a test press during a real alarm
    /// never starts a second siren.
    pub fn manual_trigger(&mut self) -> Option<Transition> {
        if self.state.active {
            return None;
        }
        self.state.triggered = false;
        self.trigger(TriggerCause::Manual)
    }

    /// Silence the alarm regardless of the current vibration.
    pub fn acknowledge(&mut self) -> Option<Transition> {
        self.clear(ClearCause::Acknowledged)
    }

    fn trigger(&mut self, cause: TriggerCause) -> Option<Transition> {
        if self.state.triggered {
            return None;
        }
        self.state.triggered = true;
        self.state.active = true;
        self.state.flashing = true;
        Some(Transition::Activated(cause))
    }

    fn clear(&mut self, cause: ClearCause) -> Option<Transition> {
        let was_raised = self.state.is_raised();
        self.state = AlarmState::default();
        was_raised.then_some(Transition::Cleared(cause))
    }
}
