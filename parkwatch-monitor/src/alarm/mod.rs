//! Alarm lifecycle: the pure state machine and the actor that drives the
//! siren from it.

mod controller;
mod machine;

pub use controller::AlarmController;
pub use machine::{AlarmMachine, AlarmState, ClearCause, Transition, TriggerCause};
