//! Telemetry ingestion: lenient parsing, trailing windows and the
//! polling actor.

pub mod parse;
mod poller;
mod window;

pub use poller::TelemetryPoller;
pub use window::{MetricWindow, WINDOW_LEN};
