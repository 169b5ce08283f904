//! Vibration alarm engine for structure monitoring.
//!
//! Telemetry is polled from a REST backend, evaluated against threshold
//! profiles into [`RiskState`](api_client::types::RiskState) flags, and
//! fed to an alarm state machine that drives a siren loop. A render
//! surface (the dashboard) consumes all of it through the HTTP API.

pub mod alarm;
pub mod api;
pub mod api_client;
pub mod backend;
pub mod config;
pub mod error;
pub mod risk;
pub mod siren;
pub mod telemetry;
pub mod tracing;
pub mod types;
