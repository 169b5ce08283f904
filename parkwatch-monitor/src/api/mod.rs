//! HTTP API consumed by the dashboard and `parkwatch-cli`.

pub mod commands;
mod server;
mod v0;

pub use server::{SharedState, build_router, serve};
