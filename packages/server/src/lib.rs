// Competitive Analysis - API Core
//
// This crate tracks keyword research jobs through a staged pipeline:
// batch search, result fan-out, per-URL analysis and completion.
//
// Stages are stateless and coordinate only through the job store and
// NATS JetStream events.

pub mod common;
pub mod config;
pub mod domains;
pub mod kernel;
pub mod server;

pub use config::*;
