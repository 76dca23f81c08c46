//! Relay orchestration module.

mod input;
mod orchestrator;
mod stats;

pub use orchestrator::{Relay, RelayConfig};
pub use stats::{RelayStats, SinkStats};
