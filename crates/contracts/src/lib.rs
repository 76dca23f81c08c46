//! # Contracts
//!
//! Frozen interface contracts shared by every batch-relay crate: the sink
//! trait, delivery outcomes, the error-report payload and the configuration
//! blueprint. Business crates depend on this crate, never the reverse.
//!
//! ## Delivery Model
//! - Items are opaque to the dispatcher; only sinks look inside them
//! - A failed delivery is never retried (at-most-once)

mod blueprint;
mod error;
mod report;
mod sink;

pub use blueprint::*;
pub use error::*;
pub use report::ErrorReport;
pub use sink::*;
