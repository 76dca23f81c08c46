//! Failure reporting for deliveries
//!
//! Delivery failures never travel back into the dispatcher. They go to a
//! `FailureLogger`, synchronously, and the batch is dropped: delivery is
//! at-most-once.

use contracts::ContractError;
use tracing::error;

/// Where a failed delivery happened
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FlushContext {
    /// Dispatcher (sink) name
    pub dispatcher: String,
    /// 1-based flush sequence number
    pub sequence: u64,
    /// Items in the batch
    pub batch_size: usize,
    /// Items the sink did not accept
    pub failed_items: usize,
}

/// Receives delivery failures. Must not panic.
pub trait FailureLogger: Send + Sync {
    fn record(&self, error: &ContractError, context: &FlushContext);
}

/// Logs failures through `tracing`
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingFailureLogger;

impl FailureLogger for TracingFailureLogger {
    fn record(&self, error: &ContractError, context: &FlushContext) {
        error!(
            dispatcher = %context.dispatcher,
            sequence = context.sequence,
            batch_size = context.batch_size,
            failed_items = context.failed_items,
            error = %error,
            "Batch delivery failed, items will not be retried"
        );
    }
}
