//! BatchSink trait - dispatcher output interface
//!
//! A sink receives a finished batch and reports what happened to it. The
//! report is advisory: the dispatcher logs it and never retries.

use crate::ContractError;

/// Batch output trait
///
/// All sink implementations must implement this trait.
#[trait_variant::make(BatchSink: Send)]
pub trait LocalBatchSink<T> {
    /// Sink name (used for logging/metrics)
    fn name(&self) -> &str;

    /// Deliver one batch, in submission order
    ///
    /// # Errors
    /// Returns an error when nothing in the batch could be delivered.
    /// Per-item rejections go in the returned report instead.
    async fn deliver(&mut self, batch: Vec<T>) -> Result<DeliveryReport, ContractError>;

    /// Close sink
    async fn close(&mut self) -> Result<(), ContractError>;
}

/// Outcome of a single delivery
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DeliveryReport {
    /// Items accepted by the sink
    pub delivered: usize,
    /// Items the sink rejected
    pub failures: Vec<ItemFailure>,
}

impl DeliveryReport {
    /// Every item in a batch of `count` was delivered
    pub fn all(count: usize) -> Self {
        Self {
            delivered: count,
            failures: Vec::new(),
        }
    }

    pub fn is_complete(&self) -> bool {
        self.failures.is_empty()
    }

    pub fn total(&self) -> usize {
        self.delivered + self.failures.len()
    }

    /// Collapse per-item failures into a single error for logging
    pub fn to_error(&self, sink_name: &str) -> Option<ContractError> {
        let first = self.failures.first()?;
        Some(ContractError::PartialDelivery {
            sink_name: sink_name.to_string(),
            failed: self.failures.len(),
            total: self.total(),
            first_message: first.message.clone(),
        })
    }
}

/// A rejected item, identified by its position in the batch
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ItemFailure {
    pub index: usize,
    pub message: String,
}

impl ItemFailure {
    pub fn new(index: usize, message: impl Into<String>) -> Self {
        Self {
            index,
            message: message.into(),
        }
    }
}
