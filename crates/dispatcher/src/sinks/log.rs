//! LogSink - logs batch summary via tracing

use contracts::{BatchSink, ContractError, DeliveryReport};
use serde::Serialize;
use tracing::{debug, info, instrument};

/// Sink that logs batch summaries for debugging
#[derive(Debug)]
pub struct LogSink {
    name: String,
    batches: u64,
}

impl LogSink {
    /// Create a new LogSink with the given name
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            batches: 0,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    fn log_batch<T: Serialize>(&mut self, batch: &[T]) {
        self.batches += 1;
        info!(
            sink = %self.name,
            batch = self.batches,
            items = batch.len(),
            "Batch received"
        );

        for (index, item) in batch.iter().enumerate() {
            match serde_json::to_string(item) {
                Ok(json) => debug!(sink = %self.name, index, item = %json, "Batch item"),
                Err(e) => debug!(sink = %self.name, index, error = %e, "Batch item not serializable"),
            }
        }
    }
}

impl<T> BatchSink<T> for LogSink
where
    T: Serialize + Send + Sync,
{
    fn name(&self) -> &str {
        &self.name
    }

    #[instrument(
        name = "log_sink_deliver",
        skip(self, batch),
        fields(sink = %self.name, items = batch.len())
    )]
    async fn deliver(&mut self, batch: Vec<T>) -> Result<DeliveryReport, ContractError> {
        self.log_batch(&batch);
        Ok(DeliveryReport::all(batch.len()))
    }

    #[instrument(name = "log_sink_close", skip(self))]
    async fn close(&mut self) -> Result<(), ContractError> {
        info!(sink = %self.name, batches = self.batches, "LogSink closed");
        Ok(())
    }
}
