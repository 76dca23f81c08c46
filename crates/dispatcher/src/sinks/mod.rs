//! Sink implementations
//!
//! Contains LogSink, FileSink, and HttpSink, plus [`AnySink`] for picking
//! one from configuration at runtime.

mod file;
mod http;
mod log;

pub use self::file::{FileSink, FileSinkConfig};
pub use self::http::{HttpSink, HttpSinkConfig};
pub use self::log::LogSink;

use contracts::{BatchSink, ContractError, DeliveryReport, SinkConfig, SinkType};
use serde::Serialize;

use crate::error::DispatcherError;

/// A sink chosen by `SinkType`
#[derive(Debug)]
pub enum AnySink {
    Log(LogSink),
    File(FileSink),
    Http(HttpSink),
}

impl AnySink {
    pub fn name(&self) -> &str {
        match self {
            AnySink::Log(sink) => sink.name(),
            AnySink::File(sink) => sink.name(),
            AnySink::Http(sink) => sink.name(),
        }
    }

    pub fn sink_type(&self) -> SinkType {
        match self {
            AnySink::Log(_) => SinkType::Log,
            AnySink::File(_) => SinkType::File,
            AnySink::Http(_) => SinkType::Http,
        }
    }
}

impl<T> BatchSink<T> for AnySink
where
    T: Serialize + Send + Sync,
{
    fn name(&self) -> &str {
        AnySink::name(self)
    }

    async fn deliver(&mut self, batch: Vec<T>) -> Result<DeliveryReport, ContractError> {
        match self {
            AnySink::Log(sink) => sink.deliver(batch).await,
            AnySink::File(sink) => sink.deliver(batch).await,
            AnySink::Http(sink) => sink.deliver(batch).await,
        }
    }

    async fn close(&mut self) -> Result<(), ContractError> {
        match self {
            AnySink::Log(sink) => BatchSink::<T>::close(sink).await,
            AnySink::File(sink) => BatchSink::<T>::close(sink).await,
            AnySink::Http(sink) => BatchSink::<T>::close(sink).await,
        }
    }
}

/// Build a sink from its configuration
pub fn create_sink(config: &SinkConfig) -> Result<AnySink, DispatcherError> {
    match config.sink_type {
        SinkType::Log => Ok(AnySink::Log(LogSink::new(&config.name))),
        SinkType::File => {
            let sink = FileSink::from_params(&config.name, &config.params)
                .map_err(|e| DispatcherError::sink_creation(&config.name, e.to_string()))?;
            Ok(AnySink::File(sink))
        }
        SinkType::Http => {
            let sink = HttpSink::from_params(&config.name, &config.params)
                .map_err(|e| DispatcherError::sink_creation(&config.name, e.to_string()))?;
            Ok(AnySink::Http(sink))
        }
    }
}
