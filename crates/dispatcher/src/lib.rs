//! # Dispatcher
//!
//! 防抖批量分发模块。
//!
//! 负责：
//! - 收集提交的条目，合并为待发送批次
//! - 静默延迟后把批次一次性交给 sink
//! - 同一时刻最多只有一个批次在投递
//!
//! 投递语义为至多一次：失败的批次交给 `FailureLogger` 记录，不重试。

pub mod dispatcher;
pub mod error;
pub mod failure;
pub mod metrics;
pub mod sinks;
pub mod spawner;

pub use contracts::{BatchSink, DeliveryReport, ErrorReport, ShutdownPolicy};
pub use dispatcher::{
    create_dispatcher, BatchDispatcher, DispatcherBuilder, DispatcherConfig, FlushOutcome,
    ShutdownReport,
};
pub use error::DispatcherError;
pub use failure::{FailureLogger, FlushContext, TracingFailureLogger};
pub use metrics::{DispatcherMetrics, MetricsSnapshot};
pub use sinks::{create_sink, AnySink, FileSink, FileSinkConfig, HttpSink, HttpSinkConfig, LogSink};
pub use spawner::{BoxedTask, Spawner, TokioSpawner};
