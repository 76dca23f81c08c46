//! BatchDispatcher - debounced batching in front of a sink
//!
//! Submitted items accumulate in one pending batch. The first item of a
//! batch schedules a flush that fires after the configured delay; every
//! item submitted before that flush takes its snapshot joins the same batch.
//!
//! Two locks are involved:
//! - the state mutex guards `pending` and the scheduled-flush marker and is
//!   never held across an `.await`
//! - the delivery gate owns the sink, so at most one batch is being
//!   delivered at any time
//!
//! Delivery is at-most-once. A failed batch is reported to the
//! [`FailureLogger`] and dropped; callers that need at-least-once must retry
//! inside their sink.

use std::marker::PhantomData;
use std::mem;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::{Duration, Instant};

use contracts::{BatchSink, DispatcherSettings, ShutdownPolicy, SinkConfig};
use tokio::sync::Mutex as AsyncMutex;
use tokio::task::AbortHandle;
use tracing::{debug, info, instrument, warn};

use crate::error::DispatcherError;
use crate::failure::{FailureLogger, FlushContext, TracingFailureLogger};
use crate::metrics::{DispatcherMetrics, MetricsSnapshot};
use crate::sinks::{create_sink, AnySink};
use crate::spawner::Spawner;

/// Dispatcher configuration
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DispatcherConfig {
    /// Quiet delay between the first pending item and the flush
    pub delay: Duration,
    /// What happens to pending items on shutdown
    pub shutdown_policy: ShutdownPolicy,
}

impl Default for DispatcherConfig {
    fn default() -> Self {
        Self {
            delay: Duration::from_secs(1),
            shutdown_policy: ShutdownPolicy::Flush,
        }
    }
}

impl From<&DispatcherSettings> for DispatcherConfig {
    fn from(settings: &DispatcherSettings) -> Self {
        Self {
            delay: settings.delay(),
            shutdown_policy: settings.shutdown_policy,
        }
    }
}

/// Builder for creating a BatchDispatcher
pub struct DispatcherBuilder<T, S> {
    config: DispatcherConfig,
    sink: S,
    spawner: Arc<dyn Spawner>,
    logger: Arc<dyn FailureLogger>,
    _item: PhantomData<fn(T)>,
}

impl<T, S> DispatcherBuilder<T, S>
where
    T: Send + 'static,
    S: BatchSink<T> + 'static,
{
    /// Create a new DispatcherBuilder
    ///
    /// The spawner is the execution context every delayed flush runs on.
    pub fn new(sink: S, spawner: impl Spawner + 'static) -> Self {
        Self {
            config: DispatcherConfig::default(),
            sink,
            spawner: Arc::new(spawner),
            logger: Arc::new(TracingFailureLogger),
            _item: PhantomData,
        }
    }

    pub fn config(mut self, config: DispatcherConfig) -> Self {
        self.config = config;
        self
    }

    pub fn delay(mut self, delay: Duration) -> Self {
        self.config.delay = delay;
        self
    }

    pub fn shutdown_policy(mut self, policy: ShutdownPolicy) -> Self {
        self.config.shutdown_policy = policy;
        self
    }

    /// Replace the default tracing-based failure logger
    pub fn failure_logger(mut self, logger: impl FailureLogger + 'static) -> Self {
        self.logger = Arc::new(logger);
        self
    }

    /// Build the dispatcher. Nothing is spawned until the first submit.
    pub fn build(self) -> BatchDispatcher<T, S> {
        let name = self.sink.name().to_string();
        debug!(
            dispatcher = %name,
            delay_ms = self.config.delay.as_millis() as u64,
            shutdown_policy = ?self.config.shutdown_policy,
            "BatchDispatcher created"
        );

        BatchDispatcher {
            inner: Arc::new(Inner {
                name,
                config: self.config,
                state: Mutex::new(State {
                    pending: Vec::new(),
                    scheduled: None,
                    closed: false,
                }),
                sink: AsyncMutex::new(self.sink),
                spawner: self.spawner,
                logger: self.logger,
                metrics: DispatcherMetrics::new(),
                sequence: AtomicU64::new(0),
            }),
        }
    }
}

/// Result of one delivery
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FlushOutcome {
    /// Items handed to the sink (0 when there was nothing pending)
    pub batch_size: usize,
    /// Items the sink did not deliver
    pub failed_items: usize,
}

impl FlushOutcome {
    pub fn delivered(&self) -> usize {
        self.batch_size - self.failed_items
    }
}

/// What shutdown did with the pending batch
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ShutdownReport {
    pub policy: ShutdownPolicy,
    /// Items delivered by the final flush
    pub flushed: usize,
    /// Items the final flush failed to deliver
    pub failed: usize,
    /// Items dropped under `ShutdownPolicy::Discard`
    pub discarded: usize,
}

struct State<T> {
    pending: Vec<T>,
    /// Flush that has been scheduled but has not taken its snapshot yet
    scheduled: Option<AbortHandle>,
    closed: bool,
}

impl<T> State<T> {
    /// A task that was cancelled before its snapshot leaves a finished
    /// handle behind; it no longer counts as scheduled.
    fn has_live_flush(&self) -> bool {
        self.scheduled
            .as_ref()
            .is_some_and(|handle| !handle.is_finished())
    }
}

struct Inner<T, S> {
    name: String,
    config: DispatcherConfig,
    state: Mutex<State<T>>,
    /// Delivery gate; holding it is the right to deliver
    sink: AsyncMutex<S>,
    spawner: Arc<dyn Spawner>,
    logger: Arc<dyn FailureLogger>,
    metrics: DispatcherMetrics,
    sequence: AtomicU64,
}

/// Debounced batch dispatcher
///
/// Cheap to clone; clones share the same pending batch and sink, so any
/// number of producers can submit concurrently.
pub struct BatchDispatcher<T, S> {
    inner: Arc<Inner<T, S>>,
}

impl<T, S> Clone for BatchDispatcher<T, S> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<T, S> BatchDispatcher<T, S>
where
    T: Send + 'static,
    S: BatchSink<T> + 'static,
{
    /// Shorthand for [`DispatcherBuilder::new`]
    pub fn builder(sink: S, spawner: impl Spawner + 'static) -> DispatcherBuilder<T, S> {
        DispatcherBuilder::new(sink, spawner)
    }

    /// Dispatcher name (taken from the sink)
    pub fn name(&self) -> &str {
        &self.inner.name
    }

    pub fn config(&self) -> DispatcherConfig {
        self.inner.config
    }

    /// Submit one item
    ///
    /// The item joins the pending batch. If no flush is scheduled, one is
    /// scheduled to fire after the configured delay.
    ///
    /// # Errors
    /// - `Scheduling` when the spawner refused the flush task; the item
    ///   stays pending and goes out with the next successful schedule
    /// - `Closed` after [`shutdown`](Self::shutdown)
    pub fn submit(&self, item: T) -> Result<(), DispatcherError> {
        let inner = &self.inner;
        let mut state = inner.lock_state();

        if state.closed {
            drop(state);
            inner.metrics.inc_rejected();
            observability::record_submit_rejected(&inner.name);
            warn!(dispatcher = %inner.name, "Submit after shutdown, item rejected");
            return Err(DispatcherError::Closed {
                name: inner.name.clone(),
            });
        }

        state.pending.push(item);
        inner.metrics.inc_submitted();
        observability::record_item_submitted(&inner.name);
        observability::record_pending_depth(&inner.name, state.pending.len());

        // Check and schedule under the same lock as the append.
        if !state.has_live_flush() {
            let task = Box::pin(run_scheduled_flush(Arc::clone(inner)));
            match inner.spawner.spawn(task) {
                Ok(handle) => {
                    state.scheduled = Some(handle);
                    debug!(
                        dispatcher = %inner.name,
                        delay_ms = inner.config.delay.as_millis() as u64,
                        "Flush scheduled"
                    );
                }
                Err(e) => {
                    let pending = state.pending.len();
                    drop(state);
                    inner.metrics.inc_scheduling_failures();
                    observability::record_scheduling_failure(&inner.name);
                    warn!(
                        dispatcher = %inner.name,
                        pending,
                        error = %e,
                        "Could not schedule flush, items stay pending"
                    );
                    return Err(e);
                }
            }
        }

        Ok(())
    }

    /// Deliver whatever is pending right away
    ///
    /// Waits for an in-flight delivery to finish first and cancels the
    /// scheduled flush, since its items go out now.
    #[instrument(name = "batch_dispatcher_flush_now", skip(self), fields(dispatcher = %self.inner.name))]
    pub async fn flush_now(&self) -> FlushOutcome {
        let mut sink = self.inner.sink.lock().await;
        let batch = self.inner.take_pending_cancelling();
        self.inner.deliver(&mut sink, batch).await
    }

    /// Stop accepting items and apply the shutdown policy
    ///
    /// A delivery that is already running is waited for, never cancelled.
    /// A scheduled flush that has not started is cancelled and its items are
    /// flushed or discarded here. Later calls find nothing to do.
    #[instrument(name = "batch_dispatcher_shutdown", skip(self), fields(dispatcher = %self.inner.name))]
    pub async fn shutdown(&self) -> ShutdownReport {
        let inner = &self.inner;
        let mut sink = inner.sink.lock().await;

        let (first_close, batch) = {
            let mut state = inner.lock_state();
            let first_close = !state.closed;
            state.closed = true;
            if let Some(handle) = state.scheduled.take() {
                handle.abort();
            }
            (first_close, mem::take(&mut state.pending))
        };

        let policy = inner.config.shutdown_policy;
        let mut report = ShutdownReport {
            policy,
            flushed: 0,
            failed: 0,
            discarded: 0,
        };

        match policy {
            ShutdownPolicy::Flush => {
                let outcome = inner.deliver(&mut sink, batch).await;
                report.flushed = outcome.delivered();
                report.failed = outcome.failed_items;
            }
            ShutdownPolicy::Discard => {
                report.discarded = batch.len();
                if !batch.is_empty() {
                    inner.metrics.add_discarded(batch.len());
                    observability::record_items_discarded(&inner.name, batch.len());
                    warn!(
                        dispatcher = %inner.name,
                        discarded = batch.len(),
                        "Pending items discarded on shutdown"
                    );
                }
            }
        }
        observability::record_pending_depth(&inner.name, 0);

        if first_close {
            if let Err(e) = sink.close().await {
                warn!(dispatcher = %inner.name, error = %e, "Sink close failed");
            }
        }

        info!(
            dispatcher = %inner.name,
            policy = ?report.policy,
            flushed = report.flushed,
            failed = report.failed,
            discarded = report.discarded,
            "BatchDispatcher shut down"
        );
        report
    }

    /// Items waiting for the next flush
    pub fn pending_len(&self) -> usize {
        self.inner.lock_state().pending.len()
    }

    /// Whether a flush is scheduled and has not taken its snapshot yet
    pub fn is_flush_scheduled(&self) -> bool {
        self.inner.lock_state().has_live_flush()
    }

    pub fn is_closed(&self) -> bool {
        self.inner.lock_state().closed
    }

    pub fn metrics(&self) -> MetricsSnapshot {
        self.inner.metrics.snapshot()
    }

    /// Batch size and delivery latency distribution
    pub fn flush_stats(&self) -> observability::FlushStatsSummary {
        self.inner.metrics.flush_stats()
    }
}

impl<T, S> Inner<T, S>
where
    T: Send + 'static,
    S: BatchSink<T> + 'static,
{
    fn lock_state(&self) -> MutexGuard<'_, State<T>> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Snapshot taken by the scheduled flush itself
    fn take_pending_scheduled(&self) -> Vec<T> {
        let mut state = self.lock_state();
        state.scheduled = None;
        mem::take(&mut state.pending)
    }

    /// Snapshot taken outside the scheduled flush; the scheduled flush, if
    /// any, has not reached its snapshot because the caller holds the gate.
    fn take_pending_cancelling(&self) -> Vec<T> {
        let mut state = self.lock_state();
        if let Some(handle) = state.scheduled.take() {
            handle.abort();
        }
        mem::take(&mut state.pending)
    }

    /// Hand one batch to the sink. Caller holds the delivery gate.
    async fn deliver(&self, sink: &mut S, batch: Vec<T>) -> FlushOutcome {
        if batch.is_empty() {
            return FlushOutcome::default();
        }

        let batch_size = batch.len();
        let sequence = self.sequence.fetch_add(1, Ordering::Relaxed) + 1;
        observability::record_pending_depth(&self.name, 0);

        let started = Instant::now();
        let result = {
            let _in_flight = self.metrics.begin_delivery();
            sink.deliver(batch).await
        };
        let latency_ms = started.elapsed().as_secs_f64() * 1000.0;

        let failed_items = match &result {
            Ok(report) => report.failures.len().min(batch_size),
            Err(_) => batch_size,
        };
        self.metrics.record_flush(batch_size, failed_items, latency_ms);
        observability::record_flush(&self.name, batch_size, failed_items, latency_ms);

        let context = FlushContext {
            dispatcher: self.name.clone(),
            sequence,
            batch_size,
            failed_items,
        };
        match result {
            Ok(report) => match report.to_error(&self.name) {
                None => debug!(
                    dispatcher = %self.name,
                    sequence,
                    items = batch_size,
                    latency_ms,
                    "Batch delivered"
                ),
                Some(err) => self.logger.record(&err, &context),
            },
            Err(err) => self.logger.record(&err, &context),
        }

        FlushOutcome {
            batch_size,
            failed_items,
        }
    }
}

/// Body of every scheduled flush
async fn run_scheduled_flush<T, S>(inner: Arc<Inner<T, S>>)
where
    T: Send + 'static,
    S: BatchSink<T> + 'static,
{
    tokio::time::sleep(inner.config.delay).await;

    let mut sink = inner.sink.lock().await;
    let batch = inner.take_pending_scheduled();
    inner.deliver(&mut sink, batch).await;
}

/// Convenience function to create a dispatcher from configuration
#[instrument(
    name = "dispatcher_create",
    skip(sink_config, settings, spawner),
    fields(sink = %sink_config.name, sink_type = ?sink_config.sink_type)
)]
pub fn create_dispatcher<T>(
    sink_config: &SinkConfig,
    settings: &DispatcherSettings,
    spawner: impl Spawner + 'static,
) -> Result<BatchDispatcher<T, AnySink>, DispatcherError>
where
    T: serde::Serialize + Send + Sync + 'static,
{
    let sink = create_sink(sink_config)?;
    Ok(DispatcherBuilder::new(sink, spawner)
        .config(DispatcherConfig::from(settings))
        .build())
}
