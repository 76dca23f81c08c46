//! Relay orchestrator - reads reports and feeds the dispatchers.

use std::future::Future;
use std::time::{Duration, Instant};

use contracts::{ErrorReport, RelayBlueprint};
use dispatcher::{create_dispatcher, AnySink, BatchDispatcher, TokioSpawner};
use tokio::io::{AsyncBufRead, AsyncBufReadExt};
use tracing::{debug, info, warn};

use super::input::{parse_line, LineKind};
use super::{RelayStats, SinkStats};
use crate::error::{CliError, Result};

/// Relay configuration
#[derive(Debug, Clone)]
pub struct RelayConfig {
    /// The relay blueprint configuration
    pub blueprint: RelayBlueprint,

    /// Stop reading input after this long (None = no timeout)
    pub timeout: Option<Duration>,

    /// Default `source` for reports that carry none
    pub source: Option<String>,
}

/// Why input reading stopped
enum StopReason {
    Eof,
    Signal,
    Timeout,
}

/// Main relay orchestrator
pub struct Relay {
    config: RelayConfig,
}

impl Relay {
    /// Create a new relay with the given configuration
    pub fn new(config: RelayConfig) -> Self {
        Self { config }
    }

    /// Relay every line of `input` until EOF or `shutdown` resolves, then
    /// shut the dispatchers down per the configured policy.
    pub async fn run<R, F>(self, input: R, shutdown: F) -> Result<RelayStats>
    where
        R: AsyncBufRead + Unpin,
        F: Future<Output = ()>,
    {
        let start_time = Instant::now();
        let dispatchers = self.build_dispatchers()?;

        info!(
            sinks = dispatchers.len(),
            delay_ms = self.config.blueprint.dispatcher.delay_ms,
            shutdown_policy = ?self.config.blueprint.dispatcher.shutdown_policy,
            "Relay started, reading reports from input"
        );

        let mut stats = RelayStats::default();
        let reason = {
            let reading = self.read_input(input, &dispatchers, &mut stats);
            tokio::pin!(reading);
            tokio::pin!(shutdown);

            let deadline = async {
                match self.config.timeout {
                    Some(timeout) => tokio::time::sleep(timeout).await,
                    None => std::future::pending::<()>().await,
                }
            };

            tokio::select! {
                result = &mut reading => {
                    result?;
                    StopReason::Eof
                }
                _ = &mut shutdown => StopReason::Signal,
                _ = deadline => StopReason::Timeout,
            }
        };

        match reason {
            StopReason::Eof => info!(lines = stats.lines_read, "Input finished"),
            StopReason::Signal => {
                warn!("Received shutdown signal, stopping relay...");
                stats.interrupted = true;
            }
            StopReason::Timeout => {
                warn!(
                    timeout_secs = self.config.timeout.map(|t| t.as_secs()),
                    "Relay timed out"
                );
                stats.interrupted = true;
            }
        }

        // Shutdown
        info!("Shutting down dispatchers...");
        for dispatcher in &dispatchers {
            let report = dispatcher.shutdown().await;
            stats.sinks.push(SinkStats {
                name: dispatcher.name().to_string(),
                metrics: dispatcher.metrics(),
                shutdown: report,
                flush_stats: dispatcher.flush_stats(),
            });
        }

        stats.duration = start_time.elapsed();
        info!(
            duration_secs = stats.duration.as_secs_f64(),
            reports = stats.reports(),
            delivered = stats.delivered(),
            "Relay shutdown complete"
        );

        Ok(stats)
    }

    fn build_dispatchers(&self) -> Result<Vec<BatchDispatcher<ErrorReport, AnySink>>> {
        let blueprint = &self.config.blueprint;
        let spawner = TokioSpawner::current()
            .map_err(|e| CliError::sink_setup("*", e))?;

        blueprint
            .sinks
            .iter()
            .map(|sink| {
                create_dispatcher(sink, &blueprint.dispatcher, spawner.clone())
                    .map_err(|e| CliError::sink_setup(&sink.name, e))
            })
            .collect()
    }

    async fn read_input<R>(
        &self,
        input: R,
        dispatchers: &[BatchDispatcher<ErrorReport, AnySink>],
        stats: &mut RelayStats,
    ) -> Result<()>
    where
        R: AsyncBufRead + Unpin,
    {
        let source = self.config.source.as_deref();
        let mut lines = input.lines();

        while let Some(line) = lines.next_line().await? {
            let Some((report, kind)) = parse_line(&line, source) else {
                continue;
            };
            stats.lines_read += 1;
            match kind {
                LineKind::Json => stats.json_reports += 1,
                LineKind::Text => stats.text_reports += 1,
            }
            debug!(title = %report.title, kind = ?kind, "Report read");

            for dispatcher in dispatchers {
                if let Err(e) = dispatcher.submit(report.clone()) {
                    warn!(sink = %dispatcher.name(), error = %e, "Submit failed");
                }
            }
        }

        Ok(())
    }
}
