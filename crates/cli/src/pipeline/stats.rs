//! Relay statistics.

use std::time::Duration;

use dispatcher::{MetricsSnapshot, ShutdownReport};
use observability::FlushStatsSummary;

/// Per-sink outcome of a relay run
#[derive(Debug, Clone)]
pub struct SinkStats {
    pub name: String,
    pub metrics: MetricsSnapshot,
    pub shutdown: ShutdownReport,
    pub flush_stats: FlushStatsSummary,
}

/// Statistics from a relay run
#[derive(Debug, Clone, Default)]
pub struct RelayStats {
    /// Non-blank input lines
    pub lines_read: u64,

    /// Lines parsed as JSON reports
    pub json_reports: u64,

    /// Lines taken as plain text
    pub text_reports: u64,

    /// Total duration of the run
    pub duration: Duration,

    /// Whether input was cut short by a signal or timeout
    pub interrupted: bool,

    pub sinks: Vec<SinkStats>,
}

impl RelayStats {
    pub fn reports(&self) -> u64 {
        self.json_reports + self.text_reports
    }

    /// Items delivered across all sinks
    pub fn delivered(&self) -> u64 {
        self.sinks.iter().map(|s| s.metrics.delivered_items).sum()
    }

    /// Print detailed summary
    pub fn print_summary(&self) {
        println!("\n╔══════════════════════════════════════════════════════════════╗");
        println!("║                     Relay Statistics                         ║");
        println!("╚══════════════════════════════════════════════════════════════╝\n");

        println!("Overview");
        println!("   ├─ Duration: {:.2}s", self.duration.as_secs_f64());
        println!("   ├─ Lines read: {}", self.lines_read);
        println!("   ├─ JSON reports: {}", self.json_reports);
        println!("   ├─ Text reports: {}", self.text_reports);
        println!("   └─ Interrupted: {}", self.interrupted);

        for sink in &self.sinks {
            let m = &sink.metrics;
            println!("\nSink '{}'", sink.name);
            println!("   ├─ Submitted: {}", m.submitted);
            println!("   ├─ Flushes: {} ({} failed)", m.flushes, m.failed_flushes);
            println!("   ├─ Delivered items: {}", m.delivered_items);
            println!("   ├─ Failed items: {}", m.failed_items);
            println!("   ├─ Discarded on shutdown: {}", sink.shutdown.discarded);
            if m.scheduling_failures > 0 || m.rejected > 0 {
                println!(
                    "   ├─ Scheduling failures: {}, rejected: {}",
                    m.scheduling_failures, m.rejected
                );
            }
            println!("   ├─ Batch size: {}", sink.flush_stats.batch_size);
            println!("   └─ Latency (ms): {}", sink.flush_stats.latency_ms);
        }

        println!();
    }
}
