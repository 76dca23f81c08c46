//! 批处理调度指标收集模块
//!
//! Prometheus 计数器/直方图 + 内存聚合统计 (供 CLI 输出摘要)。

use metrics::{counter, gauge, histogram};

/// 记录条目提交
pub fn record_item_submitted(sink_name: &str) {
    counter!(
        "batch_relay_items_submitted_total",
        "sink" => sink_name.to_string()
    )
    .increment(1);
}

/// 记录关闭后被拒绝的提交
pub fn record_submit_rejected(sink_name: &str) {
    counter!(
        "batch_relay_items_rejected_total",
        "sink" => sink_name.to_string()
    )
    .increment(1);
}

/// 记录调度失败 (执行上下文不可用)
pub fn record_scheduling_failure(sink_name: &str) {
    counter!(
        "batch_relay_scheduling_failures_total",
        "sink" => sink_name.to_string()
    )
    .increment(1);
}

/// 记录一次刷新
///
/// `failed_items` 为 sink 拒绝的条目数；整批失败时等于 `batch_size`。
pub fn record_flush(sink_name: &str, batch_size: usize, failed_items: usize, latency_ms: f64) {
    let status = if failed_items == 0 {
        "success"
    } else if failed_items < batch_size {
        "partial"
    } else {
        "failure"
    };
    counter!(
        "batch_relay_flushes_total",
        "sink" => sink_name.to_string(),
        "status" => status
    )
    .increment(1);

    histogram!(
        "batch_relay_batch_size",
        "sink" => sink_name.to_string()
    )
    .record(batch_size as f64);

    histogram!(
        "batch_relay_delivery_latency_ms",
        "sink" => sink_name.to_string()
    )
    .record(latency_ms);

    let delivered = batch_size.saturating_sub(failed_items);
    if delivered > 0 {
        counter!(
            "batch_relay_items_delivered_total",
            "sink" => sink_name.to_string()
        )
        .increment(delivered as u64);
    }
    if failed_items > 0 {
        counter!(
            "batch_relay_items_failed_total",
            "sink" => sink_name.to_string()
        )
        .increment(failed_items as u64);
    }
}

/// 记录关闭时丢弃的条目
pub fn record_items_discarded(sink_name: &str, count: usize) {
    counter!(
        "batch_relay_items_discarded_total",
        "sink" => sink_name.to_string()
    )
    .increment(count as u64);
}

/// 记录待刷新队列深度
pub fn record_pending_depth(sink_name: &str, depth: usize) {
    gauge!(
        "batch_relay_pending_items",
        "sink" => sink_name.to_string()
    )
    .set(depth as f64);
}

/// 刷新指标聚合器
///
/// 在内存中聚合每次刷新的批大小与投递耗时。
#[derive(Debug, Clone, Default)]
pub struct FlushStatsAggregator {
    /// 批大小统计
    pub batch_sizes: RunningStats,

    /// 投递耗时统计 (毫秒)
    pub latencies_ms: RunningStats,
}

impl FlushStatsAggregator {
    /// 创建新的聚合器
    pub fn new() -> Self {
        Self::default()
    }

    /// 更新聚合统计
    pub fn update(&mut self, batch_size: usize, latency_ms: f64) {
        self.batch_sizes.push(batch_size as f64);
        self.latencies_ms.push(latency_ms);
    }

    /// 生成摘要
    pub fn summary(&self) -> FlushStatsSummary {
        FlushStatsSummary {
            batch_size: StatsSummary::from(&self.batch_sizes),
            latency_ms: StatsSummary::from(&self.latencies_ms),
        }
    }
}

/// 刷新统计摘要
#[derive(Debug, Clone, Default)]
pub struct FlushStatsSummary {
    pub batch_size: StatsSummary,
    pub latency_ms: StatsSummary,
}

impl std::fmt::Display for FlushStatsSummary {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "Batch size: {}", self.batch_size)?;
        write!(f, "Delivery latency (ms): {}", self.latency_ms)
    }
}

/// 统计摘要
#[derive(Debug, Clone, Default)]
pub struct StatsSummary {
    pub count: u64,
    pub min: f64,
    pub max: f64,
    pub mean: f64,
    pub std_dev: f64,
}

impl From<&RunningStats> for StatsSummary {
    fn from(stats: &RunningStats) -> Self {
        Self {
            count: stats.count,
            min: stats.min,
            max: stats.max,
            mean: stats.mean(),
            std_dev: stats.std_dev(),
        }
    }
}

impl std::fmt::Display for StatsSummary {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if self.count == 0 {
            write!(f, "N/A")
        } else {
            write!(
                f,
                "min={:.3}, max={:.3}, mean={:.3}, std={:.3} (n={})",
                self.min, self.max, self.mean, self.std_dev, self.count
            )
        }
    }
}

/// 在线统计计算器 (Welford's algorithm)
#[derive(Debug, Clone, Default)]
pub struct RunningStats {
    count: u64,
    mean: f64,
    m2: f64,
    min: f64,
    max: f64,
}

impl RunningStats {
    /// 添加新值
    pub fn push(&mut self, value: f64) {
        self.count += 1;

        if self.count == 1 {
            self.min = value;
            self.max = value;
            self.mean = value;
            self.m2 = 0.0;
        } else {
            self.min = self.min.min(value);
            self.max = self.max.max(value);

            let delta = value - self.mean;
            self.mean += delta / self.count as f64;
            let delta2 = value - self.mean;
            self.m2 += delta * delta2;
        }
    }

    /// 样本数量
    pub fn count(&self) -> u64 {
        self.count
    }

    /// 均值
    pub fn mean(&self) -> f64 {
        if self.count == 0 {
            0.0
        } else {
            self.mean
        }
    }

    /// 方差
    pub fn variance(&self) -> f64 {
        if self.count < 2 {
            0.0
        } else {
            self.m2 / (self.count - 1) as f64
        }
    }

    /// 标准差
    pub fn std_dev(&self) -> f64 {
        self.variance().sqrt()
    }

    pub fn min(&self) -> f64 {
        self.min
    }

    pub fn max(&self) -> f64 {
        self.max
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_running_stats() {
        let mut stats = RunningStats::default();

        stats.push(1.0);
        stats.push(2.0);
        stats.push(3.0);
        stats.push(4.0);
        stats.push(5.0);

        assert_eq!(stats.count(), 5);
        assert!((stats.mean() - 3.0).abs() < 1e-10);
        assert!((stats.min() - 1.0).abs() < 1e-10);
        assert!((stats.max() - 5.0).abs() < 1e-10);
        assert!((stats.variance() - 2.5).abs() < 1e-10);
    }

    #[test]
    fn test_aggregator_update() {
        let mut aggregator = FlushStatsAggregator::new();
        aggregator.update(3, 12.0);
        aggregator.update(1, 4.0);

        let summary = aggregator.summary();
        assert_eq!(summary.batch_size.count, 2);
        assert!((summary.batch_size.mean - 2.0).abs() < 1e-10);
        assert!((summary.latency_ms.max - 12.0).abs() < 1e-10);
    }

    #[test]
    fn test_empty_summary_display() {
        let summary = FlushStatsAggregator::new().summary();
        let output = format!("{}", summary);
        assert!(output.contains("Batch size: N/A"));
    }

    #[test]
    fn test_recording_without_recorder_is_noop() {
        // No global recorder installed: the metrics facade discards everything.
        record_item_submitted("test");
        record_flush("test", 4, 1, 2.5);
        record_items_discarded("test", 2);
    }
}
