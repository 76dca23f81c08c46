//! RelayBlueprint - Config Loader 输出
//!
//! 描述完整的中继配置：批处理调度参数、关闭策略、输出路由。

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::time::Duration;

/// 配置版本
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum ConfigVersion {
    #[default]
    V1,
}

/// 完整的中继配置蓝图
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RelayBlueprint {
    /// 配置版本
    #[serde(default)]
    pub version: ConfigVersion,

    /// 调度器设置
    #[serde(default)]
    pub dispatcher: DispatcherSettings,

    /// 输出路由配置
    pub sinks: Vec<SinkConfig>,
}

/// 调度器设置
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DispatcherSettings {
    /// 静默延迟 (毫秒)：首个条目到达后等待多久再刷新
    #[serde(default = "default_delay_ms")]
    pub delay_ms: u64,

    /// 进程关闭时如何处理未刷新的批次
    #[serde(default)]
    pub shutdown_policy: ShutdownPolicy,
}

fn default_delay_ms() -> u64 {
    1000
}

impl Default for DispatcherSettings {
    fn default() -> Self {
        Self {
            delay_ms: default_delay_ms(),
            shutdown_policy: ShutdownPolicy::default(),
        }
    }
}

impl DispatcherSettings {
    /// 延迟转换为 Duration
    pub fn delay(&self) -> Duration {
        Duration::from_millis(self.delay_ms)
    }
}

/// 关闭策略
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ShutdownPolicy {
    /// 同步刷新剩余批次
    #[default]
    Flush,
    /// 显式丢弃剩余批次
    Discard,
}

/// Sink 输出配置
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SinkConfig {
    /// Sink 名称
    pub name: String,

    /// Sink 类型
    pub sink_type: SinkType,

    /// 类型特定参数
    #[serde(default)]
    pub params: HashMap<String, String>,
}

/// Sink 类型
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SinkType {
    /// 日志输出
    Log,
    /// 文件输出 (JSON Lines)
    File,
    /// HTTP 上传
    Http,
}

impl RelayBlueprint {
    /// 按名称查找 sink
    pub fn sink(&self, name: &str) -> Option<&SinkConfig> {
        self.sinks.iter().find(|sink| sink.name == name)
    }

    /// 统计某类 sink 数量
    pub fn count_sinks(&self, kind: SinkType) -> usize {
        self.sinks
            .iter()
            .filter(|sink| sink.sink_type == kind)
            .count()
    }
}
