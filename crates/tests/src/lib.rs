//! # Integration Tests
//!
//! 集成测试与端到端测试。
//!
//! 负责：
//! - 合约快照测试
//! - 配置 -> 调度器 -> sink 的端到端测试
//! - 并发提交下的批次完整性

#[cfg(test)]
mod contract_tests {
    use contracts::{ErrorReport, RelayBlueprint, ShutdownPolicy};

    #[test]
    fn test_error_report_wire_format() {
        let report = ErrorReport::new("Timeout", "no answer").with_source("poller");
        let json = serde_json::to_value(&report).unwrap();

        assert_eq!(json["title"], "Timeout");
        assert_eq!(json["message"], "no answer");
        assert_eq!(json["source"], "poller");
        assert!(json["timestamp"].is_string());
        assert!(json.get("details").is_none());
    }

    #[test]
    fn test_blueprint_defaults_from_json() {
        let blueprint: RelayBlueprint =
            serde_json::from_str(r#"{"sinks":[{"name":"console","sink_type":"log"}]}"#).unwrap();
        assert_eq!(blueprint.dispatcher.delay_ms, 1000);
        assert_eq!(blueprint.dispatcher.shutdown_policy, ShutdownPolicy::Flush);
        assert!(blueprint.sinks[0].params.is_empty());
    }

    #[test]
    fn test_demo_config_is_valid() {
        let blueprint = config_loader::ConfigLoader::load_from_str(
            include_str!("../../../demos/relay.toml"),
            config_loader::ConfigFormat::Toml,
        )
        .unwrap();
        assert_eq!(blueprint.sinks.len(), 2);
        assert!(blueprint.sink("archive").is_some());
    }
}

#[cfg(test)]
mod e2e_tests {
    use std::collections::HashSet;
    use std::path::Path;
    use std::time::Duration;

    use config_loader::{ConfigFormat, ConfigLoader};
    use contracts::{ErrorReport, RelayBlueprint};
    use dispatcher::{create_dispatcher, TokioSpawner};

    fn file_config(base_path: &Path, policy: &str) -> RelayBlueprint {
        let toml = format!(
            r#"
[dispatcher]
delay_ms = 1000
shutdown_policy = "{policy}"

[[sinks]]
name = "archive"
sink_type = "file"
[sinks.params]
base_path = "{}"
"#,
            base_path.display().to_string().replace('\\', "/")
        );
        ConfigLoader::load_from_str(&toml, ConfigFormat::Toml).unwrap()
    }

    fn read_lines(path: &Path) -> Vec<serde_json::Value> {
        std::fs::read_to_string(path)
            .unwrap_or_default()
            .lines()
            .map(|l| serde_json::from_str(l).unwrap())
            .collect()
    }

    /// End-to-end test: config -> BatchDispatcher -> FileSink
    ///
    /// 验证完整的数据流：
    /// 1. 配置加载并验证
    /// 2. 延迟内的提交合并为一个批次
    /// 3. 延迟之后的提交进入下一个批次
    #[tokio::test(start_paused = true)]
    async fn test_e2e_file_pipeline_batches() {
        let dir = tempfile::tempdir().unwrap();
        let blueprint = file_config(dir.path(), "flush");
        let dispatcher = create_dispatcher::<ErrorReport>(
            &blueprint.sinks[0],
            &blueprint.dispatcher,
            TokioSpawner::current().unwrap(),
        )
        .unwrap();

        dispatcher.submit(ErrorReport::new("A", "first")).unwrap();
        tokio::time::sleep(Duration::from_millis(400)).await;
        dispatcher.submit(ErrorReport::new("B", "second")).unwrap();
        tokio::time::sleep(Duration::from_millis(1500)).await;
        dispatcher.submit(ErrorReport::new("C", "third")).unwrap();
        tokio::time::sleep(Duration::from_millis(1500)).await;

        let report = dispatcher.shutdown().await;
        assert_eq!(report.flushed, 0);

        let lines = read_lines(&dir.path().join("archive.jsonl"));
        let batches: Vec<(u64, &str)> = lines
            .iter()
            .map(|l| {
                (
                    l["batch"].as_u64().unwrap(),
                    l["item"]["title"].as_str().unwrap(),
                )
            })
            .collect();
        assert_eq!(batches, vec![(1, "A"), (1, "B"), (2, "C")]);

        let metrics = dispatcher.metrics();
        assert_eq!(metrics.submitted, 3);
        assert_eq!(metrics.flushes, 2);
        assert_eq!(metrics.max_in_flight, 1);
        assert_eq!(dispatcher.flush_stats().batch_size.count, 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_e2e_concurrent_submitters_lose_nothing() {
        let dir = tempfile::tempdir().unwrap();
        let blueprint = file_config(dir.path(), "flush");
        let dispatcher = create_dispatcher::<u32>(
            &blueprint.sinks[0],
            &blueprint.dispatcher,
            TokioSpawner::current().unwrap(),
        )
        .unwrap();

        let mut tasks = Vec::new();
        for worker in 0..4u32 {
            let dispatcher = dispatcher.clone();
            tasks.push(tokio::spawn(async move {
                for i in 0..25u32 {
                    dispatcher.submit(worker * 100 + i).unwrap();
                    tokio::time::sleep(Duration::from_millis(90)).await;
                }
            }));
        }
        for task in tasks {
            task.await.unwrap();
        }
        dispatcher.shutdown().await;

        let lines = read_lines(&dir.path().join("archive.jsonl"));
        let items: Vec<u64> = lines.iter().map(|l| l["item"].as_u64().unwrap()).collect();
        let unique: HashSet<u64> = items.iter().copied().collect();
        assert_eq!(items.len(), 100);
        assert_eq!(unique.len(), 100);
        assert!(dispatcher.metrics().flushes >= 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_e2e_shutdown_discard_writes_nothing() {
        let dir = tempfile::tempdir().unwrap();
        let blueprint = file_config(dir.path(), "discard");
        let dispatcher = create_dispatcher::<ErrorReport>(
            &blueprint.sinks[0],
            &blueprint.dispatcher,
            TokioSpawner::current().unwrap(),
        )
        .unwrap();

        dispatcher.submit(ErrorReport::new("A", "pending")).unwrap();
        let report = dispatcher.shutdown().await;
        assert_eq!(report.discarded, 1);

        tokio::time::sleep(Duration::from_secs(5)).await;
        assert!(read_lines(&dir.path().join("archive.jsonl")).is_empty());
        assert!(dispatcher.submit(ErrorReport::new("B", "late")).is_err());
    }

    #[tokio::test]
    async fn test_e2e_http_upload_failure_is_not_retried() {
        // Nothing listens on this port; every upload fails at connect time.
        let toml = r#"
[dispatcher]
delay_ms = 20

[[sinks]]
name = "uploader"
sink_type = "http"
[sinks.params]
url = "http://127.0.0.1:9/errors"
timeout_ms = "500"
"#;
        let blueprint = ConfigLoader::load_from_str(toml, ConfigFormat::Toml).unwrap();
        let dispatcher = create_dispatcher::<ErrorReport>(
            &blueprint.sinks[0],
            &blueprint.dispatcher,
            TokioSpawner::current().unwrap(),
        )
        .unwrap();

        dispatcher.submit(ErrorReport::new("A", "lost")).unwrap();
        let outcome = dispatcher.flush_now().await;
        assert_eq!(outcome.batch_size, 1);
        assert_eq!(outcome.failed_items, 1);

        let metrics = dispatcher.metrics();
        assert_eq!(metrics.failed_flushes, 1);
        assert_eq!(dispatcher.pending_len(), 0);
    }
}
