//! FileSink - appends batches to a JSON lines file

use chrono::{DateTime, Utc};
use contracts::{BatchSink, ContractError, DeliveryReport, ItemFailure};
use serde::Serialize;
use std::collections::HashMap;
use std::fs::{self, File, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};
use tracing::{debug, error, instrument, warn};

/// Configuration for FileSink
#[derive(Debug, Clone)]
pub struct FileSinkConfig {
    /// Base output directory
    pub base_path: PathBuf,
}

impl FileSinkConfig {
    /// Create config from params map
    pub fn from_params(params: &HashMap<String, String>) -> Self {
        let base_path = params
            .get("base_path")
            .map(PathBuf::from)
            .unwrap_or_else(|| PathBuf::from("./output"));

        Self { base_path }
    }
}

/// One line of the output file
#[derive(Serialize)]
struct Record<'a, T> {
    batch: u64,
    written_at: DateTime<Utc>,
    item: &'a T,
}

/// Sink that writes every item of a batch as one JSON line
#[derive(Debug)]
pub struct FileSink {
    name: String,
    path: PathBuf,
    file: Option<File>,
    batches: u64,
}

impl FileSink {
    /// Create a new FileSink writing to `<base_path>/<name>.jsonl`
    pub fn new(name: impl Into<String>, config: FileSinkConfig) -> std::io::Result<Self> {
        let name = name.into();
        // Create base directory if it doesn't exist
        fs::create_dir_all(&config.base_path)?;
        let path = config.base_path.join(format!("{}.jsonl", name));

        Ok(Self {
            name,
            path,
            file: None,
            batches: 0,
        })
    }

    /// Create from params map (for factory)
    pub fn from_params(
        name: impl Into<String>,
        params: &HashMap<String, String>,
    ) -> std::io::Result<Self> {
        let config = FileSinkConfig::from_params(params);
        Self::new(name, config)
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Output file path
    pub fn path(&self) -> &Path {
        &self.path
    }

    fn file(&mut self) -> std::io::Result<&mut File> {
        let file = match self.file.take() {
            Some(file) => file,
            None => {
                let file = OpenOptions::new()
                    .create(true)
                    .append(true)
                    .open(&self.path)?;
                debug!(sink = %self.name, path = %self.path.display(), "Output file opened");
                file
            }
        };
        Ok(self.file.insert(file))
    }

    fn write_batch<T: Serialize>(&mut self, batch: &[T]) -> std::io::Result<DeliveryReport> {
        self.batches += 1;
        let written_at = Utc::now();
        let mut buffer = Vec::new();
        let mut report = DeliveryReport::default();

        for (index, item) in batch.iter().enumerate() {
            let record = Record {
                batch: self.batches,
                written_at,
                item,
            };
            let start = buffer.len();
            match serde_json::to_writer(&mut buffer, &record) {
                Ok(()) => {
                    buffer.push(b'\n');
                    report.delivered += 1;
                }
                Err(e) => {
                    buffer.truncate(start);
                    warn!(sink = %self.name, index, error = %e, "Item not serializable");
                    report.failures.push(ItemFailure::new(index, e.to_string()));
                }
            }
        }

        let file = self.file()?;
        file.write_all(&buffer)?;
        Ok(report)
    }
}

impl<T> BatchSink<T> for FileSink
where
    T: Serialize + Send + Sync,
{
    fn name(&self) -> &str {
        &self.name
    }

    #[instrument(
        name = "file_sink_deliver",
        skip(self, batch),
        fields(sink = %self.name, items = batch.len())
    )]
    async fn deliver(&mut self, batch: Vec<T>) -> Result<DeliveryReport, ContractError> {
        self.write_batch(&batch).map_err(|e| {
            error!(sink = %self.name, path = %self.path.display(), error = %e, "Write failed");
            ContractError::sink_delivery(&self.name, e.to_string())
        })
    }

    #[instrument(name = "file_sink_close", skip(self))]
    async fn close(&mut self) -> Result<(), ContractError> {
        if let Some(mut file) = self.file.take() {
            file.flush()?;
            file.sync_all()?;
        }
        debug!(sink = %self.name, batches = self.batches, "FileSink closed");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use contracts::ErrorReport;
    use serde::ser::Error as _;
    use tempfile::tempdir;

    fn sink_in(dir: &Path) -> FileSink {
        let config = FileSinkConfig {
            base_path: dir.to_path_buf(),
        };
        FileSink::new("errors", config).unwrap()
    }

    fn read_lines(path: &Path) -> Vec<serde_json::Value> {
        fs::read_to_string(path)
            .unwrap()
            .lines()
            .map(|l| serde_json::from_str(l).unwrap())
            .collect()
    }

    #[test]
    fn test_config_defaults_base_path() {
        let config = FileSinkConfig::from_params(&HashMap::new());
        assert_eq!(config.base_path, PathBuf::from("./output"));
    }

    #[tokio::test]
    async fn test_file_sink_appends_batches() {
        let dir = tempdir().unwrap();
        let mut sink = sink_in(dir.path());

        let first = vec![
            ErrorReport::new("Timeout", "request timed out"),
            ErrorReport::new("Parse", "bad payload"),
        ];
        let report = sink.deliver(first).await.unwrap();
        assert_eq!(report, DeliveryReport::all(2));

        sink.deliver(vec![ErrorReport::new("Disk", "full")])
            .await
            .unwrap();
        BatchSink::<ErrorReport>::close(&mut sink).await.unwrap();

        assert_eq!(sink.path(), dir.path().join("errors.jsonl"));
        let lines = read_lines(sink.path());
        assert_eq!(lines.len(), 3);
        assert_eq!(lines[0]["batch"], 1);
        assert_eq!(lines[1]["item"]["title"], "Parse");
        assert_eq!(lines[2]["batch"], 2);
        assert!(lines[2]["written_at"].is_string());
    }

    struct Unserializable;

    impl Serialize for Unserializable {
        fn serialize<S: serde::Serializer>(&self, _: S) -> Result<S::Ok, S::Error> {
            Err(S::Error::custom("not today"))
        }
    }

    #[derive(Serialize)]
    #[serde(untagged)]
    enum Mixed {
        Plain(u32),
        Broken(Unserializable),
    }

    #[tokio::test]
    async fn test_file_sink_reports_unserializable_items() {
        let dir = tempdir().unwrap();
        let mut sink = sink_in(dir.path());

        let report = sink
            .deliver(vec![Mixed::Plain(1), Mixed::Broken(Unserializable), Mixed::Plain(3)])
            .await
            .unwrap();

        assert_eq!(report.delivered, 2);
        assert_eq!(report.failures.len(), 1);
        assert_eq!(report.failures[0].index, 1);

        let lines = read_lines(sink.path());
        assert_eq!(lines.len(), 2);
        assert_eq!(lines[1]["item"], 3);
    }
}
