//! `validate` command implementation.

use anyhow::{Context, Result};
use contracts::{RelayBlueprint, ShutdownPolicy, SinkType};
use serde::Serialize;
use tracing::info;

use crate::cli::ValidateArgs;

/// Delays below this produce very small batches
const SHORT_DELAY_MS: u64 = 100;

/// Validation result for JSON output
#[derive(Serialize)]
struct ValidationResult {
    valid: bool,
    config_path: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    warnings: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    summary: Option<ConfigSummary>,
}

#[derive(Serialize)]
struct ConfigSummary {
    version: String,
    delay_ms: u64,
    shutdown_policy: String,
    sink_count: usize,
    http_sinks: usize,
    file_sinks: usize,
    log_sinks: usize,
}

/// Execute the `validate` command
pub fn run_validate(args: &ValidateArgs) -> Result<()> {
    info!(config = %args.config.display(), "Validating configuration");

    let result = validate_config(args);

    if args.json {
        let json = serde_json::to_string_pretty(&result)
            .context("Failed to serialize validation result")?;
        println!("{}", json);
    } else {
        print_validation_result(&result);
    }

    if result.valid {
        Ok(())
    } else {
        anyhow::bail!("Configuration validation failed")
    }
}

fn validate_config(args: &ValidateArgs) -> ValidationResult {
    let config_path = args.config.display().to_string();

    // Check file exists
    if !args.config.exists() {
        return ValidationResult {
            valid: false,
            config_path,
            error: Some(format!("File not found: {}", args.config.display())),
            warnings: None,
            summary: None,
        };
    }

    // Try to load and validate
    match config_loader::ConfigLoader::load_from_path(&args.config) {
        Ok(blueprint) => {
            let warnings = collect_warnings(&blueprint);

            ValidationResult {
                valid: true,
                config_path,
                error: None,
                warnings: if warnings.is_empty() {
                    None
                } else {
                    Some(warnings)
                },
                summary: Some(ConfigSummary {
                    version: format!("{:?}", blueprint.version),
                    delay_ms: blueprint.dispatcher.delay_ms,
                    shutdown_policy: format!("{:?}", blueprint.dispatcher.shutdown_policy),
                    sink_count: blueprint.sinks.len(),
                    http_sinks: blueprint.count_sinks(SinkType::Http),
                    file_sinks: blueprint.count_sinks(SinkType::File),
                    log_sinks: blueprint.count_sinks(SinkType::Log),
                }),
            }
        }
        Err(e) => ValidationResult {
            valid: false,
            config_path,
            error: Some(e.to_string()),
            warnings: None,
            summary: None,
        },
    }
}

/// Collect configuration warnings (non-fatal issues)
fn collect_warnings(blueprint: &RelayBlueprint) -> Vec<String> {
    let mut warnings = Vec::new();

    if blueprint.count_sinks(SinkType::Http) == 0 {
        warnings.push("No http sink configured - reports stay on this host".to_string());
    }

    if blueprint.dispatcher.shutdown_policy == ShutdownPolicy::Discard {
        warnings.push(
            "dispatcher.shutdown_policy is 'discard' - pending reports are dropped on exit"
                .to_string(),
        );
    }

    if blueprint.dispatcher.delay_ms < SHORT_DELAY_MS {
        warnings.push(format!(
            "dispatcher.delay_ms is {} - batches will rarely coalesce",
            blueprint.dispatcher.delay_ms
        ));
    }

    for sink in &blueprint.sinks {
        if sink.sink_type == SinkType::File && !sink.params.contains_key("base_path") {
            warnings.push(format!(
                "Sink '{}' has no base_path - writing under ./output",
                sink.name
            ));
        }
    }

    warnings
}

fn print_validation_result(result: &ValidationResult) {
    if result.valid {
        println!("✓ Configuration is valid: {}", result.config_path);

        if let Some(ref summary) = result.summary {
            println!("\n  Version: {}", summary.version);
            println!("  Quiet delay: {} ms", summary.delay_ms);
            println!("  Shutdown policy: {}", summary.shutdown_policy);
            println!(
                "  Sinks: {} (http: {}, file: {}, log: {})",
                summary.sink_count, summary.http_sinks, summary.file_sinks, summary.log_sinks
            );
        }

        if let Some(ref warnings) = result.warnings {
            println!("\n⚠ Warnings:");
            for warning in warnings {
                println!("  - {}", warning);
            }
        }
    } else {
        println!("✗ Configuration is invalid: {}", result.config_path);
        if let Some(ref error) = result.error {
            println!("\n  Error: {}", error);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use std::path::PathBuf;
    use tempfile::NamedTempFile;

    fn config_file(content: &str) -> NamedTempFile {
        let mut file = tempfile::Builder::new().suffix(".toml").tempfile().unwrap();
        file.write_all(content.as_bytes()).unwrap();
        file
    }

    #[test]
    fn test_valid_config_with_warnings() {
        let file = config_file(
            r#"
[dispatcher]
delay_ms = 20
shutdown_policy = "discard"

[[sinks]]
name = "archive"
sink_type = "file"
"#,
        );
        let args = ValidateArgs {
            config: file.path().to_path_buf(),
            json: true,
        };

        let result = validate_config(&args);
        assert!(result.valid);
        let warnings = result.warnings.unwrap();
        assert_eq!(warnings.len(), 4);
        let summary = result.summary.unwrap();
        assert_eq!(summary.file_sinks, 1);
        assert_eq!(summary.shutdown_policy, "Discard");
    }

    #[test]
    fn test_invalid_config() {
        let file = config_file(
            r#"
[[sinks]]
name = "uploader"
sink_type = "http"
"#,
        );
        let args = ValidateArgs {
            config: file.path().to_path_buf(),
            json: false,
        };

        let result = validate_config(&args);
        assert!(!result.valid);
        assert!(result.error.unwrap().contains("url"));
        assert!(run_validate(&args).is_err());
    }

    #[test]
    fn test_missing_file() {
        let args = ValidateArgs {
            config: PathBuf::from("/nonexistent/relay.toml"),
            json: false,
        };
        let result = validate_config(&args);
        assert!(!result.valid);
        assert!(result.error.unwrap().starts_with("File not found"));
    }
}
