//! `info` command implementation.

use std::collections::BTreeMap;

use anyhow::{Context, Result};
use contracts::RelayBlueprint;
use serde::Serialize;
use tracing::info;

use crate::cli::InfoArgs;
use crate::error::CliError;

/// Configuration info for JSON output
#[derive(Serialize)]
struct ConfigInfo {
    version: String,
    dispatcher: DispatcherInfo,
    sinks: Vec<SinkInfo>,
}

#[derive(Serialize)]
struct DispatcherInfo {
    delay_ms: u64,
    shutdown_policy: String,
}

#[derive(Serialize)]
struct SinkInfo {
    name: String,
    sink_type: String,
    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    params: BTreeMap<String, String>,
}

/// Execute the `info` command
pub fn run_info(args: &InfoArgs) -> Result<()> {
    info!(config = %args.config.display(), "Loading configuration info");

    if !args.config.exists() {
        return Err(CliError::config_not_found(args.config.display().to_string()).into());
    }

    let blueprint = config_loader::ConfigLoader::load_from_path(&args.config)
        .with_context(|| format!("Failed to load config from {}", args.config.display()))?;

    if args.json {
        let info = build_config_info(&blueprint, args);
        let json =
            serde_json::to_string_pretty(&info).context("Failed to serialize config info")?;
        println!("{}", json);
    } else {
        print_config_info(&blueprint, args);
    }

    Ok(())
}

fn build_config_info(blueprint: &RelayBlueprint, args: &InfoArgs) -> ConfigInfo {
    let sinks = blueprint
        .sinks
        .iter()
        .map(|s| SinkInfo {
            name: s.name.clone(),
            sink_type: format!("{:?}", s.sink_type),
            params: if args.params {
                s.params.clone().into_iter().collect()
            } else {
                BTreeMap::new()
            },
        })
        .collect();

    ConfigInfo {
        version: format!("{:?}", blueprint.version),
        dispatcher: DispatcherInfo {
            delay_ms: blueprint.dispatcher.delay_ms,
            shutdown_policy: format!("{:?}", blueprint.dispatcher.shutdown_policy),
        },
        sinks,
    }
}

fn print_config_info(blueprint: &RelayBlueprint, args: &InfoArgs) {
    println!("╔══════════════════════════════════════════════════════════════╗");
    println!("║               Batch Relay Configuration                      ║");
    println!("╚══════════════════════════════════════════════════════════════╝\n");

    println!("Dispatcher");
    println!("   ├─ Version: {:?}", blueprint.version);
    println!("   ├─ Quiet delay: {} ms", blueprint.dispatcher.delay_ms);
    println!(
        "   └─ Shutdown policy: {:?}",
        blueprint.dispatcher.shutdown_policy
    );

    println!("\nSinks ({})", blueprint.sinks.len());
    for (i, sink) in blueprint.sinks.iter().enumerate() {
        let is_last = i == blueprint.sinks.len() - 1;
        let prefix = if is_last { "└─" } else { "├─" };
        let child_prefix = if is_last { "   " } else { "│  " };

        println!("   {} {} ({:?})", prefix, sink.name, sink.sink_type);

        if args.params && !sink.params.is_empty() {
            let params: BTreeMap<_, _> = sink.params.iter().collect();
            for (j, (key, value)) in params.iter().enumerate() {
                let param_prefix = if j == params.len() - 1 { "└─" } else { "├─" };
                println!("   {}  {} {} = {}", child_prefix, param_prefix, key, value);
            }
        }
    }

    println!();
}
