//! `run` command implementation.

use anyhow::{Context, Result};
use contracts::RelayBlueprint;
use std::time::Duration;
use tokio::io::BufReader;
use tracing::{error, info};

use crate::cli::RunArgs;
use crate::error::CliError;
use crate::pipeline::{Relay, RelayConfig};

/// Execute the `run` command
pub async fn run_relay(args: &RunArgs) -> Result<()> {
    info!(config = %args.config.display(), "Loading configuration");

    // Validate config path
    if !args.config.exists() {
        return Err(CliError::config_not_found(args.config.display().to_string()).into());
    }

    // Load and parse configuration
    let mut blueprint = config_loader::ConfigLoader::load_from_path(&args.config)
        .with_context(|| format!("Failed to load config from {}", args.config.display()))?;

    // Apply CLI overrides
    if let Some(delay_ms) = args.delay_ms {
        info!(delay_ms, "Overriding quiet delay from CLI");
        blueprint.dispatcher.delay_ms = delay_ms;
        config_loader::ConfigLoader::validate(&blueprint)
            .context("Invalid --delay-ms override")?;
    }

    info!(
        delay_ms = blueprint.dispatcher.delay_ms,
        shutdown_policy = ?blueprint.dispatcher.shutdown_policy,
        sinks = blueprint.sinks.len(),
        "Configuration loaded"
    );

    // Dry run - just validate and exit
    if args.dry_run {
        info!("Dry run mode - configuration is valid, exiting");
        print_config_summary(&blueprint);
        return Ok(());
    }

    // Initialize Metrics (optional)
    if args.metrics_port != 0 {
        observability::init_metrics_only(args.metrics_port)?;
        info!("Metrics endpoint available on port {}", args.metrics_port);
    }

    let relay = Relay::new(RelayConfig {
        blueprint,
        timeout: if args.timeout == 0 {
            None
        } else {
            Some(Duration::from_secs(args.timeout))
        },
        source: args.source.clone(),
    });

    info!("Starting relay...");

    let stats = relay
        .run(BufReader::new(tokio::io::stdin()), shutdown_signal())
        .await
        .context("Relay execution failed")?;

    info!(
        reports = stats.reports(),
        delivered = stats.delivered(),
        duration_secs = stats.duration.as_secs_f64(),
        "Relay completed"
    );
    stats.print_summary();

    info!("Batch Relay finished");
    Ok(())
}

/// Resolves on Ctrl+C or SIGTERM
///
/// If a handler cannot be installed the error is logged and that signal is
/// ignored.
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            error!(error = %e, "Failed to install Ctrl+C handler");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                error!(error = %e, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}

/// Print configuration summary for dry-run mode
fn print_config_summary(blueprint: &RelayBlueprint) {
    println!("\n=== Configuration Summary ===\n");
    println!("Dispatcher:");
    println!("  Quiet delay: {} ms", blueprint.dispatcher.delay_ms);
    println!(
        "  Shutdown policy: {:?}",
        blueprint.dispatcher.shutdown_policy
    );

    println!("\nSinks ({}):", blueprint.sinks.len());
    for sink in &blueprint.sinks {
        println!("  - {} ({:?})", sink.name, sink.sink_type);
    }

    println!();
}
