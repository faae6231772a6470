mod config;
mod io;
mod monitoring;
mod protocol;

use std::time::Duration;

use anyhow::bail;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use crate::config::{AgentConfig, Command};
use crate::monitoring::MonitoringManager;

const VERSION: &str = env!("CARGO_PKG_VERSION");

fn print_usage() {
    eprintln!("Usage: hoststat-agent [--self] [--config <path>] [options]");
    eprintln!();
    eprintln!("Samples CPU, memory, load and disk figures of each target and");
    eprintln!("writes monitoring.data notifications as NDJSON to stdout.");
    eprintln!();
    eprintln!("Options:");
    eprintln!("  --self              Monitor the host the agent runs on");
    eprintln!("  --config <path>     Read targets from a JSON config file");
    eprintln!("  --interval-ms <n>   Sampling interval (default 2000, minimum 500)");
    eprintln!("  --count <n>         Stop after n samples per target");
    eprintln!("  --per-core          Include per-core CPU usage");
    eprintln!("  --version           Print version and exit");
    eprintln!("  --help              Print this help message");
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args: Vec<String> = std::env::args().skip(1).collect();

    let config = match config::parse_args(&args) {
        Ok(Command::Version) => {
            println!("hoststat-agent {}", VERSION);
            return Ok(());
        }
        Ok(Command::Help) => {
            print_usage();
            return Ok(());
        }
        Ok(Command::Run(config)) => config,
        Err(e) => {
            eprintln!("Error: {e:#}");
            print_usage();
            std::process::exit(1);
        }
    };

    // Tracing goes to stderr so it doesn't interfere with the NDJSON on stdout
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    info!(
        "hoststat-agent {} starting with {} target(s)",
        VERSION,
        config.targets.len()
    );
    run(config).await
}

async fn run(config: AgentConfig) -> anyhow::Result<()> {
    let (tx, mut rx) = tokio::sync::mpsc::unbounded_channel();
    let manager = MonitoringManager::new(tx);
    let interval = Duration::from_millis(config.interval_ms());

    let mut active = 0;
    for target in &config.targets {
        match manager
            .subscribe(target, interval, config.per_core, config.count)
            .await
        {
            Ok(()) => active += 1,
            Err(e) => warn!("Skipping target '{}': {:#}", target.id(), e),
        }
    }
    if active == 0 {
        bail!("No target could be monitored");
    }

    let writer = tokio::spawn(async move {
        let mut stdout = tokio::io::stdout();
        io::transport::run_output_loop(&mut stdout, &mut rx).await
    });

    tokio::select! {
        _ = manager.wait_all() => info!("All targets finished"),
        result = tokio::signal::ctrl_c() => {
            if let Err(e) = result {
                warn!("Failed to listen for Ctrl-C: {e}");
            }
            info!("Interrupted, shutting down");
        }
    }

    manager.shutdown().await;
    // Dropping the manager closes the notification channel.
    drop(manager);

    let written = writer.await??;
    info!("Wrote {} notifications", written);
    Ok(())
}
