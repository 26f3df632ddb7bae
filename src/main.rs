//! Vitals process health probe
//!
//! Runs a [`HealthMonitor`] next to a dedicated probe listener so load
//! balancers and container schedulers can ask whether this process should
//! keep receiving traffic.
//!
//! # Architecture Overview
//!
//! ```text
//!                        ┌───────────────────────────────────────────────┐
//!                        │                    VITALS                      │
//!                        │                                                │
//!   panics, failed joins │  ┌──────────┐     ┌──────────────────────────┐ │
//!   ─────────────────────┼─▶│  taps    │────▶│                          │ │
//!                        │  └──────────┘     │      HealthMonitor       │ │
//!                        │  ┌──────────┐     │  rules · escalation ·    │ │
//!                        │  │ sampler  │────▶│  grace · time limit      │ │
//!                        │  └──────────┘     └────────────┬─────────────┘ │
//!                        │                                │ state()       │
//!   Probe request        │  ┌──────────┐     ┌────────────▼─────────────┐ │
//!   ─────────────────────┼─▶│ listener │────▶│     probe middleware     │ │
//!   ◀────────────────────┼──│          │◀────│  200 / error status      │ │
//!                        │  └──────────┘     └──────────────────────────┘ │
//!                        │                                                │
//!                        │  config · observability · lifecycle            │
//!                        └───────────────────────────────────────────────┘
//! ```

use std::path::PathBuf;
use std::sync::Arc;

use clap::Parser;
use tokio::net::TcpListener;

use vitals::config::{load_config, VitalsConfig};
use vitals::health::{CountingAllocator, HealthMonitor, SysinfoProbe};
use vitals::lifecycle::{signals, Shutdown};
use vitals::observability::{logging, metrics};
use vitals::probe::ProbeServer;

#[global_allocator]
static ALLOCATOR: CountingAllocator = CountingAllocator::new();

#[derive(Parser)]
#[command(name = "vitals")]
#[command(about = "Process health probe for load balancers and schedulers", long_about = None)]
struct Args {
    /// TOML configuration file. Defaults apply when omitted.
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Override the probe bind address.
    #[arg(short, long)]
    bind: Option<String>,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();

    let mut config = match &args.config {
        Some(path) => load_config(path)?,
        None => VitalsConfig::default(),
    };
    if let Some(bind) = args.bind {
        config.probe.bind_address = bind;
    }

    logging::init_logging(&config.observability);
    tracing::info!("vitals v{} starting", env!("CARGO_PKG_VERSION"));

    tracing::info!(
        bind_address = %config.probe.bind_address,
        path = %config.probe.path,
        grace_period_secs = config.monitor.grace_period,
        "Configuration loaded"
    );

    if config.observability.metrics_enabled {
        match config.observability.metrics_address.parse() {
            Ok(addr) => metrics::init_metrics(addr),
            Err(_) => tracing::error!(
                metrics_address = %config.observability.metrics_address,
                "Failed to parse metrics address"
            ),
        }
    }

    let monitor = HealthMonitor::builder(config.monitor.clone())
        .memory_probe(Arc::new(SysinfoProbe::with_allocator(&ALLOCATOR)))
        .build()?;

    let tap = monitor.panic_hook();
    let previous_hook = std::panic::take_hook();
    std::panic::set_hook(Box::new(move |info| {
        tap(info);
        previous_hook(info);
    }));

    let listener = TcpListener::bind(&config.probe.bind_address).await?;
    tracing::info!(address = %listener.local_addr()?, "Listening for probes");

    let mut shutdown = Shutdown::new();
    shutdown.register(monitor.clone());
    let server = ProbeServer::new(monitor, config.probe);
    let server_shutdown = shutdown.subscribe();
    let server_task = tokio::spawn(server.run(listener, server_shutdown));

    signals::wait_for_shutdown().await;
    shutdown.trigger();

    server_task.await??;
    tracing::info!("Shutdown complete");
    Ok(())
}
