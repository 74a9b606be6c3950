// Copyright (c) 2026 bad-antics
// Licensed under the MIT License. See LICENSE file in the project root.
// https://github.com/bad-antics/meshguard

//! MeshGuard - Wireless Sensor Mesh Intrusion Monitor
//!
//! Reads numeric status frames from a LoRa gateway (serial, stdin or the
//! built-in simulator), classifies every sensor as OK / Intrusion / Out and
//! writes confirmed intrusions to an append-only log.

use anyhow::Result;
use clap::Parser;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::broadcast;
use tracing::{error, info, warn, Level};
use tracing_subscriber::FmtSubscriber;

use meshguard::config::TransportKind;
use meshguard::core::{spawn_observer, LoggingObserver};
use meshguard::sensors::MeshSimulator;
use meshguard::streaming::{self, IntrusionLog, LineSource, ReaderSource};
use meshguard::{Config, EventBus, Monitor, VERSION};

/// MeshGuard - Wireless Sensor Mesh Intrusion Monitor
#[derive(Parser, Debug)]
#[command(name = "meshguard")]
#[command(version = VERSION)]
#[command(about = "Debounced intrusion monitoring for LoRa sensor meshes")]
struct Args {
    /// Configuration file path
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Enable debug logging
    #[arg(short, long)]
    debug: bool,

    /// Enable trace-level logging
    #[arg(long)]
    trace: bool,

    /// Demo mode with a simulated mesh
    #[arg(long)]
    demo: bool,

    /// Read frames from standard input
    #[arg(long, conflicts_with = "demo")]
    stdin: bool,

    /// Serial port of the gateway radio
    #[arg(long)]
    port: Option<String>,

    /// Serial baud rate
    #[arg(long)]
    baud: Option<u32>,

    /// Intrusion log path
    #[arg(long)]
    log_file: Option<PathBuf>,

    /// Print the status grid every N seconds (0 disables)
    #[arg(long, default_value = "0")]
    grid_secs: u64,
}

fn main() -> Result<()> {
    let args = Args::parse();

    let config_path = args.config.clone().unwrap_or_else(Config::default_path);
    let mut config = Config::load_or_create(&config_path)?;

    // Initialize logging
    let log_level = if args.trace {
        Level::TRACE
    } else if args.debug {
        Level::DEBUG
    } else {
        config.log_level.parse().unwrap_or(Level::INFO)
    };

    let subscriber = FmtSubscriber::builder()
        .with_max_level(log_level)
        .with_target(false)
        .with_thread_ids(true)
        .with_file(args.debug)
        .with_line_number(args.debug)
        .with_ansi(true)
        .finish();
    tracing::subscriber::set_global_default(subscriber)?;

    info!("MeshGuard v{} - Wireless Sensor Mesh Intrusion Monitor", VERSION);

    // Override with command line args
    if args.demo {
        config.transport.kind = TransportKind::Simulator;
    }
    if args.stdin {
        config.transport.kind = TransportKind::Stdin;
    }
    if let Some(port) = args.port {
        config.transport.serial_port = port;
    }
    if let Some(baud) = args.baud {
        config.transport.baud_rate = baud;
    }
    if let Some(path) = args.log_file {
        config.intrusion_log.path = path;
    }
    config.validate()?;

    info!("Configuration loaded from {:?}", config_path);
    info!("Transport: {:?}", config.transport.kind);

    let rt = tokio::runtime::Runtime::new()?;
    let result = rt.block_on(run(config, args.grid_secs));
    // A stdin read may still be parked on the blocking pool
    rt.shutdown_timeout(Duration::from_secs(1));
    result
}

fn open_source(config: &Config) -> Result<Box<dyn LineSource>> {
    let transport = &config.transport;
    let source: Box<dyn LineSource> = match transport.kind {
        TransportKind::Simulator => {
            let topology = config.topology.build()?;
            Box::new(MeshSimulator::new(
                topology,
                Duration::from_millis(transport.simulator_interval_ms),
            ))
        }
        TransportKind::Stdin => Box::new(ReaderSource::stdin()),
        #[cfg(feature = "serial")]
        TransportKind::Serial => Box::new(streaming::SerialSource::open(
            &transport.serial_port,
            transport.baud_rate,
            Duration::from_millis(transport.read_timeout_ms),
        )?),
        #[cfg(not(feature = "serial"))]
        TransportKind::Serial => {
            anyhow::bail!(
                "Serial support not enabled. Build with --features serial or use --stdin / --demo"
            );
        }
    };
    Ok(source)
}

async fn run(config: Config, grid_secs: u64) -> Result<()> {
    let (shutdown_tx, _) = broadcast::channel::<()>(1);

    let event_bus = Arc::new(EventBus::new(config.detection.event_capacity));
    let monitor = Monitor::from_config(&config, event_bus.clone())?;

    let mut tasks = Vec::new();
    tasks.push(spawn_observer(&event_bus, Arc::new(LoggingObserver), shutdown_tx.subscribe()));

    if config.intrusion_log.enabled {
        let log = IntrusionLog::open(&config.intrusion_log.path, config.intrusion_log.format)?;
        tasks.push(spawn_observer(&event_bus, Arc::new(log), shutdown_tx.subscribe()));
    }

    let (line_tx, line_rx) = streaming::ingest_channel(config.transport.queue_capacity);
    let mut source = open_source(&config)?;

    {
        let monitor = monitor.clone();
        let shutdown = shutdown_tx.subscribe();
        tasks.push(tokio::spawn(async move { monitor.run_heartbeat(shutdown).await }));
    }
    {
        let monitor = monitor.clone();
        let shutdown = shutdown_tx.subscribe();
        tasks.push(tokio::spawn(async move { monitor.run_ingestion(line_rx, shutdown).await }));
    }
    {
        let shutdown = shutdown_tx.subscribe();
        tasks.push(tokio::spawn(async move {
            match streaming::pump(source.as_mut(), line_tx, shutdown).await {
                Ok(count) => info!("Transport closed after {} lines", count),
                Err(e) => error!("Transport failed: {}", e),
            }
        }));
    }

    if grid_secs > 0 {
        let monitor = monitor.clone();
        let mut shutdown = shutdown_tx.subscribe();
        tasks.push(tokio::spawn(async move {
            let mut ticker = tokio::time::interval(Duration::from_secs(grid_secs));
            loop {
                tokio::select! {
                    _ = ticker.tick() => {
                        let grid = meshguard::ui::render_grid(
                            monitor.topology(),
                            &monitor.get_all_statuses(),
                            true,
                        );
                        println!("{}", grid);
                    }
                    _ = shutdown.recv() => break,
                }
            }
        }));
    }

    info!("MeshGuard running");
    info!("   Press Ctrl+C to shutdown");

    tokio::signal::ctrl_c().await?;
    info!("Shutdown signal received, cleaning up...");

    let _ = shutdown_tx.send(());
    for task in tasks {
        if let Err(e) = task.await {
            warn!("Task ended abnormally: {}", e);
        }
    }

    let stats = monitor.stats();
    info!(
        "Processed {} messages ({} rejected), {} intrusions, {} auto-resets",
        stats.messages_accepted + stats.messages_rejected,
        stats.messages_rejected,
        stats.intrusions_confirmed,
        stats.auto_resets
    );
    info!("MeshGuard shutdown complete");

    Ok(())
}
