// Copyright (c) 2026 bad-antics
// Licensed under the MIT License. See LICENSE file in the project root.

//! StrideWatch - edge gait analysis and fall detection
//!
//! Reads samples from a slipper transport (simulated or replayed), extracts
//! gait metrics, raises fall and gait alerts, and forwards them to the cloud
//! backend or an MQTT broker.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{bail, Result};
use clap::Parser;
use tokio::sync::{broadcast, mpsc};
use tracing::{info, warn};
use tracing_subscriber::{EnvFilter, FmtSubscriber};

use stridewatch::{
    network::NetworkManager,
    sensors::{GaitSimulator, ReplaySensor, Sensor, SensorFeed},
    Config, Engine, EventBus, NAME, VERSION,
};

/// StrideWatch - edge gait analysis and fall detection
#[derive(Parser, Debug)]
#[command(name = "stridewatch")]
#[command(author = "StrideWatch Project")]
#[command(version = VERSION)]
#[command(about = "Gait metrics and fall alerts from an instrumented slipper")]
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

    /// Demo mode with a simulated slipper
    #[arg(long)]
    demo: bool,

    /// Replay a recorded session (JSON lines of tagged samples)
    #[arg(long, conflicts_with = "demo")]
    replay: Option<PathBuf>,

    /// Inject a simulated fall after this many seconds (demo mode)
    #[arg(long)]
    fall_at: Option<f64>,

    /// Stop the simulated session after this many seconds (demo mode)
    #[arg(long)]
    duration: Option<f64>,

    /// Cloud REST base URL
    #[arg(long)]
    cloud_url: Option<String>,

    /// MQTT broker address
    #[arg(long)]
    mqtt_broker: Option<String>,
}

fn main() -> Result<()> {
    let args = Args::parse();

    // Load or create configuration
    let config_path = args.config.clone().unwrap_or_else(Config::default_path);
    // Logging is not up yet; report the load once the subscriber exists
    let created = !config_path.exists();
    let mut config = Config::load_or_create(&config_path)?;
    config.apply_env();

    // Override with command line args
    if args.demo {
        config.demo_mode = true;
    }
    if args.replay.is_some() {
        config.demo_mode = false;
    }
    if let Some(ref url) = args.cloud_url {
        config.cloud.url = Some(url.clone());
    }
    if let Some(ref broker) = args.mqtt_broker {
        config.mqtt.enabled = true;
        config.mqtt.broker = broker.clone();
    }

    // Initialize logging; RUST_LOG wins over flags and config
    let default_level = if args.trace {
        "trace"
    } else if args.debug {
        "debug"
    } else {
        config.log_level.as_str()
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));

    let subscriber = FmtSubscriber::builder()
        .with_env_filter(filter)
        .with_target(false)
        .with_thread_ids(true)
        .with_file(args.debug)
        .with_line_number(args.debug)
        .finish();
    tracing::subscriber::set_global_default(subscriber)?;

    info!("{} v{} - gait analysis and fall detection", NAME, VERSION);
    if created {
        info!("Created default configuration at {:?}", config_path);
    } else {
        info!("Configuration loaded from {:?}", config_path);
    }

    config.validate()?;

    let rt = tokio::runtime::Runtime::new()?;
    rt.block_on(run(config, args))
}

fn open_sensor(config: &Config, args: &Args) -> Result<Box<dyn Sensor>> {
    if let Some(ref path) = args.replay {
        info!("Replaying session from {:?}", path);
        return Ok(Box::new(ReplaySensor::new(path).realtime(true)));
    }

    if config.demo_mode {
        info!("Demo mode: simulating {}", config.sensor.device_name);
        if let Some(at) = args.fall_at {
            info!("A fall will be simulated at {:.1}s", at);
        }
        let simulator = GaitSimulator::new(&config.sensor.device_name, &config.sensor, &config.features)
            .with_fall_at(args.fall_at)
            .with_duration(args.duration)
            .realtime(true);
        return Ok(Box::new(simulator));
    }

    bail!("No sensor transport available: run with --demo or --replay FILE")
}

async fn run(config: Config, args: Args) -> Result<()> {
    let sensor = open_sensor(&config, &args)?;

    let network = Arc::new(NetworkManager::new(&config)?);
    if let Some(rest) = network.rest() {
        match rest.fetch_user_config().await {
            Ok(remote) => info!("Remote user config: {}", remote),
            Err(e) => warn!("Could not fetch remote user config: {}", e),
        }
    }

    let bus = Arc::new(EventBus::default());
    let (shutdown_tx, _) = broadcast::channel(1);
    let (sample_tx, sample_rx) = mpsc::channel(config.sensor.channel_capacity.max(1));

    // Log every alert as it is raised
    let mut alerts = bus.subscribe_alerts();
    let mut alert_shutdown = shutdown_tx.subscribe();
    let alert_logger = tokio::spawn(async move {
        loop {
            tokio::select! {
                alert = alerts.recv() => match alert {
                    Ok(alert) => info!("[{}] {} at t={:.2}s", alert.severity, alert.message, alert.timestamp),
                    Err(broadcast::error::RecvError::Lagged(n)) => warn!("Alert log skipped {} alerts", n),
                    Err(broadcast::error::RecvError::Closed) => break,
                },
                _ = alert_shutdown.recv() => break,
            }
        }
    });

    let feed = SensorFeed::new(
        sensor,
        Duration::from_secs(config.sensor.connection_retry_interval_s.max(1)),
    );
    let feed_task = tokio::spawn(feed.run(sample_tx, shutdown_tx.subscribe()));

    let mut engine = Engine::new(config, Arc::clone(&bus), network.clone(), network.clone());
    let engine_shutdown = shutdown_tx.subscribe();

    info!("🚀 {} running", NAME);
    info!("   Press Ctrl+C to shutdown");

    let signal_tx = shutdown_tx.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            info!("Shutdown signal received, cleaning up...");
            let _ = signal_tx.send(());
        }
    });

    let stats = engine.run(sample_rx, engine_shutdown).await?;
    let _ = shutdown_tx.send(());

    match feed_task.await? {
        Ok(feed) => info!(
            "Sensor feed forwarded {} samples ({} connect failures, {} read errors)",
            feed.samples_forwarded, feed.connect_failures, feed.read_errors
        ),
        Err(e) => warn!("Sensor feed failed: {}", e),
    }
    let _ = alert_logger.await;
    network.shutdown().await;

    info!(
        "Processed {} samples, raised {} alerts, uploaded {} gait records",
        stats.samples_processed, stats.alerts_raised, stats.records_uploaded
    );
    info!("{} shutdown complete", NAME);
    Ok(())
}
