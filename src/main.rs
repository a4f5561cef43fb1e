// Copyright (c) 2026 bad-antics
// Licensed under the MIT License. See LICENSE file in the project root.
// https://github.com/bad-antics/deepguard-rs

//! DeepGuard - live capture authenticity scanning
//!
//! Runs the scanner core behind an interactive console with a simulated
//! camera and microphone.

use anyhow::{Context, Result};
use clap::Parser;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, Level};
use tracing_subscriber::{EnvFilter, FmtSubscriber};

use deepguard::capture::{AccessPolicy, SimulatedDevice};
use deepguard::detection::{Detector, RandomDetector, ScriptedDetector, Verdict};
use deepguard::{Config, SessionController, VERSION};

/// DeepGuard - live capture authenticity scanning
#[derive(Parser, Debug)]
#[command(name = "deepguard")]
#[command(author = "DeepGuard Project")]
#[command(version = VERSION)]
#[command(about = "Scan a live camera/microphone capture for manipulated content")]
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

    /// Simulated device refuses camera/microphone access
    #[arg(long)]
    deny: bool,

    /// Replay these verdicts instead of the random placeholder (e.g. "fake,authentic")
    #[arg(long, value_delimiter = ',')]
    verdicts: Vec<Verdict>,

    /// Simulated analysis time in milliseconds
    #[arg(long)]
    latency_ms: Option<u64>,

    /// Detector timeout in milliseconds (0 disables)
    #[arg(long)]
    timeout_ms: Option<u64>,

    /// Print every event as a JSON line instead of toasts
    #[arg(long)]
    json: bool,
}

fn main() -> Result<()> {
    let args = Args::parse();

    // Load or create configuration
    let config_path = args.config.clone().unwrap_or_else(Config::default_path);
    let mut config = Config::load_or_create(&config_path)
        .with_context(|| format!("loading configuration from {:?}", config_path))?;

    // Initialize logging
    let log_level = if args.trace {
        Level::TRACE
    } else if args.debug {
        Level::DEBUG
    } else {
        config.log_level.parse().unwrap_or(Level::INFO)
    };

    let subscriber = FmtSubscriber::builder()
        .with_env_filter(EnvFilter::from_default_env().add_directive(log_level.into()))
        .with_target(false)
        .with_file(args.debug)
        .with_line_number(args.debug)
        .with_writer(std::io::stderr)
        .finish();
    tracing::subscriber::set_global_default(subscriber)?;

    info!("🛡  DeepGuard v{} - AI content verification", VERSION);
    info!("Configuration loaded from {:?}", config_path);

    // Override with command line args
    if let Some(ms) = args.latency_ms {
        config.scan.simulated_latency_ms = ms;
    }
    if let Some(ms) = args.timeout_ms {
        config.scan.detector_timeout_ms = ms;
    }
    config.validate()?;

    // One logical thread of control
    let rt = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()?;
    rt.block_on(run(config, args))
}

async fn run(config: Config, args: Args) -> Result<()> {
    let policy = if args.deny { AccessPolicy::Deny } else { AccessPolicy::Grant };
    let device = Arc::new(
        SimulatedDevice::new("simulated camera + microphone")
            .with_policy(policy)
            .with_acquire_delay(Duration::from_millis(300)),
    );

    let detector: Arc<dyn Detector> = if args.verdicts.is_empty() {
        Arc::new(RandomDetector::from_config(&config.scan)?)
    } else {
        let latency = Duration::from_millis(config.scan.simulated_latency_ms);
        Arc::new(ScriptedDetector::new(args.verdicts.clone())?.with_latency(latency))
    };

    let controller = SessionController::new(config, device.clone(), detector)?;

    #[cfg(feature = "console")]
    {
        use deepguard::ui::{spawn_notifier, Console, ConsoleSink, OutputFormat};
        use tokio::io::BufReader;
        use tokio::sync::broadcast;

        let mut controller = controller;
        let format = if args.json { OutputFormat::Json } else { OutputFormat::Text };
        let (shutdown_tx, shutdown_rx) = broadcast::channel(1);
        let notifier = spawn_notifier(
            &controller.event_bus(),
            ConsoleSink::new(std::io::stdout(), format),
            shutdown_rx,
        );

        {
            let mut console = Console::new(&mut controller, std::io::stdout())
                .with_simulated_device(device.clone());
            console.run(BufReader::new(tokio::io::stdin())).await?;
        }

        let _ = shutdown_tx.send(());
        notifier.await?;

        info!(
            "Session ended with {} verdict(s) recorded",
            controller.history().len()
        );
        Ok(())
    }

    #[cfg(not(feature = "console"))]
    {
        drop(controller);
        anyhow::bail!("Console feature not enabled. Build with --features console")
    }
}
