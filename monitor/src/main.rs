mod cli;
mod config;
mod daemon;
mod error;
mod notifier;
mod power;
mod sampler;
mod telemetry;

use anyhow::{Context, Result};
use clap::Parser;
use config::MonitorConfig;
use daemon::TrafficMonitor;
use notifier::{LogNotifier, Notifier, TelegramNotifier};
use power::CommandPowerControl;
use sampler::SysinfoSampler;
use std::{fs, path::Path, sync::Arc};
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};

#[tokio::main]
async fn main() -> Result<()> {
    let args = cli::Args::parse();

    // Load configuration, writing defaults on first start
    let created = !Path::new(&args.config).exists();
    let mut cfg = MonitorConfig::load_or_create(&args.config)
        .with_context(|| format!("Failed to load configuration from {}", args.config))?;

    // Override with command line arguments
    if let Some(interface) = args.interface {
        cfg.network_interface = interface;
    }
    if let Some(log_level) = args.log_level {
        cfg.log_level = log_level;
    }
    if let Some(log_dir) = args.log_dir {
        cfg.log_dir = Some(log_dir);
    }
    cfg.validate()?;

    let _log_guard = telemetry::init_tracing(&cfg);

    if created {
        info!("Created default configuration file: {}", args.config);
    }
    info!(
        interface = %cfg.network_interface,
        mode = %cfg.traffic_mode,
        threshold_gb = cfg.warning_threshold_gb,
        reset_day = cfg.monthly_reset_day,
        interval_secs = cfg.check_interval_seconds,
        "Starting traffic monitor for {}",
        cfg.server_name
    );

    fs::create_dir_all(cfg.data_dir())
        .with_context(|| format!("Failed to create data directory {}", cfg.data_dir))?;

    let notifier: Arc<dyn Notifier> = if cfg.telegram_bot_token.is_empty() {
        warn!("No Telegram bot token configured, notifications will only be logged");
        Arc::new(LogNotifier)
    } else {
        Arc::new(
            TelegramNotifier::new(&cfg.telegram_bot_token, cfg.notify_timeout())
                .context("Failed to initialize Telegram notifier")?,
        )
    };

    let cfg = Arc::new(cfg);
    let store = accounting::StateStore::in_dir(cfg.data_dir());
    let monitor = TrafficMonitor::open(
        cfg.clone(),
        store,
        Arc::new(SysinfoSampler::new()),
        notifier,
        Arc::new(CommandPowerControl::new(cfg.shutdown_command.clone())),
    )
    .await
    .context("Failed to load traffic state")?;
    let monitor = Arc::new(monitor);

    let shutdown = CancellationToken::new();
    let monitor_task = {
        let monitor = monitor.clone();
        let shutdown = shutdown.clone();
        tokio::spawn(async move { monitor.run(shutdown).await })
    };

    match shutdown_signal().await {
        Ok(()) => info!("Received shutdown signal"),
        Err(e) => error!("Failed to listen for shutdown signal: {}", e),
    }

    shutdown.cancel();
    if let Err(e) = monitor_task.await {
        error!("Traffic monitor task failed: {}", e);
    }

    let state = monitor.snapshot().await;
    info!(
        status = ?monitor.status(),
        period = %state.current_period_label,
        accumulated_in = state.accumulated_in,
        accumulated_out = state.accumulated_out,
        "Traffic monitor stopped"
    );
    Ok(())
}

async fn shutdown_signal() -> std::io::Result<()> {
    #[cfg(unix)]
    {
        use tokio::signal::unix::{SignalKind, signal};

        let mut terminate = signal(SignalKind::terminate())?;
        tokio::select! {
            result = tokio::signal::ctrl_c() => result,
            _ = terminate.recv() => Ok(()),
        }
    }

    #[cfg(not(unix))]
    {
        tokio::signal::ctrl_c().await
    }
}
