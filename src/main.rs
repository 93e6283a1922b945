//! Vitals Monitor - Main Entry Point

use clap::{Parser, Subcommand};
use std::path::{Path, PathBuf};
use std::process;
use tokio::signal::unix::{signal, SignalKind};
use tracing::{error, info, warn};
use vitals_monitor::config::MonitorConfig;
use vitals_monitor::observability::{init_logging, LogSettings};
use vitals_monitor::{DeviceMonitor, MonitorError, MonitorResult};

/// Bedside vitals telemetry and alerting
#[derive(Parser)]
#[command(name = "vitals-monitor")]
#[command(about = "Sample mass, pulse and temperature; publish over MQTT; alert by email")]
#[command(version)]
struct Cli {
    /// Configuration file path
    #[arg(short, long, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Verbose logging
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the monitor loop
    Run {
        /// Run a single cycle and exit
        #[arg(long)]
        once: bool,
    },
    /// Validate configuration
    Config {
        /// Show current configuration
        #[arg(long)]
        show: bool,
    },
}

const DEFAULT_CONFIG_PATHS: [&str; 2] = ["monitor.toml", "config/monitor.toml"];

#[tokio::main(flavor = "current_thread")]
async fn main() {
    let cli = Cli::parse();

    let mut settings = LogSettings::from_env();
    if cli.verbose > 0 {
        settings = settings.verbose();
    }
    init_logging(settings);

    info!("Starting vitals-monitor v{}", env!("CARGO_PKG_VERSION"));

    let config = match load_configuration(cli.config.as_deref()) {
        Ok(config) => config,
        Err(e) => {
            error!("Failed to load configuration: {}", e);
            process::exit(e.exit_code());
        }
    };

    let result = match cli.command {
        Commands::Run { once } => run_monitor(&config, once).await,
        Commands::Config { show } => handle_config_command(&config, show),
    };

    if let Err(e) = result {
        error!("Command failed: {}", e);
        process::exit(e.exit_code());
    }

    info!("Application shutdown complete");
}

fn load_configuration(config_path: Option<&Path>) -> MonitorResult<MonitorConfig> {
    if let Some(path) = config_path {
        info!("Loading configuration from: {}", path.display());
        return Ok(MonitorConfig::load_from_file(path)?);
    }

    for path_str in DEFAULT_CONFIG_PATHS {
        let path = Path::new(path_str);
        if path.exists() {
            info!("Loading configuration from: {}", path.display());
            return Ok(MonitorConfig::load_from_file(path)?);
        }
    }

    Err(MonitorError::startup(
        "No configuration file found. Provide one with -c/--config or create monitor.toml",
    ))
}

async fn run_monitor(config: &MonitorConfig, once: bool) -> MonitorResult<()> {
    info!(device = %config.device.id, "Monitor starting");

    let mut monitor = DeviceMonitor::from_config(config)?;
    let status = monitor.start().await;
    info!(
        network = status.network_connected,
        broker = status.broker_connected,
        "Initial connectivity"
    );

    if once {
        let report = monitor.run_cycle().await;
        info!(
            published = report.published,
            alerts = report.alerts.len(),
            "Single cycle complete"
        );
    } else {
        let mut sigint = signal(SignalKind::interrupt())
            .map_err(|e| MonitorError::startup(format!("Cannot install SIGINT handler: {e}")))?;
        let mut sigterm = signal(SignalKind::terminate())
            .map_err(|e| MonitorError::startup(format!("Cannot install SIGTERM handler: {e}")))?;

        let shutdown = async move {
            tokio::select! {
                _ = sigint.recv() => info!("Received SIGINT, shutting down gracefully..."),
                _ = sigterm.recv() => info!("Received SIGTERM, shutting down gracefully..."),
            }
        };

        let cycles = monitor.run(shutdown).await;
        info!(cycles, "Monitor loop stopped");
    }

    monitor.shutdown().await;
    Ok(())
}

fn handle_config_command(config: &MonitorConfig, show: bool) -> MonitorResult<()> {
    if show {
        let rendered = toml::to_string_pretty(config)
            .map_err(|e| MonitorError::startup(format!("Cannot render configuration: {e}")))?;
        println!("Current configuration:");
        println!("{rendered}");
    }

    if config.email.username_env.is_some() && config.get_smtp_credentials().is_err() {
        warn!("SMTP credential variables are named but not set");
    }

    info!("Configuration validation complete");
    Ok(())
}
