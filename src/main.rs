//! Pingboard Binary Entry Point
//!
//! Runs the ping dashboard: loads configuration, spawns the monitor and
//! serves the web UI. Core functionality is provided by the `pingboard`
//! library crate.

use clap::Parser;
use pingboard::{
    config::AppConfig,
    monitor::{MonitorBuilder, MonitorHandles, SettingsPatch, TimeMode},
    probe::HttpProbe,
    server::{AppState, create_router},
};
use std::net::SocketAddr;
use std::time::Duration;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// Pingboard - Server Ping Dashboard
#[derive(Parser, Debug)]
#[command(name = "pingboard", version, about, long_about = None)]
struct Cli {
    /// Path to configuration file (defaults are used when omitted)
    #[arg(short, long, env = "PINGBOARD_CONFIG")]
    config: Option<String>,

    /// Server bind address (overrides config file)
    #[arg(long, env = "PINGBOARD_SERVER_BIND")]
    server_bind: Option<String>,

    /// Server port (overrides config file)
    #[arg(long, env = "PINGBOARD_SERVER_PORT")]
    server_port: Option<u16>,

    /// Target URL to probe; repeat to add more (overrides config file)
    #[arg(long = "target", env = "PINGBOARD_TARGETS", value_delimiter = ',')]
    targets: Vec<String>,

    /// Poll interval in whole seconds (overrides config file)
    #[arg(long, env = "PINGBOARD_INTERVAL")]
    interval: Option<u64>,

    /// Timestamp display mode: local or utc (overrides config file)
    #[arg(long, env = "PINGBOARD_TIME_MODE")]
    time_mode: Option<TimeMode>,

    /// Start polling immediately
    #[arg(long, env = "PINGBOARD_AUTOSTART")]
    autostart: bool,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info,pingboard=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    tracing::info!("Pingboard - Server Ping Dashboard");

    // Parse CLI arguments
    let cli = Cli::parse();

    let mut config = match &cli.config {
        Some(path) => {
            tracing::info!("Loading configuration from: {}", path);
            AppConfig::load(path)?
        }
        None => {
            tracing::info!("No configuration file given, using defaults");
            AppConfig::default()
        }
    };

    // Apply CLI/env overrides (CLI > ENV > config file)
    if let Some(bind) = cli.server_bind {
        config.server.bind = bind;
    }
    if let Some(port) = cli.server_port {
        config.server.port = port;
    }
    if !cli.targets.is_empty() {
        config.monitor.targets = cli.targets;
    }
    if let Some(secs) = cli.interval {
        config.monitor.interval = Duration::from_secs(secs);
    }
    if let Some(mode) = cli.time_mode {
        config.monitor.time_mode = mode;
    }
    config.monitor.autostart |= cli.autostart;
    config.validate()?;

    // Build monitor
    let settings = config.monitor.to_settings();
    let probe = HttpProbe::new(config.monitor.timeout)?;
    tracing::info!(
        targets = settings.targets.len(),
        interval = ?settings.interval,
        timeout = ?probe.timeout(),
        time_mode = %settings.time_mode,
        "Monitor configured"
    );
    let handles = MonitorBuilder::new(probe).settings(settings).build();

    if config.monitor.autostart {
        match handles.monitor.start(SettingsPatch::default()).await {
            Ok(()) => tracing::info!("Autostart: pinging started"),
            Err(e) => tracing::warn!(error = %e, "Autostart failed"),
        }
    }

    // Create web server state
    let app_state = AppState {
        monitor: handles.monitor.clone(),
    };

    // Build Axum router
    let app = create_router(app_state);

    // Parse bind address
    let addr: SocketAddr = format!("{}:{}", config.server.bind, config.server.port).parse()?;

    tracing::info!("Web server listening on: http://{}", addr);
    tracing::info!("Press Ctrl+C to shutdown");

    // Start server with graceful shutdown
    let listener = tokio::net::TcpListener::bind(addr).await?;

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal(handles))
        .await?;

    tracing::info!("Shutdown complete");
    Ok(())
}

/// Setup graceful shutdown signal handler.
async fn shutdown_signal(handles: MonitorHandles) {
    let ctrl_c = async {
        tokio::signal::ctrl_c()
            .await
            .expect("failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .expect("failed to install signal handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            tracing::info!("Received Ctrl+C signal");
        }
        _ = terminate => {
            tracing::info!("Received terminate signal");
        }
    }

    tracing::info!("Shutting down monitor...");
    if let Err(e) = handles.shutdown().await {
        tracing::error!("Failed to shutdown monitor: {}", e);
    }
}
