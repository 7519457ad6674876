//! # uplinkd
//!
//! Uplink daemon binary — loads settings, wires the automation agent,
//! orchestrator, and HTTP server together, and handles graceful shutdown.
//!
//! The in-tree simulated driver is wired by default; a production browser
//! driver plugs in through the same `BlockingDriver` seam.

#![deny(unsafe_code)]

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::Parser;
use tracing::info;
use tracing_subscriber::EnvFilter;

use uplink_agent::{PooledAgent, SimulatedDriverConfig, SimulatedDriverFactory};
use uplink_runtime::{Orchestrator, OrchestratorConfig};
use uplink_server::{ServerConfig, UplinkServer};
use uplink_settings::{AgentSettings, OrchestratorSettings, UplinkSettings};

/// Uplink upload orchestrator daemon.
#[derive(Parser, Debug)]
#[command(name = "uplinkd", about = "Uplink upload orchestrator daemon")]
struct Cli {
    /// Host to bind (overrides settings if specified).
    #[arg(long)]
    host: Option<String>,

    /// Port to bind (overrides settings if specified).
    #[arg(long)]
    port: Option<u16>,

    /// Path to the settings file (default `~/.uplink/settings.json`).
    #[arg(long)]
    settings: Option<PathBuf>,

    /// Maximum concurrent sessions (overrides settings if specified).
    #[arg(long)]
    max_sessions: Option<usize>,

    /// Make the simulated driver demand a second factor on login.
    #[arg(long)]
    simulate_second_factor: bool,
}

fn orchestrator_config(
    settings: &OrchestratorSettings,
    max_sessions: Option<usize>,
) -> OrchestratorConfig {
    OrchestratorConfig {
        max_concurrent_sessions: max_sessions.unwrap_or(settings.max_concurrent_sessions),
        session_timeout: Duration::from_secs(settings.session_timeout_secs),
        second_factor_wait: Duration::from_secs(settings.second_factor_wait_secs),
        reaper_interval: Duration::from_secs(settings.reaper_interval_secs),
    }
}

fn driver_config(settings: &AgentSettings, simulate_second_factor: bool) -> SimulatedDriverConfig {
    SimulatedDriverConfig {
        requires_second_factor: simulate_second_factor,
        image_base_url: settings.image_base_url.clone(),
        step_delay: Duration::from_millis(settings.simulate_delay_ms),
        ..SimulatedDriverConfig::default()
    }
}

fn server_config(settings: &UplinkSettings, cli: &Cli) -> ServerConfig {
    ServerConfig {
        host: cli.host.clone().unwrap_or_else(|| settings.server.host.clone()),
        port: cli.port.unwrap_or(settings.server.port),
        max_upload_size_mb: settings.server.max_upload_size_mb,
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Cli::parse();

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let settings_path = args
        .settings
        .clone()
        .unwrap_or_else(uplink_settings::settings_path);
    let settings = uplink_settings::load_settings_from_path(&settings_path)
        .with_context(|| format!("failed to load settings from {}", settings_path.display()))?;

    // Agent: simulated driver through the real worker-pool adapter.
    let factory = SimulatedDriverFactory::new(driver_config(
        &settings.agent,
        args.simulate_second_factor,
    ));
    let agent = Arc::new(PooledAgent::new(factory));

    let orchestrator = Orchestrator::new(agent, orchestrator_config(
        &settings.orchestrator,
        args.max_sessions,
    ));
    orchestrator.start_reaper();

    let config = server_config(&settings, &args);
    let server = UplinkServer::new(config.clone(), Arc::clone(&orchestrator));
    let router = server.router();

    let listener = tokio::net::TcpListener::bind((config.host.as_str(), config.port))
        .await
        .with_context(|| format!("failed to bind {}:{}", config.host, config.port))?;
    let addr = listener.local_addr().context("no local address")?;
    info!(
        max_sessions = orchestrator.config().max_concurrent_sessions,
        "uplinkd listening on http://{addr}"
    );

    // Ctrl-C triggers the shutdown token; the server then stops accepting
    // and drains in-flight requests.
    let coordinator = server.shutdown().clone();
    let token = coordinator.token();
    drop(tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            info!("shutdown signal received");
            coordinator.trigger();
        }
    }));

    axum::serve(listener, router)
        .with_graceful_shutdown(async move { token.cancelled().await })
        .await
        .context("server error")?;

    info!("http server stopped, draining sessions");
    server.shutdown().drain(None).await;
    orchestrator.shutdown().await;
    info!("shutdown complete");
    Ok(())
}
