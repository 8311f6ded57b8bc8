//! The `unimock` binary: load configuration, start the server, shut down
//! cleanly on SIGINT/SIGTERM.

use anyhow::Context;
use clap::Parser;
use std::net::SocketAddr;
use std::path::PathBuf;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;
use unimock_core::UnimockConfig;
use unimock_http::AppState;

/// Universal HTTP mock server for end-to-end testing
#[derive(Debug, Parser)]
#[command(name = "unimock", version, about)]
struct Args {
    /// Port to listen on
    #[arg(long, env = "UNIMOCK_PORT", default_value_t = 8080)]
    port: u16,

    /// YAML configuration file (sections and startup scenarios)
    #[arg(long, env = "UNIMOCK_CONFIG", default_value = "config.yaml")]
    config: PathBuf,

    /// Log level: debug, info, warn, or error
    #[arg(long, env = "UNIMOCK_LOG_LEVEL", default_value = "info")]
    log_level: String,

    /// Additional scenarios-only YAML file loaded at startup
    #[arg(long, env = "UNIMOCK_SCENARIOS_FILE")]
    scenarios_file: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();
    init_tracing(&args.log_level);

    let config = if args.config.exists() {
        unimock_core::load_config(&args.config)
            .await
            .with_context(|| format!("loading {}", args.config.display()))?
    } else {
        warn!(
            "configuration file {} not found; starting with no sections",
            args.config.display()
        );
        UnimockConfig::default()
    };

    let state = AppState::from_config(config).await?;

    if let Some(path) = &args.scenarios_file {
        let scenarios = unimock_core::load_scenarios_file(path)
            .await
            .with_context(|| format!("loading {}", path.display()))?;
        info!(count = scenarios.len(), "installing scenarios from {}", path.display());
        for scenario in scenarios {
            state.scenarios.insert(scenario.into_scenario()).await?;
        }
    }

    let addr = SocketAddr::from(([0, 0, 0, 0], args.port));
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("binding {addr}"))?;
    info!("unimock {} listening on http://{addr}", env!("CARGO_PKG_VERSION"));

    unimock_http::serve(listener, state, shutdown_signal()).await?;
    info!("server stopped");
    Ok(())
}

/// `UNIMOCK_LOG_LEVEL` drives the filter unless `RUST_LOG` is set.
fn init_tracing(level: &str) {
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(level))
        .unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt().with_env_filter(filter).init();
}

/// Resolve on SIGINT or, on unix, SIGTERM.
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            warn!("failed to install SIGINT handler: {e}");
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
                warn!("failed to install SIGTERM handler: {e}");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => info!("received SIGINT, shutting down"),
        _ = terminate => info!("received SIGTERM, shutting down"),
    }
}
