use std::net::SocketAddr;

use anyhow::{Context, Result};
use clap::Parser;
use rustcrud::{AppState, EmployeeService, build_router, config::AppConfig};
use tracing::{error, info};
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser)]
#[command(name = "rustcrud")]
#[command(about = "Employee lifecycle API with audit trail and soft delete")]
struct Cli {
    /// Overrides RUSTCRUD_BIND_ADDR.
    #[arg(long)]
    bind: Option<SocketAddr>,
    /// Inserts a few sample employees before serving.
    #[arg(long)]
    seed_demo: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    // Must precede `init_tracing` so a RUST_LOG from `.env` takes effect.
    dotenvy::dotenv().ok();
    init_tracing();

    let mut config = AppConfig::from_env().context("failed to load configuration")?;
    if let Some(bind) = cli.bind {
        config.bind_addr = bind;
    }

    let state = AppState::new(EmployeeService::in_memory(), config.web_settings());

    if cli.seed_demo {
        let inserted = state
            .employees
            .seed_demo(&state.shutdown)
            .await
            .context("failed to seed demo employees")?;
        info!(inserted, "seeded demo employees");
    }

    let shutdown = state.shutdown.clone();
    let app = build_router(state);
    let listener = tokio::net::TcpListener::bind(config.bind_addr)
        .await
        .with_context(|| format!("failed to bind {}", config.bind_addr))?;

    info!(
        bind_addr = %config.bind_addr,
        default_page_size = config.default_page_size,
        max_page_size = config.max_page_size,
        "employee API started"
    );

    axum::serve(listener, app)
        .with_graceful_shutdown(async move {
            shutdown_signal().await;
            info!("shutdown requested, cancelling in-flight work");
            shutdown.cancel();
        })
        .await
        .context("server error")?;

    Ok(())
}

fn init_tracing() {
    tracing_subscriber::registry()
        .with(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("rustcrud=debug,tower_http=info")),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(err) = tokio::signal::ctrl_c().await {
            error!(error = %err, "unable to install ctrl+c handler");
        }
    };

    #[cfg(unix)]
    let terminate = async {
        use tokio::signal::unix::{SignalKind, signal};

        match signal(SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(err) => {
                error!(error = %err, "unable to install sigterm handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}
