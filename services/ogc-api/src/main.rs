//! OGC API service.
//!
//! HTTP server implementing OGC WMS 1.1.1/1.3.0 and WCS 1.0.0/2.0.1.

use anyhow::{Context, Result};
use clap::Parser;
use ogc_api::{build_router, AppState, ServerConfig};
use ogc_engine::OgcEngine;
use projection::StandardTransform;
use std::{net::SocketAddr, str::FromStr, sync::Arc, time::Duration};
use tracing::{info, warn, Level};
use tracing_subscriber::FmtSubscriber;

#[derive(Parser, Debug)]
#[command(name = "ogc-api")]
#[command(about = "OGC WMS/WCS API server")]
struct Args {
    /// Listen address
    #[arg(short, long, env = "LISTEN_ADDR", default_value = "0.0.0.0:8080")]
    listen: String,

    /// Layer and service configuration file
    #[arg(short, long, env = "OGC_CONFIG", default_value = "config/ogc.yaml")]
    config: String,

    /// Log level
    #[arg(long, env = "LOG_LEVEL", default_value = "info")]
    log_level: String,

    /// Number of tokio worker threads (default: number of CPU cores)
    #[arg(long, env = "TOKIO_WORKER_THREADS")]
    worker_threads: Option<usize>,

    /// Per-request deadline in seconds, 0 disables it
    #[arg(long, env = "REQUEST_TIMEOUT_SECS", default_value_t = 30)]
    request_timeout_secs: u64,
}

fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    let args = Args::parse();

    let mut runtime = tokio::runtime::Builder::new_multi_thread();
    if let Some(threads) = args.worker_threads {
        runtime.worker_threads(threads);
    }
    runtime
        .enable_all()
        .build()
        .context("Failed to build tokio runtime")?
        .block_on(serve(args))
}

/// JSON logs to stdout; unknown level names fall back to `info`.
fn init_logging(level: &str) -> Result<()> {
    let level = Level::from_str(level.trim()).unwrap_or(Level::INFO);
    let subscriber = FmtSubscriber::builder()
        .json()
        .with_max_level(level)
        .with_target(false)
        .finish();
    tracing::subscriber::set_global_default(subscriber)
        .context("Failed to install tracing subscriber")
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        warn!(error = %e, "Cannot listen for ctrl-c; running until killed");
        std::future::pending::<()>().await;
    }
    info!("Shutting down");
}

async fn serve(args: Args) -> Result<()> {
    init_logging(&args.log_level)?;
    info!(
        config = %args.config,
        worker_threads = ?args.worker_threads,
        "Starting OGC API server"
    );

    let prometheus_handle = metrics_exporter_prometheus::PrometheusBuilder::new()
        .install_recorder()
        .context("Failed to install Prometheus recorder")?;
    info!("Prometheus metrics exporter initialized");

    let config = ServerConfig::load(&args.config)?;
    let transform = Arc::new(StandardTransform::new());
    let registry = config.build_registry(transform.clone())?;
    metrics::gauge!("ogc_layers").set(registry.len() as f64);

    let engine = OgcEngine::new(
        Arc::new(registry),
        transform,
        config.service,
        config.limits,
    );
    let request_timeout =
        (args.request_timeout_secs > 0).then(|| Duration::from_secs(args.request_timeout_secs));
    let state = Arc::new(AppState::new(engine, request_timeout));

    let app = build_router(state, prometheus_handle);

    let addr: SocketAddr = args
        .listen
        .parse()
        .with_context(|| format!("Invalid listen address {:?}", args.listen))?;
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("Failed to bind {}", addr))?;
    info!(address = %addr, "Listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("Server error")
}
