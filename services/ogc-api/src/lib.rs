//! HTTP binding for the OGC engine.
//!
//! Serves WMS and WCS key-value-pair requests from a YAML-configured set of
//! layers. The binary in `main.rs` wires this up with logging, metrics and
//! a tokio runtime.

pub mod config;
pub mod handlers;
pub mod provider;

use std::sync::Arc;
use std::time::Duration;

use axum::{extract::Extension, routing::get, Router};
use metrics_exporter_prometheus::PrometheusHandle;
use ogc_engine::OgcEngine;
use tower_http::{compression::CompressionLayer, cors::CorsLayer, trace::TraceLayer};

pub use config::ServerConfig;

/// State shared by every request handler.
pub struct AppState {
    pub engine: OgcEngine,
    /// Per-request deadline; `None` waits for providers indefinitely
    pub request_timeout: Option<Duration>,
}

impl AppState {
    pub fn new(engine: OgcEngine, request_timeout: Option<Duration>) -> Self {
        Self {
            engine,
            request_timeout,
        }
    }
}

/// KVP requests are accepted on `/ogc` and on the per-service aliases
/// `/wms` and `/wcs`; all three dispatch on the `SERVICE` parameter.
pub fn build_router(state: Arc<AppState>, prometheus_handle: PrometheusHandle) -> Router {
    let kvp = ["/ogc", "/wms", "/wcs"]
        .into_iter()
        .fold(Router::new(), |router, path| {
            router.route(path, get(handlers::ogc_handler))
        });

    kvp.route("/health", get(handlers::health_handler))
        .route("/metrics", get(handlers::metrics_handler))
        .layer(Extension(state))
        .layer(Extension(prometheus_handle))
        .layer(TraceLayer::new_for_http())
        .layer(CompressionLayer::new())
        .layer(CorsLayer::permissive())
}
