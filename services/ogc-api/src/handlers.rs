//! HTTP handlers.

use std::sync::Arc;

use axum::{
    extract::{Extension, OriginalUri, Query},
    http::{header, HeaderMap, StatusCode},
    response::{IntoResponse, Response},
};
use metrics_exporter_prometheus::PrometheusHandle;
use ogc_engine::{KvpParams, OgcResponse, RequestContext};
use tokio_util::sync::CancellationToken;
use tracing::instrument;

use crate::AppState;

// ============================================================================
// OGC KVP endpoint
// ============================================================================

/// GET /ogc, /wms, /wcs - every WMS and WCS operation.
///
/// The query string is passed through untouched; service and version
/// detection happen in the engine. Capabilities links point back at the
/// URL the client used when the request names its host.
#[instrument(skip(state, headers, pairs), fields(params = pairs.len()))]
pub async fn ogc_handler(
    Extension(state): Extension<Arc<AppState>>,
    OriginalUri(uri): OriginalUri,
    headers: HeaderMap,
    Query(pairs): Query<Vec<(String, String)>>,
) -> Response {
    let params = KvpParams::from_pairs(pairs);

    // Dropping this future (client gone) cancels the token.
    let token = CancellationToken::new();
    let _guard = token.clone().drop_guard();

    let mut ctx = RequestContext::with_cancel(token);
    if let Some(timeout) = state.request_timeout {
        ctx = ctx.with_timeout(timeout);
    }
    if let Some(base) = request_base_url(&headers, uri.path()) {
        ctx = ctx.with_base_url(base);
    }

    into_http(state.engine.handle(&params, &ctx).await)
}

/// `scheme://host/path` as seen by the client, honouring the
/// `X-Forwarded-Proto` and `X-Forwarded-Host` headers set by proxies.
pub fn request_base_url(headers: &HeaderMap, path: &str) -> Option<String> {
    let first_value = |name: &str| {
        headers
            .get(name)
            .and_then(|v| v.to_str().ok())
            // proxies append, the first entry is the client-facing one
            .and_then(|v| v.split(',').next())
            .map(str::trim)
            .filter(|v| !v.is_empty())
    };
    let host = first_value("x-forwarded-host").or_else(|| first_value(header::HOST.as_str()))?;
    let scheme = first_value("x-forwarded-proto").unwrap_or("http");
    Some(format!("{}://{}{}", scheme, host, path))
}

fn into_http(response: OgcResponse) -> Response {
    let status = StatusCode::from_u16(response.status).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
    (
        status,
        [(header::CONTENT_TYPE, response.media_type)],
        response.body,
    )
        .into_response()
}

// ============================================================================
// Health and metrics
// ============================================================================

/// Liveness check; the layer registry is immutable once serving starts.
pub async fn health_handler() -> impl IntoResponse {
    "OK"
}

/// Prometheus text exposition of the request counters and latency histograms.
pub async fn metrics_handler(Extension(handle): Extension<PrometheusHandle>) -> Response {
    (
        StatusCode::OK,
        [(header::CONTENT_TYPE, "text/plain; version=0.0.4")],
        handle.render(),
    )
        .into_response()
}
