//! Cancellation, deadlines and provider failures.

mod common;

use std::sync::Arc;
use std::time::Duration;

use common::*;
use ogc_engine::RequestContext;
use test_utils::{FailingProvider, HangingProvider};

// ============================================================================
// Cancellation and deadlines
// ============================================================================

#[tokio::test]
async fn test_cancel_aborts_hanging_fetch() {
    let provider = HangingProvider::new();
    let engine = elevation_engine_with(provider.clone());
    let ctx = RequestContext::new();
    let params = get_map(&[]);

    let (response, _) = tokio::join!(engine.handle(&params, &ctx), async {
        provider.wait_started().await;
        ctx.cancel.cancel();
    });

    assert_eq!(response.status, 503);
    assert_eq!(response.exception_code, Some("NoApplicableCode"));
    assert_eq!(root_element(&response.body), "ServiceExceptionReport");
    assert!(provider.was_dropped());
}

#[tokio::test]
async fn test_cancelled_before_fetch() {
    let provider = HangingProvider::new();
    let engine = elevation_engine_with(provider.clone());
    let ctx = RequestContext::new();
    ctx.cancel.cancel();

    let response = engine.handle(&get_map(&[]), &ctx).await;
    assert_eq!(response.status, 503);
}

#[tokio::test]
async fn test_cancellation_does_not_affect_documents() {
    let engine = elevation_engine();
    let ctx = RequestContext::new();
    ctx.cancel.cancel();
    let response = engine
        .handle(&kvp(&[("service", "WMS"), ("request", "GetCapabilities")]), &ctx)
        .await;
    assert_eq!(response.status, 200);
}

#[tokio::test(start_paused = true)]
async fn test_deadline_times_out_hanging_fetch() {
    let provider = HangingProvider::new();
    let engine = elevation_engine_with(provider.clone());
    let ctx = RequestContext::new().with_timeout(Duration::from_secs(30));

    let response = engine.handle(&get_map(&[]), &ctx).await;
    assert_eq!(response.status, 504);
    assert_eq!(response.exception_code, Some("NoApplicableCode"));
    assert!(provider.was_dropped());
}

#[tokio::test]
async fn test_cancel_during_coverage_fetch() {
    let provider = HangingProvider::new();
    let engine = elevation_engine_with(provider.clone());
    let ctx = RequestContext::new();
    let params = kvp(&[
        ("service", "WCS"),
        ("version", "2.0.1"),
        ("request", "GetCoverage"),
        ("coverageid", "elevation"),
    ]);

    let (response, _) = tokio::join!(engine.handle(&params, &ctx), async {
        provider.wait_started().await;
        ctx.cancel.cancel();
    });
    assert_eq!(response.status, 503);
    assert_eq!(root_element(&response.body), "ows:ExceptionReport");
    assert!(provider.was_dropped());
}

// ============================================================================
// Provider failures
// ============================================================================

#[tokio::test]
async fn test_provider_failure_hides_cause() {
    let engine = elevation_engine_with(Arc::new(FailingProvider::new(
        "connection refused to 10.0.0.7:9000",
    )));
    let response = engine.handle(&get_map(&[]), &RequestContext::new()).await;

    assert_eq!(response.status, 404);
    assert_eq!(response.exception_code, Some("NoApplicableCode"));
    let body = response.text();
    assert!(body.contains("elevation"));
    assert!(!body.contains("10.0.0.7"));
    assert!(!body.contains("connection refused"));
}

#[tokio::test]
async fn test_provider_failure_in_feature_info() {
    let engine = elevation_engine_with(Arc::new(FailingProvider::new("disk on fire")));
    let params = get_map(&[
        ("request", "GetFeatureInfo"),
        ("query_layers", "elevation"),
        ("info_format", "text/plain"),
        ("i", "10"),
        ("j", "10"),
    ]);
    let response = engine.handle(&params, &RequestContext::new()).await;
    assert!(response.is_exception());
    assert!(!response.text().contains("disk on fire"));
}

// ============================================================================
// Request-level failures
// ============================================================================

#[tokio::test]
async fn test_unknown_service_reports_in_wms_130() {
    let engine = elevation_engine();
    let response = call(&engine, &[("service", "WFS"), ("request", "GetCapabilities")]).await;
    assert_eq!(response.status, 400);
    assert_eq!(response.media_type, "text/xml");
    assert!(response.text().contains("exceptions_1_3_0.xsd"));
}

#[tokio::test]
async fn test_wcs_operation_on_wms() {
    let engine = elevation_engine();
    let response = call(
        &engine,
        &[("service", "WMS"), ("request", "GetCoverage"), ("version", "1.3.0")],
    )
    .await;
    assert_eq!(response.exception_code, Some("OperationNotSupported"));
}
