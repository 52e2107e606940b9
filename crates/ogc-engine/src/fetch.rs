//! The provider boundary: fetch planning, cancellation and deadlines.

use std::future::Future;

use chrono::{DateTime, Utc};
use ogc_common::{
    CoordinateGrid, Coverage, CrsTransform, FetchRequest, Layer, OgcError, OgcResult,
    ProviderError,
};
use tracing::{debug, warn};

use crate::context::RequestContext;

/// Describe what `layer` must supply for `target`.
///
/// Fails with `NoOverlap` when `target` misses the layer footprint.
pub(crate) fn plan_fetch(
    target: &CoordinateGrid,
    layer: &Layer,
    time: Option<DateTime<Utc>>,
    elevation: Option<f64>,
    transform: &dyn CrsTransform,
) -> OgcResult<FetchRequest> {
    let native = layer.grid();
    let overlap = target.intersect(native, transform)?;
    Ok(FetchRequest {
        target: target.clone(),
        window: overlap.pixel_window(native),
        ratio: overlap.resample_ratio(target, native),
        overlap,
        time,
        elevation,
    })
}

/// Fetch from the layer's provider, logging the cause of any failure.
pub(crate) async fn fetch_layer(layer: &Layer, request: &FetchRequest) -> OgcResult<Coverage> {
    let result = layer.fetch(request).await;
    if let Err(OgcError::DataUnavailable { layer, source }) = &result {
        match source {
            ProviderError::NoData(reason) => {
                debug!(layer = %layer, reason = %reason, "Provider has no data")
            }
            ProviderError::Backend(cause) => {
                warn!(layer = %layer, error = %cause, "Provider fetch failed")
            }
        }
    }
    result
}

/// Run `work` unless the context is cancelled or its deadline passes first.
///
/// Losing the race drops `work`, and with it any in-flight provider future.
pub(crate) async fn guarded<T, F>(ctx: &RequestContext, work: F) -> OgcResult<T>
where
    F: Future<Output = OgcResult<T>>,
{
    let deadline = async {
        match ctx.deadline {
            Some(at) => tokio::time::sleep_until(at).await,
            None => std::future::pending().await,
        }
    };

    tokio::select! {
        biased;
        _ = ctx.cancel.cancelled() => Err(OgcError::Cancelled),
        _ = deadline => Err(OgcError::Timeout),
        result = work => result,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[tokio::test]
    async fn test_guarded_passes_result_through() {
        let ctx = RequestContext::new();
        let value = guarded(&ctx, async { Ok(7) }).await.unwrap();
        assert_eq!(value, 7);
    }

    #[tokio::test]
    async fn test_guarded_prefers_cancellation() {
        let ctx = RequestContext::new();
        ctx.cancel.cancel();
        let err = guarded(&ctx, async { Ok(7) }).await.unwrap_err();
        assert!(matches!(err, OgcError::Cancelled));
    }

    #[tokio::test(start_paused = true)]
    async fn test_guarded_times_out() {
        let ctx = RequestContext::new().with_timeout(Duration::from_secs(5));
        let err = guarded(&ctx, std::future::pending::<OgcResult<()>>())
            .await
            .unwrap_err();
        assert!(matches!(err, OgcError::Timeout));
    }
}
