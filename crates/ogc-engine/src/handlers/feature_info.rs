//! WMS GetFeatureInfo: sample the query pixel on every query layer.

use futures::future::try_join_all;
use ogc_common::{CoordinateGrid, CrsTransform, OgcError, OgcResult, ProviderError};
use ogc_common::time::format_iso8601;
use ogc_protocol::request::{GetFeatureInfo, LayerSelection};
use ogc_protocol::{FeatureInfo, FeatureInfoResponse};

use crate::context::RequestContext;
use crate::engine::OgcEngine;
use crate::fetch::{fetch_layer, guarded, plan_fetch};
use crate::response::OgcResponse;
use crate::stage::Stage;

pub(crate) async fn get_feature_info(
    engine: &OgcEngine,
    req: &GetFeatureInfo,
    ctx: &RequestContext,
    stage: &mut Stage,
) -> OgcResult<OgcResponse> {
    let cell = req.grid.cell_grid(req.i, req.j)?;
    let (x, y) = req.grid.cell_center(req.i, req.j);
    let transform = engine.transform.as_ref();

    // a coverage has one feature per layer, so feature_count never truncates
    let values = guarded(
        ctx,
        try_join_all(
            req.query_layers
                .iter()
                .map(|selection| sample(selection, &cell, transform)),
        ),
    )
    .await?;
    *stage = Stage::Resolved;

    let crs = req.grid.crs().to_string();
    let features = req
        .query_layers
        .iter()
        .zip(values)
        .map(|(selection, value)| {
            let layer = &selection.layer;
            FeatureInfo {
                layer: layer.name().to_string(),
                title: layer.title().to_string(),
                value,
                units: layer.value_domain().and_then(|d| d.units.clone()),
                x,
                y,
                crs: crs.clone(),
                time: selection.time.as_ref().map(format_iso8601),
                elevation: selection.elevation,
            }
        })
        .collect();

    let body = FeatureInfoResponse::new(features).render(req.info_format);
    *stage = Stage::Rendered;
    Ok(OgcResponse::ok(req.info_format.to_mime(), body))
}

/// Value of the single cell `cell`, or `None` when the layer has nothing
/// there.
async fn sample(
    selection: &LayerSelection,
    cell: &CoordinateGrid,
    transform: &dyn CrsTransform,
) -> OgcResult<Option<f64>> {
    let layer = &selection.layer;
    let request = match plan_fetch(cell, layer, selection.time, selection.elevation, transform) {
        Ok(request) => request,
        Err(OgcError::NoOverlap) => return Ok(None),
        Err(err) => return Err(err),
    };

    match fetch_layer(layer, &request).await {
        Ok(coverage) => Ok(coverage
            .get(0, 0)
            .filter(|v| v.is_finite())
            .map(f64::from)),
        Err(OgcError::DataUnavailable {
            source: ProviderError::NoData(_),
            ..
        }) => Ok(None),
        Err(err) => Err(err),
    }
}
