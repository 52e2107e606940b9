//! WMS GetMap: overlap, fetch, style, composite, encode.

use futures::future::try_join_all;
use ogc_common::style::TRANSPARENT;
use ogc_common::{FetchRequest, OgcError, OgcResult};
use ogc_protocol::request::{GetMap, ImageFormat, LayerSelection};
use renderer::{apply_style, blend_over, create_png_auto, encode_jpeg, fill};
use tracing::debug;

use crate::context::RequestContext;
use crate::engine::OgcEngine;
use crate::fetch::{fetch_layer, guarded, plan_fetch};
use crate::response::OgcResponse;
use crate::stage::Stage;

pub(crate) async fn get_map(
    engine: &OgcEngine,
    req: &GetMap,
    ctx: &RequestContext,
    stage: &mut Stage,
) -> OgcResult<OgcResponse> {
    let grid = &req.grid;

    let mut plans: Vec<(&LayerSelection, FetchRequest)> = Vec::with_capacity(req.layers.len());
    for selection in &req.layers {
        match plan_fetch(
            grid,
            &selection.layer,
            selection.time,
            selection.elevation,
            engine.transform.as_ref(),
        ) {
            Ok(request) => plans.push((selection, request)),
            Err(OgcError::NoOverlap) => {
                debug!(layer = selection.layer.name(), "Layer outside the map extent, skipped")
            }
            Err(err) => return Err(err),
        }
    }
    if plans.is_empty() {
        return Err(OgcError::NoOverlap);
    }

    let coverages = guarded(
        ctx,
        try_join_all(
            plans
                .iter()
                .map(|(selection, request)| fetch_layer(&selection.layer, request)),
        ),
    )
    .await?;
    *stage = Stage::Resolved;

    let (width, height) = (grid.width(), grid.height());
    let background = if req.transparent {
        TRANSPARENT
    } else {
        req.background
    };

    // first layer at the bottom
    let mut canvas = fill(width, height, background);
    for ((selection, _), coverage) in plans.iter().zip(&coverages) {
        let styled = apply_style(&selection.style, &coverage.values);
        blend_over(&mut canvas, &styled);
    }

    let body = match req.format {
        ImageFormat::Png => create_png_auto(&canvas, width, height)?,
        ImageFormat::Jpeg => encode_jpeg(&canvas, width, height, req.background)?,
    };
    *stage = Stage::Rendered;

    debug!(
        layers = coverages.len(),
        width,
        height,
        format = req.format.media_type(),
        "Map rendered"
    );
    Ok(OgcResponse::ok(req.format.media_type(), body))
}
