//! WCS GetCoverage: resolve the output grid, fetch, write a float32 GeoTIFF.

use ogc_common::grid::cells_for_resolution;
use ogc_common::{BoundingBox, CoordinateGrid, Crs, CrsTransform, Layer, OgcResult};
use ogc_protocol::request::{GetCoverage, OutputSize};
use renderer::encode_geotiff;
use tracing::debug;

use crate::context::RequestContext;
use crate::engine::OgcEngine;
use crate::fetch::{fetch_layer, guarded, plan_fetch};
use crate::response::OgcResponse;
use crate::stage::Stage;

pub(crate) async fn get_coverage(
    engine: &OgcEngine,
    req: &GetCoverage,
    ctx: &RequestContext,
    stage: &mut Stage,
) -> OgcResult<OgcResponse> {
    let layer = &req.layer;
    let transform = engine.transform.as_ref();

    let target = output_grid(req, transform)?;
    engine.limits.check_coverage(target.width(), target.height())?;

    let request = plan_fetch(&target, layer, req.time, req.elevation, transform)?;
    let coverage = guarded(ctx, fetch_layer(layer, &request)).await?;
    *stage = Stage::Resolved;

    let body = encode_geotiff(&coverage, target.bbox(), target.crs())?;
    *stage = Stage::Rendered;

    debug!(
        coverage = layer.name(),
        width = target.width(),
        height = target.height(),
        crs = %target.crs(),
        "Coverage encoded"
    );
    Ok(OgcResponse::ok(req.format.media_type(), body))
}

/// The grid the coverage is delivered on: the subset (completed from the
/// layer extent) expressed in the output CRS, at the requested size.
fn output_grid(req: &GetCoverage, transform: &dyn CrsTransform) -> OgcResult<CoordinateGrid> {
    let native = req.layer.grid();

    let full = transform.transform_bbox(native.bbox(), native.crs(), &req.subset_crs)?;
    let subset = req.subset.resolve(&full);
    subset.validate()?;

    let bbox = transform.transform_bbox(&subset, &req.subset_crs, &req.output_crs)?;

    let (width, height) = match req.size {
        OutputSize::Cells { width, height } => (width, height),
        OutputSize::Resolution { x, y } => cells_for_resolution(&bbox, x, y),
        OutputSize::Native => native_size(&req.layer, &bbox, &req.output_crs, transform)?,
    };

    Ok(CoordinateGrid::new(req.output_crs.clone(), bbox, width, height)?)
}

/// Cell count that keeps the layer's native resolution over `bbox`.
fn native_size(
    layer: &Layer,
    bbox: &BoundingBox,
    crs: &Crs,
    transform: &dyn CrsTransform,
) -> OgcResult<(usize, usize)> {
    let native = layer.grid();
    let (dx, dy) = native.resolution();
    let in_native = transform.transform_bbox(bbox, crs, native.crs())?;
    Ok(cells_for_resolution(&in_native, dx, dy))
}
