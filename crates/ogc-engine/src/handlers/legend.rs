//! WMS GetLegendGraphic.

use ogc_common::OgcResult;
use ogc_protocol::request::{GetLegendGraphic, ImageFormat};
use renderer::{create_png_auto, encode_jpeg, render_legend};

use crate::engine::OgcEngine;
use crate::response::OgcResponse;

const WHITE: [u8; 4] = [255, 255, 255, 255];

pub(crate) fn get_legend_graphic(
    engine: &OgcEngine,
    req: &GetLegendGraphic,
) -> OgcResult<OgcResponse> {
    let width = req.width.unwrap_or(engine.service.legend_width);
    let height = req.height.unwrap_or(engine.service.legend_height);

    let pixels = render_legend(&req.style, width, height);
    let body = match req.format {
        ImageFormat::Png => create_png_auto(&pixels, width, height)?,
        ImageFormat::Jpeg => encode_jpeg(&pixels, width, height, WHITE)?,
    };
    Ok(OgcResponse::ok(req.format.media_type(), body))
}
