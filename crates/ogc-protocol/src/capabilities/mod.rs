//! GetCapabilities documents.
//!
//! Layers are described once through [`Layer::describe`] and then written
//! in registry order, so an unchanged registry always produces the same
//! bytes.
//!
//! [`Layer::describe`]: ogc_common::Layer::describe

pub(crate) mod wcs;
mod wms;

use ogc_common::{BoundingBox, CrsTransform, LayerDescription, LayerRegistry};

use crate::config::{RequestLimits, ServiceInfo};
use crate::version::ServiceVersion;

/// Build the capabilities document for `version`.
pub fn build_capabilities(
    registry: &LayerRegistry,
    service: &ServiceInfo,
    limits: &RequestLimits,
    version: ServiceVersion,
    transform: &dyn CrsTransform,
) -> String {
    let layers: Vec<LayerDescription> = registry.iter().map(|l| l.describe(transform)).collect();

    match version {
        ServiceVersion::Wms111 | ServiceVersion::Wms130 => {
            wms::build(&layers, service, limits, version)
        }
        ServiceVersion::Wcs100 => wcs::build_100(&layers, service),
        ServiceVersion::Wcs201 => wcs::build_201(&layers, service),
    }
}

/// CRS:84 footprint, or the whole world when the layer CRS cannot reach it.
pub(crate) fn lon_lat_envelope(layer: &LayerDescription) -> BoundingBox {
    layer
        .geographic_bbox
        .unwrap_or(BoundingBox::new(-180.0, -90.0, 180.0, 90.0))
}
