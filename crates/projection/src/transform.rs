//! The transform facility handed to the protocol core.

use ogc_common::crs::{Crs, CrsTransform, TransformError};

use crate::mercator::{lonlat_to_mercator, mercator_to_lonlat};

/// Coordinate space a supported CRS lives in.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Space {
    /// Longitude/latitude degrees (EPSG:4326, EPSG:4269, EPSG:4258, CRS:84)
    Geographic,
    /// Spherical mercator meters (EPSG:3857, EPSG:900913)
    WebMercator,
}

fn space_of(crs: &Crs) -> Option<Space> {
    if crs.is_geographic() {
        Some(Space::Geographic)
    } else if crs.is_web_mercator() {
        Some(Space::WebMercator)
    } else {
        None
    }
}

/// Transforms between geographic CRSs and web mercator.
///
/// The geographic CRSs are treated as sharing a datum; the sub-meter
/// NAD83/ETRS89/WGS84 differences are ignored.
#[derive(Debug, Clone, Copy, Default)]
pub struct StandardTransform;

impl StandardTransform {
    pub fn new() -> Self {
        Self
    }
}

impl CrsTransform for StandardTransform {
    fn supports(&self, crs: &Crs) -> bool {
        space_of(crs).is_some()
    }

    fn transform_point(
        &self,
        x: f64,
        y: f64,
        from: &Crs,
        to: &Crs,
    ) -> Result<(f64, f64), TransformError> {
        let unsupported = || TransformError::Unsupported {
            from: from.clone(),
            to: to.clone(),
        };
        let source = space_of(from).ok_or_else(unsupported)?;
        let target = space_of(to).ok_or_else(unsupported)?;

        if !x.is_finite() || !y.is_finite() {
            return Err(TransformError::OutOfDomain {
                x,
                y,
                crs: from.clone(),
            });
        }

        match (source, target) {
            (Space::Geographic, Space::Geographic) | (Space::WebMercator, Space::WebMercator) => {
                Ok((x, y))
            }
            (Space::Geographic, Space::WebMercator) => {
                if y.abs() > 90.0 {
                    return Err(TransformError::OutOfDomain {
                        x,
                        y,
                        crs: from.clone(),
                    });
                }
                Ok(lonlat_to_mercator(x, y))
            }
            (Space::WebMercator, Space::Geographic) => Ok(mercator_to_lonlat(x, y)),
        }
    }
}
