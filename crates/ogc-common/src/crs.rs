//! Coordinate Reference System identifiers and the transform contract.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::BoundingBox;

/// Half the circumference of the web mercator sphere, in meters.
pub const WEB_MERCATOR_EXTENT: f64 = 20037508.342789244;

/// Number of sample points taken along each bbox edge when reprojecting.
const EDGE_SAMPLES: usize = 21;

/// Naming authority of a CRS code.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Authority {
    Epsg,
    /// OGC `CRS:` namespace (only `CRS:84` is recognised).
    Ogc,
}

/// An `authority:code` CRS identifier such as `EPSG:4326` or `CRS:84`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Crs {
    authority: Authority,
    code: u32,
}

/// Axis order for coordinate interpretation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AxisOrder {
    /// X (longitude/easting), Y (latitude/northing)
    XY,
    /// Y (latitude/northing), X (longitude/easting)
    YX,
}

/// Which axis-order convention a protocol version follows.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AxisConvention {
    /// Always x/y (WMS 1.1.1, WCS 1.0.0).
    Traditional,
    /// The order declared by the CRS authority (WMS 1.3.0, WCS 2.0.1).
    Authority,
}

impl Crs {
    pub const fn epsg(code: u32) -> Self {
        Self {
            authority: Authority::Epsg,
            code,
        }
    }

    pub const fn crs84() -> Self {
        Self {
            authority: Authority::Ogc,
            code: 84,
        }
    }

    pub fn authority(&self) -> Authority {
        self.authority
    }

    pub fn code(&self) -> u32 {
        self.code
    }

    /// Check if this is a geographic (lat/lon) CRS.
    pub fn is_geographic(&self) -> bool {
        match self.authority {
            Authority::Ogc => true,
            Authority::Epsg => matches!(self.code, 4326 | 4269 | 4258),
        }
    }

    /// True for EPSG:3857 and its legacy alias EPSG:900913.
    pub fn is_web_mercator(&self) -> bool {
        self.authority == Authority::Epsg && matches!(self.code, 3857 | 900913)
    }

    /// Axis order under the given convention.
    ///
    /// EPSG geographic CRSs are lat/lon when the authority order is
    /// honoured; `CRS:84` and projected CRSs are always x/y.
    pub fn axis_order(&self, convention: AxisConvention) -> AxisOrder {
        match convention {
            AxisConvention::Traditional => AxisOrder::XY,
            AxisConvention::Authority => {
                if self.authority == Authority::Epsg && self.is_geographic() {
                    AxisOrder::YX
                } else {
                    AxisOrder::XY
                }
            }
        }
    }

    /// Two identifiers that name the same coordinate space (axis order aside).
    pub fn is_equivalent(&self, other: &Crs) -> bool {
        if self == other {
            return true;
        }
        let wgs84 = |c: &Crs| *c == Crs::epsg(4326) || *c == Crs::crs84();
        (wgs84(self) && wgs84(other)) || (self.is_web_mercator() && other.is_web_mercator())
    }

    /// Valid coordinate domain, when known.
    pub fn valid_bounds(&self) -> Option<BoundingBox> {
        if self.is_geographic() {
            Some(BoundingBox::new(-180.0, -90.0, 180.0, 90.0))
        } else if self.is_web_mercator() {
            Some(BoundingBox::new(
                -WEB_MERCATOR_EXTENT,
                -WEB_MERCATOR_EXTENT,
                WEB_MERCATOR_EXTENT,
                WEB_MERCATOR_EXTENT,
            ))
        } else {
            None
        }
    }

    /// OGC URN form, e.g. `urn:ogc:def:crs:EPSG::4326`.
    pub fn urn(&self) -> String {
        match self.authority {
            Authority::Epsg => format!("urn:ogc:def:crs:EPSG::{}", self.code),
            Authority::Ogc => "urn:ogc:def:crs:OGC:1.3:CRS84".to_string(),
        }
    }

    /// OGC http URI form used by WCS 2.0.
    pub fn uri(&self) -> String {
        match self.authority {
            Authority::Epsg => format!("http://www.opengis.net/def/crs/EPSG/0/{}", self.code),
            Authority::Ogc => "http://www.opengis.net/def/crs/OGC/1.3/CRS84".to_string(),
        }
    }
}

impl FromStr for Crs {
    type Err = CrsParseError;

    /// Accepts `EPSG:n`, `CRS:84`, OGC URNs and `http://www.opengis.net/def/crs/...` URIs.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized = s.trim().to_ascii_uppercase();

        if matches!(
            normalized.as_str(),
            "CRS:84"
                | "CRS84"
                | "OGC:CRS84"
                | "URN:OGC:DEF:CRS:OGC:1.3:CRS84"
                | "URN:OGC:DEF:CRS:OGC::CRS84"
                | "HTTP://WWW.OPENGIS.NET/DEF/CRS/OGC/1.3/CRS84"
        ) {
            return Ok(Crs::crs84());
        }

        let code = if let Some(rest) = normalized.strip_prefix("EPSG:") {
            rest
        } else if let Some(rest) = normalized.strip_prefix("URN:OGC:DEF:CRS:EPSG:") {
            // urn:ogc:def:crs:EPSG:{version}:{code}, version may be empty
            rest.rsplit(':').next().unwrap_or_default()
        } else if let Some(rest) = normalized.strip_prefix("HTTP://WWW.OPENGIS.NET/DEF/CRS/EPSG/") {
            rest.rsplit('/').next().unwrap_or_default()
        } else {
            return Err(CrsParseError::UnrecognizedCrs(s.to_string()));
        };

        code.parse::<u32>()
            .ok()
            .filter(|c| *c > 0)
            .map(Crs::epsg)
            .ok_or_else(|| CrsParseError::UnrecognizedCrs(s.to_string()))
    }
}

impl fmt::Display for Crs {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.authority {
            Authority::Epsg => write!(f, "EPSG:{}", self.code),
            Authority::Ogc => write!(f, "CRS:{}", self.code),
        }
    }
}

impl TryFrom<String> for Crs {
    type Error = CrsParseError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<Crs> for String {
    fn from(crs: Crs) -> Self {
        crs.to_string()
    }
}

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum CrsParseError {
    #[error("Unrecognized CRS identifier: {0}")]
    UnrecognizedCrs(String),
}

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum TransformError {
    #[error("No transformation available from {from} to {to}")]
    Unsupported { from: Crs, to: Crs },

    #[error("Point ({x}, {y}) is outside the domain of {crs}")]
    OutOfDomain { x: f64, y: f64, crs: Crs },
}

/// Coordinate transformation between CRSs.
///
/// Implementations are trusted to be exact. Coordinates are always x/y.
pub trait CrsTransform: Send + Sync {
    /// Whether points can be transformed into and out of `crs`.
    fn supports(&self, crs: &Crs) -> bool;

    fn transform_point(&self, x: f64, y: f64, from: &Crs, to: &Crs)
        -> Result<(f64, f64), TransformError>;

    /// Transform a bbox by sampling points along its edges.
    ///
    /// The input is first clamped to the source CRS's valid bounds so that
    /// requests reaching past the poles still produce a usable footprint.
    fn transform_bbox(
        &self,
        bbox: &BoundingBox,
        from: &Crs,
        to: &Crs,
    ) -> Result<BoundingBox, TransformError> {
        if from.is_equivalent(to) {
            return Ok(*bbox);
        }

        let source = match from.valid_bounds() {
            Some(limits) => bbox.clamp_to(&limits),
            None => *bbox,
        };

        let mut out: Option<BoundingBox> = None;
        let mut last_err = None;
        let steps = (EDGE_SAMPLES - 1) as f64;
        for i in 0..EDGE_SAMPLES {
            let t = i as f64 / steps;
            let x = source.min_x + source.width() * t;
            let y = source.min_y + source.height() * t;
            let samples = [
                (x, source.min_y),
                (x, source.max_y),
                (source.min_x, y),
                (source.max_x, y),
            ];
            for (px, py) in samples {
                match self.transform_point(px, py, from, to) {
                    Ok((tx, ty)) => {
                        let point = BoundingBox::new(tx, ty, tx, ty);
                        out = Some(out.map_or(point, |b| b.union(&point)));
                    }
                    Err(e @ TransformError::Unsupported { .. }) => return Err(e),
                    Err(e) => last_err = Some(e),
                }
            }
        }

        match (out, last_err) {
            (Some(b), _) => Ok(b),
            (None, Some(e)) => Err(e),
            (None, None) => Err(TransformError::Unsupported {
                from: from.clone(),
                to: to.clone(),
            }),
        }
    }
}
