//! Bounding box types and operations.

use serde::{Deserialize, Serialize};

use crate::crs::AxisOrder;

/// A geographic or projected bounding box.
///
/// Coordinates are always held in x/y order (longitude/easting first),
/// whatever axis order the wire representation used.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BoundingBox {
    pub min_x: f64,
    pub min_y: f64,
    pub max_x: f64,
    pub max_y: f64,
}

impl BoundingBox {
    /// Create a new bounding box from corner coordinates.
    pub fn new(min_x: f64, min_y: f64, max_x: f64, max_y: f64) -> Self {
        Self {
            min_x,
            min_y,
            max_x,
            max_y,
        }
    }

    /// Parse a KVP BBOX value: "a,b,c,d".
    ///
    /// With `AxisOrder::YX` the value is read as "miny,minx,maxy,maxx" and
    /// normalised to x/y. The result is validated with [`BoundingBox::validate`].
    pub fn from_kvp(s: &str, order: AxisOrder) -> Result<Self, BboxParseError> {
        let parts: Vec<&str> = s.split(',').map(str::trim).collect();
        if parts.len() != 4 {
            return Err(BboxParseError::InvalidFormat(s.to_string()));
        }

        let mut values = [0.0f64; 4];
        for (slot, part) in values.iter_mut().zip(&parts) {
            let v: f64 = part
                .parse()
                .map_err(|_| BboxParseError::InvalidNumber(part.to_string()))?;
            if !v.is_finite() {
                return Err(BboxParseError::InvalidNumber(part.to_string()));
            }
            *slot = v;
        }

        let bbox = match order {
            AxisOrder::XY => Self::new(values[0], values[1], values[2], values[3]),
            AxisOrder::YX => Self::new(values[1], values[0], values[3], values[2]),
        };
        bbox.validate()?;
        Ok(bbox)
    }

    /// Check min < max on both axes.
    pub fn validate(&self) -> Result<(), BboxParseError> {
        if self.min_x >= self.max_x || self.min_y >= self.max_y {
            return Err(BboxParseError::Inverted(*self));
        }
        Ok(())
    }

    /// Extent along x, in CRS units.
    pub fn width(&self) -> f64 {
        self.max_x - self.min_x
    }

    /// Extent along y, in CRS units.
    pub fn height(&self) -> f64 {
        self.max_y - self.min_y
    }

    /// True when both axes have a positive extent.
    pub fn has_area(&self) -> bool {
        self.width() > 0.0 && self.height() > 0.0
    }

    /// True when the overlap with `other` has non-zero area.
    pub fn intersects(&self, other: &BoundingBox) -> bool {
        self.intersection(other).is_some()
    }

    /// Overlap of the two boxes, `None` unless it has area.
    ///
    /// Boxes that only touch along an edge do not intersect.
    pub fn intersection(&self, other: &BoundingBox) -> Option<BoundingBox> {
        let overlap = BoundingBox::new(
            self.min_x.max(other.min_x),
            self.min_y.max(other.min_y),
            self.max_x.min(other.max_x),
            self.max_y.min(other.max_y),
        );
        overlap.has_area().then_some(overlap)
    }

    /// Smallest box containing both.
    pub fn union(&self, other: &BoundingBox) -> BoundingBox {
        BoundingBox {
            min_x: self.min_x.min(other.min_x),
            min_y: self.min_y.min(other.min_y),
            max_x: self.max_x.max(other.max_x),
            max_y: self.max_y.max(other.max_y),
        }
    }

    /// Clamp every edge into `limits`.
    pub fn clamp_to(&self, limits: &BoundingBox) -> BoundingBox {
        BoundingBox {
            min_x: self.min_x.clamp(limits.min_x, limits.max_x),
            min_y: self.min_y.clamp(limits.min_y, limits.max_y),
            max_x: self.max_x.clamp(limits.min_x, limits.max_x),
            max_y: self.max_y.clamp(limits.min_y, limits.max_y),
        }
    }

    /// Inclusive on every edge.
    pub fn contains_point(&self, x: f64, y: f64) -> bool {
        (self.min_x..=self.max_x).contains(&x) && (self.min_y..=self.max_y).contains(&y)
    }

    /// Corner values in the requested axis order, as `[a, b, c, d]`.
    pub fn ordered(&self, order: AxisOrder) -> [f64; 4] {
        match order {
            AxisOrder::XY => [self.min_x, self.min_y, self.max_x, self.max_y],
            AxisOrder::YX => [self.min_y, self.min_x, self.max_y, self.max_x],
        }
    }
}

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum BboxParseError {
    #[error("Invalid BBOX format: {0}. Expected 'minx,miny,maxx,maxy'")]
    InvalidFormat(String),

    #[error("Invalid number in BBOX: {0}")]
    InvalidNumber(String),

    #[error("BBOX minimum must be less than maximum on both axes: {0:?}")]
    Inverted(BoundingBox),
}
