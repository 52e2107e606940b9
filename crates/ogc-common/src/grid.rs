//! Coordinate grids: the footprint and cell layout of a layer or a request.
//!
//! Cells are addressed by `(col, row)` with row 0 at the north edge, which
//! matches image scanline order.

use serde::Serialize;

use crate::bbox::BboxParseError;
use crate::crs::{Crs, CrsTransform, TransformError};
use crate::BoundingBox;

/// Tolerance used when snapping footprint edges to cell boundaries.
const EDGE_EPSILON: f64 = 1e-9;

/// A regular grid of `width` × `height` cells covering `bbox` in `crs`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CoordinateGrid {
    crs: Crs,
    bbox: BoundingBox,
    width: usize,
    height: usize,
}

/// Integer cell window into a grid.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct PixelWindow {
    pub col_off: usize,
    pub row_off: usize,
    pub cols: usize,
    pub rows: usize,
}

/// Ratio of requested cell size to native cell size (>1 means downsampling).
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct ResampleRatio {
    pub x: f64,
    pub y: f64,
}

/// Overlap between a request grid and a layer's native grid.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GridOverlap {
    /// The layer's native CRS.
    pub crs: Crs,
    /// Intersection of the request and the layer, in the layer CRS.
    pub footprint: BoundingBox,
    /// The whole request bbox transformed into the layer CRS.
    pub request_native: BoundingBox,
}

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum GridError {
    #[error("Grid dimensions must be positive, got {width}x{height}")]
    InvalidSize { width: usize, height: usize },

    #[error("Grid resolution must be positive, got {resx}x{resy}")]
    InvalidResolution { resx: f64, resy: f64 },

    #[error(transparent)]
    InvalidBbox(#[from] BboxParseError),

    #[error("Requested extent does not overlap the layer")]
    NoOverlap,

    #[error(transparent)]
    Transform(#[from] TransformError),
}

impl CoordinateGrid {
    /// Create a grid, validating cell counts and bbox ordering.
    pub fn new(crs: Crs, bbox: BoundingBox, width: usize, height: usize) -> Result<Self, GridError> {
        if width == 0 || height == 0 {
            return Err(GridError::InvalidSize { width, height });
        }
        bbox.validate()?;
        Ok(Self {
            crs,
            bbox,
            width,
            height,
        })
    }

    /// Create a grid from a cell size instead of cell counts.
    ///
    /// Counts are rounded up so the grid covers the whole bbox.
    pub fn from_resolution(
        crs: Crs,
        bbox: BoundingBox,
        resx: f64,
        resy: f64,
    ) -> Result<Self, GridError> {
        if !(resx > 0.0 && resy > 0.0) || !resx.is_finite() || !resy.is_finite() {
            return Err(GridError::InvalidResolution { resx, resy });
        }
        bbox.validate()?;
        let width = cells_for_extent(bbox.width(), resx);
        let height = cells_for_extent(bbox.height(), resy);
        Self::new(crs, bbox, width, height)
    }

    pub fn crs(&self) -> &Crs {
        &self.crs
    }

    pub fn bbox(&self) -> &BoundingBox {
        &self.bbox
    }

    pub fn width(&self) -> usize {
        self.width
    }

    pub fn height(&self) -> usize {
        self.height
    }

    /// Total number of cells.
    pub fn cell_count(&self) -> usize {
        self.width * self.height
    }

    /// Cell size `(dx, dy)` in CRS units.
    pub fn resolution(&self) -> (f64, f64) {
        (
            self.bbox.width() / self.width as f64,
            self.bbox.height() / self.height as f64,
        )
    }

    /// Same footprint, different CRS label. Used when the bbox has already
    /// been transformed by the caller.
    pub fn with_crs(&self, crs: Crs) -> Self {
        Self {
            crs,
            ..self.clone()
        }
    }

    /// Center of the cell at `(col, row)`.
    pub fn cell_center(&self, col: usize, row: usize) -> (f64, f64) {
        let (dx, dy) = self.resolution();
        (
            self.bbox.min_x + (col as f64 + 0.5) * dx,
            self.bbox.max_y - (row as f64 + 0.5) * dy,
        )
    }

    /// Footprint of the cell at `(col, row)`.
    pub fn cell_bbox(&self, col: usize, row: usize) -> BoundingBox {
        let (dx, dy) = self.resolution();
        let min_x = self.bbox.min_x + col as f64 * dx;
        let max_y = self.bbox.max_y - row as f64 * dy;
        BoundingBox::new(min_x, max_y - dy, min_x + dx, max_y)
    }

    /// A 1x1 grid over a single cell.
    pub fn cell_grid(&self, col: usize, row: usize) -> Result<CoordinateGrid, GridError> {
        CoordinateGrid::new(self.crs.clone(), self.cell_bbox(col, row), 1, 1)
    }

    /// Intersect this (request) grid with a layer's native grid.
    ///
    /// The request bbox is transformed into the layer CRS first. An empty
    /// or zero-area intersection is `NoOverlap`.
    pub fn intersect(
        &self,
        layer: &CoordinateGrid,
        transform: &dyn CrsTransform,
    ) -> Result<GridOverlap, GridError> {
        let request_native = transform.transform_bbox(&self.bbox, &self.crs, &layer.crs)?;

        let footprint = request_native
            .intersection(&layer.bbox)
            .filter(BoundingBox::has_area)
            .ok_or(GridError::NoOverlap)?;

        Ok(GridOverlap {
            crs: layer.crs.clone(),
            footprint,
            request_native,
        })
    }

    /// Integer row/col window of the layer grid covered by this request.
    pub fn to_pixel_window(
        &self,
        layer: &CoordinateGrid,
        transform: &dyn CrsTransform,
    ) -> Result<PixelWindow, GridError> {
        Ok(self.intersect(layer, transform)?.pixel_window(layer))
    }
}

impl GridOverlap {
    /// Window of `layer` cells touched by the footprint, at least one cell.
    pub fn pixel_window(&self, layer: &CoordinateGrid) -> PixelWindow {
        let (dx, dy) = layer.resolution();
        let lb = layer.bbox();

        let col_start = snap_floor((self.footprint.min_x - lb.min_x) / dx, layer.width);
        let col_end = snap_ceil((self.footprint.max_x - lb.min_x) / dx, layer.width);
        let row_start = snap_floor((lb.max_y - self.footprint.max_y) / dy, layer.height);
        let row_end = snap_ceil((lb.max_y - self.footprint.min_y) / dy, layer.height);

        let col_off = col_start.min(layer.width - 1);
        let row_off = row_start.min(layer.height - 1);
        PixelWindow {
            col_off,
            row_off,
            cols: col_end.saturating_sub(col_off).max(1),
            rows: row_end.saturating_sub(row_off).max(1),
        }
    }

    /// Requested cell size over native cell size, in layer CRS units.
    pub fn resample_ratio(&self, request: &CoordinateGrid, layer: &CoordinateGrid) -> ResampleRatio {
        let (native_dx, native_dy) = layer.resolution();
        let target_dx = self.request_native.width() / request.width() as f64;
        let target_dy = self.request_native.height() / request.height() as f64;
        ResampleRatio {
            x: target_dx / native_dx,
            y: target_dy / native_dy,
        }
    }
}

/// Number of cells of size `res` needed to cover `extent`.
pub fn cells_for_extent(extent: f64, res: f64) -> usize {
    let cells = (extent / res - EDGE_EPSILON).ceil();
    if cells < 1.0 {
        1
    } else {
        cells as usize
    }
}

/// Cell counts covering `bbox` at `resx` by `resy`, rounded up.
pub fn cells_for_resolution(bbox: &BoundingBox, resx: f64, resy: f64) -> (usize, usize) {
    (
        cells_for_extent(bbox.width(), resx),
        cells_for_extent(bbox.height(), resy),
    )
}

fn snap_floor(v: f64, limit: usize) -> usize {
    let v = (v + EDGE_EPSILON).floor();
    if v <= 0.0 {
        0
    } else {
        (v as usize).min(limit)
    }
}

fn snap_ceil(v: f64, limit: usize) -> usize {
    let v = (v - EDGE_EPSILON).ceil();
    if v <= 0.0 {
        0
    } else {
        (v as usize).min(limit)
    }
}
