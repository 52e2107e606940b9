//! Synthetic data provider.
//!
//! Layers configured in YAML are backed by analytic fields evaluated at the
//! centre of every target cell. This is enough to serve real maps and
//! coverages without a storage backend.

use std::f64::consts::PI;
use std::sync::Arc;

use async_trait::async_trait;
use ogc_common::{
    BoundingBox, Coverage, CoordinateGrid, CrsTransform, DataProvider, FetchRequest,
    ProviderError,
};
use serde::Deserialize;
use tracing::trace;

/// Rows evaluated between yields to the runtime.
const ROWS_PER_YIELD: usize = 64;

/// Analytic field over a layer's native extent.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(tag = "pattern", rename_all = "snake_case")]
pub enum Pattern {
    /// Same value everywhere.
    Constant { value: f32 },
    /// West-to-east ramp from `low` to `high`.
    Gradient { low: f32, high: f32 },
    /// Concentric waves around the extent centre, drifting by a quarter
    /// turn per hour of the requested time.
    Ripple { amplitude: f32, wavelength: f64 },
}

impl Pattern {
    fn value_at(&self, x: f64, y: f64, extent: &BoundingBox, phase: f64) -> f32 {
        match *self {
            Pattern::Constant { value } => value,
            Pattern::Gradient { low, high } => {
                let t = ((x - extent.min_x) / extent.width()).clamp(0.0, 1.0) as f32;
                low + t * (high - low)
            }
            Pattern::Ripple {
                amplitude,
                wavelength,
            } => {
                let cx = extent.min_x + extent.width() / 2.0;
                let cy = extent.min_y + extent.height() / 2.0;
                let distance = ((x - cx).powi(2) + (y - cy).powi(2)).sqrt();
                amplitude * (2.0 * PI * distance / wavelength - phase).sin() as f32
            }
        }
    }
}

/// Evaluates a [`Pattern`] over one layer's native grid.
pub struct SyntheticProvider {
    pattern: Pattern,
    grid: CoordinateGrid,
    transform: Arc<dyn CrsTransform>,
}

impl SyntheticProvider {
    pub fn new(pattern: Pattern, grid: CoordinateGrid, transform: Arc<dyn CrsTransform>) -> Self {
        Self {
            pattern,
            grid,
            transform,
        }
    }
}

#[async_trait]
impl DataProvider for SyntheticProvider {
    async fn fetch(&self, layer: &str, request: &FetchRequest) -> Result<Coverage, ProviderError> {
        let target = &request.target;
        let native_crs = self.grid.crs();
        let extent = self.grid.bbox();
        let phase = request
            .time
            .map(|t| (t.timestamp() as f64 / 3600.0) * PI / 2.0)
            .unwrap_or(0.0);

        trace!(
            layer,
            width = target.width(),
            height = target.height(),
            "Evaluating synthetic field"
        );

        let mut values = Vec::with_capacity(target.cell_count());
        for row in 0..target.height() {
            if row > 0 && row % ROWS_PER_YIELD == 0 {
                tokio::task::yield_now().await;
            }
            for col in 0..target.width() {
                let (x, y) = target.cell_center(col, row);
                let value = match self
                    .transform
                    .transform_point(x, y, target.crs(), native_crs)
                {
                    Ok((nx, ny)) if extent.contains_point(nx, ny) => {
                        self.pattern.value_at(nx, ny, extent, phase)
                    }
                    _ => f32::NAN,
                };
                values.push(value);
            }
        }

        Coverage::new(target.width(), target.height(), values)
    }
}
