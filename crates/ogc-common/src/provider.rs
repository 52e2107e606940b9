//! The data provider contract.
//!
//! The core never reads data itself. Each layer holds a [`DataProvider`]
//! that is asked for the values covering a target grid.

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::grid::{CoordinateGrid, GridOverlap, PixelWindow, ResampleRatio};

pub type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// Everything a provider needs to produce values for one layer.
#[derive(Debug, Clone)]
pub struct FetchRequest {
    /// Output grid in the request CRS. The returned coverage must match its size.
    pub target: CoordinateGrid,
    /// Overlap with the layer's native grid, in the layer CRS.
    pub overlap: GridOverlap,
    /// Native cells covered by the request.
    pub window: PixelWindow,
    pub ratio: ResampleRatio,
    pub time: Option<DateTime<Utc>>,
    pub elevation: Option<f64>,
}

/// Gridded values in row-major order, row 0 at the north edge.
///
/// `NaN` marks a cell with no data.
#[derive(Debug, Clone, PartialEq)]
pub struct Coverage {
    pub width: usize,
    pub height: usize,
    pub values: Vec<f32>,
}

impl Coverage {
    /// Wrap values, checking the length matches the dimensions.
    pub fn new(width: usize, height: usize, values: Vec<f32>) -> Result<Self, ProviderError> {
        if values.len() != width * height {
            return Err(ProviderError::backend(format!(
                "coverage has {} values, expected {}x{}",
                values.len(),
                width,
                height
            )));
        }
        Ok(Self {
            width,
            height,
            values,
        })
    }

    /// A coverage where every cell holds `value`.
    pub fn filled(width: usize, height: usize, value: f32) -> Self {
        Self {
            width,
            height,
            values: vec![value; width * height],
        }
    }

    pub fn get(&self, col: usize, row: usize) -> Option<f32> {
        if col >= self.width || row >= self.height {
            return None;
        }
        self.values.get(row * self.width + col).copied()
    }

    /// True when no cell holds data.
    pub fn is_empty(&self) -> bool {
        self.values.iter().all(|v| v.is_nan())
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ProviderError {
    /// The backend has nothing for this footprint/time/elevation.
    #[error("No data: {0}")]
    NoData(String),

    /// The backend failed.
    #[error("Backend failure: {0}")]
    Backend(#[source] BoxError),
}

impl ProviderError {
    pub fn backend(err: impl Into<BoxError>) -> Self {
        ProviderError::Backend(err.into())
    }
}

/// Source of coverage values for one or more layers.
#[async_trait]
pub trait DataProvider: Send + Sync {
    /// Produce values for `request.target`.
    ///
    /// Dropping the returned future must abandon the work.
    async fn fetch(&self, layer: &str, request: &FetchRequest) -> Result<Coverage, ProviderError>;
}
