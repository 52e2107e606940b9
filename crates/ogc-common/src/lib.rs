//! Common types shared across the OGC protocol crates.

pub mod bbox;
pub mod crs;
pub mod error;
pub mod grid;
pub mod layer;
pub mod provider;
pub mod registry;
pub mod style;
pub mod time;

pub use bbox::BoundingBox;
pub use crs::{AxisConvention, AxisOrder, Crs, CrsTransform};
pub use error::{ErrorKind, OgcError, OgcResult};
pub use grid::{CoordinateGrid, GridOverlap, PixelWindow, ResampleRatio};
pub use layer::{Layer, LayerBuilder, LayerDescription};
pub use provider::{Coverage, DataProvider, FetchRequest, ProviderError};
pub use registry::LayerRegistry;
pub use style::{Rgba, Style, StyleDefinition};
pub use time::{TimeExtent, TimeSpec};
