//! Coordinate reference system transformations.
//!
//! Implements the projections the server advertises from scratch, without
//! external dependencies.

pub mod mercator;
pub mod transform;

pub use transform::StandardTransform;
