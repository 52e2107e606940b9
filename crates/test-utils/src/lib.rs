//! Fixtures shared by the protocol, engine and HTTP test suites.
//!
//! [`fixtures`] builds layer registries around a 20x20 degree `elevation`
//! layer; [`providers`] holds the data providers behind them, including
//! ones that fail, hang until cancelled, or return only no-data cells.
//! Pull it in as a `[dev-dependencies]` path entry.

pub mod fixtures;
pub mod providers;

pub use fixtures::*;
pub use providers::*;

/// Asserts `|left - right| <= epsilon`, comparing as `f64`.
#[macro_export]
macro_rules! assert_approx_eq {
    ($left:expr, $right:expr, $epsilon:expr) => {{
        let (left, right, epsilon) = ($left as f64, $right as f64, $epsilon as f64);
        let diff = (left - right).abs();
        if diff.is_nan() || diff > epsilon {
            panic!(
                "assertion failed: {} and {} differ by {} (epsilon {})",
                left, right, diff, epsilon
            );
        }
    }};
}

/// Approximate equality of two bounding boxes, corner by corner.
///
/// ```ignore
/// assert_bbox_approx_eq!(grid.bbox(), BoundingBox::new(-5.0, -5.0, 5.0, 5.0), 1e-9);
/// ```
#[macro_export]
macro_rules! assert_bbox_approx_eq {
    ($left:expr, $right:expr, $epsilon:expr) => {{
        let left = $left;
        let right = $right;
        $crate::assert_approx_eq!(left.min_x, right.min_x, $epsilon);
        $crate::assert_approx_eq!(left.min_y, right.min_y, $epsilon);
        $crate::assert_approx_eq!(left.max_x, right.max_x, $epsilon);
        $crate::assert_approx_eq!(left.max_y, right.max_y, $epsilon);
    }};
}

#[cfg(test)]
mod tests {
    use ogc_common::BoundingBox;

    #[test]
    fn test_cell_centres_within_tolerance() {
        assert_approx_eq!(-9.75_f32, -9.75000001_f64, 1e-6);
        assert_approx_eq!(5.0, 5.0, 0.0);
    }

    #[test]
    #[should_panic(expected = "differ by")]
    fn test_half_cell_offset_is_caught() {
        assert_approx_eq!(0.25, 0.0, 0.01);
    }

    #[test]
    #[should_panic(expected = "differ by")]
    fn test_nan_never_matches() {
        assert_approx_eq!(f64::NAN, 0.0, 1.0);
    }

    #[test]
    fn test_bbox_corners_within_tolerance() {
        assert_bbox_approx_eq!(
            BoundingBox::new(-1.0000001, 0.0, 1.0, 2.0),
            BoundingBox::new(-1.0, 0.0, 1.0, 2.0),
            1e-6
        );
    }
}
