//! Common layer and registry fixtures.
//!
//! The `elevation` layer is the reference scenario: EPSG:4326, bbox
//! `[-10,-10,10,10]`, 100x100 cells, values 0..1000 m west to east.

use std::sync::Arc;

use chrono::{TimeZone, Utc};
use ogc_common::layer::{ElevationExtent, ElevationValues, ValueDomain};
use ogc_common::style::{Breakpoint, Interpolation};
use ogc_common::{
    BoundingBox, CoordinateGrid, Crs, CrsTransform, DataProvider, FetchRequest, Layer,
    LayerBuilder, LayerRegistry, Style, TimeExtent,
};
use projection::StandardTransform;

use crate::providers::GradientProvider;

/// Common bounding box definitions for testing.
pub mod bbox {
    /// Footprint of the `elevation` layer
    pub const ELEVATION: (f64, f64, f64, f64) = (-10.0, -10.0, 10.0, 10.0);

    /// Centre quarter of the `elevation` layer
    pub const ELEVATION_CENTER: (f64, f64, f64, f64) = (-5.0, -5.0, 5.0, 5.0);

    /// Wholly outside the `elevation` layer
    pub const OUTSIDE: (f64, f64, f64, f64) = (20.0, 20.0, 30.0, 30.0);

    /// Global bounding box (-180 to 180, -90 to 90)
    pub const GLOBAL: (f64, f64, f64, f64) = (-180.0, -90.0, 180.0, 90.0);
}

/// Hourly observation times for the `temperature` fixture.
pub const TEMPERATURE_TIMES: &str =
    "2024-01-01T00:00:00Z,2024-01-01T01:00:00Z,2024-01-01T02:00:00Z";

pub fn transform() -> Arc<dyn CrsTransform> {
    Arc::new(StandardTransform::new())
}

pub fn elevation_grid() -> CoordinateGrid {
    let (min_x, min_y, max_x, max_y) = bbox::ELEVATION;
    CoordinateGrid::new(
        Crs::epsg(4326),
        BoundingBox::new(min_x, min_y, max_x, max_y),
        100,
        100,
    )
    .expect("valid elevation grid")
}

/// Green-to-brown terrain ramp over 0..1000 m.
pub fn terrain_style() -> Style {
    Style::new(
        "terrain",
        vec![
            Breakpoint::new(0.0, [0, 128, 0, 255]),
            Breakpoint::new(500.0, [200, 180, 60, 255]),
            Breakpoint::new(1000.0, [120, 70, 20, 255]),
        ],
        Interpolation::Linear,
    )
    .expect("valid terrain style")
    .with_title("Terrain")
}

/// Three-band classification of the same range.
pub fn banded_style() -> Style {
    Style::new(
        "bands",
        vec![
            Breakpoint::new(0.0, [0, 0, 255, 255]),
            Breakpoint::new(333.0, [0, 255, 0, 255]),
            Breakpoint::new(666.0, [255, 0, 0, 255]),
        ],
        Interpolation::Step,
    )
    .expect("valid banded style")
    .with_title("Bands")
}

/// The `elevation` layer backed by `provider`.
pub fn elevation_layer(provider: Arc<dyn DataProvider>) -> Layer {
    LayerBuilder::new("elevation", elevation_grid(), provider)
        .title("Elevation")
        .abstract_text("Synthetic terrain height")
        .supported_crs([Crs::crs84(), Crs::epsg(3857)])
        .style(Arc::new(terrain_style()))
        .style(Arc::new(banded_style()))
        .value_domain(ValueDomain {
            min: 0.0,
            max: 1000.0,
            units: Some("m".to_string()),
        })
        .queryable(true)
        .build()
        .expect("valid elevation layer")
}

/// Registry with only the `elevation` layer, backed by `provider`.
pub fn elevation_registry_with(provider: Arc<dyn DataProvider>) -> LayerRegistry {
    let mut registry = LayerRegistry::new();
    registry
        .register(elevation_layer(provider))
        .expect("unique layer name");
    registry
}

/// Registry with only the `elevation` layer and a 0..1000 gradient.
pub fn elevation_registry() -> LayerRegistry {
    elevation_registry_with(Arc::new(GradientProvider::new(0.0, 1000.0)))
}

/// A time-enabled layer over Europe, not queryable, with no explicit styles.
pub fn temperature_layer(provider: Arc<dyn DataProvider>) -> Layer {
    let grid = CoordinateGrid::new(
        Crs::epsg(4326),
        BoundingBox::new(-15.0, 35.0, 45.0, 72.0),
        60,
        37,
    )
    .expect("valid temperature grid");
    LayerBuilder::new("temperature", grid, provider)
        .title("Air temperature")
        .supported_crs([Crs::epsg(3857)])
        .time(TimeExtent::parse(TEMPERATURE_TIMES).expect("valid time extent"))
        .value_domain(ValueDomain {
            min: -40.0,
            max: 40.0,
            units: Some("degC".to_string()),
        })
        .build()
        .expect("valid temperature layer")
}

/// An elevation-enabled layer in Web Mercator.
pub fn bathymetry_layer(provider: Arc<dyn DataProvider>) -> Layer {
    let grid = CoordinateGrid::new(
        Crs::epsg(3857),
        BoundingBox::new(-1_000_000.0, -1_000_000.0, 1_000_000.0, 1_000_000.0),
        50,
        50,
    )
    .expect("valid bathymetry grid");
    LayerBuilder::new("bathymetry", grid, provider)
        .title("Sea depth")
        .supported_crs([Crs::epsg(4326)])
        .elevation(ElevationExtent {
            values: ElevationValues::List(vec![0.0, 10.0, 50.0]),
            units: "m".to_string(),
            unit_symbol: Some("m".to_string()),
        })
        .value_domain(ValueDomain {
            min: -6000.0,
            max: 0.0,
            units: Some("m".to_string()),
        })
        .queryable(true)
        .build()
        .expect("valid bathymetry layer")
}

/// A layer with both a time and an elevation dimension.
pub fn ocean_temperature_layer(provider: Arc<dyn DataProvider>) -> Layer {
    let grid = CoordinateGrid::new(
        Crs::epsg(4326),
        BoundingBox::new(-30.0, -20.0, 30.0, 20.0),
        60,
        40,
    )
    .expect("valid ocean grid");
    LayerBuilder::new("ocean_temperature", grid, provider)
        .title("Ocean temperature")
        .time(TimeExtent::parse(TEMPERATURE_TIMES).expect("valid time extent"))
        .elevation(ElevationExtent {
            values: ElevationValues::List(vec![0.0, 100.0, 500.0]),
            units: "m".to_string(),
            unit_symbol: Some("m".to_string()),
        })
        .build()
        .expect("valid ocean temperature layer")
}

/// `elevation`, `temperature` and `bathymetry`, in that order, all backed by
/// `provider`.
pub fn multi_layer_registry(provider: Arc<dyn DataProvider>) -> LayerRegistry {
    let mut registry = LayerRegistry::new();
    for layer in [
        elevation_layer(Arc::clone(&provider)),
        temperature_layer(Arc::clone(&provider)),
        bathymetry_layer(provider),
    ] {
        registry.register(layer).expect("unique layer name");
    }
    registry
}

/// First time of [`TEMPERATURE_TIMES`].
pub fn first_temperature_time() -> chrono::DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0)
        .single()
        .expect("valid timestamp")
}

/// Fetch request for `target` against the `elevation` grid.
pub fn fetch_request(target: &CoordinateGrid) -> FetchRequest {
    let layer = elevation_grid();
    let transform = StandardTransform::new();
    let overlap = target
        .intersect(&layer, &transform)
        .expect("target overlaps the elevation grid");
    FetchRequest {
        target: target.clone(),
        window: overlap.pixel_window(&layer),
        ratio: overlap.resample_ratio(target, &layer),
        overlap,
        time: None,
        elevation: None,
    }
}
