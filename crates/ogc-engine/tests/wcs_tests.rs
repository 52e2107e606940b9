//! End-to-end WCS requests through the engine.

mod common;

use std::sync::Arc;

use common::*;
use test_utils::ConstantProvider;

const TIFF_IMAGE_WIDTH: u16 = 256;
const TIFF_IMAGE_LENGTH: u16 = 257;

// ============================================================================
// GetCapabilities and DescribeCoverage
// ============================================================================

#[tokio::test]
async fn test_capabilities_list_coverages_in_order() {
    let engine = multi_layer_engine(Arc::new(ConstantProvider::new(1.0)));

    let v100 = call(
        &engine,
        &[("service", "WCS"), ("request", "GetCapabilities"), ("version", "1.0.0")],
    )
    .await;
    assert_eq!(root_element(&v100.body), "WCS_Capabilities");
    let names: Vec<String> = element_texts(&v100.body, "name")
        .into_iter()
        .filter(|n| n != "WCS")
        .collect();
    assert_eq!(names, vec!["elevation", "temperature", "bathymetry"]);

    let v201 = call(
        &engine,
        &[("service", "WCS"), ("request", "GetCapabilities"), ("acceptversions", "2.0.1")],
    )
    .await;
    assert_eq!(v201.media_type, "application/xml");
    assert_eq!(root_element(&v201.body), "wcs:Capabilities");
    assert_eq!(
        element_texts(&v201.body, "wcs:CoverageId"),
        vec!["elevation", "temperature", "bathymetry"]
    );
}

#[tokio::test]
async fn test_capabilities_are_byte_identical() {
    let engine = multi_layer_engine(Arc::new(ConstantProvider::new(1.0)));
    for version in ["1.0.0", "2.0.1"] {
        let request = [("service", "WCS"), ("request", "GetCapabilities"), ("version", version)];
        let first = call(&engine, &request).await;
        let second = call(&engine, &request).await;
        assert_eq!(first.body, second.body, "{}", version);
    }
}

#[tokio::test]
async fn test_accept_versions_negotiation() {
    let engine = elevation_engine();
    let response = call(
        &engine,
        &[("service", "WCS"), ("request", "GetCapabilities"), ("acceptversions", "3.0.0,1.0.0")],
    )
    .await;
    assert_eq!(root_element(&response.body), "WCS_Capabilities");
}

#[tokio::test]
async fn test_describe_coverage() {
    let engine = elevation_engine();
    let response = call(
        &engine,
        &[
            ("service", "WCS"),
            ("version", "2.0.1"),
            ("request", "DescribeCoverage"),
            ("coverageid", "elevation"),
        ],
    )
    .await;
    assert_eq!(response.status, 200);
    assert_eq!(root_element(&response.body), "wcs:CoverageDescriptions");
    assert_eq!(element_texts(&response.body, "wcs:CoverageId"), vec!["elevation"]);
}

#[tokio::test]
async fn test_describe_unknown_coverage() {
    let engine = elevation_engine();
    let response = call(
        &engine,
        &[
            ("service", "WCS"),
            ("version", "2.0.1"),
            ("request", "DescribeCoverage"),
            ("coverageid", "nope"),
        ],
    )
    .await;
    assert_eq!(response.status, 404);
    assert_eq!(response.exception_code, Some("NoSuchCoverage"));
    assert_eq!(root_element(&response.body), "ows:ExceptionReport");
}

// ============================================================================
// GetCoverage
// ============================================================================

#[tokio::test]
async fn test_get_coverage_201_tiff() {
    let engine = elevation_engine();
    let response = call(
        &engine,
        &[
            ("service", "WCS"),
            ("version", "2.0.1"),
            ("request", "GetCoverage"),
            ("coverageid", "elevation"),
            ("subset", "Long(0,10)"),
            ("scalesize", "x(40),y(30)"),
        ],
    )
    .await;
    assert_eq!(response.status, 200);
    assert_eq!(response.media_type, "image/tiff");
    assert_eq!(&response.body[..4], b"II*\0");
    assert_eq!(tiff_field(&response.body, TIFF_IMAGE_WIDTH), Some(40));
    assert_eq!(tiff_field(&response.body, TIFF_IMAGE_LENGTH), Some(30));
}

#[tokio::test]
async fn test_get_coverage_201_native_size() {
    let engine = elevation_engine();
    let response = call(
        &engine,
        &[
            ("service", "WCS"),
            ("version", "2.0.1"),
            ("request", "GetCoverage"),
            ("coverageid", "elevation"),
        ],
    )
    .await;
    assert_eq!(tiff_field(&response.body, TIFF_IMAGE_WIDTH), Some(100));
    assert_eq!(tiff_field(&response.body, TIFF_IMAGE_LENGTH), Some(100));
}

#[tokio::test]
async fn test_get_coverage_100_tiff() {
    let engine = elevation_engine();
    let response = call(
        &engine,
        &[
            ("service", "WCS"),
            ("version", "1.0.0"),
            ("request", "GetCoverage"),
            ("coverage", "elevation"),
            ("crs", "EPSG:4326"),
            ("bbox", "-5,-5,5,5"),
            ("width", "20"),
            ("height", "10"),
            ("format", "GeoTIFF"),
        ],
    )
    .await;
    assert_eq!(response.status, 200);
    assert_eq!(&response.body[..4], b"II*\0");
    assert_eq!(tiff_field(&response.body, TIFF_IMAGE_WIDTH), Some(20));
    assert_eq!(tiff_field(&response.body, TIFF_IMAGE_LENGTH), Some(10));
}

#[tokio::test]
async fn test_get_coverage_reprojected_output() {
    let engine = elevation_engine();
    let response = call(
        &engine,
        &[
            ("service", "WCS"),
            ("version", "2.0.1"),
            ("request", "GetCoverage"),
            ("coverageid", "elevation"),
            ("outputcrs", "http://www.opengis.net/def/crs/EPSG/0/3857"),
            ("scalesize", "x(16),y(16)"),
        ],
    )
    .await;
    assert_eq!(response.status, 200, "{}", response.text());
    assert_eq!(tiff_field(&response.body, TIFF_IMAGE_WIDTH), Some(16));
}

#[tokio::test]
async fn test_get_coverage_subset_outside_layer() {
    let engine = elevation_engine();
    let response = call(
        &engine,
        &[
            ("service", "WCS"),
            ("version", "2.0.1"),
            ("request", "GetCoverage"),
            ("coverageid", "elevation"),
            ("subset", "Long(20,30)"),
        ],
    )
    .await;
    assert_eq!(response.exception_code, Some("InvalidSubsetting"));
}

#[tokio::test]
async fn test_get_coverage_over_cell_budget() {
    let engine = elevation_engine();
    let response = call(
        &engine,
        &[
            ("service", "WCS"),
            ("version", "2.0.1"),
            ("request", "GetCoverage"),
            ("coverageid", "elevation"),
            ("scalesize", "x(5000),y(5000)"),
        ],
    )
    .await;
    assert!(response.is_exception());
    assert_eq!(response.status, 400);
}
