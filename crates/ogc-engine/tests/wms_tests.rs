//! End-to-end WMS requests through the engine.

mod common;

use std::sync::Arc;

use common::*;
use image::GenericImageView;
use ogc_engine::RequestContext;
use test_utils::{assert_approx_eq, ConstantProvider, NoDataProvider};

fn decode(body: &[u8]) -> image::DynamicImage {
    image::load_from_memory(body).expect("decodable image")
}

// ============================================================================
// GetCapabilities and version negotiation
// ============================================================================

#[tokio::test]
async fn test_capabilities_list_registry_layers_in_order() {
    let engine = multi_layer_engine(Arc::new(ConstantProvider::new(1.0)));
    for version in ["1.1.1", "1.3.0"] {
        let response = call(
            &engine,
            &[("service", "WMS"), ("request", "GetCapabilities"), ("version", version)],
        )
        .await;
        assert_eq!(response.status, 200);
        let names: Vec<String> = element_texts(&response.body, "Name")
            .into_iter()
            .filter(|n| ["elevation", "temperature", "bathymetry"].contains(&n.as_str()))
            .collect();
        assert_eq!(names, vec!["elevation", "temperature", "bathymetry"], "{}", version);
    }
}

#[tokio::test]
async fn test_capabilities_are_byte_identical() {
    let engine = multi_layer_engine(Arc::new(ConstantProvider::new(1.0)));
    let request = [("service", "WMS"), ("request", "GetCapabilities")];
    let first = call(&engine, &request).await;
    let second = call(&engine, &request).await;
    assert_eq!(first.body, second.body);
}

#[tokio::test]
async fn test_version_negotiation() {
    let engine = elevation_engine();
    let cases = [
        (Some("0.9"), "WMT_MS_Capabilities", "application/vnd.ogc.wms_xml"),
        (Some("1.1.1"), "WMT_MS_Capabilities", "application/vnd.ogc.wms_xml"),
        (Some("1.2.0"), "WMT_MS_Capabilities", "application/vnd.ogc.wms_xml"),
        (Some("1.3.0"), "WMS_Capabilities", "text/xml"),
        (Some("9.9"), "WMS_Capabilities", "text/xml"),
        (None, "WMS_Capabilities", "text/xml"),
    ];
    for (version, root, media_type) in cases {
        let mut pairs = vec![("service", "WMS"), ("request", "GetCapabilities")];
        if let Some(v) = version {
            pairs.push(("version", v));
        }
        let response = call(&engine, &pairs).await;
        assert_eq!(root_element(&response.body), root, "{:?}", version);
        assert_eq!(response.media_type, media_type, "{:?}", version);
    }
}

// ============================================================================
// GetMap
// ============================================================================

#[tokio::test]
async fn test_elevation_scenario_png() {
    let engine = elevation_engine();
    let response = engine.handle(&get_map(&[]), &RequestContext::new()).await;
    assert_eq!(response.status, 200);
    assert_eq!(response.media_type, "image/png");
    assert!(!response.is_exception());
    assert_eq!(&response.body[..8], b"\x89PNG\r\n\x1a\n");
    assert_eq!(decode(&response.body).dimensions(), (50, 50));
}

#[tokio::test]
async fn test_elevation_scenario_outside_is_no_overlap() {
    let engine = elevation_engine();
    let response = engine
        .handle(&get_map(&[("bbox", "20,20,30,30")]), &RequestContext::new())
        .await;
    assert_eq!(response.status, 400);
    assert_eq!(response.exception_code, Some("NoOverlap"));
    assert_eq!(response.media_type, "text/xml");
    assert_eq!(root_element(&response.body), "ServiceExceptionReport");
    assert!(response.text().contains("exceptions_1_3_0.xsd"));
}

#[tokio::test]
async fn test_native_grid_request_keeps_size() {
    let engine = elevation_engine();
    let params = get_map(&[("width", "100"), ("height", "100")]);
    let response = engine.handle(&params, &RequestContext::new()).await;
    assert_eq!(response.status, 200);
    assert_eq!(decode(&response.body).dimensions(), (100, 100));
}

#[tokio::test]
async fn test_outside_after_reprojection_is_no_overlap() {
    let engine = elevation_engine();
    // roughly 20..30 degrees east in Web Mercator
    let params = get_map(&[
        ("crs", "EPSG:3857"),
        ("bbox", "2226389,2273030,3339584,3503549"),
    ]);
    let response = engine.handle(&params, &RequestContext::new()).await;
    assert_eq!(response.exception_code, Some("NoOverlap"));
}

#[tokio::test]
async fn test_missing_bbox() {
    let engine = elevation_engine();
    let response = call(
        &engine,
        &[
            ("service", "WMS"),
            ("version", "1.3.0"),
            ("request", "GetMap"),
            ("layers", "elevation"),
            ("styles", ""),
            ("crs", "EPSG:4326"),
            ("width", "50"),
            ("height", "50"),
            ("format", "image/png"),
        ],
    )
    .await;
    assert_eq!(response.status, 400);
    assert_eq!(response.exception_code, Some("MissingParameterValue"));
    assert!(response.text().contains(r#"locator="bbox""#));
}

#[tokio::test]
async fn test_wms111_errors_use_111_schema() {
    let engine = elevation_engine();
    let params = get_map(&[("version", "1.1.1"), ("srs", "EPSG:9999")]);
    let response = engine.handle(&params, &RequestContext::new()).await;
    assert_eq!(response.media_type, "application/vnd.ogc.se_xml");
    assert!(response.text().contains("exception_1_1_1.dtd"));
}

#[tokio::test]
async fn test_jpeg_output() {
    let engine = elevation_engine();
    let params = get_map(&[("format", "image/jpeg")]);
    let response = engine.handle(&params, &RequestContext::new()).await;
    assert_eq!(response.media_type, "image/jpeg");
    assert_eq!(&response.body[..2], &[0xFF, 0xD8]);
    assert_eq!(decode(&response.body).dimensions(), (50, 50));
}

#[tokio::test]
async fn test_nan_and_out_of_domain_render_transparent() {
    for value in [f32::NAN, 5000.0, -1.0] {
        let engine = elevation_engine_with(Arc::new(ConstantProvider::new(value)));
        let params = get_map(&[("transparent", "TRUE")]);
        let response = engine.handle(&params, &RequestContext::new()).await;
        assert_eq!(response.status, 200, "{}", value);
        let rgba = decode(&response.body).to_rgba8();
        assert!(rgba.pixels().all(|p| p.0[3] == 0), "{}", value);
    }
}

#[tokio::test]
async fn test_opaque_background_shows_through_no_data() {
    let engine = elevation_engine_with(Arc::new(ConstantProvider::new(f32::NAN)));
    let params = get_map(&[("bgcolor", "0xFF0000")]);
    let response = engine.handle(&params, &RequestContext::new()).await;
    let rgba = decode(&response.body).to_rgba8();
    assert!(rgba.pixels().all(|p| p.0 == [255, 0, 0, 255]));
}

#[tokio::test]
async fn test_styled_values_follow_the_ramp() {
    let engine = elevation_engine_with(Arc::new(ConstantProvider::new(0.0)));
    let response = engine.handle(&get_map(&[]), &RequestContext::new()).await;
    let rgba = decode(&response.body).to_rgba8();
    // lowest terrain stop
    assert_eq!(rgba.get_pixel(10, 10).0, [0, 128, 0, 255]);
}

#[tokio::test]
async fn test_layers_missing_the_extent_are_skipped() {
    let provider = Arc::new(ConstantProvider::new(1.0));
    let engine = multi_layer_engine(provider.clone());
    // temperature covers Europe only
    let params = get_map(&[("layers", "elevation,temperature")]);
    let response = engine.handle(&params, &RequestContext::new()).await;
    assert_eq!(response.status, 200);
    assert_eq!(provider.calls(), 1);
}

#[tokio::test]
async fn test_concurrent_requests_share_the_engine() {
    let engine = elevation_engine();
    let params = get_map(&[]);
    let ctx = RequestContext::new();
    let responses =
        futures::future::join_all((0..8).map(|_| engine.handle(&params, &ctx))).await;
    assert!(responses.iter().all(|r| r.status == 200));
    assert!(responses.windows(2).all(|w| w[0].body == w[1].body));
}

// ============================================================================
// GetFeatureInfo
// ============================================================================

fn feature_info(extra: &[(&str, &str)]) -> ogc_engine::KvpParams {
    let mut params = get_map(&[
        ("request", "GetFeatureInfo"),
        ("width", "100"),
        ("height", "100"),
        ("query_layers", "elevation"),
        ("info_format", "application/json"),
        ("i", "75"),
        ("j", "50"),
    ]);
    for (key, value) in extra {
        params.set(key, *value);
    }
    params
}

fn feature_values(body: &[u8]) -> Vec<serde_json::Value> {
    let json: serde_json::Value = serde_json::from_slice(body).expect("json body");
    json["features"]
        .as_array()
        .expect("features array")
        .iter()
        .map(|f| f["value"].clone())
        .collect()
}

#[tokio::test]
async fn test_feature_info_samples_the_cell() {
    let engine = elevation_engine();
    let response = engine.handle(&feature_info(&[]), &RequestContext::new()).await;
    assert_eq!(response.status, 200);
    assert_eq!(response.media_type, "application/json");
    let values = feature_values(&response.body);
    // cell centre at x = 5.1
    assert_approx_eq!(values[0].as_f64().unwrap(), 755.0, 0.01);
}

#[tokio::test]
async fn test_feature_info_outside_layer_is_no_data() {
    let engine = elevation_engine();
    let params = feature_info(&[("bbox", "0,0,20,20"), ("width", "20"), ("height", "20"), ("i", "15"), ("j", "5")]);
    let response = engine.handle(&params, &RequestContext::new()).await;
    assert_eq!(response.status, 200);
    assert_eq!(feature_values(&response.body), vec![serde_json::Value::Null]);
}

#[tokio::test]
async fn test_feature_info_provider_no_data() {
    let engine = elevation_engine_with(Arc::new(NoDataProvider));
    let params = feature_info(&[("info_format", "text/plain")]);
    let response = engine.handle(&params, &RequestContext::new()).await;
    assert_eq!(response.status, 200);
    assert_eq!(response.media_type, "text/plain");
    assert!(response.text().contains("no data"));
}

#[tokio::test]
async fn test_feature_info_xml() {
    let engine = elevation_engine();
    let params = feature_info(&[("info_format", "application/vnd.ogc.gml")]);
    let response = engine.handle(&params, &RequestContext::new()).await;
    assert_eq!(response.media_type, "text/xml");
    root_element(&response.body);
}

// ============================================================================
// GetLegendGraphic
// ============================================================================

#[tokio::test]
async fn test_legend_defaults_to_service_size() {
    let engine = elevation_engine();
    let response = call(
        &engine,
        &[
            ("service", "WMS"),
            ("request", "GetLegendGraphic"),
            ("layer", "elevation"),
            ("format", "image/png"),
        ],
    )
    .await;
    assert_eq!(response.status, 200);
    assert_eq!(decode(&response.body).dimensions(), (150, 250));
}

#[tokio::test]
async fn test_legend_for_named_style_and_size() {
    let engine = elevation_engine();
    let response = call(
        &engine,
        &[
            ("service", "WMS"),
            ("request", "GetLegendGraphic"),
            ("layer", "elevation"),
            ("style", "bands"),
            ("format", "image/png"),
            ("width", "40"),
            ("height", "120"),
        ],
    )
    .await;
    assert_eq!(decode(&response.body).dimensions(), (40, 120));
}
