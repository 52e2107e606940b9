//! WCS DescribeCoverage documents.

use std::sync::Arc;

use ogc_common::{AxisConvention, AxisOrder, CrsTransform, Layer, LayerDescription};

use crate::capabilities::wcs::push_lon_lat_envelope;
use crate::request::CoverageFormat;
use crate::version::ServiceVersion;
use crate::xml::{esc, num, push_optional};

/// Describe `layers` in the order given.
pub fn build_describe_coverage(
    layers: &[Arc<Layer>],
    version: ServiceVersion,
    transform: &dyn CrsTransform,
) -> String {
    let descriptions: Vec<LayerDescription> =
        layers.iter().map(|l| l.describe(transform)).collect();
    match version {
        ServiceVersion::Wcs201 => build_201(&descriptions),
        _ => build_100(&descriptions),
    }
}

fn build_100(layers: &[LayerDescription]) -> String {
    let format = CoverageFormat::GeoTiff.wcs10_name();

    let mut xml = String::from("<?xml version=\"1.0\" encoding=\"UTF-8\"?>\n");
    xml.push_str(
        r#"<CoverageDescription version="1.0.0" xmlns="http://www.opengis.net/wcs" xmlns:gml="http://www.opengis.net/gml" xmlns:xsi="http://www.w3.org/2001/XMLSchema-instance" xsi:schemaLocation="http://www.opengis.net/wcs http://schemas.opengis.net/wcs/1.0.0/describeCoverage.xsd">"#,
    );
    xml.push('\n');

    for layer in layers {
        let bbox = &layer.native_bbox;
        let (res_x, res_y) = native_resolution(layer);

        xml.push_str("  <CoverageOffering>\n");
        push_optional(&mut xml, "    ", "description", layer.abstract_text.as_deref());
        xml.push_str(&format!("    <name>{}</name>\n", esc(&layer.name)));
        xml.push_str(&format!("    <label>{}</label>\n", esc(&layer.title)));
        push_lon_lat_envelope(&mut xml, "    ", layer);

        xml.push_str("    <domainSet>\n");
        xml.push_str("      <spatialDomain>\n");
        xml.push_str(&format!(
            "        <gml:Envelope srsName=\"{}\">\n",
            layer.native_crs
        ));
        xml.push_str(&format!(
            "          <gml:pos>{} {}</gml:pos>\n",
            num(bbox.min_x),
            num(bbox.min_y)
        ));
        xml.push_str(&format!(
            "          <gml:pos>{} {}</gml:pos>\n",
            num(bbox.max_x),
            num(bbox.max_y)
        ));
        xml.push_str("        </gml:Envelope>\n");
        xml.push_str(&format!(
            "        <gml:RectifiedGrid dimension=\"2\" srsName=\"{}\">\n",
            layer.native_crs
        ));
        xml.push_str(&format!(
            "          <gml:limits><gml:GridEnvelope><gml:low>0 0</gml:low><gml:high>{} {}</gml:high></gml:GridEnvelope></gml:limits>\n",
            layer.width.saturating_sub(1),
            layer.height.saturating_sub(1)
        ));
        xml.push_str("          <gml:axisName>x</gml:axisName>\n");
        xml.push_str("          <gml:axisName>y</gml:axisName>\n");
        xml.push_str(&format!(
            "          <gml:origin><gml:pos>{} {}</gml:pos></gml:origin>\n",
            num(bbox.min_x),
            num(bbox.max_y)
        ));
        xml.push_str(&format!(
            "          <gml:offsetVector>{} 0</gml:offsetVector>\n",
            num(res_x)
        ));
        xml.push_str(&format!(
            "          <gml:offsetVector>0 {}</gml:offsetVector>\n",
            num(-res_y)
        ));
        xml.push_str("        </gml:RectifiedGrid>\n");
        xml.push_str("      </spatialDomain>\n");
        if let Some(time) = &layer.time {
            xml.push_str("      <temporalDomain>\n");
            xml.push_str(&format!(
                "        <gml:TimePeriod><gml:beginPosition>{}</gml:beginPosition><gml:endPosition>{}</gml:endPosition></gml:TimePeriod>\n",
                time.begin, time.end
            ));
            xml.push_str("      </temporalDomain>\n");
        }
        xml.push_str("    </domainSet>\n");

        xml.push_str("    <rangeSet>\n");
        xml.push_str("      <RangeSet>\n");
        xml.push_str(&format!("        <name>{}</name>\n", esc(&layer.name)));
        xml.push_str(&format!("        <label>{}</label>\n", esc(&layer.title)));
        xml.push_str("        <nullValues><singleValue>NaN</singleValue></nullValues>\n");
        xml.push_str("      </RangeSet>\n");
        xml.push_str("    </rangeSet>\n");

        xml.push_str("    <supportedCRSs>\n");
        for crs in &layer.supported_crs {
            xml.push_str(&format!(
                "      <requestResponseCRSs>{}</requestResponseCRSs>\n",
                crs
            ));
        }
        xml.push_str(&format!(
            "      <nativeCRSs>{}</nativeCRSs>\n",
            layer.native_crs
        ));
        xml.push_str("    </supportedCRSs>\n");
        xml.push_str(&format!(
            "    <supportedFormats nativeFormat=\"{format}\"><formats>{format}</formats></supportedFormats>\n"
        ));
        xml.push_str(
            "    <supportedInterpolations default=\"nearest neighbor\"><interpolationMethod>nearest neighbor</interpolationMethod></supportedInterpolations>\n",
        );
        xml.push_str("  </CoverageOffering>\n");
    }

    xml.push_str("</CoverageDescription>\n");
    xml
}

fn build_201(layers: &[LayerDescription]) -> String {
    let mut xml = String::from("<?xml version=\"1.0\" encoding=\"UTF-8\"?>\n");
    xml.push_str(
        r#"<wcs:CoverageDescriptions xmlns:wcs="http://www.opengis.net/wcs/2.0" xmlns:gml="http://www.opengis.net/gml/3.2" xmlns:gmlcov="http://www.opengis.net/gmlcov/1.0" xmlns:swe="http://www.opengis.net/swe/2.0" xmlns:xsi="http://www.w3.org/2001/XMLSchema-instance" xsi:schemaLocation="http://www.opengis.net/wcs/2.0 http://schemas.opengis.net/wcs/2.0/wcsDescribeCoverage.xsd">"#,
    );
    xml.push('\n');

    for layer in layers {
        let crs = &layer.native_crs;
        let srs_name = crs.uri();
        let order = crs.axis_order(AxisConvention::Authority);
        let labels = axis_labels(layer, order);
        let uom = if crs.is_geographic() { "deg deg" } else { "m m" };
        let [a, b, c, d] = layer.native_bbox.ordered(order);
        let (res_x, res_y) = native_resolution(layer);
        let id = esc(&layer.name);

        // Upper-left corner and the column/row steps, in authority order.
        let bbox = &layer.native_bbox;
        let (origin, col_step, row_step) = match order {
            AxisOrder::XY => (
                format!("{} {}", num(bbox.min_x), num(bbox.max_y)),
                format!("{} 0", num(res_x)),
                format!("0 {}", num(-res_y)),
            ),
            AxisOrder::YX => (
                format!("{} {}", num(bbox.max_y), num(bbox.min_x)),
                format!("0 {}", num(res_x)),
                format!("{} 0", num(-res_y)),
            ),
        };

        xml.push_str(&format!("  <wcs:CoverageDescription gml:id=\"{}\">\n", id));
        xml.push_str("    <gml:boundedBy>\n");
        xml.push_str(&format!(
            "      <gml:Envelope srsName=\"{}\" axisLabels=\"{}\" uomLabels=\"{}\" srsDimension=\"2\">\n",
            srs_name, labels, uom
        ));
        xml.push_str(&format!(
            "        <gml:lowerCorner>{} {}</gml:lowerCorner>\n",
            num(a),
            num(b)
        ));
        xml.push_str(&format!(
            "        <gml:upperCorner>{} {}</gml:upperCorner>\n",
            num(c),
            num(d)
        ));
        xml.push_str("      </gml:Envelope>\n");
        xml.push_str("    </gml:boundedBy>\n");
        xml.push_str(&format!("    <wcs:CoverageId>{}</wcs:CoverageId>\n", id));

        xml.push_str("    <gml:domainSet>\n");
        xml.push_str(&format!(
            "      <gml:RectifiedGrid gml:id=\"grid_{}\" dimension=\"2\">\n",
            id
        ));
        xml.push_str(&format!(
            "        <gml:limits><gml:GridEnvelope><gml:low>0 0</gml:low><gml:high>{} {}</gml:high></gml:GridEnvelope></gml:limits>\n",
            layer.width.saturating_sub(1),
            layer.height.saturating_sub(1)
        ));
        xml.push_str("        <gml:axisLabels>i j</gml:axisLabels>\n");
        xml.push_str(&format!(
            "        <gml:origin><gml:Point gml:id=\"origin_{}\" srsName=\"{}\"><gml:pos>{}</gml:pos></gml:Point></gml:origin>\n",
            id, srs_name, origin
        ));
        xml.push_str(&format!(
            "        <gml:offsetVector srsName=\"{}\">{}</gml:offsetVector>\n",
            srs_name, col_step
        ));
        xml.push_str(&format!(
            "        <gml:offsetVector srsName=\"{}\">{}</gml:offsetVector>\n",
            srs_name, row_step
        ));
        xml.push_str("      </gml:RectifiedGrid>\n");
        xml.push_str("    </gml:domainSet>\n");

        xml.push_str("    <gmlcov:rangeType>\n");
        xml.push_str("      <swe:DataRecord>\n");
        xml.push_str(&format!("        <swe:field name=\"{}\">\n", id));
        xml.push_str("          <swe:Quantity>\n");
        xml.push_str(
            "            <swe:nilValues><swe:NilValues><swe:nilValue reason=\"http://www.opengis.net/def/nil/OGC/0/missing\">NaN</swe:nilValue></swe:NilValues></swe:nilValues>\n",
        );
        xml.push_str(&format!(
            "            <swe:uom code=\"{}\"/>\n",
            esc(layer.units.as_deref().unwrap_or("W.1"))
        ));
        xml.push_str("          </swe:Quantity>\n");
        xml.push_str("        </swe:field>\n");
        xml.push_str("      </swe:DataRecord>\n");
        xml.push_str("    </gmlcov:rangeType>\n");

        xml.push_str("    <wcs:ServiceParameters>\n");
        xml.push_str("      <wcs:CoverageSubtype>RectifiedGridCoverage</wcs:CoverageSubtype>\n");
        xml.push_str(&format!(
            "      <wcs:nativeFormat>{}</wcs:nativeFormat>\n",
            CoverageFormat::GeoTiff.media_type()
        ));
        xml.push_str("    </wcs:ServiceParameters>\n");
        xml.push_str("  </wcs:CoverageDescription>\n");
    }

    xml.push_str("</wcs:CoverageDescriptions>\n");
    xml
}

fn native_resolution(layer: &LayerDescription) -> (f64, f64) {
    (
        layer.native_bbox.width() / layer.width.max(1) as f64,
        layer.native_bbox.height() / layer.height.max(1) as f64,
    )
}

fn axis_labels(layer: &LayerDescription, order: AxisOrder) -> &'static str {
    match (layer.native_crs.is_geographic(), order) {
        (true, AxisOrder::YX) => "Lat Long",
        (true, AxisOrder::XY) => "Long Lat",
        (false, _) => "E N",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ogc_common::{BoundingBox, Crs};

    fn description(crs: Crs) -> LayerDescription {
        LayerDescription {
            name: "dem".into(),
            title: "Elevation".into(),
            abstract_text: None,
            keywords: Vec::new(),
            native_crs: crs.clone(),
            native_bbox: BoundingBox::new(-10.0, -5.0, 10.0, 5.0),
            width: 20,
            height: 10,
            geographic_bbox: Some(BoundingBox::new(-10.0, -5.0, 10.0, 5.0)),
            bounding_boxes: Vec::new(),
            supported_crs: vec![crs],
            time: None,
            elevation: None,
            styles: Vec::new(),
            queryable: true,
            units: Some("m".into()),
        }
    }

    #[test]
    fn test_wcs100_grid_geometry() {
        let xml = build_100(&[description(Crs::epsg(4326))]);
        assert!(xml.contains("<name>dem</name>"));
        assert!(xml.contains("<gml:high>19 9</gml:high>"));
        assert!(xml.contains("<gml:origin><gml:pos>-10 5</gml:pos></gml:origin>"));
        assert!(xml.contains("<gml:offsetVector>1 0</gml:offsetVector>"));
        assert!(xml.contains("<gml:offsetVector>0 -1</gml:offsetVector>"));
        assert!(xml.contains("<nullValues><singleValue>NaN</singleValue></nullValues>"));
    }

    #[test]
    fn test_wcs201_uses_authority_axis_order() {
        let xml = build_201(&[description(Crs::epsg(4326))]);
        assert!(xml.contains("axisLabels=\"Lat Long\""));
        assert!(xml.contains("<gml:lowerCorner>-5 -10</gml:lowerCorner>"));
        assert!(xml.contains("<gml:pos>5 -10</gml:pos>"));
        assert!(xml.contains("<swe:uom code=\"m\"/>"));
    }

    #[test]
    fn test_wcs201_projected_axes() {
        let xml = build_201(&[description(Crs::epsg(3857))]);
        assert!(xml.contains("axisLabels=\"E N\""));
        assert!(xml.contains("<gml:lowerCorner>-10 -5</gml:lowerCorner>"));
    }
}
