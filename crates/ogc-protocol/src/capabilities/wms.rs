//! WMS 1.1.1 and 1.3.0 capabilities.

use ogc_common::{AxisConvention, BoundingBox, Crs, LayerDescription};

use crate::config::{RequestLimits, ServiceInfo};
use crate::getfeatureinfo::InfoFormat;
use crate::request::ImageFormat;
use crate::version::ServiceVersion;
use crate::xml::{esc, num, push_optional};

pub(super) fn build(
    layers: &[LayerDescription],
    service: &ServiceInfo,
    limits: &RequestLimits,
    version: ServiceVersion,
) -> String {
    let v130 = version == ServiceVersion::Wms130;
    let url = service.get_url();

    let mut xml = String::from("<?xml version=\"1.0\" encoding=\"UTF-8\"?>\n");
    if v130 {
        xml.push_str(
            r#"<WMS_Capabilities version="1.3.0" xmlns="http://www.opengis.net/wms" xmlns:xlink="http://www.w3.org/1999/xlink" xmlns:xsi="http://www.w3.org/2001/XMLSchema-instance" xsi:schemaLocation="http://www.opengis.net/wms http://schemas.opengis.net/wms/1.3.0/capabilities_1_3_0.xsd">"#,
        );
    } else {
        xml.push_str(
            r#"<!DOCTYPE WMT_MS_Capabilities SYSTEM "http://schemas.opengis.net/wms/1.1.1/capabilities_1_1_1.dtd">"#,
        );
        xml.push('\n');
        xml.push_str(
            r#"<WMT_MS_Capabilities version="1.1.1" xmlns:xlink="http://www.w3.org/1999/xlink">"#,
        );
    }
    xml.push('\n');

    // Service
    xml.push_str("  <Service>\n");
    xml.push_str(&format!(
        "    <Name>{}</Name>\n",
        if v130 { "WMS" } else { "OGC:WMS" }
    ));
    xml.push_str(&format!("    <Title>{}</Title>\n", esc(&service.title)));
    push_optional(&mut xml, "    ", "Abstract", Some(service.abstract_text.as_str()));
    if !service.keywords.is_empty() {
        xml.push_str("    <KeywordList>\n");
        for keyword in &service.keywords {
            xml.push_str(&format!("      <Keyword>{}</Keyword>\n", esc(keyword)));
        }
        xml.push_str("    </KeywordList>\n");
    }
    xml.push_str(&format!(
        "    <OnlineResource xlink:type=\"simple\" xlink:href=\"{}\"/>\n",
        esc(&service.online_resource)
    ));
    if let Some(org) = &service.contact_organization {
        xml.push_str("    <ContactInformation>\n");
        xml.push_str("      <ContactPersonPrimary>\n");
        xml.push_str("        <ContactPerson></ContactPerson>\n");
        xml.push_str(&format!(
            "        <ContactOrganization>{}</ContactOrganization>\n",
            esc(org)
        ));
        xml.push_str("      </ContactPersonPrimary>\n");
        xml.push_str("    </ContactInformation>\n");
    }
    xml.push_str(&format!("    <Fees>{}</Fees>\n", esc(&service.fees)));
    xml.push_str(&format!(
        "    <AccessConstraints>{}</AccessConstraints>\n",
        esc(&service.access_constraints)
    ));
    if v130 {
        xml.push_str(&format!("    <LayerLimit>{}</LayerLimit>\n", limits.max_layers));
        xml.push_str(&format!("    <MaxWidth>{}</MaxWidth>\n", limits.max_width));
        xml.push_str(&format!("    <MaxHeight>{}</MaxHeight>\n", limits.max_height));
    }
    xml.push_str("  </Service>\n");

    // Capability
    xml.push_str("  <Capability>\n");
    xml.push_str("    <Request>\n");
    let capabilities_format = if v130 {
        "text/xml"
    } else {
        "application/vnd.ogc.wms_xml"
    };
    push_operation(&mut xml, "GetCapabilities", &[capabilities_format], &url);
    push_operation(&mut xml, "GetMap", &ImageFormat::MEDIA_TYPES, &url);
    let info_formats: Vec<&str> = InfoFormat::ALL.iter().map(|f| f.to_mime()).collect();
    push_operation(&mut xml, "GetFeatureInfo", &info_formats, &url);
    xml.push_str("    </Request>\n");
    xml.push_str("    <Exception>\n");
    xml.push_str(&format!(
        "      <Format>{}</Format>\n",
        if v130 { "XML" } else { "application/vnd.ogc.se_xml" }
    ));
    xml.push_str("    </Exception>\n");

    // Root layer
    xml.push_str("    <Layer>\n");
    xml.push_str(&format!("      <Title>{}</Title>\n", esc(&service.title)));
    for crs in union_crs(layers) {
        xml.push_str(&format!("      {}\n", crs_element(v130, &crs)));
    }
    if let Some(bbox) = layers
        .iter()
        .filter_map(|l| l.geographic_bbox)
        .reduce(|a, b| a.union(&b))
    {
        push_geographic_bbox(&mut xml, "      ", v130, &bbox);
    }

    for layer in layers {
        push_layer(&mut xml, layer, service, version, &url);
    }

    xml.push_str("    </Layer>\n");
    xml.push_str("  </Capability>\n");
    xml.push_str(if v130 {
        "</WMS_Capabilities>\n"
    } else {
        "</WMT_MS_Capabilities>\n"
    });
    xml
}

fn push_operation(xml: &mut String, name: &str, formats: &[&str], url: &str) {
    xml.push_str(&format!("      <{}>\n", name));
    for format in formats {
        xml.push_str(&format!("        <Format>{}</Format>\n", format));
    }
    xml.push_str(&format!(
        "        <DCPType><HTTP><Get><OnlineResource xlink:type=\"simple\" xlink:href=\"{}\"/></Get></HTTP></DCPType>\n",
        esc(url)
    ));
    xml.push_str(&format!("      </{}>\n", name));
}

fn crs_element(v130: bool, crs: &Crs) -> String {
    if v130 {
        format!("<CRS>{}</CRS>", crs)
    } else {
        format!("<SRS>{}</SRS>", crs)
    }
}

/// Distinct CRSs across all layers, in first-seen order.
fn union_crs(layers: &[LayerDescription]) -> Vec<Crs> {
    let mut all: Vec<Crs> = Vec::new();
    for crs in layers.iter().flat_map(|l| &l.supported_crs) {
        if !all.contains(crs) {
            all.push(crs.clone());
        }
    }
    all
}

fn push_geographic_bbox(xml: &mut String, indent: &str, v130: bool, bbox: &BoundingBox) {
    if v130 {
        xml.push_str(&format!("{indent}<EX_GeographicBoundingBox>\n"));
        xml.push_str(&format!(
            "{indent}  <westBoundLongitude>{}</westBoundLongitude>\n",
            num(bbox.min_x)
        ));
        xml.push_str(&format!(
            "{indent}  <eastBoundLongitude>{}</eastBoundLongitude>\n",
            num(bbox.max_x)
        ));
        xml.push_str(&format!(
            "{indent}  <southBoundLatitude>{}</southBoundLatitude>\n",
            num(bbox.min_y)
        ));
        xml.push_str(&format!(
            "{indent}  <northBoundLatitude>{}</northBoundLatitude>\n",
            num(bbox.max_y)
        ));
        xml.push_str(&format!("{indent}</EX_GeographicBoundingBox>\n"));
    } else {
        xml.push_str(&format!(
            "{indent}<LatLonBoundingBox minx=\"{}\" miny=\"{}\" maxx=\"{}\" maxy=\"{}\"/>\n",
            num(bbox.min_x),
            num(bbox.min_y),
            num(bbox.max_x),
            num(bbox.max_y)
        ));
    }
}

fn push_layer(
    xml: &mut String,
    layer: &LayerDescription,
    service: &ServiceInfo,
    version: ServiceVersion,
    url: &str,
) {
    let v130 = version == ServiceVersion::Wms130;

    xml.push_str(&format!(
        "      <Layer queryable=\"{}\">\n",
        if layer.queryable { 1 } else { 0 }
    ));
    xml.push_str(&format!("        <Name>{}</Name>\n", esc(&layer.name)));
    xml.push_str(&format!("        <Title>{}</Title>\n", esc(&layer.title)));
    push_optional(xml, "        ", "Abstract", layer.abstract_text.as_deref());
    if !layer.keywords.is_empty() {
        xml.push_str("        <KeywordList>\n");
        for keyword in &layer.keywords {
            xml.push_str(&format!("          <Keyword>{}</Keyword>\n", esc(keyword)));
        }
        xml.push_str("        </KeywordList>\n");
    }

    for crs in &layer.supported_crs {
        xml.push_str(&format!("        {}\n", crs_element(v130, crs)));
    }
    if let Some(bbox) = &layer.geographic_bbox {
        push_geographic_bbox(xml, "        ", v130, bbox);
    }

    for entry in &layer.bounding_boxes {
        let order = if v130 {
            entry.crs.axis_order(AxisConvention::Authority)
        } else {
            entry.crs.axis_order(AxisConvention::Traditional)
        };
        let [a, b, c, d] = entry.bbox.ordered(order);
        let resolution = entry
            .resolution
            .map(|(rx, ry)| format!(" resx=\"{}\" resy=\"{}\"", num(rx), num(ry)))
            .unwrap_or_default();
        xml.push_str(&format!(
            "        <BoundingBox {}=\"{}\" minx=\"{}\" miny=\"{}\" maxx=\"{}\" maxy=\"{}\"{}/>\n",
            if v130 { "CRS" } else { "SRS" },
            entry.crs,
            num(a),
            num(b),
            num(c),
            num(d),
            resolution
        ));
    }

    if v130 {
        if let Some(time) = &layer.time {
            xml.push_str(&format!(
                "        <Dimension name=\"time\" units=\"ISO8601\" default=\"{}\">{}</Dimension>\n",
                esc(&time.default),
                esc(&time.extent)
            ));
        }
        if let Some(elevation) = &layer.elevation {
            xml.push_str(&format!(
                "        <Dimension name=\"elevation\" units=\"{}\"{} default=\"{}\">{}</Dimension>\n",
                esc(&elevation.units),
                unit_symbol(elevation.unit_symbol.as_deref()),
                elevation.default,
                esc(&elevation.extent)
            ));
        }
    } else {
        // capabilities_1_1_1.dtd: all Dimension elements precede all Extents
        if layer.time.is_some() {
            xml.push_str("        <Dimension name=\"time\" units=\"ISO8601\"/>\n");
        }
        if let Some(elevation) = &layer.elevation {
            xml.push_str(&format!(
                "        <Dimension name=\"elevation\" units=\"{}\"{}/>\n",
                esc(&elevation.units),
                unit_symbol(elevation.unit_symbol.as_deref())
            ));
        }
        if let Some(time) = &layer.time {
            xml.push_str(&format!(
                "        <Extent name=\"time\" default=\"{}\">{}</Extent>\n",
                esc(&time.default),
                esc(&time.extent)
            ));
        }
        if let Some(elevation) = &layer.elevation {
            xml.push_str(&format!(
                "        <Extent name=\"elevation\" default=\"{}\">{}</Extent>\n",
                elevation.default,
                esc(&elevation.extent)
            ));
        }
    }

    for style in &layer.styles {
        xml.push_str("        <Style>\n");
        xml.push_str(&format!("          <Name>{}</Name>\n", esc(&style.name)));
        xml.push_str(&format!("          <Title>{}</Title>\n", esc(&style.title)));
        push_optional(xml, "          ", "Abstract", style.abstract_text.as_deref());
        xml.push_str(&format!(
            "          <LegendURL width=\"{}\" height=\"{}\">\n",
            service.legend_width, service.legend_height
        ));
        xml.push_str("            <Format>image/png</Format>\n");
        xml.push_str(&format!(
            "            <OnlineResource xlink:type=\"simple\" xlink:href=\"{}\"/>\n",
            esc(&legend_url(url, version, &layer.name, &style.name))
        ));
        xml.push_str("          </LegendURL>\n");
        xml.push_str("        </Style>\n");
    }

    xml.push_str("      </Layer>\n");
}

fn unit_symbol(symbol: Option<&str>) -> String {
    symbol
        .map(|s| format!(" unitSymbol=\"{}\"", esc(s)))
        .unwrap_or_default()
}

/// GetLegendGraphic link for one style, before XML escaping.
fn legend_url(base: &str, version: ServiceVersion, layer: &str, style: &str) -> String {
    format!(
        "{}SERVICE=WMS&REQUEST=GetLegendGraphic&VERSION={}&FORMAT=image/png&LAYER={}&STYLE={}",
        base,
        version.as_str(),
        urlencoding::encode(layer),
        urlencoding::encode(style)
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_legend_url() {
        let url = legend_url("http://h/ogc?", ServiceVersion::Wms130, "dem", "relief");
        assert_eq!(
            url,
            "http://h/ogc?SERVICE=WMS&REQUEST=GetLegendGraphic&VERSION=1.3.0&FORMAT=image/png&LAYER=dem&STYLE=relief"
        );
    }

    #[test]
    fn test_legend_url_encodes_names() {
        let url = legend_url("http://h/ogc?", ServiceVersion::Wms111, "sea & land", "a#b");
        assert!(url.ends_with("&LAYER=sea%20%26%20land&STYLE=a%23b"));
        assert_eq!(url.matches('&').count(), 5);
    }

    #[test]
    fn test_union_crs_keeps_first_seen_order() {
        let layer = |crs: Vec<Crs>| LayerDescription {
            name: "l".into(),
            title: "l".into(),
            abstract_text: None,
            keywords: Vec::new(),
            native_crs: crs[0].clone(),
            native_bbox: BoundingBox::new(0.0, 0.0, 1.0, 1.0),
            width: 1,
            height: 1,
            geographic_bbox: None,
            bounding_boxes: Vec::new(),
            supported_crs: crs,
            time: None,
            elevation: None,
            styles: Vec::new(),
            queryable: false,
            units: None,
        };
        let layers = vec![
            layer(vec![Crs::epsg(4326), Crs::epsg(3857)]),
            layer(vec![Crs::epsg(3857), Crs::crs84()]),
        ];
        assert_eq!(
            union_crs(&layers),
            vec![Crs::epsg(4326), Crs::epsg(3857), Crs::crs84()]
        );
    }
}
