//! WCS 1.0.0 and 2.0.1 capabilities.

use ogc_common::LayerDescription;

use super::lon_lat_envelope;
use crate::config::ServiceInfo;
use crate::request::CoverageFormat;
use crate::xml::{esc, num, push_optional};

const OPERATIONS: [&str; 3] = ["GetCapabilities", "DescribeCoverage", "GetCoverage"];

pub(super) fn build_100(layers: &[LayerDescription], service: &ServiceInfo) -> String {
    let url = service.get_url();

    let mut xml = String::from("<?xml version=\"1.0\" encoding=\"UTF-8\"?>\n");
    xml.push_str(
        r#"<WCS_Capabilities version="1.0.0" xmlns="http://www.opengis.net/wcs" xmlns:gml="http://www.opengis.net/gml" xmlns:xlink="http://www.w3.org/1999/xlink" xmlns:xsi="http://www.w3.org/2001/XMLSchema-instance" xsi:schemaLocation="http://www.opengis.net/wcs http://schemas.opengis.net/wcs/1.0.0/wcsCapabilities.xsd">"#,
    );
    xml.push('\n');

    xml.push_str("  <Service>\n");
    push_optional(&mut xml, "    ", "description", Some(service.abstract_text.as_str()));
    xml.push_str("    <name>WCS</name>\n");
    xml.push_str(&format!("    <label>{}</label>\n", esc(&service.title)));
    if !service.keywords.is_empty() {
        xml.push_str("    <keywords>\n");
        for keyword in &service.keywords {
            xml.push_str(&format!("      <keyword>{}</keyword>\n", esc(keyword)));
        }
        xml.push_str("    </keywords>\n");
    }
    if let Some(org) = &service.contact_organization {
        xml.push_str(&format!(
            "    <responsibleParty><organisationName>{}</organisationName></responsibleParty>\n",
            esc(org)
        ));
    }
    xml.push_str(&format!("    <fees>{}</fees>\n", esc(&service.fees)));
    xml.push_str(&format!(
        "    <accessConstraints>{}</accessConstraints>\n",
        esc(&service.access_constraints)
    ));
    xml.push_str("  </Service>\n");

    xml.push_str("  <Capability>\n");
    xml.push_str("    <Request>\n");
    for op in OPERATIONS {
        xml.push_str(&format!(
            "      <{op}><DCPType><HTTP><Get><OnlineResource xlink:type=\"simple\" xlink:href=\"{}\"/></Get></HTTP></DCPType></{op}>\n",
            esc(&url)
        ));
    }
    xml.push_str("    </Request>\n");
    xml.push_str("    <Exception>\n");
    xml.push_str("      <Format>application/vnd.ogc.se_xml</Format>\n");
    xml.push_str("    </Exception>\n");
    xml.push_str("  </Capability>\n");

    xml.push_str("  <ContentMetadata>\n");
    for layer in layers {
        xml.push_str("    <CoverageOfferingBrief>\n");
        push_optional(&mut xml, "      ", "description", layer.abstract_text.as_deref());
        xml.push_str(&format!("      <name>{}</name>\n", esc(&layer.name)));
        xml.push_str(&format!("      <label>{}</label>\n", esc(&layer.title)));
        push_lon_lat_envelope(&mut xml, "      ", layer);
        xml.push_str("    </CoverageOfferingBrief>\n");
    }
    xml.push_str("  </ContentMetadata>\n");
    xml.push_str("</WCS_Capabilities>\n");
    xml
}

/// `lonLatEnvelope` with the time span when the layer has one. Shared with
/// DescribeCoverage.
pub(crate) fn push_lon_lat_envelope(xml: &mut String, indent: &str, layer: &LayerDescription) {
    let bbox = lon_lat_envelope(layer);
    xml.push_str(&format!(
        "{indent}<lonLatEnvelope srsName=\"urn:ogc:def:crs:OGC:1.3:CRS84\">\n"
    ));
    xml.push_str(&format!(
        "{indent}  <gml:pos>{} {}</gml:pos>\n",
        num(bbox.min_x),
        num(bbox.min_y)
    ));
    xml.push_str(&format!(
        "{indent}  <gml:pos>{} {}</gml:pos>\n",
        num(bbox.max_x),
        num(bbox.max_y)
    ));
    if let Some(time) = &layer.time {
        xml.push_str(&format!(
            "{indent}  <gml:timePosition>{}</gml:timePosition>\n",
            time.begin
        ));
        xml.push_str(&format!(
            "{indent}  <gml:timePosition>{}</gml:timePosition>\n",
            time.end
        ));
    }
    xml.push_str(&format!("{indent}</lonLatEnvelope>\n"));
}

pub(super) fn build_201(layers: &[LayerDescription], service: &ServiceInfo) -> String {
    let url = service.get_url();

    let mut xml = String::from("<?xml version=\"1.0\" encoding=\"UTF-8\"?>\n");
    xml.push_str(
        r#"<wcs:Capabilities version="2.0.1" xmlns:wcs="http://www.opengis.net/wcs/2.0" xmlns:ows="http://www.opengis.net/ows/2.0" xmlns:gml="http://www.opengis.net/gml/3.2" xmlns:xlink="http://www.w3.org/1999/xlink" xmlns:xsi="http://www.w3.org/2001/XMLSchema-instance" xsi:schemaLocation="http://www.opengis.net/wcs/2.0 http://schemas.opengis.net/wcs/2.0/wcsAll.xsd">"#,
    );
    xml.push('\n');

    xml.push_str("  <ows:ServiceIdentification>\n");
    xml.push_str(&format!("    <ows:Title>{}</ows:Title>\n", esc(&service.title)));
    push_optional(&mut xml, "    ", "ows:Abstract", Some(service.abstract_text.as_str()));
    if !service.keywords.is_empty() {
        xml.push_str("    <ows:Keywords>\n");
        for keyword in &service.keywords {
            xml.push_str(&format!("      <ows:Keyword>{}</ows:Keyword>\n", esc(keyword)));
        }
        xml.push_str("    </ows:Keywords>\n");
    }
    xml.push_str("    <ows:ServiceType codeSpace=\"OGC\">OGC WCS</ows:ServiceType>\n");
    xml.push_str("    <ows:ServiceTypeVersion>2.0.1</ows:ServiceTypeVersion>\n");
    xml.push_str("    <ows:Profile>http://www.opengis.net/spec/WCS/2.0/conf/core</ows:Profile>\n");
    xml.push_str(
        "    <ows:Profile>http://www.opengis.net/spec/WCS_protocol-binding_get-kvp/1.0/conf/get-kvp</ows:Profile>\n",
    );
    xml.push_str(
        "    <ows:Profile>http://www.opengis.net/spec/GMLCOV_geotiff-coverages/1.0/conf/geotiff-coverage</ows:Profile>\n",
    );
    xml.push_str(&format!("    <ows:Fees>{}</ows:Fees>\n", esc(&service.fees)));
    xml.push_str(&format!(
        "    <ows:AccessConstraints>{}</ows:AccessConstraints>\n",
        esc(&service.access_constraints)
    ));
    xml.push_str("  </ows:ServiceIdentification>\n");

    xml.push_str("  <ows:ServiceProvider>\n");
    xml.push_str(&format!(
        "    <ows:ProviderName>{}</ows:ProviderName>\n",
        esc(service
            .contact_organization
            .as_deref()
            .unwrap_or(&service.title))
    ));
    xml.push_str("    <ows:ServiceContact/>\n");
    xml.push_str("  </ows:ServiceProvider>\n");

    xml.push_str("  <ows:OperationsMetadata>\n");
    for op in OPERATIONS {
        xml.push_str(&format!(
            "    <ows:Operation name=\"{}\"><ows:DCP><ows:HTTP><ows:Get xlink:href=\"{}\"/></ows:HTTP></ows:DCP></ows:Operation>\n",
            op,
            esc(&url)
        ));
    }
    xml.push_str("  </ows:OperationsMetadata>\n");

    xml.push_str("  <wcs:ServiceMetadata>\n");
    xml.push_str(&format!(
        "    <wcs:formatSupported>{}</wcs:formatSupported>\n",
        CoverageFormat::GeoTiff.media_type()
    ));
    xml.push_str("  </wcs:ServiceMetadata>\n");

    xml.push_str("  <wcs:Contents>\n");
    for layer in layers {
        let bbox = lon_lat_envelope(layer);
        xml.push_str("    <wcs:CoverageSummary>\n");
        xml.push_str(&format!("      <ows:Title>{}</ows:Title>\n", esc(&layer.title)));
        push_optional(&mut xml, "      ", "ows:Abstract", layer.abstract_text.as_deref());
        xml.push_str(&format!(
            "      <wcs:CoverageId>{}</wcs:CoverageId>\n",
            esc(&layer.name)
        ));
        xml.push_str("      <wcs:CoverageSubtype>RectifiedGridCoverage</wcs:CoverageSubtype>\n");
        xml.push_str("      <ows:WGS84BoundingBox>\n");
        xml.push_str(&format!(
            "        <ows:LowerCorner>{} {}</ows:LowerCorner>\n",
            num(bbox.min_x),
            num(bbox.min_y)
        ));
        xml.push_str(&format!(
            "        <ows:UpperCorner>{} {}</ows:UpperCorner>\n",
            num(bbox.max_x),
            num(bbox.max_y)
        ));
        xml.push_str("      </ows:WGS84BoundingBox>\n");
        xml.push_str("    </wcs:CoverageSummary>\n");
    }
    xml.push_str("  </wcs:Contents>\n");
    xml.push_str("</wcs:Capabilities>\n");
    xml
}
