//! WMS GetFeatureInfo response formatting.
//!
//! The engine samples one cell per query layer; this module renders the
//! samples in the requested info format.

use std::fmt::Write;

use serde::Serialize;

use crate::xml::{esc, num};

/// Info formats advertised in capabilities and accepted as `INFO_FORMAT`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum InfoFormat {
    #[default]
    Text,
    Json,
    /// `text/xml`, also requested as `application/vnd.ogc.gml`
    Xml,
    Html,
}

/// Accepted media types; the first entry per format is the canonical one.
const MEDIA_TYPES: &[(&str, InfoFormat)] = &[
    ("text/plain", InfoFormat::Text),
    ("application/json", InfoFormat::Json),
    ("text/xml", InfoFormat::Xml),
    ("application/vnd.ogc.gml", InfoFormat::Xml),
    ("text/html", InfoFormat::Html),
];

impl InfoFormat {
    pub const ALL: [InfoFormat; 4] = [
        InfoFormat::Text,
        InfoFormat::Json,
        InfoFormat::Xml,
        InfoFormat::Html,
    ];

    /// Case-insensitive lookup of an `INFO_FORMAT` value.
    pub fn from_mime(mime: &str) -> Option<Self> {
        let mime = mime.trim();
        MEDIA_TYPES
            .iter()
            .find(|(name, _)| name.eq_ignore_ascii_case(mime))
            .map(|&(_, format)| format)
    }

    pub fn to_mime(&self) -> &'static str {
        MEDIA_TYPES
            .iter()
            .find(|(_, format)| format == self)
            .map(|&(name, _)| name)
            .unwrap_or("text/plain")
    }
}

/// The sampled value of one layer at the query point.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FeatureInfo {
    pub layer: String,
    pub title: String,
    /// `None` when the point has no data
    pub value: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub units: Option<String>,
    /// Query point (cell centre) in the request CRS
    pub x: f64,
    pub y: f64,
    pub crs: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub time: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub elevation: Option<f64>,
}

impl FeatureInfo {
    fn reading(&self) -> String {
        match (self.value, self.units.as_deref()) {
            (None, _) => "no data".to_string(),
            (Some(v), None) => v.to_string(),
            (Some(v), Some(units)) => format!("{v} {units}"),
        }
    }

    fn location(&self) -> String {
        format!("{} {} ({})", num(self.x), num(self.y), self.crs)
    }
}

/// All samples answered by one GetFeatureInfo request.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FeatureInfoResponse {
    #[serde(rename = "type")]
    kind: &'static str,
    pub features: Vec<FeatureInfo>,
}

impl FeatureInfoResponse {
    pub fn new(features: Vec<FeatureInfo>) -> Self {
        Self {
            kind: "FeatureInfoResponse",
            features,
        }
    }

    pub fn render(&self, format: InfoFormat) -> String {
        let mut out = String::new();
        // writing into a String never fails
        let _ = match format {
            InfoFormat::Text => self.write_text(&mut out),
            InfoFormat::Xml => self.write_xml(&mut out),
            InfoFormat::Html => self.write_html(&mut out),
            InfoFormat::Json => {
                out = serde_json::to_string_pretty(self).unwrap_or_else(|_| "{}".to_string());
                Ok(())
            }
        };
        out
    }

    fn write_text(&self, out: &mut String) -> std::fmt::Result {
        let blocks = self.features.iter().map(|f| {
            let mut block = format!(
                "Layer: {}\nValue: {}\nLocation: {}\n",
                f.layer,
                f.reading(),
                f.location()
            );
            if let Some(time) = &f.time {
                block += &format!("Time: {time}\n");
            }
            if let Some(elevation) = f.elevation {
                block += &format!("Elevation: {elevation}\n");
            }
            block
        });
        write!(out, "{}", blocks.collect::<Vec<_>>().join("\n---\n"))
    }

    fn write_xml(&self, out: &mut String) -> std::fmt::Result {
        writeln!(out, r#"<?xml version="1.0" encoding="UTF-8"?>"#)?;
        writeln!(out, "<FeatureInfoResponse>")?;
        for f in &self.features {
            writeln!(out, r#"  <FeatureInfo layer="{}">"#, esc(&f.layer))?;
            writeln!(out, "    <Title>{}</Title>", esc(&f.title))?;
            match f.value {
                Some(v) => writeln!(out, "    <Value>{v}</Value>")?,
                None => writeln!(out, r#"    <Value nodata="true"/>"#)?,
            }
            if let Some(units) = &f.units {
                writeln!(out, "    <Units>{}</Units>", esc(units))?;
            }
            writeln!(
                out,
                r#"    <Location crs="{}" x="{}" y="{}"/>"#,
                esc(&f.crs),
                num(f.x),
                num(f.y)
            )?;
            if let Some(time) = &f.time {
                writeln!(out, "    <Time>{}</Time>", esc(time))?;
            }
            if let Some(elevation) = f.elevation {
                writeln!(out, "    <Elevation>{elevation}</Elevation>")?;
            }
            writeln!(out, "  </FeatureInfo>")?;
        }
        writeln!(out, "</FeatureInfoResponse>")
    }

    fn write_html(&self, out: &mut String) -> std::fmt::Result {
        writeln!(out, r#"<div class="feature-info">"#)?;
        for f in &self.features {
            let mut rows = vec![
                ("Layer", f.layer.clone()),
                ("Value", f.reading()),
                ("Location", f.location()),
            ];
            if let Some(time) = &f.time {
                rows.push(("Time", time.clone()));
            }
            writeln!(out, "  <h4>{}</h4>\n  <table>", esc(&f.title))?;
            for (label, cell) in rows {
                writeln!(out, "    <tr><th>{label}</th><td>{}</td></tr>", esc(&cell))?;
            }
            writeln!(out, "  </table>")?;
        }
        writeln!(out, "</div>")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn peak(value: Option<f64>) -> FeatureInfoResponse {
        FeatureInfoResponse::new(vec![FeatureInfo {
            layer: "elevation".to_string(),
            title: "Terrain <height>".to_string(),
            value,
            units: Some("m".to_string()),
            x: 1.5,
            y: -2.0,
            crs: "EPSG:4326".to_string(),
            time: None,
            elevation: None,
        }])
    }

    #[test]
    fn test_gml_alias_and_case_are_accepted() {
        assert_eq!(InfoFormat::from_mime("TEXT/HTML"), Some(InfoFormat::Html));
        assert_eq!(InfoFormat::from_mime(" application/vnd.ogc.gml"), Some(InfoFormat::Xml));
        assert_eq!(InfoFormat::Xml.to_mime(), "text/xml");
        assert_eq!(InfoFormat::from_mime("image/png"), None);
        assert_eq!(InfoFormat::default().to_mime(), "text/plain");
    }

    #[test]
    fn test_plain_text_lists_value_with_units() {
        let text = peak(Some(42.5)).render(InfoFormat::Text);
        assert!(text.starts_with("Layer: elevation\n"));
        assert!(text.contains("Value: 42.5 m"));
        assert!(text.contains("Location: 1.5 -2 (EPSG:4326)"));
    }

    #[test]
    fn test_several_layers_are_separated_in_text() {
        let mut response = peak(Some(1.0));
        response.features.push(response.features[0].clone());
        assert_eq!(response.render(InfoFormat::Text).matches("\n---\n").count(), 1);
    }

    #[test]
    fn test_missing_sample_reads_as_no_data() {
        let response = peak(None);
        assert!(response.render(InfoFormat::Text).contains("Value: no data"));
        assert!(response.render(InfoFormat::Json).contains("\"value\": null"));
        assert!(response.render(InfoFormat::Xml).contains("<Value nodata=\"true\"/>"));
        assert!(response.render(InfoFormat::Html).contains("<td>no data</td>"));
    }

    #[test]
    fn test_markup_escapes_layer_titles() {
        let response = peak(Some(1.0));
        assert!(response.render(InfoFormat::Xml).contains("Terrain &lt;height&gt;"));
        assert!(response.render(InfoFormat::Html).contains("<h4>Terrain &lt;height&gt;</h4>"));
    }
}
