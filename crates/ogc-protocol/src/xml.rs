//! Small helpers shared by the XML document builders.

use std::borrow::Cow;

/// Escape text or attribute content.
pub(crate) fn esc(s: &str) -> Cow<'_, str> {
    quick_xml::escape::escape(s)
}

/// Append `<tag>text</tag>` when `text` is present and non-empty.
pub(crate) fn push_optional(xml: &mut String, indent: &str, tag: &str, text: Option<&str>) {
    if let Some(text) = text.filter(|t| !t.is_empty()) {
        xml.push_str(&format!("{indent}<{tag}>{}</{tag}>\n", esc(text)));
    }
}

/// Format a coordinate without trailing noise.
///
/// `f64`'s `Display` is shortest-round-trip, so output is stable across
/// calls.
pub(crate) fn num(v: f64) -> String {
    if v == 0.0 {
        // avoid "-0"
        "0".to_string()
    } else {
        v.to_string()
    }
}
