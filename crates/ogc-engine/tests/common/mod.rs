//! Common helpers for ogc-engine tests
//!
//! Provides:
//! - Engines over the test-utils registries
//! - KVP construction and one-shot calls
//! - XML scanning with quick-xml
//! - TIFF header inspection

#![allow(dead_code)]

use std::sync::Arc;

use ogc_common::{DataProvider, LayerRegistry};
use ogc_engine::{KvpParams, OgcEngine, OgcResponse, RequestContext, RequestLimits, ServiceInfo};
use quick_xml::events::Event;
use quick_xml::Reader;
use test_utils::{elevation_registry, elevation_registry_with, multi_layer_registry, transform};

pub fn engine_for(registry: LayerRegistry) -> OgcEngine {
    OgcEngine::new(
        Arc::new(registry),
        transform(),
        ServiceInfo::default(),
        RequestLimits::default(),
    )
}

/// The `elevation` scenario engine with its 0..1000 gradient.
pub fn elevation_engine() -> OgcEngine {
    engine_for(elevation_registry())
}

pub fn elevation_engine_with(provider: Arc<dyn DataProvider>) -> OgcEngine {
    engine_for(elevation_registry_with(provider))
}

pub fn multi_layer_engine(provider: Arc<dyn DataProvider>) -> OgcEngine {
    engine_for(multi_layer_registry(provider))
}

pub fn kvp(pairs: &[(&str, &str)]) -> KvpParams {
    KvpParams::from_pairs(pairs.iter().copied())
}

pub async fn call(engine: &OgcEngine, pairs: &[(&str, &str)]) -> OgcResponse {
    engine.handle(&kvp(pairs), &RequestContext::new()).await
}

/// GetMap 1.3.0 over the whole `elevation` layer, with `extra` overriding
/// or adding parameters.
pub fn get_map(extra: &[(&str, &str)]) -> KvpParams {
    let mut params = kvp(&[
        ("service", "WMS"),
        ("version", "1.3.0"),
        ("request", "GetMap"),
        ("layers", "elevation"),
        ("styles", ""),
        ("crs", "EPSG:4326"),
        ("bbox", "-10,-10,10,10"),
        ("width", "50"),
        ("height", "50"),
        ("format", "image/png"),
    ]);
    for (key, value) in extra {
        params.set(key, *value);
    }
    params
}

/// Name of the document's root element.
pub fn root_element(body: &[u8]) -> String {
    let text = String::from_utf8_lossy(body);
    let mut reader = Reader::from_str(&text);
    reader.trim_text(true);
    loop {
        match reader.read_event() {
            Ok(Event::Start(e)) => return String::from_utf8_lossy(e.name().as_ref()).into_owned(),
            Ok(Event::Eof) => panic!("no root element"),
            Ok(_) => {}
            Err(e) => panic!("malformed XML: {}", e),
        }
    }
}

/// Text of every element named `tag`, in document order.
pub fn element_texts(body: &[u8], tag: &str) -> Vec<String> {
    let text = String::from_utf8_lossy(body);
    let mut reader = Reader::from_str(&text);
    reader.trim_text(true);
    let mut current: Option<String> = None;
    let mut found = Vec::new();
    loop {
        match reader.read_event() {
            Ok(Event::Start(e)) => {
                current = Some(String::from_utf8_lossy(e.name().as_ref()).into_owned());
            }
            Ok(Event::End(_)) => current = None,
            Ok(Event::Text(t)) if current.as_deref() == Some(tag) => {
                found.push(t.unescape().unwrap().into_owned());
            }
            Ok(Event::Eof) => break,
            Ok(_) => {}
            Err(e) => panic!("malformed XML: {}", e),
        }
    }
    found
}

/// Value of a LONG or SHORT field in the first IFD of a little-endian TIFF.
pub fn tiff_field(tiff: &[u8], tag: u16) -> Option<u32> {
    let u16_at = |at: usize| u16::from_le_bytes([tiff[at], tiff[at + 1]]);
    let u32_at = |at: usize| u32::from_le_bytes([tiff[at], tiff[at + 1], tiff[at + 2], tiff[at + 3]]);

    let ifd = u32_at(4) as usize;
    let entries = u16_at(ifd) as usize;
    (0..entries).find_map(|n| {
        let entry = ifd + 2 + n * 12;
        if u16_at(entry) != tag {
            return None;
        }
        match u16_at(entry + 2) {
            3 => Some(u16_at(entry + 8) as u32),
            4 => Some(u32_at(entry + 8)),
            _ => None,
        }
    })
}
