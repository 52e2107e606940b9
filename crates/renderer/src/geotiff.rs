//! Single-band float32 GeoTIFF writer.
//!
//! Writes a little-endian baseline TIFF with one deflate-compressed strip,
//! the GeoTIFF georeferencing tags and a GDAL no-data tag of `nan`.
//!
//! File layout: header, strip, out-of-line tag values, IFD.

use std::io::Write;

use ogc_common::crs::Authority;
use ogc_common::{BoundingBox, Coverage, Crs};

use crate::EncodeError;

const TAG_IMAGE_WIDTH: u16 = 256;
const TAG_IMAGE_LENGTH: u16 = 257;
const TAG_BITS_PER_SAMPLE: u16 = 258;
const TAG_COMPRESSION: u16 = 259;
const TAG_PHOTOMETRIC: u16 = 262;
const TAG_STRIP_OFFSETS: u16 = 273;
const TAG_SAMPLES_PER_PIXEL: u16 = 277;
const TAG_ROWS_PER_STRIP: u16 = 278;
const TAG_STRIP_BYTE_COUNTS: u16 = 279;
const TAG_PLANAR_CONFIG: u16 = 284;
const TAG_SAMPLE_FORMAT: u16 = 339;
const TAG_MODEL_PIXEL_SCALE: u16 = 33550;
const TAG_MODEL_TIEPOINT: u16 = 33922;
const TAG_GEO_KEY_DIRECTORY: u16 = 34735;
const TAG_GDAL_NODATA: u16 = 42113;

const COMPRESSION_DEFLATE: u16 = 8;
const PHOTOMETRIC_MIN_IS_BLACK: u16 = 1;
const SAMPLE_FORMAT_FLOAT: u16 = 3;

const KEY_MODEL_TYPE: u16 = 1024;
const KEY_RASTER_TYPE: u16 = 1025;
const KEY_GEOGRAPHIC_TYPE: u16 = 2048;
const KEY_PROJECTED_CS_TYPE: u16 = 3072;

const MODEL_TYPE_PROJECTED: u16 = 1;
const MODEL_TYPE_GEOGRAPHIC: u16 = 2;
const RASTER_PIXEL_IS_AREA: u16 = 1;
const USER_DEFINED: u16 = 32767;

/// Tag payloads, keyed by TIFF field type.
enum Value {
    Ascii(Vec<u8>),
    Short(Vec<u16>),
    Long(Vec<u32>),
    Double(Vec<f64>),
}

impl Value {
    fn field_type(&self) -> u16 {
        match self {
            Value::Ascii(_) => 2,
            Value::Short(_) => 3,
            Value::Long(_) => 4,
            Value::Double(_) => 12,
        }
    }

    fn count(&self) -> u32 {
        let n = match self {
            Value::Ascii(v) => v.len(),
            Value::Short(v) => v.len(),
            Value::Long(v) => v.len(),
            Value::Double(v) => v.len(),
        };
        n as u32
    }

    fn bytes(&self) -> Vec<u8> {
        match self {
            Value::Ascii(v) => v.clone(),
            Value::Short(v) => v.iter().flat_map(|x| x.to_le_bytes()).collect(),
            Value::Long(v) => v.iter().flat_map(|x| x.to_le_bytes()).collect(),
            Value::Double(v) => v.iter().flat_map(|x| x.to_le_bytes()).collect(),
        }
    }
}

/// Encode a coverage as GeoTIFF georeferenced to `bbox` in `crs`.
///
/// Row 0 of the coverage is the north edge of `bbox`.
pub fn encode_geotiff(coverage: &Coverage, bbox: &BoundingBox, crs: &Crs) -> Result<Vec<u8>, EncodeError> {
    let (width, height) = (coverage.width, coverage.height);
    let expected = width * height;
    if coverage.values.len() != expected {
        return Err(EncodeError::BufferSize {
            width,
            height,
            expected: expected * 4,
            actual: coverage.values.len() * 4,
        });
    }
    let too_large = || EncodeError::TooLarge { width, height };
    let w = u32::try_from(width).map_err(|_| too_large())?;
    let h = u32::try_from(height).map_err(|_| too_large())?;

    let mut raw = Vec::with_capacity(expected * 4);
    for v in &coverage.values {
        raw.extend_from_slice(&v.to_le_bytes());
    }
    let mut encoder = flate2::write::ZlibEncoder::new(Vec::new(), flate2::Compression::default());
    encoder.write_all(&raw)?;
    let strip = encoder.finish()?;

    let mut out = Vec::with_capacity(strip.len() + 512);
    out.extend_from_slice(b"II");
    out.extend_from_slice(&42u16.to_le_bytes());
    out.extend_from_slice(&0u32.to_le_bytes()); // IFD offset, patched below

    let strip_offset = out.len() as u32;
    out.extend_from_slice(&strip);
    pad_to_word(&mut out);

    let scale_x = bbox.width() / width as f64;
    let scale_y = bbox.height() / height as f64;

    let tags: Vec<(u16, Value)> = vec![
        (TAG_IMAGE_WIDTH, Value::Long(vec![w])),
        (TAG_IMAGE_LENGTH, Value::Long(vec![h])),
        (TAG_BITS_PER_SAMPLE, Value::Short(vec![32])),
        (TAG_COMPRESSION, Value::Short(vec![COMPRESSION_DEFLATE])),
        (TAG_PHOTOMETRIC, Value::Short(vec![PHOTOMETRIC_MIN_IS_BLACK])),
        (TAG_STRIP_OFFSETS, Value::Long(vec![strip_offset])),
        (TAG_SAMPLES_PER_PIXEL, Value::Short(vec![1])),
        (TAG_ROWS_PER_STRIP, Value::Long(vec![h])),
        (TAG_STRIP_BYTE_COUNTS, Value::Long(vec![strip.len() as u32])),
        (TAG_PLANAR_CONFIG, Value::Short(vec![1])),
        (TAG_SAMPLE_FORMAT, Value::Short(vec![SAMPLE_FORMAT_FLOAT])),
        (TAG_MODEL_PIXEL_SCALE, Value::Double(vec![scale_x, scale_y, 0.0])),
        (
            TAG_MODEL_TIEPOINT,
            Value::Double(vec![0.0, 0.0, 0.0, bbox.min_x, bbox.max_y, 0.0]),
        ),
        (TAG_GEO_KEY_DIRECTORY, Value::Short(geo_keys(crs))),
        (TAG_GDAL_NODATA, Value::Ascii(b"nan\0".to_vec())),
    ];

    // values wider than the 4-byte entry slot live before the IFD
    let mut entries = Vec::with_capacity(tags.len());
    for (tag, value) in &tags {
        let bytes = value.bytes();
        let slot = if bytes.len() <= 4 {
            let mut inline = [0u8; 4];
            inline[..bytes.len()].copy_from_slice(&bytes);
            inline
        } else {
            let offset = out.len() as u32;
            out.extend_from_slice(&bytes);
            pad_to_word(&mut out);
            offset.to_le_bytes()
        };
        entries.push((*tag, value.field_type(), value.count(), slot));
    }

    let ifd_offset = out.len() as u32;
    out[4..8].copy_from_slice(&ifd_offset.to_le_bytes());
    out.extend_from_slice(&(entries.len() as u16).to_le_bytes());
    for (tag, field_type, count, slot) in entries {
        out.extend_from_slice(&tag.to_le_bytes());
        out.extend_from_slice(&field_type.to_le_bytes());
        out.extend_from_slice(&count.to_le_bytes());
        out.extend_from_slice(&slot);
    }
    out.extend_from_slice(&0u32.to_le_bytes());

    Ok(out)
}

fn pad_to_word(out: &mut Vec<u8>) {
    if out.len() % 2 == 1 {
        out.push(0);
    }
}

/// GeoKeyDirectory: header then (key, location, count, value) quads.
fn geo_keys(crs: &Crs) -> Vec<u16> {
    let code = if crs.is_web_mercator() {
        3857
    } else if crs.authority() == Authority::Ogc {
        4326
    } else {
        u16::try_from(crs.code()).unwrap_or(USER_DEFINED)
    };

    let (model, crs_key) = if crs.is_geographic() {
        (MODEL_TYPE_GEOGRAPHIC, KEY_GEOGRAPHIC_TYPE)
    } else {
        (MODEL_TYPE_PROJECTED, KEY_PROJECTED_CS_TYPE)
    };

    let keys = [
        (KEY_MODEL_TYPE, model),
        (KEY_RASTER_TYPE, RASTER_PIXEL_IS_AREA),
        (crs_key, code),
    ];
    let mut dir = vec![1, 1, 0, keys.len() as u16];
    for (key, value) in keys {
        dir.extend_from_slice(&[key, 0, 1, value]);
    }
    dir
}
