//! PNG encoding for RGBA image data.
//!
//! Two layouts are written:
//! - **Indexed (color type 3)** when the image has at most 256 distinct
//!   RGBA values. Styled maps usually land here.
//! - **Truecolor with alpha (color type 6)** otherwise.
//!
//! [`create_png_auto`] picks between them; [`create_png`] always writes RGBA.

use rayon::prelude::*;
use std::collections::{HashMap, HashSet};
use std::io::Write;

use crate::{check_len, EncodeError};

const SIGNATURE: [u8; 8] = [137, 80, 78, 71, 13, 10, 26, 10];

/// Maximum colors for indexed PNG (PNG8)
const MAX_PALETTE_SIZE: usize = 256;

/// Pixel count above which palette extraction is split across threads.
const PARALLEL_THRESHOLD: usize = 4096;

const COLOR_TYPE_INDEXED: u8 = 3;
const COLOR_TYPE_RGBA: u8 = 6;

/// Palette entries plus one index per pixel.
pub type Palette = (Vec<[u8; 4]>, Vec<u8>);

/// Encode RGBA pixels, using a palette when the colours allow it.
pub fn create_png_auto(pixels: &[u8], width: usize, height: usize) -> Result<Vec<u8>, EncodeError> {
    check_len(pixels, width, height, 4)?;

    let palette = if width * height >= PARALLEL_THRESHOLD {
        extract_palette_parallel(pixels)
    } else {
        extract_palette_sequential(pixels)
    };

    match palette {
        Some((palette, indices)) => create_png_indexed(width, height, &palette, &indices),
        None => {
            tracing::debug!(width, height, "Too many colours for a palette, writing RGBA PNG");
            create_png(pixels, width, height)
        }
    }
}

/// Encode an indexed PNG from a palette and one index byte per pixel.
pub fn create_png_indexed(
    width: usize,
    height: usize,
    palette: &[[u8; 4]],
    indices: &[u8],
) -> Result<Vec<u8>, EncodeError> {
    check_len(indices, width, height, 1)?;

    let mut png = Vec::with_capacity(64 + palette.len() * 4 + indices.len() / 2);
    png.extend_from_slice(&SIGNATURE);
    write_header(&mut png, width, height, COLOR_TYPE_INDEXED)?;

    let plte: Vec<u8> = palette.iter().flat_map(|c| [c[0], c[1], c[2]]).collect();
    write_chunk(&mut png, b"PLTE", &plte);

    // alpha per palette entry, only needed when something is see-through
    if palette.iter().any(|c| c[3] < 255) {
        let trns: Vec<u8> = palette.iter().map(|c| c[3]).collect();
        write_chunk(&mut png, b"tRNS", &trns);
    }

    let idat = deflate_scanlines(indices, width, height)?;
    write_chunk(&mut png, b"IDAT", &idat);
    write_chunk(&mut png, b"IEND", &[]);
    Ok(png)
}

/// Encode a truecolor PNG with alpha.
pub fn create_png(pixels: &[u8], width: usize, height: usize) -> Result<Vec<u8>, EncodeError> {
    check_len(pixels, width, height, 4)?;

    let mut png = Vec::with_capacity(64 + pixels.len() / 2);
    png.extend_from_slice(&SIGNATURE);
    write_header(&mut png, width, height, COLOR_TYPE_RGBA)?;

    let idat = deflate_scanlines(pixels, width * 4, height)?;
    write_chunk(&mut png, b"IDAT", &idat);
    write_chunk(&mut png, b"IEND", &[]);
    Ok(png)
}

fn write_header(
    png: &mut Vec<u8>,
    width: usize,
    height: usize,
    color_type: u8,
) -> Result<(), EncodeError> {
    let too_large = || EncodeError::TooLarge { width, height };
    let w = u32::try_from(width).map_err(|_| too_large())?;
    let h = u32::try_from(height).map_err(|_| too_large())?;

    let mut ihdr = Vec::with_capacity(13);
    ihdr.extend_from_slice(&w.to_be_bytes());
    ihdr.extend_from_slice(&h.to_be_bytes());
    ihdr.extend_from_slice(&[8, color_type, 0, 0, 0]);
    write_chunk(png, b"IHDR", &ihdr);
    Ok(())
}

fn write_chunk(png: &mut Vec<u8>, chunk_type: &[u8; 4], data: &[u8]) {
    png.extend_from_slice(&(data.len() as u32).to_be_bytes());

    let start = png.len();
    png.extend_from_slice(chunk_type);
    png.extend_from_slice(data);

    // CRC covers type and data, not the length
    let crc = crc32fast::hash(&png[start..]);
    png.extend_from_slice(&crc.to_be_bytes());
}

/// Prefix every row with filter byte 0 and zlib-compress the result.
fn deflate_scanlines(data: &[u8], row_bytes: usize, rows: usize) -> Result<Vec<u8>, EncodeError> {
    let mut raw = Vec::with_capacity(rows * (row_bytes + 1));
    for row in data.chunks_exact(row_bytes.max(1)).take(rows) {
        raw.push(0);
        raw.extend_from_slice(row);
    }

    let mut encoder = flate2::write::ZlibEncoder::new(Vec::new(), flate2::Compression::fast());
    encoder.write_all(&raw)?;
    Ok(encoder.finish()?)
}

#[inline(always)]
fn pack(px: &[u8]) -> u32 {
    u32::from_le_bytes([px[0], px[1], px[2], px[3]])
}

fn extract_palette_sequential(pixels: &[u8]) -> Option<Palette> {
    let mut lookup: HashMap<u32, u8> = HashMap::with_capacity(MAX_PALETTE_SIZE);
    let mut palette: Vec<[u8; 4]> = Vec::with_capacity(MAX_PALETTE_SIZE);
    let mut indices = Vec::with_capacity(pixels.len() / 4);

    for px in pixels.chunks_exact(4) {
        let key = pack(px);
        let index = match lookup.get(&key) {
            Some(&i) => i,
            None => {
                if palette.len() == MAX_PALETTE_SIZE {
                    return None;
                }
                let i = palette.len() as u8;
                palette.push(key.to_le_bytes());
                lookup.insert(key, i);
                i
            }
        };
        indices.push(index);
    }

    Some((palette, indices))
}

/// Collect distinct colours per chunk in parallel, merge, then map pixels
/// to indices in a second parallel pass.
fn extract_palette_parallel(pixels: &[u8]) -> Option<Palette> {
    let chunk_pixels = (pixels.len() / 4 / rayon::current_num_threads()).max(256);

    let per_chunk: Vec<HashSet<u32>> = pixels
        .par_chunks(chunk_pixels * 4)
        .map(|chunk| {
            let mut seen = HashSet::with_capacity(MAX_PALETTE_SIZE);
            for px in chunk.chunks_exact(4) {
                seen.insert(pack(px));
                if seen.len() > MAX_PALETTE_SIZE {
                    break;
                }
            }
            seen
        })
        .collect();

    let mut lookup: HashMap<u32, u8> = HashMap::with_capacity(MAX_PALETTE_SIZE);
    let mut palette: Vec<[u8; 4]> = Vec::with_capacity(MAX_PALETTE_SIZE);
    for key in per_chunk.into_iter().flatten() {
        if lookup.contains_key(&key) {
            continue;
        }
        if palette.len() == MAX_PALETTE_SIZE {
            return None;
        }
        lookup.insert(key, palette.len() as u8);
        palette.push(key.to_le_bytes());
    }

    let mut indices = vec![0u8; pixels.len() / 4];
    indices
        .par_chunks_mut(chunk_pixels)
        .zip(pixels.par_chunks(chunk_pixels * 4))
        .for_each(|(out, px)| {
            for (slot, p) in out.iter_mut().zip(px.chunks_exact(4)) {
                *slot = lookup.get(&pack(p)).copied().unwrap_or(0);
            }
        });

    Some((palette, indices))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn decode(png: &[u8]) -> image::RgbaImage {
        image::load_from_memory_with_format(png, image::ImageFormat::Png)
            .unwrap()
            .to_rgba8()
    }

    #[test]
    fn test_extract_palette_simple() {
        let pixels = [
            255, 0, 0, 255, // red
            0, 255, 0, 255, // green
            0, 0, 255, 255, // blue
            255, 0, 0, 255, // red again
        ];

        let (palette, indices) = extract_palette_sequential(&pixels).unwrap();
        assert_eq!(palette.len(), 3);
        assert_eq!(indices.len(), 4);
        assert_eq!(indices[0], indices[3]);
    }

    #[test]
    fn test_extract_palette_too_many_colors() {
        let pixels: Vec<u8> = (0..300u32)
            .flat_map(|i| [(i % 256) as u8, (i / 256) as u8, 0, 255])
            .collect();
        assert!(extract_palette_sequential(&pixels).is_none());
    }

    #[test]
    fn test_extract_palette_parallel_matches_sequential() {
        let mut pixels = Vec::with_capacity(128 * 128 * 4);
        for y in 0..128u32 {
            for x in 0..128u32 {
                let c = ((x / 8 + y / 8) % 50) as u8;
                pixels.extend_from_slice(&[c * 5, 100 + c * 3, 200 - c * 2, 255]);
            }
        }

        let (palette, indices) = extract_palette_parallel(&pixels).unwrap();
        assert_eq!(palette.len(), 50);
        assert_eq!(indices.len(), 128 * 128);
        for (i, px) in pixels.chunks_exact(4).enumerate() {
            assert_eq!(&palette[indices[i] as usize][..], px);
        }
    }

    #[test]
    fn test_indexed_png_decodes_with_transparency() {
        let pixels = [
            255, 0, 0, 255, 0, 0, 0, 0, //
            0, 0, 0, 0, 255, 0, 0, 255,
        ];
        let png = create_png_auto(&pixels, 2, 2).unwrap();
        assert_eq!(&png[..8], &SIGNATURE);
        // color type byte of IHDR
        assert_eq!(png[25], COLOR_TYPE_INDEXED);

        let img = decode(&png);
        assert_eq!(img.dimensions(), (2, 2));
        assert_eq!(img.get_pixel(0, 0).0, [255, 0, 0, 255]);
        assert_eq!(img.get_pixel(1, 0).0[3], 0);
    }

    #[test]
    fn test_rgba_png_decodes() {
        let pixels: Vec<u8> = (0..400u32)
            .flat_map(|i| [(i % 256) as u8, (i / 2 % 256) as u8, 7, 200])
            .collect();
        let png = create_png_auto(&pixels, 20, 20).unwrap();
        assert_eq!(png[25], COLOR_TYPE_RGBA);

        let img = decode(&png);
        assert_eq!(img.as_raw(), &pixels);
    }

    #[test]
    fn test_wrong_buffer_size() {
        let err = create_png(&[0; 12], 2, 2).unwrap_err();
        assert!(matches!(err, EncodeError::BufferSize { expected: 16, actual: 12, .. }));
    }
}
