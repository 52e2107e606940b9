//! JPEG output.

use image::codecs::jpeg::JpegEncoder;
use image::ColorType;
use ogc_common::Rgba;

use crate::compose::flatten;
use crate::{check_len, EncodeError};

pub const DEFAULT_QUALITY: u8 = 85;

/// Encode RGBA pixels as JPEG. Alpha is composited onto `background` first.
pub fn encode_jpeg(
    pixels: &[u8],
    width: usize,
    height: usize,
    background: Rgba,
) -> Result<Vec<u8>, EncodeError> {
    check_len(pixels, width, height, 4)?;
    let too_large = || EncodeError::TooLarge { width, height };
    // baseline JPEG stores dimensions as u16
    let w = u16::try_from(width).map_err(|_| too_large())?;
    let h = u16::try_from(height).map_err(|_| too_large())?;

    let rgb = flatten(pixels, background);
    let mut out = Vec::new();
    JpegEncoder::new_with_quality(&mut out, DEFAULT_QUALITY).encode(
        &rgb,
        w as u32,
        h as u32,
        ColorType::Rgb8,
    )?;
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_jpeg_uses_background_for_transparency() {
        let pixels = [0u8, 0, 0, 0].repeat(16 * 16);
        let jpeg = encode_jpeg(&pixels, 16, 16, [0, 0, 255, 255]).unwrap();
        assert_eq!(&jpeg[..2], &[0xFF, 0xD8]);

        let img = image::load_from_memory_with_format(&jpeg, image::ImageFormat::Jpeg)
            .unwrap()
            .to_rgb8();
        assert_eq!(img.dimensions(), (16, 16));
        let px = img.get_pixel(8, 8).0;
        assert!(px[2] > 200 && px[0] < 40);
    }
}
