//! Raster output for the OGC services.
//!
//! Turns styled coverages into images (PNG, JPEG), draws legends and writes
//! float32 GeoTIFF coverages. The PNG and TIFF containers are written by hand;
//! JPEG goes through the `image` crate.

pub mod compose;
pub mod geotiff;
pub mod jpeg;
pub mod legend;
pub mod png;

pub use compose::{apply_style, blend_over, fill, flatten};
pub use geotiff::encode_geotiff;
pub use jpeg::encode_jpeg;
pub use legend::render_legend;
pub use png::{create_png, create_png_auto};

/// Failure while encoding an output image.
#[derive(Debug, thiserror::Error)]
pub enum EncodeError {
    #[error("Buffer holds {actual} bytes, expected {expected} for {width}x{height}")]
    BufferSize {
        width: usize,
        height: usize,
        expected: usize,
        actual: usize,
    },

    #[error("Image of {width}x{height} is too large for the output format")]
    TooLarge { width: usize, height: usize },

    #[error("Compression failed: {0}")]
    Compression(#[from] std::io::Error),

    #[error("Image encoding failed: {0}")]
    Image(#[from] image::ImageError),
}

pub(crate) fn check_len(
    buffer: &[u8],
    width: usize,
    height: usize,
    bytes_per_pixel: usize,
) -> Result<(), EncodeError> {
    let expected = width * height * bytes_per_pixel;
    if buffer.len() != expected {
        return Err(EncodeError::BufferSize {
            width,
            height,
            expected,
            actual: buffer.len(),
        });
    }
    Ok(())
}

impl From<EncodeError> for ogc_common::OgcError {
    fn from(err: EncodeError) -> Self {
        ogc_common::OgcError::InternalError(err.to_string())
    }
}
