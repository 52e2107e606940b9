//! Styling and compositing of RGBA buffers.

use ogc_common::{Rgba, Style};
use rayon::prelude::*;

/// Values per rayon task when styling large coverages.
const STYLE_CHUNK: usize = 16 * 1024;

/// Map coverage values to RGBA through a style.
///
/// Large buffers are styled in parallel chunks.
pub fn apply_style(style: &Style, values: &[f32]) -> Vec<u8> {
    if values.len() <= STYLE_CHUNK {
        return style.apply(values);
    }

    let mut out = vec![0u8; values.len() * 4];
    out.par_chunks_mut(STYLE_CHUNK * 4)
        .zip(values.par_chunks(STYLE_CHUNK))
        .for_each(|(dst, src)| {
            for (px, v) in dst.chunks_exact_mut(4).zip(src) {
                px.copy_from_slice(&style.color_for(*v as f64));
            }
        });
    out
}

/// A buffer of `width * height` pixels all set to `color`.
pub fn fill(width: usize, height: usize, color: Rgba) -> Vec<u8> {
    color.repeat(width * height)
}

/// Composite `src` over `dst` in place (straight alpha, source-over).
///
/// Both buffers are RGBA and must have the same length.
pub fn blend_over(dst: &mut [u8], src: &[u8]) {
    dst.par_chunks_mut(4)
        .zip(src.par_chunks(4))
        .for_each(|(d, s)| blend_pixel(d, s));
}

pub(crate) fn blend_pixel(d: &mut [u8], s: &[u8]) {
    let sa = s[3] as u32;
    if sa == 0 {
        return;
    }
    if sa == 255 {
        d.copy_from_slice(s);
        return;
    }

    let da = d[3] as u32;
    // out_a = sa + da * (1 - sa), everything scaled by 255
    let out_a = sa * 255 + da * (255 - sa);
    if out_a == 0 {
        d.copy_from_slice(&[0, 0, 0, 0]);
        return;
    }
    for c in 0..3 {
        let num = s[c] as u32 * sa * 255 + d[c] as u32 * da * (255 - sa);
        d[c] = ((num + out_a / 2) / out_a) as u8;
    }
    d[3] = ((out_a + 127) / 255) as u8;
}

/// Drop alpha by compositing onto an opaque background. Returns RGB bytes.
pub fn flatten(rgba: &[u8], background: Rgba) -> Vec<u8> {
    let mut rgb = Vec::with_capacity(rgba.len() / 4 * 3);
    let mut px = [0u8; 4];
    for s in rgba.chunks_exact(4) {
        px.copy_from_slice(&[background[0], background[1], background[2], 255]);
        blend_pixel(&mut px, s);
        rgb.extend_from_slice(&px[..3]);
    }
    rgb
}
